//! Repositories: build a query from options, compile it for the attached
//! backend, execute it through a driver, and marshal the results.

#[cfg(any(feature = "sql", feature = "document"))]
use parking_lot::RwLock;
#[cfg(feature = "document")]
use quarry_adapters::{DocumentCompiler, FindCommand};
#[cfg(feature = "sql")]
use quarry_adapters::{SqlCompiler, SqlStatement};
#[cfg(any(feature = "sql", feature = "document"))]
use quarry_core::{Query, QueryCompiler, QueryOption};
use thiserror::Error;

#[cfg(any(feature = "sql", feature = "document"))]
use crate::config::Config;
#[cfg(feature = "document")]
use crate::driver::DocumentDriver;
#[cfg(feature = "sql")]
use crate::driver::SqlDriver;
use crate::driver::DriverError;
#[cfg(any(feature = "sql", feature = "document"))]
use crate::driver::FromRecord;

/// Errors raised by a repository call.
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// The query could not be compiled for the backend.
    #[error("compile error: {0}")]
    Compile(#[from] quarry_common::Error),

    /// The driver failed to execute the compiled query.
    #[error("driver error: {0}")]
    Driver(#[source] DriverError),

    /// A record could not be converted into an entity.
    #[error("marshal error: {0}")]
    Marshal(String),
}

/// Result type alias for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;

#[cfg(any(feature = "sql", feature = "document"))]
fn build(options: &[QueryOption], config: &Config) -> Query {
    let mut query = Query::build(options);
    if let Some(max) = config.max_limit {
        query.cap_limit(max);
    }
    query
}

#[cfg(any(feature = "sql", feature = "document"))]
fn marshal<R, T: FromRecord<R>>(records: Vec<R>) -> Result<Vec<T>> {
    records
        .into_iter()
        .map(|r| T::from_record(r).map_err(RepositoryError::Marshal))
        .collect()
}

/// Repository over a relational driver.
#[cfg(feature = "sql")]
pub struct SqlRepository<D> {
    driver: D,
    config: RwLock<Config>,
}

#[cfg(feature = "sql")]
impl<D: SqlDriver> SqlRepository<D> {
    /// Creates a repository.
    pub fn new(driver: D, config: Config) -> Self {
        Self {
            driver,
            config: RwLock::new(config),
        }
    }

    /// Returns the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns a snapshot of the configuration.
    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Replaces the configuration. Calls already compiling keep the old one.
    pub fn set_config(&self, config: Config) {
        *self.config.write() = config;
    }

    /// Builds and compiles a SELECT against `table` without executing it.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Compile`] if the query cannot be compiled.
    pub fn prepare(&self, table: &str, options: &[QueryOption]) -> Result<(SqlStatement, Vec<String>)> {
        let config = self.config();
        let query = build(options, &config);
        let fragments = SqlCompiler::new(config.dialect).compile(&query)?;
        let statement = fragments.to_select(table)?;

        if config.query_logging {
            tracing::debug!(
                dialect = config.dialect.name(),
                sql = %statement.sql,
                args = statement.args.len(),
                "compiled query"
            );
        }
        Ok((statement, fragments.preloads().to_vec()))
    }

    /// Finds entities in `table` matching `options`.
    ///
    /// Preloads named in the options are loaded, in order, after the main
    /// query returns.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation, execution, or marshaling fails.
    pub fn find<T: FromRecord<D::Row>>(&self, table: &str, options: &[QueryOption]) -> Result<Vec<T>> {
        let (statement, preloads) = self.prepare(table, options)?;

        let mut rows = self
            .driver
            .query(&statement.sql, &statement.args)
            .map_err(|e| {
                tracing::warn!(table, error = %e, "query failed");
                RepositoryError::Driver(e)
            })?;
        for relation in &preloads {
            self.driver
                .preload(table, relation, &mut rows)
                .map_err(|e| {
                    tracing::warn!(table, relation = %relation, error = %e, "preload failed");
                    RepositoryError::Driver(e)
                })?;
        }
        marshal(rows)
    }

    /// Finds the first entity in `table` matching `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation, execution, or marshaling fails.
    pub fn find_one<T: FromRecord<D::Row>>(&self, table: &str, options: &[QueryOption]) -> Result<Option<T>> {
        let mut options = options.to_vec();
        options.push(quarry_core::options::limit(1));
        Ok(self.find(table, &options)?.into_iter().next())
    }
}

/// Repository over a document driver.
#[cfg(feature = "document")]
pub struct DocumentRepository<D> {
    driver: D,
    config: RwLock<Config>,
}

#[cfg(feature = "document")]
impl<D: DocumentDriver> DocumentRepository<D> {
    /// Creates a repository.
    pub fn new(driver: D, config: Config) -> Self {
        Self {
            driver,
            config: RwLock::new(config),
        }
    }

    /// Returns the driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Returns a snapshot of the configuration.
    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Replaces the configuration.
    pub fn set_config(&self, config: Config) {
        *self.config.write() = config;
    }

    /// Builds and compiles a find command without executing it.
    ///
    /// # Errors
    ///
    /// Returns [`RepositoryError::Compile`] if the query cannot be compiled.
    pub fn prepare(&self, collection: &str, options: &[QueryOption]) -> Result<FindCommand> {
        let config = self.config();
        let query = build(options, &config);
        let command = DocumentCompiler::new()
            .with_policy(config.unsupported_clause_policy)
            .compile(&query)?;

        if config.query_logging {
            tracing::debug!(
                collection,
                filter = %command.filter_document(),
                ignored = ?command.ignored,
                "compiled find"
            );
        }
        Ok(command)
    }

    /// Finds entities in `collection` matching `options`.
    ///
    /// # Errors
    ///
    /// Returns an error if compilation, execution, or marshaling fails.
    pub fn find<T: FromRecord<D::Document>>(&self, collection: &str, options: &[QueryOption]) -> Result<Vec<T>> {
        let command = self.prepare(collection, options)?;
        let documents = self.driver.find(collection, &command).map_err(|e| {
            tracing::warn!(collection, error = %e, "find failed");
            RepositoryError::Driver(e)
        })?;
        marshal(documents)
    }
}

#[cfg(all(test, feature = "sql", feature = "document"))]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use quarry_adapters::{Dialect, UnsupportedClausePolicy};
    use quarry_common::Value;
    use quarry_core::options::*;
    use quarry_core::{JoinKind, Operator};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        id: i64,
        name: String,
    }

    impl FromRecord<Vec<Value>> for User {
        fn from_record(record: Vec<Value>) -> std::result::Result<Self, String> {
            match record.as_slice() {
                [Value::Int64(id), Value::String(name), ..] => Ok(Self {
                    id: *id,
                    name: name.clone(),
                }),
                other => Err(format!("unexpected row {other:?}")),
            }
        }
    }

    impl FromRecord<serde_json::Value> for User {
        fn from_record(doc: serde_json::Value) -> std::result::Result<Self, String> {
            let id = doc["id"].as_i64().ok_or("missing id")?;
            let name = doc["name"].as_str().ok_or("missing name")?.to_string();
            Ok(Self { id, name })
        }
    }

    /// Records every call and returns canned rows.
    #[derive(Default)]
    struct MockSql {
        rows: Vec<Vec<Value>>,
        fail: bool,
        calls: Mutex<Vec<(String, Vec<Value>)>>,
        preloaded: Mutex<Vec<String>>,
    }

    impl SqlDriver for MockSql {
        type Row = Vec<Value>;

        fn query(&self, sql: &str, args: &[Value]) -> std::result::Result<Vec<Self::Row>, DriverError> {
            self.calls.lock().push((sql.to_string(), args.to_vec()));
            if self.fail {
                return Err("connection reset".into());
            }
            Ok(self.rows.clone())
        }

        fn preload(&self, _table: &str, relation: &str, _rows: &mut [Self::Row]) -> std::result::Result<(), DriverError> {
            self.preloaded.lock().push(relation.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDocs {
        docs: Vec<serde_json::Value>,
        commands: Mutex<Vec<FindCommand>>,
    }

    impl DocumentDriver for MockDocs {
        type Document = serde_json::Value;

        fn find(&self, _collection: &str, command: &FindCommand) -> std::result::Result<Vec<Self::Document>, DriverError> {
            self.commands.lock().push(command.clone());
            Ok(self.docs.clone())
        }
    }

    #[test]
    fn test_sql_find_executes_compiled_statement() {
        let driver = MockSql {
            rows: vec![vec![Value::from(1), Value::from("ada")]],
            ..MockSql::default()
        };
        let repo = SqlRepository::new(driver, Config::new().with_query_logging());

        let users: Vec<User> = repo
            .find(
                "users",
                &[where_("age", Operator::Gt, 18), where_("status", Operator::Eq, "active")],
            )
            .unwrap();

        assert_eq!(users, vec![User { id: 1, name: "ada".to_string() }]);
        let calls = repo.driver().calls.lock();
        assert_eq!(
            calls[0].0,
            r#"SELECT * FROM "users" WHERE "age" > $1 AND "status" = $2"#
        );
        assert_eq!(calls[0].1, vec![Value::from(18), Value::from("active")]);
    }

    #[test]
    fn test_sql_find_runs_preloads_in_order() {
        let repo = SqlRepository::new(MockSql::default(), Config::new());
        let _: Vec<User> = repo
            .find("users", &[preload("orders"), preload("profile")])
            .unwrap();
        assert_eq!(*repo.driver().preloaded.lock(), ["orders", "profile"]);
    }

    #[test]
    fn test_max_limit_caps_queries() {
        let repo = SqlRepository::new(
            MockSql::default(),
            Config::new().with_dialect(Dialect::Sqlite).with_max_limit(100),
        );
        let (unbounded, _) = repo.prepare("t", &[]).unwrap();
        assert_eq!(unbounded.sql, r#"SELECT * FROM "t" LIMIT 100"#);

        let (small, _) = repo.prepare("t", &[limit(5)]).unwrap();
        assert!(small.sql.ends_with("LIMIT 5"));
    }

    #[test]
    fn test_find_one_limits_to_one() {
        let driver = MockSql {
            rows: vec![vec![Value::from(7), Value::from("bo")]],
            ..MockSql::default()
        };
        let repo = SqlRepository::new(driver, Config::new().with_dialect(Dialect::MySql));
        let user: Option<User> = repo.find_one("users", &[limit(50)]).unwrap();

        assert_eq!(user.map(|u| u.id), Some(7));
        assert!(repo.driver().calls.lock()[0].0.ends_with("LIMIT 1"));
    }

    #[test]
    fn test_compile_error_skips_driver() {
        let repo = SqlRepository::new(MockSql::default(), Config::new().with_dialect(Dialect::Sqlite));
        let err = repo
            .find::<User>("users", &[where_("name", Operator::Regex, "^a")])
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Compile(_)));
        assert!(repo.driver().calls.lock().is_empty());
    }

    #[test]
    fn test_driver_and_marshal_errors() {
        let failing = SqlRepository::new(
            MockSql {
                fail: true,
                ..MockSql::default()
            },
            Config::new(),
        );
        let err = failing.find::<User>("users", &[]).unwrap_err();
        assert!(matches!(err, RepositoryError::Driver(_)));
        assert_eq!(err.to_string(), "driver error: connection reset");

        let bad_rows = SqlRepository::new(
            MockSql {
                rows: vec![vec![Value::from("no id")]],
                ..MockSql::default()
            },
            Config::new(),
        );
        assert!(matches!(
            bad_rows.find::<User>("users", &[]),
            Err(RepositoryError::Marshal(_))
        ));
    }

    #[test]
    fn test_set_config_switches_dialect() {
        let repo = SqlRepository::new(MockSql::default(), Config::new());
        repo.set_config(Config::new().with_dialect(Dialect::MySql));
        let (statement, _) = repo.prepare("t", &[where_("a", Operator::Eq, 1)]).unwrap();
        assert_eq!(statement.sql, "SELECT * FROM `t` WHERE `a` = ?");
    }

    #[test]
    fn test_document_find() {
        let driver = MockDocs {
            docs: vec![json!({"id": 3, "name": "cy"})],
            ..MockDocs::default()
        };
        let repo = DocumentRepository::new(driver, Config::new().with_max_limit(20));
        let users: Vec<User> = repo
            .find("users", &[where_("age", Operator::Gte, 21), desc("age")])
            .unwrap();

        assert_eq!(users, vec![User { id: 3, name: "cy".to_string() }]);
        let commands = repo.driver().commands.lock();
        assert_eq!(
            commands[0].filter_document(),
            json!({"age": {"$gte": 21}})
        );
        assert_eq!(commands[0].limit, Some(20));
    }

    #[test]
    fn test_document_clause_policy_from_config() {
        let options = [join(JoinKind::Inner, "orders", "o.user_id = u.id")];

        let strict = DocumentRepository::new(MockDocs::default(), Config::new());
        assert!(matches!(
            strict.find::<User>("users", &options),
            Err(RepositoryError::Compile(quarry_common::Error::UnsupportedClause { .. }))
        ));
        assert!(strict.driver().commands.lock().is_empty());

        let lenient = DocumentRepository::new(
            MockDocs::default(),
            Config::new().with_clause_policy(UnsupportedClausePolicy::Ignore),
        );
        let command = lenient.prepare("users", &options).unwrap();
        assert_eq!(command.ignored, ["join"]);
    }
}
