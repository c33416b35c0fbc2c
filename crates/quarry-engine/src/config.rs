//! Repository configuration.

#[cfg(feature = "sql")]
use quarry_adapters::Dialect;
#[cfg(feature = "document")]
use quarry_adapters::UnsupportedClausePolicy;
use serde::{Deserialize, Serialize};

/// Configuration shared by the repositories.
///
/// # Examples
///
/// ```
/// # #[cfg(feature = "sql")] {
/// use quarry_adapters::Dialect;
/// use quarry_engine::Config;
///
/// let config = Config::new()
///     .with_dialect(Dialect::MySql)
///     .with_max_limit(500)
///     .with_query_logging();
/// assert!(config.query_logging);
/// # }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Dialect for the relational repository.
    #[cfg(feature = "sql")]
    pub dialect: Dialect,
    /// What the document repository does with clauses it cannot express.
    #[cfg(feature = "document")]
    pub unsupported_clause_policy: UnsupportedClausePolicy,
    /// Log every compiled query at DEBUG level.
    pub query_logging: bool,
    /// Upper bound on any query's limit. Queries without a limit get this one.
    pub max_limit: Option<u64>,
}

impl Config {
    /// Creates the default configuration: PostgreSQL, reject unsupported
    /// clauses, no query logging, no limit cap.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the relational dialect.
    #[cfg(feature = "sql")]
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Sets the document unsupported-clause policy.
    #[cfg(feature = "document")]
    #[must_use]
    pub fn with_clause_policy(mut self, policy: UnsupportedClausePolicy) -> Self {
        self.unsupported_clause_policy = policy;
        self
    }

    /// Enables query logging.
    #[must_use]
    pub fn with_query_logging(mut self) -> Self {
        self.query_logging = true;
        self
    }

    /// Caps every query's limit at `max`.
    #[must_use]
    pub fn with_max_limit(mut self, max: u64) -> Self {
        self.max_limit = Some(max);
        self
    }
}

#[cfg(all(test, feature = "sql", feature = "document"))]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert_eq!(config.dialect, Dialect::Postgres);
        assert_eq!(
            config.unsupported_clause_policy,
            UnsupportedClausePolicy::Reject
        );
        assert!(!config.query_logging);
        assert_eq!(config.max_limit, None);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config =
            serde_json::from_str(r#"{"dialect": "sqlite", "unsupported_clause_policy": "ignore"}"#)
                .unwrap();
        assert_eq!(config.dialect, Dialect::Sqlite);
        assert_eq!(
            config.unsupported_clause_policy,
            UnsupportedClausePolicy::Ignore
        );
        assert!(!config.query_logging);
    }
}
