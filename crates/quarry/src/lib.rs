//! # Quarry
//!
//! A database-agnostic query builder. Describe a query once with composable
//! options; compile it to parameterized SQL or to a document filter.
//!
//! ## Backends
//!
//! | Feature | Output | Notes |
//! | ------- | ------ | ----- |
//! | `sql` | [`SqlFragments`] | PostgreSQL (`$n`), MySQL and SQLite (`?`) |
//! | `document` | [`FindCommand`] | `$`-operator filter, sort, projection |
//!
//! Each feature enables the matching compiler, repository, and driver trait.
//!
//! ## Quick Start
//!
//! ```rust
//! use quarry::prelude::*;
//!
//! let query = Query::build(&[
//!     where_("age", Operator::Gt, 18),
//!     or([
//!         cond("name", Operator::Like, "%Alice%"),
//!         cond("email", Operator::Like, "%alice%"),
//!     ]),
//!     desc("created_at"),
//!     limit(20),
//! ]);
//!
//! let statement = compile_sql(&query, Dialect::Postgres)?.to_select("users")?;
//! assert_eq!(
//!     statement.sql,
//!     r#"SELECT * FROM "users" WHERE "age" > $1 AND ("name" LIKE $2 OR "email" LIKE $3) ORDER BY "created_at" DESC LIMIT 20"#
//! );
//!
//! let find = compile_document(&query)?;
//! assert_eq!(find.limit, Some(20));
//! # Ok::<(), quarry::Error>(())
//! ```

pub use quarry_common::{Error, Result, Value};
pub use quarry_core::{
    Condition, Join, JoinKind, LockMode, Logic, Operator, Order, Query, QueryCompiler,
    QueryOption, SortDirection, SubQuery, SubQueryKind, SubQuerySource, options,
};
pub use quarry_engine::{Config, DriverError, FromRecord, RepositoryError};
#[cfg(feature = "document")]
pub use quarry_engine::{DocumentDriver, DocumentRepository};
#[cfg(feature = "sql")]
pub use quarry_engine::{SqlDriver, SqlRepository};

#[cfg(feature = "document")]
pub use quarry_adapters::document::{
    DocumentCompiler, FindCommand, UnsupportedClausePolicy, compile as compile_document,
};
#[cfg(feature = "sql")]
pub use quarry_adapters::sql::{
    Dialect, SqlCompiler, SqlFragments, SqlStatement, compile as compile_sql,
};

/// Everything needed to build and compile queries.
pub mod prelude {
    pub use quarry_core::options::*;
    pub use quarry_core::{Condition, JoinKind, LockMode, Operator, Query, QueryCompiler};
    pub use quarry_common::Value;

    #[cfg(feature = "document")]
    pub use crate::compile_document;
    #[cfg(feature = "sql")]
    pub use crate::{Dialect, compile_sql};
}
