//! Relational backend: parameterized SQL for PostgreSQL, MySQL, and SQLite.
//!
//! Compilation produces [`SqlFragments`]: one text per clause plus the
//! arguments in placeholder order. [`SqlFragments::to_select`] joins them
//! into a complete statement.
//!
//! ```
//! use quarry_adapters::sql::{compile, Dialect};
//! use quarry_core::{options::*, Operator, Query};
//!
//! let query = Query::build(&[
//!     where_("age", Operator::Gt, 18),
//!     where_("status", Operator::Eq, "active"),
//! ]);
//! let fragments = compile(&query, Dialect::Postgres).unwrap();
//! assert_eq!(fragments.where_clause(), Some(r#""age" > $1 AND "status" = $2"#));
//! assert_eq!(fragments.args().len(), 2);
//! ```

mod compiler;
mod dialect;
mod statement;
mod writer;

pub use compiler::{SqlCompiler, compile};
pub use dialect::Dialect;
pub use statement::{SqlFragments, SqlStatement};
