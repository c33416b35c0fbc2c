//! # quarry-adapters
//!
//! Backend compilers for Quarry. Each backend translates the shared
//! [`Query`](quarry_core::Query) AST into its native form through its own
//! exhaustive operator table.
//!
//! ## Modules
//!
//! - [`sql`] - Parameterized SQL for PostgreSQL, MySQL, and SQLite
//! - [`document`] - Filter, sort, and projection documents for document stores

#[cfg(feature = "document")]
pub mod document;
#[cfg(feature = "sql")]
pub mod sql;

#[cfg(feature = "document")]
pub use document::{DocumentCompiler, FindCommand, UnsupportedClausePolicy};
#[cfg(feature = "sql")]
pub use sql::{Dialect, SqlCompiler, SqlFragments, SqlStatement};
