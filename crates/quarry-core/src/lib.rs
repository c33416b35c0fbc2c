//! # quarry-core
//!
//! Core layer for Quarry: the backend-agnostic query representation.
//!
//! Callers compose [`QueryOption`] values into a [`Query`]; a backend
//! implementing [`QueryCompiler`] turns the query into native form. This
//! crate depends only on `quarry-common`.
//!
//! ## Modules
//!
//! - [`operator`] - Operator vocabulary and boolean combinators
//! - [`condition`] - Predicate nodes (basic, composite, negated, subquery)
//! - [`subquery`] - Embedded queries for EXISTS / IN / scalar positions
//! - [`query`] - The query accumulator and its clause types
//! - [`options`] - Option builders applied to a query in call order
//! - [`compile`] - The compiler trait every backend implements

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod compile;
pub mod condition;
pub mod operator;
pub mod options;
pub mod query;
pub mod subquery;

pub use compile::QueryCompiler;
pub use condition::Condition;
pub use operator::{Logic, Operator};
pub use options::QueryOption;
pub use query::{Join, JoinKind, LockMode, Order, Query, SortDirection};
pub use subquery::{LiteralEscapes, SubQuery, SubQueryKind, SubQuerySource};
