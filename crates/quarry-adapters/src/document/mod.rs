//! Document backend: filter, sort, and projection documents.
//!
//! Filters use the `$`-operator document idiom (`$gt`, `$in`, `$regex`,
//! `$and`, ...). Clauses with no document meaning (joins, row locks,
//! grouping, distinct) follow the compiler's [`UnsupportedClausePolicy`].

mod command;
mod compiler;

pub use command::{FindCommand, UnsupportedClausePolicy};
pub use compiler::{DocumentCompiler, compile, like_to_regex, operator_key};
