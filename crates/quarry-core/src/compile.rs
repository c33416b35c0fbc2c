//! The compiler interface every backend implements.

use quarry_common::Result;

use crate::operator::Operator;
use crate::query::Query;

/// Translates a [`Query`] into a backend's native form.
///
/// Implementations must be pure functions of `(query, configuration)`: one
/// compiler instance serves concurrent calls, so any buffers used during
/// compilation are allocated per call.
pub trait QueryCompiler: Send + Sync {
    /// Native form produced by this backend.
    type Output;

    /// Backend name used in error messages and logs.
    fn backend(&self) -> &'static str;

    /// Returns true if this backend has a mapping for `operator` in a basic
    /// condition.
    fn supports(&self, operator: Operator) -> bool;

    /// Compiles `query`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query uses an operator or clause this backend
    /// cannot express, or if an operand does not fit its operator.
    fn compile(&self, query: &Query) -> Result<Self::Output>;
}
