//! Error types shared by the query builder and the backend compilers.

use thiserror::Error;

/// Result type alias for Quarry operations.
pub type Result<T> = std::result::Result<T, Error>;

/// An error raised while building or compiling a query.
///
/// Every variant is recoverable only by changing the query; nothing here is
/// fatal to the process.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The operator has no mapping entry for the active backend.
    #[error("operator {operator} is not supported by {backend}")]
    UnsupportedOperator {
        /// Operator symbol.
        operator: String,
        /// Backend or dialect name.
        backend: String,
    },

    /// A query clause has no meaningful mapping for the active backend.
    #[error("{clause} is not supported by {backend}")]
    UnsupportedClause {
        /// Clause name (e.g. "join", "lock").
        clause: String,
        /// Backend or dialect name.
        backend: String,
    },

    /// A subquery is missing a required part.
    #[error("malformed {kind} subquery: {reason}")]
    MalformedSubQuery {
        /// Subquery kind.
        kind: String,
        /// What is missing or inconsistent.
        reason: String,
    },

    /// A condition value does not fit its operator.
    #[error("invalid operand for {field} {operator}: {reason}")]
    InvalidOperand {
        /// Field name.
        field: String,
        /// Operator symbol.
        operator: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// An identifier cannot be quoted safely.
    #[error("invalid identifier: {0:?}")]
    InvalidIdentifier(String),

    /// Emitted placeholders and bound arguments disagree. Always a compiler defect.
    #[error(
        "argument misalignment in {fragment}: {placeholders} placeholders, {arguments} arguments"
    )]
    ArgumentMisalignment {
        /// Fragment being compiled.
        fragment: String,
        /// Placeholders emitted.
        placeholders: usize,
        /// Arguments bound.
        arguments: usize,
    },

    /// Internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Creates an [`Error::UnsupportedOperator`].
    pub fn unsupported_operator(operator: impl Into<String>, backend: impl Into<String>) -> Self {
        Self::UnsupportedOperator {
            operator: operator.into(),
            backend: backend.into(),
        }
    }

    /// Creates an [`Error::UnsupportedClause`].
    pub fn unsupported_clause(clause: impl Into<String>, backend: impl Into<String>) -> Self {
        Self::UnsupportedClause {
            clause: clause.into(),
            backend: backend.into(),
        }
    }

    /// Creates an [`Error::MalformedSubQuery`].
    pub fn malformed_subquery(kind: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSubQuery {
            kind: kind.into(),
            reason: reason.into(),
        }
    }

    /// Creates an [`Error::InvalidOperand`].
    pub fn invalid_operand(
        field: impl Into<String>,
        operator: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidOperand {
            field: field.into(),
            operator: operator.into(),
            reason: reason.into(),
        }
    }

    /// Returns true for errors that indicate a compiler defect rather than a bad query.
    #[must_use]
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::ArgumentMisalignment { .. } | Self::Internal(_))
    }
}
