//! Non-predicate clauses: ordering, joins, row locks.

use std::fmt;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    /// Field to order by.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl Order {
    /// Creates an order term.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.direction.keyword())
    }
}

/// Join kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JoinKind {
    /// INNER JOIN.
    Inner,
    /// LEFT JOIN.
    Left,
    /// RIGHT JOIN.
    Right,
    /// FULL OUTER JOIN.
    Full,
    /// CROSS JOIN (no condition).
    Cross,
}

impl JoinKind {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT JOIN",
            Self::Right => "RIGHT JOIN",
            Self::Full => "FULL OUTER JOIN",
            Self::Cross => "CROSS JOIN",
        }
    }
}

/// A join against another table.
///
/// The condition is caller-written SQL, emitted verbatim after `ON`. It must
/// not carry values; bind values through WHERE conditions instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Join kind.
    pub kind: JoinKind,
    /// Joined table.
    pub target: String,
    /// ON condition text (ignored for CROSS joins).
    pub on: String,
    /// Optional alias for the joined table.
    pub alias: Option<String>,
}

/// Row-lock mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LockMode {
    /// No row lock.
    #[default]
    None,
    /// `FOR UPDATE`.
    ForUpdate,
    /// `FOR SHARE`.
    ForShare,
}

impl LockMode {
    /// Returns the SQL clause, or `None` when no lock is requested.
    #[must_use]
    pub const fn clause(self) -> Option<&'static str> {
        match self {
            Self::None => Option::None,
            Self::ForUpdate => Some("FOR UPDATE"),
            Self::ForShare => Some("FOR SHARE"),
        }
    }
}
