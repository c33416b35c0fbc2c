//! Operator vocabulary.
//!
//! A closed set of comparison operators and boolean combinators shared by
//! every backend. Operators carry no behavior; each compiler maps them through
//! its own table and rejects the ones it has no entry for.

use std::fmt;
use std::str::FromStr;

use quarry_common::Error;

/// A comparison, pattern, membership, null-test, range, or existence operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Equal.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
    /// SQL-style pattern match (`%` and `_` wildcards).
    Like,
    /// Negated pattern match.
    NotLike,
    /// Set membership.
    In,
    /// Negated set membership.
    NotIn,
    /// Null test.
    IsNull,
    /// Non-null test.
    IsNotNull,
    /// Inclusive range.
    Between,
    /// Negated inclusive range.
    NotBetween,
    /// Subquery yields at least one row.
    Exists,
    /// Subquery yields no rows.
    NotExists,
    /// Regular expression match.
    Regex,
    /// Geospatial proximity.
    Near,
}

impl Operator {
    /// Every operator, in declaration order.
    pub const ALL: [Operator; 18] = [
        Self::Eq,
        Self::Ne,
        Self::Gt,
        Self::Gte,
        Self::Lt,
        Self::Lte,
        Self::Like,
        Self::NotLike,
        Self::In,
        Self::NotIn,
        Self::IsNull,
        Self::IsNotNull,
        Self::Between,
        Self::NotBetween,
        Self::Exists,
        Self::NotExists,
        Self::Regex,
        Self::Near,
    ];

    /// Returns the canonical symbol, used in errors and debug renderings.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::In => "IN",
            Self::NotIn => "NOT IN",
            Self::IsNull => "IS NULL",
            Self::IsNotNull => "IS NOT NULL",
            Self::Between => "BETWEEN",
            Self::NotBetween => "NOT BETWEEN",
            Self::Exists => "EXISTS",
            Self::NotExists => "NOT EXISTS",
            Self::Regex => "REGEX",
            Self::Near => "NEAR",
        }
    }

    /// Returns true for the six ordering/equality comparisons.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::Ne | Self::Gt | Self::Gte | Self::Lt | Self::Lte
        )
    }

    /// Returns true for operators that only make sense against a subquery.
    #[must_use]
    pub const fn is_subquery_only(self) -> bool {
        matches!(self, Self::Exists | Self::NotExists)
    }

    /// Returns true if the operator reads its value operand.
    #[must_use]
    pub const fn takes_value(self) -> bool {
        !matches!(
            self,
            Self::IsNull | Self::IsNotNull | Self::Exists | Self::NotExists
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = Error;

    /// Parses a symbol (`>=`, `NOT IN`) or a snake-case name (`gte`, `not_in`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('_', " ");
        let op = match normalized.as_str() {
            "=" | "==" | "EQ" => Self::Eq,
            "!=" | "<>" | "NE" => Self::Ne,
            ">" | "GT" => Self::Gt,
            ">=" | "GTE" => Self::Gte,
            "<" | "LT" => Self::Lt,
            "<=" | "LTE" => Self::Lte,
            "LIKE" => Self::Like,
            "NOT LIKE" => Self::NotLike,
            "IN" => Self::In,
            "NOT IN" => Self::NotIn,
            "IS NULL" => Self::IsNull,
            "IS NOT NULL" => Self::IsNotNull,
            "BETWEEN" => Self::Between,
            "NOT BETWEEN" => Self::NotBetween,
            "EXISTS" => Self::Exists,
            "NOT EXISTS" => Self::NotExists,
            "REGEX" => Self::Regex,
            "NEAR" => Self::Near,
            _ => return Err(Error::unsupported_operator(s, "operator vocabulary")),
        };
        Ok(op)
    }
}

/// Boolean combinator joining the children of a composite condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logic {
    /// All children must hold.
    And,
    /// At least one child must hold.
    Or,
}

impl Logic {
    /// Returns the SQL keyword.
    #[must_use]
    pub const fn keyword(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}
