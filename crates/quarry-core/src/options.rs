//! Query options.
//!
//! Each option is a self-contained mutation of a [`Query`]. Options are plain
//! values: applying one never changes the option, so the same value can be
//! reused across any number of query constructions.
//!
//! ```
//! use quarry_core::{Operator, Query, options};
//!
//! let query = Query::build(&[
//!     options::where_("age", Operator::Gt, 18),
//!     options::where_("status", Operator::Eq, "active"),
//!     options::asc("name"),
//!     options::limit(10),
//! ]);
//! assert_eq!(query.conditions().len(), 2);
//! ```
//!
//! Subquery builders validate their input and return a `Result`.

use quarry_common::{Result, Value};

use crate::condition::Condition;
use crate::operator::Operator;
use crate::query::{Join, JoinKind, LockMode, Order, Query, SortDirection};
use crate::subquery::{SubQuery, SubQuerySource};

/// A single mutation applied to a [`Query`].
#[derive(Debug, Clone)]
pub enum QueryOption {
    /// Append a top-level condition.
    Where(Condition),
    /// Append an ORDER BY term.
    OrderBy(Order),
    /// Set the row limit (last write wins).
    Limit(u64),
    /// Set the row offset (last write wins).
    Offset(u64),
    /// Append projected fields.
    Select(Vec<String>),
    /// Append a join.
    Join(Join),
    /// Append GROUP BY fields.
    GroupBy(Vec<String>),
    /// Append a HAVING condition.
    Having(Condition),
    /// Set the DISTINCT flag.
    Distinct(bool),
    /// Set the row-lock mode.
    Lock(LockMode),
    /// Append a relation to eager-load.
    Preload(String),
}

impl QueryOption {
    /// Applies this option to `query`.
    pub fn apply(&self, query: &mut Query) {
        match self {
            Self::Where(condition) => query.push_condition(condition.clone()),
            Self::OrderBy(order) => query.push_order(order.clone()),
            Self::Limit(n) => query.set_limit(*n),
            Self::Offset(n) => query.set_offset(*n),
            Self::Select(fields) => query.push_fields(fields),
            Self::Join(join) => query.push_join(join.clone()),
            Self::GroupBy(fields) => query.push_groups(fields),
            Self::Having(condition) => query.push_having(condition.clone()),
            Self::Distinct(distinct) => query.set_distinct(*distinct),
            Self::Lock(mode) => query.set_lock(*mode),
            Self::Preload(relation) => query.push_preload(relation.clone()),
        }
    }
}

/// Creates a standalone basic condition, for use inside [`and`], [`or`],
/// [`not`], and [`having`].
pub fn cond(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Condition {
    Condition::basic(field, operator, value)
}

/// `WHERE field operator value`, AND-ed with the conditions before it.
pub fn where_(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> QueryOption {
    QueryOption::Where(Condition::basic(field, operator, value))
}

/// Appends an arbitrary condition.
#[must_use]
pub fn where_condition(condition: Condition) -> QueryOption {
    QueryOption::Where(condition)
}

/// Appends one AND group.
pub fn and(conditions: impl IntoIterator<Item = Condition>) -> QueryOption {
    QueryOption::Where(Condition::and(conditions))
}

/// Appends one OR group.
pub fn or(conditions: impl IntoIterator<Item = Condition>) -> QueryOption {
    QueryOption::Where(Condition::or(conditions))
}

/// Appends a negated condition.
#[must_use]
pub fn not(condition: Condition) -> QueryOption {
    QueryOption::Where(Condition::not(condition))
}

/// Appends an ORDER BY term.
pub fn order_by(field: impl Into<String>, direction: SortDirection) -> QueryOption {
    QueryOption::OrderBy(Order::new(field, direction))
}

/// Appends an ascending ORDER BY term.
pub fn asc(field: impl Into<String>) -> QueryOption {
    order_by(field, SortDirection::Asc)
}

/// Appends a descending ORDER BY term.
pub fn desc(field: impl Into<String>) -> QueryOption {
    order_by(field, SortDirection::Desc)
}

/// Sets the row limit.
#[must_use]
pub fn limit(n: u64) -> QueryOption {
    QueryOption::Limit(n)
}

/// Sets the row offset.
#[must_use]
pub fn offset(n: u64) -> QueryOption {
    QueryOption::Offset(n)
}

/// Appends projected fields.
pub fn select<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> QueryOption {
    QueryOption::Select(fields.into_iter().map(Into::into).collect())
}

/// Appends GROUP BY fields.
pub fn group_by<S: Into<String>>(fields: impl IntoIterator<Item = S>) -> QueryOption {
    QueryOption::GroupBy(fields.into_iter().map(Into::into).collect())
}

/// Appends a HAVING condition.
#[must_use]
pub fn having(condition: Condition) -> QueryOption {
    QueryOption::Having(condition)
}

/// Removes duplicate rows.
#[must_use]
pub fn distinct() -> QueryOption {
    QueryOption::Distinct(true)
}

/// Sets the row-lock mode.
#[must_use]
pub fn lock(mode: LockMode) -> QueryOption {
    QueryOption::Lock(mode)
}

/// Eager-loads a relation.
pub fn preload(relation: impl Into<String>) -> QueryOption {
    QueryOption::Preload(relation.into())
}

/// Appends a join without an alias.
pub fn join(kind: JoinKind, target: impl Into<String>, on: impl Into<String>) -> QueryOption {
    QueryOption::Join(Join {
        kind,
        target: target.into(),
        on: on.into(),
        alias: None,
    })
}

/// Appends an aliased join.
pub fn join_as(
    kind: JoinKind,
    target: impl Into<String>,
    on: impl Into<String>,
    alias: impl Into<String>,
) -> QueryOption {
    QueryOption::Join(Join {
        kind,
        target: target.into(),
        on: on.into(),
        alias: Some(alias.into()),
    })
}

/// `EXISTS (<source>)`.
pub fn exists_subquery(source: impl Into<SubQuerySource>, args: Vec<Value>) -> Result<QueryOption> {
    SubQuery::exists(source, args).map(bind)
}

/// `NOT EXISTS (<source>)`.
pub fn not_exists_subquery(
    source: impl Into<SubQuerySource>,
    args: Vec<Value>,
) -> Result<QueryOption> {
    SubQuery::not_exists(source, args).map(bind)
}

/// `field IN (<source>)`.
pub fn in_subquery(
    field: impl Into<String>,
    source: impl Into<SubQuerySource>,
    args: Vec<Value>,
) -> Result<QueryOption> {
    SubQuery::in_(field, source, args).map(bind)
}

/// `field NOT IN (<source>)`.
pub fn not_in_subquery(
    field: impl Into<String>,
    source: impl Into<SubQuerySource>,
    args: Vec<Value>,
) -> Result<QueryOption> {
    SubQuery::not_in(field, source, args).map(bind)
}

/// `field <op> (<source>)` against a scalar subquery.
pub fn where_subquery(
    field: impl Into<String>,
    operator: Operator,
    source: impl Into<SubQuerySource>,
    args: Vec<Value>,
) -> Result<QueryOption> {
    SubQuery::scalar(field, operator, source, args).map(bind)
}

/// A correlated subquery; see [`SubQuery::correlated`].
pub fn correlated_subquery(
    field: Option<&str>,
    operator: Operator,
    source: impl Into<SubQuerySource>,
    args: Vec<Value>,
) -> Result<QueryOption> {
    SubQuery::correlated(field, operator, source, args).map(bind)
}

fn bind(subquery: SubQuery) -> QueryOption {
    QueryOption::Where(Condition::subquery(subquery))
}
