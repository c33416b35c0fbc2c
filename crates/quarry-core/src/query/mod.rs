//! The query accumulator.
//!
//! A [`Query`] is built once per logical call by applying [`QueryOption`]s in
//! call order, then handed read-only to a compiler. Its fields are private so
//! that every mutation goes through option application, which keeps the
//! subquery list in step with the condition trees.

mod clause;

use std::sync::Arc;

pub use clause::{Join, JoinKind, LockMode, Order, SortDirection};

use crate::condition::Condition;
use crate::options::QueryOption;
use crate::subquery::SubQuery;

/// A backend-agnostic query.
#[derive(Debug, Clone, Default)]
pub struct Query {
    conditions: Vec<Condition>,
    orders: Vec<Order>,
    limit: Option<u64>,
    offset: Option<u64>,
    fields: Vec<String>,
    joins: Vec<Join>,
    groups: Vec<String>,
    having: Vec<Condition>,
    distinct: bool,
    lock: LockMode,
    preloads: Vec<String>,
    subqueries: Vec<Arc<SubQuery>>,
}

impl Query {
    /// Creates an empty query (all rows, all fields).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a query by applying options in order.
    pub fn build<'a>(options: impl IntoIterator<Item = &'a QueryOption>) -> Self {
        let mut query = Self::new();
        for option in options {
            option.apply(&mut query);
        }
        query
    }

    /// Applies one option.
    pub fn apply(&mut self, option: &QueryOption) -> &mut Self {
        option.apply(self);
        self
    }

    /// Applies one option, builder style.
    #[must_use]
    pub fn with(mut self, option: QueryOption) -> Self {
        option.apply(&mut self);
        self
    }

    /// Top-level conditions, implicitly AND-ed.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// ORDER BY terms in declaration order.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Row limit.
    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Rows to skip.
    #[must_use]
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }

    /// Projection; empty means all fields.
    #[must_use]
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Joins in declaration order.
    #[must_use]
    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// GROUP BY fields.
    #[must_use]
    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    /// HAVING conditions, implicitly AND-ed.
    #[must_use]
    pub fn having(&self) -> &[Condition] {
        &self.having
    }

    /// Whether duplicate rows are removed.
    #[must_use]
    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// Row-lock mode.
    #[must_use]
    pub fn lock(&self) -> LockMode {
        self.lock
    }

    /// Relations to eager-load.
    #[must_use]
    pub fn preloads(&self) -> &[String] {
        &self.preloads
    }

    /// Every subquery bound into `conditions` or `having`, in append order.
    #[must_use]
    pub fn subqueries(&self) -> &[Arc<SubQuery>] {
        &self.subqueries
    }

    /// Checks that the subquery list matches the condition trees.
    ///
    /// The list must interleave, without gaps or extras, the depth-first
    /// subquery sequence of `conditions` with that of `having`.
    #[must_use]
    pub fn subqueries_consistent(&self) -> bool {
        let mut in_where = Vec::new();
        for condition in &self.conditions {
            condition.collect_subqueries(&mut in_where);
        }
        let mut in_having = Vec::new();
        for condition in &self.having {
            condition.collect_subqueries(&mut in_having);
        }

        let (mut w, mut h) = (0, 0);
        for entry in &self.subqueries {
            if in_where.get(w).is_some_and(|s| Arc::ptr_eq(s, entry)) {
                w += 1;
            } else if in_having.get(h).is_some_and(|s| Arc::ptr_eq(s, entry)) {
                h += 1;
            } else {
                return false;
            }
        }
        w == in_where.len() && h == in_having.len()
    }

    pub(crate) fn push_condition(&mut self, condition: Condition) {
        self.register_subqueries(&condition);
        self.conditions.push(condition);
    }

    pub(crate) fn push_having(&mut self, condition: Condition) {
        self.register_subqueries(&condition);
        self.having.push(condition);
    }

    fn register_subqueries(&mut self, condition: &Condition) {
        let mut found = Vec::new();
        condition.collect_subqueries(&mut found);
        self.subqueries.extend(found.into_iter().cloned());
    }

    pub(crate) fn push_order(&mut self, order: Order) {
        self.orders.push(order);
    }

    pub(crate) fn set_limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub(crate) fn set_offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    pub(crate) fn push_fields(&mut self, fields: &[String]) {
        self.fields.extend_from_slice(fields);
    }

    pub(crate) fn push_join(&mut self, join: Join) {
        self.joins.push(join);
    }

    pub(crate) fn push_groups(&mut self, groups: &[String]) {
        self.groups.extend_from_slice(groups);
    }

    pub(crate) fn set_distinct(&mut self, distinct: bool) {
        self.distinct = distinct;
    }

    pub(crate) fn set_lock(&mut self, lock: LockMode) {
        self.lock = lock;
    }

    pub(crate) fn push_preload(&mut self, relation: String) {
        self.preloads.push(relation);
    }

    /// Caps the row limit: a missing limit becomes `max`, a larger one is lowered.
    pub fn cap_limit(&mut self, max: u64) {
        self.limit = Some(self.limit.map_or(max, |limit| limit.min(max)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operator;
    use crate::options;
    use quarry_common::Value;

    #[test]
    fn test_where_calls_preserve_order() {
        let query = Query::new()
            .with(options::where_("age", Operator::Gt, 18))
            .with(options::where_("status", Operator::Eq, "active"))
            .with(options::where_("deleted_at", Operator::IsNull, Value::Null));

        let fields: Vec<_> = query.conditions().iter().filter_map(Condition::field).collect();
        assert_eq!(fields, ["age", "status", "deleted_at"]);
    }

    #[test]
    fn test_limit_offset_last_write_wins() {
        let query = Query::build(&[
            options::limit(10),
            options::offset(5),
            options::limit(25),
            options::offset(0),
        ]);
        assert_eq!(query.limit(), Some(25));
        assert_eq!(query.offset(), Some(0));
    }

    #[test]
    fn test_append_only_clauses() {
        let query = Query::build(&[
            options::asc("name"),
            options::desc("created_at"),
            options::group_by(["dept"]),
            options::group_by(["role"]),
            options::select(["id"]),
            options::select(["name"]),
            options::preload("Orders"),
            options::preload("Profile"),
        ]);
        assert_eq!(query.orders().len(), 2);
        assert_eq!(query.orders()[1].direction, SortDirection::Desc);
        assert_eq!(query.groups(), ["dept", "role"]);
        assert_eq!(query.fields(), ["id", "name"]);
        assert_eq!(query.preloads(), ["Orders", "Profile"]);
    }

    #[test]
    fn test_subqueries_tracked_with_conditions() {
        let query = Query::build(&[
            options::where_("a", Operator::Eq, 1),
            options::exists_subquery("SELECT 1 FROM t WHERE x = ?", vec![Value::from(2)]).unwrap(),
            options::and([
                options::cond("b", Operator::Eq, 3),
                Condition::subquery(
                    crate::SubQuery::in_("c", "SELECT c FROM u", vec![]).unwrap(),
                ),
            ]),
            options::having(Condition::subquery(
                crate::SubQuery::scalar("COUNT(*)", Operator::Gt, "SELECT 5", vec![]).unwrap(),
            )),
        ]);

        assert_eq!(query.subqueries().len(), 3);
        assert!(query.subqueries_consistent());
    }

    #[test]
    fn test_reused_option_builds_independent_queries() {
        let shared = options::in_subquery("user_id", "SELECT id FROM t WHERE s = ?", vec!["x".into()])
            .unwrap();
        let first = Query::build(&[shared.clone()]);
        let second = Query::build(&[shared.clone(), shared]);

        assert_eq!(first.subqueries().len(), 1);
        assert_eq!(second.subqueries().len(), 2);
        assert!(first.subqueries_consistent());
        assert!(second.subqueries_consistent());
    }

    #[test]
    fn test_cap_limit() {
        let mut unlimited = Query::new();
        unlimited.cap_limit(100);
        assert_eq!(unlimited.limit(), Some(100));

        let mut small = Query::new().with(options::limit(10));
        small.cap_limit(100);
        assert_eq!(small.limit(), Some(10));

        let mut large = Query::new().with(options::limit(1000));
        large.cap_limit(100);
        assert_eq!(large.limit(), Some(100));
    }
}
