//! Predicate nodes of the query AST.

use std::fmt;
use std::sync::Arc;

use quarry_common::Value;

use crate::operator::{Logic, Operator};
use crate::subquery::SubQuery;

/// A predicate in the query AST.
///
/// Compilers match on this exhaustively; adding a variant is a compile error
/// everywhere it must be handled.
#[derive(Debug, Clone)]
pub enum Condition {
    /// `field operator value`.
    Basic {
        /// Field name.
        field: String,
        /// Comparison operator.
        operator: Operator,
        /// Operand. Lists carry `IN` members and `BETWEEN` bounds.
        value: Value,
    },
    /// An AND/OR group, rendered fully parenthesized.
    Composite {
        /// Child conditions in declaration order.
        children: Vec<Condition>,
        /// Combinator joining the children.
        logic: Logic,
    },
    /// Negation of a condition.
    Not(Box<Condition>),
    /// A condition bound to an embedded query.
    SubQuery(Arc<SubQuery>),
}

impl Condition {
    /// Creates a basic condition.
    pub fn basic(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self::Basic {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Creates an AND group.
    pub fn and(children: impl IntoIterator<Item = Condition>) -> Self {
        Self::Composite {
            children: children.into_iter().collect(),
            logic: Logic::And,
        }
    }

    /// Creates an OR group.
    pub fn or(children: impl IntoIterator<Item = Condition>) -> Self {
        Self::Composite {
            children: children.into_iter().collect(),
            logic: Logic::Or,
        }
    }

    /// Negates a condition.
    #[must_use]
    pub fn not(condition: Condition) -> Self {
        Self::Not(Box::new(condition))
    }

    /// Wraps a subquery.
    #[must_use]
    pub fn subquery(subquery: SubQuery) -> Self {
        Self::SubQuery(Arc::new(subquery))
    }

    /// Returns the field this condition constrains, where meaningful.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::Basic { field, .. } => Some(field),
            Self::SubQuery(subquery) => subquery.bound_field(),
            Self::Composite { .. } | Self::Not(_) => None,
        }
    }

    /// Returns the operator, where meaningful.
    #[must_use]
    pub fn operator(&self) -> Option<Operator> {
        match self {
            Self::Basic { operator, .. } => Some(*operator),
            Self::SubQuery(subquery) => Some(subquery.operator()),
            Self::Composite { .. } | Self::Not(_) => None,
        }
    }

    /// Returns the operand of a basic condition.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        match self {
            Self::Basic { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Appends every subquery in this tree, depth-first and left to right,
    /// which is the order their placeholders appear in compiled text.
    pub fn collect_subqueries<'a>(&'a self, out: &mut Vec<&'a Arc<SubQuery>>) {
        match self {
            Self::Basic { .. } => {}
            Self::Composite { children, .. } => {
                for child in children {
                    child.collect_subqueries(out);
                }
            }
            Self::Not(inner) => inner.collect_subqueries(out),
            Self::SubQuery(subquery) => out.push(subquery),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic {
                field,
                operator,
                value,
            } => {
                if operator.takes_value() {
                    write!(f, "{field} {operator} {value}")
                } else {
                    write!(f, "{field} {operator}")
                }
            }
            Self::Composite { children, logic } => {
                write!(f, "(")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {logic} ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, ")")
            }
            Self::Not(inner) => write!(f, "NOT ({inner})"),
            Self::SubQuery(subquery) => write!(f, "{subquery}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_accessors() {
        let cond = Condition::basic("age", Operator::Gt, 18);
        assert_eq!(cond.field(), Some("age"));
        assert_eq!(cond.operator(), Some(Operator::Gt));
        assert_eq!(cond.value(), Some(&Value::Int64(18)));
        assert_eq!(cond.to_string(), "age > 18");
    }

    #[test]
    fn test_composite_rendering_is_parenthesized() {
        let cond = Condition::or([
            Condition::basic("name", Operator::Like, "%Alice%"),
            Condition::and([
                Condition::basic("a", Operator::Eq, 1),
                Condition::basic("b", Operator::IsNull, Value::Null),
            ]),
        ]);
        assert_eq!(
            cond.to_string(),
            "(name LIKE '%Alice%' OR (a = 1 AND b IS NULL))"
        );
        assert_eq!(cond.field(), None);
        assert_eq!(cond.operator(), None);
    }

    #[test]
    fn test_subquery_accessors() {
        let sq = SubQuery::in_("user_id", "SELECT id FROM t WHERE status = ?", vec!["active".into()])
            .unwrap();
        let cond = Condition::subquery(sq);
        assert_eq!(cond.field(), Some("user_id"));
        assert_eq!(cond.operator(), Some(Operator::In));
        assert!(cond.value().is_none());
        assert_eq!(
            cond.to_string(),
            "user_id IN (SELECT id FROM t WHERE status = ?)"
        );
    }

    #[test]
    fn test_collect_subqueries_depth_first() {
        let first = Condition::subquery(SubQuery::exists("SELECT 1", vec![]).unwrap());
        let second = Condition::subquery(SubQuery::not_exists("SELECT 2", vec![]).unwrap());
        let tree = Condition::and([first, Condition::not(Condition::or([second]))]);

        let mut found = Vec::new();
        tree.collect_subqueries(&mut found);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].kind(), crate::SubQueryKind::Exists);
        assert_eq!(found[1].kind(), crate::SubQueryKind::NotExists);
    }
}
