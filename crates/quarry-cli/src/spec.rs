//! JSON query descriptions.
//!
//! ```json
//! {
//!   "select": ["id", "name"],
//!   "where": [
//!     {"field": "age", "op": ">", "value": 18},
//!     {"or": [{"field": "name", "op": "LIKE", "value": "%a%"},
//!             {"field": "email", "op": "is_null"}]},
//!     {"subquery": {"kind": "in", "field": "id",
//!                   "sql": "SELECT user_id FROM orders WHERE total > ?", "args": [100]}}
//!   ],
//!   "order_by": [{"field": "created_at", "direction": "desc"}],
//!   "limit": 20
//! }
//! ```

use quarry_common::Value;
use quarry_core::options;
use quarry_core::{Condition, Join, JoinKind, LockMode, Operator, Order, QueryOption, SortDirection, SubQuery};
use serde::Deserialize;
use thiserror::Error;

/// Problems turning a description into query options.
#[derive(Error, Debug)]
pub enum SpecError {
    /// The operator name is not in the vocabulary.
    #[error("unknown operator {0:?}")]
    UnknownOperator(String),

    /// A JSON value has no query value equivalent.
    #[error("unsupported value for {field}: {value}")]
    UnsupportedValue {
        /// Field the value belongs to.
        field: String,
        /// The offending JSON.
        value: serde_json::Value,
    },

    /// A subquery description is missing a part its kind needs.
    #[error("subquery of kind {kind:?} needs {needs}")]
    IncompleteSubQuery {
        /// Subquery kind as written.
        kind: String,
        /// The missing part.
        needs: &'static str,
    },

    /// The query itself was rejected.
    #[error(transparent)]
    Query(#[from] quarry_common::Error),
}

/// A whole query description.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QuerySpec {
    pub select: Vec<String>,
    #[serde(rename = "where")]
    pub conditions: Vec<ConditionSpec>,
    pub joins: Vec<JoinSpec>,
    pub group_by: Vec<String>,
    pub having: Vec<ConditionSpec>,
    pub order_by: Vec<OrderSpec>,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
    pub distinct: bool,
    pub lock: Option<LockSpec>,
    pub preload: Vec<String>,
}

/// One condition: basic, combinator, negation, or subquery.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ConditionSpec {
    And {
        and: Vec<ConditionSpec>,
    },
    Or {
        or: Vec<ConditionSpec>,
    },
    Not {
        not: Box<ConditionSpec>,
    },
    SubQuery {
        subquery: SubQuerySpec,
    },
    Basic {
        field: String,
        op: String,
        #[serde(default)]
        value: serde_json::Value,
    },
}

/// An embedded query over caller-written SQL text.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubQuerySpec {
    /// `exists`, `not_exists`, `in`, `not_in`, `scalar`, or `correlated`.
    pub kind: String,
    #[serde(default)]
    pub field: Option<String>,
    #[serde(default)]
    pub op: Option<String>,
    pub sql: String,
    #[serde(default)]
    pub args: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinSpec {
    #[serde(default)]
    pub kind: JoinKindSpec,
    pub target: String,
    #[serde(default)]
    pub on: String,
    #[serde(default)]
    pub alias: Option<String>,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKindSpec {
    #[default]
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderSpec {
    pub field: String,
    #[serde(default)]
    pub direction: DirectionSpec,
}

#[derive(Debug, Default, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DirectionSpec {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockSpec {
    ForUpdate,
    ForShare,
}

impl QuerySpec {
    /// Parses a description.
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// Converts the description into options, in clause order.
    pub fn to_options(&self) -> Result<Vec<QueryOption>, SpecError> {
        let mut out = Vec::new();
        if !self.select.is_empty() {
            out.push(options::select(self.select.iter().cloned()));
        }
        for join in &self.joins {
            let kind = match join.kind {
                JoinKindSpec::Inner => JoinKind::Inner,
                JoinKindSpec::Left => JoinKind::Left,
                JoinKindSpec::Right => JoinKind::Right,
                JoinKindSpec::Full => JoinKind::Full,
                JoinKindSpec::Cross => JoinKind::Cross,
            };
            out.push(QueryOption::Join(Join {
                kind,
                target: join.target.clone(),
                on: join.on.clone(),
                alias: join.alias.clone(),
            }));
        }
        for condition in &self.conditions {
            out.push(options::where_condition(condition.to_condition()?));
        }
        if !self.group_by.is_empty() {
            out.push(options::group_by(self.group_by.iter().cloned()));
        }
        for condition in &self.having {
            out.push(options::having(condition.to_condition()?));
        }
        for order in &self.order_by {
            let direction = match order.direction {
                DirectionSpec::Asc => SortDirection::Asc,
                DirectionSpec::Desc => SortDirection::Desc,
            };
            out.push(QueryOption::OrderBy(Order::new(order.field.clone(), direction)));
        }
        if let Some(n) = self.limit {
            out.push(options::limit(n));
        }
        if let Some(n) = self.offset {
            out.push(options::offset(n));
        }
        if self.distinct {
            out.push(options::distinct());
        }
        if let Some(lock) = self.lock {
            out.push(options::lock(match lock {
                LockSpec::ForUpdate => LockMode::ForUpdate,
                LockSpec::ForShare => LockMode::ForShare,
            }));
        }
        for relation in &self.preload {
            out.push(options::preload(relation.clone()));
        }
        Ok(out)
    }
}

fn operator(name: &str) -> Result<Operator, SpecError> {
    name.parse()
        .map_err(|_| SpecError::UnknownOperator(name.to_string()))
}

fn value(field: &str, json: &serde_json::Value) -> Result<Value, SpecError> {
    Value::from_json(json).ok_or_else(|| SpecError::UnsupportedValue {
        field: field.to_string(),
        value: json.clone(),
    })
}

impl ConditionSpec {
    /// Converts the description into a condition.
    pub fn to_condition(&self) -> Result<Condition, SpecError> {
        Ok(match self {
            Self::Basic { field, op, value: v } => {
                Condition::basic(field.clone(), operator(op)?, value(field, v)?)
            }
            Self::And { and } => Condition::and(
                and.iter()
                    .map(Self::to_condition)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Self::Or { or } => Condition::or(
                or.iter()
                    .map(Self::to_condition)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            Self::Not { not } => Condition::not(not.to_condition()?),
            Self::SubQuery { subquery } => Condition::subquery(subquery.to_subquery()?),
        })
    }
}

impl SubQuerySpec {
    fn to_subquery(&self) -> Result<SubQuery, SpecError> {
        let args = self
            .args
            .iter()
            .map(|a| value("subquery", a))
            .collect::<Result<Vec<_>, _>>()?;
        let sql = self.sql.as_str();
        let field = || {
            self.field.clone().ok_or_else(|| SpecError::IncompleteSubQuery {
                kind: self.kind.clone(),
                needs: "a field",
            })
        };
        let op = || {
            self.op
                .as_deref()
                .ok_or_else(|| SpecError::IncompleteSubQuery {
                    kind: self.kind.clone(),
                    needs: "an op",
                })
                .and_then(operator)
        };

        let subquery = match self.kind.to_ascii_lowercase().replace(' ', "_").as_str() {
            "exists" => SubQuery::exists(sql, args)?,
            "not_exists" => SubQuery::not_exists(sql, args)?,
            "in" => SubQuery::in_(field()?, sql, args)?,
            "not_in" => SubQuery::not_in(field()?, sql, args)?,
            "scalar" => SubQuery::scalar(field()?, op()?, sql, args)?,
            "correlated" => SubQuery::correlated(self.field.as_deref(), op()?, sql, args)?,
            _ => {
                return Err(SpecError::IncompleteSubQuery {
                    kind: self.kind.clone(),
                    needs: "one of exists, not_exists, in, not_in, scalar, correlated",
                });
            }
        };
        Ok(subquery)
    }
}
