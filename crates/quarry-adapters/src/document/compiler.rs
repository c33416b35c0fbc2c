//! Query AST to document filter trees.

use quarry_common::{Error, Result, Value};
use quarry_core::{Condition, LockMode, Logic, Operator, Query, QueryCompiler, SortDirection};
use serde_json::{Map, Value as Json, json};

use super::command::{FindCommand, UnsupportedClausePolicy};

const BACKEND: &str = "document";

/// Compiles a query with the default [`UnsupportedClausePolicy::Reject`] policy.
///
/// # Errors
///
/// Returns an error if the query uses an operator or clause with no document
/// mapping, or if an operand does not fit its operator.
pub fn compile(query: &Query) -> Result<FindCommand> {
    DocumentCompiler::default().compile(query)
}

/// Maps an operator in a basic condition to its filter key.
///
/// `None` means there is no document mapping. `LIKE` and `NOT LIKE` compile
/// through `$regex`; `BETWEEN` opens with `$gte` and closes with `$lte`.
#[must_use]
pub const fn operator_key(operator: Operator) -> Option<&'static str> {
    match operator {
        Operator::Eq | Operator::IsNull => Some("$eq"),
        Operator::Ne | Operator::IsNotNull => Some("$ne"),
        Operator::Gt => Some("$gt"),
        Operator::Gte | Operator::Between | Operator::NotBetween => Some("$gte"),
        Operator::Lt => Some("$lt"),
        Operator::Lte => Some("$lte"),
        Operator::In => Some("$in"),
        Operator::NotIn => Some("$nin"),
        Operator::Like | Operator::NotLike | Operator::Regex => Some("$regex"),
        Operator::Near => Some("$near"),
        Operator::Exists | Operator::NotExists => None,
    }
}

/// Translates a SQL `LIKE` pattern into an anchored regular expression.
///
/// `%` matches any run, `_` one character, and `\` escapes the next character.
#[must_use]
pub fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');
    let mut chars = pattern.chars();
    let mut buf = [0u8; 4];
    while let Some(c) = chars.next() {
        match c {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    regex.push_str(&regex::escape(escaped.encode_utf8(&mut buf)));
                }
            }
            other => regex.push_str(&regex::escape(other.encode_utf8(&mut buf))),
        }
    }
    regex.push('$');
    regex
}

/// Document compiler. Holds only its clause policy; share freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentCompiler {
    policy: UnsupportedClausePolicy,
}

impl DocumentCompiler {
    /// Creates a compiler that rejects unsupported clauses.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            policy: UnsupportedClausePolicy::Reject,
        }
    }

    /// Sets the unsupported-clause policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: UnsupportedClausePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the unsupported-clause policy.
    #[must_use]
    pub const fn policy(&self) -> UnsupportedClausePolicy {
        self.policy
    }

    fn unsupported(&self, clause: &str, present: bool, ignored: &mut Vec<String>) -> Result<()> {
        if !present {
            return Ok(());
        }
        match self.policy {
            UnsupportedClausePolicy::Reject => Err(Error::unsupported_clause(clause, BACKEND)),
            UnsupportedClausePolicy::Ignore => {
                tracing::warn!(clause, backend = BACKEND, "ignoring clause with no document mapping");
                ignored.push(clause.to_string());
                Ok(())
            }
        }
    }

    fn filter(&self, conditions: &[Condition]) -> Result<Map<String, Json>> {
        match conditions {
            [] => Ok(Map::new()),
            [single] => self.condition(single),
            many => Ok(combine("$and", self.each(many)?)),
        }
    }

    fn each(&self, conditions: &[Condition]) -> Result<Vec<Json>> {
        conditions
            .iter()
            .map(|c| self.condition(c).map(Json::Object))
            .collect()
    }

    fn condition(&self, condition: &Condition) -> Result<Map<String, Json>> {
        match condition {
            Condition::Basic {
                field,
                operator,
                value,
            } => basic(field, *operator, value),
            // match everything / nothing, like 1=1 and 1=0
            Condition::Composite { children, logic } if children.is_empty() => Ok(match logic {
                Logic::And => Map::new(),
                Logic::Or => combine("$nor", vec![json!({})]),
            }),
            Condition::Composite { children, logic } => {
                let key = match logic {
                    Logic::And => "$and",
                    Logic::Or => "$or",
                };
                Ok(combine(key, self.each(children)?))
            }
            Condition::Not(inner) => Ok(combine("$nor", vec![Json::Object(self.condition(inner)?)])),
            Condition::SubQuery(subquery) => Err(Error::unsupported_operator(
                subquery.operator().symbol(),
                BACKEND,
            )),
        }
    }
}

fn combine(key: &str, children: Vec<Json>) -> Map<String, Json> {
    let mut doc = Map::new();
    doc.insert(key.to_string(), Json::Array(children));
    doc
}

fn single(field: &str, value: Json) -> Map<String, Json> {
    let mut doc = Map::new();
    doc.insert(field.to_string(), value);
    doc
}

fn keyed(key: &str, value: Json) -> Json {
    let mut doc = Map::new();
    doc.insert(key.to_string(), value);
    Json::Object(doc)
}

fn check_field(field: &str) -> Result<()> {
    if field.trim().is_empty() || field.starts_with('$') || field.chars().any(char::is_control) {
        return Err(Error::InvalidIdentifier(field.to_string()));
    }
    Ok(())
}

/// True if `value` holds NaN or an infinity anywhere, which JSON cannot carry.
fn has_non_finite(value: &Value) -> bool {
    match value {
        Value::Float64(f) => !f.is_finite(),
        Value::List(items) => items.iter().any(has_non_finite),
        _ => false,
    }
}

fn basic(field: &str, operator: Operator, value: &Value) -> Result<Map<String, Json>> {
    check_field(field)?;
    let key = operator_key(operator).ok_or_else(|| Error::unsupported_operator(operator.symbol(), BACKEND))?;
    let invalid = |reason: &str| Error::invalid_operand(field, operator.symbol(), reason);
    if has_non_finite(value) {
        return Err(invalid("non-finite float has no document form"));
    }
    let scalar = || {
        if value.as_list().is_some() {
            Err(invalid("expected a single value, got a list"))
        } else {
            Ok(value.to_json())
        }
    };
    let pattern = || {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| invalid("expected a string pattern"))
    };

    let doc = match operator {
        Operator::Eq => single(field, scalar()?),
        Operator::IsNull => single(field, Json::Null),
        Operator::IsNotNull => single(field, keyed(key, Json::Null)),
        Operator::Ne | Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
            if value.is_null() && operator != Operator::Ne {
                return Err(invalid("null cannot be ordered"));
            }
            single(field, keyed(key, scalar()?))
        }
        Operator::In | Operator::NotIn => {
            let items = value
                .as_list()
                .ok_or_else(|| invalid("expected a list of values"))?;
            single(field, keyed(key, Json::Array(items.iter().map(Value::to_json).collect())))
        }
        Operator::Like => single(field, keyed(key, Json::String(like_to_regex(&pattern()?)))),
        Operator::NotLike => single(
            field,
            keyed("$not", keyed(key, Json::String(like_to_regex(&pattern()?)))),
        ),
        Operator::Regex => single(field, keyed(key, Json::String(pattern()?))),
        Operator::Between | Operator::NotBetween => {
            let [low, high] = value.as_list().unwrap_or_default() else {
                return Err(invalid("expected a [low, high] pair"));
            };
            let mut range = Map::new();
            range.insert(key.to_string(), low.to_json());
            range.insert("$lte".to_string(), high.to_json());
            if operator == Operator::Between {
                single(field, Json::Object(range))
            } else {
                single(field, keyed("$not", Json::Object(range)))
            }
        }
        Operator::Near => {
            if value.is_null() {
                return Err(invalid("expected a point"));
            }
            single(field, keyed(key, value.to_json()))
        }
        Operator::Exists | Operator::NotExists => {
            return Err(Error::unsupported_operator(operator.symbol(), BACKEND));
        }
    };
    Ok(doc)
}

impl QueryCompiler for DocumentCompiler {
    type Output = FindCommand;

    fn backend(&self) -> &'static str {
        BACKEND
    }

    fn supports(&self, operator: Operator) -> bool {
        operator_key(operator).is_some()
    }

    fn compile(&self, query: &Query) -> Result<FindCommand> {
        let mut ignored = Vec::new();
        self.unsupported("join", !query.joins().is_empty(), &mut ignored)?;
        self.unsupported("lock", query.lock() != LockMode::None, &mut ignored)?;
        self.unsupported("group by", !query.groups().is_empty(), &mut ignored)?;
        self.unsupported("having", !query.having().is_empty(), &mut ignored)?;
        self.unsupported("distinct", query.is_distinct(), &mut ignored)?;
        // embedding is resolved by the document path itself
        ignored.extend(query.preloads().iter().map(|p| format!("preload {p}")));

        let filter = self.filter(query.conditions())?;

        let mut sort = Map::new();
        for order in query.orders() {
            check_field(&order.field)?;
            let direction = match order.direction {
                SortDirection::Asc => 1,
                SortDirection::Desc => -1,
            };
            // the first term for a field decides, as it does in ORDER BY
            sort.entry(order.field.clone()).or_insert(json!(direction));
        }

        let projection = if query.fields().is_empty() {
            None
        } else {
            let mut projection = Map::new();
            for field in query.fields() {
                check_field(field)?;
                projection.insert(field.clone(), json!(1));
            }
            Some(projection)
        };

        tracing::trace!(backend = BACKEND, ignored = ignored.len(), "compiled document query");

        Ok(FindCommand {
            filter,
            sort,
            projection,
            skip: query.offset(),
            limit: query.limit(),
            ignored,
        })
    }
}
