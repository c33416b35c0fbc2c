//! Query AST to parameterized SQL.
//!
//! A single linear pass walks the query in statement order (joins, WHERE,
//! GROUP BY, HAVING, ORDER BY) and writes every value through one
//! [`ArgWriter`], so placeholders and arguments line up by construction.
//! Each fragment is re-checked before it is returned.

use quarry_common::{Error, Result, Value};
use quarry_core::{
    Condition, JoinKind, LockMode, Logic, Operator, Query, QueryCompiler, SubQuery, SubQueryKind,
    SubQuerySource,
};

use super::dialect::Dialect;
use super::statement::{Clauses, SqlFragments};
use super::writer::ArgWriter;

/// Compiles a query for `dialect`.
///
/// # Errors
///
/// Returns an error if the query uses an operator, join kind, or lock mode
/// the dialect cannot express, or if an operand does not fit its operator.
pub fn compile(query: &Query, dialect: Dialect) -> Result<SqlFragments> {
    SqlCompiler::new(dialect).compile(query)
}

/// Relational compiler for one dialect. Stateless; share freely.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlCompiler {
    dialect: Dialect,
}

impl SqlCompiler {
    /// Creates a compiler for `dialect`.
    #[must_use]
    pub const fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    /// Returns the target dialect.
    #[must_use]
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn compile_clauses(&self, query: &Query, w: &mut ArgWriter) -> Result<Clauses> {
        if !query.subqueries_consistent() {
            return Err(Error::Internal(
                "subquery list diverged from the condition trees".to_string(),
            ));
        }

        let mut clauses = Clauses {
            distinct: query.is_distinct(),
            columns: self.columns(query.fields())?,
            ..Clauses::default()
        };

        for join in query.joins() {
            if !self.dialect.supports_join(join.kind) {
                return Err(Error::unsupported_clause(join.kind.keyword(), self.dialect.name()));
            }
            let mut text = format!(
                "{} {}",
                join.kind.keyword(),
                self.dialect.quote_identifier(&join.target)?
            );
            if let Some(alias) = &join.alias {
                text.push_str(" AS ");
                text.push_str(&self.dialect.quote_identifier(alias)?);
            }
            if join.kind != JoinKind::Cross {
                let on = join.on.trim();
                if on.is_empty() {
                    return Err(Error::invalid_operand(
                        &join.target,
                        join.kind.keyword(),
                        "missing join condition",
                    ));
                }
                // verbatim text; values belong in WHERE
                if self.dialect.count_placeholders(on) != Some(0) {
                    return Err(Error::invalid_operand(
                        &join.target,
                        join.kind.keyword(),
                        "join condition cannot bind placeholders",
                    ));
                }
                text.push_str(" ON ");
                text.push_str(on);
            }
            w.check("join", &text, w.mark())?;
            clauses.joins.push(text);
        }

        clauses.where_clause = self.predicate_list("where", query.conditions(), w)?;

        if !query.groups().is_empty() {
            let groups = query
                .groups()
                .iter()
                .map(|g| self.dialect.quote_identifier(g))
                .collect::<Result<Vec<_>>>()?;
            clauses.group_by = Some(groups.join(", "));
        }

        if !query.having().is_empty() {
            if query.groups().is_empty() {
                return Err(Error::unsupported_clause(
                    "having without group by",
                    self.dialect.name(),
                ));
            }
            clauses.having = self.predicate_list("having", query.having(), w)?;
        }

        if !query.orders().is_empty() {
            let orders = query
                .orders()
                .iter()
                .map(|o| {
                    Ok(format!(
                        "{} {}",
                        self.dialect.quote_identifier(&o.field)?,
                        o.direction.keyword()
                    ))
                })
                .collect::<Result<Vec<_>>>()?;
            clauses.order_by = Some(orders.join(", "));
        }

        (clauses.limit, clauses.offset) = self.dialect.limit_offset(query.limit(), query.offset());

        if query.lock() != LockMode::None {
            clauses.lock = Some(self.dialect.lock_clause(query.lock()).ok_or_else(|| {
                Error::unsupported_clause("row lock", self.dialect.name())
            })?);
        }

        Ok(clauses)
    }

    fn columns(&self, fields: &[String]) -> Result<String> {
        if fields.is_empty() {
            return Ok("*".to_string());
        }
        let quoted = fields
            .iter()
            .map(|f| self.dialect.quote_identifier(f))
            .collect::<Result<Vec<_>>>()?;
        Ok(quoted.join(", "))
    }

    /// Compiles an implicit AND chain, checking its placeholders.
    fn predicate_list(
        &self,
        fragment: &str,
        conditions: &[Condition],
        w: &mut ArgWriter,
    ) -> Result<Option<String>> {
        if conditions.is_empty() {
            return Ok(None);
        }
        let mark = w.mark();
        let mut out = String::new();
        for (i, condition) in conditions.iter().enumerate() {
            if i > 0 {
                out.push_str(" AND ");
            }
            self.write_condition(condition, &mut out, w)?;
        }
        w.check(fragment, &out, mark)?;
        Ok(Some(out))
    }

    fn write_condition(&self, condition: &Condition, out: &mut String, w: &mut ArgWriter) -> Result<()> {
        match condition {
            Condition::Basic {
                field,
                operator,
                value,
            } => self.write_basic(field, *operator, value, out, w),
            Condition::Composite { children, logic } => {
                if children.is_empty() {
                    out.push_str(match logic {
                        Logic::And => "1=1",
                        Logic::Or => "1=0",
                    });
                    return Ok(());
                }
                out.push('(');
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(' ');
                        out.push_str(logic.keyword());
                        out.push(' ');
                    }
                    self.write_condition(child, out, w)?;
                }
                out.push(')');
                Ok(())
            }
            Condition::Not(inner) => {
                out.push_str("NOT (");
                self.write_condition(inner, out, w)?;
                out.push(')');
                Ok(())
            }
            Condition::SubQuery(subquery) => self.write_subquery(subquery, out, w),
        }
    }

    fn write_basic(
        &self,
        field: &str,
        operator: Operator,
        value: &Value,
        out: &mut String,
        w: &mut ArgWriter,
    ) -> Result<()> {
        let keyword = self
            .dialect
            .operator_sql(operator)
            .ok_or_else(|| Error::unsupported_operator(operator.symbol(), self.dialect.name()))?;
        let column = self.dialect.quote_identifier(field)?;
        let invalid = |reason: &str| Error::invalid_operand(field, operator.symbol(), reason);

        match operator {
            Operator::Eq | Operator::Ne if value.is_null() => {
                out.push_str(&column);
                out.push_str(if operator == Operator::Eq {
                    " IS NULL"
                } else {
                    " IS NOT NULL"
                });
            }
            Operator::Eq
            | Operator::Ne
            | Operator::Gt
            | Operator::Gte
            | Operator::Lt
            | Operator::Lte
            | Operator::Like
            | Operator::NotLike
            | Operator::Regex => {
                if value.is_null() {
                    return Err(invalid("null cannot be compared; use IS NULL"));
                }
                if value.as_list().is_some() {
                    return Err(invalid("expected a single value, got a list"));
                }
                out.push_str(&column);
                out.push(' ');
                out.push_str(keyword);
                out.push(' ');
                w.bind(out, value.clone());
            }
            Operator::In | Operator::NotIn => {
                let items = value
                    .as_list()
                    .ok_or_else(|| invalid("expected a list of values"))?;
                if items.is_empty() {
                    // nothing is IN an empty set
                    out.push_str(if operator == Operator::In { "1=0" } else { "1=1" });
                    return Ok(());
                }
                out.push_str(&column);
                out.push(' ');
                out.push_str(keyword);
                out.push_str(" (");
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    w.bind(out, item.clone());
                }
                out.push(')');
            }
            Operator::IsNull | Operator::IsNotNull => {
                out.push_str(&column);
                out.push(' ');
                out.push_str(keyword);
            }
            Operator::Between | Operator::NotBetween => {
                let [low, high] = value.as_list().unwrap_or_default() else {
                    return Err(invalid("expected a [low, high] pair"));
                };
                out.push_str(&column);
                out.push(' ');
                out.push_str(keyword);
                out.push(' ');
                w.bind(out, low.clone());
                out.push_str(" AND ");
                w.bind(out, high.clone());
            }
            Operator::Exists | Operator::NotExists | Operator::Near => {
                return Err(Error::unsupported_operator(
                    operator.symbol(),
                    self.dialect.name(),
                ));
            }
        }
        Ok(())
    }

    fn write_subquery(&self, subquery: &SubQuery, out: &mut String, w: &mut ArgWriter) -> Result<()> {
        let operator = subquery.operator();
        match subquery.bound_field() {
            Some(field) => {
                let keyword = match subquery.kind() {
                    SubQueryKind::In => "IN",
                    SubQueryKind::NotIn => "NOT IN",
                    SubQueryKind::Scalar | SubQueryKind::Correlated => {
                        self.dialect.operator_sql(operator).ok_or_else(|| {
                            Error::unsupported_operator(operator.symbol(), self.dialect.name())
                        })?
                    }
                    SubQueryKind::Exists | SubQueryKind::NotExists => {
                        return Err(Error::Internal(
                            "EXISTS subquery bound to an outer field".to_string(),
                        ));
                    }
                };
                out.push_str(&self.dialect.quote_identifier(field)?);
                out.push(' ');
                out.push_str(keyword);
                out.push_str(" (");
            }
            None => {
                out.push_str(if operator == Operator::NotExists {
                    "NOT EXISTS ("
                } else {
                    "EXISTS ("
                });
            }
        }

        match subquery.source() {
            SubQuerySource::Text(text) => w.splice(out, text.trim(), subquery.args())?,
            SubQuerySource::Select { table, query } => {
                if query.lock() != LockMode::None {
                    return Err(Error::unsupported_clause(
                        "row lock in subquery",
                        self.dialect.name(),
                    ));
                }
                if !query.preloads().is_empty() {
                    return Err(Error::unsupported_clause(
                        "preload in subquery",
                        self.dialect.name(),
                    ));
                }
                let clauses = self.compile_clauses(query, w)?;
                clauses.assemble(&self.dialect.quote_identifier(table)?, out);
            }
        }
        out.push(')');
        Ok(())
    }
}

impl QueryCompiler for SqlCompiler {
    type Output = SqlFragments;

    fn backend(&self) -> &'static str {
        self.dialect.name()
    }

    fn supports(&self, operator: Operator) -> bool {
        self.dialect.operator_sql(operator).is_some()
    }

    fn compile(&self, query: &Query) -> Result<SqlFragments> {
        let mut writer = ArgWriter::new(self.dialect);
        let clauses = self.compile_clauses(query, &mut writer)?;
        let args = writer.finish()?;

        tracing::trace!(
            dialect = self.dialect.name(),
            args = args.len(),
            "compiled relational query"
        );

        Ok(SqlFragments {
            dialect: self.dialect,
            clauses,
            args,
            preloads: query.preloads().to_vec(),
        })
    }
}
