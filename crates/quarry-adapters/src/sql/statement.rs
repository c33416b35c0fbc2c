//! Compiled SQL output.

use quarry_common::{Result, Value};
use serde::Serialize;

use super::dialect::Dialect;

/// Clause texts of one SELECT, without their keywords where noted.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub(crate) struct Clauses {
    pub(crate) distinct: bool,
    pub(crate) columns: String,
    pub(crate) joins: Vec<String>,
    pub(crate) where_clause: Option<String>,
    pub(crate) group_by: Option<String>,
    pub(crate) having: Option<String>,
    pub(crate) order_by: Option<String>,
    pub(crate) limit: Option<String>,
    pub(crate) offset: Option<String>,
    pub(crate) lock: Option<&'static str>,
}

impl Clauses {
    /// Writes `SELECT ... FROM <table> ...` into `out`. `table` is already quoted.
    pub(crate) fn assemble(&self, table: &str, out: &mut String) {
        out.push_str("SELECT ");
        if self.distinct {
            out.push_str("DISTINCT ");
        }
        out.push_str(&self.columns);
        out.push_str(" FROM ");
        out.push_str(table);
        for join in &self.joins {
            out.push(' ');
            out.push_str(join);
        }
        let keyed = [
            ("WHERE", &self.where_clause),
            ("GROUP BY", &self.group_by),
            ("HAVING", &self.having),
            ("ORDER BY", &self.order_by),
        ];
        for (keyword, clause) in keyed {
            if let Some(clause) = clause {
                out.push(' ');
                out.push_str(keyword);
                out.push(' ');
                out.push_str(clause);
            }
        }
        for clause in [&self.limit, &self.offset].into_iter().flatten() {
            out.push(' ');
            out.push_str(clause);
        }
        if let Some(lock) = self.lock {
            out.push(' ');
            out.push_str(lock);
        }
    }
}

/// Compiled clause fragments plus the ordered arguments.
///
/// Placeholders are numbered in statement order (joins, WHERE, HAVING), so
/// the fragments can be assembled into a SELECT without renumbering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlFragments {
    pub(crate) dialect: Dialect,
    #[serde(flatten)]
    pub(crate) clauses: Clauses,
    pub(crate) args: Vec<Value>,
    pub(crate) preloads: Vec<String>,
}

impl SqlFragments {
    /// Dialect the fragments were compiled for.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Whether `SELECT DISTINCT` is requested.
    #[must_use]
    pub fn is_distinct(&self) -> bool {
        self.clauses.distinct
    }

    /// Select list: quoted fields, or `*`.
    #[must_use]
    pub fn columns(&self) -> &str {
        &self.clauses.columns
    }

    /// JOIN clauses, each starting with its join keyword.
    #[must_use]
    pub fn joins(&self) -> &[String] {
        &self.clauses.joins
    }

    /// WHERE predicate, without the keyword.
    #[must_use]
    pub fn where_clause(&self) -> Option<&str> {
        self.clauses.where_clause.as_deref()
    }

    /// GROUP BY list, without the keyword.
    #[must_use]
    pub fn group_by(&self) -> Option<&str> {
        self.clauses.group_by.as_deref()
    }

    /// HAVING predicate, without the keyword.
    #[must_use]
    pub fn having(&self) -> Option<&str> {
        self.clauses.having.as_deref()
    }

    /// ORDER BY list, without the keyword.
    #[must_use]
    pub fn order_by(&self) -> Option<&str> {
        self.clauses.order_by.as_deref()
    }

    /// `LIMIT n` clause.
    #[must_use]
    pub fn limit(&self) -> Option<&str> {
        self.clauses.limit.as_deref()
    }

    /// `OFFSET n` clause.
    #[must_use]
    pub fn offset(&self) -> Option<&str> {
        self.clauses.offset.as_deref()
    }

    /// Row-lock clause.
    #[must_use]
    pub fn lock(&self) -> Option<&'static str> {
        self.clauses.lock
    }

    /// Arguments in placeholder order.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Relations the repository layer should eager-load after execution.
    #[must_use]
    pub fn preloads(&self) -> &[String] {
        &self.preloads
    }

    /// Assembles a full SELECT against `table`.
    ///
    /// # Errors
    ///
    /// Returns an error if `table` is not a valid identifier.
    pub fn to_select(&self, table: &str) -> Result<SqlStatement> {
        let table = self.dialect.quote_identifier(table)?;
        let mut sql = String::new();
        self.clauses.assemble(&table, &mut sql);
        Ok(SqlStatement {
            sql,
            args: self.args.clone(),
        })
    }
}

/// A complete SQL statement and its arguments.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SqlStatement {
    /// Statement text with dialect placeholders.
    pub sql: String,
    /// Arguments in placeholder order.
    pub args: Vec<Value>,
}
