//! Relational dialects: placeholder style, identifier quoting, and the
//! per-dialect operator and clause capability tables.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use quarry_common::{Error, Result};
use quarry_core::{JoinKind, LiteralEscapes, LockMode, Operator};
use regex::Regex;
use serde::{Deserialize, Serialize};

/// `COUNT(x)`, `SUM(DISTINCT x)`, `MAX(*)` ... as used in GROUP BY / HAVING.
static AGGREGATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(COUNT|SUM|AVG|MIN|MAX)\s*\(\s*(DISTINCT\s+)?([^()]*?)\s*\)\s*$")
        .expect("aggregate pattern is valid")
});

/// A relational SQL dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// PostgreSQL: `$1, $2, ...` placeholders, `"ident"` quoting.
    #[default]
    Postgres,
    /// MySQL: `?` placeholders, `` `ident` `` quoting.
    MySql,
    /// SQLite: `?` placeholders, `"ident"` quoting.
    Sqlite,
}

impl Dialect {
    /// Every dialect.
    pub const ALL: [Dialect; 3] = [Self::Postgres, Self::MySql, Self::Sqlite];

    /// Returns the dialect name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::MySql => "mysql",
            Self::Sqlite => "sqlite",
        }
    }

    /// Appends the placeholder for the 1-based argument `index`.
    pub fn write_placeholder(self, out: &mut String, index: usize) {
        match self {
            Self::Postgres => {
                out.push('$');
                out.push_str(&index.to_string());
            }
            Self::MySql | Self::Sqlite => out.push('?'),
        }
    }

    /// Maps an operator in a basic condition to its SQL keyword.
    ///
    /// `None` means the dialect cannot express the operator; the compiler
    /// fails rather than guessing.
    #[must_use]
    pub const fn operator_sql(self, operator: Operator) -> Option<&'static str> {
        match (self, operator) {
            (_, Operator::Eq) => Some("="),
            (_, Operator::Ne) => Some("<>"),
            (_, Operator::Gt) => Some(">"),
            (_, Operator::Gte) => Some(">="),
            (_, Operator::Lt) => Some("<"),
            (_, Operator::Lte) => Some("<="),
            (_, Operator::Like) => Some("LIKE"),
            (_, Operator::NotLike) => Some("NOT LIKE"),
            (_, Operator::In) => Some("IN"),
            (_, Operator::NotIn) => Some("NOT IN"),
            (_, Operator::IsNull) => Some("IS NULL"),
            (_, Operator::IsNotNull) => Some("IS NOT NULL"),
            (_, Operator::Between) => Some("BETWEEN"),
            (_, Operator::NotBetween) => Some("NOT BETWEEN"),
            (Self::Postgres, Operator::Regex) => Some("~"),
            (Self::MySql, Operator::Regex) => Some("REGEXP"),
            (Self::Sqlite, Operator::Regex) => None,
            (_, Operator::Near) => None,
            // only valid against a subquery
            (_, Operator::Exists | Operator::NotExists) => None,
        }
    }

    /// Returns true if the dialect supports the join kind.
    #[must_use]
    pub const fn supports_join(self, kind: JoinKind) -> bool {
        !matches!((self, kind), (Self::MySql, JoinKind::Full))
    }

    /// Returns the row-lock clause, or `None` if the dialect has no row locks.
    #[must_use]
    pub const fn lock_clause(self, mode: LockMode) -> Option<&'static str> {
        match self {
            Self::Sqlite => None,
            Self::Postgres | Self::MySql => mode.clause(),
        }
    }

    /// Renders LIMIT and OFFSET clauses.
    ///
    /// MySQL and SQLite cannot express OFFSET without LIMIT, so an unbounded
    /// limit is synthesized.
    #[must_use]
    pub fn limit_offset(self, limit: Option<u64>, offset: Option<u64>) -> (Option<String>, Option<String>) {
        let limit = match (limit, offset, self) {
            (Some(n), _, _) => Some(format!("LIMIT {n}")),
            (None, Some(_), Self::MySql) => Some(format!("LIMIT {}", u64::MAX)),
            (None, Some(_), Self::Sqlite) => Some("LIMIT -1".to_string()),
            (None, _, _) => None,
        };
        (limit, offset.map(|n| format!("OFFSET {n}")))
    }

    /// Quotes an identifier.
    ///
    /// Dotted paths are quoted per segment, `*` stays bare, and aggregate
    /// calls (`COUNT(x)`, `SUM(DISTINCT x)`) keep the function and quote the
    /// argument.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifier`] for empty names, empty path
    /// segments, and names containing control characters.
    pub fn quote_identifier(self, ident: &str) -> Result<String> {
        if let Some(caps) = AGGREGATE.captures(ident) {
            let function = caps[1].to_ascii_uppercase();
            let distinct = if caps.get(2).is_some() { "DISTINCT " } else { "" };
            let inner = caps[3].trim();
            if inner.is_empty() {
                return Err(Error::InvalidIdentifier(ident.to_string()));
            }
            return Ok(format!("{function}({distinct}{})", self.quote_path(inner)?));
        }
        self.quote_path(ident)
    }

    fn quote_path(self, ident: &str) -> Result<String> {
        let ident = ident.trim();
        if ident.is_empty() || ident.chars().any(char::is_control) {
            return Err(Error::InvalidIdentifier(ident.to_string()));
        }

        let mut quoted = String::with_capacity(ident.len() + 4);
        for (i, segment) in ident.split('.').enumerate() {
            if i > 0 {
                quoted.push('.');
            }
            if segment.is_empty() {
                return Err(Error::InvalidIdentifier(ident.to_string()));
            }
            if segment == "*" {
                quoted.push('*');
                continue;
            }
            let q = self.quote_char();
            quoted.push(q);
            for c in segment.chars() {
                if c == q {
                    quoted.push(q);
                }
                quoted.push(c);
            }
            quoted.push(q);
        }
        Ok(quoted)
    }

    const fn quote_char(self) -> char {
        match self {
            Self::MySql => '`',
            Self::Postgres | Self::Sqlite => '"',
        }
    }

    /// Returns how quoted literals escape their quote in this dialect.
    #[must_use]
    pub const fn literal_escapes(self) -> LiteralEscapes {
        match self {
            Self::MySql => LiteralEscapes::Backslash,
            Self::Postgres | Self::Sqlite => LiteralEscapes::Standard,
        }
    }

    /// Counts placeholders in compiled text, skipping quoted literals and
    /// quoted identifiers.
    ///
    /// Returns `None` if a quote is left open.
    #[must_use]
    pub fn count_placeholders(self, text: &str) -> Option<usize> {
        let bytes = text.as_bytes();
        let mut count = 0;
        let mut quote: Option<u8> = None;
        let mut i = 0;

        while i < bytes.len() {
            let byte = bytes[i];
            match quote {
                Some(q)
                    if self.literal_escapes() == LiteralEscapes::Backslash
                        && q != b'`'
                        && byte == b'\\' =>
                {
                    i += 1;
                }
                Some(q) if byte == q => quote = None,
                Some(_) => {}
                None => match (self, byte) {
                    (_, b'\'' | b'"' | b'`') => quote = Some(byte),
                    (Self::Postgres, b'$') if bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {
                        count += 1;
                        while bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
                            i += 1;
                        }
                    }
                    (Self::MySql | Self::Sqlite, b'?') => count += 1,
                    _ => {}
                },
            }
            i += 1;
        }

        if quote.is_some() { None } else { Some(count) }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "mysql" | "mariadb" => Ok(Self::MySql),
            "sqlite" | "sqlite3" => Ok(Self::Sqlite),
            other => Err(Error::unsupported_clause(
                format!("dialect {other:?}"),
                "sql compiler",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier_per_dialect() {
        assert_eq!(Dialect::Postgres.quote_identifier("name").unwrap(), "\"name\"");
        assert_eq!(Dialect::MySql.quote_identifier("name").unwrap(), "`name`");
        assert_eq!(
            Dialect::Sqlite.quote_identifier("users.id").unwrap(),
            "\"users\".\"id\""
        );
        assert_eq!(Dialect::Postgres.quote_identifier("u.*").unwrap(), "\"u\".*");
    }

    #[test]
    fn test_quote_escapes_embedded_quotes() {
        assert_eq!(
            Dialect::Postgres.quote_identifier("we\"ird").unwrap(),
            "\"we\"\"ird\""
        );
        assert_eq!(Dialect::MySql.quote_identifier("we`ird").unwrap(), "`we``ird`");
    }

    #[test]
    fn test_quote_aggregates() {
        assert_eq!(
            Dialect::Postgres.quote_identifier("count(*)").unwrap(),
            "COUNT(*)"
        );
        assert_eq!(
            Dialect::MySql.quote_identifier("SUM(DISTINCT o.amount)").unwrap(),
            "SUM(DISTINCT `o`.`amount`)"
        );
    }

    #[test]
    fn test_reject_bad_identifiers() {
        for bad in ["", "  ", "a..b", "bad\0name", "line\nbreak", "COUNT()"] {
            assert!(
                matches!(
                    Dialect::Postgres.quote_identifier(bad),
                    Err(Error::InvalidIdentifier(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_placeholders() {
        let mut out = String::new();
        Dialect::Postgres.write_placeholder(&mut out, 12);
        Dialect::MySql.write_placeholder(&mut out, 3);
        assert_eq!(out, "$12?");
    }

    #[test]
    fn test_count_placeholders_skips_quotes() {
        assert_eq!(
            Dialect::Postgres.count_placeholders("\"a$1\" = $1 AND b = '$2' AND c IN ($10, $11)"),
            Some(3)
        );
        assert_eq!(
            Dialect::Sqlite.count_placeholders("\"a?\" = ? AND b = '?'"),
            Some(1)
        );
        assert_eq!(Dialect::MySql.count_placeholders("'open"), None);
    }

    #[test]
    fn test_capability_tables() {
        assert_eq!(Dialect::Postgres.operator_sql(Operator::Regex), Some("~"));
        assert_eq!(Dialect::MySql.operator_sql(Operator::Regex), Some("REGEXP"));
        assert_eq!(Dialect::Sqlite.operator_sql(Operator::Regex), None);
        for dialect in Dialect::ALL {
            assert_eq!(dialect.operator_sql(Operator::Near), None);
            assert_eq!(dialect.operator_sql(Operator::Exists), None);
        }
        assert!(!Dialect::MySql.supports_join(JoinKind::Full));
        assert_eq!(Dialect::Sqlite.lock_clause(LockMode::ForUpdate), None);
    }

    #[test]
    fn test_limit_offset() {
        assert_eq!(
            Dialect::Postgres.limit_offset(None, Some(5)),
            (None, Some("OFFSET 5".to_string()))
        );
        assert_eq!(
            Dialect::Sqlite.limit_offset(None, Some(5)).0.as_deref(),
            Some("LIMIT -1")
        );
        assert_eq!(
            Dialect::MySql.limit_offset(Some(10), None),
            (Some("LIMIT 10".to_string()), None)
        );
    }

    #[test]
    fn test_parse_dialect() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("sqlite3".parse::<Dialect>().unwrap(), Dialect::Sqlite);
        assert!("oracle".parse::<Dialect>().is_err());
    }
}
