//! Subqueries embedded in EXISTS, IN, and scalar comparison positions.
//!
//! A [`SubQuery`] is validated when it is constructed: a missing outer field,
//! missing query text, or a placeholder count that disagrees with the bound
//! arguments is reported immediately, never at compile or execution time.
//!
//! Embedded query text uses `?` as the portable placeholder marker. Markers
//! inside quoted literals (`'...'`, `"..."`, `` `...` ``) are not placeholders.

use std::fmt;

use quarry_common::{Error, Result, Value};
use smallvec::SmallVec;

use crate::operator::Operator;
use crate::query::Query;

/// The rendering template a subquery uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubQueryKind {
    /// `EXISTS (<query>)`
    Exists,
    /// `NOT EXISTS (<query>)`
    NotExists,
    /// `<field> IN (<query>)`
    In,
    /// `<field> NOT IN (<query>)`
    NotIn,
    /// `<field> <op> (<query>)`
    Scalar,
    /// Scalar or EXISTS shape, depending on the bound operator; the embedded
    /// query references the outer row.
    Correlated,
}

impl SubQueryKind {
    /// Returns a lowercase name for errors.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Exists => "exists",
            Self::NotExists => "not exists",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Scalar => "scalar",
            Self::Correlated => "correlated",
        }
    }
}

/// Where the embedded query comes from.
#[derive(Debug, Clone)]
pub enum SubQuerySource {
    /// Caller-written query text with `?` placeholder markers.
    ///
    /// Arity is checked with standard SQL literal rules when the subquery is
    /// built. Dialects with backslash escapes re-scan at compile time and
    /// reject text whose marker count changes under their rules.
    Text(String),
    /// A nested query AST selecting from `table`, compiled recursively.
    Select {
        /// Table or collection the nested query reads.
        table: String,
        /// The nested query.
        query: Box<Query>,
    },
}

impl SubQuerySource {
    /// Creates a nested-AST source.
    pub fn select(table: impl Into<String>, query: Query) -> Self {
        Self::Select {
            table: table.into(),
            query: Box::new(query),
        }
    }
}

impl From<&str> for SubQuerySource {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for SubQuerySource {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl fmt::Display for SubQuerySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text.trim()),
            Self::Select { table, query } => {
                if query.fields().is_empty() {
                    write!(f, "SELECT * FROM {table}")?;
                } else {
                    write!(f, "SELECT {} FROM {table}", query.fields().join(", "))?;
                }
                if !query.conditions().is_empty() {
                    write!(f, " WHERE ")?;
                    for (i, condition) in query.conditions().iter().enumerate() {
                        if i > 0 {
                            write!(f, " AND ")?;
                        }
                        write!(f, "{condition}")?;
                    }
                }
                Ok(())
            }
        }
    }
}

/// An embedded query bound into a condition.
#[derive(Debug, Clone)]
pub struct SubQuery {
    source: SubQuerySource,
    args: Vec<Value>,
    kind: SubQueryKind,
    field: Option<String>,
    operator: Option<Operator>,
    correlated: bool,
}

impl SubQuery {
    /// `EXISTS (<source>)`.
    pub fn exists(source: impl Into<SubQuerySource>, args: Vec<Value>) -> Result<Self> {
        Self::new(SubQueryKind::Exists, None, None, source.into(), args)
    }

    /// `NOT EXISTS (<source>)`.
    pub fn not_exists(source: impl Into<SubQuerySource>, args: Vec<Value>) -> Result<Self> {
        Self::new(SubQueryKind::NotExists, None, None, source.into(), args)
    }

    /// `<field> IN (<source>)`.
    pub fn in_(
        field: impl Into<String>,
        source: impl Into<SubQuerySource>,
        args: Vec<Value>,
    ) -> Result<Self> {
        Self::new(
            SubQueryKind::In,
            Some(field.into()),
            None,
            source.into(),
            args,
        )
    }

    /// `<field> NOT IN (<source>)`.
    pub fn not_in(
        field: impl Into<String>,
        source: impl Into<SubQuerySource>,
        args: Vec<Value>,
    ) -> Result<Self> {
        Self::new(
            SubQueryKind::NotIn,
            Some(field.into()),
            None,
            source.into(),
            args,
        )
    }

    /// `<field> <op> (<source>)` where `op` is a comparison operator.
    pub fn scalar(
        field: impl Into<String>,
        operator: Operator,
        source: impl Into<SubQuerySource>,
        args: Vec<Value>,
    ) -> Result<Self> {
        Self::new(
            SubQueryKind::Scalar,
            Some(field.into()),
            Some(operator),
            source.into(),
            args,
        )
    }

    /// A correlated subquery.
    ///
    /// With a comparison operator it renders as `<field> <op> (<source>)` and
    /// requires `field`; with `EXISTS`/`NOT EXISTS` it renders in EXISTS shape
    /// and must not bind a field.
    pub fn correlated(
        field: Option<&str>,
        operator: Operator,
        source: impl Into<SubQuerySource>,
        args: Vec<Value>,
    ) -> Result<Self> {
        Self::new(
            SubQueryKind::Correlated,
            field.map(str::to_string),
            Some(operator),
            source.into(),
            args,
        )
    }

    fn new(
        kind: SubQueryKind,
        field: Option<String>,
        operator: Option<Operator>,
        source: SubQuerySource,
        args: Vec<Value>,
    ) -> Result<Self> {
        let subquery = Self {
            source,
            args,
            kind,
            field,
            operator,
            correlated: kind == SubQueryKind::Correlated,
        };
        subquery.validate()?;
        Ok(subquery)
    }

    fn validate(&self) -> Result<()> {
        let malformed = |reason: &str| Error::malformed_subquery(self.kind.name(), reason);

        match &self.source {
            SubQuerySource::Text(text) => {
                if text.trim().is_empty() {
                    return Err(malformed("missing embedded query text"));
                }
                let markers = placeholder_positions(text)
                    .ok_or_else(|| malformed("unterminated quoted literal in query text"))?;
                if markers.len() != self.args.len() {
                    return Err(malformed(&format!(
                        "query text has {} placeholders but {} arguments were given",
                        markers.len(),
                        self.args.len()
                    )));
                }
            }
            SubQuerySource::Select { table, query } => {
                if table.trim().is_empty() {
                    return Err(malformed("missing table for nested query"));
                }
                if !self.args.is_empty() {
                    return Err(malformed("a nested query carries its own arguments"));
                }
                if !query.subqueries_consistent() {
                    return Err(Error::Internal(
                        "nested query subquery list diverged from its conditions".to_string(),
                    ));
                }
            }
        }

        let has_field = self.field.as_deref().is_some_and(|f| !f.trim().is_empty());
        match self.kind {
            SubQueryKind::Exists | SubQueryKind::NotExists => {}
            SubQueryKind::In | SubQueryKind::NotIn => {
                if !has_field {
                    return Err(malformed("missing outer field"));
                }
            }
            SubQueryKind::Scalar => {
                if !has_field {
                    return Err(malformed("missing outer field"));
                }
                match self.operator {
                    Some(op) if op.is_comparison() => {}
                    Some(op) => {
                        return Err(malformed(&format!(
                            "operator {op} cannot compare against a scalar subquery"
                        )));
                    }
                    None => return Err(malformed("missing comparison operator")),
                }
            }
            SubQueryKind::Correlated => match self.operator {
                Some(op) if op.is_comparison() => {
                    if !has_field {
                        return Err(malformed("missing outer field"));
                    }
                }
                Some(op) if op.is_subquery_only() => {
                    if self.field.is_some() {
                        return Err(malformed(&format!(
                            "{op}-shaped subquery does not bind an outer field"
                        )));
                    }
                }
                Some(op) => {
                    return Err(malformed(&format!(
                        "operator {op} cannot bind a correlated subquery"
                    )));
                }
                None => return Err(malformed("missing operator")),
            },
        }
        Ok(())
    }

    /// Returns the embedded query source.
    #[must_use]
    pub fn source(&self) -> &SubQuerySource {
        &self.source
    }

    /// Returns the positional arguments of a text source.
    #[must_use]
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Returns the subquery kind.
    #[must_use]
    pub fn kind(&self) -> SubQueryKind {
        self.kind
    }

    /// Returns the bound outer field, if any.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Returns true if the embedded query references the outer row.
    #[must_use]
    pub fn is_correlated(&self) -> bool {
        self.correlated
    }

    /// Returns the operator this subquery renders with.
    #[must_use]
    pub fn operator(&self) -> Operator {
        match self.kind {
            SubQueryKind::Exists => Operator::Exists,
            SubQueryKind::NotExists => Operator::NotExists,
            SubQueryKind::In => Operator::In,
            SubQueryKind::NotIn => Operator::NotIn,
            // validated at construction
            SubQueryKind::Scalar | SubQueryKind::Correlated => {
                self.operator.unwrap_or(Operator::Eq)
            }
        }
    }

    /// Returns the outer field when the rendered template has one.
    ///
    /// EXISTS-shaped subqueries (including correlated EXISTS) have none.
    #[must_use]
    pub fn bound_field(&self) -> Option<&str> {
        if self.operator().is_subquery_only() {
            None
        } else {
            self.field()
        }
    }
}

impl fmt::Display for SubQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.bound_field() {
            Some(field) => write!(f, "{field} {} ({})", self.operator(), self.source),
            None => write!(f, "{} ({})", self.operator(), self.source),
        }
    }
}

/// How a quoted literal escapes its own quote character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LiteralEscapes {
    /// Standard SQL: only a doubled quote (`'it''s'`) escapes.
    #[default]
    Standard,
    /// MySQL: a backslash also escapes the next character inside `'...'` and
    /// `"..."` (`'it\'s'`). Backtick identifiers keep standard rules.
    Backslash,
}

/// Returns the byte offsets of `?` placeholder markers outside quoted literals,
/// using standard SQL literal rules.
///
/// Returns `None` if a quoted literal is left unterminated.
#[must_use]
pub fn placeholder_positions(text: &str) -> Option<SmallVec<[usize; 4]>> {
    placeholder_positions_with(text, LiteralEscapes::Standard)
}

/// Like [`placeholder_positions`], with explicit literal escape rules.
#[must_use]
pub fn placeholder_positions_with(
    text: &str,
    escapes: LiteralEscapes,
) -> Option<SmallVec<[usize; 4]>> {
    let mut positions = SmallVec::new();
    let mut quote: Option<u8> = None;
    let mut bytes = text.as_bytes().iter().enumerate();

    while let Some((i, &byte)) = bytes.next() {
        match quote {
            Some(q) if escapes == LiteralEscapes::Backslash && q != b'`' && byte == b'\\' => {
                bytes.next();
            }
            // a doubled quote closes and reopens, which handles '' escapes
            Some(q) if byte == q => quote = None,
            Some(_) => {}
            None => match byte {
                b'\'' | b'"' | b'`' => quote = Some(byte),
                b'?' => positions.push(i),
                _ => {}
            },
        }
    }

    if quote.is_some() { None } else { Some(positions) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholder_positions_skip_literals() {
        let positions =
            placeholder_positions("SELECT id FROM t WHERE a = ? AND b = '?' AND c = 'it''s ?' AND d = ?")
                .unwrap();
        assert_eq!(positions.len(), 2);
    }

    #[test]
    fn test_backslash_escapes_hide_markers() {
        let text = r"SELECT id FROM t WHERE a = 'x\'?\'' AND b = ?";
        assert_eq!(placeholder_positions(text).unwrap().len(), 2);
        assert_eq!(
            placeholder_positions_with(text, LiteralEscapes::Backslash)
                .unwrap()
                .len(),
            1
        );
        // backticks never take backslash escapes
        assert_eq!(
            placeholder_positions_with(r"SELECT `a\` FROM t WHERE b = ?", LiteralEscapes::Backslash)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_unterminated_literal() {
        assert!(placeholder_positions("SELECT 'oops").is_none());
        let err = SubQuery::exists("SELECT 'oops", vec![]).unwrap_err();
        assert!(matches!(err, Error::MalformedSubQuery { .. }));
    }

    #[test]
    fn test_in_requires_field() {
        let err = SubQuery::in_("", "SELECT id FROM t", vec![]).unwrap_err();
        assert_eq!(
            err,
            Error::malformed_subquery("in", "missing outer field")
        );
    }

    #[test]
    fn test_missing_text() {
        let err = SubQuery::not_exists("   ", vec![]).unwrap_err();
        assert!(err.to_string().contains("missing embedded query text"));
    }

    #[test]
    fn test_argument_count_checked_at_construction() {
        let err = SubQuery::in_("user_id", "SELECT id FROM t WHERE status = ?", vec![])
            .unwrap_err();
        assert!(err.to_string().contains("1 placeholders but 0 arguments"));
    }

    #[test]
    fn test_scalar_needs_comparison() {
        assert!(SubQuery::scalar("age", Operator::Like, "SELECT 1", vec![]).is_err());
        let sq = SubQuery::scalar("age", Operator::Gt, "SELECT AVG(age) FROM users", vec![])
            .unwrap();
        assert_eq!(sq.to_string(), "age > (SELECT AVG(age) FROM users)");
    }

    #[test]
    fn test_correlated_shapes() {
        let exists = SubQuery::correlated(
            None,
            Operator::Exists,
            "SELECT 1 FROM orders o WHERE o.user_id = users.id",
            vec![],
        )
        .unwrap();
        assert!(exists.is_correlated());
        assert_eq!(exists.bound_field(), None);
        assert!(exists.to_string().starts_with("EXISTS ("));

        let scalar = SubQuery::correlated(
            Some("balance"),
            Operator::Gte,
            "SELECT SUM(amount) FROM orders o WHERE o.user_id = users.id",
            vec![],
        )
        .unwrap();
        assert_eq!(scalar.bound_field(), Some("balance"));

        assert!(
            SubQuery::correlated(None, Operator::Gte, "SELECT 1", vec![]).is_err()
        );
        assert!(
            SubQuery::correlated(Some("x"), Operator::Exists, "SELECT 1", vec![]).is_err()
        );
    }

    #[test]
    fn test_nested_select_rejects_external_args() {
        let err = SubQuery::in_(
            "user_id",
            SubQuerySource::select("orders", Query::new()),
            vec![Value::from(1)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::MalformedSubQuery { .. }));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Piece {
            Word(String),
            Marker,
            Literal(String),
        }

        fn piece() -> impl Strategy<Value = Piece> {
            prop_oneof![
                "[a-z =<>]{1,6}".prop_map(Piece::Word),
                Just(Piece::Marker),
                "[a-z ?]{0,5}".prop_map(Piece::Literal),
            ]
        }

        fn render(pieces: &[Piece]) -> String {
            let mut out = String::new();
            for p in pieces {
                match p {
                    Piece::Word(w) => out.push_str(w),
                    Piece::Marker => out.push('?'),
                    Piece::Literal(l) => {
                        out.push('\'');
                        out.push_str(l);
                        out.push('\'');
                    }
                }
                out.push(' ');
            }
            out
        }

        proptest! {
            #[test]
            fn markers_inside_literals_are_not_counted(pieces in prop::collection::vec(piece(), 0..16)) {
                let text = render(&pieces);
                let expected = pieces.iter().filter(|p| matches!(p, Piece::Marker)).count();
                let positions = placeholder_positions(&text).unwrap();
                prop_assert_eq!(positions.len(), expected);
                for &i in &positions {
                    prop_assert_eq!(text.as_bytes()[i], b'?');
                }
            }

            #[test]
            fn arity_is_checked_against_markers(markers in 0usize..6, args in 0usize..6) {
                let text = format!(
                    "SELECT id FROM t WHERE {}",
                    vec!["a = ?"; markers.max(1)].join(" AND ")
                );
                let values: Vec<Value> = (0..args as i64).map(Value::from).collect();
                let result = SubQuery::exists(text, values);
                prop_assert_eq!(result.is_ok(), markers.max(1) == args);
            }
        }
    }
}
