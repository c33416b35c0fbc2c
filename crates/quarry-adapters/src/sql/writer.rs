//! Placeholder/argument writer.
//!
//! The only way compiled SQL receives a value. Every call emits a placeholder
//! and appends its argument in one step, so text and arguments are produced by
//! the same linear pass and cannot drift apart.

use quarry_common::{Error, Result, Value};
use quarry_core::LiteralEscapes;
use quarry_core::subquery::placeholder_positions_with;

use super::dialect::Dialect;

/// Argument counts at a point in the pass.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Mark {
    args: usize,
    placeholders: usize,
}

/// Per-call writer. Never shared between compilations.
#[derive(Debug)]
pub(crate) struct ArgWriter {
    dialect: Dialect,
    args: Vec<Value>,
    placeholders: usize,
}

impl ArgWriter {
    pub(crate) fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            args: Vec::new(),
            placeholders: 0,
        }
    }

    /// Emits a placeholder into `out` and binds `value` to it.
    pub(crate) fn bind(&mut self, out: &mut String, value: Value) {
        self.args.push(value);
        self.placeholders += 1;
        self.dialect.write_placeholder(out, self.args.len());
    }

    /// Copies caller-written query text into `out`, replacing each `?` marker
    /// with a dialect placeholder bound to the matching argument.
    pub(crate) fn splice(&mut self, out: &mut String, text: &str, args: &[Value]) -> Result<()> {
        let escapes = self.dialect.literal_escapes();
        let positions = placeholder_positions_with(text, escapes).ok_or_else(|| {
            Error::malformed_subquery("text", "unterminated quoted literal in query text")
        })?;
        if positions.len() != args.len() && escapes == LiteralEscapes::Backslash {
            return Err(Error::malformed_subquery(
                "text",
                format!(
                    "query text has {} placeholders under {} escapes but {} arguments were given",
                    positions.len(),
                    self.dialect.name(),
                    args.len()
                ),
            ));
        }
        if positions.len() != args.len() {
            return Err(Error::ArgumentMisalignment {
                fragment: "subquery text".to_string(),
                placeholders: positions.len(),
                arguments: args.len(),
            });
        }

        let mut last = 0;
        for (position, arg) in positions.iter().zip(args) {
            out.push_str(&text[last..*position]);
            self.bind(out, arg.clone());
            last = position + 1;
        }
        out.push_str(&text[last..]);
        Ok(())
    }

    pub(crate) fn mark(&self) -> Mark {
        Mark {
            args: self.args.len(),
            placeholders: self.placeholders,
        }
    }

    /// Verifies that `text`, written since `since`, holds exactly as many
    /// placeholders as arguments were bound.
    pub(crate) fn check(&self, fragment: &str, text: &str, since: Mark) -> Result<()> {
        let arguments = self.args.len() - since.args;
        let emitted = self.placeholders - since.placeholders;
        let found = self.dialect.count_placeholders(text).ok_or_else(|| {
            Error::Internal(format!("unbalanced quotes in compiled {fragment}"))
        })?;

        if emitted != arguments || found != arguments {
            return Err(Error::ArgumentMisalignment {
                fragment: fragment.to_string(),
                placeholders: found.max(emitted),
                arguments,
            });
        }
        Ok(())
    }

    /// Verifies the whole pass and returns the arguments.
    pub(crate) fn finish(self) -> Result<Vec<Value>> {
        if self.placeholders != self.args.len() {
            return Err(Error::ArgumentMisalignment {
                fragment: "statement".to_string(),
                placeholders: self.placeholders,
                arguments: self.args.len(),
            });
        }
        Ok(self.args)
    }
}
