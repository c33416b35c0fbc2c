//! Compiled document-store find command.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// What the document compiler does with clauses it cannot express.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnsupportedClausePolicy {
    /// Fail with [`Error::UnsupportedClause`](quarry_common::Error::UnsupportedClause).
    #[default]
    Reject,
    /// Drop the clause, log a warning, and record it in [`FindCommand::ignored`].
    Ignore,
}

/// Filter, sort, projection, and pagination for a document-store find.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FindCommand {
    /// Filter document. Empty matches every document.
    pub filter: Map<String, Json>,
    /// Sort specification in declared order: `1` ascending, `-1` descending.
    pub sort: Map<String, Json>,
    /// Projection, or `None` for whole documents.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub projection: Option<Map<String, Json>>,
    /// Documents to skip.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip: Option<u64>,
    /// Maximum documents to return.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    /// Clauses present on the query that were not compiled.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored: Vec<String>,
}

impl FindCommand {
    /// Returns the filter as a JSON document.
    #[must_use]
    pub fn filter_document(&self) -> Json {
        Json::Object(self.filter.clone())
    }

    /// Returns true if `clause` was dropped during compilation.
    #[must_use]
    pub fn was_ignored(&self, clause: &str) -> bool {
        self.ignored.iter().any(|c| c == clause)
    }
}
