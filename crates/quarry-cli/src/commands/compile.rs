//! Compile command.

use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use quarry_adapters::document::{DocumentCompiler, FindCommand, UnsupportedClausePolicy};
use quarry_adapters::sql::{Dialect, SqlCompiler, SqlStatement};
use quarry_common::Value;
use quarry_core::{Query, QueryCompiler};
use serde::Serialize;

use crate::output::{self, Format};
use crate::spec::QuerySpec;
use crate::{Backend, OutputFormat};

/// A compiled query, ready to print.
#[derive(Serialize, Debug)]
#[serde(tag = "backend", rename_all = "lowercase")]
enum Compiled {
    Sql {
        dialect: Dialect,
        #[serde(flatten)]
        statement: SqlStatement,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        preloads: Vec<String>,
    },
    Document {
        collection: String,
        #[serde(flatten)]
        command: FindCommand,
    },
}

/// Reads a description from `input`, or stdin for `-`.
fn read_input(input: &Path) -> Result<String> {
    if input.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read query from stdin")?;
        Ok(text)
    } else {
        std::fs::read_to_string(input)
            .with_context(|| format!("failed to read {}", input.display()))
    }
}

fn compile_text(text: &str, backend: Backend, table: &str, ignore_unsupported: bool) -> Result<Compiled> {
    let spec = QuerySpec::from_json(text).context("invalid query description")?;
    let query = Query::build(&spec.to_options()?);
    tracing::debug!(?backend, conditions = query.conditions().len(), "compiling");

    let dialect = match backend {
        Backend::Postgres => Dialect::Postgres,
        Backend::Mysql => Dialect::MySql,
        Backend::Sqlite => Dialect::Sqlite,
        Backend::Document => {
            let policy = if ignore_unsupported {
                UnsupportedClausePolicy::Ignore
            } else {
                UnsupportedClausePolicy::Reject
            };
            let command = DocumentCompiler::new().with_policy(policy).compile(&query)?;
            return Ok(Compiled::Document {
                collection: table.to_string(),
                command,
            });
        }
    };

    let fragments = SqlCompiler::new(dialect).compile(&query)?;
    Ok(Compiled::Sql {
        dialect,
        statement: fragments.to_select(table)?,
        preloads: fragments.preloads().to_vec(),
    })
}

fn placeholder(dialect: Dialect, index: usize) -> String {
    let mut out = String::new();
    dialect.write_placeholder(&mut out, index);
    if out == "?" {
        format!("?{index}")
    } else {
        out
    }
}

fn describe(value: &Value) -> String {
    format!("{value} ({})", value.type_name())
}

/// Run the compile command.
pub fn run(
    input: &Path,
    backend: Backend,
    table: &str,
    ignore_unsupported: bool,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let text = read_input(input)?;
    let compiled = compile_text(&text, backend, table, ignore_unsupported)?;

    match Format::from(format) {
        Format::Json => output::print_json(&compiled, quiet)?,
        Format::Table => match &compiled {
            Compiled::Sql {
                dialect,
                statement,
                preloads,
            } => {
                let labels: Vec<String> = (1..=statement.args.len())
                    .map(|i| placeholder(*dialect, i))
                    .collect();
                let mut items = vec![("Dialect", dialect.to_string()), ("SQL", statement.sql.clone())];
                for (label, arg) in labels.iter().zip(&statement.args) {
                    items.push((label.as_str(), describe(arg)));
                }
                if !preloads.is_empty() {
                    items.push(("Preload", preloads.join(", ")));
                }
                output::print_key_value_table(&items, quiet);
            }
            Compiled::Document {
                collection,
                command,
            } => {
                let mut items = vec![
                    ("Collection", collection.clone()),
                    ("Filter", command.filter_document().to_string()),
                ];
                if !command.sort.is_empty() {
                    items.push(("Sort", serde_json::to_string(&command.sort)?));
                }
                if let Some(projection) = &command.projection {
                    items.push(("Projection", serde_json::to_string(projection)?));
                }
                if let Some(skip) = command.skip {
                    items.push(("Skip", skip.to_string()));
                }
                if let Some(limit) = command.limit {
                    items.push(("Limit", limit.to_string()));
                }
                output::print_key_value_table(&items, quiet);
                if !command.ignored.is_empty() {
                    output::status(&format!("Ignored: {}", command.ignored.join(", ")), quiet);
                }
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const QUERY: &str = r#"{
        "where": [
            {"field": "age", "op": ">", "value": 18},
            {"field": "status", "op": "=", "value": "active"}
        ],
        "order_by": [{"field": "age", "direction": "desc"}],
        "limit": 5
    }"#;

    #[test]
    fn test_compile_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(QUERY.as_bytes()).unwrap();

        let text = read_input(file.path()).unwrap();
        let Compiled::Sql { statement, .. } =
            compile_text(&text, Backend::Postgres, "users", false).unwrap()
        else {
            panic!("expected SQL output");
        };
        assert_eq!(
            statement.sql,
            r#"SELECT * FROM "users" WHERE "age" > $1 AND "status" = $2 ORDER BY "age" DESC LIMIT 5"#
        );
        assert_eq!(statement.args, vec![Value::from(18), Value::from("active")]);
    }

    #[test]
    fn test_compile_document_json_shape() {
        let compiled = compile_text(QUERY, Backend::Document, "users", false).unwrap();
        let json = serde_json::to_value(&compiled).unwrap();

        assert_eq!(json["backend"], "document");
        assert_eq!(json["collection"], "users");
        assert_eq!(
            json["filter"],
            serde_json::json!({"$and": [{"age": {"$gt": 18}}, {"status": "active"}]})
        );
        assert_eq!(json["sort"], serde_json::json!({"age": -1}));
        assert_eq!(json["limit"], 5);
    }

    #[test]
    fn test_document_policy_flag() {
        let text = r#"{"joins": [{"target": "orders", "on": "orders.user_id = users.id"}]}"#;
        assert!(compile_text(text, Backend::Document, "users", false).is_err());

        let Compiled::Document { command, .. } =
            compile_text(text, Backend::Document, "users", true).unwrap()
        else {
            panic!("expected document output");
        };
        assert_eq!(command.ignored, ["join"]);
    }

    #[test]
    fn test_missing_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        let err = read_input(&missing).unwrap_err();
        assert!(err.to_string().contains("nope.json"));
    }

    #[test]
    fn test_placeholder_labels() {
        assert_eq!(placeholder(Dialect::Postgres, 3), "$3");
        assert_eq!(placeholder(Dialect::Sqlite, 3), "?3");
    }
}
