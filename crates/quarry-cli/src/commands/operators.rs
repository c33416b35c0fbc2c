//! Operator capability matrix.

use anyhow::Result;
use comfy_table::Cell;
use quarry_adapters::document::DocumentCompiler;
use quarry_adapters::sql::{Dialect, SqlCompiler};
use quarry_core::{Operator, QueryCompiler};
use serde::Serialize;

use crate::OutputFormat;
use crate::output::{self, Format};

/// Support for one operator across backends.
#[derive(Serialize, Debug, PartialEq, Eq)]
struct OperatorSupport {
    operator: &'static str,
    postgres: bool,
    mysql: bool,
    sqlite: bool,
    document: bool,
    subquery_only: bool,
}

fn matrix() -> Vec<OperatorSupport> {
    let document = DocumentCompiler::new();
    Operator::ALL
        .iter()
        .map(|&op| OperatorSupport {
            operator: op.symbol(),
            postgres: SqlCompiler::new(Dialect::Postgres).supports(op),
            mysql: SqlCompiler::new(Dialect::MySql).supports(op),
            sqlite: SqlCompiler::new(Dialect::Sqlite).supports(op),
            document: document.supports(op),
            subquery_only: op.is_subquery_only(),
        })
        .collect()
}

/// Run the operators command.
pub fn run(format: OutputFormat, quiet: bool) -> Result<()> {
    let rows = matrix();
    match Format::from(format) {
        Format::Json => output::print_json(&rows, quiet)?,
        Format::Table => {
            if quiet {
                return Ok(());
            }
            let mut table = output::create_table();
            output::add_header(
                &mut table,
                &["Operator", "PostgreSQL", "MySQL", "SQLite", "Document"],
            );
            for row in &rows {
                if row.subquery_only {
                    table.add_row(vec![
                        Cell::new(row.operator),
                        Cell::new("subquery"),
                        Cell::new("subquery"),
                        Cell::new("subquery"),
                        output::capability_cell(false),
                    ]);
                    continue;
                }
                table.add_row(vec![
                    Cell::new(row.operator),
                    output::capability_cell(row.postgres),
                    output::capability_cell(row.mysql),
                    output::capability_cell(row.sqlite),
                    output::capability_cell(row.document),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}
