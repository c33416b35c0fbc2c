//! Quarry CLI - compile JSON query descriptions and inspect backend support.
//!
//! Useful for checking what a query turns into on each backend before it is
//! wired into an application.

mod commands;
mod output;
mod spec;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Quarry query compiler.
///
/// Compiles a JSON query description to parameterized SQL or to a document
/// find command.
#[derive(Parser)]
#[command(name = "quarry")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Suppress info messages
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Enable verbose debug logging
    #[arg(long, short, global = true)]
    verbose: bool,
}

/// Output format options.
#[derive(Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// Machine-readable JSON format
    Json,
}

/// Compilation target.
#[derive(Clone, Copy, ValueEnum, PartialEq, Eq, Debug)]
enum Backend {
    /// PostgreSQL (`$1, $2, ...`)
    Postgres,
    /// MySQL (`?`)
    Mysql,
    /// SQLite (`?`)
    Sqlite,
    /// Document store filter
    Document,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Compile a JSON query description
    Compile {
        /// Query file, or `-` for stdin
        input: PathBuf,

        /// Target backend
        #[arg(long, short, default_value = "postgres")]
        backend: Backend,

        /// Table or collection name for the full statement
        #[arg(long, short, default_value = "t")]
        table: String,

        /// Drop clauses the document backend cannot express instead of failing
        #[arg(long)]
        ignore_unsupported: bool,
    },

    /// Show which operators each backend supports
    Operators,
}

fn main() {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    if cli.verbose {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else if !cli.quiet {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    let result = match cli.command {
        Commands::Compile {
            input,
            backend,
            table,
            ignore_unsupported,
        } => commands::compile::run(
            &input,
            backend,
            &table,
            ignore_unsupported,
            cli.format,
            cli.quiet,
        ),
        Commands::Operators => commands::operators::run(cli.format, cli.quiet),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}
