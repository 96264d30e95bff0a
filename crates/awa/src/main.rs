//! awa - Requirements traceability between specs and code
//!
//! awa scans source files for `@awa-impl`, `@awa-test` and `@awa-component`
//! markers, parses the Markdown specs under `.awa/`, and reports how the two
//! line up.

use awa::{CheckArgs, TraceArgs, run_check, run_trace};
use clap::{Parser, Subcommand};
use owo_colors::OwoColorize;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "awa",
    version,
    about = "Requirements traceability between specs and code"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Subcommands
#[derive(Debug, Subcommand)]
enum Command {
    /// Check markers and specs for orphans, gaps and broken references
    #[command(visible_alias = "validate")]
    Check(CheckArgs),

    /// Resolve trace chains from IDs, a task file or a source file
    Trace(TraceArgs),
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("AWA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging();

    let result = std::env::current_dir()
        .map_err(eyre::Report::from)
        .and_then(|root| match &cli.command {
            Command::Check(args) => run_check(&root, args),
            Command::Trace(args) => run_trace(&root, args),
        });

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            ExitCode::from(2)
        }
    }
}
