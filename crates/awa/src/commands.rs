//! `check` and `trace` command implementations

use crate::config::{Settings, load_settings};
use crate::output::{
    OutputFormat, render_content_json, render_content_markdown, render_findings, render_list,
    render_trace_json, render_tree,
};
use awa_core::{
    ContentOptions, Direction, FindingCounts, TraceOptions, analyze, apply_token_budget,
    assemble_content, ids_from_source, ids_from_task, resolve_trace,
};
use eyre::{Result, WrapErr};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};

/// Options shared by every command
#[derive(Debug, Clone, Default, clap::Args)]
pub struct CommonArgs {
    /// Path to config file (default: .awa.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format: text or json
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Extra ignore pattern for both specs and code (repeatable)
    #[arg(long = "ignore", value_name = "PATTERN")]
    pub ignore: Vec<String>,
}

impl CommonArgs {
    fn settings(&self, root: &Path) -> Result<Settings> {
        let mut settings = load_settings(root, self.config.as_deref())?;
        if !self.ignore.is_empty() {
            settings.check = settings.check.with_ignore(self.ignore.iter().cloned());
        }
        if let Some(format) = self.format {
            settings.format = format;
        }
        Ok(settings)
    }
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct CheckArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Do not fail on warnings
    #[arg(long)]
    pub allow_warnings: bool,
}

#[derive(Debug, Clone, Default, clap::Args)]
pub struct TraceArgs {
    /// IDs to trace
    pub ids: Vec<String>,

    /// Trace the IDs a task file references
    #[arg(long, value_name = "FILE", conflicts_with_all = ["file", "all"])]
    pub task: Option<PathBuf>,

    /// Trace the IDs a source file's markers reference
    #[arg(long, value_name = "FILE", conflicts_with = "all")]
    pub file: Option<PathBuf>,

    /// Trace every known requirement
    #[arg(long)]
    pub all: bool,

    /// forward, reverse or both
    #[arg(long, default_value = "both")]
    pub direction: Direction,

    /// Maximum number of hops from each queried ID
    #[arg(long)]
    pub depth: Option<usize>,

    /// Keep only nodes whose ID starts with, or whose path contains, this token
    #[arg(long)]
    pub scope: Option<String>,

    /// Leave out implementation locations
    #[arg(long)]
    pub no_code: bool,

    /// Leave out test locations
    #[arg(long)]
    pub no_tests: bool,

    /// Print spec and code excerpts instead of the chain
    #[arg(long, conflicts_with = "list")]
    pub content: bool,

    /// Print unique file:line locations
    #[arg(long)]
    pub list: bool,

    /// Shorthand for --format json
    #[arg(long)]
    pub json: bool,

    /// Token budget for --content
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Code lines shown above each marker in --content
    #[arg(long, short = 'B', default_value_t = ContentOptions::default().before_context)]
    pub before_context: usize,

    /// Code lines shown below each marker in --content
    #[arg(long, short = 'A', default_value_t = ContentOptions::default().after_context)]
    pub after_context: usize,

    #[command(flatten)]
    pub common: CommonArgs,
}

/// Run a check and print the report. Returns the process exit code.
pub fn run_check(root: &Path, args: &CheckArgs) -> Result<u8> {
    let settings = args.common.settings(root)?;
    let config = &settings.check;
    let allow_warnings = args.allow_warnings || config.allow_warnings;

    eprintln!("{} Checking {}...", "->".blue().bold(), root.display());
    let analysis = analyze(root, config)?;
    eprintln!(
        "   Found {} markers and {} spec files",
        analysis.markers.markers.len().to_string().green(),
        analysis.specs.spec_files.len().to_string().green()
    );

    let findings = analysis.run_checks(root, config)?;
    print!("{}", render_findings(&findings, settings.format)?);

    let counts = FindingCounts::of(&findings);
    Ok(if counts.is_failing(allow_warnings) { 1 } else { 0 })
}

/// Resolve and print trace chains. Returns the process exit code.
pub fn run_trace(root: &Path, args: &TraceArgs) -> Result<u8> {
    let settings = args.common.settings(root)?;
    let config = &settings.check;
    let format = if args.json {
        OutputFormat::Json
    } else {
        settings.format
    };

    let analysis = analyze(root, config)?;

    let (ids, label) = if let Some(task) = &args.task {
        let text = std::fs::read_to_string(root.join(task))
            .wrap_err_with(|| format!("Failed to read task file {}", task.display()))?;
        (ids_from_task(&text), task.display().to_string())
    } else if let Some(file) = &args.file {
        let text = std::fs::read_to_string(root.join(file))
            .wrap_err_with(|| format!("Failed to read {}", file.display()))?;
        (ids_from_source(&text, &config.markers), file.display().to_string())
    } else if args.all {
        let ids: Vec<String> = analysis.index.requirement_ids.iter().cloned().collect();
        (ids, "all requirements".to_string())
    } else {
        (args.ids.clone(), args.ids.join(", "))
    };

    if ids.is_empty() {
        eprintln!("{} No IDs to trace", "!".yellow().bold());
        return Ok(1);
    }

    let options = TraceOptions {
        direction: args.direction,
        depth: args.depth,
        scope: args.scope.clone(),
        no_code: args.no_code,
        no_tests: args.no_tests,
    };
    let result = resolve_trace(&analysis.index, &ids, &options);
    for id in &result.not_found {
        eprintln!("{} ID not found: {}", "!".yellow().bold(), id.red());
    }

    if args.content {
        let content_options = ContentOptions {
            before_context: args.before_context,
            after_context: args.after_context,
        };
        let sections = assemble_content(root, &result.chains, &content_options);
        let budget = apply_token_budget(sections, args.max_tokens.unwrap_or(usize::MAX / 4));
        match format {
            OutputFormat::Json => println!("{}", render_content_json(&label, &budget)?),
            OutputFormat::Text => print!("{}", render_content_markdown(&label, &budget)),
        }
    } else if args.list {
        print!("{}", render_list(&result));
    } else {
        match format {
            OutputFormat::Json => println!("{}", render_trace_json(&result)?),
            OutputFormat::Text => print!("{}", render_tree(&result)),
        }
    }

    Ok(if result.chains.is_empty() { 1 } else { 0 })
}
