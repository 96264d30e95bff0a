//! Output formatting for findings, trace chains and assembled content

use awa_core::{
    BudgetResult, ContentSection, Finding, FindingCounts, Location, SectionKind, Severity,
    TraceNode, TraceResult, estimate_tokens,
};
use eyre::Result;
use owo_colors::OwoColorize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => eyre::bail!("unknown format '{other}' (expected text or json)"),
        }
    }
}

// ---------------------------------------------------------------------------
// Findings
// ---------------------------------------------------------------------------

/// Render check findings in the specified format
pub fn render_findings(findings: &[Finding], format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_findings_text(findings)),
        OutputFormat::Json => render_findings_json(findings),
    }
}

fn render_findings_text(findings: &[Finding]) -> String {
    let mut output = String::new();
    let counts = FindingCounts::of(findings);

    if findings.is_empty() {
        output.push_str(&format!("{} No findings\n", "✓".green().bold()));
        return output;
    }

    for severity in [Severity::Error, Severity::Warning] {
        let group: Vec<&Finding> = findings.iter().filter(|f| f.severity == severity).collect();
        if group.is_empty() {
            continue;
        }
        let header = match severity {
            Severity::Error => format!("{} Errors ({}):", "!".red().bold(), group.len()),
            Severity::Warning => format!("{} Warnings ({}):", "?".yellow().bold(), group.len()),
        };
        output.push_str(&header);
        output.push('\n');

        for finding in group {
            let bullet = match severity {
                Severity::Error => "-".red().to_string(),
                Severity::Warning => "-".yellow().to_string(),
            };
            let place = match (&finding.file_path, finding.line) {
                (Some(path), Some(line)) => format!("{}:{line} ", path.display()),
                (Some(path), None) => format!("{} ", path.display()),
                _ => String::new(),
            };
            output.push_str(&format!(
                "  {bullet} {}{} {}\n",
                place.dimmed(),
                format!("[{}]", finding.code).dimmed(),
                finding.message
            ));
        }
        output.push('\n');
    }

    output.push_str(&format!(
        "{} error(s), {} warning(s)\n",
        counts.errors, counts.warnings
    ));
    output
}

#[derive(Serialize)]
struct JsonFindings<'a> {
    findings: &'a [Finding],
    errors: usize,
    warnings: usize,
}

fn render_findings_json(findings: &[Finding]) -> Result<String> {
    let counts = FindingCounts::of(findings);
    let report = JsonFindings {
        findings,
        errors: counts.errors,
        warnings: counts.warnings,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

// ---------------------------------------------------------------------------
// Trace chains
// ---------------------------------------------------------------------------

/// Box-drawing tree, one block per chain, then a line per unresolved ID.
pub fn render_tree(result: &TraceResult) -> String {
    let mut output = String::new();

    for chain in &result.chains {
        output.push_str(&format!("{}\n", chain.query_id.cyan().bold()));

        let mut groups: Vec<(String, Vec<&TraceNode>)> = Vec::new();
        if let Some(requirement) = &chain.requirement {
            groups.push(("▲ Requirement".to_string(), vec![requirement]));
        }
        for (label, nodes) in [
            ("▼ Acceptance Criteria", &chain.acs),
            ("▼ Design", &chain.design_components),
            ("▼ Properties", &chain.properties),
            ("▼ Implementation", &chain.implementations),
            ("▼ Tests", &chain.tests),
        ] {
            if !nodes.is_empty() {
                groups.push((label.to_string(), nodes.iter().collect()));
            }
        }

        let group_count = groups.len();
        for (gi, (label, nodes)) in groups.into_iter().enumerate() {
            let last_group = gi + 1 == group_count;
            let (branch, indent) = if last_group {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            output.push_str(&format!("{branch}{}\n", label.bold()));

            let node_count = nodes.len();
            for (ni, node) in nodes.into_iter().enumerate() {
                let leaf = if ni + 1 == node_count {
                    "└── "
                } else {
                    "├── "
                };
                output.push_str(&format!("{indent}{leaf}{}\n", describe_node(node)));
            }
        }
        output.push('\n');
    }

    for id in &result.not_found {
        output.push_str(&format!("{} {id}: not found\n", "✗".red().bold()));
    }

    output
}

fn describe_node(node: &TraceNode) -> String {
    let mut text = node.id.clone();
    if let Some(meta) = &node.meta {
        text.push_str(": ");
        text.push_str(meta);
    }
    if let Some(location) = &node.location {
        text.push_str(&format!(" {}", format!("({location})").dimmed()));
    }
    text
}

/// Unique `path:line` entries of every located node, sorted by path then line.
pub fn render_list(result: &TraceResult) -> String {
    let locations: BTreeSet<&Location> = result
        .chains
        .iter()
        .flat_map(|chain| chain.nodes())
        .filter_map(|node| node.location.as_ref())
        .collect();

    let mut output = String::new();
    for location in locations {
        output.push_str(&location.to_string());
        output.push('\n');
    }
    output
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonNode<'a> {
    id: &'a str,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<&'a Path>,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<&'a str>,
}

impl<'a> From<&'a TraceNode> for JsonNode<'a> {
    fn from(node: &'a TraceNode) -> Self {
        Self {
            id: &node.id,
            kind: node.kind.as_str(),
            file_path: node.location.as_ref().map(|l| l.file_path.as_path()),
            line: node.location.as_ref().map(|l| l.line),
            title: node.meta.as_deref(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonChain<'a> {
    query_id: &'a str,
    requirement: Option<JsonNode<'a>>,
    acs: Vec<JsonNode<'a>>,
    design_components: Vec<JsonNode<'a>>,
    implementations: Vec<JsonNode<'a>>,
    tests: Vec<JsonNode<'a>>,
    properties: Vec<JsonNode<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonTrace<'a> {
    chains: Vec<JsonChain<'a>>,
    not_found: &'a [String],
}

fn nodes(list: &[TraceNode]) -> Vec<JsonNode<'_>> {
    list.iter().map(JsonNode::from).collect()
}

pub fn render_trace_json(result: &TraceResult) -> Result<String> {
    let report = JsonTrace {
        chains: result
            .chains
            .iter()
            .map(|chain| JsonChain {
                query_id: &chain.query_id,
                requirement: chain.requirement.as_ref().map(JsonNode::from),
                acs: nodes(&chain.acs),
                design_components: nodes(&chain.design_components),
                implementations: nodes(&chain.implementations),
                tests: nodes(&chain.tests),
                properties: nodes(&chain.properties),
            })
            .collect(),
        not_found: &result.not_found,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// Markdown context document: sections grouped by kind, provenance quoted,
/// code fenced.
pub fn render_content_markdown(label: &str, budget: &BudgetResult) -> String {
    let mut output = format!("# Context: {label}\n");
    let mut current: Option<SectionKind> = None;

    for section in &budget.sections {
        if current != Some(section.kind) {
            output.push_str(&format!("\n## {}\n", section.kind.title()));
            current = Some(section.kind);
        }
        output.push_str(&format!(
            "\n> From: {} (lines {}-{})\n\n",
            section.file_path.display(),
            section.start_line,
            section.end_line
        ));
        if section.kind.is_code() {
            output.push_str(&format!(
                "```{}\n{}\n```\n",
                fence_language(&section.file_path),
                section.content
            ));
        } else {
            output.push_str(&section.content);
            output.push('\n');
        }
    }

    if let Some(footer) = &budget.footer {
        output.push_str(&format!("\n---\n\n{footer}\n"));
    }
    output
}

fn fence_language(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonContent<'a> {
    query: &'a str,
    sections: &'a [ContentSection],
    estimated_tokens: usize,
    files_included: usize,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncation_message: Option<&'a str>,
}

pub fn render_content_json(label: &str, budget: &BudgetResult) -> Result<String> {
    let files: BTreeSet<&PathBuf> = budget.sections.iter().map(|s| &s.file_path).collect();
    let report = JsonContent {
        query: label,
        sections: &budget.sections,
        estimated_tokens: budget
            .sections
            .iter()
            .map(|s| estimate_tokens(&s.content))
            .sum(),
        files_included: files.len(),
        truncated: budget.truncated,
        truncation_message: budget.footer.as_deref(),
    };
    Ok(serde_json::to_string_pretty(&report)?)
}
