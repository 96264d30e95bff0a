//! Token budgeting for assembled content.
//!
//! Sections are kept greedily in priority order until the next one would not
//! fit. Token cost is estimated at four characters per token.

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Requirement,
    AcceptanceCriterion,
    Implementation,
    Design,
    Test,
    Property,
}

impl SectionKind {
    /// Budget priority; lower is kept first.
    pub fn priority(&self) -> u8 {
        match self {
            SectionKind::Requirement => 1,
            SectionKind::AcceptanceCriterion => 2,
            SectionKind::Implementation => 3,
            SectionKind::Design => 4,
            SectionKind::Test => 5,
            SectionKind::Property => 6,
        }
    }

    /// Heading used when rendering the section.
    pub fn title(&self) -> &'static str {
        match self {
            SectionKind::Requirement => "Requirement",
            SectionKind::AcceptanceCriterion => "Acceptance Criterion",
            SectionKind::Implementation => "Implementation",
            SectionKind::Design => "Design",
            SectionKind::Test => "Test",
            SectionKind::Property => "Property",
        }
    }

    /// Whether the section holds source code rather than Markdown prose.
    pub fn is_code(&self) -> bool {
        matches!(self, SectionKind::Implementation | SectionKind::Test)
    }
}

impl Display for SectionKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// A literal excerpt of a spec or source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentSection {
    #[serde(rename = "type")]
    pub kind: SectionKind,
    pub file_path: PathBuf,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    pub priority: u8,
}

impl ContentSection {
    pub fn new(
        kind: SectionKind,
        file_path: impl Into<PathBuf>,
        start_line: usize,
        end_line: usize,
        content: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            file_path: file_path.into(),
            start_line,
            end_line,
            content: content.into(),
            priority: kind.priority(),
        }
    }

    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.content)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetResult {
    pub sections: Vec<ContentSection>,
    pub truncated: bool,
    pub footer: Option<String>,
}

/// `ceil(chars / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

/// Keep sections, in priority order, while they fit into `max_tokens`.
///
/// Sections must already be sorted by priority. If even the first section is
/// too large it is cut to `max_tokens * 4` characters and kept alone.
pub fn apply_token_budget(sections: Vec<ContentSection>, max_tokens: usize) -> BudgetResult {
    if max_tokens == 0 {
        return BudgetResult {
            truncated: !sections.is_empty(),
            footer: footer(sections.len(), max_tokens),
            sections: Vec::new(),
        };
    }

    let total = sections.len();
    let mut kept = Vec::new();
    let mut used = 0;
    let mut cut = false;

    for mut section in sections {
        let cost = section.estimated_tokens();
        if used + cost <= max_tokens {
            used += cost;
            kept.push(section);
            continue;
        }
        if kept.is_empty() {
            section.content = section
                .content
                .chars()
                .take(max_tokens * CHARS_PER_TOKEN)
                .collect();
            kept.push(section);
            cut = true;
        }
        break;
    }

    let omitted = total - kept.len();
    BudgetResult {
        truncated: omitted > 0 || cut,
        footer: footer(omitted, max_tokens),
        sections: kept,
    }
}

fn footer(omitted: usize, max_tokens: usize) -> Option<String> {
    match omitted {
        0 => None,
        1 => Some(format!(
            "1 more section omitted (token budget: {max_tokens} tokens)"
        )),
        n => Some(format!(
            "{n} more sections omitted (token budget: {max_tokens} tokens)"
        )),
    }
}
