//! Markdown spec parsing.
//!
//! Spec documents are scanned line by line. Each line is classified once:
//!
//! ```markdown
//! ### DIFF-1: Compute diffs [MUST]          <- requirement heading
//! - [ ] DIFF-1_AC-1 [event]: WHEN ... THEN  <- acceptance criterion
//! - DIFF_P-1 [Determinism]: ...             <- correctness property
//!   VALIDATES: DIFF-1_AC-1                  <- cross-reference
//! ### DIFF-DiffEngine                       <- design component
//! IMPLEMENTS: DIFF-1_AC-1, DIFF-1_AC-2      <- cross-reference
//! ```
//!
//! The feature code of a file comes from its name (`REQ-DIFF-engine.md` ->
//! `DIFF`); files without one (overview documents) get an empty code.

use crate::collect::{collect_files, read_text};
use crate::config::CheckConfig;
use crate::ids;
use regex::Regex;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, info};

static REQUIREMENT_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^###\s+([A-Z][A-Z0-9]*-\d+(?:\.\d+)?):\s*(.*)$").expect("valid regex")
});

static AC_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-\s+\[[ xX]\]\s+([A-Z][A-Z0-9]*-\d+(?:\.\d+)?_AC-\d+)\s+(.*)$")
        .expect("valid regex")
});

static PROPERTY_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*-\s+([A-Z][A-Z0-9]*_P-\d+)\s+(.*)$").expect("valid regex")
});

static COMPONENT_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^###\s+([A-Z][A-Z0-9]*-[A-Za-z][A-Za-z0-9]*)\s*$").expect("valid regex")
});

static FEATURE_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:REQ|DESIGN|FEAT|EXAMPLES|API)-([A-Z][A-Z0-9]*)-").expect("valid regex")
});

/// A file location (1-indexed line).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub file_path: PathBuf,
    pub line: usize,
}

impl Location {
    pub fn new(file_path: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file_path: file_path.into(),
            line,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file_path.display(), self.line)
    }
}

/// What one spec line defines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Requirement { id: &'a str, title: &'a str },
    AcceptanceCriterion { id: &'a str, text: &'a str },
    Property { id: &'a str, text: &'a str },
    Component { name: &'a str },
    /// Any other heading; closes the enclosing component
    Heading,
    Other,
}

impl<'a> LineKind<'a> {
    /// Classify a line. Patterns are tried in a fixed order so a heading that
    /// could read as both a requirement and a component is a requirement.
    pub fn classify(line: &'a str) -> Self {
        if let Some(c) = REQUIREMENT_HEADING.captures(line) {
            return LineKind::Requirement {
                id: c.get(1).map_or("", |m| m.as_str()),
                title: c.get(2).map_or("", |m| m.as_str().trim()),
            };
        }
        if let Some(c) = AC_ITEM.captures(line) {
            return LineKind::AcceptanceCriterion {
                id: c.get(1).map_or("", |m| m.as_str()),
                text: c.get(2).map_or("", |m| m.as_str().trim()),
            };
        }
        if let Some(c) = PROPERTY_ITEM.captures(line) {
            return LineKind::Property {
                id: c.get(1).map_or("", |m| m.as_str()),
                text: c.get(2).map_or("", |m| m.as_str().trim()),
            };
        }
        if let Some(c) = COMPONENT_HEADING.captures(line) {
            return LineKind::Component {
                name: c.get(1).map_or("", |m| m.as_str()),
            };
        }
        if line.starts_with('#') {
            return LineKind::Heading;
        }
        LineKind::Other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CrossRefKind {
    Implements,
    Validates,
}

impl CrossRefKind {
    /// Patterns mentioning "implements" declare implementation; anything
    /// else declares validation.
    pub fn for_pattern(pattern: &str) -> Self {
        if pattern.to_lowercase().contains("implements") {
            CrossRefKind::Implements
        } else {
            CrossRefKind::Validates
        }
    }
}

/// An `IMPLEMENTS:`/`VALIDATES:` line and the IDs it lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrossReference {
    pub kind: CrossRefKind,
    pub ids: Vec<String>,
    pub file_path: PathBuf,
    pub line: usize,
    /// Component heading this line sits under, if any
    pub component: Option<String>,
    /// Property list item this line sits under, if any
    pub property: Option<String>,
}

/// Everything extracted from one spec document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecFile {
    pub file_path: PathBuf,
    /// Feature code from the file name; empty for non-feature documents
    pub code: String,
    pub requirement_ids: Vec<String>,
    pub ac_ids: Vec<String>,
    pub property_ids: Vec<String>,
    pub component_names: Vec<String>,
    pub cross_refs: Vec<CrossReference>,
    pub id_locations: BTreeMap<String, Location>,
    /// Heading or item text per defined ID
    pub titles: BTreeMap<String, String>,
    /// IDs defined more than once within this file
    pub duplicates: Vec<DuplicateId>,
}

/// An ID defined at more than one site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateId {
    pub id: String,
    pub first: Location,
    pub second: Location,
}

/// All spec files, with their definitions merged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecParseResult {
    pub requirement_ids: BTreeSet<String>,
    pub ac_ids: BTreeSet<String>,
    pub property_ids: BTreeSet<String>,
    pub component_names: BTreeSet<String>,
    pub all_ids: BTreeSet<String>,
    pub spec_files: Vec<SpecFile>,
    /// Definition site per ID; a later definition replaces an earlier one
    pub id_locations: BTreeMap<String, Location>,
    pub titles: BTreeMap<String, String>,
    pub duplicates: Vec<DuplicateId>,
}

impl SpecParseResult {
    /// Merge parsed files in order.
    pub fn from_files(spec_files: Vec<SpecFile>) -> Self {
        let mut result = SpecParseResult::default();
        for file in &spec_files {
            result.duplicates.extend(file.duplicates.iter().cloned());
            result.requirement_ids.extend(file.requirement_ids.iter().cloned());
            result.ac_ids.extend(file.ac_ids.iter().cloned());
            result.property_ids.extend(file.property_ids.iter().cloned());
            result.component_names.extend(file.component_names.iter().cloned());

            for (id, location) in &file.id_locations {
                if let Some(previous) = result.id_locations.insert(id.clone(), location.clone()) {
                    result.duplicates.push(DuplicateId {
                        id: id.clone(),
                        first: previous,
                        second: location.clone(),
                    });
                }
            }
            for (id, title) in &file.titles {
                result.titles.insert(id.clone(), title.clone());
            }
        }

        result.all_ids = result
            .requirement_ids
            .iter()
            .chain(&result.ac_ids)
            .chain(&result.property_ids)
            .chain(&result.component_names)
            .cloned()
            .collect();
        result.spec_files = spec_files;
        result
    }

    pub fn file(&self, path: &Path) -> Option<&SpecFile> {
        self.spec_files.iter().find(|f| f.file_path == path)
    }
}

/// Feature code of a spec file name, or `""`.
pub fn feature_code_for(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    FEATURE_FILE
        .captures(&name)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

/// Parse one spec document's content. No I/O.
pub fn parse_spec_content(path: &Path, content: &str, cross_ref_patterns: &[String]) -> SpecFile {
    let mut spec = SpecFile {
        file_path: path.to_path_buf(),
        code: feature_code_for(path),
        ..SpecFile::default()
    };

    let mut component: Option<String> = None;
    let mut property: Option<String> = None;

    for (idx, line) in content.lines().enumerate() {
        let line_num = idx + 1;
        let define = |spec: &mut SpecFile, id: &str, title: &str| {
            let here = Location::new(path, line_num);
            if let Some(previous) = spec.id_locations.insert(id.to_string(), here.clone()) {
                spec.duplicates.push(DuplicateId {
                    id: id.to_string(),
                    first: previous,
                    second: here,
                });
            }
            if !title.is_empty() {
                spec.titles.insert(id.to_string(), title.to_string());
            }
        };

        match LineKind::classify(line) {
            LineKind::Requirement { id, title } => {
                push_unique(&mut spec.requirement_ids, id);
                define(&mut spec, id, title);
                component = None;
                property = None;
            }
            LineKind::AcceptanceCriterion { id, text } => {
                push_unique(&mut spec.ac_ids, id);
                define(&mut spec, id, text);
                property = None;
            }
            LineKind::Property { id, text } => {
                push_unique(&mut spec.property_ids, id);
                define(&mut spec, id, text);
                property = Some(id.to_string());
            }
            LineKind::Component { name } => {
                push_unique(&mut spec.component_names, name);
                define(&mut spec, name, "");
                component = Some(name.to_string());
                property = None;
            }
            LineKind::Heading => {
                component = None;
                property = None;
            }
            LineKind::Other => {
                // A new top-level list item ends the enclosing property.
                if line.starts_with("- ") || line.starts_with("* ") {
                    property = None;
                }
            }
        }

        for pattern in cross_ref_patterns {
            let Some(pos) = line.find(pattern.as_str()) else {
                continue;
            };
            let after = &line[pos + pattern.len()..];
            let ids: Vec<String> = ids::find_references(after).map(str::to_string).collect();
            if ids.is_empty() {
                continue;
            }
            spec.cross_refs.push(CrossReference {
                kind: CrossRefKind::for_pattern(pattern),
                ids,
                file_path: path.to_path_buf(),
                line: line_num,
                component: component.clone(),
                property: property.clone(),
            });
        }
    }

    spec
}

fn push_unique(list: &mut Vec<String>, id: &str) {
    if !list.iter().any(|existing| existing == id) {
        list.push(id.to_string());
    }
}

/// Parse every configured spec file under `root`. Unreadable files are skipped.
pub fn parse_specs(root: &Path, config: &CheckConfig) -> SpecParseResult {
    let files: Vec<PathBuf> = collect_files(root, &config.spec_globs, &config.spec_ignore)
        .into_iter()
        .collect();

    let parse_one = |path: &PathBuf| -> Option<SpecFile> {
        match read_text(root.join(path)) {
            Ok(content) => Some(parse_spec_content(
                path,
                &content,
                &config.cross_ref_patterns,
            )),
            Err(e) => {
                debug!("Skipping unreadable spec {}: {e}", path.display());
                None
            }
        }
    };

    #[cfg(feature = "parallel")]
    let parsed: Vec<Option<SpecFile>> = {
        use rayon::prelude::*;
        files.par_iter().map(parse_one).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let parsed: Vec<Option<SpecFile>> = files.iter().map(parse_one).collect();

    let result = SpecParseResult::from_files(parsed.into_iter().flatten().collect());
    info!(
        "Parsed {} spec files: {} requirements, {} ACs, {} properties, {} components",
        result.spec_files.len(),
        result.requirement_ids.len(),
        result.ac_ids.len(),
        result.property_ids.len(),
        result.component_names.len()
    );
    result
}
