//! Marker scanning for source files.
//!
//! Markers are line-oriented annotations in any comment syntax:
//!
//! ```text
//! // @awa-impl: CFG-1_AC-1, CFG-1_AC-2
//! # @awa-test: CFG_P-1
//! /* @awa-component: CFG-ConfigLoader */
//! ```
//!
//! Scanning honours ignore directives:
//!
//! - `@awa-ignore-file` anywhere skips the whole file
//! - `@awa-ignore-start` / `@awa-ignore-end` skip a block, both lines included
//! - `@awa-ignore-next-line` skips itself and the following line
//! - `@awa-ignore` on a marker line skips that line

use crate::collect::{collect_files, read_text};
use crate::config::{CheckConfig, DEFAULT_MARKERS};
use crate::findings::{Finding, FindingCode};
use crate::ids::split_leading_token;
use eyre::{Result, WrapErr};
use regex::Regex;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const IGNORE_FILE: &str = "@awa-ignore-file";
pub const IGNORE_START: &str = "@awa-ignore-start";
pub const IGNORE_END: &str = "@awa-ignore-end";
pub const IGNORE_NEXT_LINE: &str = "@awa-ignore-next-line";
pub const IGNORE_LINE: &str = "@awa-ignore";

/// The relationship a marker declares between code and a spec ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerKind {
    /// Code that implements an AC
    Impl,
    /// A test that verifies an AC or property
    Test,
    /// Code that realises a design component
    Component,
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Impl => "impl",
            MarkerKind::Test => "test",
            MarkerKind::Component => "component",
        }
    }

    /// Resolve a marker name found in source.
    ///
    /// The built-in names map directly; a custom name is inferred from its
    /// position in the configured list (impl, test, component).
    pub fn resolve(name: &str, configured: &[String]) -> Self {
        match name {
            n if n == DEFAULT_MARKERS[0] => MarkerKind::Impl,
            n if n == DEFAULT_MARKERS[1] => MarkerKind::Test,
            n if n == DEFAULT_MARKERS[2] => MarkerKind::Component,
            _ => match configured.iter().position(|m| m == name) {
                Some(1) => MarkerKind::Test,
                Some(2) => MarkerKind::Component,
                _ => MarkerKind::Impl,
            },
        }
    }
}

impl Display for MarkerKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One ID bound to a source location by a marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeMarker {
    pub kind: MarkerKind,
    pub id: String,
    /// Path relative to the project root
    pub file_path: PathBuf,
    /// Line number (1-indexed)
    pub line: usize,
}

/// Markers from a set of source files, plus structural findings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerScanResult {
    pub markers: Vec<CodeMarker>,
    pub findings: Vec<Finding>,
}

impl MarkerScanResult {
    pub fn extend(&mut self, other: MarkerScanResult) {
        self.markers.extend(other.markers);
        self.findings.extend(other.findings);
    }
}

/// Compiled marker recognizer, built once per scan.
#[derive(Debug, Clone)]
pub struct MarkerScanner {
    pattern: Regex,
    names: Vec<String>,
}

impl MarkerScanner {
    pub fn new(names: &[String]) -> Result<Self> {
        let alternatives = names
            .iter()
            .map(|n| regex::escape(n))
            .collect::<Vec<_>>()
            .join("|");
        let pattern = Regex::new(&format!(r"({alternatives}):\s*(.+)"))
            .wrap_err("Failed to compile marker pattern")?;
        Ok(Self {
            pattern,
            names: names.to_vec(),
        })
    }

    /// Scan one file's content. No I/O.
    pub fn scan_content(&self, path: &Path, content: &str) -> MarkerScanResult {
        let mut result = MarkerScanResult::default();
        if content.contains(IGNORE_FILE) {
            debug!("{}: skipped by {IGNORE_FILE}", path.display());
            return result;
        }

        let mut state = IgnoreState::Scanning;
        for (idx, line) in content.lines().enumerate() {
            let (next, skip) = state.step(line);
            state = next;
            if !skip {
                self.scan_line(path, idx + 1, line, &mut result);
            }
        }
        result
    }

    fn scan_line(&self, path: &Path, line_num: usize, line: &str, result: &mut MarkerScanResult) {
        let Some(caps) = self.pattern.captures(line) else {
            return;
        };
        let kind = MarkerKind::resolve(&caps[1], &self.names);
        let ids = strip_comment_close(&caps[2]);

        for candidate in ids.split(',') {
            let candidate = candidate.trim();
            if candidate.is_empty() {
                continue;
            }
            // A candidate that does not start with an ID is kept by its first
            // word, so the format and orphan checks report it.
            let (id, rest) = split_leading_token(candidate).unwrap_or_else(|| {
                let word = candidate.split_whitespace().next().unwrap_or(candidate);
                (word, "")
            });

            let rest = rest.trim();
            if !rest.is_empty() {
                result.findings.push(
                    Finding::error(
                        FindingCode::MarkerTrailingText,
                        format!(
                            "Unexpected text after marker ID '{id}': '{rest}' (separate IDs with commas)"
                        ),
                    )
                    .at(path, line_num)
                    .with_id(id),
                );
            }

            result.markers.push(CodeMarker {
                kind,
                id: id.to_string(),
                file_path: path.to_path_buf(),
                line: line_num,
            });
        }
    }
}

/// Drop a trailing block-comment terminator so `/* @awa-impl: X-1_AC-1 */`
/// does not report `*/` as trailing text.
fn strip_comment_close(text: &str) -> &str {
    let trimmed = text.trim_end();
    trimmed
        .strip_suffix("*/")
        .or_else(|| trimmed.strip_suffix("-->"))
        .unwrap_or(trimmed)
}

/// Per-file ignore-scope state.
///
/// Precedence is block, then next-line, then same-line: inside a block
/// nothing but `@awa-ignore-end` is looked at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IgnoreState {
    Scanning,
    SkipNext,
    InBlock,
}

impl IgnoreState {
    /// Advance over one line, returning the next state and whether the line is skipped.
    fn step(self, line: &str) -> (IgnoreState, bool) {
        match self {
            IgnoreState::InBlock => {
                if line.contains(IGNORE_END) {
                    (IgnoreState::Scanning, true)
                } else {
                    (IgnoreState::InBlock, true)
                }
            }
            IgnoreState::SkipNext => {
                if let Some(state) = block_start(line) {
                    (state, true)
                } else if line.contains(IGNORE_NEXT_LINE) {
                    (IgnoreState::SkipNext, true)
                } else {
                    (IgnoreState::Scanning, true)
                }
            }
            IgnoreState::Scanning => {
                if let Some(state) = block_start(line) {
                    (state, true)
                } else if line.contains(IGNORE_NEXT_LINE) {
                    (IgnoreState::SkipNext, true)
                } else {
                    (IgnoreState::Scanning, has_same_line_directive(line))
                }
            }
        }
    }
}

/// State after a line opening a block; a block closed on the same line
/// covers only that line.
fn block_start(line: &str) -> Option<IgnoreState> {
    let start = line.find(IGNORE_START)?;
    if line[start..].contains(IGNORE_END) {
        Some(IgnoreState::Scanning)
    } else {
        Some(IgnoreState::InBlock)
    }
}

/// `@awa-ignore` not followed by `-` or a word character.
fn has_same_line_directive(line: &str) -> bool {
    line.match_indices(IGNORE_LINE).any(|(idx, _)| {
        line[idx + IGNORE_LINE.len()..]
            .chars()
            .next()
            .is_none_or(|c| c != '-' && !c.is_alphanumeric() && c != '_')
    })
}

/// Scan every configured code file under `root`.
///
/// Unreadable files contribute nothing; scanning never aborts on I/O.
pub fn scan_markers(root: &Path, config: &CheckConfig) -> Result<MarkerScanResult> {
    let scanner = MarkerScanner::new(&config.markers)?;
    let files: Vec<PathBuf> = collect_files(root, &config.code_globs, &config.code_ignore)
        .into_iter()
        .collect();

    let scan_one = |path: &PathBuf| -> MarkerScanResult {
        match read_text(root.join(path)) {
            Ok(content) => scanner.scan_content(path, &content),
            Err(e) => {
                debug!("Skipping unreadable file {}: {e}", path.display());
                MarkerScanResult::default()
            }
        }
    };

    #[cfg(feature = "parallel")]
    let per_file: Vec<MarkerScanResult> = {
        use rayon::prelude::*;
        files.par_iter().map(scan_one).collect()
    };

    #[cfg(not(feature = "parallel"))]
    let per_file: Vec<MarkerScanResult> = files.iter().map(scan_one).collect();

    let mut result = MarkerScanResult::default();
    for file_result in per_file {
        result.extend(file_result);
    }

    info!(
        "Scanned {} code files, found {} markers",
        files.len(),
        result.markers.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> MarkerScanner {
        MarkerScanner::new(&CheckConfig::default().markers).unwrap()
    }

    fn scan(content: &str) -> MarkerScanResult {
        scanner().scan_content(Path::new("src/app.ts"), content)
    }

    fn ids(result: &MarkerScanResult) -> Vec<&str> {
        result.markers.iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn comma_separated_ids_in_order() {
        let result = scan("const a = 1;\n// @awa-impl: CFG-1_AC-1, CFG-1_AC-2\n");
        assert_eq!(ids(&result), vec!["CFG-1_AC-1", "CFG-1_AC-2"]);
        assert!(result.markers.iter().all(|m| m.kind == MarkerKind::Impl));
        assert!(result.markers.iter().all(|m| m.line == 2));
        assert!(result.findings.is_empty());
    }

    #[test]
    fn trailing_text_is_reported_but_id_kept() {
        let result = scan("// @awa-impl: FOO-1_AC-1 (partial: missing edge case)");
        assert_eq!(ids(&result), vec!["FOO-1_AC-1"]);
        assert_eq!(result.findings.len(), 1);
        let finding = &result.findings[0];
        assert_eq!(finding.code, FindingCode::MarkerTrailingText);
        assert!(finding.message.contains("(partial: missing edge case)"));
        assert_eq!(finding.id.as_deref(), Some("FOO-1_AC-1"));
        assert_eq!(finding.line, Some(1));
    }

    #[test]
    fn marker_kinds() {
        let result = scan(
            "# @awa-test: CFG_P-1\n/* @awa-component: CFG-ConfigLoader */\n// @awa-impl: CFG-2_AC-1",
        );
        let kinds: Vec<_> = result.markers.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MarkerKind::Test, MarkerKind::Component, MarkerKind::Impl]
        );
        assert!(result.findings.is_empty(), "{:?}", result.findings);
    }

    #[test]
    fn ignore_file_skips_everything() {
        let result = scan("// @awa-ignore-file\n// @awa-impl: CFG-1_AC-1\n");
        assert!(result.markers.is_empty());
    }

    #[test]
    fn ignore_block_is_inclusive() {
        let result = scan(
            "// @awa-impl: A-1_AC-1\n\
             // @awa-ignore-start @awa-impl: A-1_AC-2\n\
             // @awa-impl: A-1_AC-3\n\
             // @awa-ignore-end @awa-impl: A-1_AC-4\n\
             // @awa-impl: A-1_AC-5\n",
        );
        assert_eq!(ids(&result), vec!["A-1_AC-1", "A-1_AC-5"]);
    }

    #[test]
    fn ignore_next_line_suppresses_exactly_one_line() {
        let result = scan(
            "// @awa-ignore-next-line\n\
             // @awa-impl: A-1_AC-1\n\
             // @awa-impl: A-1_AC-2\n",
        );
        assert_eq!(ids(&result), vec!["A-1_AC-2"]);
    }

    #[test]
    fn same_line_directive() {
        let result = scan(
            "// @awa-impl: A-1_AC-1 @awa-ignore\n\
             // @awa-impl: A-1_AC-2\n",
        );
        assert_eq!(ids(&result), vec!["A-1_AC-2"]);
    }

    #[test]
    fn same_line_directive_does_not_match_longer_directives() {
        assert!(has_same_line_directive("x // @awa-ignore"));
        assert!(has_same_line_directive("x // @awa-ignore because"));
        assert!(!has_same_line_directive("// @awa-ignore-end"));
        assert!(!has_same_line_directive("// @awa-ignored"));
    }

    #[test]
    fn block_takes_precedence_over_next_line() {
        let result = scan(
            "// @awa-ignore-start\n\
             // @awa-ignore-next-line\n\
             // @awa-impl: A-1_AC-1\n\
             // @awa-ignore-end\n\
             // @awa-impl: A-1_AC-2\n",
        );
        assert_eq!(ids(&result), vec!["A-1_AC-2"]);
    }

    #[test]
    fn custom_marker_names_use_position() {
        let names = vec![
            "@spec-impl".to_string(),
            "@spec-check".to_string(),
            "@spec-part".to_string(),
        ];
        let scanner = MarkerScanner::new(&names).unwrap();
        let result = scanner.scan_content(
            Path::new("a.py"),
            "# @spec-check: X-1_AC-1\n# @spec-part: X-Parser\n# @spec-impl: X-1_AC-2\n",
        );
        let kinds: Vec<_> = result.markers.iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MarkerKind::Test, MarkerKind::Component, MarkerKind::Impl]
        );
    }

    #[test]
    fn resolve_unknown_name_defaults_to_impl() {
        let names = vec!["@a".to_string()];
        assert_eq!(MarkerKind::resolve("@zzz", &names), MarkerKind::Impl);
        assert_eq!(MarkerKind::resolve("@awa-test", &names), MarkerKind::Test);
    }

    #[test]
    fn malformed_candidates_are_kept_by_first_word() {
        let result = scan("// @awa-impl: diff-1_ac-1\n// @awa-impl: todo later, A-1_AC-1\n");
        assert_eq!(ids(&result), vec!["diff-1_ac-1", "todo", "A-1_AC-1"]);
        assert_eq!(result.markers[1].line, 2);
        assert!(result.findings.is_empty());
    }

    #[test]
    fn malformed_marker_fails_the_checks() {
        let result = scan("// @awa-impl: diff-1_ac-1\n");
        let specs = crate::specs::SpecParseResult::default();
        let findings =
            crate::checks::check_code_against_spec(&result.markers, &specs, &CheckConfig::default())
                .unwrap();
        let codes: Vec<_> = findings.iter().map(|f| f.code).collect();
        assert_eq!(
            codes,
            vec![FindingCode::InvalidIdFormat, FindingCode::OrphanedMarker]
        );
    }

    #[test]
    fn ignore_block_on_one_line_closes_itself() {
        let result = scan(
            "// @awa-ignore-start @awa-impl: A-1_AC-1 @awa-ignore-end\n\
             // @awa-impl: A-1_AC-2\n",
        );
        assert_eq!(ids(&result), vec!["A-1_AC-2"]);
    }

    #[test]
    fn consecutive_next_line_directives_stack() {
        let result = scan(
            "// @awa-ignore-next-line\n\
             // @awa-ignore-next-line\n\
             // @awa-impl: A-1_AC-1\n\
             // @awa-impl: A-1_AC-2\n",
        );
        assert_eq!(ids(&result), vec!["A-1_AC-2"]);
    }

    #[test]
    fn scan_markers_survives_unreadable_files() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/ok.ts"), "// @awa-impl: A-1_AC-1\n").unwrap();
        // A dangling symlink cannot be read.
        #[cfg(unix)]
        std::os::unix::fs::symlink(root.join("missing.ts"), root.join("src/gone.ts")).unwrap();

        let result = scan_markers(root, &CheckConfig::default()).unwrap();
        assert_eq!(ids(&result), vec!["A-1_AC-1"]);
        assert_eq!(result.markers[0].file_path, PathBuf::from("src/ok.ts"));
    }

    #[test]
    fn scan_markers_reads_non_utf8_files_lossily() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::write(root.join("src/latin1.ts"), b"// caf\xe9\n// @awa-impl: A-1_AC-1\n").unwrap();

        let result = scan_markers(root, &CheckConfig::default()).unwrap();
        assert_eq!(ids(&result), vec!["A-1_AC-1"]);
        assert_eq!(result.markers[0].line, 2);
    }
}
