//! Content assembly: literal spec and code excerpts for resolved chains.

use crate::budget::{ContentSection, SectionKind};
use crate::collect::read_text;
use crate::specs::{LineKind, Location};
use crate::trace::{NodeKind, TraceChain};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentOptions {
    /// Lines of code shown above a marker
    pub before_context: usize,
    /// Lines of code shown below a marker
    pub after_context: usize,
}

impl Default for ContentOptions {
    fn default() -> Self {
        Self {
            before_context: 5,
            after_context: 20,
        }
    }
}

/// Line cache; each file is read at most once per assembly.
#[derive(Default)]
struct Files {
    root: PathBuf,
    lines: BTreeMap<PathBuf, Option<Vec<String>>>,
}

impl Files {
    fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            lines: BTreeMap::new(),
        }
    }

    fn get(&mut self, path: &Path) -> Option<&[String]> {
        let root = &self.root;
        self.lines
            .entry(path.to_path_buf())
            .or_insert_with(|| match read_text(root.join(path)) {
                Ok(content) => Some(content.lines().map(str::to_string).collect()),
                Err(e) => {
                    debug!("Skipping unreadable file {}: {e}", path.display());
                    None
                }
            })
            .as_deref()
    }
}

/// Build content sections for every located node of `chains`, sorted by
/// priority and deduplicated.
pub fn assemble_content(
    root: &Path,
    chains: &[TraceChain],
    options: &ContentOptions,
) -> Vec<ContentSection> {
    let mut files = Files::new(root);
    let mut sections = Vec::new();
    // Code ranges grouped per (kind, file), in first-seen order.
    let mut code_ranges: Vec<((SectionKind, PathBuf), Vec<(usize, usize)>)> = Vec::new();

    for chain in chains {
        for node in chain.nodes() {
            let Some(location) = &node.location else {
                continue;
            };
            let Some(lines) = files.get(&location.file_path) else {
                continue;
            };
            if location.line == 0 || location.line > lines.len() {
                continue;
            }

            let kind = match node.kind {
                NodeKind::Requirement => SectionKind::Requirement,
                NodeKind::AcceptanceCriterion => SectionKind::AcceptanceCriterion,
                NodeKind::Component => SectionKind::Design,
                NodeKind::Property => SectionKind::Property,
                NodeKind::Implementation => SectionKind::Implementation,
                NodeKind::Test => SectionKind::Test,
            };

            if kind.is_code() {
                let start = location.line.saturating_sub(options.before_context).max(1);
                let end = (location.line + options.after_context).min(lines.len());
                let key = (kind, location.file_path.clone());
                match code_ranges.iter_mut().find(|(k, _)| *k == key) {
                    Some((_, ranges)) => ranges.push((start, end)),
                    None => code_ranges.push((key, vec![(start, end)])),
                }
                continue;
            }

            let end = match kind {
                SectionKind::Requirement => requirement_end(lines, location.line),
                SectionKind::Design => heading_end(lines, location.line),
                _ => item_end(lines, location.line),
            };
            sections.push(excerpt(kind, location, end, lines));
        }
    }

    for ((kind, file_path), ranges) in code_ranges {
        let Some(lines) = files.get(&file_path) else {
            continue;
        };
        for (start, end) in merge_ranges(ranges) {
            let content = lines[start - 1..end].join("\n");
            sections.push(ContentSection::new(kind, &file_path, start, end, content));
        }
    }

    sections.sort_by_key(|s| s.priority);
    let mut seen = HashSet::new();
    sections.retain(|s| seen.insert((s.kind, s.file_path.clone(), s.start_line, s.end_line)));
    sections
}

fn excerpt(kind: SectionKind, location: &Location, end: usize, lines: &[String]) -> ContentSection {
    let content = lines[location.line - 1..end].join("\n");
    ContentSection::new(kind, &location.file_path, location.line, end, content)
}

/// Requirement prose runs from its heading up to the first AC item or the
/// next heading. Trailing blank lines are dropped.
fn requirement_end(lines: &[String], start: usize) -> usize {
    let mut end = start;
    for (idx, line) in lines.iter().enumerate().skip(start) {
        match LineKind::classify(line) {
            LineKind::AcceptanceCriterion { .. } => break,
            _ if line.starts_with('#') => break,
            _ => end = idx + 1,
        }
    }
    trim_blank_tail(lines, start, end)
}

/// A component section runs until the next heading.
fn heading_end(lines: &[String], start: usize) -> usize {
    let end = lines
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, line)| line.starts_with('#'))
        .map_or(lines.len(), |(idx, _)| idx);
    trim_blank_tail(lines, start, end)
}

/// A list item plus its indented continuation lines.
fn item_end(lines: &[String], start: usize) -> usize {
    let mut end = start;
    for line in &lines[start..] {
        if line.trim().is_empty() || !line.starts_with([' ', '\t']) {
            break;
        }
        end += 1;
    }
    end
}

fn trim_blank_tail(lines: &[String], start: usize, mut end: usize) -> usize {
    while end > start && lines[end - 1].trim().is_empty() {
        end -= 1;
    }
    end
}

/// Merge overlapping 1-indexed inclusive ranges.
fn merge_ranges(mut ranges: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, end) in ranges {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}
