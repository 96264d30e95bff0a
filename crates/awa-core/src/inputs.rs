//! Query IDs taken from task documents and source files.

use crate::ids;

const TASK_DIRECTIVES: [&str; 2] = ["IMPLEMENTS:", "TESTS:"];
const TRACEABILITY_HEADING: &str = "## Requirements Traceability";

/// IDs a task document points at.
///
/// `IMPLEMENTS:` and `TESTS:` lines contribute every ID they mention. Inside
/// a `## Requirements Traceability` section each bullet contributes its
/// first ID (`- DIFF-1_AC-1 → DiffEngine`).
pub fn ids_from_task(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut in_traceability = false;

    for line in text.lines() {
        let trimmed = line.trim_start();

        if trimmed.starts_with("## ") {
            in_traceability = trimmed.trim_end() == TRACEABILITY_HEADING;
            continue;
        }

        if TASK_DIRECTIVES.iter().any(|d| trimmed.starts_with(d)) {
            for id in ids::find_references(trimmed) {
                push_unique(&mut out, id);
            }
            continue;
        }

        if in_traceability
            && let Some(item) = trimmed.strip_prefix("- ")
            && let Some(id) = ids::first_reference(item)
        {
            push_unique(&mut out, id);
        }
    }

    out
}

/// IDs named by marker lines of a source file, in order of appearance.
pub fn ids_from_source(text: &str, markers: &[String]) -> Vec<String> {
    let mut out = Vec::new();
    for line in text.lines() {
        for marker in markers {
            let Some(pos) = line.find(marker.as_str()) else {
                continue;
            };
            let Some(rest) = line[pos + marker.len()..].strip_prefix(':') else {
                continue;
            };
            for candidate in rest.split(',') {
                if let Some((id, _)) = ids::split_leading_token(candidate.trim()) {
                    push_unique(&mut out, id);
                }
            }
        }
    }
    out
}

fn push_unique(out: &mut Vec<String>, id: &str) {
    if !out.iter().any(|existing| existing == id) {
        out.push(id.to_string());
    }
}
