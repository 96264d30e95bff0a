//! The spec ID namespace.
//!
//! Four kinds of ID share one namespace:
//!
//! | Kind        | Example          | Grammar                                   |
//! |-------------|------------------|-------------------------------------------|
//! | Requirement | `DIFF-1`, `DIFF-1.2` | `^[A-Z][A-Z0-9]*-\d+(\.\d+)?$`        |
//! | AC          | `DIFF-1_AC-1`    | `<requirement>_AC-\d+`                    |
//! | Property    | `DIFF_P-1`       | `^[A-Z][A-Z0-9]*_P-\d+$`                  |
//! | Component   | `DIFF-DiffEngine`| `^[A-Z][A-Z0-9]*-[A-Za-z][A-Za-z0-9]*$`   |
//!
//! The component grammar overlaps nothing else only because the requirement
//! grammar is tried first, so [`classify`] always checks in that order.

use regex::Regex;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::sync::LazyLock;

pub static REQUIREMENT_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]*-\d+(?:\.\d+)?$").expect("valid regex"));

pub static AC_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9]*-\d+(?:\.\d+)?_AC-\d+$").expect("valid regex")
});

pub static PROPERTY_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]*_P-\d+$").expect("valid regex"));

pub static COMPONENT_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9]*-[A-Za-z][A-Za-z0-9]*$").expect("valid regex")
});

/// Leading ID token of a marker candidate. Anything after the match is
/// trailing text.
static LEADING_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Z][A-Z0-9]*(?:[-_][A-Za-z0-9]+)*(?:\.\d+(?:[-_][A-Za-z0-9]+)*)?")
        .expect("valid regex")
});

/// Requirement, AC or property ID embedded in free text.
static ID_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Z][A-Z0-9]*(?:_P-\d+|-\d+(?:\.\d+)?(?:_AC-\d+)?)\b").expect("valid regex")
});

/// Default body of the configurable `id-pattern`: anything but a component.
pub const DEFAULT_ID_PATTERN: &str =
    r"[A-Z][A-Z0-9]*-\d+(?:\.\d+)?(?:_AC-\d+)?|[A-Z][A-Z0-9]*_P-\d+";

/// What kind of entity an ID names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum IdKind {
    Requirement,
    AcceptanceCriterion,
    Property,
    Component,
    Unknown,
}

impl IdKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IdKind::Requirement => "requirement",
            IdKind::AcceptanceCriterion => "acceptance-criterion",
            IdKind::Property => "property",
            IdKind::Component => "component",
            IdKind::Unknown => "unknown",
        }
    }
}

impl Display for IdKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify an ID purely by its shape.
pub fn classify(id: &str) -> IdKind {
    if AC_ID.is_match(id) {
        IdKind::AcceptanceCriterion
    } else if REQUIREMENT_ID.is_match(id) {
        IdKind::Requirement
    } else if PROPERTY_ID.is_match(id) {
        IdKind::Property
    } else if COMPONENT_ID.is_match(id) {
        IdKind::Component
    } else {
        IdKind::Unknown
    }
}

pub fn is_property(id: &str) -> bool {
    PROPERTY_ID.is_match(id)
}

/// The requirement an AC belongs to (`DIFF-1.2_AC-3` -> `DIFF-1.2`).
pub fn ac_parent(ac_id: &str) -> Option<&str> {
    let (req, n) = ac_id.rsplit_once("_AC-")?;
    if n.is_empty() || !n.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(req)
}

/// Feature code prefix of any ID (`DIFF-1_AC-2` -> `DIFF`, `DIFF_P-1` -> `DIFF`).
pub fn feature_code(id: &str) -> &str {
    let end = id.find(['-', '_']).unwrap_or(id.len());
    &id[..end]
}

/// Split a marker candidate into its leading ID token and whatever follows.
///
/// Returns `None` when the candidate does not start with an ID at all.
pub fn split_leading_token(candidate: &str) -> Option<(&str, &str)> {
    let m = LEADING_TOKEN.find(candidate)?;
    Some((m.as_str(), &candidate[m.end()..]))
}

/// All requirement/AC/property IDs mentioned in `text`, in order.
pub fn find_references(text: &str) -> impl Iterator<Item = &str> {
    ID_REFERENCE.find_iter(text).map(|m| m.as_str())
}

/// First requirement/AC/property ID mentioned in `text`.
pub fn first_reference(text: &str) -> Option<&str> {
    ID_REFERENCE.find(text).map(|m| m.as_str())
}

/// Compile a configured `id-pattern` body into an anchored regex.
pub fn compile_id_pattern(body: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!("^(?:{body})$"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_prefers_requirement_over_component() {
        assert_eq!(classify("DIFF-1"), IdKind::Requirement);
        assert_eq!(classify("DIFF-1.2"), IdKind::Requirement);
        assert_eq!(classify("DIFF-DiffEngine"), IdKind::Component);
        assert_eq!(classify("DIFF-1_AC-1"), IdKind::AcceptanceCriterion);
        assert_eq!(classify("DIFF-1.2_AC-10"), IdKind::AcceptanceCriterion);
        assert_eq!(classify("DIFF_P-3"), IdKind::Property);
        assert_eq!(classify("diff-1"), IdKind::Unknown);
        assert_eq!(classify("DIFF"), IdKind::Unknown);
    }

    #[test]
    fn ac_parent_strips_suffix() {
        assert_eq!(ac_parent("DIFF-1_AC-1"), Some("DIFF-1"));
        assert_eq!(ac_parent("DIFF-1.2_AC-3"), Some("DIFF-1.2"));
        assert_eq!(ac_parent("DIFF-1"), None);
        assert_eq!(ac_parent("DIFF-1_AC-x"), None);
    }

    #[test]
    fn feature_code_of_each_kind() {
        assert_eq!(feature_code("DIFF-1"), "DIFF");
        assert_eq!(feature_code("DIFF-1_AC-1"), "DIFF");
        assert_eq!(feature_code("DIFF_P-1"), "DIFF");
        assert_eq!(feature_code("CFG2-Loader"), "CFG2");
    }

    #[test]
    fn leading_token_and_remainder() {
        assert_eq!(
            split_leading_token("FOO-1_AC-1 (partial: missing edge case)"),
            Some(("FOO-1_AC-1", " (partial: missing edge case)"))
        );
        assert_eq!(split_leading_token("DIFF-1.2_AC-1"), Some(("DIFF-1.2_AC-1", "")));
        assert_eq!(split_leading_token("DIFF-DiffEngine"), Some(("DIFF-DiffEngine", "")));
        assert_eq!(split_leading_token("lowercase"), None);
    }

    #[test]
    fn references_in_free_text() {
        let found: Vec<_> =
            find_references("IMPLEMENTS: DIFF-1_AC-1, DIFF-1.2_AC-2 and DIFF_P-4").collect();
        assert_eq!(found, vec!["DIFF-1_AC-1", "DIFF-1.2_AC-2", "DIFF_P-4"]);
    }

    #[test]
    fn default_id_pattern_excludes_components() {
        let re = compile_id_pattern(DEFAULT_ID_PATTERN).unwrap();
        assert!(re.is_match("DIFF-1"));
        assert!(re.is_match("DIFF-1_AC-1"));
        assert!(re.is_match("DIFF_P-1"));
        assert!(!re.is_match("DIFF-DiffEngine"));
        assert!(!re.is_match("DIFF-1_AC-1x"));
    }
}
