//! Consistency checks between code markers and spec documents.

use crate::config::CheckConfig;
use crate::findings::{Finding, FindingCode};
use crate::ids;
use crate::markers::{CodeMarker, MarkerKind};
use crate::specs::SpecParseResult;
use eyre::{Result, WrapErr};
use std::collections::BTreeSet;

/// Check every marker against the specs, then every AC for test coverage.
///
/// Findings per marker occurrence:
/// - `invalid-id-format` when a non-component ID fails the configured pattern
/// - `orphaned-marker` when the ID is not defined by any spec
///
/// Then one `uncovered-ac` warning per spec AC without a test marker.
pub fn check_code_against_spec(
    markers: &[CodeMarker],
    specs: &SpecParseResult,
    config: &CheckConfig,
) -> Result<Vec<Finding>> {
    let id_pattern = ids::compile_id_pattern(&config.id_pattern)
        .wrap_err_with(|| format!("invalid id-pattern: {}", config.id_pattern))?;
    let exempt: BTreeSet<&str> = config.ignore_markers.iter().map(String::as_str).collect();

    let mut findings = Vec::new();
    for marker in markers {
        if exempt.contains(marker.id.as_str()) {
            continue;
        }

        let is_component = marker.kind == MarkerKind::Component;
        if !is_component && !id_pattern.is_match(&marker.id) {
            findings.push(
                Finding::error(
                    FindingCode::InvalidIdFormat,
                    format!("'{}' does not match the ID pattern", marker.id),
                )
                .at(&marker.file_path, marker.line)
                .with_id(&marker.id),
            );
        }

        let defined = if is_component {
            specs.component_names.contains(&marker.id)
        } else {
            specs.all_ids.contains(&marker.id)
        };
        if !defined {
            let what = if is_component { "component" } else { "ID" };
            findings.push(
                Finding::error(
                    FindingCode::OrphanedMarker,
                    format!(
                        "{} marker references {what} '{}' which no spec defines",
                        marker.kind, marker.id
                    ),
                )
                .at(&marker.file_path, marker.line)
                .with_id(&marker.id),
            );
        }
    }

    let tested: BTreeSet<&str> = markers
        .iter()
        .filter(|m| m.kind == MarkerKind::Test)
        .map(|m| m.id.as_str())
        .collect();
    for ac in &specs.ac_ids {
        if tested.contains(ac.as_str()) {
            continue;
        }
        let mut finding = Finding::warning(
            FindingCode::UncoveredAc,
            format!("Acceptance criterion '{ac}' has no test marker"),
        )
        .with_id(ac);
        if let Some(location) = specs.id_locations.get(ac) {
            finding = finding.at(&location.file_path, location.line);
        }
        findings.push(finding);
    }

    Ok(findings)
}

/// Check the specs against each other: broken cross-references, unreferenced
/// feature files and duplicate definitions.
pub fn check_spec_against_spec(specs: &SpecParseResult, markers: &[CodeMarker]) -> Vec<Finding> {
    let mut findings = Vec::new();

    for file in &specs.spec_files {
        for xref in &file.cross_refs {
            for id in &xref.ids {
                if specs.all_ids.contains(id) {
                    continue;
                }
                findings.push(
                    Finding::error(
                        FindingCode::BrokenCrossRef,
                        format!("Cross-reference to '{id}' which no spec defines"),
                    )
                    .at(&xref.file_path, xref.line)
                    .with_id(id),
                );
            }
        }
    }

    let marker_codes: BTreeSet<&str> = markers.iter().map(|m| ids::feature_code(&m.id)).collect();
    for file in &specs.spec_files {
        if file.code.is_empty() || marker_codes.contains(file.code.as_str()) {
            continue;
        }
        let cross_referenced = specs
            .spec_files
            .iter()
            .filter(|other| other.file_path != file.file_path)
            .flat_map(|other| &other.cross_refs)
            .flat_map(|xref| &xref.ids)
            .any(|id| ids::feature_code(id) == file.code);
        if !cross_referenced {
            findings.push(
                Finding::warning(
                    FindingCode::OrphanedSpec,
                    format!(
                        "Spec for feature '{}' is not referenced by any marker or cross-reference",
                        file.code
                    ),
                )
                .in_file(&file.file_path),
            );
        }
    }

    for duplicate in &specs.duplicates {
        findings.push(
            Finding::warning(
                FindingCode::DuplicateId,
                format!(
                    "'{}' is also defined at {}; this definition wins",
                    duplicate.id, duplicate.first
                ),
            )
            .at(&duplicate.second.file_path, duplicate.second.line)
            .with_id(&duplicate.id),
        );
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Severity;
    use crate::specs::parse_spec_content;
    use std::path::{Path, PathBuf};

    fn specs(files: &[(&str, &str)]) -> SpecParseResult {
        let patterns = CheckConfig::default().cross_ref_patterns;
        SpecParseResult::from_files(
            files
                .iter()
                .map(|(name, content)| parse_spec_content(Path::new(name), content, &patterns))
                .collect(),
        )
    }

    fn marker(kind: MarkerKind, id: &str, line: usize) -> CodeMarker {
        CodeMarker {
            kind,
            id: id.to_string(),
            file_path: PathBuf::from("src/lib.ts"),
            line,
        }
    }

    fn codes(findings: &[Finding]) -> Vec<FindingCode> {
        findings.iter().map(|f| f.code).collect()
    }

    const REQ: (&str, &str) = (
        ".awa/specs/REQ-CFG-config.md",
        "### CFG-1: Load config\n- [ ] CFG-1_AC-1 a\n- [ ] CFG-1_AC-2 b\n",
    );

    #[test]
    fn tested_acs_are_covered() {
        let specs = specs(&[REQ]);
        let markers = vec![
            marker(MarkerKind::Impl, "CFG-1_AC-1", 1),
            marker(MarkerKind::Test, "CFG-1_AC-1", 2),
            marker(MarkerKind::Test, "CFG-1_AC-2", 3),
        ];
        let findings = check_code_against_spec(&markers, &specs, &CheckConfig::default()).unwrap();
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn untested_ac_is_a_warning() {
        let specs = specs(&[REQ]);
        let markers = vec![marker(MarkerKind::Test, "CFG-1_AC-1", 2)];
        let findings = check_code_against_spec(&markers, &specs, &CheckConfig::default()).unwrap();
        assert_eq!(codes(&findings), vec![FindingCode::UncoveredAc]);
        assert_eq!(findings[0].severity, Severity::Warning);
        assert_eq!(findings[0].id.as_deref(), Some("CFG-1_AC-2"));
        assert_eq!(findings[0].line, Some(3));
    }

    #[test]
    fn one_orphan_finding_per_occurrence() {
        let specs = specs(&[REQ]);
        let markers = vec![
            marker(MarkerKind::Impl, "GONE-1_AC-1", 1),
            marker(MarkerKind::Impl, "GONE-1_AC-1", 9),
            marker(MarkerKind::Test, "CFG-1_AC-1", 2),
            marker(MarkerKind::Test, "CFG-1_AC-2", 3),
        ];
        let findings = check_code_against_spec(&markers, &specs, &CheckConfig::default()).unwrap();
        assert_eq!(
            codes(&findings),
            vec![FindingCode::OrphanedMarker, FindingCode::OrphanedMarker]
        );
        assert_eq!(findings[1].line, Some(9));
    }

    #[test]
    fn components_are_checked_against_component_names() {
        let specs = specs(&[REQ, (".awa/specs/DESIGN-CFG-config.md", "### CFG-Loader\nIMPLEMENTS: CFG-1_AC-1\n")]);
        let markers = vec![
            marker(MarkerKind::Component, "CFG-Loader", 1),
            marker(MarkerKind::Component, "CFG-Missing", 2),
            marker(MarkerKind::Test, "CFG-1_AC-1", 3),
            marker(MarkerKind::Test, "CFG-1_AC-2", 4),
        ];
        let findings = check_code_against_spec(&markers, &specs, &CheckConfig::default()).unwrap();
        assert_eq!(codes(&findings), vec![FindingCode::OrphanedMarker]);
        assert_eq!(findings[0].id.as_deref(), Some("CFG-Missing"));
    }

    #[test]
    fn malformed_ids_fail_the_pattern() {
        let specs = specs(&[REQ]);
        let markers = vec![
            marker(MarkerKind::Impl, "cfg-1", 1),
            marker(MarkerKind::Test, "CFG-1_AC-1", 2),
            marker(MarkerKind::Test, "CFG-1_AC-2", 3),
        ];
        let findings = check_code_against_spec(&markers, &specs, &CheckConfig::default()).unwrap();
        assert_eq!(
            codes(&findings),
            vec![FindingCode::InvalidIdFormat, FindingCode::OrphanedMarker]
        );
    }

    #[test]
    fn ignored_marker_ids_are_exempt() {
        let specs = specs(&[REQ]);
        let config = CheckConfig {
            ignore_markers: vec!["LEGACY-1".to_string()],
            ..CheckConfig::default()
        };
        let markers = vec![
            marker(MarkerKind::Impl, "LEGACY-1", 1),
            marker(MarkerKind::Test, "CFG-1_AC-1", 2),
            marker(MarkerKind::Test, "CFG-1_AC-2", 3),
        ];
        let findings = check_code_against_spec(&markers, &specs, &config).unwrap();
        assert!(findings.is_empty());
    }

    #[test]
    fn invalid_id_pattern_is_an_error() {
        let config = CheckConfig {
            id_pattern: "(".to_string(),
            ..CheckConfig::default()
        };
        assert!(check_code_against_spec(&[], &specs(&[REQ]), &config).is_err());
    }

    #[test]
    fn broken_cross_refs_are_errors() {
        let specs = specs(&[
            REQ,
            (
                ".awa/specs/DESIGN-CFG-config.md",
                "### CFG-Loader\nIMPLEMENTS: CFG-1_AC-1, CFG-7_AC-1\n",
            ),
        ]);
        let markers = vec![marker(MarkerKind::Component, "CFG-Loader", 1)];
        let findings = check_spec_against_spec(&specs, &markers);
        assert_eq!(codes(&findings), vec![FindingCode::BrokenCrossRef]);
        assert_eq!(findings[0].id.as_deref(), Some("CFG-7_AC-1"));
        assert_eq!(findings[0].line, Some(2));
    }

    #[test]
    fn unreferenced_feature_specs_are_orphaned() {
        let specs = specs(&[
            REQ,
            (".awa/specs/REQ-LOG-logging.md", "### LOG-1: Log\n- [ ] LOG-1_AC-1 a\n"),
            (".awa/specs/ARCHITECTURE.md", "# Overview\n"),
        ]);
        let markers = vec![marker(MarkerKind::Impl, "CFG-1_AC-1", 1)];
        let findings = check_spec_against_spec(&specs, &markers);
        assert_eq!(codes(&findings), vec![FindingCode::OrphanedSpec]);
        assert_eq!(
            findings[0].file_path.as_deref(),
            Some(Path::new(".awa/specs/REQ-LOG-logging.md"))
        );
    }

    #[test]
    fn cross_references_from_other_files_count() {
        let specs = specs(&[
            REQ,
            (
                ".awa/specs/DESIGN-CFG-config.md",
                "### CFG-Loader\nIMPLEMENTS: CFG-1_AC-1\n",
            ),
        ]);
        let markers = vec![marker(MarkerKind::Component, "CFG-Loader", 1)];
        assert!(check_spec_against_spec(&specs, &markers).is_empty());

        // A file's own cross-references do not keep it alive.
        let findings = check_spec_against_spec(&specs, &[]);
        assert_eq!(codes(&findings), vec![FindingCode::OrphanedSpec]);
        assert_eq!(
            findings[0].file_path.as_deref(),
            Some(Path::new(".awa/specs/DESIGN-CFG-config.md"))
        );
    }

    #[test]
    fn duplicate_definitions_are_warnings() {
        let specs = specs(&[
            REQ,
            (".awa/specs/REQ-CFG-more.md", "### CFG-1: Again\n"),
        ]);
        let markers = vec![marker(MarkerKind::Impl, "CFG-1_AC-1", 1)];
        let findings = check_spec_against_spec(&specs, &markers);
        assert_eq!(codes(&findings), vec![FindingCode::DuplicateId]);
        assert_eq!(
            findings[0].file_path.as_deref(),
            Some(Path::new(".awa/specs/REQ-CFG-more.md"))
        );
    }
}
