//! Structural rules for spec documents.
//!
//! Rule files live in the schema directory as `*.rules.toml`:
//!
//! ```toml
//! applies-to = "REQ-*.md"
//!
//! [[rules]]
//! kind = "required-heading"
//! level = 1
//! text = "Requirements"
//!
//! [[rules]]
//! kind = "forbidden-pattern"
//! pattern = "TODO"
//! message = "requirements must not contain TODOs"
//! ```
//!
//! A spec file is checked against every rule set whose `applies-to` glob
//! matches its file name.

use crate::collect::read_text;
use crate::config::CheckConfig;
use crate::findings::{Finding, FindingCode};
use crate::specs::SpecParseResult;
use eyre::{Result, WrapErr};
use globset::{Glob, GlobMatcher};
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const RULES_SUFFIX: &str = ".rules.toml";

/// One rule file as written.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SchemaFile {
    pub applies_to: String,
    #[serde(default)]
    pub rules: Vec<SchemaRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum SchemaRule {
    /// A heading of exactly this level and text must exist
    RequiredHeading { level: usize, text: String },
    /// The regex must match somewhere in the document
    RequiredPattern {
        pattern: String,
        message: Option<String>,
    },
    /// The regex must match no line of the document
    ForbiddenPattern {
        pattern: String,
        message: Option<String>,
    },
}

#[derive(Debug, Clone)]
enum CompiledRule {
    RequiredHeading { level: usize, text: String },
    RequiredPattern { regex: Regex, message: String },
    ForbiddenPattern { regex: Regex, message: String },
}

/// A loaded, compiled rule file.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub source: PathBuf,
    applies_to: GlobMatcher,
    rules: Vec<CompiledRule>,
}

impl RuleSet {
    /// Parse and compile a rule file's content.
    pub fn parse(source: &Path, content: &str) -> Result<Self> {
        let file: SchemaFile = toml::from_str(content).wrap_err("malformed rule file")?;
        let applies_to = Glob::new(&file.applies_to)
            .wrap_err_with(|| format!("invalid applies-to glob '{}'", file.applies_to))?
            .compile_matcher();

        let rules = file
            .rules
            .into_iter()
            .map(compile_rule)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: source.to_path_buf(),
            applies_to,
            rules,
        })
    }

    /// Whether this rule set covers the spec file at `path`.
    pub fn applies_to(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| self.applies_to.is_match(Path::new(name)))
    }

    /// Check one document; violations are `schema-violation` errors.
    pub fn check(&self, path: &Path, content: &str) -> Vec<Finding> {
        let mut findings = Vec::new();
        for rule in &self.rules {
            match rule {
                CompiledRule::RequiredHeading { level, text } => {
                    let present = content
                        .lines()
                        .any(|line| heading(line) == Some((*level, text.as_str())));
                    if !present {
                        findings.push(
                            violation(format!(
                                "missing required heading '{} {text}'",
                                "#".repeat(*level)
                            ))
                            .in_file(path),
                        );
                    }
                }
                CompiledRule::RequiredPattern { regex, message } => {
                    if !regex.is_match(content) {
                        findings.push(violation(message.clone()).in_file(path));
                    }
                }
                CompiledRule::ForbiddenPattern { regex, message } => {
                    for (idx, line) in content.lines().enumerate() {
                        if regex.is_match(line) {
                            findings.push(violation(message.clone()).at(path, idx + 1));
                        }
                    }
                }
            }
        }
        findings
    }
}

fn compile_rule(rule: SchemaRule) -> Result<CompiledRule> {
    let compile = |pattern: &str| {
        RegexBuilder::new(pattern)
            .multi_line(true)
            .build()
            .wrap_err_with(|| format!("invalid pattern '{pattern}'"))
    };
    Ok(match rule {
        SchemaRule::RequiredHeading { level, text } => CompiledRule::RequiredHeading { level, text },
        SchemaRule::RequiredPattern { pattern, message } => CompiledRule::RequiredPattern {
            regex: compile(&pattern)?,
            message: message.unwrap_or_else(|| format!("required pattern '{pattern}' not found")),
        },
        SchemaRule::ForbiddenPattern { pattern, message } => CompiledRule::ForbiddenPattern {
            regex: compile(&pattern)?,
            message: message.unwrap_or_else(|| format!("forbidden pattern '{pattern}' found")),
        },
    })
}

/// `## Title` -> `(2, "Title")`.
fn heading(line: &str) -> Option<(usize, &str)> {
    let level = line.bytes().take_while(|b| *b == b'#').count();
    if level == 0 {
        return None;
    }
    let rest = &line[level..];
    if !rest.is_empty() && !rest.starts_with([' ', '\t']) {
        return None;
    }
    Some((level, rest.trim()))
}

fn violation(message: String) -> Finding {
    Finding::error(FindingCode::SchemaViolation, message)
}

/// Load every rule file in `dir`, sorted by name. Malformed files become
/// findings pointing at the file.
pub fn load_rule_sets(dir: &Path) -> (Vec<RuleSet>, Vec<Finding>) {
    let mut rule_sets = Vec::new();
    let mut findings = Vec::new();

    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("No schema rules in {}: {e}", dir.display());
            return (rule_sets, findings);
        }
    };
    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().ends_with(RULES_SUFFIX))
        })
        .collect();
    paths.sort();

    for path in paths {
        let loaded = std::fs::read_to_string(&path)
            .wrap_err("unreadable rule file")
            .and_then(|content| RuleSet::parse(&path, &content));
        match loaded {
            Ok(rule_set) => rule_sets.push(rule_set),
            Err(e) => findings.push(violation(format!("{e:#}")).in_file(&path)),
        }
    }

    (rule_sets, findings)
}

/// Check parsed spec files against the project's schema rules.
///
/// Returns nothing when schema checking is disabled or the schema directory
/// does not exist.
pub fn check_schemas(root: &Path, specs: &SpecParseResult, config: &CheckConfig) -> Vec<Finding> {
    if !config.schema_enabled {
        return Vec::new();
    }
    let dir = root.join(&config.schema_dir);
    if !dir.is_dir() {
        return Vec::new();
    }

    let (rule_sets, mut findings) = load_rule_sets(&dir);
    info!("Loaded {} schema rule sets", rule_sets.len());

    for spec in &specs.spec_files {
        let applicable: Vec<&RuleSet> = rule_sets
            .iter()
            .filter(|set| set.applies_to(&spec.file_path))
            .collect();
        if applicable.is_empty() {
            continue;
        }
        let content = match read_text(root.join(&spec.file_path)) {
            Ok(content) => content,
            Err(e) => {
                debug!("Skipping unreadable spec {}: {e}", spec.file_path.display());
                continue;
            }
        };
        for set in applicable {
            findings.extend(set.check(&spec.file_path, &content));
        }
    }

    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::specs::parse_spec_content;
    use std::fs;

    const RULES: &str = r#"
applies-to = "REQ-*.md"

[[rules]]
kind = "required-heading"
level = 1
text = "Requirements"

[[rules]]
kind = "required-pattern"
pattern = "^### [A-Z]+-\\d+:"

[[rules]]
kind = "forbidden-pattern"
pattern = "TODO"
message = "no TODOs in requirements"
"#;

    fn rules() -> RuleSet {
        RuleSet::parse(Path::new("req.rules.toml"), RULES).unwrap()
    }

    #[test]
    fn applies_by_file_name() {
        let rules = rules();
        assert!(rules.applies_to(Path::new(".awa/specs/REQ-CFG-config.md")));
        assert!(!rules.applies_to(Path::new(".awa/specs/DESIGN-CFG-config.md")));
    }

    #[test]
    fn conforming_document_passes() {
        let findings = rules().check(
            Path::new("REQ-CFG-config.md"),
            "# Requirements\n\n### CFG-1: Load\n",
        );
        assert!(findings.is_empty(), "{findings:?}");
    }

    #[test]
    fn each_rule_reports_its_violation() {
        let findings = rules().check(
            Path::new("REQ-CFG-config.md"),
            "## Requirements\nTODO write\nmore\nTODO again\n",
        );
        let messages: Vec<&str> = findings.iter().map(|f| f.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "missing required heading '# Requirements'",
                "required pattern '^### [A-Z]+-\\d+:' not found",
                "no TODOs in requirements",
                "no TODOs in requirements",
            ]
        );
        assert_eq!(findings[2].line, Some(2));
        assert_eq!(findings[3].line, Some(4));
        assert!(findings.iter().all(|f| f.code == FindingCode::SchemaViolation));
    }

    #[test]
    fn heading_parsing() {
        assert_eq!(heading("## Title "), Some((2, "Title")));
        assert_eq!(heading("#hashtag"), None);
        assert_eq!(heading("plain"), None);
    }

    #[test]
    fn malformed_rule_files_become_findings() {
        let temp = tempfile::tempdir().unwrap();
        fs::write(temp.path().join("good.rules.toml"), RULES).unwrap();
        fs::write(
            temp.path().join("bad.rules.toml"),
            "applies-to = \"*.md\"\n[[rules]]\nkind = \"no-such-rule\"\n",
        )
        .unwrap();
        fs::write(temp.path().join("notes.toml"), "not = [rules").unwrap();

        let (sets, findings) = load_rule_sets(temp.path());
        assert_eq!(sets.len(), 1);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].code, FindingCode::SchemaViolation);
        assert!(
            findings[0]
                .file_path
                .as_deref()
                .is_some_and(|p| p.ends_with("bad.rules.toml"))
        );
    }

    #[test]
    fn check_schemas_reads_matching_specs() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        let schema_dir = root.join(".awa/.agent/schemas");
        fs::create_dir_all(&schema_dir).unwrap();
        fs::write(schema_dir.join("req.rules.toml"), RULES).unwrap();
        fs::create_dir_all(root.join(".awa/specs")).unwrap();
        let content = "### CFG-1: Load\n";
        fs::write(root.join(".awa/specs/REQ-CFG-config.md"), content).unwrap();

        let config = CheckConfig::default();
        let specs = SpecParseResult::from_files(vec![parse_spec_content(
            Path::new(".awa/specs/REQ-CFG-config.md"),
            content,
            &config.cross_ref_patterns,
        )]);

        let findings = check_schemas(root, &specs, &config);
        assert_eq!(findings.len(), 1);
        assert!(findings[0].message.contains("# Requirements"));

        let disabled = CheckConfig {
            schema_enabled: false,
            ..CheckConfig::default()
        };
        assert!(check_schemas(root, &specs, &disabled).is_empty());
    }
}
