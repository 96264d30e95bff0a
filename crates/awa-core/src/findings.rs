//! Structural findings produced by scanning and checking.
//!
//! Findings are data: they are collected, rendered and counted, never raised.

use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

impl Display for Severity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingCode {
    /// A marker references an ID the specs never define
    OrphanedMarker,
    /// An AC has no `test` marker
    UncoveredAc,
    /// A cross-reference lists an ID the specs never define
    BrokenCrossRef,
    /// A marker ID does not match the configured ID pattern
    InvalidIdFormat,
    /// A marker candidate carries text after its ID
    MarkerTrailingText,
    /// A feature spec file that nothing references
    OrphanedSpec,
    /// The same ID is defined in more than one place
    DuplicateId,
    /// A spec file breaks a schema rule
    SchemaViolation,
}

impl FindingCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FindingCode::OrphanedMarker => "orphaned-marker",
            FindingCode::UncoveredAc => "uncovered-ac",
            FindingCode::BrokenCrossRef => "broken-cross-ref",
            FindingCode::InvalidIdFormat => "invalid-id-format",
            FindingCode::MarkerTrailingText => "marker-trailing-text",
            FindingCode::OrphanedSpec => "orphaned-spec",
            FindingCode::DuplicateId => "duplicate-id",
            FindingCode::SchemaViolation => "schema-violation",
        }
    }
}

impl Display for FindingCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding, optionally anchored to a file location and an ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub severity: Severity,
    pub code: FindingCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Finding {
    pub fn error(code: FindingCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            file_path: None,
            line: None,
            id: None,
        }
    }

    pub fn warning(code: FindingCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    pub fn at(mut self, file_path: impl Into<PathBuf>, line: usize) -> Self {
        self.file_path = Some(file_path.into());
        self.line = Some(line);
        self
    }

    pub fn in_file(mut self, file_path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(file_path.into());
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Error/warning tally for a list of findings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FindingCounts {
    pub errors: usize,
    pub warnings: usize,
}

impl FindingCounts {
    pub fn of(findings: &[Finding]) -> Self {
        let errors = findings.iter().filter(|f| f.is_error()).count();
        Self {
            errors,
            warnings: findings.len() - errors,
        }
    }

    /// Whether these findings should fail a check run.
    pub fn is_failing(&self, allow_warnings: bool) -> bool {
        self.errors > 0 || (!allow_warnings && self.warnings > 0)
    }
}
