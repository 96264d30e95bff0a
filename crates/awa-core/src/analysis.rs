//! The scan -> parse -> index pipeline.

use crate::checks::{check_code_against_spec, check_spec_against_spec};
use crate::config::CheckConfig;
use crate::findings::Finding;
use crate::index::TraceIndex;
use crate::markers::{MarkerScanResult, scan_markers};
use crate::schema::check_schemas;
use crate::specs::{SpecParseResult, parse_specs};
use eyre::Result;
use std::path::Path;
use tracing::info;

/// Everything one invocation knows about a project.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub markers: MarkerScanResult,
    pub specs: SpecParseResult,
    pub index: TraceIndex,
}

/// Scan code and parse specs concurrently, then build the index.
pub fn analyze(root: &Path, config: &CheckConfig) -> Result<Analysis> {
    #[cfg(feature = "parallel")]
    let (markers, specs) = rayon::join(|| scan_markers(root, config), || parse_specs(root, config));

    #[cfg(not(feature = "parallel"))]
    let (markers, specs) = (scan_markers(root, config), parse_specs(root, config));

    let markers = markers?;
    let index = TraceIndex::build(&specs, &markers.markers);
    info!("Indexed {} IDs", index.all_ids.len());

    Ok(Analysis {
        markers,
        specs,
        index,
    })
}

impl Analysis {
    /// All findings: scan findings, code-vs-spec, spec-vs-spec, then schema
    /// rules.
    pub fn run_checks(&self, root: &Path, config: &CheckConfig) -> Result<Vec<Finding>> {
        let mut findings = self.markers.findings.clone();
        findings.extend(check_code_against_spec(
            &self.markers.markers,
            &self.specs,
            config,
        )?);
        findings.extend(check_spec_against_spec(&self.specs, &self.markers.markers));
        findings.extend(check_schemas(root, &self.specs, config));
        Ok(findings)
    }
}
