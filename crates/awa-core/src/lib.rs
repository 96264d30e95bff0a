//! awa-core - Core library for requirements traceability
//!
//! This crate provides the building blocks for:
//! - Scanning source code for `@awa-impl`, `@awa-test` and `@awa-component` markers
//! - Parsing Markdown spec documents for requirements, acceptance criteria,
//!   correctness properties and design components
//! - Joining both into a bidirectional [`TraceIndex`]
//! - Checking consistency, resolving trace chains and assembling context
//!
//! # Features
//!
//! - `parallel` - Scan and parse files in parallel (brings in `rayon`)
//!
//! # Markers
//!
//! Markers live in comments of any language and name one or more spec IDs:
//!
//! ```text
//! // @awa-component: CFG-ConfigLoader
//! // @awa-impl: CFG-1_AC-1, CFG-1_AC-2
//! # @awa-test: CFG_P-1
//! ```
//!
//! # Specs
//!
//! Spec documents follow a line-oriented Markdown layout:
//!
//! ```markdown
//! ### CFG-1: Load configuration [MUST]
//! - [ ] CFG-1_AC-1 [event]: WHEN the file exists THEN it is loaded
//!
//! ### CFG-ConfigLoader
//! IMPLEMENTS: CFG-1_AC-1
//! ```
//!
//! # Building an index
//!
//! ```
//! use awa_core::{CheckConfig, SpecParseResult, TraceIndex, parse_spec_content};
//! use std::path::Path;
//!
//! let config = CheckConfig::default();
//! let spec = parse_spec_content(
//!     Path::new(".awa/specs/REQ-CFG-config.md"),
//!     "### CFG-1: Load configuration\n- [ ] CFG-1_AC-1 [event]: WHEN x THEN y\n",
//!     &config.cross_ref_patterns,
//! );
//! let specs = SpecParseResult::from_files(vec![spec]);
//! let index = TraceIndex::build(&specs, &[]);
//! assert_eq!(index.req_to_acs["CFG-1"], vec!["CFG-1_AC-1"]);
//! ```
//!
//! # Analyzing a project
//!
//! ```ignore
//! use awa_core::{CheckConfig, TraceOptions, analyze, resolve_trace};
//!
//! let config = CheckConfig::default();
//! let analysis = analyze(root, &config)?;
//! let findings = analysis.run_checks(root, &config)?;
//! let result = resolve_trace(&analysis.index, &["CFG-1".to_string()], &TraceOptions::default());
//! ```

pub mod analysis;
pub mod budget;
pub mod checks;
pub mod collect;
pub mod config;
pub mod content;
pub mod findings;
pub mod ids;
pub mod index;
pub mod inputs;
pub mod markers;
pub mod schema;
pub mod specs;
pub mod trace;

pub use analysis::{Analysis, analyze};
pub use budget::{BudgetResult, ContentSection, SectionKind, apply_token_budget, estimate_tokens};
pub use checks::{check_code_against_spec, check_spec_against_spec};
pub use collect::collect_files;
pub use config::CheckConfig;
pub use content::{ContentOptions, assemble_content};
pub use findings::{Finding, FindingCode, FindingCounts, Severity};
pub use ids::IdKind;
pub use index::TraceIndex;
pub use inputs::{ids_from_source, ids_from_task};
pub use markers::{CodeMarker, MarkerKind, MarkerScanResult, MarkerScanner, scan_markers};
pub use schema::check_schemas;
pub use specs::{
    CrossRefKind, CrossReference, Location, SpecFile, SpecParseResult, parse_spec_content,
    parse_specs,
};
pub use trace::{
    Direction, NodeKind, TraceChain, TraceNode, TraceOptions, TraceResult, resolve_trace,
};
