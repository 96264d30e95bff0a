//! awa library - Requirements traceability between specs and code
//!
//! This library exposes the command implementations, config loading and
//! output formatting of the `awa` binary for testing and embedding purposes.
//! The engine itself lives in [`awa_core`].

pub mod commands;
pub mod config;
pub mod output;

pub use commands::{CheckArgs, CommonArgs, TraceArgs, run_check, run_trace};
pub use config::{DEFAULT_CONFIG_FILE, Settings, load_settings, parse_settings};
pub use output::OutputFormat;
