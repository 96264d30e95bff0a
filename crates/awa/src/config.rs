//! Configuration file loading
//!
//! Config lives at `.awa.toml` in the project root, under a `[check]` table:
//!
//! ```toml
//! [check]
//! spec-globs = [".awa/specs/**/*.md"]
//! code-globs = ["src/**/*.ts"]
//! ignore = ["generated/**"]
//! markers = ["@awa-impl", "@awa-test", "@awa-component"]
//! format = "json"
//! allow-warnings = true
//! ```
//!
//! Unknown keys are ignored. A value of the wrong type falls back to its
//! default with a warning rather than failing the run.

use crate::output::OutputFormat;
use awa_core::CheckConfig;
use eyre::{Result, WrapErr};
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::{debug, warn};

pub const DEFAULT_CONFIG_FILE: &str = ".awa.toml";

/// Everything a command needs from the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    pub check: CheckConfig,
    pub format: OutputFormat,
}

/// Load settings for a project.
///
/// An explicit path must exist; the default `.awa.toml` may be absent, in
/// which case every default applies.
pub fn load_settings(root: &Path, explicit: Option<&Path>) -> Result<Settings> {
    let path = match explicit {
        Some(path) => root.join(path),
        None => {
            let path = root.join(DEFAULT_CONFIG_FILE);
            if !path.exists() {
                debug!("No {DEFAULT_CONFIG_FILE} found, using defaults");
                return Ok(Settings::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&path)
        .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
    parse_settings(&content).wrap_err_with(|| format!("Failed to parse config {}", path.display()))
}

/// Parse settings from TOML text.
pub fn parse_settings(content: &str) -> Result<Settings> {
    let table: Table = toml::from_str(content)?;
    let mut settings = Settings::default();

    let check = match table.get("check") {
        None => return Ok(settings),
        Some(Value::Table(check)) => check,
        Some(_) => {
            warn!("[check] is not a table, using defaults");
            return Ok(settings);
        }
    };

    let config = &mut settings.check;
    if let Some(globs) = string_array(check, "spec-globs") {
        config.spec_globs = globs;
    }
    if let Some(globs) = string_array(check, "code-globs") {
        config.code_globs = globs;
    }
    if let Some(patterns) = string_array(check, "spec-ignore") {
        config.spec_ignore = patterns;
    }
    if let Some(patterns) = string_array(check, "code-ignore") {
        config.code_ignore = patterns;
    }
    if let Some(patterns) = string_array(check, "ignore") {
        let merged = std::mem::take(config).with_ignore(patterns);
        *config = merged;
    }
    if let Some(ids) = string_array(check, "ignore-markers") {
        config.ignore_markers = ids;
    }
    if let Some(markers) = string_array(check, "markers") {
        config.markers = markers;
    }
    if let Some(pattern) = string(check, "id-pattern") {
        config.id_pattern = pattern;
    }
    if let Some(patterns) = string_array(check, "cross-ref-patterns") {
        config.cross_ref_patterns = patterns;
    }
    if let Some(dir) = string(check, "schema-dir") {
        config.schema_dir = PathBuf::from(dir);
    }
    if let Some(enabled) = boolean(check, "schema-enabled") {
        config.schema_enabled = enabled;
    }
    if let Some(allow) = boolean(check, "allow-warnings") {
        config.allow_warnings = allow;
    }
    if let Some(format) = string(check, "format") {
        match format.parse() {
            Ok(format) => settings.format = format,
            Err(_) => warn!("Unknown format '{format}' in config, using text"),
        }
    }

    Ok(settings)
}

/// An array of strings, or `None` (with a warning) for any other shape.
fn string_array(table: &Table, key: &str) -> Option<Vec<String>> {
    let value = table.get(key)?;
    let strings = value.as_array().and_then(|items| {
        items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<_>>>()
    });
    if strings.is_none() {
        warn!("Config key '{key}' should be an array of strings, using default");
    }
    strings
}

fn string(table: &Table, key: &str) -> Option<String> {
    let value = table.get(key)?;
    match value.as_str() {
        Some(s) => Some(s.to_string()),
        None => {
            warn!("Config key '{key}' should be a string, using default");
            None
        }
    }
}

fn boolean(table: &Table, key: &str) -> Option<bool> {
    let value = table.get(key)?;
    match value.as_bool() {
        Some(b) => Some(b),
        None => {
            warn!("Config key '{key}' should be a boolean, using default");
            None
        }
    }
}
