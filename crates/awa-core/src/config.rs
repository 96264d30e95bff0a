//! Engine configuration.
//!
//! [`CheckConfig`] is a plain value: every scan, parse and check receives it
//! explicitly, and `Default` supplies the conventional `.awa/` layout.

use crate::ids::DEFAULT_ID_PATTERN;
use std::path::PathBuf;

/// File extensions scanned for markers by default.
pub const CODE_EXTENSIONS: &[&str] = &[
    "ts", "tsx", "js", "jsx", "mjs", "cjs", "mts", "cts", // JavaScript/TypeScript
    "py", "pyi", // Python
    "go", "rs", "zig", // systems
    "c", "h", "cpp", "cc", "cxx", "hpp", // C/C++
    "java", "kt", "kts", "scala", "groovy", // JVM
    "cs", "fs", "vb", // .NET
    "swift", "m", "mm", "dart", // mobile
    "rb", "php", "lua", "pl", "r", // scripting
    "ex", "exs", "erl", "hs", "ml", "clj", "jl", // functional
    "sh", "bash", "zsh", "ps1", // shells
    "vue", "svelte", "astro", // web components
    "sql", "graphql", "proto", // schemas
];

pub const DEFAULT_SPEC_GLOBS: &[&str] = &[
    ".awa/specs/**/*.md",
    ".awa/tasks/**/*.md",
    ".awa/plans/**/*.md",
    ".awa/align/**/*.md",
];

pub const DEFAULT_CODE_IGNORE: &[&str] = &[
    "node_modules/**",
    "dist/**",
    "vendor/**",
    "target/**",
    "build/**",
    "out/**",
    ".awa/**",
];

pub const DEFAULT_MARKERS: [&str; 3] = ["@awa-impl", "@awa-test", "@awa-component"];

pub const DEFAULT_CROSS_REF_PATTERNS: &[&str] = &["IMPLEMENTS:", "VALIDATES:"];

pub const DEFAULT_SCHEMA_DIR: &str = ".awa/.agent/schemas";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckConfig {
    /// Globs selecting Markdown spec files, relative to the project root
    pub spec_globs: Vec<String>,
    /// Globs selecting source files to scan for markers
    pub code_globs: Vec<String>,
    pub spec_ignore: Vec<String>,
    pub code_ignore: Vec<String>,
    /// Marker IDs exempt from orphan and format checks
    pub ignore_markers: Vec<String>,
    /// Marker names in impl, test, component order
    pub markers: Vec<String>,
    /// Regex body every non-component marker ID must match
    pub id_pattern: String,
    /// Literal substrings introducing a cross-reference line
    pub cross_ref_patterns: Vec<String>,
    pub schema_dir: PathBuf,
    pub schema_enabled: bool,
    pub allow_warnings: bool,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            spec_globs: to_strings(DEFAULT_SPEC_GLOBS),
            code_globs: CODE_EXTENSIONS
                .iter()
                .map(|ext| format!("**/*.{ext}"))
                .collect(),
            spec_ignore: Vec::new(),
            code_ignore: to_strings(DEFAULT_CODE_IGNORE),
            ignore_markers: Vec::new(),
            markers: to_strings(&DEFAULT_MARKERS),
            id_pattern: DEFAULT_ID_PATTERN.to_string(),
            cross_ref_patterns: to_strings(DEFAULT_CROSS_REF_PATTERNS),
            schema_dir: PathBuf::from(DEFAULT_SCHEMA_DIR),
            schema_enabled: true,
            allow_warnings: false,
        }
    }
}

impl CheckConfig {
    /// Append ignore patterns that apply to both spec and code collection.
    pub fn with_ignore(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        for pattern in patterns {
            let pattern = pattern.into();
            self.spec_ignore.push(pattern.clone());
            self.code_ignore.push(pattern);
        }
        self
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
