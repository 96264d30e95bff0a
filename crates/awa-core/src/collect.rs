//! Glob-driven file collection with ignore filtering.

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Ignore patterns compiled for path filtering.
///
/// Every pattern matches at a path-segment boundary: `dist/**` ignores
/// `dist/app.js` and `packages/web/dist/app.js` alike. Patterns ending in
/// `/**` additionally stop the walker from descending into the directory.
#[derive(Debug, Clone, Default)]
pub struct IgnoreMatcher {
    patterns: Vec<Regex>,
    directories: Vec<Regex>,
}

impl IgnoreMatcher {
    pub fn new(patterns: &[String]) -> Self {
        let mut matcher = Self::default();
        for pattern in patterns {
            let pattern = pattern.replace('\\', "/");
            let Some(re) = ignore_regex(&pattern) else {
                warn!("Skipping invalid ignore pattern: {pattern}");
                continue;
            };
            if pattern.ends_with("/**") {
                matcher.directories.push(re.clone());
            }
            matcher.patterns.push(re);
        }
        matcher
    }

    /// Whether a root-relative file path is ignored.
    pub fn is_ignored(&self, relative: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(relative))
    }

    /// Whether the walker should skip a root-relative directory entirely.
    pub fn prunes_dir(&self, relative: &str) -> bool {
        if relative.is_empty() {
            return false;
        }
        let as_dir = format!("{relative}/");
        self.directories.iter().any(|re| re.is_match(&as_dir))
    }
}

/// Translate an ignore pattern into a segment-anchored regex:
/// escape it, then `**` -> `.*` and `*` -> `[^/]*`.
fn ignore_regex(pattern: &str) -> Option<Regex> {
    let body = pattern
        .split("**")
        .map(|part| {
            part.split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join("[^/]*")
        })
        .collect::<Vec<_>>()
        .join(".*");
    Regex::new(&format!("(^|/){body}($|/)")).ok()
}

/// Literal directory prefix of a glob, e.g. `.awa/specs/**/*.md` -> `.awa/specs`.
fn glob_base(pattern: &str) -> String {
    pattern
        .split('/')
        .take_while(|segment| !segment.contains(['*', '?', '[', '{']))
        .collect::<Vec<_>>()
        .join("/")
}

fn relative_str(path: &Path, root: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative.to_string_lossy().replace('\\', "/")
}

/// Read a file as text, replacing invalid UTF-8 sequences.
///
/// Only genuine I/O failures are errors; a stray Latin-1 byte in a comment
/// must not hide the rest of the file.
pub fn read_text(path: impl AsRef<Path>) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    })
}

/// Resolve glob patterns under `root` to a deduplicated set of root-relative
/// file paths, minus anything matching `ignore`.
///
/// Never fails: invalid globs are skipped with a warning, missing
/// directories and unreadable entries contribute nothing.
pub fn collect_files(root: &Path, globs: &[String], ignore: &[String]) -> BTreeSet<PathBuf> {
    let ignore = IgnoreMatcher::new(ignore);

    // Globs sharing a base directory share one walk.
    let mut by_base: BTreeMap<String, GlobSetBuilder> = BTreeMap::new();
    for pattern in globs {
        let pattern = pattern.replace('\\', "/");
        let glob = match GlobBuilder::new(&pattern).literal_separator(true).build() {
            Ok(glob) => glob,
            Err(e) => {
                warn!("Skipping invalid glob {pattern}: {e}");
                continue;
            }
        };
        by_base
            .entry(glob_base(&pattern))
            .or_insert_with(GlobSetBuilder::new)
            .add(glob);
    }

    let mut files = BTreeSet::new();
    for (base, builder) in by_base {
        let set = match builder.build() {
            Ok(set) => set,
            Err(e) => {
                warn!("Failed to compile globs under {base:?}: {e}");
                continue;
            }
        };
        walk_base(root, &base, &set, &ignore, &mut files);
    }
    files
}

fn walk_base(
    root: &Path,
    base: &str,
    globs: &GlobSet,
    ignore: &IgnoreMatcher,
    files: &mut BTreeSet<PathBuf>,
) {
    let start = if base.is_empty() {
        root.to_path_buf()
    } else {
        root.join(base)
    };

    if start.is_file() {
        let relative = relative_str(&start, root);
        if globs.is_match(&relative) && !ignore.is_ignored(&relative) {
            files.insert(PathBuf::from(relative));
        }
        return;
    }
    if !start.is_dir() {
        debug!("Glob base {} does not exist", start.display());
        return;
    }

    let prune_root = root.to_path_buf();
    let prune = ignore.clone();
    let walker = WalkBuilder::new(&start)
        .standard_filters(false)
        .hidden(false)
        .follow_links(true)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            !(is_dir && prune.prunes_dir(&relative_str(entry.path(), &prune_root)))
        })
        .build();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!("Skipping unreadable entry: {e}");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let relative = relative_str(entry.path(), root);
        if globs.is_match(&relative) && !ignore.is_ignored(&relative) {
            files.insert(PathBuf::from(relative));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    #[test]
    fn ignore_patterns_match_at_segment_boundaries() {
        let matcher = IgnoreMatcher::new(&strings(&["dist/**", "*.gen.ts"]));
        assert!(matcher.is_ignored("dist/app.js"));
        assert!(matcher.is_ignored("packages/web/dist/app.js"));
        assert!(!matcher.is_ignored("distribution/app.js"));
        assert!(matcher.is_ignored("src/api.gen.ts"));
        assert!(!matcher.is_ignored("src/api.ts"));
    }

    #[test]
    fn double_star_suffix_prunes_directories() {
        let matcher = IgnoreMatcher::new(&strings(&["node_modules/**", "*.log"]));
        assert!(matcher.prunes_dir("node_modules"));
        assert!(matcher.prunes_dir("app/node_modules"));
        assert!(!matcher.prunes_dir("src"));
        assert!(!matcher.prunes_dir("logs"));
    }

    #[test]
    fn glob_base_stops_at_first_wildcard() {
        assert_eq!(glob_base(".awa/specs/**/*.md"), ".awa/specs");
        assert_eq!(glob_base("**/*.rs"), "");
        assert_eq!(glob_base("src/main.rs"), "src/main.rs");
        assert_eq!(glob_base("src/*.{ts,js}"), "src");
    }

    #[test]
    fn collects_matching_files_and_skips_ignored_dirs() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(root, "src/lib.rs");
        touch(root, "src/nested/mod.rs");
        touch(root, "target/debug/build.rs");
        touch(root, "src/readme.md");

        let files = collect_files(root, &strings(&["**/*.rs"]), &strings(&["target/**"]));
        let files: Vec<_> = files.iter().map(|p| p.to_string_lossy().to_string()).collect();
        assert_eq!(files, vec!["src/lib.rs", "src/nested/mod.rs"]);
    }

    #[test]
    fn walks_hidden_spec_directories() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(root, ".awa/specs/REQ-DIFF-diff.md");
        touch(root, ".awa/tasks/TASK-DIFF-001.md");

        let files = collect_files(
            root,
            &strings(&[".awa/specs/**/*.md", ".awa/tasks/**/*.md"]),
            &[],
        );
        assert_eq!(files.len(), 2);
        assert!(files.contains(Path::new(".awa/specs/REQ-DIFF-diff.md")));
    }

    #[test]
    fn globs_sharing_a_base_share_one_walk() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(root, "src/a.ts");
        touch(root, "src/b.rs");
        touch(root, "src/c.md");
        let files = collect_files(root, &strings(&["src/**/*.ts", "src/**/*.rs"]), &[]);
        assert_eq!(
            files.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("src/a.ts"), PathBuf::from("src/b.rs")]
        );
    }

    #[test]
    fn read_text_replaces_invalid_utf8() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("latin1.txt");
        fs::write(&path, b"caf\xe9\nnext").unwrap();
        let text = read_text(&path).unwrap();
        assert_eq!(text.lines().nth(1), Some("next"));
        assert!(text.starts_with("caf"));
        assert!(read_text(temp.path().join("missing.txt")).is_err());
    }

    #[test]
    fn overlapping_globs_are_deduplicated() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path();
        touch(root, "src/a.ts");

        let files = collect_files(root, &strings(&["**/*.ts", "src/*.ts"]), &[]);
        assert_eq!(files.len(), 1);
    }

    #[test]
    fn missing_base_directory_yields_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let files = collect_files(temp.path(), &strings(&["nope/**/*.md"]), &[]);
        assert!(files.is_empty());
    }
}
