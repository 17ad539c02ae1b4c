//! Glob-based source discovery.
//!
//! A [`SourceSet`] is an ordered list of glob patterns relative to the
//! project root. Resolving it walks the filesystem every time, so a task that
//! re-runs after a file was added sees the new file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{GlobBuilder, GlobMatcher};
use walkdir::WalkDir;

/// Errors that can occur when resolving a source set.
#[derive(Debug, thiserror::Error)]
pub enum SourceSetError {
    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Failed to walk {path}: {message}")]
    WalkError { path: String, message: String },
}

/// A file matched by a source set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute (root-joined) path
    pub path: PathBuf,
    /// Path below the matching pattern's literal base directory
    pub relative: PathBuf,
}

/// An ordered list of glob patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    patterns: Vec<String>,
}

impl SourceSet {
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Resolve the patterns against `root`.
    ///
    /// Files come out in pattern order; within one pattern they follow a
    /// sorted directory walk. A file matched by an earlier pattern is not
    /// repeated.
    pub fn resolve(&self, root: &Path) -> Result<Vec<SourceFile>, SourceSetError> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for pattern in &self.patterns {
            let matcher = compile(pattern)?;
            let base = root.join(literal_base(pattern));

            if !base.exists() {
                continue;
            }

            for entry in WalkDir::new(&base).follow_links(true).sort_by_file_name() {
                let entry = entry.map_err(|e| SourceSetError::WalkError {
                    path: base.display().to_string(),
                    message: e.to_string(),
                })?;

                if !entry.file_type().is_file() {
                    continue;
                }

                let path = entry.path();
                let Ok(from_root) = path.strip_prefix(root) else {
                    continue;
                };

                if !matcher.is_match(to_glob_form(from_root)) {
                    continue;
                }

                if !seen.insert(path.to_path_buf()) {
                    continue;
                }

                let relative = if path == base {
                    PathBuf::from(path.file_name().unwrap_or_default())
                } else {
                    path.strip_prefix(&base).unwrap_or(path).to_path_buf()
                };

                files.push(SourceFile {
                    path: path.to_path_buf(),
                    relative,
                });
            }
        }

        Ok(files)
    }

    /// Whether a root-relative path is matched by any pattern.
    pub fn matches(&self, relative: &Path) -> bool {
        let candidate = to_glob_form(relative);
        self.patterns
            .iter()
            .filter_map(|p| compile(p).ok())
            .any(|m| m.is_match(&candidate))
    }
}

fn compile(pattern: &str) -> Result<GlobMatcher, SourceSetError> {
    GlobBuilder::new(pattern.trim_start_matches("./"))
        .literal_separator(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| SourceSetError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

/// The directory part of a pattern before its first wildcard component.
///
/// A pattern without wildcards names a single file; its base is that file
/// itself so the walk yields exactly one entry.
fn literal_base(pattern: &str) -> PathBuf {
    let mut base = PathBuf::new();
    for component in pattern.trim_start_matches("./").split('/') {
        if component.contains(['*', '?', '[', '{']) {
            return base;
        }
        base.push(component);
    }
    base
}

fn to_glob_form(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, rel).unwrap();
    }

    fn relatives(files: &[SourceFile]) -> Vec<String> {
        files
            .iter()
            .map(|f| to_glob_form(&f.relative))
            .collect()
    }

    #[test]
    fn computes_literal_base() {
        assert_eq!(literal_base("src/images/**/*.png"), PathBuf::from("src/images"));
        assert_eq!(literal_base("src/*.{php,ico}"), PathBuf::from("src"));
        assert_eq!(literal_base("src/js/common.js"), PathBuf::from("src/js/common.js"));
    }

    #[test]
    fn keeps_declared_order_with_vendor_last() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "src/js/homepage.js");
        touch(temp.path(), "src/js/common.js");
        touch(temp.path(), "src/js/vendor/b.js");
        touch(temp.path(), "src/js/vendor/a.js");

        let set = SourceSet::new(vec![
            "src/js/common.js".into(),
            "src/js/homepage.js".into(),
            "src/js/vendor/*.js".into(),
        ]);

        let files = set.resolve(temp.path()).unwrap();
        assert_eq!(
            relatives(&files),
            vec!["common.js", "homepage.js", "a.js", "b.js"]
        );
    }

    #[test]
    fn star_does_not_cross_directories() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "src/scss/main.scss");
        touch(temp.path(), "src/scss/bootstrap/_grid.scss");

        let set = SourceSet::new(vec!["src/scss/*.scss".into()]);
        let files = set.resolve(temp.path()).unwrap();

        assert_eq!(relatives(&files), vec!["main.scss"]);
    }

    #[test]
    fn preserves_structure_below_base() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "src/images/logo.png");
        touch(temp.path(), "src/images/icons/home.svg");
        touch(temp.path(), "src/images/notes.txt");

        let set = SourceSet::new(vec!["src/images/**/*.{png,svg}".into()]);
        let files = set.resolve(temp.path()).unwrap();

        assert_eq!(relatives(&files), vec!["icons/home.svg", "logo.png"]);
    }

    #[test]
    fn deduplicates_across_patterns() {
        let temp = tempdir().unwrap();
        touch(temp.path(), "src/js/common.js");

        let set = SourceSet::new(vec!["src/js/common.js".into(), "src/js/*.js".into()]);
        assert_eq!(set.resolve(temp.path()).unwrap().len(), 1);
    }

    #[test]
    fn missing_base_resolves_empty() {
        let temp = tempdir().unwrap();
        let set = SourceSet::new(vec!["node_modules/pkg/**/*".into()]);
        assert!(set.resolve(temp.path()).unwrap().is_empty());
    }

    #[test]
    fn matches_relative_paths() {
        let set = SourceSet::new(vec!["src/*.{php,ico,htaccess}".into()]);
        assert!(set.matches(Path::new("src/favicon.ico")));
        assert!(set.matches(Path::new("src/.htaccess")));
        assert!(!set.matches(Path::new("src/data/favicon.ico")));
    }

    #[test]
    fn rejects_invalid_pattern() {
        let temp = tempdir().unwrap();
        let set = SourceSet::new(vec!["src/[".into()]);
        assert!(matches!(
            set.resolve(temp.path()),
            Err(SourceSetError::InvalidPattern { .. })
        ));
    }
}
