//! Build mode and the per-run context handed to every task.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::registry::PathRegistry;

/// Development or production output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Unminified, source-mapped, written to the dev root
    Development,
    /// Minified, headered, no maps, written to the build root
    Production,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Development => f.write_str("development"),
            Mode::Production => f.write_str("production"),
        }
    }
}

/// Immutable settings for one sequence run.
///
/// Cloning is cheap; the registry is shared.
#[derive(Debug, Clone)]
pub struct BuildContext {
    root: PathBuf,
    mode: Mode,
    registry: Arc<PathRegistry>,
}

impl BuildContext {
    pub fn new(root: impl Into<PathBuf>, mode: Mode, registry: Arc<PathRegistry>) -> Self {
        Self {
            root: root.into(),
            mode,
            registry,
        }
    }

    /// Project root all registry paths are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_production(&self) -> bool {
        self.mode == Mode::Production
    }

    pub fn registry(&self) -> &PathRegistry {
        &self.registry
    }

    pub fn shared_registry(&self) -> Arc<PathRegistry> {
        Arc::clone(&self.registry)
    }

    /// The mode-selected output root.
    pub fn output_root(&self) -> PathBuf {
        let paths = &self.registry.paths;
        match self.mode {
            Mode::Development => self.root.join(&paths.dev_dir),
            Mode::Production => self.root.join(&paths.build_dir),
        }
    }

    /// A directory below the output root.
    pub fn output_dir(&self, sub: impl AsRef<Path>) -> PathBuf {
        self.output_root().join(sub)
    }

    /// A path below the project sources root.
    pub fn source_dir(&self, sub: impl AsRef<Path>) -> PathBuf {
        self.root.join(sub)
    }
}
