//! The task abstraction every build step implements.

use std::fmt;

use crate::context::BuildContext;
use crate::include::IncludeError;
use crate::registry::{FailurePolicy, PathRegistry};
use crate::source::SourceSetError;

/// Which failure policy governs a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Clean,
    Html,
    Styles,
    Scripts,
    Images,
    Copy,
}

impl Category {
    /// Look up this category's policy in the registry.
    pub fn policy(self, registry: &PathRegistry) -> FailurePolicy {
        let failure = &registry.failure;
        match self {
            Category::Clean => failure.clean,
            Category::Html => failure.html,
            Category::Styles => failure.styles,
            Category::Scripts => failure.scripts,
            Category::Images => failure.images,
            Category::Copy => failure.copy,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Clean => "clean",
            Category::Html => "html",
            Category::Styles => "styles",
            Category::Scripts => "scripts",
            Category::Images => "images",
            Category::Copy => "copy",
        };
        f.write_str(name)
    }
}

/// What a successful task did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskReport {
    /// Files written (or removed, for clean)
    pub files: usize,
}

impl TaskReport {
    pub fn files(files: usize) -> Self {
        Self { files }
    }
}

/// Errors a task can return.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error(transparent)]
    Source(#[from] SourceSetError),

    #[error(transparent)]
    Include(#[from] IncludeError),

    #[error("Failed to read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("Failed to write {path}: {message}")]
    WriteError { path: String, message: String },

    #[error("{} failed to compile", style_entries(.0))]
    StyleErrors(Vec<String>),

    #[error("Failed to transform script {path}: {message}")]
    ScriptError { path: String, message: String },

    #[error("Failed to optimize image {path}: {message}")]
    ImageError { path: String, message: String },

    #[error("Refusing to clean {0}: it contains the project sources")]
    CleanRefused(String),

    #[error("Task panicked: {0}")]
    Panicked(String),
}

fn style_entries(failures: &[String]) -> String {
    match failures.len() {
        1 => "1 style entry".to_string(),
        n => format!("{} style entries", n),
    }
}

/// A discrete build step.
///
/// Implementations read everything they need from the context on each call
/// and must not cache mode-dependent state between calls.
pub trait Task: Send + Sync {
    /// Stable task identifier used in logs and reports
    fn name(&self) -> &'static str;

    /// Category that selects the failure policy
    fn category(&self) -> Category;

    /// Run the task to completion.
    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_policy() {
        let registry = PathRegistry::default();
        assert_eq!(Category::Styles.policy(&registry), FailurePolicy::Continue);
        assert_eq!(Category::Scripts.policy(&registry), FailurePolicy::Halt);
    }

    #[test]
    fn formats_style_errors() {
        let one = TaskError::StyleErrors(vec!["a".into()]);
        let two = TaskError::StyleErrors(vec!["a".into(), "b".into()]);
        assert_eq!(one.to_string(), "1 style entry failed to compile");
        assert_eq!(two.to_string(), "2 style entries failed to compile");
    }
}
