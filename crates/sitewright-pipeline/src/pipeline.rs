//! Task sequences.
//!
//! A [`Pipeline`] runs its tasks strictly one after another. Each task runs on
//! the blocking pool and is awaited before the next one starts. A failing task
//! either halts the sequence or is logged and skipped, depending on its
//! category's failure policy.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use crate::context::{BuildContext, Mode};
use crate::registry::{FailurePolicy, PathRegistry};
use crate::task::{Task, TaskError, TaskReport};
use crate::tasks::{
    CleanTask, CopyTask, FolderCopyTask, HtmlTask, ImageTask, ScriptTask, StyleTask, VendorTask,
};

/// The two entry sequences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sequence {
    /// Development build; the caller then serves and watches
    Default,
    /// One-shot production build
    Build,
}

impl Sequence {
    pub fn mode(self) -> Mode {
        match self {
            Sequence::Default => Mode::Development,
            Sequence::Build => Mode::Production,
        }
    }

    /// Create the context a run of this sequence uses.
    pub fn context(self, root: impl Into<PathBuf>, registry: Arc<PathRegistry>) -> BuildContext {
        BuildContext::new(root, self.mode(), registry)
    }
}

/// Errors that stop a sequence.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Task '{task}' failed: {source}")]
    Halted {
        task: &'static str,
        #[source]
        source: TaskError,
    },
}

/// How one task ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Succeeded(TaskReport),
    /// Failed under a continue-on-error policy
    Failed(String),
}

/// Per-task record in a [`PipelineReport`].
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub task: &'static str,
    pub outcome: Outcome,
    pub duration_ms: u64,
}

/// Result of a completed sequence.
#[derive(Debug)]
pub struct PipelineReport {
    pub mode: Mode,
    pub tasks: Vec<TaskOutcome>,
    pub duration_ms: u64,
    pub output_dir: PathBuf,
}

impl PipelineReport {
    /// Tasks that failed without halting the sequence.
    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.outcome, Outcome::Failed(_)))
    }

    pub fn files(&self) -> usize {
        self.tasks
            .iter()
            .map(|t| match &t.outcome {
                Outcome::Succeeded(report) => report.files,
                Outcome::Failed(_) => 0,
            })
            .sum()
    }
}

/// An ordered list of tasks.
pub struct Pipeline {
    tasks: Vec<Arc<dyn Task>>,
}

impl Pipeline {
    pub fn new(tasks: Vec<Arc<dyn Task>>) -> Self {
        Self { tasks }
    }

    /// The asset tasks both sequences run, in order. The sequences differ
    /// only in the context they run against and what the caller does after.
    ///
    /// Vendor stages that feed the sources precede the task that consumes
    /// them: the icon stylesheet and framework styles run before `styles`,
    /// the framework script before `scripts`.
    pub fn assets() -> Self {
        Self::new(vec![
            Arc::new(CleanTask),
            Arc::new(HtmlTask),
            Arc::new(FolderCopyTask),
            Arc::new(ImageTask),
            Arc::new(VendorTask::icons_stylesheet()),
            Arc::new(VendorTask::icon_fonts()),
            Arc::new(VendorTask::bootstrap_styles()),
            Arc::new(StyleTask),
            Arc::new(VendorTask::bootstrap_script()),
            Arc::new(ScriptTask),
            Arc::new(CopyTask::others()),
            Arc::new(CopyTask::plugins()),
        ])
    }

    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    /// Run every task in order against `ctx`.
    pub async fn run(&self, ctx: &BuildContext) -> Result<PipelineReport, PipelineError> {
        let start = Instant::now();
        tracing::info!("Running {} tasks in {} mode", self.tasks.len(), ctx.mode());

        let mut outcomes = Vec::with_capacity(self.tasks.len());

        for task in &self.tasks {
            let task_start = Instant::now();
            let result = run_task(Arc::clone(task), ctx.clone()).await;
            let duration_ms = task_start.elapsed().as_millis() as u64;

            let outcome = match result {
                Ok(report) => {
                    tracing::info!(
                        "{} finished: {} files in {}ms",
                        task.name(),
                        report.files,
                        duration_ms
                    );
                    Outcome::Succeeded(report)
                }
                Err(e) => match task.category().policy(ctx.registry()) {
                    FailurePolicy::Halt => {
                        tracing::error!("{} failed: {}", task.name(), e);
                        return Err(PipelineError::Halted {
                            task: task.name(),
                            source: e,
                        });
                    }
                    FailurePolicy::Continue => {
                        tracing::error!("{} failed, continuing: {}", task.name(), e);
                        Outcome::Failed(e.to_string())
                    }
                },
            };

            outcomes.push(TaskOutcome {
                task: task.name(),
                outcome,
                duration_ms,
            });
        }

        Ok(PipelineReport {
            mode: ctx.mode(),
            tasks: outcomes,
            duration_ms: start.elapsed().as_millis() as u64,
            output_dir: ctx.output_root(),
        })
    }
}

/// Run a single task on the blocking pool.
pub async fn run_task(task: Arc<dyn Task>, ctx: BuildContext) -> Result<TaskReport, TaskError> {
    tracing::debug!("Starting {}", task.name());
    tokio::task::spawn_blocking(move || task.run(&ctx))
        .await
        .map_err(|e| TaskError::Panicked(e.to_string()))?
}
