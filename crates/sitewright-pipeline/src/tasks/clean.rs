//! Output tree removal.

use std::fs;
use std::io::ErrorKind;

use crate::context::BuildContext;
use crate::task::{Category, Task, TaskError, TaskReport};

/// Removes the mode-selected output root.
#[derive(Debug, Default)]
pub struct CleanTask;

impl Task for CleanTask {
    fn name(&self) -> &'static str {
        "clean"
    }

    fn category(&self) -> Category {
        Category::Clean
    }

    fn run(&self, ctx: &BuildContext) -> Result<TaskReport, TaskError> {
        let output = ctx.output_root();
        let sources = ctx.source_dir(&ctx.registry().paths.src);

        // An output root of "." or "" would take the sources with it.
        if sources.starts_with(&output) {
            return Err(TaskError::CleanRefused(output.display().to_string()));
        }

        match fs::remove_dir_all(&output) {
            Ok(()) => {
                tracing::debug!("Removed {}", output.display());
                Ok(TaskReport::files(1))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(TaskReport::files(0)),
            Err(e) => Err(TaskError::WriteError {
                path: output.display().to_string(),
                message: e.to_string(),
            }),
        }
    }
}
