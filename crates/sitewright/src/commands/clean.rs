//! Remove an output tree.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sitewright_pipeline::{run_task, tasks::CleanTask, BuildContext, Mode};

use crate::config::ProjectConfig;

/// Run the clean command.
pub async fn run(root: &Path, config: ProjectConfig, production: bool) -> Result<()> {
    let mode = if production {
        Mode::Production
    } else {
        Mode::Development
    };
    let ctx = BuildContext::new(root, mode, Arc::new(config.registry));
    let output = ctx.output_root();

    let report = run_task(Arc::new(CleanTask), ctx)
        .await
        .with_context(|| format!("Failed to clean {}", output.display()))?;

    if report.files == 0 {
        tracing::info!("{} is already clean", output.display());
    } else {
        tracing::info!("Removed {}", output.display());
    }

    Ok(())
}
