//! Production build command.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use sitewright_pipeline::{Pipeline, Sequence};

use crate::config::ProjectConfig;

/// Run the build command.
pub async fn run(root: &Path, config: ProjectConfig) -> Result<()> {
    tracing::info!("Building production site...");

    let ctx = Sequence::Build.context(root, Arc::new(config.registry));
    let report = Pipeline::assets()
        .run(&ctx)
        .await
        .context("Build failed")?;

    super::log_report(&report);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[tokio::test]
    async fn builds_into_build_dir() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/index.html", "<p>\n  hi\n</p>\n");

        run(temp.path(), ProjectConfig::default()).await.unwrap();

        let html = fs::read_to_string(temp.path().join("build/index.html")).unwrap();
        assert!(html.starts_with("<!--\n  built with sitewright\n-->\n"));
    }

    #[tokio::test]
    async fn halting_failure_is_an_error() {
        let temp = tempdir().unwrap();
        write(temp.path(), "src/index.html", "@@include('missing.htm')");

        let err = run(temp.path(), ProjectConfig::default()).await.unwrap_err();

        assert!(format!("{err:#}").contains("html"));
    }
}
