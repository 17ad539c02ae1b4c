pub mod build;
pub mod clean;
pub mod dev;
pub mod init;

use sitewright_pipeline::PipelineReport;

/// Log the summary of a finished sequence.
fn log_report(report: &PipelineReport) {
    let failed: Vec<&str> = report.failures().map(|t| t.task).collect();
    if !failed.is_empty() {
        tracing::warn!("Completed with failed tasks: {}", failed.join(", "));
    }

    tracing::info!(
        "Built {} files in {}ms ({} mode)",
        report.files(),
        report.duration_ms,
        report.mode
    );
    tracing::info!("Output: {}", report.output_dir.display());
}
