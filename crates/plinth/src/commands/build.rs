//! Build, clean and single-task commands.

use anyhow::Result;
use plinth_pipeline::{BuildSummary, SiteBuilder, TaskKind};

use super::Settings;

/// Clean, then run every transform task.
pub async fn run(settings: Settings) -> Result<()> {
    let summary = SiteBuilder::new(settings.context).build().await?;
    log_summary(&summary);
    Ok(())
}

/// Delete the build directory.
pub async fn clean(settings: Settings) -> Result<()> {
    let builder = SiteBuilder::new(settings.context);
    builder.clean().await?;
    tracing::info!("Removed {}", builder.context().routes.build_root().display());
    Ok(())
}

/// Run one transform task without cleaning first.
pub async fn run_single(settings: Settings, kind: TaskKind) -> Result<()> {
    SiteBuilder::new(settings.context).run(kind).await?;
    Ok(())
}

pub(crate) fn log_summary(summary: &BuildSummary) {
    if summary.failure_count() > 0 {
        tracing::warn!(
            "Built {} file(s) with {} failure(s) in {}ms",
            summary.written_count(),
            summary.failure_count(),
            summary.duration_ms
        );
    } else {
        tracing::info!(
            "Built {} file(s) in {}ms",
            summary.written_count(),
            summary.duration_ms
        );
    }
}
