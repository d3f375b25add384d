//! Composite build: clean, then every transform task concurrently.

use std::time::Instant;

use crate::clean;
use crate::context::BuildContext;
use crate::report::{BatchReport, BuildSummary, PipelineError};
use crate::tasks::{run_task, TaskKind};

/// Runs the clean and transform tasks for one site.
#[derive(Debug, Clone)]
pub struct SiteBuilder {
    ctx: BuildContext,
}

impl SiteBuilder {
    pub fn new(ctx: BuildContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    /// Delete the build root.
    pub async fn clean(&self) -> Result<(), PipelineError> {
        let routes = self.ctx.routes.clone();
        tokio::task::spawn_blocking(move || clean::clean(&routes))
            .await
            .map_err(|e| PipelineError::Join {
                task: "clean".to_string(),
                message: e.to_string(),
            })?
    }

    /// Run a single transform task and log its report.
    pub async fn run(&self, kind: TaskKind) -> Result<BatchReport, PipelineError> {
        let report = run_task(kind, self.ctx.clone()).await?;
        report.log();
        Ok(report)
    }

    /// Clean, then run all five transform tasks concurrently.
    ///
    /// Per-file failures end up in the summary, not in the error.
    pub async fn build(&self) -> Result<BuildSummary, PipelineError> {
        let start = Instant::now();
        tracing::info!(
            "Building {} -> {} ({})",
            self.ctx.routes.source_root().display(),
            self.ctx.routes.build_root().display(),
            self.ctx.mode
        );

        self.clean().await?;

        let (styles, scripts, pages, fonts, images) = tokio::join!(
            self.run(TaskKind::Styles),
            self.run(TaskKind::Scripts),
            self.run(TaskKind::Pages),
            self.run(TaskKind::Fonts),
            self.run(TaskKind::Images),
        );

        Ok(BuildSummary {
            reports: vec![styles?, scripts?, pages?, fonts?, images?],
            duration_ms: start.elapsed().as_millis() as u64,
        })
    }
}
