//! Transform tasks and their dispatch.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::context::BuildContext;
use crate::report::{BatchReport, PipelineError, TaskError};
use crate::routes::Category;
use crate::{copy, pages, scripts, styles};

/// The five transform tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TaskKind {
    Styles,
    Scripts,
    Pages,
    Fonts,
    Images,
}

impl TaskKind {
    pub const ALL: [TaskKind; 5] = [
        TaskKind::Styles,
        TaskKind::Scripts,
        TaskKind::Pages,
        TaskKind::Fonts,
        TaskKind::Images,
    ];

    pub fn name(self) -> &'static str {
        match self {
            TaskKind::Styles => "styles",
            TaskKind::Scripts => "scripts",
            TaskKind::Pages => "pages",
            TaskKind::Fonts => "fonts",
            TaskKind::Images => "images",
        }
    }

    /// Category whose output this task publishes.
    pub fn category(self) -> Category {
        match self {
            TaskKind::Styles => Category::Styles,
            TaskKind::Scripts => Category::Scripts,
            TaskKind::Pages => Category::Pages,
            TaskKind::Fonts => Category::Fonts,
            TaskKind::Images => Category::Images,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Run a task on the current thread.
pub fn run_blocking(kind: TaskKind, ctx: &BuildContext) -> BatchReport {
    let start = Instant::now();
    tracing::debug!("[{}] starting ({})", kind, ctx.mode);

    let outcomes = match kind {
        TaskKind::Styles => styles::run(ctx),
        TaskKind::Scripts => scripts::run(ctx),
        TaskKind::Pages => pages::run(ctx),
        TaskKind::Fonts | TaskKind::Images => copy::run(ctx, kind.category()),
    };

    BatchReport {
        task: kind,
        outcomes,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

/// Run a task on the blocking pool.
pub async fn run_task(kind: TaskKind, ctx: BuildContext) -> Result<BatchReport, PipelineError> {
    tokio::task::spawn_blocking(move || run_blocking(kind, &ctx))
        .await
        .map_err(|e| PipelineError::Join {
            task: kind.to_string(),
            message: e.to_string(),
        })
}

/// Write an output file, creating parent directories.
pub(crate) fn write_output(path: &Path, contents: &[u8]) -> Result<PathBuf, TaskError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| TaskError::write(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| TaskError::write(path, e))?;
    Ok(path.to_path_buf())
}
