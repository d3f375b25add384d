//! Per-file outcomes, batch reports and error types.

use std::path::{Path, PathBuf};

use plinth_bundler::BundleError;

use crate::tasks::TaskKind;

/// Failure of a single file inside a task. Never aborts the batch.
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("Failed to read {path}: {message}")]
    Read { path: String, message: String },

    #[error("Failed to write {path}: {message}")]
    Write { path: String, message: String },

    #[error("Failed to render {path}: {message}")]
    Render { path: String, message: String },

    #[error("Failed to compile {path}: {message}")]
    Compile { path: String, message: String },

    #[error("Failed to bundle {path}: {source}")]
    Bundle {
        path: String,
        #[source]
        source: BundleError,
    },

    #[error("{path} would publish '{name}', already published by {owner}")]
    NameConflict {
        path: String,
        name: String,
        owner: String,
    },
}

impl TaskError {
    pub(crate) fn read(path: &Path, e: impl std::fmt::Display) -> Self {
        Self::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    }

    pub(crate) fn write(path: &Path, e: impl std::fmt::Display) -> Self {
        Self::Write {
            path: path.display().to_string(),
            message: e.to_string(),
        }
    }
}

/// Errors that stop an operation as a whole.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Invalid browserslist query {query:?}: {message}")]
    Browsers { query: String, message: String },

    #[error("Refusing to clean {0}: it contains the source directory")]
    UnsafeClean(String),

    #[error("Failed to clean {path}: {message}")]
    Clean { path: String, message: String },

    #[error("Task {task} did not complete: {message}")]
    Join { task: String, message: String },
}

/// Result of processing one source file.
#[derive(Debug)]
pub struct FileOutcome {
    /// Source file
    pub source: PathBuf,

    /// Written output path, or why nothing was written
    pub result: Result<PathBuf, TaskError>,
}

impl FileOutcome {
    pub fn written(source: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            result: Ok(output.into()),
        }
    }

    pub fn failed(source: impl Into<PathBuf>, error: TaskError) -> Self {
        Self {
            source: source.into(),
            result: Err(error),
        }
    }
}

/// Everything a single task run produced.
#[derive(Debug)]
pub struct BatchReport {
    /// Task that ran
    pub task: TaskKind,

    /// One outcome per processed file
    pub outcomes: Vec<FileOutcome>,

    /// Run time in milliseconds
    pub duration_ms: u64,
}

impl BatchReport {
    /// Output files written by this run.
    pub fn written(&self) -> impl Iterator<Item = &Path> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().map(|p| p.as_path()))
    }

    /// Files that failed, with their errors.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &TaskError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.source.as_path(), e)))
    }

    pub fn written_count(&self) -> usize {
        self.written().count()
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    pub fn is_success(&self) -> bool {
        self.failure_count() == 0
    }

    /// Log each failure and a one-line summary.
    pub fn log(&self) {
        for (_, error) in self.failures() {
            tracing::error!("[{}] {}", self.task, error);
        }

        tracing::info!(
            "[{}] wrote {} file(s), {} failed in {}ms",
            self.task,
            self.written_count(),
            self.failure_count(),
            self.duration_ms
        );
    }
}

/// Reports of a composite build.
#[derive(Debug)]
pub struct BuildSummary {
    pub reports: Vec<BatchReport>,
    pub duration_ms: u64,
}

impl BuildSummary {
    pub fn report(&self, task: TaskKind) -> Option<&BatchReport> {
        self.reports.iter().find(|r| r.task == task)
    }

    pub fn written_count(&self) -> usize {
        self.reports.iter().map(|r| r.written_count()).sum()
    }

    pub fn failure_count(&self) -> usize {
        self.reports.iter().map(|r| r.failure_count()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separates_written_and_failed() {
        let report = BatchReport {
            task: TaskKind::Pages,
            outcomes: vec![
                FileOutcome::written("src/pages/index.hbs", "build/index.html"),
                FileOutcome::failed(
                    "src/pages/broken.hbs",
                    TaskError::Render {
                        path: "src/pages/broken.hbs".into(),
                        message: "Partial not found footer".into(),
                    },
                ),
            ],
            duration_ms: 3,
        };

        assert_eq!(report.written_count(), 1);
        assert_eq!(report.failure_count(), 1);
        assert!(!report.is_success());

        let (path, error) = report.failures().next().unwrap();
        assert_eq!(path, Path::new("src/pages/broken.hbs"));
        assert!(error.to_string().contains("Partial not found"));
    }
}
