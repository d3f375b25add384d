//! Source watching: map changed files to the tasks that rebuild them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use plinth_pipeline::{PatternSet, RouteTable, TaskKind, TaskRunner};
use tokio::sync::mpsc as async_mpsc;

use crate::server::ServerError;

/// Raw events closer together than this are handled as one batch.
const COALESCE_WINDOW: Duration = Duration::from_millis(100);

/// Patterns whose changes re-run one task.
#[derive(Debug, Clone)]
pub struct WatchBinding {
    pub task: TaskKind,
    pub patterns: PatternSet,
}

/// One binding per task that has watch patterns.
pub fn bindings(routes: &RouteTable) -> Vec<WatchBinding> {
    TaskKind::ALL
        .into_iter()
        .filter_map(|task| {
            routes.watch(task.category()).map(|patterns| WatchBinding {
                task,
                patterns: patterns.clone(),
            })
        })
        .collect()
}

/// Tasks affected by a set of changed paths.
pub fn tasks_for<'a>(
    bindings: &[WatchBinding],
    paths: impl IntoIterator<Item = &'a Path>,
) -> BTreeSet<TaskKind> {
    let mut tasks = BTreeSet::new();
    for path in paths {
        for binding in bindings {
            if binding.patterns.is_match(path) {
                tasks.insert(binding.task);
            }
        }
    }
    tasks
}

/// Watches the source root and emits the tasks to re-run.
pub struct SourceWatcher {
    _watcher: RecommendedWatcher,
}

impl SourceWatcher {
    /// Start watching. Returns the watcher and a channel of coalesced task sets.
    pub fn new(
        routes: &RouteTable,
    ) -> Result<(Self, async_mpsc::Receiver<BTreeSet<TaskKind>>), ServerError> {
        let root = routes.source_root().to_path_buf();
        if !root.is_dir() {
            return Err(ServerError::Watch(format!(
                "source directory {} does not exist",
                root.display()
            )));
        }

        let (sync_tx, sync_rx) = mpsc::channel::<notify::Event>();
        let (async_tx, async_rx) = async_mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
            if let Ok(event) = res {
                let _ = sync_tx.send(event);
            }
        })
        .map_err(|e| ServerError::Watch(e.to_string()))?;

        watcher
            .watch(&root, RecursiveMode::Recursive)
            .map_err(|e| ServerError::Watch(e.to_string()))?;

        let bindings = bindings(routes);
        std::thread::spawn(move || {
            while let Ok(first) = sync_rx.recv() {
                let mut changed: Vec<PathBuf> = Vec::new();
                collect(&first, &mut changed);

                while let Ok(event) = sync_rx.recv_timeout(COALESCE_WINDOW) {
                    collect(&event, &mut changed);
                }

                let tasks = tasks_for(&bindings, changed.iter().map(|p| p.as_path()));
                if tasks.is_empty() {
                    continue;
                }
                tracing::debug!("{} changed path(s) -> {:?}", changed.len(), tasks);
                if async_tx.blocking_send(tasks).is_err() {
                    break;
                }
            }
        });

        Ok((Self { _watcher: watcher }, async_rx))
    }
}

fn collect(event: &notify::Event, changed: &mut Vec<PathBuf>) {
    if matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) {
        changed.extend(event.paths.iter().cloned());
    }
}

/// Watch the source tree until the process ends, re-running affected tasks.
pub async fn watch(routes: Arc<RouteTable>, runner: Arc<TaskRunner>) -> Result<(), ServerError> {
    let (watcher, mut rx) = SourceWatcher::new(&routes)?;
    tracing::info!("Watching {}", routes.source_root().display());

    while let Some(tasks) = rx.recv().await {
        for task in tasks {
            runner.trigger(task);
        }
    }

    drop(watcher);
    Ok(())
}
