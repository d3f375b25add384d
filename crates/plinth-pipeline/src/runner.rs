//! Single-flight task runner for watch triggers.
//!
//! A task never runs twice at once. Triggers that arrive while it runs
//! collapse into exactly one follow-up run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::context::BuildContext;
use crate::report::BatchReport;
use crate::tasks::{run_task, TaskKind};

/// What a trigger did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// The task was idle and is now running
    Started,
    /// The task is running; a follow-up run is now queued
    Queued,
    /// The task is running and a follow-up was already queued
    AlreadyQueued,
}

#[derive(Debug, Default)]
struct RunState {
    running: bool,
    queued: bool,
}

impl RunState {
    fn on_trigger(&mut self) -> Trigger {
        if !self.running {
            self.running = true;
            Trigger::Started
        } else if !self.queued {
            self.queued = true;
            Trigger::Queued
        } else {
            Trigger::AlreadyQueued
        }
    }

    /// Returns whether the task should run again.
    fn on_finish(&mut self) -> bool {
        if self.queued {
            self.queued = false;
            true
        } else {
            self.running = false;
            false
        }
    }
}

/// Runs transform tasks on demand, one run per task at a time.
pub struct TaskRunner {
    ctx: BuildContext,
    states: Mutex<HashMap<TaskKind, RunState>>,
    finished: broadcast::Sender<Arc<BatchReport>>,
}

impl TaskRunner {
    pub fn new(ctx: BuildContext) -> Arc<Self> {
        let (finished, _) = broadcast::channel(32);
        Arc::new(Self {
            ctx,
            states: Mutex::new(HashMap::new()),
            finished,
        })
    }

    /// Reports of every completed run.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BatchReport>> {
        self.finished.subscribe()
    }

    /// Request a run of `kind`. Must be called inside a tokio runtime.
    pub fn trigger(self: &Arc<Self>, kind: TaskKind) -> Trigger {
        let decision = self.states().entry(kind).or_default().on_trigger();
        match decision {
            Trigger::Started => {
                let runner = Arc::clone(self);
                tokio::spawn(async move { runner.drive(kind).await });
            }
            Trigger::Queued => tracing::debug!("[{}] busy, queued another run", kind),
            Trigger::AlreadyQueued => {}
        }
        decision
    }

    async fn drive(&self, kind: TaskKind) {
        loop {
            match run_task(kind, self.ctx.clone()).await {
                Ok(report) => {
                    report.log();
                    let _ = self.finished.send(Arc::new(report));
                }
                Err(e) => tracing::error!("{}", e),
            }

            let again = self.states().entry(kind).or_default().on_finish();
            if !again {
                break;
            }
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<TaskKind, RunState>> {
        self.states.lock().unwrap_or_else(|e| e.into_inner())
    }
}
