//! Fixed-cadence scheduler driving queue runs.
//!
//! Every tick re-evaluates all queues. A queue that is not due, or that is
//! blocked by another running queue, is simply skipped until a later tick.
//! Runs are independent tasks; the ticker never waits on them.

use crate::puller::{RunProgress, RunReport, TreePuller};
use crate::session::Session;
use canopy_engine::{
    Eligibility, QueueConfig, QueueId, QueueRun, Record, SchedulerState, Timestamp,
};
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Point-in-time status of one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueStatus {
    pub id: QueueId,
    pub interval_secs: u64,
    pub exclusive: bool,
    pub last_sync_at: Option<Timestamp>,
    pub running: bool,
    /// Fetches of the current run not yet settled
    pub in_flight: usize,
}

struct Inner {
    state: Mutex<SchedulerState>,
    puller: TreePuller,
    session: Arc<dyn Session>,
    tick: Duration,
    progress: DashMap<QueueId, Arc<RunProgress>>,
}

/// Periodically starts due queues.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SyncScheduler {
    inner: Arc<Inner>,
}

impl SyncScheduler {
    /// Create a scheduler for `queues`, validating them.
    pub fn new(
        queues: Vec<QueueConfig>,
        puller: TreePuller,
        session: Arc<dyn Session>,
        tick: Duration,
    ) -> crate::error::Result<Self> {
        let state = SchedulerState::new(queues)?;
        Ok(Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                puller,
                session,
                tick,
                progress: DashMap::new(),
            }),
        })
    }

    /// Run the ticker until `shutdown` flips to true or its sender drops.
    ///
    /// Runs already started keep going after shutdown.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.inner.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(tick_ms = self.inner.tick.as_millis() as u64, "Scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick_at(Utc::now()).await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Scheduler stopped");
    }

    /// Evaluate every queue at `now` and start the eligible ones.
    ///
    /// Returns a handle per started run, resolving when that run completes.
    pub async fn tick_at(&self, now: Timestamp) -> Vec<JoinHandle<RunReport>> {
        let session = &self.inner.session;
        if !session.logged_in() || !session.online() {
            return Vec::new();
        }
        let Some(builder) = session.builder() else {
            return Vec::new();
        };

        let runs = {
            let mut state = self.inner.state.lock().await;
            let runs = state.start_due(now);

            for id in state.queue_ids() {
                if runs.iter().any(|run| run.queue_id == id) {
                    continue;
                }
                match state.eligibility(&id, now) {
                    Ok(Eligibility::AlreadyRunning) => {
                        tracing::debug!(queue = %id, "Queue still working");
                    }
                    Ok(Eligibility::WaitingFor(running)) => {
                        tracing::debug!(
                            queue = %id,
                            waiting_for = ?running,
                            "Queue waiting for running queues"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => tracing::warn!(queue = %id, error = %e, "Failed to evaluate queue"),
                }
            }

            runs
        };

        runs.into_iter()
            .map(|run| self.spawn_run(run, builder.clone()))
            .collect()
    }

    fn spawn_run(&self, run: QueueRun, root: Record) -> JoinHandle<RunReport> {
        let progress = Arc::new(RunProgress::new());
        self.inner
            .progress
            .insert(run.queue_id.clone(), progress.clone());

        tracing::info!(
            queue = %run.queue_id,
            incremental = run.is_incremental(),
            "Start"
        );

        let inner = self.inner.clone();
        tokio::spawn(async move {
            // A panicking pull must still release the queue
            let pull = tokio::spawn({
                let puller = inner.puller.clone();
                let run = run.clone();
                let progress = progress.clone();
                async move { puller.run(&run, root, progress).await }
            });

            let report = match pull.await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(queue = %run.queue_id, error = %e, "Pull aborted");
                    progress.report(&run.queue_id)
                }
            };

            let completed_at = Utc::now();
            inner.state.lock().await.finish(&run.queue_id, completed_at);
            inner.progress.remove(&run.queue_id);

            tracing::info!(
                queue = %run.queue_id,
                requests = report.requests,
                failures = report.failures,
                records = report.records,
                elapsed_ms = (completed_at - run.started_at).num_milliseconds(),
                "Pull finished"
            );

            report
        })
    }

    /// Forget every queue's last sync so each one next runs a full resync.
    pub async fn reset(&self) {
        self.inner.state.lock().await.reset();
        tracing::info!("Sync checkpoints cleared");
    }

    /// Last successful sync of a queue.
    pub async fn last_sync_at(&self, id: &str) -> Option<Timestamp> {
        self.inner.state.lock().await.last_sync_at(id)
    }

    /// Restore a queue's last sync, e.g. from persisted session data.
    pub async fn set_last_sync_at(&self, id: &str, at: Option<Timestamp>) {
        self.inner.state.lock().await.set_last_sync_at(id, at);
    }

    /// Status of every queue.
    pub async fn status(&self) -> Vec<QueueStatus> {
        let summaries = self.inner.state.lock().await.summaries();
        summaries
            .into_iter()
            .map(|s| {
                let in_flight = self
                    .inner
                    .progress
                    .get(&s.id)
                    .map(|p| p.in_flight())
                    .unwrap_or(0);
                QueueStatus {
                    id: s.id,
                    interval_secs: s.interval_secs,
                    exclusive: s.exclusive,
                    last_sync_at: s.last_sync_at,
                    running: s.running,
                    in_flight,
                }
            })
            .collect()
    }
}
