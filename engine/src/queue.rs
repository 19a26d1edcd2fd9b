//! Sync queues and the scheduler state machine.
//!
//! Each queue is either idle or running. The scheduler asks
//! [`SchedulerState::start_due`] on every tick; queues that pass the
//! eligibility checks move to running and come back only through
//! [`SchedulerState::finish`].

use crate::time::{elapsed_secs, to_iso};
use crate::tree::ResourceNode;
use crate::{Error, QueueId, Result, Timestamp};
use std::collections::BTreeSet;

/// Static configuration of one queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Unique queue identifier
    pub id: QueueId,
    /// Minimum seconds between runs
    pub interval_secs: u64,
    /// Whether this queue must run alone
    pub exclusive: bool,
    /// Resource trees pulled by this queue
    pub roots: Vec<ResourceNode>,
}

impl QueueConfig {
    /// Create a non-exclusive queue with no roots.
    pub fn new(id: impl Into<QueueId>, interval_secs: u64) -> Self {
        Self {
            id: id.into(),
            interval_secs,
            exclusive: false,
            roots: Vec::new(),
        }
    }

    /// Mark the queue as exclusive.
    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Add a root resource tree.
    pub fn root(mut self, node: ResourceNode) -> Self {
        self.roots.push(node);
        self
    }

    /// Validate the queue and all of its trees.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::InvalidConfig("queue has an empty id".into()));
        }
        if self.interval_secs == 0 {
            return Err(Error::InvalidConfig(format!(
                "queue '{}' has a zero interval",
                self.id
            )));
        }
        self.roots.iter().try_for_each(ResourceNode::validate)
    }
}

/// Queues currently running.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingSet(BTreeSet<QueueId>);

impl ProcessingSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a queue as running. Returns false if it already was.
    pub fn insert(&mut self, id: &str) -> bool {
        self.0.insert(id.to_string())
    }

    /// Mark a queue as finished. Returns false if it was not running.
    pub fn remove(&mut self, id: &str) -> bool {
        self.0.remove(id)
    }

    /// Check whether a queue is running.
    pub fn contains(&self, id: &str) -> bool {
        self.0.contains(id)
    }

    /// Running queue ids.
    pub fn iter(&self) -> impl Iterator<Item = &QueueId> {
        self.0.iter()
    }

    /// Number of running queues.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if nothing is running.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Outcome of evaluating a queue on a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// The queue may start now
    Due,
    /// The queue is already running
    AlreadyRunning,
    /// Exclusivity rules block the queue until these finish
    WaitingFor(Vec<QueueId>),
    /// The interval has not elapsed yet
    NotDue { remaining_secs: i64 },
    /// The queue has no resource trees
    Empty,
}

/// A run handed to the puller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueRun {
    /// Queue being run
    pub queue_id: QueueId,
    /// Trees to pull
    pub roots: Vec<ResourceNode>,
    /// Previous successful sync, if any; makes the run incremental
    pub modified_since: Option<Timestamp>,
    /// When the run was started
    pub started_at: Timestamp,
}

impl QueueRun {
    /// Incremental filter value for this run.
    pub fn modified_since_iso(&self) -> Option<String> {
        self.modified_since.map(to_iso)
    }

    /// Whether this run only fetches changes.
    pub fn is_incremental(&self) -> bool {
        self.modified_since.is_some()
    }
}

/// Point-in-time view of a queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSummary {
    pub id: QueueId,
    pub interval_secs: u64,
    pub exclusive: bool,
    pub last_sync_at: Option<Timestamp>,
    pub running: bool,
}

#[derive(Debug, Clone)]
struct QueueState {
    config: QueueConfig,
    last_sync_at: Option<Timestamp>,
}

/// All mutable scheduling state.
#[derive(Debug, Clone)]
pub struct SchedulerState {
    queues: Vec<QueueState>,
    processing: ProcessingSet,
}

impl SchedulerState {
    /// Create state for the given queues, validating them.
    pub fn new(queues: Vec<QueueConfig>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for queue in &queues {
            queue.validate()?;
            if !seen.insert(queue.id.clone()) {
                return Err(Error::InvalidConfig(format!(
                    "duplicate queue id '{}'",
                    queue.id
                )));
            }
        }

        Ok(Self {
            queues: queues
                .into_iter()
                .map(|config| QueueState {
                    config,
                    last_sync_at: None,
                })
                .collect(),
            processing: ProcessingSet::new(),
        })
    }

    fn queue(&self, id: &str) -> Option<&QueueState> {
        self.queues.iter().find(|q| q.config.id == id)
    }

    fn queue_mut(&mut self, id: &str) -> Option<&mut QueueState> {
        self.queues.iter_mut().find(|q| q.config.id == id)
    }

    /// Evaluate whether a queue may start at `now`.
    pub fn eligibility(&self, id: &str, now: Timestamp) -> Result<Eligibility> {
        let queue = self
            .queue(id)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown queue '{id}'")))?;

        if self.processing.contains(id) {
            return Ok(Eligibility::AlreadyRunning);
        }

        if queue.config.exclusive && !self.processing.is_empty() {
            return Ok(Eligibility::WaitingFor(
                self.processing.iter().cloned().collect(),
            ));
        }

        let blocking: Vec<QueueId> = self
            .processing
            .iter()
            .filter(|running| self.queue(running).is_some_and(|q| q.config.exclusive))
            .cloned()
            .collect();
        if !blocking.is_empty() {
            return Ok(Eligibility::WaitingFor(blocking));
        }

        if let Some(last) = queue.last_sync_at {
            let elapsed = elapsed_secs(now, last);
            let interval = i64::try_from(queue.config.interval_secs).unwrap_or(i64::MAX);
            if elapsed < interval {
                return Ok(Eligibility::NotDue {
                    remaining_secs: interval - elapsed,
                });
            }
        }

        if queue.config.roots.is_empty() {
            return Ok(Eligibility::Empty);
        }

        Ok(Eligibility::Due)
    }

    /// Start a queue if it is eligible.
    pub fn start(&mut self, id: &str, now: Timestamp) -> Result<Option<QueueRun>> {
        if self.eligibility(id, now)? != Eligibility::Due {
            return Ok(None);
        }

        self.processing.insert(id);
        let queue = self
            .queue(id)
            .ok_or_else(|| Error::InvalidConfig(format!("unknown queue '{id}'")))?;

        Ok(Some(QueueRun {
            queue_id: queue.config.id.clone(),
            roots: queue.config.roots.clone(),
            modified_since: queue.last_sync_at,
            started_at: now,
        }))
    }

    /// Evaluate every queue in configuration order and start the due ones.
    ///
    /// Queues started earlier in the same pass count as running for the
    /// exclusivity checks of later ones.
    pub fn start_due(&mut self, now: Timestamp) -> Vec<QueueRun> {
        let ids: Vec<QueueId> = self.queues.iter().map(|q| q.config.id.clone()).collect();
        ids.iter()
            .filter_map(|id| self.start(id, now).ok().flatten())
            .collect()
    }

    /// Mark a run as complete at `completed_at`.
    pub fn finish(&mut self, id: &str, completed_at: Timestamp) {
        if let Some(queue) = self.queue_mut(id) {
            queue.last_sync_at = Some(completed_at);
        }
        self.processing.remove(id);
    }

    /// Forget every queue's last sync so the next runs are full resyncs.
    pub fn reset(&mut self) {
        for queue in &mut self.queues {
            queue.last_sync_at = None;
        }
    }

    /// Last successful sync of a queue.
    pub fn last_sync_at(&self, id: &str) -> Option<Timestamp> {
        self.queue(id).and_then(|q| q.last_sync_at)
    }

    /// Restore a previously recorded last sync.
    pub fn set_last_sync_at(&mut self, id: &str, at: Option<Timestamp>) {
        if let Some(queue) = self.queue_mut(id) {
            queue.last_sync_at = at;
        }
    }

    /// Check whether a queue is running.
    pub fn is_running(&self, id: &str) -> bool {
        self.processing.contains(id)
    }

    /// Currently running queues.
    pub fn processing(&self) -> &ProcessingSet {
        &self.processing
    }

    /// Configured queue ids, in evaluation order.
    pub fn queue_ids(&self) -> Vec<QueueId> {
        self.queues.iter().map(|q| q.config.id.clone()).collect()
    }

    /// Summaries of every queue.
    pub fn summaries(&self) -> Vec<QueueSummary> {
        self.queues
            .iter()
            .map(|q| QueueSummary {
                id: q.config.id.clone(),
                interval_secs: q.config.interval_secs,
                exclusive: q.config.exclusive,
                last_sync_at: q.last_sync_at,
                running: self.processing.contains(&q.config.id),
            })
            .collect()
    }
}
