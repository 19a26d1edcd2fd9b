//! Recursive pull of resource trees.
//!
//! Sibling nodes are pulled concurrently. For a single node the parent
//! contexts are fetched strictly one after another, so a wide parent level
//! never bursts the remote service. Each successful fetch is persisted and
//! then schedules its children as a separate task that the parent chain
//! awaits before it completes. A run is finished only when every fetch it
//! scheduled, at any depth, has settled.

use crate::error::Result;
use crate::remote::{FetchOptions, RemoteFetcher};
use crate::store::LocalStore;
use canopy_engine::{merge, Params, QueueId, QueueRun, Record, ResourceNode, StoreKey};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Live counters of a queue run.
#[derive(Debug, Default)]
pub struct RunProgress {
    in_flight: AtomicUsize,
    requests: AtomicUsize,
    failures: AtomicUsize,
    records: AtomicUsize,
}

impl RunProgress {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches issued but not yet settled.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn begin_fetch(&self) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.requests.fetch_add(1, Ordering::SeqCst);
    }

    fn end_fetch(&self, fetched: Option<usize>) {
        match fetched {
            Some(count) => {
                self.records.fetch_add(count, Ordering::SeqCst);
            }
            None => {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    /// Summarize the counters.
    pub fn report(&self, queue_id: &str) -> RunReport {
        RunReport {
            queue_id: queue_id.to_string(),
            requests: self.requests.load(Ordering::SeqCst),
            failures: self.failures.load(Ordering::SeqCst),
            records: self.records.load(Ordering::SeqCst),
        }
    }
}

/// Outcome of a finished queue run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Queue that ran
    pub queue_id: QueueId,
    /// Fetches issued
    pub requests: usize,
    /// Fetches that failed
    pub failures: usize,
    /// Records received
    pub records: usize,
}

struct RunContext {
    queue_id: QueueId,
    modified_since: Option<String>,
    progress: Arc<RunProgress>,
}

/// Fetches resource trees and persists them into the local store.
#[derive(Clone)]
pub struct TreePuller {
    store: Arc<dyn LocalStore>,
    fetcher: Arc<dyn RemoteFetcher>,
}

impl TreePuller {
    /// Create a puller over a store and a fetcher.
    pub fn new(store: Arc<dyn LocalStore>, fetcher: Arc<dyn RemoteFetcher>) -> Self {
        Self { store, fetcher }
    }

    /// The store results are written to.
    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    /// Pull every tree of `run` starting from the single root context.
    pub async fn run(&self, run: &QueueRun, root: Record, progress: Arc<RunProgress>) -> RunReport {
        let ctx = Arc::new(RunContext {
            queue_id: run.queue_id.clone(),
            modified_since: run.modified_since_iso(),
            progress,
        });

        self.pull(ctx.clone(), run.roots.clone(), vec![root]).await;

        ctx.progress.report(&ctx.queue_id)
    }

    fn pull(
        &self,
        ctx: Arc<RunContext>,
        nodes: Vec<ResourceNode>,
        contexts: Vec<Record>,
    ) -> BoxFuture<'static, ()> {
        let puller = self.clone();
        async move {
            let branches = nodes
                .into_iter()
                .map(|node| puller.pull_node(ctx.clone(), node, contexts.clone()));
            join_all(branches).await;
        }
        .boxed()
    }

    async fn pull_node(&self, ctx: Arc<RunContext>, node: ResourceNode, contexts: Vec<Record>) {
        let options = FetchOptions::named(&node.name);
        let mut children: Vec<JoinHandle<()>> = Vec::new();

        for context in &contexts {
            let params = node.request_params(context, ctx.modified_since.as_deref());

            ctx.progress.begin_fetch();
            let result = self.fetcher.get(&node.url, &params, &options).await;

            match result {
                Ok(records) => {
                    let fetched = records.len();
                    tracing::debug!(
                        queue = %ctx.queue_id,
                        node = %node.name,
                        records = fetched,
                        "Fetched"
                    );

                    let child_contexts = node
                        .has_children()
                        .then(|| ResourceNode::child_contexts(&params, &records));

                    if let Err(e) = self.persist(&node.url, &params, records) {
                        tracing::warn!(
                            queue = %ctx.queue_id,
                            node = %node.name,
                            error = %e,
                            "Failed to store fetched records"
                        );
                    }

                    if let Some(child_contexts) = child_contexts {
                        children.push(tokio::spawn(self.pull(
                            ctx.clone(),
                            node.children.clone(),
                            child_contexts,
                        )));
                    }

                    ctx.progress.end_fetch(Some(fetched));
                }
                Err(e) => {
                    ctx.progress.end_fetch(None);
                    tracing::warn!(
                        queue = %ctx.queue_id,
                        node = %node.name,
                        error = %e,
                        "Fetch failed"
                    );
                }
            }
        }

        for child in children {
            if let Err(e) = child.await {
                tracing::error!(
                    queue = %ctx.queue_id,
                    node = %node.name,
                    error = %e,
                    "Child pull aborted"
                );
            }
        }
    }

    /// Write fetched records under their canonical key.
    ///
    /// Incremental fetches are merged into a non-empty stored sequence; all
    /// other fetches replace it. Returns the stored sequence length.
    pub fn persist(&self, url: &str, params: &Params, fetched: Vec<Record>) -> Result<usize> {
        let key = StoreKey::for_request(url, params);
        let stored = self.store.get(&key)?;
        let merged = merge::merge_fetched(stored, fetched, params.is_incremental());
        let count = merged.len();
        self.store.set(&key, merged)?;
        tracing::trace!(key = %key, records = count, "Stored");
        Ok(count)
    }
}

impl std::fmt::Debug for TreePuller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreePuller").finish_non_exhaustive()
    }
}
