//! Shared fixtures for the sync integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use canopy_engine::{Params, Record};
use canopy_sync::{FetchError, FetchOptions, RemoteFetcher};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// One request seen by [`FakeFetcher`].
#[derive(Debug, Clone)]
pub struct Request {
    pub url: String,
    pub params: Params,
}

/// Scripted remote.
///
/// Responses are looked up by `url?query` (non-system parameters) first and
/// then by bare `url`. Unknown resources answer with an empty array.
#[derive(Default)]
pub struct FakeFetcher {
    responses: Mutex<HashMap<String, Vec<Record>>>,
    failing: Mutex<Vec<String>>,
    panic_next: AtomicBool,
    log: Mutex<Vec<Request>>,
    active: Mutex<HashMap<String, usize>>,
    max_active: Mutex<HashMap<String, usize>>,
    delay: Option<Duration>,
    gate: Option<Arc<Semaphore>>,
}

impl FakeFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every fetch sleeps for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every fetch waits for a permit on `gate` before answering.
    pub fn with_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn respond(&self, target: &str, body: Value) {
        let records: Vec<Record> = serde_json::from_value(body).unwrap();
        self.responses
            .lock()
            .unwrap()
            .insert(target.to_string(), records);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().push(url.to_string());
    }

    /// The next fetch panics instead of answering.
    pub fn panic_next(&self) {
        self.panic_next.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.log.lock().unwrap().clone()
    }

    pub fn requests_to(&self, url: &str) -> Vec<Request> {
        self.requests().into_iter().filter(|r| r.url == url).collect()
    }

    /// Highest number of simultaneous fetches observed for `url`.
    pub fn max_active(&self, url: &str) -> usize {
        self.max_active
            .lock()
            .unwrap()
            .get(url)
            .copied()
            .unwrap_or(0)
    }

    fn enter(&self, url: &str) {
        let mut active = self.active.lock().unwrap();
        let count = active.entry(url.to_string()).or_insert(0);
        *count += 1;
        let mut max = self.max_active.lock().unwrap();
        let seen = max.entry(url.to_string()).or_insert(0);
        *seen = (*seen).max(*count);
    }

    fn leave(&self, url: &str) {
        if let Some(count) = self.active.lock().unwrap().get_mut(url) {
            *count -= 1;
        }
    }
}

#[async_trait]
impl RemoteFetcher for FakeFetcher {
    async fn get(
        &self,
        url: &str,
        params: &Params,
        _options: &FetchOptions,
    ) -> Result<Vec<Record>, FetchError> {
        self.log.lock().unwrap().push(Request {
            url: url.to_string(),
            params: params.clone(),
        });
        if self.panic_next.swap(false, Ordering::SeqCst) {
            panic!("remote blew up fetching {url}");
        }
        self.enter(url);

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.leave(url);

        if self.failing.lock().unwrap().iter().any(|f| f == url) {
            return Err(FetchError::Status {
                status: 500,
                url: url.to_string(),
            });
        }

        let query = params.without_system().to_query_string();
        let responses = self.responses.lock().unwrap();
        let records = responses
            .get(&format!("{url}?{query}"))
            .or_else(|| responses.get(url))
            .cloned()
            .unwrap_or_default();
        Ok(records)
    }
}

pub fn record(value: Value) -> Record {
    Record::from_value(value).unwrap()
}

pub fn records(value: Value) -> Vec<Record> {
    serde_json::from_value(value).unwrap()
}
