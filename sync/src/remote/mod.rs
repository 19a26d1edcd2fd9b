//! Access to the remote service.

mod http;

pub use http::HttpFetcher;

use crate::error::FetchError;
use async_trait::async_trait;
use canopy_engine::{Params, Record};

/// Per-request options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// Logical resource name, for instrumentation only
    pub key: String,
}

impl FetchOptions {
    /// Options tagged with a logical resource name.
    pub fn named(key: impl Into<String>) -> Self {
        Self { key: key.into() }
    }
}

/// Issues parameterized reads against the remote service.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    /// Fetch the records of `url` matching `params`.
    async fn get(
        &self,
        url: &str,
        params: &Params,
        options: &FetchOptions,
    ) -> Result<Vec<Record>, FetchError>;
}
