//! HTTP implementation of [`RemoteFetcher`].

use super::{FetchOptions, RemoteFetcher};
use crate::config::Config;
use crate::error::FetchError;
use async_trait::async_trait;
use canopy_engine::{Params, Record};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use std::time::Duration;
use url::Url;

/// Fetches resources as JSON over HTTP.
///
/// A resource `url` is resolved against the base URL and the request
/// parameters are sent as the query string. The response body must be a JSON
/// array of objects, optionally wrapped as `{"data": [...]}`.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpFetcher {
    /// Create a fetcher for `base_url`.
    pub fn new(
        base_url: &str,
        auth_token: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| FetchError::Decode(format!("invalid auth token: {e}")))?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self { client, base_url })
    }

    /// Create a fetcher from daemon configuration.
    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(
            &config.remote_url,
            config.auth_token.as_deref(),
            config.request_timeout,
        )
    }

    /// Absolute URL of a resource.
    pub fn resource_url(&self, url: &str) -> Result<Url, FetchError> {
        Ok(self.base_url.join(url.trim_start_matches('/'))?)
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn get(
        &self,
        url: &str,
        params: &Params,
        options: &FetchOptions,
    ) -> Result<Vec<Record>, FetchError> {
        let target = self.resource_url(url)?;
        tracing::debug!(resource = %options.key, url = %target, "GET");

        let response = self
            .client
            .get(target.clone())
            .query(&params.query_pairs())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: target.to_string(),
            });
        }

        let body: Value = response.json().await?;
        decode_records(body)
    }
}

/// Turn a response body into records.
pub(crate) fn decode_records(body: Value) -> Result<Vec<Record>, FetchError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut envelope) => match envelope.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(FetchError::Decode(
                    "expected an array or a {\"data\": [...]} envelope".into(),
                ))
            }
        },
        _ => return Err(FetchError::Decode("expected a JSON array".into())),
    };

    items
        .into_iter()
        .map(|item| Record::from_value(item).map_err(|e| FetchError::Decode(e.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_plain_arrays() {
        let records = decode_records(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn decodes_data_envelopes() {
        let records = decode_records(json!({"data": [{"id": 1}], "total": 1})).unwrap();
        assert_eq!(records[0].id(), Some(1));
    }

    #[test]
    fn rejects_scalars_and_bad_items() {
        assert!(matches!(decode_records(json!(3)), Err(FetchError::Decode(_))));
        assert!(matches!(
            decode_records(json!({"items": []})),
            Err(FetchError::Decode(_))
        ));
        assert!(matches!(
            decode_records(json!([1, 2])),
            Err(FetchError::Decode(_))
        ));
    }

    #[test]
    fn resolves_resource_urls() {
        let fetcher = HttpFetcher::new("http://remote/api", None, Duration::from_secs(5)).unwrap();
        assert_eq!(
            fetcher.resource_url("projects").unwrap().as_str(),
            "http://remote/api/projects"
        );
        assert_eq!(
            fetcher.resource_url("/suitecontacts").unwrap().as_str(),
            "http://remote/api/suitecontacts"
        );
    }
}
