// The network side of fetch interception
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use crate::error::{Result, WorkerError};
use crate::http::{same_origin, Request, Response, ResponseKind};
use crate::retry::{with_retry, RetryPolicy};

/// Anything that can perform a request for real
///
/// `Err` means the request never produced a response (offline, DNS, reset).
/// Non-2xx statuses are still `Ok` - it's up to the worker what to do with them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response>;
}

/// Classify a response by where it ended up after redirects
///
/// Anything that left the request's origin is `Cors`, so it never gets cached.
pub(crate) fn response_kind(request_url: &Url, final_url: &Url) -> ResponseKind {
    if same_origin(request_url, final_url) {
        ResponseKind::Basic
    } else {
        ResponseKind::Cors
    }
}

/// `reqwest`-backed network
///
/// Only transport failures are retried, and only with a policy from
/// `with_retry_policy`. Any HTTP status comes back as-is.
pub struct HttpNetwork {
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl HttpNetwork {
    pub fn new() -> Result<Self> {
        Self::with_retry_policy(RetryPolicy::none())
    }

    /// Retry transport failures according to `retry`
    pub fn with_retry_policy(retry: RetryPolicy) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("DealCheck/0.1.0"),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self { client, retry })
    }

    async fn fetch_once(&self, request: &Request) -> Result<Response> {
        let response = self
            .client
            .request(request.method.clone(), request.url.clone())
            .send()
            .await
            .map_err(|e| WorkerError::Network(e.to_string()))?;

        let status = response.status();
        let final_url = response.url().clone();
        let kind = response_kind(&request.url, &final_url);
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| WorkerError::Network(e.to_string()))?
            .to_vec();

        debug!("{} {} -> {}", request.method, request.url, status);

        Ok(Response {
            url: final_url,
            status,
            kind,
            headers,
            body,
        })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response> {
        with_retry(&self.retry, || self.fetch_once(request)).await
    }
}
