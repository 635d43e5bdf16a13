//! Carpark API HTTP client.
//!
//! Every call goes through the shared [`RateLimiter`]. Failures are
//! collapsed into `None` at this boundary: callers only ever see "data" or
//! "no data", never why.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};
use reqwest::{StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::UpstreamError;
use super::rate_limit::RateLimiter;

/// Default base URL for the NSW Transport carpark API.
pub const DEFAULT_BASE_URL: &str = "https://api.transport.nsw.gov.au/v1/carpark";

/// Per-call socket timeout.
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the upstream client.
#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    /// API token sent as `Authorization: apikey <token>`
    pub api_key: String,
    /// Collection endpoint; facility lookups add `?facility=<id>`
    pub base_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl UpstreamConfig {
    /// Create a new config with the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set a custom base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// Client for the carpark API.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: Url,
    limiter: Arc<RateLimiter>,
}

impl UpstreamClient {
    /// Create a new client that throttles through `limiter`.
    pub fn new(config: UpstreamConfig, limiter: Arc<RateLimiter>) -> Result<Self, UpstreamError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| UpstreamError::Config(format!("invalid base URL: {e}")))?;

        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("apikey {}", config.api_key))
            .map_err(|_| UpstreamError::Config("invalid API key format".to_string()))?;
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url,
            limiter,
        })
    }

    /// URL of the facility directory.
    pub fn directory_url(&self) -> Url {
        self.base_url.clone()
    }

    /// URL of a single facility's detail record.
    pub fn facility_url(&self, facility_id: &str) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("facility", facility_id);
        url
    }

    /// GET `url` and parse the body as JSON.
    ///
    /// Returns `None` on any failure; the cause is logged.
    pub async fn request(&self, url: Url) -> Option<Value> {
        match self.try_request(url.clone()).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url = %url, error = %e, "upstream request failed");
                None
            }
        }
    }

    /// GET `url`, retrying once after a throttling response.
    ///
    /// The API answers 403 as well as 429 when a key is over its quota, so
    /// both are treated as "wait for the next window and try again".
    pub async fn try_request(&self, url: Url) -> Result<Value, UpstreamError> {
        let mut response = self.send(url.clone()).await?;

        if is_throttled(response.status()) {
            debug!(url = %url, status = %response.status(), "throttled by upstream, retrying");
            self.limiter.wait_for_next_window().await;
            response = self.send(url).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| UpstreamError::Json {
            message: e.to_string(),
        })
    }

    async fn send(&self, url: Url) -> Result<reqwest::Response, UpstreamError> {
        self.limiter.acquire().await;
        Ok(self.http.get(url).send().await?)
    }
}

fn is_throttled(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status == StatusCode::FORBIDDEN
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::upstream::fake::{FakeUpstream, Reply};
    use serde_json::json;

    fn limiter() -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(100, Arc::new(SystemClock)))
    }

    fn client_for(upstream: &FakeUpstream) -> UpstreamClient {
        let config = UpstreamConfig::new("secret").with_base_url(upstream.base_url());
        UpstreamClient::new(config, limiter()).unwrap()
    }

    #[test]
    fn config_defaults() {
        let config = UpstreamConfig::new("test-key");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn config_builder() {
        let config = UpstreamConfig::new("test-key")
            .with_base_url("http://localhost:8080/carpark")
            .with_timeout(3);
        assert_eq!(config.base_url, "http://localhost:8080/carpark");
        assert_eq!(config.timeout_secs, 3);
    }

    #[test]
    fn rejects_invalid_base_url() {
        let config = UpstreamConfig::new("k").with_base_url("not a url");
        assert!(matches!(
            UpstreamClient::new(config, limiter()),
            Err(UpstreamError::Config(_))
        ));
    }

    #[test]
    fn facility_url_encodes_id() {
        let config = UpstreamConfig::new("k").with_base_url("http://example.test/v1/carpark");
        let client = UpstreamClient::new(config, limiter()).unwrap();

        assert_eq!(
            client.facility_url("486").as_str(),
            "http://example.test/v1/carpark?facility=486"
        );
        assert_eq!(
            client.facility_url("a b&c").as_str(),
            "http://example.test/v1/carpark?facility=a+b%26c"
        );
        assert_eq!(
            client.directory_url().as_str(),
            "http://example.test/v1/carpark"
        );
    }

    #[tokio::test]
    async fn sends_auth_headers_and_parses_body() {
        let upstream = FakeUpstream::start().await;
        upstream.set_directory(json!({ "1": "Tallawong" }));
        let client = client_for(&upstream);

        let body = client.request(client.directory_url()).await;

        assert_eq!(body, Some(json!({ "1": "Tallawong" })));
        assert_eq!(upstream.last_authorization().as_deref(), Some("apikey secret"));
    }

    #[tokio::test]
    async fn retries_once_after_429() {
        let upstream = FakeUpstream::start().await;
        upstream.set_directory(json!({ "1": "Tallawong" }));
        upstream.push_directory_reply(Reply::Status(429));
        let client = client_for(&upstream);

        let body = client.request(client.directory_url()).await;

        assert_eq!(body, Some(json!({ "1": "Tallawong" })));
        assert_eq!(upstream.directory_hits(), 2);
    }

    #[tokio::test]
    async fn retries_once_after_403() {
        let upstream = FakeUpstream::start().await;
        upstream.set_directory(json!({ "1": "Tallawong" }));
        upstream.push_directory_reply(Reply::Status(403));
        let client = client_for(&upstream);

        assert!(client.request(client.directory_url()).await.is_some());
        assert_eq!(upstream.directory_hits(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_second_throttle() {
        let upstream = FakeUpstream::start().await;
        upstream.set_directory(json!({ "1": "Tallawong" }));
        upstream.push_directory_reply(Reply::Status(429));
        upstream.push_directory_reply(Reply::Status(429));
        let client = client_for(&upstream);

        assert_eq!(client.request(client.directory_url()).await, None);
        assert_eq!(upstream.directory_hits(), 2);
    }

    #[tokio::test]
    async fn server_error_is_not_retried() {
        let upstream = FakeUpstream::start().await;
        upstream.push_directory_reply(Reply::Status(500));
        let client = client_for(&upstream);

        let err = client.try_request(client.directory_url()).await.unwrap_err();

        assert!(matches!(err, UpstreamError::Api { status: 500, .. }));
        assert_eq!(upstream.directory_hits(), 1);
    }

    #[tokio::test]
    async fn malformed_json_is_unavailable() {
        let upstream = FakeUpstream::start().await;
        upstream.push_directory_reply(Reply::Raw("{not json".into()));
        let client = client_for(&upstream);

        assert!(matches!(
            client.try_request(client.directory_url()).await,
            Err(UpstreamError::Json { .. })
        ));
    }

    #[tokio::test]
    async fn network_failure_is_unavailable() {
        // Bind and immediately drop a listener to get a port nothing serves.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = UpstreamConfig::new("k")
            .with_base_url(format!("http://{addr}/carpark"))
            .with_timeout(1);
        let client = UpstreamClient::new(config, limiter()).unwrap();

        assert_eq!(client.request(client.directory_url()).await, None);
    }
}
