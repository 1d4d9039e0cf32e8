//! Network access for the offline cache controller.
//!
//! ### Network seam
//! - The controller only talks to the network through the [`Network`] trait,
//!   so tests can script responses and failures.
//!
//! ### Response tainting
//! - Responses whose final URL shares the application origin are `basic`.
//! - Everything else is `cors` and never written to the cache.
//!
//! ### Failures
//! - Transport failures (offline, DNS, TLS, timeout) become
//!   `Error::Network`; HTTP error statuses are ordinary responses.

pub mod url;

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, Method};

pub use self::url::{UrlError, canonicalize, is_fetchable, same_origin};

use folio_core::{AppConfig, Error, Request, Response, ResponseKind};

/// Something that can perform a live network fetch.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "folio/0.1")
    pub user_agent: String,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,

    /// Application origin; decides `basic` vs `cors` tainting.
    pub origin: ::url::Url,
}

impl FetchConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        Ok(Self { user_agent: config.user_agent.clone(), timeout: config.timeout(), max_redirects: 5, origin })
    }
}

/// reqwest-backed [`Network`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    fn kind_for(&self, final_url: &::url::Url) -> ResponseKind {
        if same_origin(final_url, &self.config.origin) { ResponseKind::Basic } else { ResponseKind::Cors }
    }
}

#[async_trait]
impl Network for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        if !is_fetchable(&request.url) {
            return Err(Error::InvalidUrl(format!("unsupported scheme: {}", request.url.scheme())));
        }

        let start = Instant::now();
        let method = Method::from_bytes(request.normalized_method().as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let response = self
            .http
            .request(method, request.url.as_str())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Network(format!("timeout fetching {}", request.url))
                } else {
                    Error::Network(format!("network error: {e}"))
                }
            })?;

        let status = response.status();
        let final_url = response.url().clone();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("failed to read response: {e}")))?;

        tracing::debug!(
            "fetched {} {} -> {} ({}) in {}ms ({} bytes)",
            request.method,
            request.url,
            final_url,
            status.as_u16(),
            start.elapsed().as_millis(),
            body.len()
        );

        Ok(Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
            kind: self.kind_for(&final_url),
            url: final_url,
        })
    }
}
