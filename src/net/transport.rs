//! HTTP transport
//!
//! A `Transport` issues exactly one request and classifies the failure; it
//! never retries or sleeps. Pacing and retries are layered on top by
//! `BrowsingContext`, so every network boundary shares one policy.
//!
//! Each transport owns its own cookie jar. A `ContextFactory` hands out a new
//! transport per browsing context so that store selection made by one task
//! never leaks into another.

use crate::config::ScraperConfig;
use crate::FetchError;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use url::Url;

/// A page returned by one successful request
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub final_url: Url,

    /// HTTP status code
    pub status_code: u16,

    /// Page body
    pub body: String,
}

/// Issues single requests on behalf of one browsing context
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetches `url`, mapping any non-success status to `FetchError::Status`
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError>;
}

/// Produces isolated transports, one per browsing context
pub trait ContextFactory: Send + Sync {
    fn new_transport(&self) -> Result<Box<dyn Transport>, FetchError>;
}

/// Builds an HTTP client with the configured user agent and its own cookie jar
///
/// # Example
///
/// ```no_run
/// use leaf_ledger::config::ScraperConfig;
/// use leaf_ledger::net::build_http_client;
///
/// let client = build_http_client(&ScraperConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &ScraperConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_millis(config.page_timeout_ms))
        .connect_timeout(Duration::from_secs(10))
        .cookie_store(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// `Transport` backed by a reqwest client
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(config: &ScraperConfig) -> Result<Self, FetchError> {
        let client = build_http_client(config).map_err(|e| FetchError::Http {
            url: String::new(),
            source: e,
        })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        let final_url = response.url().clone();

        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(FetchedPage {
            final_url,
            status_code: status.as_u16(),
            body,
        })
    }
}

/// Maps a reqwest error onto the crate's failure taxonomy
fn classify_error(url: &Url, error: reqwest::Error) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
        }
    } else if error.is_connect() || error.is_request() || error.is_body() {
        // Connection refused, or dropped before the response completed
        FetchError::Connect {
            url: url.to_string(),
            message: error.to_string(),
        }
    } else if let Some(status) = error.status().filter(StatusCode::is_server_error) {
        FetchError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        }
    } else {
        FetchError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

/// Hands out one `HttpTransport` (and therefore one cookie jar) per context
pub struct HttpContextFactory {
    config: ScraperConfig,
}

impl HttpContextFactory {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }
}

impl ContextFactory for HttpContextFactory {
    fn new_transport(&self) -> Result<Box<dyn Transport>, FetchError> {
        Ok(Box::new(HttpTransport::new(&self.config)?))
    }
}
