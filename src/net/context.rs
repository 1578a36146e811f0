//! Browsing context: the one gateway to the network for a task
//!
//! Every navigation, "load more" trigger and detail-page fetch goes through
//! `BrowsingContext::fetch`, which paces the request, bounds it with the page
//! timeout and retries transient failures. A context is owned by exactly one
//! task for its whole lifetime.

use crate::config::ScraperConfig;
use crate::net::pacer::Pacer;
use crate::net::retry::RetryPolicy;
use crate::net::transport::{ContextFactory, FetchedPage, Transport};
use crate::FetchError;
use std::time::Duration;
use url::Url;

/// What a request is for; used in logs and retry messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Navigate,
    Expand,
    Detail,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::Expand => "expand",
            Self::Detail => "detail",
        }
    }
}

/// One exclusively-owned browsing context
pub struct BrowsingContext {
    transport: Box<dyn Transport>,
    pacer: Pacer,
    retry: RetryPolicy,
    page_timeout: Duration,
    requests: u32,
}

impl BrowsingContext {
    pub fn new(
        transport: Box<dyn Transport>,
        pacer: Pacer,
        retry: RetryPolicy,
        page_timeout: Duration,
    ) -> Self {
        Self {
            transport,
            pacer,
            retry,
            page_timeout,
            requests: 0,
        }
    }

    /// Opens a fresh context from `factory` using the configured policies
    pub fn open(factory: &dyn ContextFactory, config: &ScraperConfig) -> Result<Self, FetchError> {
        Ok(Self::new(
            factory.new_transport()?,
            Pacer::from_config(config),
            RetryPolicy::from_config(config),
            Duration::from_millis(config.page_timeout_ms),
        ))
    }

    /// Number of requests issued so far, retries included
    pub fn requests(&self) -> u32 {
        self.requests
    }

    /// Paces, bounds and retries one request
    pub async fn fetch(&mut self, kind: RequestKind, url: &Url) -> Result<FetchedPage, FetchError> {
        self.pacer.pause().await;
        tracing::debug!(kind = kind.as_str(), url = %url, "Requesting");

        let transport = &self.transport;
        let page_timeout = self.page_timeout;
        let requests = &mut self.requests;

        let page = self
            .retry
            .run(kind.as_str(), || {
                *requests += 1;
                async move {
                    match tokio::time::timeout(page_timeout, transport.get(url)).await {
                        Ok(result) => result,
                        Err(_) => Err(FetchError::Timeout {
                            url: url.to_string(),
                        }),
                    }
                }
            })
            .await?;

        tracing::debug!(
            kind = kind.as_str(),
            url = %page.final_url,
            status = page.status_code,
            bytes = page.body.len(),
            "Received page"
        );
        Ok(page)
    }

    /// Full randomized pause between expansion steps
    pub async fn settle(&mut self) {
        self.pacer.settle().await;
    }
}
