//! Network access for scraping tasks
//!
//! This module contains everything that touches the wire:
//! - A single-request `Transport` with failure classification
//! - Per-context request pacing
//! - A shared retry policy with exponential backoff
//! - `BrowsingContext`, which composes the three for one task

mod context;
mod pacer;
mod retry;
mod transport;

pub use context::{BrowsingContext, RequestKind};
pub use pacer::Pacer;
pub use retry::{RetryPolicy, Retryable};
pub use transport::{
    build_http_client, ContextFactory, FetchedPage, HttpContextFactory, HttpTransport, Transport,
};

#[cfg(test)]
pub(crate) use context::testing;
