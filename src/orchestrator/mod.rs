//! Orchestrator module for running categories and composing the session
//!
//! This module contains the top-level run logic, including:
//! - Selecting the categories to run
//! - Spawning one task per category under the category concurrency bound
//! - Persisting successful categories through the sink writer
//! - Waiting for every task and composing the `ScrapingSession`

mod category;

pub use category::{aggregate, CategoryTask};

use crate::config::{CategoryConfig, Config};
use crate::model::{CategoryResult, ScrapingSession};
use crate::net::{ContextFactory, HttpContextFactory};
use crate::sink::{Sink, SinkWriter, SqliteSink};
use crate::{ConfigError, LedgerError};
use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Parameters of one "run categories" call
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Category labels to run; `None` runs every configured category
    pub categories: Option<Vec<String>>,

    /// Per-category cap on locations, for constrained runs
    pub max_locations: Option<usize>,

    /// Whether successful categories are written to the sink
    pub persist: bool,

    /// Requested rendering mode; the HTTP transport never shows a window
    pub headless: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            categories: None,
            max_locations: None,
            persist: true,
            headless: true,
        }
    }
}

/// Runs category tasks concurrently and aggregates their results
pub struct Orchestrator {
    config: Arc<Config>,
    factory: Arc<dyn ContextFactory>,
    writer: Option<Arc<SinkWriter>>,
    config_hash: Option<String>,
}

impl Orchestrator {
    pub fn new(config: Config, factory: Arc<dyn ContextFactory>) -> Self {
        Self {
            config: Arc::new(config),
            factory,
            writer: None,
            config_hash: None,
        }
    }

    /// Persists through `sink` with the configured retry backoff
    pub fn with_sink(self, sink: Arc<dyn Sink>) -> Self {
        let writer = SinkWriter::from_config(sink, &self.config.scraper);
        self.with_writer(writer)
    }

    pub fn with_writer(mut self, writer: SinkWriter) -> Self {
        self.writer = Some(Arc::new(writer));
        self
    }

    /// Hash of the configuration file, recorded on the session
    pub fn with_config_hash(mut self, hash: String) -> Self {
        self.config_hash = Some(hash);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolves requested labels against the configuration, keeping config order
    pub fn select_categories(
        &self,
        requested: Option<&[String]>,
    ) -> Result<Vec<CategoryConfig>, LedgerError> {
        let Some(requested) = requested else {
            return Ok(self.config.categories.clone());
        };

        for label in requested {
            if self.config.category(label).is_none() {
                return Err(ConfigError::Validation(format!("unknown category '{label}'")).into());
            }
        }

        Ok(self
            .config
            .categories
            .iter()
            .filter(|c| requested.iter().any(|r| r.eq_ignore_ascii_case(&c.label)))
            .cloned()
            .collect())
    }

    /// Runs the selected categories and returns the finalized session
    ///
    /// Only an invalid category selection is an error. Every failure past
    /// that point is reported inside the session.
    pub async fn run(&self, options: &RunOptions) -> Result<ScrapingSession, LedgerError> {
        let categories = self.select_categories(options.categories.as_deref())?;

        let mut session = ScrapingSession::start();
        session.config_hash = self.config_hash.clone();

        let writer = if options.persist {
            if self.writer.is_none() {
                tracing::warn!("Persistence requested but no sink is configured");
            }
            self.writer.clone()
        } else {
            None
        };

        tracing::info!(
            session_id = %session.session_id,
            categories = categories.len(),
            max_locations = ?options.max_locations,
            persist = writer.is_some(),
            headless = options.headless,
            "Starting scraping session"
        );

        let permits = Arc::new(Semaphore::new(
            self.config.orchestrator.max_concurrent_categories.max(1),
        ));

        let handles: Vec<_> = categories
            .into_iter()
            .map(|category| {
                let task = CategoryTask::new(
                    &self.config,
                    category,
                    Arc::clone(&self.factory),
                    options.max_locations,
                );
                let label = task.label().to_string();
                let permits = Arc::clone(&permits);
                let writer = writer.clone();
                let session_id = session.session_id.clone();

                let handle = tokio::spawn(async move {
                    let _permit = permits.acquire_owned().await.ok();
                    let table = task.table().to_string();
                    let mut result = task.run().await;

                    if let Some(writer) = writer {
                        if result.success && !result.products.is_empty() {
                            result.persisted =
                                writer.persist(&table, &session_id, &result.products).await;
                        }
                    }
                    result
                });
                (label, handle)
            })
            .collect();

        let results = join_all(handles.into_iter().map(|(label, handle)| async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(category = %label, error = %e, "Category task aborted");
                    CategoryResult::failed(&label, format!("category task aborted: {e}"))
                }
            }
        }))
        .await;

        for result in results {
            session.add_result(result);
        }
        session.finalize();

        if let Some(writer) = &writer {
            if let Err(e) = writer.record_session(&session).await {
                tracing::warn!(error = %e, "Failed to record session");
                session.errors.push(format!("session record: {e}"));
            }
        }

        tracing::info!(
            session_id = %session.session_id,
            products = session.total_products,
            locations = session.total_locations,
            success = session.success,
            duration_secs = session.duration_seconds,
            "Scraping session finished"
        );

        Ok(session)
    }
}

/// Runs categories against the live site with the default HTTP transport
///
/// Persistence, when requested, goes to the SQLite database named in the
/// configuration.
///
/// # Example
///
/// ```no_run
/// use leaf_ledger::config::load_config;
/// use leaf_ledger::{run_categories, RunOptions};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("leaf-ledger.toml"))?;
/// let session = run_categories(config, RunOptions::default()).await?;
/// println!("{} products", session.total_products);
/// # Ok(())
/// # }
/// ```
pub async fn run_categories(
    config: Config,
    options: RunOptions,
) -> Result<ScrapingSession, LedgerError> {
    let factory = Arc::new(HttpContextFactory::new(config.scraper.clone()));
    let database_path = config.output.database_path.clone();
    let mut orchestrator = Orchestrator::new(config, factory);

    if options.persist {
        let sink = SqliteSink::new(Path::new(&database_path))?;
        orchestrator = orchestrator.with_sink(Arc::new(sink));
    }

    orchestrator.run(&options).await
}
