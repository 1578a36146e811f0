//! Configuration module for Leaf-Ledger
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use leaf_ledger::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("leaf-ledger.toml")).unwrap();
//! println!("Scraping {} categories", config.categories.len());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_categories, CategoryConfig, Config, OrchestratorConfig, OutputConfig, ScraperConfig,
    SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
pub(crate) use validation::validate_table_name;
