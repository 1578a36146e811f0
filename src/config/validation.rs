use crate::config::types::{CategoryConfig, Config, OrchestratorConfig, ScraperConfig, SiteConfig};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_scraper_config(&config.scraper)?;
    validate_orchestrator_config(&config.orchestrator)?;
    validate_categories(&config.categories)?;
    Ok(())
}

/// Validates the target site settings
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    let url = Url::parse(&config.base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base-url: {}", e)))?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(ConfigError::Validation(format!(
            "base-url '{}' must use an http(s) scheme",
            config.base_url
        )));
    }

    if !config.locations_path.starts_with('/') {
        return Err(ConfigError::Validation(format!(
            "locations-path must start with '/', got '{}'",
            config.locations_path
        )));
    }

    if config.region.trim().is_empty() || config.region.contains(char::is_whitespace) {
        return Err(ConfigError::Validation(format!(
            "region must be a single non-empty token, got '{}'",
            config.region
        )));
    }

    Ok(())
}

/// Validates pacing, timeout and retry settings
fn validate_scraper_config(config: &ScraperConfig) -> Result<(), ConfigError> {
    if config.min_delay_ms > config.max_delay_ms {
        return Err(ConfigError::Validation(format!(
            "min-delay-ms ({}) must not exceed max-delay-ms ({})",
            config.min_delay_ms, config.max_delay_ms
        )));
    }

    if config.page_timeout_ms == 0 {
        return Err(ConfigError::Validation(
            "page-timeout-ms must be positive".to_string(),
        ));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be between 0 and 10, got {}",
            config.max_retries
        )));
    }

    if config.location_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "location-timeout-secs must be positive".to_string(),
        ));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates concurrency limits
fn validate_orchestrator_config(config: &OrchestratorConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("max-concurrent-locations", config.max_concurrent_locations),
        ("max-concurrent-categories", config.max_concurrent_categories),
    ] {
        if !(1..=20).contains(&value) {
            return Err(ConfigError::Validation(format!(
                "{} must be between 1 and 20, got {}",
                name, value
            )));
        }
    }

    Ok(())
}

/// Validates category entries
fn validate_categories(categories: &[CategoryConfig]) -> Result<(), ConfigError> {
    if categories.is_empty() {
        return Err(ConfigError::Validation(
            "at least one category must be configured".to_string(),
        ));
    }

    let mut labels = HashSet::new();
    for category in categories {
        if category.label.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category label cannot be empty".to_string(),
            ));
        }

        if !labels.insert(category.label.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate category label '{}'",
                category.label
            )));
        }

        if !category.path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "category '{}' path must start with '/'",
                category.label
            )));
        }

        validate_table_name(&category.table)?;
    }

    Ok(())
}

/// Validates a destination table name as a plain SQL identifier
pub(crate) fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);

    if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ConfigError::Validation(format!(
            "table name '{}' must be a plain SQL identifier",
            name
        )));
    }

    Ok(())
}
