use serde::Deserialize;

/// Main configuration structure for Leaf-Ledger
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default = "default_categories", rename = "category")]
    pub categories: Vec<CategoryConfig>,
}

impl Config {
    /// Builds a configuration for `base_url` with every other setting at its default
    pub fn for_site(base_url: &str) -> Self {
        Self {
            site: SiteConfig {
                base_url: base_url.to_string(),
                locations_path: default_locations_path(),
                region: default_region(),
                region_slug: Some("florida".to_string()),
            },
            scraper: ScraperConfig::default(),
            orchestrator: OrchestratorConfig::default(),
            output: OutputConfig::default(),
            categories: default_categories(),
        }
    }

    /// Looks up a category by its human-readable label (case-insensitive)
    pub fn category(&self, label: &str) -> Option<&CategoryConfig> {
        self.categories
            .iter()
            .find(|c| c.label.eq_ignore_ascii_case(label))
    }
}

/// Target site and region filter
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site root, e.g. "https://www.trulieve.com"
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the locations index page; location links live beneath it
    #[serde(rename = "locations-path", default = "default_locations_path")]
    pub locations_path: String,

    /// Region code a location must carry, e.g. "FL"
    #[serde(default = "default_region")]
    pub region: String,

    /// Lowercase region name used by the link-target fallback, e.g. "florida"
    #[serde(rename = "region-slug", default)]
    pub region_slug: Option<String>,
}

/// Request pacing, timeouts and retry behavior
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Lower bound of the randomized pause between requests (milliseconds)
    #[serde(rename = "min-delay-ms", default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    /// Upper bound of the randomized pause between requests (milliseconds)
    #[serde(rename = "max-delay-ms", default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Bound on each navigation or expansion step (milliseconds)
    #[serde(rename = "page-timeout-ms", default = "default_page_timeout_ms")]
    pub page_timeout_ms: u64,

    /// Retries after the first attempt of a transient failure
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Backoff before the first retry; doubles on each further attempt (milliseconds)
    #[serde(rename = "retry-base-delay-ms", default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Upper bound on "load more" triggers per listing
    #[serde(rename = "max-load-more", default = "default_max_load_more")]
    pub max_load_more: u32,

    /// Budget for scraping one location before it is abandoned (seconds)
    #[serde(rename = "location-timeout-secs", default = "default_location_timeout_secs")]
    pub location_timeout_secs: u64,

    /// User agent presented by every browsing context
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            page_timeout_ms: default_page_timeout_ms(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            max_load_more: default_max_load_more(),
            location_timeout_secs: default_location_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

/// Concurrency limits and the data-quality guard
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(
        rename = "max-concurrent-locations",
        default = "default_max_concurrent_locations"
    )]
    pub max_concurrent_locations: usize,

    #[serde(
        rename = "max-concurrent-categories",
        default = "default_max_concurrent_categories"
    )]
    pub max_concurrent_categories: usize,

    /// A category yielding fewer products than this is marked failed
    #[serde(rename = "min-expected-products", default = "default_min_expected_products")]
    pub min_expected_products: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_locations: default_max_concurrent_locations(),
            max_concurrent_categories: default_max_concurrent_categories(),
            min_expected_products: default_min_expected_products(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database receiving product rows
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Path to the markdown session summary
    #[serde(rename = "summary-path", default = "default_summary_path")]
    pub summary_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            summary_path: default_summary_path(),
        }
    }
}

/// One product subcategory scraped as an independent pipeline
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryConfig {
    /// Human-readable subcategory label, e.g. "Whole Flower"
    pub label: String,

    /// Listing path relative to the site root
    pub path: String,

    /// Destination table for this subcategory's rows
    pub table: String,
}

impl CategoryConfig {
    pub fn new(label: &str, path: &str, table: &str) -> Self {
        Self {
            label: label.to_string(),
            path: path.to_string(),
            table: table.to_string(),
        }
    }
}

/// The three subcategories supported out of the box
pub fn default_categories() -> Vec<CategoryConfig> {
    vec![
        CategoryConfig::new(
            "Whole Flower",
            "/category/flower/whole-flower",
            "TL_Scrape_WHOLE_FLOWER",
        ),
        CategoryConfig::new(
            "Pre-Rolls",
            "/category/flower/pre-rolls",
            "TL_Scrape_Pre_Rolls",
        ),
        CategoryConfig::new(
            "Ground & Shake",
            "/category/flower/ground-shake",
            "TL_Scrape_Ground_Shake",
        ),
    ]
}

fn default_locations_path() -> String {
    "/dispensaries".to_string()
}

fn default_region() -> String {
    "FL".to_string()
}

fn default_min_delay_ms() -> u64 {
    700
}

fn default_max_delay_ms() -> u64 {
    1500
}

fn default_page_timeout_ms() -> u64 {
    20_000
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    2_000
}

fn default_max_load_more() -> u32 {
    50
}

fn default_location_timeout_secs() -> u64 {
    300
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126 Safari/537.36".to_string()
}

fn default_max_concurrent_locations() -> usize {
    5
}

fn default_max_concurrent_categories() -> usize {
    3
}

fn default_min_expected_products() -> usize {
    100
}

fn default_database_path() -> String {
    "./leaf-ledger.db".to_string()
}

fn default_summary_path() -> String {
    "./leaf-ledger-summary.md".to_string()
}
