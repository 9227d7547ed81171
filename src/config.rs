//! TOML configuration parsing.
//!
//! Every section and key carries a serde default, so a missing file can be
//! replaced by [`Config::minimal`] and a partial file only needs the keys it
//! wants to override. See `config/larder.example.toml` for a full example.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub geo: GeoConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/larder.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_http_timeout_secs")]
    pub timeout_secs: u64,
    /// Agent name evaluated against robots.txt groups.
    #[serde(default = "default_robots_agent")]
    pub robots_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_http_timeout_secs(),
            robots_agent: default_robots_agent(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}
fn default_http_timeout_secs() -> u64 {
    15
}
fn default_robots_agent() -> String {
    "*".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct RenderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    /// Quiet period after navigation completes before the DOM is captured.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default)]
    pub chrome_executable: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            navigation_timeout_secs: default_navigation_timeout_secs(),
            settle_ms: default_settle_ms(),
            chrome_executable: None,
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_navigation_timeout_secs() -> u64 {
    30
}
fn default_settle_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeoConfig {
    /// Overpass interpreter endpoints, tried in order.
    #[serde(default = "default_geo_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default = "default_max_attempts")]
    pub max_attempts_per_endpoint: u32,
    #[serde(default = "default_backoff_base_secs")]
    pub backoff_base_secs: u64,
    #[serde(default = "default_geo_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Server-side `[timeout:N]` embedded in the query text.
    #[serde(default = "default_geo_query_timeout_secs")]
    pub query_timeout_secs: u64,
    #[serde(default = "default_amenity")]
    pub amenity: String,
    #[serde(default = "default_city")]
    pub default_city: String,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            endpoints: default_geo_endpoints(),
            max_attempts_per_endpoint: default_max_attempts(),
            backoff_base_secs: default_backoff_base_secs(),
            request_timeout_secs: default_geo_request_timeout_secs(),
            query_timeout_secs: default_geo_query_timeout_secs(),
            amenity: default_amenity(),
            default_city: default_city(),
        }
    }
}

fn default_geo_endpoints() -> Vec<String> {
    vec![
        "https://overpass-api.de/api/interpreter".to_string(),
        "https://overpass.kumi.systems/api/interpreter".to_string(),
    ]
}
fn default_max_attempts() -> u32 {
    2
}
fn default_backoff_base_secs() -> u64 {
    2
}
fn default_geo_request_timeout_secs() -> u64 {
    60
}
fn default_geo_query_timeout_secs() -> u64 {
    25
}
fn default_amenity() -> String {
    "restaurant".to_string()
}
fn default_city() -> String {
    "Vancouver".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// Search results URL; `{query}` is replaced by the URL-encoded query.
    #[serde(default = "default_search_endpoint")]
    pub endpoint: String,
    /// Regexes a link must match to be treated as a recipe page.
    #[serde(default = "default_link_patterns")]
    pub link_patterns: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    #[serde(default = "default_seed_delay_ms")]
    pub seed_delay_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: default_search_endpoint(),
            link_patterns: default_link_patterns(),
            max_results: default_max_results(),
            request_delay_ms: default_request_delay_ms(),
            seed_delay_ms: default_seed_delay_ms(),
        }
    }
}

fn default_search_endpoint() -> String {
    "https://www.allrecipes.com/search?q={query}".to_string()
}
fn default_link_patterns() -> Vec<String> {
    vec![
        r"allrecipes\.com/[\w-]+-recipe-\d+".to_string(),
        r"allrecipes\.com/recipe/\d+/".to_string(),
    ]
}
fn default_max_results() -> usize {
    12
}
fn default_request_delay_ms() -> u64 {
    1000
}
fn default_seed_delay_ms() -> u64 {
    2000
}

impl Config {
    /// All defaults. Used when no config file exists.
    pub fn minimal() -> Self {
        Self::default()
    }

    /// Point the store somewhere else, keeping every other setting.
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db.path = path.into();
        self
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Load `path` if it exists, otherwise fall back to [`Config::minimal`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        load_config(path)
    } else {
        tracing::warn!(path = %path.display(), "config file not found, using defaults");
        Ok(Config::minimal())
    }
}

pub fn validate(config: &Config) -> Result<()> {
    if config.http.timeout_secs == 0 {
        anyhow::bail!("http.timeout_secs must be > 0");
    }

    if config.render.navigation_timeout_secs == 0 {
        anyhow::bail!("render.navigation_timeout_secs must be > 0");
    }

    if config.geo.endpoints.is_empty() {
        anyhow::bail!("geo.endpoints must list at least one endpoint");
    }
    if config.geo.max_attempts_per_endpoint == 0 {
        anyhow::bail!("geo.max_attempts_per_endpoint must be >= 1");
    }
    if config.geo.request_timeout_secs == 0 {
        anyhow::bail!("geo.request_timeout_secs must be > 0");
    }
    if config.geo.query_timeout_secs == 0 {
        anyhow::bail!("geo.query_timeout_secs must be > 0");
    }

    if config.search.max_results < 1 {
        anyhow::bail!("search.max_results must be >= 1");
    }
    if !config.search.endpoint.contains("{query}") {
        anyhow::bail!(
            "search.endpoint must contain a {{query}} placeholder: '{}'",
            config.search.endpoint
        );
    }
    for pattern in &config.search.link_patterns {
        regex::Regex::new(pattern)
            .with_context(|| format!("search.link_patterns: invalid regex '{}'", pattern))?;
    }

    Ok(())
}
