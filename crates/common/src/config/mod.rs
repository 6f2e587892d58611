//! Configuration management for Paper Pulse
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values
//!
//! The engines never read this directly; the binary resolves it and hands
//! plain values (queries, delays, limits) to them.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Remote source (arXiv API) configuration
    #[serde(default)]
    pub source: SourceConfig,

    /// Standing queries and sync limits
    #[serde(default)]
    pub sync: SyncConfig,

    /// Result cache configuration
    #[serde(default)]
    pub cache: CacheConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Database URL (sqlite:// or postgres://)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Log every SQL statement at debug level
    #[serde(default)]
    pub sql_logging: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
    /// arXiv API endpoint
    #[serde(default = "default_source_url")]
    pub base_url: String,

    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Delay between page requests in milliseconds
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,

    /// Maximum retries per page request
    #[serde(default = "default_source_retries")]
    pub max_retries: u32,

    /// Request timeout in seconds
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,

    /// submittedDate | lastUpdatedDate | relevance
    #[serde(default = "default_sort_by")]
    pub sort_by: String,

    /// descending | ascending
    #[serde(default = "default_sort_order")]
    pub sort_order: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncConfig {
    /// Standing queries kept in sync
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,

    /// How far back a first-time or forced sync reaches
    #[serde(default = "default_years_back")]
    pub years_back: u32,

    /// Cap on records collected per query
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Delay after each standing query in milliseconds
    #[serde(default = "default_query_delay")]
    pub query_delay_ms: u64,

    /// File listing important arXiv ids, one per line
    pub important_papers_file: Option<String>,

    /// Delay between important-paper fetches in milliseconds
    #[serde(default = "default_important_delay")]
    pub important_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Redis URL; in-process cache when absent
    pub url: Option<String>,

    /// Default TTL in seconds
    #[serde(default = "default_cache_ttl")]
    pub default_ttl_secs: u64,

    /// Prefix applied to every cache key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Service name attached to log output
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_database_url() -> String { "sqlite://data/arxiv_papers.db?mode=rwc".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_min_connections() -> u32 { 1 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_source_url() -> String { "https://export.arxiv.org/api/query".to_string() }
fn default_page_size() -> usize { 100 }
fn default_page_delay() -> u64 { 3000 }
fn default_source_retries() -> u32 { 3 }
fn default_source_timeout() -> u64 { 30 }
fn default_sort_by() -> String { "submittedDate".to_string() }
fn default_sort_order() -> String { "descending".to_string() }
fn default_queries() -> Vec<String> { vec!["condensed matter physics AND machine learning".to_string()] }
fn default_years_back() -> u32 { 5 }
fn default_max_results() -> usize { 100_000 }
fn default_query_delay() -> u64 { 1000 }
fn default_important_delay() -> u64 { 500 }
fn default_cache_ttl() -> u64 { 300 }
fn default_key_prefix() -> String { "pulse".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }
fn default_service_name() -> String { "paper-pulse".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Start with defaults
            .set_default("database.url", default_database_url())?
            .set_default("sync.years_back", default_years_back())?
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__SYNC__YEARS_BACK=2
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(";")
                    .with_list_parse_key("sync.queries"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Delay applied after each standing query
    pub fn query_delay(&self) -> Duration {
        Duration::from_millis(self.sync.query_delay_ms)
    }

    /// Delay applied between important-paper fetches
    pub fn important_delay(&self) -> Duration {
        Duration::from_millis(self.sync.important_delay_ms)
    }

    /// Delay between remote page requests
    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.source.page_delay_ms)
    }

    /// Remote request timeout
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            sql_logging: false,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_url(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay(),
            max_retries: default_source_retries(),
            timeout_secs: default_source_timeout(),
            sort_by: default_sort_by(),
            sort_order: default_sort_order(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            queries: default_queries(),
            years_back: default_years_back(),
            max_results: default_max_results(),
            query_delay_ms: default_query_delay(),
            important_papers_file: None,
            important_delay_ms: default_important_delay(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            url: None,
            default_ttl_secs: default_cache_ttl(),
            key_prefix: default_key_prefix(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            service_name: default_service_name(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            source: SourceConfig::default(),
            sync: SyncConfig::default(),
            cache: CacheConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.sync.years_back, 5);
        assert_eq!(config.sync.max_results, 100_000);
        assert_eq!(config.source.page_size, 100);
        assert_eq!(config.source.sort_by, "submittedDate");
        assert!(config.database.url.starts_with("sqlite://"));
    }

    #[test]
    fn test_delays() {
        let config = AppConfig::default();
        assert_eq!(config.query_delay(), Duration::from_secs(1));
        assert_eq!(config.important_delay(), Duration::from_millis(500));
        assert_eq!(config.page_delay(), Duration::from_secs(3));
    }

    #[test]
    fn test_partial_deserialize_uses_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"sync": {"queries": ["graph neural networks"], "years_back": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.sync.queries, vec!["graph neural networks"]);
        assert_eq!(config.sync.years_back, 2);
        assert_eq!(config.sync.query_delay_ms, 1000);
        assert_eq!(config.cache.key_prefix, "pulse");
    }
}
