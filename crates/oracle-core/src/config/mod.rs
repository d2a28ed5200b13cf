//! Application configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: `Default` implementations and built-in sources
//! 2. **Config file**: TOML file named by the `ORACLE_CONFIG` env var
//! 3. **Environment variables**: `ORACLE__SECTION__FIELD` overrides
//!
//! # Example
//!
//! ```toml
//! [consensus]
//! validators = 5
//! quorum_threshold = 1.0
//!
//! [validation]
//! price_ceiling = 100000.0
//!
//! [[sources.price]]
//! name = "binance"
//! endpoint_template = "https://api.binance.com/api/v3/ticker/price?symbol={symbol}USDT"
//! extractor = { type = "json_number", pointer = "/price" }
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, net::SocketAddr, path::Path};

use crate::{
    consensus::{ConsensusConfig, ValidationBounds},
    source::{defaults, CredentialEncoding, HttpClientConfig, Source},
};

/// Sources for every reading the contract takes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default = "defaults::price_sources")]
    pub price: Vec<Source>,

    #[serde(default = "defaults::weather_sources")]
    pub weather: Vec<Source>,

    #[serde(default = "defaults::news_sources")]
    pub news: Vec<Source>,

    #[serde(default)]
    pub rotation: RotationConfig,

    /// Path appended to the stored proxy URL (default: `/price/{symbol}`)
    #[serde(default = "default_proxy_path")]
    pub proxy_path: String,

    /// Lowercase ticker to CoinGecko coin id.
    #[serde(default = "defaults::coin_ids")]
    pub coin_ids: BTreeMap<String, String>,
}

fn default_proxy_path() -> String {
    "/price/{symbol}".to_string()
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            price: defaults::price_sources(),
            weather: defaults::weather_sources(),
            news: defaults::news_sources(),
            rotation: RotationConfig::default(),
            proxy_path: default_proxy_path(),
            coin_ids: defaults::coin_ids(),
        }
    }
}

/// The keyed source used by the rotating-key flavor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationConfig {
    #[serde(default = "defaults::coingecko_source")]
    pub source: Source,

    /// Header the decoded credential is sent in.
    #[serde(default = "default_key_header")]
    pub header: String,

    #[serde(default)]
    pub encoding: CredentialEncoding,
}

fn default_key_header() -> String {
    defaults::COINGECKO_KEY_HEADER.to_string()
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            source: defaults::coingecko_source(),
            header: default_key_header(),
            encoding: CredentialEncoding::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level for this workspace's crates. `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: `"pretty"` or `"json"`.
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: default_log_level(), format: default_log_format() }
    }
}

/// Settings for the off-chain price proxy service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProxyServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    #[serde(default = "default_bind_port")]
    pub bind_port: u16,

    /// Token bucket capacity per client IP (default: 100)
    #[serde(default = "default_rate_limit_max_tokens")]
    pub rate_limit_max_tokens: u32,

    /// Tokens restored per second (default: 2)
    #[serde(default = "default_rate_limit_refill_rate")]
    pub rate_limit_refill_rate: u32,

    #[serde(default)]
    pub coingecko_api_key: Option<String>,

    #[serde(default)]
    pub binance_api_key: Option<String>,

    #[serde(default = "default_coingecko_base_url")]
    pub coingecko_base_url: String,

    #[serde(default = "default_binance_base_url")]
    pub binance_base_url: String,
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_bind_port() -> u16 {
    3000
}

fn default_rate_limit_max_tokens() -> u32 {
    100
}

fn default_rate_limit_refill_rate() -> u32 {
    2
}

fn default_coingecko_base_url() -> String {
    "https://api.coingecko.com".to_string()
}

fn default_binance_base_url() -> String {
    "https://api.binance.com".to_string()
}

impl Default for ProxyServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            bind_port: default_bind_port(),
            rate_limit_max_tokens: default_rate_limit_max_tokens(),
            rate_limit_refill_rate: default_rate_limit_refill_rate(),
            coingecko_api_key: None,
            binance_api_key: None,
            coingecko_base_url: default_coingecko_base_url(),
            binance_base_url: default_binance_base_url(),
        }
    }
}

impl ProxyServerConfig {
    /// # Errors
    ///
    /// Returns an error if the address and port do not form a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.bind_address, self.bind_port)
            .parse()
            .map_err(|e| format!("Invalid proxy bind address: {e}"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_environment")]
    pub environment: String,

    #[serde(default)]
    pub http: HttpClientConfig,

    #[serde(default)]
    pub consensus: ConsensusConfig,

    #[serde(default)]
    pub validation: ValidationBounds,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub proxy_server: ProxyServerConfig,
}

fn default_environment() -> String {
    "development".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            http: HttpClientConfig::default(),
            consensus: ConsensusConfig::default(),
            validation: ValidationBounds::default(),
            sources: SourcesConfig::default(),
            logging: LoggingConfig::default(),
            proxy_server: ProxyServerConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// A missing file is not an error. Use `__` as a separator for nested
    /// fields (e.g. `ORACLE__CONSENSUS__VALIDATORS=3`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be parsed or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("environment", "development")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("ORACLE").separator("__").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    /// Loads from `ORACLE_CONFIG`, falling back to `config/oracle.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("ORACLE_CONFIG").unwrap_or_else(|_| "config/oracle.toml".to_string());
        Self::from_file(&config_path)
    }

    /// Seconds the composite round needs when every source it may try
    /// runs into its call timeout.
    #[must_use]
    pub fn leader_budget_seconds(&self) -> u64 {
        let calls = self.sources.price.len() + self.sources.weather.len() + self.sources.news.len();
        self.http.call_timeout_seconds.saturating_mul(u64::try_from(calls).unwrap_or(u64::MAX))
    }

    /// Checks cross-field constraints.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        self.consensus.validate()?;
        self.validation.validate()?;

        if self.http.concurrent_limit == 0 {
            return Err("http.concurrent_limit must be greater than 0".to_string());
        }
        if self.http.call_timeout_seconds == 0 {
            return Err("http.call_timeout_seconds must be greater than 0".to_string());
        }

        for (name, sources) in [
            ("price", &self.sources.price),
            ("weather", &self.sources.weather),
            ("news", &self.sources.news),
        ] {
            if sources.is_empty() {
                return Err(format!("sources.{name} must list at least one source"));
            }
        }

        let budget = self.leader_budget_seconds();
        if self.consensus.leader_timeout_seconds < budget {
            return Err(format!(
                "consensus.leader_timeout_seconds ({}) must be at least {budget}: \
                 http.call_timeout_seconds times the price, weather and news source count",
                self.consensus.leader_timeout_seconds
            ));
        }

        let all_sources = self
            .sources
            .price
            .iter()
            .chain(&self.sources.weather)
            .chain(&self.sources.news)
            .chain(std::iter::once(&self.sources.rotation.source));
        for source in all_sources {
            if source.name.trim().is_empty() {
                return Err("Source names must not be empty".to_string());
            }
            if !source.endpoint_template.starts_with("http") {
                return Err(format!(
                    "Invalid endpoint for source {}: {}",
                    source.name, source.endpoint_template
                ));
            }
        }

        if self.sources.rotation.header.trim().is_empty() {
            return Err("sources.rotation.header must not be empty".to_string());
        }

        if !["json", "pretty"].contains(&self.logging.format.as_str()) {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        if self.proxy_server.bind_port == 0 {
            return Err("Proxy bind port must be greater than 0".to_string());
        }
        if self.proxy_server.rate_limit_max_tokens == 0 {
            return Err("Rate limit capacity must be greater than 0".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_config_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.environment, "development");
        assert_eq!(config.consensus.validators, 5);
        assert_eq!(config.sources.price.len(), 7);
        assert_eq!(config.sources.rotation.header, "X-CG-Pro-API-Key");
        assert_eq!(config.proxy_server.bind_port, 3000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.logging.format = "xml".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.sources.price[0].endpoint_template = "ftp://nope".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.consensus.quorum_threshold = 0.0;
        assert!(config.validate().is_err());

        let clears: [fn(&mut AppConfig); 3] = [
            |c| c.sources.price.clear(),
            |c| c.sources.weather.clear(),
            |c| c.sources.news.clear(),
        ];
        for clear in clears {
            let mut config = AppConfig::default();
            clear(&mut config);
            let err = config.validate().unwrap_err();
            assert!(err.contains("at least one source"), "{err}");
        }
    }

    #[test]
    fn test_leader_timeout_covers_every_call_timeout() {
        let config = AppConfig::default();
        // 7 price, 1 weather and 2 news sources at 10s each.
        assert_eq!(config.leader_budget_seconds(), 100);
        assert!(config.consensus.leader_timeout_seconds >= config.leader_budget_seconds());

        let mut config = AppConfig::default();
        config.consensus.leader_timeout_seconds = 30;
        let err = config.validate().unwrap_err();
        assert!(err.contains("leader_timeout_seconds"), "{err}");

        config.http.call_timeout_seconds = 3;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_content = r#"
[consensus]
validators = 3
quorum_threshold = 0.67

[[sources.price]]
name = "mirror"
endpoint_template = "https://mirror.example/price/{symbol}"
extractor = { type = "json_number", pointer = "/price" }

[sources.rotation]
header = "X-Api-Key"
encoding = "plain"
"#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.consensus.validators, 3);
        assert_eq!(config.sources.price.len(), 1);
        assert_eq!(config.sources.price[0].name, "mirror");
        assert_eq!(config.sources.rotation.header, "X-Api-Key");
        assert_eq!(config.sources.rotation.encoding, CredentialEncoding::Plain);
        assert_eq!(config.sources.weather.len(), 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_file_and_env_layering() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oracle.toml");
        std::fs::write(&path, "[consensus]\nvalidators = 3\n").unwrap();

        std::env::set_var("ORACLE__CONSENSUS__LEADER_TIMEOUT_SECONDS", "7");
        let config = AppConfig::from_file(&path);
        std::env::remove_var("ORACLE__CONSENSUS__LEADER_TIMEOUT_SECONDS");

        let config = config.unwrap();
        assert_eq!(config.consensus.validators, 3);
        assert_eq!(config.consensus.leader_timeout_seconds, 7);
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    #[serial]
    fn test_missing_file_uses_defaults() {
        let config = AppConfig::from_file("/nonexistent/oracle.toml").unwrap();
        assert_eq!(config, AppConfig::default());
    }
}
