//! Configuration management for Hashgate.
//!
//! Sources, lowest precedence first: built-in defaults, an optional YAML
//! file, `HASHGATE__SECTION__KEY` environment variables, and finally the
//! bare `REDIS_URL` and `SALT` variables.

use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{HashgateError, Result};
use crate::privacy::Salt;
use crate::ratelimit::DEFAULT_KEY_PREFIX;

/// Main configuration for the Hashgate service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HashgateConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Counting store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Identifier hashing configuration
    #[serde(default)]
    pub privacy: PrivacyConfig,

    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,

    /// Largest accepted request body
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::LOCALHOST, 8080))
}

fn default_body_limit() -> usize {
    64 * 1024
}

/// Which counting store to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Shared Redis instance
    #[default]
    Redis,
    /// Process-local memory; counts are not shared between instances
    Memory,
}

/// Counting store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Redis connection URL, required for the redis backend
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Prefix for every counter key
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Bound on each store call in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            redis_url: None,
            key_prefix: default_key_prefix(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_key_prefix() -> String {
    DEFAULT_KEY_PREFIX.to_string()
}

fn default_timeout_ms() -> u64 {
    1000
}

/// Identifier hashing configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivacyConfig {
    /// Server secret mixed into every namespace and entity key
    #[serde(default)]
    pub salt: Option<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Log output configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,

    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl HashgateConfig {
    /// Load configuration from an optional YAML file and the environment.
    ///
    /// The result is not validated, so callers can apply overrides first;
    /// call [`validate`](Self::validate) before use.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Yaml));
        }

        let config = builder
            .add_source(Environment::with_prefix("HASHGATE").separator("__"))
            .set_override_option("store.redis_url", std::env::var("REDIS_URL").ok())
            .and_then(|b| b.set_override_option("privacy.salt", std::env::var("SALT").ok()))
            .map_err(config_error)?
            .build()
            .map_err(config_error)?;

        config.try_deserialize().map_err(config_error)
    }

    /// Parse and validate configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()
            .map_err(config_error)?;

        let config: HashgateConfig = config.try_deserialize().map_err(config_error)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the service cannot start with.
    pub fn validate(&self) -> Result<()> {
        self.salt()?;

        if self.store.backend == StoreBackend::Redis && self.store.redis_url.is_none() {
            return Err(HashgateError::Config(
                "store.redis_url (or REDIS_URL) is required for the redis backend".to_string(),
            ));
        }

        if self.store.timeout_ms == 0 {
            return Err(HashgateError::Config(
                "store.timeout_ms must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// The configured server salt.
    pub fn salt(&self) -> Result<Salt> {
        match self.privacy.salt.as_deref() {
            Some(salt) if !salt.is_empty() => Ok(Salt::new(salt)),
            _ => Err(HashgateError::Config(
                "privacy.salt (or SALT) must be set to a non-empty secret".to_string(),
            )),
        }
    }
}

fn config_error(e: config::ConfigError) -> HashgateError {
    HashgateError::Config(e.to_string())
}
