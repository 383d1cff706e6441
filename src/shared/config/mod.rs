//! Application configuration module
//!
//! Provides the configuration of the offline sync client: where the backend
//! lives, where pending operations are persisted, and how often reachability
//! is probed. Values come from defaults, environment variables, or a TOML
//! file, and are validated when the builder runs.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default backend API root
pub const DEFAULT_API_BASE_URL: &str = "http://127.0.0.1:8000/api";

/// Default storage key of the pending-operation list
pub const DEFAULT_STORAGE_KEY: &str = "cola_sync";

/// Default probe interval
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Default delay before the first probe
pub const DEFAULT_INITIAL_PROBE_DELAY: Duration = Duration::from_secs(2);

const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Offline sync client configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Backend API root, e.g. `http://127.0.0.1:8000/api`
    pub api_base_url: String,
    /// Prefix prepended to queued paths, e.g. `/api`
    pub api_prefix: String,
    /// Storage key holding the serialized queue
    pub storage_key: String,
    /// Interval between reachability probes
    pub check_interval: Duration,
    /// Delay before the first probe after start
    pub initial_probe_delay: Duration,
    /// Optional bound on every backend request
    pub request_timeout: Option<Duration>,
    /// Directory for the local database and exported files
    pub data_dir: PathBuf,
    /// Capacity of the event broadcast channel
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            api_prefix: "/api".to_string(),
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            check_interval: DEFAULT_CHECK_INTERVAL,
            initial_probe_delay: DEFAULT_INITIAL_PROBE_DELAY,
            request_timeout: None,
            data_dir: default_data_dir(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

impl SyncConfig {
    /// Create a new SyncConfigBuilder
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }

    /// Build a configuration from `GESTION_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut builder = Self::builder();

        if let Ok(url) = std::env::var("GESTION_API_URL") {
            builder = builder.api_base_url(url);
        }
        if let Ok(prefix) = std::env::var("GESTION_API_PREFIX") {
            builder = builder.api_prefix(prefix);
        }
        if let Ok(key) = std::env::var("GESTION_SYNC_STORAGE_KEY") {
            builder = builder.storage_key(key);
        }
        if let Some(secs) = env_secs("GESTION_SYNC_INTERVAL_SECS")? {
            builder = builder.check_interval(Duration::from_secs(secs));
        }
        if let Some(secs) = env_secs("GESTION_SYNC_INITIAL_DELAY_SECS")? {
            builder = builder.initial_probe_delay(Duration::from_secs(secs));
        }
        if let Some(secs) = env_secs("GESTION_REQUEST_TIMEOUT_SECS")? {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Ok(dir) = std::env::var("GESTION_DATA_DIR") {
            builder = builder.data_dir(dir);
        }

        builder.build()
    }

    /// Parse a TOML document
    ///
    /// Keys match the field names; durations are given in seconds.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(source)?;
        file.into_builder().build()
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Unreadable(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// Default SQLite file inside the data directory
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("local.db")
    }

    /// Point at another API root, re-deriving the path prefix
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Result<Self, ConfigError> {
        self.api_base_url = url.into().trim_end_matches('/').to_string();
        self.api_prefix = derive_prefix(&self.api_base_url)?;
        self.validate()?;
        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.api_base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", self.api_base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                self.api_base_url
            )));
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::MissingValue("storage_key"));
        }
        if self.check_interval.is_zero() {
            return Err(ConfigError::InvalidValue("check_interval must be greater than zero".into()));
        }
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidValue("event_capacity must be greater than zero".into()));
        }
        Ok(())
    }
}

/// Builder for SyncConfig
#[derive(Debug, Default)]
pub struct SyncConfigBuilder {
    api_base_url: Option<String>,
    api_prefix: Option<String>,
    storage_key: Option<String>,
    check_interval: Option<Duration>,
    initial_probe_delay: Option<Duration>,
    request_timeout: Option<Duration>,
    data_dir: Option<PathBuf>,
    event_capacity: Option<usize>,
}

impl SyncConfigBuilder {
    /// Set the backend API root
    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = Some(url.into());
        self
    }

    /// Override the prefix derived from the API root
    pub fn api_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.api_prefix = Some(prefix.into());
        self
    }

    pub fn storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = Some(key.into());
        self
    }

    pub fn check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = Some(interval);
        self
    }

    pub fn initial_probe_delay(mut self, delay: Duration) -> Self {
        self.initial_probe_delay = Some(delay);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = Some(capacity);
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<SyncConfig, ConfigError> {
        let defaults = SyncConfig::default();

        let api_base_url = self
            .api_base_url
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);

        let api_prefix = match self.api_prefix {
            Some(prefix) => normalize_prefix(&prefix),
            None => derive_prefix(&api_base_url)?,
        };

        let config = SyncConfig {
            api_base_url,
            api_prefix,
            storage_key: self.storage_key.unwrap_or(defaults.storage_key),
            check_interval: self.check_interval.unwrap_or(defaults.check_interval),
            initial_probe_delay: self.initial_probe_delay.unwrap_or(defaults.initial_probe_delay),
            request_timeout: self.request_timeout,
            data_dir: self.data_dir.unwrap_or(defaults.data_dir),
            event_capacity: self.event_capacity.unwrap_or(defaults.event_capacity),
        };

        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value: {0}")]
    InvalidValue(String),
    #[error("cannot read config file: {0}")]
    Unreadable(String),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// On-disk shape of the TOML configuration
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    api_base_url: Option<String>,
    api_prefix: Option<String>,
    storage_key: Option<String>,
    check_interval: Option<u64>,
    initial_probe_delay: Option<u64>,
    request_timeout: Option<u64>,
    data_dir: Option<PathBuf>,
    event_capacity: Option<usize>,
}

impl FileConfig {
    fn into_builder(self) -> SyncConfigBuilder {
        SyncConfigBuilder {
            api_base_url: self.api_base_url,
            api_prefix: self.api_prefix,
            storage_key: self.storage_key,
            check_interval: self.check_interval.map(Duration::from_secs),
            initial_probe_delay: self.initial_probe_delay.map(Duration::from_secs),
            request_timeout: self.request_timeout.map(Duration::from_secs),
            data_dir: self.data_dir,
            event_capacity: self.event_capacity,
        }
    }
}

/// Platform data directory, falling back to the temp dir
fn default_data_dir() -> PathBuf {
    let mut path = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
    path.push("gestion-sync");
    path
}

/// Path component of the API root, without a trailing slash
fn derive_prefix(api_base_url: &str) -> Result<String, ConfigError> {
    let url = reqwest::Url::parse(api_base_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", api_base_url, e)))?;
    Ok(normalize_prefix(url.path()))
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{}", trimmed)
    }
}

fn env_secs(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(format!("{} must be a number of seconds", name))),
        Err(_) => Ok(None),
    }
}
