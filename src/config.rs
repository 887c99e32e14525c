use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use gutwise_core::{DEFAULT_MAX_RETRIES, DEFAULT_NAMESPACE};

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_PROBE_INTERVAL_SECS: u64 = 5;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Base URL of the GutWise API (e.g. "https://api.gutwise.app")
    pub api_url: Option<String>,
    /// Bearer token sent with every request
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// How long `gutwise sync` waits for the server to come back
    pub connect_timeout_secs: u64,
    /// Seconds between reachability probes while waiting
    pub probe_interval_secs: u64,
    /// Drain the queue after every write command (default: false)
    pub auto_sync: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: None,
            api_token: None,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            probe_interval_secs: DEFAULT_PROBE_INTERVAL_SECS,
            auto_sync: false,
        }
    }
}

impl SyncConfig {
    /// Returns true if a backend URL is set
    pub fn is_configured(&self) -> bool {
        self.api_url.is_some()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the local store
    pub data_dir: ConfigValue<PathBuf>,
    /// Prefix for every stored key
    pub namespace: ConfigValue<String>,
    /// User id stamped on new meals and symptoms
    pub user_id: ConfigValue<String>,
    /// Lifetime of cached remote reads
    pub cache_ttl_secs: ConfigValue<u64>,
    /// Failed delivery attempts before a queued item is dropped
    pub max_retries: ConfigValue<u32>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    /// Backend settings
    pub sync: SyncConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    namespace: Option<String>,
    user_id: Option<String>,
    cache_ttl_secs: Option<u64>,
    max_retries: Option<u32>,
    sync: Option<SyncConfig>,
}

impl Config {
    /// Configuration with every value at its default
    pub fn defaults() -> Self {
        Self {
            data_dir: ConfigValue::new(Self::default_data_dir(), ConfigSource::Default),
            namespace: ConfigValue::new(DEFAULT_NAMESPACE.to_string(), ConfigSource::Default),
            user_id: ConfigValue::new("default".to_string(), ConfigSource::Default),
            cache_ttl_secs: ConfigValue::new(DEFAULT_CACHE_TTL_SECS, ConfigSource::Default),
            max_retries: ConfigValue::new(DEFAULT_MAX_RETRIES, ConfigSource::Default),
            config_file: None,
            sync: SyncConfig::default(),
        }
    }

    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut config = Self::defaults();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config.apply_file(file_config, &path);
            config.config_file = Some(path);
        }

        config.apply_env();
        Ok(config)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs.value)
    }

    fn apply_file(&mut self, file_config: ConfigFile, path: &std::path::Path) {
        if let Some(dir) = file_config.data_dir {
            // Resolve relative paths against config file's directory
            let resolved = if dir.is_relative() {
                path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
            } else {
                dir
            };
            self.data_dir = ConfigValue::new(resolved, ConfigSource::File);
        }
        if let Some(namespace) = file_config.namespace {
            self.namespace = ConfigValue::new(namespace, ConfigSource::File);
        }
        if let Some(user) = file_config.user_id {
            self.user_id = ConfigValue::new(user, ConfigSource::File);
        }
        if let Some(ttl) = file_config.cache_ttl_secs {
            self.cache_ttl_secs = ConfigValue::new(ttl, ConfigSource::File);
        }
        if let Some(retries) = file_config.max_retries {
            self.max_retries = ConfigValue::new(retries, ConfigSource::File);
        }
        if let Some(sync) = file_config.sync {
            self.sync = sync;
        }
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var("GUTWISE_DATA_DIR") {
            self.data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(namespace) = std::env::var("GUTWISE_NAMESPACE") {
            self.namespace = ConfigValue::new(namespace, ConfigSource::Environment);
        }
        if let Ok(user) = std::env::var("GUTWISE_USER_ID") {
            self.user_id = ConfigValue::new(user, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("GUTWISE_API_URL") {
            self.sync.api_url = Some(url);
        }
        if let Ok(token) = std::env::var("GUTWISE_API_TOKEN") {
            self.sync.api_token = Some(token);
        }
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/gutwise/
    /// - macOS: ~/Library/Application Support/gutwise/
    /// - Windows: %APPDATA%/gutwise/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gutwise")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/gutwise/
    /// - macOS: ~/Library/Application Support/gutwise/
    /// - Windows: %APPDATA%/gutwise/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gutwise")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {}", .0.display(), .1)]
    ReadError(PathBuf, #[source] std::io::Error),
    #[error("Failed to parse config file '{}': {}", .0.display(), .1)]
    ParseError(PathBuf, #[source] serde_yaml::Error),
}
