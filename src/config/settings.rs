use serde::{Deserialize, Serialize};
use std::fs;
#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;
use std::time::Duration;

use super::paths::Paths;
use crate::cache::{CacheConfig, DEFAULT_KEEP_UNUSED_FOR};
use crate::duration::{format_duration, parse_duration};
use crate::error::{PunchlineError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub cache: CacheSettings,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub log: LogConfig,
}

/// Backend connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the listings API
    pub base_url: Option<String>,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Query cache tuning, durations written like `60s` or `5m`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Grace period before an unused entry is evicted
    #[serde(default = "default_keep_unused_for")]
    pub keep_unused_for: String,
    /// Maximum age before a cached result is refetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refetch_after: Option<String>,
}

fn default_keep_unused_for() -> String {
    format_duration(DEFAULT_KEEP_UNUSED_FOR)
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            keep_unused_for: default_keep_unused_for(),
            refetch_after: None,
        }
    }
}

impl CacheSettings {
    /// Parse into the cache's own configuration
    pub fn to_cache_config(&self) -> Result<CacheConfig> {
        let keep_unused_for = parse_duration(&self.keep_unused_for).map_err(|e| {
            PunchlineError::Config(format!("cache.keep_unused_for: {e}"))
        })?;
        let refetch_after = self
            .refetch_after
            .as_deref()
            .map(parse_duration)
            .transpose()
            .map_err(|e| PunchlineError::Config(format!("cache.refetch_after: {e}")))?;

        Ok(CacheConfig {
            keep_unused_for,
            refetch_after,
        })
    }
}

/// Output formatting preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Default output format
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "pretty".to_string()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

/// Logging defaults; `PUNCHLINE_LOG` and `-v` take precedence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "warn".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

/// Keys accepted by `punchline config set`
pub const SETTABLE_KEYS: &[&str] = &[
    "api.base_url",
    "api.timeout_secs",
    "cache.keep_unused_for",
    "cache.refetch_after",
    "output.format",
    "log.level",
];

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let paths = Paths::new()?;
        Self::load_from(&paths)
    }

    /// Load configuration from a specific paths instance
    pub fn load_from(paths: &Paths) -> Result<Self> {
        if !paths.config_exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&paths.config_file)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default path
    pub fn save(&self) -> Result<()> {
        let paths = Paths::new()?;
        self.save_to(&paths)
    }

    /// Save configuration to a specific paths instance
    pub fn save_to(&self, paths: &Paths) -> Result<()> {
        paths.ensure_dirs()?;
        let contents = toml::to_string_pretty(self)?;
        fs::write(&paths.config_file, &contents)?;

        #[cfg(unix)]
        fs::set_permissions(&paths.config_file, fs::Permissions::from_mode(0o600))?;

        Ok(())
    }

    /// Get the API base URL or return an error with instructions
    pub fn require_base_url(&self) -> Result<&str> {
        self.api
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                PunchlineError::config_missing(
                    "API URL not configured. Run 'punchline config init <url>' or pass --api-url.",
                )
            })
    }

    pub fn set_base_url(&mut self, url: String) {
        self.api.base_url = Some(url);
    }

    /// Set a value by dotted key, validating it first
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api.base_url" => {
                url::Url::parse(value).map_err(|e| {
                    PunchlineError::InvalidArgument(format!("api.base_url: {e}"))
                })?;
                self.api.base_url = Some(value.to_string());
            }
            "api.timeout_secs" => {
                self.api.timeout_secs = value.parse().map_err(|_| {
                    PunchlineError::InvalidArgument(format!(
                        "api.timeout_secs must be a whole number of seconds, got '{value}'"
                    ))
                })?;
            }
            "cache.keep_unused_for" => {
                parse_duration(value)?;
                self.cache.keep_unused_for = value.to_string();
            }
            "cache.refetch_after" => {
                if value.is_empty() || value == "never" {
                    self.cache.refetch_after = None;
                } else {
                    parse_duration(value)?;
                    self.cache.refetch_after = Some(value.to_string());
                }
            }
            "output.format" => match value {
                "pretty" | "json" => self.output.format = value.to_string(),
                _ => {
                    return Err(PunchlineError::InvalidArgument(format!(
                        "output.format must be 'pretty' or 'json', got '{value}'"
                    )))
                }
            },
            "log.level" => {
                value
                    .parse::<tracing_subscriber::filter::LevelFilter>()
                    .map_err(|_| {
                        PunchlineError::InvalidArgument(format!(
                            "log.level must be one of off, error, warn, info, debug, trace; got '{value}'"
                        ))
                    })?;
                self.log.level = value.to_string();
            }
            _ => {
                return Err(PunchlineError::InvalidArgument(format!(
                    "Unknown config key '{key}'. Valid keys: {}",
                    SETTABLE_KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}
