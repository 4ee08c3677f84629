//! Configuration management
//!
//! Configuration lives in a single TOML file, by default
//! `~/.config/devkit/config.toml`. The directory can be overridden with the
//! `DK_CONFIG_DIR` environment variable.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "DK_CONFIG_DIR";

/// Default size of one multipart part (5 MiB, the S3 minimum for non-final parts)
pub const DEFAULT_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Smallest part S3 accepts for every part but the last
pub const MIN_PART_SIZE: u64 = 5 * 1024 * 1024;

/// Default number of parts uploaded at the same time
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Access credentials for the storage service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_key.is_empty() || self.secret_key.is_empty()
    }

    /// Secret key with everything but the first four characters hidden
    pub fn masked_secret(&self) -> String {
        let visible: String = self.secret_key.chars().take(4).collect();
        if self.secret_key.chars().count() <= 4 {
            "****".to_string()
        } else {
            format!("{visible}****")
        }
    }
}

/// Storage target: which bucket, where, and under which key prefix
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageConfig {
    pub bucket: String,
    pub region: String,

    #[serde(default)]
    pub credentials: Credentials,

    /// Prefix prepended to every generated object key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_prefix: Option<String>,

    /// Custom endpoint for S3-compatible services (MinIO, RustFS, R2)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Use path-style addressing instead of virtual-hosted buckets
    #[serde(default)]
    pub force_path_style: bool,
}

impl StorageConfig {
    /// Check the fields the transport needs before any client is built
    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(Error::Config("storage bucket is not set".to_string()));
        }
        if self.region.is_empty() {
            return Err(Error::Config("storage region is not set".to_string()));
        }
        if self.credentials.is_empty() {
            return Err(Error::Config(
                "storage credentials are not set".to_string(),
            ));
        }
        if let Some(endpoint) = &self.endpoint {
            validate_endpoint(endpoint)?;
        }
        Ok(())
    }
}

/// Accept only absolute http(s) URLs as storage endpoints
pub fn validate_endpoint(endpoint: &str) -> Result<()> {
    let parsed = url::Url::parse(endpoint)
        .map_err(|e| Error::Config(format!("invalid endpoint '{endpoint}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Error::Config(format!(
            "endpoint must use http or https: {endpoint}"
        )));
    }
    Ok(())
}

/// Multipart upload tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub part_size: u64,
    pub concurrency: usize,
    /// Upload objects that fit in one part with a single PUT
    pub single_shot: bool,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            part_size: DEFAULT_PART_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            single_shot: true,
        }
    }
}

/// Retry policy applied to individual transport calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

/// Top-level devkit configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Key handed to [`crate::DevKit::init`]; the gate stays closed without it
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_key: String,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub upload: UploadConfig,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Loads and saves [`Config`] from disk
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Create a manager for the default location
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: default_config_dir()?.join("config.toml"),
        })
    }

    /// Create a manager for an explicit file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, falling back to defaults when the file is missing
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "config file missing, using defaults");
            return Ok(Config::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Write the configuration, creating the parent directory if needed
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.path, content)?;
        tracing::debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

fn default_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|d| d.join("devkit"))
        .ok_or_else(|| Error::Config("could not determine config directory".to_string()))
}
