//! Authorization gate
//!
//! Every upload and delete checks the gate before touching the network.
//! [`DevKit`] is the explicit handle produced by [`DevKit::init`]; it is passed
//! to the uploader instead of living in process-wide state.

use crate::config::{Config, StorageConfig};
use crate::error::{Error, Result};

/// Access check consulted before any transport call
pub trait AuthGate: Send + Sync {
    fn is_authorized(&self) -> bool;

    fn current_config(&self) -> &StorageConfig;

    /// Fail with [`Error::Unauthorized`] when the gate is closed
    fn ensure_authorized(&self) -> Result<()> {
        if self.is_authorized() {
            Ok(())
        } else {
            Err(Error::Unauthorized(
                "devkit is not initialized with an API key".to_string(),
            ))
        }
    }
}

/// Initialized toolkit handle carrying the API key and configuration
#[derive(Debug, Clone)]
pub struct DevKit {
    api_key: String,
    config: Config,
}

impl DevKit {
    /// Initialize the toolkit. The gate opens only for a non-blank key.
    pub fn init(api_key: impl Into<String>, config: Config) -> Self {
        let api_key = api_key.into();
        tracing::debug!(authorized = !api_key.trim().is_empty(), "devkit initialized");
        Self { api_key, config }
    }

    /// Initialize from a loaded config, using its `api_key` field
    pub fn from_config(config: Config) -> Self {
        let key = config.api_key.clone();
        Self::init(key, config)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl AuthGate for DevKit {
    fn is_authorized(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    fn current_config(&self) -> &StorageConfig {
        &self.config.storage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_open_with_key() {
        let kit = DevKit::init("key-1", Config::default());
        assert!(kit.is_authorized());
        assert!(kit.ensure_authorized().is_ok());
    }

    #[test]
    fn test_gate_closed_without_key() {
        let kit = DevKit::init("   ", Config::default());
        assert!(!kit.is_authorized());
        assert!(matches!(kit.ensure_authorized(), Err(Error::Unauthorized(_))));
    }

    #[test]
    fn test_from_config_uses_api_key() {
        let config = Config {
            api_key: "abc".to_string(),
            ..Default::default()
        };
        let kit = DevKit::from_config(config);
        assert!(kit.is_authorized());
        assert_eq!(kit.config().api_key, "abc");
    }
}
