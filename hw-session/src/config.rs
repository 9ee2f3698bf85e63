//! Discovery session configuration

use hw_device::DeviceProfile;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Addresses requested per page unless configured otherwise
pub const DEFAULT_ACCOUNTS_LENGTH: usize = 25;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Reading the configuration file failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration text is not valid TOML for this schema
    #[error("Parse error: {0}")]
    Parse(String),

    /// Values parse but cannot drive a session
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Settings for one discovery session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Device kind and derivation path root
    #[serde(default)]
    pub device: DeviceProfile,

    /// Addresses per page, fixed for the lifetime of a session
    #[serde(default = "default_accounts_length")]
    pub accounts_length: usize,

    /// Deadline for one device round trip in milliseconds
    #[serde(default)]
    pub device_timeout_ms: Option<u64>,

    /// Maximum balance lookups in flight (unbounded when unset)
    #[serde(default)]
    pub max_concurrent_lookups: Option<usize>,
}

const fn default_accounts_length() -> usize {
    DEFAULT_ACCOUNTS_LENGTH
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self::new(DeviceProfile::default())
    }
}

impl DiscoveryConfig {
    /// Defaults for `device`
    pub fn new(device: DeviceProfile) -> Self {
        Self {
            device,
            accounts_length: DEFAULT_ACCOUNTS_LENGTH,
            device_timeout_ms: None,
            max_concurrent_lookups: None,
        }
    }

    /// Set the page size
    pub fn with_accounts_length(mut self, accounts_length: usize) -> Self {
        self.accounts_length = accounts_length;
        self
    }

    /// Set the device round trip deadline
    pub fn with_device_timeout(mut self, timeout: Duration) -> Self {
        self.device_timeout_ms = Some(timeout.as_millis().try_into().unwrap_or(u64::MAX));
        self
    }

    /// Cap concurrent balance lookups
    pub fn with_max_concurrent_lookups(mut self, limit: usize) -> Self {
        self.max_concurrent_lookups = Some(limit);
        self
    }

    /// Parse from TOML text and validate
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check the settings can drive a session
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.page_size()?;
        self.concurrency_limit()?;
        if self.device_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid(
                "device_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Page size as a non-zero count
    pub fn page_size(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.accounts_length)
            .ok_or_else(|| ConfigError::Invalid("accounts_length must be positive".to_string()))
    }

    /// Balance lookup cap, if any
    pub fn concurrency_limit(&self) -> Result<Option<NonZeroUsize>, ConfigError> {
        match self.max_concurrent_lookups {
            None => Ok(None),
            Some(limit) => NonZeroUsize::new(limit).map(Some).ok_or_else(|| {
                ConfigError::Invalid("max_concurrent_lookups must be positive".to_string())
            }),
        }
    }

    /// Device round trip deadline, if any
    pub fn device_timeout(&self) -> Option<Duration> {
        self.device_timeout_ms.map(Duration::from_millis)
    }
}
