//! Aggregate settings file
//!
//! ```toml
//! [discovery]
//! accounts_length = 25
//! device_timeout_ms = 60000
//!
//! [discovery.device]
//! type = "ledger"
//! path = "44'/60'/0'"
//!
//! [balance]
//! endpoint = "http://localhost:8545"
//! governance_token = "0x..."
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```

use crate::logging::LogConfig;
use hw_balance::BalanceConfig;
use hw_session::{ConfigError, DiscoveryConfig};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(feature = "rpc")]
use hw_balance::JsonRpcBalanceBackend;
#[cfg(feature = "rpc")]
use hw_device::DeviceSessionAdapter;
#[cfg(feature = "rpc")]
use hw_session::{AccountDiscovery, SessionError, SessionResult};
#[cfg(feature = "rpc")]
use std::sync::Arc;

/// Everything an application needs to run discovery
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Session settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// JSON-RPC balance backend; absent when balances come from elsewhere
    #[serde(default)]
    pub balance: Option<BalanceConfig>,

    /// Log output
    #[serde(default)]
    pub logging: LogConfig,
}

impl Settings {
    /// Parse from TOML text and validate
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load from a TOML file and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&text)?;
        tracing::debug!(target: "hw::config", path = %path.display(), "settings loaded");
        Ok(settings)
    }

    /// Check every section
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.discovery.validate()?;
        if let Some(balance) = &self.balance {
            balance
                .validate()
                .map_err(|e| ConfigError::Invalid(format!("[balance] {}", e)))?;
        }
        Ok(())
    }

    /// Session over `adapter` with balances from the configured JSON-RPC node
    #[cfg(feature = "rpc")]
    pub fn discovery_session(
        &self,
        adapter: Arc<dyn DeviceSessionAdapter>,
    ) -> SessionResult<AccountDiscovery> {
        let balance = self.balance.as_ref().ok_or_else(|| {
            SessionError::Config(ConfigError::Invalid(
                "[balance] table is required".to_string(),
            ))
        })?;
        let backend = Arc::new(JsonRpcBalanceBackend::new(balance)?);
        AccountDiscovery::new(self.discovery.clone(), adapter, backend)
    }
}
