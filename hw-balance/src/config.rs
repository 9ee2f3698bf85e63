//! Balance backend configuration

use crate::error::{BalanceError, BalanceResult};
use serde::{Deserialize, Serialize};

/// Settings for the JSON-RPC balance backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceConfig {
    /// JSON-RPC endpoint of the node
    pub endpoint: String,

    /// Contract address of the governance token
    pub governance_token: String,

    /// Decimals of the native token
    #[serde(default = "default_decimals")]
    pub native_decimals: u32,

    /// Decimals of the governance token
    #[serde(default = "default_decimals")]
    pub governance_decimals: u32,

    /// Per-request timeout in milliseconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
}

const fn default_decimals() -> u32 {
    18
}

const fn default_request_timeout() -> u64 {
    10_000
}

/// Largest scale a fixed-point balance can carry
pub const MAX_DECIMALS: u32 = 28;

impl BalanceConfig {
    /// Config for `endpoint` and `governance_token` with default decimals and timeout
    pub fn new(endpoint: impl Into<String>, governance_token: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            governance_token: governance_token.into(),
            native_decimals: default_decimals(),
            governance_decimals: default_decimals(),
            request_timeout_ms: default_request_timeout(),
        }
    }

    /// Check the settings can drive a backend
    pub fn validate(&self) -> BalanceResult<()> {
        if self.endpoint.trim().is_empty() {
            return Err(BalanceError::Config("endpoint must not be empty".to_string()));
        }
        if self.governance_token.trim().is_empty() {
            return Err(BalanceError::Config(
                "governance_token must not be empty".to_string(),
            ));
        }
        for (name, decimals) in [
            ("native_decimals", self.native_decimals),
            ("governance_decimals", self.governance_decimals),
        ] {
            if decimals > MAX_DECIMALS {
                return Err(BalanceError::Config(format!(
                    "{} must be at most {}, got {}",
                    name, MAX_DECIMALS, decimals
                )));
            }
        }
        if self.request_timeout_ms == 0 {
            return Err(BalanceError::Config(
                "request_timeout_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
