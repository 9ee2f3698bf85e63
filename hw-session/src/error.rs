//! Session error types

use crate::config::ConfigError;
use hw_balance::BalanceError;
use hw_device::DeviceError;
use thiserror::Error;

/// Result type for session operations
pub type SessionResult<T> = std::result::Result<T, SessionError>;

/// Session error types
#[derive(Error, Debug)]
pub enum SessionError {
    /// Device round trip or selection failed
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Balance enrichment failed
    #[error("Balance error: {0}")]
    Balance(#[from] BalanceError),

    /// Selection requested on a page that was never fetched
    #[error("Unknown page {page} ({pages_fetched} page(s) fetched)")]
    UnknownPage {
        /// Requested page index
        page: usize,
        /// Pages fetched in the current session
        pages_fetched: usize,
    },

    /// Another connect or fetch is in flight
    #[error("Discovery request already in flight")]
    Busy,

    /// `fetch_more` before `connect` was ever called
    #[error("Session not connected")]
    NotConnected,

    /// In-flight request was cancelled
    #[error("Discovery cancelled")]
    Cancelled,

    /// Invalid session setup
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl SessionError {
    /// Whether retrying the same call later can succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SessionError::Device(_)
                | SessionError::Balance(_)
                | SessionError::Busy
                | SessionError::Cancelled
        )
    }
}
