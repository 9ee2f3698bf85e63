//! Device session error types

use thiserror::Error;

/// Result type for device session operations
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Device session error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Device went away during a round trip
    #[error("Device disconnected: {0}")]
    Disconnected(String),

    /// User rejected the operation on device
    #[error("User rejected operation")]
    UserRejected,

    /// Firmware or device application error
    #[error("Firmware error: {0}")]
    Firmware(String),

    /// Timeout waiting for device
    #[error("Device timeout: {0}")]
    Timeout(String),

    /// Device answered with something the session protocol does not allow
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// Invalid derivation path
    #[error("Invalid derivation path: {0}")]
    InvalidDerivationPath(String),

    /// Address is not part of the page the selection belongs to
    #[error("Address {address} is not part of this page")]
    AddressNotInPage {
        /// Requested address
        address: String,
    },

    /// The page selection was already finalized
    #[error("Selection already finalized for address {0}")]
    SelectionAlreadyUsed(String),

    /// Another finalize call is running on the same page
    #[error("Selection in progress")]
    SelectionInProgress,

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}

impl From<anyhow::Error> for DeviceError {
    fn from(err: anyhow::Error) -> Self {
        DeviceError::Other(err.to_string())
    }
}
