//! Balance lookup error types

use thiserror::Error;

/// Result type for balance operations
pub type BalanceResult<T> = std::result::Result<T, BalanceError>;

/// Balance lookup error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BalanceError {
    /// Transport level failure talking to the balance service
    #[error("HTTP error: {0}")]
    Http(String),

    /// The node answered with a JSON-RPC error object
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// JSON-RPC error message
        message: String,
    },

    /// Response could not be interpreted
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Address is not a well-formed account address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Amount does not fit the fixed-point representation
    #[error("Balance overflow: {0}")]
    Overflow(String),

    /// No balance known for address
    #[error("No balance for address: {0}")]
    NotFound(String),

    /// Backend configuration is unusable
    #[error("Invalid balance configuration: {0}")]
    Config(String),

    /// Other error
    #[error("Other error: {0}")]
    Other(String),
}
