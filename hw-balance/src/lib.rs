//! # hw-balance
//!
//! Balance resolution for addresses discovered on a hardware wallet.
//!
//! - [`BalanceBackend`]: looks up the [`BalanceSummary`] of one address
//! - [`BalanceEnricher`]: resolves a whole page concurrently, keeps input
//!   order and fails fast
//!
//! ## Features
//!
//! - `rpc` (default): [`JsonRpcBalanceBackend`] for Ethereum-style nodes
//! - `simulation` (default): [`InMemoryBalanceBackend`] for testing

pub mod backend;
pub mod config;
pub mod enricher;
pub mod error;
pub mod summary;

// Re-exports
pub use backend::BalanceBackend;
pub use config::BalanceConfig;
pub use enricher::BalanceEnricher;
pub use error::{BalanceError, BalanceResult};
pub use summary::{BalanceSummary, EnrichedAccount};

#[cfg(feature = "rpc")]
pub use backend::JsonRpcBalanceBackend;

#[cfg(feature = "simulation")]
pub use backend::{InMemoryBalanceBackend, MissingBalance};

pub use rust_decimal::Decimal;
