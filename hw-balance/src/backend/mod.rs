//! Balance backends

#[cfg(feature = "rpc")]
mod json_rpc;
#[cfg(feature = "simulation")]
mod memory;

use crate::error::BalanceResult;
use crate::summary::BalanceSummary;
use async_trait::async_trait;

#[cfg(feature = "rpc")]
pub use json_rpc::{parse_quantity, JsonRpcBalanceBackend, ERC20_BALANCE_OF_SELECTOR};
#[cfg(feature = "simulation")]
pub use memory::{InMemoryBalanceBackend, MissingBalance};

/// Resolves the balance summary of a single address
#[async_trait]
pub trait BalanceBackend: Send + Sync {
    /// Look up balances for `address`
    async fn balance_of(&self, address: &str) -> BalanceResult<BalanceSummary>;
}
