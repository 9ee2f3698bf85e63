//! Balance summary and enriched account models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Balances shown next to a discovered address
///
/// Amounts are fixed-point decimals in whole-token units and serialize as
/// strings so no precision is lost on the way to a display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BalanceSummary {
    /// Native chain token balance
    pub native: Decimal,

    /// Governance/utility token balance
    pub governance: Decimal,
}

impl BalanceSummary {
    /// Create a summary
    pub fn new(native: Decimal, governance: Decimal) -> Self {
        Self { native, governance }
    }

    /// Both balances zero
    pub fn zero() -> Self {
        Self::default()
    }
}

/// Discovered address with its resolved balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedAccount {
    /// Address as reported by the device
    pub address: String,

    /// Resolved balances
    pub balances: BalanceSummary,
}

impl EnrichedAccount {
    /// Merge an address with its balances
    pub fn new(address: impl Into<String>, balances: BalanceSummary) -> Self {
        Self {
            address: address.into(),
            balances,
        }
    }
}
