//! In-memory balance table

use super::BalanceBackend;
use crate::error::{BalanceError, BalanceResult};
use crate::summary::BalanceSummary;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// What to answer for addresses missing from the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingBalance {
    /// Report zero balances
    #[default]
    Zero,
    /// Fail with [`BalanceError::NotFound`]
    NotFound,
}

/// Balance backend backed by a fixed table
///
/// Keys are matched case-insensitively. Per-address delays and failures let
/// tests control completion order and fail-fast behaviour.
#[derive(Default)]
pub struct InMemoryBalanceBackend {
    balances: RwLock<HashMap<String, BalanceSummary>>,
    delays: RwLock<HashMap<String, Duration>>,
    failing: RwLock<HashSet<String>>,
    missing: MissingBalance,
    lookups: AtomicUsize,
}

impl InMemoryBalanceBackend {
    /// Empty table answering zero for unknown addresses
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose how unknown addresses are answered
    pub fn with_missing(mut self, missing: MissingBalance) -> Self {
        self.missing = missing;
        self
    }

    /// Set the balances of `address`
    pub fn insert(&self, address: &str, summary: BalanceSummary) {
        self.balances.write().insert(key(address), summary);
    }

    /// Delay lookups of `address`
    pub fn delay(&self, address: &str, delay: Duration) {
        self.delays.write().insert(key(address), delay);
    }

    /// Make lookups of `address` fail
    pub fn fail_for(&self, address: &str) {
        self.failing.write().insert(key(address));
    }

    /// Stop failing lookups of `address`
    pub fn recover(&self, address: &str) {
        self.failing.write().remove(&key(address));
    }

    /// Number of lookups started so far
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

fn key(address: &str) -> String {
    address.to_ascii_lowercase()
}

#[async_trait]
impl BalanceBackend for InMemoryBalanceBackend {
    async fn balance_of(&self, address: &str) -> BalanceResult<BalanceSummary> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        let key = key(address);

        let delay = self.delays.read().get(&key).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        if self.failing.read().contains(&key) {
            return Err(BalanceError::Other(format!(
                "balance service unavailable for {}",
                address
            )));
        }

        let known = self.balances.read().get(&key).copied();
        match (known, self.missing) {
            (Some(summary), _) => Ok(summary),
            (None, MissingBalance::Zero) => Ok(BalanceSummary::zero()),
            (None, MissingBalance::NotFound) => Err(BalanceError::NotFound(address.to_string())),
        }
    }
}
