//! Balance enrichment of discovered addresses

use crate::backend::BalanceBackend;
use crate::error::BalanceResult;
use crate::summary::EnrichedAccount;
use futures::{future, stream, StreamExt, TryStreamExt};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Attaches balances to a page of addresses
///
/// Lookups run concurrently and may finish in any order; the output always
/// follows the input order. A single failed lookup fails the whole call, so
/// callers never see a partially enriched page.
#[derive(Clone)]
pub struct BalanceEnricher {
    backend: Arc<dyn BalanceBackend>,
    concurrency: Option<NonZeroUsize>,
}

impl BalanceEnricher {
    /// Enricher with unbounded concurrency
    pub fn new(backend: Arc<dyn BalanceBackend>) -> Self {
        Self {
            backend,
            concurrency: None,
        }
    }

    /// Cap the number of lookups in flight
    pub fn with_concurrency_limit(mut self, limit: NonZeroUsize) -> Self {
        self.concurrency = Some(limit);
        self
    }

    /// Configured concurrency cap
    pub fn concurrency_limit(&self) -> Option<NonZeroUsize> {
        self.concurrency
    }

    /// Resolve balances for every address, preserving input order
    pub async fn enrich(&self, addresses: &[String]) -> BalanceResult<Vec<EnrichedAccount>> {
        if addresses.is_empty() {
            return Ok(Vec::new());
        }

        let lookups: Vec<_> = addresses
            .iter()
            .map(|address| self.enrich_one(address))
            .collect();
        let accounts: Vec<EnrichedAccount> = match self.concurrency {
            Some(limit) => {
                stream::iter(lookups)
                    .buffered(limit.get())
                    .try_collect::<Vec<_>>()
                    .await
            }
            None => future::try_join_all(lookups).await,
        }
        .map_err(|err| {
            tracing::warn!(
                target: "hw::balance",
                addresses = addresses.len(),
                error = %err,
                "balance enrichment failed"
            );
            err
        })?;

        tracing::debug!(
            target: "hw::balance",
            addresses = accounts.len(),
            "balances resolved"
        );
        Ok(accounts)
    }

    async fn enrich_one(&self, address: &str) -> BalanceResult<EnrichedAccount> {
        let balances = self.backend.balance_of(address).await?;
        Ok(EnrichedAccount::new(address, balances))
    }
}

impl std::fmt::Debug for BalanceEnricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BalanceEnricher")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}
