//! Public session facade

use crate::config::{ConfigError, DiscoveryConfig};
use crate::error::{SessionError, SessionResult};
use crate::machine::DiscoveryMachine;
use crate::state::{SessionPhase, SessionSnapshot};
use hw_balance::{BalanceBackend, BalanceEnricher, EnrichedAccount};
use hw_device::{DeviceSessionAdapter, SelectedAccount};
use std::sync::Arc;
use tokio::sync::watch;

/// Called with every account the user finalizes
pub type AccountChosenListener = Arc<dyn Fn(&SelectedAccount) + Send + Sync>;

/// Handle UI code uses to drive account discovery
///
/// Cloning is cheap; clones share the same session.
#[derive(Clone)]
pub struct AccountDiscovery {
    machine: Arc<DiscoveryMachine>,
    on_chosen: Option<AccountChosenListener>,
}

impl AccountDiscovery {
    /// Start building a facade
    pub fn builder() -> AccountDiscoveryBuilder {
        AccountDiscoveryBuilder::default()
    }

    /// Facade over `config`, `adapter` and `backend` with no listener
    pub fn new(
        config: DiscoveryConfig,
        adapter: Arc<dyn DeviceSessionAdapter>,
        backend: Arc<dyn BalanceBackend>,
    ) -> SessionResult<Self> {
        Self::builder()
            .config(config)
            .adapter(adapter)
            .backend(backend)
            .build()
    }

    /// Begin a new discovery session and load the first page
    pub async fn connect(&self) -> SessionResult<()> {
        self.machine.connect().await
    }

    /// Load the next page; returns only the new accounts
    pub async fn fetch_more(&self) -> SessionResult<Vec<EnrichedAccount>> {
        self.machine.fetch_more().await
    }

    /// Finalize `address` from `page` on the device
    pub async fn pick_account(
        &self,
        address: &str,
        page: usize,
    ) -> SessionResult<SelectedAccount> {
        let selected = self.machine.pick_account(address, page).await?;
        if let Some(listener) = &self.on_chosen {
            listener(&selected);
        }
        Ok(selected)
    }

    /// True while a follow-up page is being fetched
    pub fn is_fetching(&self) -> bool {
        self.machine.is_fetching()
    }

    /// Accounts fetched in the current session
    pub fn accounts(&self) -> Arc<Vec<EnrichedAccount>> {
        self.machine.accounts()
    }

    /// Lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.machine.phase()
    }

    /// Completed pages in the current session
    pub fn pages_fetched(&self) -> usize {
        self.machine.pages_fetched()
    }

    /// Current state as a read-only snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.machine.snapshot()
    }

    /// Receive a snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.machine.subscribe()
    }

    /// Abort the in-flight device round trip
    pub fn cancel(&self) {
        self.machine.cancel();
    }

    /// Underlying state machine
    pub fn machine(&self) -> &Arc<DiscoveryMachine> {
        &self.machine
    }
}

impl std::fmt::Debug for AccountDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountDiscovery")
            .field("machine", &self.machine)
            .field("on_chosen", &self.on_chosen.is_some())
            .finish()
    }
}

/// Builder for [`AccountDiscovery`]
#[derive(Default)]
pub struct AccountDiscoveryBuilder {
    config: DiscoveryConfig,
    adapter: Option<Arc<dyn DeviceSessionAdapter>>,
    backend: Option<Arc<dyn BalanceBackend>>,
    on_chosen: Option<AccountChosenListener>,
}

impl AccountDiscoveryBuilder {
    /// Session configuration (defaults to [`DiscoveryConfig::default`])
    pub fn config(mut self, config: DiscoveryConfig) -> Self {
        self.config = config;
        self
    }

    /// Device transport
    pub fn adapter(mut self, adapter: Arc<dyn DeviceSessionAdapter>) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Balance lookup service
    pub fn backend(mut self, backend: Arc<dyn BalanceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Listener told about every finalized account
    pub fn on_account_chosen<F>(mut self, listener: F) -> Self
    where
        F: Fn(&SelectedAccount) + Send + Sync + 'static,
    {
        self.on_chosen = Some(Arc::new(listener));
        self
    }

    /// Validate and assemble the facade
    pub fn build(self) -> SessionResult<AccountDiscovery> {
        let adapter = self.adapter.ok_or_else(|| missing("device adapter"))?;
        let backend = self.backend.ok_or_else(|| missing("balance backend"))?;

        let mut enricher = BalanceEnricher::new(backend);
        if let Some(limit) = self.config.concurrency_limit()? {
            enricher = enricher.with_concurrency_limit(limit);
        }

        let machine = DiscoveryMachine::new(self.config, adapter, enricher)?;
        Ok(AccountDiscovery {
            machine: Arc::new(machine),
            on_chosen: self.on_chosen,
        })
    }
}

fn missing(what: &str) -> SessionError {
    SessionError::Config(ConfigError::Invalid(format!("{} is required", what)))
}
