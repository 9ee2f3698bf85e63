//! Pagination state machine controller
//!
//! Drives the device adapter and the balance enricher and feeds their results
//! into [`SessionState`] through [`Transition`]s. Only one `connect` or
//! `fetch_more` may run at a time; overlapping calls fail with
//! [`SessionError::Busy`]. A call that fails, is cancelled, or is dropped
//! mid-flight always leaves `fetching` cleared.

use crate::config::DiscoveryConfig;
use crate::error::{SessionError, SessionResult};
use crate::state::{SessionPhase, SessionSnapshot, SessionState, Transition};
use hw_balance::{BalanceEnricher, EnrichedAccount};
use hw_device::{
    DeviceError, DevicePage, DeviceSessionAdapter, DiscoveryRequest, SelectedAccount,
    SelectionHandle,
};
use parking_lot::{Mutex, RwLock};
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Owns one discovery session
pub struct DiscoveryMachine {
    adapter: Arc<dyn DeviceSessionAdapter>,
    enricher: BalanceEnricher,
    config: DiscoveryConfig,
    page_size: NonZeroUsize,
    state: RwLock<SessionState>,
    updates: watch::Sender<SessionSnapshot>,
    ticket: tokio::sync::Mutex<()>,
    cancel: Mutex<CancellationToken>,
}

impl DiscoveryMachine {
    /// Create a machine in the initial empty state
    pub fn new(
        config: DiscoveryConfig,
        adapter: Arc<dyn DeviceSessionAdapter>,
        enricher: BalanceEnricher,
    ) -> SessionResult<Self> {
        config.validate()?;
        let page_size = config.page_size()?;
        let state = SessionState::new();
        let (updates, _) = watch::channel(state.snapshot());

        Ok(Self {
            adapter,
            enricher,
            config,
            page_size,
            state: RwLock::new(state),
            updates,
            ticket: tokio::sync::Mutex::new(()),
            cancel: Mutex::new(CancellationToken::new()),
        })
    }

    /// Start a brand-new session and load page 0
    ///
    /// State is reset before the first suspension point, so observers never
    /// see accounts of the previous session once this has been polled.
    pub async fn connect(&self) -> SessionResult<()> {
        let _ticket = self.ticket.try_lock().map_err(|_| SessionError::Busy)?;
        let token = self.cancel.lock().clone();

        self.dispatch(Transition::ConnectStart);
        let in_flight = InFlight::new(self);

        let request = DiscoveryRequest::new(&self.config.device, 0, self.page_size);
        tracing::info!(
            target: "hw::session",
            device = %request.device_type,
            path = %request.derivation_path,
            length = request.accounts_length.get(),
            "connecting to device"
        );

        let (accounts, selection) = self.load_page(&request, &token).await.map_err(|err| {
            tracing::warn!(target: "hw::session", error = %err, "connect failed");
            err
        })?;
        in_flight.complete();

        let count = accounts.len();
        self.dispatch(Transition::ConnectSuccess);
        self.dispatch(Transition::FetchSuccess {
            accounts,
            selection,
        });
        tracing::info!(target: "hw::session", accounts = count, "device connected");
        Ok(())
    }

    /// Load the next page and return only its accounts
    ///
    /// Allowed from any phase after `connect` was first called. After a failed
    /// connect the page is requested at offset 0 and registered as page 0.
    pub async fn fetch_more(&self) -> SessionResult<Vec<EnrichedAccount>> {
        let _ticket = self.ticket.try_lock().map_err(|_| SessionError::Busy)?;
        let token = self.cancel.lock().clone();

        let offset = {
            let state = self.state.read();
            if !state.has_session() {
                return Err(SessionError::NotConnected);
            }
            state.accounts().len()
        };

        self.dispatch(Transition::FetchStart);
        let in_flight = InFlight::new(self);

        let request = DiscoveryRequest::new(&self.config.device, offset, self.page_size);
        tracing::debug!(
            target: "hw::session",
            offset,
            length = request.accounts_length.get(),
            "fetching next page"
        );

        let (accounts, selection) = self.load_page(&request, &token).await.map_err(|err| {
            tracing::warn!(target: "hw::session", offset, error = %err, "fetch failed");
            err
        })?;
        in_flight.complete();

        let snapshot = self.dispatch(Transition::FetchSuccess {
            accounts: accounts.clone(),
            selection,
        });
        tracing::debug!(
            target: "hw::session",
            page = snapshot.pages_fetched - 1,
            accounts = accounts.len(),
            total = snapshot.accounts.len(),
            "page fetched"
        );
        Ok(accounts)
    }

    /// Finalize selection of `address` through the handle of `page`
    pub async fn pick_account(
        &self,
        address: &str,
        page: usize,
    ) -> SessionResult<SelectedAccount> {
        let selection = {
            let state = self.state.read();
            state
                .selection(page)
                .cloned()
                .ok_or(SessionError::UnknownPage {
                    page,
                    pages_fetched: state.pages_fetched(),
                })?
        };

        let selected = selection.invoke(address).await?;
        tracing::info!(
            target: "hw::session",
            page,
            address = %selected.address,
            "account picked"
        );
        Ok(selected)
    }

    /// Abort the in-flight round trip, if any
    pub fn cancel(&self) {
        let mut token = self.cancel.lock();
        token.cancel();
        *token = CancellationToken::new();
    }

    /// Current state as a read-only snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.read().snapshot()
    }

    /// Receive a snapshot after every transition
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.updates.subscribe()
    }

    /// True while a follow-up page round trip is in flight
    pub fn is_fetching(&self) -> bool {
        self.state.read().is_fetching()
    }

    /// Accounts fetched in this session
    pub fn accounts(&self) -> Arc<Vec<EnrichedAccount>> {
        Arc::clone(self.state.read().accounts())
    }

    /// Lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.state.read().phase()
    }

    /// Completed pages in this session
    pub fn pages_fetched(&self) -> usize {
        self.state.read().pages_fetched()
    }

    /// Pages that can be selected from
    pub fn page_indices(&self) -> Vec<usize> {
        self.state.read().page_indices()
    }

    /// Session configuration
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    fn dispatch(&self, transition: Transition) -> SessionSnapshot {
        let kind = transition.kind();
        let snapshot = {
            let mut state = self.state.write();
            let current = std::mem::take(&mut *state);
            *state = current.apply(transition);
            state.snapshot()
        };
        tracing::trace!(
            target: "hw::session",
            transition = kind,
            pages = snapshot.pages_fetched,
            accounts = snapshot.accounts.len(),
            "transition applied"
        );
        self.updates.send_replace(snapshot.clone());
        snapshot
    }

    /// Device round trip plus enrichment; nothing is committed here
    async fn load_page(
        &self,
        request: &DiscoveryRequest,
        token: &CancellationToken,
    ) -> SessionResult<(Vec<EnrichedAccount>, Arc<SelectionHandle>)> {
        let work = async {
            let page = self.request_page(request).await?;
            if page.len() > request.accounts_length.get() {
                return Err(SessionError::Device(DeviceError::Protocol(format!(
                    "asked for {} addresses, device returned {}",
                    request.accounts_length,
                    page.len()
                ))));
            }
            let accounts = self.enricher.enrich(&page.addresses).await?;
            Ok((accounts, Arc::new(page.selection)))
        };

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(SessionError::Cancelled),
            result = work => result,
        }
    }

    async fn request_page(&self, request: &DiscoveryRequest) -> SessionResult<DevicePage> {
        let round_trip = self.adapter.request_page(request);
        let page = match self.config.device_timeout() {
            Some(limit) => tokio::time::timeout(limit, round_trip)
                .await
                .map_err(|_| {
                    DeviceError::Timeout(format!("no answer within {} ms", limit.as_millis()))
                })??,
            None => round_trip.await?,
        };
        Ok(page)
    }
}

impl std::fmt::Debug for DiscoveryMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryMachine")
            .field("config", &self.config)
            .field("state", &*self.state.read())
            .finish_non_exhaustive()
    }
}

/// Issues `Transition::Error` unless the round trip completed
struct InFlight<'a> {
    machine: &'a DiscoveryMachine,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(machine: &'a DiscoveryMachine) -> Self {
        Self {
            machine,
            armed: true,
        }
    }

    fn complete(mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.machine.dispatch(Transition::Error);
        }
    }
}
