//! Session state and its transitions
//!
//! [`SessionState::apply`] is the only way state changes. It is pure: it takes
//! the current state by value and returns the next one, so the controller can
//! swap states atomically and tests can drive it without a device.

use hw_balance::EnrichedAccount;
use hw_device::SelectionHandle;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Nothing requested yet
    #[default]
    Idle,
    /// Page 0 round trip in flight after a reset
    Connecting,
    /// No round trip in flight
    Ready,
    /// Follow-up page round trip in flight
    FetchingPage,
    /// Last round trip failed; already fetched pages stay usable
    Errored,
}

/// Input to [`SessionState::apply`]
#[derive(Debug)]
pub enum Transition {
    /// Discard everything and begin a new session
    ConnectStart,
    /// A follow-up page was requested
    FetchStart,
    /// Device handshake for a new session completed
    ConnectSuccess,
    /// A page was fetched and fully enriched
    FetchSuccess {
        /// Enriched accounts of the page, in device order
        accounts: Vec<EnrichedAccount>,
        /// Selection capability of the page
        selection: Arc<SelectionHandle>,
    },
    /// The in-flight round trip failed
    Error,
}

impl Transition {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Transition::ConnectStart => "connect-start",
            Transition::FetchStart => "fetch-start",
            Transition::ConnectSuccess => "connect-success",
            Transition::FetchSuccess { .. } => "fetch-success",
            Transition::Error => "error",
        }
    }
}

/// State of one discovery session
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    phase: SessionPhase,
    fetching: bool,
    connected: bool,
    accounts: Arc<Vec<EnrichedAccount>>,
    page_handles: BTreeMap<usize, Arc<SelectionHandle>>,
    pages_fetched: usize,
}

impl SessionState {
    /// Fresh, empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the state that follows `transition`
    #[must_use]
    pub fn apply(self, transition: Transition) -> Self {
        let next = match transition {
            Transition::ConnectStart => Self {
                phase: SessionPhase::Connecting,
                ..Self::default()
            },
            Transition::FetchStart => Self {
                phase: SessionPhase::FetchingPage,
                fetching: true,
                ..self
            },
            Transition::ConnectSuccess => Self {
                fetching: false,
                connected: true,
                ..self
            },
            Transition::FetchSuccess {
                accounts,
                selection,
            } => {
                let Self {
                    connected,
                    accounts: mut cumulative,
                    mut page_handles,
                    pages_fetched,
                    ..
                } = self;
                Arc::make_mut(&mut cumulative).extend(accounts);
                page_handles.insert(pages_fetched, selection);
                Self {
                    phase: SessionPhase::Ready,
                    fetching: false,
                    connected,
                    accounts: cumulative,
                    page_handles,
                    pages_fetched: pages_fetched + 1,
                }
            }
            Transition::Error => Self {
                phase: SessionPhase::Errored,
                fetching: false,
                ..self
            },
        };

        debug_assert!(
            next.pages_contiguous(),
            "page handles out of step with pages_fetched"
        );
        next
    }

    fn pages_contiguous(&self) -> bool {
        self.page_handles.len() == self.pages_fetched
            && self.page_handles.keys().copied().eq(0..self.pages_fetched)
    }

    /// Lifecycle phase
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// True while a follow-up page round trip is in flight
    pub fn is_fetching(&self) -> bool {
        self.fetching
    }

    /// True once the current session's handshake completed
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// True once `connect` has been called, whatever its outcome
    pub fn has_session(&self) -> bool {
        self.phase != SessionPhase::Idle
    }

    /// Accounts fetched so far, in fetch order
    pub fn accounts(&self) -> &Arc<Vec<EnrichedAccount>> {
        &self.accounts
    }

    /// Completed pages, also the index the next page will get
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Indices of pages that can be selected from
    pub fn page_indices(&self) -> Vec<usize> {
        self.page_handles.keys().copied().collect()
    }

    /// Selection capability of `page`
    pub fn selection(&self, page: usize) -> Option<&Arc<SelectionHandle>> {
        self.page_handles.get(&page)
    }

    /// Read-only view for observers
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            fetching: self.fetching,
            connected: self.connected,
            accounts: Arc::clone(&self.accounts),
            pages_fetched: self.pages_fetched,
        }
    }
}

/// Immutable view of a session published to observers
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Lifecycle phase
    pub phase: SessionPhase,
    /// Follow-up page round trip in flight
    pub fetching: bool,
    /// Handshake completed in this session
    pub connected: bool,
    /// Accounts fetched so far
    pub accounts: Arc<Vec<EnrichedAccount>>,
    /// Completed pages
    pub pages_fetched: usize,
}
