//! # hw-session
//!
//! Paged account discovery sessions on top of [`hw_device`] and [`hw_balance`].
//!
//! A session starts with [`AccountDiscovery::connect`], which resets all state
//! and loads page 0. [`AccountDiscovery::fetch_more`] loads the next page at
//! `offset = accounts().len()`. Every page's addresses are enriched with
//! balances before they become visible, and every page keeps its own
//! selection handle so [`AccountDiscovery::pick_account`] can finalize an
//! address from any page fetched so far.
//!
//! ## Usage
//!
//! ```ignore
//! use hw_session::{AccountDiscovery, DiscoveryConfig};
//!
//! let discovery = AccountDiscovery::builder()
//!     .config(DiscoveryConfig::new(DeviceProfile::trezor()))
//!     .adapter(device)
//!     .backend(balances)
//!     .build()?;
//!
//! discovery.connect().await?;
//! let next = discovery.fetch_more().await?;
//! let chosen = discovery.pick_account(&next[0].address, 1).await?;
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod machine;
pub mod state;

// Re-exports
pub use config::{ConfigError, DiscoveryConfig, DEFAULT_ACCOUNTS_LENGTH};
pub use error::{SessionError, SessionResult};
pub use facade::{AccountChosenListener, AccountDiscovery, AccountDiscoveryBuilder};
pub use machine::DiscoveryMachine;
pub use state::{SessionPhase, SessionSnapshot, SessionState, Transition};
