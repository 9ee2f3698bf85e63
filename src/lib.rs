//! # hw-accounts: paged hardware wallet account discovery
//!
//! Walks the accounts of a Ledger or Trezor device one page at a time, attaches
//! native and governance token balances to every address, and lets the user
//! finalize exactly one account per page on the device.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hw_accounts::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = Settings::load("hw-accounts.toml")?;
//!     init_logging(&settings.logging)?;
//!
//!     let device = Arc::new(SimulatedDevice::new(
//!         settings.discovery.device.device_type,
//!         b"demo seed",
//!     ));
//!     let discovery = settings.discovery_session(device)?;
//!
//!     discovery.connect().await?;
//!     let more = discovery.fetch_more().await?;
//!     let chosen = discovery.pick_account(&more[0].address, 1).await?;
//!     println!("picked {}", chosen.address);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`device`] - device adapter contract, derivation paths, selection handles
//! - [`balance`] - balance backends and the order-preserving enricher
//! - [`session`] - pagination state machine and the [`AccountDiscovery`] facade
//! - [`config`] - one TOML file for all of the above
//! - [`logging`] - `tracing` subscriber setup

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod logging;

pub use hw_balance as balance;
pub use hw_device as device;
pub use hw_session as session;

pub use config::Settings;
pub use hw_session::{AccountDiscovery, SessionError, SessionResult};

/// Common imports for discovery code
pub mod prelude {
    pub use crate::config::Settings;
    pub use crate::logging::{init_logging, LogConfig, LogFormat};

    pub use crate::balance::{BalanceBackend, BalanceSummary, Decimal, EnrichedAccount};
    pub use crate::device::{
        DeviceError, DeviceProfile, DeviceSessionAdapter, DeviceType, LedgerPathKind,
        SelectedAccount,
    };
    pub use crate::session::{
        AccountDiscovery, DiscoveryConfig, SessionError, SessionPhase, SessionSnapshot,
    };

    #[cfg(feature = "simulation")]
    pub use crate::balance::InMemoryBalanceBackend;
    #[cfg(feature = "simulation")]
    pub use crate::device::SimulatedDevice;

    #[cfg(feature = "rpc")]
    pub use crate::balance::JsonRpcBalanceBackend;
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
