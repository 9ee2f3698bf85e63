//! # hw-device
//!
//! Device session contract for discovering accounts on a hardware wallet.
//!
//! A device can only reveal a bounded page of addresses per round trip. This
//! crate describes that round trip:
//!
//! - [`DiscoveryRequest`]: device type, derivation path, page offset and size
//! - [`DeviceSessionAdapter`]: performs the round trip, yielding a [`DevicePage`]
//! - [`SelectionHandle`]: single-use capability to finalize the chosen address
//!
//! ## Features
//!
//! - `simulation` (default): deterministic [`SimulatedDevice`] for testing
//!
//! ## Usage
//!
//! ```ignore
//! use hw_device::{DeviceProfile, DeviceSessionAdapter, DiscoveryRequest};
//! use std::num::NonZeroUsize;
//!
//! let profile = DeviceProfile::trezor();
//! let request = DiscoveryRequest::new(&profile, 0, NonZeroUsize::new(25).unwrap());
//! let page = adapter.request_page(&request).await?;
//! let chosen = page.selection.invoke(&page.addresses[0]).await?;
//! ```

pub mod adapter;
pub mod device;
pub mod error;
pub mod path;
pub mod request;
pub mod selection;

#[cfg(feature = "simulation")]
pub mod simulation;

// Re-exports
pub use adapter::DeviceSessionAdapter;
pub use device::{
    DeviceProfile, DeviceType, LedgerPathKind, LEDGER_LEGACY_PATH, LEDGER_LIVE_PATH, TREZOR_PATH,
};
pub use error::{DeviceError, DeviceResult};
pub use path::{DerivationPath, PathComponent};
pub use request::{DevicePage, DiscoveryRequest};
pub use selection::{SelectedAccount, SelectionFinalizer, SelectionHandle};

#[cfg(feature = "simulation")]
pub use simulation::SimulatedDevice;
