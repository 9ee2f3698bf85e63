//! Discovery request and page types

use crate::device::{DeviceProfile, DeviceType};
use crate::path::DerivationPath;
use crate::selection::{SelectionFinalizer, SelectionHandle};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::sync::Arc;

/// One page request sent to the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryRequest {
    /// Device kind
    pub device_type: DeviceType,

    /// Derivation path root
    pub derivation_path: DerivationPath,

    /// Absolute index of the first address in the page
    pub accounts_offset: usize,

    /// Maximum number of addresses in the page
    pub accounts_length: NonZeroUsize,
}

impl DiscoveryRequest {
    /// Build a request for `profile`
    pub fn new(
        profile: &DeviceProfile,
        accounts_offset: usize,
        accounts_length: NonZeroUsize,
    ) -> Self {
        Self {
            device_type: profile.device_type,
            derivation_path: profile.path.clone(),
            accounts_offset,
            accounts_length,
        }
    }

    /// Exclusive end of the requested address range
    pub fn end(&self) -> usize {
        self.accounts_offset.saturating_add(self.accounts_length.get())
    }
}

/// Result of a completed round trip: the page's addresses and its selection handle
#[derive(Debug)]
pub struct DevicePage {
    /// Addresses in device order
    pub addresses: Vec<String>,

    /// Selection capability for this page
    pub selection: SelectionHandle,
}

impl DevicePage {
    /// Build a page and its handle from the same address list
    pub fn new(
        device_type: DeviceType,
        addresses: Vec<String>,
        finalizer: Arc<dyn SelectionFinalizer>,
    ) -> Self {
        let selection = SelectionHandle::new(device_type, addresses.clone(), finalizer);
        Self {
            addresses,
            selection,
        }
    }

    /// Number of addresses in the page
    pub fn len(&self) -> usize {
        self.addresses.len()
    }

    /// Whether the device returned no addresses
    pub fn is_empty(&self) -> bool {
        self.addresses.is_empty()
    }
}
