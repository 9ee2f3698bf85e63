//! Device session adapter trait definition

use crate::error::DeviceResult;
use crate::request::{DevicePage, DiscoveryRequest};
use async_trait::async_trait;

/// Common interface for hardware wallet transports
///
/// The transport owns everything below the page level: USB/HID framing,
/// firmware app selection, PIN entry and its own timeouts.
#[async_trait]
pub trait DeviceSessionAdapter: Send + Sync {
    /// Perform one round trip and return the requested page.
    ///
    /// Implementations must return at most `request.accounts_length`
    /// addresses, logically starting at `request.accounts_offset`.
    async fn request_page(&self, request: &DiscoveryRequest) -> DeviceResult<DevicePage>;
}
