//! Per-page selection capability
//!
//! A device round trip yields a page of addresses together with a
//! [`SelectionHandle`]. The handle is the only way to tell the device which
//! address of that page the user settled on. It is single-use: once a
//! finalize call succeeds, later invocations fail with
//! [`DeviceError::SelectionAlreadyUsed`]. A finalize call that fails (for
//! example because the user rejected it on the device) leaves the handle open.

use crate::device::DeviceType;
use crate::error::{DeviceError, DeviceResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const OPEN: u8 = 0;
const IN_PROGRESS: u8 = 1;
const USED: u8 = 2;

/// Device-side completion of a page selection, supplied by the adapter
#[async_trait]
pub trait SelectionFinalizer: Send + Sync {
    /// Finalize selection of `address` on the device
    async fn finalize(&self, address: &str) -> DeviceResult<()>;
}

/// Account the user picked, as reported back to the application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedAccount {
    /// Chosen address
    pub address: String,
    /// Device the address lives on
    pub device_type: DeviceType,
}

/// Single-use selection capability for one page
pub struct SelectionHandle {
    device_type: DeviceType,
    addresses: Vec<String>,
    finalizer: Arc<dyn SelectionFinalizer>,
    state: AtomicU8,
    chosen: Mutex<Option<String>>,
}

impl SelectionHandle {
    /// Create a handle for a page of `addresses`
    pub fn new(
        device_type: DeviceType,
        addresses: Vec<String>,
        finalizer: Arc<dyn SelectionFinalizer>,
    ) -> Self {
        Self {
            device_type,
            addresses,
            finalizer,
            state: AtomicU8::new(OPEN),
            chosen: Mutex::new(None),
        }
    }

    /// Device this page came from
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Addresses of the page, in device order
    pub fn addresses(&self) -> &[String] {
        &self.addresses
    }

    /// Whether a selection has been finalized through this handle
    pub fn is_used(&self) -> bool {
        self.state.load(Ordering::Acquire) == USED
    }

    /// Address finalized through this handle, if any
    pub fn chosen(&self) -> Option<String> {
        self.chosen.lock().clone()
    }

    /// Finalize selection of `address`
    ///
    /// Address matching ignores ASCII case; the returned account carries the
    /// address exactly as the device reported it.
    pub async fn invoke(&self, address: &str) -> DeviceResult<SelectedAccount> {
        let canonical = self
            .addresses
            .iter()
            .find(|candidate| candidate.eq_ignore_ascii_case(address))
            .cloned()
            .ok_or_else(|| DeviceError::AddressNotInPage {
                address: address.to_string(),
            })?;

        match self
            .state
            .compare_exchange(OPEN, IN_PROGRESS, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {}
            Err(USED) => {
                let previous = self.chosen().unwrap_or_default();
                return Err(DeviceError::SelectionAlreadyUsed(previous));
            }
            Err(_) => return Err(DeviceError::SelectionInProgress),
        }

        let reset = ReopenOnDrop { state: &self.state };
        self.finalizer.finalize(&canonical).await?;
        reset.disarm();

        *self.chosen.lock() = Some(canonical.clone());
        self.state.store(USED, Ordering::Release);

        tracing::debug!(
            target: "hw::device",
            device = %self.device_type,
            address = %canonical,
            "selection finalized"
        );

        Ok(SelectedAccount {
            address: canonical,
            device_type: self.device_type,
        })
    }
}

impl fmt::Debug for SelectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionHandle")
            .field("device_type", &self.device_type)
            .field("addresses", &self.addresses.len())
            .field("used", &self.is_used())
            .finish()
    }
}

/// Puts the handle back to `OPEN` if finalize fails or is abandoned mid-flight
struct ReopenOnDrop<'a> {
    state: &'a AtomicU8,
}

impl ReopenOnDrop<'_> {
    fn disarm(self) {
        std::mem::forget(self);
    }
}

impl Drop for ReopenOnDrop<'_> {
    fn drop(&mut self) {
        self.state.store(OPEN, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct Flaky {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl SelectionFinalizer for Flaky {
        async fn finalize(&self, _address: &str) -> DeviceResult<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_first && call == 0 {
                return Err(DeviceError::UserRejected);
            }
            Ok(())
        }
    }

    fn handle(fail_first: bool) -> (SelectionHandle, Arc<Flaky>) {
        let finalizer = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            fail_first,
        });
        let handle = SelectionHandle::new(
            DeviceType::Ledger,
            vec!["0xAbC1".to_string(), "0xdef2".to_string()],
            finalizer.clone(),
        );
        (handle, finalizer)
    }

    #[tokio::test]
    async fn second_invoke_fails() {
        let (handle, finalizer) = handle(false);

        let selected = handle.invoke("0xabc1").await.unwrap();
        assert_eq!(selected.address, "0xAbC1");
        assert_eq!(selected.device_type, DeviceType::Ledger);
        assert!(handle.is_used());

        let err = handle.invoke("0xdef2").await.unwrap_err();
        assert_eq!(err, DeviceError::SelectionAlreadyUsed("0xAbC1".to_string()));
        assert_eq!(finalizer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_finalize_leaves_handle_open() {
        let (handle, finalizer) = handle(true);

        assert_eq!(
            handle.invoke("0xdef2").await.unwrap_err(),
            DeviceError::UserRejected
        );
        assert!(!handle.is_used());

        handle.invoke("0xdef2").await.unwrap();
        assert_eq!(handle.chosen().as_deref(), Some("0xdef2"));
        assert_eq!(finalizer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn foreign_address_is_rejected_without_calling_device() {
        let (handle, finalizer) = handle(false);

        let err = handle.invoke("0x9999").await.unwrap_err();
        assert!(matches!(err, DeviceError::AddressNotInPage { .. }));
        assert_eq!(finalizer.calls.load(Ordering::SeqCst), 0);
    }
}
