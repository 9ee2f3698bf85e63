//! Deterministic in-process device

use crate::adapter::DeviceSessionAdapter;
use crate::device::DeviceType;
use crate::error::{DeviceError, DeviceResult};
use crate::path::DerivationPath;
use crate::request::{DevicePage, DiscoveryRequest};
use crate::selection::SelectionFinalizer;
use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Number of accounts a simulated device exposes unless told otherwise
pub const DEFAULT_SIMULATED_ACCOUNTS: usize = 100;

#[derive(Default)]
struct Shared {
    selections: Mutex<Vec<String>>,
    reject_selections: AtomicBool,
}

/// Simulated hardware wallet
///
/// Addresses are derived from `sha256(seed || path || index)` so the same seed
/// always yields the same accounts.
pub struct SimulatedDevice {
    device_type: DeviceType,
    seed: Vec<u8>,
    total_accounts: usize,
    latency: Option<Duration>,
    pending_failures: Mutex<VecDeque<DeviceError>>,
    requests: Mutex<Vec<DiscoveryRequest>>,
    shared: Arc<Shared>,
}

impl SimulatedDevice {
    /// Create a simulated device of the given kind
    pub fn new(device_type: DeviceType, seed: impl AsRef<[u8]>) -> Self {
        Self {
            device_type,
            seed: seed.as_ref().to_vec(),
            total_accounts: DEFAULT_SIMULATED_ACCOUNTS,
            latency: None,
            pending_failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            shared: Arc::new(Shared::default()),
        }
    }

    /// Limit how many accounts the device can reveal
    pub fn with_total_accounts(mut self, total: usize) -> Self {
        self.total_accounts = total;
        self
    }

    /// Delay every round trip by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make the next round trip fail with `error`
    pub fn fail_next(&self, error: DeviceError) {
        self.pending_failures.lock().push_back(error);
    }

    /// Make finalize calls fail as if the user declined on the device
    pub fn reject_selections(&self, reject: bool) {
        self.shared.reject_selections.store(reject, Ordering::SeqCst);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<DiscoveryRequest> {
        self.requests.lock().clone()
    }

    /// Addresses finalized so far
    pub fn selections(&self) -> Vec<String> {
        self.shared.selections.lock().clone()
    }

    /// Address at absolute `index` under `path`
    pub fn address_at(&self, path: &DerivationPath, index: usize) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.seed);
        hasher.update(path.to_string().as_bytes());
        hasher.update((index as u64).to_be_bytes());
        let digest = hasher.finalize();
        format!("0x{}", hex::encode(&digest[..20]))
    }
}

#[async_trait]
impl DeviceSessionAdapter for SimulatedDevice {
    async fn request_page(&self, request: &DiscoveryRequest) -> DeviceResult<DevicePage> {
        self.requests.lock().push(request.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if let Some(error) = self.pending_failures.lock().pop_front() {
            return Err(error);
        }

        if request.device_type != self.device_type {
            return Err(DeviceError::DeviceNotFound(format!(
                "requested a {} but a {} is connected",
                request.device_type, self.device_type
            )));
        }

        let start = request.accounts_offset.min(self.total_accounts);
        let end = request.end().min(self.total_accounts);
        let addresses = (start..end)
            .map(|index| self.address_at(&request.derivation_path, index))
            .collect::<Vec<_>>();

        tracing::debug!(
            target: "hw::device",
            offset = request.accounts_offset,
            length = request.accounts_length.get(),
            returned = addresses.len(),
            "simulated page served"
        );

        let finalizer = Arc::new(SimulatedFinalizer {
            shared: self.shared.clone(),
        });
        Ok(DevicePage::new(self.device_type, addresses, finalizer))
    }
}

struct SimulatedFinalizer {
    shared: Arc<Shared>,
}

#[async_trait]
impl SelectionFinalizer for SimulatedFinalizer {
    async fn finalize(&self, address: &str) -> DeviceResult<()> {
        if self.shared.reject_selections.load(Ordering::SeqCst) {
            return Err(DeviceError::UserRejected);
        }
        self.shared.selections.lock().push(address.to_string());
        Ok(())
    }
}
