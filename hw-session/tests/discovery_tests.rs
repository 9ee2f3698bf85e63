use async_trait::async_trait;
use hw_balance::{BalanceSummary, Decimal, InMemoryBalanceBackend};
use hw_device::{
    DeviceError, DevicePage, DeviceProfile, DeviceResult, DeviceSessionAdapter, DeviceType,
    DiscoveryRequest, SelectionFinalizer, SimulatedDevice,
};
use hw_session::{AccountDiscovery, DiscoveryConfig, SessionError, SessionPhase};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

/// Serves a fixed list of pages regardless of the requested range
#[derive(Default)]
struct ScriptedDevice {
    pages: Mutex<VecDeque<Vec<String>>>,
    requests: Mutex<Vec<DiscoveryRequest>>,
    picks: Arc<Mutex<Vec<String>>>,
}

impl ScriptedDevice {
    fn new(pages: &[&[&str]]) -> Self {
        let pages = pages
            .iter()
            .map(|page| page.iter().map(|a| a.to_string()).collect())
            .collect();
        Self {
            pages: Mutex::new(pages),
            ..Self::default()
        }
    }

    fn requests(&self) -> Vec<DiscoveryRequest> {
        self.requests.lock().clone()
    }
}

struct RecordingFinalizer(Arc<Mutex<Vec<String>>>);

#[async_trait]
impl SelectionFinalizer for RecordingFinalizer {
    async fn finalize(&self, address: &str) -> DeviceResult<()> {
        self.0.lock().push(address.to_string());
        Ok(())
    }
}

#[async_trait]
impl DeviceSessionAdapter for ScriptedDevice {
    async fn request_page(&self, request: &DiscoveryRequest) -> DeviceResult<DevicePage> {
        self.requests.lock().push(request.clone());
        let addresses = self
            .pages
            .lock()
            .pop_front()
            .ok_or_else(|| DeviceError::Disconnected("script exhausted".to_string()))?;
        let finalizer = Arc::new(RecordingFinalizer(self.picks.clone()));
        Ok(DevicePage::new(request.device_type, addresses, finalizer))
    }
}

fn trezor_config(page_size: usize) -> DiscoveryConfig {
    DiscoveryConfig::new(DeviceProfile::trezor()).with_accounts_length(page_size)
}

fn simulated(latency: Option<Duration>) -> Arc<SimulatedDevice> {
    let device = SimulatedDevice::new(DeviceType::Trezor, b"discovery");
    Arc::new(match latency {
        Some(latency) => device.with_latency(latency),
        None => device,
    })
}

fn addresses(discovery: &AccountDiscovery) -> Vec<String> {
    discovery
        .accounts()
        .iter()
        .map(|account| account.address.clone())
        .collect()
}

#[tokio::test]
async fn connect_then_fetch_more_walks_the_device_in_pages() {
    let device = Arc::new(ScriptedDevice::new(&[&["0xA", "0xB"], &["0xC"]]));
    let backend = Arc::new(InMemoryBalanceBackend::new());
    backend.insert(
        "0xC",
        BalanceSummary::new(Decimal::new(15, 1), Decimal::new(3, 0)),
    );
    let discovery = AccountDiscovery::new(trezor_config(2), device.clone(), backend).unwrap();

    discovery.connect().await.unwrap();
    assert_eq!(addresses(&discovery), ["0xA", "0xB"]);
    assert_eq!(discovery.phase(), SessionPhase::Ready);
    assert!(!discovery.is_fetching());

    let added = discovery.fetch_more().await.unwrap();
    assert_eq!(added.len(), 1);
    assert_eq!(added[0].address, "0xC");
    assert_eq!(added[0].balances.native, Decimal::new(15, 1));
    assert_eq!(addresses(&discovery), ["0xA", "0xB", "0xC"]);
    assert_eq!(discovery.machine().page_indices(), vec![0, 1]);

    let requests = device.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].accounts_offset, 0);
    assert_eq!(requests[1].accounts_offset, 2);
    assert!(requests.iter().all(|r| r.accounts_length.get() == 2));
    assert_eq!(requests[1].derivation_path.to_string(), "44'/60'/0'/0/0");
}

#[tokio::test]
async fn earlier_accounts_never_change_across_fetches() {
    let device = simulated(None);
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery = AccountDiscovery::new(trezor_config(3), device.clone(), backend).unwrap();

    discovery.connect().await.unwrap();
    let mut previous = addresses(&discovery);
    for page in 1..4 {
        let added = discovery.fetch_more().await.unwrap();
        let current = addresses(&discovery);
        assert_eq!(current.len(), previous.len() + added.len());
        assert_eq!(&current[..previous.len()], &previous[..]);
        assert_eq!(discovery.pages_fetched(), page + 1);
        previous = current;
    }

    let profile = DeviceProfile::trezor();
    for (index, address) in previous.iter().enumerate() {
        assert_eq!(address, &device.address_at(&profile.path, index));
    }
}

#[tokio::test]
async fn fetch_more_requires_a_connected_session() {
    let device = simulated(None);
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery = AccountDiscovery::new(trezor_config(3), device.clone(), backend).unwrap();

    let err = discovery.fetch_more().await.unwrap_err();
    assert!(matches!(err, SessionError::NotConnected));
    assert!(device.requests().is_empty());
    assert_eq!(discovery.phase(), SessionPhase::Idle);
}

#[tokio::test(start_paused = true)]
async fn reconnect_discards_previous_session_before_the_device_answers() {
    let device = simulated(Some(Duration::from_millis(500)));
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery = AccountDiscovery::new(trezor_config(3), device, backend).unwrap();

    discovery.connect().await.unwrap();
    discovery.fetch_more().await.unwrap();
    assert_eq!(discovery.accounts().len(), 6);

    let mut updates = discovery.subscribe();
    let reconnect = tokio::spawn({
        let discovery = discovery.clone();
        async move { discovery.connect().await }
    });
    updates
        .wait_for(|snapshot| snapshot.phase == SessionPhase::Connecting)
        .await
        .unwrap();

    assert!(discovery.accounts().is_empty());
    assert!(discovery.machine().page_indices().is_empty());
    assert_eq!(discovery.pages_fetched(), 0);
    let err = discovery.pick_account("0x00", 1).await.unwrap_err();
    assert!(matches!(err, SessionError::UnknownPage { page: 1, .. }));

    reconnect.await.unwrap().unwrap();
    assert_eq!(discovery.accounts().len(), 3);
    assert_eq!(discovery.machine().page_indices(), vec![0]);
}

#[tokio::test]
async fn failed_enrichment_leaves_the_session_untouched() {
    let device = simulated(None);
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery =
        AccountDiscovery::new(trezor_config(3), device.clone(), backend.clone()).unwrap();
    discovery.connect().await.unwrap();
    let before = discovery.snapshot();

    let profile = DeviceProfile::trezor();
    let failing = device.address_at(&profile.path, 4);
    backend.fail_for(&failing);

    let err = discovery.fetch_more().await.unwrap_err();
    assert!(matches!(err, SessionError::Balance(_)));
    assert!(err.is_retryable());
    assert!(!discovery.is_fetching());
    assert_eq!(discovery.phase(), SessionPhase::Errored);
    assert!(Arc::ptr_eq(&discovery.accounts(), &before.accounts));
    assert_eq!(discovery.pages_fetched(), 1);
    assert_eq!(discovery.machine().page_indices(), vec![0]);

    backend.recover(&failing);
    let added = discovery.fetch_more().await.unwrap();
    assert_eq!(added[1].address, failing);
    assert_eq!(discovery.pages_fetched(), 2);
    let offsets: Vec<_> = device.requests().iter().map(|r| r.accounts_offset).collect();
    assert_eq!(offsets, [0, 3, 3]);
}

#[tokio::test]
async fn fetch_more_after_failed_connect_registers_page_zero() {
    let device = simulated(None);
    device.fail_next(DeviceError::Disconnected("usb unplugged".to_string()));
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery = AccountDiscovery::new(trezor_config(3), device.clone(), backend).unwrap();

    let err = discovery.connect().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Device(DeviceError::Disconnected(_))
    ));
    assert_eq!(discovery.phase(), SessionPhase::Errored);
    assert!(discovery.accounts().is_empty());
    assert!(!discovery.is_fetching());

    let added = discovery.fetch_more().await.unwrap();
    assert_eq!(added.len(), 3);
    assert_eq!(discovery.phase(), SessionPhase::Ready);
    assert_eq!(discovery.machine().page_indices(), vec![0]);
    assert_eq!(discovery.pages_fetched(), 1);

    let profile = DeviceProfile::trezor();
    assert_eq!(added[0].address, device.address_at(&profile.path, 0));
    let offsets: Vec<_> = device.requests().iter().map(|r| r.accounts_offset).collect();
    assert_eq!(offsets, [0, 0]);

    discovery.pick_account(&added[1].address, 0).await.unwrap();
    assert_eq!(device.selections(), [added[1].address.clone()]);
}

#[tokio::test]
async fn pick_account_uses_the_handle_of_the_requested_page() {
    let device = Arc::new(ScriptedDevice::new(&[&["0xA", "0xB"], &["0xC", "0xD"]]));
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery = AccountDiscovery::new(trezor_config(2), device.clone(), backend).unwrap();
    discovery.connect().await.unwrap();
    discovery.fetch_more().await.unwrap();

    let selected = discovery.pick_account("0xc", 1).await.unwrap();
    assert_eq!(selected.address, "0xC");
    assert_eq!(selected.device_type, DeviceType::Trezor);

    let err = discovery.pick_account("0xA", 1).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Device(DeviceError::AddressNotInPage { .. })
    ));

    discovery.pick_account("0xB", 0).await.unwrap();
    let err = discovery.pick_account("0xA", 0).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Device(DeviceError::SelectionAlreadyUsed(ref previous)) if previous == "0xB"
    ));

    let err = discovery.pick_account("0xA", 2).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::UnknownPage {
            page: 2,
            pages_fetched: 2
        }
    ));
    assert_eq!(*device.picks.lock(), ["0xC", "0xB"]);
}

#[tokio::test]
async fn listener_hears_only_finalized_picks() {
    let device = simulated(None);
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let chosen = Arc::new(Mutex::new(Vec::new()));
    let discovery = AccountDiscovery::builder()
        .config(trezor_config(3))
        .adapter(device.clone())
        .backend(backend)
        .on_account_chosen({
            let chosen = chosen.clone();
            move |account| chosen.lock().push(account.address.clone())
        })
        .build()
        .unwrap();
    discovery.connect().await.unwrap();
    let target = discovery.accounts()[1].address.clone();

    device.reject_selections(true);
    let err = discovery.pick_account(&target, 0).await.unwrap_err();
    assert!(matches!(err, SessionError::Device(DeviceError::UserRejected)));
    assert!(chosen.lock().is_empty());

    device.reject_selections(false);
    discovery.pick_account(&target, 0).await.unwrap();
    assert_eq!(*chosen.lock(), [target.clone()]);
    assert_eq!(device.selections(), [target]);
}

#[tokio::test]
async fn oversized_page_is_a_protocol_error() {
    let device = Arc::new(ScriptedDevice::new(&[&["0xA", "0xB", "0xC"]]));
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery = AccountDiscovery::new(trezor_config(2), device, backend.clone()).unwrap();

    let err = discovery.connect().await.unwrap_err();
    assert!(matches!(err, SessionError::Device(DeviceError::Protocol(_))));
    assert!(discovery.accounts().is_empty());
    assert_eq!(backend.lookups(), 0);
}

#[tokio::test]
async fn empty_page_is_still_registered() {
    let device = Arc::new(ScriptedDevice::new(&[&["0xA"], &[]]));
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery = AccountDiscovery::new(trezor_config(2), device, backend).unwrap();

    discovery.connect().await.unwrap();
    let added = discovery.fetch_more().await.unwrap();
    assert!(added.is_empty());
    assert_eq!(discovery.machine().page_indices(), vec![0, 1]);
    assert_eq!(discovery.accounts().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn overlapping_requests_are_rejected() {
    let device = simulated(Some(Duration::from_millis(200)));
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery = AccountDiscovery::new(trezor_config(3), device.clone(), backend).unwrap();
    discovery.connect().await.unwrap();

    let mut updates = discovery.subscribe();
    let pending = tokio::spawn({
        let discovery = discovery.clone();
        async move { discovery.fetch_more().await }
    });
    updates.wait_for(|snapshot| snapshot.fetching).await.unwrap();
    assert!(discovery.is_fetching());
    assert_eq!(discovery.phase(), SessionPhase::FetchingPage);

    assert!(matches!(
        discovery.fetch_more().await,
        Err(SessionError::Busy)
    ));
    assert!(matches!(discovery.connect().await, Err(SessionError::Busy)));

    let added = pending.await.unwrap().unwrap();
    assert_eq!(added.len(), 3);
    assert_eq!(device.requests().len(), 2);
    assert!(!discovery.is_fetching());
}

#[tokio::test(start_paused = true)]
async fn cancel_aborts_the_round_trip_and_clears_fetching() {
    let device = simulated(Some(Duration::from_secs(60)));
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery = AccountDiscovery::new(trezor_config(3), device.clone(), backend).unwrap();
    discovery.connect().await.unwrap();

    let mut updates = discovery.subscribe();
    let pending = tokio::spawn({
        let discovery = discovery.clone();
        async move { discovery.fetch_more().await }
    });
    updates.wait_for(|snapshot| snapshot.fetching).await.unwrap();

    discovery.cancel();
    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::Cancelled));
    assert!(!discovery.is_fetching());
    assert_eq!(discovery.accounts().len(), 3);
    assert_eq!(discovery.pages_fetched(), 1);

    let added = discovery.fetch_more().await.unwrap();
    assert_eq!(added.len(), 3);
    let offsets: Vec<_> = device.requests().iter().map(|r| r.accounts_offset).collect();
    assert_eq!(offsets, [0, 3, 3]);
}

#[tokio::test(start_paused = true)]
async fn slow_device_times_out() {
    let device = simulated(Some(Duration::from_secs(5)));
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let config = trezor_config(3).with_device_timeout(Duration::from_millis(250));
    let discovery = AccountDiscovery::new(config, device, backend).unwrap();

    let err = discovery.connect().await.unwrap_err();
    assert!(matches!(err, SessionError::Device(DeviceError::Timeout(_))));
    assert!(err.is_retryable());
    assert_eq!(discovery.phase(), SessionPhase::Errored);
    assert!(!discovery.is_fetching());
}

#[tokio::test(start_paused = true)]
async fn dropped_fetch_clears_fetching() {
    let device = simulated(Some(Duration::from_secs(60)));
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery = AccountDiscovery::new(trezor_config(3), device, backend).unwrap();
    discovery.connect().await.unwrap();

    let fetch = discovery.fetch_more();
    let timed_out = tokio::time::timeout(Duration::from_millis(10), fetch).await;
    assert!(timed_out.is_err());
    assert!(!discovery.is_fetching());
    assert_eq!(discovery.phase(), SessionPhase::Errored);
    assert_eq!(discovery.accounts().len(), 3);
}

#[tokio::test]
async fn subscribers_see_every_committed_page() {
    let device = simulated(None);
    let backend = Arc::new(InMemoryBalanceBackend::new());
    let discovery = AccountDiscovery::new(trezor_config(4), device, backend).unwrap();
    let updates = discovery.subscribe();
    assert_eq!(updates.borrow().phase, SessionPhase::Idle);

    discovery.connect().await.unwrap();
    {
        let snapshot = updates.borrow();
        assert!(snapshot.connected);
        assert!(!snapshot.fetching);
        assert_eq!(snapshot.accounts.len(), 4);
        assert_eq!(snapshot.pages_fetched, 1);
    }

    discovery.fetch_more().await.unwrap();
    assert_eq!(updates.borrow().accounts.len(), 8);
    assert_eq!(updates.borrow().phase, SessionPhase::Ready);
}

#[tokio::test]
async fn builder_requires_adapter_and_backend() {
    let err = AccountDiscovery::builder()
        .backend(Arc::new(InMemoryBalanceBackend::new()))
        .build()
        .unwrap_err();
    assert!(matches!(err, SessionError::Config(_)));

    let err = AccountDiscovery::builder()
        .adapter(simulated(None))
        .build()
        .unwrap_err();
    assert!(matches!(err, SessionError::Config(_)));

    let err = AccountDiscovery::new(
        trezor_config(0),
        simulated(None),
        Arc::new(InMemoryBalanceBackend::new()),
    )
    .unwrap_err();
    assert!(matches!(err, SessionError::Config(_)));
}
