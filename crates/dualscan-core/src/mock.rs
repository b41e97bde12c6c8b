//! Mock platform implementations for testing.
//!
//! The coordinator only ever sees the traits in [`crate::platform`], so
//! these mocks make the whole discovery pipeline testable without radio
//! hardware.
//!
//! # Features
//!
//! - **Failure injection**: decline inquiry starts, fail receiver
//!   registration or scan starts, fail permission checks
//! - **Event emitters**: push classic, single-BLE, batched-BLE, and
//!   scan-failed notifications from test code
//! - **Operation counters**: assert how often each platform call ran,
//!   which is how the exactly-once teardown properties are checked

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use uuid::Uuid;

use dualscan_types::{Permission, PlatformTier};

use crate::error::{Error, Result};
use crate::platform::{
    BleScanEvent, BleScanner, DeviceStream, InquiryAdapter, InquiryEvent, InquiryFilter,
    InquirySubscription, PermissionOracle, RawSighting, StreamTransport,
};

fn lock<'a, T>(mutex: &'a Mutex<T>) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A mock radio implementing both the inquiry adapter and the BLE scanner.
#[derive(Debug, Default)]
pub struct MockRadio {
    unavailable: AtomicBool,
    disabled: AtomicBool,
    inquiry_active: AtomicBool,
    decline_inquiry: AtomicBool,
    fail_subscribe: AtomicBool,
    fail_start_scan: AtomicBool,

    next_subscription: AtomicU64,
    subscribers: Mutex<HashMap<u64, (InquiryFilter, mpsc::UnboundedSender<InquiryEvent>)>>,
    ble_tx: Mutex<Option<mpsc::UnboundedSender<BleScanEvent>>>,

    subscribe_calls: AtomicU32,
    unsubscribe_calls: AtomicU32,
    start_inquiry_calls: AtomicU32,
    cancel_inquiry_calls: AtomicU32,
    start_scan_calls: AtomicU32,
    stop_scan_calls: AtomicU32,
}

impl MockRadio {
    /// Create an available, enabled radio.
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate a random MAC-style address for test devices.
    pub fn random_address() -> String {
        let bytes: [u8; 6] = rand::random();
        bytes
            .iter()
            .map(|b| format!("{:02X}", b))
            .collect::<Vec<_>>()
            .join(":")
    }

    // --- Injection toggles ---

    /// Make the adapter report as absent.
    pub fn set_unavailable(&self) {
        self.unavailable.store(true, Ordering::SeqCst);
    }

    /// Make the adapter report as switched off.
    pub fn set_disabled(&self) {
        self.disabled.store(true, Ordering::SeqCst);
    }

    /// Make `start_inquiry` return `Ok(false)`.
    pub fn decline_inquiry(&self) {
        self.decline_inquiry.store(true, Ordering::SeqCst);
    }

    /// Make `subscribe` fail.
    pub fn fail_subscribe(&self) {
        self.fail_subscribe.store(true, Ordering::SeqCst);
    }

    /// Make `start_scan` fail.
    pub fn fail_start_scan(&self) {
        self.fail_start_scan.store(true, Ordering::SeqCst);
    }

    // --- Event emitters ---

    /// Deliver a classic found-device notification to all subscribers.
    pub fn emit_classic_found(&self, sighting: RawSighting) {
        for (filter, tx) in lock(&self.subscribers).values() {
            if filter.device_found {
                let _ = tx.send(InquiryEvent::DeviceFound(sighting.clone()));
            }
        }
    }

    /// Deliver the classic discovery-finished notification.
    pub fn emit_classic_finished(&self) {
        for (filter, tx) in lock(&self.subscribers).values() {
            if filter.finished {
                let _ = tx.send(InquiryEvent::Finished);
            }
        }
    }

    /// Deliver a single BLE result.
    pub fn emit_ble_result(&self, sighting: RawSighting) {
        if let Some(tx) = lock(&self.ble_tx).as_ref() {
            let _ = tx.send(BleScanEvent::Result(sighting));
        }
    }

    /// Deliver a batched BLE result.
    pub fn emit_ble_batch(&self, sightings: Vec<RawSighting>) {
        if let Some(tx) = lock(&self.ble_tx).as_ref() {
            let _ = tx.send(BleScanEvent::Batch(sightings));
        }
    }

    /// Deliver an asynchronous BLE scan failure.
    pub fn emit_scan_failed(&self, code: i32) {
        if let Some(tx) = lock(&self.ble_tx).as_ref() {
            let _ = tx.send(BleScanEvent::Failed { code });
        }
    }

    // --- Counters ---

    /// Number of `subscribe` calls.
    pub fn subscribe_calls(&self) -> u32 {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    /// Number of `unsubscribe` calls.
    pub fn unsubscribe_calls(&self) -> u32 {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }

    /// Number of `start_inquiry` calls.
    pub fn start_inquiry_calls(&self) -> u32 {
        self.start_inquiry_calls.load(Ordering::SeqCst)
    }

    /// Number of `cancel_inquiry` calls.
    pub fn cancel_inquiry_calls(&self) -> u32 {
        self.cancel_inquiry_calls.load(Ordering::SeqCst)
    }

    /// Number of `start_scan` calls.
    pub fn start_scan_calls(&self) -> u32 {
        self.start_scan_calls.load(Ordering::SeqCst)
    }

    /// Number of `stop_scan` calls.
    pub fn stop_scan_calls(&self) -> u32 {
        self.stop_scan_calls.load(Ordering::SeqCst)
    }

    /// Number of live subscriptions.
    pub fn active_subscriptions(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

#[async_trait]
impl InquiryAdapter for MockRadio {
    async fn is_available(&self) -> bool {
        !self.unavailable.load(Ordering::SeqCst)
    }

    async fn is_enabled(&self) -> bool {
        !self.disabled.load(Ordering::SeqCst)
    }

    async fn subscribe(&self, filter: InquiryFilter) -> Result<InquirySubscription> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_subscribe.load(Ordering::SeqCst) {
            return Err(Error::subscribe_failed("injected subscribe failure"));
        }

        let id = self.next_subscription.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        lock(&self.subscribers).insert(id, (filter, tx));
        Ok(InquirySubscription { id, events: rx })
    }

    async fn unsubscribe(&self, id: u64) -> Result<()> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        match lock(&self.subscribers).remove(&id) {
            Some(_) => Ok(()),
            None => Err(Error::NotSubscribed { id }),
        }
    }

    async fn start_inquiry(&self) -> Result<bool> {
        self.start_inquiry_calls.fetch_add(1, Ordering::SeqCst);
        if self.decline_inquiry.load(Ordering::SeqCst) {
            return Ok(false);
        }
        self.inquiry_active.store(true, Ordering::SeqCst);
        Ok(true)
    }

    async fn cancel_inquiry(&self) -> Result<()> {
        self.cancel_inquiry_calls.fetch_add(1, Ordering::SeqCst);
        self.inquiry_active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn is_inquiry_active(&self) -> bool {
        self.inquiry_active.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BleScanner for MockRadio {
    async fn start_scan(&self) -> Result<mpsc::UnboundedReceiver<BleScanEvent>> {
        self.start_scan_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start_scan.load(Ordering::SeqCst) {
            return Err(Error::scan_start_failed("injected scan start failure"));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *lock(&self.ble_tx) = Some(tx);
        Ok(rx)
    }

    async fn stop_scan(&self) -> Result<()> {
        self.stop_scan_calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.ble_tx).take();
        Ok(())
    }
}

/// A mock permission oracle with a mutable granted set.
#[derive(Debug)]
pub struct MockPermissions {
    tier: PlatformTier,
    granted: Mutex<HashSet<Permission>>,
    fail_checks: AtomicBool,
}

impl MockPermissions {
    /// Create an oracle with nothing granted.
    pub fn new(tier: PlatformTier) -> Self {
        Self {
            tier,
            granted: Mutex::new(HashSet::new()),
            fail_checks: AtomicBool::new(false),
        }
    }

    /// Create a modern-tier oracle with scan and connect granted.
    pub fn fully_granted() -> Self {
        let oracle = Self::new(PlatformTier::Modern);
        oracle.grant(Permission::Scan);
        oracle.grant(Permission::Connect);
        oracle
    }

    /// Grant a permission.
    pub fn grant(&self, permission: Permission) {
        lock(&self.granted).insert(permission);
    }

    /// Revoke a permission.
    pub fn revoke(&self, permission: Permission) {
        lock(&self.granted).remove(&permission);
    }

    /// Make every check fail instead of answering.
    pub fn fail_checks(&self) {
        self.fail_checks.store(true, Ordering::SeqCst);
    }
}

impl PermissionOracle for MockPermissions {
    fn tier(&self) -> PlatformTier {
        self.tier
    }

    fn is_granted(&self, permission: Permission) -> Result<bool> {
        if self.fail_checks.load(Ordering::SeqCst) {
            return Err(Error::subscribe_failed("injected permission check failure"));
        }
        Ok(lock(&self.granted).contains(&permission))
    }
}

/// A mock stream transport backed by in-memory duplex pipes.
#[derive(Debug, Default)]
pub struct MockTransport {
    fail_open: AtomicBool,
    open_calls: AtomicU32,
    last_address: Mutex<Option<String>>,
    last_service: Mutex<Option<Uuid>>,
    /// Peer halves kept alive so opened streams stay usable.
    peers: Mutex<Vec<DuplexStream>>,
}

impl MockTransport {
    /// Create a transport that succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every open fail with a refused connection.
    pub fn fail_open(&self) {
        self.fail_open.store(true, Ordering::SeqCst);
    }

    /// Number of `open` calls.
    pub fn open_calls(&self) -> u32 {
        self.open_calls.load(Ordering::SeqCst)
    }

    /// The address of the most recent open attempt.
    pub fn last_address(&self) -> Option<String> {
        lock(&self.last_address).clone()
    }

    /// The service UUID of the most recent open attempt.
    pub fn last_service(&self) -> Option<Uuid> {
        *lock(&self.last_service)
    }
}

#[async_trait]
impl StreamTransport for MockTransport {
    async fn open(&self, address: &str, service: Uuid) -> Result<Box<dyn DeviceStream>> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        *lock(&self.last_address) = Some(address.to_string());
        *lock(&self.last_service) = Some(service);

        if self.fail_open.load(Ordering::SeqCst) {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "injected open failure",
            )));
        }

        let (local, peer) = tokio::io::duplex(64);
        lock(&self.peers).push(peer);
        Ok(Box::new(local))
    }
}
