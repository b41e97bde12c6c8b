//! BLE advertisement-scan driver.
//!
//! Same emission contract as the classic driver, with two extra notification
//! shapes: batched results (processed entry by entry, one wakeup per batch)
//! and asynchronous scan failures (recorded, never fatal).

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::platform::{BleScanEvent, BleScanner};
use crate::sink::{Origin, SessionSink};

/// Driver for the BLE discovery path of one session.
pub struct BleDriver {
    scanner: Arc<dyn BleScanner>,
    sink: Arc<SessionSink>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl BleDriver {
    /// Create a driver bound to a session sink.
    pub fn new(scanner: Arc<dyn BleScanner>, sink: Arc<SessionSink>) -> Self {
        Self {
            scanner,
            sink,
            pump: Mutex::new(None),
        }
    }

    fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start the advertisement scan and pump its events.
    ///
    /// Returns true iff the scan started. Failure is logged and leaves the
    /// BLE path inert.
    pub async fn start(&self) -> bool {
        match self.scanner.start_scan().await {
            Ok(events) => {
                self.spawn_pump(events);
                debug!("BLE scan started");
                true
            }
            Err(e) => {
                warn!(error = %e, "BLE scan start failed, proceeding without BLE results");
                false
            }
        }
    }

    fn spawn_pump(&self, mut events: mpsc::UnboundedReceiver<BleScanEvent>) {
        let sink = Arc::clone(&self.sink);
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    BleScanEvent::Result(sighting) => {
                        if sink.offer(sighting, Origin::Ble) {
                            sink.notify();
                        }
                    }
                    BleScanEvent::Batch(sightings) => {
                        let mut added = false;
                        for sighting in sightings {
                            added |= sink.offer(sighting, Origin::Ble);
                        }
                        // One wakeup per batch: the signal is a debounced
                        // wakeup, not a counted event.
                        if added {
                            sink.notify();
                        }
                    }
                    BleScanEvent::Failed { code } => {
                        warn!(code, "BLE scan reported failure, discovery continues");
                        sink.record_scan_failure(code);
                    }
                }
            }
        });
        *Self::lock(&self.pump) = Some(handle);
    }

    /// Stop the scan and the pump. Idempotent, best-effort.
    pub async fn stop(&self) {
        if let Err(e) = self.scanner.stop_scan().await {
            warn!(error = %e, "BLE scan stop failed");
        }
        if let Some(handle) = Self::lock(&self.pump).take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for BleDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BleDriver")
            .field("running", &Self::lock(&self.pump).is_some())
            .finish()
    }
}
