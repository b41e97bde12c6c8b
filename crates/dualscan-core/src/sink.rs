//! Shared per-session emission path for both drivers.
//!
//! Classic and BLE sightings go through the exact same sequence: claim the
//! address, store the record, invoke the caller's callback, publish the
//! typed event. Signaling the coordinator is left to the driver, because
//! batched BLE deliveries signal once per batch rather than once per entry.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{trace, warn};

use dualscan_types::DeviceRecord;

use crate::events::{DiscoveryEvent, EventDispatcher};
use crate::platform::RawSighting;
use crate::registry::DeviceRegistry;
use crate::signal::EventSignal;

/// Optional per-device callback supplied by the caller.
///
/// Treated as untrusted: a panic inside it is caught and logged, never
/// allowed to abort the owning driver.
pub type DeviceCallback = Box<dyn Fn(&DeviceRecord) + Send + Sync>;

/// Which discovery path produced a sighting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Classic inquiry broadcast.
    Classic,
    /// BLE advertisement scan.
    Ble,
}

/// The registry, wakeup signal, event stream, and caller callback of one
/// session, bundled so both drivers share one emission contract.
pub struct SessionSink {
    registry: Arc<DeviceRegistry>,
    signal: Arc<EventSignal>,
    events: EventDispatcher,
    on_device: Option<DeviceCallback>,
}

impl SessionSink {
    /// Bundle the session collaborators.
    pub fn new(
        registry: Arc<DeviceRegistry>,
        signal: Arc<EventSignal>,
        events: EventDispatcher,
        on_device: Option<DeviceCallback>,
    ) -> Self {
        Self {
            registry,
            signal,
            events,
            on_device,
        }
    }

    /// Process one raw sighting. Returns true iff it created a new record.
    ///
    /// Sightings without a resolvable address are dropped. Repeat sightings
    /// of a known address are dropped whole: first seen wins, later names or
    /// signal strengths are not merged in.
    pub fn offer(&self, sighting: RawSighting, origin: Origin) -> bool {
        let Some(address) = sighting.address else {
            trace!(?origin, "sighting without resolvable address, dropped");
            return false;
        };

        if !self.registry.try_add(&address) {
            trace!(%address, ?origin, "duplicate address, dropped");
            return false;
        }

        let mut record = DeviceRecord::new(address);
        record.display_name = sighting.name;
        // Only the BLE path carries a meaningful signal reading.
        if origin == Origin::Ble {
            record.signal_strength = sighting.rssi;
        }

        self.registry.put(record.clone());

        if let Some(cb) = &self.on_device {
            let outcome = catch_unwind(AssertUnwindSafe(|| cb(&record)));
            if outcome.is_err() {
                warn!(address = %record.address, "per-device callback panicked, continuing");
            }
        }

        self.events.send(DiscoveryEvent::Found { record });
        true
    }

    /// Wake the coordinator. Debounced, not counted.
    pub fn notify(&self) {
        self.signal.signal();
    }

    /// Publish a non-fatal scan failure.
    pub fn record_scan_failure(&self, code: i32) {
        self.events.send(DiscoveryEvent::ScanFailed { code });
    }
}

impl std::fmt::Debug for SessionSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSink")
            .field("devices", &self.registry.len())
            .field("has_callback", &self.on_device.is_some())
            .finish()
    }
}
