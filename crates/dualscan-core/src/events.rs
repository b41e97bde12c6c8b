//! Typed discovery notifications.
//!
//! Alongside the optional per-device callback, every discovery carries a
//! broadcast stream of typed events. The event holds the full
//! [`DeviceRecord`]; callers that only want a name project it out.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use dualscan_types::DeviceRecord;

/// Events emitted over the lifetime of a discovery session.
///
/// All events are serializable for logging and IPC.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new event types
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
#[non_exhaustive]
pub enum DiscoveryEvent {
    /// A not-previously-seen device was discovered by either path.
    Found {
        /// The newly created record.
        record: DeviceRecord,
    },
    /// The BLE scanner reported an asynchronous failure.
    ScanFailed {
        /// Platform diagnostic code.
        code: i32,
    },
    /// The session finished and its snapshot was taken.
    Finished {
        /// Number of devices in the final snapshot.
        count: usize,
    },
}

/// Sender half for discovery events.
pub type EventSender = broadcast::Sender<DiscoveryEvent>;

/// Receiver half for discovery events.
pub type EventReceiver = broadcast::Receiver<DiscoveryEvent>;

/// Dispatcher fanning events out to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventDispatcher {
    sender: EventSender,
}

impl EventDispatcher {
    /// Create a dispatcher with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to events.
    pub fn subscribe(&self) -> EventReceiver {
        self.sender.subscribe()
    }

    /// Send an event.
    pub fn send(&self, event: DiscoveryEvent) {
        // Ignore error if no receivers
        let _ = self.sender.send(event);
    }

    /// Number of active receivers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new(100)
    }
}
