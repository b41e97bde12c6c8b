//! Platform collaborator traits.
//!
//! The coordinator never talks to a radio directly; it talks to these
//! abstractions. Shipping backends (see [`crate::btle`]) and the mock
//! platform (see [`crate::mock`]) implement them, which is what keeps the
//! coordinator testable without hardware.
//!
//! Delivery model: event-producing capabilities hand back an unbounded
//! [`mpsc`] receiver. The platform side sends from whatever context its
//! callbacks fire in; the drivers pump the receivers from their own tasks.

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use uuid::Uuid;

use dualscan_types::{Permission, PlatformTier};

use crate::error::Result;

/// One raw discovery notification, before dedup.
///
/// The address can be absent: some permission states make it unobtainable,
/// in which case the sighting is treated as no device at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSighting {
    /// Hardware address, if resolvable.
    pub address: Option<String>,
    /// Advertised or cached device name.
    pub name: Option<String>,
    /// Signal strength in dBm, where the path reports one.
    pub rssi: Option<i16>,
}

impl RawSighting {
    /// Create a sighting with a resolvable address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            name: None,
            rssi: None,
        }
    }

    /// Attach a device name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a signal strength.
    #[must_use]
    pub fn with_rssi(mut self, rssi: i16) -> Self {
        self.rssi = Some(rssi);
        self
    }

    /// A sighting whose address could not be resolved.
    pub fn anonymous() -> Self {
        Self {
            address: None,
            name: None,
            rssi: None,
        }
    }
}

/// Events delivered on a classic inquiry subscription.
#[derive(Debug, Clone)]
pub enum InquiryEvent {
    /// A device was found by the inquiry broadcast.
    DeviceFound(RawSighting),
    /// The platform declared the inquiry finished. Informational only.
    Finished,
}

/// Events delivered by a BLE scanner.
#[derive(Debug, Clone)]
pub enum BleScanEvent {
    /// A single advertisement result.
    Result(RawSighting),
    /// A batched delivery; entries are in platform order.
    Batch(Vec<RawSighting>),
    /// The scan failed with a platform diagnostic code. Non-fatal.
    Failed {
        /// Platform diagnostic code.
        code: i32,
    },
}

/// Which inquiry event kinds a subscription wants.
#[derive(Debug, Clone, Copy)]
pub struct InquiryFilter {
    /// Deliver device-found events.
    pub device_found: bool,
    /// Deliver the discovery-finished event.
    pub finished: bool,
}

impl Default for InquiryFilter {
    fn default() -> Self {
        Self {
            device_found: true,
            finished: true,
        }
    }
}

/// A live broadcast subscription: an opaque handle plus the event stream.
#[derive(Debug)]
pub struct InquirySubscription {
    /// Handle for [`InquiryAdapter::unsubscribe`].
    pub id: u64,
    /// The subscribed event stream.
    pub events: mpsc::UnboundedReceiver<InquiryEvent>,
}

/// Classic (inquiry-based) discovery capability.
///
/// All methods are best-effort from the coordinator's point of view: a
/// failure degrades the classic path, it never aborts a session.
#[async_trait]
pub trait InquiryAdapter: Send + Sync {
    /// Whether a radio adapter exists at all.
    async fn is_available(&self) -> bool;

    /// Whether the radio is switched on.
    async fn is_enabled(&self) -> bool;

    /// Register a broadcast receiver for inquiry events.
    async fn subscribe(&self, filter: InquiryFilter) -> Result<InquirySubscription>;

    /// Remove a previously registered receiver.
    ///
    /// Unsubscribing a handle that is already gone returns
    /// [`crate::Error::NotSubscribed`], which teardown tolerates.
    async fn unsubscribe(&self, id: u64) -> Result<()>;

    /// Request an inquiry. `Ok(false)` means the platform declined to start.
    async fn start_inquiry(&self) -> Result<bool>;

    /// Cancel a running inquiry.
    async fn cancel_inquiry(&self) -> Result<()>;

    /// Whether an inquiry is currently running.
    async fn is_inquiry_active(&self) -> bool;
}

/// BLE advertisement-scan capability.
#[async_trait]
pub trait BleScanner: Send + Sync {
    /// Start scanning; events arrive on the returned receiver until
    /// [`stop_scan`](Self::stop_scan) or the scanner drops the sender.
    async fn start_scan(&self) -> Result<mpsc::UnboundedReceiver<BleScanEvent>>;

    /// Stop scanning. Idempotent.
    async fn stop_scan(&self) -> Result<()>;
}

/// Runtime permission oracle, versioned by platform tier.
pub trait PermissionOracle: Send + Sync {
    /// Which permission model this platform uses.
    fn tier(&self) -> PlatformTier;

    /// Whether a permission is granted. An `Err` is treated as not granted
    /// by the gate, never propagated.
    fn is_granted(&self, permission: Permission) -> Result<bool>;
}

/// A bidirectional stream to a connected device.
pub trait DeviceStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> DeviceStream for T {}

/// Capability to open a stream socket to a device by address.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Open a stream to `address` using the given service identifier.
    ///
    /// This is a blocking-style connect from the protocol's point of view;
    /// implementations should resolve once the stream is usable or failed.
    async fn open(&self, address: &str, service: Uuid) -> Result<Box<dyn DeviceStream>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sighting_builder() {
        let s = RawSighting::new("AA:BB").with_name("Printer1").with_rssi(-55);
        assert_eq!(s.address.as_deref(), Some("AA:BB"));
        assert_eq!(s.name.as_deref(), Some("Printer1"));
        assert_eq!(s.rssi, Some(-55));
    }

    #[test]
    fn test_anonymous_sighting_has_no_address() {
        assert_eq!(RawSighting::anonymous().address, None);
    }

    #[test]
    fn test_filter_default_matches_both_kinds() {
        let filter = InquiryFilter::default();
        assert!(filter.device_found);
        assert!(filter.finished);
    }
}
