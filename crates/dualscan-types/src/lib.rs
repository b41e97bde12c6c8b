//! Platform-agnostic types for dual-path Bluetooth discovery.
//!
//! This crate provides the shared data types used by the discovery
//! coordinator in `dualscan-core`, kept free of any platform or
//! async-runtime dependencies so they can be consumed by thin frontends.
//!
//! # Example
//!
//! ```
//! use dualscan_types::{DeviceRecord, ConnectionStatus};
//!
//! let record = DeviceRecord::new("AA:BB:CC:DD:EE:FF").with_name("Printer1");
//! assert_eq!(record.display_name.as_deref(), Some("Printer1"));
//! assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
//! ```

pub mod uuid;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One physically observed radio peer.
///
/// Created the first time either discovery path reports an address not yet
/// seen in the session, and immutable for the rest of that session: later
/// sightings of the same address are dropped, not merged, so the name first
/// reported is the name callers see.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DeviceRecord {
    /// Stable hardware identifier; the dedup key within a session.
    pub address: String,
    /// Human-readable name. Absent for many BLE peripherals.
    pub display_name: Option<String>,
    /// Received signal strength in dBm. Only the BLE path populates this.
    pub signal_strength: Option<i16>,
}

impl DeviceRecord {
    /// Create a record with just an address.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            display_name: None,
            signal_strength: None,
        }
    }

    /// Attach a display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    /// Attach a signal strength reading.
    #[must_use]
    pub fn with_signal_strength(mut self, rssi: i16) -> Self {
        self.signal_strength = Some(rssi);
        self
    }

    /// Whether the peer advertised a usable display name.
    pub fn has_name(&self) -> bool {
        self.display_name.is_some()
    }
}

/// Connection status for the stream-connect step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ConnectionStatus {
    /// No stream open. Also the terminal state after any failure.
    #[default]
    Disconnected,
    /// Lookup and socket open in progress.
    Loading,
    /// Stream open and usable.
    Connected,
}

/// Runtime permission identifiers checked before scanning or connecting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Permission {
    /// The single runtime scan permission of the modern tier.
    Scan,
    /// Fine location, which gates scanning on the legacy tier.
    FineLocation,
    /// Required to open a stream socket on the modern tier.
    Connect,
}

/// Which permission model the platform uses.
///
/// Modern platforms gate scanning behind a dedicated scan permission;
/// legacy platforms gate it behind fine location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PlatformTier {
    /// Dedicated scan-permission model.
    Modern,
    /// Location-gated model.
    Legacy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_record_builder() {
        let record = DeviceRecord::new("AA:BB")
            .with_name("Printer1")
            .with_signal_strength(-60);

        assert_eq!(record.address, "AA:BB");
        assert_eq!(record.display_name.as_deref(), Some("Printer1"));
        assert_eq!(record.signal_strength, Some(-60));
        assert!(record.has_name());
    }

    #[test]
    fn test_device_record_without_name() {
        let record = DeviceRecord::new("CC:DD");
        assert!(!record.has_name());
        assert_eq!(record.signal_strength, None);
    }

    #[test]
    fn test_connection_status_default() {
        assert_eq!(ConnectionStatus::default(), ConnectionStatus::Disconnected);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_status_serde_round_trip() {
        let json = serde_json::to_string(&ConnectionStatus::Loading).unwrap();
        assert_eq!(json, "\"loading\"");
        let status: ConnectionStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(status, ConnectionStatus::Loading);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_record_serde_round_trip() {
        let record = DeviceRecord::new("AA:BB").with_name("Lamp");
        let json = serde_json::to_string(&record).unwrap();
        let back: DeviceRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
    }
}
