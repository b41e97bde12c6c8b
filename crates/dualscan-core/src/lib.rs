//! Dual-path Bluetooth device discovery.
//!
//! This crate coordinates classic (inquiry-based) and BLE (advertisement
//! scan) discovery concurrently, deduplicates results arriving from the two
//! independent asynchronous sources, gates each scan mode behind the
//! platform's permission model, and enforces a bounded discovery window with
//! deterministic cleanup on every exit path.
//!
//! # Design
//!
//! - **Drivers push, the coordinator pulls.** The classic and BLE drivers
//!   push raw sightings into a session-scoped [`DeviceRegistry`] and raise a
//!   payload-free [`EventSignal`]; the coordinator suspends on the signal
//!   until the deadline, then reads the registry once for the final snapshot.
//! - **First sighting wins.** One record per unique address per session;
//!   later sightings of a known address are dropped, not merged.
//! - **Nothing escapes.** [`DiscoveryCoordinator::discover`] is infallible:
//!   missing capability yields an empty list, a failed path degrades to
//!   "not running", and teardown always runs all of its steps.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use dualscan_core::{BtleScanner, DiscoveryCoordinator, DiscoveryOptions};
//! use dualscan_core::mock::{MockPermissions, MockRadio};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // The inquiry adapter is host-specific; the mock stands in here.
//!     let radio = Arc::new(MockRadio::new());
//!     let coordinator = DiscoveryCoordinator::new(radio)
//!         .with_scanner(Arc::new(BtleScanner::new().await?))
//!         .with_permissions(Arc::new(MockPermissions::fully_granted()));
//!
//!     let devices = coordinator
//!         .discover(DiscoveryOptions::default(), None)
//!         .await;
//!     println!("found {} devices", devices.len());
//!     Ok(())
//! }
//! ```

pub mod ble;
pub mod btle;
pub mod classic;
pub mod connect;
pub mod coordinator;
pub mod error;
pub mod events;
pub mod gate;
pub mod mock;
pub mod platform;
pub mod registry;
pub mod signal;
pub mod sink;

// Re-export the shared types crate for convenience.
pub use dualscan_types::{ConnectionStatus, DeviceRecord, Permission, PlatformTier};
pub use dualscan_types::uuid as uuids;

// Core exports
pub use ble::BleDriver;
pub use btle::BtleScanner;
pub use classic::ClassicDriver;
pub use connect::Connector;
pub use coordinator::{DiscoveryCoordinator, DiscoveryOptions, SessionState};
pub use error::{Error, Result};
pub use events::{DiscoveryEvent, EventDispatcher, EventReceiver, EventSender};
pub use gate::ScanGrants;
pub use platform::{
    BleScanEvent, BleScanner, DeviceStream, InquiryAdapter, InquiryEvent, InquiryFilter,
    InquirySubscription, PermissionOracle, RawSighting, StreamTransport,
};
pub use registry::DeviceRegistry;
pub use signal::{EventSignal, Wake};
pub use sink::{DeviceCallback, Origin, SessionSink};
