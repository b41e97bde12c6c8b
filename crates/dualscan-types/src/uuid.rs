//! Well-known Bluetooth service UUIDs used by the connect step.

use uuid::{Uuid, uuid};

// --- Standard profile service UUIDs ---

/// Serial Port Profile (RFCOMM) service.
///
/// The single fixed service identifier used when opening a stream socket
/// to a discovered device; label printers and similar peripherals expose
/// their command channel through it.
pub const SERIAL_PORT_SERVICE: Uuid = uuid!("00001101-0000-1000-8000-00805f9b34fb");

/// Generic Access Profile (GAP) service.
pub const GAP_SERVICE: Uuid = uuid!("00001800-0000-1000-8000-00805f9b34fb");
