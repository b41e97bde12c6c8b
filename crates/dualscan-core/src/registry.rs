//! Session-scoped registry of discovered devices.
//!
//! Both drivers push into one registry from their own tasks; the registry
//! owns deduplication. Internally locked, so callers never synchronize
//! around it, and nothing here suspends, which keeps it safe to call from
//! driver pumps.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dualscan_types::DeviceRecord;

#[derive(Debug, Default)]
struct Inner {
    /// Addresses claimed by a successful `try_add`.
    seen: HashSet<String>,
    /// Full records, keyed by address. Populated by `put` after a claim.
    records: HashMap<String, DeviceRecord>,
}

/// Concurrent-safe set of discovered device identifiers plus their records.
///
/// The contract between the two methods is the whole dedup story:
/// [`try_add`](Self::try_add) is a true insert-if-absent, and a caller may
/// only [`put`](Self::put) a record after its *own* `try_add` returned true.
/// That makes "first sighting wins" hold across both drivers, and guarantees
/// the per-device callback fires at most once per address.
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    inner: Mutex<Inner>,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned registry just means a pump panicked mid-insert; the
        // data is still a valid set/map, so keep serving it.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Atomically claim an address. Returns true iff this call inserted it.
    ///
    /// Exactly one of any number of concurrent callers racing on the same
    /// address observes `true`.
    pub fn try_add(&self, address: &str) -> bool {
        self.lock().seen.insert(address.to_string())
    }

    /// Store the record for a claimed address.
    ///
    /// Idempotent overwrite; only call after your own [`try_add`](Self::try_add)
    /// returned true, so the claim happens-before the record is visible to
    /// [`snapshot`](Self::snapshot).
    pub fn put(&self, record: DeviceRecord) {
        let mut inner = self.lock();
        inner.records.insert(record.address.clone(), record);
    }

    /// Point-in-time copy of all stored records. Order is not guaranteed.
    pub fn snapshot(&self) -> Vec<DeviceRecord> {
        self.lock().records.values().cloned().collect()
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// Whether no records are stored.
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }
}
