//! The discovery coordinator.
//!
//! Drives classic and BLE discovery concurrently under a single deadline,
//! with guaranteed symmetric teardown. This is the one place where getting
//! cleanup order wrong leaks a process-wide scanning resource (an inquiry
//! left running, or a receiver registration), so the teardown sequence is
//! owned here and runs on every exit path, including the caller abandoning
//! the future.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use dualscan_types::DeviceRecord;

use crate::ble::BleDriver;
use crate::classic::ClassicDriver;
use crate::events::{DiscoveryEvent, EventDispatcher};
use crate::gate::ScanGrants;
use crate::platform::{BleScanner, InquiryAdapter, PermissionOracle};
use crate::registry::DeviceRegistry;
use crate::signal::{EventSignal, Wake};
use crate::sink::{DeviceCallback, SessionSink};

/// Options for one discovery session.
#[derive(Debug, Clone)]
pub struct DiscoveryOptions {
    /// Upper bound on wall-clock time the session may run.
    pub duration: Duration,
    /// Whether the BLE path should be attempted at all.
    pub include_ble: bool,
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            duration: Duration::from_secs(12),
            include_ble: true,
        }
    }
}

impl DiscoveryOptions {
    /// Create options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the discovery window.
    #[must_use]
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Set the discovery window in milliseconds.
    #[must_use]
    pub fn duration_ms(mut self, ms: u64) -> Self {
        self.duration = Duration::from_millis(ms);
        self
    }

    /// Enable or disable the BLE path.
    #[must_use]
    pub fn include_ble(mut self, include: bool) -> Self {
        self.include_ble = include;
        self
    }
}

/// Lifecycle states of one discovery session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No session running.
    Idle,
    /// Capability and permission checks.
    Gating,
    /// Drivers running, coordinator waiting on the signal.
    Scanning,
    /// Teardown sequence running.
    Draining,
    /// Terminal; snapshot taken.
    Stopped,
}

/// Coordinates classic and BLE discovery for a caller-owned lifetime.
///
/// Construct one per radio stack and share it; each
/// [`discover`](Self::discover) call is an isolated session with its own
/// registry and deadline. No process-wide state is involved.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use dualscan_core::{BtleScanner, DiscoveryCoordinator, DiscoveryOptions};
///
/// let coordinator = DiscoveryCoordinator::new(adapter)
///     .with_scanner(Arc::new(BtleScanner::new().await?))
///     .with_permissions(oracle);
/// let devices = coordinator.discover(DiscoveryOptions::default(), None).await;
/// println!("found {} devices", devices.len());
/// ```
pub struct DiscoveryCoordinator {
    adapter: Arc<dyn InquiryAdapter>,
    scanner: Option<Arc<dyn BleScanner>>,
    permissions: Option<Arc<dyn PermissionOracle>>,
    events: EventDispatcher,
    /// Named devices from the most recent completed session; feeds
    /// connect-by-name lookups.
    known: Mutex<Vec<DeviceRecord>>,
}

impl DiscoveryCoordinator {
    /// Create a coordinator over an inquiry adapter.
    pub fn new(adapter: Arc<dyn InquiryAdapter>) -> Self {
        Self {
            adapter,
            scanner: None,
            permissions: None,
            events: EventDispatcher::default(),
            known: Mutex::new(Vec::new()),
        }
    }

    /// Attach a BLE scanner backend.
    #[must_use]
    pub fn with_scanner(mut self, scanner: Arc<dyn BleScanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// Attach a permission oracle.
    #[must_use]
    pub fn with_permissions(mut self, oracle: Arc<dyn PermissionOracle>) -> Self {
        self.permissions = Some(oracle);
        self
    }

    /// The typed event stream for this coordinator.
    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    /// Named devices from the most recent completed session.
    pub fn known_devices(&self) -> Vec<DeviceRecord> {
        self.known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Run one bounded discovery session.
    ///
    /// Infallible by design: capability absence yields an empty list, setup
    /// failures degrade a single path, and every internal fault is absorbed
    /// and logged. The only output is the deduplicated device list.
    pub async fn discover(
        &self,
        options: DiscoveryOptions,
        on_device: Option<DeviceCallback>,
    ) -> Vec<DeviceRecord> {
        debug!(
            duration_ms = options.duration.as_millis() as u64,
            include_ble = options.include_ble,
            state = ?SessionState::Gating,
            "discovery session starting"
        );

        // --- Gating ---
        if !self.adapter.is_available().await {
            warn!("no radio adapter available, returning empty result");
            return self.finish_empty();
        }
        if !self.adapter.is_enabled().await {
            warn!("radio adapter disabled, returning empty result");
            return self.finish_empty();
        }

        // The BLE path needs both the caller's opt-in and a scanner backend.
        let include_ble = options.include_ble && self.scanner.is_some();
        let grants = ScanGrants::evaluate(self.permissions.as_deref(), include_ble);
        if grants.is_empty() {
            warn!("neither scan mode permitted, returning empty result");
            return self.finish_empty();
        }

        // --- Scanning ---
        debug!(?grants, state = ?SessionState::Scanning, "starting drivers");

        let registry = Arc::new(DeviceRegistry::new());
        let signal = Arc::new(EventSignal::new());
        let sink = Arc::new(SessionSink::new(
            Arc::clone(&registry),
            Arc::clone(&signal),
            self.events.clone(),
            on_device,
        ));

        let classic = grants
            .classic
            .then(|| ClassicDriver::new(Arc::clone(&self.adapter), Arc::clone(&sink)));
        if let Some(driver) = &classic {
            // Registration failure is non-fatal; the inquiry is still
            // requested so the platform behaves the same either way.
            driver.register().await;
            driver.start().await;
        }

        let ble = match (&self.scanner, grants.ble) {
            (Some(scanner), true) => {
                let driver = BleDriver::new(Arc::clone(scanner), Arc::clone(&sink));
                driver.start().await;
                Some(driver)
            }
            _ => None,
        };

        // From here on teardown must run even if the caller abandons us.
        let guard = SessionGuard::new(classic, ble, Arc::clone(&signal));

        let deadline = Instant::now() + options.duration;
        loop {
            match signal.await_next(deadline).await {
                Wake::Signal => {
                    trace!(devices = registry.len(), "woke on new results");
                }
                Wake::DeadlineElapsed => {
                    debug!("discovery window elapsed");
                    break;
                }
                Wake::Closed => {
                    // Unexpected while scanning; treated exactly like the
                    // timeout path so teardown stays single-pathed.
                    warn!("event signal closed during scan wait");
                    break;
                }
            }
        }

        // --- Draining ---
        debug!(state = ?SessionState::Draining, "running teardown");
        guard.drain().await;

        // --- Stopped ---
        let snapshot = registry.snapshot();
        *self.known.lock().unwrap_or_else(PoisonError::into_inner) = snapshot
            .iter()
            .filter(|r| r.has_name())
            .cloned()
            .collect();
        self.events.send(DiscoveryEvent::Finished {
            count: snapshot.len(),
        });
        info!(
            devices = snapshot.len(),
            state = ?SessionState::Stopped,
            "discovery session finished"
        );
        snapshot
    }

    fn finish_empty(&self) -> Vec<DeviceRecord> {
        self.events.send(DiscoveryEvent::Finished { count: 0 });
        Vec::new()
    }
}

impl std::fmt::Debug for DiscoveryCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveryCoordinator")
            .field("has_scanner", &self.scanner.is_some())
            .field("has_permissions", &self.permissions.is_some())
            .finish()
    }
}

/// The four teardown steps of one session, bundled so they can run either
/// inline (normal exit) or from `Drop` (caller abandoned the future).
struct TeardownParts {
    classic: Option<ClassicDriver>,
    ble: Option<BleDriver>,
    signal: Arc<EventSignal>,
}

impl TeardownParts {
    /// Run the teardown sequence. Order matters, and each step is
    /// independently guarded so a failure in one never skips the next:
    /// cancel inquiry, stop BLE scan, unregister receiver, close signal.
    async fn run(self) {
        if let Some(classic) = &self.classic {
            classic.cancel().await;
        }
        if let Some(ble) = &self.ble {
            ble.stop().await;
        }
        if let Some(classic) = &self.classic {
            classic.unregister().await;
        }
        self.signal.close();
        debug!("teardown sequence complete");
    }
}

/// Guard making the Draining sequence unskippable.
struct SessionGuard {
    parts: Option<TeardownParts>,
}

impl SessionGuard {
    fn new(classic: Option<ClassicDriver>, ble: Option<BleDriver>, signal: Arc<EventSignal>) -> Self {
        Self {
            parts: Some(TeardownParts {
                classic,
                ble,
                signal,
            }),
        }
    }

    /// Normal path: run teardown inline, exactly once.
    async fn drain(mut self) {
        if let Some(parts) = self.parts.take() {
            parts.run().await;
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(parts) = self.parts.take() {
            // The discover future was dropped mid-wait; the scanning
            // resources still have to be released.
            if let Ok(handle) = Handle::try_current() {
                handle.spawn(parts.run());
            } else {
                warn!("no runtime available to run discovery teardown");
            }
        }
    }
}
