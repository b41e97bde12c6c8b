//! Classic (inquiry-based) scan driver.
//!
//! Thin adapter over the platform inquiry broadcast: registers a receiver,
//! requests the inquiry, and pumps found-device events into the session
//! sink. Every operation here is best-effort: a failure degrades the
//! classic path and is logged, it never aborts the session.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::Error;
use crate::platform::{InquiryAdapter, InquiryEvent, InquiryFilter, InquirySubscription};
use crate::sink::{Origin, SessionSink};

/// Driver for the classic discovery path of one session.
pub struct ClassicDriver {
    adapter: Arc<dyn InquiryAdapter>,
    sink: Arc<SessionSink>,
    subscription: Mutex<Option<u64>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl ClassicDriver {
    /// Create a driver bound to a session sink.
    pub fn new(adapter: Arc<dyn InquiryAdapter>, sink: Arc<SessionSink>) -> Self {
        Self {
            adapter,
            sink,
            subscription: Mutex::new(None),
            pump: Mutex::new(None),
        }
    }

    fn lock<'a, T>(mutex: &'a Mutex<T>) -> std::sync::MutexGuard<'a, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the broadcast receiver and start pumping its events.
    ///
    /// Returns true iff registration succeeded. Failure leaves the classic
    /// path inert; the session proceeds without classic results.
    pub async fn register(&self) -> bool {
        match self.adapter.subscribe(InquiryFilter::default()).await {
            Ok(subscription) => {
                self.spawn_pump(subscription);
                debug!("classic receiver registered");
                true
            }
            Err(e) => {
                warn!(error = %e, "classic receiver registration failed, proceeding without classic results");
                false
            }
        }
    }

    fn spawn_pump(&self, subscription: InquirySubscription) {
        let InquirySubscription { id, mut events } = subscription;
        *Self::lock(&self.subscription) = Some(id);

        let sink = Arc::clone(&self.sink);
        let handle = tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    InquiryEvent::DeviceFound(sighting) => {
                        if sink.offer(sighting, Origin::Classic) {
                            sink.notify();
                        }
                    }
                    InquiryEvent::Finished => {
                        // Informational; the session deadline decides when
                        // discovery actually ends.
                        debug!("classic inquiry reported finished");
                    }
                }
            }
        });
        *Self::lock(&self.pump) = Some(handle);
    }

    /// Whether the receiver is currently registered.
    pub fn is_registered(&self) -> bool {
        Self::lock(&self.subscription).is_some()
    }

    /// Request the platform inquiry. Returns true iff it started.
    pub async fn start(&self) -> bool {
        match self.adapter.start_inquiry().await {
            Ok(true) => {
                debug!("classic inquiry started");
                true
            }
            Ok(false) => {
                warn!("platform declined to start classic inquiry");
                false
            }
            Err(e) => {
                warn!(error = %e, "classic inquiry start failed");
                false
            }
        }
    }

    /// Cancel the inquiry if one is running. Safe to call regardless of
    /// whether [`start`](Self::start) ever succeeded.
    pub async fn cancel(&self) {
        if self.adapter.is_inquiry_active().await {
            if let Err(e) = self.adapter.cancel_inquiry().await {
                warn!(error = %e, "classic inquiry cancel failed");
            }
        } else {
            debug!("no classic inquiry active, cancel skipped");
        }
    }

    /// Remove the broadcast receiver and stop the pump. Idempotent;
    /// an already-removed registration is not an error.
    pub async fn unregister(&self) {
        let id = Self::lock(&self.subscription).take();
        if let Some(id) = id {
            match self.adapter.unsubscribe(id).await {
                Ok(()) => debug!("classic receiver unregistered"),
                Err(Error::NotSubscribed { .. }) => {
                    debug!("classic receiver was already unregistered")
                }
                Err(e) => warn!(error = %e, "classic receiver unregister failed"),
            }
        }

        if let Some(handle) = Self::lock(&self.pump).take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for ClassicDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassicDriver")
            .field("registered", &self.is_registered())
            .finish()
    }
}
