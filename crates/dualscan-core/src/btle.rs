//! btleplug-backed BLE scanner.
//!
//! The shipped implementation of [`BleScanner`] for desktop platforms.
//! btleplug delivers one `DeviceDiscovered` event per peripheral per scan,
//! which maps onto the single-result notification shape; the platforms it
//! wraps do not batch, so batched deliveries only arise from other backends.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use btleplug::api::{Central, CentralEvent, Manager as _, Peripheral as _, ScanFilter};
use btleplug::platform::{Adapter, Manager, PeripheralId};
use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::platform::{BleScanEvent, BleScanner, RawSighting};

/// Get the first available Bluetooth adapter.
pub async fn get_adapter() -> Result<Adapter> {
    let manager = Manager::new().await?;
    let adapters = manager.adapters().await?;

    adapters.into_iter().next().ok_or(Error::AdapterUnavailable)
}

/// On macOS the address is all zeros; fall back to the peripheral id there.
fn identifier_for(address: &str, id: &PeripheralId) -> String {
    if address == "00:00:00:00:00:00" {
        format!("{:?}", id)
            .trim_start_matches("PeripheralId(")
            .trim_end_matches(')')
            .to_string()
    } else {
        address.to_string()
    }
}

/// [`BleScanner`] over a btleplug adapter.
pub struct BtleScanner {
    adapter: Adapter,
    pump: Mutex<Option<(JoinHandle<()>, CancellationToken)>>,
}

impl BtleScanner {
    /// Create a scanner over the first available adapter.
    pub async fn new() -> Result<Self> {
        Ok(Self::with_adapter(get_adapter().await?))
    }

    /// Create a scanner over a specific adapter.
    pub fn with_adapter(adapter: Adapter) -> Self {
        Self {
            adapter,
            pump: Mutex::new(None),
        }
    }

    fn pump_slot(&self) -> std::sync::MutexGuard<'_, Option<(JoinHandle<()>, CancellationToken)>> {
        self.pump.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl BleScanner for BtleScanner {
    async fn start_scan(&self) -> Result<mpsc::UnboundedReceiver<BleScanEvent>> {
        if self.pump_slot().is_some() {
            return Err(Error::scan_start_failed("scan already running"));
        }

        let mut events = self.adapter.events().await?;
        self.adapter.start_scan(ScanFilter::default()).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let adapter = self.adapter.clone();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    event = events.next() => {
                        let Some(event) = event else { break };
                        if let CentralEvent::DeviceDiscovered(id) = event {
                            match sighting_for(&adapter, &id).await {
                                Ok(Some(sighting)) => {
                                    if tx.send(BleScanEvent::Result(sighting)).is_err() {
                                        break;
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => trace!(error = %e, "failed to read peripheral properties"),
                            }
                        }
                    }
                }
            }
            debug!("btleplug event pump stopped");
        });

        *self.pump_slot() = Some((handle, cancel));
        Ok(rx)
    }

    async fn stop_scan(&self) -> Result<()> {
        let pump = self.pump_slot().take();
        if let Some((handle, cancel)) = pump {
            cancel.cancel();
            handle.abort();
            self.adapter.stop_scan().await?;
        }
        Ok(())
    }
}

async fn sighting_for(adapter: &Adapter, id: &PeripheralId) -> Result<Option<RawSighting>> {
    let peripheral = adapter.peripheral(id).await?;
    let Some(props) = peripheral.properties().await? else {
        return Ok(None);
    };

    let address = identifier_for(&props.address.to_string(), id);
    let mut sighting = RawSighting::new(address);
    sighting.name = props.local_name;
    sighting.rssi = props.rssi;
    Ok(Some(sighting))
}

impl std::fmt::Debug for BtleScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BtleScanner")
            .field("scanning", &self.pump_slot().is_some())
            .finish()
    }
}

impl Drop for BtleScanner {
    fn drop(&mut self) {
        if let Some((handle, cancel)) = self.pump_slot().take() {
            cancel.cancel();
            handle.abort();
            warn!("BtleScanner dropped while scanning; platform scan may still be running");
        }
    }
}
