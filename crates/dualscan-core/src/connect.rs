//! Stream connection to a previously discovered device.
//!
//! The connect step has no interesting protocol content: look the device up
//! by display name in the last-known list, open a stream socket on the fixed
//! Serial Port Profile service, and publish a tri-state status. On lookup
//! miss or I/O failure the status becomes Disconnected, any partially-opened
//! stream is closed, and no retry is attempted.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use dualscan_types::{ConnectionStatus, DeviceRecord, Permission, PlatformTier, uuid};

use crate::error::{Error, Result};
use crate::platform::{DeviceStream, PermissionOracle, StreamTransport};

/// Opens and owns at most one device stream, with an observable status.
pub struct Connector {
    transport: Arc<dyn StreamTransport>,
    permissions: Option<Arc<dyn PermissionOracle>>,
    status: watch::Sender<ConnectionStatus>,
    stream: Mutex<Option<Box<dyn DeviceStream>>>,
}

impl Connector {
    /// Create a connector over a stream transport.
    pub fn new(transport: Arc<dyn StreamTransport>) -> Self {
        let (status, _) = watch::channel(ConnectionStatus::Disconnected);
        Self {
            transport,
            permissions: None,
            status,
            stream: Mutex::new(None),
        }
    }

    /// Attach a permission oracle; on the modern tier the connect permission
    /// is checked before any socket is opened.
    #[must_use]
    pub fn with_permissions(mut self, oracle: Arc<dyn PermissionOracle>) -> Self {
        self.permissions = Some(oracle);
        self
    }

    /// Observe connection status changes.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.subscribe()
    }

    /// The current status.
    pub fn current_status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    fn set_status(&self, status: ConnectionStatus) {
        self.status.send_replace(status);
    }

    /// Connect to a device by its display name.
    ///
    /// `known` is the caller's last-known device list (typically
    /// [`DiscoveryCoordinator::known_devices`](crate::DiscoveryCoordinator::known_devices)).
    /// Any previously open stream is closed first.
    pub async fn connect_by_name(&self, name: &str, known: &[DeviceRecord]) -> Result<()> {
        self.set_status(ConnectionStatus::Loading);

        if let Some(oracle) = &self.permissions
            && oracle.tier() == PlatformTier::Modern
            && !oracle.is_granted(Permission::Connect).unwrap_or(false)
        {
            warn!("connect permission not granted");
            self.close_stream().await;
            self.set_status(ConnectionStatus::Disconnected);
            return Err(Error::permission_denied(Permission::Connect));
        }

        let Some(device) = known
            .iter()
            .find(|record| record.display_name.as_deref() == Some(name))
        else {
            debug!(%name, "no known device with that display name");
            self.close_stream().await;
            self.set_status(ConnectionStatus::Disconnected);
            return Err(Error::device_not_found(name));
        };

        match self
            .transport
            .open(&device.address, uuid::SERIAL_PORT_SERVICE)
            .await
        {
            Ok(stream) => {
                // Replace, closing whatever was open before.
                let previous = self.stream.lock().await.replace(stream);
                if let Some(mut previous) = previous {
                    let _ = previous.shutdown().await;
                }
                self.set_status(ConnectionStatus::Connected);
                info!(address = %device.address, "stream connected");
                Ok(())
            }
            Err(e) => {
                warn!(address = %device.address, error = %e, "stream connect failed");
                self.close_stream().await;
                self.set_status(ConnectionStatus::Disconnected);
                Err(e)
            }
        }
    }

    /// Close the stream, if any, and reset the status.
    pub async fn disconnect(&self) {
        self.close_stream().await;
        self.set_status(ConnectionStatus::Disconnected);
    }

    async fn close_stream(&self) {
        if let Some(mut stream) = self.stream.lock().await.take() {
            if let Err(e) = stream.shutdown().await {
                warn!(error = %e, "stream shutdown failed");
            }
        }
    }
}

impl std::fmt::Debug for Connector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("status", &self.current_status())
            .finish()
    }
}
