//! Permission gate evaluated once at session start.
//!
//! Pure function of platform tier + granted permissions; the result is
//! snapshotted into the session and not re-evaluated mid-scan, so a
//! permission revoked while scanning is only noticed by the next session.

use tracing::debug;

use dualscan_types::{Permission, PlatformTier};

use crate::platform::PermissionOracle;

/// Which scan modes the session is allowed to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanGrants {
    /// Classic inquiry permitted.
    pub classic: bool,
    /// BLE scan permitted (already ANDed with the caller's include-BLE flag).
    pub ble: bool,
}

impl ScanGrants {
    /// Neither path permitted; the coordinator short-circuits on this.
    pub fn none() -> Self {
        Self {
            classic: false,
            ble: false,
        }
    }

    /// True iff no scan mode is permitted.
    pub fn is_empty(&self) -> bool {
        !self.classic && !self.ble
    }

    /// Evaluate the gate against an oracle.
    ///
    /// A missing oracle, or an oracle whose check errors, yields `false`
    /// for the affected mode rather than an error.
    pub fn evaluate(oracle: Option<&dyn PermissionOracle>, include_ble: bool) -> Self {
        let Some(oracle) = oracle else {
            debug!("no permission oracle available, denying both scan modes");
            return Self::none();
        };

        let tier = oracle.tier();
        let gating_permission = match tier {
            PlatformTier::Modern => Permission::Scan,
            PlatformTier::Legacy => Permission::FineLocation,
        };

        let granted = oracle.is_granted(gating_permission).unwrap_or_else(|e| {
            debug!(permission = ?gating_permission, error = %e, "permission check failed, treating as denied");
            false
        });

        let grants = Self {
            classic: granted,
            ble: granted && include_ble,
        };
        debug!(?tier, ?grants, include_ble, "permission gate evaluated");
        grants
    }
}
