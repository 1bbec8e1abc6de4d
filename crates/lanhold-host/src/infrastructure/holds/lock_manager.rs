//! ResourceLockManager: all-or-nothing ownership of the two power holds.
//!
//! ```text
//! acquire():  Idle ──receive ok──► (receive only) ──transmit ok──► Active
//!                   │                     │
//!                   └─receive denied      └─transmit denied: release receive
//!                       ► Idle, Err            ► Idle, Err
//!
//! release():  any ──► Idle   (releases whatever is present; never fails)
//! ```
//!
//! The "receive only" state exists for the duration of the `acquire` call and
//! is never observable from outside.  There is a single logical holder: a
//! second `acquire` while `Active` does not touch the platform.

use std::sync::Arc;

use lanhold_core::{LockError, LockState};
use tracing::{debug, info, warn};

use super::{HoldHandle, HoldKind, HoldPlatform};

/// Labels passed to the platform when each hold is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldTags {
    pub receive: String,
    pub transmit: String,
}

impl Default for HoldTags {
    fn default() -> Self {
        Self {
            receive: "lanhold_receive".to_string(),
            transmit: "lanhold_transmit".to_string(),
        }
    }
}

/// Owns the receive-hold and transmit-hold for one session.
pub struct ResourceLockManager {
    platform: Arc<dyn HoldPlatform>,
    tags: HoldTags,
    receive: Option<HoldHandle>,
    transmit: Option<HoldHandle>,
}

impl ResourceLockManager {
    /// Creates an `Idle` manager.  Nothing is requested from the platform
    /// until [`acquire`](Self::acquire) is called.
    pub fn new(platform: Arc<dyn HoldPlatform>, tags: HoldTags) -> Self {
        Self {
            platform,
            tags,
            receive: None,
            transmit: None,
        }
    }

    /// `Active` iff both holds are present.
    pub fn state(&self) -> LockState {
        if self.receive.is_some() && self.transmit.is_some() {
            LockState::Active
        } else {
            LockState::Idle
        }
    }

    /// Obtains the receive-hold, then the transmit-hold.
    ///
    /// No-op success when already `Active`.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::ReceiveHoldDenied`] or
    /// [`LockError::TransmitHoldDenied`].  In both cases the manager is left
    /// `Idle` with nothing held.
    pub fn acquire(&mut self) -> Result<(), LockError> {
        if self.state() == LockState::Active {
            debug!("holds already active");
            return Ok(());
        }
        // A half-held state cannot survive a previous call, but clear it
        // anyway so the result is exactly two fresh handles.
        self.release();

        let receive = self
            .platform
            .acquire(HoldKind::Receive, &self.tags.receive)
            .map_err(|e| LockError::ReceiveHoldDenied(e.0))?;

        let transmit = match self.platform.acquire(HoldKind::Transmit, &self.tags.transmit) {
            Ok(handle) => handle,
            Err(e) => {
                warn!("transmit hold denied ({e}); rolling back receive hold");
                self.release_one(receive);
                return Err(LockError::TransmitHoldDenied(e.0));
            }
        };

        self.receive = Some(receive);
        self.transmit = Some(transmit);
        info!(
            receive_tag = %self.tags.receive,
            transmit_tag = %self.tags.transmit,
            "network holds acquired"
        );
        Ok(())
    }

    /// Releases whichever holds are present and returns to `Idle`.
    ///
    /// Always succeeds.  Platform release failures are logged and dropped so
    /// that this can run from any teardown or error-recovery path.
    pub fn release(&mut self) {
        let held = [self.receive.take(), self.transmit.take()];
        if held.iter().all(Option::is_none) {
            return;
        }
        for handle in held.into_iter().flatten() {
            self.release_one(handle);
        }
        info!("network holds released");
    }

    fn release_one(&self, handle: HoldHandle) {
        if let Err(e) = self.platform.release(handle) {
            warn!(kind = %handle.kind, "failed to release {} hold: {e}", handle.kind);
        }
    }
}

impl Drop for ResourceLockManager {
    fn drop(&mut self) {
        self.release();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
