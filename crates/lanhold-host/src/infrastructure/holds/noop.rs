//! Hold platform for targets without a power-management concept.
//!
//! Desktop and server operating systems do not suspend broadcast traffic, so
//! there is nothing to hold.  Every request is granted with a fresh handle,
//! which keeps the `ResourceLockManager` state machine identical to a device
//! that does have holds.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;

use super::{HoldHandle, HoldKind, HoldPlatform, PlatformError};

/// Grants every hold and forgets it on release.
#[derive(Debug, Default)]
pub struct NoopHoldPlatform {
    next_id: AtomicU64,
}

impl NoopHoldPlatform {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HoldPlatform for NoopHoldPlatform {
    fn acquire(&self, kind: HoldKind, tag: &str) -> Result<HoldHandle, PlatformError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(%kind, tag, id, "granting no-op hold");
        Ok(HoldHandle { kind, id })
    }

    fn release(&self, handle: HoldHandle) -> Result<(), PlatformError> {
        debug!(kind = %handle.kind, id = handle.id, "releasing no-op hold");
        Ok(())
    }
}
