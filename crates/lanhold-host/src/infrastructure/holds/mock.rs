//! Fault-injecting hold platform for tests.
//!
//! Allows tests to deny either hold, fail releases, and observe exactly which
//! holds are outstanding, without a real power-management subsystem.

use std::collections::HashSet;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Mutex, PoisonError,
};

use super::{HoldHandle, HoldKind, HoldPlatform, PlatformError};

/// A [`HoldPlatform`] whose behaviour is scripted by the test.
///
/// Cloning is not supported; share it behind an `Arc` and keep a second
/// `Arc` in the test to inspect it.
#[derive(Debug, Default)]
pub struct ScriptedHoldPlatform {
    deny_receive: AtomicBool,
    deny_transmit: AtomicBool,
    fail_release: AtomicBool,
    next_id: AtomicU64,
    acquire_calls: AtomicUsize,
    release_calls: AtomicUsize,
    outstanding: Mutex<HashSet<HoldHandle>>,
}

impl ScriptedHoldPlatform {
    /// Creates a platform that grants everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes subsequent receive-hold requests fail.
    pub fn deny_receive(&self, deny: bool) {
        self.deny_receive.store(deny, Ordering::SeqCst);
    }

    /// Makes subsequent transmit-hold requests fail.
    pub fn deny_transmit(&self, deny: bool) {
        self.deny_transmit.store(deny, Ordering::SeqCst);
    }

    /// Makes subsequent releases report failure.  The hold is still dropped
    /// from the outstanding set, as a real platform would have lost it.
    pub fn fail_release(&self, fail: bool) {
        self.fail_release.store(fail, Ordering::SeqCst);
    }

    /// Number of holds granted and not yet released.
    pub fn outstanding(&self) -> usize {
        self.holds().len()
    }

    /// `true` if a hold of `kind` is currently outstanding.
    pub fn is_held(&self, kind: HoldKind) -> bool {
        self.holds().iter().any(|h| h.kind == kind)
    }

    /// Total `acquire` calls, granted or denied.
    pub fn acquire_calls(&self) -> usize {
        self.acquire_calls.load(Ordering::SeqCst)
    }

    /// Total `release` calls, successful or not.
    pub fn release_calls(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    fn holds(&self) -> std::sync::MutexGuard<'_, HashSet<HoldHandle>> {
        self.outstanding.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl HoldPlatform for ScriptedHoldPlatform {
    fn acquire(&self, kind: HoldKind, tag: &str) -> Result<HoldHandle, PlatformError> {
        self.acquire_calls.fetch_add(1, Ordering::SeqCst);
        let denied = match kind {
            HoldKind::Receive => self.deny_receive.load(Ordering::SeqCst),
            HoldKind::Transmit => self.deny_transmit.load(Ordering::SeqCst),
        };
        if denied {
            return Err(PlatformError(format!("{kind} hold '{tag}' denied by script")));
        }
        let handle = HoldHandle {
            kind,
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        self.holds().insert(handle);
        Ok(handle)
    }

    fn release(&self, handle: HoldHandle) -> Result<(), PlatformError> {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
        let was_held = self.holds().remove(&handle);
        if self.fail_release.load(Ordering::SeqCst) {
            return Err(PlatformError(format!("{} hold release failed by script", handle.kind)));
        }
        if !was_held {
            return Err(PlatformError(format!("{} hold {} not held", handle.kind, handle.id)));
        }
        Ok(())
    }
}
