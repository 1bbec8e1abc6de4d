//! Platform power holds.
//!
//! Some radio stacks drop inbound multicast and throttle outbound broadcast
//! traffic while the device is in a power-saving state.  The platform lets an
//! application opt out for as long as it holds two capability tokens:
//!
//! - a **receive hold**, which keeps inbound multicast/broadcast delivery on;
//! - a **transmit hold**, which keeps the radio in its high-performance mode.
//!
//! The host never talks to a power-management subsystem directly.  It sees
//! only the [`HoldPlatform`] trait: "acquire a hold of this kind" and
//! "release this hold".  [`ResourceLockManager`] builds the all-or-nothing
//! acquire/release state machine on top of it.
//!
//! # Implementations
//!
//! - [`noop::NoopHoldPlatform`] – for targets with no such OS concept.  It
//!   always grants and the state machine behaves exactly as on a real device.
//! - [`mock::ScriptedHoldPlatform`] – a fault-injecting double that can deny
//!   either hold or fail releases, and counts what is currently held.

use std::fmt;

use thiserror::Error;

pub mod lock_manager;
pub mod mock;
pub mod noop;

pub use lock_manager::ResourceLockManager;

/// Which of the two holds a handle refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HoldKind {
    /// Inbound multicast delivery.
    Receive,
    /// High-performance radio mode for outbound traffic.
    Transmit,
}

impl fmt::Display for HoldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HoldKind::Receive => f.write_str("receive"),
            HoldKind::Transmit => f.write_str("transmit"),
        }
    }
}

/// Opaque token for one granted hold.  Handing it back to
/// [`HoldPlatform::release`] ends the hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HoldHandle {
    pub kind: HoldKind,
    pub id: u64,
}

/// The platform refused or failed a hold operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PlatformError(pub String);

/// Abstraction over the platform power-management subsystem.
///
/// Holds are not reference counted: acquiring the same kind twice yields two
/// independent handles, and the caller is expected to keep at most one.
#[cfg_attr(test, mockall::automock)]
pub trait HoldPlatform: Send + Sync {
    /// Requests a hold of `kind`, labelled `tag` for platform diagnostics.
    fn acquire(&self, kind: HoldKind, tag: &str) -> Result<HoldHandle, PlatformError>;

    /// Ends a previously granted hold.
    fn release(&self, handle: HoldHandle) -> Result<(), PlatformError>;
}
