//! Lock and channel lifecycles.
//!
//! ```text
//! ResourceLockManager:   Idle ──acquire──► Active ──release──► Idle
//!                                                 (release from Idle is a no-op)
//!
//! BroadcastChannel:      Closed ──open(ok)──► Open ──close──► Closed
//!                        Closed ──open(err)─► Closed
//!                        Open   ──send──────► Open
//!                        Closed ──close─────► Closed
//! ```
//!
//! A channel is only ever `Open` while its lock manager is `Active`.

use std::time::Duration;

use thiserror::Error;

/// State of the two platform power holds, taken together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    /// Neither hold is held.
    #[default]
    Idle,
    /// Both the receive-hold and the transmit-hold are held.
    Active,
}

/// State of the outbound broadcast socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    /// No socket exists.
    #[default]
    Closed,
    /// A socket is bound and both holds are active.
    Open,
}

/// The platform refused one of the power holds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LockError {
    /// The receive-side (multicast) hold was denied.
    #[error("receive hold denied: {0}")]
    ReceiveHoldDenied(String),
    /// The transmit-side (high-performance radio) hold was denied.
    #[error("transmit hold denied: {0}")]
    TransmitHoldDenied(String),
}

/// Error type for `BroadcastChannel::open`.
#[derive(Debug, Error)]
pub enum OpenError {
    /// The lock manager could not reach `Active`; no socket was created.
    #[error("network holds unavailable: {0}")]
    LockUnavailable(#[source] LockError),
    /// The holds were acquired but the socket could not be created.  The
    /// holds have already been released again when this is returned.
    #[error("failed to bind broadcast socket: {0}")]
    SocketBindFailed(#[source] std::io::Error),
}

/// Error type for one dispatched send.
#[derive(Debug, Error)]
pub enum SendError {
    /// The channel was never opened, or has been closed.
    #[error("broadcast channel is not open")]
    NotOpen,
    /// The destination address did not resolve to a usable socket address.
    #[error("could not resolve destination {address}: {reason}")]
    AddressResolutionFailed {
        /// The address exactly as the caller supplied it.
        address: String,
        /// Why resolution failed.
        reason: String,
    },
    /// The socket rejected the datagram.
    #[error("transmission failed: {0}")]
    Io(#[source] std::io::Error),
    /// The send did not complete within the configured bound.
    #[error("send did not complete within {0:?}")]
    TimedOut(Duration),
    /// The worker executing the send was torn down before it reported back.
    #[error("send was abandoned before completion")]
    Abandoned,
}

impl SendError {
    /// `true` for lifecycle misuse (send while closed) as opposed to a
    /// failure of the transmission itself.
    pub fn is_not_open(&self) -> bool {
        matches!(self, SendError::NotOpen)
    }
}
