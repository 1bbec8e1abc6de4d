//! Network infrastructure for the host.
//!
//! # Sub-modules
//!
//! - **`broadcast_channel`** – Owns the outbound UDP socket and the
//!   `ResourceLockManager` it depends on.  Opens under both power holds,
//!   dispatches sends onto the runtime, and tears everything down on close.
//!
//! - **`resolve`** – Turns the caller's textual destination into a socket
//!   address of the same family as the bound socket.

pub mod broadcast_channel;
pub mod resolve;

pub use broadcast_channel::{BroadcastChannel, ChannelConfig, PendingSend};
