//! # lanhold-core
//!
//! Shared library for LanHold containing the domain entities, the lifecycle
//! error taxonomy, and the JSON control protocol spoken by the host shell.
//!
//! This crate has zero dependencies on OS APIs, power-management platforms,
//! or network sockets.
//!
//! # Architecture overview
//!
//! LanHold keeps a local-network broadcast channel usable on devices whose
//! radio would otherwise throttle broadcast traffic to save power.  A
//! controlling application asks the host to *acquire* the channel (two
//! platform power holds plus one outbound UDP socket), *send* broadcast
//! datagrams through it, and *release* it again.
//!
//! - **`domain`** – The value objects and state enums that describe a send
//!   request and the lock/channel lifecycles, together with the errors each
//!   lifecycle step can produce.
//!
//! - **`protocol`** – The data shape of the control surface: method calls in,
//!   `{success, data, error{code, message}}` responses out, and the mapping
//!   from every domain error onto a stable wire error code.

pub mod domain;
pub mod protocol;

pub use domain::lifecycle::{ChannelState, LockError, LockState, OpenError, SendError};
pub use domain::request::{RequestError, SendRequest};
pub use protocol::codes::{ControlError, ErrorCode};
pub use protocol::messages::{MethodCall, MethodResponse, SendBroadcastArgs, SendBroadcastResult};
