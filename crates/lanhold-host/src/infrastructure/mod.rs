//! Infrastructure layer for the host.
//!
//! Contains OS-facing adapters: platform power holds, the outbound broadcast
//! socket, configuration file storage, and the method-call bridge that the
//! controlling application talks to.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `lanhold_core`, but MUST NOT be imported by the `application` layer.

pub mod control_bridge;
pub mod holds;
pub mod network;
pub mod storage;
