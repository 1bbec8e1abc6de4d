//! Application layer use cases for the host.
//!
//! Use cases in this layer orchestrate the domain types to fulfil a request
//! from the controlling application, depend only on traits, and contain no
//! OS calls, socket I/O, or file system access.
//!
//! # Sub-modules
//!
//! - **`session`** – The three-operation control surface (`acquire`,
//!   `release`, `sendBroadcast`) over one injected broadcast port, plus the
//!   exactly-once teardown that runs when the session ends.

pub mod session;
