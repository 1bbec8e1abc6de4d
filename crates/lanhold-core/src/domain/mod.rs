//! Domain entities for LanHold.
//!
//! Pure value types with no infrastructure dependencies.  The infrastructure
//! layer (power holds, sockets) and the application layer (the session
//! controller) both depend on these types; they never depend back.

/// Lock and channel state machines and their error types.
pub mod lifecycle;

/// The `SendRequest` value object and its validation rules.
pub mod request;
