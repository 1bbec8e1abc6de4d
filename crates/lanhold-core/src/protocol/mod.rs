//! Control protocol: error codes and the JSON method-call envelope.

pub mod codes;
pub mod messages;

pub use codes::{ControlError, ErrorCode};
pub use messages::{MethodCall, MethodResponse, SendBroadcastArgs, SendBroadcastResult};
