//! JSON envelope for the host control surface.
//!
//! The controlling application talks to the host one method call at a time.
//! Each call names a method and carries an untyped `args` object; each
//! response says whether the call succeeded and carries either `data` or an
//! `error{code, message}`.
//!
//! ```json
//! {"id":1,"method":"acquire"}
//! {"id":1,"success":true,"data":null,"error":null}
//!
//! {"id":2,"method":"sendBroadcast","args":{"data":[1,2,3],"address":"255.255.255.255","port":9000}}
//! {"id":2,"success":true,"data":{"bytesSent":3},"error":null}
//!
//! {"id":3,"method":"sendBroadcast","args":{"data":null,"address":"255.255.255.255","port":9000}}
//! {"id":3,"success":false,"data":null,"error":{"code":"INVALID_ARGS","message":"missing argument 'data'"}}
//! ```
//!
//! `id` is optional; when present it is echoed so that responses arriving out
//! of order (a slow send overtaken by a release) can be matched up.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::codes::ControlError;
use crate::domain::request::SendRequest;

/// Method name that acquires the holds and opens the channel.
pub const METHOD_ACQUIRE: &str = "acquire";
/// Method name that closes the channel and releases the holds.
pub const METHOD_RELEASE: &str = "release";
/// Method name that dispatches one broadcast datagram.
pub const METHOD_SEND_BROADCAST: &str = "sendBroadcast";

/// One inbound call from the controlling application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// Caller-chosen correlation id, echoed in the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Method name, e.g. `"sendBroadcast"`.
    pub method: String,
    /// Method arguments; `null` when the method takes none.
    #[serde(default)]
    pub args: Value,
}

/// The reply to one [`MethodCall`].
///
/// Always has the same shape so the caller can inspect `success` without
/// guarding against a missing field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodResponse {
    pub id: Option<u64>,
    pub success: bool,
    pub data: Option<Value>,
    pub error: Option<ControlError>,
}

impl MethodResponse {
    pub fn ok(id: Option<u64>, data: Value) -> Self {
        Self {
            id,
            success: true,
            data: if data.is_null() { None } else { Some(data) },
            error: None,
        }
    }

    pub fn err(id: Option<u64>, error: ControlError) -> Self {
        Self {
            id,
            success: false,
            data: None,
            error: Some(error),
        }
    }

    pub fn from_result(id: Option<u64>, result: Result<Value, ControlError>) -> Self {
        match result {
            Ok(data) => Self::ok(id, data),
            Err(e) => Self::err(id, e),
        }
    }
}

/// Arguments of `sendBroadcast`.
///
/// Every field is optional at the serde level so that a missing or `null`
/// argument is reported as `INVALID_ARGS` naming the argument, rather than as
/// an opaque deserialization failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendBroadcastArgs {
    #[serde(default)]
    pub data: Option<Vec<u8>>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub port: Option<i64>,
}

impl SendBroadcastArgs {
    /// Decodes the untyped `args` object of a call.
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGS` when `args` is not an object of the expected
    /// shape (e.g. `data` is not an array of bytes).
    pub fn from_value(args: Value) -> Result<Self, ControlError> {
        if args.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(args)
            .map_err(|e| ControlError::invalid_args(format!("malformed sendBroadcast arguments: {e}")))
    }

    /// Checks that every argument is present and converts to a validated
    /// [`SendRequest`].
    ///
    /// # Errors
    ///
    /// Returns `INVALID_ARGS` for a missing argument, a blank address, or a
    /// port outside `1..=65535`.
    pub fn into_request(self) -> Result<SendRequest, ControlError> {
        let data = self.data.ok_or_else(|| missing("data"))?;
        let address = self.address.ok_or_else(|| missing("address"))?;
        let port = self.port.ok_or_else(|| missing("port"))?;
        Ok(SendRequest::from_parts(data, address, port)?)
    }
}

/// Success payload of `sendBroadcast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBroadcastResult {
    pub bytes_sent: usize,
}

fn missing(name: &str) -> ControlError {
    ControlError::invalid_args(format!("missing argument '{name}'"))
}
