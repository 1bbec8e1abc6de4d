//! Control bridge: exposes the session's operations to the controlling
//! application.
//!
//! The host shell reads one JSON [`MethodCall`] per line and hands it to
//! [`dispatch`], which routes on the method name and always produces a
//! [`MethodResponse`] of the same shape:
//! `{ id, success, data, error: { code, message } }`.
//!
//! | method          | args                         | data on success      |
//! |-----------------|------------------------------|----------------------|
//! | `acquire`       | none                         | `null`               |
//! | `release`       | none                         | `null`               |
//! | `sendBroadcast` | `{ data, address, port }`    | `{ "bytesSent": n }` |
//!
//! Any other method name answers `NOT_IMPLEMENTED`.  A line that is not a
//! method call at all answers `INVALID_ARGS` with no id.
//!
//! [`dispatch`] is synchronous: `acquire`, `release`, and the dispatch half
//! of `sendBroadcast` take effect before it returns, so calls act on the
//! channel in the order they arrive.  Only a send's completion is deferred,
//! as [`Dispatched::Sending`].

use std::future::Future;
use std::pin::Pin;

use lanhold_core::protocol::messages::{METHOD_ACQUIRE, METHOD_RELEASE, METHOD_SEND_BROADCAST};
use lanhold_core::{
    ControlError, ErrorCode, MethodCall, MethodResponse, SendBroadcastArgs, SendBroadcastResult,
};
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::application::session::BroadcastSession;

type Completion = Pin<Box<dyn Future<Output = Result<usize, ControlError>> + Send + 'static>>;

/// Outcome of dispatching one call.
pub enum Dispatched {
    /// The call has finished; the response can be written now.
    Done(MethodResponse),
    /// A datagram is on its way; the response follows its completion.
    Sending { id: Option<u64>, completion: Completion },
}

impl Dispatched {
    /// Waits for a pending send, if any, and builds the response.
    pub async fn into_response(self) -> MethodResponse {
        match self {
            Dispatched::Done(resp) => resp,
            Dispatched::Sending { id, completion } => {
                let result = completion.await.and_then(|bytes_sent| {
                    serde_json::to_value(SendBroadcastResult { bytes_sent })
                        .map_err(|e| ControlError::new(ErrorCode::SendFailed, e.to_string()))
                });
                if let Err(e) = &result {
                    error!(?id, "sendBroadcast failed: {e}");
                }
                MethodResponse::from_result(id, result)
            }
        }
    }
}

/// Applies one call to `session` in arrival order.
pub fn dispatch(session: &BroadcastSession, call: MethodCall) -> Dispatched {
    let MethodCall { id, method, args } = call;
    debug!(?id, %method, "dispatching call");

    let result = match method.as_str() {
        METHOD_ACQUIRE => session.acquire().map(|()| Value::Null),
        METHOD_RELEASE => session.release().map(|()| Value::Null),
        METHOD_SEND_BROADCAST => {
            match SendBroadcastArgs::from_value(args)
                .and_then(|args| session.begin_send_broadcast(args))
            {
                Ok(completion) => {
                    return Dispatched::Sending {
                        id,
                        completion: Box::pin(completion),
                    }
                }
                Err(e) => Err(e),
            }
        }
        other => Err(ControlError::not_implemented(other)),
    };

    if let Err(e) = &result {
        error!(?id, %method, "call failed: {e}");
    }
    Dispatched::Done(MethodResponse::from_result(id, result))
}

/// Dispatches one call and waits for its response.
pub async fn handle(session: &BroadcastSession, call: MethodCall) -> MethodResponse {
    dispatch(session, call).into_response().await
}

/// Parses one input line.
///
/// # Errors
///
/// Returns a ready-to-write `INVALID_ARGS` response (with no id) when the
/// line is not a JSON method call.
pub fn parse_line(line: &str) -> Result<MethodCall, MethodResponse> {
    serde_json::from_str(line.trim()).map_err(|e| {
        MethodResponse::err(
            None,
            ControlError::invalid_args(format!("unreadable method call: {e}")),
        )
    })
}

/// Serializes a response as a single line (no trailing newline).
pub fn encode_response(response: &MethodResponse) -> String {
    serde_json::to_string(response).unwrap_or_else(|e| {
        error!("failed to encode response: {e}");
        json!({
            "id": response.id,
            "success": false,
            "data": null,
            "error": { "code": ErrorCode::SendFailed, "message": e.to_string() },
        })
        .to_string()
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session::{BroadcastPort, SendFuture};
    use lanhold_core::{ChannelState, OpenError, SendError, SendRequest};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    /// Port that opens unconditionally and reports every payload as sent.
    #[derive(Default)]
    struct EchoPort {
        open: AtomicBool,
    }

    impl BroadcastPort for EchoPort {
        fn open(&self) -> Result<(), OpenError> {
            self.open.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn close(&self) {
            self.open.store(false, Ordering::SeqCst);
        }

        fn state(&self) -> ChannelState {
            if self.open.load(Ordering::SeqCst) {
                ChannelState::Open
            } else {
                ChannelState::Closed
            }
        }

        fn send_datagram(&self, request: SendRequest) -> SendFuture {
            let result = if self.open.load(Ordering::SeqCst) {
                Ok(request.len())
            } else {
                Err(SendError::NotOpen)
            };
            Box::pin(std::future::ready(result))
        }
    }

    fn make_session() -> BroadcastSession {
        BroadcastSession::new(Arc::new(EchoPort::default()))
    }

    fn call(id: u64, method: &str, args: Value) -> MethodCall {
        MethodCall {
            id: Some(id),
            method: method.to_string(),
            args,
        }
    }

    #[tokio::test]
    async fn test_dispatch_acquire_succeeds_with_no_data() {
        // Arrange
        let session = make_session();

        // Act
        let resp = handle(&session, call(1, "acquire", Value::Null)).await;

        // Assert
        assert!(resp.success);
        assert_eq!(resp.id, Some(1));
        assert_eq!(resp.data, None);
        assert_eq!(session.state(), ChannelState::Open);
    }

    #[tokio::test]
    async fn test_dispatch_send_broadcast_reports_bytes_sent() {
        let session = make_session();
        handle(&session, call(1, "acquire", Value::Null)).await;

        let resp = handle(
            &session,
            call(
                2,
                "sendBroadcast",
                json!({ "data": [1, 2, 3], "address": "255.255.255.255", "port": 9000 }),
            ),
        )
        .await;

        assert!(resp.success);
        assert_eq!(resp.data, Some(json!({ "bytesSent": 3 })));
    }

    #[tokio::test]
    async fn test_dispatch_send_before_acquire_is_no_socket() {
        let session = make_session();

        let resp = handle(
            &session,
            call(
                3,
                "sendBroadcast",
                json!({ "data": [1], "address": "255.255.255.255", "port": 9000 }),
            ),
        )
        .await;

        assert!(!resp.success);
        assert_eq!(resp.error.unwrap().code, ErrorCode::NoSocket);
    }

    #[tokio::test]
    async fn test_dispatch_send_with_out_of_range_port_is_invalid_args() {
        let session = make_session();
        handle(&session, call(1, "acquire", Value::Null)).await;

        let resp = handle(
            &session,
            call(
                4,
                "sendBroadcast",
                json!({ "data": [1], "address": "255.255.255.255", "port": 70000 }),
            ),
        )
        .await;

        assert_eq!(resp.error.unwrap().code, ErrorCode::InvalidArgs);
    }

    #[tokio::test]
    async fn test_dispatch_release_twice_succeeds() {
        let session = make_session();
        handle(&session, call(1, "acquire", Value::Null)).await;

        let first = handle(&session, call(2, "release", Value::Null)).await;
        let second = handle(&session, call(3, "release", Value::Null)).await;

        assert!(first.success);
        assert!(second.success);
        assert_eq!(session.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_dispatch_unknown_method_is_not_implemented() {
        let session = make_session();

        let resp = handle(&session, call(9, "getBatteryLevel", Value::Null)).await;

        let err = resp.error.unwrap();
        assert_eq!(err.code, ErrorCode::NotImplemented);
        assert!(err.message.contains("getBatteryLevel"));
        assert_eq!(resp.id, Some(9));
    }

    #[tokio::test]
    async fn test_dispatch_applies_pipelined_calls_in_arrival_order() {
        // Arrange
        let session = make_session();

        // Act: nothing is awaited until every call has been dispatched.
        let acquired = dispatch(&session, call(1, "acquire", Value::Null));
        let sending = dispatch(
            &session,
            call(
                2,
                "sendBroadcast",
                json!({ "data": [7, 7], "address": "255.255.255.255", "port": 9000 }),
            ),
        );
        let released = dispatch(&session, call(3, "release", Value::Null));

        // Assert
        assert!(matches!(acquired, Dispatched::Done(ref r) if r.success));
        assert!(matches!(sending, Dispatched::Sending { id: Some(2), .. }));
        assert!(matches!(released, Dispatched::Done(ref r) if r.success));
        let resp = sending.into_response().await;
        assert_eq!(resp.data, Some(json!({ "bytesSent": 2 })));
        assert_eq!(session.state(), ChannelState::Closed);
    }

    #[test]
    fn test_dispatch_bad_send_args_finish_immediately() {
        let session = make_session();

        let out = dispatch(&session, call(4, "sendBroadcast", json!({ "data": "oops" })));

        match out {
            Dispatched::Done(resp) => {
                assert_eq!(resp.error.unwrap().code, ErrorCode::InvalidArgs)
            }
            Dispatched::Sending { .. } => panic!("invalid arguments must not dispatch a send"),
        }
    }

    #[test]
    fn test_encode_response_escapes_quotes_in_messages() {
        let resp = MethodResponse::err(
            Some(1),
            ControlError::invalid_args(r#"bad "port" value"#),
        );

        let line = encode_response(&resp);

        let parsed: MethodResponse = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, resp);
    }

    #[test]
    fn test_parse_line_reads_method_call() {
        let parsed =
            parse_line(r#"  {"id": 5, "method": "release"}  "#).expect("valid call must parse");

        assert_eq!(parsed.id, Some(5));
        assert_eq!(parsed.method, "release");
        assert_eq!(parsed.args, Value::Null);
    }

    #[test]
    fn test_parse_line_rejects_garbage_with_invalid_args() {
        let resp = parse_line("acquire please").unwrap_err();

        assert!(!resp.success);
        assert_eq!(resp.id, None);
        assert_eq!(resp.error.unwrap().code, ErrorCode::InvalidArgs);
    }

    #[test]
    fn test_encode_response_is_single_line_with_wire_code() {
        let resp = MethodResponse::err(Some(2), ControlError::not_implemented("x"));

        let line = encode_response(&resp);

        assert!(!line.contains('\n'));
        assert!(line.contains(r#""code":"NOT_IMPLEMENTED""#));
        assert!(line.contains(r#""id":2"#));
    }
}
