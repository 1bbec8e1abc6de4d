//! BroadcastSession: the control surface offered to the controlling application.
//!
//! A session owns exactly one broadcast port (in production, a
//! `BroadcastChannel` with its `ResourceLockManager`) for its whole lifetime.
//! It translates the three external operations onto the port and every
//! failure onto a [`ControlError`]:
//!
//! ```text
//! acquire()        ──► port.open()           OpenError  ──► ACQUIRE_FAILED
//! release()        ──► port.close()          (never fails)
//! sendBroadcast()  ──► validate args         RequestError ► INVALID_ARGS
//!                  ──► port.send_datagram()  NotOpen    ──► NO_SOCKET
//!                                            other      ──► SEND_FAILED
//! shutdown()/drop  ──► port.close()          exactly once per session
//! ```
//!
//! Every operation, including the dispatch half of `sendBroadcast`, runs on
//! the caller's context in call order.  Only the completion of a send is
//! delivered later, through the returned [`SendFuture`].
//!
//! The port is injected rather than created here, so the session can be
//! driven against a recording port in tests and there is no process-wide
//! channel state.

use std::future::Future;
use std::pin::Pin;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use lanhold_core::{
    ChannelState, ControlError, ErrorCode, OpenError, SendBroadcastArgs, SendError, SendRequest,
};
use tracing::{info, warn};

/// Completion of one dispatched datagram.
pub type SendFuture = Pin<Box<dyn Future<Output = Result<usize, SendError>> + Send + 'static>>;

/// The outbound broadcast channel as seen by the session.
///
/// The infrastructure implementation binds a UDP socket under two power
/// holds; test implementations record calls.
pub trait BroadcastPort: Send + Sync {
    /// Acquires the holds and binds the socket.  Idempotent while open.
    fn open(&self) -> Result<(), OpenError>;

    /// Closes the socket and releases the holds.  Idempotent; never fails.
    fn close(&self);

    /// Current channel state.
    fn state(&self) -> ChannelState;

    /// Dispatches one datagram before returning.  The future only reports
    /// the outcome; dropping it does not cancel the send.
    fn send_datagram(&self, request: SendRequest) -> SendFuture;
}

/// One controlling-application session.
pub struct BroadcastSession {
    port: Arc<dyn BroadcastPort>,
    shut_down: AtomicBool,
}

impl BroadcastSession {
    pub fn new(port: Arc<dyn BroadcastPort>) -> Self {
        Self {
            port,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Acquires both holds and opens the channel.
    ///
    /// # Errors
    ///
    /// `ACQUIRE_FAILED` when a hold is denied, the socket cannot be bound, or
    /// the session has already shut down.
    pub fn acquire(&self) -> Result<(), ControlError> {
        if self.is_shut_down() {
            return Err(ControlError::new(
                ErrorCode::AcquireFailed,
                "session has shut down",
            ));
        }
        self.port.open().map_err(|e| {
            warn!("acquire failed: {e}");
            ControlError::from(e)
        })
    }

    /// Closes the channel and releases both holds.  Always succeeds.
    pub fn release(&self) -> Result<(), ControlError> {
        self.port.close();
        Ok(())
    }

    /// Validates the arguments and dispatches one broadcast datagram before
    /// returning.  The returned future yields the byte count.
    ///
    /// # Errors
    ///
    /// `INVALID_ARGS` for missing or out-of-range arguments, immediately.
    /// The future fails with `NO_SOCKET` when the channel is not open and
    /// `SEND_FAILED` for resolution or transmission failures.
    pub fn begin_send_broadcast(
        &self,
        args: SendBroadcastArgs,
    ) -> Result<impl Future<Output = Result<usize, ControlError>> + Send + 'static, ControlError>
    {
        let request = args.into_request()?;
        let pending = self.port.send_datagram(request);
        Ok(async move { pending.await.map_err(ControlError::from) })
    }

    /// Dispatches one broadcast datagram and waits for the outcome.
    ///
    /// # Errors
    ///
    /// See [`begin_send_broadcast`](Self::begin_send_broadcast).
    pub async fn send_broadcast(&self, args: SendBroadcastArgs) -> Result<usize, ControlError> {
        self.begin_send_broadcast(args)?.await
    }

    pub fn state(&self) -> ChannelState {
        self.port.state()
    }

    /// Ends the session: closes the channel exactly once, whether or not it
    /// was ever opened.  Later calls are no-ops.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.port.close();
        info!("session shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }
}

impl Drop for BroadcastSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lanhold_core::LockError;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    // ── Test doubles ──────────────────────────────────────────────────────────

    #[derive(Default)]
    struct RecordingPort {
        open: AtomicBool,
        open_calls: AtomicUsize,
        close_calls: AtomicUsize,
        sent: Mutex<Vec<SendRequest>>,
        deny_open: bool,
        fail_sends: bool,
    }

    impl BroadcastPort for RecordingPort {
        fn open(&self) -> Result<(), OpenError> {
            self.open_calls.fetch_add(1, Ordering::SeqCst);
            if self.deny_open {
                return Err(OpenError::LockUnavailable(LockError::ReceiveHoldDenied(
                    "injected".to_string(),
                )));
            }
            self.open.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn close(&self) {
            self.close_calls.fetch_add(1, Ordering::SeqCst);
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
            let result = if !self.open.load(Ordering::SeqCst) {
                Err(SendError::NotOpen)
            } else if self.fail_sends {
                Err(SendError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "injected",
                )))
            } else {
                let len = request.len();
                self.sent.lock().unwrap().push(request);
                Ok(len)
            };
            Box::pin(std::future::ready(result))
        }
    }

    fn args(data: Option<Vec<u8>>, address: &str, port: i64) -> SendBroadcastArgs {
        SendBroadcastArgs {
            data,
            address: Some(address.to_string()),
            port: Some(port),
        }
    }

    // ── Control surface ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_acquire_then_send_reports_bytes_sent() {
        // Arrange
        let port = Arc::new(RecordingPort::default());
        let session = BroadcastSession::new(port.clone());

        // Act
        session.acquire().unwrap();
        let sent = session
            .send_broadcast(args(Some(vec![1, 2, 3]), "255.255.255.255", 9000))
            .await;

        // Assert
        assert_eq!(sent, Ok(3));
        assert_eq!(port.sent.lock().unwrap()[0].port(), 9000);
    }

    #[tokio::test]
    async fn test_send_before_acquire_is_no_socket() {
        let session = BroadcastSession::new(Arc::new(RecordingPort::default()));

        let err = session
            .send_broadcast(args(Some(vec![1]), "255.255.255.255", 9000))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::NoSocket);
    }

    #[tokio::test]
    async fn test_send_with_null_data_is_invalid_args_and_reaches_no_port() {
        // Arrange
        let port = Arc::new(RecordingPort::default());
        let session = BroadcastSession::new(port.clone());
        session.acquire().unwrap();

        // Act
        let err = session
            .send_broadcast(args(None, "255.255.255.255", 9000))
            .await
            .unwrap_err();

        // Assert
        assert_eq!(err.code, ErrorCode::InvalidArgs);
        assert!(port.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_send_after_release_is_no_socket() {
        let session = BroadcastSession::new(Arc::new(RecordingPort::default()));
        session.acquire().unwrap();
        session.release().unwrap();

        let err = session
            .send_broadcast(args(Some(vec![1]), "255.255.255.255", 9000))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::NoSocket);
    }

    #[tokio::test]
    async fn test_transmission_failure_is_send_failed_and_channel_stays_open() {
        let port = Arc::new(RecordingPort {
            fail_sends: true,
            ..Default::default()
        });
        let session = BroadcastSession::new(port.clone());
        session.acquire().unwrap();

        let err = session
            .send_broadcast(args(Some(vec![1]), "10.0.0.255", 9000))
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::SendFailed);
        assert_eq!(session.state(), ChannelState::Open);
    }

    #[test]
    fn test_acquire_denied_is_acquire_failed() {
        let port = Arc::new(RecordingPort {
            deny_open: true,
            ..Default::default()
        });
        let session = BroadcastSession::new(port);

        let err = session.acquire().unwrap_err();

        assert_eq!(err.code, ErrorCode::AcquireFailed);
        assert!(err.message.contains("receive hold denied"));
        assert_eq!(session.state(), ChannelState::Closed);
    }

    #[test]
    fn test_release_twice_succeeds_both_times() {
        let session = BroadcastSession::new(Arc::new(RecordingPort::default()));
        session.acquire().unwrap();

        assert_eq!(session.release(), Ok(()));
        assert_eq!(session.release(), Ok(()));
        assert_eq!(session.state(), ChannelState::Closed);
    }

    #[tokio::test]
    async fn test_begin_send_dispatches_before_the_result_is_awaited() {
        // Arrange
        let port = Arc::new(RecordingPort::default());
        let session = BroadcastSession::new(port.clone());
        session.acquire().unwrap();

        // Act
        let pending = session
            .begin_send_broadcast(args(Some(vec![4, 5]), "10.0.0.255", 9000))
            .unwrap();
        session.release().unwrap();

        // Assert: the datagram left while the channel was still open.
        assert_eq!(port.sent.lock().unwrap().len(), 1);
        assert_eq!(pending.await, Ok(2));
    }

    #[test]
    fn test_begin_send_rejects_bad_args_without_dispatching() {
        let port = Arc::new(RecordingPort::default());
        let session = BroadcastSession::new(port.clone());
        session.acquire().unwrap();

        let err = session
            .begin_send_broadcast(args(Some(vec![1]), "10.0.0.255", 0))
            .err()
            .unwrap();

        assert_eq!(err.code, ErrorCode::InvalidArgs);
        assert!(port.sent.lock().unwrap().is_empty());
    }

    // ── Teardown ──────────────────────────────────────────────────────────────

    #[test]
    fn test_shutdown_closes_exactly_once_even_if_never_opened() {
        // Arrange
        let port = Arc::new(RecordingPort::default());
        let session = BroadcastSession::new(port.clone());

        // Act
        session.shutdown();
        session.shutdown();
        drop(session);

        // Assert
        assert_eq!(port.close_calls.load(Ordering::SeqCst), 1);
        assert_eq!(port.open_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_closes_open_channel() {
        let port = Arc::new(RecordingPort::default());
        let session = BroadcastSession::new(port.clone());
        session.acquire().unwrap();

        drop(session);

        assert_eq!(port.state(), ChannelState::Closed);
        assert_eq!(port.close_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_acquire_after_shutdown_is_refused() {
        let port = Arc::new(RecordingPort::default());
        let session = BroadcastSession::new(port.clone());
        session.shutdown();

        let err = session.acquire().unwrap_err();

        assert_eq!(err.code, ErrorCode::AcquireFailed);
        assert_eq!(port.open_calls.load(Ordering::SeqCst), 0);
    }
}
