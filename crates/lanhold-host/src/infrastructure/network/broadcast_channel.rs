//! BroadcastChannel: the outbound broadcast socket and its power holds.
//!
//! The channel owns one [`ResourceLockManager`] and, while open, one UDP
//! socket bound to an ephemeral port with `SO_BROADCAST` and `SO_REUSEADDR`
//! set.  The socket exists only while both holds are active:
//!
//! 1. `open()` acquires the holds, then binds.  If binding fails the holds
//!    are released again before the error is returned.
//! 2. `send()` captures the socket under the channel lock, spawns the
//!    transmission on the runtime captured at `open()`, and hands back a
//!    [`PendingSend`] immediately.  The datagram is on its way whether or
//!    not the caller ever polls the future.
//! 3. `close()` drops the channel's socket reference and releases the holds.
//!
//! # In-flight sends at close
//!
//! Sends already dispatched are allowed to drain.  Each one holds its own
//! reference to the socket, so it completes (or times out) against a valid
//! descriptor; the descriptor is closed when the last reference goes.  A
//! send issued after `close()` observes [`SendError::NotOpen`].  Every send
//! is bounded by [`ChannelConfig::send_timeout`], so none stays pending.

use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use lanhold_core::{ChannelState, LockState, OpenError, SendError, SendRequest};
use socket2::{Domain, Protocol, Socket, Type};
use tokio::{net::UdpSocket, runtime::Handle, sync::oneshot};
use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use super::resolve::resolve_destination;
use crate::application::session::{BroadcastPort, SendFuture};
use crate::infrastructure::holds::ResourceLockManager;

/// Socket-level settings for the channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Local address to bind.  Only the family and interface matter; the
    /// port is always chosen by the system.
    pub bind_address: IpAddr,
    /// Upper bound on one dispatched send, resolution included.
    pub send_timeout: Duration,
    /// Whether non-literal destinations go through the system resolver.
    pub resolve_hostnames: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            send_timeout: Duration::from_secs(5),
            resolve_hostnames: false,
        }
    }
}

/// The bound socket plus what a send needs to use it off-thread.
struct OpenSocket {
    socket: Arc<UdpSocket>,
    local_addr: SocketAddr,
    runtime: Handle,
}

struct Inner {
    locks: ResourceLockManager,
    socket: Option<OpenSocket>,
}

/// Exclusive owner of one outbound broadcast socket.
pub struct BroadcastChannel {
    config: ChannelConfig,
    inner: Mutex<Inner>,
}

impl BroadcastChannel {
    /// Creates a `Closed` channel over `locks`.
    pub fn new(locks: ResourceLockManager, config: ChannelConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner {
                locks,
                socket: None,
            }),
        }
    }

    pub fn state(&self) -> ChannelState {
        if self.lock().socket.is_some() {
            ChannelState::Open
        } else {
            ChannelState::Closed
        }
    }

    /// State of the underlying power holds.
    pub fn lock_state(&self) -> LockState {
        self.lock().locks.state()
    }

    /// The system-assigned local address while open.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.lock().socket.as_ref().map(|s| s.local_addr)
    }

    /// Acquires both holds, then binds the socket.  No-op while open.
    ///
    /// Must be called from within a Tokio runtime; sends are spawned onto
    /// that runtime.
    ///
    /// # Errors
    ///
    /// [`OpenError::LockUnavailable`] if a hold is denied (no socket is
    /// created); [`OpenError::SocketBindFailed`] if the socket cannot be set
    /// up (the holds are released first).
    pub fn open(&self) -> Result<(), OpenError> {
        let mut inner = self.lock();
        if inner.socket.is_some() {
            debug!("broadcast channel already open");
            return Ok(());
        }

        inner.locks.acquire().map_err(OpenError::LockUnavailable)?;

        match bind_broadcast_socket(self.config.bind_address) {
            Ok(open) => {
                info!(local_addr = %open.local_addr, "broadcast channel open");
                inner.socket = Some(open);
                Ok(())
            }
            Err(e) => {
                warn!("broadcast socket setup failed: {e}; releasing holds");
                inner.locks.release();
                Err(OpenError::SocketBindFailed(e))
            }
        }
    }

    /// Dispatches one datagram without waiting for it.
    ///
    /// The returned future resolves with the number of bytes sent, or with
    /// [`SendError::NotOpen`] straight away if the channel is closed.
    pub fn send(&self, request: SendRequest) -> PendingSend {
        let (socket, local_addr, runtime) = match self.lock().socket.as_ref() {
            Some(open) => (Arc::clone(&open.socket), open.local_addr, open.runtime.clone()),
            None => return PendingSend::ready(Err(SendError::NotOpen)),
        };

        let timeout = self.config.send_timeout;
        let resolve_hostnames = self.config.resolve_hostnames;
        let span = tracing::debug_span!(
            "send",
            id = %Uuid::new_v4(),
            dest = %request.address(),
            port = request.port()
        );
        let (tx, rx) = oneshot::channel();

        runtime.spawn(
            async move {
                // An expired deadline wins over a transmission that becomes
                // ready in the same poll.
                let outcome = tokio::select! {
                    biased;
                    () = tokio::time::sleep(timeout) => Err(SendError::TimedOut(timeout)),
                    sent = transmit(&socket, local_addr, &request, resolve_hostnames) => sent,
                };

                match &outcome {
                    Ok(n) => debug!(bytes = n, "datagram sent"),
                    Err(e) => debug!("datagram not sent: {e}"),
                }
                // The caller may have dropped the future; the result is then
                // only logged.
                let _ = tx.send(outcome);
            }
            .instrument(span),
        );

        PendingSend::waiting(rx)
    }

    /// Closes the socket and releases both holds.  Idempotent; never fails.
    pub fn close(&self) {
        let mut inner = self.lock();
        if let Some(open) = inner.socket.take() {
            let in_flight = Arc::strong_count(&open.socket) - 1;
            drop(open);
            info!(in_flight, "broadcast channel closed");
        }
        inner.locks.release();
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl BroadcastPort for BroadcastChannel {
    fn open(&self) -> Result<(), OpenError> {
        BroadcastChannel::open(self)
    }

    fn close(&self) {
        BroadcastChannel::close(self)
    }

    fn state(&self) -> ChannelState {
        BroadcastChannel::state(self)
    }

    fn send_datagram(&self, request: SendRequest) -> SendFuture {
        Box::pin(self.send(request))
    }
}

/// Creates the ephemeral-port broadcast socket and registers it with the
/// current runtime.
fn bind_broadcast_socket(bind_ip: IpAddr) -> io::Result<OpenSocket> {
    let runtime = Handle::try_current().map_err(|e| io::Error::other(e.to_string()))?;

    let addr = SocketAddr::new(bind_ip, 0);
    let socket = Socket::new(Domain::for_address(addr), Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;

    let std_socket: std::net::UdpSocket = socket.into();
    let socket = {
        let _guard = runtime.enter();
        UdpSocket::from_std(std_socket)?
    };
    let local_addr = socket.local_addr()?;

    Ok(OpenSocket {
        socket: Arc::new(socket),
        local_addr,
        runtime,
    })
}

async fn transmit(
    socket: &UdpSocket,
    local_addr: SocketAddr,
    request: &SendRequest,
    resolve_hostnames: bool,
) -> Result<usize, SendError> {
    let dest = resolve_destination(request.address(), request.port(), local_addr, resolve_hostnames)
        .await?;
    socket
        .send_to(request.payload(), dest)
        .await
        .map_err(SendError::Io)
}

// ── PendingSend ───────────────────────────────────────────────────────────────

/// The eventual result of one [`BroadcastChannel::send`].
///
/// Resolves to [`SendError::Abandoned`] if the worker running the send is
/// torn down (runtime shutdown) before it reports back.
#[must_use = "the datagram is already dispatched; await this to learn whether it was sent"]
pub struct PendingSend {
    state: PendingState,
}

enum PendingState {
    Ready(Option<Result<usize, SendError>>),
    Waiting(oneshot::Receiver<Result<usize, SendError>>),
}

impl PendingSend {
    fn ready(result: Result<usize, SendError>) -> Self {
        Self {
            state: PendingState::Ready(Some(result)),
        }
    }

    fn waiting(rx: oneshot::Receiver<Result<usize, SendError>>) -> Self {
        Self {
            state: PendingState::Waiting(rx),
        }
    }
}

impl Future for PendingSend {
    type Output = Result<usize, SendError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().state {
            PendingState::Ready(slot) => {
                Poll::Ready(slot.take().unwrap_or(Err(SendError::Abandoned)))
            }
            PendingState::Waiting(rx) => Pin::new(rx)
                .poll(cx)
                .map(|received| received.unwrap_or(Err(SendError::Abandoned))),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
