//! The `SendRequest` value object.
//!
//! A send request lives only for the duration of one `send` call: it is built
//! from the caller's arguments, validated, handed to the broadcast channel,
//! and dropped once the datagram has been dispatched.
//!
//! Validation here covers only what can be decided without touching the
//! network.  Whether `address` actually resolves is decided by the channel at
//! send time and reported as a transmission error, not an argument error.

use thiserror::Error;

/// Lowest valid destination port.  Port 0 is reserved and cannot be a target.
pub const MIN_PORT: i64 = 1;

/// Highest valid destination port.
pub const MAX_PORT: i64 = 65_535;

/// Error returned when a send request's arguments are malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The destination address was empty or whitespace.
    #[error("destination address must not be empty")]
    EmptyAddress,
    /// The destination port was outside `1..=65535`.
    #[error("destination port {0} is outside the valid range {MIN_PORT}..={MAX_PORT}")]
    InvalidPort(i64),
}

/// One outbound datagram: payload plus destination.
///
/// The payload may be empty; a zero-length datagram is a valid UDP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendRequest {
    payload: Vec<u8>,
    address: String,
    port: u16,
}

impl SendRequest {
    /// Builds a validated request.
    ///
    /// # Errors
    ///
    /// Returns [`RequestError::EmptyAddress`] for a blank address and
    /// [`RequestError::InvalidPort`] for port 0.
    pub fn new(
        payload: impl Into<Vec<u8>>,
        address: impl Into<String>,
        port: u16,
    ) -> Result<Self, RequestError> {
        Self::from_parts(payload, address, i64::from(port))
    }

    /// Builds a validated request from an untyped port number, as received
    /// from the JSON control surface.
    ///
    /// # Errors
    ///
    /// Same as [`SendRequest::new`], plus [`RequestError::InvalidPort`] for any
    /// value that does not fit in `1..=65535`.
    pub fn from_parts(
        payload: impl Into<Vec<u8>>,
        address: impl Into<String>,
        port: i64,
    ) -> Result<Self, RequestError> {
        let address = address.into().trim().to_string();
        if address.is_empty() {
            return Err(RequestError::EmptyAddress);
        }
        let port = validate_port(port)?;
        Ok(Self {
            payload: payload.into(),
            address,
            port,
        })
    }

    /// The datagram body.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The textual destination host: an IPv4/IPv6 literal, a broadcast
    /// address, or a hostname.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// The destination port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Number of bytes the datagram carries.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// `true` for a zero-length datagram.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Checks that `port` is a usable destination port and narrows it to `u16`.
///
/// # Errors
///
/// Returns [`RequestError::InvalidPort`] for values outside `1..=65535`.
pub fn validate_port(port: i64) -> Result<u16, RequestError> {
    if !(MIN_PORT..=MAX_PORT).contains(&port) {
        return Err(RequestError::InvalidPort(port));
    }
    u16::try_from(port).map_err(|_| RequestError::InvalidPort(port))
}
