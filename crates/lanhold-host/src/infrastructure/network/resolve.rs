//! Destination address resolution.
//!
//! The caller hands us text.  An IP literal (including `255.255.255.255` and
//! subnet broadcast addresses) is parsed directly.  Hostnames go through the
//! system resolver only when enabled in the configuration; otherwise they are
//! rejected, which keeps a typo like `"not-an-address"` from turning into a
//! slow DNS query.
//!
//! The result must match the family of the bound socket.  An IPv4 target on
//! an IPv6 socket is sent to its v4-mapped form; an IPv6 target on an IPv4
//! socket cannot be reached and is a resolution failure.

use std::net::{IpAddr, SocketAddr};

use lanhold_core::SendError;
use tokio::net::lookup_host;

/// Resolves `address:port` to a destination reachable from a socket bound
/// at `local`.
///
/// # Errors
///
/// Returns [`SendError::AddressResolutionFailed`] when the text is not an IP
/// literal (and hostname lookup is off), the lookup fails, or no resolved
/// address fits the socket's family.
pub async fn resolve_destination(
    address: &str,
    port: u16,
    local: SocketAddr,
    resolve_hostnames: bool,
) -> Result<SocketAddr, SendError> {
    let failed = |reason: String| SendError::AddressResolutionFailed {
        address: address.to_string(),
        reason,
    };

    if let Ok(ip) = address.parse::<IpAddr>() {
        return fit_family(ip, &local)
            .map(|ip| SocketAddr::new(ip, port))
            .ok_or_else(|| failed(format!("{ip} cannot be reached from a socket bound at {local}")));
    }

    if !resolve_hostnames {
        return Err(failed("not an IP address literal".to_string()));
    }

    let candidates = lookup_host((address, port))
        .await
        .map_err(|e| failed(format!("lookup failed: {e}")))?;

    candidates
        .filter_map(|addr| fit_family(addr.ip(), &local).map(|ip| SocketAddr::new(ip, port)))
        .next()
        .ok_or_else(|| failed(format!("no address usable from a socket bound at {local}")))
}

/// Maps `ip` into the family of `local`, or `None` if it cannot be.
fn fit_family(ip: IpAddr, local: &SocketAddr) -> Option<IpAddr> {
    match (ip, local) {
        (IpAddr::V4(_), SocketAddr::V4(_)) | (IpAddr::V6(_), SocketAddr::V6(_)) => Some(ip),
        (IpAddr::V4(v4), SocketAddr::V6(_)) => Some(IpAddr::V6(v4.to_ipv6_mapped())),
        (IpAddr::V6(v6), SocketAddr::V4(_)) => v6.to_ipv4_mapped().map(IpAddr::V4),
    }
}
