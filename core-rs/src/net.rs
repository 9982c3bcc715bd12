//! Network helpers for daemon startup
//!
//! Free-port discovery and interface lookup, used to pick the service
//! port before the instance fingerprint is assembled. Plain wrappers
//! over the socket API with no state of their own.

use std::net::{IpAddr, TcpListener, UdpSocket};

use crate::errors::{Result, TorrentdError};

/// Ask the OS for a currently free TCP port on localhost
///
/// # Example
///
/// ```
/// let port = torrentd_core::get_free_port().unwrap();
/// assert!(port > 0);
/// ```
pub fn get_free_port() -> Result<u16> {
    let listener = TcpListener::bind(("127.0.0.1", 0))
        .map_err(|e| TorrentdError::PortError(format!("Failed to bind probe socket: {}", e)))?;

    let port = listener
        .local_addr()
        .map_err(|e| TorrentdError::PortError(format!("Failed to read probe address: {}", e)))?
        .port();

    Ok(port)
}

/// Test if a TCP port is available on localhost
///
/// # Arguments
/// * `port` - Port to test
///
/// # Returns
/// true if available, false if in use
pub fn is_port_free(port: u16) -> bool {
    TcpListener::bind(("127.0.0.1", port)).is_ok()
}

/// Find a non-loopback address of this host
///
/// Connects a UDP socket to a fixed remote endpoint so the OS selects
/// the outbound interface; no packet is sent. Returns `None` when only
/// loopback is available.
pub fn get_interface() -> Option<IpAddr> {
    let socket = UdpSocket::bind(("0.0.0.0", 0)).ok()?;
    socket.connect(("8.8.8.8", 53)).ok()?;

    let addr = socket.local_addr().ok()?.ip();
    if addr.is_loopback() || addr.is_unspecified() {
        None
    } else {
        Some(addr)
    }
}
