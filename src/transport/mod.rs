//! Client-side transport abstraction.
//!
//! The manager client that proxies use to reach upstream agents talks
//! through the [`Transport`] trait, so unit tests can swap the network for
//! an in-memory implementation.

mod udp;

#[cfg(any(test, feature = "testing"))]
mod mock;

pub use udp::UdpTransport;

#[cfg(any(test, feature = "testing"))]
pub use mock::MockTransport;

use crate::error::Result;
use bytes::Bytes;
use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

/// A datagram channel to one upstream agent.
///
/// # Clone Requirement
///
/// The `Clone` bound exists because a client may be shared by several
/// proxies. Implementations use `Arc` internally, making clone a reference
/// count increment.
pub trait Transport: Send + Sync + Clone {
    /// Send request data to the target.
    fn send(&self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Receive one response datagram, waiting at most `timeout`.
    fn recv(&self, timeout: Duration) -> impl Future<Output = Result<Bytes>> + Send;

    /// The peer address this transport sends to and receives from.
    fn peer_addr(&self) -> SocketAddr;

    /// Local bind address.
    fn local_addr(&self) -> SocketAddr;
}
