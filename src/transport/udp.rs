//! Owned UDP transport: one connected socket per upstream target.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::net::UdpSocket;

use super::Transport;
use crate::error::{Error, Result};
use crate::util::bind_ephemeral_udp_socket;

const MAX_DATAGRAM: usize = 65535;

/// UDP transport over an ephemeral connected socket.
#[derive(Clone)]
pub struct UdpTransport {
    socket: Arc<UdpSocket>,
    peer: SocketAddr,
    local: SocketAddr,
}

impl UdpTransport {
    /// Bind an ephemeral socket and connect it to `target`.
    pub async fn connect(target: SocketAddr) -> Result<Self> {
        let map_io = |source| Error::Io {
            target: Some(target),
            source,
        };
        let socket = bind_ephemeral_udp_socket(target).await.map_err(map_io)?;
        socket.connect(target).await.map_err(map_io)?;
        let local = socket.local_addr().map_err(map_io)?;
        Ok(Self {
            socket: Arc::new(socket),
            peer: target,
            local,
        })
    }
}

impl Transport for UdpTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        self.socket.send(data).await.map_err(|source| Error::Io {
            target: Some(self.peer),
            source,
        })?;
        Ok(())
    }

    async fn recv(&self, timeout: Duration) -> Result<Bytes> {
        let mut buf = vec![0u8; MAX_DATAGRAM];
        match tokio::time::timeout(timeout, self.socket.recv(&mut buf)).await {
            Err(_) => Err(Error::Timeout {
                target: Some(self.peer),
                elapsed: timeout,
                request_id: 0,
                retries: 0,
            }),
            Ok(Err(source)) => Err(Error::Io {
                target: Some(self.peer),
                source,
            }),
            Ok(Ok(len)) => {
                buf.truncate(len);
                Ok(Bytes::from(buf))
            }
        }
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    fn local_addr(&self) -> SocketAddr {
        self.local
    }
}
