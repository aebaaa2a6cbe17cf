//! Manager-side SNMPv1 client.
//!
//! Proxies use this to forward lookups to upstream agents; it also works
//! standalone for querying any SNMPv1 agent. Requests retry on timeout and
//! are correlated by request id.
//!
//! # Example
//!
//! ```rust,no_run
//! # use mib_agent::client::Client;
//! # use std::time::Duration;
//! # async fn example() -> mib_agent::Result<()> {
//! let client = Client::builder("192.168.1.1:161")
//!     .community(b"public")
//!     .timeout(Duration::from_secs(2))
//!     .connect()
//!     .await?;
//!
//! let vb = client.get(&"1.3.6.1.2.1.1.1.0".parse()?).await?;
//! println!("{vb}");
//! # Ok(())
//! # }
//! ```

mod builder;

pub use builder::ClientBuilder;

use std::sync::atomic::{AtomicI32, Ordering};

use bytes::Bytes;
use tracing::debug;

use crate::error::{Error, ErrorStatus, Result};
use crate::message::{Message, Pdu, PduKind};
use crate::mib::{BoxFuture, ManagerClient};
use crate::oid::Oid;
use crate::transport::Transport;
use crate::varbind::VarBind;

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Community string sent with every request.
    pub community: Bytes,
    /// Per-attempt receive timeout.
    pub timeout: std::time::Duration,
    /// Retries after the first attempt times out.
    pub retries: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            community: Bytes::from_static(b"public"),
            timeout: std::time::Duration::from_secs(5),
            retries: 3,
        }
    }
}

/// An SNMPv1 manager client over a [`Transport`].
pub struct Client<T: Transport> {
    transport: T,
    config: ClientConfig,
    next_request_id: AtomicI32,
}

impl<T: Transport> Client<T> {
    /// Create a client over a pre-built transport.
    pub fn new(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            next_request_id: AtomicI32::new(1),
        }
    }

    /// Get a single OID.
    pub async fn get(&self, oid: &Oid) -> Result<VarBind> {
        let mut varbinds = self.get_many(std::slice::from_ref(oid)).await?;
        varbinds.pop().ok_or(Error::Snmp {
            target: Some(self.transport.peer_addr()),
            status: ErrorStatus::GenErr,
            index: 0,
        })
    }

    /// Get several OIDs in one request.
    pub async fn get_many(&self, oids: &[Oid]) -> Result<Vec<VarBind>> {
        self.request(PduKind::GetRequest, oids).await
    }

    /// Get the lexicographic successors of several OIDs in one request.
    pub async fn get_next_many(&self, oids: &[Oid]) -> Result<Vec<VarBind>> {
        self.request(PduKind::GetNextRequest, oids).await
    }

    async fn request(&self, kind: PduKind, oids: &[Oid]) -> Result<Vec<VarBind>> {
        let request_id = self.next_request_id.fetch_add(1, Ordering::Relaxed);
        let message = Message::new(
            self.config.community.clone(),
            Pdu::request(
                kind,
                request_id,
                oids.iter().cloned().map(VarBind::null).collect(),
            ),
        );
        let encoded = message.encode();

        let mut attempt = 0u32;
        loop {
            self.transport.send(&encoded).await?;
            match self.transport.recv(self.config.timeout).await {
                Ok(data) => {
                    let response = Message::decode(data)?;
                    if response.pdu.request_id != request_id {
                        return Err(Error::RequestIdMismatch {
                            expected: request_id,
                            actual: response.pdu.request_id,
                        });
                    }
                    if response.pdu.error_status != ErrorStatus::NoError {
                        return Err(Error::Snmp {
                            target: Some(self.transport.peer_addr()),
                            status: response.pdu.error_status,
                            index: response.pdu.error_index,
                        });
                    }
                    return Ok(response.pdu.varbinds);
                }
                Err(Error::Timeout { .. }) if attempt < self.config.retries => {
                    attempt += 1;
                    debug!(
                        request_id,
                        attempt,
                        peer = %self.transport.peer_addr(),
                        "request timed out, retrying"
                    );
                }
                Err(Error::Timeout { elapsed, .. }) => {
                    return Err(Error::Timeout {
                        target: Some(self.transport.peer_addr()),
                        elapsed,
                        request_id,
                        retries: self.config.retries,
                    });
                }
                Err(other) => return Err(other),
            }
        }
    }
}

impl<T: Transport + 'static> ManagerClient for Client<T> {
    fn get<'a>(&'a self, oids: &'a [Oid]) -> BoxFuture<'a, Result<Vec<VarBind>>> {
        Box::pin(self.get_many(oids))
    }

    fn get_next<'a>(&'a self, oids: &'a [Oid]) -> BoxFuture<'a, Result<Vec<VarBind>>> {
        Box::pin(self.get_next_many(oids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oid;
    use crate::transport::MockTransport;
    use crate::value::Value;

    /// Respond to any request with a response echoing its varbind names and
    /// INTEGER 42 values.
    fn answering_transport() -> MockTransport {
        MockTransport::new(|data| {
            let request = Message::decode(Bytes::copy_from_slice(data)).unwrap();
            let mut pdu = request.pdu.into_response();
            for vb in pdu.varbinds.iter_mut() {
                vb.value = Value::Integer(42);
            }
            Some(Message::new(request.community, pdu).encode())
        })
    }

    #[tokio::test]
    async fn get_decodes_response() {
        let client = Client::new(answering_transport(), ClientConfig::default());
        let vb = client.get(&oid!(1, 3, 6, 1)).await.unwrap();
        assert_eq!(vb.name, oid!(1, 3, 6, 1));
        assert_eq!(vb.value, Value::Integer(42));
    }

    #[tokio::test]
    async fn retries_then_succeeds() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let drops = std::sync::Arc::new(AtomicUsize::new(0));
        let counter = drops.clone();
        let transport = MockTransport::new(move |data| {
            // Drop the first two attempts.
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                return None;
            }
            let request = Message::decode(Bytes::copy_from_slice(data)).unwrap();
            Some(Message::new(request.community, request.pdu.into_response()).encode())
        });
        let client = Client::new(transport.clone(), ClientConfig::default());
        client.get_many(&[oid!(1, 2, 3)]).await.unwrap();
        assert_eq!(transport.sent_count(), 3);
    }

    #[tokio::test]
    async fn exhausted_retries_time_out() {
        let transport = MockTransport::new(|_| None);
        let config = ClientConfig {
            retries: 2,
            ..Default::default()
        };
        let client = Client::new(transport.clone(), config);
        let err = client.get_many(&[oid!(1)]).await.unwrap_err();
        assert!(matches!(err, Error::Timeout { retries: 2, .. }));
        assert_eq!(transport.sent_count(), 3);
    }

    #[tokio::test]
    async fn error_status_maps_to_snmp_error() {
        let transport = MockTransport::new(|data| {
            let request = Message::decode(Bytes::copy_from_slice(data)).unwrap();
            let mut pdu = request.pdu.into_response();
            pdu.error_status = ErrorStatus::NoSuchName;
            pdu.error_index = 1;
            Some(Message::new(request.community, pdu).encode())
        });
        let client = Client::new(transport, ClientConfig::default());
        let err = client.get_next_many(&[oid!(1, 2)]).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Snmp {
                status: ErrorStatus::NoSuchName,
                index: 1,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn request_id_mismatch_detected() {
        let transport = MockTransport::new(|data| {
            let request = Message::decode(Bytes::copy_from_slice(data)).unwrap();
            let mut pdu = request.pdu.into_response();
            pdu.request_id = pdu.request_id.wrapping_add(1000);
            Some(Message::new(request.community, pdu).encode())
        });
        let client = Client::new(transport, ClientConfig::default());
        let err = client.get_many(&[oid!(1, 2)]).await.unwrap_err();
        assert!(matches!(err, Error::RequestIdMismatch { .. }));
    }

    #[tokio::test]
    async fn sends_community_and_null_values() {
        let transport = MockTransport::new(|data| {
            let request = Message::decode(Bytes::copy_from_slice(data)).unwrap();
            assert_eq!(&request.community[..], b"secret");
            assert!(request.pdu.varbinds.iter().all(|vb| vb.value == Value::Null));
            Some(Message::new(request.community, request.pdu.into_response()).encode())
        });
        let config = ClientConfig {
            community: Bytes::from_static(b"secret"),
            ..Default::default()
        };
        let client = Client::new(transport, config);
        client.get_many(&[oid!(1, 2), oid!(1, 3)]).await.unwrap();
    }
}
