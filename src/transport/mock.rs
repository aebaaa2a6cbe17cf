//! In-memory transport for unit tests.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;

use super::Transport;
use crate::error::{Error, Result};

type Responder = dyn Fn(&[u8]) -> Option<Bytes> + Send + Sync;

/// A scripted transport: every sent datagram is handed to a responder
/// closure whose answer (if any) is queued for the next `recv`.
///
/// A responder returning `None` models a dropped packet; the following
/// `recv` fails with a timeout immediately, which exercises the client's
/// retry path without waiting.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<MockInner>,
}

struct MockInner {
    responder: Box<Responder>,
    queue: Mutex<VecDeque<Bytes>>,
    sent: AtomicUsize,
}

impl MockTransport {
    /// Create a transport driven by `responder`.
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[u8]) -> Option<Bytes> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(MockInner {
                responder: Box::new(responder),
                queue: Mutex::new(VecDeque::new()),
                sent: AtomicUsize::new(0),
            }),
        }
    }

    /// Number of datagrams sent so far.
    pub fn sent_count(&self) -> usize {
        self.inner.sent.load(Ordering::SeqCst)
    }
}

impl Transport for MockTransport {
    async fn send(&self, data: &[u8]) -> Result<()> {
        self.inner.sent.fetch_add(1, Ordering::SeqCst);
        if let Some(response) = (self.inner.responder)(data) {
            self.inner
                .queue
                .lock()
                .expect("mock queue poisoned")
                .push_back(response);
        }
        Ok(())
    }

    async fn recv(&self, timeout: Duration) -> Result<Bytes> {
        let queued = self
            .inner
            .queue
            .lock()
            .expect("mock queue poisoned")
            .pop_front();
        queued.ok_or(Error::Timeout {
            target: Some(self.peer_addr()),
            elapsed: timeout,
            request_id: 0,
            retries: 0,
        })
    }

    fn peer_addr(&self) -> SocketAddr {
        "192.0.2.1:161".parse().unwrap()
    }

    fn local_addr(&self) -> SocketAddr {
        "127.0.0.1:0".parse().unwrap()
    }
}
