//! The agent façade: registration, request processing and the serve loop.
//!
//! An [`Agent`] owns the MIB tree. Plugins and proxies are registered before
//! [`start`](Agent::start); the serve loop then answers GetRequest and
//! GetNextRequest PDUs out of the tree until shut down.
//!
//! # Example
//!
//! ```rust,no_run
//! # use mib_agent::agent::Agent;
//! # use mib_agent::mib::PluginValue;
//! # async fn example() -> mib_agent::Result<()> {
//! let mut agent = Agent::builder().port(1161).community(b"public").build();
//! agent.add_plugin("1.3.6.1.4.1.99999".parse()?, |_| {
//!     Ok(PluginValue::map([(1, PluginValue::from(vec![42]))]))
//! })?;
//!
//! let handle = agent.start().await?;
//! println!("serving on {}", handle.local_addr());
//! # Ok(())
//! # }
//! ```

mod config;
mod plugin_dir;

pub use config::{AgentBuilder, AgentConfig, DEFAULT_MAX_PACKET, DEFAULT_PORT};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::client::Client;
use crate::error::{Error, ErrorStatus, RegistrationErrorKind, Result};
use crate::message::{Message, PduKind};
use crate::mib::{
    Child, LookupResult, ManagerClient, MibNode, Plugin, PluginValue, ProducerContext,
    ProducerError, Proxy, RegisterError,
};
use crate::oid::Oid;
use crate::util::{HexBytes, bind_udp_socket};
use crate::value::Value;

/// An SNMPv1 agent serving a plugin-extensible MIB tree.
pub struct Agent {
    config: AgentConfig,
    root: MibNode,
    started_at: Instant,
}

impl Agent {
    /// Start building an agent.
    pub fn builder() -> AgentBuilder {
        AgentBuilder::default()
    }

    pub(crate) fn with_config(config: AgentConfig) -> Self {
        let mut agent = Self {
            config,
            root: MibNode::new(),
            started_at: Instant::now(),
        };
        agent.register_system_group();
        agent
    }

    /// The agent's configuration.
    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// The standard system group (`1.3.6.1.2.1.1`), registered at build time.
    fn register_system_group(&mut self) {
        let started = self.started_at;
        let descr = format!(
            "{}/{} ({})",
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION"),
            std::env::consts::OS
        );
        let contact = self.config.sys_contact.clone();
        let name = self.config.sys_name.clone();
        let location = self.config.sys_location.clone();
        self.add_plugin(crate::oid!(1, 3, 6, 1, 2, 1, 1), move |_| {
            let uptime = (started.elapsed().as_millis() / 10) as u32;
            Ok(PluginValue::map([
                (1, PluginValue::List(vec![descr.clone().into()])),
                (
                    3,
                    PluginValue::List(vec![PluginValue::Typed(Value::TimeTicks(uptime))]),
                ),
                (4, PluginValue::List(vec![contact.clone().into()])),
                (5, PluginValue::List(vec![name.clone().into()])),
                (6, PluginValue::List(vec![location.clone().into()])),
            ]))
        })
        .expect("system group mounts on an empty tree");
    }

    /// Register a plugin producer at `base`.
    ///
    /// The producer owns the entire subtree below `base`: registration fails
    /// with `Occupied` if anything already exists there, and with
    /// `EncroachesOnPlugin` / `CannotNestInProxy` if an ancestor is already
    /// owned by another plugin or proxy.
    pub fn add_plugin<F>(&mut self, base: Oid, producer: F) -> Result<()>
    where
        F: Fn(&ProducerContext) -> std::result::Result<PluginValue, ProducerError>
            + Send
            + Sync
            + 'static,
    {
        self.mount(base, Child::Plugin(Plugin::new(producer)))
    }

    /// Register a plugin returning the same value on every request.
    pub fn add_plugin_value(&mut self, base: Oid, value: impl Into<PluginValue>) -> Result<()> {
        self.mount(base, Child::Plugin(Plugin::constant(value)))
    }

    /// Register a proxy delegating the subtree below `base` to the SNMPv1
    /// agent at `host:port`.
    pub async fn add_proxy(&mut self, base: Oid, host: &str, port: u16) -> Result<()> {
        let client = Client::builder(format!("{host}:{port}")).connect().await?;
        self.add_proxy_client(base, Arc::new(client))
    }

    /// Register a proxy over any [`ManagerClient`] implementation.
    pub fn add_proxy_client(&mut self, base: Oid, client: Arc<dyn ManagerClient>) -> Result<()> {
        let proxy = Proxy::new(base.clone(), client);
        self.mount(base, Child::Proxy(proxy))
    }

    fn mount(&mut self, base: Oid, child: Child) -> Result<()> {
        self.root.register(base.arcs(), child).map_err(|e| {
            let kind = match e {
                RegisterError::Occupied => RegistrationErrorKind::Occupied,
                RegisterError::TraversesPlugin => RegistrationErrorKind::EncroachesOnPlugin,
                RegisterError::TraversesProxy => RegistrationErrorKind::CannotNestInProxy,
            };
            Error::registration(base, kind)
        })
    }

    /// Resolve `oid` to the value a varbind should carry: a scalar passes
    /// through, anything else is `NoSuchObject`.
    async fn typed_lookup(&self, oid: &Oid, ctx: &ProducerContext) -> Value {
        match self.root.lookup(oid.arcs(), ctx).await {
            LookupResult::Scalar(value) => value,
            LookupResult::Subtree | LookupResult::Absent => Value::NoSuchObject,
        }
    }

    /// Answer a GetRequest: every varbind's value becomes the result of an
    /// exact lookup of its name.
    pub async fn process_get_request(&self, message: Message) -> Message {
        let community = message.community;
        let ctx = ProducerContext::new(community.clone());
        let mut pdu = message.pdu.into_response();
        for vb in pdu.varbinds.iter_mut() {
            vb.value = self.typed_lookup(&vb.name, &ctx).await;
            trace!(name = %vb.name, value = %vb.value, "get");
        }
        Message::new(community, pdu)
    }

    /// Answer a GetNextRequest: every varbind advances to its lexicographic
    /// successor. A varbind with no successor is rewritten to the OID `0`
    /// and the PDU reports `noSuchName` at that varbind's index.
    pub async fn process_get_next_request(&self, message: Message) -> Message {
        let community = message.community;
        let ctx = ProducerContext::new(community.clone());
        let mut pdu = message.pdu.into_response();
        for (index, vb) in pdu.varbinds.iter_mut().enumerate() {
            match self.root.successor(vb.name.arcs(), &ctx).await {
                Some(next) => {
                    vb.value = self.typed_lookup(&next, &ctx).await;
                    trace!(from = %vb.name, to = %next, value = %vb.value, "get-next");
                    vb.name = next;
                }
                None => {
                    trace!(from = %vb.name, "get-next hit end of mib view");
                    vb.name = crate::oid!(0);
                    pdu.error_status = ErrorStatus::NoSuchName;
                    pdu.error_index = index as i32;
                }
            }
        }
        Message::new(community, pdu)
    }

    /// Bind the UDP socket and spawn the serve loop.
    ///
    /// Registration is not possible afterwards; the agent moves into the
    /// loop task. The returned handle exposes the bound address and shuts
    /// the loop down cleanly.
    pub async fn start(self) -> Result<AgentHandle> {
        let socket = bind_udp_socket(self.config.listen)
            .await
            .map_err(|source| Error::Io {
                target: Some(self.config.listen),
                source,
            })?;
        let local_addr = socket.local_addr().map_err(|source| Error::Io {
            target: Some(self.config.listen),
            source,
        })?;
        info!(%local_addr, "agent listening");
        let token = CancellationToken::new();
        let loop_token = token.clone();
        let task = tokio::spawn(async move { self.serve(socket, loop_token).await });
        Ok(AgentHandle {
            local_addr,
            token,
            task,
        })
    }

    async fn serve(self, socket: UdpSocket, token: CancellationToken) {
        let mut buf = vec![0u8; self.config.max_packet];
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("serve loop shutting down");
                    return;
                }
                received = socket.recv_from(&mut buf) => match received {
                    Ok((len, peer)) => self.handle_datagram(&buf[..len], peer, &socket).await,
                    Err(error) if token.is_cancelled() => {
                        debug!(%error, "socket closed during shutdown");
                        return;
                    }
                    Err(error) => {
                        // Transient receive errors must not kill the loop.
                        error!(%error, "receive failed");
                    }
                }
            }
        }
    }

    async fn handle_datagram(&self, data: &[u8], peer: SocketAddr, socket: &UdpSocket) {
        let message = match Message::decode(Bytes::copy_from_slice(data)) {
            Ok(message) => message,
            Err(error) => {
                error!(%peer, %error, packet = %HexBytes(data), "dropping undecodable message");
                return;
            }
        };
        if !self.config.communities.contains(&message.community) {
            // Silent drop, nothing above debug level.
            debug!(%peer, "dropping request with unaccepted community");
            return;
        }
        let response = match message.pdu.kind {
            PduKind::GetRequest => self.process_get_request(message).await,
            PduKind::GetNextRequest => self.process_get_next_request(message).await,
            PduKind::Response => {
                error!(%peer, "dropping unexpected response PDU");
                return;
            }
        };
        let encoded = response.encode();
        if let Err(error) = socket.send_to(&encoded, peer).await {
            error!(%peer, %error, "failed to send response");
        }
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("listen", &self.config.listen)
            .finish_non_exhaustive()
    }
}

/// A running agent: bound address plus clean shutdown.
pub struct AgentHandle {
    local_addr: SocketAddr,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl AgentHandle {
    /// The address the agent is serving on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop the serve loop and wait for it to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(error) = self.task.await {
            warn!(%error, "serve loop task failed");
        }
    }
}
