//! # mib-agent
//!
//! An extensible SNMPv1 agent. The MIB it serves is a sparse tree of OIDs
//! whose leaves are literal values, *plugins* (user closures producing
//! arbitrarily-shaped subtrees, with optional time-based caching) and
//! *proxies* (delegations of whole subtrees to upstream agents).
//!
//! GetRequest resolves each varbind against the tree; GetNextRequest finds
//! the smallest OID strictly greater than the requested one that holds a
//! scalar, the primitive that makes SNMP walks work across plugin and
//! proxy boundaries.
//!
//! ```rust,no_run
//! use mib_agent::agent::Agent;
//! use mib_agent::mib::PluginValue;
//!
//! # async fn example() -> mib_agent::Result<()> {
//! let mut agent = Agent::builder()
//!     .port(161)
//!     .community(b"public")
//!     .sys_name("gw1")
//!     .build();
//!
//! // A plugin owning 1.3.6.1.4.1.99999: one gauge re-read on every request.
//! agent.add_plugin("1.3.6.1.4.1.99999".parse()?, |_| {
//!     let load = 17; // read something real here
//!     Ok(PluginValue::map([(1, PluginValue::from(vec![load]))]))
//! })?;
//!
//! // Everything under 1.3.6.1.4.1.2021 comes from another agent.
//! agent
//!     .add_proxy("1.3.6.1.4.1.2021".parse()?, "10.0.0.7", 161)
//!     .await?;
//!
//! let handle = agent.start().await?;
//! # handle.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod ber;
pub mod client;
pub mod error;
pub mod message;
pub mod mib;
pub mod oid;
pub mod prelude;
pub mod transport;
pub mod value;
pub mod varbind;

mod util;

pub use agent::{Agent, AgentHandle};
pub use client::Client;
pub use error::{Error, Result};
pub use oid::Oid;
pub use value::Value;
pub use varbind::VarBind;
