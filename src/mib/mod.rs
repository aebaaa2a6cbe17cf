//! The MIB tree engine.
//!
//! A sparse tree of OID arcs with three kinds of leaves:
//!
//! - [`Child::Scalar`] - a literal typed value,
//! - [`Child::Plugin`] - a deferred producer of an arbitrarily-shaped
//!   subtree, with optional time-based caching,
//! - [`Child::Proxy`] - a delegation of an entire subtree to a remote agent.
//!
//! Two traversals give the tree its SNMP semantics: exact lookup (serving
//! GET) and lexicographic successor (serving GETNEXT). Both are async
//! because proxies forward over the network; plugin-materialised views never
//! suspend.

mod node;
mod plugin;
mod proxy;

use std::future::Future;
use std::pin::Pin;

pub use node::{Child, LookupResult, MibNode};
pub(crate) use node::RegisterError;
pub use plugin::{MapKey, Plugin, PluginValue, ProducerContext, ProducerError};
pub use proxy::{ManagerClient, Proxy};

/// Type alias for boxed async return type (dyn-compatible).
///
/// Tree traversal recurses through trait objects ([`ManagerClient`]) and
/// heterogeneous children, so the futures are boxed.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
