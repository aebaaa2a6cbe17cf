//! Prelude module for convenient imports.
//!
//! ```rust,no_run
//! use mib_agent::prelude::*;
//! ```
//!
//! This imports the agent and client entry points, the core value types,
//! error handling, and the [`oid!`] macro.

pub use crate::agent::{Agent, AgentHandle};
pub use crate::client::Client;
pub use crate::error::{Error, Result};
pub use crate::mib::{PluginValue, ProducerContext};
pub use crate::oid::Oid;
pub use crate::value::Value;
pub use crate::varbind::VarBind;

#[doc(no_inline)]
pub use crate::oid;
