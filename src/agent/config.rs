//! Agent configuration.

use std::net::SocketAddr;

use bytes::Bytes;

use super::Agent;

/// Default SNMP agent port.
pub const DEFAULT_PORT: u16 = 161;

/// Default maximum UDP read size.
pub const DEFAULT_MAX_PACKET: usize = 8000;

/// Configuration for an [`Agent`].
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Address the UDP socket binds to.
    pub listen: SocketAddr,
    /// Maximum UDP read size.
    pub max_packet: usize,
    /// Accepted community strings; requests carrying any other community
    /// are dropped without a response.
    pub communities: Vec<Bytes>,
    /// Reported as sysContact.
    pub sys_contact: String,
    /// Reported as sysName.
    pub sys_name: String,
    /// Reported as sysLocation.
    pub sys_location: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)),
            max_packet: DEFAULT_MAX_PACKET,
            communities: vec![Bytes::from_static(b"public")],
            sys_contact: String::new(),
            sys_name: String::new(),
            sys_location: String::new(),
        }
    }
}

/// Builder for [`Agent`].
///
/// ```rust
/// # use mib_agent::agent::Agent;
/// let agent = Agent::builder()
///     .port(1161)
///     .community(b"private")
///     .sys_name("core-router")
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct AgentBuilder {
    config: AgentConfig,
}

impl AgentBuilder {
    /// Bind to a specific address instead of `0.0.0.0:161`.
    pub fn listen(mut self, addr: SocketAddr) -> Self {
        self.config.listen = addr;
        self
    }

    /// Change only the UDP port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.listen.set_port(port);
        self
    }

    /// Set the maximum UDP read size.
    pub fn max_packet(mut self, max_packet: usize) -> Self {
        self.config.max_packet = max_packet;
        self
    }

    /// Accept exactly one community string.
    pub fn community(mut self, community: &[u8]) -> Self {
        self.config.communities = vec![Bytes::copy_from_slice(community)];
        self
    }

    /// Accept a set of community strings.
    pub fn communities<I, C>(mut self, communities: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        self.config.communities = communities
            .into_iter()
            .map(|c| Bytes::copy_from_slice(c.as_ref()))
            .collect();
        self
    }

    /// Set the sysContact string.
    pub fn sys_contact(mut self, contact: impl Into<String>) -> Self {
        self.config.sys_contact = contact.into();
        self
    }

    /// Set the sysName string.
    pub fn sys_name(mut self, name: impl Into<String>) -> Self {
        self.config.sys_name = name.into();
        self
    }

    /// Set the sysLocation string.
    pub fn sys_location(mut self, location: impl Into<String>) -> Self {
        self.config.sys_location = location.into();
        self
    }

    /// Build the agent; the standard system group is registered and the
    /// uptime clock starts now.
    pub fn build(self) -> Agent {
        Agent::with_config(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.listen.port(), DEFAULT_PORT);
        assert_eq!(config.max_packet, DEFAULT_MAX_PACKET);
        assert_eq!(config.communities, vec![Bytes::from_static(b"public")]);
    }

    #[test]
    fn builder_sets_fields() {
        let agent = Agent::builder()
            .port(10161)
            .max_packet(1400)
            .communities(["private", "parts"])
            .sys_contact("ops@example.net")
            .sys_location("rack 7")
            .build();
        assert_eq!(agent.config().listen.port(), 10161);
        assert_eq!(agent.config().max_packet, 1400);
        assert_eq!(
            agent.config().communities,
            vec![Bytes::from_static(b"private"), Bytes::from_static(b"parts")]
        );
        assert_eq!(agent.config().sys_contact, "ops@example.net");
        assert_eq!(agent.config().sys_location, "rack 7");
    }
}
