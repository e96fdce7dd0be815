use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{EndpointError, NodeError};
use crate::session::{Connector, Session};

pub const DEFAULT_PORT: u16 = 6379;

/// Identity of a cluster member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddr {
    host: String,
    port: u16,
}

impl NodeAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl fmt::Display for NodeAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

/// Parses `ip`, `ip:port`, `[ipv6]` or `[ipv6]:port`. The port defaults to 6379.
impl FromStr for NodeAddr {
    type Err = EndpointError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        if let Ok(sock) = spec.parse::<SocketAddr>() {
            if sock.port() == 0 {
                return Err(EndpointError::InvalidPort(spec.to_string()));
            }
            return Ok(Self::new(sock.ip().to_string(), sock.port()));
        }
        let bare = spec.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = bare.parse::<IpAddr>() {
            return Ok(Self::new(ip.to_string(), DEFAULT_PORT));
        }
        let (host, port) = spec
            .rsplit_once(':')
            .ok_or_else(|| EndpointError::InvalidHost(spec.to_string()))?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        host.parse::<IpAddr>()
            .map_err(|_| EndpointError::InvalidHost(spec.to_string()))?;
        if port.is_empty() {
            return Ok(Self::new(host, DEFAULT_PORT));
        }
        let port = port
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| EndpointError::InvalidPort(spec.to_string()))?;
        Ok(Self::new(host, port))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Unknown,
    Primary,
    Replica,
}

impl Role {
    /// Map the server's role string; only `master` and `slave` are recognized.
    pub fn from_wire(role: &str) -> Option<Self> {
        match role {
            "master" => Some(Role::Primary),
            "slave" => Some(Role::Replica),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Role::Unknown => "unknown",
            Role::Primary => "primary",
            Role::Replica => "replica",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Unknown,
    Up,
    Down,
}

/// One cluster member.
///
/// `status` changes only through a connection attempt. `role` changes only
/// through [`Node::fetch_role`], a successful reconfiguration, or
/// [`Node::set_role`] during promotion bookkeeping.
pub struct Node {
    addr: NodeAddr,
    role: Role,
    status: Status,
    connector: Arc<dyn Connector>,
}

impl Node {
    pub fn new(addr: NodeAddr, connector: Arc<dyn Connector>) -> Self {
        Self {
            addr,
            role: Role::Unknown,
            status: Status::Unknown,
            connector,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    pub fn addr(&self) -> &NodeAddr {
        &self.addr
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn is_up(&self) -> bool {
        self.status == Status::Up
    }

    pub(crate) fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    async fn open(&mut self) -> Option<Box<dyn Session>> {
        tracing::debug!(node = %self.addr, "connecting");
        match self.connector.connect(&self.addr).await {
            Ok(session) => {
                tracing::debug!(node = %self.addr, "node is up");
                self.status = Status::Up;
                Some(session)
            }
            Err(e) => {
                tracing::warn!(node = %self.addr, error = %e, "node is down");
                self.status = Status::Down;
                None
            }
        }
    }

    /// Check connectivity and record the result. Never fails.
    pub async fn probe(&mut self) -> Status {
        let _ = self.open().await;
        self.status
    }

    /// Ask the node which role it currently plays.
    pub async fn fetch_role(&mut self) -> Result<Role, NodeError> {
        let mut session = self
            .open()
            .await
            .ok_or_else(|| NodeError::Unreachable(self.addr.clone()))?;
        let reported = session
            .query_role()
            .await
            .map_err(|source| NodeError::Session {
                node: self.addr.clone(),
                source,
            })?;
        let role = Role::from_wire(&reported).ok_or_else(|| NodeError::UnrecognizedRole {
            node: self.addr.clone(),
            role: reported.clone(),
        })?;
        tracing::info!(node = %self.addr, role = %reported, "fetched role");
        self.role = role;
        Ok(role)
    }

    /// Detach from any primary. Requires the node to be up.
    pub async fn promote_to_primary(&mut self) -> Result<(), NodeError> {
        tracing::info!(node = %self.addr, "committing primary status");
        self.reconfigure(None).await?;
        self.role = Role::Primary;
        Ok(())
    }

    /// Follow `primary`. Requires the node to be up.
    pub async fn become_replica_of(&mut self, primary: &NodeAddr) -> Result<(), NodeError> {
        tracing::info!(node = %self.addr, primary = %primary, "committing replica status");
        self.reconfigure(Some(primary)).await?;
        self.role = Role::Replica;
        Ok(())
    }

    async fn reconfigure(&mut self, target: Option<&NodeAddr>) -> Result<(), NodeError> {
        if !self.is_up() {
            return Err(NodeError::NotReachable(self.addr.clone()));
        }
        let mut session = self
            .open()
            .await
            .ok_or_else(|| NodeError::NotReachable(self.addr.clone()))?;
        let response = session
            .reconfigure_replication(target)
            .await
            .map_err(|e| NodeError::UnexpectedResponse {
                node: self.addr.clone(),
                response: format!("no acknowledgement ({})", e),
            })?;
        if response != "OK" {
            return Err(NodeError::UnexpectedResponse {
                node: self.addr.clone(),
                response,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("addr", &self.addr)
            .field("role", &self.role)
            .field("status", &self.status)
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.addr, f)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted in-memory servers for exercising nodes without sockets.

    use std::collections::HashMap;
    use std::io;
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::NodeAddr;
    use crate::error::SessionError;
    use crate::session::{Connector, Session};

    #[derive(Debug, Clone)]
    pub struct FakeServer {
        pub up: bool,
        pub role: String,
        pub ack: String,
        /// Last REPLICAOF target seen; `Some(None)` means detached.
        pub following: Option<Option<NodeAddr>>,
        pub connects: usize,
        /// Sessions fail after connecting, like a server that stops answering.
        pub stalled: bool,
    }

    impl FakeServer {
        pub fn new(role: &str) -> Self {
            Self {
                up: true,
                role: role.to_string(),
                ack: "OK".to_string(),
                following: None,
                connects: 0,
                stalled: false,
            }
        }
    }

    #[derive(Default, Clone)]
    pub struct FakeNetwork {
        servers: Arc<Mutex<HashMap<NodeAddr, FakeServer>>>,
    }

    impl FakeNetwork {
        pub fn add(&self, addr: &NodeAddr, server: FakeServer) {
            self.servers.lock().insert(addr.clone(), server);
        }

        pub fn update(&self, addr: &NodeAddr, f: impl FnOnce(&mut FakeServer)) {
            if let Some(server) = self.servers.lock().get_mut(addr) {
                f(server);
            }
        }

        pub fn server(&self, addr: &NodeAddr) -> FakeServer {
            self.servers.lock()[addr].clone()
        }

        pub fn connector(&self) -> Arc<dyn Connector> {
            Arc::new(self.clone())
        }
    }

    #[async_trait]
    impl Connector for FakeNetwork {
        async fn connect(&self, addr: &NodeAddr) -> io::Result<Box<dyn Session>> {
            let mut servers = self.servers.lock();
            match servers.get_mut(addr) {
                Some(server) if server.up => {
                    server.connects += 1;
                    Ok(Box::new(FakeSession {
                        addr: addr.clone(),
                        network: self.clone(),
                    }))
                }
                _ => Err(io::Error::new(io::ErrorKind::ConnectionRefused, "refused")),
            }
        }
    }

    struct FakeSession {
        addr: NodeAddr,
        network: FakeNetwork,
    }

    #[async_trait]
    impl Session for FakeSession {
        async fn query_role(&mut self) -> Result<String, SessionError> {
            Ok(self.network.server(&self.addr).role)
        }

        async fn reconfigure_replication(
            &mut self,
            target: Option<&NodeAddr>,
        ) -> Result<String, SessionError> {
            let mut servers = self.network.servers.lock();
            let server = servers
                .get_mut(&self.addr)
                .ok_or_else(|| SessionError::Protocol("no such server".into()))?;
            if server.stalled {
                return Err(SessionError::Io(io::Error::new(
                    io::ErrorKind::TimedOut,
                    "did not answer",
                )));
            }
            if server.ack == "OK" {
                server.following = Some(target.cloned());
                server.role = if target.is_some() { "slave" } else { "master" }.to_string();
            }
            Ok(server.ack.clone())
        }
    }
}
