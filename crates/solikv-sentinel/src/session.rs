//! Wire-client seam between [`Node`](crate::node::Node) and a live server.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use solikv_resp::{info_field, Command, Connection, RespFrame};

use crate::error::SessionError;
use crate::node::NodeAddr;

/// Opens sessions to cluster members.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, addr: &NodeAddr) -> io::Result<Box<dyn Session>>;
}

/// One open session with a single member. Dropping it releases the socket.
#[async_trait]
pub trait Session: Send {
    /// The raw `role` string reported by the server.
    async fn query_role(&mut self) -> Result<String, SessionError>;

    /// Follow `target`, or detach from any primary when `None`.
    /// Returns the acknowledgement text; error replies are returned as text too.
    async fn reconfigure_replication(
        &mut self,
        target: Option<&NodeAddr>,
    ) -> Result<String, SessionError>;
}

/// [`Connector`] speaking RESP over TCP.
#[derive(Debug, Clone)]
pub struct RespConnector {
    timeout: Duration,
}

impl RespConnector {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl Connector for RespConnector {
    async fn connect(&self, addr: &NodeAddr) -> io::Result<Box<dyn Session>> {
        let mut conn = Connection::connect(addr.host(), addr.port(), self.timeout).await?;
        match conn.request(Command::ping()).await? {
            RespFrame::SimpleString(s) if &s[..] == b"PONG" => {}
            other => {
                return Err(io::Error::new(
                    io::ErrorKind::ConnectionRefused,
                    format!("{} answered PING with {:?}", addr, other),
                ))
            }
        }
        Ok(Box::new(RespSession { conn }))
    }
}

struct RespSession {
    conn: Connection,
}

#[async_trait]
impl Session for RespSession {
    async fn query_role(&mut self) -> Result<String, SessionError> {
        let reply = self.conn.request(Command::info("replication")).await?;
        let body = match reply {
            RespFrame::BulkString(b) => String::from_utf8_lossy(&b).into_owned(),
            RespFrame::Error(msg) => return Err(SessionError::Server(msg)),
            other => {
                return Err(SessionError::Protocol(format!(
                    "INFO returned {:?}",
                    other
                )))
            }
        };
        info_field(&body, "role")
            .map(str::to_string)
            .ok_or_else(|| SessionError::Protocol("INFO reply has no role field".into()))
    }

    async fn reconfigure_replication(
        &mut self,
        target: Option<&NodeAddr>,
    ) -> Result<String, SessionError> {
        let cmd = Command::replicaof(target.map(|t| (t.host(), t.port())));
        let reply = self.conn.request(cmd).await?;
        if reply.is_error() {
            tracing::warn!(peer = %self.conn.peer(), reply = ?reply, "REPLICAOF rejected");
        }
        reply.text().ok_or_else(|| {
            SessionError::Protocol(format!("REPLICAOF returned {:?}", reply))
        })
    }
}
