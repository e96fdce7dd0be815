//! Fault kinds raised while supervising a cluster.
//!
//! Connection failures never appear here: a node that cannot be reached is
//! recorded as [`Status::Down`](crate::node::Status::Down) by its probe.

use std::io;

use thiserror::Error;

use crate::node::NodeAddr;

/// Failure of the wire client after a connection was established.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("server replied with error: {0}")]
    Server(String),

    #[error("malformed reply: {0}")]
    Protocol(String),
}

/// A single node operation failed.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error("cannot fetch state from {0}: node is unreachable")]
    Unreachable(NodeAddr),

    #[error("{node} reported unrecognized role '{role}'")]
    UnrecognizedRole { node: NodeAddr, role: String },

    #[error("cannot reconfigure {0}: node is not reachable")]
    NotReachable(NodeAddr),

    /// Anything but `OK` to a reconfiguration, including no reply at all.
    #[error("unexpected reconfiguration response '{response}' from {node}")]
    UnexpectedResponse { node: NodeAddr, response: String },

    /// The role query failed after connecting.
    #[error("session with {node} failed: {source}")]
    Session {
        node: NodeAddr,
        #[source]
        source: SessionError,
    },
}

impl NodeError {
    pub fn node(&self) -> &NodeAddr {
        match self {
            NodeError::Unreachable(node) | NodeError::NotReachable(node) => node,
            NodeError::UnrecognizedRole { node, .. }
            | NodeError::UnexpectedResponse { node, .. }
            | NodeError::Session { node, .. } => node,
        }
    }
}

/// Structural violation of the single-primary invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("{0} is a primary but the cluster already has one")]
    DuplicatePrimary(NodeAddr),

    #[error("no primary defined")]
    NoPrimary,

    #[error("more than one primary defined: {}", join(.0))]
    MultiplePrimaries(Vec<NodeAddr>),

    #[error("{0} is not a member of the cluster")]
    UnknownMember(NodeAddr),
}

fn join(addrs: &[NodeAddr]) -> String {
    addrs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Outcome of a failed monitoring cycle.
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Node(#[from] NodeError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error("primary is down and no eligible replica is reachable")]
    NoEligibleReplica,
}

impl MonitorError {
    /// Cluster faults cannot be repaired by another cycle.
    pub fn is_fatal(&self) -> bool {
        matches!(self, MonitorError::Cluster(_))
    }
}

/// Malformed `host[:port]` endpoint given at startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EndpointError {
    #[error("invalid ip in {0}")]
    InvalidHost(String),

    #[error("invalid port in {0}")]
    InvalidPort(String),
}

pub type Result<T, E = MonitorError> = std::result::Result<T, E>;
