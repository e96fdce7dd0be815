//! Failover supervisor for a single-primary SoliKV/Redis replication group.
//!
//! A [`Monitor`] owns one [`Cluster`] of [`Node`]s. Every cycle it probes all
//! members and, when the primary stops answering, promotes a reachable
//! replica and points the remaining members at it.

pub mod cluster;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod node;
pub mod session;

pub use cluster::Cluster;
pub use config::{LogConfig, MonitorConfig};
pub use error::{ClusterError, MonitorError, NodeError};
pub use monitor::{CheckOutcome, Monitor, Promotion};
pub use node::{Node, NodeAddr, Role, Status};
pub use session::{Connector, RespConnector, Session};
