use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{ClusterError, MonitorError};
use crate::node::{Node, NodeAddr, Role};
use crate::session::Connector;

/// A set of nodes holding at most one primary.
#[derive(Debug)]
pub struct Cluster {
    name: String,
    nodes: HashMap<NodeAddr, Node>,
}

impl Cluster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: HashMap::new(),
        }
    }

    /// Build a cluster by asking every endpoint for its current role.
    pub async fn discover(
        name: impl Into<String>,
        endpoints: &[NodeAddr],
        connector: Arc<dyn Connector>,
    ) -> Result<Self, MonitorError> {
        let mut cluster = Self::new(name);
        for addr in endpoints {
            let mut node = Node::new(addr.clone(), connector.clone());
            tracing::debug!(node = %addr, "fetching state");
            node.fetch_role().await?;
            cluster.add(node)?;
        }
        cluster.validate()?;
        Ok(cluster)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn add(&mut self, node: Node) -> Result<(), ClusterError> {
        if node.role() == Role::Primary
            && self
                .nodes
                .values()
                .any(|n| n.role() == Role::Primary && n.addr() != node.addr())
        {
            return Err(ClusterError::DuplicatePrimary(node.addr().clone()));
        }
        self.nodes.insert(node.addr().clone(), node);
        Ok(())
    }

    pub fn remove(&mut self, addr: &NodeAddr) -> Option<Node> {
        self.nodes.remove(addr)
    }

    pub fn node(&self, addr: &NodeAddr) -> Option<&Node> {
        self.nodes.get(addr)
    }

    pub(crate) fn node_mut(&mut self, addr: &NodeAddr) -> Option<&mut Node> {
        self.nodes.get_mut(addr)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    /// Members currently holding `role`, ordered by address.
    pub fn members_with_role(&self, role: Role) -> Vec<&Node> {
        let mut members: Vec<&Node> = self.nodes.values().filter(|n| n.role() == role).collect();
        members.sort_by(|a, b| a.addr().cmp(b.addr()));
        members
    }

    /// Check the single-primary invariant. Returns the replica count.
    pub fn validate(&self) -> Result<usize, ClusterError> {
        let primaries = self.members_with_role(Role::Primary);
        match primaries.len() {
            0 => return Err(ClusterError::NoPrimary),
            1 => {}
            _ => {
                return Err(ClusterError::MultiplePrimaries(
                    primaries.iter().map(|n| n.addr().clone()).collect(),
                ))
            }
        }
        let replicas = self.nodes.values().filter(|n| n.role() == Role::Replica).count();
        if replicas == 0 {
            tracing::warn!(cluster = %self.name, "no replicas defined in cluster; are you sure this is correct?");
        }
        Ok(replicas)
    }

    pub fn primary(&self) -> Result<&Node, ClusterError> {
        self.validate()?;
        self.nodes
            .values()
            .find(|n| n.role() == Role::Primary)
            .ok_or(ClusterError::NoPrimary)
    }

    pub fn replicas(&self) -> Result<Vec<&Node>, ClusterError> {
        self.validate()?;
        Ok(self.members_with_role(Role::Replica))
    }
}
