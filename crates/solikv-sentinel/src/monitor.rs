//! Failure detection and primary promotion.
//!
//! Each cycle runs: validate the cluster, probe every member, then either
//! stop (primary up) or promote a reachable replica. Promotion is strictly
//! sequential:
//!
//! 1. clear the old primary's role marker,
//! 2. detach the candidate from replication (it becomes the primary),
//! 3. re-probe the old primary and, if it answers, make it follow the candidate,
//! 4. point every remaining replica at the candidate, one at a time.
//!
//! Steps 3 and 4 are best effort: a failure is logged and recorded in the
//! [`Promotion`] report without aborting the other reattachments. A failure
//! in step 2 restores the old primary's marker so the next cycle starts
//! from a valid cluster and tries again.

use futures::future::join_all;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::cluster::Cluster;
use crate::config::MonitorConfig;
use crate::error::{ClusterError, MonitorError, NodeError, Result};
use crate::node::{Node, NodeAddr, Role, Status};

/// What a successful cycle did.
#[derive(Debug)]
pub enum CheckOutcome {
    /// Primary is up; nothing was changed.
    Healthy { primary: NodeAddr },
    Promoted(Promotion),
}

#[derive(Debug)]
pub struct Promotion {
    pub old_primary: NodeAddr,
    pub new_primary: NodeAddr,
    pub old_primary_reattached: bool,
    pub reattached: Vec<NodeAddr>,
    pub failed: Vec<NodeError>,
}

pub struct Monitor {
    cluster: Cluster,
    config: MonitorConfig,
    rng: StdRng,
}

impl Monitor {
    pub fn new(cluster: Cluster, config: MonitorConfig) -> Self {
        Self {
            cluster,
            config,
            rng: StdRng::from_entropy(),
        }
    }

    /// Fix the candidate-selection sequence.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Run one cycle.
    ///
    /// The cluster is validated once, up front. Probes only touch `status`,
    /// so the role lookups that follow read the membership directly.
    pub async fn check(&mut self) -> Result<CheckOutcome> {
        self.cluster.validate()?;
        tracing::info!(cluster = %self.cluster.name(), "checking cluster...");

        join_all(self.cluster.nodes_mut().map(|node| node.probe())).await;

        let primary = self
            .cluster
            .members_with_role(Role::Primary)
            .first()
            .copied()
            .ok_or(ClusterError::NoPrimary)?;
        let outcome = if primary.status() == Status::Down {
            let old_primary = primary.addr().clone();
            let candidate = self.pick_candidate()?;
            tracing::info!(
                old_primary = %old_primary,
                new_primary = %candidate,
                "primary is offline; promoting replica"
            );
            CheckOutcome::Promoted(self.promote(old_primary, candidate).await?)
        } else {
            CheckOutcome::Healthy {
                primary: primary.addr().clone(),
            }
        };

        tracing::info!(cluster = %self.cluster.name(), "... cluster check complete");
        Ok(outcome)
    }

    /// Uniformly random choice among the replicas that answered the last probe.
    fn pick_candidate(&mut self) -> Result<NodeAddr> {
        let eligible: Vec<&NodeAddr> = self
            .cluster
            .members_with_role(Role::Replica)
            .into_iter()
            .filter(|n| n.is_up())
            .map(|n| n.addr())
            .collect();
        let listed: Vec<String> = eligible.iter().map(ToString::to_string).collect();
        tracing::info!(eligible = %listed.join(", "), "picking new primary");
        eligible
            .choose(&mut self.rng)
            .map(|addr| (*addr).clone())
            .ok_or(MonitorError::NoEligibleReplica)
    }

    async fn promote(&mut self, old_primary: NodeAddr, candidate: NodeAddr) -> Result<Promotion> {
        let followers: Vec<NodeAddr> = self
            .cluster
            .members_with_role(Role::Replica)
            .into_iter()
            .map(|n| n.addr().clone())
            .filter(|addr| *addr != candidate)
            .collect();

        self.member(&old_primary)?.set_role(Role::Unknown);

        if let Err(e) = self.member(&candidate)?.promote_to_primary().await {
            self.member(&old_primary)?.set_role(Role::Primary);
            return Err(e.into());
        }

        let mut report = Promotion {
            old_primary: old_primary.clone(),
            new_primary: candidate.clone(),
            old_primary_reattached: false,
            reattached: Vec::new(),
            failed: Vec::new(),
        };

        let old = self.member(&old_primary)?;
        if old.probe().await == Status::Up {
            tracing::info!(node = %old_primary, primary = %candidate, "making old primary a replica");
            match old.become_replica_of(&candidate).await {
                Ok(()) => report.old_primary_reattached = true,
                Err(e) => {
                    tracing::error!(node = %old_primary, error = %e, "failed to reattach old primary");
                    report.failed.push(e);
                }
            }
        } else {
            tracing::warn!(node = %old_primary, "old primary still down; leaving it detached");
        }

        for addr in followers {
            tracing::info!(node = %addr, primary = %candidate, "making existing replica follow new primary");
            match self.member(&addr)?.become_replica_of(&candidate).await {
                Ok(()) => report.reattached.push(addr),
                Err(e) => {
                    tracing::error!(node = %addr, error = %e, "failed to reattach replica");
                    report.failed.push(e);
                }
            }
        }

        Ok(report)
    }

    fn member(&mut self, addr: &NodeAddr) -> Result<&mut Node, ClusterError> {
        self.cluster
            .node_mut(addr)
            .ok_or_else(|| ClusterError::UnknownMember(addr.clone()))
    }

    /// Check forever, sleeping `check_delay` between cycles.
    ///
    /// Node faults and a missing promotion candidate are logged and retried
    /// on the next cycle. Returns only when the cluster itself is invalid.
    pub async fn run(&mut self) -> ClusterError {
        tracing::info!(
            cluster = %self.cluster.name(),
            delay = ?self.config.check_delay,
            "entering checking loop"
        );
        loop {
            match self.check().await {
                Ok(outcome) => {
                    let primary = match outcome {
                        CheckOutcome::Healthy { primary } => primary,
                        CheckOutcome::Promoted(report) => report.new_primary,
                    };
                    tracing::info!(
                        "{} replica(s) with {} as primary",
                        self.cluster.members_with_role(Role::Replica).len(),
                        primary
                    );
                }
                Err(MonitorError::Cluster(e)) => {
                    tracing::error!(error = %e, "cluster is invalid; giving up");
                    return e;
                }
                Err(MonitorError::Node(e)) => {
                    tracing::error!(node = %e.node(), error = %e, "node operation failed");
                }
                Err(e) => tracing::error!(error = %e, "cycle aborted"),
            }
            tokio::time::sleep(self.config.check_delay).await;
        }
    }
}
