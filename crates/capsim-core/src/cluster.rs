//! Cluster resource pool.
//!
//! A [`ClusterState`] is a fixed set of [`Node`]s, each tracking total and
//! free GPUs plus the ids of the jobs running on it. Cluster-wide totals are
//! derived from the nodes rather than stored twice.

use crate::config::ClusterConfig;
use capsim_policies::NodeSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A single node in the cluster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: u32,
    pub total_gpus: u32,
    pub free_gpus: u32,
    /// Ids of jobs currently running here.
    pub running: BTreeSet<u64>,
}

impl Node {
    pub fn new(id: u32, total_gpus: u32) -> Self {
        Self {
            id,
            total_gpus,
            free_gpus: total_gpus,
            running: BTreeSet::new(),
        }
    }

    pub fn busy_gpus(&self) -> u32 {
        self.total_gpus - self.free_gpus
    }

    pub fn can_fit(&self, gpus: u32) -> bool {
        self.free_gpus >= gpus
    }

    /// Debit `gpus` for `job_id`. Returns false, leaving the node untouched,
    /// if the job does not fit.
    pub fn allocate(&mut self, job_id: u64, gpus: u32) -> bool {
        if !self.can_fit(gpus) {
            return false;
        }
        self.free_gpus -= gpus;
        self.running.insert(job_id);
        true
    }

    /// Credit back `gpus` held by `job_id`.
    pub fn release(&mut self, job_id: u64, gpus: u32) {
        debug_assert!(
            self.running.contains(&job_id),
            "job {} is not running on node {}",
            job_id,
            self.id
        );
        self.running.remove(&job_id);
        self.free_gpus += gpus;
        debug_assert!(
            self.free_gpus <= self.total_gpus,
            "node {} over-released: {} free of {}",
            self.id,
            self.free_gpus,
            self.total_gpus
        );
    }

    /// Policy-facing view of this node.
    pub fn snapshot(&self) -> NodeSnapshot {
        NodeSnapshot {
            id: self.id,
            total_gpus: self.total_gpus,
            free_gpus: self.free_gpus,
            running_jobs: self.running.len() as u32,
        }
    }
}

/// Mutable GPU pool for one simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterState {
    pub config: ClusterConfig,
    pub nodes: Vec<Node>,
}

impl ClusterState {
    /// All nodes fully free, ids `0..nodes`.
    pub fn new(config: ClusterConfig) -> Self {
        let nodes = (0..config.nodes)
            .map(|id| Node::new(id, config.gpus_per_node))
            .collect();
        Self { config, nodes }
    }

    pub fn total_gpus(&self) -> u32 {
        self.config.total_gpus()
    }

    pub fn free_gpus(&self) -> u32 {
        self.nodes.iter().map(|n| n.free_gpus).sum()
    }

    pub fn busy_gpus(&self) -> u32 {
        self.total_gpus().saturating_sub(self.free_gpus())
    }

    /// Busy fraction; zero for an empty cluster.
    pub fn utilization(&self) -> f64 {
        let total = self.total_gpus();
        if total == 0 {
            return 0.0;
        }
        self.busy_gpus() as f64 / total as f64
    }

    /// Largest single-node capacity. Jobs above this can never be placed.
    pub fn largest_node_gpus(&self) -> u32 {
        self.nodes.iter().map(|n| n.total_gpus).max().unwrap_or(0)
    }

    pub fn node(&self, id: u32) -> Option<&Node> {
        self.nodes.get(id as usize)
    }

    pub fn node_mut(&mut self, id: u32) -> Option<&mut Node> {
        self.nodes.get_mut(id as usize)
    }

    pub fn snapshots(&self) -> Vec<NodeSnapshot> {
        self.nodes.iter().map(Node::snapshot).collect()
    }
}
