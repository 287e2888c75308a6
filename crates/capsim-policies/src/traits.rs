//! Scheduling policy trait definitions.
//!
//! All placement policies implement the [`SchedulingPolicy`] trait, which
//! receives a pending job and read-only node snapshots and decides which node
//! (if any) the job should be placed on this tick.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of workload a job belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Training,
    Inference,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Training => "training",
            JobKind::Inference => "inference",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only snapshot of a node's capacity, provided to policies.
///
/// This is the policy crate's view of a node: only what a placement decision
/// needs, not the full cluster state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSnapshot {
    pub id: u32,
    pub total_gpus: u32,
    pub free_gpus: u32,
    pub running_jobs: u32,
}

impl NodeSnapshot {
    /// Whether a job needing `gpus` fits into the node's free capacity.
    pub fn fits(&self, gpus: u32) -> bool {
        self.free_gpus >= gpus
    }
}

/// Information about a pending job, provided to policies and the queue
/// comparator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobRequest {
    pub id: u64,
    pub kind: JobKind,
    /// Lower value = higher priority.
    pub priority: u32,
    pub gpus_required: u32,
    pub arrival_minute: u64,
}

/// Decision returned by a placement policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementDecision {
    /// Place the job on the node with this id.
    Place(u32),
    /// Leave the job pending; it is reconsidered on the next tick.
    Defer,
}

/// The core placement policy trait.
///
/// The scheduler pass calls [`SchedulingPolicy::place`] once per pending job,
/// in queue order, with snapshots that already reflect placements made
/// earlier in the same pass.
pub trait SchedulingPolicy: Send + Sync {
    /// Choose a node for `job`, or defer it.
    fn place(&mut self, job: &JobRequest, nodes: &[NodeSnapshot]) -> PlacementDecision;

    /// Human-readable name for reports.
    fn name(&self) -> &str;
}

/// Nodes with enough free capacity for `job`, in ascending node-id order.
pub fn fitting_nodes<'a>(job: &JobRequest, nodes: &'a [NodeSnapshot]) -> Vec<&'a NodeSnapshot> {
    let mut fitting: Vec<&NodeSnapshot> = nodes
        .iter()
        .filter(|n| n.fits(job.gpus_required))
        .collect();
    fitting.sort_by_key(|n| n.id);
    fitting
}
