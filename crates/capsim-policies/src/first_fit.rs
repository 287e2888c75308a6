//! First-Fit-Decreasing placement.
//!
//! Scans nodes in ascending id order and places each job on the first node
//! with enough free GPUs. Combined with the size-descending queue order this
//! is the classic FFD bin-packing heuristic.

use crate::traits::*;

/// First-fit node placement.
pub struct FirstFitDecreasing;

impl FirstFitDecreasing {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FirstFitDecreasing {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulingPolicy for FirstFitDecreasing {
    fn place(&mut self, job: &JobRequest, nodes: &[NodeSnapshot]) -> PlacementDecision {
        match fitting_nodes(job, nodes).first() {
            Some(node) => PlacementDecision::Place(node.id),
            None => PlacementDecision::Defer,
        }
    }

    fn name(&self) -> &str {
        "first_fit_decreasing"
    }
}
