//! Best-Fit-Decreasing placement.
//!
//! Places each job on the fitting node that would be left with the fewest
//! free GPUs, keeping large holes open for large jobs. Ties go to the lowest
//! node id.

use crate::traits::*;

/// Best-fit node placement.
pub struct BestFitDecreasing;

impl BestFitDecreasing {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BestFitDecreasing {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulingPolicy for BestFitDecreasing {
    fn place(&mut self, job: &JobRequest, nodes: &[NodeSnapshot]) -> PlacementDecision {
        // fitting_nodes is id-ordered and min_by_key keeps the first minimum.
        match fitting_nodes(job, nodes)
            .into_iter()
            .min_by_key(|n| n.free_gpus - job.gpus_required)
        {
            Some(node) => PlacementDecision::Place(node.id),
            None => PlacementDecision::Defer,
        }
    }

    fn name(&self) -> &str {
        "best_fit_decreasing"
    }
}
