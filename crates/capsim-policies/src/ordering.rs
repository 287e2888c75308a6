//! Pending-queue ordering.
//!
//! [`QueueOrder`] is the single comparator every policy sees the queue
//! through. The key, in order:
//!
//! 1. priority ascending (1 beats 2),
//! 2. when the inference boost is on, Inference before Training at equal
//!    priority,
//! 3. GPU requirement descending, so larger jobs are packed first
//!    (the "decreasing" in First-Fit-Decreasing).
//!
//! Anything still equal keeps its arrival order: [`QueueOrder::sort`] is a
//! stable sort and callers hand it the queue in arrival order.

use crate::traits::{JobKind, JobRequest};
use std::cmp::Ordering;

/// Named comparator for the pending queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueOrder {
    /// Rank Inference ahead of Training within a priority tier.
    pub inference_boost: bool,
}

impl QueueOrder {
    pub fn new(inference_boost: bool) -> Self {
        Self { inference_boost }
    }

    /// Compare two pending jobs. `Less` means `a` is tried first.
    pub fn compare(&self, a: &JobRequest, b: &JobRequest) -> Ordering {
        a.priority
            .cmp(&b.priority)
            .then_with(|| self.kind_rank(a.kind).cmp(&self.kind_rank(b.kind)))
            .then_with(|| b.gpus_required.cmp(&a.gpus_required))
    }

    /// Stable sort of `jobs` into placement order.
    pub fn sort(&self, jobs: &mut [JobRequest]) {
        jobs.sort_by(|a, b| self.compare(a, b));
    }

    fn kind_rank(&self, kind: JobKind) -> u8 {
        match (self.inference_boost, kind) {
            (true, JobKind::Inference) => 0,
            (true, JobKind::Training) => 1,
            (false, _) => 0,
        }
    }
}
