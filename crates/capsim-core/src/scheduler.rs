//! Per-tick scheduling pass.
//!
//! The pass owns everything around the policy: it orders the pending queue
//! with [`QueueOrder`], asks the policy for one decision per job, checks that
//! decision against the node's actual free capacity, debits the node and
//! stamps the job's placement. A single pass per tick, no backtracking.

use crate::cluster::ClusterState;
use crate::job::Job;
use capsim_policies::{PlacementDecision, QueueOrder, SchedulingPolicy};
use tracing::warn;

/// Place as many pending jobs as fit at `minute`.
///
/// Started jobs are removed from `queue` and returned in placement order.
/// Jobs left behind keep their arrival order in `queue`.
pub fn allocate_jobs(
    cluster: &mut ClusterState,
    queue: &mut Vec<Job>,
    policy: &mut dyn SchedulingPolicy,
    order: &QueueOrder,
    minute: u64,
) -> Vec<Job> {
    if queue.is_empty() {
        return Vec::new();
    }

    let mut indices: Vec<usize> = (0..queue.len()).collect();
    indices.sort_by(|&a, &b| order.compare(&queue[a].request(), &queue[b].request()));

    let mut placement_order = Vec::new();
    let mut snapshots = cluster.snapshots();

    for idx in indices {
        let request = queue[idx].request();
        let node_id = match policy.place(&request, &snapshots) {
            PlacementDecision::Place(node_id) => node_id,
            PlacementDecision::Defer => continue,
        };

        let allocated = match cluster.node_mut(node_id) {
            Some(node) => {
                if node.allocate(request.id, request.gpus_required) {
                    snapshots[node_id as usize] = node.snapshot();
                    true
                } else {
                    false
                }
            }
            None => false,
        };
        if !allocated {
            warn!(
                policy = policy.name(),
                job_id = request.id,
                node_id,
                gpus = request.gpus_required,
                "policy chose a node without room, deferring job"
            );
            continue;
        }

        queue[idx].start(node_id, minute);
        placement_order.push(idx);
    }

    let mut slots: Vec<Option<Job>> = queue.drain(..).map(Some).collect();
    let started = placement_order
        .iter()
        .filter_map(|&idx| slots[idx].take())
        .collect();
    queue.extend(slots.into_iter().flatten());
    started
}
