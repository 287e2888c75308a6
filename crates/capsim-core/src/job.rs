//! Job model.
//!
//! A [`Job`] is created Pending by the arrival generator, becomes Running when
//! the scheduler stamps a [`Placement`] on it, and Completed when the engine
//! releases it. Which of the three it is in is decided by the collection that
//! owns it; the job itself only carries its placement.

use capsim_policies::{JobKind, JobRequest};
use serde::{Deserialize, Serialize};

/// Where and when a job runs. Set once, all fields together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub node_id: u32,
    pub start_minute: u64,
    /// `start_minute + duration_minutes`.
    pub end_minute: u64,
}

/// A single GPU job flowing through the simulated cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Unique, strictly increasing in arrival order.
    pub id: u64,
    pub kind: JobKind,
    pub gpus_required: u32,
    pub duration_minutes: u64,
    pub arrival_minute: u64,
    /// Lower value = higher priority.
    pub priority: u32,
    /// SLA wait threshold from the stream. Only inference jobs are judged.
    pub sla_wait_minutes: Option<u64>,
    /// Set when the scheduler starts the job.
    pub placement: Option<Placement>,
}

impl Job {
    /// Stamp the job as started on `node_id` at `minute`.
    pub fn start(&mut self, node_id: u32, minute: u64) {
        debug_assert!(self.placement.is_none(), "job {} started twice", self.id);
        self.placement = Some(Placement {
            node_id,
            start_minute: minute,
            end_minute: minute + self.duration_minutes,
        });
    }

    pub fn assigned_node(&self) -> Option<u32> {
        self.placement.map(|p| p.node_id)
    }

    pub fn start_minute(&self) -> Option<u64> {
        self.placement.map(|p| p.start_minute)
    }

    pub fn end_minute(&self) -> Option<u64> {
        self.placement.map(|p| p.end_minute)
    }

    /// Whether a running job is due for release at `minute`.
    pub fn is_finished_at(&self, minute: u64) -> bool {
        matches!(self.placement, Some(p) if p.end_minute <= minute)
    }

    /// Queue wait: start minus arrival. Absent until the job starts.
    pub fn wait_minutes(&self) -> Option<u64> {
        self.placement
            .map(|p| p.start_minute.saturating_sub(self.arrival_minute))
    }

    /// SLA verdict. Defined only for inference jobs with a threshold that
    /// have started.
    pub fn sla_violation(&self) -> Option<bool> {
        match (self.kind, self.sla_wait_minutes, self.wait_minutes()) {
            (JobKind::Inference, Some(threshold), Some(wait)) => Some(wait > threshold),
            _ => None,
        }
    }

    /// Policy-facing view of the job.
    pub fn request(&self) -> JobRequest {
        JobRequest {
            id: self.id,
            kind: self.kind,
            priority: self.priority,
            gpus_required: self.gpus_required,
            arrival_minute: self.arrival_minute,
        }
    }
}
