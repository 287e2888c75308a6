//! Fixed-step simulation engine.
//!
//! Each call to [`SimulationEngine::step`] runs one tick in a strict order:
//!
//! 1. **Release**: running jobs whose end minute has been reached give their
//!    GPUs back and move to the completed list.
//! 2. **Arrival**: every stream's new jobs join the pending queue.
//! 3. **Allocate**: the scheduling pass starts whatever fits.
//! 4. **Record**: a [`TickSnapshot`] of the cluster is taken.
//!
//! Jobs move between the queue, the running map and the completed list by
//! value, so each has exactly one owner at a time.

use crate::arrivals::ArrivalGenerator;
use crate::clock::TickClock;
use crate::cluster::ClusterState;
use crate::config::SimConfig;
use crate::job::Job;
use crate::metrics::{MetricsCollector, SimulationReport, TickSnapshot};
use crate::scheduler::allocate_jobs;
use capsim_policies::{QueueOrder, SchedulingPolicy};
use std::collections::BTreeMap;
use tracing::{debug, info, trace, warn};

/// The main simulation engine.
pub struct SimulationEngine {
    /// Virtual clock.
    clock: TickClock,
    /// GPU pool.
    cluster: ClusterState,
    /// Seeded arrival process.
    arrivals: ArrivalGenerator,
    /// Node placement policy.
    policy: Box<dyn SchedulingPolicy>,
    /// Queue comparator.
    order: QueueOrder,
    /// Pending jobs in arrival order.
    queue: Vec<Job>,
    /// Running jobs by id.
    running: BTreeMap<u64, Job>,
    /// Completed jobs in release order.
    completed: Vec<Job>,
    /// Metrics collector.
    metrics: MetricsCollector,
    /// Configuration.
    config: SimConfig,
}

impl SimulationEngine {
    /// Create a new simulation engine from a validated config and a policy.
    pub fn new(config: SimConfig, policy: Box<dyn SchedulingPolicy>) -> Self {
        let step = config.simulation.time_step_minutes;
        let clock = TickClock::new(step, config.simulation.duration_minutes);
        let cluster = ClusterState::new(config.cluster.clone());
        let arrivals =
            ArrivalGenerator::new(config.seed, config.workload.job_streams.clone(), step);
        let order = QueueOrder::new(config.scheduler.enable_inference_priority);

        debug!(
            policy = policy.name(),
            nodes = cluster.nodes.len(),
            total_gpus = cluster.total_gpus(),
            streams = config.workload.job_streams.len(),
            ticks = clock.ticks_total(),
            "engine initialised"
        );

        Self {
            clock,
            cluster,
            arrivals,
            policy,
            order,
            queue: Vec::new(),
            running: BTreeMap::new(),
            completed: Vec::new(),
            metrics: MetricsCollector::new(),
            config,
        }
    }

    /// Run one tick. Returns `None` once the horizon is exhausted.
    pub fn step(&mut self) -> Option<TickSnapshot> {
        if self.clock.is_exhausted() {
            return None;
        }
        let minute = self.clock.now();

        self.release_finished(minute);
        self.admit_arrivals(minute);

        let started = allocate_jobs(
            &mut self.cluster,
            &mut self.queue,
            self.policy.as_mut(),
            &self.order,
            minute,
        );
        for job in started {
            self.running.insert(job.id, job);
        }

        let snapshot = TickSnapshot {
            minute,
            total_gpus: self.cluster.total_gpus(),
            busy_gpus: self.cluster.busy_gpus(),
            utilization: self.cluster.utilization(),
            queue_depth: self.queue.len() as u64,
            running_jobs: self.running.len() as u64,
            completed_jobs: self.completed.len() as u64,
        };
        trace!(
            minute,
            busy = snapshot.busy_gpus,
            queue = snapshot.queue_depth,
            running = snapshot.running_jobs,
            completed = snapshot.completed_jobs,
            "tick"
        );
        self.metrics.record_tick(snapshot.clone());

        self.clock.advance();
        Some(snapshot)
    }

    /// Run to the horizon and aggregate the report.
    pub fn run(mut self) -> SimulationReport {
        info!(
            policy = self.policy.name(),
            cluster = %self.config.cluster.name,
            ticks = self.clock.ticks_total(),
            seed = self.config.seed,
            "simulation started"
        );

        while self.step().is_some() {}

        let pending = self.queue.len() as u64;
        let running = self.running.len() as u64;
        if pending > 0 || running > 0 {
            warn!(
                pending,
                running,
                "horizon reached with unfinished jobs; they are excluded from job statistics"
            );
        }

        let policy = self.policy.name().to_string();
        let report =
            self.metrics
                .aggregate(&policy, &self.config, &self.completed, pending, running);

        info!(
            policy = %policy,
            completed = report.summary.jobs_completed,
            avg_utilization = report.summary.avg_utilization,
            total_cost_usd = report.summary.total_cost_usd,
            "simulation finished"
        );
        report
    }

    /// Move every job due at `minute` from running to completed.
    fn release_finished(&mut self, minute: u64) {
        let due: Vec<u64> = self
            .running
            .values()
            .filter(|job| job.is_finished_at(minute))
            .map(|job| job.id)
            .collect();

        for id in due {
            let Some(job) = self.running.remove(&id) else {
                continue;
            };
            if let Some(node) = job
                .assigned_node()
                .and_then(|node_id| self.cluster.node_mut(node_id))
            {
                node.release(job.id, job.gpus_required);
            }
            self.completed.push(job);
        }
    }

    fn admit_arrivals(&mut self, minute: u64) {
        let largest = self.cluster.largest_node_gpus();
        for job in self.arrivals.generate(minute) {
            if job.gpus_required > largest {
                debug!(
                    job_id = job.id,
                    gpus = job.gpus_required,
                    largest_node = largest,
                    "job larger than any node will never be placed"
                );
            }
            self.queue.push(job);
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn cluster(&self) -> &ClusterState {
        &self.cluster
    }

    /// Pending jobs in arrival order.
    pub fn queue(&self) -> &[Job] {
        &self.queue
    }

    pub fn running(&self) -> &BTreeMap<u64, Job> {
        &self.running
    }

    pub fn completed(&self) -> &[Job] {
        &self.completed
    }

    /// Snapshots recorded so far.
    pub fn ticks(&self) -> &[TickSnapshot] {
        self.metrics.ticks()
    }
}
