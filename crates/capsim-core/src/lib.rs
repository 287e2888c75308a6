//! capsim: fixed-step capacity simulator for shared GPU clusters.
//!
//! This crate provides the core simulation engine that models a cluster of
//! GPU nodes, stochastic job arrivals, a pending queue and the jobs running
//! on each node. Placement policies from `capsim-policies` are plugged in to
//! choose a node for each job the scheduler tries to start.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐     ┌───────────┐     ┌──────────────┐
//! │ Arrivals │────▶│  Engine   │────▶│   Metrics    │
//! │ (Poisson)│     │  (Ticks)  │     │ Cost / SLA   │
//! └──────────┘     └─────┬─────┘     └──────┬───────┘
//!                        │                  │
//!                ┌───────┴───────┐    ┌─────┴─────┐
//!                │   Scheduler   │    │  Export   │
//!                │ Order + Policy│    │ CSV/JSON  │
//!                └───────┬───────┘    └───────────┘
//!                        │
//!          ┌─────────────┼─────────────┐
//!          ▼             ▼             ▼
//!    ┌──────────┐  ┌──────────┐  ┌──────────┐
//!    │  Node 0  │  │  Node 1  │  │  Node N  │
//!    │ free GPUs│  │ free GPUs│  │ free GPUs│
//!    │ jobs     │  │ jobs     │  │ jobs     │
//!    └──────────┘  └──────────┘  └──────────┘
//! ```

pub mod arrivals;
pub mod clock;
pub mod cluster;
pub mod config;
pub mod engine;
pub mod export;
pub mod job;
pub mod metrics;
pub mod scheduler;

// Re-export key types for convenience.
pub use arrivals::ArrivalGenerator;
pub use clock::TickClock;
pub use cluster::{ClusterState, Node};
pub use config::{ConfigError, SimConfig};
pub use engine::SimulationEngine;
pub use export::{write_report, ExportError};
pub use job::{Job, Placement};
pub use metrics::{JobRecord, MetricsCollector, SimulationReport, Summary, TickSnapshot};

/// Run a complete simulation with the given config and policy.
pub fn run_simulation(
    config: SimConfig,
    policy: Box<dyn capsim_policies::SchedulingPolicy>,
) -> SimulationReport {
    SimulationEngine::new(config, policy).run()
}

/// Run a simulation with the policy named in `scheduler.policy`.
pub fn run_configured(config: SimConfig) -> SimulationReport {
    let policy = config.scheduler.policy.build();
    run_simulation(config, policy)
}

/// Run a comparison of multiple policies on the same config and seed.
///
/// Each run gets its own cluster and random source. Unknown names are
/// skipped.
pub fn compare_policies(config: &SimConfig, policy_names: &[&str]) -> Vec<SimulationReport> {
    policy_names
        .iter()
        .filter_map(|name| {
            let policy = capsim_policies::policy_by_name(name)?;
            Some(run_simulation(config.clone(), policy))
        })
        .collect()
}
