//! TOML configuration parsing for capsim.
//!
//! Defines the complete configuration schema for a simulation run: cluster
//! shape, pricing, simulation horizon, scheduler policy and job arrival
//! streams. Validation runs before any engine is built, so the engine only
//! ever sees a fully valid configuration.

use capsim_policies::{JobKind, PolicyKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Validation(String),
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Seed for the run's random source.
    #[serde(default)]
    pub seed: u64,
    pub cluster: ClusterConfig,
    pub pricing: PricingConfig,
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
}

/// Node interconnect. Reporting only; it does not affect placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interconnect {
    #[serde(rename = "NVLINK", alias = "nvlink")]
    Nvlink,
    #[serde(rename = "PCIE", alias = "pcie")]
    Pcie,
}

impl fmt::Display for Interconnect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interconnect::Nvlink => f.write_str("NVLINK"),
            Interconnect::Pcie => f.write_str("PCIE"),
        }
    }
}

/// Cluster shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    pub name: String,
    /// Number of nodes.
    pub nodes: u32,
    pub gpus_per_node: u32,
    /// Free-form GPU model label, e.g. "H100".
    pub gpu_type: String,
    pub interconnect: Interconnect,
    /// Productive fraction of busy GPU time, in (0, 1].
    #[serde(default = "default_efficiency_factor")]
    pub efficiency_factor: f64,
}

fn default_efficiency_factor() -> f64 {
    0.9
}

impl ClusterConfig {
    /// Total GPUs in the cluster.
    pub fn total_gpus(&self) -> u32 {
        self.nodes * self.gpus_per_node
    }
}

/// GPU pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub gpu_hour_cost_usd: f64,
    #[serde(default = "default_overhead_multiplier")]
    pub overhead_multiplier: f64,
}

fn default_overhead_multiplier() -> f64 {
    1.0
}

/// Simulation horizon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub duration_minutes: u64,
    #[serde(default = "default_time_step")]
    pub time_step_minutes: u64,
}

fn default_time_step() -> u64 {
    1
}

/// Scheduler selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub policy: PolicyKind,
    #[serde(default = "default_inference_priority")]
    pub enable_inference_priority: bool,
    /// Reserved. Accepted for config compatibility; nothing preempts.
    #[serde(default)]
    pub enable_preemption: bool,
}

fn default_inference_priority() -> bool {
    true
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy: PolicyKind::default(),
            enable_inference_priority: default_inference_priority(),
            enable_preemption: false,
        }
    }
}

/// Workload section: the list of job arrival streams. May be empty, which
/// gives an idle run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadConfig {
    #[serde(default)]
    pub job_streams: Vec<JobStreamConfig>,
}

/// One stochastic job arrival stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobStreamConfig {
    pub name: String,
    pub job_type: JobKind,
    /// Poisson arrival rate.
    pub arrivals_per_hour: f64,
    pub gpus_required_min: u32,
    pub gpus_required_max: u32,
    pub duration_minutes_min: u64,
    pub duration_minutes_max: u64,
    /// Lower value = higher priority.
    pub priority: u32,
    /// Maximum acceptable queue wait. Copied onto every job; only inference
    /// jobs are judged against it.
    #[serde(default)]
    pub sla_wait_minutes: Option<u64>,
}

impl SimConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cluster = &self.cluster;
        if cluster.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "cluster.name must not be empty".to_string(),
            ));
        }
        if cluster.nodes == 0 {
            return Err(ConfigError::Validation("cluster.nodes must be > 0".to_string()));
        }
        if cluster.gpus_per_node == 0 {
            return Err(ConfigError::Validation(
                "cluster.gpus_per_node must be > 0".to_string(),
            ));
        }
        if cluster.nodes.checked_mul(cluster.gpus_per_node).is_none() {
            return Err(ConfigError::Validation(format!(
                "cluster of {} x {} GPUs exceeds {} total GPUs",
                cluster.nodes,
                cluster.gpus_per_node,
                u32::MAX
            )));
        }
        if !(cluster.efficiency_factor > 0.0 && cluster.efficiency_factor <= 1.0) {
            return Err(ConfigError::Validation(format!(
                "cluster.efficiency_factor must be in (0, 1], got {}",
                cluster.efficiency_factor
            )));
        }

        if !self.pricing.gpu_hour_cost_usd.is_finite() || self.pricing.gpu_hour_cost_usd < 0.0 {
            return Err(ConfigError::Validation(
                "pricing.gpu_hour_cost_usd must be >= 0".to_string(),
            ));
        }
        if !self.pricing.overhead_multiplier.is_finite() || self.pricing.overhead_multiplier <= 0.0
        {
            return Err(ConfigError::Validation(
                "pricing.overhead_multiplier must be > 0".to_string(),
            ));
        }

        if self.simulation.duration_minutes == 0 {
            return Err(ConfigError::Validation(
                "simulation.duration_minutes must be > 0".to_string(),
            ));
        }
        if self.simulation.time_step_minutes == 0 {
            return Err(ConfigError::Validation(
                "simulation.time_step_minutes must be > 0".to_string(),
            ));
        }

        let streams = &self.workload.job_streams;
        let mut seen = HashSet::new();
        for stream in streams {
            validate_stream(stream)?;
            if !seen.insert(stream.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate job stream name '{}'",
                    stream.name
                )));
            }
        }

        if streams.is_empty() {
            warn!("workload.job_streams is empty, the cluster will stay idle");
        }
        if self.scheduler.enable_preemption {
            warn!("scheduler.enable_preemption is reserved and has no effect");
        }
        for stream in streams {
            if stream.job_type == JobKind::Training && stream.sla_wait_minutes.is_some() {
                warn!(
                    stream = %stream.name,
                    "sla_wait_minutes on a training stream never counts as a violation"
                );
            }
        }
        Ok(())
    }

    /// Total ticks the run will execute.
    pub fn total_ticks(&self) -> u64 {
        self.simulation
            .duration_minutes
            .div_ceil(self.simulation.time_step_minutes)
    }
}

fn validate_stream(stream: &JobStreamConfig) -> Result<(), ConfigError> {
    if stream.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "job stream name must not be empty".to_string(),
        ));
    }
    if !stream.arrivals_per_hour.is_finite() || stream.arrivals_per_hour < 0.0 {
        return Err(ConfigError::Validation(format!(
            "stream '{}': arrivals_per_hour must be >= 0",
            stream.name
        )));
    }
    if stream.gpus_required_min == 0 || stream.gpus_required_min > stream.gpus_required_max {
        return Err(ConfigError::Validation(format!(
            "stream '{}': need 1 <= gpus_required_min ({}) <= gpus_required_max ({})",
            stream.name, stream.gpus_required_min, stream.gpus_required_max
        )));
    }
    if stream.duration_minutes_min == 0 || stream.duration_minutes_min > stream.duration_minutes_max
    {
        return Err(ConfigError::Validation(format!(
            "stream '{}': need 1 <= duration_minutes_min ({}) <= duration_minutes_max ({})",
            stream.name, stream.duration_minutes_min, stream.duration_minutes_max
        )));
    }
    Ok(())
}
