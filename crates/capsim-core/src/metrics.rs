//! Metrics collection and aggregation for simulation runs.
//!
//! Tracks one [`TickSnapshot`] per tick, then turns the snapshots and the
//! completed jobs into a job table, a cost estimate and a run [`Summary`].

use crate::config::{Interconnect, PricingConfig, SimConfig};
use crate::job::Job;
use capsim_policies::JobKind;
use serde::{Deserialize, Serialize};

/// Floor applied to the efficiency factor before dividing by it.
pub const MIN_EFFICIENCY: f64 = 1e-9;

/// Cluster state recorded at the end of one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub minute: u64,
    pub total_gpus: u32,
    pub busy_gpus: u32,
    /// `busy / total`, or 0 for an empty cluster.
    pub utilization: f64,
    pub queue_depth: u64,
    pub running_jobs: u64,
    /// Cumulative completions so far.
    pub completed_jobs: u64,
}

/// One row of the job table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: u64,
    pub job_type: JobKind,
    pub priority: u32,
    pub gpus_required: u32,
    pub arrival_minute: u64,
    pub start_minute: Option<u64>,
    pub end_minute: Option<u64>,
    pub wait_minutes: Option<u64>,
    pub assigned_node: Option<u32>,
    pub sla_wait_minutes: Option<u64>,
    pub sla_violation: Option<bool>,
}

impl JobRecord {
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            job_type: job.kind,
            priority: job.priority,
            gpus_required: job.gpus_required,
            arrival_minute: job.arrival_minute,
            start_minute: job.start_minute(),
            end_minute: job.end_minute(),
            wait_minutes: job.wait_minutes(),
            assigned_node: job.assigned_node(),
            sla_wait_minutes: job.sla_wait_minutes,
            sla_violation: job.sla_violation(),
        }
    }
}

/// Percentile values for a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p95: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Percentiles {
    /// Compute percentiles from a slice of values, interpolating linearly
    /// between closest ranks. `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let n = sorted.len();
        let mean = sorted.iter().sum::<f64>() / n as f64;

        Some(Self {
            p50: percentile_sorted(&sorted, 50.0),
            p95: percentile_sorted(&sorted, 95.0),
            min: sorted[0],
            max: sorted[n - 1],
            mean,
        })
    }
}

fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Busy-time cost of a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub busy_gpu_hours: f64,
    pub raw_gpu_cost_usd: f64,
    pub total_cost_usd: f64,
}

/// Price the busy GPU time in `ticks`.
///
/// Each snapshot stands for `step_minutes` of its busy count. The total
/// applies the overhead multiplier and divides by the efficiency factor,
/// floored at [`MIN_EFFICIENCY`].
pub fn summarize_cost(
    ticks: &[TickSnapshot],
    pricing: &PricingConfig,
    efficiency_factor: f64,
    step_minutes: u64,
) -> CostSummary {
    let busy_gpu_minutes: f64 = ticks
        .iter()
        .map(|t| t.busy_gpus as f64 * step_minutes as f64)
        .sum();
    let busy_gpu_hours = busy_gpu_minutes / 60.0;
    let raw_gpu_cost_usd = busy_gpu_hours * pricing.gpu_hour_cost_usd;
    let total_cost_usd =
        raw_gpu_cost_usd * pricing.overhead_multiplier / efficiency_factor.max(MIN_EFFICIENCY);
    CostSummary {
        busy_gpu_hours,
        raw_gpu_cost_usd,
        total_cost_usd,
    }
}

/// Headline figures for one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub policy: String,
    pub cluster_name: String,
    pub gpu_type: String,
    pub interconnect: Interconnect,
    pub total_gpus: u32,
    pub avg_utilization: f64,
    pub jobs_completed: u64,
    pub wait_p50_min: Option<f64>,
    pub wait_p95_min: Option<f64>,
    pub inference_sla_violation_rate: Option<f64>,
    pub busy_gpu_hours: f64,
    pub raw_gpu_cost_usd: f64,
    pub total_cost_usd: f64,
    /// Jobs still queued when the horizon was reached. Not in the job table.
    pub jobs_pending_at_end: u64,
    /// Jobs still running when the horizon was reached. Not in the job table.
    pub jobs_running_at_end: u64,
}

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub ticks: Vec<TickSnapshot>,
    pub jobs: Vec<JobRecord>,
    pub summary: Summary,
}

/// Collector that accumulates tick snapshots during simulation.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    ticks: Vec<TickSnapshot>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the end-of-tick snapshot.
    pub fn record_tick(&mut self, snapshot: TickSnapshot) {
        self.ticks.push(snapshot);
    }

    pub fn ticks(&self) -> &[TickSnapshot] {
        &self.ticks
    }

    /// Aggregate the run into a report. Only `completed` jobs enter the job
    /// table and the wait/SLA statistics; the two end counters record what
    /// was left out.
    pub fn aggregate(
        self,
        policy: &str,
        config: &SimConfig,
        completed: &[Job],
        jobs_pending_at_end: u64,
        jobs_running_at_end: u64,
    ) -> SimulationReport {
        let jobs: Vec<JobRecord> = completed.iter().map(JobRecord::from_job).collect();

        let avg_utilization = if self.ticks.is_empty() {
            0.0
        } else {
            self.ticks.iter().map(|t| t.utilization).sum::<f64>() / self.ticks.len() as f64
        };

        let waits: Vec<f64> = jobs
            .iter()
            .filter_map(|r| r.wait_minutes)
            .map(|w| w as f64)
            .collect();
        let wait = Percentiles::from_values(&waits);

        let cost = summarize_cost(
            &self.ticks,
            &config.pricing,
            config.cluster.efficiency_factor,
            config.simulation.time_step_minutes,
        );

        let summary = Summary {
            policy: policy.to_string(),
            cluster_name: config.cluster.name.clone(),
            gpu_type: config.cluster.gpu_type.clone(),
            interconnect: config.cluster.interconnect,
            total_gpus: config.cluster.total_gpus(),
            avg_utilization,
            jobs_completed: jobs.len() as u64,
            wait_p50_min: wait.as_ref().map(|p| p.p50),
            wait_p95_min: wait.as_ref().map(|p| p.p95),
            inference_sla_violation_rate: sla_violation_rate(&jobs),
            busy_gpu_hours: cost.busy_gpu_hours,
            raw_gpu_cost_usd: cost.raw_gpu_cost_usd,
            total_cost_usd: cost.total_cost_usd,
            jobs_pending_at_end,
            jobs_running_at_end,
        };

        SimulationReport {
            ticks: self.ticks,
            jobs,
            summary,
        }
    }
}

/// Violations over inference jobs that have both a threshold and a verdict.
/// `None` when there are no such jobs.
pub fn sla_violation_rate(jobs: &[JobRecord]) -> Option<f64> {
    let verdicts: Vec<bool> = jobs
        .iter()
        .filter(|r| r.job_type == JobKind::Inference)
        .filter_map(|r| r.sla_violation)
        .collect();
    if verdicts.is_empty() {
        return None;
    }
    let violations = verdicts.iter().filter(|&&v| v).count();
    Some(violations as f64 / verdicts.len() as f64)
}

fn fmt_opt(value: Option<f64>, suffix: &str) -> String {
    match value {
        Some(v) => format!("{:.1}{}", v, suffix),
        None => "n/a".to_string(),
    }
}

/// Format a report as a pretty-printed table string.
pub fn format_table(report: &SimulationReport) -> String {
    let s = &report.summary;
    let waits: Vec<f64> = report
        .jobs
        .iter()
        .filter_map(|r| r.wait_minutes)
        .map(|w| w as f64)
        .collect();
    let wait = Percentiles::from_values(&waits);
    let mut out = String::new();
    out.push_str(&format!(
        "\n{:=<70}\n",
        format!("  {} Results  ", s.policy)
    ));
    out.push_str(&format!(
        "  Cluster: {} | {} x {} GPUs | {}\n",
        s.cluster_name, s.total_gpus, s.gpu_type, s.interconnect
    ));
    out.push_str(&format!("{:-<70}\n", "  Capacity  "));
    out.push_str(&format!(
        "  Avg utilization: {:.1}%  Ticks: {}\n",
        s.avg_utilization * 100.0,
        report.ticks.len()
    ));
    out.push_str(&format!("{:-<70}\n", "  Jobs  "));
    out.push_str(&format!(
        "  Completed: {}  Pending at end: {}  Running at end: {}\n",
        s.jobs_completed, s.jobs_pending_at_end, s.jobs_running_at_end
    ));
    out.push_str(&format!(
        "  Wait (min)      P50={:>8}  P95={:>8}\n",
        fmt_opt(s.wait_p50_min, ""),
        fmt_opt(s.wait_p95_min, "")
    ));
    out.push_str(&format!(
        "                  Min={:>8}  Mean={:>7}  Max={:>8}\n",
        fmt_opt(wait.as_ref().map(|p| p.min), ""),
        fmt_opt(wait.as_ref().map(|p| p.mean), ""),
        fmt_opt(wait.as_ref().map(|p| p.max), "")
    ));
    out.push_str(&format!(
        "  Inference SLA violations: {}\n",
        fmt_opt(s.inference_sla_violation_rate.map(|r| r * 100.0), "%")
    ));
    out.push_str(&format!("{:-<70}\n", "  Cost  "));
    out.push_str(&format!(
        "  Busy GPU-hours: {:.2}  Raw: ${:.2}  Total: ${:.2}\n",
        s.busy_gpu_hours, s.raw_gpu_cost_usd, s.total_cost_usd
    ));
    out.push_str(&format!("{:=<70}\n", ""));
    out
}

/// Format a comparison table of multiple policy results.
pub fn format_comparison_table(results: &[SimulationReport]) -> String {
    if results.is_empty() {
        return String::from("No results to compare.\n");
    }

    let mut out = String::new();
    out.push_str(&format!("\n{:=<90}\n", "  Policy Comparison  "));
    out.push_str(&format!(
        "{:<22} {:>8} {:>9} {:>8} {:>8} {:>8} {:>8} {:>12}\n",
        "Policy", "Util%", "Completed", "Wait p50", "Wait p95", "SLA viol", "Pending", "Total $"
    ));
    out.push_str(&format!("{:-<90}\n", ""));

    for r in results {
        let s = &r.summary;
        out.push_str(&format!(
            "{:<22} {:>7.1}% {:>9} {:>8} {:>8} {:>8} {:>8} {:>12.2}\n",
            s.policy,
            s.avg_utilization * 100.0,
            s.jobs_completed,
            fmt_opt(s.wait_p50_min, ""),
            fmt_opt(s.wait_p95_min, ""),
            fmt_opt(s.inference_sla_violation_rate.map(|v| v * 100.0), "%"),
            s.jobs_pending_at_end,
            s.total_cost_usd,
        ));
    }
    out.push_str(&format!("{:=<90}\n", ""));
    out
}
