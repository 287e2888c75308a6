/// Integration tests for CSV/JSON export of simulation reports.
use capsim_core::config::SimConfig;
use capsim_core::export::{write_jobs_csv, write_report, write_summary_json, write_ticks_csv};
use capsim_core::{SimulationReport, Summary};
use std::path::PathBuf;

fn report() -> SimulationReport {
    let config = SimConfig::from_str(
        r#"
seed = 3

[cluster]
name = "export-test"
nodes = 2
gpus_per_node = 4
gpu_type = "A10G"
interconnect = "PCIE"

[pricing]
gpu_hour_cost_usd = 1.25

[simulation]
duration_minutes = 120

[[workload.job_streams]]
name = "chat"
job_type = "inference"
arrivals_per_hour = 40
gpus_required_min = 1
gpus_required_max = 2
duration_minutes_min = 3
duration_minutes_max = 15
priority = 1
sla_wait_minutes = 1

[[workload.job_streams]]
name = "train"
job_type = "training"
arrivals_per_hour = 6
gpus_required_min = 2
gpus_required_max = 4
duration_minutes_min = 20
duration_minutes_max = 60
priority = 2
"#,
    )
    .unwrap();
    capsim_core::run_configured(config)
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("capsim-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

#[test]
fn test_tick_csv_shape() {
    let report = report();
    let mut buf = Vec::new();
    write_ticks_csv(&mut buf, &report.ticks).unwrap();
    let text = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(
        lines[0],
        "minute,total_gpus,busy_gpus,utilization,queue_depth,running_jobs,completed_jobs"
    );
    assert_eq!(lines.len(), report.ticks.len() + 1);
    assert!(lines[1].starts_with("0,8,"));
}

#[test]
fn test_job_csv_rows() {
    let report = report();
    let mut buf = Vec::new();
    write_jobs_csv(&mut buf, &report.jobs).unwrap();
    let text = String::from_utf8(buf).unwrap();

    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 11);
    assert_eq!(&headers[1], "job_type");

    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), report.jobs.len());
    for (row, job) in rows.iter().zip(&report.jobs) {
        assert_eq!(row[0].parse::<u64>().unwrap(), job.job_id);
        match &row[1] {
            "training" => assert_eq!(&row[10], ""),
            "inference" => assert!(matches!(&row[10], "true" | "false")),
            other => panic!("unexpected job_type {other}"),
        }
    }
}

#[test]
fn test_summary_json_roundtrip() {
    let report = report();
    let mut buf = Vec::new();
    write_summary_json(&mut buf, &report.summary).unwrap();

    let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(value["interconnect"], "PCIE");
    assert_eq!(value["cluster_name"], "export-test");
    assert!(value.get("jobs_pending_at_end").is_some());

    let parsed: Summary = serde_json::from_slice(&buf).unwrap();
    assert_eq!(parsed.jobs_completed, report.summary.jobs_completed);
    assert_eq!(parsed.policy, report.summary.policy);
}

#[test]
fn test_absent_summary_values_are_null() {
    let mut summary = report().summary;
    summary.wait_p50_min = None;
    summary.inference_sla_violation_rate = None;
    let mut buf = Vec::new();
    write_summary_json(&mut buf, &summary).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert!(value["wait_p50_min"].is_null());
    assert!(value["inference_sla_violation_rate"].is_null());
}

#[test]
fn test_write_report_files() {
    let report = report();
    let dir = scratch_dir("report");
    let paths = write_report(&dir, "pod", &report).unwrap();

    let names: Vec<String> = paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["pod_tick.csv", "pod_jobs.csv", "pod_summary.json"]);
    for path in &paths {
        assert!(path.exists());
    }

    let ticks = std::fs::read_to_string(dir.join("pod_tick.csv")).unwrap();
    assert_eq!(ticks.lines().count(), report.ticks.len() + 1);

    let _ = std::fs::remove_dir_all(&dir);
}
