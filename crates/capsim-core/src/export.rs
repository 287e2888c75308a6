//! Report export.
//!
//! Tick and job tables go out as CSV with a fixed header row, the summary as
//! pretty-printed JSON. Absent values become empty CSV cells and JSON `null`.

use crate::metrics::{JobRecord, SimulationReport, Summary, TickSnapshot};
use csv::WriterBuilder;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const TICK_HEADERS: [&str; 7] = [
    "minute",
    "total_gpus",
    "busy_gpus",
    "utilization",
    "queue_depth",
    "running_jobs",
    "completed_jobs",
];

const JOB_HEADERS: [&str; 11] = [
    "job_id",
    "job_type",
    "priority",
    "gpus_required",
    "arrival_minute",
    "start_minute",
    "end_minute",
    "wait_minutes",
    "assigned_node",
    "sla_wait_minutes",
    "sla_violation",
];

fn write_csv<W: Write, T: Serialize>(
    writer: W,
    headers: &[&str],
    rows: &[T],
) -> Result<(), ExportError> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_writer(writer);
    wtr.write_record(headers)?;
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the tick table. The header row is written even with no ticks.
pub fn write_ticks_csv<W: Write>(writer: W, ticks: &[TickSnapshot]) -> Result<(), ExportError> {
    write_csv(writer, &TICK_HEADERS, ticks)
}

/// Write the job table. The header row is written even with no jobs.
pub fn write_jobs_csv<W: Write>(writer: W, jobs: &[JobRecord]) -> Result<(), ExportError> {
    write_csv(writer, &JOB_HEADERS, jobs)
}

pub fn write_summary_json<W: Write>(mut writer: W, summary: &Summary) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, summary)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Write `<stem>_tick.csv`, `<stem>_jobs.csv` and `<stem>_summary.json` into
/// `dir`, creating it if needed. Returns the paths written.
pub fn write_report(
    dir: &Path,
    stem: &str,
    report: &SimulationReport,
) -> Result<Vec<PathBuf>, ExportError> {
    fs::create_dir_all(dir)?;

    let tick_path = dir.join(format!("{stem}_tick.csv"));
    write_ticks_csv(BufWriter::new(File::create(&tick_path)?), &report.ticks)?;

    let jobs_path = dir.join(format!("{stem}_jobs.csv"));
    write_jobs_csv(BufWriter::new(File::create(&jobs_path)?), &report.jobs)?;

    let summary_path = dir.join(format!("{stem}_summary.json"));
    write_summary_json(BufWriter::new(File::create(&summary_path)?), &report.summary)?;

    Ok(vec![tick_path, jobs_path, summary_path])
}
