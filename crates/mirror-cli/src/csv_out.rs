//! CSV output for `mirror sweep` (spec §6).
//!
//! The `csv` writer has no append mode once a header has been written, so
//! appending to an existing results file means reading its rows back out
//! first and rewriting the whole file with old + new rows rather than
//! opening it in append mode and skipping the header.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sweep::SweepPoint;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row {
    pub cpus: u32,
    pub arrival_rate: f64,
    pub cycles: u64,
    pub num_finished: u64,
    pub num_missed: u64,
    pub miss_pct: f64,
    pub idle_cycles: u64,
    pub cc_aborts: u64,
}

impl Row {
    pub fn new(point: SweepPoint, stats: mirror_core::Stats) -> Row {
        Row {
            cpus: point.cpu_count,
            arrival_rate: point.arrival_rate,
            cycles: stats.cycles,
            num_finished: stats.num_finished,
            num_missed: stats.num_missed,
            miss_pct: stats.miss_pct,
            idle_cycles: stats.idle_cycles,
            cc_aborts: stats.cc_aborts,
        }
    }
}

/// Read any rows already present at `path` (an absent file is treated as
/// empty, not an error).
fn read_existing(path: &Path) -> Result<Vec<Row>, String> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    reader
        .deserialize()
        .collect::<Result<Vec<Row>, csv::Error>>()
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))
}

/// Append `new_rows` to the CSV file at `path`, preserving any rows already
/// there.
pub fn append(path: &Path, new_rows: &[Row]) -> Result<(), String> {
    let mut rows = read_existing(path)?;
    rows.extend_from_slice(new_rows);

    let mut writer =
        csv::Writer::from_path(path).map_err(|e| format!("failed to write {}: {e}", path.display()))?;
    for row in &rows {
        writer
            .serialize(row)
            .map_err(|e| format!("failed to write row to {}: {e}", path.display()))?;
    }
    writer
        .flush()
        .map_err(|e| format!("failed to flush {}: {e}", path.display()))
}
