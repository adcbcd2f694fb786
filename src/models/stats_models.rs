// src/models/stats_models.rs
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Counters reported by a join engine for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStats {
    pub rows_side_1: u64,
    pub rows_side_2: u64,
    pub empty_core_rows: u64,
    pub batches: u64,
    pub candidate_pairs: u64,
}

/// Bookkeeping for one blocking run, logged at the end and optionally dumped as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStats {
    pub run_id: String,
    pub run_timestamp: NaiveDateTime,
    pub description: Option<String>,
    pub engine: String,
    pub chunk_size: usize,
    pub join_empty_core: bool,
    pub input_path: String,
    pub output_path: String,
    pub total_rows_side_1: u64,
    pub total_rows_side_2: u64,
    pub malformed_cells: u64,
    pub empty_core_rows: u64,
    pub batches: u64,
    pub candidate_pairs: u64,
    pub parse_and_ingest_time: f64,
    pub join_time: f64,
    pub total_processing_time: f64,
}

impl RunStats {
    /// Fraction of the full cross product removed by blocking; 0.0 when either
    /// side is empty.
    pub fn reduction_ratio(&self) -> f64 {
        let full = self.total_rows_side_1 as f64 * self.total_rows_side_2 as f64;
        if full == 0.0 {
            0.0
        } else {
            1.0 - (self.candidate_pairs as f64 / full)
        }
    }
}
