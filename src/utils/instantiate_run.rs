// src/utils/instantiate_run.rs
use chrono::{NaiveDateTime, Utc};
use log::info;
use std::path::Path;
use uuid::Uuid;

use crate::config::BlockingConfig;
use crate::models::RunStats;

pub fn new_run_id() -> (String, NaiveDateTime) {
    let run_timestamp = Utc::now().naive_utc();
    let run_id = format!(
        "run_{}_{}",
        run_timestamp.format("%Y%m%d_%H%M%S"),
        Uuid::new_v4().simple()
    );
    (run_id, run_timestamp)
}

/// Fresh `RunStats` for a run that has not processed anything yet.
pub fn create_initial_run_stats(
    config: &BlockingConfig,
    input: &Path,
    output: &Path,
    description: Option<&str>,
) -> RunStats {
    let (run_id, run_timestamp) = new_run_id();
    info!("Instantiated blocking run with ID: {}", run_id);

    RunStats {
        run_id,
        run_timestamp,
        description: description.map(|s| s.to_string()),
        engine: config.engine.as_str().to_string(),
        chunk_size: config.chunk_size,
        join_empty_core: config.join_empty_core,
        input_path: input.display().to_string(),
        output_path: output.display().to_string(),
        total_rows_side_1: 0,
        total_rows_side_2: 0,
        malformed_cells: 0,
        empty_core_rows: 0,
        batches: 0,
        candidate_pairs: 0,
        parse_and_ingest_time: 0.0,
        join_time: 0.0,
        total_processing_time: 0.0,
    }
}
