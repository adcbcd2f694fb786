// src/blocking/on_disk.rs
use anyhow::Result;
use log::debug;
use std::path::PathBuf;

use crate::blocking::store::{Side, SqliteStore, StagingStore};
use crate::blocking::{count_empty_cores, BlockingEngine, CandidateSink, ParsedBatch};
use crate::models::JoinStats;

/// Appends each batch to an on-disk store as it arrives and runs the join
/// there, so memory stays bounded by one batch plus the join cursor.
pub struct ChunkedOnDiskEngine {
    store_path: Option<PathBuf>,
    join_empty_core: bool,
}

impl ChunkedOnDiskEngine {
    pub fn new(store_path: Option<PathBuf>, join_empty_core: bool) -> Self {
        Self {
            store_path,
            join_empty_core,
        }
    }
}

impl BlockingEngine for ChunkedOnDiskEngine {
    fn name(&self) -> &'static str {
        "chunked_on_disk"
    }

    fn join(
        &mut self,
        batches: &mut dyn Iterator<Item = Result<ParsedBatch>>,
        sink: &mut dyn CandidateSink,
    ) -> Result<JoinStats> {
        let mut store = SqliteStore::open(self.store_path.as_deref())?;
        store.create_staging_tables()?;

        let mut stats = JoinStats::default();
        for batch in batches {
            let batch = batch?;
            stats.batches += 1;
            stats.rows_side_1 += store.append_batch(Side::One, &batch.side_1)? as u64;
            stats.rows_side_2 += store.append_batch(Side::Two, &batch.side_2)? as u64;
            stats.empty_core_rows += count_empty_cores(&batch);
            debug!(
                "Staged batch {} ({} + {} rows)",
                stats.batches,
                batch.side_1.len(),
                batch.side_2.len()
            );
        }

        store.finish_ingestion()?;
        stats.candidate_pairs = store.equi_join(self.join_empty_core, sink)?;
        store.close()?;
        Ok(stats)
    }
}
