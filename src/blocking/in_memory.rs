// src/blocking/in_memory.rs
use anyhow::Result;
use log::debug;
use std::collections::HashMap;

use crate::blocking::{count_empty_cores, BlockingEngine, CandidateSink, ParsedBatch};
use crate::models::{BlockKey, CandidatePair, JoinStats, ParsedMerchant};

/// Keeps both sides resident: side 1 as a list, side 2 indexed by block key.
pub struct InMemoryEngine {
    join_empty_core: bool,
}

impl InMemoryEngine {
    pub fn new(join_empty_core: bool) -> Self {
        Self { join_empty_core }
    }

    fn joinable(&self, merchant: &ParsedMerchant) -> bool {
        self.join_empty_core || !merchant.has_empty_core()
    }
}

impl BlockingEngine for InMemoryEngine {
    fn name(&self) -> &'static str {
        "in_memory"
    }

    fn join(
        &mut self,
        batches: &mut dyn Iterator<Item = Result<ParsedBatch>>,
        sink: &mut dyn CandidateSink,
    ) -> Result<JoinStats> {
        let mut stats = JoinStats::default();
        let mut left: Vec<ParsedMerchant> = Vec::new();
        let mut index: HashMap<BlockKey, Vec<ParsedMerchant>> = HashMap::new();

        for batch in batches {
            let batch = batch?;
            stats.batches += 1;
            stats.rows_side_1 += batch.side_1.len() as u64;
            stats.rows_side_2 += batch.side_2.len() as u64;
            stats.empty_core_rows += count_empty_cores(&batch);

            left.extend(batch.side_1.into_iter().filter(|m| self.joinable(m)));
            for merchant in batch.side_2.into_iter().filter(|m| self.joinable(m)) {
                index.entry(merchant.block_key()).or_default().push(merchant);
            }
        }
        debug!(
            "In-memory index built: {} side-1 rows, {} distinct side-2 keys",
            left.len(),
            index.len()
        );

        for l in &left {
            if let Some(matches) = index.get(&l.block_key()) {
                for r in matches {
                    sink.accept(CandidatePair::new(l, r))?;
                    stats.candidate_pairs += 1;
                }
            }
        }

        Ok(stats)
    }
}
