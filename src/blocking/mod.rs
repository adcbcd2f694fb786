// src/blocking/mod.rs
//
// Candidate generation: an equi-join of side 1 against side 2 on
// (merchant_type, core). Engines differ only in where the rows live while the
// join runs; for the same input they must emit the same pairs in the same order.
pub mod in_memory;
pub mod on_disk;
pub mod pipeline;
pub mod store;

use anyhow::Result;

use crate::config::{BlockingConfig, EngineKind};
use crate::models::{CandidatePair, JoinStats, ParsedMerchant};

pub use in_memory::InMemoryEngine;
pub use on_disk::ChunkedOnDiskEngine;
pub use pipeline::run_blocking;

/// Receives candidate pairs as the join produces them. Pairs borrow from the
/// engine, so a sink that keeps them must copy what it needs.
pub trait CandidateSink {
    fn accept(&mut self, pair: CandidatePair<'_>) -> Result<()>;
}

/// Parsed rows of one input batch.
#[derive(Debug, Clone, Default)]
pub struct ParsedBatch {
    pub side_1: Vec<ParsedMerchant>,
    pub side_2: Vec<ParsedMerchant>,
}

pub trait BlockingEngine {
    fn name(&self) -> &'static str;

    /// Consumes every batch, then emits all pairs sharing a block key, ordered
    /// by side-1 row id and then side-2 row id. Rows with an empty core only
    /// take part when the engine was built with `join_empty_core`.
    fn join(
        &mut self,
        batches: &mut dyn Iterator<Item = Result<ParsedBatch>>,
        sink: &mut dyn CandidateSink,
    ) -> Result<JoinStats>;
}

pub fn build_engine(config: &BlockingConfig) -> Box<dyn BlockingEngine> {
    match config.engine {
        EngineKind::InMemory => Box::new(InMemoryEngine::new(config.join_empty_core)),
        EngineKind::ChunkedOnDisk => Box::new(ChunkedOnDiskEngine::new(
            config.store_path.clone(),
            config.join_empty_core,
        )),
    }
}

/// Pair identity as kept by [`PairCollector`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectedPair {
    pub row_id_1: u64,
    pub row_id_2: u64,
    pub block_key: String,
}

/// Sink that keeps every pair in memory.
#[derive(Debug, Default)]
pub struct PairCollector {
    pub pairs: Vec<CollectedPair>,
}

impl CandidateSink for PairCollector {
    fn accept(&mut self, pair: CandidatePair<'_>) -> Result<()> {
        self.pairs.push(CollectedPair {
            row_id_1: pair.left.row_id,
            row_id_2: pair.right.row_id,
            block_key: pair.block_key(),
        });
        Ok(())
    }
}

/// Counts the rows of a batch that cannot take part in the join unless
/// empty cores are allowed.
pub(crate) fn count_empty_cores(batch: &ParsedBatch) -> u64 {
    batch
        .side_1
        .iter()
        .chain(batch.side_2.iter())
        .filter(|p| p.has_empty_core())
        .count() as u64
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::RawRecord;
    use crate::parsing::parse_record;

    /// Parses `side_1` / `side_2` names with consecutive row ids and splits
    /// them into batches of `chunk` rows.
    pub fn batches(side_1: &[&str], side_2: &[&str], chunk: usize) -> Vec<ParsedBatch> {
        let rows = side_1.len().max(side_2.len());
        let mut out = Vec::new();
        let mut start = 0;
        while start < rows {
            let end = (start + chunk).min(rows);
            let mut batch = ParsedBatch::default();
            for i in start..end {
                if let Some(name) = side_1.get(i) {
                    batch.side_1.push(parse_record(&RawRecord::new(i as u64, *name)));
                }
                if let Some(name) = side_2.get(i) {
                    batch.side_2.push(parse_record(&RawRecord::new(i as u64, *name)));
                }
            }
            out.push(batch);
            start = end;
        }
        out
    }

    pub fn run_engine(
        engine: &mut dyn BlockingEngine,
        batches: Vec<ParsedBatch>,
    ) -> (JoinStats, Vec<CollectedPair>) {
        let mut sink = PairCollector::default();
        let mut iter = batches.into_iter().map(Ok::<ParsedBatch, anyhow::Error>);
        let stats = engine.join(&mut iter, &mut sink).unwrap();
        (stats, sink.pairs)
    }

    /// Reference join: full cross product filtered on the block key.
    pub fn brute_force(batches: &[ParsedBatch], join_empty_core: bool) -> Vec<CollectedPair> {
        let left: Vec<&ParsedMerchant> = batches.iter().flat_map(|b| b.side_1.iter()).collect();
        let right: Vec<&ParsedMerchant> = batches.iter().flat_map(|b| b.side_2.iter()).collect();
        let mut pairs = Vec::new();
        for l in &left {
            for r in &right {
                if l.block_key() == r.block_key() && (join_empty_core || !l.has_empty_core()) {
                    pairs.push(CollectedPair {
                        row_id_1: l.row_id,
                        row_id_2: r.row_id,
                        block_key: l.block_key().to_string(),
                    });
                }
            }
        }
        pairs
    }
}
