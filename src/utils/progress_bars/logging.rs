// src/utils/progress_bars/logging.rs - Logging helpers for a blocking run
use log::{debug, error, info, warn};
use std::path::Path;
use std::time::Instant;

use crate::config::{BlockingConfig, EngineKind};
use crate::models::{JoinStats, RunStats};

#[derive(Clone)]
pub struct BlockingLogger {
    engine_name: &'static str,
    engine_emoji: &'static str,
    start_time: Instant,
}

impl BlockingLogger {
    pub fn new(engine: EngineKind) -> Self {
        let (engine_name, engine_emoji) = match engine {
            EngineKind::InMemory => ("IN_MEMORY", "🧠"),
            EngineKind::ChunkedOnDisk => ("CHUNKED", "💾"),
        };
        Self {
            engine_name,
            engine_emoji,
            start_time: Instant::now(),
        }
    }

    pub fn log_start(&self, run_id: &str, input: &Path, config: &BlockingConfig) {
        info!(
            "[{}] {} 🚀 Starting blocking run (run ID: {}) on {}",
            self.engine_name,
            self.engine_emoji,
            run_id,
            input.display()
        );
        info!(
            "[{}] {} ⚙️  Configuration: chunk size {}, empty cores {}",
            self.engine_name,
            self.engine_emoji,
            config.chunk_size,
            if config.join_empty_core { "joined" } else { "excluded" }
        );
    }

    pub fn log_phase(&self, phase: &str, details: Option<&str>) {
        let elapsed = self.start_time.elapsed();
        match details {
            Some(details) => info!(
                "[{}] {} 🔄 Phase: {} - {} [+{:.1}s]",
                self.engine_name,
                self.engine_emoji,
                phase,
                details,
                elapsed.as_secs_f32()
            ),
            None => info!(
                "[{}] {} 🔄 Phase: {} [+{:.1}s]",
                self.engine_name,
                self.engine_emoji,
                phase,
                elapsed.as_secs_f32()
            ),
        }
    }

    pub fn log_batch(&self, batch_idx: u64, rows: usize, total_rows: u64, memory_mb: Option<u64>) {
        match memory_mb {
            Some(mb) => debug!(
                "[{}] {} 📦 Batch {}: {} rows ({} total, {} MB used)",
                self.engine_name, self.engine_emoji, batch_idx, rows, total_rows, mb
            ),
            None => debug!(
                "[{}] {} 📦 Batch {}: {} rows ({} total)",
                self.engine_name, self.engine_emoji, batch_idx, rows, total_rows
            ),
        }
    }

    pub fn log_malformed(&self, malformed_cells: u64) {
        if malformed_cells > 0 {
            warn!(
                "[{}] {} ⚠️  {} malformed cells were parsed as empty names",
                self.engine_name, self.engine_emoji, malformed_cells
            );
        }
    }

    pub fn log_join_complete(&self, stats: &JoinStats) {
        info!(
            "[{}] {} ✅ Join complete: {} × {} rows → {} candidate pairs ({} batches)",
            self.engine_name,
            self.engine_emoji,
            stats.rows_side_1,
            stats.rows_side_2,
            stats.candidate_pairs,
            stats.batches
        );
        if stats.empty_core_rows > 0 {
            info!(
                "[{}] {} ⏭️  {} rows had an empty core",
                self.engine_name, self.engine_emoji, stats.empty_core_rows
            );
        }
    }

    pub fn log_completion(&self, stats: &RunStats) {
        info!(
            "[{}] {} 🎉 Wrote {} candidate pairs to {} in {:.2}s (reduction {:.4}%)",
            self.engine_name,
            self.engine_emoji,
            stats.candidate_pairs,
            stats.output_path,
            stats.total_processing_time,
            stats.reduction_ratio() * 100.0
        );
    }

    pub fn log_error(&self, stage: &str, err: &anyhow::Error) {
        error!(
            "[{}] {} ❌ Blocking failed during {}: {:#}",
            self.engine_name, self.engine_emoji, stage, err
        );
    }
}
