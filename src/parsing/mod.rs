// src/parsing/mod.rs
//
// Row-level parsing: normalize -> classify -> extract. Nothing in here touches
// shared state or does I/O, so rows can be parsed in any order, on any thread.
pub mod classify;
pub mod extract;
pub mod normalize;

use log::debug;

use crate::models::{ParsedMerchant, RawRecord};
use classify::classify;
use extract::{extract, extract_locality};
use normalize::normalize;

/// Parses one raw merchant name. The result is not attached to a row yet
/// (`row_id` is 0); use [`parse_record`] for source rows.
pub fn parse_merchant(raw_name: &str) -> ParsedMerchant {
    let normalized = normalize(raw_name);
    let classification = classify(&normalized);
    let extraction = extract(&normalized, classification.signal);
    let locality = extract_locality(&normalized);

    ParsedMerchant {
        row_id: 0,
        raw_name: raw_name.to_string(),
        normalized,
        merchant_type: classification.merchant_type,
        core: extraction.core,
        suffix: extraction.suffix,
        locality,
    }
}

/// Parses a source cell. Malformed cells parse as the empty name but keep
/// their lossy text in `raw_name`.
pub fn parse_record(record: &RawRecord) -> ParsedMerchant {
    let source = if record.malformed { "" } else { record.raw_name.as_str() };
    let mut parsed = parse_merchant(source);
    parsed.row_id = record.row_id;
    parsed.raw_name = record.raw_name.clone();
    parsed
}

/// Parses a batch, optionally across `workers` scoped threads. Output order
/// always matches input order.
pub fn parse_records(records: &[RawRecord], workers: usize) -> Vec<ParsedMerchant> {
    let workers = effective_workers(workers).min(records.len().max(1));
    if workers <= 1 {
        return records.iter().map(parse_record).collect();
    }

    let per_worker = (records.len() + workers - 1) / workers;
    debug!(
        "Parsing {} records across {} workers ({} per worker)",
        records.len(),
        workers,
        per_worker
    );

    std::thread::scope(|scope| {
        let handles: Vec<_> = records
            .chunks(per_worker)
            .map(|chunk| scope.spawn(move || chunk.iter().map(parse_record).collect::<Vec<_>>()))
            .collect();

        let mut parsed = Vec::with_capacity(records.len());
        for handle in handles {
            match handle.join() {
                Ok(part) => parsed.extend(part),
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }
        parsed
    })
}

/// `0` means one worker per available CPU.
pub fn effective_workers(workers: usize) -> usize {
    if workers == 0 {
        num_cpus::get().max(1)
    } else {
        workers
    }
}
