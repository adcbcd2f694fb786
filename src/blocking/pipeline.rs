// src/blocking/pipeline.rs
use anyhow::{Context, Result};
use log::info;
use std::path::Path;
use std::time::Instant;

use crate::blocking::{build_engine, ParsedBatch};
use crate::config::BlockingConfig;
use crate::error::failed_stage;
use crate::io::{ColumnPairReader, CsvCandidateWriter};
use crate::models::RunStats;
use crate::parsing::parse_records;
use crate::utils::get_memory_usage;
use crate::utils::instantiate_run::create_initial_run_stats;
use crate::utils::progress_bars::logging::BlockingLogger;
use crate::utils::progress_bars::progress_config::ProgressConfig;

/// Column names and paths of one blocking run.
#[derive(Debug, Clone)]
pub struct BlockingJob<'a> {
    pub input: &'a Path,
    pub column_1: &'a str,
    pub column_2: &'a str,
    pub output: &'a Path,
    pub description: Option<&'a str>,
}

/// Reads both name columns, parses them batch by batch, joins them with the
/// configured engine and writes the candidate pairs. The output file only
/// appears once every pair has been written.
pub fn run_blocking(
    job: &BlockingJob<'_>,
    config: &BlockingConfig,
    progress: &ProgressConfig,
) -> Result<RunStats> {
    let logger = BlockingLogger::new(config.engine);
    let result = execute(job, config, progress, &logger);
    if let Err(e) = &result {
        logger.log_error(failed_stage(e).unwrap_or("run"), e);
    }
    result
}

fn execute(
    job: &BlockingJob<'_>,
    config: &BlockingConfig,
    progress: &ProgressConfig,
    logger: &BlockingLogger,
) -> Result<RunStats> {
    let start_time = Instant::now();
    config.validate().context("Invalid blocking configuration")?;

    let mut stats = create_initial_run_stats(config, job.input, job.output, job.description);
    logger.log_start(&stats.run_id, job.input, config);

    let mut reader = ColumnPairReader::open(job.input, job.column_1, job.column_2)
        .context("Failed to open input")?;
    let mut writer = CsvCandidateWriter::create(job.output, config.extended_output)
        .context("Failed to prepare output")?;
    let mut engine = build_engine(config);

    logger.log_phase("Parse and ingest", Some(engine.name()));
    let row_bar = progress.create_row_bar();
    let mut ingest_finished: Option<Instant> = None;
    let mut batch_idx = 0u64;

    let join_stats = {
        let mut batches = std::iter::from_fn(|| match reader.next_batch(config.chunk_size) {
            Ok(Some(raw)) => {
                batch_idx += 1;
                let batch = ParsedBatch {
                    side_1: parse_records(&raw.side_1, config.workers),
                    side_2: parse_records(&raw.side_2, config.workers),
                };
                row_bar.inc(raw.len() as u64);
                let memory_mb = progress.should_show_memory().then(get_memory_usage);
                if let Some(mb) = memory_mb {
                    row_bar.set_message(format!("({} MB used)", mb));
                }
                if progress.should_show_detailed() {
                    logger.log_batch(batch_idx, raw.len(), row_bar.position(), memory_mb);
                }
                Some(Ok(batch))
            }
            Ok(None) => {
                ingest_finished.get_or_insert_with(Instant::now);
                None
            }
            Err(e) => Some(Err(anyhow::Error::from(e))),
        });
        engine.join(&mut batches, &mut writer)?
    };
    row_bar.finish_and_clear();
    logger.log_join_complete(&join_stats);

    let pairs_written = writer.rows_written();
    debug_assert_eq!(pairs_written, join_stats.candidate_pairs);
    let output_path = writer.finish().context("Failed to write output")?;
    info!("Candidate pairs written to {}", output_path.display());

    let ingest_finished = ingest_finished.unwrap_or_else(Instant::now);
    stats.total_rows_side_1 = join_stats.rows_side_1;
    stats.total_rows_side_2 = join_stats.rows_side_2;
    stats.malformed_cells = reader.malformed_cells();
    stats.empty_core_rows = join_stats.empty_core_rows;
    stats.batches = join_stats.batches;
    stats.candidate_pairs = pairs_written;
    stats.parse_and_ingest_time = ingest_finished.duration_since(start_time).as_secs_f64();
    stats.join_time = ingest_finished.elapsed().as_secs_f64();
    stats.total_processing_time = start_time.elapsed().as_secs_f64();

    logger.log_malformed(stats.malformed_cells);
    logger.log_completion(&stats);
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineKind;
    use crate::error::BlockingError;
    use crate::io::OUTPUT_COLUMNS;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::fs;
    use std::path::PathBuf;

    struct Fixture {
        dir: tempfile::TempDir,
        input: PathBuf,
        output: PathBuf,
    }

    fn fixture(rows: &[(&str, &str)]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("input.csv");
        let output = dir.path().join("pairs.csv");
        let mut w = csv::Writer::from_path(&input).unwrap();
        w.write_record(["Merchant_Name_1", "Merchant_Name_2"]).unwrap();
        for (a, b) in rows {
            w.write_record([*a, *b]).unwrap();
        }
        w.flush().unwrap();
        Fixture { dir, input, output }
    }

    fn job(f: &Fixture) -> BlockingJob<'_> {
        BlockingJob {
            input: &f.input,
            column_1: "Merchant_Name_1",
            column_2: "Merchant_Name_2",
            output: &f.output,
            description: None,
        }
    }

    fn run(f: &Fixture, config: &BlockingConfig) -> Result<RunStats> {
        run_blocking(&job(f), config, &ProgressConfig::disabled())
    }

    fn output_rows(path: &Path) -> Vec<Vec<String>> {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        rdr.records()
            .map(|r| r.unwrap().iter().map(String::from).collect())
            .collect()
    }

    const TEN_ROWS: [(&str, &str); 10] = [
        ("CO.OP MART QUAN 1", "Coop Mart, Q1"),
        ("NHA THUOC LONG CHAU", "Nhà Thuốc Long Châu 123"),
        ("HIGHLANDS COFFEE VINCOM", "HIGHLANDS COFFEE"),
        ("CONG TY TNHH HOA SEN", "CTY HOA SEN GROUP"),
        ("", "???"),
        ("PHO 24 Q3", "PHO 24"),
        ("SALON TOC MINH", "TIEM TOC MINH"),
        ("XANG DAU PETROLIMEX", "CUA HANG XANG DAU PETROLIMEX"),
        ("CIRCLE K", "CIRCLE K GV"),
        ("HKD NGUYEN VAN A", "HO KINH DOANH NGUYEN VAN A"),
    ];

    #[test]
    fn test_engines_and_chunk_sizes_agree() {
        let mut outputs = Vec::new();
        for engine in [EngineKind::InMemory, EngineKind::ChunkedOnDisk] {
            for chunk_size in [1, 3, 10_000] {
                let f = fixture(&TEN_ROWS);
                let config = BlockingConfig {
                    engine,
                    chunk_size,
                    ..Default::default()
                };
                let stats = run(&f, &config).unwrap();
                assert_eq!(stats.total_rows_side_1, 10);
                assert_eq!(stats.total_rows_side_2, 10);
                outputs.push(fs::read(&f.output).unwrap());
            }
        }
        assert!(outputs.windows(2).all(|w| w[0] == w[1]));

        let f = fixture(&TEN_ROWS);
        run(&f, &BlockingConfig::default()).unwrap();
        let rows = output_rows(&f.output);
        let keys: Vec<&str> = rows.iter().map(|r| r[10].as_str()).collect();
        assert!(keys.contains(&"SHOP|COOP"));
        assert!(keys.contains(&"PHARMACY|LONG"));
        assert!(keys.contains(&"HOUSEHOLD_HKD|NGUYEN"));
        assert!(!keys.contains(&"OTHER|"));
    }

    #[test]
    fn test_coop_mart_pair_is_emitted() {
        let f = fixture(&[("CO.OP MART QUAN 1", "Coop Mart, Q1")]);
        let stats = run(&f, &BlockingConfig::default()).unwrap();
        assert_eq!(stats.candidate_pairs, 1);

        let rows = output_rows(&f.output);
        assert_eq!(
            rows[0],
            vec![
                "0",
                "CO.OP MART QUAN 1",
                "SHOP",
                "COOP",
                "MART QUAN 1",
                "0",
                "Coop Mart, Q1",
                "SHOP",
                "COOP",
                "MART Q1",
                "SHOP|COOP"
            ]
        );
    }

    #[test]
    fn test_unmatched_cafe_does_not_pair() {
        let rows = [("CO.OP MART QUAN 1", "COOP MART Q1"), ("", "HIGHLAND COFFEE")];
        for engine in [EngineKind::InMemory, EngineKind::ChunkedOnDisk] {
            let f = fixture(&rows);
            let config = BlockingConfig {
                engine,
                ..Default::default()
            };
            let stats = run(&f, &config).unwrap();
            assert_eq!(stats.candidate_pairs, 1);
            assert_eq!(output_rows(&f.output)[0][10], "SHOP|COOP");
        }
    }

    #[test]
    fn test_empty_core_rows_follow_config() {
        let rows = [("", "..."), ("PHO 24", "PHO 24")];
        for engine in [EngineKind::InMemory, EngineKind::ChunkedOnDisk] {
            let f = fixture(&rows);
            let config = BlockingConfig {
                engine,
                ..Default::default()
            };
            let stats = run(&f, &config).unwrap();
            assert_eq!(stats.candidate_pairs, 1);
            assert_eq!(stats.empty_core_rows, 2);

            let f = fixture(&rows);
            let config = BlockingConfig {
                engine,
                join_empty_core: true,
                ..Default::default()
            };
            run(&f, &config).unwrap();
            let out = output_rows(&f.output);
            assert_eq!(out.len(), 2);
            assert_eq!(out[0][10], "OTHER|");
        }
    }

    #[test]
    fn test_header_only_output_when_nothing_blocks() {
        let f = fixture(&[("PHO 24", "CAFE TRUNG NGUYEN")]);
        let stats = run(&f, &BlockingConfig::default()).unwrap();
        assert_eq!(stats.candidate_pairs, 0);
        let mut rdr = csv::Reader::from_path(&f.output).unwrap();
        assert_eq!(rdr.headers().unwrap().len(), OUTPUT_COLUMNS.len());
        assert_eq!(rdr.records().count(), 0);
    }

    #[test]
    fn test_join_is_complete_on_random_names() {
        const BRANDS: &[&str] = &["PHO", "COOP", "HOA", "LONG", "MINH", ""];
        const SIGNALS: &[&str] = &["", "CAFE", "NHA THUOC", "CUA HANG", "CTY", "QUAN AN"];
        const TAILS: &[&str] = &["", "Q1", "24", "CHAU", "T2"];

        let mut rng = StdRng::seed_from_u64(7);
        let name = |rng: &mut StdRng| {
            format!(
                "{} {} {}",
                SIGNALS[rng.gen_range(0..SIGNALS.len())],
                BRANDS[rng.gen_range(0..BRANDS.len())],
                TAILS[rng.gen_range(0..TAILS.len())]
            )
        };
        let rows: Vec<(String, String)> =
            (0..60).map(|_| (name(&mut rng), name(&mut rng))).collect();
        let borrowed: Vec<(&str, &str)> =
            rows.iter().map(|(a, b)| (a.as_str(), b.as_str())).collect();

        let parsed: Vec<_> = rows
            .iter()
            .map(|(a, b)| (crate::parsing::parse_merchant(a), crate::parsing::parse_merchant(b)))
            .collect();
        let mut expected = Vec::new();
        for (i, (l, _)) in parsed.iter().enumerate() {
            for (j, (_, r)) in parsed.iter().enumerate() {
                if l.block_key() == r.block_key() && !l.has_empty_core() {
                    expected.push((i.to_string(), j.to_string()));
                }
            }
        }

        for engine in [EngineKind::InMemory, EngineKind::ChunkedOnDisk] {
            let f = fixture(&borrowed);
            let config = BlockingConfig {
                engine,
                chunk_size: 16,
                ..Default::default()
            };
            run(&f, &config).unwrap();
            let got: Vec<(String, String)> = output_rows(&f.output)
                .into_iter()
                .map(|r| (r[0].clone(), r[5].clone()))
                .collect();
            assert_eq!(got, expected, "engine {}", engine);
        }
    }

    #[test]
    fn test_missing_column_writes_nothing() {
        let f = fixture(&[("A", "B")]);
        let j = BlockingJob {
            column_2: "Merchant_Name_3",
            ..job(&f)
        };
        let err = run_blocking(&j, &BlockingConfig::default(), &ProgressConfig::disabled())
            .unwrap_err();
        assert_eq!(failed_stage(&err), Some("input"));
        assert!(!f.output.exists());
        assert_eq!(fs::read_dir(f.dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_invalid_chunk_size_is_config_error() {
        let f = fixture(&[("A", "B")]);
        let config = BlockingConfig {
            chunk_size: 0,
            ..Default::default()
        };
        let err = run(&f, &config).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BlockingError>(),
            Some(BlockingError::Config(_))
        ));
        assert!(!f.output.exists());
    }

    #[test]
    fn test_persistent_store_is_reused_across_runs() {
        let f = fixture(&TEN_ROWS);
        let config = BlockingConfig {
            engine: EngineKind::ChunkedOnDisk,
            chunk_size: 4,
            store_path: Some(f.dir.path().join("staging.sqlite")),
            ..Default::default()
        };
        let first = run(&f, &config).unwrap();
        let first_output = fs::read(&f.output).unwrap();
        let second = run(&f, &config).unwrap();
        assert_eq!(first.candidate_pairs, second.candidate_pairs);
        assert_eq!(fs::read(&f.output).unwrap(), first_output);
    }

    #[test]
    fn test_extended_output_and_summary_fields() {
        let f = fixture(&[("PHO 24 Q3", "PHO 24")]);
        let config = BlockingConfig {
            extended_output: true,
            ..Default::default()
        };
        let stats = run(&f, &config).unwrap();
        let out = output_rows(&f.output);
        assert_eq!(out[0].len(), 15);
        assert_eq!(out[0][12], "24 Q3");
        assert_eq!(stats.batches, 1);
        assert!(stats.total_processing_time >= stats.join_time);

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["engine"], "in_memory");
        assert_eq!(json["candidate_pairs"], 1);
    }
}
