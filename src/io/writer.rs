// src/io/writer.rs
use anyhow::Result;
use csv::{Writer, WriterBuilder};
use log::debug;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::blocking::CandidateSink;
use crate::error::BlockingError;
use crate::models::CandidatePair;

pub const OUTPUT_COLUMNS: [&str; 11] = [
    "row_id_1",
    "raw_name_1",
    "merchant_type_1",
    "core_1",
    "suffix_1",
    "row_id_2",
    "raw_name_2",
    "merchant_type_2",
    "core_2",
    "suffix_2",
    "block_key",
];

pub const EXTENDED_COLUMNS: [&str; 4] =
    ["normalized_1", "locality_1", "normalized_2", "locality_2"];

/// Streams candidate pairs into a CSV file.
///
/// Rows go to a temporary file next to the target; the target only appears
/// when [`CsvCandidateWriter::finish`] succeeds. Dropping the writer without
/// finishing removes the temporary file.
pub struct CsvCandidateWriter {
    writer: Writer<NamedTempFile>,
    target: PathBuf,
    extended: bool,
    rows_written: u64,
}

impl CsvCandidateWriter {
    pub fn create(target: &Path, extended: bool) -> Result<Self, BlockingError> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let temp = NamedTempFile::new_in(&dir).map_err(|e| {
            BlockingError::Output(format!(
                "cannot create temporary output in {}: {}",
                dir.display(),
                e
            ))
        })?;
        debug!("Writing candidates to temporary file {}", temp.path().display());

        let mut writer = WriterBuilder::new().from_writer(temp);
        let mut header: Vec<&str> = OUTPUT_COLUMNS.to_vec();
        if extended {
            header.extend_from_slice(&EXTENDED_COLUMNS);
        }
        writer
            .write_record(&header)
            .map_err(|e| BlockingError::Output(format!("cannot write header: {}", e)))?;

        Ok(Self {
            writer,
            target: target.to_path_buf(),
            extended,
            rows_written: 0,
        })
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flushes and moves the temporary file onto the target path.
    pub fn finish(self) -> Result<PathBuf, BlockingError> {
        let temp = self
            .writer
            .into_inner()
            .map_err(|e| BlockingError::Output(format!("cannot flush output: {}", e.error())))?;
        temp.persist(&self.target).map_err(|e| {
            BlockingError::Output(format!(
                "cannot move output into place at {}: {}",
                self.target.display(),
                e.error
            ))
        })?;
        Ok(self.target)
    }
}

impl CandidateSink for CsvCandidateWriter {
    fn accept(&mut self, pair: CandidatePair<'_>) -> Result<()> {
        let (l, r) = (pair.left, pair.right);
        let left_id = l.row_id.to_string();
        let right_id = r.row_id.to_string();
        let key = pair.block_key();

        let mut fields: Vec<&str> = vec![
            left_id.as_str(),
            l.raw_name.as_str(),
            l.merchant_type.as_str(),
            l.core.as_str(),
            l.suffix.as_str(),
            right_id.as_str(),
            r.raw_name.as_str(),
            r.merchant_type.as_str(),
            r.core.as_str(),
            r.suffix.as_str(),
            key.as_str(),
        ];
        if self.extended {
            fields.extend([
                l.normalized.as_str(),
                l.locality.as_str(),
                r.normalized.as_str(),
                r.locality.as_str(),
            ]);
        }

        self.writer
            .write_record(&fields)
            .map_err(|e| BlockingError::Output(format!("cannot write candidate row: {}", e)))?;
        self.rows_written += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsing::parse_record;
    use crate::models::RawRecord;

    #[test]
    fn test_writes_header_and_rows_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("pairs.csv");

        let left = parse_record(&RawRecord::new(0, "CO.OP MART QUAN 1"));
        let right = parse_record(&RawRecord::new(3, "Coop Mart, Q1"));

        let mut writer = CsvCandidateWriter::create(&target, false).unwrap();
        assert!(!target.exists());
        writer.accept(CandidatePair::new(&left, &right)).unwrap();
        assert_eq!(writer.rows_written(), 1);
        writer.finish().unwrap();

        let mut rdr = csv::Reader::from_path(&target).unwrap();
        let headers: Vec<String> = rdr.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, OUTPUT_COLUMNS.to_vec());
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "0");
        assert_eq!(&rows[0][1], "CO.OP MART QUAN 1");
        assert_eq!(&rows[0][2], "SHOP");
        assert_eq!(&rows[0][5], "3");
        assert_eq!(&rows[0][6], "Coop Mart, Q1");
        assert_eq!(&rows[0][10], "SHOP|COOP");
    }

    #[test]
    fn test_extended_columns() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("pairs.csv");
        let left = parse_record(&RawRecord::new(0, "Phở 24 Q1"));
        let right = parse_record(&RawRecord::new(1, "PHO 24"));

        let mut writer = CsvCandidateWriter::create(&target, true).unwrap();
        writer.accept(CandidatePair::new(&left, &right)).unwrap();
        writer.finish().unwrap();

        let mut rdr = csv::Reader::from_path(&target).unwrap();
        assert_eq!(rdr.headers().unwrap().len(), 15);
        let row = rdr.records().next().unwrap().unwrap();
        assert_eq!(&row[11], "PHO 24 Q1");
        assert_eq!(&row[12], "24 Q1");
        assert_eq!(&row[14], "24");
    }

    #[test]
    fn test_dropped_writer_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("pairs.csv");
        {
            let _writer = CsvCandidateWriter::create(&target, false).unwrap();
        }
        assert!(!target.exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_missing_output_directory_is_output_error() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nope").join("pairs.csv");
        let err = CsvCandidateWriter::create(&target, false).err().unwrap();
        assert!(matches!(err, BlockingError::Output(_)));
    }
}
