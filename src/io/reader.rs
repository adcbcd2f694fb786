// src/io/reader.rs
use csv::{ByteRecord, ReaderBuilder};
use log::{debug, warn};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::BlockingError;
use crate::models::RawRecord;

/// One slice of input rows, already split into the two sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBatch {
    pub side_1: Vec<RawRecord>,
    pub side_2: Vec<RawRecord>,
}

impl RawBatch {
    pub fn len(&self) -> usize {
        self.side_1.len().max(self.side_2.len())
    }

    pub fn is_empty(&self) -> bool {
        self.side_1.is_empty() && self.side_2.is_empty()
    }
}

/// Streams two named columns of a CSV file as `RawRecord`s, in bounded batches.
///
/// Column lookup and the empty-input check happen in the constructor, so a bad
/// input is rejected before anything is parsed or joined.
pub struct ColumnPairReader<R: Read> {
    reader: csv::Reader<R>,
    column_1: usize,
    column_2: usize,
    pending: Option<ByteRecord>,
    next_row_id: u64,
    malformed_cells: u64,
}

impl ColumnPairReader<File> {
    pub fn open(path: &Path, column_1: &str, column_2: &str) -> Result<Self, BlockingError> {
        let file = File::open(path).map_err(|e| {
            BlockingError::Input(format!("cannot open {}: {}", path.display(), e))
        })?;
        Self::from_reader(file, column_1, column_2)
    }
}

impl<R: Read> ColumnPairReader<R> {
    pub fn from_reader(source: R, column_1: &str, column_2: &str) -> Result<Self, BlockingError> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(source);

        let headers = reader
            .byte_headers()
            .map_err(|e| BlockingError::Input(format!("cannot read header row: {}", e)))?
            .clone();
        if headers.is_empty() {
            return Err(BlockingError::Input("input has no header row".to_string()));
        }

        let column_1_idx = find_column(&headers, column_1)?;
        let column_2_idx = find_column(&headers, column_2)?;
        debug!(
            "Columns resolved: '{}' -> {}, '{}' -> {}",
            column_1, column_1_idx, column_2, column_2_idx
        );

        let mut first = ByteRecord::new();
        let has_rows = reader
            .read_byte_record(&mut first)
            .map_err(|e| BlockingError::Input(format!("cannot read row 0: {}", e)))?;
        if !has_rows {
            return Err(BlockingError::Input("input contains no data rows".to_string()));
        }

        Ok(Self {
            reader,
            column_1: column_1_idx,
            column_2: column_2_idx,
            pending: Some(first),
            next_row_id: 0,
            malformed_cells: 0,
        })
    }

    /// Next batch of at most `max_rows` rows, or `None` once the input is exhausted.
    pub fn next_batch(&mut self, max_rows: usize) -> Result<Option<RawBatch>, BlockingError> {
        let max_rows = max_rows.max(1);
        let mut batch = RawBatch {
            side_1: Vec::with_capacity(max_rows.min(65_536)),
            side_2: Vec::with_capacity(max_rows.min(65_536)),
        };

        while batch.len() < max_rows {
            let record = match self.pending.take() {
                Some(record) => record,
                None => {
                    let mut record = ByteRecord::new();
                    let more = self.reader.read_byte_record(&mut record).map_err(|e| {
                        BlockingError::Input(format!(
                            "cannot read row {}: {}",
                            self.next_row_id, e
                        ))
                    })?;
                    if !more {
                        break;
                    }
                    record
                }
            };

            let row_id = self.next_row_id;
            self.next_row_id += 1;
            let left = self.cell(&record, self.column_1, row_id);
            let right = self.cell(&record, self.column_2, row_id);
            batch.side_1.push(left);
            batch.side_2.push(right);
        }

        if batch.is_empty() {
            Ok(None)
        } else {
            Ok(Some(batch))
        }
    }

    pub fn rows_read(&self) -> u64 {
        self.next_row_id
    }

    pub fn malformed_cells(&self) -> u64 {
        self.malformed_cells
    }

    fn cell(&mut self, record: &ByteRecord, idx: usize, row_id: u64) -> RawRecord {
        match record.get(idx) {
            Some(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => RawRecord::new(row_id, text),
                Err(_) => {
                    self.malformed_cells += 1;
                    if self.malformed_cells <= 10 {
                        warn!(
                            "Row {}: column {} is not valid UTF-8, parsing as empty",
                            row_id, idx
                        );
                    }
                    RawRecord::malformed(row_id, String::from_utf8_lossy(bytes))
                }
            },
            None => {
                self.malformed_cells += 1;
                if self.malformed_cells <= 10 {
                    warn!("Row {}: column {} is missing, parsing as empty", row_id, idx);
                }
                RawRecord::malformed(row_id, "")
            }
        }
    }
}

fn find_column(headers: &ByteRecord, name: &str) -> Result<usize, BlockingError> {
    headers
        .iter()
        .position(|h| {
            String::from_utf8_lossy(h)
                .trim_start_matches('\u{feff}')
                .trim()
                == name
        })
        .ok_or_else(|| {
            let available: Vec<String> = headers
                .iter()
                .map(|h| String::from_utf8_lossy(h).into_owned())
                .collect();
            BlockingError::Input(format!(
                "column '{}' not found (available: {})",
                name,
                available.join(", ")
            ))
        })
}
