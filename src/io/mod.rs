// src/io/mod.rs
pub mod reader;
pub mod writer;

pub use reader::{ColumnPairReader, RawBatch};
pub use writer::{CsvCandidateWriter, EXTENDED_COLUMNS, OUTPUT_COLUMNS};
