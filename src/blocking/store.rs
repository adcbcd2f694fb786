// src/blocking/store.rs
use anyhow::Result;
use log::{debug, info};
use rusqlite::{params, Connection, Row};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::blocking::CandidateSink;
use crate::error::BlockingError;
use crate::models::{CandidatePair, ParsedMerchant};

const ENGINE: &str = "chunked_on_disk";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn table(&self) -> &'static str {
        match self {
            Side::One => "blocking_side_1",
            Side::Two => "blocking_side_2",
        }
    }
}

/// Staging area for the chunked engine: rows are appended batch by batch,
/// then joined once ingestion is complete.
pub trait StagingStore {
    /// Drops whatever a previous (possibly interrupted) run left behind and
    /// creates empty staging tables.
    fn create_staging_tables(&mut self) -> Result<(), BlockingError>;

    fn append_batch(
        &mut self,
        side: Side,
        rows: &[ParsedMerchant],
    ) -> Result<usize, BlockingError>;

    fn finish_ingestion(&mut self) -> Result<(), BlockingError>;

    /// Streams every matching pair into `sink`, ordered by side-1 then side-2
    /// row id. Returns the number of pairs emitted.
    fn equi_join(&mut self, join_empty_core: bool, sink: &mut dyn CandidateSink) -> Result<u64>;

    fn close(self) -> Result<(), BlockingError>
    where
        Self: Sized;
}

/// SQLite-backed staging store. Without an explicit path the database lives
/// in a private temporary directory that is removed when the store is dropped.
pub struct SqliteStore {
    // Declared before `temp_dir` so the connection closes before the directory goes.
    conn: Connection,
    path: PathBuf,
    temp_dir: Option<TempDir>,
}

impl SqliteStore {
    pub fn open(store_path: Option<&Path>) -> Result<Self, BlockingError> {
        let (path, temp_dir) = match store_path {
            Some(path) => (path.to_path_buf(), None),
            None => {
                let dir = tempfile::Builder::new()
                    .prefix("merchant_blocking")
                    .tempdir()
                    .map_err(|e| {
                        BlockingError::engine(
                            ENGINE,
                            format!("cannot create temporary store: {}", e),
                        )
                    })?;
                (dir.path().join("staging.sqlite"), Some(dir))
            }
        };

        let conn = Connection::open(&path).map_err(|e| {
            BlockingError::engine(ENGINE, format!("cannot open store {}: {}", path.display(), e))
        })?;
        // Temporary b-trees go to files, whatever the build default.
        conn.execute_batch("PRAGMA synchronous = OFF; PRAGMA temp_store = FILE;")
            .map_err(sql_err("configure store"))?;
        debug!("Opened staging store at {}", path.display());

        Ok(Self {
            conn,
            path,
            temp_dir,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temp_dir.is_some()
    }

    pub fn row_count(&self, side: Side) -> Result<u64, BlockingError> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", side.table()), [], |row| {
                row.get(0)
            })
            .map_err(sql_err("count staged rows"))?;
        Ok(count as u64)
    }
}

impl StagingStore for SqliteStore {
    fn create_staging_tables(&mut self) -> Result<(), BlockingError> {
        let mut ddl = String::new();
        for side in [Side::One, Side::Two] {
            ddl.push_str(&format!(
                "DROP TABLE IF EXISTS {table};
                 CREATE TABLE {table} (
                     row_id        INTEGER PRIMARY KEY,
                     raw_name      TEXT NOT NULL,
                     normalized    TEXT NOT NULL,
                     merchant_type TEXT NOT NULL,
                     core          TEXT NOT NULL,
                     suffix        TEXT NOT NULL,
                     locality      TEXT NOT NULL
                 );",
                table = side.table()
            ));
        }
        self.conn
            .execute_batch(&ddl)
            .map_err(sql_err("create staging tables"))
    }

    fn append_batch(
        &mut self,
        side: Side,
        rows: &[ParsedMerchant],
    ) -> Result<usize, BlockingError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "INSERT INTO {} (row_id, raw_name, normalized, merchant_type, core, suffix, locality)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            side.table()
        );

        let tx = self
            .conn
            .transaction()
            .map_err(sql_err("start ingestion transaction"))?;
        {
            let mut stmt = tx.prepare_cached(&sql).map_err(sql_err("prepare insert"))?;
            for row in rows {
                stmt.execute(params![
                    row.row_id as i64,
                    row.raw_name,
                    row.normalized,
                    row.merchant_type.as_str(),
                    row.core,
                    row.suffix,
                    row.locality,
                ])
                .map_err(sql_err("insert staged row"))?;
            }
        }
        tx.commit().map_err(sql_err("commit ingestion batch"))?;
        Ok(rows.len())
    }

    /// Side 1 is scanned in row_id (rowid) order, so only side 2 needs a key
    /// index; its trailing row_id keeps each lookup in row order.
    fn finish_ingestion(&mut self) -> Result<(), BlockingError> {
        let ddl = format!(
            "CREATE INDEX IF NOT EXISTS idx_{table}_key
             ON {table} (merchant_type, core, row_id);",
            table = Side::Two.table()
        );
        self.conn
            .execute_batch(&ddl)
            .map_err(sql_err("index staging tables"))?;
        info!("Staging store indexed at {}", self.path.display());
        Ok(())
    }

    fn equi_join(&mut self, join_empty_core: bool, sink: &mut dyn CandidateSink) -> Result<u64> {
        let mut stmt = self
            .conn
            .prepare(&join_sql())
            .map_err(sql_err("prepare join"))?;
        let mut rows = stmt
            .query(params![join_empty_core])
            .map_err(sql_err("run join"))?;

        let mut emitted = 0u64;
        while let Some(row) = rows.next().map_err(sql_err("read join row"))? {
            let left = merchant_from_row(row, 0)?;
            let right = merchant_from_row(row, 7)?;
            sink.accept(CandidatePair::new(&left, &right))?;
            emitted += 1;
        }
        Ok(emitted)
    }

    fn close(self) -> Result<(), BlockingError> {
        let Self {
            conn,
            path,
            temp_dir,
        } = self;
        conn.close().map_err(|(_, e)| {
            BlockingError::engine(ENGINE, format!("cannot close store: {}", e))
        })?;
        if let Some(dir) = temp_dir {
            dir.close().map_err(|e| {
                BlockingError::engine(ENGINE, format!("cannot remove temporary store: {}", e))
            })?;
            debug!("Removed temporary store {}", path.display());
        }
        Ok(())
    }
}

/// Ordered equi-join. `CROSS JOIN` pins side 1 as the outer loop, so the
/// ORDER BY is answered by the rowid scan plus the side-2 key index rather
/// than by sorting the whole pair set.
fn join_sql() -> String {
    format!(
        "SELECT b1.row_id, b1.raw_name, b1.normalized, b1.merchant_type,
                b1.core, b1.suffix, b1.locality,
                b2.row_id, b2.raw_name, b2.normalized, b2.merchant_type,
                b2.core, b2.suffix, b2.locality
         FROM {left} AS b1
         CROSS JOIN {right} AS b2
         WHERE b1.merchant_type = b2.merchant_type
           AND b1.core = b2.core
           AND (?1 OR b1.core <> '')
         ORDER BY b1.row_id, b2.row_id",
        left = Side::One.table(),
        right = Side::Two.table()
    )
}

fn merchant_from_row(row: &Row<'_>, offset: usize) -> Result<ParsedMerchant, BlockingError> {
    let get_text = |idx: usize| -> Result<String, BlockingError> {
        row.get::<_, String>(offset + idx)
            .map_err(sql_err("decode join row"))
    };
    let row_id: i64 = row.get(offset).map_err(sql_err("decode join row"))?;
    let merchant_type = get_text(3)?
        .parse()
        .map_err(|e: String| BlockingError::engine(ENGINE, e))?;

    Ok(ParsedMerchant {
        row_id: row_id as u64,
        raw_name: get_text(1)?,
        normalized: get_text(2)?,
        merchant_type,
        core: get_text(4)?,
        suffix: get_text(5)?,
        locality: get_text(6)?,
    })
}

fn sql_err(action: &'static str) -> impl Fn(rusqlite::Error) -> BlockingError {
    move |e| BlockingError::engine(ENGINE, format!("failed to {}: {}", action, e))
}
