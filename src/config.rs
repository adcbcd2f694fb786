// src/config.rs
use log::info;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::BlockingError;

pub const DEFAULT_CHUNK_SIZE: usize = 200_000;
pub const DEFAULT_WORKERS: usize = 1;

/// Which join strategy runs the blocking step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    #[default]
    InMemory,
    ChunkedOnDisk,
}

impl EngineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::InMemory => "in_memory",
            EngineKind::ChunkedOnDisk => "chunked_on_disk",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = BlockingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in_memory" | "in-memory" | "memory" | "pandas" => Ok(EngineKind::InMemory),
            "chunked_on_disk" | "chunked-on-disk" | "chunked" | "on_disk" | "on-disk"
            | "duckdb" | "sqlite" => Ok(EngineKind::ChunkedOnDisk),
            other => Err(BlockingError::Config(format!(
                "unknown engine '{}' (expected in_memory or chunked_on_disk)",
                other
            ))),
        }
    }
}

/// Options recognised by a blocking run.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockingConfig {
    pub engine: EngineKind,
    /// Rows per ingestion batch. Only changes resource usage, never output.
    pub chunk_size: usize,
    /// Persistent location for the on-disk store; a temporary one is used when unset.
    pub store_path: Option<PathBuf>,
    /// Whether rows with an empty core may block together under `OTHER|`.
    pub join_empty_core: bool,
    /// Parser threads per batch, `0` = one per CPU.
    pub workers: usize,
    /// Append normalized/locality columns after `block_key`.
    pub extended_output: bool,
}

impl Default for BlockingConfig {
    fn default() -> Self {
        Self {
            engine: EngineKind::InMemory,
            chunk_size: DEFAULT_CHUNK_SIZE,
            store_path: None,
            join_empty_core: false,
            workers: DEFAULT_WORKERS,
            extended_output: false,
        }
    }
}

/// Command-line values that take precedence over `BLOCKING_*` variables.
/// A set field means the matching variable is never read.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub engine: Option<String>,
    pub chunk_size: Option<String>,
    pub store_path: Option<PathBuf>,
    pub join_empty_core: Option<bool>,
    pub workers: Option<usize>,
    pub extended_output: Option<bool>,
}

impl BlockingConfig {
    /// Reads `BLOCKING_*` environment variables over the defaults. Unlike the
    /// progress settings these are strict: a value that does not parse is an error.
    pub fn from_env() -> Result<Self, BlockingError> {
        Self::from_env_with(&ConfigOverrides::default())
    }

    /// Merges `overrides` with the environment, then validates the result once.
    pub fn from_env_with(overrides: &ConfigOverrides) -> Result<Self, BlockingError> {
        let mut config = Self::default();

        if let Some(engine) = overrides.engine.clone().or_else(|| read_var("BLOCKING_ENGINE")) {
            config.engine = engine.parse()?;
        }
        let chunk_size = overrides
            .chunk_size
            .clone()
            .or_else(|| read_var("BLOCKING_CHUNK_SIZE"));
        if let Some(chunk_size) = chunk_size {
            config.chunk_size = parse_chunk_size(&chunk_size)?;
        }
        config.store_path = match &overrides.store_path {
            Some(path) => Some(path.clone()),
            None => read_var("BLOCKING_STORE_PATH").map(PathBuf::from),
        };
        config.join_empty_core = match overrides.join_empty_core {
            Some(flag) => flag,
            None => read_flag("BLOCKING_JOIN_EMPTY_CORE")?.unwrap_or(config.join_empty_core),
        };
        match overrides.workers {
            Some(workers) => config.workers = workers,
            None => {
                if let Some(workers) = read_var("BLOCKING_WORKERS") {
                    config.workers = workers.trim().parse().map_err(|_| {
                        BlockingError::Config(format!(
                            "BLOCKING_WORKERS must be a non-negative integer, got '{}'",
                            workers
                        ))
                    })?;
                }
            }
        }
        config.extended_output = match overrides.extended_output {
            Some(flag) => flag,
            None => read_flag("BLOCKING_EXTENDED_OUTPUT")?.unwrap_or(config.extended_output),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BlockingError> {
        if self.chunk_size == 0 {
            return Err(BlockingError::Config(
                "chunk_size must be a positive integer".to_string(),
            ));
        }
        if let Some(path) = &self.store_path {
            if path.as_os_str().is_empty() {
                return Err(BlockingError::Config("store_path must not be empty".to_string()));
            }
            if path.is_dir() {
                return Err(BlockingError::Config(format!(
                    "store_path {} is a directory, expected a database file path",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    pub fn log_config(&self) {
        info!("⚙️  Blocking engine: {}", self.engine);
        if self.engine == EngineKind::ChunkedOnDisk {
            info!("   Chunk size: {} rows", self.chunk_size);
            match &self.store_path {
                Some(path) => info!("   Store: {} (persistent)", path.display()),
                None => info!("   Store: temporary"),
            }
        }
        info!(
            "   Empty-core rows {}",
            if self.join_empty_core {
                "join under OTHER|"
            } else {
                "are excluded from the join"
            }
        );
        if self.workers != 1 {
            let workers = if self.workers == 0 {
                "auto".to_string()
            } else {
                self.workers.to_string()
            };
            info!("   Parser workers: {}", workers);
        }
    }
}

/// Accepts a signed value so that `-5` is reported as non-positive rather
/// than as garbage.
pub fn parse_chunk_size(value: &str) -> Result<usize, BlockingError> {
    let parsed: i64 = value.trim().parse().map_err(|_| {
        BlockingError::Config(format!("chunk_size must be an integer, got '{}'", value))
    })?;
    if parsed <= 0 {
        return Err(BlockingError::Config(format!(
            "chunk_size must be a positive integer, got {}",
            parsed
        )));
    }
    usize::try_from(parsed)
        .map_err(|_| BlockingError::Config(format!("chunk_size {} is too large", parsed)))
}

fn parse_flag(name: &str, value: &str) -> Result<bool, BlockingError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(BlockingError::Config(format!(
            "{} must be a boolean, got '{}'",
            name, value
        ))),
    }
}

fn read_flag(name: &str) -> Result<Option<bool>, BlockingError> {
    read_var(name).map(|value| parse_flag(name, &value)).transpose()
}

fn read_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
