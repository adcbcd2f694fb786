// src/error.rs
use thiserror::Error;

/// Fatal failures of a blocking run, one variant per stage. Parsing has no
/// variant: malformed names are parsed as empty, never reported.
#[derive(Debug, Error)]
pub enum BlockingError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("input error: {0}")]
    Input(String),
    #[error("join engine error ({engine}): {message}")]
    Engine {
        engine: &'static str,
        message: String,
    },
    #[error("output error: {0}")]
    Output(String),
}

impl BlockingError {
    pub fn engine(engine: &'static str, message: impl Into<String>) -> Self {
        BlockingError::Engine {
            engine,
            message: message.into(),
        }
    }

    pub fn stage(&self) -> &'static str {
        match self {
            BlockingError::Config(_) => "configuration",
            BlockingError::Input(_) => "input",
            BlockingError::Engine { .. } => "join",
            BlockingError::Output(_) => "output",
        }
    }
}

/// Stage of the first typed error in an `anyhow` chain, if any.
pub fn failed_stage(err: &anyhow::Error) -> Option<&'static str> {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<BlockingError>())
        .map(BlockingError::stage)
}
