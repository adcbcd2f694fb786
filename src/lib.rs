pub mod blocking;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod parsing;
pub mod utils;

pub use blocking::pipeline::{run_blocking, BlockingJob};
pub use config::{BlockingConfig, EngineKind};
pub use error::BlockingError;
pub use parsing::parse_merchant;
