pub mod merchant;
pub mod stats_models;

pub use merchant::*;
pub use stats_models::*;
