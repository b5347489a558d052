pub mod config;
pub mod types;

pub use config::{parse_duration, RolloutConfig};
pub use types::*;
