pub mod types;
pub mod error;
pub mod config;

pub use types::*;
pub use error::{ChBenchError, Result};
pub use config::{load_config, AnalysisConfig, ConfigSource};
