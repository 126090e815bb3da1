//! chbench - CH-benCHmark result evaluation
//!
//! This is the main crate that ties the evaluation pipeline together and
//! re-exports the shared configuration and error types.

pub use chbench_common as common;
pub use chbench_metrics as metrics;

/// Re-export common types and utilities
pub mod prelude {
    pub use crate::common::{AnalysisConfig, AnalyticalRange, ChBenchError, Result};
    pub use crate::metrics::*;
}
