//! CH-benCHmark log evaluation
//!
//! This crate turns the raw per-transaction timing log written by the
//! benchmark driver into the CH-benCHmark metrics:
//! - Loading and validating the five-column log
//! - Normalizing analytical query latencies against reference coefficients
//! - Grouping analytical queries and computing the headline metrics
//! - Formatting the text report and plot-ready series

pub mod loader;
pub mod norm_factors;
pub mod normalizer;
pub mod aggregation;
pub mod metrics;
pub mod report;
pub mod pipeline;

pub use aggregation::{QueryGroup, QueryGroups};
pub use loader::{PhaseBoundary, TimingLog, TimingRecord};
pub use metrics::{GeometricMeanPolicy, MetricsCalculator, MetricsResult};
pub use norm_factors::{NormFactorInput, NormFactors, REFERENCE_NORM_FACTORS};
pub use normalizer::{LatencyNormalizer, NormalizationMode, NormalizedLog, NormalizedRecord, ScaleFactor};
pub use pipeline::{Evaluation, EvaluationOptions};
pub use report::{format_report, JsonReport, LatencyPoint, PlotData, ThroughputPoint};
