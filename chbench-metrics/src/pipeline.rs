//! End-to-end evaluation of one timing log

use crate::aggregation::QueryGroups;
use crate::loader::{PhaseBoundary, TimingLog};
use crate::metrics::{GeometricMeanPolicy, MetricsCalculator, MetricsResult};
use crate::norm_factors::{NormFactorInput, NormFactors};
use crate::normalizer::{LatencyNormalizer, NormalizationMode, NormalizedLog, ScaleFactor};
use crate::report::{format_report, JsonReport, PlotData};
use chbench_common::{AnalysisConfig, Result};
use std::path::Path;
use tracing::{debug, info};

/// Inputs that shape an evaluation besides the log itself
#[derive(Debug, Clone, Default)]
pub struct EvaluationOptions {
    pub config: AnalysisConfig,
    pub factors: NormFactorInput,
    pub scale_factor: Option<ScaleFactor>,
    pub policy: GeometricMeanPolicy,
}

impl EvaluationOptions {
    pub fn mode(&self) -> NormalizationMode {
        NormalizationMode::from_scale_factor(self.scale_factor)
    }
}

/// Everything derived from one log
#[derive(Debug, Clone)]
pub struct Evaluation {
    log: NormalizedLog,
    groups: QueryGroups,
    metrics: MetricsResult,
    phase_boundaries: Vec<PhaseBoundary>,
    bin_secs: f64,
}

impl Evaluation {
    pub fn from_file(path: impl AsRef<Path>, options: &EvaluationOptions) -> Result<Self> {
        let log = TimingLog::load(path)?;
        Self::from_log(log, options)
    }

    pub fn from_log(log: TimingLog, options: &EvaluationOptions) -> Result<Self> {
        options.config.validate()?;
        let range = options.config.analytical_range();
        let factors = NormFactors::resolve(options.factors.clone(), range)?;

        let phase_boundaries = log.phase_boundaries();
        if !phase_boundaries.is_empty() {
            debug!("Log contains {} phase transitions", phase_boundaries.len());
        }

        let normalized = LatencyNormalizer::new(&factors, options.mode())
            .with_new_order_id(options.config.new_order_id)
            .normalize(log);
        let groups = QueryGroups::from_log(&normalized)?;
        let metrics = MetricsCalculator::new(range)
            .with_policy(options.policy)
            .compute(&normalized, &groups)?;

        info!(
            "Evaluated {} records: {} analytical queries, {} workers",
            normalized.len(),
            groups.len(),
            groups.distinct_workers()
        );

        Ok(Self {
            log: normalized,
            groups,
            metrics,
            phase_boundaries,
            bin_secs: options.config.throughput_bin_secs,
        })
    }

    pub fn log(&self) -> &NormalizedLog {
        &self.log
    }

    pub fn groups(&self) -> &QueryGroups {
        &self.groups
    }

    pub fn metrics(&self) -> &MetricsResult {
        &self.metrics
    }

    pub fn phase_boundaries(&self) -> &[PhaseBoundary] {
        &self.phase_boundaries
    }

    /// Fixed-layout text report; the effective line appears in divisive mode only
    pub fn report(&self) -> String {
        let divisive = matches!(self.log.mode(), NormalizationMode::Divisive(_));
        format_report(&self.metrics, divisive)
    }

    pub fn plot_data(&self) -> Result<PlotData> {
        PlotData::build(&self.log, &self.groups, self.bin_secs)
    }

    pub fn json_report(&self) -> JsonReport<'_> {
        JsonReport::new(&self.log, &self.groups, &self.metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::TimingRecord;
    use chbench_common::ChBenchError;

    fn record(transaction_type: u32, start_time: f64, latency: f64) -> TimingRecord {
        TimingRecord {
            transaction_type,
            start_time,
            latency,
            worker_id: "0".to_string(),
            phase: 0,
        }
    }

    #[test]
    fn test_report_includes_effective_line_only_with_scale_factor() {
        let records = vec![record(2, 0.0, 0.1), record(7, 1.0, 2.0), record(2, 2.0, 0.1)];

        let subtractive = Evaluation::from_log(TimingLog::from_records(records.clone()), &EvaluationOptions::default())
            .unwrap();
        assert!(!subtractive.report().contains("Effective"));

        let options = EvaluationOptions {
            scale_factor: Some(ScaleFactor::new(1.0).unwrap()),
            ..Default::default()
        };
        let divisive = Evaluation::from_log(TimingLog::from_records(records), &options).unwrap();
        assert!(divisive.report().contains("Effective Queries per Hour"));
    }

    #[test]
    fn test_invalid_config_is_rejected_before_work() {
        let options = EvaluationOptions {
            config: AnalysisConfig {
                throughput_bin_secs: -1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        let err = Evaluation::from_log(TimingLog::from_records(vec![record(7, 0.0, 1.0)]), &options).unwrap_err();
        assert!(matches!(err, ChBenchError::Config(_)));
    }
}
