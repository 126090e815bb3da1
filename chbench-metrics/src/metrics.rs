//! CH-benCHmark headline metrics
//!
//! All metrics are computed from one normalized log and its query groups:
//! - transactional throughput (NewOrder transactions per minute)
//! - geometric mean of the per-query mean latencies
//! - query set time (one execution of every query, back to back)
//! - queries per hour and its multi-worker variant

use crate::aggregation::QueryGroups;
use crate::normalizer::NormalizedLog;
use chbench_common::{AnalyticalRange, ChBenchError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// How non-positive group means are treated by the geometric mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GeometricMeanPolicy {
    /// Multiply all means as they are; a zero mean yields a zero result
    #[default]
    Permissive,
    /// Reject any mean that is not strictly positive
    Strict,
}

/// Final metric set of one evaluated log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsResult {
    /// NewOrder transactions per minute
    pub transactional_throughput: f64,
    pub geometric_mean_latency: f64,
    pub query_set_time: f64,
    pub queries_per_hour: f64,
    pub effective_queries_per_hour: f64,
}

/// NewOrder transactions per minute over the whole run
pub fn transactional_throughput(log: &NormalizedLog) -> f64 {
    let new_order_id = log.new_order_id();
    let transactions = log
        .records()
        .iter()
        .filter(|r| r.record.transaction_type == new_order_id)
        .count();

    let (min, max) = log
        .records()
        .iter()
        .map(|r| r.record.start_time)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), t| (lo.min(t), hi.max(t)));
    let run_time = max - min;

    if run_time.is_nan() || run_time <= 0.0 {
        warn!("Run has no measurable duration; reporting zero transactional throughput");
        return 0.0;
    }
    transactions as f64 / run_time * 60.0
}

/// Nth root of the product of the group means
pub fn geometric_mean(groups: &QueryGroups, policy: GeometricMeanPolicy) -> Result<f64> {
    if groups.is_empty() {
        return Err(ChBenchError::InsufficientData(
            "geometric mean of zero query groups".to_string(),
        ));
    }

    if policy == GeometricMeanPolicy::Strict {
        if let Some(group) = groups.iter().find(|g| g.mean_latency.is_nan() || g.mean_latency <= 0.0) {
            return Err(ChBenchError::Domain(format!(
                "query {} (type {}) has non-positive mean latency {}",
                group.query_number, group.transaction_type, group.mean_latency
            )));
        }
    }

    let product: f64 = groups.iter().map(|g| g.mean_latency).product();
    if product <= 0.0 {
        warn!("Geometric mean product is {}; at least one query has a non-positive mean latency", product);
    }
    Ok(product.powf(1.0 / groups.len() as f64))
}

/// Sum of the group means
pub fn query_set_time(groups: &QueryGroups) -> f64 {
    groups.iter().map(|g| g.mean_latency).sum()
}

/// Queries that fit into an hour when the query set runs back to back
pub fn queries_per_hour(query_set_time: f64, query_types: usize) -> f64 {
    60.0 * 60.0 / query_set_time * query_types as f64
}

pub fn effective_queries_per_hour(queries_per_hour: f64, workers: usize) -> f64 {
    queries_per_hour * workers as f64
}

pub struct MetricsCalculator {
    range: AnalyticalRange,
    policy: GeometricMeanPolicy,
}

impl MetricsCalculator {
    pub fn new(range: AnalyticalRange) -> Self {
        Self {
            range,
            policy: GeometricMeanPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: GeometricMeanPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn compute(&self, log: &NormalizedLog, groups: &QueryGroups) -> Result<MetricsResult> {
        let query_set_time = query_set_time(groups);
        let queries_per_hour = queries_per_hour(query_set_time, self.range.query_count());

        let result = MetricsResult {
            transactional_throughput: transactional_throughput(log),
            geometric_mean_latency: geometric_mean(groups, self.policy)?,
            query_set_time,
            queries_per_hour,
            effective_queries_per_hour: effective_queries_per_hour(queries_per_hour, groups.distinct_workers()),
        };
        debug!("Computed metrics: {:?}", result);
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::{TimingLog, TimingRecord};
    use crate::norm_factors::NormFactors;
    use crate::normalizer::{LatencyNormalizer, NormalizationMode};
    use chbench_common::TransactionType;

    fn record(transaction_type: TransactionType, start_time: f64, latency: f64, worker: &str) -> TimingRecord {
        TimingRecord {
            transaction_type,
            start_time,
            latency,
            worker_id: worker.to_string(),
            phase: 0,
        }
    }

    fn evaluate(records: Vec<TimingRecord>, policy: GeometricMeanPolicy) -> Result<MetricsResult> {
        let factors = NormFactors::zeros(AnalyticalRange::default());
        let log = LatencyNormalizer::new(&factors, NormalizationMode::Subtractive)
            .normalize(TimingLog::from_records(records));
        let groups = QueryGroups::from_log(&log)?;
        MetricsCalculator::new(AnalyticalRange::default())
            .with_policy(policy)
            .compute(&log, &groups)
    }

    #[test]
    fn test_single_group() {
        let metrics = evaluate(
            vec![record(7, 0.0, 2.0, "0"), record(7, 1.0, 3.0, "0"), record(7, 2.0, 4.0, "0")],
            GeometricMeanPolicy::Permissive,
        )
        .unwrap();

        assert_eq!(metrics.geometric_mean_latency, 3.0);
        assert_eq!(metrics.query_set_time, 3.0);
        assert_eq!(metrics.queries_per_hour, 3600.0 / 3.0 * 22.0);
        assert_eq!(metrics.effective_queries_per_hour, metrics.queries_per_hour);
        assert_eq!(metrics.transactional_throughput, 0.0);
    }

    #[test]
    fn test_throughput_counts_new_orders_over_full_log() {
        let mut records: Vec<TimingRecord> = (0..30).map(|i| record(2, i as f64 * 2.0, 0.1, "0")).collect();
        records.push(record(3, 60.0, 0.1, "0"));
        records.push(record(7, 10.0, 1.0, "1"));

        let metrics = evaluate(records, GeometricMeanPolicy::Permissive).unwrap();
        // 30 NewOrder transactions over 60 seconds
        assert_eq!(metrics.transactional_throughput, 30.0);
    }

    #[test]
    fn test_geometric_mean_and_workers() {
        let metrics = evaluate(
            vec![
                record(7, 0.0, 1.0, "a"),
                record(8, 1.0, 4.0, "b"),
                record(9, 2.0, 2.0, "c"),
                record(9, 3.0, 2.0, "a"),
            ],
            GeometricMeanPolicy::Strict,
        )
        .unwrap();

        assert!((metrics.geometric_mean_latency - 2.0).abs() < 1e-12);
        assert_eq!(metrics.query_set_time, 7.0);
        assert_eq!(metrics.effective_queries_per_hour, metrics.queries_per_hour * 3.0);
    }

    #[test]
    fn test_zero_mean_is_permitted_by_default() {
        let records = vec![record(7, 0.0, 0.0, "0"), record(8, 1.0, 1.5, "0")];
        let metrics = evaluate(records.clone(), GeometricMeanPolicy::Permissive).unwrap();
        assert_eq!(metrics.geometric_mean_latency, 0.0);
        assert_eq!(metrics.query_set_time, 1.5);

        let err = evaluate(records, GeometricMeanPolicy::Strict).unwrap_err();
        assert!(matches!(err, ChBenchError::Domain(_)));
    }

    #[test]
    fn test_queries_per_hour_formula() {
        assert_eq!(queries_per_hour(36.0, 22), 2200.0);
        assert_eq!(effective_queries_per_hour(2200.0, 4), 8800.0);
    }
}
