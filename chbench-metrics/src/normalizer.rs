//! Scale-independent rescaling of analytical query latencies
//!
//! Analytical queries get slower as the transactional workload grows the
//! database. Each analytical latency is corrected by the query's coefficient
//! weighted with the number of NewOrder transactions processed so far.

use crate::loader::{TimingLog, TimingRecord};
use crate::norm_factors::NormFactors;
use chbench_common::{AnalyticalRange, ChBenchError, Result, TransactionType, NEW_ORDER_ID};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info};

/// Size of the initial benchmark dataset; always finite and positive
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ChBenchError::Config(format!(
                "scale factor must be a positive number, got {}",
                value
            )));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl FromStr for ScaleFactor {
    type Err = ChBenchError;

    fn from_str(s: &str) -> Result<Self> {
        let value = s
            .trim()
            .parse::<f64>()
            .map_err(|_| ChBenchError::Config(format!("invalid scale factor {:?}", s)))?;
        Self::new(value)
    }
}

impl fmt::Display for ScaleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How analytical latencies are rescaled
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum NormalizationMode {
    /// `latency - factor * new_orders`, followed by a shift that removes negative values
    Subtractive,
    /// `latency / (scale_factor + factor * new_orders)`
    Divisive(ScaleFactor),
}

impl NormalizationMode {
    pub fn from_scale_factor(scale_factor: Option<ScaleFactor>) -> Self {
        match scale_factor {
            Some(sf) => NormalizationMode::Divisive(sf),
            None => NormalizationMode::Subtractive,
        }
    }

    pub fn scale_factor(&self) -> Option<ScaleFactor> {
        match self {
            NormalizationMode::Subtractive => None,
            NormalizationMode::Divisive(sf) => Some(*sf),
        }
    }
}

/// A loaded record together with its derived normalization fields
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub record: TimingRecord,
    /// NewOrder transactions seen up to and including this row
    pub new_order_count: u64,
    /// Equal to `record.latency` for non-analytical records
    pub normalized_latency: f64,
    pub analytical: bool,
}

/// Output of one normalization pass
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedLog {
    records: Vec<NormalizedRecord>,
    range: AnalyticalRange,
    new_order_id: TransactionType,
    mode: NormalizationMode,
    correction: f64,
}

impl NormalizedLog {
    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    /// Analytical records in log order
    pub fn analytical(&self) -> impl Iterator<Item = &NormalizedRecord> {
        self.records.iter().filter(|r| r.analytical)
    }

    pub fn range(&self) -> AnalyticalRange {
        self.range
    }

    pub fn new_order_id(&self) -> TransactionType {
        self.new_order_id
    }

    pub fn mode(&self) -> NormalizationMode {
        self.mode
    }

    /// Amount added to every analytical latency to remove negative values
    pub fn correction(&self) -> f64 {
        self.correction
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

pub struct LatencyNormalizer<'a> {
    factors: &'a NormFactors,
    mode: NormalizationMode,
    new_order_id: TransactionType,
}

impl<'a> LatencyNormalizer<'a> {
    pub fn new(factors: &'a NormFactors, mode: NormalizationMode) -> Self {
        Self {
            factors,
            mode,
            new_order_id: NEW_ORDER_ID,
        }
    }

    pub fn with_new_order_id(mut self, new_order_id: TransactionType) -> Self {
        self.new_order_id = new_order_id;
        self
    }

    pub fn normalize(&self, log: TimingLog) -> NormalizedLog {
        let range = self.factors.range();
        let mut new_orders = 0u64;

        let mut records: Vec<NormalizedRecord> = log
            .into_records()
            .into_iter()
            .map(|record| {
                if record.transaction_type == self.new_order_id {
                    new_orders += 1;
                }
                let analytical = range.contains(record.transaction_type);
                let normalized_latency = if analytical {
                    self.rescale(&record, new_orders)
                } else {
                    record.latency
                };
                NormalizedRecord {
                    record,
                    new_order_count: new_orders,
                    normalized_latency,
                    analytical,
                }
            })
            .collect();

        let correction = match self.mode {
            NormalizationMode::Subtractive => shift_negative_latencies(&mut records),
            NormalizationMode::Divisive(_) => 0.0,
        };

        debug!(
            "Normalized {} records ({} NewOrder, mode {:?})",
            records.len(),
            new_orders,
            self.mode
        );

        NormalizedLog {
            records,
            range,
            new_order_id: self.new_order_id,
            mode: self.mode,
            correction,
        }
    }

    fn rescale(&self, record: &TimingRecord, new_orders: u64) -> f64 {
        let weight = self.factors.factor_for(record.transaction_type) * new_orders as f64;
        match self.mode {
            NormalizationMode::Subtractive => record.latency - weight,
            NormalizationMode::Divisive(sf) => record.latency / (sf.get() + weight),
        }
    }
}

/// Lift all analytical latencies so the smallest one is zero. Applied over
/// the whole analytical set so ordering across query types is kept.
fn shift_negative_latencies(records: &mut [NormalizedRecord]) -> f64 {
    let min = records
        .iter()
        .filter(|r| r.analytical)
        .map(|r| r.normalized_latency)
        .fold(f64::INFINITY, f64::min);

    if min.is_nan() || min >= 0.0 {
        return 0.0;
    }

    info!("Shifting analytical latencies by {:.6}s to remove negative values", -min);
    for record in records.iter_mut().filter(|r| r.analytical) {
        record.normalized_latency -= min;
    }
    -min
}
