//! Text report and plot-ready series
//!
//! The report is printed in a fixed layout so that results of different runs
//! can be compared line by line. Plot data is written as CSV and JSON for
//! external charting tools.

use crate::aggregation::QueryGroups;
use crate::metrics::MetricsResult;
use crate::normalizer::{NormalizationMode, NormalizedLog};
use chbench_common::{ChBenchError, Result, TransactionType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const LATENCIES_FILE: &str = "latencies.csv";
pub const THROUGHPUT_FILE: &str = "throughput.csv";
pub const PLOT_DATA_FILE: &str = "plot_data.json";

/// Upper bound on throughput buckets; at 5 s per bucket this is about 58 days
pub const MAX_THROUGHPUT_BINS: usize = 1_000_000;

/// Render the metric set in the fixed report layout. The effective queries
/// per hour line is only meaningful when a scale factor was supplied.
pub fn format_report(metrics: &MetricsResult, include_effective: bool) -> String {
    let mut report = format!(
        "\nNewOrder Transactions per minute: \t {:?}\n\
         Geometric Mean of Latencies: \t\t {:?}\n\
         Query Set Time: \t\t\t {:?}\n\
         Queries per Hour: \t\t\t {:?}\n",
        metrics.transactional_throughput,
        metrics.geometric_mean_latency,
        metrics.query_set_time,
        metrics.queries_per_hour,
    );
    if include_effective {
        report.push_str(&format!(
            "Effective Queries per Hour: \t\t {:?}\n",
            metrics.effective_queries_per_hour
        ));
    }
    report
}

/// Mean normalized latency of one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyPoint {
    pub query_number: u32,
    pub transaction_type: TransactionType,
    pub mean_latency: f64,
}

/// NewOrder throughput within one time bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputPoint {
    /// Bucket start in seconds since the log start
    pub bin_start: f64,
    pub transactions_per_second: f64,
}

pub fn latency_series(groups: &QueryGroups) -> Vec<LatencyPoint> {
    groups
        .iter()
        .map(|g| LatencyPoint {
            query_number: g.query_number,
            transaction_type: g.transaction_type,
            mean_latency: g.mean_latency,
        })
        .collect()
}

/// Bucket NewOrder start times into fixed-width bins. Bin `i` covers
/// `[i * bin_secs, (i + 1) * bin_secs)`.
pub fn throughput_series(log: &NormalizedLog, bin_secs: f64) -> Result<Vec<ThroughputPoint>> {
    if !bin_secs.is_finite() || bin_secs <= 0.0 {
        return Err(ChBenchError::Config(format!(
            "throughput bin width must be positive, got {}",
            bin_secs
        )));
    }

    let new_order_id = log.new_order_id();
    let starts: Vec<f64> = log
        .records()
        .iter()
        .filter(|r| r.record.transaction_type == new_order_id)
        .map(|r| r.record.start_time.max(0.0))
        .collect();

    let Some(last) = starts.iter().copied().reduce(f64::max) else {
        return Ok(Vec::new());
    };

    let last_bin = (last / bin_secs).floor();
    let bins = Some(last_bin)
        .filter(|b| b.is_finite() && *b < MAX_THROUGHPUT_BINS as f64)
        .and_then(|b| (b as usize).checked_add(1))
        .ok_or_else(|| {
            ChBenchError::Domain(format!(
                "NewOrder start time {}s needs more than {} throughput bins of {}s",
                last, MAX_THROUGHPUT_BINS, bin_secs
            ))
        })?;
    let mut counts = vec![0usize; bins];
    for start in starts {
        let idx = ((start / bin_secs).floor() as usize).min(bins - 1);
        counts[idx] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| ThroughputPoint {
            bin_start: idx as f64 * bin_secs,
            transactions_per_second: count as f64 / bin_secs,
        })
        .collect())
}

/// Series handed to external plotting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotData {
    pub latencies: Vec<LatencyPoint>,
    pub throughput: Vec<ThroughputPoint>,
    pub bin_secs: f64,
}

impl PlotData {
    pub fn build(log: &NormalizedLog, groups: &QueryGroups, bin_secs: f64) -> Result<Self> {
        Ok(Self {
            latencies: latency_series(groups),
            throughput: throughput_series(log, bin_secs)?,
            bin_secs,
        })
    }

    /// Write the CSV series and a combined JSON document into `dir`
    pub fn write_to_dir(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        create_dir_all(dir)?;

        let latencies_path = dir.join(LATENCIES_FILE);
        let mut writer = csv::Writer::from_path(&latencies_path)?;
        for point in &self.latencies {
            writer.serialize(point)?;
        }
        writer.flush()?;

        let throughput_path = dir.join(THROUGHPUT_FILE);
        let mut writer = csv::Writer::from_path(&throughput_path)?;
        for point in &self.throughput {
            writer.serialize(point)?;
        }
        writer.flush()?;

        let json_path = dir.join(PLOT_DATA_FILE);
        let mut file = File::create(&json_path)?;
        serde_json::to_writer_pretty(&mut file, self)?;
        file.write_all(b"\n")?;

        info!("Plot data written to {}", dir.display());
        Ok(vec![latencies_path, throughput_path, json_path])
    }
}

/// Machine-readable record of one evaluation
#[derive(Debug, Clone, Serialize)]
pub struct JsonReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub source: Option<String>,
    pub records: usize,
    pub mode: NormalizationMode,
    pub correction: f64,
    pub metrics: &'a MetricsResult,
    pub groups: &'a QueryGroups,
}

impl<'a> JsonReport<'a> {
    pub fn new(log: &NormalizedLog, groups: &'a QueryGroups, metrics: &'a MetricsResult) -> Self {
        Self {
            generated_at: Utc::now(),
            source: None,
            records: log.len(),
            mode: log.mode(),
            correction: log.correction(),
            metrics,
            groups,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        debug!("JSON report written to {}", path.display());
        Ok(())
    }
}
