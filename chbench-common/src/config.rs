//! Configuration for log evaluation

use crate::error::{ChBenchError, Result};
use crate::types::{
    AnalyticalRange, TransactionType, NEW_ORDER_ID, OLAP_QUERY_HIGHER_ID, OLAP_QUERY_LOWER_ID,
    THROUGHPUT_BIN_SECS,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings that control how a raw log is classified and bucketed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Transaction type counted as NewOrder
    pub new_order_id: TransactionType,
    /// Lowest analytical query type (inclusive)
    pub olap_lower_id: TransactionType,
    /// Highest analytical query type (inclusive)
    pub olap_upper_id: TransactionType,
    /// Width of throughput buckets in seconds
    pub throughput_bin_secs: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            new_order_id: NEW_ORDER_ID,
            olap_lower_id: OLAP_QUERY_LOWER_ID,
            olap_upper_id: OLAP_QUERY_HIGHER_ID,
            throughput_bin_secs: THROUGHPUT_BIN_SECS,
        }
    }
}

impl AnalysisConfig {
    pub fn analytical_range(&self) -> AnalyticalRange {
        AnalyticalRange::new(self.olap_lower_id, self.olap_upper_id)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `CHBENCH_*` environment overrides
    pub fn apply_env(mut self) -> Result<Self> {
        if let Some(value) = env_override("CHBENCH_NEW_ORDER_ID")? {
            self.new_order_id = value;
        }
        if let Some(value) = env_override("CHBENCH_OLAP_LOWER_ID")? {
            self.olap_lower_id = value;
        }
        if let Some(value) = env_override("CHBENCH_OLAP_UPPER_ID")? {
            self.olap_upper_id = value;
        }
        if let Some(value) = env_override("CHBENCH_THROUGHPUT_BIN_SECS")? {
            self.throughput_bin_secs = value;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.olap_lower_id > self.olap_upper_id {
            return Err(ChBenchError::Config(format!(
                "analytical range is empty: lower id {} > upper id {}",
                self.olap_lower_id, self.olap_upper_id
            )));
        }
        if self.analytical_range().contains(self.new_order_id) {
            return Err(ChBenchError::Config(format!(
                "NewOrder id {} lies inside the analytical range {}..={}",
                self.new_order_id, self.olap_lower_id, self.olap_upper_id
            )));
        }
        if !self.throughput_bin_secs.is_finite() || self.throughput_bin_secs <= 0.0 {
            return Err(ChBenchError::Config(format!(
                "throughput bin width must be positive, got {}",
                self.throughput_bin_secs
            )));
        }
        Ok(())
    }
}

fn env_override<T: std::str::FromStr>(name: &str) -> Result<Option<T>> {
    match std::env::var(name) {
        Ok(raw) => {
            debug!("Applying environment override {}={}", name, raw);
            raw.trim()
                .parse()
                .map(Some)
                .map_err(|_| ChBenchError::Config(format!("invalid value for {}: {:?}", name, raw)))
        }
        Err(_) => Ok(None),
    }
}

/// Configuration source for loading analysis settings
pub enum ConfigSource {
    File(PathBuf),
    Default,
    Environment,
}

/// Load analysis configuration from various sources
pub fn load_config(source: ConfigSource) -> Result<AnalysisConfig> {
    match source {
        ConfigSource::File(path) => AnalysisConfig::from_file(&path),
        ConfigSource::Default => Ok(AnalysisConfig::default()),
        ConfigSource::Environment => AnalysisConfig::default().apply_env(),
    }
}
