//! Per-query normalization coefficients
//!
//! Each analytical query has a coefficient that models how much its latency
//! grows for every NewOrder transaction already processed. The coefficients
//! are stored densely, indexed by the query's offset inside the analytical
//! range (offset 1 is the lowest analytical transaction type).

use chbench_common::{AnalyticalRange, ChBenchError, Result, TransactionType, NUMBER_QUERIES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Placeholder coefficients for the default 22-query range, in seconds per
/// processed NewOrder transaction. Override them with measured values via
/// `NormFactorInput` when comparing runs.
pub const REFERENCE_NORM_FACTORS: [f64; NUMBER_QUERIES] = [
    1.82e-5, // Q1
    2.10e-6, // Q2
    9.40e-6, // Q3
    1.16e-5, // Q4
    7.30e-6, // Q5
    6.20e-6, // Q6
    8.10e-6, // Q7
    9.90e-6, // Q8
    1.37e-5, // Q9
    1.04e-5, // Q10
    1.30e-6, // Q11
    7.70e-6, // Q12
    4.60e-6, // Q13
    5.80e-6, // Q14
    6.90e-6, // Q15
    3.20e-6, // Q16
    5.10e-6, // Q17
    1.55e-5, // Q18
    6.40e-6, // Q19
    3.90e-6, // Q20
    1.21e-5, // Q21
    2.40e-6, // Q22
];

/// Caller-supplied override, before validation against the analytical range
#[derive(Debug, Clone, PartialEq, Default)]
pub enum NormFactorInput {
    /// Use the built-in reference table
    #[default]
    None,
    /// One coefficient per query, Q1 first
    Sequence(Vec<f64>),
    /// Query offset (1..=N) to coefficient
    Mapping(BTreeMap<u32, f64>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFactors {
    Sequence(Vec<f64>),
    Mapping(BTreeMap<String, f64>),
}

#[derive(Deserialize)]
struct FactorFile {
    factors: RawFactors,
}

impl NormFactorInput {
    /// Read an override from a JSON file (list or object) or a TOML file
    /// with a top-level `factors` entry.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        let raw = if is_toml {
            toml::from_str::<FactorFile>(&content)?.factors
        } else {
            serde_json::from_str::<RawFactors>(&content)?
        };
        debug!("Read normalization override from {}", path.display());

        match raw {
            RawFactors::Sequence(values) => Ok(NormFactorInput::Sequence(values)),
            RawFactors::Mapping(entries) => {
                let mut mapping = BTreeMap::new();
                for (key, value) in entries {
                    let offset = key.trim().parse::<u32>().map_err(|_| {
                        ChBenchError::Config(format!("invalid query offset {:?} in normalization factors", key))
                    })?;
                    mapping.insert(offset, value);
                }
                Ok(NormFactorInput::Mapping(mapping))
            }
        }
    }
}

/// Dense, validated coefficient table for one analytical range
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormFactors {
    range: AnalyticalRange,
    factors: Vec<f64>,
}

impl NormFactors {
    /// Built-in reference table for the default analytical range
    pub fn reference() -> Self {
        Self {
            range: AnalyticalRange::default(),
            factors: REFERENCE_NORM_FACTORS.to_vec(),
        }
    }

    /// All-zero table; normalization leaves latencies untouched
    pub fn zeros(range: AnalyticalRange) -> Self {
        Self {
            range,
            factors: vec![0.0; range.query_count()],
        }
    }

    /// Turn an override (or its absence) into a table matching `range`
    pub fn resolve(input: NormFactorInput, range: AnalyticalRange) -> Result<Self> {
        let expected = range.query_count();
        let factors = match input {
            NormFactorInput::None => {
                if expected != NUMBER_QUERIES {
                    return Err(ChBenchError::Config(format!(
                        "built-in normalization table covers {} queries but the analytical range has {}; supply factors explicitly",
                        NUMBER_QUERIES, expected
                    )));
                }
                info!("Using built-in reference normalization factors");
                REFERENCE_NORM_FACTORS.to_vec()
            }
            NormFactorInput::Sequence(values) => {
                if values.len() != expected {
                    return Err(ChBenchError::Config(format!(
                        "expected {} normalization factors, got {}",
                        expected,
                        values.len()
                    )));
                }
                values
            }
            NormFactorInput::Mapping(mapping) => {
                if let Some(offset) = mapping.keys().find(|&&k| k == 0 || k as usize > expected) {
                    return Err(ChBenchError::Config(format!(
                        "normalization factor offset {} outside 1..={}",
                        offset, expected
                    )));
                }
                (1..=expected as u32)
                    .map(|offset| {
                        mapping.get(&offset).copied().ok_or_else(|| {
                            ChBenchError::Config(format!("missing normalization factor for query {}", offset))
                        })
                    })
                    .collect::<Result<Vec<_>>>()?
            }
        };

        if let Some((idx, value)) = factors
            .iter()
            .enumerate()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(ChBenchError::Config(format!(
                "normalization factor for query {} must be a non-negative number, got {}",
                idx + 1,
                value
            )));
        }

        Ok(Self { range, factors })
    }

    pub fn range(&self) -> AnalyticalRange {
        self.range
    }

    /// Coefficient for a transaction type; zero when the type has no entry
    pub fn factor_for(&self, transaction_type: TransactionType) -> f64 {
        self.range
            .index_of(transaction_type)
            .and_then(|idx| self.factors.get(idx))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.factors
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_reference_table() {
        let factors = NormFactors::resolve(NormFactorInput::None, AnalyticalRange::default()).unwrap();
        assert_eq!(factors, NormFactors::reference());
        assert_eq!(factors.len(), 22);
        assert!(factors.as_slice().iter().all(|f| *f >= 0.0));
        assert_eq!(factors.factor_for(7), REFERENCE_NORM_FACTORS[0]);
        assert_eq!(factors.factor_for(28), REFERENCE_NORM_FACTORS[21]);
    }

    #[test]
    fn test_unknown_type_has_zero_factor() {
        let factors = NormFactors::reference();
        assert_eq!(factors.factor_for(2), 0.0);
        assert_eq!(factors.factor_for(29), 0.0);
    }

    #[test]
    fn test_sequence_length_must_match() {
        let err = NormFactors::resolve(NormFactorInput::Sequence(vec![0.1; 21]), AnalyticalRange::default())
            .unwrap_err();
        assert!(matches!(err, ChBenchError::Config(_)));
    }

    #[test]
    fn test_mapping_requires_every_key() {
        let mut mapping: BTreeMap<u32, f64> = (1..=22).map(|k| (k, 0.5)).collect();
        let factors =
            NormFactors::resolve(NormFactorInput::Mapping(mapping.clone()), AnalyticalRange::default()).unwrap();
        assert_eq!(factors.factor_for(10), 0.5);

        mapping.remove(&5);
        let err = NormFactors::resolve(NormFactorInput::Mapping(mapping), AnalyticalRange::default()).unwrap_err();
        assert!(err.to_string().contains("missing normalization factor for query 5"));
    }

    #[test]
    fn test_mapping_rejects_out_of_range_key() {
        let mut mapping: BTreeMap<u32, f64> = (1..=22).map(|k| (k, 0.5)).collect();
        mapping.insert(23, 1.0);
        assert!(NormFactors::resolve(NormFactorInput::Mapping(mapping), AnalyticalRange::default()).is_err());
    }

    #[test]
    fn test_rejects_negative_factor() {
        let mut values = vec![0.0; 22];
        values[3] = -1.0;
        let err = NormFactors::resolve(NormFactorInput::Sequence(values), AnalyticalRange::default()).unwrap_err();
        assert!(err.to_string().contains("query 4"));
    }

    #[test]
    fn test_custom_range_needs_explicit_factors() {
        let range = AnalyticalRange::new(7, 9);
        assert!(NormFactors::resolve(NormFactorInput::None, range).is_err());

        let factors = NormFactors::resolve(NormFactorInput::Sequence(vec![1.0, 2.0, 3.0]), range).unwrap();
        assert_eq!(factors.factor_for(8), 2.0);
    }

    #[test]
    fn test_zeros() {
        let factors = NormFactors::zeros(AnalyticalRange::default());
        assert_eq!(factors.len(), 22);
        assert!(factors.as_slice().iter().all(|f| *f == 0.0));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"1": 0.25, "2": 0.5}}"#).unwrap();

        let input = NormFactorInput::from_file(file.path()).unwrap();
        let expected: BTreeMap<u32, f64> = [(1, 0.25), (2, 0.5)].into_iter().collect();
        assert_eq!(input, NormFactorInput::Mapping(expected));
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "factors = [0.1, 0.2, 0.3]").unwrap();

        let input = NormFactorInput::from_file(file.path()).unwrap();
        assert_eq!(input, NormFactorInput::Sequence(vec![0.1, 0.2, 0.3]));
    }

    #[test]
    fn test_from_file_rejects_bad_key() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"q1": 0.25}}"#).unwrap();
        assert!(matches!(
            NormFactorInput::from_file(file.path()),
            Err(ChBenchError::Config(_))
        ));
    }
}
