//! Raw timing log ingestion
//!
//! The benchmark driver writes one row per executed transaction with five
//! positional columns: transaction type, start time, latency (microseconds),
//! worker id and phase. Header names are ignored; the first row is always
//! treated as a header.

use chbench_common::{ChBenchError, Result, TransactionType, WorkerId, MICROS_PER_SECOND};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{debug, info};

/// Positional column names of the raw log
pub const COLUMNS: [&str; 5] = ["transaction_type", "start_time", "latency", "worker_id", "phase"];

/// One executed transaction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingRecord {
    pub transaction_type: TransactionType,
    /// Seconds since the first transaction of the log
    pub start_time: f64,
    /// Latency in seconds
    pub latency: f64,
    pub worker_id: WorkerId,
    pub phase: i64,
}

/// A row whose phase differs from the row before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseBoundary {
    pub index: usize,
    pub from: i64,
    pub to: i64,
}

/// Ordered, immutable contents of a timing log
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimingLog {
    records: Vec<TimingRecord>,
}

impl TimingLog {
    /// Load a raw log from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let log = Self::from_reader(BufReader::new(file))?;
        info!("Loaded {} records from {}", log.len(), path.display());
        Ok(log)
    }

    /// Parse a raw log, shifting start times to zero and converting latencies to seconds
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        let mut records = Vec::new();
        for row in rdr.records() {
            let row = row?;
            records.push(parse_row(&row)?);
        }

        let min_start = records
            .iter()
            .map(|r| r.start_time)
            .fold(f64::INFINITY, f64::min);
        for record in &mut records {
            record.start_time -= min_start;
            record.latency /= MICROS_PER_SECOND;
        }

        debug!("Parsed {} rows", records.len());
        Ok(Self { records })
    }

    /// Wrap records that are already in seconds and relative to the log start
    pub fn from_records(records: Vec<TimingRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[TimingRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TimingRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records of one transaction type
    pub fn count_of(&self, transaction_type: TransactionType) -> usize {
        self.records
            .iter()
            .filter(|r| r.transaction_type == transaction_type)
            .count()
    }

    /// Time between the first and the last transaction start
    pub fn duration(&self) -> f64 {
        start_span(&self.records)
    }

    pub fn phase_boundaries(&self) -> Vec<PhaseBoundary> {
        self.records
            .windows(2)
            .enumerate()
            .filter(|(_, pair)| pair[0].phase != pair[1].phase)
            .map(|(idx, pair)| PhaseBoundary {
                index: idx + 1,
                from: pair[0].phase,
                to: pair[1].phase,
            })
            .collect()
    }
}

/// max(start_time) - min(start_time), zero for an empty slice
pub(crate) fn start_span(records: &[TimingRecord]) -> f64 {
    if records.is_empty() {
        return 0.0;
    }
    let (min, max) = records.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), r| {
        (lo.min(r.start_time), hi.max(r.start_time))
    });
    max - min
}

fn parse_row(row: &StringRecord) -> Result<TimingRecord> {
    let line = row.position().map(|p| p.line()).unwrap_or(0);
    if row.len() != COLUMNS.len() {
        return Err(ChBenchError::format(
            line,
            format!("expected {} columns, found {}", COLUMNS.len(), row.len()),
        ));
    }

    Ok(TimingRecord {
        transaction_type: parse_cell(row, 0, line)?,
        start_time: parse_finite(row, 1, line)?,
        latency: parse_finite(row, 2, line)?,
        worker_id: row[3].to_string(),
        phase: parse_cell(row, 4, line)?,
    })
}

fn parse_cell<T: std::str::FromStr>(row: &StringRecord, column: usize, line: u64) -> Result<T> {
    let cell = &row[column];
    cell.parse().map_err(|_| {
        ChBenchError::format(line, format!("invalid {} value {:?}", COLUMNS[column], cell))
    })
}

/// Like `parse_cell`, but `NaN` and infinities are rejected as well
fn parse_finite(row: &StringRecord, column: usize, line: u64) -> Result<f64> {
    let value: f64 = parse_cell(row, column, line)?;
    if !value.is_finite() {
        return Err(ChBenchError::format(
            line,
            format!("invalid {} value {:?}", COLUMNS[column], &row[column]),
        ));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Transaction Type Index,Start Time (microseconds),Latency (microseconds),Worker Id (start number),Phase Id (index in config file)\n";

    fn parse(body: &str) -> Result<TimingLog> {
        TimingLog::from_reader(format!("{}{}", HEADER, body).as_bytes())
    }

    #[test]
    fn test_load_shifts_start_and_converts_latency() {
        let log = parse("2,1000.5,1500000,0,0\n7,1002,2000000,1,0\n").unwrap();
        assert_eq!(log.len(), 2);

        let first = &log.records()[0];
        assert_eq!(first.transaction_type, 2);
        assert_eq!(first.start_time, 0.0);
        assert_eq!(first.latency, 1.5);
        assert_eq!(first.worker_id, "0");

        let second = &log.records()[1];
        assert_eq!(second.start_time, 1.5);
        assert_eq!(second.latency, 2.0);
        assert_eq!(log.duration(), 1.5);
    }

    #[test]
    fn test_header_names_are_ignored() {
        let log = TimingLog::from_reader("a,b,c,d,e\n3,5,10,w1,0\n".as_bytes()).unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log.records()[0].worker_id, "w1");
    }

    #[test]
    fn test_rejects_wrong_arity() {
        let err = parse("2,0,1000,0,0\n2,1,1000,0\n").unwrap_err();
        match err {
            ChBenchError::Format { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("expected 5 columns, found 4"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_numeric_cell() {
        let err = parse("two,0,1000,0,0\n").unwrap_err();
        assert!(matches!(err, ChBenchError::Format { line: 2, .. }));
        assert!(err.to_string().contains("transaction_type"));
    }

    #[test]
    fn test_rejects_non_finite_latency() {
        let err = parse("2,0,1000,0,0\n7,1,NaN,0,0\n2,5,1000,0,0\n").unwrap_err();
        match err {
            ChBenchError::Format { line, message } => {
                assert_eq!(line, 3);
                assert!(message.contains("latency"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_finite_start_time() {
        for cell in ["inf", "-inf", "infinity", "nan"] {
            let err = parse(&format!("2,0,1000,0,0\n7,{},1000,0,0\n", cell)).unwrap_err();
            assert!(matches!(err, ChBenchError::Format { line: 3, .. }), "{cell}: {err:?}");
            assert!(err.to_string().contains("start_time"));
        }
    }

    #[test]
    fn test_header_only_log_is_empty() {
        let log = parse("").unwrap();
        assert!(log.is_empty());
        assert_eq!(log.duration(), 0.0);
        assert!(log.phase_boundaries().is_empty());
    }

    #[test]
    fn test_phase_boundaries() {
        let log = parse("2,0,1,0,0\n2,1,1,0,0\n2,2,1,0,1\n2,3,1,0,1\n2,4,1,0,2\n").unwrap();
        assert_eq!(
            log.phase_boundaries(),
            vec![
                PhaseBoundary { index: 2, from: 0, to: 1 },
                PhaseBoundary { index: 4, from: 1, to: 2 },
            ]
        );
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = TimingLog::load("/nonexistent/chbench/output.raw").unwrap_err();
        assert!(matches!(err, ChBenchError::Io(_)));
    }

    #[test]
    fn test_count_of() {
        let log = parse("2,0,1,0,0\n7,1,1,0,0\n2,2,1,0,0\n").unwrap();
        assert_eq!(log.count_of(2), 2);
        assert_eq!(log.count_of(7), 1);
        assert_eq!(log.count_of(3), 0);
    }
}
