//! Per-query grouping of normalized analytical records

use crate::normalizer::NormalizedLog;
use chbench_common::{ChBenchError, Result, TransactionType, WorkerId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Summary statistics for all executions of one analytical query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryGroup {
    pub transaction_type: TransactionType,
    /// 1-based query number (Q1 is the lowest analytical type)
    pub query_number: u32,
    pub count: usize,
    /// Mean normalized latency in seconds
    pub mean_latency: f64,
    pub min_latency: f64,
    pub max_latency: f64,
    pub first_start: f64,
    pub last_start: f64,
    pub worker_count: usize,
}

#[derive(Default)]
struct GroupAccumulator<'a> {
    count: usize,
    latency_sum: f64,
    min_latency: f64,
    max_latency: f64,
    first_start: f64,
    last_start: f64,
    workers: BTreeSet<&'a str>,
}

impl<'a> GroupAccumulator<'a> {
    fn push(&mut self, latency: f64, start: f64, worker: &'a str) {
        if self.count == 0 {
            self.min_latency = latency;
            self.max_latency = latency;
            self.first_start = start;
            self.last_start = start;
        } else {
            self.min_latency = self.min_latency.min(latency);
            self.max_latency = self.max_latency.max(latency);
            self.first_start = self.first_start.min(start);
            self.last_start = self.last_start.max(start);
        }
        self.count += 1;
        self.latency_sum += latency;
        self.workers.insert(worker);
    }
}

/// Analytical query groups ordered by transaction type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryGroups {
    groups: Vec<QueryGroup>,
    distinct_workers: usize,
}

impl QueryGroups {
    /// Partition the analytical records of a normalized log
    pub fn from_log(log: &NormalizedLog) -> Result<Self> {
        let range = log.range();
        let mut by_type: BTreeMap<TransactionType, GroupAccumulator<'_>> = BTreeMap::new();
        let mut workers: BTreeSet<&WorkerId> = BTreeSet::new();

        for normalized in log.analytical() {
            let record = &normalized.record;
            by_type.entry(record.transaction_type).or_default().push(
                normalized.normalized_latency,
                record.start_time,
                &record.worker_id,
            );
            workers.insert(&record.worker_id);
        }

        if by_type.is_empty() {
            return Err(ChBenchError::InsufficientData(format!(
                "no analytical queries with transaction type in {}..={}",
                range.lower, range.upper
            )));
        }

        let groups: Vec<QueryGroup> = by_type
            .into_iter()
            .map(|(transaction_type, acc)| QueryGroup {
                transaction_type,
                query_number: range.query_number(transaction_type).unwrap_or_default(),
                count: acc.count,
                mean_latency: acc.latency_sum / acc.count as f64,
                min_latency: acc.min_latency,
                max_latency: acc.max_latency,
                first_start: acc.first_start,
                last_start: acc.last_start,
                worker_count: acc.workers.len(),
            })
            .collect();

        debug!(
            "Grouped analytical records into {} queries across {} workers",
            groups.len(),
            workers.len()
        );

        Ok(Self {
            groups,
            distinct_workers: workers.len(),
        })
    }

    pub fn groups(&self) -> &[QueryGroup] {
        &self.groups
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryGroup> {
        self.groups.iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, transaction_type: TransactionType) -> Option<&QueryGroup> {
        self.groups
            .binary_search_by_key(&transaction_type, |g| g.transaction_type)
            .ok()
            .map(|idx| &self.groups[idx])
    }

    /// Mean normalized latency per group, in group order
    pub fn mean_latencies(&self) -> Vec<f64> {
        self.groups.iter().map(|g| g.mean_latency).collect()
    }

    /// Distinct worker ids over all analytical records
    pub fn distinct_workers(&self) -> usize {
        self.distinct_workers
    }
}

impl<'a> IntoIterator for &'a QueryGroups {
    type Item = &'a QueryGroup;
    type IntoIter = std::slice::Iter<'a, QueryGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}
