use serde::{Deserialize, Serialize};

/// Transaction type identifier as written in the raw log
pub type TransactionType = u32;

/// Worker identifier as written in the raw log
pub type WorkerId = String;

// Transaction ids of the CH-benCHmark mix
pub const NEW_ORDER_ID: TransactionType = 2;
pub const OLAP_QUERY_LOWER_ID: TransactionType = 7;
pub const OLAP_QUERY_HIGHER_ID: TransactionType = 28;
pub const NUMBER_QUERIES: usize = (OLAP_QUERY_HIGHER_ID - OLAP_QUERY_LOWER_ID + 1) as usize;

/// Width of a throughput bucket in seconds
pub const THROUGHPUT_BIN_SECS: f64 = 5.0;

/// Raw latencies are stored in microseconds
pub const MICROS_PER_SECOND: f64 = 1_000_000.0;

/// Inclusive range of transaction types that are analytical queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticalRange {
    pub lower: TransactionType,
    pub upper: TransactionType,
}

impl Default for AnalyticalRange {
    fn default() -> Self {
        Self {
            lower: OLAP_QUERY_LOWER_ID,
            upper: OLAP_QUERY_HIGHER_ID,
        }
    }
}

impl AnalyticalRange {
    pub fn new(lower: TransactionType, upper: TransactionType) -> Self {
        Self { lower, upper }
    }

    pub fn contains(&self, transaction_type: TransactionType) -> bool {
        transaction_type >= self.lower && transaction_type <= self.upper
    }

    /// Number of analytical query types in the range
    pub fn query_count(&self) -> usize {
        if self.upper < self.lower {
            return 0;
        }
        (self.upper - self.lower + 1) as usize
    }

    /// Zero-based position of a type inside the range
    pub fn index_of(&self, transaction_type: TransactionType) -> Option<usize> {
        self.contains(transaction_type)
            .then(|| (transaction_type - self.lower) as usize)
    }

    /// One-based query number (Q1 is the lowest analytical type)
    pub fn query_number(&self, transaction_type: TransactionType) -> Option<u32> {
        self.index_of(transaction_type).map(|idx| idx as u32 + 1)
    }
}
