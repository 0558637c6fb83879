//! Date-stamped document number sequences
//!
//! Vouchers, documents, and payments carry human-readable numbers of the
//! form `V20250101001`: a prefix, the date, and a per-day counter. The
//! generator is a port so callers can substitute a database-backed
//! implementation.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::RwLock;

/// Generates human-readable, date-stamped, daily-incrementing numbers.
pub trait SequenceGenerator: Send + Sync {
    /// Returns the next number for the given prefix and date,
    /// e.g. `V20250101001`.
    fn next_number(&self, prefix: &str, date: NaiveDate) -> String;
}

/// In-memory sequence generator with one counter per prefix and day.
#[derive(Debug, Default)]
pub struct DailySequences {
    counters: RwLock<HashMap<(String, NaiveDate), u32>>,
}

impl DailySequences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SequenceGenerator for DailySequences {
    fn next_number(&self, prefix: &str, date: NaiveDate) -> String {
        let mut counters = self
            .counters
            .write()
            .expect("sequence counter lock poisoned");
        let counter = counters.entry((prefix.to_string(), date)).or_insert(0);
        *counter += 1;
        format!("{}{}{:03}", prefix, date.format("%Y%m%d"), counter)
    }
}
