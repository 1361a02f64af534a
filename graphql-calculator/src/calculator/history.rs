use std::collections::VecDeque;

use chrono::SecondsFormat;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;

use super::Operation;

/// One successful calculation. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculationRecord {
    pub id: String,
    pub operation: Operation,
    pub a: f64,
    pub b: f64,
    pub result: f64,
    /// ISO-8601, UTC, millisecond precision.
    pub timestamp: String,
}

#[derive(Debug)]
struct Inner {
    records: VecDeque<CalculationRecord>,
    next_id: u64,
}

/// Ordered log of the calculations, oldest first.
///
/// Appending, reading and clearing each take the lock once, so they are atomic with respect to
/// one another.
#[derive(Debug)]
pub struct HistoryStore {
    inner: Mutex<Inner>,
    capacity: Option<usize>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl HistoryStore {
    /// Creates an empty store. With a capacity, the oldest records are evicted past it.
    pub fn new(capacity: Option<usize>) -> Self {
        HistoryStore {
            inner: Mutex::new(Inner {
                records: VecDeque::new(),
                next_id: 1,
            }),
            capacity,
        }
    }

    /// Appends a record with a fresh id and the current time.
    pub fn record(&self, operation: Operation, a: f64, b: f64, result: f64) -> CalculationRecord {
        let mut inner = self.inner.lock();
        // timestamps are monotonic with ids
        let record = CalculationRecord {
            id: inner.next_id.to_string(),
            operation,
            a,
            b,
            result,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        };
        inner.next_id += 1;
        inner.records.push_back(record.clone());
        if let Some(capacity) = self.capacity {
            while inner.records.len() > capacity {
                inner.records.pop_front();
            }
        }
        record
    }

    /// The last `limit` records, oldest first. A limit of zero or less returns nothing.
    pub fn last(&self, limit: i64) -> Vec<CalculationRecord> {
        let inner = self.inner.lock();
        let limit = usize::try_from(limit).unwrap_or_default();
        let skip = inner.records.len().saturating_sub(limit);
        inner.records.iter().skip(skip).cloned().collect()
    }

    /// Empties the store and resets ids. Returns how many records were removed.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.records.len();
        inner.records.clear();
        inner.next_id = 1;
        count
    }

    pub fn len(&self) -> usize {
        self.inner.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
