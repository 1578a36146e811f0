//! First-seen-wins deduplication keyed by `DedupKey`

use crate::model::{DedupKey, ProductRecord};
use std::collections::HashSet;

/// Remembers which observations have been admitted
#[derive(Debug, Default)]
pub struct Deduplicator {
    seen: HashSet<DedupKey>,
    dropped: usize,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true the first time a record's key is seen
    pub fn admit(&mut self, record: &ProductRecord) -> bool {
        let fresh = self.seen.insert(record.dedup_key());
        if !fresh {
            self.dropped += 1;
        }
        fresh
    }

    /// Keeps the first record for each key, preserving order
    pub fn filter(&mut self, records: Vec<ProductRecord>) -> Vec<ProductRecord> {
        records.into_iter().filter(|r| self.admit(r)).collect()
    }

    /// Records dropped so far
    pub fn dropped(&self) -> usize {
        self.dropped
    }
}

/// One-shot deduplication of an ordered sequence
pub fn dedup_records(records: Vec<ProductRecord>) -> Vec<ProductRecord> {
    Deduplicator::new().filter(records)
}
