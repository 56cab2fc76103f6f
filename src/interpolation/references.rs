//! Append-only table of completed steps
//!
//! The walker binds a step only after every field of it has been resolved, so a lookup
//! can never reach the current step or one further down the manifest.

use super::fuzzy::normalize_key;
use crate::manifest::Node;
use indexmap::IndexMap;
use tracing::debug;

/// Alias that always names the most recently completed step
pub const PREVIOUS: &str = "previous";

/// A resolved step record as it looked when its resolution finished
pub type StepRecord = IndexMap<String, Node>;

#[derive(Debug, Default)]
pub struct ReferenceTable {
    entries: IndexMap<String, (String, StepRecord)>,
}

impl ReferenceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `key` to `record`, replacing any earlier binding of the same key
    pub fn bind(&mut self, key: &str, record: StepRecord) {
        debug!("Binding step reference '{}'", key);
        self.entries
            .insert(normalize_key(key), (key.to_string(), record));
    }

    pub fn bind_previous(&mut self, record: StepRecord) {
        self.bind(PREVIOUS, record);
    }

    pub fn lookup(&self, key: &str) -> Option<&StepRecord> {
        self.entries.get(&normalize_key(key)).map(|(_, record)| record)
    }

    pub fn previous(&self) -> Option<&StepRecord> {
        self.lookup(PREVIOUS)
    }

    /// Keys as they were bound, in binding order
    pub fn keys(&self) -> Vec<String> {
        self.entries.values().map(|(key, _)| key.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
