//! Per-item accounting for batch operations.

use serde::Serialize;
use serde_json::Value;

/// One failed batch item and the reason it failed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItemError {
    pub item: Value,
    pub message: String,
}

/// Outcome of a batch operation.
///
/// `fail_count == missing.len() + errors.len()`; items skipped as no-ops are
/// counted in neither bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary<K> {
    pub success_count: usize,
    pub fail_count: usize,
    pub succeeded: Vec<K>,
    pub missing: Vec<K>,
    pub errors: Vec<BatchItemError>,
}

impl<K> Default for BatchSummary<K> {
    fn default() -> Self {
        Self {
            success_count: 0,
            fail_count: 0,
            succeeded: Vec::new(),
            missing: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<K> BatchSummary<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self, key: K) {
        self.success_count += 1;
        self.succeeded.push(key);
    }

    pub fn record_missing(&mut self, key: K) {
        self.fail_count += 1;
        self.missing.push(key);
    }

    pub fn record_failure(&mut self, item: Value, message: impl Into<String>) {
        self.fail_count += 1;
        self.errors.push(BatchItemError {
            item,
            message: message.into(),
        });
    }

    /// Number of items that were attempted.
    pub fn attempted(&self) -> usize {
        self.success_count + self.fail_count
    }
}
