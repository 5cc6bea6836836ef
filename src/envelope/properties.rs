//! Per-message user property store
//!
//! The underlying container format is insert-only: adding a field under an
//! existing key leaves the first value in place. That behavior is preserved
//! here as a documented contract rather than "fixed", so a message travels
//! the same whether it was built by this crate or by the broker's own
//! container writer.

use crate::error::{BusError, BusResult};
use crate::runtime;

#[derive(Debug, Clone, PartialEq)]
struct PropertyEntry {
    key: String,
    value: String,
}

/// Fixed-capacity, insert-only key/value store attached to a message.
///
/// Keys must be non-empty; neither keys nor values may contain an embedded
/// NUL byte. Setting a key that is already present succeeds and keeps the
/// original value for the lifetime of the envelope or until [`reset`].
///
/// [`reset`]: PropertyMap::reset
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyMap {
    entries: Vec<PropertyEntry>,
    capacity: usize,
}

impl PropertyMap {
    /// Create an empty map with the process-wide default capacity
    pub fn new() -> Self {
        Self::with_capacity(runtime::handle().default_prop_capacity())
    }

    /// Create an empty map holding at most `capacity` entries
    pub fn with_capacity(capacity: usize) -> Self {
        PropertyMap {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Insert a key/value pair.
    ///
    /// All validation happens before any mutation, so a failed call leaves
    /// the map untouched. Inserting an existing key is a successful no-op
    /// that preserves the first-set value (insert-only semantics).
    pub fn set(&mut self, key: &str, value: &str) -> BusResult<()> {
        validate_component("key", key)?;
        validate_component("value", value)?;
        if key.is_empty() {
            return Err(BusError::validation("property key must not be empty"));
        }
        if self.entries.iter().any(|e| e.key == key) {
            // Insert-only: the first value wins.
            return Ok(());
        }
        if self.entries.len() >= self.capacity {
            return Err(BusError::validation(format!(
                "property map capacity {} exceeded",
                self.capacity
            )));
        }
        self.entries.push(PropertyEntry {
            key: key.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    /// Look up a property value by key
    pub fn get(&self, key: &str) -> BusResult<&str> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .map(|e| e.value.as_str())
            .ok_or_else(|| BusError::not_found(key))
    }

    /// Remove all entries. Idempotent; capacity is unchanged.
    pub fn reset(&mut self) {
        self.entries.clear();
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Upper bound on concurrently-held entries
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Iterate entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|e| (e.key.as_str(), e.value.as_str()))
    }
}

impl Default for PropertyMap {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_component(what: &str, s: &str) -> BusResult<()> {
    if s.contains('\0') {
        return Err(BusError::validation(format!(
            "property {what} must not contain NUL bytes"
        )));
    }
    Ok(())
}
