// SPDX-License-Identifier: Apache-2.0

//! Scratchpad state shared by PLC function blocks across scans.

use std::collections::HashMap;

/// Flat key-value scratchpad owned by the scan engine.
///
/// Values are integers; booleans are stored as 0/1 and coerced back on read.
/// Keys are namespaced by their writers (`edge:rise:<id>`, `ton:<id>:et`,
/// `ctu:<id>:cv`, ...). Only ladder code running inside a scan touches the
/// store, so it needs no locking.
#[derive(Debug, Default)]
pub struct StateStore {
    entries: HashMap<String, i64>,
}

impl StateStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a boolean; `default` when absent.
    #[must_use]
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.entries.get(key).map_or(default, |v| *v != 0)
    }

    /// Reads an integer; `default` when absent.
    #[must_use]
    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.entries.get(key).copied().unwrap_or(default)
    }

    /// Stores a boolean.
    pub fn set_bool(&mut self, key: impl Into<String>, value: bool) {
        let _ = self.entries.insert(key.into(), i64::from(value));
    }

    /// Stores an integer.
    pub fn set_int(&mut self, key: impl Into<String>, value: i64) {
        let _ = self.entries.insert(key.into(), value);
    }

    /// Removes every key starting with `prefix`.
    pub fn reset_scope(&mut self, prefix: &str) {
        self.entries.retain(|k, _| !k.starts_with(prefix));
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
