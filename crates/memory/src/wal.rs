// SPDX-License-Identifier: Apache-2.0

//! Write-ahead log of deferred device writes.
//!
//! Deferred writes (NEXT_SCAN / IO_IMAGE policies) are parked here until the
//! scan boundary that makes them visible. The log is a bounded FIFO: overflow
//! truncates from the head while sequence numbers keep advancing.

use crate::model::{CellValue, ScanConsistencyRule, Space};
use crate::source::Source;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Disposition of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WalResult {
    /// The write was validated and queued for application.
    Accepted,
}

/// One deferred write.
#[derive(Debug, Clone, Serialize)]
pub struct WalEntry {
    /// Monotonic id assigned at append; unique and ordered.
    pub seq: u64,
    /// Epoch milliseconds, stamped at append when left at zero.
    pub time_ms: u64,
    /// Scan that originated the write.
    pub scan_id: u64,
    /// Earliest scan at which the entry may apply (`scan_id + 1`).
    pub target_scan_id: u64,
    /// Origin tag of the writer.
    pub source: Source,
    /// Target device suffix.
    pub dev: String,
    /// Target address space.
    pub space: Space,
    /// First target address.
    pub addr: u32,
    /// Values to store, one per consecutive address.
    pub values: Vec<CellValue>,
    /// The policy that deferred this write.
    pub policy: ScanConsistencyRule,
    /// Entry disposition.
    pub result: WalResult,
}

#[derive(Debug, Default)]
struct WalInner {
    seq: u64,
    entries: VecDeque<WalEntry>,
}

/// Bounded FIFO of [`WalEntry`] records.
#[derive(Debug)]
pub struct WalStore {
    max_entries: usize,
    inner: Mutex<WalInner>,
}

impl WalStore {
    /// Creates a store that retains at most `max_entries` entries.
    #[must_use]
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            inner: Mutex::new(WalInner::default()),
        }
    }

    /// Appends `entry`, assigning the next sequence number and stamping
    /// `time_ms` when unset. Returns the assigned sequence number.
    pub fn append(&self, mut entry: WalEntry) -> u64 {
        let mut inner = self.inner.lock();
        inner.seq += 1;
        entry.seq = inner.seq;
        if entry.time_ms == 0 {
            entry.time_ms = epoch_millis();
        }
        let seq = entry.seq;
        inner.entries.push_back(entry);
        while inner.entries.len() > self.max_entries {
            let _ = inner.entries.pop_front();
        }
        seq
    }

    /// Returns every entry with `target_scan_id <= scan_id`, in seq order.
    #[must_use]
    pub fn ready(&self, scan_id: u64) -> Vec<WalEntry> {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .filter(|e| e.target_scan_id <= scan_id)
            .cloned()
            .collect()
    }

    /// Removes entries originated by `scan_id` whose source starts with
    /// `source_prefix`. Entries from other sources are preserved.
    pub fn discard_scan(&self, scan_id: u64, source_prefix: &str) {
        let mut inner = self.inner.lock();
        inner
            .entries
            .retain(|e| !(e.scan_id == scan_id && e.source.starts_with(source_prefix)));
    }

    /// Removes every entry with `target_scan_id <= scan_id`.
    pub fn remove_applied(&self, scan_id: u64) {
        let mut inner = self.inner.lock();
        inner.entries.retain(|e| e.target_scan_id > scan_id);
    }

    /// Number of retained entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serializes the retained entries as newline-delimited JSON, for
    /// inspection. The log is not durable across restarts.
    #[must_use]
    pub fn to_ndjson(&self) -> String {
        let inner = self.inner.lock();
        inner
            .entries
            .iter()
            .filter_map(|e| serde_json::to_string(e).ok())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(scan_id: u64, source: Source) -> WalEntry {
        WalEntry {
            seq: 0,
            time_ms: 0,
            scan_id,
            target_scan_id: scan_id + 1,
            source,
            dev: "MR".to_string(),
            space: Space::Bit,
            addr: 0,
            values: vec![1],
            policy: ScanConsistencyRule::NextScan,
            result: WalResult::Accepted,
        }
    }

    #[test]
    fn seq_is_monotonic_and_stamped() {
        let wal = WalStore::new(16);
        let first = wal.append(entry(1, Source::ladder("A")));
        let second = wal.append(entry(1, Source::ladder("A")));
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        let ready = wal.ready(2);
        assert_eq!(ready.len(), 2);
        assert!(ready[0].seq < ready[1].seq);
        assert!(ready[0].time_ms > 0);
    }

    #[test]
    fn ready_respects_target_scan() {
        let wal = WalStore::new(16);
        let _ = wal.append(entry(1, Source::ladder("A")));
        let _ = wal.append(entry(2, Source::ladder("A")));
        assert!(wal.ready(1).is_empty());
        assert_eq!(wal.ready(2).len(), 1);
        assert_eq!(wal.ready(3).len(), 2);
    }

    #[test]
    fn discard_filters_by_scan_and_source() {
        let wal = WalStore::new(16);
        let _ = wal.append(entry(3, Source::ladder("A")));
        let _ = wal.append(entry(3, Source::adapter("net")));
        let _ = wal.append(entry(4, Source::ladder("A")));
        wal.discard_scan(3, Source::LADDER_PREFIX);
        let remaining = wal.ready(u64::MAX);
        assert_eq!(remaining.len(), 2);
        assert!(remaining.iter().all(|e| {
            e.scan_id != 3 || e.source.starts_with(Source::ADAPTER_PREFIX)
        }));
    }

    #[test]
    fn remove_applied_drops_ready_entries() {
        let wal = WalStore::new(16);
        let _ = wal.append(entry(1, Source::ladder("A")));
        let _ = wal.append(entry(5, Source::ladder("A")));
        wal.remove_applied(2);
        assert_eq!(wal.len(), 1);
        assert_eq!(wal.ready(u64::MAX)[0].scan_id, 5);
    }

    #[test]
    fn overflow_truncates_head_but_preserves_seq() {
        let wal = WalStore::new(2);
        for _ in 0..5 {
            let _ = wal.append(entry(1, Source::ladder("A")));
        }
        assert_eq!(wal.len(), 2);
        let ready = wal.ready(2);
        assert_eq!(ready[0].seq, 4);
        assert_eq!(ready[1].seq, 5);
        assert_eq!(wal.append(entry(1, Source::ladder("A"))), 6);
    }

    #[test]
    fn ndjson_has_one_record_per_entry() {
        let wal = WalStore::new(16);
        let _ = wal.append(entry(1, Source::ladder("A")));
        let _ = wal.append(entry(2, Source::adapter("net")));
        let dump = wal.to_ndjson();
        assert_eq!(dump.lines().count(), 2);
        assert!(dump.lines().all(|l| l.contains("\"accepted\"")));
    }
}
