// SPDX-License-Identifier: Apache-2.0

//! Device memory: the read/write router over the live store and the frozen
//! I/O image, with per-device locking and WAL-deferred writes.

use crate::error::Error;
use crate::lock::LockManager;
use crate::model::{CellValue, ScanConsistencyRule, Space};
use crate::profile::DeviceProfile;
use crate::source::Source;
use crate::wal::{WalEntry, WalResult, WalStore};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Scan phase at which deferred writes are applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyPhase {
    /// Apply at the end of the scan, before `end_scan`.
    #[default]
    ScanEnd,
}

/// Tuning knobs for [`DeviceMemory`].
#[derive(Debug, Clone)]
pub struct DeviceMemoryOptions {
    /// How long a write waits for the device lock.
    pub lock_timeout: Duration,
    /// Reserved: would let a writer observe its own pending WAL entries.
    /// Currently never consulted.
    pub read_your_writes: bool,
    /// Scan phase at which [`DeviceMemory::apply_wal`] takes effect.
    pub apply_phase: ApplyPhase,
}

impl Default for DeviceMemoryOptions {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(5),
            read_your_writes: false,
            apply_phase: ApplyPhase::ScanEnd,
        }
    }
}

/// Sparse cell storage: only written cells occupy space.
type CellStore = HashMap<(String, Space), HashMap<u32, CellValue>>;

/// The addressable store shared by the scan engine and all adapters.
///
/// Reads resolve against the live store, or against the I/O image frozen at
/// `begin_scan` for ladder reads of IO_IMAGE devices. Writes are validated,
/// serialized per device, and either applied in place (IMMEDIATE) or parked
/// in the WAL until the next scan boundary (NEXT_SCAN / IO_IMAGE).
#[derive(Debug)]
pub struct DeviceMemory {
    profile: DeviceProfile,
    wal: WalStore,
    options: DeviceMemoryOptions,
    locks: LockManager,
    scan_id: AtomicU64,
    delta_ms: AtomicU64,
    live: RwLock<CellStore>,
    image: RwLock<CellStore>,
    scan_lock: Mutex<()>,
}

impl DeviceMemory {
    /// Creates a memory over `profile`, backed by `wal`.
    #[must_use]
    pub fn new(profile: DeviceProfile, wal: WalStore, options: DeviceMemoryOptions) -> Self {
        Self {
            profile,
            wal,
            options,
            locks: LockManager::new(),
            scan_id: AtomicU64::new(0),
            delta_ms: AtomicU64::new(0),
            live: RwLock::new(HashMap::new()),
            image: RwLock::new(HashMap::new()),
            scan_lock: Mutex::new(()),
        }
    }

    /// The loaded device profile.
    #[must_use]
    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// The write-ahead log backing deferred writes.
    #[must_use]
    pub fn wal(&self) -> &WalStore {
        &self.wal
    }

    /// Id of the scan currently in progress (or most recently finished).
    #[must_use]
    pub fn current_scan_id(&self) -> u64 {
        self.scan_id.load(Ordering::SeqCst)
    }

    /// Elapsed milliseconds between the two most recent scans.
    #[must_use]
    pub fn current_delta_ms(&self) -> u64 {
        self.delta_ms.load(Ordering::SeqCst)
    }

    /// Records the scan counters and freezes the I/O image: every supported
    /// space of every IO_IMAGE device is snapshotted from the live store.
    pub fn begin_scan(&self, scan_id: u64, delta_ms: u64) {
        let _scan = self.scan_lock.lock();
        self.scan_id.store(scan_id, Ordering::SeqCst);
        self.delta_ms.store(delta_ms, Ordering::SeqCst);
        let live = self.live.read();
        let mut image = self.image.write();
        image.clear();
        for (dev, model) in self.profile.devices() {
            if model.scan_consistency_rule != ScanConsistencyRule::IoImage {
                continue;
            }
            for &space in &model.supported_spaces {
                let key = (dev.to_string(), space);
                let cells = live.get(&key).cloned().unwrap_or_default();
                let _ = image.insert(key, cells);
            }
        }
    }

    /// Marks `scan_id` as the current scan. Called after the scan-end apply.
    pub fn end_scan(&self, scan_id: u64) {
        self.scan_id.store(scan_id, Ordering::SeqCst);
    }

    /// Applies all ready WAL entries (those targeting `scan_id` or earlier)
    /// to the live store in seq order, then removes them.
    ///
    /// No-op unless `phase` matches the configured apply phase. The whole
    /// batch is applied under one store lock, so readers observe either none
    /// or all of it.
    pub fn apply_wal(&self, phase: ApplyPhase, scan_id: u64) {
        if phase != self.options.apply_phase {
            return;
        }
        let ready = self.wal.ready(scan_id);
        if !ready.is_empty() {
            let mut live = self.live.write();
            for entry in &ready {
                store_values(&mut live, &entry.dev, entry.space, entry.addr, &entry.values);
            }
        }
        self.wal.remove_applied(scan_id);
    }

    /// Reads `count` consecutive cells starting at `addr`.
    ///
    /// Ladder-origin reads of IO_IMAGE devices resolve against the frozen
    /// image; everything else reads the live store. Unwritten cells read as
    /// the device's default value.
    pub fn read(
        &self,
        dev: &str,
        space: Space,
        addr: u32,
        count: u32,
        source: &Source,
    ) -> Result<Vec<CellValue>, Error> {
        let model = self.profile.model(dev)?;
        model.validate(space, addr, count)?;
        let from_image =
            source.is_ladder() && model.scan_consistency_rule == ScanConsistencyRule::IoImage;
        let store = if from_image {
            self.image.read()
        } else {
            self.live.read()
        };
        let cells = store.get(&(dev.to_string(), space));
        Ok((0..count)
            .map(|offset| {
                cells
                    .and_then(|c| c.get(&(addr + offset)))
                    .copied()
                    .unwrap_or(model.default_value)
            })
            .collect())
    }

    /// Writes `values` to consecutive cells starting at `addr`.
    ///
    /// Validation covers the address span, writability, and each value's
    /// width. The device lock is held for the duration of the dispatch;
    /// IMMEDIATE devices are updated in place, deferred policies append a WAL
    /// entry targeting the next scan.
    pub fn write(
        &self,
        dev: &str,
        space: Space,
        addr: u32,
        values: &[CellValue],
        source: &Source,
    ) -> Result<(), Error> {
        let model = self.profile.model(dev)?;
        model.validate(space, addr, u32::try_from(values.len()).unwrap_or(u32::MAX))?;
        model.validate_writable()?;
        for &value in values {
            space.validate_value(value)?;
        }
        let policy = model.scan_consistency_rule;
        let _guard = self.locks.acquire(dev, self.options.lock_timeout)?;
        match policy {
            ScanConsistencyRule::Immediate => {
                let mut live = self.live.write();
                store_values(&mut live, dev, space, addr, values);
            }
            ScanConsistencyRule::NextScan | ScanConsistencyRule::IoImage => {
                let scan_id = self.current_scan_id();
                let _ = self.wal.append(WalEntry {
                    seq: 0,
                    time_ms: 0,
                    scan_id,
                    target_scan_id: scan_id + 1,
                    source: source.clone(),
                    dev: dev.to_string(),
                    space,
                    addr,
                    values: values.to_vec(),
                    policy,
                    result: WalResult::Accepted,
                });
            }
        }
        Ok(())
    }

    /// Reads from the bit space.
    pub fn read_bits(
        &self,
        dev: &str,
        addr: u32,
        count: u32,
        source: &Source,
    ) -> Result<Vec<CellValue>, Error> {
        self.read(dev, Space::Bit, addr, count, source)
    }

    /// Writes to the bit space.
    pub fn write_bits(
        &self,
        dev: &str,
        addr: u32,
        values: &[CellValue],
        source: &Source,
    ) -> Result<(), Error> {
        self.write(dev, Space::Bit, addr, values, source)
    }

    /// Reads from the word space.
    pub fn read_words(
        &self,
        dev: &str,
        addr: u32,
        count: u32,
        source: &Source,
    ) -> Result<Vec<CellValue>, Error> {
        self.read(dev, Space::Word, addr, count, source)
    }

    /// Writes to the word space.
    pub fn write_words(
        &self,
        dev: &str,
        addr: u32,
        values: &[CellValue],
        source: &Source,
    ) -> Result<(), Error> {
        self.write(dev, Space::Word, addr, values, source)
    }

    /// Reads from the dword space.
    pub fn read_dwords(
        &self,
        dev: &str,
        addr: u32,
        count: u32,
        source: &Source,
    ) -> Result<Vec<CellValue>, Error> {
        self.read(dev, Space::Dword, addr, count, source)
    }

    /// Writes to the dword space.
    pub fn write_dwords(
        &self,
        dev: &str,
        addr: u32,
        values: &[CellValue],
        source: &Source,
    ) -> Result<(), Error> {
        self.write(dev, Space::Dword, addr, values, source)
    }
}

fn store_values(store: &mut CellStore, dev: &str, space: Space, addr: u32, values: &[CellValue]) {
    let cells = store.entry((dev.to_string(), space)).or_default();
    for (offset, &value) in values.iter().enumerate() {
        let _ = cells.insert(addr + offset as u32, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AddressRange, MemoryModel};
    use crate::profile::ProfileMeta;
    use std::sync::Arc;
    use std::thread;

    fn model(
        suffix: &str,
        spaces: &[Space],
        max: u32,
        rule: ScanConsistencyRule,
    ) -> MemoryModel {
        MemoryModel {
            device_suffix: suffix.to_string(),
            supported_spaces: spaces.to_vec(),
            ranges: spaces
                .iter()
                .map(|&s| {
                    (
                        s,
                        AddressRange {
                            min_address: 0,
                            max_address: max,
                        },
                    )
                })
                .collect(),
            scan_consistency_rule: rule,
            default_value: 0,
            writable: true,
        }
    }

    fn test_memory() -> DeviceMemory {
        let profile = DeviceProfile::new(
            ProfileMeta {
                name: "kv-test".to_string(),
                version: 1,
                description: String::new(),
            },
            vec![
                model("R", &[Space::Bit], 15999, ScanConsistencyRule::IoImage),
                model("MR", &[Space::Bit], 15999, ScanConsistencyRule::NextScan),
                model(
                    "DM",
                    &[Space::Word, Space::Dword],
                    65534,
                    ScanConsistencyRule::Immediate,
                ),
            ],
        )
        .unwrap();
        DeviceMemory::new(profile, WalStore::new(1024), DeviceMemoryOptions::default())
    }

    fn adapter() -> Source {
        Source::adapter("t")
    }

    #[test]
    fn sparse_cells_read_as_default() {
        let mem = test_memory();
        assert_eq!(mem.read_words("DM", 0, 2, &adapter()).unwrap(), vec![0, 0]);
    }

    #[test]
    fn range_boundary_on_words() {
        let mem = test_memory();
        mem.write_words("DM", 65534, &[1], &adapter()).unwrap();
        assert_eq!(mem.read_words("DM", 65534, 1, &adapter()).unwrap(), vec![1]);
        let err = mem.read_words("DM", 65535, 1, &adapter()).unwrap_err();
        assert_eq!(err.code(), "OUT_OF_RANGE");
    }

    #[test]
    fn immediate_write_is_visible_at_once() {
        let mem = test_memory();
        mem.write_dwords("DM", 10, &[0xFFFF_FFFF], &adapter()).unwrap();
        assert_eq!(
            mem.read_dwords("DM", 10, 1, &adapter()).unwrap(),
            vec![0xFFFF_FFFF]
        );
    }

    #[test]
    fn next_scan_write_defers_until_apply() {
        let mem = test_memory();
        mem.begin_scan(1, 10);
        mem.write_bits("MR", 0, &[1], &adapter()).unwrap();
        assert_eq!(mem.read_bits("MR", 0, 1, &adapter()).unwrap(), vec![0]);
        mem.apply_wal(ApplyPhase::ScanEnd, 2);
        assert_eq!(mem.read_bits("MR", 0, 1, &adapter()).unwrap(), vec![1]);
        assert!(mem.wal().is_empty());
    }

    #[test]
    fn io_image_freezes_ladder_reads() {
        let mem = test_memory();
        mem.begin_scan(1, 10);
        mem.write_bits("R", 0, &[1], &adapter()).unwrap();
        assert_eq!(
            mem.read_bits("R", 0, 1, &Source::ladder("A")).unwrap(),
            vec![0]
        );
        mem.apply_wal(ApplyPhase::ScanEnd, 2);
        // The live store moved on; the image stays frozen until the next
        // begin_scan.
        assert_eq!(mem.read_bits("R", 0, 1, &adapter()).unwrap(), vec![1]);
        assert_eq!(
            mem.read_bits("R", 0, 1, &Source::ladder("A")).unwrap(),
            vec![0]
        );
        mem.begin_scan(2, 10);
        assert_eq!(
            mem.read_bits("R", 0, 1, &Source::ladder("A")).unwrap(),
            vec![1]
        );
    }

    #[test]
    fn value_round_trips_at_space_extremes() {
        let mem = test_memory();
        for (space, value) in [
            (Space::Word, 0),
            (Space::Word, 65535),
            (Space::Dword, 0xFFFF_FFFF),
        ] {
            mem.write("DM", space, 42, &[value], &adapter()).unwrap();
            assert_eq!(
                mem.read("DM", space, 42, 1, &adapter()).unwrap(),
                vec![value]
            );
        }
    }

    #[test]
    fn out_of_width_values_are_rejected() {
        let mem = test_memory();
        for (space, value) in [
            (Space::Word, -1),
            (Space::Word, 65536),
            (Space::Dword, 0x1_0000_0000),
        ] {
            let err = mem.write("DM", space, 0, &[value], &adapter()).unwrap_err();
            assert_eq!(err.code(), "OUT_OF_RANGE");
        }
        let err = mem.write_bits("MR", 0, &[2], &adapter()).unwrap_err();
        assert_eq!(err.code(), "OUT_OF_RANGE");
    }

    #[test]
    fn unknown_device_is_reported() {
        let mem = test_memory();
        let err = mem.read_words("ZZ", 0, 1, &adapter()).unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_DEVICE");
    }

    #[test]
    fn deferred_entries_apply_in_seq_order() {
        let mem = test_memory();
        mem.begin_scan(1, 10);
        mem.write_bits("MR", 5, &[1], &adapter()).unwrap();
        mem.write_bits("MR", 5, &[0], &adapter()).unwrap();
        mem.apply_wal(ApplyPhase::ScanEnd, 2);
        // The later write wins.
        assert_eq!(mem.read_bits("MR", 5, 1, &adapter()).unwrap(), vec![0]);
    }

    #[test]
    fn concurrent_immediate_writes_are_all_visible() {
        let mem = Arc::new(test_memory());
        let handles: Vec<_> = (0u32..4)
            .map(|worker| {
                let mem = mem.clone();
                thread::spawn(move || {
                    let source = Source::adapter("t");
                    for offset in 0..50u32 {
                        let addr = worker * 100 + offset;
                        mem.write_words("DM", addr, &[CellValue::from(addr)], &source)
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        for worker in 0u32..4 {
            for offset in 0..50u32 {
                let addr = worker * 100 + offset;
                assert_eq!(
                    mem.read_words("DM", addr, 1, &adapter()).unwrap(),
                    vec![CellValue::from(addr)]
                );
            }
        }
    }
}
