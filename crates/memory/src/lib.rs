// SPDX-License-Identifier: Apache-2.0

//! Device-addressed memory for the PLC simulator.
//!
//! The store is keyed by `(device, space, address)` and layered: a live store
//! holds the authoritative values, and an I/O image frozen at scan begin
//! serves ladder reads of IO_IMAGE devices. Writes are serialized per device
//! and, depending on the device's scan-consistency rule, either applied
//! immediately or deferred through the write-ahead log until the next scan
//! boundary.

pub mod device_memory;
pub mod error;
pub mod lock;
pub mod model;
pub mod profile;
pub mod source;
pub mod wal;

pub use device_memory::{ApplyPhase, DeviceMemory, DeviceMemoryOptions};
pub use error::Error;
pub use model::{CellValue, MemoryModel, ScanConsistencyRule, Space};
pub use profile::DeviceProfile;
pub use source::Source;
pub use wal::{WalEntry, WalStore};
