// SPDX-License-Identifier: Apache-2.0

//! Per-device memory model: address spaces, ranges, and scan-consistency
//! policies.

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The value carried by a single memory cell.
///
/// Stored values are always non-negative and fit the width of their address
/// space; the signed representation exists so that out-of-range inputs coming
/// off the wire stay representable until validation rejects them.
pub type CellValue = i64;

/// An address subspace within a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Space {
    /// Single-bit cells, values 0 or 1.
    Bit,
    /// 16-bit cells.
    Word,
    /// 32-bit cells.
    Dword,
}

impl Space {
    /// Largest value a cell of this space can hold.
    #[must_use]
    pub const fn max_value(self) -> CellValue {
        match self {
            Space::Bit => 1,
            Space::Word => 0xFFFF,
            Space::Dword => 0xFFFF_FFFF,
        }
    }

    /// Checks that `value` fits this space's width.
    pub fn validate_value(self, value: CellValue) -> Result<(), Error> {
        if value < 0 || value > self.max_value() {
            return Err(Error::OutOfRange {
                details: format!("{self} value must be 0..={}", self.max_value()),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Space {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Space::Bit => "bit",
            Space::Word => "word",
            Space::Dword => "dword",
        };
        write!(f, "{label}")
    }
}

/// When a write to a device becomes visible to readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanConsistencyRule {
    /// The live store is updated in place.
    Immediate,
    /// The write is deferred to the end of the issuing scan.
    NextScan,
    /// Deferred like [`ScanConsistencyRule::NextScan`]; additionally, ladder
    /// reads observe a snapshot frozen at scan begin.
    IoImage,
}

impl fmt::Display for ScanConsistencyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScanConsistencyRule::Immediate => "IMMEDIATE",
            ScanConsistencyRule::NextScan => "NEXT_SCAN",
            ScanConsistencyRule::IoImage => "IO_IMAGE",
        };
        write!(f, "{label}")
    }
}

/// An inclusive address span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AddressRange {
    /// Lowest valid address.
    pub min_address: u32,
    /// Highest valid address.
    pub max_address: u32,
}

/// The immutable description of one device class: which spaces it supports,
/// their address bounds, and how writes become visible.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryModel {
    /// Short symbolic name of the device class (e.g. "R", "MR", "DM").
    pub device_suffix: String,
    /// The address spaces this device supports.
    pub supported_spaces: Vec<Space>,
    /// Inclusive address bounds per supported space.
    pub ranges: HashMap<Space, AddressRange>,
    /// When writes to this device become visible.
    pub scan_consistency_rule: ScanConsistencyRule,
    /// Value returned for cells that were never written.
    #[serde(default)]
    pub default_value: CellValue,
    /// Whether the device accepts writes.
    #[serde(default = "default_writable")]
    pub writable: bool,
}

fn default_writable() -> bool {
    true
}

impl MemoryModel {
    /// Checks that `[addr, addr + count - 1]` is a valid span in `space`.
    pub fn validate(&self, space: Space, addr: u32, count: u32) -> Result<(), Error> {
        if !self.supported_spaces.contains(&space) {
            return Err(Error::TypeMismatch {
                details: format!("{} does not support {space}", self.device_suffix),
            });
        }
        if count < 1 {
            return Err(Error::OutOfRange {
                details: "count must be >= 1".to_string(),
            });
        }
        let bounds = self.ranges.get(&space).ok_or_else(|| Error::TypeMismatch {
            details: format!("{} missing bounds for {space}", self.device_suffix),
        })?;
        let last = addr as u64 + count as u64 - 1;
        if addr < bounds.min_address || last > bounds.max_address as u64 {
            return Err(Error::OutOfRange {
                details: format!(
                    "{}/{space} [{addr}, {last}] out of range [{}, {}]",
                    self.device_suffix, bounds.min_address, bounds.max_address
                ),
            });
        }
        Ok(())
    }

    /// Fails with [`Error::ReadOnly`] when the device rejects writes.
    pub fn validate_writable(&self) -> Result<(), Error> {
        if !self.writable {
            return Err(Error::ReadOnly {
                device: self.device_suffix.clone(),
            });
        }
        Ok(())
    }
}
