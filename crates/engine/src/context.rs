// SPDX-License-Identifier: Apache-2.0

//! The per-scan context handed to ladder modules and hooks.

use crate::plc;
use crate::state::StateStore;
use plcsim_memory::DeviceMemory;

/// Everything a ladder module may touch during one scan: device memory, the
/// scratchpad state, the PLC function blocks, and the scan counters.
///
/// The function blocks are exposed as methods so their state lives in
/// [`ScanContext::state`] and their time base is this scan's delta.
pub struct ScanContext<'a> {
    /// The shared device memory.
    pub mem: &'a DeviceMemory,
    /// The engine-owned scratchpad.
    pub state: &'a mut StateStore,
    /// Id of the scan being executed.
    pub scan_id: u64,
    /// Elapsed milliseconds since the previous scan (floor 1 ms).
    pub delta_ms: u64,
}

impl ScanContext<'_> {
    /// Rising-edge detector keyed by `id`.
    pub fn edge_rise(&mut self, id: &str, signal: bool) -> bool {
        plc::edge_rise(self.state, id, signal)
    }

    /// Falling-edge detector keyed by `id`.
    pub fn edge_fall(&mut self, id: &str, signal: bool) -> bool {
        plc::edge_fall(self.state, id, signal)
    }

    /// On-delay timer keyed by `id`.
    pub fn ton(&mut self, id: &str, input: bool, pt_ms: u64) -> bool {
        plc::ton(self.state, id, input, pt_ms, self.delta_ms)
    }

    /// Off-delay timer keyed by `id`.
    pub fn tof(&mut self, id: &str, input: bool, pt_ms: u64) -> bool {
        plc::tof(self.state, id, input, pt_ms, self.delta_ms)
    }

    /// Pulse timer keyed by `id`.
    pub fn tp(&mut self, id: &str, input: bool, pt_ms: u64) -> bool {
        plc::tp(self.state, id, input, pt_ms, self.delta_ms)
    }

    /// Up counter keyed by `id`; returns `(q, cv)`.
    pub fn ctu(&mut self, id: &str, input: bool, pv: i64, reset: bool) -> (bool, i64) {
        plc::ctu(self.state, id, input, pv, reset)
    }

    /// Down counter keyed by `id`; returns `(q, cv)`.
    pub fn ctd(&mut self, id: &str, input: bool, pv: i64, reset: bool) -> (bool, i64) {
        plc::ctd(self.state, id, input, pv, reset)
    }
}
