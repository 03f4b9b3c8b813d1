// SPDX-License-Identifier: Apache-2.0

//! Observer callbacks at scan and module boundaries.

use crate::context::ScanContext;
use crate::module::ModuleOutcome;

/// Observes the scan cycle. All methods default to no-ops.
pub trait ScanHook {
    /// Fired right after the memory froze its I/O image for this scan.
    fn on_scan_begin(&mut self, _ctx: &ScanContext<'_>) {}

    /// Fired before each module executes.
    fn before_module(&mut self, _ctx: &ScanContext<'_>, _module: &str) {}

    /// Fired after each module, also when it failed.
    fn after_module(&mut self, _ctx: &ScanContext<'_>, _module: &str, _outcome: ModuleOutcome) {}

    /// Fired after deferred writes were applied, before the scan id advances.
    fn on_scan_end(&mut self, _ctx: &ScanContext<'_>) {}
}
