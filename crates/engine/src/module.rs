// SPDX-License-Identifier: Apache-2.0

//! Ladder modules: user-supplied units of behavior executed once per scan.

use crate::context::ScanContext;
use crate::error::Error;
use std::fmt;

/// A unit of ladder logic, registered with the engine and run every scan.
///
/// `on_load` and `on_unload` bracket the engine's run loop and default to
/// no-ops.
pub trait LadderModule {
    /// Stable module name; becomes the `ladder:<name>` source tag.
    fn name(&self) -> &str;

    /// Called once before the first scan of a run.
    fn on_load(&mut self, _ctx: &mut ScanContext<'_>) -> Result<(), Error> {
        Ok(())
    }

    /// Executes one scan's worth of logic.
    fn execute(&mut self, ctx: &mut ScanContext<'_>) -> Result<(), Error>;

    /// Called once after the last scan of a run.
    fn on_unload(&mut self, _ctx: &mut ScanContext<'_>) -> Result<(), Error> {
        Ok(())
    }
}

/// How one module's execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleOutcome {
    /// The module completed normally.
    Ok,
    /// The module returned an error.
    Error,
}

impl fmt::Display for ModuleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ModuleOutcome::Ok => "ok",
            ModuleOutcome::Error => "error",
        };
        write!(f, "{label}")
    }
}
