// SPDX-License-Identifier: Apache-2.0

//! The cyclic executive: runs ladder modules scan by scan against device
//! memory, honoring module-failure and WAL-discard policies.

use crate::context::ScanContext;
use crate::error::Error;
use crate::hooks::ScanHook;
use crate::module::{LadderModule, ModuleOutcome};
use crate::state::StateStore;
use plcsim_config::{ModuleErrorPolicy, ScanMode, ScanSettings, WalErrorPolicy};
use plcsim_memory::{ApplyPhase, DeviceMemory, Source};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Summary of one completed scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanReport {
    /// Id of the completed scan.
    pub scan_id: u64,
    /// Delta used as the scan's time base, in milliseconds.
    pub delta_ms: u64,
    /// Whether any module failed during the scan.
    pub failed: bool,
}

/// The scan engine. Owns the scratchpad state and the registered modules;
/// shares the device memory with adapters.
pub struct ScanEngine {
    mem: Arc<DeviceMemory>,
    modules: Vec<Box<dyn LadderModule>>,
    hooks: Vec<Box<dyn ScanHook>>,
    config: ScanSettings,
    state: StateStore,
    scan_id: u64,
    delta_ms: u64,
    last_tick: Instant,
}

impl ScanEngine {
    /// Creates an engine over `mem` running `modules` in registration order.
    #[must_use]
    pub fn new(
        mem: Arc<DeviceMemory>,
        modules: Vec<Box<dyn LadderModule>>,
        config: ScanSettings,
    ) -> Self {
        let delta_ms = config.period.as_millis().max(1) as u64;
        Self {
            mem,
            modules,
            hooks: Vec::new(),
            config,
            state: StateStore::new(),
            scan_id: 0,
            delta_ms,
            last_tick: Instant::now(),
        }
    }

    /// Registers an observer for scan and module boundaries.
    pub fn register_hook(&mut self, hook: Box<dyn ScanHook>) {
        self.hooks.push(hook);
    }

    /// The shared device memory.
    #[must_use]
    pub fn memory(&self) -> &Arc<DeviceMemory> {
        &self.mem
    }

    /// The engine-owned scratchpad, for diagnostics.
    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Runs exactly one scan cycle.
    ///
    /// With the `STOP` policy a failing module's error propagates from here
    /// before deferred writes are applied and before the scan id advances;
    /// `after_module` hooks have fired by then.
    pub fn step(&mut self) -> Result<ScanReport, Error> {
        let now = Instant::now();
        self.delta_ms = match self.config.mode {
            ScanMode::Step => self.config.period.as_millis().max(1) as u64,
            ScanMode::Real => (now - self.last_tick).as_millis().max(1) as u64,
        };
        self.last_tick = now;
        self.scan_id += 1;
        let scan_id = self.scan_id;
        let delta_ms = self.delta_ms;

        self.mem.begin_scan(scan_id, delta_ms);
        debug!(scan_id, delta_ms, mode = %self.config.mode, "scan begin");
        let mut ctx = ScanContext {
            mem: self.mem.as_ref(),
            state: &mut self.state,
            scan_id,
            delta_ms,
        };
        for hook in &mut self.hooks {
            hook.on_scan_begin(&ctx);
        }

        let mut scan_failed = false;
        for module in &mut self.modules {
            for hook in &mut self.hooks {
                hook.before_module(&ctx, module.name());
            }
            debug!(scan_id, module = module.name(), "module begin");
            let result = module.execute(&mut ctx);
            let outcome = match &result {
                Ok(()) => ModuleOutcome::Ok,
                Err(err) => {
                    scan_failed = true;
                    warn!(scan_id, module = module.name(), %err, "module failed");
                    ModuleOutcome::Error
                }
            };
            debug!(scan_id, module = module.name(), %outcome, "module end");
            for hook in &mut self.hooks {
                hook.after_module(&ctx, module.name(), outcome);
            }
            if let Err(err) = result {
                if self.config.on_module_error == ModuleErrorPolicy::Stop {
                    return Err(err);
                }
            }
        }

        if scan_failed && self.config.on_scan_error_wal == WalErrorPolicy::DiscardWalForScan {
            debug!(scan_id, "discarding ladder writes of failed scan");
            self.mem.wal().discard_scan(scan_id, Source::LADDER_PREFIX);
        }
        let wal_before = self.mem.wal().len();
        self.mem.apply_wal(ApplyPhase::ScanEnd, scan_id);
        let wal_after = self.mem.wal().len();
        for hook in &mut self.hooks {
            hook.on_scan_end(&ctx);
        }
        self.mem.end_scan(scan_id);
        debug!(scan_id, scan_failed, wal_before, wal_after, "scan end");
        Ok(ScanReport {
            scan_id,
            delta_ms,
            failed: scan_failed,
        })
    }

    /// Runs scan cycles until `cancel` is set, pacing by the configured
    /// period in real mode. Cancellation is honored between scans only.
    ///
    /// `on_load` runs once before the first cycle; `on_unload` runs after the
    /// last one, also when the loop ends with an error.
    pub fn run(&mut self, cancel: &CancellationToken) -> Result<(), Error> {
        self.load()?;
        let result = loop {
            let started = Instant::now();
            if let Err(err) = self.step() {
                break Err(err);
            }
            if cancel.is_cancelled() {
                break Ok(());
            }
            if self.config.mode == ScanMode::Real {
                // Never negative: overruns just start the next scan at once.
                std::thread::sleep(self.config.period.saturating_sub(started.elapsed()));
            }
        };
        self.unload();
        result
    }

    fn load(&mut self) -> Result<(), Error> {
        let mut ctx = ScanContext {
            mem: self.mem.as_ref(),
            state: &mut self.state,
            scan_id: self.scan_id,
            delta_ms: self.delta_ms,
        };
        for module in &mut self.modules {
            module.on_load(&mut ctx)?;
        }
        Ok(())
    }

    fn unload(&mut self) {
        let mut ctx = ScanContext {
            mem: self.mem.as_ref(),
            state: &mut self.state,
            scan_id: self.scan_id,
            delta_ms: self.delta_ms,
        };
        for module in &mut self.modules {
            if let Err(err) = module.on_unload(&mut ctx) {
                warn!(module = module.name(), %err, "module unload failed");
            }
        }
    }
}
