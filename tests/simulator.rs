// SPDX-License-Identifier: Apache-2.0

//! End-to-end flow over the shipped configuration and profile files: an
//! external write to the input relay ripples through the sample ladder
//! program across scans.

use plcsim::modules;
use plcsim_config::{ScanMode, SimulatorConfig};
use plcsim_engine::ScanEngine;
use plcsim_memory::{
    DeviceMemory, DeviceMemoryOptions, DeviceProfile, Source, WalStore,
};
use std::path::Path;
use std::sync::Arc;

fn repo_path(rel: impl AsRef<Path>) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(rel)
}

fn build_engine() -> (Arc<DeviceMemory>, ScanEngine) {
    let cfg = SimulatorConfig::from_file(repo_path("simulator.yaml")).unwrap();
    assert_eq!(cfg.scan.mode, ScanMode::Real);
    let profile = DeviceProfile::from_file(repo_path(&cfg.profile.path)).unwrap();
    assert_eq!(profile.meta().name, "kv8000");

    let mem = Arc::new(DeviceMemory::new(
        profile,
        WalStore::new(cfg.wal.max_entries),
        DeviceMemoryOptions {
            lock_timeout: cfg.locks.timeout,
            read_your_writes: cfg.consistency.read_your_writes,
            apply_phase: cfg.consistency.apply_phase,
        },
    ));
    let ladder = cfg
        .modules
        .iter()
        .map(|name| modules::build(name).expect("configured module must exist"))
        .collect();
    // The shipped config paces in real mode; drive the test scan by scan.
    let mut scan = cfg.scan.clone();
    scan.mode = ScanMode::Step;
    let engine = ScanEngine::new(mem.clone(), ladder, scan);
    (mem, engine)
}

#[test]
fn input_pulses_count_through_the_sample_program() {
    let (mem, mut engine) = build_engine();
    let operator = Source::adapter("example");

    assert_eq!(mem.read_bits("R", 0, 1, &operator).unwrap(), vec![0]);
    assert_eq!(mem.read_words("DM", 100, 2, &operator).unwrap(), vec![0, 0]);

    // Pulse the input relay three times. Each external value takes one scan
    // to land in R (IO_IMAGE), one mirror scan to reach MR0, and one more
    // apply before the counter sees it.
    let pulses = [1, 0, 1, 0, 1];
    for step in 0..10 {
        if let Some(&input) = pulses.get(step) {
            mem.write_bits("R", 0, &[input], &operator).unwrap();
        }
        let report = engine.step().unwrap();
        assert!(!report.failed);
    }

    // Three rising edges reached the counter: count full, done flag up, and
    // the batch marker latched.
    assert_eq!(mem.read_words("DM", 100, 1, &operator).unwrap(), vec![3]);
    assert_eq!(mem.read_bits("MR", 1, 1, &operator).unwrap(), vec![1]);
    assert_eq!(mem.read_words("DM", 101, 1, &operator).unwrap(), vec![1]);
    // The mirror keeps following the (still high) input.
    assert_eq!(mem.read_bits("MR", 0, 1, &operator).unwrap(), vec![1]);
}

#[test]
fn unknown_module_names_are_not_resolvable() {
    assert!(modules::build("input_mirror").is_some());
    assert!(modules::build("does_not_exist").is_none());
}
