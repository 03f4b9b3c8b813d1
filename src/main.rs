// SPDX-License-Identifier: Apache-2.0

//! Simulator entry point: loads the configuration, builds device memory, the
//! scan engine, and the adapters, then either runs a single scan (step mode)
//! or enters the paced scan loop until ctrl-c.

use clap::Parser;
use miette::{IntoDiagnostic, miette};
use plcsim_adapter::LineAdapter;
use plcsim_config::{LoggingSettings, ScanMode, SimulatorConfig};
use plcsim_engine::ScanEngine;
use plcsim_memory::{DeviceMemory, DeviceMemoryOptions, DeviceProfile, WalStore};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use plcsim::modules;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "plcsim", about = "Scan-cycle PLC simulator", version)]
struct Cli {
    /// Path to the simulator configuration file.
    #[arg(short, long, default_value = "simulator.yaml")]
    config: PathBuf,
}

fn init_logging(settings: &LoggingSettings) -> miette::Result<()> {
    let filter = EnvFilter::try_new(&settings.level)
        .map_err(|e| miette!("invalid logging.level `{}`: {e}", settings.level))?;
    match &settings.file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).into_diagnostic()?;
                }
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .into_diagnostic()?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(Arc::new(file))
                .with_ansi(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    let cfg = SimulatorConfig::from_file(&cli.config)?;
    init_logging(&cfg.logging)?;

    let profile = DeviceProfile::from_file(&cfg.profile.path).into_diagnostic()?;
    info!(
        profile = %profile.meta().name,
        version = profile.meta().version,
        "profile loaded"
    );
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
        .map(|name| {
            modules::build(name).ok_or_else(|| miette!("unknown ladder module `{name}`"))
        })
        .collect::<miette::Result<Vec<_>>>()?;
    let mut engine = ScanEngine::new(mem.clone(), ladder, cfg.scan.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .into_diagnostic()?;
    let cancel = CancellationToken::new();
    for settings in &cfg.adapters {
        let adapter = LineAdapter::new(mem.clone(), settings.clone());
        let token = cancel.clone();
        let _ = runtime.spawn(async move {
            if let Err(err) = adapter.serve(token).await {
                error!(%err, "adapter terminated");
            }
        });
    }

    match cfg.scan.mode {
        ScanMode::Step => {
            let report = engine.step().into_diagnostic()?;
            info!(scan_id = report.scan_id, failed = report.failed, "single scan complete");
        }
        ScanMode::Real => {
            let ctrl_c = cancel.clone();
            let _ = runtime.spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("shutdown requested");
                    ctrl_c.cancel();
                }
            });
            engine.run(&cancel).into_diagnostic()?;
        }
    }

    cancel.cancel();
    runtime.shutdown_timeout(Duration::from_secs(1));
    Ok(())
}
