// SPDX-License-Identifier: Apache-2.0

//! Simulator configuration.
//!
//! One keyed document selects the device profile, WAL capacity, lock and
//! consistency options, scan mode and policies, the ordered ladder module
//! list, the adapter endpoints, and debug-log routing.

use plcsim_memory::ApplyPhase;
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod error;

use error::Error;

/// Where the device profile document lives.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileSettings {
    /// Path of the profile file (YAML or JSON).
    pub path: PathBuf,
}

/// Write-ahead log sizing.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WalSettings {
    /// Maximum retained entries; the oldest are truncated past this point.
    #[serde(default = "default_wal_max_entries")]
    pub max_entries: usize,
}

fn default_wal_max_entries() -> usize {
    100_000
}

impl Default for WalSettings {
    fn default() -> Self {
        Self {
            max_entries: default_wal_max_entries(),
        }
    }
}

/// Per-device write lock options.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LockSettings {
    /// How long a write waits for the device lock.
    #[serde(with = "humantime_serde", default = "default_lock_timeout")]
    pub timeout: Duration,
}

fn default_lock_timeout() -> Duration {
    Duration::from_secs(5)
}

impl Default for LockSettings {
    fn default() -> Self {
        Self {
            timeout: default_lock_timeout(),
        }
    }
}

/// Scan-consistency options forwarded to device memory.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsistencySettings {
    /// Reserved: would let a writer observe its own pending deferred writes.
    #[serde(default)]
    pub read_your_writes: bool,
    /// Scan phase at which deferred writes are applied.
    #[serde(default)]
    pub apply_phase: ApplyPhase,
}

/// How scan timing is driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Wall-clock pacing: sleep the remainder of the period between scans.
    #[default]
    Real,
    /// Single-step: the configured period is used as the scan delta.
    Step,
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ScanMode::Real => "real",
            ScanMode::Step => "step",
        };
        write!(f, "{label}")
    }
}

/// What the engine does when a ladder module fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleErrorPolicy {
    /// Log the failure and run the remaining modules.
    #[default]
    Continue,
    /// Propagate the failure out of the scan cycle.
    Stop,
}

/// What happens to this scan's deferred writes when a module failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WalErrorPolicy {
    /// Drop the failed scan's ladder-origin WAL entries.
    #[default]
    DiscardWalForScan,
    /// Keep every entry.
    Keep,
}

/// Scan engine settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanSettings {
    /// Timing mode.
    #[serde(default)]
    pub mode: ScanMode,
    /// Scan period (and the fixed delta in step mode).
    #[serde(with = "humantime_serde", default = "default_scan_period")]
    pub period: Duration,
    /// Module failure policy.
    #[serde(default)]
    pub on_module_error: ModuleErrorPolicy,
    /// WAL policy for failed scans.
    #[serde(default)]
    pub on_scan_error_wal: WalErrorPolicy,
}

fn default_scan_period() -> Duration {
    Duration::from_millis(10)
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            mode: ScanMode::default(),
            period: default_scan_period(),
            on_module_error: ModuleErrorPolicy::default(),
            on_scan_error_wal: WalErrorPolicy::default(),
        }
    }
}

/// Request-size caps enforced by one adapter.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterLimits {
    /// Most points one read or write may touch.
    #[serde(default = "default_max_points")]
    pub max_points_per_request: usize,
    /// Largest accepted frame, in bytes.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
}

fn default_max_points() -> usize {
    1024
}

fn default_max_frame_bytes() -> usize {
    1024 * 1024
}

impl Default for AdapterLimits {
    fn default() -> Self {
        Self {
            max_points_per_request: default_max_points(),
            max_frame_bytes: default_max_frame_bytes(),
        }
    }
}

/// One adapter endpoint.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdapterSettings {
    /// Adapter name; becomes the `adapter:<name>` source tag.
    pub name: String,
    /// Listening address.
    pub listen: SocketAddr,
    /// Request-size caps.
    #[serde(default)]
    pub limits: AdapterLimits,
    /// Readonly adapters reject writes before they reach device memory.
    #[serde(default)]
    pub readonly: bool,
}

/// Debug-log routing.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Log level filter directive (e.g. `info`, `debug`, `plcsim=debug`).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional log file; stderr when unset.
    #[serde(default)]
    pub file: Option<PathBuf>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// The simulator configuration document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulatorConfig {
    /// Device profile location.
    pub profile: ProfileSettings,
    /// WAL sizing.
    #[serde(default)]
    pub wal: WalSettings,
    /// Device lock options.
    #[serde(default)]
    pub locks: LockSettings,
    /// Consistency options.
    #[serde(default)]
    pub consistency: ConsistencySettings,
    /// Scan engine settings.
    #[serde(default)]
    pub scan: ScanSettings,
    /// Ladder modules to run, in scan order.
    #[serde(default)]
    pub modules: Vec<String>,
    /// Adapter endpoints.
    #[serde(default)]
    pub adapters: Vec<AdapterSettings>,
    /// Debug-log routing.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl SimulatorConfig {
    /// Create a new [`SimulatorConfig`] from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, Error> {
        let cfg: SimulatorConfig =
            serde_json::from_str(json_str).map_err(|e| Error::DeserializationError {
                format: "JSON".to_string(),
                details: e.to_string(),
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Create a new [`SimulatorConfig`] from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> Result<Self, Error> {
        let cfg: SimulatorConfig =
            serde_yaml::from_str(yaml_str).map_err(|e| Error::DeserializationError {
                format: "YAML".to_string(),
                details: e.to_string(),
            })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load a [`SimulatorConfig`] from a file, automatically detecting the
    /// format based on the file extension.
    ///
    /// Supports:
    /// - JSON files: `.json`
    /// - YAML files: `.yaml`, `.yml`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::FileReadError {
            details: format!("{}: {e}", path.display()),
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());
        match extension.as_deref() {
            Some("json") => Self::from_json(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => Err(Error::FileReadError {
                details: format!(
                    "Unsupported file extension: {}. Supported extensions are: .json, .yaml, .yml",
                    extension.unwrap_or_else(|| "<none>".to_string())
                ),
            }),
        }
    }

    /// Checks every setting, collecting all problems into one
    /// [`Error::InvalidConfiguration`].
    pub fn validate(&self) -> Result<(), Error> {
        let mut errors = Vec::new();
        if self.profile.path.as_os_str().is_empty() {
            errors.push(Error::InvalidSetting {
                field: "profile.path".to_string(),
                details: "must not be empty".to_string(),
            });
        }
        if self.wal.max_entries == 0 {
            errors.push(Error::InvalidSetting {
                field: "wal.max_entries".to_string(),
                details: "must be >= 1".to_string(),
            });
        }
        if self.scan.period < Duration::from_millis(1) {
            errors.push(Error::InvalidSetting {
                field: "scan.period".to_string(),
                details: "must be at least 1ms".to_string(),
            });
        }
        let mut names = HashSet::new();
        for adapter in &self.adapters {
            if adapter.name.is_empty() {
                errors.push(Error::InvalidSetting {
                    field: "adapters.name".to_string(),
                    details: "must not be empty".to_string(),
                });
            } else if !names.insert(adapter.name.clone()) {
                errors.push(Error::InvalidSetting {
                    field: "adapters.name".to_string(),
                    details: format!("duplicated adapter name `{}`", adapter.name),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(Error::InvalidConfiguration { errors })
        }
    }
}
