// SPDX-License-Identifier: Apache-2.0

//! Device profile: the registry mapping device suffixes to memory models,
//! loadable from a keyed YAML or JSON document.

use crate::error::Error;
use crate::model::MemoryModel;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

/// Profile metadata carried alongside the device list.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileMeta {
    /// Human-readable profile name.
    pub name: String,
    /// Profile revision.
    pub version: u32,
    /// Optional free-form description.
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileFile {
    profile: ProfileMeta,
    devices: Vec<MemoryModel>,
}

/// Registry of device classes for one PLC model.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    meta: ProfileMeta,
    devices: HashMap<String, MemoryModel>,
}

impl DeviceProfile {
    /// Builds a profile from metadata and a device list.
    ///
    /// Fails when two devices share a suffix or a device lacks bounds for a
    /// supported space.
    pub fn new(meta: ProfileMeta, models: Vec<MemoryModel>) -> Result<Self, Error> {
        let mut devices = HashMap::with_capacity(models.len());
        for model in models {
            for space in &model.supported_spaces {
                if !model.ranges.contains_key(space) {
                    return Err(Error::Deserialization {
                        format: "profile".to_string(),
                        details: format!("{} missing bounds for {space}", model.device_suffix),
                    });
                }
            }
            if devices
                .insert(model.device_suffix.clone(), model)
                .is_some()
            {
                return Err(Error::Deserialization {
                    format: "profile".to_string(),
                    details: "duplicated device suffix".to_string(),
                });
            }
        }
        Ok(Self { meta, devices })
    }

    /// Create a new [`DeviceProfile`] from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, Error> {
        let file: ProfileFile =
            serde_json::from_str(json_str).map_err(|e| Error::Deserialization {
                format: "JSON".to_string(),
                details: e.to_string(),
            })?;
        Self::new(file.profile, file.devices)
    }

    /// Create a new [`DeviceProfile`] from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> Result<Self, Error> {
        let file: ProfileFile =
            serde_yaml::from_str(yaml_str).map_err(|e| Error::Deserialization {
                format: "YAML".to_string(),
                details: e.to_string(),
            })?;
        Self::new(file.profile, file.devices)
    }

    /// Load a [`DeviceProfile`] from a file, detecting the format from the
    /// file extension (`.json`, `.yaml`, `.yml`).
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| Error::FileRead {
            details: format!("{}: {e}", path.display()),
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase());
        match extension.as_deref() {
            Some("json") => Self::from_json(&contents),
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => Err(Error::FileRead {
                details: format!(
                    "unsupported file extension: {}. Supported extensions are: .json, .yaml, .yml",
                    extension.unwrap_or_else(|| "<none>".to_string())
                ),
            }),
        }
    }

    /// Profile metadata.
    #[must_use]
    pub fn meta(&self) -> &ProfileMeta {
        &self.meta
    }

    /// Looks up the memory model for a device suffix.
    pub fn model(&self, dev: &str) -> Result<&MemoryModel, Error> {
        self.devices.get(dev).ok_or_else(|| Error::UnknownDevice {
            device: dev.to_string(),
        })
    }

    /// Iterates over all registered device classes.
    pub fn devices(&self) -> impl Iterator<Item = (&str, &MemoryModel)> {
        self.devices.iter().map(|(k, v)| (k.as_str(), v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r"
profile:
  name: kv-test
  version: 1
devices:
  - device_suffix: DM
    supported_spaces: [word]
    ranges:
      word: { min_address: 0, max_address: 65534 }
    scan_consistency_rule: IMMEDIATE
  - device_suffix: R
    supported_spaces: [bit]
    ranges:
      bit: { min_address: 0, max_address: 1023 }
    scan_consistency_rule: IO_IMAGE
    writable: false
";

    #[test]
    fn loads_yaml_and_resolves_models() {
        let profile = DeviceProfile::from_yaml(SAMPLE).unwrap();
        assert_eq!(profile.meta().name, "kv-test");
        assert_eq!(profile.meta().version, 1);
        let dm = profile.model("DM").unwrap();
        assert_eq!(dm.default_value, 0);
        assert!(dm.writable);
        let r = profile.model("R").unwrap();
        assert!(!r.writable);
    }

    #[test]
    fn unknown_suffix_is_reported() {
        let profile = DeviceProfile::from_yaml(SAMPLE).unwrap();
        let err = profile.model("ZZ").unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_DEVICE");
    }

    #[test]
    fn loads_from_yaml_file() {
        let mut file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        let profile = DeviceProfile::from_file(file.path()).unwrap();
        assert!(profile.model("DM").is_ok());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();
        assert!(matches!(
            DeviceProfile::from_file(file.path()),
            Err(Error::FileRead { .. })
        ));
    }

    #[test]
    fn duplicate_suffix_is_rejected() {
        let doubled = format!(
            "{SAMPLE}  - device_suffix: DM\n    supported_spaces: [word]\n    ranges:\n      word: {{ min_address: 0, max_address: 10 }}\n    scan_consistency_rule: IMMEDIATE\n"
        );
        assert!(matches!(
            DeviceProfile::from_yaml(&doubled),
            Err(Error::Deserialization { .. })
        ));
    }

    #[test]
    fn missing_bounds_for_supported_space_is_rejected() {
        let broken = r"
profile: { name: broken, version: 1 }
devices:
  - device_suffix: DM
    supported_spaces: [word, dword]
    ranges:
      word: { min_address: 0, max_address: 10 }
    scan_consistency_rule: IMMEDIATE
";
        assert!(matches!(
            DeviceProfile::from_yaml(broken),
            Err(Error::Deserialization { .. })
        ));
    }
}
