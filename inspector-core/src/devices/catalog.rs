//! Device catalog with injected storage
//!
//! The catalog keeps two lists: the standard devices, seeded from the
//! built-in presets when storage has nothing saved, and the user's custom
//! devices, written back to storage on every change.

use super::device::EmulatedDevice;
use super::presets::standard_devices;
use crate::types::{InspectorError, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const STANDARD_FILE: &str = "standard_devices.json";
const CUSTOM_FILE: &str = "custom_devices.json";

/// Backing store for the device lists, as raw JSON arrays
pub trait DeviceStorage {
    /// Saved standard list, `None` when nothing was saved
    fn load_standard(&self) -> Result<Option<Value>>;

    /// Saved custom list, `None` when nothing was saved
    fn load_custom(&self) -> Result<Option<Value>>;

    fn save_custom(&mut self, devices: &Value) -> Result<()>;
}

/// In-memory storage
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    pub standard: Option<Value>,
    pub custom: Option<Value>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_standard(mut self, devices: Value) -> Self {
        self.standard = Some(devices);
        self
    }

    pub fn with_custom(mut self, devices: Value) -> Self {
        self.custom = Some(devices);
        self
    }
}

impl DeviceStorage for MemoryStorage {
    fn load_standard(&self) -> Result<Option<Value>> {
        Ok(self.standard.clone())
    }

    fn load_custom(&self) -> Result<Option<Value>> {
        Ok(self.custom.clone())
    }

    fn save_custom(&mut self, devices: &Value) -> Result<()> {
        self.custom = Some(devices.clone());
        Ok(())
    }
}

/// Two JSON files in one directory
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    dir: PathBuf,
}

impl JsonFileStorage {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        if dir.exists() && !dir.is_dir() {
            return Err(InspectorError::Storage(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read(&self, name: &str) -> Result<Option<Value>> {
        let path = self.dir.join(name);
        if !path.exists() {
            log::debug!("No saved device list at {}", path.display());
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&content)?))
    }
}

impl DeviceStorage for JsonFileStorage {
    fn load_standard(&self) -> Result<Option<Value>> {
        self.read(STANDARD_FILE)
    }

    fn load_custom(&self) -> Result<Option<Value>> {
        self.read(CUSTOM_FILE)
    }

    fn save_custom(&mut self, devices: &Value) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(CUSTOM_FILE);
        fs::write(&path, serde_json::to_string_pretty(devices)?)?;
        log::info!("Saved custom devices to {}", path.display());
        Ok(())
    }
}

/// Parse a device list, skipping records that fail to parse.
///
/// Anything other than a JSON array yields an empty list.
pub fn list_from_json(json: &Value) -> Vec<EmulatedDevice> {
    let Some(records) = json.as_array() else {
        log::warn!("Device list is not an array, ignoring");
        return Vec::new();
    };

    records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| match EmulatedDevice::from_json(record) {
            Ok(device) => Some(device),
            Err(e) => {
                log::error!("Failed to update emulated device list. Record {}: {}", index, e);
                None
            }
        })
        .collect()
}

pub struct DeviceCatalog<S: DeviceStorage> {
    storage: S,
    standard: Vec<EmulatedDevice>,
    custom: Vec<EmulatedDevice>,
}

impl<S: DeviceStorage> DeviceCatalog<S> {
    /// Load both lists from `storage`
    pub fn new(storage: S) -> Result<Self> {
        let standard = match storage.load_standard()? {
            Some(json) => list_from_json(&json),
            None => standard_devices(),
        };
        let custom = storage
            .load_custom()?
            .map(|json| list_from_json(&json))
            .unwrap_or_default();

        log::info!(
            "Loaded {} standard and {} custom devices",
            standard.len(),
            custom.len()
        );
        Ok(Self {
            storage,
            standard,
            custom,
        })
    }

    pub fn standard(&self) -> &[EmulatedDevice] {
        &self.standard
    }

    pub fn custom(&self) -> &[EmulatedDevice] {
        &self.custom
    }

    /// Devices the picker should list
    pub fn visible(&self) -> impl Iterator<Item = &EmulatedDevice> {
        self.standard.iter().chain(self.custom.iter()).filter(|device| device.show())
    }

    pub fn find(&self, title: &str) -> Option<&EmulatedDevice> {
        self.standard
            .iter()
            .chain(self.custom.iter())
            .find(|device| device.title == title)
    }

    pub fn add_custom_device(&mut self, device: EmulatedDevice) -> Result<()> {
        self.custom.push(device);
        self.save_custom_devices()
    }

    /// Remove the first custom device equal to `device`; returns whether one was removed
    pub fn remove_custom_device(&mut self, device: &EmulatedDevice) -> Result<bool> {
        let Some(position) = self.custom.iter().position(|d| d == device) else {
            return Ok(false);
        };
        self.custom.remove(position);
        self.save_custom_devices()?;
        Ok(true)
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn save_custom_devices(&mut self) -> Result<()> {
        let json = Value::Array(self.custom.iter().map(EmulatedDevice::to_json).collect());
        self.storage.save_custom(&json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device_json(title: &str, ratio: f64) -> Value {
        json!({
            "title": title,
            "type": "phone",
            "user-agent": "UA",
            "screen": {
                "device-pixel-ratio": ratio,
                "vertical": {"width": 360, "height": 640},
                "horizontal": {"width": 640, "height": 360}
            }
        })
    }

    #[test]
    fn test_list_skips_bad_records() {
        let list = json!([device_json("A", 2.0), device_json("B", 150.0), 42, device_json("C", 1.0)]);
        let titles: Vec<_> = list_from_json(&list).into_iter().map(|d| d.title).collect();
        assert_eq!(titles, vec!["A", "C"]);

        assert!(list_from_json(&json!({"title": "A"})).is_empty());
    }

    #[test]
    fn test_presets_seed_standard_list() {
        let catalog = DeviceCatalog::new(MemoryStorage::new()).unwrap();
        assert_eq!(catalog.standard().len(), standard_devices().len());
        assert!(catalog.custom().is_empty());
        assert!(catalog.find("Google Nexus 5").is_some());
    }

    #[test]
    fn test_saved_standard_list_wins() {
        let storage = MemoryStorage::new().with_standard(json!([device_json("Only", 1.0)]));
        let catalog = DeviceCatalog::new(storage).unwrap();
        assert_eq!(catalog.standard().len(), 1);
        assert_eq!(catalog.standard()[0].title, "Only");
    }

    #[test]
    fn test_custom_devices_persist() {
        let mut catalog = DeviceCatalog::new(MemoryStorage::new()).unwrap();
        let device = EmulatedDevice::from_json(&device_json("Mine", 2.0)).unwrap();
        catalog.add_custom_device(device.clone()).unwrap();

        let saved = catalog.storage().custom.clone().unwrap();
        assert_eq!(saved.as_array().unwrap().len(), 1);
        assert_eq!(saved[0]["title"], "Mine");

        assert!(catalog.remove_custom_device(&device).unwrap());
        assert!(!catalog.remove_custom_device(&device).unwrap());
        assert_eq!(catalog.storage().custom, Some(json!([])));
    }

    #[test]
    fn test_visible_respects_show() {
        let mut hidden = device_json("Hidden", 1.0);
        hidden["show"] = json!("Never");
        let storage = MemoryStorage::new().with_standard(json!([device_json("Shown", 1.0), hidden]));
        let catalog = DeviceCatalog::new(storage).unwrap();
        let titles: Vec<_> = catalog.visible().map(|d| d.title.as_str()).collect();
        assert_eq!(titles, vec!["Shown"]);
    }
}
