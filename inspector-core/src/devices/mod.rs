//! Emulated device catalog
//!
//! Parsing and serialization of device descriptors plus the catalog that holds
//! the standard and custom device lists.

pub mod catalog;
pub mod device;
pub mod presets;

pub use catalog::{list_from_json, DeviceCatalog, DeviceStorage, JsonFileStorage, MemoryStorage};
pub use device::{
    DeviceType, EmulatedDevice, ImageSource, Images, Insets, Mode, Orientation, Outline, OverridesDevice, Rect, Show,
    HORIZONTAL, MAX_DEVICE_SIZE, VERTICAL,
};
pub use presets::standard_devices;
