//! Built-in device presets
//!
//! Seed for the standard device list when storage has none saved yet.

use super::device::{DeviceType, EmulatedDevice, OverridesDevice};

struct Preset {
    title: &'static str,
    width: u32,
    height: u32,
    device_scale_factor: f64,
    user_agent: &'static str,
    touch: bool,
    mobile: bool,
}

const IPHONE_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 8_0 like Mac OS X) AppleWebKit/600.1.3 (KHTML, like Gecko) Version/8.0 Mobile/12A4345d Safari/600.1.4";
const NEXUS_5_UA: &str = "Mozilla/5.0 (Linux; Android 4.4.4; en-us; Nexus 5 Build/JOP40D) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/42.0.2307.2 Mobile Safari/537.36";
const GALAXY_S4_UA: &str = "Mozilla/5.0 (Linux; Android 4.2.2; GT-I9505 Build/JDQ39) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/31.0.1650.59 Mobile Safari/537.36";
const IPAD_UA: &str = "Mozilla/5.0 (iPad; CPU OS 7_0 like Mac OS X) AppleWebKit/537.51.1 (KHTML, like Gecko) Version/7.0 Mobile/11A465 Safari/9537.53";
const NEXUS_10_UA: &str = "Mozilla/5.0 (Linux; Android 4.3; Nexus 10 Build/JSS15Q) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/42.0.2307.2 Safari/537.36";
const CHROMEBOOK_UA: &str = "Mozilla/5.0 (X11; CrOS x86_64 4731.101.0) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/31.0.1650.67 Safari/537.36";
const DESKTOP_UA: &str = "Mozilla/5.0 (Windows NT 6.3; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/42.0.2307.2 Safari/537.36";

const PHONES: &[Preset] = &[
    Preset { title: "Apple iPhone 6", width: 375, height: 667, device_scale_factor: 2.0, user_agent: IPHONE_UA, touch: true, mobile: true },
    Preset { title: "Apple iPhone 6 Plus", width: 414, height: 736, device_scale_factor: 3.0, user_agent: IPHONE_UA, touch: true, mobile: true },
    Preset { title: "Google Nexus 5", width: 360, height: 640, device_scale_factor: 3.0, user_agent: NEXUS_5_UA, touch: true, mobile: true },
    Preset { title: "Samsung Galaxy S4", width: 360, height: 640, device_scale_factor: 3.0, user_agent: GALAXY_S4_UA, touch: true, mobile: true },
];

const TABLETS: &[Preset] = &[
    Preset { title: "Apple iPad 3 / 4", width: 768, height: 1024, device_scale_factor: 2.0, user_agent: IPAD_UA, touch: true, mobile: true },
    Preset { title: "Google Nexus 10", width: 800, height: 1280, device_scale_factor: 2.0, user_agent: NEXUS_10_UA, touch: true, mobile: true },
];

const NOTEBOOKS: &[Preset] = &[
    Preset { title: "Google Chromebook Pixel", width: 1280, height: 850, device_scale_factor: 2.0, user_agent: CHROMEBOOK_UA, touch: true, mobile: false },
    Preset { title: "Laptop with HiDPI screen", width: 1440, height: 900, device_scale_factor: 2.0, user_agent: DESKTOP_UA, touch: false, mobile: false },
    Preset { title: "Laptop with MDPI screen", width: 1280, height: 800, device_scale_factor: 1.0, user_agent: DESKTOP_UA, touch: false, mobile: false },
];

fn convert(presets: &[Preset], device_type: DeviceType) -> impl Iterator<Item = EmulatedDevice> + '_ {
    presets.iter().map(move |preset| {
        let overrides = OverridesDevice {
            width: preset.width,
            height: preset.height,
            device_scale_factor: preset.device_scale_factor,
            user_agent: preset.user_agent.to_string(),
            touch: preset.touch,
            mobile: preset.mobile,
        };
        EmulatedDevice::from_overrides_device(&overrides, preset.title, Some(device_type.clone()))
    })
}

/// Phones, then tablets, then notebooks
pub fn standard_devices() -> Vec<EmulatedDevice> {
    convert(PHONES, DeviceType::Phone)
        .chain(convert(TABLETS, DeviceType::Tablet))
        .chain(convert(NOTEBOOKS, DeviceType::Notebook))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_survive_json() {
        let devices = standard_devices();
        assert_eq!(devices.len(), PHONES.len() + TABLETS.len() + NOTEBOOKS.len());
        assert_eq!(devices[0].device_type, DeviceType::Phone);
        assert_eq!(devices.last().unwrap().device_type, DeviceType::Notebook);

        for device in &devices {
            let reparsed = EmulatedDevice::from_json(&device.to_json()).unwrap();
            assert_eq!(&reparsed, device);
        }
    }
}
