//! Emulated device descriptors
//!
//! Devices are read from and written to the JSON schema used by device list
//! files (`title`, `type`, `user-agent`, `screen`, `modes`, ...). Parsing is
//! strict: any structural problem rejects the whole record with a message
//! naming the offending key.

use crate::types::{InspectorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Largest accepted screen width or height
pub const MAX_DEVICE_SIZE: u32 = 10000;

/// Largest accepted device pixel ratio
pub const MAX_DEVICE_SCALE_FACTOR: f64 = 100.0;

pub const VERTICAL: &str = "vertical";
pub const HORIZONTAL: &str = "horizontal";

const CAPABILITY_TOUCH: &str = "touch";
const CAPABILITY_MOBILE: &str = "mobile";

static NULL: Value = Value::Null;

/// Device category; unrecognized strings are kept as they were read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Phone,
    Tablet,
    Notebook,
    Desktop,
    Unknown,
    Other(String),
}

impl DeviceType {
    pub fn as_str(&self) -> &str {
        match self {
            DeviceType::Phone => "phone",
            DeviceType::Tablet => "tablet",
            DeviceType::Notebook => "notebook",
            DeviceType::Desktop => "desktop",
            DeviceType::Unknown => "unknown",
            DeviceType::Other(name) => name,
        }
    }
}

impl From<&str> for DeviceType {
    fn from(name: &str) -> Self {
        match name {
            "phone" => DeviceType::Phone,
            "tablet" => DeviceType::Tablet,
            "notebook" => DeviceType::Notebook,
            "desktop" => DeviceType::Desktop,
            "unknown" => DeviceType::Unknown,
            other => DeviceType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Whether a device appears in the device picker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Show {
    Always,
    #[default]
    Default,
    Never,
}

impl Show {
    pub fn as_str(self) -> &'static str {
        match self {
            Show::Always => "Always",
            Show::Default => "Default",
            Show::Never => "Never",
        }
    }

    fn parse(name: &str) -> Result<Self> {
        match name {
            "Always" => Ok(Show::Always),
            "Default" => Ok(Show::Default),
            "Never" => Ok(Show::Never),
            other => Err(InspectorError::device(format!(
                "Emulated device has wrong show value '{}'",
                other
            ))),
        }
    }
}

/// One image at a given scale
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub src: String,
    pub scale: f64,
}

/// Image set for an outline or a mode
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Images {
    sources: Vec<ImageSource>,
}

impl Images {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_source(&mut self, src: impl Into<String>, scale: f64) {
        self.sources.push(ImageSource {
            src: src.into(),
            scale,
        });
    }

    pub fn sources(&self) -> &[ImageSource] {
        &self.sources
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    fn to_json(&self) -> Value {
        Value::Array(
            self.sources
                .iter()
                .map(|image| json!({"src": image.src, "scale": image.scale}))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub top: u32,
    pub left: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Insets {
    pub top: u32,
    pub left: u32,
}

/// Device frame drawn around the screen
#[derive(Debug, Clone, PartialEq)]
pub struct Outline {
    pub insets: Insets,
    pub images: Images,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Orientation {
    pub width: u32,
    pub height: u32,
    pub outline: Option<Outline>,
}

impl Orientation {
    fn to_json(&self) -> Value {
        let mut json = Map::new();
        json.insert("width".to_string(), json!(self.width));
        json.insert("height".to_string(), json!(self.height));
        if let Some(outline) = &self.outline {
            json.insert(
                "outline".to_string(),
                json!({
                    "insets": {"top": outline.insets.top, "left": outline.insets.left},
                    "images": outline.images.to_json(),
                }),
            );
        }
        Value::Object(json)
    }
}

/// A named page layout within one orientation
#[derive(Debug, Clone, PartialEq)]
pub struct Mode {
    pub title: String,
    pub orientation: String,
    pub page_rect: Rect,
    pub images: Images,
}

/// Flat override record applied to the emulated page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverridesDevice {
    pub width: u32,
    pub height: u32,
    pub device_scale_factor: f64,
    pub user_agent: String,
    pub touch: bool,
    pub mobile: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmulatedDevice {
    pub title: String,
    pub device_type: DeviceType,
    pub vertical: Orientation,
    pub horizontal: Orientation,
    pub device_scale_factor: f64,
    pub capabilities: Vec<String>,
    pub user_agent: String,
    pub modes: Vec<Mode>,
    pub show: Show,
    pub show_by_default: bool,
}

impl Default for EmulatedDevice {
    fn default() -> Self {
        Self {
            title: String::new(),
            device_type: DeviceType::Unknown,
            vertical: Orientation::default(),
            horizontal: Orientation::default(),
            device_scale_factor: 1.0,
            capabilities: Vec::new(),
            user_agent: String::new(),
            modes: Vec::new(),
            show: Show::Default,
            show_by_default: true,
        }
    }
}

impl EmulatedDevice {
    /// Parse one device record
    pub fn from_json(json: &Value) -> Result<Self> {
        let mut device = EmulatedDevice {
            title: string_value(json, "title")?.to_string(),
            device_type: DeviceType::from(string_value(json, "type")?),
            user_agent: string_value(json, "user-agent")?.to_string(),
            ..EmulatedDevice::default()
        };

        if let Some(capabilities) = optional(json, "capabilities")? {
            let list = capabilities
                .as_array()
                .ok_or_else(|| InspectorError::device("Emulated device capabilities must be an array"))?;
            for capability in list {
                let capability = capability
                    .as_str()
                    .ok_or_else(|| InspectorError::device("Emulated device capability must be a string"))?;
                device.capabilities.push(capability.to_string());
            }
        }

        let screen = json.get("screen").unwrap_or(&NULL);
        device.device_scale_factor = number_value(screen, "device-pixel-ratio")?;
        if !(0.0..=MAX_DEVICE_SCALE_FACTOR).contains(&device.device_scale_factor) {
            return Err(InspectorError::device(format!(
                "Emulated device has wrong deviceScaleFactor: {}",
                device.device_scale_factor
            )));
        }
        device.vertical = parse_orientation(object_value(screen, "vertical")?)?;
        device.horizontal = parse_orientation(object_value(screen, "horizontal")?)?;

        if let Some(modes) = optional(json, "modes")? {
            let list = modes
                .as_array()
                .ok_or_else(|| InspectorError::device("Emulated device modes must be an array"))?;
            for mode in list {
                let mode = parse_mode(mode, &device)?;
                device.modes.push(mode);
            }
        }

        if let Some(value) = optional(json, "show-by-default")? {
            device.show_by_default = value
                .as_bool()
                .ok_or_else(|| wrong_type("show-by-default", value))?;
        }
        if let Some(value) = optional(json, "show")? {
            let name = value.as_str().ok_or_else(|| wrong_type("show", value))?;
            device.show = Show::parse(name)?;
        }

        Ok(device)
    }

    /// Serialize back to the device list schema
    pub fn to_json(&self) -> Value {
        let modes: Vec<Value> = self
            .modes
            .iter()
            .map(|mode| {
                json!({
                    "title": mode.title,
                    "orientation": mode.orientation,
                    "page-rect": {
                        "top": mode.page_rect.top,
                        "left": mode.page_rect.left,
                        "width": mode.page_rect.width,
                        "height": mode.page_rect.height,
                    },
                    "images": mode.images.to_json(),
                })
            })
            .collect();

        json!({
            "title": self.title,
            "type": self.device_type.as_str(),
            "user-agent": self.user_agent,
            "capabilities": self.capabilities,
            "screen": {
                "device-pixel-ratio": self.device_scale_factor,
                "vertical": self.vertical.to_json(),
                "horizontal": self.horizontal.to_json(),
            },
            "modes": modes,
            "show-by-default": self.show_by_default,
            "show": self.show.as_str(),
        })
    }

    /// Build a device from a flat override record; horizontal is the swapped vertical
    pub fn from_overrides_device(device: &OverridesDevice, title: &str, device_type: Option<DeviceType>) -> Self {
        let mut capabilities = Vec::new();
        if device.touch {
            capabilities.push(CAPABILITY_TOUCH.to_string());
        }
        if device.mobile {
            capabilities.push(CAPABILITY_MOBILE.to_string());
        }

        EmulatedDevice {
            title: title.to_string(),
            device_type: device_type.unwrap_or(DeviceType::Unknown),
            vertical: Orientation {
                width: device.width,
                height: device.height,
                outline: None,
            },
            horizontal: Orientation {
                width: device.height,
                height: device.width,
                outline: None,
            },
            device_scale_factor: device.device_scale_factor,
            capabilities,
            user_agent: device.user_agent.clone(),
            ..EmulatedDevice::default()
        }
    }

    pub fn to_overrides_device(&self) -> OverridesDevice {
        OverridesDevice {
            width: self.vertical.width,
            height: self.vertical.height,
            device_scale_factor: self.device_scale_factor,
            user_agent: self.user_agent.clone(),
            touch: self.touch(),
            mobile: self.mobile(),
        }
    }

    /// Any name other than "vertical" selects the horizontal orientation
    pub fn orientation_by_name(&self, name: &str) -> &Orientation {
        if name == VERTICAL {
            &self.vertical
        } else {
            &self.horizontal
        }
    }

    pub fn show(&self) -> bool {
        match self.show {
            Show::Default => self.show_by_default,
            Show::Always => true,
            Show::Never => false,
        }
    }

    pub fn touch(&self) -> bool {
        self.capabilities.iter().any(|c| c == CAPABILITY_TOUCH)
    }

    pub fn mobile(&self) -> bool {
        self.capabilities.iter().any(|c| c == CAPABILITY_MOBILE)
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn wrong_type(key: &str, value: &Value) -> InspectorError {
    InspectorError::device(format!(
        "Emulated device property '{}' has wrong type '{}'",
        key,
        type_name(value)
    ))
}

/// Value under `key`, or `None` when `object` is not an object or lacks the key
fn optional<'a>(object: &'a Value, key: &str) -> Result<Option<&'a Value>> {
    match object.as_object().and_then(|map| map.get(key)) {
        None => Ok(None),
        Some(Value::Null) => Err(wrong_type(key, &Value::Null)),
        Some(value) => Ok(Some(value)),
    }
}

fn required<'a>(object: &'a Value, key: &str) -> Result<&'a Value> {
    optional(object, key)?.ok_or_else(|| {
        InspectorError::device(format!("Emulated device is missing required property '{}'", key))
    })
}

fn string_value<'a>(object: &'a Value, key: &str) -> Result<&'a str> {
    let value = required(object, key)?;
    value.as_str().ok_or_else(|| wrong_type(key, value))
}

fn number_value(object: &Value, key: &str) -> Result<f64> {
    let value = required(object, key)?;
    value.as_f64().ok_or_else(|| wrong_type(key, value))
}

fn object_value<'a>(object: &'a Value, key: &str) -> Result<&'a Value> {
    let value = required(object, key)?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err(wrong_type(key, value)),
    }
}

fn int_value(object: &Value, key: &str) -> Result<u32> {
    let value = number_value(object, key)?;
    if value < 0.0 || value.fract() != 0.0 || value > f64::from(u32::MAX) {
        return Err(InspectorError::device(format!(
            "Emulated device value '{}' must be integer",
            key
        )));
    }
    Ok(value as u32)
}

fn parse_rect(json: &Value) -> Result<Rect> {
    Ok(Rect {
        top: int_value(json, "top")?,
        left: int_value(json, "left")?,
        width: int_value(json, "width")?,
        height: int_value(json, "height")?,
    })
}

fn parse_images(json: &Value) -> Result<Images> {
    let list = json
        .as_array()
        .ok_or_else(|| InspectorError::device("Emulated device images is not an array"))?;
    let mut images = Images::new();
    for image in list {
        let src = string_value(image, "src")?;
        let scale = number_value(image, "scale")?;
        if scale <= 0.0 {
            return Err(InspectorError::device(
                "Emulated device property image scale must be positive",
            ));
        }
        images.add_source(src, scale);
    }
    Ok(images)
}

fn parse_orientation(json: &Value) -> Result<Orientation> {
    let width = int_value(json, "width")?;
    if width > MAX_DEVICE_SIZE {
        return Err(InspectorError::device(format!("Emulated device has wrong width: {}", width)));
    }
    let height = int_value(json, "height")?;
    if height > MAX_DEVICE_SIZE {
        return Err(InspectorError::device(format!("Emulated device has wrong height: {}", height)));
    }

    let outline_json = json.get("outline").unwrap_or(&NULL);
    let outline = match optional(outline_json, "insets")? {
        None => None,
        Some(insets) => {
            let insets = Insets {
                top: int_value(insets, "top")?,
                left: int_value(insets, "left")?,
            };
            let images = parse_images(object_value(outline_json, "images")?)?;
            Some(Outline { insets, images })
        }
    };

    Ok(Orientation {
        width,
        height,
        outline,
    })
}

fn parse_mode(json: &Value, device: &EmulatedDevice) -> Result<Mode> {
    let title = string_value(json, "title")?.to_string();
    let orientation = string_value(json, "orientation")?;
    if orientation != VERTICAL && orientation != HORIZONTAL {
        return Err(InspectorError::device(format!(
            "Emulated device mode has wrong orientation '{}'",
            orientation
        )));
    }

    let bounds = device.orientation_by_name(orientation);
    let page_rect = parse_rect(object_value(json, "page-rect")?)?;
    let fits = u64::from(page_rect.top) + u64::from(page_rect.height) <= u64::from(bounds.height)
        && u64::from(page_rect.left) + u64::from(page_rect.width) <= u64::from(bounds.width);
    if !fits {
        return Err(InspectorError::device(format!(
            "Emulated device mode '{}' has wrong page rect",
            title
        )));
    }

    Ok(Mode {
        title,
        orientation: orientation.to_string(),
        page_rect,
        images: parse_images(object_value(json, "images")?)?,
    })
}
