//! Subcommand implementations

use anyhow::{bail, Context, Result};
use inspector_core::devices::{list_from_json, DeviceStorage, EmulatedDevice};
use inspector_core::format::precise_millis_to_string;
use inspector_core::{
    DeviceCatalog, FlameChartDataProvider, JsonFileStorage, MemoryStorage, PromiseEvent, PromiseFilterConfig,
    PromiseInspector, PromiseStatus, TargetId, TimelineConfig, TimelineModel,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::config::DevicesConfig;

/// Target assumed for notifications that do not name one
pub const DEFAULT_TARGET: &str = "page";

/// One line of a promise notification stream
#[derive(Debug, Deserialize)]
struct PromiseNotification {
    #[serde(default = "default_target")]
    target: String,
    #[serde(flatten)]
    event: PromiseEvent,
}

fn default_target() -> String {
    DEFAULT_TARGET.to_string()
}

pub fn run_timeline(path: &Path, config: TimelineConfig) -> Result<()> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read timeline: {:?}", path))?;
    let mut model: TimelineModel =
        serde_json::from_str(&content).with_context(|| format!("Failed to parse timeline: {:?}", path))?;
    model
        .validate()
        .with_context(|| format!("Rejected timeline: {:?}", path))?;
    if model.minimum_record_time == 0.0 && model.maximum_record_time == 0.0 {
        model.compute_bounds();
    }

    let mut provider = FlameChartDataProvider::new(model, config);
    let data = provider.timeline_data().clone();
    log::info!("Laid out {} entries", data.len());

    println!("{:>5}  {:>14}  {:>14}  TITLE", "LEVEL", "START", "DURATION");
    for index in 0..data.len() {
        println!(
            "{:>5}  {:>14}  {:>14}  {}",
            data.entry_levels[index],
            precise_millis_to_string(data.entry_start_times[index], 3),
            precise_millis_to_string(data.entry_total_times[index], 3),
            provider.entry_title(index).unwrap_or_default()
        );
    }

    if !data.markers.is_empty() {
        println!("\nMarkers:");
        for marker in &data.markers {
            println!("  {}", marker.title());
        }
    }
    if !data.flows.is_empty() {
        println!("\nFlows:");
        for flow in &data.flows {
            let end = match (flow.end_time, flow.end_level) {
                (Some(time), Some(level)) if flow.is_closed() => format!("{:.3}@{}", time, level),
                _ => "(pending)".to_string(),
            };
            println!("  {:.3}@{} -> {}", flow.start_time, flow.start_level, end);
        }
    }
    println!("\nLevels: {}", provider.max_stack_depth());
    Ok(())
}

/// Merge `--status` flags into the configured filter
pub fn status_filter(mut filter: PromiseFilterConfig, names: &[String]) -> Result<PromiseFilterConfig> {
    for name in names {
        let status = match name.to_ascii_lowercase().as_str() {
            "pending" => PromiseStatus::Pending,
            "resolved" | "fulfilled" => PromiseStatus::Resolved,
            "rejected" => PromiseStatus::Rejected,
            other => bail!("Unknown promise status '{}'", other),
        };
        filter = filter.allow(status);
    }
    Ok(filter)
}

fn parse_notifications(content: &str) -> Result<Vec<PromiseNotification>> {
    if content.trim_start().starts_with('[') {
        return serde_json::from_str(content).context("Failed to parse notification array");
    }
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(number, line)| {
            serde_json::from_str(line).with_context(|| format!("Failed to parse notification on line {}", number + 1))
        })
        .collect()
}

pub fn run_promises(path: &Path, target: &str, filter: PromiseFilterConfig) -> Result<()> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read notifications: {:?}", path))?;
    let notifications = parse_notifications(&content)?;
    log::info!("Replaying {} promise notifications", notifications.len());

    let mut inspector = PromiseInspector::new(filter);
    inspector.set_current_target(TargetId::new(target));
    for notification in notifications {
        inspector.on_promise_updated(&TargetId::new(notification.target), notification.event);
    }

    for (depth, node) in inspector.tree().walk() {
        let row = &node.row;
        println!(
            "{}#{} {}  {}  {}  {}",
            "  ".repeat(depth),
            node.id,
            row.title,
            row.function,
            row.created.as_deref().unwrap_or("-"),
            row.time_to_settle.as_deref().unwrap_or("")
        );
    }
    if let Some(status) = inspector.filter_status() {
        println!("\n{}", status);
    }
    Ok(())
}

pub fn run_devices(config: &DevicesConfig, import: Option<&Path>, all: bool) -> Result<()> {
    match &config.storage_dir {
        Some(dir) => {
            let storage = JsonFileStorage::open(dir).with_context(|| format!("Failed to open device storage: {:?}", dir))?;
            list_devices(storage, import, all)
        }
        None => list_devices(MemoryStorage::new(), import, all),
    }
}

fn list_devices<S: DeviceStorage>(storage: S, import: Option<&Path>, all: bool) -> Result<()> {
    let mut catalog = DeviceCatalog::new(storage).context("Failed to load device lists")?;

    if let Some(path) = import {
        let content = fs::read_to_string(path).with_context(|| format!("Failed to read device list: {:?}", path))?;
        let json: serde_json::Value =
            serde_json::from_str(&content).with_context(|| format!("Failed to parse device list: {:?}", path))?;
        let devices = list_from_json(&json);
        println!("Imported {} device(s) from {:?}", devices.len(), path);
        for device in devices {
            catalog.add_custom_device(device).context("Failed to save custom devices")?;
        }
    }

    println!("Standard devices:");
    print_devices(catalog.standard(), all);
    println!("\nCustom devices:");
    print_devices(catalog.custom(), all);
    Ok(())
}

fn print_devices(devices: &[EmulatedDevice], all: bool) {
    for device in devices.iter().filter(|device| all || device.show()) {
        let mut flags = Vec::new();
        if device.touch() {
            flags.push("touch");
        }
        if device.mobile() {
            flags.push("mobile");
        }
        println!(
            "  {:<28} {:<9} {:>5}x{:<5} @{}x  {}",
            device.title,
            device.device_type,
            device.vertical.width,
            device.vertical.height,
            device.device_scale_factor,
            flags.join(",")
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_notification_lines() {
        let content = r#"
{"promise": {"id": 1, "status": "pending"}}
{"target": "worker", "eventType": "gc", "promise": {"id": 2, "parentId": 1, "status": "resolved"}}
"#;
        let notifications = parse_notifications(content).unwrap();
        assert_eq!(notifications.len(), 2);
        assert_eq!(notifications[0].target, DEFAULT_TARGET);
        assert_eq!(notifications[1].target, "worker");
        assert_eq!(notifications[1].event.promise.parent_id, Some(1));
    }

    #[test]
    fn test_parse_notification_array() {
        let content = r#"[{"promise": {"id": 3, "status": "rejected"}}]"#;
        let notifications = parse_notifications(content).unwrap();
        assert_eq!(notifications[0].event.promise.status, PromiseStatus::Rejected);

        let err = parse_notifications("{\"promise\": 1}\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn test_status_filter_flags() {
        let filter = status_filter(PromiseFilterConfig::new(), &["Fulfilled".to_string()]).unwrap();
        assert!(filter.accept(PromiseStatus::Resolved));
        assert!(!filter.accept(PromiseStatus::Pending));
        assert!(status_filter(PromiseFilterConfig::new(), &["settled".to_string()]).is_err());
    }

    #[test]
    fn test_import_persists_custom_devices() {
        let dir = tempfile::tempdir().unwrap();
        let list = dir.path().join("import.json");
        fs::write(
            &list,
            r#"[{"title": "Mine", "type": "phone", "user-agent": "UA",
                 "screen": {"device-pixel-ratio": 2,
                            "vertical": {"width": 360, "height": 640},
                            "horizontal": {"width": 640, "height": 360}}}]"#,
        )
        .unwrap();

        let config = DevicesConfig {
            storage_dir: Some(dir.path().join("store")),
        };
        run_devices(&config, Some(&list), false).unwrap();

        let storage = JsonFileStorage::open(dir.path().join("store")).unwrap();
        let catalog = DeviceCatalog::new(storage).unwrap();
        assert_eq!(catalog.custom().len(), 1);
        assert_eq!(catalog.custom()[0].title, "Mine");
    }
}
