//! Configuration loading and parsing

use anyhow::{Context, Result};
use inspector_core::{PromiseFilterConfig, TimelineConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub promises: PromiseFilterConfig,
    #[serde(default)]
    pub devices: DevicesConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DevicesConfig {
    /// Directory holding the saved device lists; in-memory only when unset
    pub storage_dir: Option<PathBuf>,
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inspector_core::PromiseStatus;
    use std::io::Write;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [timeline]
            flow_events = true
            hidden_events = ["Paint"]

            [promises]
            statuses = ["pending", "rejected"]

            [devices]
            storage_dir = "devices"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert!(config.timeline.flow_events);
        assert_eq!(config.timeline.hidden_events, vec!["Paint".to_string()]);
        assert!(config.timeline.is_marker_event("MarkLoad"));
        assert!(config.promises.accept(PromiseStatus::Rejected));
        assert!(!config.promises.accept(PromiseStatus::Resolved));
        assert_eq!(config.devices.storage_dir, Some(PathBuf::from("devices")));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(!config.timeline.flow_events);
        assert!(config.promises.statuses.is_empty());
        assert!(config.devices.storage_dir.is_none());
    }

    #[test]
    fn test_load_config_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[timeline\n").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));

        assert!(load_config(Path::new("/nonexistent/config.toml")).is_err());
    }
}
