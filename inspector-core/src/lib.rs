//! Inspector Core Library
//!
//! Data kernels behind three inspector panels, with no rendering attached:
//! - Flame chart data provider: packs trace events onto non-overlapping levels
//! - Promise inspector: keeps promise records per target and arranges them in
//!   a tree by nearest visible ancestor
//! - Device catalog: parses and serializes emulated device descriptors
//!
//! Everything runs single threaded and to completion per notification. The
//! only I/O is the optional file-backed device storage.
//!
//! # Example Usage
//!
//! ```no_run
//! use inspector_core::{FlameChartDataProvider, TimelineConfig, TimelineModel, TraceEvent};
//!
//! let mut model = TimelineModel::default();
//! model.main_thread.events.push(TraceEvent::span("FunctionCall", 0.0, 10.0));
//! model.main_thread.events.push(TraceEvent::span("Layout", 2.0, 5.0));
//! model.compute_bounds();
//!
//! let config = TimelineConfig::new().with_flow_events(true);
//! let mut provider = FlameChartDataProvider::new(model, config);
//! let data = provider.timeline_data();
//! for (index, level) in data.entry_levels.iter().enumerate() {
//!     println!("entry {} on level {}", index, level);
//! }
//! ```

// Public modules
pub mod config;
pub mod devices;
pub mod format;
pub mod promises;
pub mod timeline;
pub mod types;

// Re-export main types for convenience
pub use config::{PromiseFilterConfig, TimelineConfig};
pub use devices::{DeviceCatalog, DeviceStorage, EmulatedDevice, JsonFileStorage, MemoryStorage};
pub use promises::{PromiseEvent, PromiseInspector, PromiseStatus, TargetId};
pub use timeline::{FlameChartDataProvider, TimelineData, TimelineModel, TraceEvent};
pub use types::{InspectorError, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: an empty model lays out to nothing
        let mut provider = FlameChartDataProvider::new(TimelineModel::default(), TimelineConfig::default());
        assert!(provider.timeline_data().is_empty());
        assert_eq!(provider.total_time(), 1000.0);
    }
}
