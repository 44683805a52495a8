//! Core types shared by the inspector kernels
//!
//! Error handling for the whole library lives here. The timeline packer has no
//! error path at all; device parsing and storage are the only fallible parts.

/// Result type for inspector operations
pub type Result<T> = std::result::Result<T, InspectorError>;

/// Errors that can occur in the inspector kernels
#[derive(Debug, thiserror::Error)]
pub enum InspectorError {
    #[error("Failed to parse emulated device: {0}")]
    DeviceParse(String),

    #[error("Invalid trace data: {0}")]
    InvalidTrace(String),

    #[error("Device storage error: {0}")]
    Storage(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl InspectorError {
    /// Shorthand for a device parse failure
    pub fn device(message: impl Into<String>) -> Self {
        InspectorError::DeviceParse(message.into())
    }
}
