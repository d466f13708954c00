// file: src/error.rs
// version: 1.0.0
// guid: fdc68fb6-ce96-4599-b2cb-a878065f522c

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, ZnxError>;

/// Error types for znx
///
/// Every variant maps to the same process exit code; the message is what
/// distinguishes them for the operator.
#[derive(Error, Debug)]
pub enum ZnxError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Permission denied: {0}")]
    Privilege(String),

    #[error("{} is not a block device", .0.display())]
    NotBlockDevice(PathBuf),

    #[error("Device {} has mounted partitions: {}", .device.display(), .mounted.join(", "))]
    DeviceMounted { device: PathBuf, mounted: Vec<String> },

    #[error("Device {} is not managed by znx (no usable ZNX_DATA volume): {reason}", .device.display())]
    NotManaged { device: PathBuf, reason: String },

    #[error("Mount error: {0}")]
    Mount(String),

    #[error("Image {0} is already deployed")]
    AlreadyDeployed(String),

    #[error("Image {0} is not deployed")]
    NotDeployed(String),

    #[error("Cannot revert {0}: no backup generation exists")]
    RevertFailed(String),

    #[error("Image {0} carries no update information")]
    MissingUpdateInfo(String),

    #[error("Failed to deploy {image}: {reason}")]
    DeployFailed { image: String, reason: String },

    #[error("Failed to update {image}: {reason}")]
    UpdateFailed { image: String, reason: String },

    #[error("Failed to initialize {}: {reason}", .device.display())]
    InitFailed { device: PathBuf, reason: String },

    #[error("Interrupted by {0}")]
    Interrupted(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl ZnxError {
    /// Create a new usage error
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Create a new privilege error
    pub fn privilege(msg: impl Into<String>) -> Self {
        Self::Privilege(msg.into())
    }

    /// Create a new mount error
    pub fn mount(msg: impl Into<String>) -> Self {
        Self::Mount(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new not-managed error for `device`
    pub fn not_managed(device: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::NotManaged {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Create a new deploy failure for `image`
    pub fn deploy_failed(image: impl ToString, reason: impl Into<String>) -> Self {
        Self::DeployFailed {
            image: image.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a new update failure for `image`
    pub fn update_failed(image: impl ToString, reason: impl Into<String>) -> Self {
        Self::UpdateFailed {
            image: image.to_string(),
            reason: reason.into(),
        }
    }

    /// Create a new init failure for `device`
    pub fn init_failed(device: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InitFailed {
            device: device.into(),
            reason: reason.into(),
        }
    }

    /// Process exit code for this error.
    pub fn exit_code(&self) -> u8 {
        1
    }
}
