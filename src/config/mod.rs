// file: src/config/mod.rs
// version: 1.0.0
// guid: 0dd9923b-5c6c-4d25-9df4-8f540ac350bb

//! Configuration for znx
//!
//! On-disk identifiers that existing devices and authored images depend on are
//! constants. Only host-side tooling and retry behavior are configurable.

pub mod loader;

pub use loader::ConfigLoader;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Filesystem label of the boot volume (partition 1).
pub const BOOT_LABEL: &str = "ZNX_BOOT";

/// Filesystem label of the data volume (partition 2).
pub const DATA_LABEL: &str = "ZNX_DATA";

/// Slot root on the data volume.
pub const IMAGES_DIR: &str = "boot_images";

/// Directories created on a fresh data volume.
pub const DATA_SKELETON: [&str; 3] = ["data/etc", "data/home", IMAGES_DIR];

/// Canonical file name of the active generation inside a slot.
pub const ACTIVE_FILE: &str = "IMAGE.0";

/// Suffix appended to the active name for the backup generation.
pub const BACKUP_SUFFIX: &str = ".zs-old";

/// Suffix of the staging file an update reconstructs into.
pub const STAGING_SUFFIX: &str = ".new";

/// Byte offset of the update descriptor inside an image.
pub const DESCRIPTOR_OFFSET: u64 = 33651;

/// Length in bytes of the update descriptor window.
pub const DESCRIPTOR_LEN: usize = 512;

/// Environment variable naming the configuration file
pub const CONFIG_ENV: &str = "ZNX_CONFIG";

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/znx/config.toml";

/// Runtime configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory whose contents are copied onto a freshly formatted boot volume
    pub bootloader_dir: PathBuf,

    /// Sync engine executable
    pub zsync_binary: String,

    /// `sgdisk` end specifier for the boot partition
    pub boot_partition_size: String,

    /// Unmount attempts before falling back to a lazy detach
    pub unmount_retries: u32,

    /// Delay between unmount attempts (milliseconds)
    pub unmount_retry_delay_ms: u64,

    /// Whole-file download timeout (seconds); unset means no timeout
    pub download_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bootloader_dir: PathBuf::from("/usr/share/znx/boot"),
            zsync_binary: "zsync".to_string(),
            boot_partition_size: "+132M".to_string(),
            unmount_retries: 5,
            unmount_retry_delay_ms: 500,
            download_timeout_secs: None,
        }
    }
}

impl Config {
    /// Reject values no command can work with
    pub fn validate(&self) -> crate::Result<()> {
        if self.zsync_binary.trim().is_empty() {
            return Err(crate::error::ZnxError::config("zsync_binary must not be empty"));
        }
        if self.unmount_retries == 0 {
            return Err(crate::error::ZnxError::config(
                "unmount_retries must be at least 1",
            ));
        }
        if !self.boot_partition_size.starts_with('+') {
            return Err(crate::error::ZnxError::config(format!(
                "boot_partition_size must be a relative sgdisk size such as +132M, got {}",
                self.boot_partition_size
            )));
        }
        if self.download_timeout_secs == Some(0) {
            return Err(crate::error::ZnxError::config(
                "download_timeout_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}
