// file: src/lifecycle/context.rs
// version: 1.0.0
// guid: 9c2e71d5-84a0-4b3f-b6e2-0a57d18f93c6

//! Per-invocation state

use crate::error::ZnxError;
use crate::image::ImageRepository;
use crate::Result;
use std::cell::OnceCell;
use std::path::{Path, PathBuf};

/// State one command carries from argument validation to unmount
#[derive(Debug)]
pub struct Context {
    device: PathBuf,
    mount_dir: OnceCell<PathBuf>,
}

impl Context {
    pub fn new(device: impl Into<PathBuf>) -> Self {
        Self {
            device: device.into(),
            mount_dir: OnceCell::new(),
        }
    }

    pub fn device(&self) -> &Path {
        &self.device
    }

    /// Record where the data volume is mounted. A volume is mounted at most
    /// once per invocation.
    pub fn bind_mount(&self, mount_dir: &Path) -> Result<()> {
        self.mount_dir.set(mount_dir.to_path_buf()).map_err(|_| {
            ZnxError::mount(format!(
                "data volume of {} is already mounted",
                self.device.display()
            ))
        })
    }

    pub fn mount_dir(&self) -> Option<&Path> {
        self.mount_dir.get().map(PathBuf::as_path)
    }

    /// Image repository on the bound data volume
    pub fn repository(&self) -> Result<ImageRepository> {
        self.mount_dir()
            .map(ImageRepository::on_volume)
            .ok_or_else(|| {
                ZnxError::mount(format!(
                    "data volume of {} is not mounted",
                    self.device.display()
                ))
            })
    }
}
