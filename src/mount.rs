// file: src/mount.rs
// version: 1.0.0
// guid: a723d2a1-8ba0-483a-9199-4ef681b6138f

//! Scoped mounting of znx volumes
//!
//! A [`MountGuard`] owns one mount on a process-private temporary directory.
//! The mount is released by [`MountGuard::release`] on the normal and error
//! paths and by `Drop` when the owning future is dropped (signal delivery)
//! or the stack unwinds. The temporary directory is only ever removed with a
//! non-recursive `rmdir`, so a mount that refuses to go away can never lead
//! to device content being deleted.

use crate::config::{Config, DATA_LABEL};
use crate::error::ZnxError;
use crate::utils::disk::UnmountMode;
use crate::utils::{DiskUtils, SystemUtils};
use crate::Result;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const TEMP_PREFIX: &str = "znx-";

/// A mounted volume that is unmounted when released or dropped
#[derive(Debug)]
pub struct MountGuard {
    mount_dir: PathBuf,
    source: Option<PathBuf>,
    retries: u32,
    retry_delay: Duration,
    released: bool,
}

impl MountGuard {
    /// Mount the data volume of `device` on a fresh temporary directory.
    ///
    /// Partitions labeled `ZNX_DATA` are tried in table order and the first
    /// one that mounts wins. Anything short of an active mountpoint is
    /// reported as [`ZnxError::NotManaged`], with nothing left behind.
    pub async fn acquire(device: &Path, config: &Config) -> Result<Self> {
        let partitions = DiskUtils::list_partitions(device)
            .await
            .map_err(|e| ZnxError::not_managed(device, format!("{:#}", e)))?;

        let candidates: Vec<PathBuf> = partitions
            .iter()
            .filter(|part| part.has_label(DATA_LABEL))
            .map(|part| part.device_path())
            .collect();

        if candidates.is_empty() {
            return Err(ZnxError::not_managed(
                device,
                format!("no partition labeled {}", DATA_LABEL),
            ));
        }

        let mut guard = Self::on_temp_dir(config)?;
        for candidate in &candidates {
            match DiskUtils::mount_filesystem(candidate, &guard.mount_dir).await {
                Ok(()) => {
                    guard.source = Some(candidate.clone());
                    break;
                }
                Err(e) => warn!("Could not mount {}: {:#}", candidate.display(), e),
            }
        }

        let reason = match guard.source {
            None => Some("no ZNX_DATA partition could be mounted".to_string()),
            Some(_) => match DiskUtils::is_mountpoint(&guard.mount_dir).await {
                Ok(true) => None,
                Ok(false) => Some("mountpoint is not active after mount".to_string()),
                Err(e) => Some(format!("{:#}", e)),
            },
        };

        if let Some(reason) = reason {
            return Err(guard.abandon(device, reason).await);
        }

        info!(
            "Mounted {} on {}",
            guard.source().map(|p| p.display().to_string()).unwrap_or_default(),
            guard.mount_dir.display()
        );
        Ok(guard)
    }

    /// Release after a failed acquire. The acquire failure is what gets
    /// reported; a release failure is only logged.
    async fn abandon(mut self, device: &Path, reason: String) -> ZnxError {
        if let Err(e) = self.release().await {
            error!("{}", e);
        }
        ZnxError::not_managed(device, reason)
    }

    /// Mount a specific partition on a fresh temporary directory
    pub async fn mount_partition(partition: &Path, config: &Config) -> Result<Self> {
        let mut guard = Self::on_temp_dir(config)?;

        if let Err(e) = DiskUtils::mount_filesystem(partition, &guard.mount_dir).await {
            guard.release().await?;
            return Err(ZnxError::mount(format!(
                "failed to mount {}: {:#}",
                partition.display(),
                e
            )));
        }

        guard.source = Some(partition.to_path_buf());
        debug!("Mounted {} on {}", partition.display(), guard.mount_dir.display());
        Ok(guard)
    }

    fn on_temp_dir(config: &Config) -> Result<Self> {
        Ok(Self {
            mount_dir: SystemUtils::create_temp_dir(TEMP_PREFIX)?,
            source: None,
            retries: config.unmount_retries.max(1),
            retry_delay: Duration::from_millis(config.unmount_retry_delay_ms),
            released: false,
        })
    }

    /// Directory the volume is mounted on
    pub fn path(&self) -> &Path {
        &self.mount_dir
    }

    /// Device node that was mounted, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Whether release has already completed
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Unmount and remove the temporary directory.
    ///
    /// A missing mount is not an error. Calling this again after success is
    /// a no-op.
    pub async fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }

        for attempt in 0..self.retries {
            if !DiskUtils::is_mountpoint(&self.mount_dir).await.unwrap_or(false) {
                break;
            }
            let mode = unmount_mode_for(attempt);
            if let Err(e) = DiskUtils::unmount_filesystem(&self.mount_dir, mode).await {
                warn!(
                    "Unmount of {} failed (attempt {}/{}): {:#}",
                    self.mount_dir.display(),
                    attempt + 1,
                    self.retries,
                    e
                );
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        if DiskUtils::is_mountpoint(&self.mount_dir).await.unwrap_or(false) {
            warn!("Detaching busy mount {}", self.mount_dir.display());
            DiskUtils::unmount_filesystem(&self.mount_dir, UnmountMode::Lazy)
                .await
                .map_err(|e| {
                    ZnxError::mount(format!(
                        "could not unmount {}: {:#}",
                        self.mount_dir.display(),
                        e
                    ))
                })?;
        }

        remove_mount_dir(&self.mount_dir)?;
        self.released = true;
        debug!("Released {}", self.mount_dir.display());
        Ok(())
    }

    /// Release the mount and hand back `result`.
    ///
    /// When both fail, the error of `result` is returned and the release
    /// error is logged.
    pub async fn finish<T>(mut self, result: Result<T>) -> Result<T> {
        let released = self.release().await;
        match (result, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_error)) => {
                error!("{}", release_error);
                Err(e)
            }
        }
    }

    fn release_blocking(&mut self) -> Result<()> {
        for attempt in 0..self.retries {
            if !is_mountpoint_blocking(&self.mount_dir) {
                break;
            }
            if !unmount_blocking(&self.mount_dir, unmount_mode_for(attempt)) {
                std::thread::sleep(self.retry_delay);
            }
        }

        if is_mountpoint_blocking(&self.mount_dir)
            && !unmount_blocking(&self.mount_dir, UnmountMode::Lazy)
        {
            return Err(ZnxError::mount(format!(
                "could not unmount {}",
                self.mount_dir.display()
            )));
        }

        remove_mount_dir(&self.mount_dir)?;
        self.released = true;
        Ok(())
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!("Releasing {} during unwind", self.mount_dir.display());
        if let Err(e) = self.release_blocking() {
            error!("{}", e);
        }
    }
}

fn unmount_mode_for(attempt: u32) -> UnmountMode {
    if attempt == 0 {
        UnmountMode::Normal
    } else {
        UnmountMode::Force
    }
}

fn remove_mount_dir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ZnxError::mount(format!(
            "could not remove {}: {}",
            dir.display(),
            e
        ))),
    }
}

fn is_mountpoint_blocking(path: &Path) -> bool {
    std::process::Command::new("findmnt")
        .arg("--noheadings")
        .arg("--mountpoint")
        .arg(path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}

fn unmount_blocking(path: &Path, mode: UnmountMode) -> bool {
    let mut command = std::process::Command::new("umount");
    if let Some(flag) = mode.flag() {
        command.arg(flag);
    }
    command
        .arg(path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false)
}
