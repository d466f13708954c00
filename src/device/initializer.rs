// file: src/device/initializer.rs
// version: 1.0.0
// guid: 86cba542-ebe3-4754-9d22-8dcef017836b

//! Turning a raw block device into a znx device
//!
//! There is no rollback: a failure after the wipe leaves the device without a
//! usable layout and `init` has to be run again.

use crate::config::{Config, BOOT_LABEL, DATA_LABEL, DATA_SKELETON};
use crate::error::ZnxError;
use crate::mount::MountGuard;
use crate::utils::disk::{partition_path, FilesystemType, MountInfo, PartitionSpec};
use crate::utils::DiskUtils;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::info;

/// GPT type code of an EFI system partition
const ESP_TYPE: &str = "EF00";

/// GPT type code of a Linux filesystem partition
const LINUX_TYPE: &str = "8300";

/// External programs `init` runs
pub const INIT_COMMANDS: [&str; 4] = ["wipefs", "sgdisk", "mkfs.vfat", "mkfs.btrfs"];

/// The two-partition znx layout
pub fn partition_layout(boot_size: &str) -> [PartitionSpec<'_>; 2] {
    [
        PartitionSpec {
            number: 1,
            end: boot_size,
            type_code: ESP_TYPE,
            name: BOOT_LABEL,
        },
        PartitionSpec {
            number: 2,
            end: "0",
            type_code: LINUX_TYPE,
            name: DATA_LABEL,
        },
    ]
}

/// Mount sources that belong to `device` or one of its `partitions`
///
/// Subvolume and bind mounts are matched on their device node, without the
/// bracketed filesystem root findmnt appends (`/dev/sdb2[/@home]`).
pub fn mounted_sources(device: &Path, partitions: &[PathBuf], mounts: &[MountInfo]) -> Vec<String> {
    mounts
        .iter()
        .filter_map(|mount| mount.source.as_deref())
        .filter(|source| {
            let node = Path::new(source_device(source));
            node == device || partitions.iter().any(|part| part == node)
        })
        .map(str::to_string)
        .collect()
}

/// Device node of a findmnt source, dropping a trailing `[fsroot]`
fn source_device(source: &str) -> &str {
    match source.find('[') {
        Some(start) if source.ends_with(']') => &source[..start],
        _ => source,
    }
}

/// Wipes, partitions, formats and seeds a device
pub struct DeviceInitializer<'a> {
    config: &'a Config,
}

impl<'a> DeviceInitializer<'a> {
    pub fn new(config: &'a Config) -> Self {
        Self { config }
    }

    pub async fn init(&self, device: &Path) -> Result<()> {
        self.ensure_unmounted(device).await?;

        info!("Initializing {}", device.display());
        DiskUtils::wipe_signatures(device)
            .await
            .map_err(|e| init_error(device, e))?;

        for spec in partition_layout(&self.config.boot_partition_size) {
            DiskUtils::create_partition(device, &spec)
                .await
                .map_err(|e| init_error(device, e))?;
        }
        DiskUtils::reread_partition_table(device).await;

        let boot = partition_path(device, 1);
        let data = partition_path(device, 2);

        DiskUtils::format_partition(&boot, FilesystemType::Fat32, BOOT_LABEL)
            .await
            .map_err(|e| init_error(device, e))?;
        DiskUtils::format_partition(&data, FilesystemType::Btrfs, DATA_LABEL)
            .await
            .map_err(|e| init_error(device, e))?;

        self.seed_boot_volume(&boot)
            .await
            .map_err(|e| ZnxError::init_failed(device, e.to_string()))?;
        self.seed_data_volume(&data)
            .await
            .map_err(|e| ZnxError::init_failed(device, e.to_string()))?;

        info!("{} is ready", device.display());
        Ok(())
    }

    async fn ensure_unmounted(&self, device: &Path) -> Result<()> {
        let listed = DiskUtils::list_partitions(device)
            .await
            .map_err(|e| init_error(device, e))?;
        let partitions: Vec<PathBuf> = listed.iter().map(|part| part.device_path()).collect();
        let mounts = DiskUtils::get_mounted_filesystems()
            .await
            .map_err(|e| init_error(device, e))?;

        let mut mounted = mounted_sources(device, &partitions, &mounts);
        // lsblk reports a mountpoint per partition as well.
        for part in &listed {
            let node = part.device_path().display().to_string();
            if part.mountpoint.is_some() && !mounted.iter().any(|m| source_device(m) == node) {
                mounted.push(node);
            }
        }
        if mounted.is_empty() {
            Ok(())
        } else {
            Err(ZnxError::DeviceMounted {
                device: device.to_path_buf(),
                mounted,
            })
        }
    }

    async fn seed_boot_volume(&self, boot: &Path) -> Result<()> {
        let guard = MountGuard::mount_partition(boot, self.config).await?;
        let result = copy_bootloader(&self.config.bootloader_dir, guard.path()).await;
        guard.finish(result).await
    }

    async fn seed_data_volume(&self, data: &Path) -> Result<()> {
        let guard = MountGuard::mount_partition(data, self.config).await?;
        let result = create_skeleton(guard.path()).await;
        guard.finish(result).await
    }
}

fn init_error(device: &Path, e: anyhow::Error) -> ZnxError {
    ZnxError::init_failed(device, format!("{:#}", e))
}

async fn copy_bootloader(source: &Path, target: &Path) -> Result<()> {
    if !source.is_dir() {
        return Err(ZnxError::config(format!(
            "bootloader directory {} does not exist",
            source.display()
        )));
    }

    info!("Installing bootloader files from {}", source.display());
    let source = source.to_path_buf();
    let target = target.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let options = fs_extra::dir::CopyOptions::new()
            .content_only(true)
            .overwrite(true);
        fs_extra::dir::copy(&source, &target, &options)
    })
    .await
    .map_err(|e| ZnxError::Io(std::io::Error::other(e)))?
    .map_err(|e| ZnxError::Io(std::io::Error::other(e)))?;

    Ok(())
}

async fn create_skeleton(root: &Path) -> Result<()> {
    for dir in DATA_SKELETON {
        tokio::fs::create_dir_all(root.join(dir)).await?;
    }
    Ok(())
}
