// file: src/utils/disk.rs
// version: 1.0.0
// guid: 5de147df-e754-40f4-a679-5d4a424868b6

use anyhow::{Context, Result};
use serde::Deserialize;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, info};

/// Disk and filesystem utilities wrapping the host's block device tools
pub struct DiskUtils;

impl DiskUtils {
    /// Check if a path exists and is a block device
    pub async fn is_block_device(device: &Path) -> Result<bool> {
        let metadata = match tokio::fs::metadata(device).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to get metadata for {}", device.display()))
            }
        };

        #[cfg(unix)]
        {
            use std::os::unix::fs::FileTypeExt;
            Ok(metadata.file_type().is_block_device())
        }

        #[cfg(not(unix))]
        {
            let _ = metadata;
            Ok(false)
        }
    }

    /// List the partitions of `device` in table order
    pub async fn list_partitions(device: &Path) -> Result<Vec<BlockDevice>> {
        let output = run_output(
            "lsblk",
            [
                OsStr::new("-J"),
                OsStr::new("-o"),
                OsStr::new("NAME,PATH,LABEL,TYPE,MOUNTPOINT"),
                device.as_os_str(),
            ],
        )
        .await?;

        let lsblk: LsblkOutput =
            serde_json::from_str(&output).context("Failed to parse lsblk JSON output")?;

        Ok(lsblk
            .blockdevices
            .into_iter()
            .flat_map(|dev| dev.children.unwrap_or_default())
            .filter(|child| child.device_type.as_deref() == Some("part"))
            .collect())
    }

    /// Get all mounted filesystems as a flat list
    pub async fn get_mounted_filesystems() -> Result<Vec<MountInfo>> {
        let output = run_output(
            "findmnt",
            ["-J", "--list", "-o", "SOURCE,TARGET,FSTYPE,OPTIONS"],
        )
        .await?;

        let findmnt: FindmntOutput =
            serde_json::from_str(&output).context("Failed to parse findmnt JSON output")?;

        Ok(findmnt.filesystems)
    }

    /// Whether `path` is currently a mount target
    pub async fn is_mountpoint(path: &Path) -> Result<bool> {
        let status = tokio::process::Command::new("findmnt")
            .arg("--noheadings")
            .arg("--mountpoint")
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .context("Failed to execute findmnt command")?;

        Ok(status.success())
    }

    /// Mount a filesystem
    pub async fn mount_filesystem(device: &Path, mount_point: &Path) -> Result<()> {
        debug!("Mounting {} on {}", device.display(), mount_point.display());
        run("mount", [device.as_os_str(), mount_point.as_os_str()]).await
    }

    /// Unmount a filesystem
    pub async fn unmount_filesystem(mount_point: &Path, mode: UnmountMode) -> Result<()> {
        debug!("Unmounting {} ({:?})", mount_point.display(), mode);

        let mut args = vec![];
        if let Some(flag) = mode.flag() {
            args.push(OsStr::new(flag));
        }
        args.push(mount_point.as_os_str());

        run("umount", args).await
    }

    /// Remove every filesystem and partition table signature from `device`
    pub async fn wipe_signatures(device: &Path) -> Result<()> {
        info!("Wiping signatures on {}", device.display());
        run("wipefs", [OsStr::new("--all"), OsStr::new("--force"), device.as_os_str()]).await?;
        run("sgdisk", [OsStr::new("--zap-all"), device.as_os_str()]).await
    }

    /// Create a GPT partition
    ///
    /// `end` uses `sgdisk` syntax: `+132M` for a size, `0` for the rest of the disk.
    pub async fn create_partition(device: &Path, spec: &PartitionSpec<'_>) -> Result<()> {
        info!(
            "Creating partition {} ({}) on {}",
            spec.number,
            spec.name,
            device.display()
        );

        let n = spec.number;
        let options = [
            format!("--new={n}:0:{}", spec.end),
            format!("--typecode={n}:{}", spec.type_code),
            format!("--change-name={n}:{}", spec.name),
        ];
        let mut args: Vec<&OsStr> = options.iter().map(OsStr::new).collect();
        args.push(device.as_os_str());

        run("sgdisk", args).await
    }

    /// Ask the kernel to re-read the partition table and wait for udev
    ///
    /// Both tools are optional on minimal hosts, so failures are only logged.
    pub async fn reread_partition_table(device: &Path) {
        if let Err(e) = run("partprobe", [device.as_os_str()]).await {
            debug!("partprobe {}: {:#}", device.display(), e);
        }
        if let Err(e) = run("udevadm", ["settle"]).await {
            debug!("udevadm settle: {:#}", e);
        }
    }

    /// Format a partition with a filesystem
    pub async fn format_partition(
        device: &Path,
        filesystem: FilesystemType,
        label: &str,
    ) -> Result<()> {
        info!("Formatting {} with {}", device.display(), filesystem);

        let (cmd, args): (&str, Vec<&OsStr>) = match filesystem {
            FilesystemType::Fat32 => (
                "mkfs.vfat",
                vec![
                    OsStr::new("-F"),
                    OsStr::new("32"),
                    OsStr::new("-n"),
                    OsStr::new(label),
                    device.as_os_str(),
                ],
            ),
            FilesystemType::Btrfs => (
                "mkfs.btrfs",
                vec![
                    OsStr::new("-f"),
                    OsStr::new("-L"),
                    OsStr::new(label),
                    device.as_os_str(),
                ],
            ),
        };

        run(cmd, args).await
    }
}

/// Path of partition `number` on `device`
///
/// Kernel naming appends a `p` separator when the disk name ends in a digit
/// (`/dev/nvme0n1p1`, `/dev/mmcblk0p1`, `/dev/loop0p1`).
pub fn partition_path(device: &Path, number: u32) -> PathBuf {
    let raw = device.to_string_lossy();
    if raw.ends_with(|c: char| c.is_ascii_digit()) {
        PathBuf::from(format!("{raw}p{number}"))
    } else {
        PathBuf::from(format!("{raw}{number}"))
    }
}

async fn run<I, S>(cmd: &str, args: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_output(cmd, args).await.map(|_| ())
}

async fn run_output<I, S>(cmd: &str, args: I) -> Result<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut command = tokio::process::Command::new(cmd);
    command.args(args).kill_on_drop(true);
    debug!("Running {:?}", command.as_std());

    let output = command
        .output()
        .await
        .with_context(|| format!("Failed to execute {} command", cmd))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "{} command failed ({}): {}",
            cmd,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8(output.stdout).with_context(|| format!("Failed to parse {} output as UTF-8", cmd))
}

/// Block device information as reported by lsblk
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDevice {
    pub name: String,
    pub path: Option<PathBuf>,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub device_type: Option<String>,
    pub mountpoint: Option<String>,
    pub children: Option<Vec<BlockDevice>>,
}

impl BlockDevice {
    /// Device node of this entry
    pub fn device_path(&self) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from("/dev").join(&self.name))
    }

    /// Whether the filesystem label matches `label` exactly
    pub fn has_label(&self, label: &str) -> bool {
        self.label.as_deref() == Some(label)
    }
}

/// lsblk command output structure
#[derive(Debug, Deserialize)]
struct LsblkOutput {
    blockdevices: Vec<BlockDevice>,
}

/// Mount information
#[derive(Debug, Clone, Deserialize)]
pub struct MountInfo {
    pub source: Option<String>,
    pub target: String,
    pub fstype: String,
    pub options: String,
}

/// findmnt command output structure
#[derive(Debug, Deserialize)]
struct FindmntOutput {
    filesystems: Vec<MountInfo>,
}

/// How hard to try when unmounting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmountMode {
    Normal,
    Force,
    /// Detach now, clean up once the filesystem is no longer busy
    Lazy,
}

impl UnmountMode {
    pub fn flag(&self) -> Option<&'static str> {
        match self {
            UnmountMode::Normal => None,
            UnmountMode::Force => Some("-f"),
            UnmountMode::Lazy => Some("-l"),
        }
    }
}

/// One GPT partition to create
#[derive(Debug, Clone)]
pub struct PartitionSpec<'a> {
    pub number: u32,
    pub end: &'a str,
    pub type_code: &'a str,
    pub name: &'a str,
}

/// Supported filesystem types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilesystemType {
    Fat32,
    Btrfs,
}

impl std::fmt::Display for FilesystemType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilesystemType::Fat32 => write!(f, "fat32"),
            FilesystemType::Btrfs => write!(f, "btrfs"),
        }
    }
}
