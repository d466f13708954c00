// file: src/image/slot.rs
// version: 1.0.0
// guid: 899a72fa-992f-47ae-8ffe-c1ebe5ebd5da

//! Per-image generation files
//!
//! A slot directory holds at most two generations: the active image and the
//! backup kept from before the last update. All transitions are renames
//! within the slot directory, so each one is atomic on the data volume.

use super::ImageName;
use crate::config::{ACTIVE_FILE, BACKUP_SUFFIX, STAGING_SUFFIX};
use crate::error::ZnxError;
use crate::Result;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Observable state of a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// No slot directory
    Absent,
    /// Directory without an active generation (only seen mid-deploy)
    Empty,
    /// Active generation only
    SingleGen,
    /// Active and backup generations
    DualGen,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SlotState::Absent => "absent",
            SlotState::Empty => "empty",
            SlotState::SingleGen => "single generation",
            SlotState::DualGen => "active + backup",
        };
        f.write_str(s)
    }
}

/// Handle on one image's slot directory
#[derive(Debug, Clone)]
pub struct ImageSlot {
    name: ImageName,
    dir: PathBuf,
}

impl ImageSlot {
    pub(crate) fn new(root: &Path, name: ImageName) -> Self {
        let dir = root.join(name.relative_path());
        Self { name, dir }
    }

    pub fn name(&self) -> &ImageName {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn active_path(&self) -> PathBuf {
        self.dir.join(ACTIVE_FILE)
    }

    pub fn backup_path(&self) -> PathBuf {
        self.dir.join(format!("{ACTIVE_FILE}{BACKUP_SUFFIX}"))
    }

    /// Where an update reconstructs the next active generation
    pub fn staging_path(&self) -> PathBuf {
        self.dir.join(format!("{ACTIVE_FILE}{STAGING_SUFFIX}"))
    }

    pub async fn state(&self) -> Result<SlotState> {
        if !is_dir(&self.dir).await? {
            return Ok(SlotState::Absent);
        }
        let state = match (self.has_active().await?, self.has_backup().await?) {
            (false, _) => SlotState::Empty,
            (true, false) => SlotState::SingleGen,
            (true, true) => SlotState::DualGen,
        };
        Ok(state)
    }

    pub async fn has_active(&self) -> Result<bool> {
        is_file(&self.active_path()).await
    }

    pub async fn has_backup(&self) -> Result<bool> {
        is_file(&self.backup_path()).await
    }

    /// Remove a staging file left behind by an interrupted update, along
    /// with the engine's `.part` scratch file for it
    pub async fn discard_staging(&self) -> Result<()> {
        let staging = self.staging_path();
        remove_if_present(&staging).await?;

        let mut scratch = staging.into_os_string();
        scratch.push(".part");
        remove_if_present(Path::new(&scratch)).await?;
        Ok(())
    }

    /// Make `staged` the active generation, keeping the old active as backup.
    ///
    /// Returns `true` when an older backup was overwritten. A missing
    /// `staged` file is rejected before any rename, so both existing
    /// generations stay intact. If the second rename still fails, the old
    /// active generation is moved back into place but an older backup is
    /// already gone.
    pub async fn promote(&self, staged: &Path) -> Result<bool> {
        if !is_file(staged).await? {
            return Err(ZnxError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("staged image {} does not exist", staged.display()),
            )));
        }

        let discarded = self.has_backup().await?;
        if discarded {
            warn!(
                "Discarding previous backup generation of {}",
                self.name
            );
        }

        fs::rename(self.active_path(), self.backup_path()).await?;

        if let Err(e) = fs::rename(staged, self.active_path()).await {
            if let Err(restore) = fs::rename(self.backup_path(), self.active_path()).await {
                warn!(
                    "Could not restore active generation of {}: {}",
                    self.name, restore
                );
            }
            return Err(e.into());
        }

        debug!("Promoted {} to active in {}", staged.display(), self.dir.display());
        Ok(discarded)
    }

    /// Replace the active generation with the backup.
    pub async fn revert(&self) -> Result<()> {
        if !self.has_backup().await? {
            return Err(ZnxError::RevertFailed(self.name.to_string()));
        }

        fs::rename(self.backup_path(), self.active_path()).await?;
        Ok(())
    }

    /// Delete the backup generation. Returns whether one existed.
    pub async fn clean(&self) -> Result<bool> {
        remove_if_present(&self.backup_path()).await
    }
}

async fn is_dir(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_dir()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn is_file(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(metadata) => Ok(metadata.is_file()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}

async fn remove_if_present(path: &Path) -> Result<bool> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e.into()),
    }
}
