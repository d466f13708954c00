// file: src/image/repository.rs
// version: 1.0.0
// guid: 9637876e-cfd8-4ced-9e0c-f6cbe9b64c4d

//! The `boot_images` tree on a mounted data volume

use super::{ImageName, ImageSlot};
use crate::config::IMAGES_DIR;
use crate::error::ZnxError;
use crate::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;
use walkdir::WalkDir;

/// Slot directories rooted at `<volume>/boot_images`
#[derive(Debug, Clone)]
pub struct ImageRepository {
    root: PathBuf,
}

impl ImageRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Repository of a data volume mounted at `mount_dir`
    pub fn on_volume(mount_dir: &Path) -> Self {
        Self::new(mount_dir.join(IMAGES_DIR))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Handle on a slot without checking that it exists
    pub fn slot(&self, name: &ImageName) -> ImageSlot {
        ImageSlot::new(&self.root, name.clone())
    }

    pub async fn exists(&self, name: &ImageName) -> Result<bool> {
        match fs::metadata(self.slot(name).dir()).await {
            Ok(metadata) => Ok(metadata.is_dir()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Create an empty slot directory.
    pub async fn create(&self, name: &ImageName) -> Result<ImageSlot> {
        let slot = self.slot(name);
        if let Some(vendor_dir) = slot.dir().parent() {
            fs::create_dir_all(vendor_dir).await?;
        }

        match fs::create_dir(slot.dir()).await {
            Ok(()) => {
                debug!("Created slot {}", slot.dir().display());
                Ok(slot)
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                Err(ZnxError::AlreadyDeployed(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Open an existing slot directory.
    pub async fn open(&self, name: &ImageName) -> Result<ImageSlot> {
        if !self.exists(name).await? {
            return Err(ZnxError::NotDeployed(name.to_string()));
        }
        Ok(self.slot(name))
    }

    /// Delete a slot directory and every generation in it.
    pub async fn delete(&self, name: &ImageName) -> Result<()> {
        let slot = self.open(name).await?;
        fs::remove_dir_all(slot.dir()).await?;
        debug!("Deleted slot {}", slot.dir().display());
        Ok(())
    }

    /// Deployed image names in name order.
    ///
    /// The listing reads the directory tree lazily and can be iterated any
    /// number of times.
    pub fn list(&self) -> ImageList {
        ImageList {
            root: self.root.clone(),
        }
    }
}

/// Restartable listing of the slots in a repository
#[derive(Debug, Clone)]
pub struct ImageList {
    root: PathBuf,
}

impl ImageList {
    pub fn iter(&self) -> Images {
        let inner = self.root.is_dir().then(|| {
            WalkDir::new(&self.root)
                .min_depth(2)
                .max_depth(2)
                .sort_by_file_name()
                .into_iter()
        });
        Images { inner }
    }
}

impl<'a> IntoIterator for &'a ImageList {
    type Item = Result<ImageName>;
    type IntoIter = Images;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the slot directories of a repository
pub struct Images {
    inner: Option<walkdir::IntoIter>,
}

impl Iterator for Images {
    type Item = Result<ImageName>;

    fn next(&mut self) -> Option<Self::Item> {
        let inner = self.inner.as_mut()?;
        loop {
            let entry = match inner.next()? {
                Ok(entry) => entry,
                Err(e) => return Some(Err(ZnxError::Io(e.into()))),
            };
            if !entry.file_type().is_dir() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            let vendor = entry
                .path()
                .parent()
                .and_then(Path::file_name)
                .map(|v| v.to_string_lossy())
                .unwrap_or_default();

            match ImageName::new(&vendor, &name) {
                Ok(image) => return Some(Ok(image)),
                Err(_) => debug!("Skipping foreign directory {}", entry.path().display()),
            }
        }
    }
}
