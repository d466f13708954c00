// file: src/lifecycle/mod.rs
// version: 1.0.0
// guid: 2b7d4e90-6a15-4f3c-8d21-c4e9a0b5f718

//! Lifecycle controller
//!
//! Checks a command's preconditions, mounts the data volume, applies the
//! slot transition and unmounts again whatever the transition's result.

pub mod command;
pub mod context;

pub use command::{Command, Outcome};
pub use context::Context;

use crate::config::Config;
use crate::device::{DeviceInitializer, INIT_COMMANDS};
use crate::error::ZnxError;
use crate::image::descriptor::read_update_locator;
use crate::image::{ImageName, ImageRepository, SourceFetcher, SyncEngine, Transport, ZsyncEngine};
use crate::mount::MountGuard;
use crate::network::NetworkDownloader;
use crate::utils::{DiskUtils, SystemUtils};
use crate::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Programs every command that mounts the data volume relies on
pub const MOUNT_COMMANDS: [&str; 4] = ["mount", "umount", "findmnt", "lsblk"];

/// Runs znx commands against a device
pub struct Controller<E = ZsyncEngine> {
    config: Config,
    transport: Transport<E>,
}

impl Controller<ZsyncEngine> {
    /// Controller using the configured zsync client
    pub fn new(config: Config) -> Result<Self> {
        let engine = ZsyncEngine::new(config.zsync_binary.clone());
        Self::with_engine(config, engine)
    }
}

impl<E: SyncEngine> Controller<E> {
    pub fn with_engine(config: Config, engine: E) -> Result<Self> {
        let timeout = config.download_timeout_secs.map(Duration::from_secs);
        let downloader = NetworkDownloader::new(timeout)
            .map_err(|e| ZnxError::config(format!("{:#}", e)))?;

        Ok(Self {
            config,
            transport: Transport { engine, downloader },
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Check preconditions and run `command` on its device.
    ///
    /// The data volume is unmounted before this returns, also when the
    /// command fails.
    pub async fn run(&self, command: &Command) -> Result<Outcome> {
        self.preflight(command).await?;

        if let Command::Init { device } = command {
            DeviceInitializer::new(&self.config).init(device).await?;
            return Ok(Outcome::Initialized(device.clone()));
        }

        let ctx = Context::new(command.device());
        let guard = MountGuard::acquire(ctx.device(), &self.config).await?;
        let result = match ctx.bind_mount(guard.path()).and_then(|()| ctx.repository()) {
            Ok(repo) => self.apply(command, &repo).await,
            Err(e) => Err(e),
        };

        guard.finish(result).await
    }

    /// Apply a slot command to an already mounted repository
    pub async fn apply(&self, command: &Command, repo: &ImageRepository) -> Result<Outcome> {
        match command {
            Command::Init { .. } => Err(ZnxError::usage(
                "init operates on the whole device, not on a mounted volume",
            )),
            Command::Deploy { image, source, .. } => self.deploy(repo, image, source).await,
            Command::Update { image, .. } => self.update(repo, image).await,
            Command::Revert { image, .. } => {
                repo.open(image).await?.revert().await?;
                Ok(Outcome::Reverted(image.clone()))
            }
            Command::Clean { image, .. } => {
                let removed = repo.open(image).await?.clean().await?;
                Ok(Outcome::Cleaned {
                    image: image.clone(),
                    removed,
                })
            }
            Command::Remove { image, .. } => {
                repo.delete(image).await?;
                Ok(Outcome::Removed(image.clone()))
            }
            Command::List { .. } => {
                let images = repo.list().iter().collect::<Result<Vec<_>>>()?;
                Ok(Outcome::Listed(images))
            }
        }
    }

    async fn preflight(&self, command: &Command) -> Result<()> {
        let device = command.device();
        let is_block = DiskUtils::is_block_device(device)
            .await
            .map_err(|e| ZnxError::usage(format!("{:#}", e)))?;
        if !is_block {
            return Err(ZnxError::NotBlockDevice(device.to_path_buf()));
        }

        SystemUtils::require_root()?;
        SystemUtils::require_commands(&self.required_commands(command))
    }

    /// External programs `command` will run
    pub fn required_commands(&self, command: &Command) -> Vec<&str> {
        let mut required: Vec<&str> = MOUNT_COMMANDS.to_vec();
        match command {
            Command::Init { .. } => required.extend(INIT_COMMANDS),
            Command::Update { .. } => required.push(&self.config.zsync_binary),
            Command::Deploy { source, .. }
                if matches!(SourceFetcher::classify(source), Ok(f) if f.uses_sync_engine()) =>
            {
                required.push(&self.config.zsync_binary)
            }
            _ => {}
        }
        required
    }

    async fn deploy(&self, repo: &ImageRepository, image: &ImageName, source: &str) -> Result<Outcome> {
        let fetcher = SourceFetcher::classify(source)?;
        info!("Deploying {} from {}", image, fetcher);

        let slot = repo.create(image).await?;
        let mut pending = PendingSlot::new(slot.dir());

        if let Err(e) = fetcher.fetch(&slot.active_path(), &self.transport).await {
            if let Err(cleanup) = repo.delete(image).await {
                warn!("Could not remove partial slot {}: {}", slot.dir().display(), cleanup);
            } else {
                pending.disarm();
            }
            return Err(ZnxError::deploy_failed(image, format!("{:#}", e)));
        }

        pending.disarm();
        Ok(Outcome::Deployed(image.clone()))
    }

    async fn update(&self, repo: &ImageRepository, image: &ImageName) -> Result<Outcome> {
        let slot = repo.open(image).await?;
        if !slot.has_active().await? {
            return Err(ZnxError::NotDeployed(image.to_string()));
        }

        let active = slot.active_path();
        let locator = read_update_locator(&active)
            .await?
            .ok_or_else(|| ZnxError::MissingUpdateInfo(image.to_string()))?;
        info!("Updating {} from {}", image, locator);

        slot.discard_staging().await?;
        let staging = slot.staging_path();
        if let Err(e) = self
            .transport
            .engine
            .reconstruct(&locator, Some(&active), &staging)
            .await
        {
            if let Err(cleanup) = slot.discard_staging().await {
                warn!("Could not remove {}: {}", staging.display(), cleanup);
            }
            return Err(ZnxError::update_failed(image, format!("{:#}", e)));
        }

        let backup_replaced = slot.promote(&staging).await?;
        debug!("{} now in state {}", image, slot.state().await?);
        Ok(Outcome::Updated {
            image: image.clone(),
            backup_replaced,
        })
    }
}

/// Slot directory created by a deploy that has not finished yet.
///
/// Dropping it while armed removes the directory, so an interrupted deploy
/// does not leave a slot without an active generation behind.
struct PendingSlot {
    dir: PathBuf,
    armed: bool,
}

impl PendingSlot {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingSlot {
    fn drop(&mut self) {
        if self.armed {
            if let Err(e) = std::fs::remove_dir_all(&self.dir) {
                error!("Could not remove partial slot {}: {}", self.dir.display(), e);
            }
        }
    }
}
