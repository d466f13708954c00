// file: tests/lifecycle.rs
// version: 1.0.0
// guid: 6e2f90a4-3b7c-4d18-a5e6-f0c41b8d2937

//! Slot lifecycle driven through the controller on a plain directory

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use znx::config::{Config, DESCRIPTOR_OFFSET};
use znx::image::{ImageName, ImageRepository, SlotState, SyncEngine};
use znx::lifecycle::{Command, Controller, Outcome};
use znx::ZnxError;

const LOCATOR: &str = "https://mirror.test/nitrux/nx.iso.zsync";

/// Sync engine that derives the new image from the seed without any network
struct FakeEngine {
    fail: bool,
}

impl SyncEngine for FakeEngine {
    async fn reconstruct(&self, locator: &str, seed: Option<&Path>, output: &Path) -> anyhow::Result<()> {
        if self.fail {
            tokio::fs::write(output, b"partial").await?;
            anyhow::bail!("could not fetch {}", locator);
        }
        let mut content = match seed {
            Some(seed) => tokio::fs::read(seed).await?,
            None => image_with_locator(b"fresh"),
        };
        content.extend_from_slice(b"+next");
        tokio::fs::write(output, content).await?;
        Ok(())
    }
}

struct Fixture {
    _temp_dir: TempDir,
    volume: PathBuf,
    repo: ImageRepository,
    controller: Controller<FakeEngine>,
}

impl Fixture {
    fn new() -> Self {
        Self::with_engine(FakeEngine { fail: false })
    }

    fn with_engine(engine: FakeEngine) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let volume = temp_dir.path().join("volume");
        std::fs::create_dir_all(volume.join("boot_images")).unwrap();
        let repo = ImageRepository::on_volume(&volume);
        let controller = Controller::with_engine(Config::default(), engine).unwrap();
        Self {
            _temp_dir: temp_dir,
            volume,
            repo,
            controller,
        }
    }

    fn source(&self, name: &str, content: &[u8]) -> String {
        let path = self.volume.parent().unwrap().join(name);
        std::fs::write(&path, content).unwrap();
        path.to_string_lossy().into_owned()
    }

    async fn run(&self, command: Command) -> znx::Result<Outcome> {
        self.controller.apply(&command, &self.repo).await
    }

    async fn deploy(&self, image: &ImageName, source: String) -> znx::Result<Outcome> {
        self.run(Command::Deploy {
            device: device(),
            image: image.clone(),
            source,
        })
        .await
    }

    async fn update(&self, image: &ImageName) -> znx::Result<Outcome> {
        self.run(Command::Update {
            device: device(),
            image: image.clone(),
        })
        .await
    }

    async fn revert(&self, image: &ImageName) -> znx::Result<Outcome> {
        self.run(Command::Revert {
            device: device(),
            image: image.clone(),
        })
        .await
    }

    async fn clean(&self, image: &ImageName) -> znx::Result<Outcome> {
        self.run(Command::Clean {
            device: device(),
            image: image.clone(),
        })
        .await
    }

    async fn state(&self, image: &ImageName) -> SlotState {
        self.repo.slot(image).state().await.unwrap()
    }

    fn active(&self, image: &ImageName) -> Vec<u8> {
        std::fs::read(self.repo.slot(image).active_path()).unwrap()
    }

    fn backup(&self, image: &ImageName) -> Vec<u8> {
        std::fs::read(self.repo.slot(image).backup_path()).unwrap()
    }
}

fn device() -> PathBuf {
    PathBuf::from("/dev/znx-test")
}

fn name(s: &str) -> ImageName {
    s.parse().unwrap()
}

fn image_with_locator(tag: &[u8]) -> Vec<u8> {
    let mut content = vec![0u8; DESCRIPTOR_OFFSET as usize + 1024];
    content[..tag.len()].copy_from_slice(tag);
    let start = DESCRIPTOR_OFFSET as usize;
    content[start..start + LOCATOR.len()].copy_from_slice(LOCATOR.as_bytes());
    content
}

#[tokio::test]
async fn test_deploy_local_file_is_byte_identical() {
    let fx = Fixture::new();
    let image = name("nitrux/nx-desktop");
    let content = image_with_locator(b"v1");

    let outcome = fx.deploy(&image, fx.source("nx.iso", &content)).await.unwrap();

    assert_eq!(outcome, Outcome::Deployed(image.clone()));
    assert_eq!(fx.active(&image), content);
    assert_eq!(fx.state(&image).await, SlotState::SingleGen);
}

#[tokio::test]
async fn test_second_deploy_fails_and_keeps_first() {
    let fx = Fixture::new();
    let image = name("nitrux/nx");
    let first = image_with_locator(b"first");
    fx.deploy(&image, fx.source("first.iso", &first)).await.unwrap();

    let result = fx.deploy(&image, fx.source("second.iso", b"second")).await;

    assert!(matches!(result, Err(ZnxError::AlreadyDeployed(_))));
    assert_eq!(fx.active(&image), first);
}

#[tokio::test]
async fn test_failed_deploy_leaves_no_slot() {
    let fx = Fixture::new();
    let image = name("nitrux/nx");
    let missing = fx.volume.join("absent.iso").to_string_lossy().into_owned();

    let result = fx.deploy(&image, missing).await;

    assert!(matches!(result, Err(ZnxError::DeployFailed { .. })));
    assert_eq!(fx.state(&image).await, SlotState::Absent);
    assert!(!fx.volume.join("boot_images/nitrux/nx").exists());
}

#[tokio::test]
async fn test_ftp_deploy_is_rejected_before_creating_slot() {
    let fx = Fixture::new();
    let image = name("nitrux/nx");

    let result = fx
        .deploy(&image, "ftp://mirror.test/nitrux/nx.iso".to_string())
        .await;

    assert!(matches!(result, Err(ZnxError::Usage(_))));
    assert_eq!(fx.state(&image).await, SlotState::Absent);
}

#[tokio::test]
async fn test_zsync_deploy_goes_through_engine() {
    let fx = Fixture::new();
    let image = name("nitrux/nx");

    fx.deploy(&image, LOCATOR.to_string()).await.unwrap();

    assert!(fx.active(&image).starts_with(b"fresh"));
    assert!(fx.active(&image).ends_with(b"+next"));
}

#[tokio::test]
async fn test_update_keeps_previous_active_as_backup() {
    let fx = Fixture::new();
    let image = name("nitrux/nx");
    let original = image_with_locator(b"v1");
    fx.deploy(&image, fx.source("nx.iso", &original)).await.unwrap();

    let outcome = fx.update(&image).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Updated {
            image: image.clone(),
            backup_replaced: false,
        }
    );
    assert_ne!(fx.active(&image), original);
    assert_eq!(fx.backup(&image), original);
    assert_eq!(fx.state(&image).await, SlotState::DualGen);
    assert!(!fx.repo.slot(&image).staging_path().exists());
}

#[tokio::test]
async fn test_update_from_dual_gen_replaces_backup() {
    let fx = Fixture::new();
    let image = name("nitrux/nx");
    fx.deploy(&image, fx.source("nx.iso", &image_with_locator(b"v1")))
        .await
        .unwrap();
    fx.update(&image).await.unwrap();
    let second = fx.active(&image);

    let outcome = fx.update(&image).await.unwrap();

    assert!(matches!(
        outcome,
        Outcome::Updated {
            backup_replaced: true,
            ..
        }
    ));
    assert_eq!(fx.backup(&image), second);
    assert_eq!(fx.state(&image).await, SlotState::DualGen);
}

#[tokio::test]
async fn test_update_without_descriptor_fails() {
    let fx = Fixture::new();
    let image = name("nitrux/nx");
    fx.deploy(&image, fx.source("small.iso", b"too short for a descriptor"))
        .await
        .unwrap();

    let result = fx.update(&image).await;

    assert!(matches!(result, Err(ZnxError::MissingUpdateInfo(_))));
    assert_eq!(fx.active(&image), b"too short for a descriptor");
    assert_eq!(fx.state(&image).await, SlotState::SingleGen);
}

#[tokio::test]
async fn test_failed_update_preserves_active() {
    let fx = Fixture::with_engine(FakeEngine { fail: true });
    let image = name("nitrux/nx");
    let original = image_with_locator(b"v1");
    fx.deploy(&image, fx.source("nx.iso", &original)).await.unwrap();

    let result = fx.update(&image).await;

    assert!(matches!(result, Err(ZnxError::UpdateFailed { .. })));
    assert_eq!(fx.active(&image), original);
    assert_eq!(fx.state(&image).await, SlotState::SingleGen);
    assert!(!fx.repo.slot(&image).staging_path().exists());
}

#[tokio::test]
async fn test_revert_twice_fails_the_second_time() {
    let fx = Fixture::new();
    let image = name("nitrux/nx");
    let original = image_with_locator(b"v1");
    fx.deploy(&image, fx.source("nx.iso", &original)).await.unwrap();
    fx.update(&image).await.unwrap();

    fx.revert(&image).await.unwrap();
    assert_eq!(fx.active(&image), original);
    assert_eq!(fx.state(&image).await, SlotState::SingleGen);

    let result = fx.revert(&image).await;
    assert!(matches!(result, Err(ZnxError::RevertFailed(_))));
    assert_eq!(fx.active(&image), original);
}

#[tokio::test]
async fn test_clean_is_idempotent() {
    let fx = Fixture::new();
    let image = name("nitrux/nx");
    fx.deploy(&image, fx.source("nx.iso", &image_with_locator(b"v1")))
        .await
        .unwrap();
    fx.update(&image).await.unwrap();
    let active = fx.active(&image);

    let first = fx.clean(&image).await.unwrap();
    let second = fx.clean(&image).await.unwrap();

    assert_eq!(
        first,
        Outcome::Cleaned {
            image: image.clone(),
            removed: true,
        }
    );
    assert_eq!(
        second,
        Outcome::Cleaned {
            image: image.clone(),
            removed: false,
        }
    );
    assert_eq!(fx.active(&image), active);
    assert_eq!(fx.state(&image).await, SlotState::SingleGen);
}

#[tokio::test]
async fn test_commands_after_remove_report_not_deployed() {
    let fx = Fixture::new();
    let image = name("nitrux/nx");
    fx.deploy(&image, fx.source("nx.iso", &image_with_locator(b"v1")))
        .await
        .unwrap();
    fx.update(&image).await.unwrap();

    let outcome = fx
        .run(Command::Remove {
            device: device(),
            image: image.clone(),
        })
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Removed(image.clone()));
    assert_eq!(fx.state(&image).await, SlotState::Absent);

    assert!(matches!(fx.update(&image).await, Err(ZnxError::NotDeployed(_))));
    assert!(matches!(fx.revert(&image).await, Err(ZnxError::NotDeployed(_))));
    assert!(matches!(fx.clean(&image).await, Err(ZnxError::NotDeployed(_))));
    assert!(matches!(
        fx.run(Command::Remove {
            device: device(),
            image: image.clone(),
        })
        .await,
        Err(ZnxError::NotDeployed(_))
    ));
}

#[tokio::test]
async fn test_list_is_sorted_and_skips_foreign_entries() {
    let fx = Fixture::new();
    for image in ["zeta/os", "acme/kiosk", "acme/desk"] {
        fx.deploy(&name(image), fx.source("img.iso", b"img"))
            .await
            .unwrap();
    }
    std::fs::create_dir_all(fx.volume.join("boot_images/bad vendor/os")).unwrap();
    std::fs::write(fx.volume.join("boot_images/acme/notes.txt"), b"x").unwrap();

    let outcome = fx.run(Command::List { device: device() }).await.unwrap();

    assert_eq!(
        outcome,
        Outcome::Listed(vec![name("acme/desk"), name("acme/kiosk"), name("zeta/os")])
    );
}

#[tokio::test]
async fn test_list_without_images_dir_is_empty() {
    let fx = Fixture::new();
    std::fs::remove_dir(fx.volume.join("boot_images")).unwrap();

    let outcome = fx.run(Command::List { device: device() }).await.unwrap();

    assert_eq!(outcome, Outcome::Listed(Vec::new()));
}
