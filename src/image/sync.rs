// file: src/image/sync.rs
// version: 1.0.0
// guid: 3548c4d8-f4d4-4c9d-b313-b66c7f90317a

//! Delta reconstruction engine

use anyhow::{Context, Result};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// Rebuilds an image from a remote control file, optionally seeded with a
/// local file whose matching blocks need not be downloaded.
///
/// Implementations write only to `output`; the seed must be left untouched.
#[allow(async_fn_in_trait)]
pub trait SyncEngine {
    async fn reconstruct(&self, locator: &str, seed: Option<&Path>, output: &Path) -> Result<()>;
}

/// [`SyncEngine`] backed by the `zsync` client
#[derive(Debug, Clone)]
pub struct ZsyncEngine {
    binary: String,
}

impl ZsyncEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }
}

impl SyncEngine for ZsyncEngine {
    async fn reconstruct(&self, locator: &str, seed: Option<&Path>, output: &Path) -> Result<()> {
        let mut command = Command::new(&self.binary);
        if let Some(seed) = seed {
            command.arg("-i").arg(seed);
        }
        command.arg("-o").arg(output).arg(locator);

        // zsync keeps its scratch files next to the output.
        if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
            command.current_dir(dir);
        }

        command
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        debug!("Running {:?}", command.as_std());

        let status = command
            .status()
            .await
            .with_context(|| format!("Failed to execute {}", self.binary))?;

        if !status.success() {
            anyhow::bail!("{} exited with {} for {}", self.binary, status, locator);
        }
        Ok(())
    }
}
