// file: src/utils/system.rs
// version: 1.0.0
// guid: dd44f8ef-58ee-4f9b-bfd7-175dbc62cc1a

//! System utility functions

use crate::error::ZnxError;
use crate::Result;
use std::path::PathBuf;
use tracing::debug;

/// System utility functions
pub struct SystemUtils;

impl SystemUtils {
    /// Check if a command exists in PATH (or as a path)
    pub fn command_exists(command: &str) -> bool {
        which::which(command).is_ok()
    }

    /// Check if running with an effective UID of root
    pub fn is_root() -> bool {
        #[cfg(unix)]
        {
            // SAFETY: geteuid has no preconditions and cannot fail.
            unsafe { libc::geteuid() == 0 }
        }
        #[cfg(not(unix))]
        {
            false
        }
    }

    /// Fail with a privilege error unless running as root
    pub fn require_root() -> Result<()> {
        if Self::is_root() {
            Ok(())
        } else {
            Err(ZnxError::privilege(
                "this command mounts and formats block devices and must run as root",
            ))
        }
    }

    /// Names from `required` that cannot be found
    pub fn check_prerequisites(required: &[&str]) -> Vec<String> {
        required
            .iter()
            .filter(|cmd| !Self::command_exists(cmd))
            .map(|cmd| cmd.to_string())
            .collect()
    }

    /// Fail with a usage error naming every missing program in `required`
    pub fn require_commands(required: &[&str]) -> Result<()> {
        let missing = Self::check_prerequisites(required);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ZnxError::usage(format!(
                "missing required commands: {}",
                missing.join(", ")
            )))
        }
    }

    /// Create a process-private temporary directory that outlives this call
    ///
    /// The caller owns removal. It must never be removed recursively while a
    /// filesystem may still be mounted on it.
    pub fn create_temp_dir(prefix: &str) -> Result<PathBuf> {
        let temp_dir = tempfile::Builder::new()
            .prefix(prefix)
            .tempdir()
            .map_err(ZnxError::Io)?;

        let path = temp_dir.path().to_owned();
        std::mem::forget(temp_dir); // Don't delete on drop
        debug!("Created temporary directory: {}", path.display());
        Ok(path)
    }
}
