// file: src/image/fetch.rs
// version: 1.0.0
// guid: 1c4c4b94-519e-4536-bd78-e6d1f7e39535

//! Strategies for producing the first active generation of a slot

use super::sync::SyncEngine;
use crate::error::ZnxError;
use crate::network::NetworkDownloader;
use anyhow::{Context, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

const REMOTE_SCHEMES: [&str; 2] = ["http", "https"];
const ZSYNC_SUFFIX: &str = ".zsync";

/// The collaborators a fetch may need
pub struct Transport<E> {
    pub engine: E,
    pub downloader: NetworkDownloader,
}

/// How a deploy source is turned into an image file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFetcher {
    /// Copy a file from the host filesystem
    LocalCopy(PathBuf),
    /// Reconstruct through the sync engine from a `.zsync` control file
    IncrementalFetch(Url),
    /// Plain download of the whole image
    WholeFileDownload(Url),
}

impl SourceFetcher {
    /// Pick a strategy from the shape of `source` alone.
    ///
    /// `file://` URLs are converted to their path. Other URLs with a host
    /// must be http or https; anything else is a host path.
    pub fn classify(source: &str) -> std::result::Result<Self, ZnxError> {
        let fetcher = match Url::parse(source) {
            Ok(url) if REMOTE_SCHEMES.contains(&url.scheme()) => {
                if url.path().ends_with(ZSYNC_SUFFIX) {
                    SourceFetcher::IncrementalFetch(url)
                } else {
                    SourceFetcher::WholeFileDownload(url)
                }
            }
            Ok(url) if url.scheme() == "file" => match url.to_file_path() {
                Ok(path) => SourceFetcher::LocalCopy(path),
                Err(()) => SourceFetcher::LocalCopy(PathBuf::from(source)),
            },
            Ok(url) if url.has_host() => {
                return Err(ZnxError::usage(format!(
                    "unsupported source scheme {}: only http and https URLs can be fetched",
                    url.scheme()
                )))
            }
            _ => SourceFetcher::LocalCopy(PathBuf::from(source)),
        };
        Ok(fetcher)
    }

    /// Whether this strategy runs the sync engine
    pub fn uses_sync_engine(&self) -> bool {
        matches!(self, SourceFetcher::IncrementalFetch(_))
    }

    /// Write the image to `destination`.
    ///
    /// On failure `destination` may hold partial data; the caller owns
    /// cleanup of the slot.
    pub async fn fetch<E: SyncEngine>(&self, destination: &Path, transport: &Transport<E>) -> Result<()> {
        match self {
            SourceFetcher::LocalCopy(source) => {
                let metadata = tokio::fs::metadata(source)
                    .await
                    .with_context(|| format!("Source {} is not accessible", source.display()))?;
                if !metadata.is_file() {
                    anyhow::bail!("Source {} is not a regular file", source.display());
                }
                tokio::fs::copy(source, destination).await.with_context(|| {
                    format!(
                        "Failed to copy {} to {}",
                        source.display(),
                        destination.display()
                    )
                })?;
                Ok(())
            }
            SourceFetcher::IncrementalFetch(url) => {
                transport
                    .engine
                    .reconstruct(url.as_str(), None, destination)
                    .await
            }
            SourceFetcher::WholeFileDownload(url) => {
                transport
                    .downloader
                    .download_with_progress(url.as_str(), destination)
                    .await
            }
        }
    }
}

impl fmt::Display for SourceFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceFetcher::LocalCopy(path) => write!(f, "local file {}", path.display()),
            SourceFetcher::IncrementalFetch(url) => write!(f, "zsync {}", url),
            SourceFetcher::WholeFileDownload(url) => write!(f, "download {}", url),
        }
    }
}
