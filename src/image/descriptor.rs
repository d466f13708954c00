// file: src/image/descriptor.rs
// version: 1.0.0
// guid: 66241bfd-ca6c-4434-983c-ea98cc9e8689

//! Update descriptor embedded in authored images
//!
//! Image authors write the update URL into a fixed window of the image file.
//! znx only ever reads it.

use crate::config::{DESCRIPTOR_LEN, DESCRIPTOR_OFFSET};
use crate::Result;
use std::io::SeekFrom;
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Read the update locator from `image`.
///
/// Returns `None` when the window is blank or lies past the end of the file.
pub async fn read_update_locator(image: &Path) -> Result<Option<String>> {
    let mut file = File::open(image).await?;
    let len = file.metadata().await?.len();
    if len <= DESCRIPTOR_OFFSET {
        return Ok(None);
    }

    file.seek(SeekFrom::Start(DESCRIPTOR_OFFSET)).await?;
    let mut window = Vec::with_capacity(DESCRIPTOR_LEN);
    file.take(DESCRIPTOR_LEN as u64).read_to_end(&mut window).await?;

    Ok(parse_locator(&window))
}

/// Extract the locator from a raw descriptor window
///
/// The value ends at the first NUL; surrounding whitespace is ignored.
pub fn parse_locator(window: &[u8]) -> Option<String> {
    let end = window.iter().position(|&b| b == 0).unwrap_or(window.len());
    let locator = String::from_utf8_lossy(&window[..end]).trim().to_string();
    (!locator.is_empty()).then_some(locator)
}
