// file: src/image/mod.rs
// version: 1.0.0
// guid: b905925f-b218-4ade-a729-368f1c992d4a

//! Image slots on a znx data volume
//!
//! This module handles:
//! - Image name validation
//! - Slot directories and their active/backup generations
//! - Reading the update descriptor embedded in images
//! - Fetching and delta-reconstructing image files

pub mod descriptor;
pub mod fetch;
pub mod name;
pub mod repository;
pub mod slot;
pub mod sync;

pub use fetch::{SourceFetcher, Transport};
pub use name::ImageName;
pub use repository::{ImageList, ImageRepository};
pub use slot::{ImageSlot, SlotState};
pub use sync::{SyncEngine, ZsyncEngine};
