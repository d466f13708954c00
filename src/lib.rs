// file: src/lib.rs
// version: 3.0.0
// guid: d82472d1-7f0f-4eb4-b0a3-6e1547103eb4

//! # znx
//!
//! Manages bootable images on a dedicated storage device. A device carries a
//! FAT32 boot volume and a Btrfs data volume; every deployed image lives in
//! its own slot on the data volume with an active generation and, after an
//! update, one backup generation to revert to.

pub mod cli;
pub mod config;
pub mod device;
pub mod error;
pub mod image;
pub mod lifecycle;
pub mod logging;
pub mod mount;
pub mod network;
pub mod utils;

pub use error::{Result, ZnxError};

/// Version information for znx
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
