// file: src/utils/mod.rs
// version: 1.0.0
// guid: bf135914-5910-4442-a361-8bae0fcc1cc4

//! Utility modules for system operations

pub mod disk;
pub mod system;

pub use disk::DiskUtils;
pub use system::SystemUtils;
