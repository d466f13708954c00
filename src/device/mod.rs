// file: src/device/mod.rs
// version: 1.0.0
// guid: 0dfa4b30-1b33-4142-a7cb-cd249a129762

//! Device-level operations

pub mod initializer;

pub use initializer::{DeviceInitializer, INIT_COMMANDS};
