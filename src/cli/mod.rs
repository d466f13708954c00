// file: src/cli/mod.rs
// version: 2.0.0
// guid: 0a6f3e21-9b7c-4d85-b1e4-c27d58a90f36

//! Command line interface for znx

pub mod args;
pub mod commands;

pub use args::{Cli, Commands};
pub use commands::{execute, report};
