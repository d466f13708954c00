// file: src/logging/mod.rs
// version: 1.0.0
// guid: 55833bf5-616b-4a7d-8a00-da1bc7cee5b8

//! Logging system for znx

pub mod logger;

pub use logger::{init_logger, with_async_operation_span};
