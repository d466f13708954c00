// file: src/network/mod.rs
// version: 1.0.0
// guid: 7a3e635b-9834-419c-8e32-26c2f50f93a2

//! Network transports

pub mod download;

pub use download::NetworkDownloader;
