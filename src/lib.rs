//! # stagehand - Uniform Access to Local and Remote Files
//!
//! Open, copy and delete files through one API whether they live on the local
//! filesystem or in a remote object store. Remote objects are localized into a
//! staging cache, handed to the caller as ordinary (transparently
//! decompressed) file handles, and written back when their content changed.
//!
//! ## Features
//!
//! - **Location Decomposition**: `s3://bucket/key` and bare local paths share one syntax
//! - **Staging Cache**: remote objects mirror their key hierarchy under a private root
//! - **Write-Back on Change**: content hashes decide whether an upload is needed
//! - **Session Pool**: a bounded set of reusable remote clients
//! - **Compression Support**: transparent gzip and zstd by file extension
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`location`] - Location parsing and path resolution
//! - [`pool`] - Bounded pool of reusable client sessions
//! - [`cache`] - Staging cache root, eviction and content hashing
//! - [`file_handler`] - Access modes and decompression-aware handles
//! - [`backend`] - Remote backend seam and object store clients
//! - [`store`] - Copy engine, access sessions and delete
//! - [`config`] - Environment (and optional file) configuration

// Core modules
pub mod error;
pub mod location;

// Building blocks
pub mod cache;
pub mod file_handler;
pub mod pool;

// Remote access and the public facade
pub mod backend;
pub mod config;
pub mod store;

// Re-export commonly used types for convenience
pub use error::{Result, StagehandError};

// Public API surface for external usage
pub use cache::CacheRoot;
pub use config::StoreConfig;
pub use location::{decompose, Location};
pub use store::{AccessOptions, CopyOptions, Store, StoreBuilder};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
