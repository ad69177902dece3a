//! Local file opening with transparent compression.
//!
//! Access sessions hand callers a [`FileHandle`] produced by [`open`]. The
//! compression codec is chosen from the file name, so a staged `*.gz` object
//! reads and writes as plain bytes while staying compressed on disk.

pub mod compression;
pub mod handle;
pub mod mode;

pub use compression::CompressionType;
pub use handle::{open, FileHandle};
pub use mode::{AccessKind, AccessMode, ModeFlavor, SUPPORTED_MODES};
