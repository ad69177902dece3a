//! Content hashing used to decide whether a staged file needs write-back.

use crate::error::{Result, StagehandError};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const BLOCK_SIZE: usize = 128 * 1024;

/// Digest of a file's bytes, or the marker for a file that did not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentHash {
    /// Rendered as `"0"`
    Missing,
    Sha256([u8; 32]),
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => f.write_str("0"),
            Self::Sha256(digest) => f.write_str(&hex::encode(digest)),
        }
    }
}

/// Hash the raw bytes of a file in fixed-size blocks.
///
/// A missing file is not an error; it hashes to [`ContentHash::Missing`] so a
/// file created during a session is seen as changed.
pub fn hash_file(path: &Path) -> Result<ContentHash> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ContentHash::Missing),
        Err(e) => {
            return Err(StagehandError::file_error(
                format!("Failed to open {} for hashing", path.display()),
                e,
            ))
        }
    };

    let mut hasher = Sha256::new();
    let mut block = vec![0u8; BLOCK_SIZE];
    loop {
        let read = file.read(&mut block).map_err(|e| {
            StagehandError::file_error(format!("Failed to hash {}", path.display()), e)
        })?;
        if read == 0 {
            break;
        }
        hasher.update(&block[..read]);
    }

    Ok(ContentHash::Sha256(hasher.finalize().into()))
}
