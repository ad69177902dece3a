//! Staging cache for localized remote objects.
//!
//! All staged files live under one [`CacheRoot`] and mirror the remote key
//! hierarchy: `s3://bucket/dir/a.txt` stages at `<root>/bucket/dir/a.txt`.
//! Eviction and reclamation refuse to touch anything that does not resolve
//! strictly below the root, symbolic links included.

pub mod hash;

use crate::error::{Result, StagehandError};
use crate::location::{decompose, resolve, Location};
use std::path::{Component, Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

/// Prefix of the temporary directory created by [`CacheRoot::temporary`].
pub const CACHE_DIR_PREFIX: &str = "stagehand.";

/// Pattern matching every entry directly under the cache root
pub const RECLAIM_ALL: &str = "*";

/// Directory that holds every staged file.
///
/// A temporary root is deleted when the value is dropped; a root opened with
/// [`CacheRoot::at`] is left on disk.
#[derive(Debug)]
pub struct CacheRoot {
    path: PathBuf,
    _dir: Option<TempDir>,
}

impl CacheRoot {
    /// Create a fresh temporary directory as the root
    pub fn temporary() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix(CACHE_DIR_PREFIX)
            .tempdir()
            .map_err(|e| StagehandError::file_error("Failed to create cache directory", e))?;
        let path = dir.path().canonicalize().map_err(|e| {
            StagehandError::file_error("Failed to resolve cache directory", e)
        })?;
        Ok(Self {
            path,
            _dir: Some(dir),
        })
    }

    /// Use an existing or new directory as a persistent root
    pub fn at(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        std::fs::create_dir_all(path).map_err(|e| {
            StagehandError::file_error(
                format!("Failed to create cache directory {}", path.display()),
                e,
            )
        })?;
        let path = path.canonicalize().map_err(|e| {
            StagehandError::file_error(
                format!("Failed to resolve cache directory {}", path.display()),
                e,
            )
        })?;
        Ok(Self { path, _dir: None })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when an already resolved path lies strictly below the root
    pub fn contains(&self, resolved: &Path) -> bool {
        resolved != self.path && resolved.starts_with(&self.path)
    }
}

/// Placement and guarded deletion of staged files.
#[derive(Debug)]
pub struct CacheStore {
    root: CacheRoot,
}

impl CacheStore {
    pub fn new(root: CacheRoot) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.path()
    }

    /// Staging path of a location; the scheme does not take part
    pub fn staged_path(&self, location: &Location) -> PathBuf {
        self.staging_path_for(location.path())
    }

    /// Map a path string into the cache.
    ///
    /// A path already inside the root is returned as is, so re-staging a staged
    /// path is idempotent. Anything else is re-rooted under the cache with its
    /// root, prefix, `.` and `..` components dropped, which keeps the result
    /// inside the root.
    pub fn staging_path_for(&self, path: &str) -> PathBuf {
        let path = Path::new(path);
        let climbs = path.components().any(|c| c == Component::ParentDir);
        if path.starts_with(self.root()) && !climbs {
            return path.to_path_buf();
        }

        let mut staged = self.root().to_path_buf();
        for component in path.components() {
            if let Component::Normal(name) = component {
                staged.push(name);
            }
        }
        staged
    }

    /// Create the parent directories of a staging path
    pub fn prepare(&self, staged: &Path) -> Result<()> {
        if let Some(parent) = staged.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StagehandError::file_error(
                    format!("Failed to create staging directory {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }

    /// Remove one staged file or directory by literal path.
    ///
    /// Returns whether anything was removed. Fails with
    /// [`StagehandError::InvalidAccess`] if the path resolves outside the root.
    pub fn evict(&self, path: &Path) -> Result<bool> {
        let candidate = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root().join(path)
        };
        let resolved = self.guard(&candidate)?;
        self.remove_entry(&resolved)
    }

    /// Delete staged entries matching a glob pattern.
    ///
    /// The pattern may carry a scheme prefix, which is ignored, and may be given
    /// relative to the root or as an absolute path inside it. The pattern is
    /// resolved before globbing and every match is verified again, so neither
    /// `..` nor a symbolic link can reach outside the root. Directories are
    /// removed recursively on a best-effort basis; symbolic links are skipped.
    ///
    /// Returns the number of matched entries removed.
    pub fn reclaim(&self, pattern: &str) -> Result<usize> {
        let location = decompose(pattern);
        let raw = Path::new(location.path());
        let candidate = if raw.starts_with(self.root()) {
            raw.to_path_buf()
        } else {
            self.root().join(raw)
        };
        let resolved = self.guard(&candidate)?;

        let relative = resolved.strip_prefix(self.root()).map_err(|_| {
            StagehandError::invalid_access(&resolved, "Attempted to clean outside of the cache")
        })?;
        let full_pattern = format!(
            "{}{}{}",
            glob::Pattern::escape(&self.root().to_string_lossy()),
            std::path::MAIN_SEPARATOR,
            relative.to_string_lossy()
        );
        let matches = glob::glob(&full_pattern).map_err(|e| StagehandError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;

        let mut removed = 0;
        for entry in matches {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    log::warn!("skipping unreadable cache entry: {e}");
                    continue;
                }
            };
            if !self.root.contains(&resolve_entry(&path)) {
                log::warn!(
                    "skipping {} during reclaim: resolves outside of the cache",
                    path.display()
                );
                continue;
            }
            if self.remove_entry(&path)? {
                removed += 1;
            }
        }

        log::debug!("reclaimed {removed} cache entries for pattern {pattern}");
        Ok(removed)
    }

    fn guard(&self, candidate: &Path) -> Result<PathBuf> {
        let resolved = resolve(candidate);
        if self.root.contains(&resolved) {
            Ok(resolved)
        } else {
            Err(StagehandError::invalid_access(
                resolved,
                "Attempted to clean file(s) outside of the cache",
            ))
        }
    }

    fn remove_entry(&self, path: &Path) -> Result<bool> {
        let metadata = match std::fs::symlink_metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(StagehandError::file_error(
                    format!("Failed to inspect {}", path.display()),
                    e,
                ))
            }
        };

        if metadata.is_file() {
            std::fs::remove_file(path).map_err(|e| {
                StagehandError::file_error(format!("Failed to remove {}", path.display()), e)
            })?;
            Ok(true)
        } else if metadata.is_dir() {
            remove_tree(path);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// Resolve a matched entry without following the entry itself when it is a link.
fn resolve_entry(path: &Path) -> PathBuf {
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => resolve(parent).join(name),
        _ => resolve(path),
    }
}

/// Recursive removal that keeps going past entries it cannot delete.
fn remove_tree(dir: &Path) {
    for entry in WalkDir::new(dir).contents_first(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("cache cleanup could not walk {}: {e}", dir.display());
                continue;
            }
        };
        let outcome = if entry.file_type().is_dir() {
            std::fs::remove_dir(entry.path())
        } else {
            std::fs::remove_file(entry.path())
        };
        if let Err(e) = outcome {
            log::warn!("cache cleanup left {}: {e}", entry.path().display());
        }
    }
}
