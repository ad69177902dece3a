//! Location strings and their decomposition.
//!
//! A location is either a bare filesystem path (scheme `file`) or
//! `<scheme>://<scheme-specific-path>`. Decomposition never validates the
//! characters of the path; malformed input surfaces later as an I/O failure.

use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Scheme assigned to locations without a `scheme://` prefix.
pub const LOCAL_SCHEME: &str = "file";

const SEPARATOR: &str = "://";

/// Immutable `(scheme, path)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Location {
    scheme: String,
    path: String,
}

impl Location {
    pub fn new(scheme: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into().to_lowercase(),
            path: path.into(),
        }
    }

    /// Build a local location from a filesystem path
    pub fn local(path: impl AsRef<Path>) -> Self {
        Self::new(LOCAL_SCHEME, path.as_ref().to_string_lossy().into_owned())
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_local(&self) -> bool {
        self.scheme == LOCAL_SCHEME
    }

    /// Split the scheme-specific path into `(bucket, key)`
    pub fn remote_parts(&self) -> (&str, &str) {
        decompose_remote(&self.path)
    }

    /// Two locations are equivalent when scheme and path match, or when both
    /// are local and resolve to the same canonical filesystem path.
    pub fn is_equivalent(&self, other: &Location) -> bool {
        if self.scheme == other.scheme && self.path == other.path {
            return true;
        }

        self.is_local() && other.is_local() && resolve(&self.path) == resolve(&other.path)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_local() {
            write!(f, "{}", self.path)
        } else {
            write!(f, "{}{}{}", self.scheme, SEPARATOR, self.path)
        }
    }
}

impl From<&str> for Location {
    fn from(location: &str) -> Self {
        decompose(location)
    }
}

/// Split a location string on the first `://`.
///
/// A string without the separator is a local path. The scheme is lower-cased;
/// the path is kept verbatim.
pub fn decompose(location: &str) -> Location {
    match location.split_once(SEPARATOR) {
        Some((scheme, path)) => Location::new(scheme, path),
        None => Location::new(LOCAL_SCHEME, location),
    }
}

/// Split a remote path into `(bucket, key)` on the first `/`.
///
/// The key may be empty.
pub fn decompose_remote(path: &str) -> (&str, &str) {
    path.split_once('/').unwrap_or((path, ""))
}

/// Resolve a path to an absolute form without requiring it to exist.
///
/// `..` and `.` are folded lexically and every prefix that exists on disk is
/// canonicalized, so symbolic links along the way are followed. Components
/// past the first missing one (glob metacharacters included) are kept as
/// written.
pub fn resolve(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let mut resolved = if path.is_absolute() {
        PathBuf::new()
    } else {
        std::env::current_dir().unwrap_or_default()
    };
    let mut on_disk = true;

    for component in path.components() {
        match component {
            Component::Prefix(prefix) => resolved.push(prefix.as_os_str()),
            Component::RootDir => resolved.push(Component::RootDir.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            Component::Normal(name) => {
                resolved.push(name);
                if on_disk {
                    match resolved.canonicalize() {
                        Ok(canonical) => resolved = canonical,
                        Err(_) => on_disk = false,
                    }
                }
            }
        }
    }

    resolved
}
