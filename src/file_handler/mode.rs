//! The fixed set of access modes.

use crate::error::{Result, StagehandError};
use std::fmt;
use std::str::FromStr;

/// Every mode string accepted by [`AccessMode::parse`], in display order.
pub const SUPPORTED_MODES: [&str; 9] = ["r", "rb", "rt", "w", "wb", "wt", "a", "ab", "at"];

/// What the caller intends to do with the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    /// Truncates the file on open
    Write,
    Append,
}

/// The optional `b`/`t` suffix of a mode string.
///
/// Handles are byte streams either way; the flavour is kept so a mode can be
/// echoed back exactly as the caller wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFlavor {
    Default,
    Binary,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessMode {
    kind: AccessKind,
    flavor: ModeFlavor,
}

impl AccessMode {
    pub const READ: AccessMode = AccessMode::new(AccessKind::Read, ModeFlavor::Default);
    pub const WRITE: AccessMode = AccessMode::new(AccessKind::Write, ModeFlavor::Default);
    pub const APPEND: AccessMode = AccessMode::new(AccessKind::Append, ModeFlavor::Default);

    pub const fn new(kind: AccessKind, flavor: ModeFlavor) -> Self {
        Self { kind, flavor }
    }

    /// Parse a mode string, accepting only exact members of [`SUPPORTED_MODES`]
    pub fn parse(mode: &str) -> Result<Self> {
        let kind = match mode.chars().next() {
            Some('r') => AccessKind::Read,
            Some('w') => AccessKind::Write,
            Some('a') => AccessKind::Append,
            _ => return Err(unsupported(mode)),
        };
        let flavor = match &mode[1..] {
            "" => ModeFlavor::Default,
            "b" => ModeFlavor::Binary,
            "t" => ModeFlavor::Text,
            _ => return Err(unsupported(mode)),
        };
        Ok(Self { kind, flavor })
    }

    pub fn kind(&self) -> AccessKind {
        self.kind
    }

    pub fn flavor(&self) -> ModeFlavor {
        self.flavor
    }

    pub fn is_read(&self) -> bool {
        self.kind == AccessKind::Read
    }

    /// True only for truncating write modes
    pub fn is_write(&self) -> bool {
        self.kind == AccessKind::Write
    }

    /// True for write and append modes, the modes that may change content
    pub fn may_modify(&self) -> bool {
        matches!(self.kind, AccessKind::Write | AccessKind::Append)
    }

    pub fn as_str(&self) -> &'static str {
        let index = match self.kind {
            AccessKind::Read => 0,
            AccessKind::Write => 3,
            AccessKind::Append => 6,
        } + match self.flavor {
            ModeFlavor::Default => 0,
            ModeFlavor::Binary => 1,
            ModeFlavor::Text => 2,
        };
        SUPPORTED_MODES[index]
    }
}

fn unsupported(mode: &str) -> StagehandError {
    StagehandError::UnsupportedMode {
        mode: mode.to_string(),
    }
}

impl FromStr for AccessMode {
    type Err = StagehandError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
