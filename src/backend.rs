//! Remote storage backends.
//!
//! The copy engine only knows two kinds of location: local paths and schemes
//! registered in a [`BackendRegistry`]. Each registered scheme maps to a
//! [`RemoteBackend`] exposing the three capabilities the engine needs, so a new
//! store is added by registering a backend rather than by touching dispatch.
//!
//! Submodules:
//! - `object`: bucket/key stores driven through an [`ObjectClient`] and a session pool
//! - `memory`: in-process object client, used by tests and offline runs
//! - `s3`: client built on `aws-sdk-s3` (feature `s3`)

pub mod memory;
pub mod object;
#[cfg(feature = "s3")]
pub mod s3;

use crate::error::{Result, StagehandError};
use crate::location::LOCAL_SCHEME;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

pub use memory::MemoryObjectClient;
pub use object::{ObjectClient, ObjectStoreBackend, SharedClient};

/// Provider-specific transfer flags, such as `RequestPayer=requester`.
pub type TransferOptions = BTreeMap<String, String>;

/// Capabilities of one remote scheme.
///
/// `path` is always the scheme-specific path with the scheme stripped. When
/// `use_pool` is false the backend builds a fresh client for the call.
#[async_trait]
pub trait RemoteBackend: Send + Sync {
    /// Download the object at `path` into the local file `local`
    async fn fetch(
        &self,
        path: &str,
        local: &Path,
        options: &TransferOptions,
        use_pool: bool,
    ) -> Result<()>;

    /// Upload the local file `local` to `path`
    async fn put(
        &self,
        local: &Path,
        path: &str,
        options: &TransferOptions,
        use_pool: bool,
    ) -> Result<()>;

    async fn delete(&self, path: &str, use_pool: bool) -> Result<()>;
}

/// Scheme name to backend table.
#[derive(Default, Clone)]
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn RemoteBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend, replacing any previous one for the scheme.
    ///
    /// The local scheme is built in and cannot be overridden.
    pub fn register(&mut self, scheme: &str, backend: Arc<dyn RemoteBackend>) -> Result<()> {
        let scheme = scheme.to_lowercase();
        if scheme == LOCAL_SCHEME {
            return Err(StagehandError::config(format!(
                "the {LOCAL_SCHEME} scheme is handled natively and cannot be registered"
            )));
        }
        self.backends.insert(scheme, backend);
        Ok(())
    }

    pub fn get(&self, scheme: &str) -> Option<&Arc<dyn RemoteBackend>> {
        self.backends.get(scheme)
    }

    pub fn schemes(&self) -> impl Iterator<Item = &str> {
        self.backends.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut schemes: Vec<_> = self.schemes().collect();
        schemes.sort_unstable();
        f.debug_struct("BackendRegistry")
            .field("schemes", &schemes)
            .finish()
    }
}
