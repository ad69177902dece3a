//! The uniform access layer.
//!
//! [`Store`] ties the pieces together: locations are decomposed, remote
//! sources are staged through the [`CacheStore`], transfers are dispatched to
//! the registered [`RemoteBackend`]s, and access sessions write changed
//! content back to where it came from.
//!
//! Submodules:
//! - `copy`: copy engine dispatching on the (source, destination) scheme pair
//! - `session`: access sessions (localize, open, hash, write back, evict)
//! - `delete`: removal of canonical files and objects

pub mod copy;
pub mod delete;
pub mod session;

use crate::backend::{BackendRegistry, RemoteBackend, TransferOptions};
use crate::cache::{CacheRoot, CacheStore};
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

pub use session::{AccessSession, SessionState};

/// Options for [`Store::copy`]
#[derive(Debug, Clone)]
pub struct CopyOptions {
    /// Provider-specific flags passed to every upload and download
    pub extra: TransferOptions,
    /// Borrow clients from the session pool instead of building fresh ones
    pub use_pool: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            extra: TransferOptions::new(),
            use_pool: true,
        }
    }
}

impl CopyOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pooled(mut self, use_pool: bool) -> Self {
        self.use_pool = use_pool;
        self
    }

    pub fn extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }
}

/// Options for [`Store::access`]
#[derive(Debug, Clone)]
pub struct AccessOptions {
    /// Keep the staged copy after the session as a read-through cache
    pub use_cache: bool,
    /// Borrow clients from the session pool instead of building fresh ones.
    ///
    /// A pooled client is held only while a transfer runs, never while the
    /// caller works with the open handle.
    pub use_pool: bool,
    /// Provider-specific flags used for staging and write-back
    pub extra: TransferOptions,
}

impl Default for AccessOptions {
    fn default() -> Self {
        Self {
            use_cache: false,
            use_pool: true,
            extra: TransferOptions::new(),
        }
    }
}

impl AccessOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached(mut self, use_cache: bool) -> Self {
        self.use_cache = use_cache;
        self
    }

    pub fn pooled(mut self, use_pool: bool) -> Self {
        self.use_pool = use_pool;
        self
    }

    pub fn extra(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name.into(), value.into());
        self
    }

    fn copy_options(&self) -> CopyOptions {
        CopyOptions {
            extra: self.extra.clone(),
            use_pool: self.use_pool,
        }
    }
}

/// Open/copy/delete/clean over local paths and registered remote schemes.
///
/// A store owns its cache root. Share one store (for example behind an
/// [`Arc`]) across tasks; concurrent sessions on the same remote path are not
/// serialized and the last write-back wins.
#[derive(Debug)]
pub struct Store {
    cache: CacheStore,
    backends: BackendRegistry,
}

impl Store {
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    /// Store with a temporary cache root and the S3 backend from `config`
    #[cfg(feature = "s3")]
    pub fn from_config(config: &crate::config::StoreConfig) -> Result<Self> {
        Self::builder()
            .backend(
                crate::backend::s3::S3_SCHEME,
                Arc::new(crate::backend::s3::s3_backend(config)),
            )
            .build()
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn cache_root(&self) -> &Path {
        self.cache.root()
    }

    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    /// Remove cached files matching a glob pattern relative to the cache root.
    ///
    /// Patterns resolving outside the cache are refused with
    /// [`crate::StagehandError::InvalidAccess`]. Never feed unverified user
    /// input to this method.
    pub fn clean(&self, pattern: &str) -> Result<usize> {
        self.cache.reclaim(pattern)
    }
}

#[derive(Default)]
pub struct StoreBuilder {
    cache_root: Option<CacheRoot>,
    backends: Vec<(String, Arc<dyn RemoteBackend>)>,
}

impl StoreBuilder {
    /// Use a specific cache root instead of a fresh temporary directory
    pub fn cache_root(mut self, root: CacheRoot) -> Self {
        self.cache_root = Some(root);
        self
    }

    pub fn backend(mut self, scheme: &str, backend: Arc<dyn RemoteBackend>) -> Self {
        self.backends.push((scheme.to_string(), backend));
        self
    }

    pub fn build(self) -> Result<Store> {
        let root = match self.cache_root {
            Some(root) => root,
            None => CacheRoot::temporary()?,
        };
        let mut registry = BackendRegistry::new();
        for (scheme, backend) in self.backends {
            registry.register(&scheme, backend)?;
        }
        log::debug!("store ready with cache root {}", root.path().display());
        Ok(Store {
            cache: CacheStore::new(root),
            backends: registry,
        })
    }
}
