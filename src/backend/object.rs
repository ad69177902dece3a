//! Bucket/key object stores behind a session pool.

use crate::backend::{RemoteBackend, TransferOptions};
use crate::error::{BoxError, Result, StagehandError};
use crate::location::decompose_remote;
use crate::pool::{HandleFactory, PoolGuard, SessionPool};
use async_trait::async_trait;
use futures::FutureExt;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

/// The three calls an object store client has to provide.
///
/// Errors are returned boxed; the backend wraps them with the location
/// involved before they reach a caller.
#[async_trait]
pub trait ObjectClient: Send + Sync {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        local: &Path,
        options: &TransferOptions,
    ) -> std::result::Result<(), BoxError>;

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        local: &Path,
        options: &TransferOptions,
    ) -> std::result::Result<(), BoxError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> std::result::Result<(), BoxError>;
}

pub type SharedClient = Arc<dyn ObjectClient>;

/// [`RemoteBackend`] for any [`ObjectClient`].
///
/// Pooled calls borrow a client from the session pool for the duration of one
/// transfer; unpooled calls build a throwaway client with the same factory.
pub struct ObjectStoreBackend {
    pool: SessionPool<SharedClient>,
}

enum ClientLease<'a> {
    Pooled(PoolGuard<'a, SharedClient>),
    Fresh(SharedClient),
}

impl Deref for ClientLease<'_> {
    type Target = dyn ObjectClient;

    fn deref(&self) -> &Self::Target {
        match self {
            ClientLease::Pooled(guard) => &***guard,
            ClientLease::Fresh(client) => &**client,
        }
    }
}

impl ObjectStoreBackend {
    pub fn new(factory: HandleFactory<SharedClient>, pool_size: usize) -> Self {
        Self {
            pool: SessionPool::new(factory, pool_size),
        }
    }

    /// Backend whose factory hands out clones of one shared client
    pub fn with_client(client: SharedClient, pool_size: usize) -> Self {
        let factory: HandleFactory<SharedClient> = Arc::new(move || {
            let client = Arc::clone(&client);
            async move { Ok(client) }.boxed()
        });
        Self::new(factory, pool_size)
    }

    pub fn pool(&self) -> &SessionPool<SharedClient> {
        &self.pool
    }

    async fn client(&self, use_pool: bool) -> Result<ClientLease<'_>> {
        if use_pool {
            Ok(ClientLease::Pooled(self.pool.acquire().await?))
        } else {
            Ok(ClientLease::Fresh(self.pool.create_unpooled().await?))
        }
    }
}

#[async_trait]
impl RemoteBackend for ObjectStoreBackend {
    async fn fetch(
        &self,
        path: &str,
        local: &Path,
        options: &TransferOptions,
        use_pool: bool,
    ) -> Result<()> {
        let (bucket, key) = decompose_remote(path);
        let client = self.client(use_pool).await?;
        client
            .get_object(bucket, key, local, options)
            .await
            .map_err(|e| StagehandError::object_store(path, e))
    }

    async fn put(
        &self,
        local: &Path,
        path: &str,
        options: &TransferOptions,
        use_pool: bool,
    ) -> Result<()> {
        let (bucket, key) = decompose_remote(path);
        let client = self.client(use_pool).await?;
        client
            .put_object(bucket, key, local, options)
            .await
            .map_err(|e| StagehandError::object_store(path, e))
    }

    async fn delete(&self, path: &str, use_pool: bool) -> Result<()> {
        let (bucket, key) = decompose_remote(path);
        let client = self.client(use_pool).await?;
        client
            .delete_object(bucket, key)
            .await
            .map_err(|e| StagehandError::delete(path, e))
    }
}

impl std::fmt::Debug for ObjectStoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBackend")
            .field("pool", &self.pool)
            .finish()
    }
}
