//! Copy engine.
//!
//! Local sources are copied or uploaded directly. Every remote source is first
//! downloaded into the staging cache and then forwarded as a local source, so
//! the engine never needs a transfer path per pair of remote schemes.

use crate::error::{Result, StagehandError};
use crate::location::{decompose, Location};
use crate::store::{CopyOptions, Store};
use std::path::{Path, PathBuf};

impl Store {
    /// Copy `source` to `destination`; either may be local or remote.
    ///
    /// Equivalent locations make this a no-op. A local-to-local copy overwrites
    /// the destination in place and is not atomic.
    pub async fn copy(&self, source: &str, destination: &str, options: &CopyOptions) -> Result<()> {
        self.copy_locations(&decompose(source), &decompose(destination), options)
            .await
    }

    pub(crate) async fn copy_locations(
        &self,
        source: &Location,
        destination: &Location,
        options: &CopyOptions,
    ) -> Result<()> {
        if source.is_equivalent(destination) {
            log::debug!("copy {source} -> {destination} skipped: same location");
            return Ok(());
        }

        if source.is_local() {
            return self
                .copy_from_local(Path::new(source.path()), destination, options)
                .await;
        }

        let backend = self.backends.get(source.scheme()).ok_or_else(|| {
            StagehandError::unsupported_protocol(source.scheme(), source.to_string())
        })?;

        let staging = self.staging_for(destination);
        self.cache.prepare(&staging)?;
        log::debug!("fetching {source} into {}", staging.display());
        if let Err(e) = backend
            .fetch(source.path(), &staging, &options.extra, options.use_pool)
            .await
        {
            // A partial download must never be mistaken for a staged copy.
            if let Err(evict_error) = self.cache.evict(&staging) {
                log::warn!("could not remove partial download {}: {evict_error}", staging.display());
            }
            return Err(e);
        }

        let staged = Location::local(&staging);
        if staged.is_equivalent(destination) {
            return Ok(());
        }

        let delivered = self.copy_from_local(&staging, destination, options).await;
        let evicted = self.cache.evict(&staging);
        delivered?;
        evicted?;
        Ok(())
    }

    /// Where a remote source is downloaded before it reaches `destination`
    fn staging_for(&self, destination: &Location) -> PathBuf {
        self.cache.staging_path_for(destination.path())
    }

    async fn copy_from_local(
        &self,
        local: &Path,
        destination: &Location,
        options: &CopyOptions,
    ) -> Result<()> {
        if destination.is_local() {
            let target = Path::new(destination.path());
            if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    StagehandError::file_error(
                        format!("Failed to create directory {}", parent.display()),
                        e,
                    )
                })?;
            }
            log::debug!("copying {} -> {}", local.display(), target.display());
            tokio::fs::copy(local, target).await.map_err(|e| {
                StagehandError::file_error(
                    format!("Failed to copy {} to {}", local.display(), target.display()),
                    e,
                )
            })?;
            return Ok(());
        }

        let backend = self.backends.get(destination.scheme()).ok_or_else(|| {
            StagehandError::unsupported_protocol(destination.scheme(), destination.to_string())
        })?;
        log::debug!("uploading {} -> {destination}", local.display());
        backend
            .put(local, destination.path(), &options.extra, options.use_pool)
            .await
    }
}
