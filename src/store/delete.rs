//! Removal of canonical files and objects.
//!
//! Delete bypasses the staging cache entirely; a staged copy of a deleted
//! object is left for [`Store::clean`] to reclaim.

use crate::error::{Result, StagehandError};
use crate::location::decompose;
use crate::store::Store;

impl Store {
    /// Delete a local file or remote object.
    ///
    /// Every failure is reported as [`StagehandError::DeleteError`] naming the
    /// full location, except an unknown scheme which stays
    /// [`StagehandError::UnsupportedProtocol`].
    pub async fn delete(&self, path: &str, use_pool: bool) -> Result<()> {
        let location = decompose(path);

        if location.is_local() {
            log::debug!("removing local file {location}");
            return tokio::fs::remove_file(location.path())
                .await
                .map_err(|e| StagehandError::delete(path, e));
        }

        let backend = self.backends.get(location.scheme()).ok_or_else(|| {
            StagehandError::unsupported_protocol(location.scheme(), location.to_string())
        })?;

        log::debug!("deleting remote object {location}");
        match backend.delete(location.path(), use_pool).await {
            Ok(()) => Ok(()),
            Err(StagehandError::DeleteError { message, .. }) => {
                Err(StagehandError::DeleteError {
                    location: path.to_string(),
                    message,
                })
            }
            Err(other) => Err(StagehandError::delete(path, other)),
        }
    }
}
