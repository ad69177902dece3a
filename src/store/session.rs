//! Access sessions.
//!
//! A session moves through
//! `Idle → Localizing → Open → Hashing → WritingBack → Evicting → Closed`,
//! skipping the steps that do not apply:
//!
//! - local paths are used in place; they are never hashed, written back or evicted
//! - hashing happens only for staged files opened in write or append mode
//! - write-back happens only when the post-use hash differs from the pre-use hash
//! - eviction happens only for staged files when caching was not requested
//!
//! The caller's handle is always closed before write-back or eviction starts.

use crate::cache::hash::{hash_file, ContentHash};
use crate::error::{Result, StagehandError};
use crate::file_handler::{self, AccessMode, FileHandle};
use crate::location::{decompose, resolve, Location};
use crate::store::{AccessOptions, Store};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Localizing,
    Open,
    Hashing,
    WritingBack,
    Evicting,
    Closed,
}

/// One localized file and the bookkeeping needed to put it back.
#[derive(Debug)]
pub struct AccessSession<'s> {
    store: &'s Store,
    location: Location,
    mode: AccessMode,
    options: AccessOptions,
    local_path: PathBuf,
    cached: bool,
    hash_before: Option<ContentHash>,
    state: SessionState,
}

impl Store {
    /// Open `path` in `mode` and run `use_file` on the handle.
    ///
    /// Remote files are staged in the cache first. When `use_file` returns,
    /// the handle is closed; content changed in write or append mode is then
    /// uploaded back, and the staged copy is evicted unless
    /// [`AccessOptions::use_cache`] is set.
    ///
    /// If `use_file` fails, nothing is written back and its error is returned.
    /// The staged copy is still evicted when caching was not requested.
    ///
    /// An unrecognised mode fails before any I/O.
    pub async fn access<T, F>(
        &self,
        path: &str,
        mode: &str,
        options: &AccessOptions,
        use_file: F,
    ) -> Result<T>
    where
        F: FnOnce(&mut FileHandle) -> Result<T>,
    {
        let mode = AccessMode::parse(mode)?;
        let mut session = self.open_session(path, mode, options).await?;
        let mut handle = match session.open() {
            Ok(handle) => handle,
            Err(e) => {
                session.abandon();
                return Err(e);
            }
        };

        let used = use_file(&mut handle);
        let closed = handle.close();

        match used.and_then(|value| closed.map(|()| value)) {
            Ok(value) => {
                session.finish().await?;
                Ok(value)
            }
            Err(e) => {
                session.abandon();
                Err(e)
            }
        }
    }

    /// Localize `path` without opening it; drive the session step by step
    pub async fn open_session(
        &self,
        path: &str,
        mode: AccessMode,
        options: &AccessOptions,
    ) -> Result<AccessSession<'_>> {
        AccessSession::localize(self, path, mode, options.clone()).await
    }
}

impl<'s> AccessSession<'s> {
    async fn localize(
        store: &'s Store,
        path: &str,
        mode: AccessMode,
        options: AccessOptions,
    ) -> Result<AccessSession<'s>> {
        let location = decompose(path);
        let mut session = AccessSession {
            store,
            location,
            mode,
            options,
            local_path: PathBuf::new(),
            cached: false,
            hash_before: None,
            state: SessionState::Idle,
        };
        session.transition(SessionState::Localizing);

        if session.location.is_local() {
            session.local_path = resolve(session.location.path());
            return Ok(session);
        }

        if store.backends.get(session.location.scheme()).is_none() {
            return Err(StagehandError::unsupported_protocol(
                session.location.scheme(),
                session.location.to_string(),
            ));
        }

        let staged = store.cache.staged_path(&session.location);
        let reuse = session.options.use_cache && staged.exists();
        if !session.mode.is_write() && !reuse {
            store
                .copy_locations(
                    &session.location,
                    &Location::local(&staged),
                    &session.options.copy_options(),
                )
                .await?;
        } else if reuse {
            log::debug!("reusing cached copy of {}", session.location);
        }

        session.local_path = staged;
        session.cached = true;
        Ok(session)
    }

    /// Open the localized file, hashing it first if it may be written back
    pub fn open(&mut self) -> Result<FileHandle> {
        if self.mode.is_write() {
            self.store.cache.prepare(&self.local_path)?;
        }
        if self.tracks_changes() {
            self.hash_before = Some(hash_file(&self.local_path)?);
        }

        let handle = file_handler::open(&self.local_path, self.mode)?;
        self.transition(SessionState::Open);
        Ok(handle)
    }

    /// Write back changed content and evict the staged copy.
    ///
    /// The handle returned by [`AccessSession::open`] must be closed first.
    pub async fn finish(mut self) -> Result<()> {
        if let Some(before) = self.hash_before {
            self.transition(SessionState::Hashing);
            let after = hash_file(&self.local_path)?;
            if after != before {
                self.transition(SessionState::WritingBack);
                self.store
                    .copy_locations(
                        &Location::local(&self.local_path),
                        &self.location,
                        &self.options.copy_options(),
                    )
                    .await?;
            } else {
                log::debug!("{} unchanged ({after}); skipping write-back", self.location);
            }
        }

        self.evict_if_transient()?;
        self.transition(SessionState::Closed);
        Ok(())
    }

    /// End the session without writing back
    pub fn abandon(mut self) {
        if let Err(e) = self.evict_if_transient() {
            log::warn!("could not evict staged copy of {}: {e}", self.location);
        }
        self.transition(SessionState::Closed);
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    /// The file the caller's handle points at
    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    /// True when the local file is a staged copy of a remote object
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    fn tracks_changes(&self) -> bool {
        self.cached && self.mode.may_modify()
    }

    fn evict_if_transient(&mut self) -> Result<()> {
        if self.cached && !self.options.use_cache {
            self.transition(SessionState::Evicting);
            self.store.cache.evict(&self.local_path)?;
        }
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        log::debug!(
            "session {} ({}): {:?} -> {:?}",
            self.location,
            self.mode,
            self.state,
            next
        );
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MemoryObjectClient, ObjectStoreBackend};
    use std::io::{Read, Write};
    use std::sync::Arc;

    fn store_with_memory() -> (Store, Arc<MemoryObjectClient>) {
        let client = Arc::new(MemoryObjectClient::new());
        let store = Store::builder()
            .backend("mem", Arc::new(ObjectStoreBackend::with_client(client.clone(), 4)))
            .build()
            .unwrap();
        (store, client)
    }

    #[tokio::test]
    async fn test_bad_mode_fails_before_io() {
        let (store, client) = store_with_memory();
        client.insert("b", "k", b"x".to_vec());

        let result = store
            .access("mem://b/k", "r+", &AccessOptions::new(), |_| Ok(()))
            .await;
        assert!(matches!(result, Err(StagehandError::UnsupportedMode { .. })));
        assert_eq!(client.gets(), 0);
    }

    #[tokio::test]
    async fn test_local_path_is_used_in_place() {
        let (store, _) = store_with_memory();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("local.txt");
        std::fs::write(&path, b"abc").unwrap();

        let mut session = store
            .open_session(&path.to_string_lossy(), AccessMode::READ, &AccessOptions::new())
            .await
            .unwrap();
        assert!(!session.is_cached());
        assert_eq!(session.local_path(), path.canonicalize().unwrap());

        let mut handle = session.open().unwrap();
        let mut content = String::new();
        handle.read_to_string(&mut content).unwrap();
        handle.close().unwrap();
        session.finish().await.unwrap();
        assert_eq!(content, "abc");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_state_walk_for_changed_remote_write() {
        let (store, client) = store_with_memory();
        client.insert("b", "k.txt", b"old".to_vec());

        let mut session = store
            .open_session("mem://b/k.txt", AccessMode::APPEND, &AccessOptions::new())
            .await
            .unwrap();
        assert_eq!(session.state(), SessionState::Localizing);
        assert!(session.is_cached());
        let staged = session.local_path().to_path_buf();
        assert_eq!(std::fs::read(&staged).unwrap(), b"old");

        let mut handle = session.open().unwrap();
        assert_eq!(session.state(), SessionState::Open);
        handle.write_all(b"+new").unwrap();
        handle.close().unwrap();

        session.finish().await.unwrap();
        assert_eq!(client.object("b", "k.txt").unwrap(), b"old+new");
        assert_eq!(client.puts(), 1);
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn test_write_mode_skips_fetch() {
        let (store, client) = store_with_memory();
        client.insert("b", "k", b"existing".to_vec());

        store
            .access("mem://b/k", "w", &AccessOptions::new(), |f| {
                f.write_all(b"fresh")?;
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(client.gets(), 0);
        assert_eq!(client.object("b", "k").unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn test_failed_use_skips_write_back_but_evicts() {
        let (store, client) = store_with_memory();
        client.insert("b", "k", b"original".to_vec());
        let staged = store.cache().staged_path(&decompose("mem://b/k"));

        let result: Result<()> = store
            .access("mem://b/k", "a", &AccessOptions::new(), |f| {
                f.write_all(b" partial")?;
                Err(StagehandError::config("caller gave up"))
            })
            .await;

        assert!(matches!(result, Err(StagehandError::ConfigError { .. })));
        assert_eq!(client.puts(), 0);
        assert_eq!(client.object("b", "k").unwrap(), b"original");
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn test_failed_open_evicts_staged_copy() {
        let (store, client) = store_with_memory();
        let staged = store.cache().staged_path(&decompose("mem://b/k"));
        // A directory in place of the staged file cannot be hashed.
        std::fs::create_dir_all(staged.join("inner")).unwrap();

        let result = store
            .access("mem://b/k", "w", &AccessOptions::new(), |_| Ok(()))
            .await;

        assert!(matches!(result, Err(StagehandError::FileError { .. })));
        assert_eq!((client.gets(), client.puts()), (0, 0));
        assert!(!staged.exists());
    }

    #[tokio::test]
    async fn test_unknown_remote_scheme_is_rejected() {
        let (store, _) = store_with_memory();
        let result = store
            .access("ftp://host/file", "r", &AccessOptions::new(), |_| Ok(()))
            .await;
        assert!(matches!(
            result,
            Err(StagehandError::UnsupportedProtocol { .. })
        ));
    }
}
