//! Bounded pool of reusable remote-client handles.
//!
//! Handles are created lazily through a factory, up to `max_size`, and are
//! never destroyed or health-checked while the pool lives. A borrower receives
//! a [`PoolGuard`] that puts the handle back into the idle queue on every exit
//! path.
//!
//! A caller that holds a guard for a long time keeps one of the `max_size`
//! slots busy. When all slots are busy, [`SessionPool::acquire`] waits until a
//! guard is released; the pool does not reclaim slots on its own.

use crate::error::{BoxError, Result, StagehandError};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Async factory used to build new handles.
pub type HandleFactory<T> = Arc<dyn Fn() -> BoxFuture<'static, std::result::Result<T, BoxError>> + Send + Sync>;

/// Multiplier applied to available parallelism for the default pool size.
pub const DEFAULT_SIZE_PER_CORE: usize = 5;

/// Default pool size: a multiple of the available CPU parallelism
pub fn default_pool_size() -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    cores * DEFAULT_SIZE_PER_CORE
}

pub struct SessionPool<T> {
    factory: HandleFactory<T>,
    idle: Mutex<VecDeque<T>>,
    slots: Semaphore,
    created: AtomicUsize,
    max_size: usize,
}

impl<T: Send> SessionPool<T> {
    /// Create an empty pool. A `max_size` of zero is raised to one.
    pub fn new(factory: HandleFactory<T>, max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            factory,
            idle: Mutex::new(VecDeque::new()),
            slots: Semaphore::new(max_size),
            created: AtomicUsize::new(0),
            max_size,
        }
    }

    /// Borrow a handle, creating one if the idle queue is empty.
    ///
    /// Waits while `max_size` handles are checked out. A factory failure is
    /// returned as [`StagehandError::ClientConstruction`] and is not retried.
    pub async fn acquire(&self) -> Result<PoolGuard<'_, T>> {
        let permit = self
            .slots
            .acquire()
            .await
            .map_err(|e| StagehandError::ClientConstruction {
                message: e.to_string(),
            })?;

        // Bind before matching so the idle lock is released before any await.
        let reused = self.idle.lock().pop_front();
        let handle = match reused {
            Some(handle) => handle,
            None => {
                let handle = (self.factory)()
                    .await
                    .map_err(|e| StagehandError::ClientConstruction {
                        message: e.to_string(),
                    })?;
                let total = self.created.fetch_add(1, Ordering::SeqCst) + 1;
                log::debug!("session pool created handle {total}/{}", self.max_size);
                handle
            }
        };

        Ok(PoolGuard {
            pool: self,
            handle: Some(handle),
            _permit: permit,
        })
    }

    /// Return a handle to the idle queue.
    pub fn release(&self, guard: PoolGuard<'_, T>) {
        drop(guard);
    }

    /// Build a handle outside the pool; it is not counted and not returned.
    pub async fn create_unpooled(&self) -> Result<T> {
        (self.factory)()
            .await
            .map_err(|e| StagehandError::ClientConstruction {
                message: e.to_string(),
            })
    }

    /// Number of handles the factory has produced for this pool
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn idle(&self) -> usize {
        self.idle.lock().len()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

impl<T> fmt::Debug for SessionPool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionPool")
            .field("created", &self.created.load(Ordering::SeqCst))
            .field("idle", &self.idle.lock().len())
            .field("max_size", &self.max_size)
            .finish()
    }
}

/// A borrowed handle. Dropping the guard returns the handle to the pool.
pub struct PoolGuard<'a, T> {
    pool: &'a SessionPool<T>,
    handle: Option<T>,
    // Dropped after `Drop::drop` has re-queued the handle.
    _permit: SemaphorePermit<'a>,
}

impl<T: fmt::Debug> fmt::Debug for PoolGuard<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolGuard")
            .field("handle", &self.handle)
            .finish()
    }
}

impl<T> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.handle.as_ref().expect("handle present until drop")
    }
}

impl<T> DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.handle.as_mut().expect("handle present until drop")
    }
}

impl<T> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.pool.idle.lock().push_back(handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use tokio::time::{timeout, Duration};

    fn counting_pool(max_size: usize) -> (Arc<SessionPool<usize>>, Arc<AtomicUsize>) {
        let counter = Arc::new(AtomicUsize::new(0));
        let factory_counter = Arc::clone(&counter);
        let factory: HandleFactory<usize> = Arc::new(move || {
            let id = factory_counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(id) }.boxed()
        });
        (Arc::new(SessionPool::new(factory, max_size)), counter)
    }

    #[tokio::test]
    async fn test_handles_are_reused_after_release() {
        let (pool, counter) = counting_pool(4);

        let first = *pool.acquire().await.unwrap();
        let second = *pool.acquire().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert_eq!(pool.idle(), 1);
    }

    #[tokio::test]
    async fn test_creates_new_handle_while_one_is_checked_out() {
        let (pool, _) = counting_pool(4);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();

        assert_ne!(*a, *b);
        assert_eq!(pool.created(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_pool_blocks_until_release() {
        let (pool, counter) = counting_pool(2);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move {
                let id = *pool.acquire().await.unwrap();
                id
            })
        };

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished(), "third acquire should wait");

        let released = *a;
        pool.release(a);

        let got = timeout(Duration::from_millis(500), waiter)
            .await
            .expect("blocked acquire should complete after release")
            .unwrap();
        assert_eq!(got, released);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        drop(b);
        assert!(pool.created() <= pool.max_size());
    }

    #[test]
    fn test_waiter_is_woken_on_release() {
        let (pool, _) = counting_pool(1);
        let held = tokio_test::block_on(pool.acquire()).unwrap();

        let mut waiter = tokio_test::task::spawn(pool.acquire());
        tokio_test::assert_pending!(waiter.poll());

        drop(held);
        assert!(waiter.is_woken());
        let guard = tokio_test::assert_ready_ok!(waiter.poll());
        assert_eq!(*guard, 0);
        assert_eq!(pool.created(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_borrowers_never_exceed_max_size() {
        let (pool, counter) = counting_pool(3);

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let pool = Arc::clone(&pool);
            tasks.push(tokio::spawn(async move {
                let guard = pool.acquire().await.unwrap();
                tokio::time::sleep(Duration::from_millis(2)).await;
                drop(guard);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(counter.load(Ordering::SeqCst) <= 3);
        assert_eq!(pool.idle(), pool.created());
    }

    #[tokio::test]
    async fn test_factory_failure_propagates() {
        let factory: HandleFactory<usize> =
            Arc::new(|| async { Err::<usize, BoxError>("no credentials".into()) }.boxed());
        let pool = SessionPool::new(factory, 1);

        match pool.acquire().await {
            Err(StagehandError::ClientConstruction { message }) => {
                assert_eq!(message, "no credentials");
            }
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(_) => panic!("expected factory failure"),
        }
        assert_eq!(pool.created(), 0);
        // The slot is freed again after the failure.
        assert_eq!(pool.slots.available_permits(), 1);
    }

    #[test]
    fn test_default_pool_size_is_multiple_of_parallelism() {
        let size = default_pool_size();
        assert!(size >= DEFAULT_SIZE_PER_CORE);
        assert_eq!(size % DEFAULT_SIZE_PER_CORE, 0);
    }
}
