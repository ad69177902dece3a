//! In-process object store client.
//!
//! Objects live in a map keyed by `(bucket, key)`. Call counters make it
//! possible to assert how often the engine went to the "network".

use crate::backend::{ObjectClient, TransferOptions};
use crate::error::BoxError;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct MemoryObjectClient {
    objects: Mutex<HashMap<(String, String), Vec<u8>>>,
    seen_options: Mutex<Vec<TransferOptions>>,
    gets: AtomicUsize,
    puts: AtomicUsize,
    deletes: AtomicUsize,
}

impl MemoryObjectClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an object directly, bypassing the counters
    pub fn insert(&self, bucket: &str, key: &str, content: Vec<u8>) {
        self.objects
            .lock()
            .insert((bucket.to_string(), key.to_string()), content);
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn deletes(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }

    /// Transfer options received by every get and put, in call order
    pub fn seen_options(&self) -> Vec<TransferOptions> {
        self.seen_options.lock().clone()
    }
}

#[async_trait]
impl ObjectClient for MemoryObjectClient {
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        local: &Path,
        options: &TransferOptions,
    ) -> Result<(), BoxError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.seen_options.lock().push(options.clone());
        let content = tokio::fs::read(local).await?;
        self.insert(bucket, key, content);
        Ok(())
    }

    async fn get_object(
        &self,
        bucket: &str,
        key: &str,
        local: &Path,
        options: &TransferOptions,
    ) -> Result<(), BoxError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.seen_options.lock().push(options.clone());
        let content = self
            .object(bucket, key)
            .ok_or_else(|| format!("NoSuchKey: {bucket}/{key}"))?;
        tokio::fs::write(local, content).await?;
        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), BoxError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.objects
            .lock()
            .remove(&(bucket.to_string(), key.to_string()))
            .map(drop)
            .ok_or_else(|| format!("NoSuchKey: {bucket}/{key}").into())
    }
}
