//! In-memory [DocumentStore], for tests.

use crate::{Content, DocumentStore, StoreError};
use futures::stream::BoxStream;
use futures::StreamExt as _;
use mgfs_types::{DocumentId, DocumentMeta, UnixTime};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

struct StoredDocument {
    filename: String,
    content: Vec<u8>,
    upload_time: UnixTime,
}

/// Operations of [DocumentStore], to make one of them fail with
/// [MemoryStore::fail].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    FindExact,
    CountWithPrefix,
    IteratePrefix,
    OpenContent,
    DeleteById,
}

/// A bucket kept in memory.
///
/// Unlike a real bucket, nothing prevents adding several documents
/// under the same filename, which is convenient to test how
/// inconsistencies are handled.
#[derive(Default)]
pub struct MemoryStore {
    docs: Mutex<BTreeMap<DocumentId, StoredDocument>>,
    next_id: AtomicU64,
    offline: AtomicBool,
    failing: Mutex<HashSet<StoreOp>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store containing the given files.
    pub fn with_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        for (filename, content) in files {
            store.add(filename, content);
        }

        store
    }

    /// Add a document with the given name and content.
    pub fn add(&self, filename: &str, content: impl AsRef<[u8]>) -> DocumentId {
        let secs = 1_700_000_000 + self.next_id.load(Ordering::Relaxed);
        self.add_with_time(filename, content, UnixTime::from_secs(secs))
    }

    pub fn add_with_time(
        &self,
        filename: &str,
        content: impl AsRef<[u8]>,
        upload_time: UnixTime,
    ) -> DocumentId {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let mut bytes = [0u8; 12];
        bytes[4..].copy_from_slice(&n.to_be_bytes());
        let id = DocumentId(bytes);
        self.lock().insert(
            id,
            StoredDocument {
                filename: filename.to_string(),
                content: content.as_ref().to_vec(),
                upload_time,
            },
        );

        id
    }

    /// Return true if a document with that name exists.
    pub fn contains(&self, filename: &str) -> bool {
        self.lock().values().any(|d| d.filename == filename)
    }

    /// Number of documents in the store.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Make all queries fail with [StoreError::Unavailable] until
    /// this is called again with false.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Make `op` fail with [StoreError::Unavailable], while the other
    /// operations keep working.
    pub fn fail(&self, op: StoreOp) {
        self.failing().insert(op);
    }

    /// Undo [MemoryStore::fail].
    pub fn recover(&self, op: StoreOp) {
        self.failing().remove(&op);
    }

    fn check_online(&self, op: StoreOp) -> Result<(), StoreError> {
        if self.offline.load(Ordering::Relaxed) || self.failing().contains(&op) {
            return Err(StoreError::Unavailable);
        }

        Ok(())
    }

    fn failing(&self) -> MutexGuard<'_, HashSet<StoreOp>> {
        self.failing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<DocumentId, StoredDocument>> {
        self.docs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn matching(&self, pred: impl Fn(&str) -> bool) -> Vec<DocumentMeta> {
        self.lock()
            .iter()
            .filter(|(_, d)| pred(&d.filename))
            .map(|(id, d)| DocumentMeta {
                id: *id,
                filename: d.filename.clone(),
                size: d.content.len() as u64,
                upload_time: d.upload_time,
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn find_exact(&self, filename: &str) -> Result<Vec<DocumentMeta>, StoreError> {
        self.check_online(StoreOp::FindExact)?;
        let mut found = self.matching(|f| f == filename);
        found.truncate(2);

        Ok(found)
    }

    async fn count_with_prefix(&self, prefix: &str) -> Result<u64, StoreError> {
        self.check_online(StoreOp::CountWithPrefix)?;

        Ok(self.matching(|f| f.starts_with(prefix)).len() as u64)
    }

    async fn iterate_prefix(
        &self,
        prefix: &str,
    ) -> Result<BoxStream<'static, Result<DocumentMeta, StoreError>>, StoreError> {
        self.check_online(StoreOp::IteratePrefix)?;
        let found = self.matching(|f| f.starts_with(prefix));

        Ok(futures::stream::iter(found.into_iter().map(Ok)).boxed())
    }

    async fn open_content(&self, id: &DocumentId) -> Result<Content, StoreError> {
        self.check_online(StoreOp::OpenContent)?;
        let (content, upload_time) = self
            .lock()
            .get(id)
            .map(|d| (d.content.clone(), d.upload_time))
            .ok_or(StoreError::NotFound)?;

        Ok(Content::new(
            content.len() as u64,
            upload_time,
            futures::io::Cursor::new(content),
        ))
    }

    async fn delete_by_id(&self, id: &DocumentId) -> Result<(), StoreError> {
        self.check_online(StoreOp::DeleteById)?;
        self.lock().remove(id).ok_or(StoreError::NotFound)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_unordered::assert_eq_unordered;
    use futures::TryStreamExt as _;

    #[tokio::test]
    async fn prefix_queries() -> anyhow::Result<()> {
        let store = MemoryStore::with_files([("a/b.txt", "b"), ("a/c.txt", "c"), ("d.txt", "d")]);

        assert_eq!(3, store.count_with_prefix("").await?);
        assert_eq!(2, store.count_with_prefix("a/").await?);
        assert_eq!(0, store.count_with_prefix("d.txt/").await?);

        let names = store
            .iterate_prefix("a/")
            .await?
            .map_ok(|m| m.filename)
            .try_collect::<Vec<_>>()
            .await?;
        assert_eq_unordered!(vec!["a/b.txt".to_string(), "a/c.txt".to_string()], names);

        Ok(())
    }

    #[tokio::test]
    async fn find_exact_caps_results() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.add("dup", "1");
        store.add("dup", "2");
        store.add("dup", "3");

        assert_eq!(2, store.find_exact("dup").await?.len());
        assert!(store.find_exact("du").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn read_and_delete() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let id = store.add("hello.txt", "hello");

        let content = store.open_content(&id).await?;
        assert_eq!(5, content.size);
        assert_eq!(b"hello".to_vec(), content.read_all().await?);

        store.delete_by_id(&id).await?;
        assert!(!store.contains("hello.txt"));
        assert!(matches!(
            store.delete_by_id(&id).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.open_content(&id).await,
            Err(StoreError::NotFound)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn offline() -> anyhow::Result<()> {
        let store = MemoryStore::with_files([("a", "a")]);
        store.set_offline(true);
        assert!(matches!(
            store.count_with_prefix("").await,
            Err(StoreError::Unavailable)
        ));
        store.set_offline(false);
        assert_eq!(1, store.count_with_prefix("").await?);

        Ok(())
    }

    #[tokio::test]
    async fn fail_single_operation() -> anyhow::Result<()> {
        let store = MemoryStore::with_files([("a", "a")]);
        store.fail(StoreOp::DeleteById);

        let found = store.find_exact("a").await?;
        assert_eq!(1, found.len());
        assert!(matches!(
            store.delete_by_id(&found[0].id).await,
            Err(StoreError::Unavailable)
        ));
        assert!(store.contains("a"));

        store.recover(StoreOp::DeleteById);
        store.delete_by_id(&found[0].id).await?;
        assert!(store.is_empty());

        Ok(())
    }
}
