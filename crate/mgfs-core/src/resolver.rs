//! Decide what a name in a directory refers to.
//!
//! The bucket has no notion of directories: a path is a file if a
//! document has exactly that filename, and a directory if some
//! document's filename continues past it with a `/`. When both are
//! true, the file wins.

use crate::CoreError;
use mgfs_storage::DocumentStore;
use mgfs_types::{DocumentMeta, VirtualPath};

/// What a child name resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    File(DocumentMeta),
    Directory,
    NotFound,
}

/// Resolves names against the store. Holds no state.
#[derive(Clone, Copy)]
pub struct NodeResolver<'a> {
    store: &'a dyn DocumentStore,
}

impl<'a> NodeResolver<'a> {
    pub fn new(store: &'a dyn DocumentStore) -> Self {
        Self { store }
    }

    /// Resolve `name` within the directory `parent`.
    pub async fn resolve(
        &self,
        parent: &VirtualPath,
        name: &str,
    ) -> Result<Resolution, CoreError> {
        let path = parent.join(name)?;
        if let Some(meta) = self.find_file(&path).await? {
            return Ok(Resolution::File(meta));
        }

        let count = self.store.count_with_prefix(&path.children_prefix()).await?;
        if count > 0 {
            return Ok(Resolution::Directory);
        }

        Ok(Resolution::NotFound)
    }

    /// Find the document stored exactly at `path`, if any.
    pub async fn find_file(&self, path: &VirtualPath) -> Result<Option<DocumentMeta>, CoreError> {
        if path.is_root() {
            return Ok(None);
        }
        let filename = path.as_store_key();
        let mut found = self.store.find_exact(filename).await?;
        match found.len() {
            0 => Ok(None),
            1 => Ok(found.pop()),
            count => {
                log::error!(
                    "Bucket is inconsistent: {count} or more documents are named {filename:?}: {}",
                    found
                        .iter()
                        .map(|m| m.id.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                );

                Err(CoreError::StoreInconsistency {
                    filename: filename.to_string(),
                    count,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mgfs_storage::testing::{MemoryStore, StoreOp};

    fn fixture() -> MemoryStore {
        MemoryStore::with_files([("a/b.txt", "b"), ("a/c.txt", "cc"), ("d.txt", "ddd")])
    }

    #[tokio::test]
    async fn resolve_in_root() -> anyhow::Result<()> {
        let store = fixture();
        let resolver = NodeResolver::new(&store);
        let root = VirtualPath::root();

        assert_eq!(Resolution::Directory, resolver.resolve(&root, "a").await?);
        assert_eq!(Resolution::NotFound, resolver.resolve(&root, "zzz").await?);
        match resolver.resolve(&root, "d.txt").await? {
            Resolution::File(meta) => {
                assert_eq!("d.txt", meta.filename);
                assert_eq!(3, meta.size);
            }
            other => panic!("unexpected {other:?}"),
        }

        Ok(())
    }

    #[tokio::test]
    async fn resolve_in_subdir() -> anyhow::Result<()> {
        let store = fixture();
        let resolver = NodeResolver::new(&store);
        let a = VirtualPath::parse("a")?;

        assert!(matches!(
            resolver.resolve(&a, "c.txt").await?,
            Resolution::File(DocumentMeta { size: 2, .. })
        ));
        assert_eq!(Resolution::NotFound, resolver.resolve(&a, "d.txt").await?);

        Ok(())
    }

    #[tokio::test]
    async fn prefix_must_end_at_separator() -> anyhow::Result<()> {
        let store = MemoryStore::with_files([("abc/d", "d")]);
        let resolver = NodeResolver::new(&store);

        assert_eq!(
            Resolution::NotFound,
            resolver.resolve(&VirtualPath::root(), "ab").await?
        );

        Ok(())
    }

    #[tokio::test]
    async fn file_wins_over_directory() -> anyhow::Result<()> {
        let store = MemoryStore::with_files([("x", "file"), ("x/y", "nested")]);
        let resolver = NodeResolver::new(&store);

        assert!(matches!(
            resolver.resolve(&VirtualPath::root(), "x").await?,
            Resolution::File(_)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn duplicate_names_are_reported() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        store.add("dup.txt", "1");
        store.add("dup.txt", "2");
        let resolver = NodeResolver::new(&store);

        assert!(matches!(
            resolver.resolve(&VirtualPath::root(), "dup.txt").await,
            Err(CoreError::StoreInconsistency { count: 2, .. })
        ));

        Ok(())
    }

    #[tokio::test]
    async fn invalid_name() -> anyhow::Result<()> {
        let store = fixture();
        let resolver = NodeResolver::new(&store);

        assert!(matches!(
            resolver.resolve(&VirtualPath::root(), "a/b.txt").await,
            Err(CoreError::InvalidPath(_))
        ));
        assert!(matches!(
            resolver.resolve(&VirtualPath::root(), "").await,
            Err(CoreError::InvalidPath(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn backend_errors_are_not_hidden() -> anyhow::Result<()> {
        let store = fixture();
        store.set_offline(true);
        let resolver = NodeResolver::new(&store);

        assert!(matches!(
            resolver.resolve(&VirtualPath::root(), "zzz").await,
            Err(CoreError::Backend(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn directory_check_failure_is_not_hidden() -> anyhow::Result<()> {
        let store = fixture();
        store.fail(StoreOp::CountWithPrefix);
        let resolver = NodeResolver::new(&store);
        let root = VirtualPath::root();

        // The exact match succeeds; only the directory check fails.
        assert!(matches!(
            resolver.resolve(&root, "d.txt").await?,
            Resolution::File(_)
        ));
        assert!(matches!(
            resolver.resolve(&root, "a").await,
            Err(CoreError::Backend(_))
        ));
        assert!(matches!(
            resolver.resolve(&root, "zzz").await,
            Err(CoreError::Backend(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn repeated_resolution_is_stable() -> anyhow::Result<()> {
        let store = fixture();
        let resolver = NodeResolver::new(&store);
        let root = VirtualPath::root();

        let first = resolver.resolve(&root, "d.txt").await?;
        assert_eq!(first, resolver.resolve(&root, "d.txt").await?);

        Ok(())
    }
}
