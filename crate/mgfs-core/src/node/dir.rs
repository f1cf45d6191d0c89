use super::{Attr, DIR_MODE, DirEntry, FileNode, Node, NodeKind};
use crate::CoreError;
use crate::resolver::{NodeResolver, Resolution};
use futures::TryStreamExt as _;
use mgfs_storage::DocumentStore;
use mgfs_types::{UnixTime, VirtualPath};
use std::collections::HashMap;

/// A directory implied by the filenames in the bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryNode {
    path: VirtualPath,
    mtime: UnixTime,
}

impl DirectoryNode {
    pub fn root() -> Self {
        Self::at(VirtualPath::root())
    }

    /// A directory at the given path.
    ///
    /// Directories have no time of their own; their mtime is the
    /// epoch.
    pub fn at(path: VirtualPath) -> Self {
        Self {
            path,
            mtime: UnixTime::ZERO,
        }
    }

    pub fn path(&self) -> &VirtualPath {
        &self.path
    }

    pub fn attr(&self) -> Attr {
        Attr::new(
            NodeKind::Directory,
            DIR_MODE,
            0,
            self.mtime,
            self.mtime.as_system_time(),
        )
    }

    /// Look up a child of this directory.
    pub async fn lookup(&self, store: &dyn DocumentStore, name: &str) -> Result<Node, CoreError> {
        let path = self.path.join(name)?;
        match NodeResolver::new(store).resolve(&self.path, name).await? {
            Resolution::File(meta) => Ok(Node::File(FileNode::new(path, meta))),
            Resolution::Directory => Ok(Node::Dir(DirectoryNode::at(path))),
            Resolution::NotFound => Err(CoreError::NotFound),
        }
    }

    /// List the immediate children of this directory.
    ///
    /// Each name is reported once. A name that is both a file and the
    /// prefix of other files is reported as a directory. The order of
    /// the entries is unspecified.
    pub async fn list(&self, store: &dyn DocumentStore) -> Result<Vec<DirEntry>, CoreError> {
        let prefix = self.path.children_prefix();
        let mut children: HashMap<String, NodeKind> = HashMap::new();
        let mut docs = store.iterate_prefix(&prefix).await?;
        while let Some(meta) = docs.try_next().await? {
            let Some(rest) = meta.filename.strip_prefix(prefix.as_str()) else {
                log::warn!(
                    "{}: store returned {:?}, which is outside of the directory",
                    self.path,
                    meta.filename
                );
                continue;
            };
            let (name, kind) = match rest.split_once('/') {
                Some((name, _)) => (name, NodeKind::Directory),
                None => (rest, NodeKind::File),
            };
            if name.is_empty() {
                log::debug!("{}: ignoring {:?}, empty segment", self.path, meta.filename);
                continue;
            }
            children
                .entry(name.to_string())
                .and_modify(|k| {
                    if kind == NodeKind::Directory {
                        *k = NodeKind::Directory;
                    }
                })
                .or_insert(kind);
        }

        Ok(children
            .into_iter()
            .map(|(name, kind)| DirEntry { name, kind })
            .collect())
    }

    /// Remove the file `name` from this directory.
    ///
    /// Directories can't be removed; asking for it is reported as
    /// [CoreError::NotFound].
    pub async fn remove(&self, store: &dyn DocumentStore, name: &str) -> Result<(), CoreError> {
        let path = self.path.join(name)?;
        let meta = NodeResolver::new(store)
            .find_file(&path)
            .await?
            .ok_or(CoreError::NotFound)?;

        log::debug!("Deleting {path} ({})", meta.id);
        store.delete_by_id(&meta.id).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_unordered::assert_eq_unordered;
    use mgfs_storage::testing::{MemoryStore, StoreOp};

    fn fixture() -> MemoryStore {
        MemoryStore::with_files([("a/b.txt", "b"), ("a/c.txt", "c"), ("d.txt", "d")])
    }

    #[tokio::test]
    async fn list_root() -> anyhow::Result<()> {
        let store = fixture();

        assert_eq_unordered!(
            vec![
                DirEntry::new("a", NodeKind::Directory),
                DirEntry::new("d.txt", NodeKind::File),
            ],
            DirectoryNode::root().list(&store).await?
        );

        Ok(())
    }

    #[tokio::test]
    async fn list_subdir() -> anyhow::Result<()> {
        let store = fixture();
        let a = DirectoryNode::at(VirtualPath::parse("a")?);

        assert_eq_unordered!(
            vec![
                DirEntry::new("b.txt", NodeKind::File),
                DirEntry::new("c.txt", NodeKind::File),
            ],
            a.list(&store).await?
        );

        Ok(())
    }

    #[tokio::test]
    async fn list_deep_tree() -> anyhow::Result<()> {
        let store = MemoryStore::with_files([
            ("x/y/z/1", "1"),
            ("x/y/2", "2"),
            ("x/y/z/3", "3"),
            ("x/4", "4"),
            ("xy/5", "5"),
        ]);

        assert_eq_unordered!(
            vec![
                DirEntry::new("x", NodeKind::Directory),
                DirEntry::new("xy", NodeKind::Directory),
            ],
            DirectoryNode::root().list(&store).await?
        );
        assert_eq_unordered!(
            vec![
                DirEntry::new("z", NodeKind::Directory),
                DirEntry::new("2", NodeKind::File),
            ],
            DirectoryNode::at(VirtualPath::parse("x/y")?)
                .list(&store)
                .await?
        );

        Ok(())
    }

    #[tokio::test]
    async fn list_reports_directory_over_file() -> anyhow::Result<()> {
        let store = MemoryStore::with_files([("x", "file"), ("x/y", "nested")]);

        assert_eq!(
            vec![DirEntry::new("x", NodeKind::Directory)],
            DirectoryNode::root().list(&store).await?
        );

        Ok(())
    }

    #[tokio::test]
    async fn list_skips_empty_segments() -> anyhow::Result<()> {
        let store = MemoryStore::with_files([("/abs", "1"), ("ok", "2")]);

        assert_eq!(
            vec![DirEntry::new("ok", NodeKind::File)],
            DirectoryNode::root().list(&store).await?
        );

        Ok(())
    }

    #[tokio::test]
    async fn list_fails_when_offline() -> anyhow::Result<()> {
        let store = fixture();
        store.set_offline(true);

        assert!(matches!(
            DirectoryNode::root().list(&store).await,
            Err(CoreError::Backend(_))
        ));

        Ok(())
    }

    #[tokio::test]
    async fn lookup() -> anyhow::Result<()> {
        let store = fixture();
        let root = DirectoryNode::root();

        match root.lookup(&store, "a").await? {
            Node::Dir(dir) => assert_eq!(&VirtualPath::parse("a")?, dir.path()),
            other => panic!("unexpected {other:?}"),
        }
        match root.lookup(&store, "d.txt").await? {
            Node::File(file) => assert_eq!("d.txt", file.name()),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            root.lookup(&store, "zzz").await,
            Err(CoreError::NotFound)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn remove_file_once() -> anyhow::Result<()> {
        let store = fixture();
        let root = DirectoryNode::root();

        root.remove(&store, "d.txt").await?;
        assert!(!store.contains("d.txt"));
        assert!(matches!(
            root.remove(&store, "d.txt").await,
            Err(CoreError::NotFound)
        ));

        Ok(())
    }

    #[tokio::test]
    async fn remove_in_subdir() -> anyhow::Result<()> {
        let store = fixture();
        let a = DirectoryNode::at(VirtualPath::parse("a")?);

        a.remove(&store, "b.txt").await?;
        assert!(!store.contains("a/b.txt"));
        assert!(store.contains("a/c.txt"));

        Ok(())
    }

    #[tokio::test]
    async fn remove_directory_is_not_found() -> anyhow::Result<()> {
        let store = fixture();

        assert!(matches!(
            DirectoryNode::root().remove(&store, "a").await,
            Err(CoreError::NotFound)
        ));
        assert!(store.contains("a/b.txt"));
        assert!(store.contains("a/c.txt"));

        Ok(())
    }

    #[tokio::test]
    async fn remove_reports_failed_delete() -> anyhow::Result<()> {
        let store = fixture();
        store.fail(StoreOp::DeleteById);

        assert!(matches!(
            DirectoryNode::root().remove(&store, "d.txt").await,
            Err(CoreError::Backend(_))
        ));
        assert!(store.contains("d.txt"));

        Ok(())
    }

    #[tokio::test]
    async fn remove_duplicated_name_deletes_nothing() -> anyhow::Result<()> {
        let store = fixture();
        store.add("d.txt", "other");

        assert!(matches!(
            DirectoryNode::root().remove(&store, "d.txt").await,
            Err(CoreError::StoreInconsistency { count: 2, .. })
        ));
        assert_eq!(4, store.len());

        Ok(())
    }

    #[tokio::test]
    async fn attr() -> anyhow::Result<()> {
        let attr = DirectoryNode::root().attr();
        assert_eq!(NodeKind::Directory, attr.kind);
        assert_eq!(DIR_MODE, attr.perm);
        assert_eq!(std::time::SystemTime::UNIX_EPOCH, attr.mtime);
        assert_eq!(nix::unistd::geteuid().as_raw(), attr.uid);

        Ok(())
    }
}
