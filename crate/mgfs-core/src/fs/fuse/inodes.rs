//! Inode numbers for virtual paths.
//!
//! The kernel addresses nodes by inode, but nodes here are only paths
//! into the bucket. This table gives each path seen by the kernel a
//! stable number until the kernel forgets it. It only stores names:
//! what a path is gets resolved again on every call.

use mgfs_types::VirtualPath;
use std::collections::HashMap;
use tokio::sync::Mutex;

pub(crate) const ROOT_INODE: u64 = fuser::FUSE_ROOT_ID;

/// Inode reported by readdir for entries the kernel hasn't looked up.
///
/// Listings don't allocate inodes, as the kernel never forgets inodes
/// it only saw in a listing.
pub(crate) const UNKNOWN_INODE: u64 = 0xffff_ffff;

pub(crate) struct InodeTable {
    state: Mutex<InodeTableState>,
}

struct InodeTableState {
    /// Path and kernel lookup count, by inode.
    by_ino: HashMap<u64, (VirtualPath, u64)>,
    by_path: HashMap<VirtualPath, u64>,
    next: u64,
}

impl InodeTable {
    pub(crate) fn new() -> Self {
        let mut by_ino = HashMap::new();
        let mut by_path = HashMap::new();
        by_ino.insert(ROOT_INODE, (VirtualPath::root(), 0));
        by_path.insert(VirtualPath::root(), ROOT_INODE);

        Self {
            state: Mutex::new(InodeTableState {
                by_ino,
                by_path,
                next: ROOT_INODE + 1,
            }),
        }
    }

    /// Return the path of the given inode.
    pub(crate) async fn path(&self, ino: u64) -> Option<VirtualPath> {
        self.state
            .lock()
            .await
            .by_ino
            .get(&ino)
            .map(|(path, _)| path.clone())
    }

    /// Return the inode of a path, if the kernel knows it.
    pub(crate) async fn find(&self, path: &VirtualPath) -> Option<u64> {
        self.state.lock().await.by_path.get(path).copied()
    }

    /// Return the inode of a path and count one kernel lookup.
    pub(crate) async fn lookup(&self, path: &VirtualPath) -> u64 {
        let mut state = self.state.lock().await;
        let ino = state.assign(path);
        if let Some((_, count)) = state.by_ino.get_mut(&ino) {
            *count += 1;
        }

        ino
    }

    /// The kernel dropped `nlookup` references to `ino`.
    ///
    /// The inode is released once no references are left. The root is
    /// never released.
    pub(crate) async fn forget(&self, ino: u64, nlookup: u64) {
        if ino == ROOT_INODE {
            return;
        }
        let mut state = self.state.lock().await;
        let Some((_, count)) = state.by_ino.get_mut(&ino) else {
            return;
        };
        *count = count.saturating_sub(nlookup);
        if *count == 0
            && let Some((path, _)) = state.by_ino.remove(&ino)
        {
            state.by_path.remove(&path);
        }
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.state.lock().await.by_ino.len()
    }
}

impl InodeTableState {
    fn assign(&mut self, path: &VirtualPath) -> u64 {
        if let Some(ino) = self.by_path.get(path) {
            return *ino;
        }
        let ino = self.next;
        self.next += 1;
        self.by_ino.insert(ino, (path.clone(), 0));
        self.by_path.insert(path.clone(), ino);

        ino
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn root() -> anyhow::Result<()> {
        let table = InodeTable::new();
        assert_eq!(Some(VirtualPath::root()), table.path(ROOT_INODE).await);
        assert_eq!(Some(ROOT_INODE), table.find(&VirtualPath::root()).await);

        table.forget(ROOT_INODE, 100).await;
        assert_eq!(Some(VirtualPath::root()), table.path(ROOT_INODE).await);

        Ok(())
    }

    #[tokio::test]
    async fn stable_inodes() -> anyhow::Result<()> {
        let table = InodeTable::new();
        let a = VirtualPath::parse("a")?;
        let ab = VirtualPath::parse("a/b")?;

        assert_eq!(None, table.find(&a).await);
        let ino_a = table.lookup(&a).await;
        let ino_ab = table.lookup(&ab).await;
        assert_ne!(ino_a, ino_ab);
        assert_ne!(ROOT_INODE, ino_a);
        assert_eq!(ino_a, table.lookup(&a).await);
        assert_eq!(Some(ino_a), table.find(&a).await);
        assert_eq!(Some(ab.clone()), table.path(ino_ab).await);
        assert_eq!(None, table.path(9999).await);
        assert_eq!(3, table.len().await);

        Ok(())
    }

    #[tokio::test]
    async fn forget_releases_after_last_lookup() -> anyhow::Result<()> {
        let table = InodeTable::new();
        let a = VirtualPath::parse("a")?;

        let ino = table.lookup(&a).await;
        table.lookup(&a).await;
        table.forget(ino, 1).await;
        assert_eq!(Some(a.clone()), table.path(ino).await);
        table.forget(ino, 1).await;
        assert_eq!(None, table.path(ino).await);
        assert_eq!(None, table.find(&a).await);
        assert_eq!(1, table.len().await);

        let new_ino = table.lookup(&a).await;
        assert_ne!(ino, new_ino);

        Ok(())
    }
}
