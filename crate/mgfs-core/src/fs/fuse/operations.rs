//! FUSE operations, on top of [GridFs].
//!
//! Callbacks from [super::interface] land here, translated from
//! inodes to virtual paths and back.

use super::error::FuseError;
use super::handles::{self, FHRegistry, FileHandle};
use super::inodes::{InodeTable, ROOT_INODE, UNKNOWN_INODE};
use crate::gridfs::GridFs;
use crate::node::{Attr, DirectoryNode, Node, NodeKind};
use mgfs_types::VirtualPath;
use nix::errno::Errno;
use std::ffi::OsString;

pub(crate) struct InnerMgfs {
    fs: GridFs,
    inodes: InodeTable,
    handles: FHRegistry,
}

/// An entry to add to a readdir reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ReplyEntry {
    pub(crate) ino: u64,
    pub(crate) offset: i64,
    pub(crate) kind: fuser::FileType,
    pub(crate) name: String,
}

impl InnerMgfs {
    pub(crate) fn new(fs: GridFs) -> Self {
        Self {
            fs,
            inodes: InodeTable::new(),
            handles: FHRegistry::new(),
        }
    }

    pub(crate) async fn lookup(
        &self,
        parent: u64,
        name: OsString,
    ) -> Result<fuser::FileAttr, FuseError> {
        let name = name.to_str().ok_or(FuseError::Utf8)?;
        let parent = self.dir_at(parent).await?;
        let node = self.fs.lookup(&Node::Dir(parent), name).await?;
        let ino = self.inodes.lookup(&node.path()).await;

        Ok(build_attr(ino, &self.fs.attr(&node)))
    }

    pub(crate) async fn forget(&self, ino: u64, nlookup: u64) {
        self.inodes.forget(ino, nlookup).await;
    }

    pub(crate) async fn getattr(&self, ino: u64) -> Result<fuser::FileAttr, FuseError> {
        let node = self.node(ino).await?;

        Ok(build_attr(ino, &self.fs.attr(&node)))
    }

    pub(crate) async fn open(&self, ino: u64, flags: i32) -> Result<(u64, u32), FuseError> {
        handles::check_read_only(flags)?;
        let file = match self.node(ino).await? {
            Node::File(file) => file,
            Node::Dir(_) => return Err(Errno::EISDIR.into()),
        };
        let data = self.fs.read_all(&file).await?;
        log::debug!("Read {} bytes from {}", data.len(), file.path());
        let fh = self.handles.add(ino, FileHandle::File(data)).await;

        Ok((fh, 0))
    }

    pub(crate) async fn read(
        &self,
        fh: u64,
        ino: u64,
        offset: i64,
        size: u32,
    ) -> Result<Vec<u8>, FuseError> {
        let handle = self.handles.get_or_err(fh, ino).await?;
        let data = match &*handle {
            FileHandle::File(data) => data,
            FileHandle::Dir(_) => return Err(Errno::EISDIR.into()),
        };
        if offset < 0 {
            return Err(Errno::EINVAL.into());
        }
        let start = (offset as usize).min(data.len());
        let end = start.saturating_add(size as usize).min(data.len());

        Ok(data[start..end].to_vec())
    }

    pub(crate) async fn release(&self, fh: u64) -> Result<(), FuseError> {
        self.handles.remove(fh).await;

        Ok(())
    }

    pub(crate) async fn opendir(&self, ino: u64) -> Result<u64, FuseError> {
        let dir = match self.node(ino).await? {
            Node::Dir(dir) => dir,
            Node::File(_) => return Err(Errno::ENOTDIR.into()),
        };
        let entries = self.fs.read_dir_all(&dir).await?;
        let fh = self.handles.add(ino, FileHandle::Dir(entries)).await;

        Ok(fh)
    }

    pub(crate) async fn releasedir(&self, fh: u64) -> Result<(), FuseError> {
        self.handles.remove(fh).await;

        Ok(())
    }

    /// Return the entries of an open directory, starting after
    /// `offset`.
    ///
    /// The offset of an entry is its position, starting at 1, with
    /// `.` and `..` first. Entries the kernel hasn't looked up are
    /// reported with [UNKNOWN_INODE].
    pub(crate) async fn readdir(
        &self,
        fh: u64,
        ino: u64,
        offset: i64,
    ) -> Result<Vec<ReplyEntry>, FuseError> {
        let handle = self.handles.get_or_err(fh, ino).await?;
        let entries = match &*handle {
            FileHandle::Dir(entries) => entries,
            FileHandle::File(_) => return Err(Errno::ENOTDIR.into()),
        };
        let dir = self.inodes.path(ino).await;
        let parent = match dir.as_ref().and_then(|p| p.parent()) {
            Some(parent) => self.known_inode(&parent).await,
            None => ROOT_INODE,
        };

        let all = [(".", NodeKind::Directory), ("..", NodeKind::Directory)]
            .into_iter()
            .chain(entries.iter().map(|e| (e.name.as_str(), e.kind)));
        let mut reply = Vec::new();
        for (i, (name, kind)) in all.enumerate().skip(offset.max(0) as usize) {
            let entry_ino = match i {
                0 => ino,
                1 => parent,
                _ => match dir.as_ref().map(|d| d.join(name)) {
                    Some(Ok(path)) => self.known_inode(&path).await,
                    _ => UNKNOWN_INODE,
                },
            };
            reply.push(ReplyEntry {
                ino: entry_ino,
                offset: (i + 1) as i64,
                kind: file_type(kind),
                name: name.to_string(),
            });
        }

        Ok(reply)
    }

    pub(crate) async fn unlink(&self, parent: u64, name: OsString) -> Result<(), FuseError> {
        let name = name.to_str().ok_or(FuseError::Utf8)?;
        let dir = self.dir_at(parent).await?;
        self.fs.remove(&dir, name).await?;

        Ok(())
    }

    /// Directories only exist as long as they contain files, so they
    /// can't be removed on their own.
    pub(crate) async fn rmdir(&self, parent: u64, name: OsString) -> Result<(), FuseError> {
        log::debug!("rmdir({parent}, {name:?}) unsupported");

        Err(Errno::ENOENT.into())
    }

    /// Resolve an inode, querying the store.
    async fn node(&self, ino: u64) -> Result<Node, FuseError> {
        let path = self.path(ino).await?;

        Ok(self.fs.node_at(&path).await?)
    }

    /// Return the directory at `ino`, without checking the store.
    ///
    /// Lookups and removals from a path that isn't a directory find
    /// nothing, so there is no need to check.
    async fn dir_at(&self, ino: u64) -> Result<DirectoryNode, FuseError> {
        Ok(DirectoryNode::at(self.path(ino).await?))
    }

    async fn known_inode(&self, path: &VirtualPath) -> u64 {
        self.inodes.find(path).await.unwrap_or(UNKNOWN_INODE)
    }

    async fn path(&self, ino: u64) -> Result<VirtualPath, FuseError> {
        self.inodes
            .path(ino)
            .await
            .ok_or(FuseError::Errno(nix::libc::ENOENT))
    }
}

fn file_type(kind: NodeKind) -> fuser::FileType {
    match kind {
        NodeKind::Directory => fuser::FileType::Directory,
        NodeKind::File => fuser::FileType::RegularFile,
    }
}

fn build_attr(ino: u64, attr: &Attr) -> fuser::FileAttr {
    fuser::FileAttr {
        ino,
        size: attr.size,
        blocks: attr.size.div_ceil(512),
        atime: attr.atime,
        mtime: attr.mtime,
        ctime: attr.ctime,
        crtime: attr.ctime,
        kind: file_type(attr.kind),
        perm: attr.perm,
        nlink: match attr.kind {
            NodeKind::Directory => 2,
            NodeKind::File => 1,
        },
        uid: attr.uid,
        gid: attr.gid,
        rdev: 0,
        blksize: 512,
        flags: 0, // macOS only
    }
}
