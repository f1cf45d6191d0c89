//! Filesystem nodes derived from the bucket.
//!
//! Nodes are short-lived views built on each lookup; they cache
//! nothing but what the lookup returned.

mod dir;
mod file;

pub use dir::DirectoryNode;
pub use file::FileNode;

use mgfs_types::{UnixTime, VirtualPath};
use std::time::SystemTime;

/// Permissions of directories: read and list for the owner.
pub const DIR_MODE: u16 = 0o500;

/// Permissions of files: read-only for the owner.
pub const FILE_MODE: u16 = 0o400;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Directory,
    File,
}

/// A resolved directory or file.
#[derive(Debug, Clone)]
pub enum Node {
    Dir(DirectoryNode),
    File(FileNode),
}

impl Node {
    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Dir(_) => NodeKind::Directory,
            Node::File(_) => NodeKind::File,
        }
    }

    pub fn path(&self) -> VirtualPath {
        match self {
            Node::Dir(dir) => dir.path().clone(),
            Node::File(file) => file.path(),
        }
    }

    pub fn attr(&self) -> Attr {
        match self {
            Node::Dir(dir) => dir.attr(),
            Node::File(file) => file.attr(),
        }
    }
}

/// An entry returned when listing a directory.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DirEntry {
    pub name: String,
    pub kind: NodeKind,
}

impl DirEntry {
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// POSIX-style metadata of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attr {
    pub kind: NodeKind,
    pub size: u64,
    pub perm: u16,
    pub uid: u32,
    pub gid: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl Attr {
    fn new(kind: NodeKind, perm: u16, size: u64, mtime: UnixTime, atime: SystemTime) -> Self {
        // The bucket stores no owner; files belong to whoever mounted it.
        let mtime = mtime.as_system_time();
        Self {
            kind,
            size,
            perm,
            uid: nix::unistd::geteuid().as_raw(),
            gid: nix::unistd::getegid().as_raw(),
            atime,
            mtime,
            ctime: mtime,
        }
    }
}
