//! Open file and directory handles.
//!
//! A handle keeps what was read from the store when the file or
//! directory was opened, until it is released.

use super::error::FuseError;
use crate::node::DirEntry;
use nix::libc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

pub(crate) enum FileHandle {
    /// Whole content of a file.
    File(Vec<u8>),

    /// Entries of a directory.
    Dir(Vec<DirEntry>),
}

/// Keeps track of open file handles.
pub(crate) struct FHRegistry {
    state: Mutex<BTreeMap<u64, (u64, Arc<FileHandle>)>>,
}

impl FHRegistry {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(BTreeMap::new()),
        }
    }

    pub(crate) async fn add(&self, ino: u64, handle: FileHandle) -> u64 {
        let mut by_fh = self.state.lock().await;
        let fh = by_fh.last_key_value().map(|(k, _)| *k + 1).unwrap_or(1);
        by_fh.insert(fh, (ino, Arc::new(handle)));

        fh
    }

    /// Gets a handle, checking that it belongs to the given inode.
    pub(crate) async fn get_or_err(
        &self,
        fh: u64,
        expected_inode: u64,
    ) -> Result<Arc<FileHandle>, FuseError> {
        let by_fh = self.state.lock().await;
        let (ino, handle) = by_fh.get(&fh).ok_or(FuseError::Errno(libc::EBADF))?;
        if *ino != expected_inode {
            return Err(FuseError::Errno(libc::EBADF));
        }

        Ok(Arc::clone(handle))
    }

    /// Removes a file handle from the registry.
    pub(crate) async fn remove(&self, fh: u64) -> Option<Arc<FileHandle>> {
        self.state.lock().await.remove(&fh).map(|(_, h)| h)
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.state.lock().await.len()
    }
}

/// Fail unless `flags` asks for read-only access.
pub(crate) fn check_read_only(flags: i32) -> Result<(), FuseError> {
    let mode = flags & (libc::O_RDONLY | libc::O_WRONLY | libc::O_RDWR);
    if mode != libc::O_RDONLY || (flags & (libc::O_TRUNC | libc::O_APPEND)) != 0 {
        log::debug!("Rejecting open flags: mode={mode:o} (all flags= 0x{flags:x})");

        return Err(FuseError::Errno(libc::EROFS));
    }

    Ok(())
}
