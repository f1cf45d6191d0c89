//! FUSE interface layer - protocol handling and mount management
//!
//! This module contains the entry point for mounting the filesystem,
//! the fuser callbacks and the mount handle.

use super::operations::InnerMgfs;
use crate::config::MountConfig;
use crate::gridfs::GridFs;
use fuser::MountOption;
use nix::libc;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;

/// Replies are never cached by the kernel; the store is the only
/// source of truth.
const TTL: Duration = Duration::ZERO;

/// Mount the bucket as FUSE filesystem at the given mountpoint.
///
/// Must be called from within a tokio runtime, which will run the
/// filesystem operations.
pub fn export(
    fs: GridFs,
    mountpoint: &std::path::Path,
    config: &MountConfig,
) -> anyhow::Result<FuseHandle> {
    let (fs, ended) = MgfsFs::new(fs)?;
    let mut options = vec![
        MountOption::NoDev,
        MountOption::NoSuid,
        MountOption::NoExec,
        MountOption::NoAtime,
        MountOption::FSName(config.fs_name.clone()),
        MountOption::Subtype("mgfs".to_string()),
    ];
    if config.allow_other {
        options.push(MountOption::AllowOther);
        options.push(MountOption::AutoUnmount);
    }
    let bgsession = fuser::spawn_mount2(fs, mountpoint, &options)?;

    Ok(FuseHandle {
        inner: bgsession,
        ended,
    })
}

/// Handle that must be kept as long as the filesystem must
/// remain mounted.
///
/// To unmount the filesystem, call join() on the handle or drop it.
pub struct FuseHandle {
    inner: fuser::BackgroundSession,
    ended: watch::Receiver<bool>,
}

impl FuseHandle {
    /// Unmount the filesystem and wait for the fuse run loop to stop.
    pub async fn join(self) -> Result<(), tokio::task::JoinError> {
        let Self { inner, .. } = self;
        tokio::task::spawn_blocking(move || inner.join()).await
    }

    /// Wait until the fuse run loop stops on its own, which happens
    /// when the filesystem is unmounted from outside.
    pub async fn wait_for_end(&self) {
        wait_for_end(self.ended.clone()).await
    }
}

/// Resolves once the session sends its end or goes away.
async fn wait_for_end(mut ended: watch::Receiver<bool>) {
    // An error means the sender is gone, with the session.
    let _ = ended.wait_for(|ended| *ended).await;
}

struct MgfsFs {
    /// Handle on the main tokio runtime (multithreaded)
    handle: Handle,

    inner: Arc<InnerMgfs>,

    /// Set when the session ends. Dropped with the session.
    ended: watch::Sender<bool>,
}

impl MgfsFs {
    fn new(fs: GridFs) -> anyhow::Result<(Self, watch::Receiver<bool>)> {
        let (ended, ended_rx) = watch::channel(false);

        Ok((
            Self {
                handle: Handle::try_current()?,
                inner: Arc::new(InnerMgfs::new(fs)),
                ended,
            },
            ended_rx,
        ))
    }
}

// Code in this impl runs on a custom thread started by fuser. Use
// Handle::spawn to run async code. reply can moved into the spawn and
// captured there; there's no need for the function to return before
// filling in the reply.
impl fuser::Filesystem for MgfsFs {
    fn init(
        &mut self,
        _req: &fuser::Request<'_>,
        _config: &mut fuser::KernelConfig,
    ) -> Result<(), libc::c_int> {
        log::debug!("FUSE session started");
        Ok(())
    }

    fn destroy(&mut self) {
        log::debug!("FUSE session ended");
        self.ended.send_replace(true);
    }

    fn lookup(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: fuser::ReplyEntry,
    ) {
        let inner = Arc::clone(&self.inner);
        let name = name.to_owned();

        self.handle.spawn(async move {
            match inner.lookup(parent, name).await {
                Err(err) => reply.error(err.log_and_convert()),
                Ok(attr) => reply.entry(&TTL, &attr, 0),
            }
        });
    }

    fn forget(&mut self, _req: &fuser::Request<'_>, ino: u64, nlookup: u64) {
        let inner = Arc::clone(&self.inner);

        self.handle.spawn(async move {
            inner.forget(ino, nlookup).await;
        });
    }

    fn getattr(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: Option<u64>,
        reply: fuser::ReplyAttr,
    ) {
        let inner = Arc::clone(&self.inner);

        self.handle.spawn(async move {
            match inner.getattr(ino).await {
                Err(err) => reply.error(err.log_and_convert()),
                Ok(attr) => reply.attr(&TTL, &attr),
            }
        });
    }

    fn open(&mut self, _req: &fuser::Request<'_>, ino: u64, flags: i32, reply: fuser::ReplyOpen) {
        let inner = Arc::clone(&self.inner);

        self.handle.spawn(async move {
            match inner.open(ino, flags).await {
                Err(err) => reply.error(err.log_and_convert()),
                Ok((fh, flags)) => reply.opened(fh, flags),
            }
        });
    }

    fn release(
        &mut self,
        _req: &fuser::Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: fuser::ReplyEmpty,
    ) {
        let inner = Arc::clone(&self.inner);

        self.handle.spawn(async move {
            match inner.release(fh).await {
                Err(err) => reply.error(err.log_and_convert()),
                Ok(()) => reply.ok(),
            }
        });
    }

    fn read(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyData,
    ) {
        let inner = Arc::clone(&self.inner);

        self.handle.spawn(async move {
            match inner.read(fh, ino, offset, size).await {
                Err(err) => reply.error(err.log_and_convert()),
                Ok(data) => reply.data(&data),
            }
        });
    }

    fn write(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _fh: u64,
        _offset: i64,
        _data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: fuser::ReplyWrite,
    ) {
        log::debug!("write(ino: {ino:#x?}) on read-only filesystem");
        reply.error(libc::EROFS);
    }

    fn opendir(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        _flags: i32,
        reply: fuser::ReplyOpen,
    ) {
        let inner = Arc::clone(&self.inner);

        self.handle.spawn(async move {
            match inner.opendir(ino).await {
                Err(err) => reply.error(err.log_and_convert()),
                Ok(fh) => reply.opened(fh, 0),
            }
        });
    }

    fn readdir(
        &mut self,
        _req: &fuser::Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        mut reply: fuser::ReplyDirectory,
    ) {
        let inner = Arc::clone(&self.inner);

        self.handle.spawn(async move {
            match inner.readdir(fh, ino, offset).await {
                Err(err) => reply.error(err.log_and_convert()),
                Ok(entries) => {
                    for entry in entries {
                        if reply.add(entry.ino, entry.offset, entry.kind, &entry.name) {
                            // buffer full
                            break;
                        }
                    }
                    reply.ok();
                }
            }
        });
    }

    fn releasedir(
        &mut self,
        _req: &fuser::Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        reply: fuser::ReplyEmpty,
    ) {
        let inner = Arc::clone(&self.inner);

        self.handle.spawn(async move {
            match inner.releasedir(fh).await {
                Err(err) => reply.error(err.log_and_convert()),
                Ok(()) => reply.ok(),
            }
        });
    }

    fn statfs(&mut self, _req: &fuser::Request<'_>, _ino: u64, reply: fuser::ReplyStatfs) {
        reply.statfs(0, 0, 0, 0, 0, 512, 255, 0);
    }

    fn unlink(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: fuser::ReplyEmpty,
    ) {
        let inner = Arc::clone(&self.inner);
        let name = name.to_owned();

        // The deletion is sent to the store at most once, even if the
        // caller goes away before the reply.
        self.handle.spawn(async move {
            match inner.unlink(parent, name).await {
                Err(err) => reply.error(err.log_and_convert()),
                Ok(()) => reply.ok(),
            }
        });
    }

    fn rmdir(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        reply: fuser::ReplyEmpty,
    ) {
        let inner = Arc::clone(&self.inner);
        let name = name.to_owned();

        self.handle.spawn(async move {
            match inner.rmdir(parent, name).await {
                Err(err) => reply.error(err.log_and_convert()),
                Ok(()) => reply.ok(),
            }
        });
    }

    fn mkdir(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        _mode: u32,
        _umask: u32,
        reply: fuser::ReplyEntry,
    ) {
        log::debug!("mkdir(parent: {parent:#x?}, name: {name:?}) on read-only filesystem");
        reply.error(libc::EROFS);
    }

    fn create(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: fuser::ReplyCreate,
    ) {
        log::debug!("create(parent: {parent:#x?}, name: {name:?}) on read-only filesystem");
        reply.error(libc::EROFS);
    }

    fn rename(
        &mut self,
        _req: &fuser::Request<'_>,
        parent: u64,
        name: &std::ffi::OsStr,
        _newparent: u64,
        _newname: &std::ffi::OsStr,
        _flags: u32,
        reply: fuser::ReplyEmpty,
    ) {
        log::debug!("[Not Implemented] rename(parent: {parent:#x?}, name: {name:?})");
        reply.error(libc::ENOSYS);
    }
}
