use crate::config::MountConfig;
use crate::fs::fuse::{self, FuseHandle};
use crate::gridfs::GridFs;
use anyhow::Context as _;
use mgfs_storage::DocumentStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An active mount of a bucket.
///
/// The filesystem stays mounted as long as this object is alive. Call
/// [MountSession::unmount] to unmount and wait for the FUSE loop to
/// end; dropping the session unmounts without waiting.
pub struct MountSession {
    mountpoint: PathBuf,
    handle: Option<FuseHandle>,
}

impl MountSession {
    /// Mount the store at `mountpoint`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn mount(
        store: Arc<dyn DocumentStore>,
        mountpoint: &Path,
        config: &MountConfig,
    ) -> anyhow::Result<Self> {
        let handle = fuse::export(GridFs::new(store), mountpoint, config)
            .with_context(|| format!("failed to mount {}", mountpoint.display()))?;
        log::info!("Mounted: {}", mountpoint.display());

        Ok(Self {
            mountpoint: mountpoint.to_path_buf(),
            handle: Some(handle),
        })
    }

    /// Wait until the filesystem is unmounted by someone else, with
    /// `fusermount -u` or `umount`.
    pub async fn wait_for_external_unmount(&self) {
        if let Some(handle) = &self.handle {
            handle.wait_for_end().await;
        }
    }

    /// Unmount the filesystem and wait for the FUSE loop to stop.
    pub async fn unmount(mut self) -> anyhow::Result<()> {
        if let Some(handle) = self.handle.take() {
            log::info!("Unmounting: {}", self.mountpoint.display());
            handle.join().await?;
        }

        Ok(())
    }
}

impl Drop for MountSession {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            log::info!("Unmounting: {}", self.mountpoint.display());
            drop(handle);
        }
    }
}
