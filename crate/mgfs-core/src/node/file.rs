use super::{Attr, FILE_MODE, Node, NodeKind};
use crate::CoreError;
use mgfs_storage::DocumentStore;
use mgfs_types::{DocumentId, DocumentMeta, VirtualPath};
use std::time::SystemTime;

/// A document of the bucket, seen as a regular file.
///
/// Only the metadata found at lookup is kept; content is fetched
/// from the store on every read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNode {
    path: VirtualPath,
    meta: DocumentMeta,
}

impl FileNode {
    pub fn new(path: VirtualPath, meta: DocumentMeta) -> Self {
        Self { path, meta }
    }

    pub fn id(&self) -> &DocumentId {
        &self.meta.id
    }

    /// Name of the file within its directory.
    pub fn name(&self) -> &str {
        self.path.name()
    }

    pub fn path(&self) -> VirtualPath {
        self.path.clone()
    }

    pub fn parent(&self) -> VirtualPath {
        self.path.parent().unwrap_or_default()
    }

    /// Metadata of the file. Access time is the time of the call.
    pub fn attr(&self) -> Attr {
        Attr::new(
            NodeKind::File,
            FILE_MODE,
            self.meta.size,
            self.meta.upload_time,
            SystemTime::now(),
        )
    }

    /// Files have no children.
    pub fn lookup(&self, _name: &str) -> Result<Node, CoreError> {
        Err(CoreError::NotFound)
    }

    /// Read the whole content of the file.
    pub async fn read_all(&self, store: &dyn DocumentStore) -> Result<Vec<u8>, CoreError> {
        let content = store.open_content(&self.meta.id).await?;

        Ok(content.read_all().await?)
    }
}
