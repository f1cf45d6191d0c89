//! Filesystem operations over a document bucket.

use crate::CoreError;
use crate::node::{Attr, DirEntry, DirectoryNode, FileNode, Node};
use mgfs_storage::DocumentStore;
use mgfs_types::VirtualPath;
use std::sync::Arc;

/// The operations a kernel bridge needs, over a bucket.
///
/// This holds no state besides the store; every call queries the
/// store again.
#[derive(Clone)]
pub struct GridFs {
    store: Arc<dyn DocumentStore>,
}

impl GridFs {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn root(&self) -> DirectoryNode {
        DirectoryNode::root()
    }

    pub fn attr(&self, node: &Node) -> Attr {
        node.attr()
    }

    pub async fn lookup(&self, parent: &Node, name: &str) -> Result<Node, CoreError> {
        match parent {
            Node::Dir(dir) => dir.lookup(self.store.as_ref(), name).await,
            Node::File(file) => file.lookup(name),
        }
    }

    pub async fn read_dir_all(&self, dir: &DirectoryNode) -> Result<Vec<DirEntry>, CoreError> {
        dir.list(self.store.as_ref()).await
    }

    pub async fn read_all(&self, file: &FileNode) -> Result<Vec<u8>, CoreError> {
        file.read_all(self.store.as_ref()).await
    }

    pub async fn remove(&self, dir: &DirectoryNode, name: &str) -> Result<(), CoreError> {
        dir.remove(self.store.as_ref(), name).await
    }

    /// Resolve a full path, from the root.
    pub async fn node_at(&self, path: &VirtualPath) -> Result<Node, CoreError> {
        match path.parent() {
            None => Ok(Node::Dir(self.root())),
            Some(parent) => {
                DirectoryNode::at(parent)
                    .lookup(self.store.as_ref(), path.name())
                    .await
            }
        }
    }
}
