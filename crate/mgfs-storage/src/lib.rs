//! Access to the document bucket backing the filesystem.

pub mod config;
mod error;
mod gridfs;
mod store;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::StoreConfig;
pub use error::StoreError;
pub use gridfs::GridFsStore;
pub use store::{Content, DocumentStore};
