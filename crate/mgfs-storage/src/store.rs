use crate::StoreError;
use futures::io::{AsyncRead, AsyncReadExt as _};
use futures::stream::BoxStream;
use mgfs_types::{DocumentId, DocumentMeta, UnixTime};
use std::pin::Pin;

/// Don't pre-allocate more than this when reading content; the
/// buffer still grows to the full size.
const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Queries the filesystem needs from a bucket of named documents.
///
/// Filenames are matched as plain strings; prefixes passed to these
/// methods are never interpreted as patterns.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return the documents whose filename is exactly `filename`.
    ///
    /// At most two documents are returned. More than one means that
    /// the bucket holds several documents under the same name.
    async fn find_exact(&self, filename: &str) -> Result<Vec<DocumentMeta>, StoreError>;

    /// Count documents whose filename starts with `prefix`.
    ///
    /// The empty prefix matches every document.
    async fn count_with_prefix(&self, prefix: &str) -> Result<u64, StoreError>;

    /// Stream the documents whose filename starts with `prefix`.
    ///
    /// The stream is finite and can't be restarted. Dropping it
    /// releases the underlying cursor.
    async fn iterate_prefix(
        &self,
        prefix: &str,
    ) -> Result<BoxStream<'static, Result<DocumentMeta, StoreError>>, StoreError>;

    /// Open the content of a document.
    ///
    /// Fails with [StoreError::NotFound] if no such document exists.
    async fn open_content(&self, id: &DocumentId) -> Result<Content, StoreError>;

    /// Delete a document and its content.
    ///
    /// Fails with [StoreError::NotFound] if no such document exists.
    async fn delete_by_id(&self, id: &DocumentId) -> Result<(), StoreError>;
}

/// Content of a document, open for reading.
///
/// The underlying stream is released when this is dropped.
pub struct Content {
    pub size: u64,
    pub upload_time: UnixTime,
    reader: Pin<Box<dyn AsyncRead + Send>>,
}

impl Content {
    pub fn new(size: u64, upload_time: UnixTime, reader: impl AsyncRead + Send + 'static) -> Self {
        Self {
            size,
            upload_time,
            reader: Box::pin(reader),
        }
    }

    /// Read the whole content into memory.
    pub async fn read_all(mut self) -> Result<Vec<u8>, StoreError> {
        let mut buf = Vec::with_capacity(self.size.min(MAX_PREALLOC) as usize);
        self.reader.read_to_end(&mut buf).await?;
        if buf.len() as u64 != self.size {
            log::warn!(
                "content length mismatch: expected {} bytes, got {}",
                self.size,
                buf.len()
            );
        }

        Ok(buf)
    }
}

impl std::fmt::Debug for Content {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Content")
            .field("size", &self.size)
            .field("upload_time", &self.upload_time)
            .finish_non_exhaustive()
    }
}
