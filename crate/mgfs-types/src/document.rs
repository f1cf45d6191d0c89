use crate::time::UnixTime;
use std::fmt;

/// Identifier of a document in the bucket.
///
/// This is a 12-byte object id, unique within the bucket.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentId(pub [u8; 12]);

impl DocumentId {
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

impl From<[u8; 12]> for DocumentId {
    fn from(value: [u8; 12]) -> Self {
        DocumentId(value)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0 {
            write!(f, "{b:02x}")?;
        }

        Ok(())
    }
}

impl fmt::Debug for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DocumentId({self})")
    }
}

/// Metadata of a stored document, as reported by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentMeta {
    pub id: DocumentId,

    /// Full virtual path of the document, `/`-separated, relative
    /// to the bucket root.
    pub filename: String,

    /// Content length, in bytes.
    pub size: u64,

    /// Creation time. Documents are immutable, so this is also the
    /// modification time.
    pub upload_time: UnixTime,
}
