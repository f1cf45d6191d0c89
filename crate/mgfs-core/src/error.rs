use mgfs_storage::StoreError;
use mgfs_types::PathError;

/// Errors reported by node operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error{"not found"}]
    NotFound,

    /// The bucket holds more than one document under the same name.
    #[error("bucket is inconsistent: {count} documents named {filename:?}")]
    StoreInconsistency { filename: String, count: usize },

    #[error("store error: {0}")]
    Backend(StoreError),
}

impl CoreError {
    /// Kind of I/O error to report this error as.
    pub fn io_kind(&self) -> std::io::ErrorKind {
        match self {
            CoreError::InvalidPath(_) => std::io::ErrorKind::InvalidInput,
            CoreError::NotFound => std::io::ErrorKind::NotFound,
            CoreError::StoreInconsistency { .. } => std::io::ErrorKind::Other,
            CoreError::Backend(_) => std::io::ErrorKind::Other,
        }
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => CoreError::NotFound,
            err => CoreError::Backend(err),
        }
    }
}
