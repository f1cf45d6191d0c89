/// Error returned by [crate::DocumentStore] implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("mongodb error: {0}")]
    Mongo(Box<mongodb::error::Error>), // a box to keep size in check

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error{"not found"}]
    NotFound,

    #[error("document {0} has an unsupported id, expected an ObjectId")]
    UnsupportedId(String),

    #[error("document {0} has no filename")]
    Unnamed(String),

    #[error{"store unavailable"}]
    Unavailable,
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::{ErrorKind, GridFsErrorKind};

        match *err.kind {
            ErrorKind::GridFs(GridFsErrorKind::FileNotFound { .. }) => StoreError::NotFound,
            _ => StoreError::Mongo(Box::new(err)),
        }
    }
}
