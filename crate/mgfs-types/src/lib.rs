//! Types shared by the mgfs crates.

mod document;
mod path;
mod time;

pub use document::{DocumentId, DocumentMeta};
pub use path::{PathError, VirtualPath, segments_of, to_store_key};
pub use time::UnixTime;
