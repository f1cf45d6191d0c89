//! FUSE bridge for [crate::gridfs::GridFs].

mod error;
mod handles;
mod inodes;
mod interface;
mod operations;

pub use interface::{FuseHandle, export};
