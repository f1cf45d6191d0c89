pub mod config;
mod error;
pub mod fs;
pub mod gridfs;
pub mod node;
pub mod resolver;
pub mod session;
pub mod utils;

pub use error::CoreError;
