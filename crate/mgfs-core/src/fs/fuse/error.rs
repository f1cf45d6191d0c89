//! Conversion of errors into errno values for fuser.

use crate::CoreError;
use nix::libc::{self, c_int};

/// Errors of the FUSE operations, reported to the kernel as errno.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FuseError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("invalid UTF-8 string")]
    Utf8,

    #[error("errno {0}")]
    Errno(c_int),
}

impl FuseError {
    /// Return a libc error code to represent this error, fuse-side.
    pub(crate) fn errno(&self) -> c_int {
        match &self {
            FuseError::Core(err) => io_errno(err.io_kind()),
            FuseError::Utf8 => libc::EINVAL,
            FuseError::Errno(errno) => *errno,
        }
    }

    /// Convert into a libc error code.
    pub(crate) fn log_and_convert(self) -> c_int {
        let errno = self.errno();

        log::debug!("FUSE operation error: {self:?} -> {errno}");

        errno
    }
}

impl From<nix::errno::Errno> for FuseError {
    fn from(value: nix::errno::Errno) -> Self {
        FuseError::Errno(value as c_int)
    }
}

/// Map the [std::io::ErrorKind] of a core error to errno.
fn io_errno(kind: std::io::ErrorKind) -> c_int {
    match kind {
        std::io::ErrorKind::NotFound => libc::ENOENT,
        std::io::ErrorKind::InvalidInput => libc::EINVAL,
        _ => libc::EIO,
    }
}
