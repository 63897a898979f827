//! File system access module
//!
//! The copier never calls `std::fs` directly. It goes through the
//! [`FileSystem`] trait so the traversal can run against the host filesystem
//! ([`LocalFs`]) or an in-memory tree ([`MemoryFs`]).

mod local;
mod memory;

pub use local::LocalFs;
pub use memory::MemoryFs;

use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

/// What a path refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link (only reported when links are not followed)
    Symlink,
    /// Socket, FIFO, device node or anything else
    Other,
}

impl EntryKind {
    /// Classify a `std::fs::FileType`
    pub fn from_file_type(file_type: std::fs::FileType) -> Self {
        if file_type.is_symlink() {
            Self::Symlink
        } else if file_type.is_dir() {
            Self::Directory
        } else if file_type.is_file() {
            Self::File
        } else {
            Self::Other
        }
    }
}

/// Filesystem primitives used by the copier
///
/// Lookups that find nothing return `Ok(None)`; every other failure is
/// reported as the raw `io::Error` and the caller attaches path context.
pub trait FileSystem {
    /// Names of the immediate entries of `dir`, in listing order
    fn list(&self, dir: &Path) -> io::Result<Vec<OsString>>;

    /// Kind of `path` itself, without following a final symlink
    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Kind of whatever `path` points to, following symlinks
    ///
    /// A dangling link reports `None`.
    fn target_kind(&self, path: &Path) -> io::Result<Option<EntryKind>>;

    /// Absolute path with every symlink and `..` resolved; the path must exist
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;

    /// Create `path` and all missing ancestors
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Remove a file or symlink
    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Read the whole file
    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Create or truncate `path` and write `data` to it
    fn write_all(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Create `path` and write `data` to it, failing with `AlreadyExists`
    /// if anything, even a dangling link, is already there
    fn write_new(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Move `from` to `to`, replacing a file at `to`
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Text stored in a symbolic link
    fn read_link(&self, path: &Path) -> io::Result<PathBuf>;

    /// Create a symbolic link at `link` holding `target`
    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()>;
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
    fn list(&self, dir: &Path) -> io::Result<Vec<OsString>> {
        (**self).list(dir)
    }

    fn entry_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        (**self).entry_kind(path)
    }

    fn target_kind(&self, path: &Path) -> io::Result<Option<EntryKind>> {
        (**self).target_kind(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).canonicalize(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        (**self).create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        (**self).remove_file(path)
    }

    fn read_all(&self, path: &Path) -> io::Result<Vec<u8>> {
        (**self).read_all(path)
    }

    fn write_all(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        (**self).write_all(path, data)
    }

    fn write_new(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        (**self).write_new(path, data)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        (**self).rename(from, to)
    }

    fn read_link(&self, path: &Path) -> io::Result<PathBuf> {
        (**self).read_link(path)
    }

    fn symlink(&self, target: &Path, link: &Path) -> io::Result<()> {
        (**self).symlink(target, link)
    }
}
