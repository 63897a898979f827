//! # TreeCopy - Recursive Directory Copy
//!
//! TreeCopy mirrors a source directory tree into a target directory tree.
//! Every regular file below the source is written to the same relative path
//! below the target, replacing whatever file was there before.
//!
//! ## Behaviour
//!
//! - **Unconditional overwrite**: no timestamp or hash comparison
//! - **Lazy directories**: a target directory is created just before the first
//!   file is written into it, so empty source subtrees leave no trace
//! - **Fail fast**: the first error aborts the copy; nothing is rolled back
//! - **Explicit symlink policy**: skip (default), follow, or preserve
//! - **Optional atomic writes**: temporary file plus rename
//!
//! ## Quick Start
//!
//! ```no_run
//! use treecopy::copy;
//! use std::path::Path;
//!
//! let result = copy(Path::new("/source"), Path::new("/destination")).unwrap();
//! println!("Copied {} files ({} bytes)", result.files_copied, result.bytes_copied);
//! ```
//!
//! ## Custom Filesystem
//!
//! The copier runs against any [`fs::FileSystem`]; [`fs::MemoryFs`] keeps
//! the whole tree in memory.
//!
//! ```
//! use treecopy::config::SymlinkPolicy;
//! use treecopy::core::DirectoryCopier;
//! use treecopy::fs::MemoryFs;
//! use std::path::Path;
//!
//! let fs = MemoryFs::new()
//!     .with_file("/src/a.txt", "hello")
//!     .with_file("/src/sub/b.txt", "world");
//!
//! let copier = DirectoryCopier::new(&fs).with_symlinks(SymlinkPolicy::Skip);
//! copier.copy(Path::new("/src"), Path::new("/dst")).unwrap();
//!
//! assert_eq!(fs.file_contents("/dst/sub/b.txt").unwrap(), b"world");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod core;
pub mod error;
pub mod fs;

// Re-export commonly used types
pub use config::{CopyConfig, DirCreation, SymlinkPolicy, WriteMode};
pub use core::{copy, copy_with_config, CopyResult, DirectoryCopier};
pub use error::{Result, TreeCopyError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
