//! Error types for TreeCopy
//!
//! Every failure the copier can report originates in the filesystem. This
//! module classifies raw `std::io::Error`s into a small taxonomy and keeps the
//! offending path attached so callers see where a copy stopped.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for TreeCopy operations
#[derive(Error, Debug)]
pub enum TreeCopyError {
    /// File or directory not found
    #[error("Path not found: {}", .path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Permission denied
    #[error("Permission denied: {}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file sits where a directory is expected, or the other way round
    #[error("Path conflict at '{}': {message}", .path.display())]
    PathConflict { path: PathBuf, message: String },

    /// Any other I/O failure (disk full, device error, interrupted write)
    #[error("I/O error at '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source and target resolve to the same tree, or the target is nested in the source
    #[error("Target '{}' overlaps source '{}'", .target.display(), .source_dir.display())]
    Overlap { source_dir: PathBuf, target: PathBuf },

    /// Operation not available on this platform
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Coarse error classes, independent of the path that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`TreeCopyError::NotFound`]
    NotFound,
    /// See [`TreeCopyError::PermissionDenied`]
    PermissionDenied,
    /// See [`TreeCopyError::PathConflict`]
    PathConflict,
    /// See [`TreeCopyError::Io`]
    Io,
    /// See [`TreeCopyError::Overlap`]
    Overlap,
    /// See [`TreeCopyError::Unsupported`]
    Unsupported,
    /// See [`TreeCopyError::Config`]
    Config,
}

impl TreeCopyError {
    /// Classify an I/O error and attach the path it happened at
    pub fn from_io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        use std::io::ErrorKind as Kind;

        let path = path.into();
        match source.kind() {
            Kind::NotFound => Self::NotFound { path, source },
            Kind::PermissionDenied => Self::PermissionDenied { path, source },
            Kind::AlreadyExists | Kind::NotADirectory | Kind::IsADirectory => Self::PathConflict {
                path,
                message: source.to_string(),
            },
            Kind::Unsupported => Self::Unsupported(format!("{}: {source}", path.display())),
            _ => Self::Io { path, source },
        }
    }

    /// Create a path conflict error
    pub fn conflict(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::PathConflict {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Get the coarse class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            Self::PathConflict { .. } => ErrorKind::PathConflict,
            Self::Io { .. } => ErrorKind::Io,
            Self::Overlap { .. } => ErrorKind::Overlap,
            Self::Unsupported(_) => ErrorKind::Unsupported,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NotFound { path, .. }
            | Self::PermissionDenied { path, .. }
            | Self::PathConflict { path, .. }
            | Self::Io { path, .. } => Some(path),
            Self::Overlap { target, .. } => Some(target),
            Self::Unsupported(_) | Self::Config(_) => None,
        }
    }
}

/// Result type alias for TreeCopy operations
pub type Result<T> = std::result::Result<T, TreeCopyError>;

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Classify an I/O error and attach the path it happened at
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| TreeCopyError::from_io(path, e))
    }
}
