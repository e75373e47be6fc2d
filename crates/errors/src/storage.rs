//! Storage and filesystem-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum StorageError {
    #[error("permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("path not found: {path}")]
    PathNotFound { path: String },

    #[error("directory not found: {path}")]
    DirectoryNotFound { path: std::path::PathBuf },

    #[error("already exists: {path}")]
    AlreadyExists { path: String },

    #[error("IO error: {message}")]
    IoError { message: String },

    #[error("archive error in {path}: {message}")]
    ArchiveError { path: String, message: String },

    #[error("corrupted data: {message}")]
    CorruptedData { message: String },

    #[error("lock acquisition failed: {path}")]
    LockFailed { path: String },

    #[error("atomic rename failed: {message}")]
    AtomicRenameFailed { message: String },
}

impl StorageError {
    /// Convert an `io::Error` into a `StorageError` with an associated path
    #[must_use]
    pub fn from_io_with_path(err: &std::io::Error, path: &std::path::Path) -> Self {
        match err.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied {
                path: path.display().to_string(),
            },
            std::io::ErrorKind::NotFound => Self::PathNotFound {
                path: path.display().to_string(),
            },
            std::io::ErrorKind::AlreadyExists => Self::AlreadyExists {
                path: path.display().to_string(),
            },
            _ => Self::IoError {
                message: format!("{}: {}", path.display(), err),
            },
        }
    }

    /// Wrap a zip failure for the archive at `path`
    #[must_use]
    pub fn archive(path: &std::path::Path, err: &zip::result::ZipError) -> Self {
        Self::ArchiveError {
            path: path.display().to_string(),
            message: err.to_string(),
        }
    }
}

impl UserFacingError for StorageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::PermissionDenied { .. } => {
                Some("Adjust filesystem permissions on the package or output paths.")
            }
            Self::DirectoryNotFound { .. } => Some("Create the output directory and retry."),
            Self::LockFailed { .. } => {
                Some("Another consolidation run is writing to this output directory; wait for it to finish.")
            }
            Self::ArchiveError { .. } => {
                Some("The package is not a readable zip archive; rebuild or re-download it.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::LockFailed { .. } | Self::IoError { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::PermissionDenied { .. } => "storage.permission_denied",
            Self::PathNotFound { .. } => "storage.path_not_found",
            Self::DirectoryNotFound { .. } => "storage.directory_not_found",
            Self::AlreadyExists { .. } => "storage.already_exists",
            Self::IoError { .. } => "storage.io_error",
            Self::ArchiveError { .. } => "storage.archive_error",
            Self::CorruptedData { .. } => "storage.corrupted_data",
            Self::LockFailed { .. } => "storage.lock_failed",
            Self::AtomicRenameFailed { .. } => "storage.atomic_rename_failed",
        };
        Some(code)
    }
}
