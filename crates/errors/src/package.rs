//! Package-related error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[non_exhaustive]
pub enum PackageError {
    #[error("package not found: {path}")]
    NotFound { path: String },

    #[error("package {path} has no embedded metadata")]
    MissingMetadata { path: String },

    #[error("invalid metadata in {path}: {message}")]
    InvalidMetadata { path: String, message: String },

    #[error("invalid package format: {message}")]
    InvalidFormat { message: String },

    #[error("invalid index: {message}")]
    InvalidIndex { message: String },
}

impl PackageError {
    /// Identity errors mean a package cannot be indexed at all
    #[must_use]
    pub fn is_identity_error(&self) -> bool {
        matches!(
            self,
            Self::MissingMetadata { .. } | Self::InvalidMetadata { .. }
        )
    }
}

impl UserFacingError for PackageError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::MissingMetadata { .. } | Self::InvalidMetadata { .. } => Some(
                "Single-payload packages must carry a .nuspec with <id> and <version> at the archive root.",
            ),
            Self::NotFound { .. } => Some("Check the package paths in the package list."),
            _ => None,
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        let code = match self {
            Self::NotFound { .. } => "package.not_found",
            Self::MissingMetadata { .. } => "package.missing_metadata",
            Self::InvalidMetadata { .. } => "package.invalid_metadata",
            Self::InvalidFormat { .. } => "package.invalid_format",
            Self::InvalidIndex { .. } => "package.invalid_index",
        };
        Some(code)
    }
}
