//! Source file descriptors
//!
//! A [`SourceFile`] describes one candidate file for the consolidated
//! archive: which logical package and platform it belongs to, which archive
//! entry holds its bytes, where it lands in the per-platform layout, and the
//! digest of its content.

use conpack_hash::Hash;
use std::path::PathBuf;

/// One file eligible for inclusion in a consolidated archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub package_id: String,
    pub version: String,
    pub is_single_payload: bool,
    pub platform: String,
    /// Archive the bytes are read from. For nested per-platform archives this
    /// is the extracted copy inside the reference's scratch directory.
    pub source_archive_path: PathBuf,
    pub source_entry_name: String,
    pub destination_entry_name: String,
    pub content_hash: Hash,
}

/// Identity of a stored blob: equal keys are byte-identical content for the
/// same logical name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlobKey {
    pub destination_entry_name: String,
    pub content_hash: Hash,
}

/// Grouping key for index packages
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PackageKey {
    pub package_id: String,
    pub version: String,
    pub is_single_payload: bool,
}

impl SourceFile {
    #[must_use]
    pub fn blob_key(&self) -> BlobKey {
        BlobKey {
            destination_entry_name: self.destination_entry_name.clone(),
            content_hash: self.content_hash,
        }
    }

    #[must_use]
    pub fn package_key(&self) -> PackageKey {
        PackageKey {
            package_id: self.package_id.clone(),
            version: self.version.clone(),
            is_single_payload: self.is_single_payload,
        }
    }

    /// Entry name of this file's blob inside the consolidated archive
    #[must_use]
    pub fn archive_entry_name(&self) -> String {
        self.blob_key().archive_entry_name()
    }
}

impl BlobKey {
    /// `<contentHash>/<destinationEntryName>`
    #[must_use]
    pub fn archive_entry_name(&self) -> String {
        format!("{}/{}", self.content_hash, self.destination_entry_name)
    }
}
