//! Embedded package identity
//!
//! Single-payload packages are NuGet-style archives: a `<name>.nuspec` XML
//! document at the archive root names the package and its version.

use crate::archive::{normalize_entry_name, Archive};
use conpack_errors::{Error, PackageError};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// Metadata documents larger than this are not nuspecs
const MAX_METADATA_BYTES: u64 = 1024 * 1024;

/// Identity read from a package's own metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageIdentity {
    pub id: String,
    pub version: String,
    /// Entry that carried the metadata
    pub entry_name: String,
}

#[derive(Debug, Deserialize)]
struct NuspecDocument {
    metadata: NuspecMetadata,
}

#[derive(Debug, Deserialize)]
struct NuspecMetadata {
    id: String,
    version: String,
}

/// Whether `name` is a metadata document at the archive root
#[must_use]
pub fn is_metadata_entry(name: &str) -> bool {
    !name.contains('/')
        && Path::new(name)
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("nuspec"))
}

/// Parse identity out of nuspec XML
///
/// # Errors
///
/// Returns `PackageError::InvalidMetadata` if the XML is malformed or the id
/// or version are missing or blank.
pub fn parse_nuspec(xml: &str, path: &Path) -> Result<(String, String), Error> {
    let invalid = |message: String| -> Error {
        PackageError::InvalidMetadata {
            path: path.display().to_string(),
            message,
        }
        .into()
    };

    let doc: NuspecDocument = quick_xml::de::from_str(xml).map_err(|e| invalid(e.to_string()))?;
    let id = doc.metadata.id.trim().to_string();
    let version = doc.metadata.version.trim().to_string();
    if id.is_empty() || version.is_empty() {
        return Err(invalid("metadata id and version must not be blank".into()));
    }
    Ok((id, version))
}

/// Read identity from the archive without extracting it
///
/// # Errors
///
/// Returns `PackageError::MissingMetadata` if no root `.nuspec` entry exists,
/// or `PackageError::InvalidMetadata` if it cannot be read or parsed.
pub fn read_identity(archive: &mut Archive, path: &Path) -> Result<PackageIdentity, Error> {
    let entry_name = archive
        .file_names()
        .find(|name| is_metadata_entry(&normalize_entry_name(name)))
        .map(str::to_string)
        .ok_or_else(|| PackageError::MissingMetadata {
            path: path.display().to_string(),
        })?;

    let invalid = |message: String| -> Error {
        PackageError::InvalidMetadata {
            path: path.display().to_string(),
            message,
        }
        .into()
    };

    let entry = archive
        .by_name(&entry_name)
        .map_err(|e| invalid(e.to_string()))?;
    let mut xml = String::new();
    entry
        .take(MAX_METADATA_BYTES)
        .read_to_string(&mut xml)
        .map_err(|e| invalid(e.to_string()))?;

    let (id, version) = parse_nuspec(&xml, path)?;
    Ok(PackageIdentity {
        id,
        version,
        entry_name,
    })
}
