//! Zip helpers shared by the package readers and the archive builder

use conpack_errors::{Error, PackageError, StorageError};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use zip::ZipArchive;

/// A zip archive opened for reading from disk
pub type Archive = ZipArchive<BufReader<File>>;

/// Open a zip archive
///
/// # Errors
///
/// Returns `PackageError::NotFound` if the file does not exist, or a storage
/// error if it cannot be opened or is not a zip archive.
pub fn open_archive(path: &Path) -> Result<Archive, Error> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::from(PackageError::NotFound {
                path: path.display().to_string(),
            })
        } else {
            StorageError::from_io_with_path(&e, path).into()
        }
    })?;
    ZipArchive::new(BufReader::new(file)).map_err(|e| StorageError::archive(path, &e).into())
}

/// Extract every entry of the archive at `path` below `dest`
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or an entry cannot be
/// written.
pub fn extract_archive(path: &Path, dest: &Path) -> Result<(), Error> {
    let mut archive = open_archive(path)?;
    archive
        .extract(dest)
        .map_err(|e| StorageError::archive(path, &e).into())
}

/// Entry names use `/`; archives written on Windows sometimes carry `\`.
#[must_use]
pub fn normalize_entry_name(raw: &str) -> String {
    raw.replace('\\', "/")
}

/// Last path segment of a normalized entry name; empty for directory
/// placeholders such as `lib/`.
#[must_use]
pub fn leaf_name(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or_default()
}

/// Reject entry names that would land outside the archive root
///
/// # Errors
///
/// Returns `PackageError::InvalidFormat` naming the archive and entry.
pub fn ensure_enclosed(archive_path: &Path, name: &str) -> Result<(), Error> {
    let escapes = name.starts_with('/')
        || name.split('/').any(|segment| segment == "..")
        || name.contains(':');
    if escapes {
        return Err(PackageError::InvalidFormat {
            message: format!(
                "entry {name} in {} escapes the archive root",
                archive_path.display()
            ),
        }
        .into());
    }
    Ok(())
}
