//! Content-addressed naming of consolidated archives
//!
//! An archive is named after everything that determines its bytes: the
//! tool version, the settings that shape the layout, the identity and
//! content of every package it contains, and the ids of packages that were
//! skipped. Rerunning with the same inputs lands on the same file name,
//! which is how a run detects it has nothing to do.

use conpack_config::{Compression, ConsolidationConfig};
use conpack_hash::{CombinationHasher, Hash, HEX_LEN};
use conpack_types::PackageSource;

/// Version folded into every combination hash
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

const ARCHIVE_EXTENSION: &str = ".zip";

/// Hash identifying this exact combination of inputs
///
/// `contributors` pairs each package that is part of the archive with the
/// hash of its file. `skipped` names packages left out under a lenient
/// failure policy; they are folded in so a partial archive never shares a
/// name with a complete one. Neither order matters.
#[must_use]
pub fn combination_hash<'a>(
    contributors: impl IntoIterator<Item = (&'a PackageSource, &'a Hash)>,
    skipped: &[String],
    config: &ConsolidationConfig,
) -> Hash {
    let mut ordered: Vec<(&PackageSource, &Hash)> = contributors.into_iter().collect();
    ordered.sort_by(|(a, _), (b, _)| {
        (&a.id, &a.version, &a.path).cmp(&(&b.id, &b.version, &b.path))
    });
    let mut skipped: Vec<&str> = skipped.iter().map(String::as_str).collect();
    skipped.sort_unstable();

    let mut hasher = CombinationHasher::new();
    hasher
        .field(TOOL_VERSION)
        .field(&config.tools_folder)
        .field(&config.simple_platform)
        .field(&config.index_name)
        .field(match config.compression {
            Compression::Deflated => "deflated",
            Compression::Stored => "stored",
        });

    for (source, content) in ordered {
        hasher
            .field(&source.id)
            .field(&source.version)
            .field(if source.is_single_payload {
                "single"
            } else {
                "multi"
            })
            .hash(content);
    }

    hasher.field("skipped");
    for id in skipped {
        hasher.field(id);
    }

    hasher.finish()
}

/// `<hash>.zip`
#[must_use]
pub fn archive_file_name(hash: &Hash) -> String {
    format!("{hash}{ARCHIVE_EXTENSION}")
}

/// Whether a file name looks like one produced by [`archive_file_name`]
#[must_use]
pub fn is_consolidated_archive_name(name: &str) -> bool {
    name.strip_suffix(ARCHIVE_EXTENSION)
        .is_some_and(|stem| stem.len() == HEX_LEN && Hash::is_hex_digest(stem))
}
