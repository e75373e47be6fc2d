#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Consolidated package index for conpack
//!
//! The index is the `index.json` entry of a consolidated archive. For each
//! logical package and each of its platforms it lists the content hashes
//! whose `<hash>/<destination>` blobs make up that platform's file set.

mod models;

pub use models::{ConsolidatedPackageIndex, IndexPackage};

use conpack_errors::{Error, PackageError};
use conpack_hash::Hash;
use conpack_types::{PackageKey, SourceFile};
use std::collections::{BTreeMap, BTreeSet};

impl ConsolidatedPackageIndex {
    /// Build the index from every descriptor of a run
    ///
    /// Descriptors are grouped by `(package_id, version, is_single_payload)`
    /// and then by platform; each platform's hashes are sorted and
    /// deduplicated, so input order never affects the result.
    ///
    /// # Errors
    ///
    /// Returns an error if one package id shows up with two different
    /// versions or payload kinds, since the index is keyed by id alone.
    pub fn from_source_files(files: &[SourceFile]) -> Result<Self, Error> {
        let mut groups: BTreeMap<PackageKey, BTreeMap<&str, BTreeSet<Hash>>> = BTreeMap::new();
        for file in files {
            groups
                .entry(file.package_key())
                .or_default()
                .entry(file.platform.as_str())
                .or_default()
                .insert(file.content_hash);
        }

        let mut index = Self::new();
        for (key, platforms) in groups {
            if let Some(existing) = index.packages.get(&key.package_id) {
                return Err(PackageError::InvalidIndex {
                    message: format!(
                        "package {} appears as both {} ({}) and {} ({})",
                        key.package_id,
                        existing.version,
                        payload_kind(existing.is_single_payload),
                        key.version,
                        payload_kind(key.is_single_payload),
                    ),
                }
                .into());
            }

            let platforms = platforms
                .into_iter()
                .map(|(platform, hashes)| (platform.to_string(), hashes.into_iter().collect()))
                .collect();

            index.packages.insert(
                key.package_id.clone(),
                IndexPackage {
                    id: key.package_id,
                    version: key.version,
                    is_single_payload: key.is_single_payload,
                    platforms,
                },
            );
        }

        Ok(index)
    }
}

fn payload_kind(is_single_payload: bool) -> &'static str {
    if is_single_payload {
        "single payload"
    } else {
        "multi-platform"
    }
}
