//! Index data models

use conpack_errors::{Error, PackageError};
use conpack_hash::Hash;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Manifest of a consolidated archive, keyed by package id
///
/// Serializes as a bare JSON object so `index.json` reads
/// `{ "<id>": { ... } }`. Maps are ordered, which keeps the document
/// byte-identical for identical inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsolidatedPackageIndex {
    pub packages: BTreeMap<String, IndexPackage>,
}

/// One logical package in the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexPackage {
    pub id: String,
    pub version: String,
    pub is_single_payload: bool,
    /// Platform tag to the sorted, deduplicated content hashes that make up
    /// that platform's file set
    pub platforms: BTreeMap<String, Vec<Hash>>,
}

impl ConsolidatedPackageIndex {
    /// Create a new empty index
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse index from JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or cannot be parsed.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| {
            PackageError::InvalidIndex {
                message: format!("invalid index JSON: {e}"),
            }
            .into()
        })
    }

    /// Serialize index to JSON
    ///
    /// # Errors
    ///
    /// Returns an error if the index cannot be serialized to JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string_pretty(self).map_err(|e| {
            PackageError::InvalidIndex {
                message: format!("failed to serialize index: {e}"),
            }
            .into()
        })
    }

    /// Validate structural invariants
    ///
    /// # Errors
    ///
    /// Returns an error if a package key disagrees with its id, if ids,
    /// versions or platform tags are empty, or if a hash list is unsorted or
    /// holds duplicates.
    pub fn validate(&self) -> Result<(), Error> {
        for (key, package) in &self.packages {
            if key.is_empty() || package.version.is_empty() {
                return Err(invalid("empty package id or version in index"));
            }
            if key != &package.id {
                return Err(invalid(format!(
                    "index key {key} does not match package id {}",
                    package.id
                )));
            }
            for (platform, hashes) in &package.platforms {
                if platform.is_empty() {
                    return Err(invalid(format!("empty platform tag for package {key}")));
                }
                if hashes.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(invalid(format!(
                        "hash list for {key}/{platform} is not sorted and unique"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Look up a package by id
    #[must_use]
    pub fn package(&self, id: &str) -> Option<&IndexPackage> {
        self.packages.get(id)
    }

    /// Hashes needed to reconstruct `id` on `platform`
    #[must_use]
    pub fn hashes_for(&self, id: &str, platform: &str) -> Option<&[Hash]> {
        self.packages
            .get(id)?
            .platforms
            .get(platform)
            .map(Vec::as_slice)
    }

    /// Platform tags recorded for a package, in order
    pub fn platforms(&self, id: &str) -> impl Iterator<Item = &str> {
        self.packages
            .get(id)
            .into_iter()
            .flat_map(|p| p.platforms.keys().map(String::as_str))
    }

    /// Number of distinct hashes referenced across all packages
    #[must_use]
    pub fn distinct_hashes(&self) -> usize {
        let mut all: Vec<&Hash> = self
            .packages
            .values()
            .flat_map(|p| p.platforms.values().flatten())
            .collect();
        all.sort_unstable();
        all.dedup();
        all.len()
    }
}

fn invalid(message: impl Into<String>) -> Error {
    PackageError::InvalidIndex {
        message: message.into(),
    }
    .into()
}
