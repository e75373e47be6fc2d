#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Run driver for conpack
//!
//! Ties the package readers and the archive builder together: names the
//! output after its inputs, reads every package, writes the archive
//! atomically and tidies up older archives in the output directory.

mod consolidate;
mod lock;
pub mod naming;

pub use consolidate::Consolidate;
pub use naming::TOOL_VERSION;

use conpack_builder::BuildSummary;
use conpack_errors::Error;
use conpack_hash::Hash;
use serde::Serialize;
use std::path::PathBuf;

/// Outcome of a consolidation run
#[derive(Debug, Clone, Serialize)]
pub struct ConsolidationReport {
    /// Published archive path
    pub destination: PathBuf,
    pub combination_hash: Hash,
    /// The archive already existed and nothing was written
    pub cache_hit: bool,
    /// Absent on a cache hit
    pub summary: Option<BuildSummary>,
    /// Packages dropped under a lenient failure policy
    pub skipped: Vec<String>,
    /// Superseded archives removed from the output directory
    pub removed: Vec<PathBuf>,
}

impl ConsolidationReport {
    /// Convert to JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the report cannot be serialized.
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
