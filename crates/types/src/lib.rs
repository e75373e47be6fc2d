#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for conpack
//!
//! This crate provides the values that flow between the package readers,
//! the archive builder and the index: the per-file source descriptor and the
//! driver-supplied package list.

pub mod package;
pub mod source_file;

// Re-export commonly used types
pub use package::{PackageList, PackageSource};
pub use source_file::{BlobKey, PackageKey, SourceFile};

/// Platform tag given to every file of a single-payload package unless
/// configured otherwise.
pub const DEFAULT_SIMPLE_PLATFORM: &str = "any";

/// Name of the manifest entry inside a consolidated archive.
pub const INDEX_FILE_NAME: &str = "index.json";
