#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Package readers for conpack
//!
//! A package reference turns one upstream package into the list of
//! [`SourceFile`] descriptors it contributes to a consolidated archive. Two
//! layouts are understood:
//!
//! - simple packages, where the archive itself is the payload of one
//!   implicit platform and the identity comes from an embedded `.nuspec`;
//! - multi-platform containers, holding one nested archive per tool whose
//!   top-level folders are platform tags.

pub mod archive;
mod container;
mod context;
pub mod metadata;
mod simple;

pub use container::MultiPlatformPackageReference;
pub use context::ScanContext;
pub use metadata::PackageIdentity;
pub use simple::SimplePackageReference;

use conpack_errors::Error;
use conpack_types::{PackageSource, SourceFile};
use std::path::Path;

/// A package that can enumerate the files it contributes
pub trait PackageReference: Send {
    /// Driver-supplied package id
    fn package_id(&self) -> &str;

    /// Location of the package on disk
    fn path(&self) -> &Path;

    /// Enumerate and hash every candidate file of the package
    ///
    /// Descriptors may point at scratch data owned by the reference, so the
    /// reference must outlive any reader of `source_archive_path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the package or one of its nested archives cannot
    /// be read, or if a simple package has missing or invalid metadata.
    fn source_files(&mut self, ctx: &ScanContext<'_>) -> Result<Vec<SourceFile>, Error>;
}

/// Wrap a package source in the reader matching its payload kind
#[must_use]
pub fn reference_for(source: PackageSource) -> Box<dyn PackageReference> {
    if source.is_single_payload {
        Box::new(SimplePackageReference::new(source))
    } else {
        Box::new(MultiPlatformPackageReference::new(source))
    }
}
