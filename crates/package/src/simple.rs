//! Single-payload packages

use crate::archive::{ensure_enclosed, leaf_name, normalize_entry_name, open_archive};
use crate::metadata::{read_identity, PackageIdentity};
use crate::{PackageReference, ScanContext};
use conpack_errors::{Error, StorageError};
use conpack_events::{ConsolidationEvent, EventEmitter};
use conpack_hash::Hash;
use conpack_types::{PackageSource, SourceFile};
use std::path::Path;

/// Packaging housekeeping that is never part of a tool's payload
const EXCLUDED_FILES: &[&str] = &["[Content_Types].xml"];
const EXCLUDED_PREFIXES: &[&str] = &["_rels/", "package/services/"];

/// A package that is itself the payload for one implicit platform
#[derive(Debug, Clone)]
pub struct SimplePackageReference {
    source: PackageSource,
}

impl SimplePackageReference {
    #[must_use]
    pub fn new(source: PackageSource) -> Self {
        Self { source }
    }

    fn check_identity(&self, identity: &PackageIdentity, ctx: &ScanContext<'_>) {
        if identity.id != self.source.id || identity.version != self.source.version {
            ctx.emit(ConsolidationEvent::IdentityMismatch {
                path: self.source.path.clone(),
                expected: format!("{} {}", self.source.id, self.source.version),
                found: format!("{} {}", identity.id, identity.version),
            });
        }
    }
}

fn is_housekeeping(name: &str, identity: &PackageIdentity) -> bool {
    name == normalize_entry_name(&identity.entry_name)
        || EXCLUDED_FILES.contains(&leaf_name(name))
        || EXCLUDED_PREFIXES.iter().any(|p| name.starts_with(p))
}

impl PackageReference for SimplePackageReference {
    fn package_id(&self) -> &str {
        &self.source.id
    }

    fn path(&self) -> &Path {
        &self.source.path
    }

    fn source_files(&mut self, ctx: &ScanContext<'_>) -> Result<Vec<SourceFile>, Error> {
        let path = self.source.path.as_path();
        let mut archive = open_archive(path)?;
        let identity = read_identity(&mut archive, path)?;
        self.check_identity(&identity, ctx);

        let mut files = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| StorageError::archive(path, &e))?;
            if entry.is_dir() {
                continue;
            }

            let raw_name = entry.name().to_string();
            let name = normalize_entry_name(&raw_name);
            if leaf_name(&name).is_empty() || is_housekeeping(&name, &identity) {
                continue;
            }
            ensure_enclosed(path, &name)?;

            let (content_hash, _) = Hash::hash_reader(&mut entry)?;
            files.push(SourceFile {
                package_id: identity.id.clone(),
                version: identity.version.clone(),
                is_single_payload: true,
                platform: ctx.simple_platform.to_string(),
                source_archive_path: path.to_path_buf(),
                source_entry_name: raw_name,
                destination_entry_name: name,
                content_hash,
            });
        }

        Ok(files)
    }
}
