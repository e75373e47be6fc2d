//! Multi-platform container packages
//!
//! A container bundles one nested archive per tool under a well-known folder
//! (`tools/` by default). Inside each nested archive the first path segment
//! of every entry is the platform tag:
//!
//! ```text
//! Tool.Plugins.zip
//! └── tools/
//!     ├── Tool.Aws.zip        win-x64/Tool.Aws.dll, linux-x64/Tool.Aws.dll, ...
//!     └── Tool.Azure.zip      win-x64/..., osx-x64/...
//! ```

use crate::archive::{ensure_enclosed, extract_archive, leaf_name, normalize_entry_name, open_archive};
use crate::{PackageReference, ScanContext};
use conpack_errors::{Error, PackageError, StorageError};
use conpack_events::{ConsolidationEvent, EventEmitter};
use conpack_hash::Hash;
use conpack_types::{PackageSource, SourceFile};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A package whose payload is a set of nested per-platform archives
#[derive(Debug)]
pub struct MultiPlatformPackageReference {
    source: PackageSource,
    /// Extracted outer package; nested archive paths in emitted descriptors
    /// point inside it, so it lives as long as the reference.
    scratch: Option<TempDir>,
}

impl MultiPlatformPackageReference {
    #[must_use]
    pub fn new(source: PackageSource) -> Self {
        Self {
            source,
            scratch: None,
        }
    }

    /// Scratch directory currently held, if a scan succeeded
    #[must_use]
    pub fn scratch_path(&self) -> Option<&Path> {
        self.scratch.as_ref().map(TempDir::path)
    }

    fn nested_archives(tools: &Path) -> Result<Vec<PathBuf>, Error> {
        let mut nested = Vec::new();
        let entries =
            std::fs::read_dir(tools).map_err(|e| StorageError::from_io_with_path(&e, tools))?;
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::from_io_with_path(&e, tools))?;
            let file_type = entry
                .file_type()
                .map_err(|e| StorageError::from_io_with_path(&e, &entry.path()))?;
            if file_type.is_file() {
                nested.push(entry.path());
            }
        }
        nested.sort();
        Ok(nested)
    }

    fn scan_nested(&self, nested: &Path, ctx: &ScanContext<'_>) -> Result<Vec<SourceFile>, Error> {
        let package_id = nested
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| PackageError::InvalidFormat {
                message: format!("nested archive {} has no usable name", nested.display()),
            })?
            .to_string();

        let mut archive = open_archive(nested)?;
        let mut files = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| StorageError::archive(nested, &e))?;
            if entry.is_dir() {
                continue;
            }

            let raw_name = entry.name().to_string();
            let name = normalize_entry_name(&raw_name);
            if leaf_name(&name).is_empty() {
                continue;
            }
            ensure_enclosed(nested, &name)?;

            let Some((platform, destination)) = name
                .split_once('/')
                .filter(|(platform, rest)| !platform.is_empty() && !rest.is_empty())
            else {
                ctx.emit(ConsolidationEvent::EntrySkipped {
                    archive: nested.to_path_buf(),
                    entry: raw_name,
                });
                continue;
            };

            let (content_hash, _) = Hash::hash_reader(&mut entry)?;
            files.push(SourceFile {
                package_id: package_id.clone(),
                version: self.source.version.clone(),
                is_single_payload: false,
                platform: platform.to_string(),
                source_archive_path: nested.to_path_buf(),
                source_entry_name: raw_name.clone(),
                destination_entry_name: destination.to_string(),
                content_hash,
            });
        }
        Ok(files)
    }
}

impl PackageReference for MultiPlatformPackageReference {
    fn package_id(&self) -> &str {
        &self.source.id
    }

    fn path(&self) -> &Path {
        &self.source.path
    }

    fn source_files(&mut self, ctx: &ScanContext<'_>) -> Result<Vec<SourceFile>, Error> {
        // A rescan replaces whatever an earlier scan extracted.
        self.scratch = None;

        // Dropped (and removed) on every early return below.
        let scratch = tempfile::Builder::new()
            .prefix("conpack-")
            .tempdir_in(ctx.scratch_dir())
            .map_err(|e| StorageError::from_io_with_path(&e, ctx.scratch_dir()))?;
        extract_archive(&self.source.path, scratch.path())?;

        let tools = scratch.path().join(ctx.tools_folder);
        if !tools.is_dir() {
            ctx.emit(ConsolidationEvent::ToolsFolderMissing {
                package_id: self.source.id.clone(),
                folder: ctx.tools_folder.to_string(),
            });
            return Ok(Vec::new());
        }

        let nested = Self::nested_archives(&tools)?;
        if nested.is_empty() {
            ctx.emit(ConsolidationEvent::ToolsFolderEmpty {
                package_id: self.source.id.clone(),
                folder: ctx.tools_folder.to_string(),
            });
            return Ok(Vec::new());
        }

        let per_archive = nested
            .par_iter()
            .map(|path| self.scan_nested(path, ctx))
            .collect::<Result<Vec<_>, Error>>()?;

        self.scratch = Some(scratch);
        Ok(per_archive.into_iter().flatten().collect())
    }
}
