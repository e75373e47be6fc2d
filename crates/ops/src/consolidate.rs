//! The consolidation run

use crate::lock::OutputLock;
use crate::naming::{archive_file_name, combination_hash, is_consolidated_archive_name};
use crate::ConsolidationReport;
use conpack_builder::ConsolidatedPackageBuilder;
use conpack_config::Config;
use conpack_errors::{Error, StorageError};
use conpack_events::{ConsolidationEvent, EventEmitter, EventSender};
use conpack_hash::Hash;
use conpack_package::{reference_for, PackageReference, ScanContext};
use conpack_types::{PackageSource, SourceFile};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Builds consolidated archives into an output directory
#[derive(Debug, Clone)]
pub struct Consolidate {
    config: Config,
    event_sender: Option<EventSender>,
}

impl EventEmitter for Consolidate {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl Consolidate {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_event_sender(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Consolidate `sources` into `<output_dir>/<combination>.zip`
    ///
    /// Returns straight away if an archive for the same combination of
    /// inputs already exists. Otherwise every package is read, the archive
    /// is written to a temporary file in `output_dir` and renamed into place
    /// once complete, and older consolidated archives are pruned.
    ///
    /// Packages skipped under a lenient policy are part of the archive name,
    /// so a partial archive is never reused by a run that expects every
    /// package.
    ///
    /// # Errors
    ///
    /// Returns an error if the output directory is missing or locked, if a
    /// package has unusable metadata, if any package fails to read while
    /// `fail_fast` is set, or if writing the archive fails. No destination
    /// file is left behind on error.
    pub fn execute(
        &self,
        output_dir: &Path,
        sources: &[PackageSource],
    ) -> Result<ConsolidationReport, Error> {
        let start = Instant::now();
        if !output_dir.is_dir() {
            return Err(StorageError::DirectoryNotFound {
                path: output_dir.to_path_buf(),
            }
            .into());
        }

        let lock = OutputLock::acquire(output_dir)?;
        self.emit_debug(format!("locked {}", lock.path().display()));

        let mut skipped = Vec::new();
        let mut readable: Vec<(PackageSource, Hash)> = Vec::with_capacity(sources.len());
        for source in sources {
            match Hash::hash_file(&source.path) {
                Ok(content) => readable.push((source.clone(), content)),
                Err(e) => self.fail_or_skip(&source.id, e, &mut skipped)?,
            }
        }

        let combination = combination_hash(
            readable.iter().map(|(source, content)| (source, content)),
            &skipped,
            &self.config.consolidation,
        );
        let destination = output_dir.join(archive_file_name(&combination));
        if destination.exists() {
            return Ok(self.cache_hit(destination, combination, skipped));
        }

        // References own the scratch copies the descriptors point into, so
        // they stay alive until the archive is written.
        let mut references: Vec<Box<dyn PackageReference>> = readable
            .iter()
            .map(|(source, _)| reference_for(source.clone()))
            .collect();
        let (files, failed) = self.collect(&mut references, &mut skipped)?;

        let (combination, destination) = if failed.is_empty() {
            (combination, destination)
        } else {
            let contributors = readable
                .iter()
                .enumerate()
                .filter(|(i, _)| !failed.contains(i))
                .map(|(_, (source, content))| (source, content));
            let combination = combination_hash(contributors, &skipped, &self.config.consolidation);
            let destination = output_dir.join(archive_file_name(&combination));
            if destination.exists() {
                return Ok(self.cache_hit(destination, combination, skipped));
            }
            (combination, destination)
        };

        let builder = ConsolidatedPackageBuilder::from_config(&self.config.consolidation);
        let builder = match &self.event_sender {
            Some(tx) => builder.with_event_sender(tx.clone()),
            None => builder,
        };

        let mut temp = tempfile::Builder::new()
            .prefix(".conpack-")
            .suffix(".tmp")
            .tempfile_in(output_dir)
            .map_err(|e| StorageError::from_io_with_path(&e, output_dir))?;
        let (_, summary) = builder.write_to(&files, temp.as_file_mut(), &destination)?;
        temp.as_file()
            .sync_all()
            .map_err(|e| StorageError::from_io_with_path(&e, temp.path()))?;
        temp.persist(&destination)
            .map_err(|e| StorageError::AtomicRenameFailed {
                message: format!("{}: {}", destination.display(), e.error),
            })?;
        drop(references);

        let removed = if self.config.consolidation.prune_stale {
            self.prune_stale(output_dir, &destination)
        } else {
            Vec::new()
        };

        self.emit(ConsolidationEvent::Completed {
            destination: destination.clone(),
            blobs: summary.blobs_written,
            duration_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
        });

        Ok(ConsolidationReport {
            destination,
            combination_hash: combination,
            cache_hit: false,
            summary: Some(summary),
            skipped,
            removed,
        })
    }

    fn cache_hit(
        &self,
        destination: PathBuf,
        combination: Hash,
        skipped: Vec<String>,
    ) -> ConsolidationReport {
        self.emit(ConsolidationEvent::CacheHit {
            destination: destination.clone(),
        });
        ConsolidationReport {
            destination,
            combination_hash: combination,
            cache_hit: true,
            summary: None,
            skipped,
            removed: Vec::new(),
        }
    }

    /// Apply the failure policy to one package: abort under `fail_fast` or
    /// for identity errors, otherwise record it as skipped.
    fn fail_or_skip(
        &self,
        package_id: &str,
        error: Error,
        skipped: &mut Vec<String>,
    ) -> Result<(), Error> {
        if self.config.consolidation.fail_fast || error.is_identity_error() {
            return Err(error);
        }
        self.emit(ConsolidationEvent::PackageSkipped {
            package_id: package_id.to_string(),
            error: error.to_string(),
        });
        skipped.push(package_id.to_string());
        Ok(())
    }

    /// Read every package in parallel and merge their descriptors in input
    /// order. Returns the descriptors and the positions of the references
    /// that were skipped; their ids are appended to `skipped`.
    fn collect(
        &self,
        references: &mut [Box<dyn PackageReference>],
        skipped: &mut Vec<String>,
    ) -> Result<(Vec<SourceFile>, Vec<usize>), Error> {
        let scratch_dir = self.config.scratch_dir();
        std::fs::create_dir_all(&scratch_dir)
            .map_err(|e| StorageError::from_io_with_path(&e, &scratch_dir))?;

        let mut ctx = ScanContext::new(&self.config.consolidation, scratch_dir);
        if let Some(tx) = &self.event_sender {
            ctx = ctx.with_events(tx);
        }

        let results: Vec<Result<Vec<SourceFile>, Error>> = references
            .par_iter_mut()
            .map(|reference| {
                self.emit(ConsolidationEvent::PackageScanStarted {
                    package_id: reference.package_id().to_string(),
                    path: reference.path().to_path_buf(),
                });
                let result = reference.source_files(&ctx);
                if let Ok(files) = &result {
                    self.emit(ConsolidationEvent::PackageScanCompleted {
                        package_id: reference.package_id().to_string(),
                        files: files.len(),
                    });
                }
                result
            })
            .collect();

        let mut files = Vec::new();
        let mut failed = Vec::new();
        for (i, (reference, result)) in references.iter().zip(results).enumerate() {
            match result {
                Ok(found) => files.extend(found),
                Err(e) => {
                    self.fail_or_skip(reference.package_id(), e, skipped)?;
                    failed.push(i);
                }
            }
        }
        Ok((files, failed))
    }

    /// Remove consolidated archives other than `keep`. Failures only warn:
    /// the new archive is already published.
    fn prune_stale(&self, output_dir: &Path, keep: &Path) -> Vec<PathBuf> {
        let entries = match std::fs::read_dir(output_dir) {
            Ok(entries) => entries,
            Err(e) => {
                self.emit_warning(format!(
                    "could not list {} for pruning: {e}",
                    output_dir.display()
                ));
                return Vec::new();
            }
        };

        let mut removed = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_stale = path != keep
                && entry.file_type().is_ok_and(|t| t.is_file())
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(is_consolidated_archive_name);
            if !is_stale {
                continue;
            }
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    self.emit(ConsolidationEvent::StaleArchiveRemoved { path: path.clone() });
                    removed.push(path);
                }
                Err(e) => {
                    self.emit_warning(format!("could not remove {}: {e}", path.display()));
                }
            }
        }
        removed.sort();
        removed
    }
}
