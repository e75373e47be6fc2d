#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Consolidated archive assembly for conpack
//!
//! Takes the descriptors collected from every package of a run and writes
//! one zip: each distinct `(destination, hash)` blob once under
//! `<hash>/<destination>`, followed by the `index.json` manifest. Entry
//! order and timestamps are fixed so identical inputs give identical bytes.

mod plan;

use conpack_config::{Compression, ConsolidationConfig};
use conpack_errors::{Error, StorageError};
use conpack_events::{ConsolidationEvent, EventEmitter, EventSender};
use conpack_index::ConsolidatedPackageIndex;
use conpack_package::archive::open_archive;
use conpack_types::{SourceFile, INDEX_FILE_NAME};
use plan::BlobPlan;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, Seek, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// What a build wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    /// Distinct blobs stored
    pub blobs_written: usize,
    /// Uncompressed bytes copied into blobs
    pub bytes_written: u64,
    /// Descriptors received, duplicates included
    pub descriptors: usize,
    /// Packages listed in the index
    pub packages: usize,
}

/// Writes consolidated archives
#[derive(Debug, Clone)]
pub struct ConsolidatedPackageBuilder {
    compression: Compression,
    index_name: String,
    event_sender: Option<EventSender>,
}

impl Default for ConsolidatedPackageBuilder {
    fn default() -> Self {
        Self {
            compression: Compression::default(),
            index_name: INDEX_FILE_NAME.to_string(),
            event_sender: None,
        }
    }
}

impl EventEmitter for ConsolidatedPackageBuilder {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

impl ConsolidatedPackageBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder configured from the `[consolidation]` section
    #[must_use]
    pub fn from_config(config: &ConsolidationConfig) -> Self {
        Self {
            compression: config.compression,
            index_name: config.index_name.clone(),
            event_sender: None,
        }
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[must_use]
    pub fn with_event_sender(mut self, event_sender: EventSender) -> Self {
        self.event_sender = Some(event_sender);
        self
    }

    /// Build the consolidated archive at `destination`
    ///
    /// # Errors
    ///
    /// Returns an error if the destination cannot be created, a source
    /// archive or entry cannot be read, or the index cannot be built.
    pub fn create(&self, files: &[SourceFile], destination: &Path) -> Result<BuildSummary, Error> {
        let file =
            File::create(destination).map_err(|e| StorageError::from_io_with_path(&e, destination))?;
        let (mut file, summary) = self.write_to(files, file, destination)?;
        file.flush()
            .map_err(|e| StorageError::from_io_with_path(&e, destination))?;
        Ok(summary)
    }

    /// Build the consolidated archive into `writer`
    ///
    /// `destination` only labels events; the caller decides where the bytes
    /// end up. The writer is handed back once the archive is finished.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create`].
    pub fn write_to<W: Write + Seek>(
        &self,
        files: &[SourceFile],
        writer: W,
        destination: &Path,
    ) -> Result<(W, BuildSummary), Error> {
        // Built up front so an inconsistent descriptor set fails before any
        // bytes are written.
        let index = ConsolidatedPackageIndex::from_source_files(files)?;
        let plan = BlobPlan::new(files);

        self.emit(ConsolidationEvent::AssemblyStarted {
            destination: destination.to_path_buf(),
            blobs: plan.blobs,
            source_archives: plan.archives.len(),
        });

        let options = SimpleFileOptions::default()
            .compression_method(self.compression_method())
            .last_modified_time(zip::DateTime::default());

        let mut zip = ZipWriter::new(writer);
        let mut summary = BuildSummary {
            descriptors: files.len(),
            ..BuildSummary::default()
        };

        for (archive_path, entries) in &plan.archives {
            let mut archive = open_archive(archive_path)?;
            for file in entries {
                let mut entry = archive
                    .by_name(&file.source_entry_name)
                    .map_err(|e| StorageError::archive(archive_path, &e))?;

                let name = file.archive_entry_name();
                let large = entry.size() >= u64::from(u32::MAX);
                zip.start_file(name.as_str(), options.large_file(large))
                    .map_err(|e| StorageError::archive(destination, &e))?;
                let bytes = io::copy(&mut entry, &mut zip)
                    .map_err(|e| StorageError::from_io_with_path(&e, archive_path))?;

                summary.blobs_written += 1;
                summary.bytes_written += bytes;
                self.emit(ConsolidationEvent::BlobWritten { entry: name, bytes });
            }
        }

        // The manifest always goes last.
        let json = index.to_json()?;
        zip.start_file(self.index_name.as_str(), options)
            .map_err(|e| StorageError::archive(destination, &e))?;
        zip.write_all(json.as_bytes())
            .map_err(|e| StorageError::from_io_with_path(&e, destination))?;
        summary.packages = index.packages.len();
        self.emit(ConsolidationEvent::IndexWritten {
            packages: summary.packages,
        });

        let writer = zip
            .finish()
            .map_err(|e| StorageError::archive(destination, &e))?;
        Ok((writer, summary))
    }

    fn compression_method(&self) -> CompressionMethod {
        match self.compression {
            Compression::Deflated => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        }
    }
}
