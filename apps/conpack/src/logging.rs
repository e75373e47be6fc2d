//! Structured logging for consolidation events
//!
//! Converts [`ConsolidationEvent`]s into `tracing` records with structured
//! fields. Levels follow [`ConsolidationEvent::level`].

use conpack_events::ConsolidationEvent;
use tracing::{debug, info, warn};

/// Log one event through the tracing subscriber
pub fn log_event_with_tracing(event: &ConsolidationEvent) {
    let source = event.source();
    let source = source.as_str();
    match event {
        ConsolidationEvent::Debug { message } => debug!(source, "{message}"),
        ConsolidationEvent::Warning { message } => warn!(source, "{message}"),
        ConsolidationEvent::PackageScanStarted { package_id, path } => {
            info!(
                source,
                package = %package_id,
                path = %path.display(),
                "Reading package"
            );
        }
        ConsolidationEvent::PackageScanCompleted { package_id, files } => {
            info!(source, package = %package_id, files, "Package read");
        }
        ConsolidationEvent::ToolsFolderMissing { package_id, folder } => {
            info!(
                source,
                package = %package_id,
                folder = %folder,
                "No tools folder; package contributes nothing"
            );
        }
        ConsolidationEvent::ToolsFolderEmpty { package_id, folder } => {
            info!(
                source,
                package = %package_id,
                folder = %folder,
                "Tools folder is empty; package contributes nothing"
            );
        }
        ConsolidationEvent::EntrySkipped { archive, entry } => {
            debug!(
                source,
                archive = %archive.display(),
                entry = %entry,
                "Entry outside any platform folder skipped"
            );
        }
        ConsolidationEvent::IdentityMismatch {
            path,
            expected,
            found,
        } => {
            warn!(
                source,
                path = %path.display(),
                expected = %expected,
                found = %found,
                "Package metadata disagrees with package list; using metadata"
            );
        }
        ConsolidationEvent::PackageSkipped { package_id, error } => {
            warn!(source, package = %package_id, error = %error, "Package skipped");
        }
        ConsolidationEvent::AssemblyStarted {
            destination,
            blobs,
            source_archives,
        } => {
            info!(
                source,
                destination = %destination.display(),
                blobs,
                source_archives,
                "Writing consolidated archive"
            );
        }
        ConsolidationEvent::BlobWritten { entry, bytes } => {
            debug!(source, entry = %entry, bytes, "Blob written");
        }
        ConsolidationEvent::IndexWritten { packages } => {
            info!(source, packages, "Index written");
        }
        ConsolidationEvent::CacheHit { destination } => {
            info!(
                source,
                destination = %destination.display(),
                "Archive for these packages already exists"
            );
        }
        ConsolidationEvent::StaleArchiveRemoved { path } => {
            info!(source, path = %path.display(), "Removed superseded archive");
        }
        ConsolidationEvent::Completed {
            destination,
            blobs,
            duration_ms,
        } => {
            info!(
                source,
                destination = %destination.display(),
                blobs,
                duration_ms,
                "Consolidation completed"
            );
        }
    }
}
