#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for conpack
//!
//! Library crates never print or log directly. Package readers, the archive
//! builder and the run driver report what they do through
//! [`ConsolidationEvent`]s sent over an [`EventSender`]; the CLI drains the
//! channel and turns events into `tracing` records.

pub mod meta;
pub use meta::{EventLevel, EventSource};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc::UnboundedSender;

/// Everything a consolidation run reports while it works
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConsolidationEvent {
    /// Free-form debug message
    Debug { message: String },

    /// Free-form warning
    Warning { message: String },

    /// Started reading a package for candidate files
    PackageScanStarted { package_id: String, path: PathBuf },

    /// Finished reading a package
    PackageScanCompleted { package_id: String, files: usize },

    /// Container package has no tools folder; contributes nothing
    ToolsFolderMissing { package_id: String, folder: String },

    /// Container package has a tools folder without nested archives
    ToolsFolderEmpty { package_id: String, folder: String },

    /// Nested archive entry that sits outside any platform folder
    EntrySkipped { archive: PathBuf, entry: String },

    /// Embedded metadata disagrees with the identity the driver supplied
    IdentityMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    /// Package dropped from the run under a lenient failure policy
    PackageSkipped { package_id: String, error: String },

    /// Archive assembly is about to start
    AssemblyStarted {
        destination: PathBuf,
        blobs: usize,
        source_archives: usize,
    },

    /// One deduplicated blob written
    BlobWritten { entry: String, bytes: u64 },

    /// Index entry written
    IndexWritten { packages: usize },

    /// Destination for this exact package combination already exists
    CacheHit { destination: PathBuf },

    /// Superseded consolidated archive removed from the output directory
    StaleArchiveRemoved { path: PathBuf },

    /// Run finished and destination published
    Completed {
        destination: PathBuf,
        blobs: usize,
        duration_ms: u64,
    },
}

impl ConsolidationEvent {
    /// Severity used when the event is logged
    #[must_use]
    pub fn level(&self) -> EventLevel {
        match self {
            Self::Debug { .. } | Self::EntrySkipped { .. } | Self::BlobWritten { .. } => {
                EventLevel::Debug
            }
            Self::Warning { .. } | Self::IdentityMismatch { .. } | Self::PackageSkipped { .. } => {
                EventLevel::Warn
            }
            _ => EventLevel::Info,
        }
    }

    /// Subsystem that emitted the event
    #[must_use]
    pub fn source(&self) -> EventSource {
        match self {
            Self::Debug { .. } | Self::Warning { .. } => EventSource::GENERAL,
            Self::PackageScanStarted { .. }
            | Self::PackageScanCompleted { .. }
            | Self::ToolsFolderMissing { .. }
            | Self::ToolsFolderEmpty { .. }
            | Self::EntrySkipped { .. }
            | Self::IdentityMismatch { .. } => EventSource::PACKAGE,
            Self::AssemblyStarted { .. } | Self::BlobWritten { .. } | Self::IndexWritten { .. } => {
                EventSource::BUILDER
            }
            Self::PackageSkipped { .. }
            | Self::CacheHit { .. }
            | Self::StaleArchiveRemoved { .. }
            | Self::Completed { .. } => EventSource::OPS,
        }
    }
}

/// Type alias for event sender
pub type EventSender = UnboundedSender<ConsolidationEvent>;

/// Type alias for event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<ConsolidationEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events
///
/// Implemented for a raw [`EventSender`], for an optional one (so callers
/// that do not care can pass `None`), and for any struct that carries one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: ConsolidationEvent) {
        if let Some(sender) = self.event_sender() {
            // Ignore send errors - if receiver is dropped, we just continue
            let _ = sender.send(event);
        }
    }

    /// Emit a debug log event
    fn emit_debug(&self, message: impl Into<String>) {
        self.emit(ConsolidationEvent::Debug {
            message: message.into(),
        });
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(ConsolidationEvent::Warning {
            message: message.into(),
        });
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}
