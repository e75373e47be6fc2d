//! Explicit per-run context handed to package readers

use conpack_config::ConsolidationConfig;
use conpack_events::{EventEmitter, EventSender};
use std::path::{Path, PathBuf};

/// What a package reader needs to know about the current run
///
/// Passed by reference into every reader so that nothing about a run lives
/// in global state.
#[derive(Debug, Clone)]
pub struct ScanContext<'a> {
    pub events: Option<&'a EventSender>,
    pub tools_folder: &'a str,
    pub simple_platform: &'a str,
    pub scratch_dir: PathBuf,
}

impl<'a> ScanContext<'a> {
    #[must_use]
    pub fn new(config: &'a ConsolidationConfig, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            events: None,
            tools_folder: &config.tools_folder,
            simple_platform: &config.simple_platform,
            scratch_dir: scratch_dir.into(),
        }
    }

    #[must_use]
    pub fn with_events(mut self, events: &'a EventSender) -> Self {
        self.events = Some(events);
        self
    }

    #[must_use]
    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }
}

impl EventEmitter for ScanContext<'_> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events
    }
}
