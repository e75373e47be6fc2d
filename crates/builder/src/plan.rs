//! Blob planning: deduplicate descriptors and group them by source archive

use conpack_types::{BlobKey, SourceFile};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;

/// Which entries to copy out of which archive
///
/// Only the first descriptor of every `(destination, hash)` pair is kept.
/// Archives are ordered by path and entries by destination then hash, so
/// the same descriptors always produce the same write order.
#[derive(Debug, Default)]
pub(crate) struct BlobPlan<'a> {
    pub archives: BTreeMap<&'a Path, Vec<&'a SourceFile>>,
    pub blobs: usize,
}

impl<'a> BlobPlan<'a> {
    pub fn new(files: &'a [SourceFile]) -> Self {
        let mut seen: HashSet<BlobKey> = HashSet::with_capacity(files.len());
        let mut plan = Self::default();

        for file in files {
            if seen.insert(file.blob_key()) {
                plan.archives
                    .entry(file.source_archive_path.as_path())
                    .or_default()
                    .push(file);
                plan.blobs += 1;
            }
        }

        for entries in plan.archives.values_mut() {
            entries.sort_by(|a, b| {
                (&a.destination_entry_name, a.content_hash)
                    .cmp(&(&b.destination_entry_name, b.content_hash))
            });
        }
        plan
    }
}
