//! Exclusive lock on an output directory

use conpack_errors::{Error, StorageError};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

const LOCK_FILE_NAME: &str = ".conpack.lock";

/// Held for the duration of a run; the lock is released when dropped
#[derive(Debug)]
pub(crate) struct OutputLock {
    _file: File,
    path: PathBuf,
}

impl OutputLock {
    /// Take the lock without waiting
    ///
    /// The lock file itself is never removed: unlinking it while another
    /// process holds it would let a third process lock a fresh file at the
    /// same path.
    pub fn acquire(output_dir: &Path) -> Result<Self, Error> {
        let path = output_dir.join(LOCK_FILE_NAME);
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StorageError::from_io_with_path(&e, &path))?;

        if file.try_lock_exclusive().is_err() {
            return Err(StorageError::LockFailed {
                path: path.display().to_string(),
            }
            .into());
        }

        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
