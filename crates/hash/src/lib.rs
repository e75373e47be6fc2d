#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! BLAKE3 content addressing for conpack
//!
//! Every file that goes into a consolidated archive is identified by the
//! digest of its bytes. Two entries with the same digest and destination name
//! are stored once; the hex digest is also the first path segment of each
//! blob in the archive, so its encoding must stay stable.

use blake3::Hasher;
use conpack_errors::{Error, StorageError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Size of chunks for streaming hash computation
const CHUNK_SIZE: usize = 64 * 1024; // 64KB

/// Length of a digest rendered as lowercase hex
pub const HEX_LEN: usize = 64;

/// A BLAKE3 hash value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Hash {
    bytes: [u8; 32],
}

impl Hash {
    /// Create a hash from raw bytes
    #[must_use]
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Get the raw bytes
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Convert to hex string
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Parse from hex string
    ///
    /// # Errors
    /// Returns an error if the input string is not valid hexadecimal or is not exactly 64 characters (32 bytes).
    pub fn from_hex(s: &str) -> Result<Self, Error> {
        let bytes = hex::decode(s).map_err(|e| StorageError::CorruptedData {
            message: format!("invalid hex: {e}"),
        })?;

        if bytes.len() != 32 {
            return Err(StorageError::CorruptedData {
                message: format!("hash must be 32 bytes, got {}", bytes.len()),
            }
            .into());
        }

        let mut array = [0u8; 32];
        array.copy_from_slice(&bytes);
        Ok(Self::from_bytes(array))
    }

    /// Compute hash of a byte slice
    #[must_use]
    pub fn from_data(data: &[u8]) -> Self {
        let hash = blake3::hash(data);
        Self::from_bytes(*hash.as_bytes())
    }

    /// Compute hash of everything readable from `reader`
    ///
    /// The reader is consumed in fixed-size chunks, so archive entries of any
    /// size can be hashed without buffering them.
    ///
    /// # Errors
    /// Returns an error if reading fails.
    pub fn hash_reader<R: Read>(mut reader: R) -> Result<(Self, u64), Error> {
        let mut hasher = Hasher::new();
        let mut buffer = vec![0; CHUNK_SIZE];
        let mut total_bytes = 0u64;

        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            hasher.update(&buffer[..n]);
            total_bytes += n as u64;
        }

        Ok((Self::from_bytes(*hasher.finalize().as_bytes()), total_bytes))
    }

    /// Compute hash of a file
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened, read, or if any I/O operation fails.
    pub fn hash_file(path: &Path) -> Result<Self, Error> {
        let file = File::open(path).map_err(|e| StorageError::from_io_with_path(&e, path))?;
        let (hash, _) = Self::hash_reader(file).map_err(|e| match e {
            Error::Io { kind, message, .. } => Error::Io {
                kind,
                message,
                path: Some(path.to_path_buf()),
            },
            other => other,
        })?;
        Ok(hash)
    }

    /// Whether `s` looks like a rendered digest (64 lowercase hex chars)
    #[must_use]
    pub fn is_hex_digest(s: &str) -> bool {
        s.len() == HEX_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }
}

impl fmt::Display for Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Hash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Hash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Incremental hash over a sequence of labelled fields
///
/// Fields are length-prefixed so `("ab", "c")` and `("a", "bc")` never
/// collide.
#[derive(Debug, Default)]
pub struct CombinationHasher {
    hasher: Hasher,
}

impl CombinationHasher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one field
    pub fn field(&mut self, value: &str) -> &mut Self {
        self.hasher.update(&(value.len() as u64).to_le_bytes());
        self.hasher.update(value.as_bytes());
        self
    }

    /// Append a digest
    pub fn hash(&mut self, hash: &Hash) -> &mut Self {
        self.hasher.update(hash.as_bytes());
        self
    }

    #[must_use]
    pub fn finish(&self) -> Hash {
        Hash::from_bytes(*self.hasher.finalize().as_bytes())
    }
}
