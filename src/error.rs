//! Error types for picshard.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for picshard operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while spreading or compiling a tree.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Source path does not exist.
    #[error("Source does not exist: {0}")]
    SourceMissing(PathBuf),

    /// Path exists but is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// Container file is too short to hold a header.
    #[error("Container too short: {len} bytes")]
    ContainerTooShort { len: usize },

    /// Container does not start with the bitmap magic.
    #[error("Bad container magic: {found:#06x}")]
    BadMagic { found: u16 },

    /// Declared container size does not match the actual byte length.
    #[error("Container size mismatch: header declares {declared} bytes, got {actual}")]
    SizeMismatch { declared: u64, actual: u64 },

    /// Container payload extends past the end of the file.
    #[error("Container payload truncated: need {needed} bytes past the data offset, have {available}")]
    PayloadTruncated { needed: u64, available: u64 },

    /// Reserved index container is absent.
    #[error("Index not found: {0}")]
    IndexMissing(PathBuf),

    /// Index document is structurally or semantically invalid.
    #[error("Invalid index: {0}")]
    IndexInvalid(String),

    /// Reconstructed file content does not match the recorded digest.
    #[error("Digest mismatch: index records {expected}, reconstructed file hashes to {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// Source entry collides with the reserved index filename.
    #[error("Source entry collides with the reserved index name: {0}")]
    ReservedName(PathBuf),

    /// Source entry name is not valid Unicode and cannot be recorded.
    #[error("Source entry name is not valid Unicode: {0}")]
    NonUnicodeName(PathBuf),

    /// Random chunk naming failed to find a free name.
    #[error("Could not allocate a free chunk name after {0} attempts")]
    ChunkNameExhausted(u32),
}

impl Error {
    /// Whether this error means the existing index is merely stale or damaged.
    ///
    /// The spread engine rebuilds on these instead of aborting; everything
    /// else (notably [`Error::Io`]) is fatal.
    pub fn is_stale_index(&self) -> bool {
        matches!(
            self,
            Error::IndexMissing(_)
                | Error::IndexInvalid(_)
                | Error::ContainerTooShort { .. }
                | Error::BadMagic { .. }
                | Error::SizeMismatch { .. }
                | Error::PayloadTruncated { .. }
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::IndexInvalid(e.to_string())
    }
}
