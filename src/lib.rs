//! picshard
//!
//! Converts any file or directory tree into a collection of innocuous-looking
//! bitmap containers (for storage on services that only accept images) and
//! back.
//!
//! # Architecture
//!
//! ```text
//! spread:  source tree → chunks (≤ 16 MiB) → SHA-512 → bitmap container tree
//! compile: container tree → index walk → chunk reassembly → digest check
//! ```
//!
//! Every synchronized directory carries a reserved `__index.bmp` container
//! whose payload is a JSON document describing the mirrored node: a file's
//! size, timestamps, digest and chunk list, or a directory's child names.
//! Re-running spread diffs the source against that index and rewrites only
//! what changed.
//!
//! # Example
//!
//! ```rust,no_run
//! use picshard::{compile, spread};
//! use std::path::Path;
//!
//! // Turn a directory tree into bitmap containers...
//! spread(Path::new("/data/projects"), Path::new("/cloud/upload")).unwrap();
//!
//! // ...and reconstruct it elsewhere, verified against the recorded digests.
//! compile(Path::new("/cloud/upload"), Path::new("/data/restored")).unwrap();
//! ```

pub mod config;
pub mod container;
pub mod error;
pub mod index;
pub mod sync;

pub use error::{Error, Result};
pub use index::Index;
pub use sync::{compile, spread};
