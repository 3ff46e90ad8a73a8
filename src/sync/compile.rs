//! The compile engine: container tree → reconstructed source tree.
//!
//! A container tree presented for compilation is assumed authoritative, so
//! every failure is fatal for the node being compiled; there is nothing to
//! rebuild from. Reconstructed files are verified against the digest their
//! index records before the engine moves on.

use crate::container;
use crate::error::{Error, Result};
use crate::index::{FileIndex, Index};
use sha2::{Digest, Sha512};
use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::debug;

/// Reconstruct the tree stored in the container tree at `source` into
/// `target`.
///
/// `source` must be an existing directory holding a reserved index container;
/// `target` is created as needed (a directory tree, or a single file when the
/// container tree mirrors one file).
pub fn compile(source: &Path, target: &Path) -> Result<()> {
    let meta = match fs::metadata(source) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::SourceMissing(source.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };
    if !meta.is_dir() {
        return Err(Error::NotADirectory(source.to_path_buf()));
    }

    compile_node(source, target)
}

fn compile_node(source: &Path, target: &Path) -> Result<()> {
    debug!(source = %source.display(), target = %target.display(), "compile");

    match Index::load(source)? {
        Index::Directory(dir) => {
            fs::create_dir_all(target)?;
            for name in &dir.entries {
                compile_node(&source.join(name), &target.join(name))?;
            }
            Ok(())
        }
        Index::File(file) => compile_file(source, target, &file),
    }
}

/// Reassemble one file from its chunk containers and verify the digest.
fn compile_file(source: &Path, target: &Path, index: &FileIndex) -> Result<()> {
    let mut out = fs::File::create(target)?;

    for part in index.parts_in_order() {
        let raw = fs::read(source.join(&part.filename))?;
        let payload = container::decode(&raw)?;
        if payload.len() as u64 != part.length {
            return Err(Error::IndexInvalid(format!(
                "chunk {} holds {} bytes, index records {}",
                part.filename,
                payload.len(),
                part.length
            )));
        }
        out.seek(SeekFrom::Start(part.start))?;
        out.write_all(&payload)?;
    }
    out.flush()?;
    drop(out);

    let actual = hash_file(target)?;
    if !actual.eq_ignore_ascii_case(&index.sha512) {
        return Err(Error::DigestMismatch {
            expected: index.sha512.clone(),
            actual,
        });
    }

    debug!(target = %target.display(), bytes = index.size, "reconstructed");
    Ok(())
}

/// SHA-512 over a file's content, lowercase hex.
fn hash_file(path: &Path) -> Result<String> {
    let mut reader = fs::File::open(path)?;
    let mut hasher = Sha512::new();
    let mut buffer = vec![0u8; 1 << 20];
    loop {
        let n = reader.read(&mut buffer)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
