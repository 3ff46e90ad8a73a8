//! The spread engine: source tree → container tree.
//!
//! Depth-first and strictly sequential. Each node's plan comes from a pure
//! classification of the existing index, so staleness decisions are easy to
//! reason about and test; a directory's index is only ever written after all
//! of its children have completed.

use crate::config::{CHUNK_CEILING, CHUNK_NAME_ATTEMPTS, CONTAINER_EXTENSION, INDEX_FILENAME};
use crate::container;
use crate::error::{Error, Result};
use crate::index::{DirectoryIndex, FileIndex, Index, Part};
use crate::sync::fsutil;
use rand::Rng;
use sha2::{Digest, Sha512};
use std::collections::HashSet;
use std::fs;
use std::io::{self, Read};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Why a node's target state is being discarded and regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rebuild {
    /// No index container exists yet.
    Absent,
    /// The index container or its document is damaged.
    Damaged,
    /// The node changed kind between file and directory.
    KindChanged,
}

/// Plan for a file node.
#[derive(Debug, PartialEq, Eq)]
enum FilePlan {
    UpToDate,
    Rebuild(Rebuild),
}

/// Plan for a directory node.
#[derive(Debug, PartialEq, Eq)]
struct DirPlan {
    /// Child names recorded by the previous run.
    known: Vec<String>,
    /// The target must be emptied before recursing.
    purge: bool,
    /// Rewrite already forced by the index state itself.
    forced: Option<Rebuild>,
}

fn classify_file(existing: Result<Index>) -> Result<FilePlan> {
    match existing {
        Ok(Index::File(_)) => Ok(FilePlan::UpToDate),
        Ok(Index::Directory(_)) => Ok(FilePlan::Rebuild(Rebuild::KindChanged)),
        Err(e) if e.is_stale_index() => Ok(FilePlan::Rebuild(match e {
            Error::IndexMissing(_) => Rebuild::Absent,
            _ => Rebuild::Damaged,
        })),
        Err(e) => Err(e),
    }
}

fn classify_dir(existing: Result<Index>) -> Result<DirPlan> {
    match existing {
        Ok(Index::Directory(dir)) => Ok(DirPlan {
            known: dir.entries,
            purge: false,
            forced: None,
        }),
        Ok(Index::File(_)) => Ok(DirPlan {
            known: Vec::new(),
            purge: true,
            forced: Some(Rebuild::KindChanged),
        }),
        Err(e) if e.is_stale_index() => {
            let reason = match e {
                Error::IndexMissing(_) => Rebuild::Absent,
                _ => Rebuild::Damaged,
            };
            Ok(DirPlan {
                known: Vec::new(),
                purge: false,
                forced: Some(reason),
            })
        }
        Err(e) => Err(e),
    }
}

/// Synchronize `source` (a file or directory) into the container tree rooted
/// at `target`, creating `target` if necessary.
///
/// Index-load problems on existing targets are treated as recoverable
/// staleness and heal themselves through a rebuild; underlying I/O failures
/// abort the whole operation without rollback.
pub fn spread(source: &Path, target: &Path) -> Result<()> {
    debug!(source = %source.display(), target = %target.display(), "spread");

    fs::create_dir_all(target)?;

    let meta = match fs::metadata(source) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(Error::SourceMissing(source.to_path_buf()));
        }
        Err(e) => return Err(e.into()),
    };

    if meta.is_dir() {
        spread_dir(source, target)
    } else {
        spread_file(source, target)
    }
}

fn spread_file(source: &Path, target: &Path) -> Result<()> {
    match classify_file(Index::load(target))? {
        FilePlan::UpToDate => {
            // TODO: compare filesize and lastModified against the source
            // before trusting an existing file index.
            debug!(target = %target.display(), "file index present, leaving as is");
            Ok(())
        }
        FilePlan::Rebuild(reason) => {
            match reason {
                Rebuild::Absent => debug!(target = %target.display(), "no index yet"),
                Rebuild::Damaged => {
                    warn!(target = %target.display(), "existing index is damaged, rebuilding")
                }
                Rebuild::KindChanged => {
                    info!(target = %target.display(), "type changed from directory to file")
                }
            }
            rebuild_file(source, target)
        }
    }
}

/// Purge the target and re-chunk the source file from scratch.
fn rebuild_file(source: &Path, target: &Path) -> Result<()> {
    fsutil::empty_dir(target)?;

    let meta = fs::metadata(source)?;
    let mut reader = fs::File::open(source)?;
    let mut hasher = Sha512::new();
    let mut taken = HashSet::new();
    let mut parts = Vec::new();
    let mut offset = 0u64;
    let mut buffer = vec![0u8; CHUNK_CEILING as usize];

    loop {
        let filled = read_chunk(&mut reader, &mut buffer)?;
        if filled == 0 {
            break;
        }
        let chunk = &buffer[..filled];
        hasher.update(chunk);

        let filename = allocate_chunk_name(&mut taken)?;
        fs::write(target.join(&filename), container::encode(chunk))?;

        let length = filled as u64;
        parts.push(Part {
            filename,
            start: offset,
            end: offset + length,
            length,
        });
        offset += length;
    }

    let modified = time_ms(meta.modified()?);
    let accessed = time_ms(meta.accessed()?);
    // Not every platform records a birth time; fall back to mtime.
    let birth = meta.created().map(time_ms).unwrap_or(modified);

    debug!(
        source = %source.display(),
        bytes = offset,
        parts = parts.len(),
        "chunked"
    );

    Index::File(FileIndex {
        size: offset,
        birth_time_ms: birth,
        modified_ms: modified,
        accessed_ms: accessed,
        sha512: hex::encode(hasher.finalize()),
        parts,
    })
    .save(target)
}

fn spread_dir(source: &Path, target: &Path) -> Result<()> {
    let plan = classify_dir(Index::load(target))?;
    let mut rewrite = plan.forced.is_some();

    match plan.forced {
        Some(Rebuild::Absent) => debug!(target = %target.display(), "no index yet"),
        Some(Rebuild::Damaged) => {
            warn!(target = %target.display(), "existing index is damaged, rebuilding")
        }
        Some(Rebuild::KindChanged) => {
            info!(target = %target.display(), "type changed from file to directory")
        }
        None => {}
    }

    if plan.purge {
        fsutil::empty_dir(target)?;
    }

    let current = fsutil::child_names(source)?;
    if current.contains(INDEX_FILENAME) {
        return Err(Error::ReservedName(source.join(INDEX_FILENAME)));
    }

    // Deletion cascade: children recorded last time but gone from the source
    // lose their entire target subtree, not just their index.
    for name in &plan.known {
        if !current.contains(name) {
            info!(child = %name, "deleted from source, removing target subtree");
            fsutil::remove_tree(&target.join(name))?;
            rewrite = true;
        }
    }

    let known: HashSet<&str> = plan.known.iter().map(String::as_str).collect();
    let mut entries = Vec::with_capacity(current.len());
    for name in &current {
        if !known.contains(name.as_str()) {
            info!(child = %name, "added");
            rewrite = true;
        }
        spread(&source.join(name), &target.join(name))?;
        entries.push(name.clone());
    }

    if rewrite {
        Index::Directory(DirectoryIndex { entries }).save(target)?;
    }
    Ok(())
}

/// Fill `buffer` from `reader` as far as possible; a short count means EOF.
fn read_chunk(reader: &mut impl Read, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        let n = reader.read(&mut buffer[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// Pick a random chunk filename that no sibling chunk of this rebuild uses.
///
/// Collision checking runs against the allocation set, not a live directory
/// listing; the target was just purged, so the set is the complete picture.
fn allocate_chunk_name(taken: &mut HashSet<String>) -> Result<String> {
    let mut rng = rand::thread_rng();
    for _ in 0..CHUNK_NAME_ATTEMPTS {
        let name = format!("{:032x}.{}", rng.gen::<u128>(), CONTAINER_EXTENSION);
        if taken.insert(name.clone()) {
            return Ok(name);
        }
    }
    Err(Error::ChunkNameExhausted(CHUNK_NAME_ATTEMPTS))
}

fn time_ms(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_millis() as i64,
        Err(e) => -(e.duration().as_millis() as i64),
    }
}
