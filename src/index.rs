//! The per-directory index document.
//!
//! Every synchronized directory holds a reserved container, `__index.bmp`,
//! whose payload is a JSON document describing the node it mirrors: either a
//! file (size, timestamps, content digest, chunk list) or a directory (child
//! names). The document is deserialized into a tagged [`Index`] value exactly
//! once and validated at parse time; everything downstream consumes the typed
//! value.

use crate::config::INDEX_FILENAME;
use crate::container;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// One bounded slice of a source file, stored as a sibling chunk container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part {
    /// Target-local filename of the chunk container.
    pub filename: String,
    /// Offset of the first payload byte in the original file.
    #[serde(rename = "startPos")]
    pub start: u64,
    /// Offset one past the last payload byte (half-open range).
    #[serde(rename = "endPos")]
    pub end: u64,
    /// Payload length in bytes.
    pub length: u64,
}

/// Index record for a source file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileIndex {
    /// Total content length in bytes.
    #[serde(rename = "filesize")]
    pub size: u64,
    /// Creation time, milliseconds since the Unix epoch.
    #[serde(rename = "birthTime")]
    pub birth_time_ms: i64,
    /// Last-modified time, milliseconds since the Unix epoch.
    #[serde(rename = "lastModified")]
    pub modified_ms: i64,
    /// Last-read time, milliseconds since the Unix epoch.
    #[serde(rename = "lastRead")]
    pub accessed_ms: i64,
    /// SHA-512 over the full content in stream order, lowercase hex.
    pub sha512: String,
    /// Chunk descriptors; must tile `[0, size)` with no gaps or overlaps.
    pub parts: Vec<Part>,
}

impl FileIndex {
    /// Parts sorted by ascending start offset.
    pub fn parts_in_order(&self) -> Vec<&Part> {
        let mut parts: Vec<&Part> = self.parts.iter().collect();
        parts.sort_by_key(|p| p.start);
        parts
    }

    fn validate(&self) -> Result<()> {
        let mut cursor = 0u64;
        for part in self.parts_in_order() {
            if part.length == 0 {
                return Err(Error::IndexInvalid(format!(
                    "part {} has zero length",
                    part.filename
                )));
            }
            if part.start != cursor {
                return Err(Error::IndexInvalid(format!(
                    "parts do not tile the file: expected offset {}, part {} starts at {}",
                    cursor, part.filename, part.start
                )));
            }
            match part.start.checked_add(part.length) {
                Some(end) if end == part.end => cursor = end,
                _ => {
                    return Err(Error::IndexInvalid(format!(
                        "part {} range [{}, {}) disagrees with its length {}",
                        part.filename, part.start, part.end, part.length
                    )));
                }
            }
        }
        if cursor != self.size {
            return Err(Error::IndexInvalid(format!(
                "parts cover {} bytes of a {}-byte file",
                cursor, self.size
            )));
        }
        Ok(())
    }
}

/// Index record for a source directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryIndex {
    /// Child names present at the last successful spread. Membership matters;
    /// order does not.
    pub entries: Vec<String>,
}

impl DirectoryIndex {
    fn validate(&self) -> Result<()> {
        for name in &self.entries {
            let valid = !name.is_empty()
                && name != "."
                && name != ".."
                && name != INDEX_FILENAME
                && !name.contains(&['/', '\\'][..]);
            if !valid {
                return Err(Error::IndexInvalid(format!(
                    "entry name {:?} is not a valid child name",
                    name
                )));
            }
        }
        Ok(())
    }
}

/// The index document stored at a directory's reserved path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Index {
    /// The mirrored source node is a file.
    File(FileIndex),
    /// The mirrored source node is a directory.
    Directory(DirectoryIndex),
}

impl Index {
    /// Get the reserved index container path for a directory.
    pub fn file_path(dir: &Path) -> PathBuf {
        dir.join(INDEX_FILENAME)
    }

    /// Parse and validate an index document from a decoded container payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let index: Index = serde_json::from_slice(payload)?;
        match &index {
            Index::File(file) => file.validate()?,
            Index::Directory(dir) => dir.validate()?,
        }
        Ok(index)
    }

    /// Serialize to the container payload form.
    ///
    /// Indented JSON; the storage services this feeds have space to spare and
    /// the indices stay greppable.
    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Load the index stored in `dir`.
    ///
    /// Fails with [`Error::IndexMissing`] if the reserved container is
    /// absent, a container format error if it cannot be decoded, or
    /// [`Error::IndexInvalid`] if the document does not parse.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = Self::file_path(dir);
        let raw = match fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::IndexMissing(path));
            }
            Err(e) => return Err(e.into()),
        };
        Self::parse(&container::decode(&raw)?)
    }

    /// Persist the index into `dir` at the reserved path.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let container = container::encode(&self.to_payload()?);
        fs::write(Self::file_path(dir), container)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_file_index() -> FileIndex {
        FileIndex {
            size: 12,
            birth_time_ms: 1_500_000_000_000,
            modified_ms: 1_500_000_100_000,
            accessed_ms: 1_500_000_200_000,
            sha512: "ab".repeat(64),
            parts: vec![
                Part {
                    filename: "a.bmp".to_string(),
                    start: 0,
                    end: 8,
                    length: 8,
                },
                Part {
                    filename: "b.bmp".to_string(),
                    start: 8,
                    end: 12,
                    length: 4,
                },
            ],
        }
    }

    #[test]
    fn test_file_roundtrip() {
        let index = Index::File(sample_file_index());
        let payload = index.to_payload().unwrap();

        let parsed = Index::parse(&payload).unwrap();
        match parsed {
            Index::File(file) => {
                assert_eq!(file.size, 12);
                assert_eq!(file.parts.len(), 2);
                assert_eq!(file.parts[1].start, 8);
            }
            Index::Directory(_) => panic!("expected file index"),
        }
    }

    #[test]
    fn test_directory_roundtrip() {
        let index = Index::Directory(DirectoryIndex {
            entries: vec!["docs".to_string(), "☂.txt".to_string()],
        });
        let payload = index.to_payload().unwrap();

        match Index::parse(&payload).unwrap() {
            Index::Directory(dir) => assert_eq!(dir.entries.len(), 2),
            Index::File(_) => panic!("expected directory index"),
        }
    }

    #[test]
    fn test_wire_field_names() {
        let payload = Index::File(sample_file_index()).to_payload().unwrap();
        let text = String::from_utf8(payload).unwrap();

        for field in [
            "\"type\"",
            "\"file\"",
            "\"filesize\"",
            "\"birthTime\"",
            "\"lastModified\"",
            "\"lastRead\"",
            "\"sha512\"",
            "\"startPos\"",
            "\"endPos\"",
        ] {
            assert!(text.contains(field), "missing {} in {}", field, text);
        }
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = Index::parse(br#"{"type":"symlink"}"#).unwrap_err();
        assert!(matches!(err, Error::IndexInvalid(_)));
    }

    #[test]
    fn test_not_an_object_rejected() {
        assert!(matches!(
            Index::parse(b"[1,2,3]").unwrap_err(),
            Error::IndexInvalid(_)
        ));
        assert!(matches!(
            Index::parse(b"not json at all").unwrap_err(),
            Error::IndexInvalid(_)
        ));
    }

    #[test]
    fn test_missing_type_rejected() {
        let err = Index::parse(br#"{"entries":[]}"#).unwrap_err();
        assert!(matches!(err, Error::IndexInvalid(_)));
    }

    #[test]
    fn test_non_string_entry_rejected() {
        let err = Index::parse(br#"{"type":"directory","entries":["ok",7]}"#).unwrap_err();
        assert!(matches!(err, Error::IndexInvalid(_)));
    }

    #[test]
    fn test_reserved_entry_name_rejected() {
        let raw = format!(r#"{{"type":"directory","entries":["{}"]}}"#, INDEX_FILENAME);
        let err = Index::parse(raw.as_bytes()).unwrap_err();
        assert!(matches!(err, Error::IndexInvalid(_)));
    }

    #[test]
    fn test_entry_with_separator_rejected() {
        let err = Index::parse(br#"{"type":"directory","entries":["a/b"]}"#).unwrap_err();
        assert!(matches!(err, Error::IndexInvalid(_)));
    }

    #[test]
    fn test_part_gap_rejected() {
        let mut file = sample_file_index();
        file.parts[1].start = 9;
        file.parts[1].end = 13;
        file.size = 13;

        let payload = serde_json::to_vec(&Index::File(file)).unwrap();
        let err = Index::parse(&payload).unwrap_err();
        assert!(matches!(err, Error::IndexInvalid(_)));
    }

    #[test]
    fn test_part_overlap_rejected() {
        let mut file = sample_file_index();
        file.parts[1].start = 7;
        file.parts[1].end = 11;

        let payload = serde_json::to_vec(&Index::File(file)).unwrap();
        assert!(matches!(
            Index::parse(&payload).unwrap_err(),
            Error::IndexInvalid(_)
        ));
    }

    #[test]
    fn test_parts_short_of_filesize_rejected() {
        let mut file = sample_file_index();
        file.size = 20;

        let payload = serde_json::to_vec(&Index::File(file)).unwrap();
        assert!(matches!(
            Index::parse(&payload).unwrap_err(),
            Error::IndexInvalid(_)
        ));
    }

    #[test]
    fn test_inconsistent_part_range_rejected() {
        let mut file = sample_file_index();
        file.parts[0].end = 9; // length still says 8

        let payload = serde_json::to_vec(&Index::File(file)).unwrap();
        assert!(matches!(
            Index::parse(&payload).unwrap_err(),
            Error::IndexInvalid(_)
        ));
    }

    #[test]
    fn test_unordered_parts_accepted() {
        let mut file = sample_file_index();
        file.parts.reverse();

        let payload = serde_json::to_vec(&Index::File(file)).unwrap();
        let parsed = Index::parse(&payload).unwrap();
        match parsed {
            Index::File(file) => {
                let ordered = file.parts_in_order();
                assert_eq!(ordered[0].start, 0);
                assert_eq!(ordered[1].start, 8);
            }
            Index::Directory(_) => panic!("expected file index"),
        }
    }

    #[test]
    fn test_empty_file_index_valid() {
        let payload = serde_json::to_vec(&Index::File(FileIndex {
            size: 0,
            birth_time_ms: 0,
            modified_ms: 0,
            accessed_ms: 0,
            sha512: String::new(),
            parts: Vec::new(),
        }))
        .unwrap();

        assert!(Index::parse(&payload).is_ok());
    }

    #[test]
    fn test_load_missing() {
        let dir = TempDir::new().unwrap();
        let err = Index::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::IndexMissing(_)));
        assert!(err.is_stale_index());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let index = Index::Directory(DirectoryIndex {
            entries: vec!["a".to_string(), "b".to_string()],
        });

        index.save(dir.path()).unwrap();
        assert!(Index::file_path(dir.path()).exists());

        match Index::load(dir.path()).unwrap() {
            Index::Directory(dir) => assert_eq!(dir.entries, vec!["a", "b"]),
            Index::File(_) => panic!("expected directory index"),
        }
    }

    #[test]
    fn test_load_garbage_container() {
        let dir = TempDir::new().unwrap();
        std::fs::write(Index::file_path(dir.path()), b"BMnot really a bitmap").unwrap();

        let err = Index::load(dir.path()).unwrap_err();
        assert!(err.is_stale_index());
    }
}
