//! Storage layer for tagtask data.
//!
//! All state lives in a single JSON document (normally
//! `.taskmaster/tasks/tasks.json`) mapping tag names to task lists:
//!
//! ```json
//! { "master": { "tasks": [ ... ], "metadata": { "created": "...", "description": "..." } } }
//! ```
//!
//! The document is read in full, mutated in memory, and rewritten in full.
//! Writes go through a temporary file that is renamed over the target, and a
//! SHA-256 digest taken at load time is checked before every write so a
//! concurrent writer is detected instead of silently overwritten.

use crate::models::{TagData, TagMetadata, TaggedData, Task};
use crate::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Tag used when a legacy single-list file is read.
pub const LEGACY_TAG: &str = "master";

/// Storage manager for one tasks file.
#[derive(Debug)]
pub struct Storage {
    /// Path to the tasks file
    path: PathBuf,
    /// Digest of the bytes seen by the last load or save
    revision: Option<String>,
}

impl Storage {
    /// Create a store over `path`. Nothing is read until a load.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            revision: None,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Check whether the backing file exists.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Create the backing file with an empty `master` tag if it does not exist.
    ///
    /// Returns `true` when a new file was written.
    pub fn init(&mut self) -> Result<bool> {
        if self.exists() {
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut data = TaggedData::default();
        data.insert(
            LEGACY_TAG.to_string(),
            TagData::new(Some("Tasks for master context".to_string())),
        );
        self.revision = None;
        self.save(&data)?;
        Ok(true)
    }

    /// Load the full multi-tag document without selecting a tag.
    pub fn load_raw(&mut self) -> Result<TaggedData> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(self.invalid("file not found"));
            }
            Err(e) => return Err(e.into()),
        };
        let content = String::from_utf8(bytes)
            .map_err(|e| self.invalid(&format!("not valid UTF-8: {}", e)))?;
        let data = parse_document(&content).map_err(|reason| self.invalid(&reason))?;

        self.revision = Some(digest(content.as_bytes()));
        debug!(path = %self.path.display(), tags = data.tag_names().count(), "loaded tasks file");
        Ok(data)
    }

    /// Load the document and select `tag` for convenient access.
    ///
    /// The returned view still owns the full document; see [`ResolvedView::into_raw`].
    pub fn load_resolved(&mut self, tag: &str) -> Result<ResolvedView> {
        let raw = self.load_raw()?;
        Ok(ResolvedView {
            tag: tag.to_string(),
            raw,
        })
    }

    /// Rewrite the whole document.
    ///
    /// Fails with [`Error::ConcurrentModification`] if the file changed since
    /// the last load or save through this store.
    pub fn save(&mut self, data: &TaggedData) -> Result<()> {
        if let Some(expected) = &self.revision {
            let current = match fs::read(&self.path) {
                Ok(bytes) => Some(digest(&bytes)),
                Err(e) if e.kind() == ErrorKind::NotFound => None,
                Err(e) => return Err(e.into()),
            };
            if current.as_ref() != Some(expected) {
                return Err(Error::ConcurrentModification {
                    path: self.path.display().to_string(),
                });
            }
        }

        let mut content = serde_json::to_string_pretty(data)?;
        content.push('\n');

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        self.revision = Some(digest(content.as_bytes()));
        info!(path = %self.path.display(), "saved tasks file");
        Ok(())
    }

    fn invalid(&self, reason: &str) -> Error {
        Error::InvalidTasksFile {
            path: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// A tag-selected view over the full document.
#[derive(Debug, Clone)]
pub struct ResolvedView {
    tag: String,
    raw: TaggedData,
}

impl ResolvedView {
    /// The selected tag name.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Tasks of the selected tag (empty when the tag does not exist).
    pub fn tasks(&self) -> &[Task] {
        self.raw
            .get(&self.tag)
            .map(|t| t.tasks.as_slice())
            .unwrap_or(&[])
    }

    /// Metadata of the selected tag, if the tag exists.
    pub fn metadata(&self) -> Option<&TagMetadata> {
        self.raw.get(&self.tag).map(|t| &t.metadata)
    }

    /// Borrow the full multi-tag document.
    pub fn raw(&self) -> &TaggedData {
        &self.raw
    }

    /// Recover the full multi-tag document.
    pub fn into_raw(self) -> TaggedData {
        self.raw
    }
}

/// Parse the on-disk document.
///
/// Accepts the tagged layout and the legacy `{ "tasks": [...] }` layout (read
/// as the `master` tag). Top-level keys starting with `_` are transient caches
/// and are dropped. Returns a human-readable reason on failure.
pub fn parse_document(content: &str) -> std::result::Result<TaggedData, String> {
    let value: serde_json::Value =
        serde_json::from_str(content).map_err(|e| format!("malformed JSON: {}", e))?;
    let serde_json::Value::Object(mut map) = value else {
        return Err("top-level value must be an object".to_string());
    };

    if map.get("tasks").is_some_and(serde_json::Value::is_array) {
        let tasks = map.remove("tasks").unwrap_or_default();
        let metadata = map.remove("metadata").unwrap_or_default();
        map.clear();
        let mut legacy = serde_json::Map::new();
        legacy.insert("tasks".to_string(), tasks);
        if !metadata.is_null() {
            legacy.insert("metadata".to_string(), metadata);
        }
        map.insert(LEGACY_TAG.to_string(), serde_json::Value::Object(legacy));
    }

    let mut data = TaggedData::default();
    for (name, value) in map {
        if name.starts_with('_') {
            continue;
        }
        if !value.is_object() {
            return Err(format!("tag \"{}\" must be an object", name));
        }
        let tag: TagData =
            serde_json::from_value(value).map_err(|e| format!("tag \"{}\": {}", name, e))?;
        data.insert(name, tag);
    }
    Ok(data)
}

fn digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
