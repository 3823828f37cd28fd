//! The post manifest: one JSON object mapping a post key to its record.
//!
//! ```json
//! {
//!   "1b4d4ddb-7620-477e-b1f9-8f3ce24574e4": {
//!     "id": "1b4d4ddb-7620-477e-b1f9-8f3ce24574e4",
//!     "postName": "2024-03-01-notes.md",
//!     "title": "notes",
//!     "date": "2024-03-01 09:30:05 +0800",
//!     "images": ["0f7c2a31-9d1e-4c55-a0b7-3f6e1c2d9a10.jpeg"]
//!   }
//! }
//! ```
//!
//! New records are keyed by their id. Older manifests keyed by source
//! filename still load; [`Manifest::find_by_post_name`] is the lookup that
//! works regardless of which convention produced a key.
//!
//! The whole file is read into memory, mutated, and rewritten on
//! [`Manifest::persist`]. Writes go to a sibling temp file that is renamed
//! over the manifest, so an interrupted run never leaves half a file behind.
//! There is no locking: one writer at a time.

use crate::naming;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Manifest {path} is corrupt: {reason}")]
    Corrupt { path: PathBuf, reason: String },
    #[error("Invalid post record for {key}: {reason}")]
    InvalidRecord { key: String, reason: String },
    #[error("Post id {id} already belongs to {existing}")]
    DuplicateId { id: String, existing: String },
    #[error("Post name {post_name} already belongs to {existing}")]
    DuplicatePostName { post_name: String, existing: String },
}

/// One published post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    /// Generated once at ingestion; the permalink is built from it.
    #[serde(default)]
    pub id: String,
    /// Published filename, e.g. `2024-03-01-notes.md`.
    #[serde(default)]
    pub post_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Ingestion timestamp. Absent in manifests that predate dates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// Materialized image filenames in document order.
    #[serde(default)]
    pub images: Vec<String>,
}

/// In-memory copy of the manifest file.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    posts: BTreeMap<String, PostRecord>,
}

impl Manifest {
    /// An empty manifest that will persist to `path`.
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            posts: BTreeMap::new(),
        }
    }

    /// Load the manifest at `path`.
    ///
    /// A missing file is an empty manifest. A file that is not a JSON object
    /// of records is [`ManifestError::Corrupt`].
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let content = match fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::empty(path)),
            Err(e) => return Err(e.into()),
        };
        let corrupt = |reason: String| ManifestError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };
        let value: serde_json::Value =
            serde_json::from_str(&content).map_err(|e| corrupt(e.to_string()))?;
        if !value.is_object() {
            return Err(corrupt("top-level value is not an object".into()));
        }
        let posts: BTreeMap<String, PostRecord> =
            serde_json::from_value(value).map_err(|e| corrupt(e.to_string()))?;
        Ok(Self {
            path: path.to_path_buf(),
            posts,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&PostRecord> {
        self.posts.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut PostRecord> {
        self.posts.get_mut(key)
    }

    /// All records, ordered by key.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PostRecord)> {
        self.posts.iter()
    }

    /// Find the record whose published filename is `name`.
    pub fn find_by_post_name(&self, name: &str) -> Option<(&String, &PostRecord)> {
        self.posts.iter().find(|(_, r)| r.post_name == name)
    }

    /// Find the record published from a source with this stem, on any date.
    pub fn find_by_source_stem(&self, stem: &str) -> Option<(&String, &PostRecord)> {
        self.posts
            .iter()
            .find(|(_, r)| naming::title_from_post_name(&r.post_name) == stem)
    }

    /// Insert or replace the record for `key`.
    ///
    /// Rejects records without an id or post name, and records whose id or
    /// post name is already used under a different key.
    pub fn upsert(&mut self, key: impl Into<String>, record: PostRecord) -> Result<(), ManifestError> {
        let key = key.into();
        let invalid = |reason: &str| ManifestError::InvalidRecord {
            key: key.clone(),
            reason: reason.to_string(),
        };
        if record.id.trim().is_empty() {
            return Err(invalid("missing id"));
        }
        if record.post_name.trim().is_empty() {
            return Err(invalid("missing postName"));
        }
        for (other_key, other) in self.posts.iter().filter(|(k, _)| **k != key) {
            if other.id == record.id {
                return Err(ManifestError::DuplicateId {
                    id: record.id,
                    existing: other_key.clone(),
                });
            }
            if other.post_name == record.post_name {
                return Err(ManifestError::DuplicatePostName {
                    post_name: record.post_name,
                    existing: other_key.clone(),
                });
            }
        }
        self.posts.insert(key, record);
        Ok(())
    }

    /// Write the full manifest as pretty JSON, atomically.
    pub fn persist(&self) -> Result<(), ManifestError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut json = serde_json::to_string_pretty(&self.posts)?;
        json.push('\n');

        let tmp = temp_path(&self.path);
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        tracing::debug!(path = %self.path.display(), posts = self.posts.len(), "manifest persisted");
        Ok(())
    }
}

/// Sibling path used for the write-then-rename.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
