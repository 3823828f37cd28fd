//! Keeping the index documents' post lists in sync with the manifest.
//!
//! Each configured [`ReadmeTarget`] names a file and the exact heading that
//! precedes its post list. The list right after that heading is replaced
//! (or inserted when the heading is followed by something else) with one
//! `[title](url)` item per manifest record:
//!
//! ```markdown
//! ## Blog list
//!
//! * [Newest post](https://example.github.io/posts/<id>/)
//! * [Older post](https://example.github.io/posts/<id>/)
//! ```
//!
//! Targets are independent: a missing file or heading in one is reported and
//! the rest are still processed.

use crate::config::{BlogConfig, ReadmeTarget, SiteConfig};
use crate::manifest::Manifest;
use crate::markdown::{Document, MarkdownError, Node};
use crate::naming;
use chrono::{DateTime, FixedOffset};
use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadmeError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} has no heading {heading:?}")]
    HeadingNotFound { path: PathBuf, heading: String },
    #[error(transparent)]
    Markdown(#[from] MarkdownError),
}

/// One rendered list entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub title: String,
    pub url: String,
    pub date: Option<DateTime<FixedOffset>>,
}

/// What happened to the list under the heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListChange {
    Replaced,
    Inserted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadmeStatus {
    Updated(ListChange),
    /// The file already had exactly this content.
    Unchanged,
}

#[derive(Debug)]
pub struct ReadmeOutcome {
    pub target: ReadmeTarget,
    pub result: Result<ReadmeStatus, ReadmeError>,
}

/// Dated entries first, newest first; undated entries after them. Ties and
/// undated entries order by title, descending.
fn compare_entries(a: &Entry, b: &Entry) -> Ordering {
    match (&a.date, &b.date) {
        (Some(da), Some(db)) => db.cmp(da).then_with(|| b.title.cmp(&a.title)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.title.cmp(&a.title),
    }
}

/// One entry per manifest record, in list order.
pub fn sorted_entries(manifest: &Manifest, site: &SiteConfig) -> Vec<Entry> {
    let mut entries: Vec<Entry> = manifest
        .iter()
        .map(|(_, record)| Entry {
            title: record
                .title
                .clone()
                .unwrap_or_else(|| naming::title_from_post_name(&record.post_name)),
            url: site.absolute_url(&naming::permalink_path(&site.permalink_prefix, &record.id)),
            date: record.date.as_deref().and_then(naming::parse_timestamp),
        })
        .collect();
    entries.sort_by(compare_entries);
    entries
}

pub fn post_list(entries: &[Entry]) -> Node {
    Node::bullet_list(
        entries
            .iter()
            .map(|e| Node::link_item(e.title.as_str(), e.url.as_str()))
            .collect(),
    )
}

/// Put `list` right after the heading. `None` when the heading is missing.
pub fn reconcile_document(doc: &mut Document, heading: &str, list: Node) -> Option<ListChange> {
    let at = doc.find_heading(heading)? + 1;
    if doc.children.get(at).is_some_and(Node::is_list) {
        doc.children[at] = list;
        Some(ListChange::Replaced)
    } else {
        doc.children.insert(at, list);
        Some(ListChange::Inserted)
    }
}

/// Rewrite one target file. The file is only written when its content changes.
pub fn reconcile_target(
    root: &Path,
    target: &ReadmeTarget,
    list: &Node,
) -> Result<ReadmeStatus, ReadmeError> {
    let path = root.join(&target.path);
    let io_error = |source| ReadmeError::Io {
        path: path.clone(),
        source,
    };

    let before = fs::read_to_string(&path).map_err(io_error)?;
    let mut doc = Document::parse(&before);
    let change = reconcile_document(&mut doc, &target.heading, list.clone()).ok_or_else(|| {
        ReadmeError::HeadingNotFound {
            path: path.clone(),
            heading: target.heading.clone(),
        }
    })?;

    let after = doc.to_markdown()?;
    if after == before {
        return Ok(ReadmeStatus::Unchanged);
    }
    fs::write(&path, after).map_err(io_error)?;
    tracing::debug!(path = %path.display(), ?change, "post list written");
    Ok(ReadmeStatus::Updated(change))
}

/// Reconcile every configured target against `manifest`.
pub fn reconcile(root: &Path, config: &BlogConfig, manifest: &Manifest) -> Vec<ReadmeOutcome> {
    let list = post_list(&sorted_entries(manifest, &config.site));
    config
        .readme
        .iter()
        .map(|target| {
            let result = reconcile_target(root, target, &list);
            if let Err(e) = &result {
                tracing::warn!(language = %target.language, error = %e, "post list not updated");
            }
            ReadmeOutcome {
                target: target.clone(),
                result,
            }
        })
        .collect()
}
