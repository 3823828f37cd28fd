//! Batch repairs over every published post (`blog-digest sync <mode>`).
//!
//! - `permalink`: make each post's front-matter `permalink` match its record id
//! - `date`: copy each post's front-matter `date` into its manifest record
//! - `readme`: regenerate the README post lists
//!
//! Posts are matched to records by filename ([`Manifest::find_by_post_name`]).

use crate::config::BlogConfig;
use crate::frontmatter;
use crate::manifest::{Manifest, ManifestError};
use crate::markdown::{Document, MarkdownError};
use crate::naming;
use crate::readme::{self, ReadmeOutcome};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MaintenanceError {
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error(transparent)]
    Markdown(#[from] MarkdownError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoRecord,
    NoFrontMatter,
    NoDate,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SkipReason::NoRecord => "no manifest record",
            SkipReason::NoFrontMatter => "no front-matter",
            SkipReason::NoDate => "no date field",
        })
    }
}

/// Per-post results of a batch repair, by post filename.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> MaintenanceError + '_ {
    move |source| MaintenanceError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Published markdown files, sorted by name. A missing directory has none.
fn published_posts(dir: &Path) -> Result<Vec<(String, PathBuf)>, MaintenanceError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(dir)(e)),
    };
    let mut posts = Vec::new();
    for entry in entries {
        let path = entry.map_err(io_error(dir))?.path();
        if path.is_file() && naming::is_markdown(&path) {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            posts.push((name, path));
        }
    }
    posts.sort();
    Ok(posts)
}

fn read_post(path: &Path) -> Result<Document, MaintenanceError> {
    let text = fs::read_to_string(path).map_err(io_error(path))?;
    Ok(Document::parse(&text))
}

/// Point every post's `permalink` at its record id.
pub fn repair_permalinks(
    root: &Path,
    config: &BlogConfig,
) -> Result<MaintenanceReport, MaintenanceError> {
    let paths = config.paths.resolve(root);
    let manifest = Manifest::load(&paths.manifest)?;
    let mut report = MaintenanceReport::default();

    for (name, path) in published_posts(&paths.posts)? {
        let Some((_, record)) = manifest.find_by_post_name(&name) else {
            report.skipped.push((name, SkipReason::NoRecord));
            continue;
        };
        let mut doc = read_post(&path)?;
        let Some(fm) = doc.front_matter_mut() else {
            report.skipped.push((name, SkipReason::NoFrontMatter));
            continue;
        };

        let permalink = naming::permalink_path(&config.site.permalink_prefix, &record.id);
        let repaired = frontmatter::set_permalink(fm, &permalink);
        if repaired == *fm {
            report.unchanged.push(name);
            continue;
        }
        *fm = repaired;
        fs::write(&path, doc.to_markdown()?).map_err(io_error(&path))?;
        tracing::debug!(post = %name, %permalink, "permalink repaired");
        report.updated.push(name);
    }
    Ok(report)
}

/// Copy every post's front-matter `date` into its record. Persists once.
pub fn backfill_dates(
    root: &Path,
    config: &BlogConfig,
) -> Result<MaintenanceReport, MaintenanceError> {
    let paths = config.paths.resolve(root);
    let mut manifest = Manifest::load(&paths.manifest)?;
    let mut report = MaintenanceReport::default();

    for (name, path) in published_posts(&paths.posts)? {
        let Some(key) = manifest.find_by_post_name(&name).map(|(k, _)| k.clone()) else {
            report.skipped.push((name, SkipReason::NoRecord));
            continue;
        };
        let doc = read_post(&path)?;
        let Some(fm) = doc.front_matter() else {
            report.skipped.push((name, SkipReason::NoFrontMatter));
            continue;
        };
        let Some(date) = frontmatter::field(fm, "date").filter(|d| !d.is_empty()) else {
            report.skipped.push((name, SkipReason::NoDate));
            continue;
        };

        match manifest.get_mut(&key) {
            Some(record) if record.date.as_deref() != Some(date) => {
                record.date = Some(date.to_string());
                report.updated.push(name);
            }
            _ => report.unchanged.push(name),
        }
    }

    if !report.updated.is_empty() {
        manifest.persist()?;
    }
    Ok(report)
}

/// Regenerate every configured README post list.
pub fn sync_readmes(root: &Path, config: &BlogConfig) -> Result<Vec<ReadmeOutcome>, MaintenanceError> {
    let manifest = Manifest::load(&config.paths.resolve(root).manifest)?;
    Ok(readme::reconcile(root, config, &manifest))
}
