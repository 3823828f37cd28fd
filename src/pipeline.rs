//! Ingesting one source document into the site.
//!
//! ```text
//! check extension ─► load manifest ─► clear temp dir ─► parse
//!     ─► [LocalizeImages] ─► [InjectFrontMatter] ─► write _posts/<date>-<stem>.md
//!     ─► upsert + persist manifest ─► reconcile READMEs
//! ```
//!
//! Document rewriting is an ordered list of [`Transform`] stages applied to
//! the parsed tree. Each stage keeps its own results (materialized images,
//! front-matter synthesis) for the final report.
//!
//! Failure policy: a failed download is recorded and skipped; everything
//! else aborts the run. The manifest is loaded before anything is written,
//! so a corrupt manifest leaves the site untouched.

use crate::config::{BlogConfig, FrontMatterConfig, ImagesConfig};
use crate::fetch::Fetcher;
use crate::frontmatter::{self, PostMeta, Synthesis};
use crate::imaging::ImageBackend;
use crate::manifest::{Manifest, ManifestError, PostRecord};
use crate::markdown::{Document, MarkdownError};
use crate::materialize::{Destination, ImageRole, MaterializeError, Materializer};
use crate::naming;
use crate::prompt::Prompter;
use crate::readme::{self, ReadmeOutcome};
use chrono::{DateTime, FixedOffset};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{0} is not a markdown file (expected a .md extension)")]
    UnsupportedInput(PathBuf),
    #[error("Manifest error: {0}")]
    Manifest(#[from] ManifestError),
    #[error("Image error: {0}")]
    Materialize(#[from] MaterializeError),
    #[error(transparent)]
    Markdown(#[from] MarkdownError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One step of document rewriting.
pub trait Transform {
    fn name(&self) -> &'static str;
    fn apply(&mut self, doc: &mut Document) -> Result<(), PipelineError>;
}

/// Apply `stages` in order, stopping at the first error.
pub fn run_transforms(
    doc: &mut Document,
    stages: &mut [&mut dyn Transform],
) -> Result<(), PipelineError> {
    for stage in stages.iter_mut() {
        debug!(stage = stage.name(), "applying transform");
        stage.apply(doc)?;
    }
    Ok(())
}

/// A remote image that could not be downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedImage {
    pub url: String,
    pub reason: String,
}

/// Image bookkeeping for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageTally {
    /// Remote image URLs found, in document order.
    pub expected: Vec<String>,
    /// Stored filenames, in document order.
    pub stored: Vec<String>,
    pub failed: Vec<FailedImage>,
    /// Covers whose ratio was corrected.
    pub corrected: usize,
}

/// Download every remote image and point its node at the local copy.
pub struct LocalizeImages<'a> {
    pub materializer: &'a Materializer<'a>,
    pub images: &'a ImagesConfig,
    pub tally: ImageTally,
}

impl Transform for LocalizeImages<'_> {
    fn name(&self) -> &'static str {
        "localize-images"
    }

    fn apply(&mut self, doc: &mut Document) -> Result<(), PipelineError> {
        let cover = doc.cover_image_path();
        for path in doc.image_paths() {
            let Some(url) = doc
                .node_at(&path)
                .and_then(|n| n.image_url())
                .filter(|u| self.images.is_remote(u))
                .map(str::to_string)
            else {
                continue;
            };
            self.tally.expected.push(url.clone());

            let role = if cover.as_ref() == Some(&path) {
                ImageRole::Cover
            } else {
                ImageRole::Inline
            };
            match self.materializer.materialize(&url, role) {
                Ok(image) => {
                    debug!(%url, file = %image.file_name, ?role, "image localized");
                    if let Some(node) = doc.node_at_mut(&path) {
                        node.set_image_url(&image.local_url);
                    }
                    if image.corrected {
                        self.tally.corrected += 1;
                    }
                    self.tally.stored.push(image.file_name);
                }
                Err(MaterializeError::Download(e)) => {
                    warn!(%url, error = %e, "image skipped");
                    self.tally.failed.push(FailedImage {
                        url,
                        reason: e.to_string(),
                    });
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

/// Pull out the cover and add front-matter when missing.
pub struct InjectFrontMatter<'a> {
    pub meta: PostMeta,
    pub defaults: &'a FrontMatterConfig,
    pub synthesis: Synthesis,
}

impl Transform for InjectFrontMatter<'_> {
    fn name(&self) -> &'static str {
        "inject-front-matter"
    }

    fn apply(&mut self, doc: &mut Document) -> Result<(), PipelineError> {
        self.synthesis = frontmatter::synthesize(doc, &self.meta, self.defaults);
        Ok(())
    }
}

/// Result of one ingestion.
#[derive(Debug)]
pub struct IngestReport {
    pub source: PathBuf,
    /// Manifest key of the record.
    pub key: String,
    pub id: String,
    pub post_name: String,
    pub post_path: PathBuf,
    /// Whether an existing record was reused.
    pub reingested: bool,
    pub images: ImageTally,
    pub synthesis: Synthesis,
    pub readme: Vec<ReadmeOutcome>,
}

/// Everything an ingestion run needs.
pub struct Ingestor<'a> {
    pub root: &'a Path,
    pub config: &'a BlogConfig,
    pub fetcher: &'a dyn Fetcher,
    pub backend: &'a dyn ImageBackend,
    pub prompter: &'a dyn Prompter,
}

impl Ingestor<'_> {
    pub fn ingest(
        &self,
        source: &Path,
        now: DateTime<FixedOffset>,
    ) -> Result<IngestReport, PipelineError> {
        if !naming::is_markdown(source) {
            return Err(PipelineError::UnsupportedInput(source.to_path_buf()));
        }
        let paths = self.config.paths.resolve(self.root);
        let mut manifest = Manifest::load(&paths.manifest)?;
        let text = fs::read_to_string(source)?;
        reset_dir(&paths.temp_images)?;

        let stem = naming::source_stem(source);
        let post_name = naming::post_file_name(&now, &stem);
        let existing = manifest
            .find_by_post_name(&post_name)
            .or_else(|| manifest.find_by_source_stem(&stem))
            .map(|(key, record)| (key.clone(), record.clone()));
        let reingested = existing.is_some();
        let (key, id, title, previous_post) = match existing {
            Some((key, record)) => {
                let previous = (record.post_name != post_name).then_some(record.post_name);
                (key, record.id, record.title, previous)
            }
            None => {
                let id = Uuid::new_v4().to_string();
                (id.clone(), id, None, None)
            }
        };
        info!(source = %source.display(), %post_name, %id, reingested, "ingesting");

        let mut doc = Document::parse(&text);
        let materializer = Materializer {
            fetcher: self.fetcher,
            backend: self.backend,
            prompter: self.prompter,
            config: &self.config.images,
            destination: Destination {
                temp_dir: paths.temp_images.clone(),
                image_dir: paths.images.clone(),
                url_prefix: self.config.site.image_url_prefix.clone(),
            },
        };
        let mut localize = LocalizeImages {
            materializer: &materializer,
            images: &self.config.images,
            tally: ImageTally::default(),
        };
        let mut inject = InjectFrontMatter {
            meta: PostMeta {
                id: id.clone(),
                title: stem,
                date: naming::format_timestamp(&now),
                permalink_prefix: self.config.site.permalink_prefix.clone(),
            },
            defaults: &self.config.front_matter,
            synthesis: Synthesis::default(),
        };
        run_transforms(&mut doc, &mut [&mut localize, &mut inject])?;

        fs::create_dir_all(&paths.posts)?;
        let post_path = paths.posts.join(&post_name);
        fs::write(&post_path, doc.to_markdown()?)?;
        if let Some(previous) = previous_post {
            let stale = paths.posts.join(&previous);
            match fs::remove_file(&stale) {
                Ok(()) => info!(post = %stale.display(), "removed earlier copy"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        manifest.upsert(
            key.clone(),
            PostRecord {
                id: id.clone(),
                post_name: post_name.clone(),
                title,
                date: Some(inject.meta.date.clone()),
                images: localize.tally.stored.clone(),
            },
        )?;
        manifest.persist()?;

        let readme = readme::reconcile(self.root, self.config, &manifest);

        Ok(IngestReport {
            source: source.to_path_buf(),
            key,
            id,
            post_name,
            post_path,
            reingested,
            images: localize.tally,
            synthesis: inject.synthesis,
            readme,
        })
    }
}

/// Remove and recreate a directory.
fn reset_dir(dir: &Path) -> std::io::Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    fs::create_dir_all(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::ImageKind;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp, info};
    use crate::readme::ReadmeStatus;
    use crate::test_helpers::{MockFetcher, ScriptedPrompter, fixed_now, png_bytes, setup_site};

    const COVER: &str = "https://img.example/cover.png";
    const INLINE: &str = "https://img.example/inline.png";
    const BROKEN: &str = "https://img.example/broken.png";

    fn write_source(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        path
    }

    // =========================================================================
    // Transform stages
    // =========================================================================

    struct Recorder(&'static str, Vec<&'static str>);

    impl Transform for Recorder {
        fn name(&self) -> &'static str {
            self.0
        }

        fn apply(&mut self, doc: &mut Document) -> Result<(), PipelineError> {
            self.1.push(self.0);
            doc.children.push(crate::markdown::Node::text(self.0));
            Ok(())
        }
    }

    #[test]
    fn transforms_run_in_order() {
        let mut doc = Document::default();
        let mut first = Recorder("first", Vec::new());
        let mut second = Recorder("second", Vec::new());
        run_transforms(&mut doc, &mut [&mut first, &mut second]).unwrap();

        let texts: Vec<String> = doc.children.iter().map(|n| n.plain_text()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert_eq!(first.1, vec!["first"]);
    }

    // =========================================================================
    // Ingestion
    // =========================================================================

    #[test]
    fn ingest_cover_inline_and_failed_download() {
        let (site, config) = setup_site();
        let source = write_source(
            site.path(),
            "My Post.md",
            &format!("![cover]({COVER})\n\nBody text.\n\n![a]({INLINE})\n\n![b]({BROKEN})\n\n![local](/already/local.png)\n"),
        );
        let fetcher = MockFetcher::new()
            .with(COVER, png_bytes(4, 4))
            .with(INLINE, png_bytes(4, 4));
        let backend = MockBackend::with_images(vec![
            info(ImageKind::Png, 1200, 630),
            info(ImageKind::Png, 10, 10),
        ]);
        let prompter = ScriptedPrompter::new();
        let ingestor = Ingestor {
            root: site.path(),
            config: &config,
            fetcher: &fetcher,
            backend: &backend,
            prompter: &prompter,
        };

        let report = ingestor.ingest(&source, fixed_now()).unwrap();

        assert_eq!(report.post_name, "2024-03-01-My Post.md");
        assert_eq!(report.key, report.id);
        assert!(!report.reingested);
        assert_eq!(report.images.expected, vec![COVER, INLINE, BROKEN]);
        assert_eq!(report.images.stored.len(), 2);
        assert_eq!(report.images.failed.len(), 1);
        assert_eq!(report.images.failed[0].url, BROKEN);
        assert!(report.synthesis.inserted);

        // Published document
        let published = fs::read_to_string(&report.post_path).unwrap();
        let doc = Document::parse(&published);
        let fm = doc.front_matter().unwrap();
        assert_eq!(frontmatter::field(fm, "title"), Some("My Post"));
        assert_eq!(frontmatter::field(fm, "date"), Some("2024-03-01 09:30:05 +0800"));
        let expected_permalink = format!("/posts/{}/", report.id);
        assert_eq!(frontmatter::field(fm, "permalink"), Some(expected_permalink.as_str()));
        let cover_line = format!("  path: /assets/img/blogs/{}", report.images.stored[0]);
        assert!(fm.lines().any(|l| l == cover_line));
        assert!(!published.contains(COVER));
        assert!(!published.contains(INLINE));
        assert!(published.contains(BROKEN));
        assert!(published.contains("/already/local.png"));
        assert_eq!(doc.image_paths().len(), 3);

        // Manifest
        let manifest = Manifest::load(&site.path().join("_data/blogs.json")).unwrap();
        let record = manifest.get(&report.key).unwrap();
        assert_eq!(record.post_name, report.post_name);
        assert_eq!(record.images, report.images.stored);
        for name in &record.images {
            assert!(site.path().join("assets/img/blogs").join(name).exists());
        }

        // READMEs
        assert!(
            report
                .readme
                .iter()
                .all(|o| matches!(o.result, Ok(ReadmeStatus::Updated(_))))
        );
        let readme = fs::read_to_string(site.path().join("README.md")).unwrap();
        assert!(readme.contains(&format!("[My Post](https://example.github.io/posts/{}/)", report.id)));

        // Only the cover was questioned... and it already had the target ratio
        assert!(prompter.questions().is_empty());
        let identifies = backend
            .get_operations()
            .iter()
            .filter(|op| matches!(op, RecordedOp::Identify(_)))
            .count();
        assert_eq!(identifies, 2);
    }

    #[test]
    fn existing_front_matter_is_kept() {
        let (site, config) = setup_site();
        let source = write_source(
            site.path(),
            "kept.md",
            "---\ntitle: Hand written\n---\n\nBody.\n",
        );
        let ingestor = Ingestor {
            root: site.path(),
            config: &config,
            fetcher: &MockFetcher::new(),
            backend: &MockBackend::new(),
            prompter: &ScriptedPrompter::new(),
        };

        let report = ingestor.ingest(&source, fixed_now()).unwrap();
        assert!(!report.synthesis.inserted);
        let published = fs::read_to_string(&report.post_path).unwrap();
        assert!(published.starts_with("---\ntitle: Hand written\n---\n"));
    }

    #[test]
    fn reingesting_same_post_name_reuses_id() {
        let (site, config) = setup_site();
        let source = write_source(site.path(), "again.md", "Body.\n");
        let fetcher = MockFetcher::new();
        let backend = MockBackend::new();
        let prompter = ScriptedPrompter::new();
        let ingestor = Ingestor {
            root: site.path(),
            config: &config,
            fetcher: &fetcher,
            backend: &backend,
            prompter: &prompter,
        };

        let first = ingestor.ingest(&source, fixed_now()).unwrap();
        let second = ingestor.ingest(&source, fixed_now()).unwrap();

        assert!(second.reingested);
        assert_eq!(first.id, second.id);
        assert_eq!(first.key, second.key);
        let manifest = Manifest::load(&site.path().join("_data/blogs.json")).unwrap();
        assert_eq!(manifest.len(), 1);
    }

    #[test]
    fn reingesting_on_a_later_day_replaces_the_post() {
        let (site, config) = setup_site();
        let source = write_source(site.path(), "again.md", "Body.\n");
        let fetcher = MockFetcher::new();
        let backend = MockBackend::new();
        let prompter = ScriptedPrompter::new();
        let ingestor = Ingestor {
            root: site.path(),
            config: &config,
            fetcher: &fetcher,
            backend: &backend,
            prompter: &prompter,
        };

        let first = ingestor.ingest(&source, fixed_now()).unwrap();
        let later = fixed_now() + chrono::Duration::days(3);
        let second = ingestor.ingest(&source, later).unwrap();

        assert!(second.reingested);
        assert_eq!(first.id, second.id);
        assert_eq!(second.post_name, "2024-03-04-again.md");
        assert!(!first.post_path.exists());
        assert!(second.post_path.exists());

        let manifest = Manifest::load(&site.path().join("_data/blogs.json")).unwrap();
        assert_eq!(manifest.len(), 1);
        assert_eq!(
            manifest.get(&second.key).unwrap().post_name,
            "2024-03-04-again.md"
        );
        let readme = fs::read_to_string(site.path().join("README.md")).unwrap();
        assert_eq!(readme.matches("[again]").count(), 1, "{readme}");
    }

    #[test]
    fn distinct_sources_never_share_an_id() {
        let (site, config) = setup_site();
        let one = write_source(site.path(), "one.md", "First.\n");
        let two = write_source(site.path(), "two.md", "Second.\n");
        let ingestor = Ingestor {
            root: site.path(),
            config: &config,
            fetcher: &MockFetcher::new(),
            backend: &MockBackend::new(),
            prompter: &ScriptedPrompter::new(),
        };

        let first = ingestor.ingest(&one, fixed_now()).unwrap();
        let second = ingestor.ingest(&two, fixed_now()).unwrap();
        assert_ne!(first.id, second.id);

        let mut manifest = Manifest::load(&site.path().join("_data/blogs.json")).unwrap();
        assert_eq!(manifest.len(), 2);
        let mut stolen = manifest.get(&second.key).unwrap().clone();
        stolen.id = first.id.clone();
        let err = manifest.upsert(second.key.clone(), stolen).unwrap_err();
        assert!(
            matches!(err, ManifestError::DuplicateId { ref existing, .. } if *existing == first.key),
            "{err}"
        );
    }

    #[test]
    fn rejects_non_markdown_before_touching_site() {
        let (site, config) = setup_site();
        let source = write_source(site.path(), "notes.txt", "hello");
        let ingestor = Ingestor {
            root: site.path(),
            config: &config,
            fetcher: &MockFetcher::new(),
            backend: &MockBackend::new(),
            prompter: &ScriptedPrompter::new(),
        };

        let result = ingestor.ingest(&source, fixed_now());
        assert!(matches!(result, Err(PipelineError::UnsupportedInput(_))));
        assert!(!site.path().join("_posts").exists());
    }

    #[test]
    fn corrupt_manifest_aborts_with_nothing_written() {
        let (site, config) = setup_site();
        fs::write(site.path().join("_data/blogs.json"), "[1, 2]").unwrap();
        let source = write_source(site.path(), "post.md", "Body.\n");
        let ingestor = Ingestor {
            root: site.path(),
            config: &config,
            fetcher: &MockFetcher::new(),
            backend: &MockBackend::new(),
            prompter: &ScriptedPrompter::new(),
        };

        let result = ingestor.ingest(&source, fixed_now());
        assert!(matches!(
            result,
            Err(PipelineError::Manifest(ManifestError::Corrupt { .. }))
        ));
        assert!(!site.path().join("_posts").exists());
        assert_eq!(
            fs::read_to_string(site.path().join("_data/blogs.json")).unwrap(),
            "[1, 2]"
        );
    }

    #[test]
    fn encode_failure_aborts_before_publishing() {
        let (site, config) = setup_site();
        let source = write_source(site.path(), "post.md", &format!("Intro\n\n![a]({INLINE})\n"));
        let fetcher = MockFetcher::new().with(INLINE, png_bytes(2, 2));
        // No identify result queued: the backend fails
        let backend = MockBackend::new();
        let ingestor = Ingestor {
            root: site.path(),
            config: &config,
            fetcher: &fetcher,
            backend: &backend,
            prompter: &ScriptedPrompter::new(),
        };

        let result = ingestor.ingest(&source, fixed_now());
        assert!(matches!(
            result,
            Err(PipelineError::Materialize(MaterializeError::Encode(_)))
        ));
        assert!(!site.path().join("_posts").exists());
    }

    #[test]
    fn temp_dir_is_cleared_each_run() {
        let (site, config) = setup_site();
        let stale = site.path().join(".blog-digest-temp/stale.png");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, b"old").unwrap();
        let source = write_source(site.path(), "post.md", "Body.\n");
        let ingestor = Ingestor {
            root: site.path(),
            config: &config,
            fetcher: &MockFetcher::new(),
            backend: &MockBackend::new(),
            prompter: &ScriptedPrompter::new(),
        };

        ingestor.ingest(&source, fixed_now()).unwrap();
        assert!(!stale.exists());
    }
}
