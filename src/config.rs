//! Site configuration module.
//!
//! Handles loading, validating, and merging `blog.toml`. The stock defaults
//! are the base layer; a `blog.toml` in the site root overrides any subset of
//! keys. Every path in the config is relative to the site root.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [paths]
//! manifest = "_data/blogs.json"    # Post manifest (JSON object)
//! posts = "_posts"                 # Published markdown documents
//! images = "assets/img/blogs"      # Published images
//! temp_images = ".blog-digest-temp" # In-flight downloads, cleared every run
//!
//! [site]
//! url = "https://example.github.io"
//! permalink_prefix = "/posts"
//! image_url_prefix = "/assets/img/blogs"
//! timezone = "+08:00"
//!
//! [front_matter]
//! categories = ["Blog"]
//! tags = ["notes"]
//!
//! [images]
//! remote_prefixes = ["http://", "https://"]
//! jpeg_quality = 80
//!
//! [images.cover]
//! aspect_ratio = [1200, 630]
//! strategy = "crop"                # or "fit"
//! fit_width = 1200
//!
//! [download]
//! # timeout_secs = 60              # omit for no timeout
//! user_agent = "blog-digest"
//!
//! [browse]
//! # root = "/home/me/notes"        # omit for $HOME
//! max_depth = 4
//!
//! [[readme]]
//! path = "README.md"
//! language = "en"
//! heading = "Blog list"
//! ```
//!
//! Unknown keys are rejected to catch typos early. Arrays (such as the
//! `[[readme]]` targets) replace the defaults wholesale.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file looked up in the site root.
pub const CONFIG_FILENAME: &str = "blog.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Blog configuration loaded from `blog.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BlogConfig {
    /// Where the manifest, posts and images live.
    pub paths: PathsConfig,
    /// Public URLs and the timezone used for timestamps.
    pub site: SiteConfig,
    /// Defaults written into synthesized front-matter.
    pub front_matter: FrontMatterConfig,
    /// Which images are localized and how they are encoded.
    pub images: ImagesConfig,
    /// HTTP settings for image downloads.
    pub download: DownloadConfig,
    /// Interactive markdown file picker.
    pub browse: BrowseConfig,
    /// Index documents whose post list is kept in sync with the manifest.
    pub readme: Vec<ReadmeTarget>,
}

impl Default for BlogConfig {
    fn default() -> Self {
        Self {
            paths: PathsConfig::default(),
            site: SiteConfig::default(),
            front_matter: FrontMatterConfig::default(),
            images: ImagesConfig::default(),
            download: DownloadConfig::default(),
            browse: BrowseConfig::default(),
            readme: default_readme_targets(),
        }
    }
}

impl BlogConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let [w, h] = self.images.cover.aspect_ratio;
        if w == 0 || h == 0 {
            return Err(ConfigError::Validation(
                "images.cover.aspect_ratio values must be non-zero".into(),
            ));
        }
        if self.images.cover.fit_width == 0 {
            return Err(ConfigError::Validation(
                "images.cover.fit_width must be non-zero".into(),
            ));
        }
        if !(1..=100).contains(&self.images.jpeg_quality) {
            return Err(ConfigError::Validation(
                "images.jpeg_quality must be 1-100".into(),
            ));
        }
        if self.images.remote_prefixes.is_empty() {
            return Err(ConfigError::Validation(
                "images.remote_prefixes must not be empty".into(),
            ));
        }
        self.site.offset()?;
        if let Some(target) = self.readme.iter().find(|t| t.heading.trim().is_empty()) {
            return Err(ConfigError::Validation(format!(
                "readme target {} has an empty heading",
                target.path
            )));
        }
        Ok(())
    }
}

/// Filesystem layout of the site, relative to the root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub manifest: String,
    pub posts: String,
    pub images: String,
    pub temp_images: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            manifest: "_data/blogs.json".to_string(),
            posts: "_posts".to_string(),
            images: "assets/img/blogs".to_string(),
            temp_images: ".blog-digest-temp".to_string(),
        }
    }
}

impl PathsConfig {
    /// Join every configured path onto the site root.
    pub fn resolve(&self, root: &Path) -> SitePaths {
        SitePaths {
            manifest: root.join(&self.manifest),
            posts: root.join(&self.posts),
            images: root.join(&self.images),
            temp_images: root.join(&self.temp_images),
        }
    }
}

/// Absolute (root-joined) site paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitePaths {
    pub manifest: PathBuf,
    pub posts: PathBuf,
    pub images: PathBuf,
    pub temp_images: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site origin used to build absolute links in the README lists.
    pub url: String,
    /// Path prefix of post permalinks (`/posts` → `/posts/<id>/`).
    pub permalink_prefix: String,
    /// Public URL prefix of the published image directory.
    pub image_url_prefix: String,
    /// Fixed UTC offset for all timestamps, e.g. `"+08:00"`.
    pub timezone: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            url: "https://example.github.io".to_string(),
            permalink_prefix: "/posts".to_string(),
            image_url_prefix: "/assets/img/blogs".to_string(),
            timezone: "+08:00".to_string(),
        }
    }
}

impl SiteConfig {
    /// Parse the configured timezone into a fixed offset.
    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        self.timezone.parse::<FixedOffset>().map_err(|e| {
            ConfigError::Validation(format!("site.timezone {:?}: {e}", self.timezone))
        })
    }

    /// Current time in the configured offset.
    pub fn now(&self) -> Result<DateTime<FixedOffset>, ConfigError> {
        Ok(Utc::now().with_timezone(&self.offset()?))
    }

    /// Absolute URL for a site-relative path.
    pub fn absolute_url(&self, path: &str) -> String {
        format!("{}{}", self.url.trim_end_matches('/'), path)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FrontMatterConfig {
    pub categories: Vec<String>,
    pub tags: Vec<String>,
}

impl Default for FrontMatterConfig {
    fn default() -> Self {
        Self {
            categories: vec!["Blog".to_string()],
            tags: vec!["notes".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// Image URLs starting with one of these are downloaded and localized.
    pub remote_prefixes: Vec<String>,
    /// JPEG encoding quality (1-100).
    pub jpeg_quality: u32,
    pub cover: CoverConfig,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            remote_prefixes: vec!["http://".to_string(), "https://".to_string()],
            jpeg_quality: 80,
            cover: CoverConfig::default(),
        }
    }
}

impl ImagesConfig {
    /// Whether an image reference points at a remote asset.
    pub fn is_remote(&self, url: &str) -> bool {
        self.remote_prefixes.iter().any(|p| url.starts_with(p.as_str()))
    }
}

/// How a cover with the wrong aspect ratio gets corrected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverStrategy {
    /// Centered crop to the target ratio, no resampling.
    Crop,
    /// Resize to fill `fit_width` × (`fit_width` / ratio), cropping overflow.
    Fit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoverConfig {
    /// Target ratio as `[width, height]`.
    pub aspect_ratio: [u32; 2],
    pub strategy: CoverStrategy,
    /// Output width for the `fit` strategy.
    pub fit_width: u32,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            aspect_ratio: [1200, 630],
            strategy: CoverStrategy::Crop,
            fit_width: 1200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DownloadConfig {
    /// Per-request timeout. `None` waits indefinitely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    pub user_agent: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            user_agent: concat!("blog-digest/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowseConfig {
    /// Directory the picker starts from. Defaults to `$HOME`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub max_depth: usize,
}

impl Default for BrowseConfig {
    fn default() -> Self {
        Self {
            root: None,
            max_depth: 4,
        }
    }
}

impl BrowseConfig {
    /// The picker root: configured value, then `$HOME`, then the current dir.
    pub fn root_dir(&self) -> PathBuf {
        self.root
            .as_ref()
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// One index document with a post-list section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReadmeTarget {
    /// Path relative to the site root.
    pub path: String,
    /// Display language selector, used in reports.
    pub language: String,
    /// Exact text of the heading that precedes the post list.
    pub heading: String,
}

fn default_readme_targets() -> Vec<ReadmeTarget> {
    vec![
        ReadmeTarget {
            path: "README.md".to_string(),
            language: "en".to_string(),
            heading: "Blog list".to_string(),
        },
        ReadmeTarget {
            path: "README.zh_CN.md".to_string(),
            language: "zh_CN".to_string(),
            heading: "博客列表".to_string(),
        },
    ]
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(BlogConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay (arrays included) replace base values entirely.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load `blog.toml` from a directory as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_raw_config(root: &Path) -> Result<Option<toml::Value>, ConfigError> {
    let config_path = root.join(CONFIG_FILENAME);
    if !config_path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&config_path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Load config from `blog.toml` in the given site root.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(root: &Path) -> Result<BlogConfig, ConfigError> {
    let merged = match load_raw_config(root)? {
        Some(overlay) => merge_toml(stock_defaults_value(), overlay),
        None => stock_defaults_value(),
    };
    let config: BlogConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `blog.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# blog-digest configuration
# =========================
# Every key is optional. Paths are relative to the site root.

[paths]
# JSON manifest: post id -> { id, postName, title, date, images }
manifest = "_data/blogs.json"
# Published markdown posts, named <YYYY-MM-DD>-<source stem>.md
posts = "_posts"
# Published images, named <asset id>.<format>
images = "assets/img/blogs"
# Scratch space for downloads; wiped at the start of every ingestion
temp_images = ".blog-digest-temp"

[site]
# Origin used for the absolute links in README post lists
url = "https://example.github.io"
# Permalinks are <permalink_prefix>/<post id>/
permalink_prefix = "/posts"
# Public URL of the published image directory
image_url_prefix = "/assets/img/blogs"
# Fixed UTC offset for post dates
timezone = "+08:00"

[front_matter]
categories = ["Blog"]
tags = ["notes"]

[images]
# Image references starting with any of these get downloaded
remote_prefixes = ["http://", "https://"]
# 1-100
jpeg_quality = 80

[images.cover]
# Target width:height of the cover image
aspect_ratio = [1200, 630]
# "crop": centered crop to the ratio; "fit": resize to fill fit_width
strategy = "crop"
fit_width = 1200

[download]
# Per-request timeout in seconds; omit to wait indefinitely
# timeout_secs = 60
user_agent = "blog-digest"

[browse]
# Where the interactive file picker starts; defaults to $HOME
# root = "/home/me/notes"
max_depth = 4

# Index documents whose post list follows the given heading.
# Listing [[readme]] at all replaces both defaults.
[[readme]]
path = "README.md"
language = "en"
heading = "Blog list"

[[readme]]
path = "README.zh_CN.md"
language = "zh_CN"
heading = "博客列表"
"##
}
