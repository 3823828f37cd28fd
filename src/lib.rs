//! # Blog Digest
//!
//! Publishes markdown notes into a static blog. One command takes a document
//! written anywhere on disk and makes it a post: remote images are downloaded
//! into the site, front-matter is synthesized, the post manifest records it,
//! and the README post lists are regenerated.
//!
//! # Architecture: Ingestion Pipeline
//!
//! ```text
//! source.md ─► parse ─► localize images ─► front-matter ─► _posts/<date>-<stem>.md
//!                            │                                  │
//!                            ▼                                  ▼
//!                  assets/img/blogs/<uuid>.<fmt>      _data/blogs.json ─► README lists
//! ```
//!
//! Document rewriting is an ordered list of transform stages over an owned
//! markdown tree ([`pipeline::Transform`]). The network, the image codec and
//! the terminal sit behind traits ([`fetch::Fetcher`],
//! [`imaging::ImageBackend`], [`prompt::Prompter`]) so the whole pipeline runs
//! in tests against in-memory stand-ins.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`config`] | `blog.toml` loading, validation, merging with stock defaults |
//! | [`naming`] | Post filenames, titles, timestamps and permalinks |
//! | [`manifest`] | The JSON post manifest: load, lookup, upsert, atomic persist |
//! | [`markdown`] | Owned markdown tree over `pulldown-cmark` events |
//! | [`frontmatter`] | Cover extraction, front-matter synthesis and permalink repair |
//! | [`imaging`] | Format detection, cover crop/fill, per-format compression |
//! | [`fetch`] | Downloading remote images |
//! | [`prompt`] | Confirmations and the markdown file picker |
//! | [`materialize`] | Remote image → published local file |
//! | [`pipeline`] | Transform stages and the ingestion run |
//! | [`readme`] | README post-list reconciliation |
//! | [`maintenance`] | `sync` batch repairs: permalinks, dates, READMEs |
//! | [`output`] | CLI report formatting |
//!
//! # Design Decisions
//!
//! ## Ids Are the Manifest Key
//!
//! Every post gets a UUID at first ingestion and keeps it: the permalink is
//! built from it, so a post's URL survives renames of its title or file.
//! Records are also reachable by published filename, which is how batch
//! repairs tie a file in `_posts/` back to its record.
//!
//! ## Formats Follow the Bytes
//!
//! A URL ending in `.png` may serve a JPEG. Stored images are named after the
//! format detected from their content, and compressed with that format's
//! encoder, so the extension on disk is always truthful.
//!
//! ## Partial Success Is Visible
//!
//! A failed download does not abort ingestion: the image keeps its remote
//! URL, stays out of the manifest, and is listed in the run summary. Any
//! other failure stops the run before the post is written.

pub mod config;
pub mod fetch;
pub mod frontmatter;
pub mod imaging;
pub mod maintenance;
pub mod manifest;
pub mod markdown;
pub mod materialize;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod prompt;
pub mod readme;

#[cfg(test)]
pub(crate) mod test_helpers;
