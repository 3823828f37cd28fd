//! Front-matter synthesis and repair.
//!
//! A freshly ingested post gets a YAML header with a fixed layout:
//!
//! ```yaml
//! title: notes
//! date: 2024-03-01 09:30:05 +0800
//! categories: [Blog]
//! tags: [notes]
//! permalink: /posts/1b4d4ddb-7620-477e-b1f9-8f3ce24574e4/
//! image:
//!   path: /assets/img/blogs/0f7c2a31-9d1e-4c55-a0b7-3f6e1c2d9a10.jpeg
//! ```
//!
//! The `image` block only appears when the document opened with a cover
//! image (see [`Document::cover_image_path`]); that image is spliced out of
//! the body. Documents that already carry front-matter keep it untouched.
//!
//! The header is handled as lines of `key: value`, not as a YAML tree; the
//! helpers here read single fields and rewrite the `permalink` line.

use crate::config::FrontMatterConfig;
use crate::markdown::{Document, Node};
use crate::naming;

/// Values that vary per post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostMeta {
    pub id: String,
    pub title: String,
    /// Formatted timestamp.
    pub date: String,
    /// Permalink path prefix, e.g. `/posts`.
    pub permalink_prefix: String,
}

/// What [`synthesize`] did to the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Synthesis {
    /// URL of the cover image that was removed from the body.
    pub cover: Option<String>,
    /// Whether a new front-matter block was inserted.
    pub inserted: bool,
}

/// Extract the cover image and insert front-matter when the document has none.
pub fn synthesize(doc: &mut Document, meta: &PostMeta, defaults: &FrontMatterConfig) -> Synthesis {
    let cover = take_cover(doc);
    if doc.front_matter().is_some() {
        return Synthesis {
            cover,
            inserted: false,
        };
    }
    let value = render(meta, defaults, cover.as_deref());
    doc.children.insert(0, Node::FrontMatter(value));
    Synthesis {
        cover,
        inserted: true,
    }
}

/// Remove the leading cover image, returning its URL.
fn take_cover(doc: &mut Document) -> Option<String> {
    let path = doc.cover_image_path()?;
    let node = doc.remove_at(&path)?;
    node.image_url().map(str::to_string)
}

/// Render the header text (without fences).
pub fn render(meta: &PostMeta, defaults: &FrontMatterConfig, cover: Option<&str>) -> String {
    let mut lines = vec![
        format!("title: {}", meta.title),
        format!("date: {}", meta.date),
        format!("categories: [{}]", defaults.categories.join(", ")),
        format!("tags: [{}]", defaults.tags.join(", ")),
        format!(
            "permalink: {}",
            naming::permalink_path(&meta.permalink_prefix, &meta.id)
        ),
    ];
    if let Some(cover) = cover {
        lines.push("image:".to_string());
        lines.push(format!("  path: {cover}"));
    }
    lines.join("\n")
}

/// Split a `key: value` line. Indented lines belong to a parent and never match.
fn split_field(line: &str) -> Option<(&str, &str)> {
    if line.starts_with(char::is_whitespace) {
        return None;
    }
    let (key, value) = line.split_once(':')?;
    Some((key.trim(), value.trim()))
}

/// Value of a top-level field.
pub fn field<'a>(front_matter: &'a str, key: &str) -> Option<&'a str> {
    front_matter
        .lines()
        .filter_map(split_field)
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

/// Set the `permalink` field.
///
/// Replaces an existing `permalink:` line; otherwise inserts one right after
/// the `tags:` line; otherwise appends it.
pub fn set_permalink(front_matter: &str, permalink: &str) -> String {
    let new_line = format!("permalink: {permalink}");
    let mut lines: Vec<String> = front_matter.lines().map(str::to_string).collect();

    let position_of = |key: &str, lines: &[String]| {
        lines
            .iter()
            .position(|l| split_field(l).is_some_and(|(k, _)| k == key))
    };

    if let Some(i) = position_of("permalink", &lines) {
        lines[i] = new_line;
    } else if let Some(i) = position_of("tags", &lines) {
        lines.insert(i + 1, new_line);
    } else {
        lines.push(new_line);
    }
    lines.join("\n")
}
