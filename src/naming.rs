//! Filename conventions shared by ingestion, the manifest and the README lists.
//!
//! ```text
//! source:     ~/notes/Why MessageChannel.draft.md
//! stem:       Why MessageChannel               (everything before the first '.')
//! post name:  2024-03-01-Why MessageChannel.md (<YYYY-MM-DD>-<stem>.md)
//! permalink:  /posts/<post id>/
//! ```
//!
//! The stem doubles as the post title, so a post name can be turned back into
//! a title by stripping the date prefix and the extension.

use chrono::{DateTime, FixedOffset};
use std::path::Path;

/// Markdown extension accepted by ingestion.
pub const MARKDOWN_EXTENSION: &str = ".md";

/// Front-matter timestamp layout, e.g. `2024-03-01 09:30:00 +0800`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %z";

/// Whether a path names a markdown document.
pub fn is_markdown(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(MARKDOWN_EXTENSION))
}

/// Source stem: the file name up to its first dot.
///
/// - `"notes.md"` → `"notes"`
/// - `"a.b.md"` → `"a"`
/// - `"README"` → `"README"`
pub fn source_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match name.find('.') {
        Some(dot) => name[..dot].to_string(),
        None => name,
    }
}

/// Published filename for a post ingested at `date`.
pub fn post_file_name(date: &DateTime<FixedOffset>, stem: &str) -> String {
    format!("{}-{}{}", date.format("%Y-%m-%d"), stem, MARKDOWN_EXTENSION)
}

/// Front-matter timestamp for `date`.
pub fn format_timestamp(date: &DateTime<FixedOffset>) -> String {
    date.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a front-matter timestamp. Returns `None` for anything else.
pub fn parse_timestamp(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_str(value.trim(), TIMESTAMP_FORMAT).ok()
}

/// Recover a display title from a published filename.
///
/// - `"2024-03-01-Hello-World.md"` → `"Hello-World"`
/// - `"Hello.md"` → `"Hello"` (no date prefix)
pub fn title_from_post_name(post_name: &str) -> String {
    let without_ext = post_name
        .strip_suffix(MARKDOWN_EXTENSION)
        .unwrap_or(post_name);
    match split_date_prefix(without_ext) {
        Some(rest) => rest.to_string(),
        None => without_ext.to_string(),
    }
}

/// Strip a leading `YYYY-MM-DD-` if present.
fn split_date_prefix(name: &str) -> Option<&str> {
    let bytes = name.as_bytes();
    if bytes.len() <= 11 {
        return None;
    }
    let digits_at = |range: std::ops::Range<usize>| bytes[range].iter().all(u8::is_ascii_digit);
    let is_date = digits_at(0..4)
        && bytes[4] == b'-'
        && digits_at(5..7)
        && bytes[7] == b'-'
        && digits_at(8..10)
        && bytes[10] == b'-';
    is_date.then(|| &name[11..])
}

/// Site-relative permalink for a post id: `<prefix>/<id>/`.
pub fn permalink_path(prefix: &str, id: &str) -> String {
    format!("{}/{}/", prefix.trim_end_matches('/'), id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 1, 9, 30, 5)
            .unwrap()
    }

    #[test]
    fn markdown_extension_check() {
        assert!(is_markdown(Path::new("/notes/post.md")));
        assert!(!is_markdown(Path::new("/notes/post.txt")));
        assert!(!is_markdown(Path::new("/notes/post.md.bak")));
    }

    #[test]
    fn stem_cuts_at_first_dot() {
        assert_eq!(source_stem(Path::new("/a/notes.md")), "notes");
        assert_eq!(source_stem(Path::new("/a/a.b.md")), "a");
        assert_eq!(source_stem(Path::new("/a/My Post.md")), "My Post");
        assert_eq!(source_stem(Path::new("README")), "README");
    }

    #[test]
    fn post_file_name_prefixes_date() {
        assert_eq!(post_file_name(&date(), "notes"), "2024-03-01-notes.md");
    }

    #[test]
    fn timestamp_round_trip() {
        let formatted = format_timestamp(&date());
        assert_eq!(formatted, "2024-03-01 09:30:05 +0800");
        assert_eq!(parse_timestamp(&formatted), Some(date()));
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-03-01"), None);
    }

    #[test]
    fn title_strips_date_and_extension() {
        assert_eq!(title_from_post_name("2024-03-01-Hello-World.md"), "Hello-World");
        assert_eq!(title_from_post_name("Hello.md"), "Hello");
        assert_eq!(title_from_post_name("2024-03-01.md"), "2024-03-01");
    }

    #[test]
    fn permalink_trims_trailing_slash() {
        assert_eq!(permalink_path("/posts", "abc"), "/posts/abc/");
        assert_eq!(permalink_path("/posts/", "abc"), "/posts/abc/");
    }
}
