//! Owned markdown tree built from `pulldown-cmark` events.
//!
//! `pulldown-cmark` is a pull parser: it yields a flat stream of
//! `Start(tag) … End(tag)` events. Ingestion needs to edit the document
//! (rewrite image URLs, splice out the cover, insert front-matter, replace a
//! list), so the stream is folded into a [`Document`] of [`Node`]s and
//! flattened back for serialization with `pulldown-cmark-to-cmark`.
//!
//! ```text
//! ---              Node::FrontMatter("title: x")
//! title: x
//! ---
//! ![](a.png)       Element(Paragraph) → Element(Image) → Leaf(Text)
//! Body text.       Element(Paragraph) → Leaf(Text)
//! ```
//!
//! Nodes are addressed by index paths from the root (`[1, 0]` = first child
//! of the second top-level block), which keeps mutation free of borrow
//! juggling.
//!
//! YAML front-matter is rendered by hand rather than through the CommonMark
//! writer so its text reaches disk verbatim.

use pulldown_cmark::{CowStr, Event, LinkType, MetadataBlockKind, Options, Parser, Tag, TagEnd};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkdownError {
    #[error("Failed to render markdown: {0}")]
    Render(#[from] pulldown_cmark_to_cmark::Error),
}

/// A node in the document tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// YAML front-matter, without the `---` fences.
    FrontMatter(String),
    /// A container tag and its children. Images are elements whose children
    /// are the alt text.
    Element {
        tag: Tag<'static>,
        children: Vec<Node>,
    },
    /// Any non-container event: text, code, breaks, html, rules.
    Leaf(Event<'static>),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Leaf(Event::Text(CowStr::from(text.into())))
    }

    /// `[text](url)` as a list item.
    pub fn link_item(text: impl Into<String>, url: impl Into<String>) -> Self {
        let link = Node::Element {
            tag: Tag::Link {
                link_type: LinkType::Inline,
                dest_url: CowStr::from(url.into()),
                title: CowStr::from(""),
                id: CowStr::from(""),
            },
            children: vec![Node::text(text)],
        };
        Node::Element {
            tag: Tag::Item,
            children: vec![link],
        }
    }

    /// Unordered list holding `items`.
    pub fn bullet_list(items: Vec<Node>) -> Self {
        Node::Element {
            tag: Tag::List(None),
            children: items,
        }
    }

    pub fn children(&self) -> Option<&Vec<Node>> {
        match self {
            Node::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Element { children, .. } => Some(children),
            _ => None,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Node::Element { tag: Tag::Image { .. }, .. })
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Node::Element { tag: Tag::List(_), .. })
    }

    /// Destination of an image node.
    pub fn image_url(&self) -> Option<&str> {
        match self {
            Node::Element {
                tag: Tag::Image { dest_url, .. },
                ..
            } => Some(dest_url.as_ref()),
            _ => None,
        }
    }

    /// Point an image node at `url`. Returns false for non-image nodes.
    pub fn set_image_url(&mut self, url: &str) -> bool {
        match self {
            Node::Element {
                tag: Tag::Image { dest_url, .. },
                ..
            } => {
                *dest_url = CowStr::from(url.to_string());
                true
            }
            _ => false,
        }
    }

    /// Concatenated text and inline code beneath this node.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Node::Leaf(Event::Text(t)) | Node::Leaf(Event::Code(t)) => out.push_str(t),
            Node::Element { children, .. } => children.iter().for_each(|c| c.push_text(out)),
            _ => {}
        }
    }

    fn write_events(&self, out: &mut Vec<Event<'static>>) {
        match self {
            Node::FrontMatter(value) => {
                out.push(Event::Start(Tag::MetadataBlock(MetadataBlockKind::YamlStyle)));
                out.push(Event::Text(CowStr::from(format!("{value}\n"))));
                out.push(Event::End(TagEnd::MetadataBlock(MetadataBlockKind::YamlStyle)));
            }
            Node::Element { tag, children } => {
                out.push(Event::Start(tag.clone()));
                for child in children {
                    child.write_events(out);
                }
                out.push(Event::End(tag.to_end()));
            }
            Node::Leaf(event) => out.push(event.clone()),
        }
    }
}

/// A parsed markdown document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub children: Vec<Node>,
}

fn parser_options() -> Options {
    Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
        | Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
}

impl Document {
    pub fn parse(source: &str) -> Self {
        let mut stack: Vec<(Tag<'static>, Vec<Node>)> = Vec::new();
        let mut root = Vec::new();

        for event in Parser::new_ext(source, parser_options()) {
            let node = match event {
                Event::Start(tag) => {
                    stack.push((tag.into_static(), Vec::new()));
                    continue;
                }
                Event::End(_) => {
                    let Some((tag, children)) = stack.pop() else {
                        continue;
                    };
                    match tag {
                        Tag::MetadataBlock(MetadataBlockKind::YamlStyle) => {
                            let text: String = children.iter().map(Node::plain_text).collect();
                            Node::FrontMatter(text.trim_end_matches('\n').to_string())
                        }
                        tag => Node::Element { tag, children },
                    }
                }
                other => Node::Leaf(other.into_static()),
            };
            match stack.last_mut() {
                Some((_, children)) => children.push(node),
                None => root.push(node),
            }
        }

        Document { children: root }
    }

    /// Serialize back to CommonMark, front-matter first.
    pub fn to_markdown(&self) -> Result<String, MarkdownError> {
        let mut out = String::new();
        let mut events = Vec::new();
        for node in &self.children {
            match node {
                Node::FrontMatter(value) if events.is_empty() => {
                    out.push_str("---\n");
                    out.push_str(value.trim_end_matches('\n'));
                    out.push_str("\n---\n\n");
                }
                other => other.write_events(&mut events),
            }
        }
        pulldown_cmark_to_cmark::cmark(events.iter(), &mut out)?;
        if !out.ends_with('\n') {
            out.push('\n');
        }
        Ok(out)
    }

    /// Text of the first front-matter node, if any.
    pub fn front_matter(&self) -> Option<&str> {
        self.children.iter().find_map(|n| match n {
            Node::FrontMatter(v) => Some(v.as_str()),
            _ => None,
        })
    }

    pub fn front_matter_mut(&mut self) -> Option<&mut String> {
        self.children.iter_mut().find_map(|n| match n {
            Node::FrontMatter(v) => Some(v),
            _ => None,
        })
    }

    pub fn node_at(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for &i in rest {
            node = node.children()?.get(i)?;
        }
        Some(node)
    }

    pub fn node_at_mut(&mut self, path: &[usize]) -> Option<&mut Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for &i in rest {
            node = node.children_mut()?.get_mut(i)?;
        }
        Some(node)
    }

    /// Detach the node at `path` from its parent.
    pub fn remove_at(&mut self, path: &[usize]) -> Option<Node> {
        let (&last, parent_path) = path.split_last()?;
        let siblings = if parent_path.is_empty() {
            &mut self.children
        } else {
            self.node_at_mut(parent_path)?.children_mut()?
        };
        (last < siblings.len()).then(|| siblings.remove(last))
    }

    /// Paths of every image node, in document order.
    pub fn image_paths(&self) -> Vec<Vec<usize>> {
        let mut out = Vec::new();
        collect_images(&self.children, &mut Vec::new(), &mut out);
        out
    }

    /// Path of the cover image candidate.
    ///
    /// Follows first children down from the root until a node without
    /// children is reached (an image counts as childless). That node is the
    /// cover only if it is an image. A leading front-matter block therefore
    /// means no cover.
    pub fn cover_image_path(&self) -> Option<Vec<usize>> {
        let mut path = Vec::new();
        let mut siblings = &self.children;
        loop {
            let first = siblings.first()?;
            path.push(0);
            if first.is_image() {
                return Some(path);
            }
            match first.children() {
                Some(children) if !children.is_empty() => siblings = children,
                _ => return None,
            }
        }
    }

    /// Top-level index of the first heading whose text is `text`.
    pub fn find_heading(&self, text: &str) -> Option<usize> {
        self.children.iter().position(|n| {
            matches!(n, Node::Element { tag: Tag::Heading { .. }, .. })
                && n.plain_text().trim() == text.trim()
        })
    }
}

fn collect_images(nodes: &[Node], prefix: &mut Vec<usize>, out: &mut Vec<Vec<usize>>) {
    for (i, node) in nodes.iter().enumerate() {
        prefix.push(i);
        if node.is_image() {
            out.push(prefix.clone());
        } else if let Some(children) = node.children() {
            collect_images(children, prefix, out);
        }
        prefix.pop();
    }
}
