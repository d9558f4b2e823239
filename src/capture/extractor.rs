//! Selection to quote contents
//!
//! The selection's range is walked in document order from its common
//! ancestor. Nothing is emitted until the start container is reached and
//! the walk stops as soon as it moves past the end container. Block-level
//! elements split the output into separate entries; links, code spans and
//! images are kept as Markdown, and page text that would read as Markdown
//! is escaped.

use tracing::debug;
use url::Url;

use super::fetch::DataUrlResolver;
use crate::classify::{self, classify, image_markdown, image_token, ContentClass};
use crate::dom::{Boundary, Document, NodeId, Range, Selection, TreeWalker};
use crate::error::ExtractError;
use crate::markdown;

/// Where the walk stops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndMarker {
    /// Inside a text node, `offset` chars in
    Text { node: NodeId, offset: usize },
    /// Once the walk leaves the subtree of `node`
    After(NodeId),
    /// Upon reaching `node`
    Before(NodeId),
}

impl EndMarker {
    fn new(doc: &Document, end: Boundary) -> Self {
        if doc.is_text(end.node) {
            return Self::Text {
                node: end.node,
                offset: end.offset,
            };
        }
        let children = doc.children(end.node);
        match end.offset.min(children.len()) {
            0 => match children.first() {
                Some(&first) => Self::Before(first),
                None => Self::After(end.node),
            },
            k => Self::After(children[k - 1]),
        }
    }

    fn passed(&self, doc: &Document, node: NodeId) -> bool {
        use std::cmp::Ordering::*;
        match *self {
            Self::Text { node: end, .. } => doc.compare_position(node, end) == Greater,
            Self::After(end) => doc.compare_position(node, end) == Greater && !doc.contains(end, node),
            Self::Before(end) => doc.compare_position(node, end) != Less,
        }
    }

    fn is_last(&self, node: NodeId) -> bool {
        matches!(*self, Self::Text { node: end, .. } if end == node)
    }
}

/// Pending output triggered when the walk leaves `scope`
#[derive(Debug)]
struct Exit {
    scope: NodeId,
    action: ExitAction,
}

#[derive(Debug)]
enum ExitAction {
    /// Closing Markdown for a link or code span
    Close(String),
    /// End of a block
    Flush,
}

/// Entry accumulator with cross-node whitespace collapsing
#[derive(Debug, Default)]
struct Segments {
    entries: Vec<String>,
    pending: String,
}

impl Segments {
    /// Append page text; outside code, Markdown-significant characters are escaped
    fn push_text(&mut self, text: &str, preformatted: bool, escape: bool) {
        let mut in_space = self.pending.is_empty() || self.pending.ends_with(char::is_whitespace);
        for c in text.chars() {
            if c.is_whitespace() && !preformatted {
                if !in_space {
                    self.pending.push(' ');
                    in_space = true;
                }
                continue;
            }
            if escape && markdown::needs_escape(c) {
                self.pending.push('\\');
            }
            self.pending.push(c);
            in_space = c.is_whitespace();
        }
    }

    fn push_markup(&mut self, markup: &str) {
        self.pending.push_str(markup);
    }

    /// Open a link; a `!` right before it is page text, not image syntax
    fn open_link(&mut self) {
        if self.pending.ends_with('!') {
            self.pending.pop();
            self.pending.push_str("\\!");
        }
        self.pending.push('[');
    }

    fn flush(&mut self) {
        let entry = self.pending.trim();
        if !entry.is_empty() {
            self.entries.push(entry.to_string());
        }
        self.pending.clear();
    }

    fn apply(&mut self, action: ExitAction) {
        match action {
            ExitAction::Close(markup) => self.push_markup(&markup),
            ExitAction::Flush => self.flush(),
        }
    }

    fn finish(mut self) -> Vec<String> {
        self.flush();
        self.entries
    }
}

/// Turns a live selection into normalized quote contents
pub struct ContentExtractor<'a, R: DataUrlResolver + ?Sized> {
    resolver: &'a R,
    page_url: Option<Url>,
}

impl<'a, R: DataUrlResolver + ?Sized> ContentExtractor<'a, R> {
    /// Create an extractor; relative image sources are joined to `page_url`
    pub fn new(resolver: &'a R, page_url: &str) -> Self {
        Self {
            resolver,
            page_url: Url::parse(page_url).ok(),
        }
    }

    /// Extract one entry per block spanned by a single-range selection
    pub async fn extract(&self, doc: &Document, selection: &Selection) -> Result<Vec<String>, ExtractError> {
        let range = match selection.ranges.len() {
            0 => return Err(ExtractError::Collapsed),
            1 => selection.ranges[0],
            _ => return Err(ExtractError::MultipleRanges),
        };
        if range.is_collapsed() {
            return Err(ExtractError::Collapsed);
        }
        for boundary in [range.start, range.end] {
            if !(doc.is_element(boundary.node) || doc.is_text(boundary.node)) {
                return Err(ExtractError::UnsupportedContainer);
            }
        }

        let root = range
            .common_ancestor(doc)
            .ok_or(ExtractError::UnsupportedContainer)?;
        let first = first_node(doc, root, range.start).ok_or(ExtractError::Empty)?;
        let end = EndMarker::new(doc, range.end);

        let entries = self.walk(doc, root, first, end, &range).await;
        if entries.is_empty() {
            return Err(ExtractError::Empty);
        }
        debug!(entries = entries.len(), "selection extracted");
        Ok(entries)
    }

    async fn walk(&self, doc: &Document, root: NodeId, first: NodeId, end: EndMarker, range: &Range) -> Vec<String> {
        let mut segments = Segments::default();
        let mut exits: Vec<Exit> = Vec::new();
        let mut walker = TreeWalker::new(doc, root);
        let mut started = false;

        while let Some(node) = walker.next() {
            if !started {
                if node != first {
                    if doc.is_element(node) && classify::is_invisible(doc, node) && !doc.contains(node, first) {
                        walker.skip_children(node);
                    }
                    continue;
                }
                started = true;
                exits.extend(enclosing_blocks(doc, root, first).map(|scope| Exit {
                    scope,
                    action: ExitAction::Flush,
                }));
            }
            if end.passed(doc, node) {
                break;
            }

            while exits.last().is_some_and(|exit| !doc.contains(exit.scope, node)) {
                if let Some(exit) = exits.pop() {
                    segments.apply(exit.action);
                }
            }

            // Code spans are copied verbatim, so no Markdown is written inside them
            let in_code = exits.iter().any(|exit| classify::is_code(doc, exit.scope));

            match classify(doc, node) {
                ContentClass::Invisible => walker.skip_children(node),
                ContentClass::Text(text) => {
                    let slice = slice_text(text, node, range);
                    segments.push_text(&slice, classify::is_preformatted(doc, node), !in_code);
                }
                ContentClass::Block => {
                    segments.flush();
                    exits.push(Exit {
                        scope: node,
                        action: ExitAction::Flush,
                    });
                }
                ContentClass::Image if in_code => segments.push_markup(&image_token(doc, node)),
                ContentClass::Image => {
                    let image = self.image(doc, node).await;
                    segments.push_markup(&image);
                }
                ContentClass::Anchor { href } => {
                    if !in_code && classify::last_eligible_child(doc, node).is_some() {
                        segments.open_link();
                        exits.push(Exit {
                            scope: node,
                            action: ExitAction::Close(format!("]({})", markdown::destination(href))),
                        });
                    }
                }
                ContentClass::Code { fenced } => {
                    if !in_code && classify::last_eligible_child(doc, node).is_some() {
                        let (open, close) = if fenced { ("```\n", "\n```") } else { ("`", "`") };
                        segments.push_markup(open);
                        exits.push(Exit {
                            scope: node,
                            action: ExitAction::Close(close.to_string()),
                        });
                    }
                }
                ContentClass::Inline | ContentClass::Ignored => {}
            }

            if end.is_last(node) {
                break;
            }
        }

        while let Some(exit) = exits.pop() {
            segments.apply(exit.action);
        }
        segments.finish()
    }

    /// Markdown for an image, with its source embedded as a data URL
    async fn image(&self, doc: &Document, node: NodeId) -> String {
        let alt = doc.attr(node, "alt").unwrap_or_default();
        let title = doc.attr(node, "title").unwrap_or_default();
        let src = doc
            .attr(node, "src")
            .filter(|src| !src.trim().is_empty())
            .or_else(|| doc.attr(node, "data-src"))
            .unwrap_or_default()
            .trim();

        let data_url = if src.is_empty() {
            String::new()
        } else {
            self.resolver.resolve(&self.absolute(src)).await
        };
        image_markdown(alt, &data_url, title)
    }

    fn absolute(&self, src: &str) -> String {
        if src.starts_with("data:") || Url::parse(src).is_ok() {
            return src.to_string();
        }
        self.page_url
            .as_ref()
            .and_then(|base| base.join(src).ok())
            .map(|url| url.to_string())
            .unwrap_or_else(|| src.to_string())
    }
}

/// First node the walk emits for a start boundary
fn first_node(doc: &Document, root: NodeId, start: Boundary) -> Option<NodeId> {
    if doc.is_text(start.node) {
        return Some(start.node);
    }
    let children = doc.children(start.node);
    if let Some(&child) = children.get(start.offset) {
        return Some(child);
    }
    if children.is_empty() {
        return Some(start.node);
    }
    TreeWalker::new(doc, root).following_skipping_children(start.node)
}

/// Block ancestors of `first` strictly below `root`, outermost first
fn enclosing_blocks(doc: &Document, root: NodeId, first: NodeId) -> impl Iterator<Item = NodeId> {
    let mut blocks: Vec<NodeId> = if first == root {
        Vec::new()
    } else {
        doc.ancestors(first)
            .take_while(|&ancestor| ancestor != root)
            .filter(|&ancestor| classify::is_block(doc, ancestor))
            .collect()
    };
    blocks.reverse();
    blocks.into_iter()
}

/// Part of a text node inside the range
fn slice_text(text: &str, node: NodeId, range: &Range) -> String {
    let from = if node == range.start.node { range.start.offset } else { 0 };
    let to = if node == range.end.node { range.end.offset } else { usize::MAX };
    text.chars().skip(from).take(to.saturating_sub(from)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fetch::MockResolver;

    fn text_node(doc: &Document, needle: &str) -> NodeId {
        TreeWalker::new(doc, doc.root())
            .find(|&n| doc.text(n) == Some(needle))
            .unwrap()
    }

    fn select(start: NodeId, start_offset: usize, end: NodeId, end_offset: usize) -> Selection {
        Selection::new(Range::new(
            Boundary::new(start, start_offset),
            Boundary::new(end, end_offset),
        ))
    }

    async fn extract(doc: &Document, selection: &Selection) -> Result<Vec<String>, ExtractError> {
        let resolver = MockResolver::default();
        ContentExtractor::new(&resolver, "https://example.com/post")
            .extract(doc, selection)
            .await
    }

    #[tokio::test]
    async fn test_inline_markup_is_dropped() {
        let doc = Document::parse("<p>Hello <b>world</b>!</p>");
        let selection = select(text_node(&doc, "Hello "), 0, text_node(&doc, "world"), 5);

        assert_eq!(extract(&doc, &selection).await.unwrap(), vec!["Hello world"]);
    }

    #[tokio::test]
    async fn test_blocks_split_entries() {
        let doc = Document::parse("<p>First.</p><p>Second.</p>");
        let selection = select(text_node(&doc, "First."), 0, text_node(&doc, "Second."), 7);

        assert_eq!(extract(&doc, &selection).await.unwrap(), vec!["First.", "Second."]);
    }

    #[tokio::test]
    async fn test_block_exit_splits_trailing_text() {
        let doc = Document::parse("<div><p>Inner</p>tail</div>");
        let selection = select(text_node(&doc, "Inner"), 0, text_node(&doc, "tail"), 4);

        assert_eq!(extract(&doc, &selection).await.unwrap(), vec!["Inner", "tail"]);
    }

    #[tokio::test]
    async fn test_partial_text_offsets() {
        let doc = Document::parse("<p>Hello <b>world</b>!</p>");
        let selection = select(text_node(&doc, "Hello "), 3, text_node(&doc, "world"), 3);

        assert_eq!(extract(&doc, &selection).await.unwrap(), vec!["lo wor"]);
    }

    #[tokio::test]
    async fn test_element_boundaries() {
        let doc = Document::parse("<p>Hello <b>world</b>!</p>");
        let p = doc.first_child(doc.body()).unwrap();
        let selection = select(p, 0, p, 3);

        assert_eq!(extract(&doc, &selection).await.unwrap(), vec!["Hello world!"]);
    }

    #[tokio::test]
    async fn test_whitespace_collapses_except_preformatted() {
        let doc = Document::parse("<div><p>a \n\t b</p><pre>x  =\n  1</pre></div>");
        let div = doc.first_child(doc.body()).unwrap();
        let selection = select(div, 0, div, 2);

        assert_eq!(extract(&doc, &selection).await.unwrap(), vec!["a b", "x  =\n  1"]);
    }

    #[tokio::test]
    async fn test_links_become_markdown() {
        let doc = Document::parse(r#"<p>See <a href="https://x.com/docs">the <em>docs</em></a> now <a href="/local">here</a></p>"#);
        let p = doc.first_child(doc.body()).unwrap();
        let selection = select(p, 0, p, 4);

        assert_eq!(
            extract(&doc, &selection).await.unwrap(),
            vec!["See [the docs](https://x.com/docs) now here"]
        );
    }

    #[tokio::test]
    async fn test_link_closed_when_selection_ends_inside() {
        let doc = Document::parse(r#"<p>Go <a href="https://x.com">over there</a></p>"#);
        let selection = select(text_node(&doc, "Go "), 0, text_node(&doc, "over there"), 4);

        assert_eq!(extract(&doc, &selection).await.unwrap(), vec!["Go [over](https://x.com)"]);
    }

    #[tokio::test]
    async fn test_page_text_that_reads_as_markdown_is_escaped() {
        let doc = Document::parse(r#"<p>Wow!<a href="https://x.com/l">link</a> and [docs](https://x.com/d)</p>"#);
        let p = doc.first_child(doc.body()).unwrap();
        let selection = select(p, 0, p, 3);

        assert_eq!(
            extract(&doc, &selection).await.unwrap(),
            vec!["Wow\\![link](https://x.com/l) and \\[docs\\](https://x.com/d)"]
        );
    }

    #[tokio::test]
    async fn test_link_destinations_keep_parentheses() {
        let doc = Document::parse(
            r#"<p><a href="https://en.wikipedia.org/wiki/Rust_(programming_language)">Rust</a> <a href="https://x.com/a)b">odd</a></p>"#,
        );
        let p = doc.first_child(doc.body()).unwrap();
        let selection = select(p, 0, p, 3);

        assert_eq!(
            extract(&doc, &selection).await.unwrap(),
            vec!["[Rust](https://en.wikipedia.org/wiki/Rust_(programming_language)) [odd](<https://x.com/a)b>)"]
        );
    }

    #[tokio::test]
    async fn test_no_markdown_inside_code() {
        let doc = Document::parse(r#"<p><code>a[0] <a href="https://x.com">x</a></code></p>"#);
        let p = doc.first_child(doc.body()).unwrap();

        assert_eq!(extract(&doc, &select(p, 0, p, 1)).await.unwrap(), vec!["`a[0] x`"]);
    }

    #[tokio::test]
    async fn test_code_spans() {
        let doc = Document::parse("<p>Run <code>cargo test</code> daily</p><pre><code>fn main() {\n}</code></pre>");
        let body = doc.body();
        let selection = select(body, 0, body, 2);

        assert_eq!(
            extract(&doc, &selection).await.unwrap(),
            vec!["Run `cargo test` daily", "```\nfn main() {\n}\n```"]
        );
    }

    #[tokio::test]
    async fn test_images_are_embedded() {
        let doc = Document::parse(r#"<p>A <img src="/cat.png" alt="cat" title="Cat"> B</p>"#);
        let p = doc.first_child(doc.body()).unwrap();
        let mut resolver = MockResolver::default();
        resolver.responses.insert(
            "https://example.com/cat.png".to_string(),
            "data:image/png;base64,AA==".to_string(),
        );

        let contents = ContentExtractor::new(&resolver, "https://example.com/post")
            .extract(&doc, &select(p, 0, p, 3))
            .await
            .unwrap();

        assert_eq!(contents, vec!["A ![cat](data:image/png;base64,AA== \"Cat\") B"]);
        assert_eq!(resolver.calls.lock().as_slice(), ["https://example.com/cat.png"]);
    }

    #[tokio::test]
    async fn test_failed_image_keeps_empty_source() {
        let doc = Document::parse(r#"<p><img src="https://cdn.x.com/a.png" alt="a"></p>"#);
        let p = doc.first_child(doc.body()).unwrap();

        assert_eq!(extract(&doc, &select(p, 0, p, 1)).await.unwrap(), vec!["![a]()"]);
    }

    #[tokio::test]
    async fn test_hidden_content_is_skipped() {
        let doc = Document::parse(r#"<p>Visible <span style="display:none">secret</span>text<script>var x;</script></p>"#);
        let p = doc.first_child(doc.body()).unwrap();
        let selection = select(p, 0, p, 4);

        assert_eq!(extract(&doc, &selection).await.unwrap(), vec!["Visible text"]);
    }

    #[tokio::test]
    async fn test_rejected_selections() {
        let mut doc = Document::parse("<p>one</p><p>two</p>");
        let one = text_node(&doc, "one");
        let two = text_node(&doc, "two");
        let range = Range::new(Boundary::new(one, 0), Boundary::new(one, 3));

        let multiple = Selection {
            ranges: vec![range, Range::new(Boundary::new(two, 0), Boundary::new(two, 3))],
        };
        assert_eq!(extract(&doc, &multiple).await, Err(ExtractError::MultipleRanges));
        assert_eq!(extract(&doc, &Selection::default()).await, Err(ExtractError::Collapsed));
        assert_eq!(extract(&doc, &select(one, 1, one, 1)).await, Err(ExtractError::Collapsed));

        let comment = doc.create_comment("note");
        let p = doc.parent(one).unwrap();
        doc.append_child(p, comment);
        assert_eq!(
            extract(&doc, &select(comment, 0, comment, 2)).await,
            Err(ExtractError::UnsupportedContainer)
        );
    }

    #[tokio::test]
    async fn test_whitespace_only_selection_is_empty() {
        let doc = Document::parse("<p>a</p>\n   <p>b</p>");
        let gap = TreeWalker::new(&doc, doc.root())
            .find(|&n| doc.text(n).is_some_and(|t| t.trim().is_empty()))
            .unwrap();

        assert_eq!(extract(&doc, &select(gap, 0, gap, 4)).await, Err(ExtractError::Empty));
    }
}
