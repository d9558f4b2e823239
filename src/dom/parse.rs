//! HTML parsing into the arena tree
//!
//! Parsing goes through `scraper` (html5ever tree construction), so the
//! resulting structure matches what a browser builds for the same markup:
//! implied `<html>`, `<head>` and `<body>`, auto-closed paragraphs, etc.

use ego_tree::NodeRef;
use scraper::{Html, Node};

use super::{Document, ElementData, NodeId, NodeKind};

impl Document {
    /// Parse a complete HTML document
    pub fn parse(html: &str) -> Self {
        let parsed = Html::parse_document(html);
        let mut doc = Document::new();
        let root = doc.root();
        for child in parsed.tree.root().children() {
            doc.import(child, root);
        }
        // Parsing is not a mutation anyone should observe
        doc.drain_journal();
        doc
    }

    fn import(&mut self, node: NodeRef<'_, Node>, parent: NodeId) {
        let kind = match node.value() {
            Node::Element(el) => NodeKind::Element(ElementData {
                name: el.name().to_ascii_lowercase(),
                attrs: el
                    .attrs()
                    .map(|(key, value)| (key.to_string(), value.to_string()))
                    .collect(),
            }),
            Node::Text(text) => NodeKind::Text(text.text.to_string()),
            Node::Comment(comment) => NodeKind::Comment(comment.comment.to_string()),
            Node::Doctype(_) => return,
            _ => NodeKind::Other,
        };

        let id = self.push_node(kind);
        self.append_child(parent, id);
        for child in node.children() {
            self.import(child, id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_builds_body() {
        let doc = Document::parse("<p>Hello <b>world</b>!</p>");
        let body = doc.body();

        assert_eq!(doc.tag_name(body), Some("body"));
        let p = doc.first_child(body).unwrap();
        assert_eq!(doc.tag_name(p), Some("p"));
        assert_eq!(doc.children(p).len(), 3);
        assert_eq!(doc.text_content(p), "Hello world!");
        assert_eq!(doc.journal_len(), 0);
    }

    #[test]
    fn test_parse_keeps_attributes_and_comments() {
        let doc = Document::parse(r#"<div id="main" class="x"><!-- note --><img alt="a" src="a.png"></div>"#);
        let div = doc.first_child(doc.body()).unwrap();

        assert_eq!(doc.attr(div, "id"), Some("main"));
        assert_eq!(doc.attr(div, "class"), Some("x"));
        assert!(matches!(doc.kind(doc.children(div)[0]), NodeKind::Comment(_)));
        assert_eq!(doc.tag_name(doc.children(div)[1]), Some("img"));
    }

    #[test]
    fn test_parse_drops_doctype() {
        let doc = Document::parse("<!DOCTYPE html><html><body>x</body></html>");
        assert_eq!(doc.children(doc.root()).len(), 1);
        assert_eq!(doc.text_content(doc.body()), "x");
    }
}
