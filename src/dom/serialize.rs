//! HTML serialization of the arena tree

use super::{Document, NodeId, NodeKind};

/// Elements serialized without a closing tag
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// Elements whose text content is emitted verbatim
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

impl Document {
    /// Serialize a node and its subtree
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, false, &mut out);
        out
    }

    /// Serialize the children of a node
    pub fn inner_html(&self, node: NodeId) -> String {
        let raw = self
            .tag_name(node)
            .map(|tag| RAW_TEXT_ELEMENTS.contains(&tag))
            .unwrap_or(false);
        let mut out = String::new();
        for &child in self.children(node) {
            self.write_node(child, raw, &mut out);
        }
        out
    }

    /// Serialize the whole document
    pub fn to_html(&self) -> String {
        let mut out = String::from("<!DOCTYPE html>");
        out.push_str(&self.inner_html(self.root()));
        out
    }

    fn write_node(&self, node: NodeId, raw_text: bool, out: &mut String) {
        match self.kind(node) {
            NodeKind::Text(text) if raw_text => out.push_str(text),
            NodeKind::Text(text) => out.push_str(&html_escape::encode_text(text)),
            NodeKind::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            NodeKind::Other => out.push_str(&self.inner_html(node)),
            NodeKind::Element(el) => {
                out.push('<');
                out.push_str(&el.name);
                for (key, value) in &el.attrs {
                    out.push(' ');
                    out.push_str(key);
                    out.push_str("=\"");
                    out.push_str(&html_escape::encode_double_quoted_attribute(value));
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&el.name.as_str()) {
                    return;
                }
                out.push_str(&self.inner_html(node));
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_markup() {
        let doc = Document::parse(r#"<p class="a">Hello <b>world</b><br>&amp; more</p>"#);
        let p = doc.first_child(doc.body()).unwrap();

        assert_eq!(
            doc.outer_html(p),
            r#"<p class="a">Hello <b>world</b><br>&amp; more</p>"#
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let mut doc = Document::new();
        let span = doc.create_element("span", &[("title", "say \"hi\"")]);
        doc.append_child(doc.root(), span);

        assert_eq!(doc.outer_html(span), "<span title=\"say &quot;hi&quot;\"></span>");
    }

    #[test]
    fn test_script_text_is_raw() {
        let doc = Document::parse("<script>if (a < b) {}</script>");
        let html = doc.to_html();
        assert!(html.contains("<script>if (a < b) {}</script>"));
    }
}
