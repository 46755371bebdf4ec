//! quillmark: CommonMark 0.31.2 compliant Markdown to HTML compiler.
//!
//! Parsing runs in two phases over an arena-backed node tree: a
//! line-driven block parser that maintains the stack of open
//! containers, then an inline parser that rewrites each paragraph and
//! heading leaf into emphasis, links, code spans, raw HTML, entities
//! and breaks. A recursive renderer serializes the finished tree.
//!
//! # Example
//! ```
//! let html = quillmark::to_html("# Hello\n\n*World*");
//! assert!(html.contains("<h1>Hello</h1>"));
//! assert!(html.contains("<em>World</em>"));
//! ```

mod blocks;
mod entity;
mod escape;
mod inlines;
mod limits;
mod link_ref;
mod nodes;
mod render;
mod scanners;
mod strings;

pub use nodes::{
    Ast, CodeData, Document, HeadingData, LinkData, ListData, ListDelim, ListKind, NodeId,
    NodeValue, Tree,
};
pub use render::{render_into, HtmlWriter};

/// Parse Markdown into a document tree.
///
/// Every byte sequence is a valid document; this never fails.
pub fn parse(input: &str) -> Document {
    blocks::parse_document(input)
}

/// Render a parsed document tree to HTML.
pub fn render(doc: &Document) -> String {
    render::render_document(doc)
}

/// Convert Markdown to HTML.
///
/// This is the primary API for simple use cases.
pub fn to_html(input: &str) -> String {
    let doc = parse(input);
    let mut writer = HtmlWriter::with_capacity_for(input.len());
    render_into(&doc, &mut writer);
    writer.into_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_paragraph() {
        assert_eq!(to_html("Hello, world!"), "<p>Hello, world!</p>\n");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(to_html(""), "");
        assert_eq!(to_html("   \n\n   "), "");
    }

    #[test]
    fn test_parse_then_render() {
        let doc = parse("# Title\n\nBody text.");
        let html = render(&doc);
        assert!(html.contains("<h1>Title</h1>"));
        assert!(html.contains("<p>Body text.</p>"));
    }

    #[test]
    fn test_document_root_kind() {
        let doc = parse("x");
        assert!(matches!(doc.tree.value(doc.root()), NodeValue::Document));
    }

    #[test]
    fn test_complex_document() {
        let input = "\
# Main Title

First paragraph.

## Section

- one
- two

```python
print(\"hi\")
```

> quoted
";
        let html = to_html(input);
        assert!(html.contains("<h1>Main Title</h1>"));
        assert!(html.contains("<h2>Section</h2>"));
        assert!(html.contains("<ul>\n<li>one</li>\n<li>two</li>\n</ul>"));
        assert!(html.contains("<pre><code class=\"language-python\">"));
        assert!(html.contains("<blockquote>\n<p>quoted</p>\n</blockquote>"));
    }
}
