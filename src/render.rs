//! HTML rendering: a recursive traversal of the finished tree into a
//! reusable byte-buffer writer.

use crate::escape;
use crate::nodes::{Document, HeadingData, ListData, ListKind, NodeId, NodeValue, Tree};

/// HTML output writer with a pre-allocated, reusable buffer.
pub struct HtmlWriter {
    out: Vec<u8>,
}

impl HtmlWriter {
    #[inline]
    pub fn new() -> Self {
        Self {
            out: Vec::with_capacity(1024),
        }
    }

    /// Create with capacity based on expected input size; typical
    /// HTML runs ~1.25x the Markdown.
    #[inline]
    pub fn with_capacity_for(input_len: usize) -> Self {
        Self {
            out: Vec::with_capacity(input_len + input_len / 4),
        }
    }

    #[inline]
    pub fn write_str(&mut self, s: &str) {
        self.out.extend_from_slice(s.as_bytes());
    }

    #[inline]
    pub fn write_byte(&mut self, b: u8) {
        self.out.push(b);
    }

    /// Write text with HTML escaping.
    #[inline]
    pub fn write_escaped_text(&mut self, text: &str) {
        escape::escape_html_into(&mut self.out, text.as_bytes());
    }

    /// Write a link destination with percent-encoding.
    #[inline]
    pub fn write_escaped_href(&mut self, url: &str) {
        escape::escape_href_into(&mut self.out, url.as_bytes());
    }

    /// Write a newline unless the buffer is empty or already ends
    /// with one. Keeps block-level tags on their own lines without
    /// double blank lines.
    #[inline]
    pub fn cr(&mut self) {
        if !self.out.is_empty() && self.out.last() != Some(&b'\n') {
            self.out.push(b'\n');
        }
    }

    fn write_usize(&mut self, n: usize) {
        let mut buf = [0u8; 20];
        let mut i = buf.len();
        let mut n = n;
        loop {
            i -= 1;
            buf[i] = b'0' + (n % 10) as u8;
            n /= 10;
            if n == 0 {
                break;
            }
        }
        self.out.extend_from_slice(&buf[i..]);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.out.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.out.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.out.clear();
    }

    #[inline]
    pub fn into_string(self) -> String {
        // Only UTF-8 is ever written: tags are ASCII and content
        // arrives as &str.
        String::from_utf8(self.out).unwrap_or_default()
    }
}

impl Default for HtmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Render a parsed document to an HTML string.
pub fn render_document(doc: &Document) -> String {
    let mut writer = HtmlWriter::new();
    render_into(doc, &mut writer);
    writer.into_string()
}

/// Render a parsed document into an existing writer.
pub fn render_into(doc: &Document, writer: &mut HtmlWriter) {
    render_blocks(&doc.tree, writer, doc.root(), false);
}

fn render_blocks(tree: &Tree, w: &mut HtmlWriter, parent: NodeId, tight: bool) {
    for child in tree.children(parent) {
        render_block(tree, w, child, tight);
    }
}

fn render_block(tree: &Tree, w: &mut HtmlWriter, node: NodeId, tight: bool) {
    match tree.value(node) {
        NodeValue::Document => render_blocks(tree, w, node, false),
        NodeValue::Paragraph => {
            if is_empty_paragraph(tree, node) {
                return;
            }
            if tight {
                render_inlines(tree, w, node);
            } else {
                w.cr();
                w.write_str("<p>");
                render_inlines(tree, w, node);
                w.write_str("</p>\n");
            }
        }
        NodeValue::Heading(HeadingData { level, .. }) => {
            let level = *level;
            w.cr();
            w.write_str("<h");
            w.write_byte(b'0' + level);
            w.write_byte(b'>');
            render_inlines(tree, w, node);
            w.write_str("</h");
            w.write_byte(b'0' + level);
            w.write_str(">\n");
        }
        NodeValue::ThematicBreak => {
            w.cr();
            w.write_str("<hr />\n");
        }
        NodeValue::CodeBlock(data) => {
            w.cr();
            w.write_str("<pre><code");
            if let Some(info) = &data.info {
                let lang = info.split_whitespace().next().unwrap_or("");
                if !lang.is_empty() {
                    w.write_str(" class=\"language-");
                    w.write_escaped_text(lang);
                    w.write_byte(b'"');
                }
            }
            w.write_byte(b'>');
            w.write_escaped_text(&data.literal);
            w.write_str("</code></pre>\n");
        }
        NodeValue::HtmlBlock { literal, .. } => {
            w.cr();
            w.write_str(literal);
            w.cr();
        }
        NodeValue::BlockQuote => {
            w.cr();
            w.write_str("<blockquote>\n");
            render_blocks(tree, w, node, false);
            w.cr();
            w.write_str("</blockquote>\n");
        }
        NodeValue::List(data) => {
            w.cr();
            match data.kind {
                ListKind::Bullet => w.write_str("<ul>\n"),
                ListKind::Ordered => {
                    if data.start == 1 {
                        w.write_str("<ol>\n");
                    } else {
                        w.write_str("<ol start=\"");
                        w.write_usize(data.start);
                        w.write_str("\">\n");
                    }
                }
            }
            let tight = data.tight;
            for item in tree.children(node) {
                render_block(tree, w, item, tight);
            }
            w.cr();
            match data.kind {
                ListKind::Bullet => w.write_str("</ul>\n"),
                ListKind::Ordered => w.write_str("</ol>\n"),
            }
        }
        NodeValue::ListItem(ListData { .. }) => {
            w.cr();
            w.write_str("<li>");
            render_blocks(tree, w, node, tight);
            w.write_str("</li>\n");
        }
        _ => render_inline(tree, w, node),
    }
}

fn render_inlines(tree: &Tree, w: &mut HtmlWriter, parent: NodeId) {
    for child in tree.children(parent) {
        render_inline(tree, w, child);
    }
}

fn render_inline(tree: &Tree, w: &mut HtmlWriter, node: NodeId) {
    match tree.value(node) {
        NodeValue::Text(literal) => w.write_escaped_text(literal),
        NodeValue::SoftBreak => w.write_byte(b'\n'),
        NodeValue::LineBreak => w.write_str("<br />\n"),
        NodeValue::Code(literal) => {
            w.write_str("<code>");
            w.write_escaped_text(literal);
            w.write_str("</code>");
        }
        NodeValue::HtmlInline(literal) => w.write_str(literal),
        NodeValue::Emph => {
            w.write_str("<em>");
            render_inlines(tree, w, node);
            w.write_str("</em>");
        }
        NodeValue::Strong => {
            w.write_str("<strong>");
            render_inlines(tree, w, node);
            w.write_str("</strong>");
        }
        NodeValue::Link(data) => {
            w.write_str("<a href=\"");
            w.write_escaped_href(&data.url);
            if !data.title.is_empty() {
                w.write_str("\" title=\"");
                w.write_escaped_text(&data.title);
            }
            w.write_str("\">");
            render_inlines(tree, w, node);
            w.write_str("</a>");
        }
        NodeValue::Image(data) => {
            w.write_str("<img src=\"");
            w.write_escaped_href(&data.url);
            w.write_str("\" alt=\"");
            let mut alt = String::new();
            flatten_alt_text(tree, node, &mut alt);
            w.write_escaped_text(&alt);
            w.write_byte(b'"');
            if !data.title.is_empty() {
                w.write_str(" title=\"");
                w.write_escaped_text(&data.title);
                w.write_byte(b'"');
            }
            w.write_str(" />");
        }
        _ => {}
    }
}

/// Image alt text is the plain-text flattening of the children: code
/// literals count, breaks become spaces, nested links and images
/// contribute their own contents.
fn flatten_alt_text(tree: &Tree, parent: NodeId, out: &mut String) {
    for child in tree.children(parent) {
        match tree.value(child) {
            NodeValue::Text(literal) | NodeValue::Code(literal) => out.push_str(literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => out.push(' '),
            _ => flatten_alt_text(tree, child, out),
        }
    }
}

/// A paragraph whose children are only whitespace text (and breaks)
/// renders nothing at all.
fn is_empty_paragraph(tree: &Tree, node: NodeId) -> bool {
    for child in tree.children(node) {
        match tree.value(child) {
            NodeValue::Text(literal) if literal.trim().is_empty() => {}
            NodeValue::SoftBreak => {}
            _ => return false,
        }
    }
    true
}
