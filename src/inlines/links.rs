//! Link and image recognition: bracket tracking, the inline form
//! `(destination "title")`, and the three reference forms.

use super::Subject;
use crate::limits::{MAX_LINK_LABEL_LENGTH, MAX_LINK_PAREN_DEPTH};
use crate::nodes::{LinkData, NodeId, NodeValue};
use crate::scanners;
use crate::strings::{self, is_ascii_punctuation};

/// A pending `[` or `![` opener.
#[derive(Debug)]
pub(crate) struct Bracket {
    pub node: NodeId,
    /// Scan position just after the opener.
    pub position: usize,
    pub image: bool,
    /// Another opener appeared after this one; blocks the shortcut
    /// reference form.
    pub bracket_after: bool,
}

impl<'t, 'r, 'i> Subject<'t, 'r, 'i> {
    pub(crate) fn push_bracket(&mut self, image: bool, node: NodeId) {
        if let Some(last) = self.brackets.last_mut() {
            last.bracket_after = true;
        }
        self.brackets.push(Bracket {
            node,
            position: self.pos,
            image,
            bracket_after: false,
        });
        if !image {
            self.no_link_openers = false;
        }
    }

    pub(crate) fn pop_bracket(&mut self) -> bool {
        self.brackets.pop().is_some()
    }

    /// Handle `]`: try the inline form, then the reference forms; on
    /// failure the bracket is plain text.
    pub(crate) fn handle_close_bracket(&mut self) -> Option<NodeId> {
        self.pos += 1;
        let initial_pos = self.pos;

        if self.brackets.is_empty() {
            return Some(self.make_inline(NodeValue::Text("]".to_string())));
        }

        let is_image = self.brackets.last().map(|b| b.image).unwrap_or(false);

        // Links may not contain links: once a link closes, every
        // older opener is dead.
        if !is_image && self.no_link_openers {
            self.brackets.pop();
            return Some(self.make_inline(NodeValue::Text("]".to_string())));
        }

        let bytes = self.input.as_bytes();

        // Inline form.
        if self.peek_char() == Some(b'(') {
            let sps = scanners::spacechars(bytes, self.pos + 1);
            let dest_start = self.pos + 1 + sps;
            if let Some((url_start, url_end, url_len)) = scan_link_url(bytes, dest_start) {
                let end_url = dest_start + url_len;
                let title_start = end_url + scanners::spacechars(bytes, end_url);
                let title_len = if title_start == end_url {
                    None
                } else {
                    scan_link_title(bytes, title_start)
                };
                let end_title = title_start + title_len.unwrap_or(0);
                let end_all = end_title + scanners::spacechars(bytes, end_title);
                if bytes.get(end_all) == Some(&b')') {
                    self.pos = end_all + 1;
                    let url = strings::clean_url(&self.input[url_start..url_end]);
                    let title = match title_len {
                        Some(len) if len >= 2 => {
                            strings::clean_title(&self.input[title_start + 1..title_start + len - 1])
                        }
                        _ => String::new(),
                    };
                    self.close_bracket_match(is_image, url, title);
                    return None;
                }
                self.pos = initial_pos;
            }
        }

        // Full or collapsed reference form.
        let (mut label, mut found_label) = match self.link_label() {
            Some(l) => (l.to_string(), true),
            None => (String::new(), false),
        };
        if !found_label {
            self.pos = initial_pos;
        }

        // Shortcut form: the bracketed text is its own label.
        let bracket_after = self.brackets.last().map(|b| b.bracket_after).unwrap_or(false);
        if (!found_label || label.is_empty()) && !bracket_after {
            let start = self.brackets.last().map(|b| b.position).unwrap_or(0);
            label = self.input[start..initial_pos - 1].to_string();
            found_label = true;
        }

        let reference = if found_label {
            self.refmap.lookup(&strings::normalize_label(&label)).cloned()
        } else {
            None
        };

        if let Some(reference) = reference {
            self.close_bracket_match(is_image, reference.url, reference.title);
            return None;
        }

        self.brackets.pop();
        self.pos = initial_pos;
        Some(self.make_inline(NodeValue::Text("]".to_string())))
    }

    /// Build the link/image node: reparent everything after the
    /// opener into it and resolve emphasis within the link text.
    fn close_bracket_match(&mut self, is_image: bool, url: String, title: String) {
        let data = LinkData { url, title };
        let inl = self.make_inline(if is_image {
            NodeValue::Image(data)
        } else {
            NodeValue::Link(data)
        });

        let bracket_node = self.brackets.last().map(|b| b.node).unwrap();
        let bracket_position = self.brackets.last().map(|b| b.position).unwrap();

        self.tree.insert_before(bracket_node, inl);
        let mut child = self.tree.next_sibling(bracket_node);
        while let Some(c) = child {
            let next = self.tree.next_sibling(c);
            self.tree.append(inl, c);
            child = next;
        }
        self.tree.detach(bracket_node);

        self.process_emphasis(bracket_position);
        self.brackets.pop();

        if !is_image {
            self.no_link_openers = true;
        }
    }

    /// Scan a `[label]` at the current position. Returns the trimmed
    /// label text and advances past it, or rewinds on failure.
    pub(crate) fn link_label(&mut self) -> Option<&'i str> {
        let input = self.input;
        let startpos = self.pos;
        if self.peek_char() != Some(b'[') {
            return None;
        }
        self.pos += 1;

        let mut length = 0;
        loop {
            match self.peek_char() {
                None | Some(b'[') => {
                    self.pos = startpos;
                    return None;
                }
                Some(b']') => break,
                Some(b'\\') => {
                    self.pos += 1;
                    length += 1;
                    if self.peek_char().is_some_and(is_ascii_punctuation) {
                        self.pos += 1;
                        length += 1;
                    }
                }
                Some(_) => {
                    self.pos += 1;
                    length += 1;
                }
            }
            if length > MAX_LINK_LABEL_LENGTH {
                self.pos = startpos;
                return None;
            }
        }

        let raw = &input.as_bytes()[startpos + 1..self.pos];
        let trimmed = strings::trim_slice(raw);
        self.pos += 1;
        // The input is UTF-8 and trimming only removes ASCII.
        Some(std::str::from_utf8(trimmed).unwrap_or(""))
    }
}

/// Scan an inline link destination at `pos`. Returns the byte range
/// of the destination (inside any angle brackets) and the bytes
/// consumed. An empty bare destination is legal here.
fn scan_link_url(input: &[u8], start: usize) -> Option<(usize, usize, usize)> {
    let len = input.len();
    let mut i = start;

    if input.get(i) == Some(&b'<') {
        i += 1;
        let inner = i;
        while i < len {
            match input[i] {
                b'>' => return Some((inner, i, i + 1 - start)),
                b'<' | b'\n' | b'\r' => return None,
                b'\\' => i += if i + 1 < len { 2 } else { 1 },
                _ => i += 1,
            }
        }
        return None;
    }

    let mut depth = 0usize;
    let inner = i;
    while i < len {
        let b = input[i];
        if b == b'\\' && input.get(i + 1).copied().is_some_and(is_ascii_punctuation) {
            i += 2;
            continue;
        }
        match b {
            b'(' => {
                depth += 1;
                if depth > MAX_LINK_PAREN_DEPTH {
                    return None;
                }
                i += 1;
            }
            b')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                i += 1;
            }
            b' ' | b'\t' | b'\n' | b'\r' => break,
            _ => i += 1,
        }
    }
    if depth != 0 {
        return None;
    }
    Some((inner, i, i - start))
}

/// Scan a link title at `pos`; returns the consumed length including
/// delimiters.
fn scan_link_title(input: &[u8], start: usize) -> Option<usize> {
    let close = match input.get(start)? {
        b'"' => b'"',
        b'\'' => b'\'',
        b'(' => b')',
        _ => return None,
    };
    let mut i = start + 1;
    while i < input.len() {
        let b = input[i];
        if b == b'\\' && i + 1 < input.len() {
            i += 2;
            continue;
        }
        if b == close {
            return Some(i + 1 - start);
        }
        if close == b')' && b == b'(' {
            return None;
        }
        i += 1;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::to_html;

    #[test]
    fn test_scan_link_url() {
        assert_eq!(scan_link_url(b"/uri)", 0), Some((0, 4, 4)));
        assert_eq!(scan_link_url(b"<my uri>)", 0), Some((1, 7, 8)));
        assert_eq!(scan_link_url(b")", 0), Some((0, 0, 0)));
        assert_eq!(scan_link_url(b"a(b)c)", 0), Some((0, 5, 5)));
        assert_eq!(scan_link_url(b"a(b", 0), None);
        assert_eq!(scan_link_url(b"<a\nb>", 0), None);
    }

    #[test]
    fn test_scan_link_title() {
        assert_eq!(scan_link_title(b"\"title\"", 0), Some(7));
        assert_eq!(scan_link_title(b"'title'", 0), Some(7));
        assert_eq!(scan_link_title(b"(title)", 0), Some(7));
        assert_eq!(scan_link_title(b"(a(b))", 0), None);
        assert_eq!(scan_link_title(b"\"open", 0), None);
    }

    #[test]
    fn test_inline_link() {
        assert_eq!(
            to_html("[link](/uri \"title\")"),
            "<p><a href=\"/uri\" title=\"title\">link</a></p>\n"
        );
        assert_eq!(to_html("[link]()"), "<p><a href=\"\">link</a></p>\n");
        assert_eq!(
            to_html("[link](</my uri>)"),
            "<p><a href=\"/my%20uri\">link</a></p>\n"
        );
    }

    #[test]
    fn test_image() {
        assert_eq!(
            to_html("![alt](/pic.png \"t\")"),
            "<p><img src=\"/pic.png\" alt=\"alt\" title=\"t\" /></p>\n"
        );
    }

    #[test]
    fn test_no_link_in_link() {
        assert_eq!(
            to_html("[foo [bar](/uri)](/uri)"),
            "<p>[foo <a href=\"/uri\">bar</a>](/uri)</p>\n"
        );
    }

    #[test]
    fn test_image_in_link_allowed() {
        assert_eq!(
            to_html("[![moon](moon.jpg)](/uri)"),
            "<p><a href=\"/uri\"><img src=\"moon.jpg\" alt=\"moon\" /></a></p>\n"
        );
    }

    #[test]
    fn test_reference_forms() {
        assert_eq!(
            to_html("[foo][bar]\n\n[bar]: /url \"title\""),
            "<p><a href=\"/url\" title=\"title\">foo</a></p>\n"
        );
        assert_eq!(
            to_html("[foo][]\n\n[foo]: /url"),
            "<p><a href=\"/url\">foo</a></p>\n"
        );
        assert_eq!(
            to_html("[foo]\n\n[foo]: /url"),
            "<p><a href=\"/url\">foo</a></p>\n"
        );
        assert_eq!(to_html("[foo]\n\n[bar]: /url"), "<p>[foo]</p>\n");
    }

    #[test]
    fn test_label_case_fold() {
        assert_eq!(
            to_html("[ТОЛПОЙ][Толпой]\n\n[ТОЛПОЙ]: /url"),
            "<p><a href=\"/url\">ТОЛПОЙ</a></p>\n"
        );
    }
}
