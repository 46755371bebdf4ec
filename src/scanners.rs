//! Byte-level scanners shared by the block and inline parsers.
//!
//! Every scanner takes a byte slice and a starting position and
//! answers without allocating. Lines handed to the block scanners
//! carry no terminator, so end-of-slice counts as end-of-line.

use crate::strings::{is_space_or_tab, is_blank};

/// A tab advances to the next multiple of this column width.
pub const TAB_STOP: usize = 4;

/// Tag names that open a type-6 HTML block.
const BLOCK_TAG_NAMES: &[&str] = &[
    "address", "article", "aside", "base", "basefont", "blockquote", "body", "caption", "center",
    "col", "colgroup", "dd", "details", "dialog", "dir", "div", "dl", "dt", "fieldset",
    "figcaption", "figure", "footer", "form", "frame", "frameset", "h1", "h2", "h3", "h4", "h5",
    "h6", "head", "header", "hr", "html", "iframe", "legend", "li", "link", "main", "menu",
    "menuitem", "nav", "noframes", "ol", "optgroup", "option", "p", "param", "search", "section",
    "summary", "table", "tbody", "td", "tfoot", "th", "thead", "title", "tr", "track", "ul",
];

/// Tag names that open a type-1 HTML block (and are excluded from
/// type 7).
const VERBATIM_TAG_NAMES: &[&str] = &["pre", "script", "style", "textarea"];

#[inline]
fn at_eol(line: &[u8], pos: usize) -> bool {
    pos >= line.len()
}

/// Case-insensitive match of `tag` at `pos`.
fn starts_with_ignore_case(line: &[u8], pos: usize, tag: &str) -> bool {
    let tag = tag.as_bytes();
    line.len() - pos.min(line.len()) >= tag.len()
        && line[pos..pos + tag.len()]
            .iter()
            .zip(tag)
            .all(|(a, b)| a.eq_ignore_ascii_case(b))
}

/// Scan a thematic break (`***`, `---`, `___` with interleaved
/// spaces/tabs) covering the rest of the line.
pub fn thematic_break(line: &[u8], pos: usize) -> bool {
    let marker = match line.get(pos) {
        Some(&b @ (b'*' | b'-' | b'_')) => b,
        _ => return false,
    };
    let mut count = 0;
    for &b in &line[pos..] {
        if b == marker {
            count += 1;
        } else if !is_space_or_tab(b) {
            return false;
        }
    }
    count >= 3
}

/// Scan an ATX heading opener: 1-6 `#` followed by space, tab or EOL.
///
/// Returns the level and the position just past the hashes.
pub fn atx_heading_start(line: &[u8], pos: usize) -> Option<(u8, usize)> {
    let mut i = pos;
    while line.get(i) == Some(&b'#') {
        i += 1;
    }
    let level = i - pos;
    if level == 0 || level > 6 {
        return None;
    }
    if !at_eol(line, i) && !is_space_or_tab(line[i]) {
        return None;
    }
    Some((level as u8, i))
}

/// Scan a setext heading underline: a run of `=` or `-` followed by
/// only spaces/tabs. Returns the heading level (1 for `=`, 2 for `-`).
pub fn setext_heading_line(line: &[u8], pos: usize) -> Option<u8> {
    let marker = match line.get(pos) {
        Some(&b @ (b'=' | b'-')) => b,
        _ => return None,
    };
    let mut i = pos;
    while line.get(i) == Some(&marker) {
        i += 1;
    }
    if is_blank(&line[i..]) {
        Some(if marker == b'=' { 1 } else { 2 })
    } else {
        None
    }
}

/// Scan a code fence opener: at least three backticks or tildes.
/// A backtick fence may not have a backtick in its info string.
///
/// Returns the fence length.
pub fn open_code_fence(line: &[u8], pos: usize) -> Option<usize> {
    let fence_char = match line.get(pos) {
        Some(&b @ (b'`' | b'~')) => b,
        _ => return None,
    };
    let mut i = pos;
    while line.get(i) == Some(&fence_char) {
        i += 1;
    }
    let len = i - pos;
    if len < 3 {
        return None;
    }
    if fence_char == b'`' && line[i..].contains(&b'`') {
        return None;
    }
    Some(len)
}

/// Scan a closing code fence of `fence_char` at `pos`: a run of at
/// least three, followed by only spaces/tabs. Returns the run length.
pub fn close_code_fence(line: &[u8], pos: usize, fence_char: u8) -> Option<usize> {
    let mut i = pos;
    while line.get(i) == Some(&fence_char) {
        i += 1;
    }
    let len = i - pos;
    if len < 3 || !is_blank(&line[i..]) {
        return None;
    }
    Some(len)
}

/// Try the HTML block start conditions for types 1 through 6.
pub fn html_block_start(line: &[u8], pos: usize) -> Option<u8> {
    if line.get(pos) != Some(&b'<') {
        return None;
    }
    if starts_with_ignore_case(line, pos, "<!--") {
        return Some(2);
    }
    if starts_with_ignore_case(line, pos, "<?") {
        return Some(3);
    }
    if starts_with_ignore_case(line, pos, "<![CDATA[") {
        return Some(5);
    }
    if line.get(pos + 1) == Some(&b'!') && line.get(pos + 2).is_some_and(u8::is_ascii_uppercase) {
        return Some(4);
    }
    for tag in VERBATIM_TAG_NAMES {
        if starts_with_ignore_case(line, pos + 1, tag) {
            let after = pos + 1 + tag.len();
            if at_eol(line, after) || is_space_or_tab(line[after]) || line[after] == b'>' {
                return Some(1);
            }
        }
    }
    let name_pos = if line.get(pos + 1) == Some(&b'/') {
        pos + 2
    } else {
        pos + 1
    };
    for tag in BLOCK_TAG_NAMES {
        if starts_with_ignore_case(line, name_pos, tag) {
            let after = name_pos + tag.len();
            let terminated = at_eol(line, after)
                || is_space_or_tab(line[after])
                || line[after] == b'>'
                || (line[after] == b'/' && line.get(after + 1) == Some(&b'>'));
            if terminated {
                return Some(6);
            }
        }
    }
    None
}

/// Try the HTML block start condition for type 7: a complete open or
/// close tag as the only content of the line, with a tag name other
/// than the verbatim four.
pub fn html_block_start_7(line: &[u8], pos: usize) -> Option<u8> {
    if line.get(pos) != Some(&b'<') {
        return None;
    }
    let name_pos = if line.get(pos + 1) == Some(&b'/') {
        pos + 2
    } else {
        pos + 1
    };
    for tag in VERBATIM_TAG_NAMES {
        if starts_with_ignore_case(line, name_pos, tag) {
            let after = name_pos + tag.len();
            let name_continues =
                !at_eol(line, after) && (line[after].is_ascii_alphanumeric() || line[after] == b'-');
            if !name_continues {
                return None;
            }
        }
    }
    let end = html_tag(line, pos)?;
    if is_blank(&line[end..]) {
        Some(7)
    } else {
        None
    }
}

/// Whether `line` satisfies the end condition of an HTML block type.
/// Types 6 and 7 end on a blank line, which the block parser checks
/// itself.
pub fn html_block_end(html_type: u8, line: &[u8]) -> bool {
    match html_type {
        1 => VERBATIM_TAG_NAMES.iter().any(|tag| {
            (0..line.len()).any(|i| {
                starts_with_ignore_case(line, i, "</")
                    && starts_with_ignore_case(line, i + 2, tag)
                    && line.get(i + 2 + tag.len()) == Some(&b'>')
            })
        }),
        2 => contains_seq(line, b"-->"),
        3 => contains_seq(line, b"?>"),
        4 => line.contains(&b'>'),
        5 => contains_seq(line, b"]]>"),
        _ => false,
    }
}

#[inline]
fn contains_seq(haystack: &[u8], needle: &[u8]) -> bool {
    haystack
        .windows(needle.len())
        .any(|window| window == needle)
}

/// Find `needle` in `text` at or after `start`; returns the index of
/// the match's first byte.
pub fn find_seq(text: &[u8], start: usize, needle: &[u8]) -> Option<usize> {
    if start >= text.len() || text.len() < needle.len() {
        return None;
    }
    text[start..]
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|i| start + i)
}

#[inline]
fn is_html_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

#[inline]
fn is_attr_name_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b':'
}

#[inline]
fn is_attr_name_char(b: u8) -> bool {
    is_attr_name_start(b) || b.is_ascii_digit() || b == b'.' || b == b'-'
}

/// Scan a complete HTML open or close tag at `pos` (which must hold
/// `<`). Returns the position one past the closing `>`.
pub fn html_tag(text: &[u8], pos: usize) -> Option<usize> {
    let len = text.len();
    let mut i = pos + 1;

    let closing = text.get(i) == Some(&b'/');
    if closing {
        i += 1;
    }

    if i >= len || !text[i].is_ascii_alphabetic() {
        return None;
    }
    i += 1;
    while i < len && (text[i].is_ascii_alphanumeric() || text[i] == b'-') {
        i += 1;
    }

    if closing {
        while i < len && is_html_whitespace(text[i]) {
            i += 1;
        }
        return (i < len && text[i] == b'>').then(|| i + 1);
    }

    loop {
        if i >= len {
            return None;
        }
        match text[i] {
            b'>' => return Some(i + 1),
            b'/' => {
                return (text.get(i + 1) == Some(&b'>')).then(|| i + 2);
            }
            b if !is_html_whitespace(b) => return None,
            _ => {}
        }
        while i < len && is_html_whitespace(text[i]) {
            i += 1;
        }
        if i >= len {
            return None;
        }
        if text[i] == b'>' {
            return Some(i + 1);
        }
        if text[i] == b'/' {
            return (text.get(i + 1) == Some(&b'>')).then(|| i + 2);
        }

        // Attribute name.
        if !is_attr_name_start(text[i]) {
            return None;
        }
        i += 1;
        while i < len && is_attr_name_char(text[i]) {
            i += 1;
        }

        // Optional value.
        let ws_start = i;
        while i < len && is_html_whitespace(text[i]) {
            i += 1;
        }
        if i < len && text[i] == b'=' {
            i += 1;
            while i < len && is_html_whitespace(text[i]) {
                i += 1;
            }
            if i >= len {
                return None;
            }
            match text[i] {
                quote @ (b'"' | b'\'') => {
                    i += 1;
                    while i < len && text[i] != quote {
                        i += 1;
                    }
                    if i >= len {
                        return None;
                    }
                    i += 1;
                }
                _ => {
                    let mut any = false;
                    while i < len
                        && !is_html_whitespace(text[i])
                        && !matches!(text[i], b'"' | b'\'' | b'=' | b'<' | b'>' | b'`')
                    {
                        any = true;
                        i += 1;
                    }
                    if !any {
                        return None;
                    }
                }
            }
        } else {
            i = ws_start;
        }
    }
}

/// Scan an HTML comment at `pos` (which must hold `<`): `<!-->`,
/// `<!--->`, or `<!--` up to the first `-->`.
pub fn html_comment(text: &[u8], pos: usize) -> Option<usize> {
    if !text[pos..].starts_with(b"<!--") {
        return None;
    }
    let i = pos + 4;
    if text.get(i) == Some(&b'>') {
        return Some(i + 1);
    }
    if text.get(i) == Some(&b'-') && text.get(i + 1) == Some(&b'>') {
        return Some(i + 2);
    }
    find_seq(text, i, b"-->").map(|end| end + 3)
}

/// Scan a processing instruction at `pos`: `<?` up to the first `?>`.
pub fn html_processing_instruction(text: &[u8], pos: usize) -> Option<usize> {
    if !text[pos..].starts_with(b"<?") {
        return None;
    }
    find_seq(text, pos + 2, b"?>").map(|end| end + 2)
}

/// Scan a declaration at `pos`: `<!`, an ASCII letter, anything but
/// `>`, then `>`.
pub fn html_declaration(text: &[u8], pos: usize) -> Option<usize> {
    if !text[pos..].starts_with(b"<!") {
        return None;
    }
    if !text.get(pos + 2).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    memchr::memchr(b'>', &text[pos + 2..]).map(|i| pos + 2 + i + 1)
}

/// Scan a CDATA section at `pos`: `<![CDATA[` up to the first `]]>`.
pub fn html_cdata(text: &[u8], pos: usize) -> Option<usize> {
    if !text[pos..].starts_with(b"<![CDATA[") {
        return None;
    }
    find_seq(text, pos + 9, b"]]>").map(|end| end + 3)
}

/// Scan any inline raw-HTML construct at `pos` (which must hold `<`).
pub fn inline_html(text: &[u8], pos: usize) -> Option<usize> {
    match text.get(pos + 1) {
        Some(b'!') => html_comment(text, pos)
            .or_else(|| html_cdata(text, pos))
            .or_else(|| html_declaration(text, pos)),
        Some(b'?') => html_processing_instruction(text, pos),
        _ => html_tag(text, pos),
    }
}

/// Scan a URI autolink body starting just after `<`. Returns the
/// length consumed including the closing `>`.
pub fn autolink_uri(text: &[u8]) -> Option<usize> {
    let mut i = 0;

    // Scheme: a letter then 1-31 letters/digits/`+`/`.`/`-`, then `:`.
    if !text.first().is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    i += 1;
    while let Some(&b) = text.get(i) {
        if b.is_ascii_alphanumeric() || matches!(b, b'+' | b'.' | b'-') {
            i += 1;
            if i > 32 {
                return None;
            }
        } else {
            break;
        }
    }
    if i < 2 || text.get(i) != Some(&b':') {
        return None;
    }
    i += 1;

    while let Some(&b) = text.get(i) {
        match b {
            b'>' => return Some(i + 1),
            b'<' | b' ' | 0x00..=0x1f | 0x7f => return None,
            _ => i += 1,
        }
    }
    None
}

/// Scan an email autolink body starting just after `<`. Returns the
/// length consumed including the closing `>`.
pub fn autolink_email(text: &[u8]) -> Option<usize> {
    let mut i = 0;
    let is_local = |b: u8| {
        b.is_ascii_alphanumeric()
            || matches!(
                b,
                b'.' | b'!' | b'#' | b'$' | b'%' | b'&' | b'\'' | b'*' | b'+' | b'/' | b'='
                    | b'?' | b'^' | b'_' | b'`' | b'{' | b'|' | b'}' | b'~' | b'-'
            )
    };
    while text.get(i).copied().is_some_and(is_local) {
        i += 1;
    }
    if i == 0 || text.get(i) != Some(&b'@') {
        return None;
    }
    i += 1;

    loop {
        // One domain label: alphanumeric, then up to 61 more
        // alphanumeric/hyphen, not ending in a hyphen.
        let label_start = i;
        if !text.get(i).copied().is_some_and(|b| b.is_ascii_alphanumeric()) {
            return None;
        }
        i += 1;
        let mut last = text[i - 1];
        while let Some(&b) = text.get(i) {
            if b.is_ascii_alphanumeric() || b == b'-' {
                if i - label_start >= 63 {
                    return None;
                }
                last = b;
                i += 1;
            } else {
                break;
            }
        }
        if last == b'-' {
            return None;
        }
        match text.get(i) {
            Some(b'.') => i += 1,
            Some(b'>') => return Some(i + 1),
            _ => return None,
        }
    }
}

/// Count spaces, tabs and line endings starting at `pos`.
pub fn spacechars(text: &[u8], pos: usize) -> usize {
    let mut i = pos;
    while i < text.len() && is_html_whitespace(text[i]) {
        i += 1;
    }
    i - pos
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thematic_break() {
        assert!(thematic_break(b"***", 0));
        assert!(thematic_break(b"- - -", 0));
        assert!(thematic_break(b"__ _ __", 0));
        assert!(thematic_break(b"----------", 0));
        assert!(!thematic_break(b"**", 0));
        assert!(!thematic_break(b"-*-", 0));
        assert!(!thematic_break(b"--- x", 0));
    }

    #[test]
    fn test_atx_heading() {
        assert_eq!(atx_heading_start(b"# x", 0), Some((1, 1)));
        assert_eq!(atx_heading_start(b"###### x", 0), Some((6, 6)));
        assert_eq!(atx_heading_start(b"#", 0), Some((1, 1)));
        assert_eq!(atx_heading_start(b"#\tx", 0), Some((1, 1)));
        assert_eq!(atx_heading_start(b"####### x", 0), None);
        assert_eq!(atx_heading_start(b"#x", 0), None);
    }

    #[test]
    fn test_setext() {
        assert_eq!(setext_heading_line(b"===", 0), Some(1));
        assert_eq!(setext_heading_line(b"-", 0), Some(2));
        assert_eq!(setext_heading_line(b"--  ", 0), Some(2));
        assert_eq!(setext_heading_line(b"== =", 0), None);
        assert_eq!(setext_heading_line(b"=a", 0), None);
    }

    #[test]
    fn test_code_fences() {
        assert_eq!(open_code_fence(b"```", 0), Some(3));
        assert_eq!(open_code_fence(b"````rust", 0), Some(4));
        assert_eq!(open_code_fence(b"~~~ info `ok`", 0), Some(3));
        assert_eq!(open_code_fence(b"``` a`b", 0), None);
        assert_eq!(open_code_fence(b"``", 0), None);

        assert_eq!(close_code_fence(b"```", 0, b'`'), Some(3));
        assert_eq!(close_code_fence(b"`````  ", 0, b'`'), Some(5));
        assert_eq!(close_code_fence(b"``` x", 0, b'`'), None);
        assert_eq!(close_code_fence(b"~~", 0, b'~'), None);
    }

    #[test]
    fn test_html_block_start() {
        assert_eq!(html_block_start(b"<script src=\"x\">", 0), Some(1));
        assert_eq!(html_block_start(b"<PRE>", 0), Some(1));
        assert_eq!(html_block_start(b"<textarea", 0), Some(1));
        assert_eq!(html_block_start(b"<!-- comment", 0), Some(2));
        assert_eq!(html_block_start(b"<?php", 0), Some(3));
        assert_eq!(html_block_start(b"<!DOCTYPE html>", 0), Some(4));
        assert_eq!(html_block_start(b"<![CDATA[", 0), Some(5));
        assert_eq!(html_block_start(b"<div", 0), Some(6));
        assert_eq!(html_block_start(b"</table>", 0), Some(6));
        assert_eq!(html_block_start(b"<divx", 0), None);
        assert_eq!(html_block_start(b"<span>", 0), None);
    }

    #[test]
    fn test_html_block_start_7() {
        assert_eq!(html_block_start_7(b"<a href=\"x\">", 0), Some(7));
        assert_eq!(html_block_start_7(b"<Warning>", 0), Some(7));
        assert_eq!(html_block_start_7(b"</ins>", 0), Some(7));
        assert_eq!(html_block_start_7(b"<a href=\"x\"> b", 0), None);
        assert_eq!(html_block_start_7(b"<pre>", 0), None);
    }

    #[test]
    fn test_html_block_end() {
        assert!(html_block_end(1, b"ok</script>done"));
        assert!(html_block_end(1, b"</STYLE>"));
        assert!(!html_block_end(1, b"</scriptx>"));
        assert!(html_block_end(2, b"text-->"));
        assert!(html_block_end(3, b"x ?>"));
        assert!(html_block_end(4, b">"));
        assert!(html_block_end(5, b"]]>"));
        assert!(!html_block_end(2, b"--"));
    }

    #[test]
    fn test_html_tag() {
        assert_eq!(html_tag(b"<a>", 0), Some(3));
        assert_eq!(html_tag(b"<a/>", 0), Some(4));
        assert_eq!(html_tag(b"<a foo=\"bar\">", 0), Some(13));
        assert_eq!(html_tag(b"<a foo=bar baz>", 0), Some(15));
        assert_eq!(html_tag(b"</span >", 0), Some(8));
        assert_eq!(html_tag(b"<33>", 0), None);
        assert_eq!(html_tag(b"<a h*ref>", 0), None);
        assert_eq!(html_tag(b"<a foo=>", 0), None);
        // Newlines are allowed inside attribute whitespace.
        assert_eq!(html_tag(b"<a\nfoo=\"b\nc\" />", 0), Some(15));
    }

    #[test]
    fn test_html_comment() {
        assert_eq!(html_comment(b"<!-->", 0), Some(5));
        assert_eq!(html_comment(b"<!--->", 0), Some(6));
        assert_eq!(html_comment(b"<!-- x -->", 0), Some(10));
        assert_eq!(html_comment(b"<!------>", 0), Some(9));
        assert_eq!(html_comment(b"<!-- x", 0), None);
    }

    #[test]
    fn test_autolink_uri() {
        assert_eq!(autolink_uri(b"http://foo.bar>"), Some(15));
        assert_eq!(autolink_uri(b"made-up-scheme://x>"), Some(19));
        assert_eq!(autolink_uri(b"a+b-c.d:e>"), Some(10));
        assert_eq!(autolink_uri(b"http://a b>"), None);
        assert_eq!(autolink_uri(b"ab:>"), Some(4));
        // Schemes are at least two characters.
        assert_eq!(autolink_uri(b"m:abc>"), None);
        assert_eq!(autolink_uri(b"nocolon>"), None);
    }

    #[test]
    fn test_autolink_email() {
        assert_eq!(autolink_email(b"foo@bar.example.com>"), Some(20));
        assert_eq!(autolink_email(b"foo+special@Bar.baz-bar0.com>"), Some(29));
        assert_eq!(autolink_email(b"foo@bar>"), Some(8));
        assert_eq!(autolink_email(b"@bar>"), None);
        assert_eq!(autolink_email(b"foo@bar-.com>"), None);
        assert_eq!(autolink_email(b"foo@b ar>"), None);
    }
}
