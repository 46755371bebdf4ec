//! Small text utilities shared across the parser and renderer.

use crate::entity;

#[inline]
pub fn is_space_or_tab(b: u8) -> bool {
    b == b' ' || b == b'\t'
}

#[inline]
pub fn is_line_end_char(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

/// ASCII punctuation per CommonMark (the set a backslash may escape).
#[inline]
pub fn is_ascii_punctuation(b: u8) -> bool {
    matches!(b,
        b'!'..=b'/' | b':'..=b'@' | b'['..=b'`' | b'{'..=b'~')
}

/// Whether `slice` contains only spaces and tabs (or nothing).
#[inline]
pub fn is_blank(slice: &[u8]) -> bool {
    slice.iter().all(|&b| is_space_or_tab(b))
}

/// Trim ASCII whitespace from both ends of a byte slice.
pub fn trim_slice(mut slice: &[u8]) -> &[u8] {
    while let Some((&b, rest)) = slice.split_first() {
        if b.is_ascii_whitespace() {
            slice = rest;
        } else {
            break;
        }
    }
    while let Some((&b, rest)) = slice.split_last() {
        if b.is_ascii_whitespace() {
            slice = rest;
        } else {
            break;
        }
    }
    slice
}

/// Remove trailing spaces, tabs and line endings from a `String` in
/// place, returning how many bytes were removed.
pub fn rtrim(s: &mut String) -> usize {
    let len = s.len();
    let trimmed = s.trim_end_matches([' ', '\t', '\n', '\r']).len();
    s.truncate(trimmed);
    len - trimmed
}

/// Normalize code-span content: line endings become spaces, then one
/// leading and one trailing space are stripped when the content both
/// begins and ends with a space and is not all spaces.
pub fn normalize_code(content: &str) -> String {
    let mut out: String = content
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let bytes = out.as_bytes();
    if bytes.len() > 1
        && bytes.first() == Some(&b' ')
        && bytes.last() == Some(&b' ')
        && bytes.iter().any(|&b| b != b' ')
    {
        out.pop();
        out.remove(0);
    }
    out
}

/// Decode backslash escapes and HTML entities into `out`.
pub fn unescape_into(input: &str, out: &mut String) {
    let bytes = input.as_bytes();
    let mut i = 0;
    let mut plain_from = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if i + 1 < bytes.len() && is_ascii_punctuation(bytes[i + 1]) => {
                out.push_str(&input[plain_from..i]);
                out.push(bytes[i + 1] as char);
                i += 2;
                plain_from = i;
            }
            b'&' => {
                if let Some((decoded, len)) = entity::unescape(&bytes[i + 1..]) {
                    out.push_str(&input[plain_from..i]);
                    out.push_str(&decoded);
                    i += 1 + len;
                    plain_from = i;
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    out.push_str(&input[plain_from..]);
}

/// Decode backslash escapes and entities, returning a new string.
pub fn unescape_all(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    unescape_into(input, &mut out);
    out
}

/// Decode HTML entities only (no backslash processing) into `out`.
/// Autolink URLs want this: a backslash inside them is literal.
pub fn unescape_entities_into(input: &str, out: &mut String) {
    let bytes = input.as_bytes();
    let mut i = 0;
    let mut plain_from = 0;
    while i < bytes.len() {
        if bytes[i] == b'&' {
            if let Some((decoded, len)) = entity::unescape(&bytes[i + 1..]) {
                out.push_str(&input[plain_from..i]);
                out.push_str(&decoded);
                i += 1 + len;
                plain_from = i;
                continue;
            }
        }
        i += 1;
    }
    out.push_str(&input[plain_from..]);
}

/// Clean a link destination: decode escapes and entities. The
/// destination arrives without surrounding whitespace or angle
/// brackets; percent-encoding is the renderer's job.
pub fn clean_url(input: &str) -> String {
    unescape_all(input)
}

/// Clean a link title whose surrounding delimiters are already gone.
pub fn clean_title(input: &str) -> String {
    unescape_all(input)
}

/// Normalize a link label: collapse whitespace runs to single spaces,
/// trim, and Unicode-case-fold (with `ß`/`ẞ` mapping to `ss`).
pub fn normalize_label(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let mut last_was_space = true;
    for ch in label.chars() {
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
            continue;
        }
        last_was_space = false;
        if ch == 'ß' || ch == 'ẞ' {
            out.push_str("ss");
        } else {
            for lc in ch.to_lowercase() {
                out.push(lc);
            }
        }
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_slice() {
        assert_eq!(trim_slice(b"  foo \t"), b"foo");
        assert_eq!(trim_slice(b"foo"), b"foo");
        assert_eq!(trim_slice(b" \t "), b"");
    }

    #[test]
    fn test_rtrim() {
        let mut s = "foo  \n".to_string();
        assert_eq!(rtrim(&mut s), 3);
        assert_eq!(s, "foo");
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code(" foo "), "foo");
        assert_eq!(normalize_code("  foo  "), " foo ");
        assert_eq!(normalize_code("foo\nbar"), "foo bar");
        assert_eq!(normalize_code("   "), "   ");
        assert_eq!(normalize_code(" "), " ");
        assert_eq!(normalize_code(" a"), " a");
    }

    #[test]
    fn test_unescape_all() {
        assert_eq!(unescape_all(r"\*foo\*"), "*foo*");
        assert_eq!(unescape_all(r"\a"), r"\a");
        assert_eq!(unescape_all("a &amp; b"), "a & b");
        assert_eq!(unescape_all("&#35;"), "#");
        assert_eq!(unescape_all("&nope; x"), "&nope; x");
    }

    #[test]
    fn test_normalize_label() {
        assert_eq!(normalize_label("  Foo\n\t Bar  "), "foo bar");
        assert_eq!(normalize_label("ТОЛПОЙ"), "толпой");
        assert_eq!(normalize_label("Straße"), "strasse");
        assert_eq!(normalize_label("ΑΓΩ"), "αγω");
    }
}
