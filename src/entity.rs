//! HTML entity and numeric character reference decoding.
//!
//! Named references are resolved through the HTML5 table that the
//! `html-escape` crate ships; numeric references are decoded by hand
//! so the CommonMark rules for invalid code points apply exactly.

const MAX_ENTITY_NAME: usize = 32;
const MAX_DEC_DIGITS: usize = 7;
const MAX_HEX_DIGITS: usize = 6;

/// Try to decode an entity at the start of `text`, which is the input
/// immediately *after* a `&`.
///
/// Returns the decoded string and the number of bytes consumed after
/// the `&` (including the terminating `;`).
pub fn unescape(text: &[u8]) -> Option<(String, usize)> {
    match text.first()? {
        b'#' => unescape_numeric(text),
        c if c.is_ascii_alphanumeric() => unescape_named(text),
        _ => None,
    }
}

fn unescape_numeric(text: &[u8]) -> Option<(String, usize)> {
    let mut i = 1;
    let mut codepoint: u32 = 0;

    let (radix, max_digits) = match text.get(i) {
        Some(b'x') | Some(b'X') => {
            i += 1;
            (16u32, MAX_HEX_DIGITS)
        }
        _ => (10u32, MAX_DEC_DIGITS),
    };

    let digits_start = i;
    while let Some(&b) = text.get(i) {
        let digit = match (b as char).to_digit(radix) {
            Some(d) => d,
            None => break,
        };
        if i - digits_start >= max_digits {
            return None;
        }
        codepoint = codepoint * radix + digit;
        i += 1;
    }
    if i == digits_start || text.get(i) != Some(&b';') {
        return None;
    }
    i += 1;

    let ch = match codepoint {
        0 => '\u{FFFD}',
        c => char::from_u32(c).unwrap_or('\u{FFFD}'),
    };
    Some((ch.to_string(), i))
}

fn unescape_named(text: &[u8]) -> Option<(String, usize)> {
    let mut i = 0;
    while let Some(&b) = text.get(i) {
        if !b.is_ascii_alphanumeric() {
            break;
        }
        if i >= MAX_ENTITY_NAME {
            return None;
        }
        i += 1;
    }
    if i < 2 || text.get(i) != Some(&b';') {
        return None;
    }

    // Round-trip the full `&name;` through the HTML5 table; an unknown
    // name comes back unchanged.
    let candidate = std::str::from_utf8(&text[..i]).ok()?;
    let full = format!("&{};", candidate);
    let decoded = html_escape::decode_html_entities(&full);
    if decoded == full {
        return None;
    }
    Some((decoded.into_owned(), i + 1))
}
