//! End-to-end tests for links and images.

use quillmark::to_html;

#[test]
fn inline_links() {
    assert_eq!(
        to_html("[link](/uri \"title\")"),
        "<p><a href=\"/uri\" title=\"title\">link</a></p>\n"
    );
    assert_eq!(to_html("[link](/uri)"), "<p><a href=\"/uri\">link</a></p>\n");
    assert_eq!(to_html("[link]()"), "<p><a href=\"\">link</a></p>\n");
    assert_eq!(to_html("[link](<>)"), "<p><a href=\"\">link</a></p>\n");
    assert_eq!(to_html("[link](/my uri)"), "<p>[link](/my uri)</p>\n");
    assert_eq!(
        to_html("[link](</my uri>)"),
        "<p><a href=\"/my%20uri\">link</a></p>\n"
    );
}

#[test]
fn link_destinations() {
    assert_eq!(
        to_html("[link](foo(and(bar)))"),
        "<p><a href=\"foo(and(bar))\">link</a></p>\n"
    );
    assert_eq!(to_html("[link](foo(and(bar))"), "<p>[link](foo(and(bar))</p>\n");
    assert_eq!(
        to_html("[link](foo\\(and\\(bar\\))"),
        "<p><a href=\"foo(and(bar)\">link</a></p>\n"
    );
    assert_eq!(
        to_html("[link](foo%20b&auml;)"),
        "<p><a href=\"foo%20b%C3%A4\">link</a></p>\n"
    );
    assert_eq!(
        to_html("[link](/url?q=a b)"),
        "<p>[link](/url?q=a b)</p>\n"
    );
}

#[test]
fn link_titles() {
    assert_eq!(
        to_html("[link](/url 'title')"),
        "<p><a href=\"/url\" title=\"title\">link</a></p>\n"
    );
    assert_eq!(
        to_html("[link](/url (title))"),
        "<p><a href=\"/url\" title=\"title\">link</a></p>\n"
    );
    assert_eq!(
        to_html("[link](/url \"title \\\"&quot;\\\"\")"),
        "<p><a href=\"/url\" title=\"title &quot;&quot;\">link</a></p>\n"
    );
    // Whitespace is required between destination and title.
    assert_eq!(
        to_html("[link](/url\"title\")"),
        "<p>[link](/url&quot;title&quot;)</p>\n"
    );
}

#[test]
fn link_text_inlines() {
    assert_eq!(
        to_html("[*em* `code`](/uri)"),
        "<p><a href=\"/uri\"><em>em</em> <code>code</code></a></p>\n"
    );
    assert_eq!(
        to_html("[foo\nbar](/uri)"),
        "<p><a href=\"/uri\">foo\nbar</a></p>\n"
    );
}

#[test]
fn no_links_inside_links() {
    assert_eq!(
        to_html("[foo [bar](/uri)](/uri)"),
        "<p>[foo <a href=\"/uri\">bar</a>](/uri)</p>\n"
    );
}

#[test]
fn images() {
    assert_eq!(
        to_html("![foo](/url \"title\")"),
        "<p><img src=\"/url\" alt=\"foo\" title=\"title\" /></p>\n"
    );
    assert_eq!(
        to_html("![foo ![bar](/u)](/u2)"),
        "<p><img src=\"/u2\" alt=\"foo bar\" /></p>\n"
    );
    assert_eq!(
        to_html("![foo [bar](/u)](/u2)"),
        "<p><img src=\"/u2\" alt=\"foo bar\" /></p>\n"
    );
    assert_eq!(to_html("!["), "<p>![</p>\n");
}

#[test]
fn reference_links() {
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
    assert_eq!(
        to_html("![foo]\n\n[foo]: /pic.png"),
        "<p><img src=\"/pic.png\" alt=\"foo\" /></p>\n"
    );
}

#[test]
fn reference_link_misses() {
    assert_eq!(to_html("[foo][bar]\n\n[foo]: /url"), "<p>[foo][bar]</p>\n");
    assert_eq!(to_html("[foo]"), "<p>[foo]</p>\n");
    assert_eq!(to_html("[foo][]"), "<p>[foo][]</p>\n");
}

#[test]
fn reference_label_normalization() {
    assert_eq!(
        to_html("[FOO]\n\n[foo]: /url"),
        "<p><a href=\"/url\">FOO</a></p>\n"
    );
    assert_eq!(
        to_html("[foo  \t bar]\n\n[foo bar]: /url"),
        "<p><a href=\"/url\">foo  \t bar</a></p>\n"
    );
    assert_eq!(
        to_html("[Straße]\n\n[strasse]: /url"),
        "<p><a href=\"/url\">Straße</a></p>\n"
    );
}

#[test]
fn inline_form_beats_reference() {
    assert_eq!(
        to_html("[foo](/inline)\n\n[foo]: /ref"),
        "<p><a href=\"/inline\">foo</a></p>\n"
    );
}

#[test]
fn bracketed_text_without_target_is_literal() {
    assert_eq!(to_html("[foo] (bar)"), "<p>[foo] (bar)</p>\n");
    assert_eq!(to_html("]"), "<p>]</p>\n");
    assert_eq!(to_html("[unclosed"), "<p>[unclosed</p>\n");
}

#[test]
fn autolink_percent_encoding() {
    assert_eq!(
        to_html("<http://example.com/\u{00e4}>"),
        "<p><a href=\"http://example.com/%C3%A4\">http://example.com/ä</a></p>\n"
    );
}
