//! End-to-end tests for inline parsing.

use quillmark::to_html;

#[test]
fn code_spans() {
    assert_eq!(to_html("`foo`"), "<p><code>foo</code></p>\n");
    assert_eq!(to_html("`` foo ` bar ``"), "<p><code>foo ` bar</code></p>\n");
    assert_eq!(to_html("` `` `"), "<p><code>``</code></p>\n");
    assert_eq!(to_html("`  ``  `"), "<p><code> `` </code></p>\n");
    assert_eq!(to_html("` a`"), "<p><code> a</code></p>\n");
    assert_eq!(to_html("`foo\nbar`"), "<p><code>foo bar</code></p>\n");
    assert_eq!(to_html("`foo"), "<p>`foo</p>\n");
    assert_eq!(to_html("`foo``bar``"), "<p>`foo<code>bar</code></p>\n");
}

#[test]
fn code_span_suppresses_other_inlines() {
    assert_eq!(to_html("`*not emphasis*`"), "<p><code>*not emphasis*</code></p>\n");
    assert_eq!(to_html("`[not](a link)`"), "<p><code>[not](a link)</code></p>\n");
}

#[test]
fn backslash_escapes() {
    assert_eq!(to_html("\\*not emphasis\\*"), "<p>*not emphasis*</p>\n");
    assert_eq!(to_html("\\# not a heading"), "<p># not a heading</p>\n");
    assert_eq!(to_html("\\\\"), "<p>\\</p>\n");
    // Backslash before a non-punctuation character is literal.
    assert_eq!(to_html("\\a"), "<p>\\a</p>\n");
    assert_eq!(to_html("foo\\"), "<p>foo\\</p>\n");
}

#[test]
fn entities() {
    assert_eq!(to_html("&copy; &AElig;"), "<p>© Æ</p>\n");
    assert_eq!(to_html("&#35; &#1234;"), "<p># Ӓ</p>\n");
    assert_eq!(to_html("&#X22;"), "<p>&quot;</p>\n");
    assert_eq!(to_html("&MadeUpEntity;"), "<p>&amp;MadeUpEntity;</p>\n");
    assert_eq!(to_html("&#0;"), "<p>\u{FFFD}</p>\n");
    assert_eq!(to_html("foo&amp;bar"), "<p>foo&amp;bar</p>\n");
}

#[test]
fn autolinks() {
    assert_eq!(
        to_html("<http://foo.bar.baz>"),
        "<p><a href=\"http://foo.bar.baz\">http://foo.bar.baz</a></p>\n"
    );
    assert_eq!(
        to_html("<http://foo.bar.baz/test?q=hello&id=22&boolean>"),
        "<p><a href=\"http://foo.bar.baz/test?q=hello&amp;id=22&amp;boolean\">http://foo.bar.baz/test?q=hello&amp;id=22&amp;boolean</a></p>\n"
    );
    assert_eq!(
        to_html("<foo@bar.example.com>"),
        "<p><a href=\"mailto:foo@bar.example.com\">foo@bar.example.com</a></p>\n"
    );
    assert_eq!(to_html("<http://foo.bar/baz bim>"), "<p>&lt;http://foo.bar/baz bim&gt;</p>\n");
    assert_eq!(to_html("<foo.bar.baz>"), "<p>&lt;foo.bar.baz&gt;</p>\n");
}

#[test]
fn raw_html_inline() {
    assert_eq!(to_html("<a><bab><c2c>"), "<p><a><bab><c2c></p>\n");
    assert_eq!(to_html("<a/><b2/>"), "<p><a/><b2/></p>\n");
    assert_eq!(to_html("<33> <__>"), "<p>&lt;33&gt; &lt;__&gt;</p>\n");
    assert_eq!(
        to_html("foo <!-- this is a\ncomment -->"),
        "<p>foo <!-- this is a\ncomment --></p>\n"
    );
    assert_eq!(to_html("foo <?php echo $a; ?>"), "<p>foo <?php echo $a; ?></p>\n");
    assert_eq!(to_html("foo <!ELEMENT br EMPTY>"), "<p>foo <!ELEMENT br EMPTY></p>\n");
    assert_eq!(to_html("foo <![CDATA[>&<]]>"), "<p>foo <![CDATA[>&<]]></p>\n");
    assert_eq!(
        to_html("<a href=\"\\*\"/>"),
        "<p><a href=\"\\*\"/></p>\n"
    );
}

#[test]
fn line_breaks() {
    assert_eq!(to_html("foo  \nbaz"), "<p>foo<br />\nbaz</p>\n");
    assert_eq!(to_html("foo\\\nbaz"), "<p>foo<br />\nbaz</p>\n");
    assert_eq!(to_html("foo \nbaz"), "<p>foo\nbaz</p>\n");
    assert_eq!(to_html("foo  \n     bar"), "<p>foo<br />\nbar</p>\n");
    // Trailing spaces at the end of the block do not make a break.
    assert_eq!(to_html("foo  "), "<p>foo</p>\n");
}

#[test]
fn emphasis_corners() {
    assert_eq!(to_html("*foo bar*"), "<p><em>foo bar</em></p>\n");
    assert_eq!(to_html("a * foo bar*"), "<p>a * foo bar*</p>\n");
    assert_eq!(to_html("*(*foo*)*"), "<p><em>(<em>foo</em>)</em></p>\n");
    assert_eq!(to_html("_(_foo_)_"), "<p><em>(<em>foo</em>)</em></p>\n");
    assert_eq!(to_html("** is not an empty emphasis"), "<p>** is not an empty emphasis</p>\n");
    assert_eq!(to_html("**foo bar**"), "<p><strong>foo bar</strong></p>\n");
    assert_eq!(to_html("*foo**bar**baz*"), "<p><em>foo<strong>bar</strong>baz</em></p>\n");
    assert_eq!(to_html("***foo** bar*"), "<p><em><strong>foo</strong> bar</em></p>\n");
    assert_eq!(to_html("*foo **bar***"), "<p><em>foo <strong>bar</strong></em></p>\n");
    assert_eq!(to_html("foo ***"), "<p>foo ***</p>\n");
    assert_eq!(to_html("*_foo_*"), "<p><em><em>foo</em></em></p>\n");
}

#[test]
fn emphasis_does_not_cross_code() {
    assert_eq!(to_html("*foo `bar*`"), "<p>*foo <code>bar*</code></p>\n");
}

#[test]
fn intraword_rules() {
    assert_eq!(to_html("un*frigging*believable"), "<p>un<em>frigging</em>believable</p>\n");
    assert_eq!(to_html("un_frigging_believable"), "<p>un_frigging_believable</p>\n");
}

#[test]
fn unicode_flanking() {
    // Punctuation-adjacent underscores still work at word edges.
    assert_eq!(to_html("_foo bar_."), "<p><em>foo bar</em>.</p>\n");
    assert_eq!(to_html("«_foo_»"), "<p>«<em>foo</em>»</p>\n");
}

#[test]
fn hard_break_inside_emphasis() {
    assert_eq!(to_html("*foo  \nbar*"), "<p><em>foo<br />\nbar</em></p>\n");
}
