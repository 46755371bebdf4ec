//! Phase 2: the inline parser.
//!
//! Each paragraph or heading leaf carries the raw text the block
//! parser collected (soft breaks as newlines). A `Subject` re-scans
//! that text left to right and replaces the leaf's children with
//! inline nodes. Emphasis and links are resolved through a delimiter
//! stack and a bracket stack; everything else is recognized in one
//! pass.

mod emphasis;
mod links;

use crate::limits::MAX_CODE_SPAN_BACKTICKS;
use crate::link_ref::RefMap;
use crate::nodes::{Ast, NodeId, NodeValue, Tree};
use crate::scanners;
use crate::strings;
use crate::entity;

pub(crate) use emphasis::Delimiter;
pub(crate) use links::Bracket;

/// Characters that interrupt a plain text run.
const SPECIAL_CHARS: [bool; 256] = {
    let mut table = [false; 256];
    table[b'\n' as usize] = true;
    table[b'\r' as usize] = true;
    table[b'`' as usize] = true;
    table[b'\\' as usize] = true;
    table[b'&' as usize] = true;
    table[b'<' as usize] = true;
    table[b'[' as usize] = true;
    table[b']' as usize] = true;
    table[b'!' as usize] = true;
    table[b'*' as usize] = true;
    table[b'_' as usize] = true;
    table
};

/// Run the inline pass over every paragraph and heading in the tree.
pub(crate) fn parse_inlines(tree: &mut Tree, root: NodeId, refmap: &RefMap) {
    let mut leaves = Vec::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        match tree.value(id) {
            NodeValue::Paragraph | NodeValue::Heading(..) => leaves.push(id),
            _ => {
                let mut child = tree.first_child(id);
                while let Some(c) = child {
                    stack.push(c);
                    child = tree.next_sibling(c);
                }
            }
        }
    }

    for leaf in leaves {
        let mut content = std::mem::take(&mut tree.ast_mut(leaf).content);
        strings::rtrim(&mut content);
        let line = tree.ast(leaf).start_line;
        let mut subject = Subject::new(tree, refmap, &content, line);
        while subject.parse_inline(leaf) {}
        subject.process_emphasis(0);
        while subject.pop_bracket() {}
    }
}

/// Inline scanner state for one leaf block.
pub(crate) struct Subject<'t, 'r, 'i> {
    pub(crate) tree: &'t mut Tree,
    pub(crate) refmap: &'r RefMap,
    pub(crate) input: &'i str,
    pub(crate) pos: usize,
    line: usize,
    pub(crate) delimiters: Vec<Delimiter>,
    pub(crate) last_delimiter: Option<usize>,
    pub(crate) brackets: Vec<Bracket>,
    pub(crate) no_link_openers: bool,
    backticks: [usize; MAX_CODE_SPAN_BACKTICKS + 1],
    scanned_for_backticks: bool,
}

impl<'t, 'r, 'i> Subject<'t, 'r, 'i> {
    fn new(tree: &'t mut Tree, refmap: &'r RefMap, input: &'i str, line: usize) -> Self {
        Self {
            tree,
            refmap,
            input,
            pos: 0,
            line,
            delimiters: Vec::new(),
            last_delimiter: None,
            brackets: Vec::new(),
            no_link_openers: true,
            backticks: [0; MAX_CODE_SPAN_BACKTICKS + 1],
            scanned_for_backticks: false,
        }
    }

    /// Parse one inline element and append it to `parent`.
    /// Returns false at end of input.
    fn parse_inline(&mut self, parent: NodeId) -> bool {
        let Some(c) = self.peek_char() else {
            return false;
        };

        let new_inl: Option<NodeId> = match c {
            b'\n' | b'\r' => Some(self.handle_newline()),
            b'`' => Some(self.handle_backticks()),
            b'\\' => Some(self.handle_backslash()),
            b'&' => Some(self.handle_entity()),
            b'<' => Some(self.handle_pointy_brace()),
            b'*' | b'_' => Some(self.handle_delim(c)),
            b'[' => {
                self.pos += 1;
                let inl = self.make_inline(NodeValue::Text("[".to_string()));
                self.push_bracket(false, inl);
                Some(inl)
            }
            b']' => self.handle_close_bracket(),
            b'!' => {
                self.pos += 1;
                if self.peek_char() == Some(b'[') {
                    self.pos += 1;
                    let inl = self.make_inline(NodeValue::Text("![".to_string()));
                    self.push_bracket(true, inl);
                    Some(inl)
                } else {
                    Some(self.make_inline(NodeValue::Text("!".to_string())))
                }
            }
            _ => {
                let endpos = self.find_special_char();
                let mut contents = self.input[self.pos..endpos].to_string();
                self.pos = endpos;

                // Trailing spaces before a line ending belong to the
                // break, not the text.
                if self
                    .peek_char()
                    .is_some_and(strings::is_line_end_char)
                {
                    strings::rtrim(&mut contents);
                }

                if contents.is_empty() {
                    None
                } else {
                    Some(self.make_inline(NodeValue::Text(contents)))
                }
            }
        };

        if let Some(inl) = new_inl {
            self.tree.append(parent, inl);
        }
        true
    }

    // --- primitives ---

    pub(crate) fn make_inline(&mut self, value: NodeValue) -> NodeId {
        let mut ast = Ast::new(value, self.line);
        ast.open = false;
        self.tree.new_node(ast)
    }

    #[inline]
    fn eof(&self) -> bool {
        self.pos >= self.input.len()
    }

    #[inline]
    pub(crate) fn peek_char(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn find_special_char(&self) -> usize {
        let bytes = self.input.as_bytes();
        for n in self.pos..bytes.len() {
            if SPECIAL_CHARS[bytes[n] as usize] {
                return n;
            }
        }
        bytes.len()
    }

    pub(crate) fn take_while(&mut self, c: u8) -> usize {
        let start = self.pos;
        while self.peek_char() == Some(c) {
            self.pos += 1;
        }
        self.pos - start
    }

    pub(crate) fn skip_spaces(&mut self) {
        while matches!(self.peek_char(), Some(b' ') | Some(b'\t')) {
            self.pos += 1;
        }
    }

    fn skip_line_end(&mut self) -> bool {
        let old_pos = self.pos;
        if self.peek_char() == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek_char() == Some(b'\n') {
            self.pos += 1;
        }
        self.pos > old_pos || self.eof()
    }

    // --- simple constructs ---

    fn handle_newline(&mut self) -> NodeId {
        let nlpos = self.pos;
        let bytes = self.input.as_bytes();
        if bytes[self.pos] == b'\r' {
            self.pos += 1;
        }
        if self.peek_char() == Some(b'\n') {
            self.pos += 1;
        }
        let inl = if nlpos > 1 && bytes[nlpos - 1] == b' ' && bytes[nlpos - 2] == b' ' {
            self.make_inline(NodeValue::LineBreak)
        } else {
            self.make_inline(NodeValue::SoftBreak)
        };
        self.line += 1;
        self.skip_spaces();
        inl
    }

    fn handle_backslash(&mut self) -> NodeId {
        self.pos += 1;
        if self
            .peek_char()
            .is_some_and(strings::is_ascii_punctuation)
        {
            self.pos += 1;
            let lit = (self.input.as_bytes()[self.pos - 1] as char).to_string();
            self.make_inline(NodeValue::Text(lit))
        } else if !self.eof() && self.skip_line_end() {
            let inl = self.make_inline(NodeValue::LineBreak);
            self.line += 1;
            self.skip_spaces();
            inl
        } else {
            self.make_inline(NodeValue::Text("\\".to_string()))
        }
    }

    fn handle_entity(&mut self) -> NodeId {
        self.pos += 1;
        match entity::unescape(&self.input.as_bytes()[self.pos..]) {
            None => self.make_inline(NodeValue::Text("&".to_string())),
            Some((decoded, len)) => {
                self.pos += len;
                self.make_inline(NodeValue::Text(decoded))
            }
        }
    }

    // --- code spans ---

    fn scan_to_closing_backtick(&mut self, openticklength: usize) -> Option<usize> {
        if openticklength > MAX_CODE_SPAN_BACKTICKS {
            return None;
        }
        if self.scanned_for_backticks && self.backticks[openticklength] <= self.pos {
            return None;
        }

        loop {
            while self.peek_char().is_some_and(|c| c != b'`') {
                self.pos += 1;
            }
            if self.eof() {
                self.scanned_for_backticks = true;
                return None;
            }
            let numticks = self.take_while(b'`');
            if numticks <= MAX_CODE_SPAN_BACKTICKS {
                self.backticks[numticks] = self.pos - numticks;
            }
            if numticks == openticklength {
                return Some(self.pos);
            }
        }
    }

    fn handle_backticks(&mut self) -> NodeId {
        let startpos = self.pos;
        let openticks = self.take_while(b'`');

        match self.scan_to_closing_backtick(openticks) {
            None => {
                self.pos = startpos + openticks;
                self.make_inline(NodeValue::Text("`".repeat(openticks)))
            }
            Some(endpos) => {
                let content = &self.input[startpos + openticks..endpos - openticks];
                self.line += content.matches('\n').count();
                let literal = strings::normalize_code(content);
                self.make_inline(NodeValue::Code(literal))
            }
        }
    }

    // --- autolinks and raw HTML ---

    fn handle_pointy_brace(&mut self) -> NodeId {
        self.pos += 1;
        let bytes = self.input.as_bytes();

        if let Some(matchlen) = scanners::autolink_uri(&bytes[self.pos..]) {
            self.pos += matchlen;
            return self.make_autolink(self.pos - matchlen, self.pos - 1, false);
        }
        if let Some(matchlen) = scanners::autolink_email(&bytes[self.pos..]) {
            self.pos += matchlen;
            return self.make_autolink(self.pos - matchlen, self.pos - 1, true);
        }

        if let Some(end) = scanners::inline_html(bytes, self.pos - 1) {
            let contents = &self.input[self.pos - 1..end];
            self.line += contents.matches('\n').count();
            self.pos = end;
            return self.make_inline(NodeValue::HtmlInline(contents.to_string()));
        }

        self.make_inline(NodeValue::Text("<".to_string()))
    }

    fn make_autolink(&mut self, content_start: usize, content_end: usize, email: bool) -> NodeId {
        let content = &self.input[content_start..content_end];
        let mut url = String::with_capacity(content.len() + 7);
        if email {
            url.push_str("mailto:");
        }
        strings::unescape_entities_into(content, &mut url);
        let link = self.make_inline(NodeValue::Link(crate::nodes::LinkData {
            url,
            title: String::new(),
        }));
        let text = self.make_inline(NodeValue::Text(content.to_string()));
        self.tree.append(link, text);
        link
    }

    // --- emphasis delimiters ---

    fn handle_delim(&mut self, c: u8) -> NodeId {
        let (numdelims, can_open, can_close) = self.scan_delims(c);
        let contents = self.input[self.pos - numdelims..self.pos].to_string();
        let inl = self.make_inline(NodeValue::Text(contents));
        if can_open || can_close {
            self.push_delimiter(c, numdelims, can_open, can_close, inl);
        }
        inl
    }
}
