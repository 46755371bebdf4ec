//! Phase 1: the line-driven block parser.
//!
//! Each input line is run through three steps: matching the open
//! container chain from the document root down to the tip, opening
//! whatever new blocks the remainder starts, and routing the leftover
//! text (with lazy paragraph continuation decided last). Column
//! arithmetic treats a tab as reaching the next multiple of four
//! relative to the current logical column; the unconsumed part of a
//! split tab is materialized as spaces exactly once, when the rest of
//! the line is appended to a block.

pub(crate) mod linkdef;

use std::borrow::Cow;

use crate::link_ref::RefMap;
use crate::nodes::{
    Ast, CodeData, Document, HeadingData, ListData, ListDelim, ListKind, NodeId, NodeValue, Tree,
};
use crate::scanners::{self, TAB_STOP};
use crate::strings::{self, is_space_or_tab};
use linkdef::{BlankOutcome, LineOutcome, PendingDef, StartOutcome};

const CODE_INDENT: usize = 4;

/// Parse a complete document.
pub fn parse_document(input: &str) -> Document {
    // Insecure-character replacement is the only byte rewriting done
    // on the way in.
    let input: Cow<'_, str> = if input.contains('\0') {
        Cow::Owned(input.replace('\0', "\u{FFFD}"))
    } else {
        Cow::Borrowed(input)
    };

    let mut parser = BlockParser::new();
    for line in Lines::new(&input) {
        parser.incorporate_line(line);
    }
    parser.finish()
}

/// Iterator over lines with CR, LF and CRLF terminators removed.
struct Lines<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        if self.pos >= self.input.len() {
            return None;
        }
        let bytes = self.input.as_bytes();
        match memchr::memchr2(b'\n', b'\r', &bytes[self.pos..]) {
            Some(i) => {
                let start = self.pos;
                let end = start + i;
                self.pos = end + 1;
                if bytes[end] == b'\r' && bytes.get(end + 1) == Some(&b'\n') {
                    self.pos += 1;
                }
                Some(&self.input[start..end])
            }
            None => {
                let start = self.pos;
                self.pos = self.input.len();
                Some(&self.input[start..])
            }
        }
    }
}

/// Coarse kind tag used while walking the open chain.
#[derive(Clone, Copy)]
enum OpenKind {
    BlockQuote,
    Item,
    Code,
    Html(u8),
    Paragraph,
    ClosedLeaf,
    Passive,
}

enum CodePrefix {
    Matched,
    NotMatched,
    ClosingFence,
}

struct BlockParser {
    tree: Tree,
    root: NodeId,
    /// Deepest block currently receiving content.
    current: NodeId,
    refmap: RefMap,
    pending_def: Option<Box<PendingDef>>,
    line_number: usize,
    offset: usize,
    column: usize,
    first_nonspace: usize,
    first_nonspace_column: usize,
    indent: usize,
    blank: bool,
    partially_consumed_tab: bool,
}

impl BlockParser {
    fn new() -> Self {
        let mut tree = Tree::new();
        let root = tree.new_node(Ast::new(NodeValue::Document, 1));
        Self {
            tree,
            root,
            current: root,
            refmap: RefMap::new(),
            pending_def: None,
            line_number: 0,
            offset: 0,
            column: 0,
            first_nonspace: 0,
            first_nonspace_column: 0,
            indent: 0,
            blank: false,
            partially_consumed_tab: false,
        }
    }

    // --- low-level position handling ---

    fn peek(&self, line: &str, pos: usize) -> Option<u8> {
        line.as_bytes().get(pos).copied()
    }

    /// Advance by `count` bytes, or by `count` columns when `columns`
    /// is set (a tab may then be consumed partially).
    fn advance_offset(&mut self, line: &str, mut count: usize, columns: bool) {
        let bytes = line.as_bytes();
        while count > 0 {
            match bytes.get(self.offset) {
                Some(b'\t') => {
                    let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
                    if columns {
                        self.partially_consumed_tab = chars_to_tab > count;
                        let advance = chars_to_tab.min(count);
                        self.column += advance;
                        if !self.partially_consumed_tab {
                            self.offset += 1;
                        }
                        count -= advance;
                    } else {
                        self.partially_consumed_tab = false;
                        self.column += chars_to_tab;
                        self.offset += 1;
                        count -= 1;
                    }
                }
                Some(_) => {
                    self.partially_consumed_tab = false;
                    self.offset += 1;
                    self.column += 1;
                    count -= 1;
                }
                None => break,
            }
        }
    }

    fn find_first_nonspace(&mut self, line: &str) {
        let bytes = line.as_bytes();
        let mut chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
        self.first_nonspace = self.offset;
        self.first_nonspace_column = self.column;
        loop {
            match bytes.get(self.first_nonspace) {
                Some(b' ') => {
                    self.first_nonspace += 1;
                    self.first_nonspace_column += 1;
                    chars_to_tab -= 1;
                    if chars_to_tab == 0 {
                        chars_to_tab = TAB_STOP;
                    }
                }
                Some(b'\t') => {
                    self.first_nonspace += 1;
                    self.first_nonspace_column += chars_to_tab;
                    chars_to_tab = TAB_STOP;
                }
                _ => break,
            }
        }
        self.blank = bytes.get(self.first_nonspace).is_none();
        self.indent = self.first_nonspace_column - self.column;
    }

    /// Append the line remainder (from `offset` to `end`) plus a
    /// newline to the node's content. The leftover columns of a
    /// partially consumed tab become spaces here.
    fn add_line_range(&mut self, node: NodeId, line: &str, end: usize) {
        if self.partially_consumed_tab {
            self.offset += 1;
            let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
            let ast = self.tree.ast_mut(node);
            for _ in 0..chars_to_tab {
                ast.content.push(' ');
            }
            self.partially_consumed_tab = false;
        }
        let ast = self.tree.ast_mut(node);
        if end > self.offset {
            ast.content.push_str(&line[self.offset..end]);
        }
        ast.content.push('\n');
        ast.end_line = self.line_number;
    }

    fn add_line(&mut self, node: NodeId, line: &str) {
        self.add_line_range(node, line, line.len());
    }

    // --- tree maintenance ---

    fn last_open_child(&self, id: NodeId) -> Option<NodeId> {
        let last = self.tree.last_child(id)?;
        self.tree.ast(last).open.then_some(last)
    }

    /// Add a child of the given kind, closing blocks until a parent
    /// that can hold it is found.
    fn add_child(&mut self, mut parent: NodeId, value: NodeValue) -> NodeId {
        while !self.tree.value(parent).can_contain(&value) {
            parent = self.finalize(parent);
        }
        let child = self.tree.new_node(Ast::new(value, self.line_number));
        self.tree.append(parent, child);
        child
    }

    /// Close a block, run its end-of-block processing, and return its
    /// parent.
    fn finalize(&mut self, node: NodeId) -> NodeId {
        let parent = self.tree.parent(node);
        {
            let child_end = self.tree.last_child(node).map(|c| self.tree.ast(c).end_line);
            let ast = self.tree.ast_mut(node);
            ast.open = false;
            if let Some(end) = child_end {
                ast.end_line = ast.end_line.max(end);
            }
            ast.end_line = ast.end_line.max(ast.start_line);
        }

        enum Fin {
            FencedCode,
            IndentedCode,
            Html,
            List,
            Other,
        }
        let fin = match self.tree.value(node) {
            NodeValue::CodeBlock(data) if data.fenced => Fin::FencedCode,
            NodeValue::CodeBlock(..) => Fin::IndentedCode,
            NodeValue::HtmlBlock { .. } => Fin::Html,
            NodeValue::List(..) => Fin::List,
            _ => Fin::Other,
        };

        match fin {
            Fin::FencedCode => {
                // The first content line is the info string.
                let content = std::mem::take(&mut self.tree.ast_mut(node).content);
                let (info_line, rest) = match content.find('\n') {
                    Some(i) => (&content[..i], &content[i + 1..]),
                    None => (content.as_str(), ""),
                };
                let info = strings::unescape_all(info_line.trim());
                if let NodeValue::CodeBlock(data) = &mut self.tree.ast_mut(node).value {
                    data.info = Some(info);
                    data.literal = rest.to_string();
                }
            }
            Fin::IndentedCode => {
                let mut content = std::mem::take(&mut self.tree.ast_mut(node).content);
                loop {
                    let Some(stripped) = content.strip_suffix('\n') else {
                        break;
                    };
                    let line_start = stripped.rfind('\n').map(|i| i + 1).unwrap_or(0);
                    if strings::is_blank(stripped[line_start..].as_bytes()) {
                        content.truncate(line_start);
                    } else {
                        break;
                    }
                }
                if let NodeValue::CodeBlock(data) = &mut self.tree.ast_mut(node).value {
                    data.literal = content;
                }
            }
            Fin::Html => {
                let content = std::mem::take(&mut self.tree.ast_mut(node).content);
                if let NodeValue::HtmlBlock { literal, .. } = &mut self.tree.ast_mut(node).value {
                    *literal = content;
                }
            }
            Fin::List => self.finalize_list(node),
            Fin::Other => {}
        }

        parent.unwrap_or(self.root)
    }

    /// Compute the tight flag: loose when a blank line separates two
    /// items, or two block-level children inside one item.
    fn finalize_list(&mut self, list: NodeId) {
        let mut tight = true;
        let mut item = self.tree.first_child(list);
        'outer: while let Some(it) = item {
            let item_next = self.tree.next_sibling(it);
            if self.ends_with_blank_line(it) && item_next.is_some() {
                tight = false;
                break;
            }
            let mut sub = self.tree.first_child(it);
            while let Some(s) = sub {
                let sub_next = self.tree.next_sibling(s);
                if self.ends_with_blank_line(s) && (item_next.is_some() || sub_next.is_some()) {
                    tight = false;
                    break 'outer;
                }
                sub = sub_next;
            }
            item = item_next;
        }
        if let NodeValue::List(data) = &mut self.tree.ast_mut(list).value {
            data.tight = tight;
        }
    }

    fn ends_with_blank_line(&self, mut id: NodeId) -> bool {
        loop {
            if self.tree.ast(id).last_line_blank {
                return true;
            }
            match self.tree.value(id) {
                NodeValue::List(..) | NodeValue::ListItem(..) => {
                    match self.tree.last_child(id) {
                        Some(c) => id = c,
                        None => return false,
                    }
                }
                _ => return false,
            }
        }
    }

    // --- per-line driver ---

    fn incorporate_line(&mut self, line: &str) {
        self.line_number += 1;
        self.offset = 0;
        self.column = 0;
        self.blank = false;
        self.partially_consumed_tab = false;

        let Some((mut container, mut all_matched)) = self.check_open_blocks(line) else {
            return; // a closing code fence consumed the line
        };
        let mut last_matched = container;

        if self.pending_def.is_some() {
            match self.drive_pending_def(line, all_matched) {
                DefAction::Consumed => return,
                DefAction::Proceed => {}
                DefAction::ProceedAt(node) => {
                    container = node;
                    last_matched = node;
                    all_matched = true;
                }
            }
        }

        self.open_new_blocks(&mut container, line, all_matched);
        self.add_text_to_container(container, last_matched, line);
    }

    fn check_open_blocks(&mut self, line: &str) -> Option<(NodeId, bool)> {
        let mut container = self.root;
        let mut all_matched = true;
        loop {
            let Some(next) = self.last_open_child(container) else {
                break;
            };
            container = next;
            self.find_first_nonspace(line);

            let kind = match self.tree.value(container) {
                NodeValue::BlockQuote => OpenKind::BlockQuote,
                NodeValue::ListItem(..) => OpenKind::Item,
                NodeValue::CodeBlock(..) => OpenKind::Code,
                NodeValue::HtmlBlock { html_type, .. } => OpenKind::Html(*html_type),
                NodeValue::Paragraph => OpenKind::Paragraph,
                NodeValue::Heading(..) | NodeValue::ThematicBreak => OpenKind::ClosedLeaf,
                _ => OpenKind::Passive,
            };

            let matched = match kind {
                OpenKind::BlockQuote => self.parse_block_quote_prefix(line),
                OpenKind::Item => self.parse_item_prefix(line, container),
                OpenKind::Code => match self.parse_code_block_prefix(line, container) {
                    CodePrefix::Matched => true,
                    CodePrefix::NotMatched => false,
                    CodePrefix::ClosingFence => return None,
                },
                OpenKind::Html(html_type) => !(self.blank && html_type >= 6),
                OpenKind::Paragraph => !self.blank,
                OpenKind::ClosedLeaf => false,
                OpenKind::Passive => true,
            };
            if !matched {
                all_matched = false;
                container = self.tree.parent(container).unwrap_or(self.root);
                break;
            }
        }
        Some((container, all_matched))
    }

    fn parse_block_quote_prefix(&mut self, line: &str) -> bool {
        if self.indent <= 3 && self.peek(line, self.first_nonspace) == Some(b'>') {
            self.advance_offset(line, self.indent + 1, true);
            if self.peek(line, self.offset).is_some_and(is_space_or_tab) {
                self.advance_offset(line, 1, true);
            }
            return true;
        }
        false
    }

    fn parse_item_prefix(&mut self, line: &str, container: NodeId) -> bool {
        let data = match self.tree.value(container) {
            NodeValue::ListItem(d) => *d,
            _ => return false,
        };
        if self.indent >= data.marker_offset + data.padding {
            self.advance_offset(line, data.marker_offset + data.padding, true);
            true
        } else if self.blank && self.tree.first_child(container).is_some() {
            // A blank line matches an item trivially, but ends an item
            // whose opening line was already blank.
            let n = self.first_nonspace - self.offset;
            self.advance_offset(line, n, false);
            true
        } else {
            false
        }
    }

    fn parse_code_block_prefix(&mut self, line: &str, container: NodeId) -> CodePrefix {
        let (fenced, fence_char, fence_length, fence_offset) = match self.tree.value(container) {
            NodeValue::CodeBlock(d) => (d.fenced, d.fence_char, d.fence_length, d.fence_offset),
            _ => return CodePrefix::NotMatched,
        };

        if !fenced {
            return if self.indent >= CODE_INDENT {
                self.advance_offset(line, CODE_INDENT, true);
                CodePrefix::Matched
            } else if self.blank {
                let n = self.first_nonspace - self.offset;
                self.advance_offset(line, n, false);
                CodePrefix::Matched
            } else {
                CodePrefix::NotMatched
            };
        }

        if self.indent <= 3 && self.peek(line, self.first_nonspace) == Some(fence_char) {
            if let Some(len) = scanners::close_code_fence(line.as_bytes(), self.first_nonspace, fence_char)
            {
                if len >= fence_length {
                    self.current = self.finalize(container);
                    return CodePrefix::ClosingFence;
                }
            }
        }

        // Skip the opening fence's indentation on content lines.
        let mut i = fence_offset;
        while i > 0 && self.peek(line, self.offset).is_some_and(is_space_or_tab) {
            self.advance_offset(line, 1, true);
            i -= 1;
        }
        CodePrefix::Matched
    }

    // --- pending link reference definitions ---

    fn drive_pending_def(&mut self, line: &str, all_matched: bool) -> DefAction {
        if !all_matched {
            // The definition's container stops matching; settle it
            // before the container closes.
            self.settle_pending_def();
            return DefAction::Proceed;
        }

        self.find_first_nonspace(line);
        if self.blank {
            self.settle_pending_def();
            return DefAction::Proceed;
        }

        let mut def = match self.pending_def.take() {
            Some(d) => d,
            None => return DefAction::Proceed,
        };
        let rest = &line[self.first_nonspace..];
        match def.consume_line(rest) {
            LineOutcome::Consumed => {
                let container = def.container;
                self.pending_def = Some(def);
                // Content went somewhere; the line was not blank.
                self.tree.ast_mut(container).last_line_blank = false;
                DefAction::Consumed
            }
            LineOutcome::Done { reprocess } => {
                self.register(def.finish());
                if reprocess {
                    DefAction::Proceed
                } else {
                    DefAction::Consumed
                }
            }
            LineOutcome::DoneRollbackTitle => {
                self.register(def.finish());
                let lines = def.take_title_lines();
                let para = self.flush_rollback(def.container, def.start_line, lines);
                match para {
                    Some(p) => DefAction::ProceedAt(p),
                    None => DefAction::Proceed,
                }
            }
            LineOutcome::Rollback => {
                let lines = def.take_all_lines();
                let para = self.flush_rollback(def.container, def.start_line, lines);
                match para {
                    Some(p) => DefAction::ProceedAt(p),
                    None => DefAction::Proceed,
                }
            }
        }
    }

    /// Resolve the pending definition without feeding it a line (at a
    /// blank line, a container mismatch, or end of input).
    fn settle_pending_def(&mut self) {
        let Some(mut def) = self.pending_def.take() else {
            return;
        };
        match def.resolve() {
            BlankOutcome::Done => self.register(def.finish()),
            BlankOutcome::DoneRollbackTitle => {
                self.register(def.finish());
                let lines = def.take_title_lines();
                self.flush_rollback(def.container, def.start_line, lines);
            }
            BlankOutcome::Rollback => {
                let lines = def.take_all_lines();
                self.flush_rollback(def.container, def.start_line, lines);
            }
        }
    }

    /// Restore buffered definition lines as an open paragraph in the
    /// container the definition started in.
    fn flush_rollback(
        &mut self,
        container: NodeId,
        start_line: usize,
        lines: Vec<String>,
    ) -> Option<NodeId> {
        if lines.is_empty() {
            return None;
        }
        let mut ast = Ast::new(NodeValue::Paragraph, start_line);
        ast.end_line = start_line + lines.len() - 1;
        let mut content = lines.join("\n");
        content.push('\n');
        ast.content = content;
        let para = self.tree.new_node(ast);
        self.tree.append(container, para);
        self.current = para;
        Some(para)
    }

    fn register(&mut self, def: linkdef::Definition) {
        if !def.normalized_label.is_empty() {
            self.refmap.insert(def.normalized_label, def.reference);
        }
    }

    // --- opening new blocks ---

    fn open_new_blocks(&mut self, container: &mut NodeId, line: &str, all_matched: bool) {
        let bytes = line.as_bytes();
        let mut maybe_lazy = matches!(self.tree.value(self.current), NodeValue::Paragraph);

        loop {
            if matches!(
                self.tree.value(*container),
                NodeValue::CodeBlock(..) | NodeValue::HtmlBlock { .. }
            ) {
                break;
            }

            self.find_first_nonspace(line);
            let indented = self.indent >= CODE_INDENT;
            let fns = self.first_nonspace;
            let cont_is_para = matches!(self.tree.value(*container), NodeValue::Paragraph);

            if !indented && self.peek(line, fns) == Some(b'>') {
                self.advance_offset(line, fns + 1 - self.offset, false);
                if self.peek(line, self.offset).is_some_and(is_space_or_tab) {
                    self.advance_offset(line, 1, true);
                }
                *container = self.add_child(*container, NodeValue::BlockQuote);
            } else if let Some((level, after)) = (!indented)
                .then(|| scanners::atx_heading_start(bytes, fns))
                .flatten()
            {
                self.advance_offset(line, after - self.offset, false);
                *container = self.add_child(
                    *container,
                    NodeValue::Heading(HeadingData {
                        level,
                        setext: false,
                    }),
                );
            } else if let Some(fence_length) = (!indented)
                .then(|| scanners::open_code_fence(bytes, fns))
                .flatten()
            {
                let data = CodeData {
                    fenced: true,
                    fence_char: bytes[fns],
                    fence_length,
                    fence_offset: fns - self.offset,
                    info: None,
                    literal: String::new(),
                };
                *container = self.add_child(*container, NodeValue::CodeBlock(data));
                self.advance_offset(line, fns + fence_length - self.offset, false);
            } else if let Some(html_type) = (!indented)
                .then(|| {
                    scanners::html_block_start(bytes, fns).or_else(|| {
                        if cont_is_para {
                            None
                        } else {
                            scanners::html_block_start_7(bytes, fns)
                        }
                    })
                })
                .flatten()
            {
                *container = self.add_child(
                    *container,
                    NodeValue::HtmlBlock {
                        html_type,
                        literal: String::new(),
                    },
                );
                // The whole line, indentation included, is content.
            } else if let Some(level) = (!indented && cont_is_para && all_matched)
                .then(|| scanners::setext_heading_line(bytes, fns))
                .flatten()
            {
                // The open paragraph becomes the heading; the
                // underline itself is consumed.
                self.tree.ast_mut(*container).value = NodeValue::Heading(HeadingData {
                    level,
                    setext: true,
                });
                self.advance_offset(line, line.len() - self.offset, false);
            } else if !indented
                && !(cont_is_para && !all_matched)
                && scanners::thematic_break(bytes, fns)
            {
                *container = self.add_child(*container, NodeValue::ThematicBreak);
                self.advance_offset(line, line.len() - self.offset, false);
            } else if let Some((matched, mut data)) = (!indented
                || matches!(self.tree.value(*container), NodeValue::List(..)))
            .then(|| parse_list_marker(bytes, fns, cont_is_para))
            .flatten()
            {
                self.advance_offset(line, fns + matched - self.offset, false);

                // Compute the content indent: one required column,
                // plus up to three more of actual whitespace; five or
                // more (or a blank remainder) collapse to one.
                let save_partial = self.partially_consumed_tab;
                let save_offset = self.offset;
                let save_column = self.column;
                while self.column - save_column <= 5
                    && self.peek(line, self.offset).is_some_and(is_space_or_tab)
                {
                    self.advance_offset(line, 1, true);
                }
                let i = self.column - save_column;
                if !(1..5).contains(&i) || self.peek(line, self.offset).is_none() {
                    data.padding = matched + 1;
                    self.offset = save_offset;
                    self.column = save_column;
                    self.partially_consumed_tab = save_partial;
                    if i > 0 {
                        self.advance_offset(line, 1, true);
                    }
                } else {
                    data.padding = matched + i;
                }
                data.marker_offset = self.indent;

                let need_new_list = match self.tree.value(*container) {
                    NodeValue::List(existing) => !lists_match(existing, &data),
                    _ => true,
                };
                if need_new_list {
                    *container = self.add_child(*container, NodeValue::List(data));
                }
                *container = self.add_child(*container, NodeValue::ListItem(data));
            } else if indented && !maybe_lazy && !self.blank {
                self.advance_offset(line, CODE_INDENT, true);
                *container = self.add_child(
                    *container,
                    NodeValue::CodeBlock(CodeData::default()),
                );
            } else {
                break;
            }

            if accepts_lines(self.tree.value(*container)) {
                break;
            }
            maybe_lazy = false;
        }
    }

    // --- routing the remainder of the line ---

    fn add_text_to_container(&mut self, mut container: NodeId, last_matched: NodeId, line: &str) {
        self.find_first_nonspace(line);

        if self.blank {
            if let Some(last) = self.tree.last_child(container) {
                self.tree.ast_mut(last).last_line_blank = true;
            }
        }

        // Blank lines in block quotes, fenced code, and on the marker
        // line of an empty item do not count for tight/loose purposes.
        let last_line_blank = self.blank
            && match self.tree.value(container) {
                NodeValue::BlockQuote | NodeValue::Heading(..) | NodeValue::ThematicBreak => false,
                NodeValue::CodeBlock(d) => !d.fenced,
                NodeValue::ListItem(..) => {
                    !(self.tree.first_child(container).is_none()
                        && self.tree.ast(container).start_line == self.line_number)
                }
                _ => true,
            };
        self.tree.ast_mut(container).last_line_blank = last_line_blank;
        let mut tmp = container;
        while let Some(parent) = self.tree.parent(tmp) {
            self.tree.ast_mut(parent).last_line_blank = false;
            tmp = parent;
        }

        // A line that matched no new blocks, belongs to an open
        // paragraph, and is not blank continues that paragraph lazily.
        if self.current != last_matched
            && container == last_matched
            && !self.blank
            && matches!(self.tree.value(self.current), NodeValue::Paragraph)
        {
            self.add_line(self.current, line);
            return;
        }

        // Not a lazy continuation: close the unmatched blocks.
        while self.current != last_matched {
            self.current = self.finalize(self.current);
        }

        enum Route {
            Code,
            Html(u8),
            Blank,
            Leaf { atx: bool },
            Paragraphish,
        }
        let route = match self.tree.value(container) {
            NodeValue::CodeBlock(..) => Route::Code,
            NodeValue::HtmlBlock { html_type, .. } => Route::Html(*html_type),
            _ if self.blank => Route::Blank,
            value if accepts_lines(value) => Route::Leaf {
                atx: matches!(
                    value,
                    NodeValue::Heading(HeadingData { setext: false, .. })
                ),
            },
            _ => Route::Paragraphish,
        };

        match route {
            Route::Code => {
                self.add_line(container, line);
            }
            Route::Html(html_type) => {
                self.add_line(container, line);
                if scanners::html_block_end(html_type, &line.as_bytes()[self.first_nonspace..]) {
                    container = self.finalize(container);
                }
            }
            Route::Blank => {}
            Route::Leaf { atx } => {
                let end = if atx {
                    atx_trim_end(line.as_bytes(), self.first_nonspace)
                } else {
                    line.len()
                };
                let n = self.first_nonspace - self.offset;
                self.advance_offset(line, n, false);
                self.add_line_range(container, line, end);
            }
            Route::Paragraphish => {
                // A link reference definition may begin wherever a
                // paragraph would otherwise start.
                if self.peek(line, self.first_nonspace) == Some(b'[') {
                    let rest = &line[self.first_nonspace..];
                    match PendingDef::try_start(container, self.line_number, rest) {
                        StartOutcome::NoMatch => {}
                        StartOutcome::Pending(def) => {
                            self.pending_def = Some(def);
                            self.current = container;
                            return;
                        }
                        StartOutcome::Done(def) => {
                            self.register(def);
                            self.current = container;
                            return;
                        }
                    }
                }
                container = self.add_child(container, NodeValue::Paragraph);
                let n = self.first_nonspace - self.offset;
                self.advance_offset(line, n, false);
                self.add_line(container, line);
            }
        }

        self.current = container;
    }

    // --- end of input ---

    fn finish(mut self) -> Document {
        self.settle_pending_def();
        while self.current != self.root {
            self.current = self.finalize(self.current);
        }
        self.finalize(self.root);

        crate::inlines::parse_inlines(&mut self.tree, self.root, &self.refmap);

        Document::new(self.tree, self.root)
    }
}

enum DefAction {
    /// The pending definition consumed the line.
    Consumed,
    /// Continue processing the line normally.
    Proceed,
    /// Continue processing with the rollback paragraph as the matched
    /// container.
    ProceedAt(NodeId),
}

fn accepts_lines(value: &NodeValue) -> bool {
    matches!(
        value,
        NodeValue::Paragraph | NodeValue::Heading(..) | NodeValue::CodeBlock(..)
    )
}

fn lists_match(a: &ListData, b: &ListData) -> bool {
    a.kind == b.kind && a.delimiter == b.delimiter && a.bullet_char == b.bullet_char
}

/// Parse a list marker at `pos`. Returns the marker length in bytes
/// (bullet, or digits plus delimiter) and the partially filled list
/// data.
fn parse_list_marker(
    line: &[u8],
    pos: usize,
    interrupts_paragraph: bool,
) -> Option<(usize, ListData)> {
    let rest_is_blank = |from: usize| {
        line[from..]
            .iter()
            .all(|&b| is_space_or_tab(b))
    };

    let c = *line.get(pos)?;
    if matches!(c, b'*' | b'-' | b'+') {
        if line.get(pos + 1).is_some_and(|&b| !is_space_or_tab(b)) {
            return None;
        }
        if interrupts_paragraph && rest_is_blank(pos + 1) {
            return None;
        }
        let data = ListData {
            kind: ListKind::Bullet,
            bullet_char: c,
            start: 1,
            ..ListData::default()
        };
        Some((1, data))
    } else if c.is_ascii_digit() {
        let mut i = pos;
        let mut start = 0usize;
        let mut digits = 0;
        while let Some(&b) = line.get(i) {
            if !b.is_ascii_digit() {
                break;
            }
            digits += 1;
            if digits > crate::limits::MAX_LIST_MARKER_DIGITS {
                return None;
            }
            start = start * 10 + (b - b'0') as usize;
            i += 1;
        }
        let delimiter = match line.get(i) {
            Some(b'.') => ListDelim::Period,
            Some(b')') => ListDelim::Paren,
            _ => return None,
        };
        i += 1;
        if line.get(i).is_some_and(|&b| !is_space_or_tab(b)) {
            return None;
        }
        if interrupts_paragraph && (start != 1 || rest_is_blank(i)) {
            return None;
        }
        let data = ListData {
            kind: ListKind::Ordered,
            delimiter,
            start,
            ..ListData::default()
        };
        Some((i - pos, data))
    } else {
        None
    }
}

/// Trim an optional closing hash sequence (and trailing whitespace)
/// from an ATX heading line; returns the content end position.
fn atx_trim_end(line: &[u8], start: usize) -> usize {
    let mut end = line.len();
    while end > start && is_space_or_tab(line[end - 1]) {
        end -= 1;
    }
    let hash_end = end;
    while end > start && line[end - 1] == b'#' {
        end -= 1;
    }
    if end < hash_end {
        if end == start || is_space_or_tab(line[end - 1]) {
            while end > start && is_space_or_tab(line[end - 1]) {
                end -= 1;
            }
        } else {
            end = hash_end;
        }
    }
    end
}
