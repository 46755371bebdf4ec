//! Incremental parsing of link reference definitions.
//!
//! A definition may span several lines, and the block parser cannot
//! know it is valid until the destination (and any title) terminates.
//! `PendingDef` carries the accumulator together with the raw lines
//! consumed so far, so an invalid definition can be restored into the
//! block stream as paragraph text.

use crate::limits::{MAX_LINK_LABEL_LENGTH, MAX_LINK_PAREN_DEPTH};
use crate::link_ref::Reference;
use crate::nodes::NodeId;
use crate::strings::{self, is_space_or_tab};

/// A completed definition, ready for the reference map.
#[derive(Debug)]
pub struct Definition {
    pub normalized_label: String,
    pub reference: Reference,
}

/// What became of a pending definition after one more line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    /// Line consumed; definition still pending.
    Consumed,
    /// Definition finished. When `reprocess` is set the current line
    /// was not part of it and must go through the block cascade.
    Done { reprocess: bool },
    /// Definition finished without a title; the buffered title lines
    /// must be restored as paragraph text and the current line
    /// reprocessed.
    DoneRollbackTitle,
    /// The definition is invalid; all buffered lines must be restored
    /// as paragraph text and the current line reprocessed.
    Rollback,
}

/// What became of a pending definition at a blank line or when its
/// container stops matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankOutcome {
    Done,
    DoneRollbackTitle,
    Rollback,
}

/// Result of attempting to start a definition on a fresh line.
#[derive(Debug)]
pub enum StartOutcome {
    /// The line does not begin a definition.
    NoMatch,
    /// The line begins a definition that is not yet complete.
    Pending(Box<PendingDef>),
    /// The line holds a complete definition.
    Done(Definition),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    LabelContinuation,
    Url,
    TitleOrEnd,
    TitleContinuation,
}

/// A partially parsed link reference definition.
#[derive(Debug)]
pub struct PendingDef {
    /// The container block the definition started in.
    pub container: NodeId,
    /// Source line the definition started on.
    pub start_line: usize,
    state: State,
    label: String,
    url: Option<String>,
    title: String,
    title_done: bool,
    /// Closing delimiter of the open title, when in a title state.
    title_close: u8,
    /// The open title began on the destination line; its failure
    /// invalidates the whole definition.
    title_on_dest_line: bool,
    /// Raw line remainders consumed so far, for rollback.
    lines: Vec<String>,
    /// Index into `lines` of the first line of a cross-line title.
    title_lines_from: usize,
}

/// Outcome of the shared destination-line parsing.
enum AfterDest {
    Invalid,
    Pending,
    Done,
}

enum TitleScan {
    Closed { content_end: usize, after: usize },
    Unclosed,
    Invalid,
}

impl PendingDef {
    /// Try to begin a definition with `rest`, the line remainder
    /// starting at its first nonspace byte (which the caller has
    /// checked to be `[`).
    pub fn try_start(container: NodeId, start_line: usize, rest: &str) -> StartOutcome {
        let bytes = rest.as_bytes();
        debug_assert_eq!(bytes.first(), Some(&b'['));

        let mut def = PendingDef {
            container,
            start_line,
            state: State::LabelContinuation,
            label: String::new(),
            url: None,
            title: String::new(),
            title_done: false,
            title_close: 0,
            title_on_dest_line: false,
            lines: Vec::new(),
            title_lines_from: 0,
        };

        match scan_label_end(bytes, 1, 0) {
            LabelScan::Invalid => StartOutcome::NoMatch,
            LabelScan::Unclosed => {
                def.label.push_str(&rest[1..]);
                def.lines.push(rest.to_string());
                StartOutcome::Pending(Box::new(def))
            }
            LabelScan::Closed(end) => {
                if bytes.get(end + 1) != Some(&b':') {
                    return StartOutcome::NoMatch;
                }
                def.label.push_str(&rest[1..end]);
                if strings::normalize_label(&def.label).is_empty() {
                    return StartOutcome::NoMatch;
                }
                match def.destination_line(rest, end + 2) {
                    AfterDest::Invalid => StartOutcome::NoMatch,
                    AfterDest::Done => StartOutcome::Done(def.finish()),
                    AfterDest::Pending => {
                        def.lines.push(rest.to_string());
                        StartOutcome::Pending(Box::new(def))
                    }
                }
            }
        }
    }

    /// Feed the next non-blank line remainder to the pending
    /// definition.
    pub fn consume_line(&mut self, rest: &str) -> LineOutcome {
        let bytes = rest.as_bytes();
        match self.state {
            State::LabelContinuation => match scan_label_end(bytes, 0, self.label.len()) {
                LabelScan::Invalid => LineOutcome::Rollback,
                LabelScan::Unclosed => {
                    self.label.push('\n');
                    self.label.push_str(rest);
                    self.lines.push(rest.to_string());
                    LineOutcome::Consumed
                }
                LabelScan::Closed(end) => {
                    if bytes.get(end + 1) != Some(&b':') {
                        return LineOutcome::Rollback;
                    }
                    self.label.push('\n');
                    self.label.push_str(&rest[..end]);
                    if strings::normalize_label(&self.label).is_empty() {
                        return LineOutcome::Rollback;
                    }
                    match self.destination_line(rest, end + 2) {
                        AfterDest::Invalid => LineOutcome::Rollback,
                        AfterDest::Done => LineOutcome::Done { reprocess: false },
                        AfterDest::Pending => {
                            self.lines.push(rest.to_string());
                            LineOutcome::Consumed
                        }
                    }
                }
            },
            State::Url => match self.destination_line(rest, 0) {
                AfterDest::Invalid => LineOutcome::Rollback,
                AfterDest::Done => LineOutcome::Done { reprocess: false },
                AfterDest::Pending => {
                    self.lines.push(rest.to_string());
                    LineOutcome::Consumed
                }
            },
            State::TitleOrEnd => {
                let mut pos = 0;
                while bytes.get(pos).copied().is_some_and(is_space_or_tab) {
                    pos += 1;
                }
                let close = match bytes.get(pos) {
                    Some(b'"') => b'"',
                    Some(b'\'') => b'\'',
                    Some(b'(') => b')',
                    // Not a title: the definition ended before this line.
                    _ => return LineOutcome::Done { reprocess: true },
                };
                match scan_title_chunk(bytes, pos + 1, close) {
                    TitleScan::Closed { content_end, after }
                        if strings::is_blank(&bytes[after..]) =>
                    {
                        self.title.push_str(&rest[pos + 1..content_end]);
                        self.title_done = true;
                        LineOutcome::Done { reprocess: false }
                    }
                    TitleScan::Closed { .. } | TitleScan::Invalid => {
                        LineOutcome::Done { reprocess: true }
                    }
                    TitleScan::Unclosed => {
                        self.title.push_str(&rest[pos + 1..]);
                        self.title_close = close;
                        self.title_on_dest_line = false;
                        self.title_lines_from = self.lines.len();
                        self.state = State::TitleContinuation;
                        self.lines.push(rest.to_string());
                        LineOutcome::Consumed
                    }
                }
            }
            State::TitleContinuation => match scan_title_chunk(bytes, 0, self.title_close) {
                TitleScan::Closed { content_end, after } if strings::is_blank(&bytes[after..]) => {
                    self.title.push('\n');
                    self.title.push_str(&rest[..content_end]);
                    self.title_done = true;
                    LineOutcome::Done { reprocess: false }
                }
                TitleScan::Closed { .. } | TitleScan::Invalid => {
                    if self.title_on_dest_line {
                        LineOutcome::Rollback
                    } else {
                        LineOutcome::DoneRollbackTitle
                    }
                }
                TitleScan::Unclosed => {
                    self.title.push('\n');
                    self.title.push_str(rest);
                    self.lines.push(rest.to_string());
                    LineOutcome::Consumed
                }
            },
        }
    }

    /// Resolve the pending definition at a blank line, at a container
    /// mismatch, or at end of input.
    pub fn resolve(&self) -> BlankOutcome {
        match self.state {
            State::LabelContinuation | State::Url => BlankOutcome::Rollback,
            State::TitleOrEnd => BlankOutcome::Done,
            State::TitleContinuation => {
                if self.title_on_dest_line {
                    BlankOutcome::Rollback
                } else {
                    BlankOutcome::DoneRollbackTitle
                }
            }
        }
    }

    /// All buffered raw lines, for a full rollback.
    pub fn take_all_lines(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }

    /// The buffered lines of a failed cross-line title.
    pub fn take_title_lines(&mut self) -> Vec<String> {
        self.lines.split_off(self.title_lines_from)
    }

    /// Build the completed definition.
    pub fn finish(&self) -> Definition {
        let title = if self.title_done {
            strings::clean_title(&self.title)
        } else {
            String::new()
        };
        Definition {
            normalized_label: strings::normalize_label(&self.label),
            reference: Reference {
                url: strings::clean_url(self.url.as_deref().unwrap_or("")),
                title,
            },
        }
    }

    /// Parse the part of a destination line starting at `pos`
    /// (everything after `]:`, or a whole line when the destination
    /// arrives on its own line).
    fn destination_line(&mut self, rest: &str, mut pos: usize) -> AfterDest {
        let bytes = rest.as_bytes();
        while bytes.get(pos).copied().is_some_and(is_space_or_tab) {
            pos += 1;
        }
        if pos >= bytes.len() {
            self.state = State::Url;
            return AfterDest::Pending;
        }
        let Some(((url_start, url_end), after_url)) = scan_definition_destination(bytes, pos)
        else {
            return AfterDest::Invalid;
        };
        self.url = Some(rest[url_start..url_end].to_string());
        pos = after_url;

        let had_space = bytes.get(pos).copied().is_some_and(is_space_or_tab);
        while bytes.get(pos).copied().is_some_and(is_space_or_tab) {
            pos += 1;
        }
        if pos >= bytes.len() {
            self.state = State::TitleOrEnd;
            return AfterDest::Pending;
        }
        if !had_space {
            return AfterDest::Invalid;
        }
        let close = match bytes[pos] {
            b'"' => b'"',
            b'\'' => b'\'',
            b'(' => b')',
            _ => return AfterDest::Invalid,
        };
        match scan_title_chunk(bytes, pos + 1, close) {
            TitleScan::Closed { content_end, after } if strings::is_blank(&bytes[after..]) => {
                self.title.push_str(&rest[pos + 1..content_end]);
                self.title_done = true;
                AfterDest::Done
            }
            TitleScan::Closed { .. } | TitleScan::Invalid => AfterDest::Invalid,
            TitleScan::Unclosed => {
                self.title.push_str(&rest[pos + 1..]);
                self.title_close = close;
                self.title_on_dest_line = true;
                self.state = State::TitleContinuation;
                AfterDest::Pending
            }
        }
    }
}

enum LabelScan {
    /// Position of the closing `]`.
    Closed(usize),
    /// No closing bracket on this line; the label continues.
    Unclosed,
    /// Unescaped `[` or an over-long label.
    Invalid,
}

fn scan_label_end(bytes: &[u8], start: usize, already: usize) -> LabelScan {
    let mut i = start;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'\\' => i += if i + 1 < bytes.len() { 2 } else { 1 },
            b']' => {
                if already + (i - start) > MAX_LINK_LABEL_LENGTH {
                    return LabelScan::Invalid;
                }
                return LabelScan::Closed(i);
            }
            b'[' => return LabelScan::Invalid,
            _ => i += 1,
        }
    }
    if already + (i - start) > MAX_LINK_LABEL_LENGTH {
        LabelScan::Invalid
    } else {
        LabelScan::Unclosed
    }
}

/// Scan a definition destination at `pos`. Returns the byte range of
/// the raw destination (inside any angle brackets) and the position
/// after it. Definitions require a non-empty bare destination, and an
/// angle-bracket destination must close on the same line.
fn scan_definition_destination(bytes: &[u8], pos: usize) -> Option<((usize, usize), usize)> {
    if bytes.get(pos) == Some(&b'<') {
        let mut i = pos + 1;
        while let Some(&b) = bytes.get(i) {
            match b {
                b'>' => return Some(((pos + 1, i), i + 1)),
                b'<' => return None,
                b'\\' => i += if i + 1 < bytes.len() { 2 } else { 1 },
                _ => i += 1,
            }
        }
        return None;
    }

    let mut i = pos;
    let mut depth = 0usize;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'\\' if bytes
                .get(i + 1)
                .copied()
                .is_some_and(strings::is_ascii_punctuation) =>
            {
                i += 2;
            }
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
            b' ' | b'\t' => break,
            _ => i += 1,
        }
    }
    if depth != 0 || i == pos {
        return None;
    }
    Some(((pos, i), i))
}

fn scan_title_chunk(bytes: &[u8], start: usize, close: u8) -> TitleScan {
    let mut i = start;
    while let Some(&b) = bytes.get(i) {
        if b == b'\\' && i + 1 < bytes.len() {
            i += 2;
            continue;
        }
        if b == close {
            return TitleScan::Closed {
                content_end: i,
                after: i + 1,
            };
        }
        if close == b')' && b == b'(' {
            return TitleScan::Invalid;
        }
        i += 1;
    }
    TitleScan::Unclosed
}
