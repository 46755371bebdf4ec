//! Emphasis resolution: delimiter runs, flanking rules, and the
//! delimiter-stack matcher.

use unicode_categories::UnicodeCategories;

use super::Subject;
use crate::nodes::NodeValue;

/// One recorded delimiter run. Records form a doubly-linked list
/// through `prev`/`next` (indices into the subject's delimiter
/// arena); each points at the placeholder text node holding its
/// characters, which the resolver shrinks in place.
#[derive(Debug)]
pub(crate) struct Delimiter {
    pub node: crate::nodes::NodeId,
    /// Scan position just after the run; used to bound searches.
    pub position: usize,
    /// Original run length. The rule of 3 is evaluated against this
    /// even after characters have been consumed.
    pub length: usize,
    pub delim_char: u8,
    pub can_open: bool,
    pub can_close: bool,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

/// Unicode punctuation in the CommonMark sense: general categories P
/// and S.
#[inline]
fn is_flanking_punctuation(c: char) -> bool {
    c.is_punctuation() || c.is_symbol()
}

impl Subject<'_, '_, '_> {
    /// Scan a delimiter run at the current position and classify it.
    ///
    /// A run is left-flanking iff not followed by whitespace and
    /// either not followed by punctuation or preceded by whitespace
    /// or punctuation; right-flanking is the mirror image. Start and
    /// end of text count as whitespace.
    pub(crate) fn scan_delims(&mut self, c: u8) -> (usize, bool, bool) {
        let before_char = if self.pos == 0 {
            '\n'
        } else {
            self.input[..self.pos].chars().next_back().unwrap_or('\n')
        };

        let numdelims = self.take_while(c);

        let after_char = self.input[self.pos..].chars().next().unwrap_or('\n');

        let left_flanking = numdelims > 0
            && !after_char.is_whitespace()
            && (!is_flanking_punctuation(after_char)
                || before_char.is_whitespace()
                || is_flanking_punctuation(before_char));
        let right_flanking = numdelims > 0
            && !before_char.is_whitespace()
            && (!is_flanking_punctuation(before_char)
                || after_char.is_whitespace()
                || is_flanking_punctuation(after_char));

        if c == b'_' {
            (
                numdelims,
                left_flanking && (!right_flanking || is_flanking_punctuation(before_char)),
                right_flanking && (!left_flanking || is_flanking_punctuation(after_char)),
            )
        } else {
            (numdelims, left_flanking, right_flanking)
        }
    }

    pub(crate) fn push_delimiter(
        &mut self,
        c: u8,
        length: usize,
        can_open: bool,
        can_close: bool,
        node: crate::nodes::NodeId,
    ) {
        let idx = self.delimiters.len();
        self.delimiters.push(Delimiter {
            node,
            position: self.pos,
            length,
            delim_char: c,
            can_open,
            can_close,
            prev: self.last_delimiter,
            next: None,
        });
        if let Some(last) = self.last_delimiter {
            self.delimiters[last].next = Some(idx);
        }
        self.last_delimiter = Some(idx);
    }

    pub(crate) fn remove_delimiter(&mut self, idx: usize) {
        let (prev, next) = (self.delimiters[idx].prev, self.delimiters[idx].next);
        match next {
            None => {
                debug_assert_eq!(self.last_delimiter, Some(idx));
                self.last_delimiter = prev;
            }
            Some(n) => self.delimiters[n].prev = prev,
        }
        if let Some(p) = prev {
            self.delimiters[p].next = next;
        }
    }

    fn remove_delimiters_above(&mut self, stack_bottom: usize) {
        while self
            .last_delimiter
            .is_some_and(|d| self.delimiters[d].position >= stack_bottom)
        {
            let last = self.last_delimiter.unwrap();
            self.remove_delimiter(last);
        }
    }

    /// Match delimiter runs recorded since `stack_bottom` into
    /// `Emph`/`Strong` nodes. Unmatched runs stay in the tree as
    /// literal text.
    pub(crate) fn process_emphasis(&mut self, stack_bottom: usize) {
        // Openers known not to exist below a given position, per
        // delimiter class; prevents quadratic rescans.
        let mut openers_bottom = [stack_bottom; 7];

        // Walk down to the first delimiter at or above the bottom.
        let mut candidate = self.last_delimiter;
        let mut closer: Option<usize> = None;
        while candidate.is_some_and(|c| self.delimiters[c].position >= stack_bottom) {
            closer = candidate;
            candidate = self.delimiters[candidate.unwrap()].prev;
        }

        while let Some(c) = closer {
            if !self.delimiters[c].can_close {
                closer = self.delimiters[c].next;
                continue;
            }

            let ix = openers_bottom_index(
                self.delimiters[c].delim_char,
                self.delimiters[c].can_open,
                self.delimiters[c].length,
            );

            // Search down the stack for a compatible opener.
            let mut opener = self.delimiters[c].prev;
            let mut opener_found = false;
            let mut mod_three_rule_invoked = false;
            while opener.is_some_and(|o| self.delimiters[o].position >= openers_bottom[ix]) {
                let o = opener.unwrap();
                if self.delimiters[o].can_open
                    && self.delimiters[o].delim_char == self.delimiters[c].delim_char
                {
                    // Rule of 3: when one of the pair can both open
                    // and close, a match whose original lengths sum
                    // to a multiple of 3 is forbidden unless both
                    // lengths are themselves multiples of 3.
                    let odd_match = (self.delimiters[c].can_open || self.delimiters[o].can_close)
                        && (self.delimiters[o].length + self.delimiters[c].length) % 3 == 0
                        && !(self.delimiters[o].length % 3 == 0
                            && self.delimiters[c].length % 3 == 0);
                    if !odd_match {
                        opener_found = true;
                        break;
                    }
                    mod_three_rule_invoked = true;
                }
                opener = self.delimiters[o].prev;
            }

            let old_closer = c;

            if opener_found {
                closer = self.insert_emph(opener.unwrap(), c);
            } else {
                closer = self.delimiters[c].next;
            }

            if !opener_found {
                if !mod_three_rule_invoked {
                    openers_bottom[ix] = self.delimiters[old_closer].position;
                }
                // A failed closer that cannot open is plain text;
                // drop it so later searches skip it.
                if !self.delimiters[old_closer].can_open {
                    self.remove_delimiter(old_closer);
                }
            }
        }

        self.remove_delimiters_above(stack_bottom);
    }

    /// Wrap the nodes between `opener` and `closer` in a new
    /// emphasis or strong node, consuming one or two delimiter
    /// characters from each end.
    fn insert_emph(&mut self, opener: usize, closer: usize) -> Option<usize> {
        let opener_node = self.delimiters[opener].node;
        let closer_node = self.delimiters[closer].node;

        let mut opener_num_chars = self
            .tree
            .value(opener_node)
            .text()
            .map(String::len)
            .unwrap_or(0);
        let mut closer_num_chars = self
            .tree
            .value(closer_node)
            .text()
            .map(String::len)
            .unwrap_or(0);
        let use_delims = if opener_num_chars >= 2 && closer_num_chars >= 2 {
            2
        } else {
            1
        };
        opener_num_chars -= use_delims;
        closer_num_chars -= use_delims;

        if let Some(text) = self.tree.ast_mut(opener_node).value.text_mut() {
            text.truncate(opener_num_chars);
        }
        if let Some(text) = self.tree.ast_mut(closer_node).value.text_mut() {
            text.truncate(closer_num_chars);
        }

        // Delimiters between the pair can no longer match anything.
        let mut delim = self.delimiters[closer].prev;
        while let Some(d) = delim {
            if d == opener {
                break;
            }
            let prev = self.delimiters[d].prev;
            self.remove_delimiter(d);
            delim = prev;
        }

        let emph = self.make_inline(if use_delims == 1 {
            NodeValue::Emph
        } else {
            NodeValue::Strong
        });

        // Lower the intervening siblings into the new node.
        let mut tmp = self.tree.next_sibling(opener_node);
        while let Some(t) = tmp {
            if t == closer_node {
                break;
            }
            let next = self.tree.next_sibling(t);
            self.tree.append(emph, t);
            tmp = next;
        }
        self.tree.insert_after(opener_node, emph);

        if opener_num_chars == 0 {
            self.tree.detach(opener_node);
            self.remove_delimiter(opener);
        }

        if closer_num_chars == 0 {
            self.tree.detach(closer_node);
            let next = self.delimiters[closer].next;
            self.remove_delimiter(closer);
            next
        } else {
            Some(closer)
        }
    }
}

fn openers_bottom_index(delim_char: u8, can_open: bool, length: usize) -> usize {
    match delim_char {
        b'_' => 0,
        b'*' => 1 + (if can_open { 3 } else { 0 }) + length % 3,
        _ => unreachable!("only * and _ delimiters are recorded"),
    }
}

#[cfg(test)]
mod tests {
    use crate::to_html;

    #[test]
    fn test_simple_emphasis() {
        assert_eq!(to_html("*foo*"), "<p><em>foo</em></p>\n");
        assert_eq!(to_html("_foo_"), "<p><em>foo</em></p>\n");
        assert_eq!(to_html("**foo**"), "<p><strong>foo</strong></p>\n");
    }

    #[test]
    fn test_flanking() {
        assert_eq!(to_html("a * b*"), "<p>a * b*</p>\n");
        assert_eq!(to_html("foo_bar_"), "<p>foo_bar_</p>\n");
        assert_eq!(to_html("foo*bar*"), "<p>foo<em>bar</em></p>\n");
        assert_eq!(to_html("5*6*78"), "<p>5<em>6</em>78</p>\n");
    }

    #[test]
    fn test_nested_strong_in_em() {
        assert_eq!(
            to_html("*foo **bar***"),
            "<p><em>foo <strong>bar</strong></em></p>\n"
        );
    }

    #[test]
    fn test_spec_grouping_example() {
        assert_eq!(
            to_html("*foo**bar**baz*"),
            "<p><em>foo<strong>bar</strong>baz</em></p>\n"
        );
    }

    #[test]
    fn test_rule_of_three() {
        assert_eq!(to_html("*foo**bar*"), "<p><em>foo**bar</em></p>\n");
        assert_eq!(to_html("**foo*"), "<p>*<em>foo</em></p>\n");
        assert_eq!(to_html("*foo**"), "<p><em>foo</em>*</p>\n");
        assert_eq!(to_html("***foo***"), "<p><em><strong>foo</strong></em></p>\n");
    }

    #[test]
    fn test_unmatched_delimiters_stay_literal() {
        assert_eq!(to_html("foo *"), "<p>foo *</p>\n");
        assert_eq!(to_html("*"), "<p>*</p>\n");
    }

    #[test]
    fn test_intraword_underscore() {
        assert_eq!(to_html("foo_bar_baz_"), "<p>foo_bar_baz_</p>\n");
        assert_eq!(to_html("_foo_bar_baz_"), "<p><em>foo_bar_baz</em></p>\n");
    }
}
