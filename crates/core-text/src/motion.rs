//! Word and character-search motions.
//!
//! These operate purely on a [`LineStore`] + [`Position`] pair and are free of
//! editor state. Every motion returns `None` when it cannot move, leaving the
//! caller to decide whether that is a failure (it is, with an operator pending).
//!
//! The walker may rest one byte past the last character of a line (the
//! "end of line" cell). Normal-mode callers pull the cursor back afterwards;
//! operators use it as an exclusive end.

use crate::{LineStore, Position};

/// Character class used by word motions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    Blank,
    Word,
    Punct,
}

/// Classify `c`. For WORD motions (`bigword`) every non-blank is `Word`.
pub fn classify(c: Option<char>, bigword: bool) -> CharClass {
    match c {
        None | Some(' ') | Some('\t') => CharClass::Blank,
        Some(c) if bigword || is_word_char(c) => CharClass::Word,
        Some(_) => CharClass::Punct,
    }
}

pub fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Byte offset of the first non-blank character (line length when blank).
pub fn first_non_blank(line: &str) -> usize {
    line.char_indices()
        .find(|(_, c)| *c != ' ' && *c != '\t')
        .map(|(i, _)| i)
        .unwrap_or(line.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// Moved onto another character in the same line.
    Moved,
    /// Moved onto the end-of-line cell.
    OntoEol,
    /// Crossed onto the next or previous line.
    Crossed,
    /// Start or end of the buffer; nothing moved.
    Stuck,
}

struct Walker<'a, S: LineStore + ?Sized> {
    store: &'a S,
    pos: Position,
    text: String,
    bigword: bool,
}

impl<'a, S: LineStore + ?Sized> Walker<'a, S> {
    fn new(store: &'a S, pos: Position, bigword: bool) -> Self {
        let text = store.line(pos.line);
        let byte = pos.byte.min(text.len());
        Self {
            store,
            pos: Position::new(pos.line, byte),
            text,
            bigword,
        }
    }

    fn class(&self) -> CharClass {
        classify(self.text[self.pos.byte..].chars().next(), self.bigword)
    }

    fn line_empty(&self) -> bool {
        self.text.is_empty()
    }

    fn load(&mut self, line: usize, byte: Option<usize>) {
        self.text = self.store.line(line);
        self.pos = Position::new(line, byte.unwrap_or(self.text.len()));
    }

    fn inc(&mut self) -> Step {
        if let Some(c) = self.text[self.pos.byte..].chars().next() {
            self.pos.byte += c.len_utf8();
            return if self.pos.byte < self.text.len() {
                Step::Moved
            } else {
                Step::OntoEol
            };
        }
        if self.pos.line < self.store.line_count() {
            self.load(self.pos.line + 1, Some(0));
            return Step::Crossed;
        }
        Step::Stuck
    }

    fn dec(&mut self) -> Step {
        if self.pos.byte > 0 {
            let prev = self.text[..self.pos.byte]
                .char_indices()
                .next_back()
                .map(|(i, _)| i)
                .unwrap_or(0);
            self.pos.byte = prev;
            return Step::Moved;
        }
        if self.pos.line > 1 {
            self.load(self.pos.line - 1, None);
            return Step::Crossed;
        }
        Step::Stuck
    }

    /// Advance while on `class`; true when the buffer ran out.
    fn skip_forward(&mut self, class: CharClass) -> bool {
        while self.class() == class {
            if self.inc() == Step::Stuck {
                return true;
            }
        }
        false
    }
}

/// `w` / `W`: start of the `count`-th next word.
///
/// With `stop_at_eol` (an operator is pending) the last word stops at the end
/// of its line instead of continuing onto the next line.
pub fn word_forward<S: LineStore + ?Sized>(
    store: &S,
    start: Position,
    count: usize,
    bigword: bool,
    stop_at_eol: bool,
) -> Option<Position> {
    let mut w = Walker::new(store, start, bigword);
    for remaining in (0..count.max(1)).rev() {
        let last = remaining == 0;
        let sclass = w.class();
        let on_last_line = w.pos.line == store.line_count();
        let step = w.inc();
        if step == Step::Stuck {
            return None;
        }
        if step != Step::Moved && stop_at_eol && last {
            return Some(w.pos);
        }
        if step != Step::Moved && on_last_line {
            return None;
        }
        if sclass != CharClass::Blank {
            while w.class() == sclass {
                let step = w.inc();
                if step == Step::Stuck || (step != Step::Moved && stop_at_eol && last) {
                    return Some(w.pos);
                }
            }
        }
        while w.class() == CharClass::Blank {
            // An empty line counts as a word.
            if w.pos.byte == 0 && w.line_empty() {
                break;
            }
            let step = w.inc();
            if step == Step::Stuck || (step != Step::Moved && stop_at_eol && last) {
                return Some(w.pos);
            }
        }
    }
    Some(w.pos)
}

/// `b` / `B`: start of the `count`-th previous word.
pub fn word_backward<S: LineStore + ?Sized>(
    store: &S,
    start: Position,
    count: usize,
    bigword: bool,
) -> Option<Position> {
    let mut w = Walker::new(store, start, bigword);
    'outer: for _ in 0..count.max(1) {
        if w.dec() == Step::Stuck {
            return None;
        }
        while w.class() == CharClass::Blank {
            if w.pos.byte == 0 && w.line_empty() {
                continue 'outer;
            }
            if w.dec() == Step::Stuck {
                return Some(w.pos);
            }
        }
        let class = w.class();
        while w.class() == class {
            if w.dec() == Step::Stuck {
                return Some(w.pos);
            }
        }
        // Overshot by one.
        w.inc();
    }
    Some(w.pos)
}

/// `e` / `E`: end of the `count`-th word.
///
/// With `stop` set and the cursor already on the end of a word, the first
/// step only moves one character (used for `cw` on the last letter of a word).
pub fn word_end<S: LineStore + ?Sized>(
    store: &S,
    start: Position,
    count: usize,
    bigword: bool,
    mut stop: bool,
) -> Option<Position> {
    let mut w = Walker::new(store, start, bigword);
    for _ in 0..count.max(1) {
        let sclass = w.class();
        if w.inc() == Step::Stuck {
            return None;
        }
        if w.class() == sclass && sclass != CharClass::Blank {
            if w.skip_forward(sclass) {
                return None;
            }
        } else if !stop || sclass == CharClass::Blank {
            while w.class() == CharClass::Blank {
                if w.inc() == Step::Stuck {
                    return None;
                }
            }
            let class = w.class();
            if w.skip_forward(class) {
                return None;
            }
        }
        w.dec();
        stop = false;
    }
    Some(w.pos)
}

/// `f` `F` `t` `T`: byte offset of the `count`-th `target` on the line.
///
/// `till` stops one character short of the match (before it when searching
/// forward, after it when searching backward).
pub fn find_char(
    line: &str,
    byte: usize,
    target: char,
    count: usize,
    forward: bool,
    till: bool,
) -> Option<usize> {
    let mut found = None;
    let mut remaining = count.max(1);
    if forward {
        let from = line[byte.min(line.len())..]
            .chars()
            .next()
            .map(|c| byte + c.len_utf8())
            .unwrap_or(line.len());
        for (i, c) in line[from..].char_indices() {
            if c == target {
                remaining -= 1;
                if remaining == 0 {
                    found = Some(from + i);
                    break;
                }
            }
        }
        let at = found?;
        if till {
            return line[..at].char_indices().next_back().map(|(i, _)| i);
        }
        Some(at)
    } else {
        for (i, c) in line[..byte.min(line.len())].char_indices().rev() {
            if c == target {
                remaining -= 1;
                if remaining == 0 {
                    found = Some(i);
                    break;
                }
            }
        }
        let at = found?;
        if till {
            return Some(at + target.len_utf8());
        }
        Some(at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Buffer;

    fn buf(lines: &[&str]) -> Buffer {
        Buffer::from_lines("t", lines).unwrap()
    }

    #[test]
    fn word_forward_within_line() {
        let b = buf(&["hello world"]);
        let p = word_forward(&b, Position::new(1, 0), 1, false, false).unwrap();
        assert_eq!(p, Position::new(1, 6));
    }

    #[test]
    fn word_forward_punctuation_is_its_own_word() {
        let b = buf(&["foo.bar baz"]);
        assert_eq!(
            word_forward(&b, Position::new(1, 0), 1, false, false),
            Some(Position::new(1, 3))
        );
        assert_eq!(
            word_forward(&b, Position::new(1, 0), 1, true, false),
            Some(Position::new(1, 8))
        );
    }

    #[test]
    fn word_forward_crosses_lines_and_stops_on_empty_line() {
        let b = buf(&["one", "", "two"]);
        assert_eq!(
            word_forward(&b, Position::new(1, 0), 1, false, false),
            Some(Position::new(2, 0))
        );
        assert_eq!(
            word_forward(&b, Position::new(1, 0), 2, false, false),
            Some(Position::new(3, 0))
        );
    }

    #[test]
    fn word_forward_stops_at_eol_for_operators() {
        let b = buf(&["alpha beta", "gamma"]);
        let p = word_forward(&b, Position::new(1, 6), 1, false, true).unwrap();
        assert_eq!(p, Position::new(1, 10));
    }

    #[test]
    fn word_forward_fails_at_end_of_buffer() {
        let b = buf(&["abc"]);
        assert_eq!(word_forward(&b, Position::new(1, 2), 1, false, false), None);
    }

    #[test]
    fn word_backward_basic() {
        let b = buf(&["one two", "  three"]);
        assert_eq!(
            word_backward(&b, Position::new(2, 2), 1, false),
            Some(Position::new(1, 4))
        );
        assert_eq!(
            word_backward(&b, Position::new(1, 5), 1, false),
            Some(Position::new(1, 4))
        );
        assert_eq!(word_backward(&b, Position::new(1, 0), 1, false), None);
    }

    #[test]
    fn word_end_moves_to_last_char() {
        let b = buf(&["one two"]);
        assert_eq!(
            word_end(&b, Position::new(1, 0), 1, false, false),
            Some(Position::new(1, 2))
        );
        assert_eq!(
            word_end(&b, Position::new(1, 2), 1, false, false),
            Some(Position::new(1, 6))
        );
        assert_eq!(
            word_end(&b, Position::new(1, 2), 1, false, true),
            Some(Position::new(1, 2))
        );
    }

    #[test]
    fn find_char_variants() {
        let line = "a,b,c,d";
        assert_eq!(find_char(line, 0, ',', 1, true, false), Some(1));
        assert_eq!(find_char(line, 0, ',', 2, true, false), Some(3));
        assert_eq!(find_char(line, 0, ',', 1, true, true), Some(0));
        assert_eq!(find_char(line, 6, ',', 1, false, false), Some(5));
        assert_eq!(find_char(line, 6, ',', 1, false, true), Some(6));
        assert_eq!(find_char(line, 0, 'z', 1, true, false), None);
    }

    #[test]
    fn first_non_blank_skips_tabs() {
        assert_eq!(first_non_blank("\t  x"), 3);
        assert_eq!(first_non_blank("   "), 3);
    }
}
