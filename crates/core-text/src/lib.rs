//! Rope-based line storage and position types.
//!
//! Everything above this crate addresses text through the [`LineStore`]
//! trait: 1-indexed lines without their terminating newline. [`Buffer`] is
//! the rope-backed implementation used by the editor and the tests.

use anyhow::Result;
use ropey::Rope;

pub mod motion;
pub mod width;

pub use width::{char_cells, str_cells};

/// A position inside a buffer expressed as (1-based line, byte offset within that line).
///
/// Field order makes the derived `Ord` lexicographic: line first, then byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub byte: usize,
}

impl Position {
    pub fn new(line: usize, byte: usize) -> Self {
        Self { line, byte }
    }
    pub fn origin() -> Self {
        Self { line: 1, byte: 0 }
    }
    /// Clamp into `[1, line_count]` and to the length reported for the target line.
    pub fn clamp_to<F>(&mut self, line_count: usize, mut line_len_fn: F)
    where
        F: FnMut(usize) -> usize,
    {
        let line_count = line_count.max(1);
        self.line = self.line.clamp(1, line_count);
        let max_len = line_len_fn(self.line);
        if self.byte > max_len {
            self.byte = max_len;
        }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::origin()
    }
}

/// Line-oriented storage consumed by the command engine.
///
/// Lines are 1-indexed and never contain `'\n'`. A store always holds at
/// least one line; deleting every line leaves a single empty line.
pub trait LineStore {
    fn line_count(&self) -> usize;
    /// Content of line `n`; out-of-range lines read as empty.
    fn line(&self, n: usize) -> String;
    fn replace(&mut self, n: usize, text: &str);
    /// Insert `text` as a new line below line `n` (`n == 0` inserts at the top).
    fn append_after(&mut self, n: usize, text: &str);
    /// Remove lines `n1..=n2`.
    fn delete_range(&mut self, n1: usize, n2: usize);

    fn line_len(&self, n: usize) -> usize {
        self.line(n).len()
    }
}

/// A text buffer backed by a `ropey::Rope`.
///
/// The rope holds the lines joined by `'\n'` without a trailing newline, so
/// `rope.len_lines()` is exactly the editor line count. ropey is built
/// without `cr_lines`/`unicode_lines`; any other control or separator
/// character is ordinary line content.
#[derive(Clone)]
pub struct Buffer {
    rope: Rope,
    pub name: String,
}

impl Buffer {
    /// Construct a buffer from an in-memory string slice. A single trailing
    /// newline terminates the last line rather than opening a new one.
    pub fn from_str(name: impl Into<String>, content: &str) -> Result<Self> {
        let content = content.strip_suffix('\n').unwrap_or(content);
        Ok(Self {
            rope: Rope::from_str(content),
            name: name.into(),
        })
    }

    pub fn from_lines<S: AsRef<str>>(name: impl Into<String>, lines: &[S]) -> Result<Self> {
        let joined = lines
            .iter()
            .map(|l| l.as_ref())
            .collect::<Vec<_>>()
            .join("\n");
        Self::from_str(name, &joined)
    }

    /// True when the buffer holds only the placeholder empty line.
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    pub fn lines(&self) -> Vec<String> {
        (1..=self.line_count()).map(|n| self.line(n)).collect()
    }

    /// Full text with every line newline-terminated (the on-disk form).
    pub fn contents(&self) -> String {
        let mut s = self.rope.to_string();
        s.push('\n');
        s
    }

    /// Char index of the first char of line `n` plus the char length of its content.
    fn content_chars(&self, n: usize) -> (usize, usize) {
        let idx = n - 1;
        let start = self.rope.line_to_char(idx);
        let line = self.rope.line(idx);
        let mut len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len -= 1;
        }
        (start, len)
    }

    fn in_range(&self, n: usize) -> bool {
        n >= 1 && n <= self.line_count()
    }
}

impl LineStore for Buffer {
    fn line_count(&self) -> usize {
        self.rope.len_lines()
    }

    fn line(&self, n: usize) -> String {
        if !self.in_range(n) {
            return String::new();
        }
        let mut s = self.rope.line(n - 1).to_string();
        if s.ends_with('\n') {
            s.pop();
        }
        s
    }

    fn replace(&mut self, n: usize, text: &str) {
        if !self.in_range(n) {
            return;
        }
        let (start, len) = self.content_chars(n);
        self.rope.remove(start..start + len);
        self.rope.insert(start, text);
    }

    fn append_after(&mut self, n: usize, text: &str) {
        if n == 0 {
            self.rope.insert(0, &format!("{text}\n"));
            return;
        }
        let n = n.min(self.line_count());
        let (start, len) = self.content_chars(n);
        self.rope.insert(start + len, &format!("\n{text}"));
    }

    fn delete_range(&mut self, n1: usize, n2: usize) {
        let count = self.line_count();
        let n1 = n1.max(1);
        let n2 = n2.min(count);
        if n1 > n2 {
            return;
        }
        if n1 == 1 && n2 == count {
            self.rope = Rope::new();
        } else if n2 < count {
            let from = self.rope.line_to_char(n1 - 1);
            let to = self.rope.line_to_char(n2);
            self.rope.remove(from..to);
        } else {
            // Tail deletion also removes the newline ending line n1 - 1.
            let from = self.rope.line_to_char(n1 - 1) - 1;
            let to = self.rope.len_chars();
            self.rope.remove(from..to);
        }
    }

    fn line_len(&self, n: usize) -> usize {
        if !self.in_range(n) {
            return 0;
        }
        let line = self.rope.line(n - 1);
        let mut len = line.len_bytes();
        if line.len_chars() > 0 && line.char(line.len_chars() - 1) == '\n' {
            len -= 1;
        }
        len
    }
}

/// Grapheme helpers operating on a single line.
pub mod grapheme {
    use unicode_segmentation::UnicodeSegmentation;

    /// Previous grapheme boundary (returns 0 if already at or below 1st boundary).
    pub fn prev_boundary(line: &str, byte: usize) -> usize {
        if byte == 0 {
            return 0;
        }
        let byte = byte.min(line.len());
        let mut last = 0;
        for (idx, _) in line.grapheme_indices(true) {
            if idx >= byte {
                break;
            }
            last = idx;
        }
        last
    }

    /// Next grapheme boundary (returns line.len() if at or beyond end).
    pub fn next_boundary(line: &str, byte: usize) -> usize {
        if byte >= line.len() {
            return line.len();
        }
        for (idx, _) in line.grapheme_indices(true) {
            if idx > byte {
                return idx;
            }
        }
        line.len()
    }

    /// Start byte of the last grapheme, or 0 for an empty line.
    pub fn last_start(line: &str) -> usize {
        prev_boundary(line, line.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn buf(lines: &[&str]) -> Buffer {
        Buffer::from_lines("t", lines).unwrap()
    }

    #[test]
    fn create_buffer_and_read_line() {
        let b = Buffer::from_str("test", "hello\nworld\n").unwrap();
        assert_eq!(b.line_count(), 2);
        assert_eq!(b.line(1), "hello");
        assert_eq!(b.line(2), "world");
        assert_eq!(b.line(3), "");
        assert_eq!(b.contents(), "hello\nworld\n");
    }

    #[test]
    fn only_line_feed_breaks_lines() {
        let mut b = buf(&["a\u{0C}b", "p\rq", "x\u{2028}y\u{85}z"]);
        assert_eq!(b.line_count(), 3);
        assert_eq!(b.line(1), "a\u{0C}b");
        assert_eq!(b.line_len(2), 3);
        b.replace(2, "r\r");
        b.append_after(3, "\r\u{0B}");
        assert_eq!(b.line_count(), 4);
        b.delete_range(1, 1);
        assert_eq!(b.lines(), vec!["r\r", "x\u{2028}y\u{85}z", "\r\u{0B}"]);
        assert_eq!(b.contents(), "r\r\nx\u{2028}y\u{85}z\n\r\u{0B}\n");
    }

    #[test]
    fn empty_buffer_has_one_line() {
        let b = Buffer::from_str("t", "").unwrap();
        assert_eq!(b.line_count(), 1);
        assert!(b.is_empty());
    }

    #[test]
    fn replace_and_append() {
        let mut b = buf(&["one", "two"]);
        b.replace(2, "TWO");
        b.append_after(2, "three");
        b.append_after(0, "zero");
        assert_eq!(b.lines(), vec!["zero", "one", "TWO", "three"]);
    }

    #[test]
    fn delete_middle_tail_and_all() {
        let mut b = buf(&["a", "b", "c", "d"]);
        b.delete_range(2, 3);
        assert_eq!(b.lines(), vec!["a", "d"]);
        b.delete_range(2, 2);
        assert_eq!(b.lines(), vec!["a"]);
        b.delete_range(1, 1);
        assert!(b.is_empty());
        assert_eq!(b.line_count(), 1);
    }

    #[test]
    fn multibyte_line_len() {
        let b = buf(&["héllo", "漢字"]);
        assert_eq!(b.line_len(1), "héllo".len());
        assert_eq!(b.line_len(2), 6);
    }

    #[test]
    fn positions_order_lexicographically() {
        assert!(Position::new(1, 9) < Position::new(2, 0));
        assert!(Position::new(3, 1) > Position::new(3, 0));
        let mut p = Position::new(9, 40);
        p.clamp_to(3, |_| 5);
        assert_eq!(p, Position::new(3, 5));
    }

    #[test]
    fn grapheme_combining_mark() {
        let s = "e\u{301}x";
        let nb = grapheme::next_boundary(s, 0);
        assert_eq!(nb, 3);
        assert_eq!(grapheme::prev_boundary(s, nb), 0);
        assert_eq!(grapheme::last_start(s), 3);
    }
}
