//! Display-column arithmetic.
//!
//! A display column ("vcol") counts terminal cells from the start of a line.
//! Tabs expand to the next multiple of `tabstop`, control characters render
//! as `^X` (two cells) and everything else takes its Unicode width. All
//! functions walk the line by byte index with a running column accumulator.

use unicode_width::UnicodeWidthChar;

const DEFAULT_TABSTOP: usize = 8;

fn effective_tabstop(tabstop: usize) -> usize {
    if tabstop == 0 { DEFAULT_TABSTOP } else { tabstop }
}

/// Cells occupied by `c` when it starts at display column `vcol`.
pub fn char_cells(c: char, vcol: usize, tabstop: usize) -> usize {
    match c {
        '\t' => {
            let ts = effective_tabstop(tabstop);
            ts - (vcol % ts)
        }
        c if c.is_control() => 2,
        c => c.width().unwrap_or(0),
    }
}

/// Cells occupied by `s` when it starts at display column `start_vcol`.
pub fn str_cells(s: &str, start_vcol: usize, tabstop: usize) -> usize {
    let mut vcol = start_vcol;
    for c in s.chars() {
        vcol += char_cells(c, vcol, tabstop);
    }
    vcol - start_vcol
}

/// Total display width of a line.
pub fn line_cells(line: &str, tabstop: usize) -> usize {
    str_cells(line, 0, tabstop)
}

/// Display column where the character at `byte` starts. Bytes at or past
/// the end of the line map to the line width.
pub fn vcol_at(line: &str, byte: usize, tabstop: usize) -> usize {
    let mut vcol = 0;
    for (idx, c) in line.char_indices() {
        if idx >= byte {
            break;
        }
        vcol += char_cells(c, vcol, tabstop);
    }
    vcol
}

/// First and one-past-last display column of the character at `byte`.
/// Past the end of the line the cursor occupies a single virtual cell.
pub fn char_span(line: &str, byte: usize, tabstop: usize) -> (usize, usize) {
    let start = vcol_at(line, byte, tabstop);
    match line.get(byte..).and_then(|rest| rest.chars().next()) {
        Some(c) => (start, start + char_cells(c, start, tabstop).max(1)),
        None => (start, start + 1),
    }
}

/// Byte offset of the character covering display column `vcol`, or the
/// line length when the line is shorter.
pub fn byte_at_vcol(line: &str, vcol: usize, tabstop: usize) -> usize {
    let mut col = 0;
    for (idx, c) in line.char_indices() {
        let w = char_cells(c, col, tabstop);
        if col + w > vcol {
            return idx;
        }
        col += w;
    }
    line.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_expands_to_next_stop() {
        assert_eq!(char_cells('\t', 0, 8), 8);
        assert_eq!(char_cells('\t', 3, 8), 5);
        assert_eq!(char_cells('\t', 3, 4), 1);
        assert_eq!(char_cells('\t', 3, 0), 5);
    }

    #[test]
    fn control_and_wide_chars() {
        assert_eq!(char_cells('\u{1}', 0, 8), 2);
        assert_eq!(char_cells('漢', 0, 8), 2);
        assert_eq!(char_cells('a', 0, 8), 1);
    }

    #[test]
    fn vcol_walks_tabs() {
        let line = "a\tbc";
        assert_eq!(vcol_at(line, 0, 8), 0);
        assert_eq!(vcol_at(line, 1, 8), 1);
        assert_eq!(vcol_at(line, 2, 8), 8);
        assert_eq!(vcol_at(line, 99, 8), 10);
        assert_eq!(char_span(line, 1, 8), (1, 8));
        assert_eq!(char_span(line, 4, 8), (10, 11));
    }

    #[test]
    fn byte_lookup_inside_tab() {
        let line = "a\tbc";
        assert_eq!(byte_at_vcol(line, 0, 8), 0);
        assert_eq!(byte_at_vcol(line, 4, 8), 1);
        assert_eq!(byte_at_vcol(line, 8, 8), 2);
        assert_eq!(byte_at_vcol(line, 40, 8), 4);
    }
}
