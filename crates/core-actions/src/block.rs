//! Block (rectangular) selection geometry.
//!
//! A block covers display columns `start_vcol..end_vcol` (end exclusive) on
//! every line of a range. Characters wider than one cell (tabs, wide and
//! control characters) can straddle either edge; this module decides which
//! bytes of a line belong to the block and how many pad spaces stand in for
//! the cells of straddling characters.
//!
//! For yanking, a straddling character is left out and its covered cells
//! become spaces, so `lead_pad + cells(text) + trail_pad == end_vcol - start_vcol`.
//! For deleting, a straddling character is removed whole and the cells it
//! had outside the block are written back as spaces.

use core_text::char_cells;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockPurpose {
    Yank,
    Delete,
}

/// Where a block falls on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockGeometry {
    /// Byte offset of the first byte taken from the line.
    pub text_col: usize,
    /// Bytes taken from the line.
    pub text_len: usize,
    /// Spaces standing in before the text.
    pub lead_pad: usize,
    /// Spaces standing in after the text.
    pub trail_pad: usize,
    /// The line ends before the block's right edge.
    pub is_short: bool,
}

impl BlockGeometry {
    pub fn text<'a>(&self, line: &'a str) -> &'a str {
        &line[self.text_col..self.text_col + self.text_len]
    }

    /// Register content for this line: pads around the covered text.
    pub fn yanked(&self, line: &str) -> String {
        let mut out = String::with_capacity(self.lead_pad + self.text_len + self.trail_pad);
        push_spaces(&mut out, self.lead_pad);
        out.push_str(self.text(line));
        push_spaces(&mut out, self.trail_pad);
        out
    }

    /// The line with the covered text removed and the pads put back.
    pub fn delete_from(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len() + self.lead_pad + self.trail_pad);
        out.push_str(&line[..self.text_col]);
        push_spaces(&mut out, self.lead_pad + self.trail_pad);
        out.push_str(&line[self.text_col + self.text_len..]);
        out
    }
}

pub(crate) fn push_spaces(out: &mut String, n: usize) {
    out.extend(std::iter::repeat_n(' ', n));
}

/// Locate the block `start_vcol..end_vcol` on `line`.
pub fn prepare(
    line: &str,
    start_vcol: usize,
    end_vcol: usize,
    purpose: BlockPurpose,
    tabstop: usize,
) -> BlockGeometry {
    let is_delete = purpose == BlockPurpose::Delete;
    let end_vcol = end_vcol.max(start_vcol);
    let mut chars = line.char_indices();
    let mut vcol = 0;
    let mut prev_vcol = 0;
    let mut prev_byte = 0;
    let mut byte = 0;

    while vcol < start_vcol {
        let Some((idx, c)) = chars.next() else {
            break;
        };
        prev_byte = idx;
        prev_vcol = vcol;
        vcol += char_cells(c, vcol, tabstop);
        byte = idx + c.len_utf8();
    }

    if vcol < start_vcol {
        return BlockGeometry {
            text_col: line.len(),
            text_len: 0,
            lead_pad: 0,
            trail_pad: if is_delete { 0 } else { end_vcol - start_vcol },
            is_short: true,
        };
    }

    let overshoot = vcol - start_vcol;
    let mut geo = BlockGeometry {
        text_col: byte,
        ..BlockGeometry::default()
    };
    if overshoot > 0 && is_delete {
        geo.lead_pad = start_vcol - prev_vcol;
        geo.text_col = prev_byte;
    } else {
        geo.lead_pad = overshoot;
    }

    if vcol >= end_vcol && overshoot > 0 {
        // The whole block sits inside one character.
        if is_delete {
            geo.text_len = byte - prev_byte;
            geo.trail_pad = vcol - end_vcol;
        } else {
            geo.lead_pad = end_vcol - start_vcol;
        }
        return geo;
    }

    let mut end_byte = byte;
    let mut crossing_start = byte;
    let mut crossing_vcol = vcol;
    while vcol < end_vcol {
        let Some((idx, c)) = chars.next() else {
            break;
        };
        crossing_start = idx;
        crossing_vcol = vcol;
        vcol += char_cells(c, vcol, tabstop);
        end_byte = idx + c.len_utf8();
    }

    if vcol < end_vcol {
        geo.is_short = true;
        if !is_delete {
            geo.trail_pad = end_vcol - vcol;
        }
    } else if vcol > end_vcol {
        if is_delete {
            geo.trail_pad = vcol - end_vcol;
        } else {
            geo.trail_pad = end_vcol - crossing_vcol;
            end_byte = crossing_start;
        }
    }
    geo.text_len = end_byte - geo.text_col;
    geo
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_text::str_cells;
    use pretty_assertions::assert_eq;

    fn yank(line: &str, s: usize, e: usize) -> String {
        prepare(line, s, e, BlockPurpose::Yank, 8).yanked(line)
    }

    fn delete(line: &str, s: usize, e: usize) -> String {
        prepare(line, s, e, BlockPurpose::Delete, 8).delete_from(line)
    }

    #[test]
    fn plain_text_block() {
        assert_eq!(yank("abcdef", 1, 4), "bcd");
        assert_eq!(delete("abcdef", 1, 4), "aef");
    }

    #[test]
    fn short_line_pads_yank_only() {
        let geo = prepare("ab", 4, 7, BlockPurpose::Yank, 8);
        assert!(geo.is_short);
        assert_eq!(geo.yanked("ab"), "   ");
        assert_eq!(yank("abcd", 2, 7), "cd   ");
        assert_eq!(delete("abcd", 2, 7), "ab");
        assert_eq!(delete("ab", 4, 7), "ab");
    }

    #[test]
    fn tab_straddling_left_edge() {
        // "a\tb": tab covers 1..8, b at 8.
        assert_eq!(yank("a\tbc", 4, 9), "    b");
        assert_eq!(delete("a\tbc", 4, 9), "a   c");
    }

    #[test]
    fn tab_straddling_right_edge() {
        assert_eq!(yank("a\tbc", 0, 4), "a   ");
        assert_eq!(delete("a\tbc", 0, 4), "    bc");
    }

    #[test]
    fn block_inside_one_tab() {
        assert_eq!(yank("a\tbc", 3, 5), "  ");
        // Delete keeps the cells outside the block: 1..3 and 5..8.
        assert_eq!(delete("a\tbc", 3, 5), "a     bc");
    }

    #[test]
    fn wide_chars_count_two_cells() {
        assert_eq!(yank("漢字x", 1, 4), " 字");
        assert_eq!(yank("漢字x", 2, 4), "字");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn yank_width_matches_block(
                line in "[a-c\t漢]{0,12}",
                start in 0usize..30,
                width in 1usize..12,
            ) {
                let end = start + width;
                let geo = prepare(&line, start, end, BlockPurpose::Yank, 8);
                let text_start = start + geo.lead_pad;
                let cells = str_cells(geo.text(&line), text_start, 8);
                prop_assert_eq!(geo.lead_pad + cells + geo.trail_pad, width);
            }

            #[test]
            fn delete_keeps_text_outside_block(
                line in "[a-c\t]{0,12}",
                start in 0usize..20,
                width in 1usize..10,
            ) {
                let geo = prepare(&line, start, start + width, BlockPurpose::Delete, 8);
                let out = geo.delete_from(&line);
                prop_assert!(out.starts_with(&line[..geo.text_col]));
                prop_assert!(out.ends_with(&line[geo.text_col + geo.text_len..]));
            }
        }
    }
}
