//! Operator range resolution.
//!
//! An operator acts on the text between the cursor position before the
//! motion and the position the motion produced (or between the two ends of
//! a Visual selection). This module turns that pair into an [`OpRange`]:
//! ends ordered, the empty-range marker computed, and the vi rule for
//! exclusive motions ending in column 0 applied. Operators only ever see
//! normalized ranges.
//!
//! [`normalize`] runs at most once per range (`end_adjusted` records that
//! the column-0 rule already fired), so normalizing twice is a no-op.

use crate::MotionType;
use core_state::{VisualMode, VisualSelection};
use core_text::{LineStore, Position, grapheme, motion::first_non_blank, width};

/// Where a motion landed and how it covers text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionTarget {
    pub pos: Position,
    pub motion_type: MotionType,
    /// Char-wise only: the character at the end is part of the range.
    pub inclusive: bool,
}

impl MotionTarget {
    pub fn exclusive(pos: Position) -> Self {
        Self {
            pos,
            motion_type: MotionType::Char,
            inclusive: false,
        }
    }

    pub fn inclusive(pos: Position) -> Self {
        Self {
            pos,
            motion_type: MotionType::Char,
            inclusive: true,
        }
    }

    pub fn linewise(pos: Position) -> Self {
        Self {
            pos,
            motion_type: MotionType::Line,
            inclusive: false,
        }
    }
}

/// The text an operator works on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRange {
    pub start: Position,
    /// Last covered character when `inclusive`, first uncovered otherwise.
    /// Only the line matters for line-wise ranges.
    pub end: Position,
    pub motion_type: MotionType,
    pub inclusive: bool,
    /// Exclusive char-wise range with `start == end`.
    pub empty: bool,
    /// The column-0 rule already moved `end` back one line.
    pub end_adjusted: bool,
    pub is_visual: bool,
    /// Block ranges: display columns `start_vcol..end_vcol`.
    pub start_vcol: usize,
    pub end_vcol: usize,
}

impl OpRange {
    /// Char-wise range between two positions (either order).
    pub fn chars(start: Position, end: Position, inclusive: bool) -> Self {
        Self {
            start,
            end,
            motion_type: MotionType::Char,
            inclusive,
            empty: false,
            end_adjusted: false,
            is_visual: false,
            start_vcol: 0,
            end_vcol: 0,
        }
    }

    /// Whole lines `first..=last`.
    pub fn lines(first: usize, last: usize) -> Self {
        Self {
            motion_type: MotionType::Line,
            ..Self::chars(Position::new(first, 0), Position::new(last, 0), false)
        }
    }

    /// Rectangle over lines `first..=last` and display columns
    /// `start_vcol..end_vcol`.
    pub fn block<S: LineStore + ?Sized>(
        store: &S,
        first: usize,
        last: usize,
        start_vcol: usize,
        end_vcol: usize,
        tabstop: usize,
    ) -> Self {
        let start_line = store.line(first);
        let end_line = store.line(last);
        Self {
            motion_type: MotionType::Block,
            start_vcol,
            end_vcol,
            ..Self::chars(
                Position::new(first, width::byte_at_vcol(&start_line, start_vcol, tabstop)),
                Position::new(
                    last,
                    width::byte_at_vcol(&end_line, end_vcol.saturating_sub(1), tabstop),
                ),
                true,
            )
        }
    }

    pub fn line_count(&self) -> usize {
        self.end.line - self.start.line + 1
    }

    /// Byte offset just past the covered text on the end line (char-wise).
    pub fn end_byte_exclusive(&self, end_line: &str) -> usize {
        if self.inclusive {
            grapheme::next_boundary(end_line, self.end.byte)
        } else {
            self.end.byte.min(end_line.len())
        }
    }
}

/// Range from the cursor to a motion target.
pub fn resolve<S: LineStore + ?Sized>(store: &S, cursor: Position, target: MotionTarget) -> OpRange {
    let range = OpRange {
        motion_type: target.motion_type,
        ..OpRange::chars(cursor, target.pos, target.inclusive)
    };
    normalize(store, range)
}

/// Order the ends, mark empty ranges and apply the column-0 rule: an
/// exclusive char-wise range that ends in column 0 of a later line ends at
/// the last character of the line before instead, and becomes line-wise
/// when it starts inside the indent of its first line.
pub fn normalize<S: LineStore + ?Sized>(store: &S, mut range: OpRange) -> OpRange {
    if range.end < range.start {
        std::mem::swap(&mut range.start, &mut range.end);
    }
    if range.end_adjusted || range.motion_type != MotionType::Char {
        return range;
    }
    range.empty = !range.inclusive && range.start == range.end;
    if !range.inclusive && range.end.byte == 0 && range.end.line > range.start.line {
        range.end_adjusted = true;
        range.end.line -= 1;
        let start_line = store.line(range.start.line);
        if range.start.byte <= first_non_blank(&start_line) {
            range.motion_type = MotionType::Line;
        } else {
            let end_line = store.line(range.end.line);
            range.end.byte = end_line.len();
            if !end_line.is_empty() {
                range.end.byte = grapheme::last_start(&end_line);
                range.inclusive = true;
            }
        }
    }
    range
}

/// Range covered by a Visual selection when an operator ends it.
pub fn from_visual<S: LineStore + ?Sized>(
    store: &S,
    selection: &VisualSelection,
    tabstop: usize,
) -> OpRange {
    let (mut start, end) = selection.ordered();
    let mut range = match selection.mode {
        VisualMode::Line => {
            start.byte = 0;
            OpRange {
                motion_type: MotionType::Line,
                ..OpRange::chars(start, end, true)
            }
        }
        VisualMode::Char => {
            let on_nul = end.byte >= store.line_len(end.line);
            OpRange::chars(start, end, !on_nul)
        }
        VisualMode::Block => {
            let (first, last) = (start.line, end.line);
            let (a_start, a_end) =
                width::char_span(&store.line(selection.anchor.line), selection.anchor.byte, tabstop);
            let (b_start, b_end) =
                width::char_span(&store.line(selection.active.line), selection.active.byte, tabstop);
            let start_vcol = a_start.min(b_start);
            let end_vcol = if selection.to_eol {
                (first..=last)
                    .map(|n| width::line_cells(&store.line(n), tabstop))
                    .max()
                    .unwrap_or(0)
                    .max(start_vcol + 1)
            } else {
                a_end.max(b_end)
            };
            OpRange::block(store, first, last, start_vcol, end_vcol, tabstop)
        }
    };
    range.is_visual = true;
    normalize(store, range)
}
