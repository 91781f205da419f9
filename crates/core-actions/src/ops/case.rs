use super::{OpContext, plural};
use crate::block::{self, BlockPurpose};
use crate::span_resolver::OpRange;
use crate::{MotionType, OpError};
use core_text::{LineStore, Position, grapheme, motion::first_non_blank};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseOp {
    /// `~` / `g~`
    Toggle,
    /// `gU`
    Upper,
    /// `gu`
    Lower,
}

impl CaseOp {
    fn apply(self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            if c.is_lowercase() && self != CaseOp::Lower {
                out.extend(c.to_uppercase());
            } else if c.is_uppercase() && self != CaseOp::Upper {
                out.extend(c.to_lowercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

/// Change the case of the text in `range`.
pub fn do_tilde(ctx: &mut OpContext<'_>, range: &OpRange, op: CaseOp) -> Result<(), OpError> {
    let (first, last) = (range.start.line, range.end.line);
    ctx.state.save_for_undo(first, last)?;
    let ts = ctx.opts.tabstop;

    let mut changed = false;
    for n in first..=last {
        let line = ctx.state.buffer.line(n);
        let (from, to) = match range.motion_type {
            MotionType::Block => {
                let geo = block::prepare(&line, range.start_vcol, range.end_vcol, BlockPurpose::Yank, ts);
                (geo.text_col, geo.text_col + geo.text_len)
            }
            MotionType::Line => (0, line.len()),
            MotionType::Char => {
                let from = if n == first { range.start.byte.min(line.len()) } else { 0 };
                let to = if n == last {
                    range.end_byte_exclusive(&line).max(from)
                } else {
                    line.len()
                };
                (from, to)
            }
        };
        let swapped = op.apply(&line[from..to]);
        if swapped != line[from..to] {
            let mut new = String::with_capacity(line.len());
            new.push_str(&line[..from]);
            new.push_str(&swapped);
            new.push_str(&line[to..]);
            ctx.state.buffer.replace(n, &new);
            changed = true;
        }
    }
    debug!(target: "actions.ops", ?op, first, last, changed, "tilde");

    let end = match range.motion_type {
        MotionType::Line => Position::new(last, grapheme::last_start(&ctx.state.buffer.line(last))),
        _ => range.end,
    };
    let start = match range.motion_type {
        MotionType::Line => Position::new(first, 0),
        _ => range.start,
    };
    ctx.state.set_change_marks(start, end);
    ctx.state.cursor = match range.motion_type {
        MotionType::Line => Position::new(first, first_non_blank(&ctx.state.buffer.line(first))),
        _ => range.start,
    };
    ctx.state.clamp_cursor();

    if changed {
        if range.motion_type == MotionType::Char && first == last {
            ctx.state.dirty = true;
            ctx.redraw.redraw_cursor_line();
        } else {
            ctx.changed(first, last);
        }
    }
    let count = range.line_count();
    if count > ctx.opts.report {
        ctx.state.set_message(format!("{count} line{} ~ed", plural(count)));
    }
    Ok(())
}
