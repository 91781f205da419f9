use super::{OpContext, indent_width, plural, set_indent};
use crate::OpError;
use core_text::{LineStore, Position, grapheme, motion::first_non_blank};
use tracing::debug;

/// Shift lines `first..=last` by `amount` shiftwidths. Empty lines are left
/// alone. With `shiftround` the new indent is a multiple of shiftwidth.
/// The cursor ends on the first non-blank of `first`.
pub fn do_shift(
    ctx: &mut OpContext<'_>,
    first: usize,
    last: usize,
    left: bool,
    amount: usize,
) -> Result<(), OpError> {
    let last = last.min(ctx.state.buffer.line_count());
    ctx.state.save_for_undo(first, last)?;
    let (ts, sw) = (ctx.opts.tabstop, ctx.opts.shiftwidth.max(1));

    for n in first..=last {
        let line = ctx.state.buffer.line(n);
        if line.is_empty() {
            continue;
        }
        let indent = shifted_indent(indent_width(&line, ts), sw, left, amount, ctx.opts.shiftround);
        let new = set_indent(&line, indent, ts);
        if new != line {
            ctx.state.buffer.replace(n, &new);
        }
    }

    let first_line = ctx.state.buffer.line(first);
    ctx.state.cursor = Position::new(first, first_non_blank(&first_line));
    ctx.state.clamp_cursor();
    let last_line = ctx.state.buffer.line(last);
    ctx.state.set_change_marks(
        Position::new(first, 0),
        Position::new(last, grapheme::last_start(&last_line)),
    );
    ctx.changed(first, last);

    let count = last - first + 1;
    debug!(target: "actions.ops", first, last, left, amount, "shift");
    if count > ctx.opts.report {
        ctx.state.set_message(format!(
            "{count} line{} {}ed {amount} time{}",
            plural(count),
            if left { '<' } else { '>' },
            plural(amount),
        ));
    }
    Ok(())
}

fn shifted_indent(indent: usize, sw: usize, left: bool, amount: usize, round: bool) -> usize {
    if round {
        let steps = indent / sw;
        let amount = if left && indent % sw != 0 {
            amount.saturating_sub(1)
        } else {
            amount
        };
        let steps = if left {
            steps.saturating_sub(amount)
        } else {
            steps + amount
        };
        steps * sw
    } else if left {
        indent.saturating_sub(sw * amount)
    } else {
        indent + sw * amount
    }
}
