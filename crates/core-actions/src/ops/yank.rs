use super::{OpContext, plural};
use crate::block::{self, BlockPurpose};
use crate::span_resolver::OpRange;
use crate::{MotionType, OpError};
use core_state::{Register, RegisterError, RegisterKind};
use core_text::{LineStore, Position, grapheme};
use std::borrow::Cow;
use tracing::debug;

/// Copy the text of `range` into register content no larger than `limit`
/// bytes (0 is unlimited).
///
/// A char-wise exclusive range running from column 0 to column 0 of a later
/// line yanks whole lines (every line but the last).
pub fn yank_content<S: LineStore + ?Sized>(
    store: &S,
    range: &OpRange,
    tabstop: usize,
    limit: usize,
) -> Result<Register, RegisterError> {
    let mut kind = match range.motion_type {
        MotionType::Char => RegisterKind::Char,
        MotionType::Line => RegisterKind::Line,
        MotionType::Block => RegisterKind::Block,
    };
    let mut last = range.end.line;
    if kind == RegisterKind::Char
        && range.start.byte == 0
        && !range.inclusive
        && range.end.byte == 0
        && range.line_count() > 1
    {
        kind = RegisterKind::Line;
        last -= 1;
    }
    let first = range.start.line;

    let content = match kind {
        RegisterKind::Line => Register::try_collect(kind, limit, (first..=last).map(|n| store.line(n)))?,
        RegisterKind::Block => Register::try_collect(
            kind,
            limit,
            (first..=last).map(|n| {
                let line = store.line(n);
                block::prepare(&line, range.start_vcol, range.end_vcol, BlockPurpose::Yank, tabstop)
                    .yanked(&line)
            }),
        )?,
        RegisterKind::Char => {
            let start_line = store.line(first);
            let start = range.start.byte.min(start_line.len());
            if first == last {
                let end = range.end_byte_exclusive(&start_line).max(start);
                Register::try_collect(kind, limit, [&start_line[start..end]])?
            } else {
                let end_line = store.line(last);
                let end = range.end_byte_exclusive(&end_line);
                let pieces = std::iter::once(Cow::Borrowed(&start_line[start..]))
                    .chain((first + 1..last).map(|n| Cow::Owned(store.line(n))))
                    .chain(std::iter::once(Cow::Borrowed(&end_line[..end])));
                Register::try_collect(kind, limit, pieces)?
            }
        }
    };
    Ok(content)
}

/// Yank `range` into `register` (`None` is the unnamed register). With
/// `mention` a message is recorded when more than `report` lines were copied.
pub fn do_yank(
    ctx: &mut OpContext<'_>,
    range: &OpRange,
    register: Option<char>,
    mention: bool,
) -> Result<(), OpError> {
    ctx.check_range(range)?;
    let target = ctx.state.registers.select(register, true)?;
    let limit = ctx.state.registers.max_bytes();
    let content = yank_content(&ctx.state.buffer, range, ctx.opts.tabstop, limit)?;
    let kind = content.kind;
    let mut lines = content.lines.len();
    ctx.state.registers.write(target, content)?;
    debug!(
        target: "actions.ops",
        register = %target.slot.name(),
        kind = kind.as_str(),
        lines,
        "yank"
    );

    let (start, end) = yank_marks(&ctx.state.buffer, range, kind);
    ctx.state.set_change_marks(start, end);

    if mention {
        if kind == RegisterKind::Char {
            lines -= 1;
        }
        if lines > ctx.opts.report {
            let msg = if kind == RegisterKind::Block {
                format!("block of {lines} line{} yanked", plural(lines))
            } else {
                format!("{lines} line{} yanked", plural(lines))
            };
            ctx.state.set_message(msg);
        }
    }
    Ok(())
}

fn yank_marks<S: LineStore + ?Sized>(
    store: &S,
    range: &OpRange,
    kind: RegisterKind,
) -> (Position, Position) {
    match kind {
        RegisterKind::Line => {
            let last = if range.motion_type == MotionType::Char {
                range.end.line - 1
            } else {
                range.end.line
            };
            let last_line = store.line(last);
            (
                Position::new(range.start.line, 0),
                Position::new(last, grapheme::last_start(&last_line)),
            )
        }
        _ => (range.start, range.end),
    }
}
