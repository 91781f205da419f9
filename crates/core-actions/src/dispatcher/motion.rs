//! Motion targets.
//!
//! A motion never moves anything by itself: it computes where the cursor
//! would land and how the text in between is covered. The interpreter then
//! either moves the cursor there (Normal and Visual mode) or hands the
//! target to the pending operator.

use crate::span_resolver::MotionTarget;
use crate::{EditOptions, Motion, OpError, OperatorKind};
use core_state::EditorState;
use core_text::{LineStore, Position, grapheme, motion, width};

/// Last `f`/`F`/`t`/`T` search, repeated by `;` and `,`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FindSpec {
    pub target: char,
    pub forward: bool,
    pub till: bool,
}

/// Where `motion` goes from the cursor. `count` is raw (0 = none typed);
/// `op` is the pending operator, which changes a few motions (`l` may reach
/// the end of the line, `w` stops at the line end, `cw` acts like `ce`).
pub(crate) fn target(
    state: &EditorState,
    opts: &EditOptions,
    motion: Motion,
    count: usize,
    op: Option<OperatorKind>,
    last_find: &mut Option<FindSpec>,
) -> Result<MotionTarget, OpError> {
    let buf = &state.buffer;
    let cur = state.cursor;
    let line = buf.line(cur.line);
    let n = count.max(1);

    let target = match motion {
        Motion::Left => {
            if cur.byte == 0 {
                return Err(OpError::MotionFailed);
            }
            let mut byte = cur.byte;
            for _ in 0..n {
                if byte == 0 {
                    break;
                }
                byte = grapheme::prev_boundary(&line, byte);
            }
            MotionTarget::exclusive(Position::new(cur.line, byte))
        }
        Motion::Right => {
            let limit = if op.is_some() {
                line.len()
            } else {
                grapheme::last_start(&line)
            };
            if line.is_empty() || cur.byte >= limit {
                return Err(OpError::MotionFailed);
            }
            let mut byte = cur.byte;
            for _ in 0..n {
                if byte >= limit {
                    break;
                }
                byte = grapheme::next_boundary(&line, byte);
            }
            MotionTarget::exclusive(Position::new(cur.line, byte.min(limit)))
        }
        Motion::Up => {
            let lnum = line_up(cur.line, n)?;
            MotionTarget::linewise(at_curswant(state, opts, lnum))
        }
        Motion::Down => {
            let lnum = line_down(cur.line, n, buf.line_count())?;
            MotionTarget::linewise(at_curswant(state, opts, lnum))
        }
        Motion::NextLineStart => {
            MotionTarget::linewise(first_non_blank_of(state, line_down(cur.line, n, buf.line_count())?))
        }
        Motion::PrevLineStart => MotionTarget::linewise(first_non_blank_of(state, line_up(cur.line, n)?)),
        Motion::CurrentLine => {
            let lnum = line_down(cur.line, n - 1, buf.line_count())?;
            MotionTarget::linewise(first_non_blank_of(state, lnum))
        }
        Motion::GotoLine | Motion::GotoFirstLine => {
            let lnum = match (count, motion) {
                (0, Motion::GotoLine) => buf.line_count(),
                (0, _) => 1,
                (n, _) => n.min(buf.line_count()),
            };
            let pos = if opts.startofline {
                first_non_blank_of(state, lnum)
            } else {
                at_curswant(state, opts, lnum)
            };
            MotionTarget::linewise(pos)
        }
        Motion::LineStart => MotionTarget::exclusive(Position::new(cur.line, 0)),
        Motion::FirstNonBlank => MotionTarget::exclusive(first_non_blank_of(state, cur.line)),
        Motion::Column => {
            let byte = width::byte_at_vcol(&line, n - 1, opts.tabstop);
            MotionTarget::exclusive(Position::new(cur.line, byte))
        }
        Motion::LineEnd => {
            let lnum = line_down(cur.line, n - 1, buf.line_count())?;
            let text = buf.line(lnum);
            MotionTarget::inclusive(Position::new(lnum, grapheme::last_start(&text)))
        }
        Motion::WordForward { big } => {
            let on_blank = line[cur.byte.min(line.len())..]
                .chars()
                .next()
                .is_none_or(|c| c == ' ' || c == '\t');
            if op == Some(OperatorKind::Change) && !line.is_empty() {
                if on_blank && n == 1 {
                    // `cw` on a single blank changes just that blank.
                    return Ok(MotionTarget::inclusive(cur));
                }
                if !on_blank {
                    let pos = motion::word_end(buf, cur, n, big, true).ok_or(OpError::MotionFailed)?;
                    return Ok(MotionTarget::inclusive(pos));
                }
            }
            let pos = motion::word_forward(buf, cur, n, big, op.is_some()).ok_or(OpError::MotionFailed)?;
            MotionTarget::exclusive(pos)
        }
        Motion::WordBackward { big } => {
            MotionTarget::exclusive(motion::word_backward(buf, cur, n, big).ok_or(OpError::MotionFailed)?)
        }
        Motion::WordEnd { big } => {
            MotionTarget::inclusive(motion::word_end(buf, cur, n, big, false).ok_or(OpError::MotionFailed)?)
        }
        Motion::FindChar {
            target,
            forward,
            till,
        } => {
            let spec = FindSpec {
                target,
                forward,
                till,
            };
            *last_find = Some(spec);
            find(&line, cur, spec, n)?
        }
        Motion::RepeatFind { reverse } => {
            let Some(mut spec) = *last_find else {
                return Err(OpError::MotionFailed);
            };
            spec.forward ^= reverse;
            find(&line, cur, spec, n)?
        }
    };
    Ok(target)
}

/// Update the wanted display column after the cursor moved by `motion`.
pub(crate) fn update_curswant(state: &mut EditorState, tabstop: usize, motion: Motion, count: usize) {
    match motion {
        Motion::Up | Motion::Down => {}
        Motion::LineEnd => state.curswant = usize::MAX,
        Motion::Column => state.curswant = count.max(1) - 1,
        _ => {
            let line = state.cur_line();
            state.curswant = width::vcol_at(&line, state.cursor.byte, tabstop);
        }
    }
}

fn find(line: &str, cur: Position, spec: FindSpec, count: usize) -> Result<MotionTarget, OpError> {
    let byte = motion::find_char(line, cur.byte, spec.target, count, spec.forward, spec.till)
        .ok_or(OpError::MotionFailed)?;
    let pos = Position::new(cur.line, byte);
    Ok(if spec.forward {
        MotionTarget::inclusive(pos)
    } else {
        MotionTarget::exclusive(pos)
    })
}

/// Moving up fails only when nothing moves; a short count stops at line 1.
fn line_up(from: usize, n: usize) -> Result<usize, OpError> {
    if n > 0 && from <= 1 {
        return Err(OpError::MotionFailed);
    }
    Ok(from.saturating_sub(n).max(1))
}

fn line_down(from: usize, n: usize, line_count: usize) -> Result<usize, OpError> {
    if n > 0 && from >= line_count {
        return Err(OpError::MotionFailed);
    }
    Ok(from.saturating_add(n).min(line_count))
}

fn first_non_blank_of(state: &EditorState, lnum: usize) -> Position {
    Position::new(lnum, motion::first_non_blank(&state.buffer.line(lnum)))
}

fn at_curswant(state: &EditorState, opts: &EditOptions, lnum: usize) -> Position {
    let text = state.buffer.line(lnum);
    let byte = width::byte_at_vcol(&text, state.curswant, opts.tabstop);
    Position::new(lnum, byte)
}
