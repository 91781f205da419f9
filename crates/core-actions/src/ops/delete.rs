use super::OpContext;
use super::yank::yank_content;
use crate::block::{self, BlockPurpose};
use crate::span_resolver::OpRange;
use crate::{MotionType, OpError};
use core_state::{RegisterKind, RegisterRef, Slot};
use core_text::{LineStore, Position, motion::first_non_blank, width};
use tracing::{debug, warn};

/// Delete the text of `range`, saving it to `register` first.
///
/// Where the deleted text goes:
/// * an explicit register gets a copy;
/// * deletes that are line-wise, span lines, or name a register also push
///   onto the `1`-`9` ring;
/// * everything else lands in the small-delete register `-`.
///
/// When no copy could be stored the prompt collaborator decides whether to
/// delete anyway (declining aborts with [`OpError::Aborted`]).
pub fn do_delete(
    ctx: &mut OpContext<'_>,
    range: &OpRange,
    register: Option<char>,
) -> Result<(), OpError> {
    delete_range(ctx, range, register, false)
}

/// Deletion half of the change operator: no line-wise promotion, an empty
/// line is fine, and line-wise ranges keep their first line (emptied).
pub(crate) fn delete_for_change(
    ctx: &mut OpContext<'_>,
    range: &OpRange,
    register: Option<char>,
) -> Result<(), OpError> {
    delete_range(ctx, range, register, true)
}

/// Replace lines `first..=last` with one empty line ready for insertion.
pub fn change_lines(
    ctx: &mut OpContext<'_>,
    first: usize,
    last: usize,
    register: Option<char>,
) -> Result<(), OpError> {
    delete_for_change(ctx, &OpRange::lines(first, last), register)
}

fn delete_range(
    ctx: &mut OpContext<'_>,
    range: &OpRange,
    register: Option<char>,
    change: bool,
) -> Result<(), OpError> {
    if ctx.state.buffer.is_empty() {
        return Ok(());
    }
    ctx.check_range(range)?;
    let mut range = *range;

    // vi: a char-wise delete over several lines that leaves only white
    // space behind after the end, starting inside the indent, removes
    // whole lines.
    if !change && range.motion_type == MotionType::Char && range.line_count() > 1 {
        let end_line = ctx.state.buffer.line(range.end.line);
        let after = range.end_byte_exclusive(&end_line);
        let start_line = ctx.state.buffer.line(range.start.line);
        if end_line[after..].trim_start_matches([' ', '\t']).is_empty()
            && range.start.byte <= first_non_blank(&start_line)
        {
            debug!(target: "actions.ops", "delete_promoted_linewise");
            range.motion_type = MotionType::Line;
        }
    }

    if !change
        && range.motion_type == MotionType::Char
        && range.line_count() == 1
        && ctx.state.buffer.line_len(range.start.line) == 0
    {
        return Err(OpError::EmptyLine);
    }

    save_deleted_text(ctx, &range, register)?;

    let old_count = ctx.state.buffer.line_count();
    ctx.state.save_for_undo(range.start.line, range.end.line)?;
    let first = range.start.line;
    match range.motion_type {
        MotionType::Block => {
            let ts = ctx.opts.tabstop;
            for n in first..=range.end.line {
                let line = ctx.state.buffer.line(n);
                let geo = block::prepare(&line, range.start_vcol, range.end_vcol, BlockPurpose::Delete, ts);
                if geo.text_len == 0 {
                    continue;
                }
                ctx.state.buffer.replace(n, &geo.delete_from(&line));
            }
            let line = ctx.state.buffer.line(first);
            ctx.state.cursor = Position::new(first, width::byte_at_vcol(&line, range.start_vcol, ts));
            ctx.state.clamp_cursor();
            let mark = ctx.state.cursor;
            ctx.state.set_change_marks(mark, Position::new(range.end.line, mark.byte));
            ctx.changed(first, range.end.line);
        }
        MotionType::Line if change => {
            if range.end.line > first {
                ctx.state.buffer.delete_range(first + 1, range.end.line);
            }
            ctx.state.buffer.replace(first, "");
            ctx.state.cursor = Position::new(first, 0);
            ctx.state.set_change_marks(ctx.state.cursor, ctx.state.cursor);
            ctx.changed(first, range.end.line);
        }
        MotionType::Line => {
            ctx.state.buffer.delete_range(first, range.end.line);
            let line = first.min(ctx.state.buffer.line_count());
            let text = ctx.state.buffer.line(line);
            ctx.state.cursor = Position::new(line, first_non_blank(&text));
            ctx.state.clamp_cursor();
            ctx.state.set_change_marks(ctx.state.cursor, ctx.state.cursor);
            ctx.changed(first, old_count);
        }
        MotionType::Char => {
            let start_line = ctx.state.buffer.line(first);
            let start = range.start.byte.min(start_line.len());
            let joined = if range.line_count() == 1 {
                let end = range.end_byte_exclusive(&start_line).max(start);
                format!("{}{}", &start_line[..start], &start_line[end..])
            } else {
                let end_line = ctx.state.buffer.line(range.end.line);
                let end = range.end_byte_exclusive(&end_line);
                format!("{}{}", &start_line[..start], &end_line[end..])
            };
            ctx.state.buffer.replace(first, &joined);
            if range.end.line > first {
                ctx.state.buffer.delete_range(first + 1, range.end.line);
            }
            ctx.state.cursor = Position::new(first, start);
            ctx.state.clamp_cursor();
            ctx.state.set_change_marks(range.start, range.start);
            if range.line_count() == 1 {
                ctx.redraw.redraw_cursor_line();
                ctx.state.dirty = true;
            } else {
                ctx.changed(first, old_count);
            }
        }
    }

    let new_count = ctx.state.buffer.line_count() as isize;
    ctx.more_lines(new_count - old_count as isize);
    Ok(())
}

fn save_deleted_text(
    ctx: &mut OpContext<'_>,
    range: &OpRange,
    register: Option<char>,
) -> Result<(), OpError> {
    let explicit = register.filter(|c| *c != '"');
    let named = match explicit {
        Some(name) => Some(ctx.state.registers.select(Some(name), true)?),
        None => None,
    };

    let mut did_yank = false;
    let limit = ctx.state.registers.max_bytes();
    match yank_content(&ctx.state.buffer, range, ctx.opts.tabstop, limit) {
        Ok(content) => {
            let regs = &mut ctx.state.registers;
            if let Some(target) = named {
                match regs.write(target, content.clone()) {
                    Ok(()) => did_yank = true,
                    Err(e) => warn!(target: "actions.ops", error = %e, "delete_yank_failed"),
                }
            }
            let spans_lines = content.kind == RegisterKind::Line || range.line_count() > 1;
            let stored = if named.is_some() || spans_lines {
                regs.rotate_numbered(content)
            } else {
                let small = RegisterRef {
                    slot: Slot::SmallDelete,
                    append: false,
                };
                regs.write(small, content)
            };
            match stored {
                Ok(()) => did_yank = true,
                Err(e) => warn!(target: "actions.ops", error = %e, "delete_yank_failed"),
            }
        }
        Err(e) => warn!(target: "actions.ops", error = %e, "delete_yank_failed"),
    }

    if !did_yank && !ctx.prompt.confirm("cannot yank; delete anyway") {
        return Err(OpError::Aborted);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EditOptions;
    use crate::collab::{AcceptPrompt, DeclinePrompt, NoopRedraw};
    use core_state::{EditorState, Register, Registers};
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn state(lines: &[&str]) -> EditorState {
        EditorState::new(Buffer::from_lines("t", lines).unwrap())
    }

    fn delete(s: &mut EditorState, range: OpRange, register: Option<char>) -> Result<(), OpError> {
        let opts = EditOptions::default();
        let mut redraw = NoopRedraw;
        let mut prompt = DeclinePrompt;
        let mut ctx = OpContext::new(s, &opts, &mut redraw, &mut prompt);
        do_delete(&mut ctx, &range, register)
    }

    #[test]
    fn small_delete_goes_to_minus_register() {
        let mut s = state(&["hello world"]);
        delete(&mut s, OpRange::chars(Position::new(1, 0), Position::new(1, 6), false), None).unwrap();
        assert_eq!(s.buffer.lines(), vec!["world"]);
        assert_eq!(s.registers.get(Slot::SmallDelete), Some(&Register::charwise("hello ")));
        assert_eq!(s.registers.get(Slot::Numbered(1)), None);
        assert_eq!(s.registers.previous(), Some(Slot::SmallDelete));
    }

    #[test]
    fn explicit_register_also_rotates_ring() {
        let mut s = state(&["hello world"]);
        delete(&mut s, OpRange::chars(Position::new(1, 0), Position::new(1, 6), false), Some('a')).unwrap();
        assert_eq!(s.registers.get(Slot::Named(0)), Some(&Register::charwise("hello ")));
        assert_eq!(s.registers.get(Slot::Numbered(1)), Some(&Register::charwise("hello ")));
        assert_eq!(s.registers.get(Slot::SmallDelete), None);
    }

    #[test]
    fn read_only_register_is_rejected_before_mutation() {
        let mut s = state(&["abc"]);
        let err = delete(&mut s, OpRange::chars(Position::new(1, 0), Position::new(1, 1), true), Some('%'));
        assert!(matches!(err, Err(OpError::Register(_))));
        assert_eq!(s.buffer.lines(), vec!["abc"]);
    }

    #[test]
    fn multi_line_char_delete_joins_ends() {
        let mut s = state(&["one two", "three", "four five"]);
        delete(&mut s, OpRange::chars(Position::new(1, 4), Position::new(3, 4), false), None).unwrap();
        assert_eq!(s.buffer.lines(), vec!["one  five"]);
        assert_eq!(s.cursor, Position::new(1, 4));
        let ring = s.registers.get(Slot::Numbered(1)).unwrap();
        assert_eq!(ring.lines, vec!["two", "three", "four"]);
    }

    #[test]
    fn blank_remainder_promotes_to_linewise() {
        let mut s = state(&["  alpha", "beta  ", "gamma"]);
        // From the indent to the end of "beta" with only blanks after it.
        delete(&mut s, OpRange::chars(Position::new(1, 1), Position::new(2, 3), true), None).unwrap();
        assert_eq!(s.buffer.lines(), vec!["gamma"]);
        assert_eq!(s.registers.get(Slot::Numbered(1)).unwrap().kind, RegisterKind::Line);
    }

    #[test]
    fn char_delete_on_empty_line_fails() {
        let mut s = state(&["", "x"]);
        let err = delete(&mut s, OpRange::chars(Position::new(1, 0), Position::new(1, 0), true), None);
        assert_eq!(err, Err(OpError::EmptyLine));
    }

    #[test]
    fn deleting_every_line_leaves_empty_buffer() {
        let mut s = state(&["abc", "def"]);
        delete(&mut s, OpRange::lines(1, 2), None).unwrap();
        assert!(s.buffer.is_empty());
        assert_eq!(s.registers.get(Slot::Numbered(1)), Some(&Register::linewise(&["abc", "def"])));
        // Nothing left to delete: silently ignored.
        delete(&mut s, OpRange::lines(1, 1), None).unwrap();
        assert!(s.buffer.is_empty());
    }

    #[test]
    fn range_past_the_end_leaves_registers_alone() {
        let mut s = state(&["a", "b"]);
        let err = delete(&mut s, OpRange::lines(1, 5), None).unwrap_err();
        assert_eq!(
            err,
            OpError::Undo(core_state::UndoError::InvalidRange {
                n1: 1,
                n2: 5,
                line_count: 2
            })
        );
        assert_eq!(s.buffer.lines(), vec!["a", "b"]);
        assert_eq!(s.registers.get(Slot::Numbered(1)), None);
        assert_eq!(s.registers.previous(), None);
    }

    #[test]
    fn block_delete_splits_tabs() {
        let mut s = state(&["abcdef", "a\tbc"]);
        let range = OpRange::block(&s.buffer, 1, 2, 2, 4, 8);
        delete(&mut s, range, None).unwrap();
        assert_eq!(s.buffer.lines(), vec!["abef", "a     bc"]);
        assert_eq!(s.registers.get(Slot::Numbered(1)).unwrap().lines, vec!["cd", "  "]);
    }

    #[test]
    fn oversized_delete_asks_before_proceeding() {
        let mut s = state(&["a long line of text", "x"]);
        s.registers = Registers::new().with_max_bytes(4);
        let range = OpRange::lines(1, 1);
        assert_eq!(delete(&mut s, range, None), Err(OpError::Aborted));
        assert_eq!(s.buffer.line_count(), 2);

        let opts = EditOptions::default();
        let mut redraw = NoopRedraw;
        let mut prompt = AcceptPrompt;
        let mut ctx = OpContext::new(&mut s, &opts, &mut redraw, &mut prompt);
        do_delete(&mut ctx, &range, None).unwrap();
        assert_eq!(s.buffer.lines(), vec!["x"]);
        assert_eq!(s.registers.get(Slot::Numbered(1)), None);
    }
}
