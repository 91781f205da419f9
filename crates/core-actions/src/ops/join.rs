use super::OpContext;
use crate::OpError;
use core_text::{LineStore, Position, grapheme};
use tracing::debug;

/// Join `count` lines starting at `line` (fewer than two still joins two).
///
/// With `spaces` (`J`) the leading white space of each joined line is
/// dropped and one space separates the parts: none before a `)`, after an
/// empty line or after trailing white space, two after `.`, `!` or `?` when
/// `joinspaces` is set. Without (`gJ`) the lines are concatenated as they
/// are. Fails without changing anything when the lines run past the end of
/// the buffer.
pub fn do_join(
    ctx: &mut OpContext<'_>,
    line: usize,
    count: usize,
    spaces: bool,
) -> Result<(), OpError> {
    let count = count.max(2);
    let last = line + count - 1;
    if last > ctx.state.buffer.line_count() {
        return Err(OpError::CannotJoin);
    }
    ctx.state.save_for_undo(line, last)?;

    let mut joined = ctx.state.buffer.line(line);
    let mut cursor_byte = 0;
    for n in line + 1..=last {
        let next = ctx.state.buffer.line(n);
        let curr_len = joined.len();
        let next = if spaces {
            next.trim_start_matches([' ', '\t'])
        } else {
            next.as_str()
        };
        let gap = if spaces { separator(&joined, next, ctx.opts.joinspaces) } else { 0 };
        joined.extend(std::iter::repeat_n(' ', gap));
        joined.push_str(next);

        cursor_byte = if curr_len == 0 {
            0
        } else if joined.len() > curr_len {
            curr_len
        } else {
            grapheme::last_start(&joined)
        };
    }

    ctx.state.buffer.replace(line, &joined);
    ctx.state.buffer.delete_range(line + 1, last);
    debug!(target: "actions.ops", line, count, spaces, "join");

    ctx.state.cursor = Position::new(line, cursor_byte);
    ctx.state.clamp_cursor();
    ctx.state.set_change_marks(Position::new(line, 0), ctx.state.cursor);
    ctx.changed(line, last);
    Ok(())
}

fn separator(curr: &str, next: &str, joinspaces: bool) -> usize {
    if curr.is_empty() || next.starts_with(')') {
        return 0;
    }
    match curr.chars().next_back() {
        Some(' ' | '\t') => 0,
        Some('.' | '!' | '?') if joinspaces => 2,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EditOptions;
    use crate::collab::{DeclinePrompt, NoopRedraw};
    use core_state::EditorState;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn join(lines: &[&str], line: usize, count: usize, spaces: bool) -> (EditorState, Result<(), OpError>) {
        let mut s = EditorState::new(Buffer::from_lines("t", lines).unwrap());
        let opts = EditOptions::default();
        let mut redraw = NoopRedraw;
        let mut prompt = DeclinePrompt;
        let mut ctx = OpContext::new(&mut s, &opts, &mut redraw, &mut prompt);
        let res = do_join(&mut ctx, line, count, spaces);
        (s, res)
    }

    #[test]
    fn join_strips_indent_and_inserts_one_space() {
        let (s, res) = join(&["if x {", "    y", "}"], 1, 2, true);
        res.unwrap();
        assert_eq!(s.buffer.lines(), vec!["if x { y", "}"]);
        assert_eq!(s.cursor, Position::new(1, 6));
    }

    #[test]
    fn separator_rules() {
        assert_eq!(separator("foo", ")", true), 0);
        assert_eq!(separator("", "x", true), 0);
        assert_eq!(separator("foo\t", "x", true), 0);
        assert_eq!(separator("end.", "x", true), 2);
        assert_eq!(separator("end.", "x", false), 1);
        assert_eq!(separator("what?", "x", true), 2);
    }

    #[test]
    fn count_joins_several_lines() {
        let (s, res) = join(&["a", "b", "c", "d"], 1, 3, true);
        res.unwrap();
        assert_eq!(s.buffer.lines(), vec!["a b c", "d"]);
        assert_eq!(s.cursor, Position::new(1, 3));
    }

    #[test]
    fn gj_keeps_white_space() {
        let (s, res) = join(&["a", "  b"], 1, 2, false);
        res.unwrap();
        assert_eq!(s.buffer.lines(), vec!["a  b"]);
        assert_eq!(s.cursor, Position::new(1, 1));
    }

    #[test]
    fn empty_current_line_puts_cursor_at_start() {
        let (s, res) = join(&["", "  x"], 1, 2, true);
        res.unwrap();
        assert_eq!(s.buffer.lines(), vec!["x"]);
        assert_eq!(s.cursor, Position::new(1, 0));
    }

    #[test]
    fn joining_past_the_end_fails_untouched() {
        let (s, res) = join(&["a", "b"], 2, 2, true);
        assert_eq!(res, Err(OpError::CannotJoin));
        assert_eq!(s.buffer.lines(), vec!["a", "b"]);
    }
}
