//! Normal mode commands that act immediately.
//!
//! Several are spelled in terms of an operator and a motion (`x` is `dl`,
//! `D` is `d$`, `Y` is `yy`, ...) and go through the same operator path.

use super::{Interpreter, State};
use crate::collab::ExRequest;
use crate::key_translator::ParsedCommand;
use crate::ops::{CaseOp, do_addsub, do_join, do_put, do_tilde};
use crate::span_resolver::OpRange;
use crate::{Command, Motion, OpError, OperatorKind};
use core_text::{Position, grapheme, width};
use tracing::debug;

impl Interpreter {
    pub(super) fn normal_command(&mut self, parsed: ParsedCommand) -> Result<(), OpError> {
        let ParsedCommand {
            count,
            register,
            command,
        } = parsed;
        let n = count.max(1);
        match command {
            Command::Motion(m) => self.move_cursor(m, count),
            Command::Operator(op) => {
                self.pending = State::Pending {
                    op,
                    count,
                    register,
                };
                Ok(())
            }
            Command::DeleteChar => self.motion_operator(OperatorKind::Delete, count, register, Motion::Right),
            Command::DeleteCharBefore => {
                self.motion_operator(OperatorKind::Delete, count, register, Motion::Left)
            }
            Command::DeleteToEnd => self.motion_operator(OperatorKind::Delete, count, register, Motion::LineEnd),
            Command::ChangeToEnd => self.motion_operator(OperatorKind::Change, count, register, Motion::LineEnd),
            Command::Substitute => {
                if self.state.cur_line().is_empty() {
                    self.start_insert(self.state.cursor);
                    Ok(())
                } else {
                    self.motion_operator(OperatorKind::Change, count, register, Motion::Right)
                }
            }
            Command::SubstituteLine => self.line_operator(OperatorKind::Change, count, register),
            Command::YankLine => self.line_operator(OperatorKind::Yank, count, register),
            Command::Put {
                direction,
                fix_indent,
            } => do_put(&mut self.ctx(), register, direction, n, fix_indent),
            Command::Join { spaces } => {
                let line = self.state.cursor.line;
                do_join(&mut self.ctx(), line, n, spaces)
            }
            Command::SwapCase => self.swap_case(n),
            Command::AddSub { add } => do_addsub(&mut self.ctx(), add, n),
            Command::Undo => self.undo(n),
            Command::Redo => self.redo(n),
            Command::Visual(mode) => {
                self.start_visual(mode);
                Ok(())
            }
            Command::Insert(kind) => self.insert_command(kind),
            Command::ExCommand => {
                self.ex_command(count);
                Ok(())
            }
            Command::Record(r) => self.start_recording(r),
            Command::StopRecording => self.stop_recording(),
            Command::Execute(r) => self.execute_register(r, n),
            Command::Cancel => Err(OpError::Cancelled),
            Command::Window(key) => Err(OpError::Unsupported(format!("CTRL-W {key}"))),
            Command::Unknown(key) => Err(OpError::Unsupported(key.to_string())),
            Command::SwapEnds | Command::ReplaceLines => Err(OpError::Unsupported(format!("{command:?}"))),
        }
    }

    /// `~`: toggle the case of `n` characters and step past them.
    fn swap_case(&mut self, n: usize) -> Result<(), OpError> {
        let line = self.state.cur_line();
        if line.is_empty() {
            return Err(OpError::EmptyLine);
        }
        let cur = self.state.cursor;
        let mut end = cur.byte;
        for _ in 1..n {
            let next = grapheme::next_boundary(&line, end);
            if next >= line.len() {
                break;
            }
            end = next;
        }
        let range = OpRange::chars(cur, Position::new(cur.line, end), true);
        do_tilde(&mut self.ctx(), &range, CaseOp::Toggle)?;

        let grown = self.state.cur_line().len() as isize - line.len() as isize;
        let after = grapheme::next_boundary(&line, end) as isize + grown;
        self.state.cursor = Position::new(cur.line, after.max(0) as usize);
        self.state.clamp_cursor();
        let text = self.state.cur_line();
        self.state.curswant = width::vcol_at(&text, self.state.cursor.byte, self.options.tabstop);
        Ok(())
    }

    /// `:` with a count asks for an Ex command line over `.,.+count-1`.
    fn ex_command(&mut self, count: usize) {
        let request = if count == 0 {
            ExRequest {
                range: None,
                command: String::new(),
            }
        } else {
            let first = self.state.cursor.line;
            let last = (first + count - 1).min(self.state.line_count());
            let command = if count == 1 {
                ".".to_string()
            } else {
                format!(".,.+{}", count - 1)
            };
            ExRequest {
                range: Some((first, last)),
                command,
            }
        };
        debug!(target: "actions.dispatch", command = request.command.as_str(), "ex_command");
        self.ex.submit(request);
    }
}

#[cfg(test)]
mod tests {
    use crate::collab::RecordingEx;
    use crate::{EditOptions, Interpreter, OpError};
    use core_events::ScriptedKeys;
    use core_state::{EditorState, Mode, Slot};
    use core_text::{Buffer, Position};
    use pretty_assertions::assert_eq;

    fn interp(lines: &[&str], cursor: Position) -> Interpreter {
        let mut state = EditorState::new(Buffer::from_lines("t", lines).unwrap());
        state.cursor = cursor;
        Interpreter::new(state, EditOptions::default())
    }

    fn run(lines: &[&str], cursor: Position, script: &str) -> Interpreter {
        let mut i = interp(lines, cursor);
        i.run(&mut ScriptedKeys::parse(script).unwrap());
        i
    }

    #[test]
    fn x_deletes_under_cursor_and_count_stops_at_line_end() {
        let i = run(&["abcdef"], Position::new(1, 1), "x");
        assert_eq!(i.state().buffer.lines(), vec!["acdef"]);
        assert_eq!(i.state().registers.get(Slot::SmallDelete).unwrap().lines, vec!["b"]);
        let i = run(&["abcdef"], Position::new(1, 4), "9x");
        assert_eq!(i.state().buffer.lines(), vec!["abcd"]);
        assert_eq!(i.state().cursor, Position::new(1, 3));
    }

    #[test]
    fn x_on_empty_line_fails() {
        let i = run(&[""], Position::new(1, 0), "x");
        assert_eq!(i.last_error(), Some(&OpError::MotionFailed));
        assert_eq!(i.state().beeps, 1);
    }

    #[test]
    fn shorthands() {
        let i = run(&["abcdef"], Position::new(1, 3), "X");
        assert_eq!(i.state().buffer.lines(), vec!["abdef"]);
        let i = run(&["abcdef"], Position::new(1, 3), "D");
        assert_eq!(i.state().buffer.lines(), vec!["abc"]);
        assert_eq!(i.state().cursor, Position::new(1, 2));
        let i = run(&["abcdef"], Position::new(1, 3), "C");
        assert_eq!(i.state().buffer.lines(), vec!["abc"]);
        assert_eq!(i.state().mode, Mode::Insert);
        assert_eq!(i.state().cursor, Position::new(1, 3));
        let i = run(&["abc", "def"], Position::new(1, 1), "Y");
        assert_eq!(i.state().registers.get(Slot::Numbered(0)).unwrap().lines, vec!["abc"]);
        assert_eq!(i.state().cursor, Position::new(1, 1));
    }

    #[test]
    fn substitute_on_empty_line_just_inserts() {
        let i = run(&[""], Position::new(1, 0), "s");
        assert_eq!(i.state().mode, Mode::Insert);
        assert_eq!(i.state().beeps, 0);
        let i = run(&["abc"], Position::new(1, 0), "2s");
        assert_eq!(i.state().buffer.lines(), vec!["c"]);
        assert_eq!(i.state().mode, Mode::Insert);
    }

    #[test]
    fn tilde_advances_the_cursor() {
        let i = run(&["hello"], Position::new(1, 0), "~");
        assert_eq!(i.state().buffer.lines(), vec!["Hello"]);
        assert_eq!(i.state().cursor, Position::new(1, 1));
        let i = run(&["hello"], Position::new(1, 1), "10~");
        assert_eq!(i.state().buffer.lines(), vec!["hELLO"]);
        assert_eq!(i.state().cursor, Position::new(1, 4));
    }

    #[test]
    fn join_count() {
        let i = run(&["a", "b", "c"], Position::new(1, 0), "3J");
        assert_eq!(i.state().buffer.lines(), vec!["a b c"]);
        let i = run(&["a", "b"], Position::new(2, 0), "J");
        assert_eq!(i.last_error(), Some(&OpError::CannotJoin));
        let i = run(&["a", "  b"], Position::new(1, 0), "gJ");
        assert_eq!(i.state().buffer.lines(), vec!["a  b"]);
    }

    #[test]
    fn ctrl_a_with_count() {
        let i = run(&["x = 5;"], Position::new(1, 0), "10<C-a>");
        assert_eq!(i.state().buffer.lines(), vec!["x = 15;"]);
        let i = run(&["x = 5;"], Position::new(1, 0), "<C-x>");
        assert_eq!(i.state().buffer.lines(), vec!["x = 4;"]);
    }

    #[test]
    fn colon_with_count_requests_a_range() {
        let ex = RecordingEx::default();
        let mut i = interp(&["a", "b", "c", "d"], Position::new(2, 0)).with_ex_sink(ex.clone());
        i.run(&mut ScriptedKeys::parse("3:").unwrap());
        let requests = ex.requests.borrow();
        assert_eq!(requests[0].command, ".,.+2");
        assert_eq!(requests[0].range, Some((2, 4)));
    }

    #[test]
    fn window_commands_are_unsupported() {
        let i = run(&["a"], Position::new(1, 0), "2<C-w>3j");
        assert!(matches!(i.last_error(), Some(OpError::Unsupported(_))));
        assert_eq!(i.state().beeps, 1);
    }
}
