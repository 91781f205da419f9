//! Visual mode.
//!
//! The selection runs from the anchor (where Visual mode started) to the
//! active end, which follows the cursor. An operator takes the selection as
//! its range instead of waiting for a motion, then Visual mode ends.

use super::Interpreter;
use super::operator::OperatorCall;
use crate::key_translator::ParsedCommand;
use crate::ops::do_join;
use crate::span_resolver::{self, OpRange};
use crate::{Command, Motion, OpError, OperatorKind};
use core_state::{Mode, VisualMode, VisualSelection};
use tracing::debug;

impl Interpreter {
    pub(super) fn start_visual(&mut self, mode: VisualMode) {
        debug!(target: "actions.dispatch", ?mode, line = self.state.cursor.line, "visual_start");
        self.state.visual = Some(VisualSelection::new(self.state.cursor, mode));
        self.state.mode = Mode::Visual;
    }

    /// Leave Visual mode, recording the `'<` / `'>` marks.
    pub(super) fn end_visual(&mut self) {
        if let Some(sel) = self.state.visual.take() {
            let (start, end) = sel.ordered();
            self.state.marks.visual_start = Some(start);
            self.state.marks.visual_end = Some(end);
        }
        self.state.mode = Mode::Normal;
        self.state.clamp_cursor();
    }

    pub(super) fn visual_command(&mut self, parsed: ParsedCommand) -> Result<(), OpError> {
        let ParsedCommand {
            count,
            register,
            command,
        } = parsed;
        match command {
            Command::Motion(m) => {
                self.move_cursor(m, count)?;
                if let Some(sel) = self.state.visual.as_mut() {
                    sel.active = self.state.cursor;
                    if sel.mode == VisualMode::Block {
                        match m {
                            Motion::LineEnd => sel.to_eol = true,
                            Motion::Up | Motion::Down => {}
                            _ => sel.to_eol = false,
                        }
                    }
                }
                Ok(())
            }
            Command::Visual(mode) => {
                if self.state.visual.is_some_and(|sel| sel.mode == mode) {
                    self.end_visual();
                } else if let Some(sel) = self.state.visual.as_mut() {
                    sel.mode = mode;
                }
                Ok(())
            }
            Command::SwapEnds => {
                if let Some(sel) = self.state.visual.as_mut() {
                    std::mem::swap(&mut sel.anchor, &mut sel.active);
                    self.state.cursor = sel.active;
                }
                Ok(())
            }
            Command::Cancel => {
                self.end_visual();
                Ok(())
            }
            Command::Operator(op) => self.visual_operator(op, count, register, false),
            Command::DeleteChar => self.visual_operator(OperatorKind::Delete, count, register, false),
            Command::Substitute => self.visual_operator(OperatorKind::Change, count, register, false),
            Command::DeleteCharBefore | Command::DeleteToEnd => {
                self.visual_operator(OperatorKind::Delete, count, register, true)
            }
            Command::YankLine => self.visual_operator(OperatorKind::Yank, count, register, true),
            Command::ChangeToEnd | Command::SubstituteLine | Command::ReplaceLines => {
                self.visual_operator(OperatorKind::Change, count, register, true)
            }
            Command::ExCommand => self.visual_operator(OperatorKind::RunEx, count, register, true),
            Command::Join { spaces } => {
                let (first, last) = self.selected_lines();
                self.end_visual();
                let n = (last - first + 1).max(2);
                let result = do_join(&mut self.ctx(), first, n, spaces);
                if result.is_err() {
                    self.state.cursor.line = first;
                    self.state.clamp_cursor();
                }
                result
            }
            Command::Redo => {
                self.end_visual();
                self.redo(1)
            }
            other => Err(OpError::Unsupported(format!("{other:?} in Visual mode"))),
        }
    }

    fn selected_lines(&self) -> (usize, usize) {
        self.state
            .visual
            .map(|sel| {
                let (start, end) = sel.ordered();
                (start.line, end.line)
            })
            .unwrap_or((self.state.cursor.line, self.state.cursor.line))
    }

    /// Run `op` over the selection; `linewise` forces whole lines.
    fn visual_operator(
        &mut self,
        op: OperatorKind,
        count: usize,
        register: Option<char>,
        linewise: bool,
    ) -> Result<(), OpError> {
        let Some(sel) = self.state.visual else {
            return Err(OpError::MotionFailed);
        };
        let mut range = span_resolver::from_visual(&self.state.buffer, &sel, self.options.tabstop);
        if linewise && sel.mode != VisualMode::Line {
            range = OpRange {
                is_visual: true,
                ..OpRange::lines(range.start.line, range.end.line)
            };
        }
        self.end_visual();
        self.run_operator(OperatorCall {
            op,
            range,
            count: count.max(1),
            register,
            lineop: false,
        })
    }
}
