//! Running an operator over a resolved range.

use super::{Interpreter, State};
use crate::collab::ExRequest;
use crate::ops::{CaseOp, delete_for_change, do_delete, do_format, do_join, do_shift, do_tilde, do_yank};
use crate::span_resolver::OpRange;
use crate::{MotionType, OpError, OperatorKind};
use core_text::{LineStore, Position, width};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub(super) struct OperatorCall {
    pub op: OperatorKind,
    pub range: OpRange,
    /// Effective count, at least 1. Only Visual shifts use it directly.
    pub count: usize,
    pub register: Option<char>,
    /// Doubled operator (`dd`, `yy`, ...).
    pub lineop: bool,
}

impl Interpreter {
    pub(super) fn run_operator(&mut self, call: OperatorCall) -> Result<(), OpError> {
        self.pending = State::Executing(call.op);
        let old_cursor = self.state.cursor;
        let result = self.apply_operator(call);
        if result.is_err() {
            self.state.cursor = old_cursor;
        }
        self.pending = State::Idle;
        result
    }

    fn apply_operator(&mut self, call: OperatorCall) -> Result<(), OpError> {
        let OperatorCall {
            op,
            range,
            count,
            register,
            lineop,
        } = call;
        let old_cursor = self.state.cursor;
        let (first, last) = (range.start.line, range.end.line);
        debug!(
            target: "actions.dispatch",
            op = op.keys(),
            first,
            last,
            kind = ?range.motion_type,
            empty = range.empty,
            "operator"
        );
        self.state.cursor = range.start;

        match op {
            OperatorKind::Delete => {
                if !range.empty {
                    do_delete(&mut self.ctx(), &range, register)?;
                }
                self.restore_column(&range);
            }
            OperatorKind::Yank => {
                if !range.empty {
                    do_yank(&mut self.ctx(), &range, register, true)?;
                }
                if lineop {
                    self.state.cursor = old_cursor;
                }
                self.state.clamp_cursor();
            }
            OperatorKind::Change => self.change(&range, register)?,
            OperatorKind::ShiftLeft | OperatorKind::ShiftRight => {
                let amount = if range.is_visual { count } else { 1 };
                do_shift(&mut self.ctx(), first, last, op == OperatorKind::ShiftLeft, amount)?;
                self.restore_column(&range);
            }
            OperatorKind::Join => do_join(&mut self.ctx(), first, last - first + 1, true)?,
            OperatorKind::Tilde | OperatorKind::Upper | OperatorKind::Lower => {
                if !range.empty {
                    let case = match op {
                        OperatorKind::Upper => CaseOp::Upper,
                        OperatorKind::Lower => CaseOp::Lower,
                        _ => CaseOp::Toggle,
                    };
                    do_tilde(&mut self.ctx(), &range, case)?;
                }
                if lineop {
                    self.state.cursor = Position::new(first, old_cursor.byte);
                    self.state.clamp_cursor();
                }
            }
            OperatorKind::Format | OperatorKind::FormatKeepCursor => {
                self.state.cursor = old_cursor;
                do_format(&mut self.ctx(), first, last, op == OperatorKind::FormatKeepCursor)?;
            }
            OperatorKind::Filter | OperatorKind::Reindent | OperatorKind::RunEx => {
                self.request_ex(op, first, last);
                self.state.clamp_cursor();
            }
        }
        Ok(())
    }

    /// Delete the range and start inserting where it began.
    fn change(&mut self, range: &OpRange, register: Option<char>) -> Result<(), OpError> {
        if !range.empty {
            delete_for_change(&mut self.ctx(), range, register)?;
        }
        let first = range.start.line;
        let at = match range.motion_type {
            MotionType::Line => Position::new(first, 0),
            MotionType::Block => {
                let line = self.state.buffer.line(first);
                Position::new(first, width::byte_at_vcol(&line, range.start_vcol, self.options.tabstop))
            }
            MotionType::Char => range.start,
        };
        self.start_insert(at);
        Ok(())
    }

    /// Without `startofline`, line-wise deletes and shifts keep the wanted
    /// column instead of going to the first non-blank.
    fn restore_column(&mut self, range: &OpRange) {
        if self.options.startofline || range.motion_type != MotionType::Line || range.end_adjusted {
            return;
        }
        let line = self.state.cur_line();
        self.state.cursor.byte = width::byte_at_vcol(&line, self.state.curswant, self.options.tabstop);
        self.state.clamp_cursor();
    }

    fn request_ex(&mut self, op: OperatorKind, first: usize, last: usize) {
        let command = match op {
            OperatorKind::Filter => format!("{first},{last}!"),
            OperatorKind::Reindent => format!("{first},{last}!{}", self.options.equalprg),
            _ => format!("{first},{last}"),
        };
        debug!(target: "actions.dispatch", command = command.as_str(), "ex_request");
        self.state.registers.set_last_command(&command);
        self.ex.submit(ExRequest {
            range: Some((first, last)),
            command,
        });
    }
}
