//! Insert mode, reduced to what the change commands need: typing text,
//! splitting lines and taking back what was typed.
//!
//! The undo run opened by the command that entered Insert mode stays open
//! until `<Esc>`, so `cw` plus the typed replacement undo as one step.

use super::Interpreter;
use crate::{InsertKind, OpError};
use core_events::{KeyCode, KeyEvent};
use core_state::Mode;
use core_text::{LineStore, Position, grapheme, motion::first_non_blank, width};
use tracing::{debug, trace};

#[derive(Debug, Clone, Default)]
pub(super) struct InsertSession {
    /// Text typed so far; `\n` marks a line split.
    typed: String,
}

impl Interpreter {
    /// Enter Insert mode with the cursor at `at`.
    pub(super) fn start_insert(&mut self, at: Position) {
        self.state.mode = Mode::Insert;
        self.state.cursor = at;
        self.state.clamp_cursor();
        self.insert = Some(InsertSession::default());
        debug!(target: "actions.dispatch", line = at.line, byte = at.byte, "insert_start");
    }

    pub(super) fn insert_command(&mut self, kind: InsertKind) -> Result<(), OpError> {
        let cur = self.state.cursor;
        let line = self.state.cur_line();
        let at = match kind {
            InsertKind::Before => cur,
            InsertKind::After if line.is_empty() => cur,
            InsertKind::After => Position::new(cur.line, grapheme::next_boundary(&line, cur.byte)),
            InsertKind::LineStart => Position::new(cur.line, first_non_blank(&line)),
            InsertKind::LineEnd => Position::new(cur.line, line.len()),
            InsertKind::OpenBelow => {
                self.state.save_for_undo(cur.line, cur.line)?;
                self.state.buffer.append_after(cur.line, "");
                self.redraw.mark_dirty(cur.line + 1, self.state.line_count());
                Position::new(cur.line + 1, 0)
            }
            InsertKind::OpenAbove => {
                self.state.save_for_undo(cur.line, cur.line)?;
                self.state.buffer.append_after(cur.line - 1, "");
                self.redraw.mark_dirty(cur.line, self.state.line_count());
                Position::new(cur.line, 0)
            }
        };
        if matches!(kind, InsertKind::OpenBelow | InsertKind::OpenAbove) {
            self.state.dirty = true;
        }
        self.start_insert(at);
        Ok(())
    }

    pub(super) fn insert_key(&mut self, key: KeyEvent) {
        trace!(target: "actions.dispatch", key = %key, "insert_key");
        let result = match key.code {
            KeyCode::Esc => {
                self.finish_insert();
                Ok(())
            }
            KeyCode::Enter => self.split_line(),
            KeyCode::Backspace => self.erase_typed(),
            KeyCode::Tab => self.insert_char('\t'),
            KeyCode::Char(c) if key.as_char().is_some() => self.insert_char(c),
            _ => Err(OpError::Unsupported(format!("{key} in Insert mode"))),
        };
        if let Err(err) = result {
            self.typeahead.flush();
            self.state.beep();
            self.state.set_message(err.to_string());
            self.last_error = Some(err);
        }
    }

    fn insert_char(&mut self, c: char) -> Result<(), OpError> {
        let cur = self.state.cursor;
        self.state.save_for_undo(cur.line, cur.line)?;
        let mut line = self.state.cur_line();
        line.insert(cur.byte, c);
        self.state.buffer.replace(cur.line, &line);
        self.state.cursor.byte += c.len_utf8();
        if let Some(session) = self.insert.as_mut() {
            session.typed.push(c);
        }
        self.state.dirty = true;
        self.redraw.redraw_cursor_line();
        Ok(())
    }

    fn split_line(&mut self) -> Result<(), OpError> {
        let cur = self.state.cursor;
        self.state.save_for_undo(cur.line, cur.line)?;
        let line = self.state.cur_line();
        let (head, tail) = line.split_at(cur.byte);
        self.state.buffer.replace(cur.line, head);
        self.state.buffer.append_after(cur.line, tail);
        self.state.cursor = Position::new(cur.line + 1, 0);
        if let Some(session) = self.insert.as_mut() {
            session.typed.push('\n');
        }
        self.state.dirty = true;
        self.redraw.mark_dirty(cur.line, self.state.line_count());
        Ok(())
    }

    /// `<BS>` only removes characters typed in this session on the
    /// current line.
    fn erase_typed(&mut self) -> Result<(), OpError> {
        let cur = self.state.cursor;
        let erasable = self
            .insert
            .as_ref()
            .and_then(|s| s.typed.chars().next_back())
            .is_some_and(|c| c != '\n');
        if !erasable || cur.byte == 0 {
            return Err(OpError::MotionFailed);
        }
        self.state.save_for_undo(cur.line, cur.line)?;
        let mut line = self.state.cur_line();
        let start = grapheme::prev_boundary(&line, cur.byte);
        line.replace_range(start..cur.byte, "");
        self.state.buffer.replace(cur.line, &line);
        self.state.cursor.byte = start;
        if let Some(session) = self.insert.as_mut() {
            session.typed.pop();
        }
        self.redraw.redraw_cursor_line();
        Ok(())
    }

    fn finish_insert(&mut self) {
        let typed = self.insert.take().map(|s| s.typed).unwrap_or_default();
        if !typed.is_empty() {
            self.state.registers.set_last_insert(&typed);
        }
        self.state.mode = Mode::Normal;
        let line = self.state.cur_line();
        if self.state.cursor.byte > 0 {
            self.state.cursor.byte = grapheme::prev_boundary(&line, self.state.cursor.byte);
        }
        self.state.clamp_cursor();
        self.state.curswant = width::vcol_at(&line, self.state.cursor.byte, self.options.tabstop);
        self.state.end_command();
        debug!(target: "actions.dispatch", typed = typed.len(), "insert_end");
    }
}
