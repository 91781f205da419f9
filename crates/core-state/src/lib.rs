//! Editor state: buffer, cursor, mode, Visual selection, marks, registers
//! and the undo engine.
//!
//! The command engine in `core-actions` owns one `EditorState` per
//! interpreter instance; nothing here is global. Mutations go through the
//! `LineStore` trait on [`EditorState::buffer`] after a successful
//! [`EditorState::save_for_undo`].

pub mod history;
pub mod registers;
pub mod undo;

pub use registers::{
    ListedRegister, Register, RegisterError, RegisterKind, RegisterRef, Registers, SelectionProvider,
    Slot,
};
pub use undo::{CommandRun, UNDO_HISTORY_MAX, UndoEngine, UndoError};

use core_text::{Buffer, LineStore, Position, grapheme};
use std::path::PathBuf;
use tracing::debug;

/// Current editor mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
    Visual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualMode {
    Char,
    Line,
    Block,
}

/// An active Visual selection. `active` tracks the cursor end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisualSelection {
    pub anchor: Position,
    pub active: Position,
    pub mode: VisualMode,
    /// Block mode after `$`: every line extends to its end.
    pub to_eol: bool,
}

impl VisualSelection {
    pub fn new(anchor: Position, mode: VisualMode) -> Self {
        Self {
            anchor,
            active: anchor,
            mode,
            to_eol: false,
        }
    }

    /// (start, end) in buffer order.
    pub fn ordered(&self) -> (Position, Position) {
        if self.active < self.anchor {
            (self.active, self.anchor)
        } else {
            (self.anchor, self.active)
        }
    }
}

/// Automatic marks maintained by the command engine.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Marks {
    /// `'[`: first position of the last changed or yanked text.
    pub change_start: Option<Position>,
    /// `']`: last position of the last changed or yanked text.
    pub change_end: Option<Position>,
    /// `'<` / `'>`: bounds of the last Visual selection.
    pub visual_start: Option<Position>,
    pub visual_end: Option<Position>,
}

/// Top-level editor state container (single buffer).
pub struct EditorState {
    pub buffer: Buffer,
    pub cursor: Position,
    /// Wanted display column for vertical motions; `usize::MAX` sticks to line end.
    pub curswant: usize,
    pub mode: Mode,
    pub visual: Option<VisualSelection>,
    pub marks: Marks,
    pub file_name: Option<PathBuf>,
    pub dirty: bool,
    pub registers: Registers,
    undo: UndoEngine,
    /// Last informational or error message for the redraw collaborator.
    pub message: Option<String>,
    pub beeps: u64,
}

impl EditorState {
    pub fn new(buffer: Buffer) -> Self {
        Self {
            buffer,
            cursor: Position::origin(),
            curswant: 0,
            mode: Mode::Normal,
            visual: None,
            marks: Marks::default(),
            file_name: None,
            dirty: false,
            registers: Registers::new(),
            undo: UndoEngine::new(),
            message: None,
            beeps: 0,
        }
    }

    pub fn with_file_name(mut self, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        self.registers.set_file_name(path.to_str());
        self.file_name = Some(path);
        self
    }

    pub fn line_count(&self) -> usize {
        self.buffer.line_count()
    }

    pub fn cur_line(&self) -> String {
        self.buffer.line(self.cursor.line)
    }

    pub fn undo_engine(&self) -> &UndoEngine {
        &self.undo
    }

    /// Snapshot lines `n1..=n2` before changing them. Errors abort the command.
    pub fn save_for_undo(&mut self, n1: usize, n2: usize) -> Result<(), UndoError> {
        self.undo.snapshot(n1, n2, self.cursor, &self.buffer)
    }

    /// Fails exactly when `save_for_undo(n1, n2)` would, without saving.
    pub fn check_lines(&self, n1: usize, n2: usize) -> Result<(), UndoError> {
        undo::check_range(n1, n2, self.buffer.line_count())
    }

    /// Group every snapshot until `end_command` into one undo step.
    pub fn begin_command(&mut self) {
        self.undo.begin_run();
    }

    pub fn end_command(&mut self) {
        self.undo.end_run();
    }

    pub fn undo(&mut self) -> bool {
        let done = self.undo.undo(&mut self.cursor, &mut self.buffer);
        if done {
            self.dirty = true;
            self.clamp_cursor();
        }
        done
    }

    pub fn redo(&mut self) -> bool {
        let done = self.undo.redo(&mut self.cursor, &mut self.buffer);
        if done {
            self.dirty = true;
            self.clamp_cursor();
        }
        done
    }

    /// Keep the cursor on a real character: valid line, at most the start
    /// of the last character (Normal mode) or the line end (Insert mode).
    pub fn clamp_cursor(&mut self) {
        let count = self.buffer.line_count();
        self.cursor.line = self.cursor.line.clamp(1, count);
        let line = self.buffer.line(self.cursor.line);
        let max = if self.mode == Mode::Insert {
            line.len()
        } else {
            grapheme::last_start(&line)
        };
        if self.cursor.byte > max {
            self.cursor.byte = max;
        }
        while !line.is_char_boundary(self.cursor.byte) {
            self.cursor.byte -= 1;
        }
    }

    pub fn set_message(&mut self, msg: impl Into<String>) {
        let msg = msg.into();
        debug!(target: "state.message", msg = msg.as_str(), "message");
        self.message = Some(msg);
    }

    pub fn beep(&mut self) {
        self.beeps += 1;
    }

    pub fn set_change_marks(&mut self, start: Position, end: Position) {
        self.marks.change_start = Some(start);
        self.marks.change_end = Some(end);
    }
}
