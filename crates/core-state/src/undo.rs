use core_text::{Buffer, LineStore, Position};
use std::collections::hash_map::DefaultHasher;
use std::hash::Hasher;
use thiserror::Error;
use tracing::trace;

/// Maximum number of snapshots retained in undo history.
pub const UNDO_HISTORY_MAX: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UndoError {
    #[error("cannot save lines {n1}..={n2} for undo (buffer has {line_count} lines)")]
    InvalidRange {
        n1: usize,
        n2: usize,
        line_count: usize,
    },
}

/// A full-buffer snapshot taken before the first mutation of a command.
#[derive(Clone)]
pub struct EditSnapshot {
    pub buffer: Buffer,
    pub position: Position,
    /// Line range the command announced it would touch.
    pub lines: (usize, usize),
    /// Content hash of the buffer at snapshot capture.
    pub hash: u64,
}

/// Grouping of snapshots: every `snapshot` call inside one run lands in a
/// single undo step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRun {
    Inactive,
    Active { saved: bool },
}

pub struct UndoEngine {
    undo_stack: Vec<EditSnapshot>,
    redo_stack: Vec<EditSnapshot>,
    run: CommandRun,
}

impl Default for UndoEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl UndoEngine {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            run: CommandRun::Inactive,
        }
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }
    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }
    pub fn run(&self) -> CommandRun {
        self.run
    }

    pub fn begin_run(&mut self) {
        if self.run == CommandRun::Inactive {
            self.run = CommandRun::Active { saved: false };
        }
    }

    pub fn end_run(&mut self) {
        self.run = CommandRun::Inactive;
    }

    /// Save lines `n1..=n2` before they are changed. Outside a run every
    /// call is its own undo step.
    pub fn snapshot(
        &mut self,
        n1: usize,
        n2: usize,
        cursor: Position,
        buffer: &Buffer,
    ) -> Result<(), UndoError> {
        check_range(n1, n2, buffer.line_count())?;
        if let CommandRun::Active { saved: true } = self.run {
            trace!(target: "state.undo", n1, n2, "snapshot_coalesced");
            return Ok(());
        }
        self.push_snapshot(cursor, buffer, (n1, n2));
        if let CommandRun::Active { saved } = &mut self.run {
            *saved = true;
        }
        Ok(())
    }

    fn push_snapshot(&mut self, cursor: Position, buffer: &Buffer, lines: (usize, usize)) {
        let current_hash = buffer_hash(buffer);
        if let Some(last) = self.undo_stack.last()
            && last.hash == current_hash
            && self.redo_stack.is_empty()
        {
            trace!(target: "state.undo", undo_depth = self.undo_stack.len(), "snapshot_dedupe_skip");
            return;
        }
        self.undo_stack.push(EditSnapshot {
            buffer: buffer.clone(),
            position: cursor,
            lines,
            hash: current_hash,
        });
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), n1 = lines.0, n2 = lines.1, "push_snapshot");
        if self.undo_stack.len() > UNDO_HISTORY_MAX {
            let _ = self.undo_stack.remove(0);
            trace!(target: "state.undo", "undo_stack_trimmed");
        }
        self.redo_stack.clear();
    }

    pub fn undo(&mut self, cursor: &mut Position, buffer: &mut Buffer) -> bool {
        let Some(last) = self.undo_stack.pop() else {
            return false;
        };
        trace!(target: "state.undo", undo_depth = self.undo_stack.len(), redo_depth = self.redo_stack.len(), "undo_pop");
        self.redo_stack.push(EditSnapshot {
            buffer: buffer.clone(),
            position: *cursor,
            lines: last.lines,
            hash: buffer_hash(buffer),
        });
        *buffer = last.buffer;
        *cursor = last.position;
        true
    }

    pub fn redo(&mut self, cursor: &mut Position, buffer: &mut Buffer) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        trace!(target: "state.undo", redo_depth = self.redo_stack.len(), undo_depth = self.undo_stack.len(), "redo_pop");
        self.undo_stack.push(EditSnapshot {
            buffer: buffer.clone(),
            position: *cursor,
            lines: next.lines,
            hash: buffer_hash(buffer),
        });
        *buffer = next.buffer;
        *cursor = next.position;
        true
    }
}

/// Lines `n1..=n2` must exist in a buffer of `line_count` lines.
pub fn check_range(n1: usize, n2: usize, line_count: usize) -> Result<(), UndoError> {
    if n1 == 0 || n1 > n2 || n2 > line_count {
        return Err(UndoError::InvalidRange { n1, n2, line_count });
    }
    Ok(())
}

fn buffer_hash(buf: &Buffer) -> u64 {
    let mut h = DefaultHasher::new();
    for n in 1..=buf.line_count() {
        h.write(buf.line(n).as_bytes());
        h.write_u8(b'\n');
    }
    h.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buf(lines: &[&str]) -> Buffer {
        Buffer::from_lines("t", lines).unwrap()
    }

    #[test]
    fn snapshot_rejects_bad_ranges() {
        let mut undo = UndoEngine::new();
        let b = buf(&["a", "b"]);
        assert!(undo.snapshot(0, 1, Position::origin(), &b).is_err());
        assert!(undo.snapshot(2, 1, Position::origin(), &b).is_err());
        assert!(undo.snapshot(1, 3, Position::origin(), &b).is_err());
        assert_eq!(undo.undo_depth(), 0);
    }

    #[test]
    fn run_coalesces_snapshots() {
        let mut undo = UndoEngine::new();
        let mut b = buf(&["a", "b"]);
        undo.begin_run();
        undo.snapshot(1, 1, Position::origin(), &b).unwrap();
        b.replace(1, "x");
        undo.snapshot(2, 2, Position::origin(), &b).unwrap();
        b.replace(2, "y");
        undo.end_run();
        assert_eq!(undo.undo_depth(), 1);
        let mut cursor = Position::new(2, 0);
        assert!(undo.undo(&mut cursor, &mut b));
        assert_eq!(b.lines(), vec!["a", "b"]);
        assert_eq!(cursor, Position::origin());
        assert!(undo.redo(&mut cursor, &mut b));
        assert_eq!(b.lines(), vec!["x", "y"]);
    }

    #[test]
    fn unchanged_buffer_is_not_saved_twice() {
        let mut undo = UndoEngine::new();
        let b = buf(&["a"]);
        undo.snapshot(1, 1, Position::origin(), &b).unwrap();
        undo.snapshot(1, 1, Position::origin(), &b).unwrap();
        assert_eq!(undo.undo_depth(), 1);
    }
}
