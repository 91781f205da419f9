//! Undo / redo.
//!
//! The snapshots themselves live in the undo engine inside `EditorState`;
//! this only repeats them `count` times and reports when nothing was left.

use super::Interpreter;
use crate::OpError;
use core_text::LineStore;
use tracing::trace;

impl Interpreter {
    pub(super) fn undo(&mut self, count: usize) -> Result<(), OpError> {
        let done = (0..count.max(1)).take_while(|_| self.state.undo()).count();
        trace!(target: "actions.dispatch", op = "undo", requested = count, done, "undo");
        if done == 0 {
            return Err(OpError::NothingToUndo);
        }
        self.redraw.mark_dirty(1, self.state.buffer.line_count());
        Ok(())
    }

    pub(super) fn redo(&mut self, count: usize) -> Result<(), OpError> {
        let done = (0..count.max(1)).take_while(|_| self.state.redo()).count();
        trace!(target: "actions.dispatch", op = "redo", requested = count, done, "redo");
        if done == 0 {
            return Err(OpError::NothingToRedo);
        }
        self.redraw.mark_dirty(1, self.state.buffer.line_count());
        Ok(())
    }
}
