//! Operator bodies.
//!
//! Each `do_*` function performs one complete operation against an
//! [`OpContext`]: it saves the touched lines for undo before the first
//! mutation, updates the `'[`/`']` marks, records report messages and
//! notifies the redraw collaborator. They are callable directly (Ex
//! commands, tests) as well as from the interpreter.

mod addsub;
mod case;
mod delete;
mod format;
mod join;
mod put;
mod shift;
mod yank;

pub use addsub::do_addsub;
pub use case::{CaseOp, do_tilde};
pub(crate) use delete::delete_for_change;
pub use delete::{change_lines, do_delete};
pub use format::do_format;
pub use join::do_join;
pub use put::do_put;
pub use shift::do_shift;
pub use yank::{do_yank, yank_content};

use crate::collab::{Prompt, Redraw};
use crate::span_resolver::OpRange;
use crate::{EditOptions, OpError};
use core_state::EditorState;
use core_text::char_cells;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutDirection {
    /// `P`
    Before,
    /// `p`
    After,
}

/// Everything an operator needs.
pub struct OpContext<'a> {
    pub state: &'a mut EditorState,
    pub opts: &'a EditOptions,
    pub redraw: &'a mut dyn Redraw,
    pub prompt: &'a mut dyn Prompt,
}

impl<'a> OpContext<'a> {
    pub fn new(
        state: &'a mut EditorState,
        opts: &'a EditOptions,
        redraw: &'a mut dyn Redraw,
        prompt: &'a mut dyn Prompt,
    ) -> Self {
        Self {
            state,
            opts,
            redraw,
            prompt,
        }
    }

    /// Report a change of `delta` lines when it exceeds the report threshold.
    pub(crate) fn more_lines(&mut self, delta: isize) {
        let n = delta.unsigned_abs();
        if n <= self.opts.report {
            return;
        }
        let msg = if delta > 0 {
            format!("{n} more line{}", plural(n))
        } else {
            format!("{n} fewer line{}", plural(n))
        };
        self.state.set_message(msg);
    }

    /// Reject ranges reaching outside the buffer before any register is
    /// touched.
    pub(crate) fn check_range(&self, range: &OpRange) -> Result<(), OpError> {
        self.state.check_lines(range.start.line, range.end.line)?;
        Ok(())
    }

    pub(crate) fn changed(&mut self, first: usize, last: usize) {
        self.state.dirty = true;
        self.redraw.mark_dirty(first, last);
    }
}

pub(crate) fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

/// Display width of a line's leading white space.
pub(crate) fn indent_width(line: &str, tabstop: usize) -> usize {
    let mut vcol = 0;
    for c in line.chars() {
        if c != ' ' && c != '\t' {
            break;
        }
        vcol += char_cells(c, vcol, tabstop);
    }
    vcol
}

/// Leading white space `width` cells wide: tabs first, then spaces.
pub(crate) fn build_indent(width: usize, tabstop: usize) -> String {
    let tabstop = tabstop.max(1);
    let mut out = "\t".repeat(width / tabstop);
    out.push_str(&" ".repeat(width % tabstop));
    out
}

/// `line` with its indent replaced by one `width` cells wide.
pub(crate) fn set_indent(line: &str, width: usize, tabstop: usize) -> String {
    let body = line.trim_start_matches([' ', '\t']);
    let mut out = build_indent(width, tabstop);
    out.push_str(body);
    out
}
