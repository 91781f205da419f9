//! Collaborators the command engine calls out to.
//!
//! The engine never draws, asks questions or runs Ex commands itself. The
//! interpreter holds one boxed implementation of each trait; the defaults
//! do nothing (redraw), decline (prompt) and drop requests (Ex sink).

use std::cell::RefCell;
use std::rc::Rc;

/// Screen-update notifications.
pub trait Redraw {
    /// Lines `first..=last` changed (or appeared/disappeared).
    fn mark_dirty(&mut self, first: usize, last: usize);
    /// Only the cursor line needs repainting.
    fn redraw_cursor_line(&mut self) {}
}

#[derive(Debug, Default)]
pub struct NoopRedraw;

impl Redraw for NoopRedraw {
    fn mark_dirty(&mut self, _first: usize, _last: usize) {}
}

/// Redraw events recorded for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedrawEvent {
    Lines(usize, usize),
    CursorLine,
}

/// Records every notification into a shared log.
#[derive(Debug, Default, Clone)]
pub struct RecordingRedraw {
    pub events: Rc<RefCell<Vec<RedrawEvent>>>,
}

impl Redraw for RecordingRedraw {
    fn mark_dirty(&mut self, first: usize, last: usize) {
        self.events.borrow_mut().push(RedrawEvent::Lines(first, last));
    }

    fn redraw_cursor_line(&mut self) {
        self.events.borrow_mut().push(RedrawEvent::CursorLine);
    }
}

/// Yes/no questions (e.g. "cannot yank; delete anyway?").
pub trait Prompt {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Answers "no" to everything.
#[derive(Debug, Default)]
pub struct DeclinePrompt;

impl Prompt for DeclinePrompt {
    fn confirm(&mut self, _question: &str) -> bool {
        false
    }
}

#[derive(Debug, Default)]
pub struct AcceptPrompt;

impl Prompt for AcceptPrompt {
    fn confirm(&mut self, _question: &str) -> bool {
        true
    }
}

/// An Ex command line produced by `!`, `=` and `:` operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExRequest {
    /// Inclusive line range the command applies to.
    pub range: Option<(usize, usize)>,
    /// Full command line text, range prefix included.
    pub command: String,
}

pub trait ExSink {
    fn submit(&mut self, request: ExRequest);
}

#[derive(Debug, Default)]
pub struct DiscardEx;

impl ExSink for DiscardEx {
    fn submit(&mut self, _request: ExRequest) {}
}

#[derive(Debug, Default, Clone)]
pub struct RecordingEx {
    pub requests: Rc<RefCell<Vec<ExRequest>>>,
}

impl ExSink for RecordingEx {
    fn submit(&mut self, request: ExRequest) {
        self.requests.borrow_mut().push(request);
    }
}
