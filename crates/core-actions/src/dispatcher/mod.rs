//! The command interpreter.
//!
//! [`Interpreter`] owns the editor state and the pending-operator state
//! machine. Each [`Interpreter::step`] reads one complete command from a
//! [`KeySource`] and runs it:
//! * motions move the cursor, or complete a pending operator;
//! * operator keys park in [`State::Pending`] until their motion arrives
//!   (the same key again makes the operator line-wise over `count` lines);
//! * everything else acts immediately.
//!
//! Sub-modules:
//! * `motion` - motion targets and the wanted column
//! * `operator` - running an operator over a resolved range
//! * `edit` - Normal mode commands that act immediately
//! * `visual` - Visual mode
//! * `insert` - the small Insert mode entered by `c`, `i`, `o`, ...
//! * `undo` - undo / redo
//! * `macros` - `q` recording and `@` register execution
//!
//! Failures never leave a half-done command behind: the operator state goes
//! back to [`State::Idle`], the register selection is dropped, the editor
//! beeps and the error text becomes the message. Keys still queued by `@`
//! are thrown away.

use crate::collab::{DeclinePrompt, DiscardEx, ExSink, NoopRedraw, Prompt, Redraw};
use crate::key_translator::{ParsedCommand, ReadContext, TranslateError, read_command};
use crate::ops::OpContext;
use crate::span_resolver::{self, OpRange};
use crate::{Command, EditOptions, Motion, OpError, OperatorKind, combine_counts};
use core_events::KeySource;
use core_state::{EditorState, Mode, RegisterError};
use core_text::LineStore;
use tracing::{debug, trace};

mod edit;
mod insert;
mod macros;
mod motion;
mod operator;
mod undo;
mod visual;

pub use macros::{MAX_EXECUTIONS, MAX_TYPEAHEAD};
use macros::{Input, Typeahead};
use motion::FindSpec;
use operator::OperatorCall;

/// Where the pending-operator machine is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum State {
    #[default]
    Idle,
    /// An operator key was typed; the next command must supply its range.
    Pending {
        op: OperatorKind,
        /// Count typed before the operator (0 = none).
        count: usize,
        register: Option<char>,
    },
    /// The operator is running.
    Executing(OperatorKind),
}

/// Outcome of one [`Interpreter::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The key source ran dry.
    Exhausted,
}

pub struct Interpreter {
    state: EditorState,
    options: EditOptions,
    pending: State,
    last_find: Option<FindSpec>,
    insert: Option<insert::InsertSession>,
    last_error: Option<OpError>,
    typeahead: Typeahead,
    redraw: Box<dyn Redraw>,
    prompt: Box<dyn Prompt>,
    ex: Box<dyn ExSink>,
}

impl Interpreter {
    pub fn new(state: EditorState, options: EditOptions) -> Self {
        Self {
            state,
            options,
            pending: State::Idle,
            last_find: None,
            insert: None,
            last_error: None,
            typeahead: Typeahead::default(),
            redraw: Box::new(NoopRedraw),
            prompt: Box::new(DeclinePrompt),
            ex: Box::new(DiscardEx),
        }
    }

    pub fn with_redraw(mut self, redraw: impl Redraw + 'static) -> Self {
        self.redraw = Box::new(redraw);
        self
    }

    pub fn with_prompt(mut self, prompt: impl Prompt + 'static) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn with_ex_sink(mut self, ex: impl ExSink + 'static) -> Self {
        self.ex = Box::new(ex);
        self
    }

    pub fn state(&self) -> &EditorState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut EditorState {
        &mut self.state
    }

    pub fn into_state(self) -> EditorState {
        self.state
    }

    pub fn options(&self) -> &EditOptions {
        &self.options
    }

    pub fn pending(&self) -> State {
        self.pending
    }

    /// Error of the most recent command, if it failed.
    pub fn last_error(&self) -> Option<&OpError> {
        self.last_error.as_ref()
    }

    /// Run commands until the key source is exhausted.
    pub fn run<K: KeySource + ?Sized>(&mut self, keys: &mut K) {
        while self.step(keys) == Flow::Continue {}
    }

    /// Read and execute one command (or one key in Insert mode). Keys
    /// queued by `@` are read before `keys`.
    pub fn step<K: KeySource + ?Sized>(&mut self, keys: &mut K) -> Flow {
        let ctx = ReadContext {
            pending: self.pending_op(),
            visual: self.state.visual.is_some(),
            recording: self.typeahead.is_recording(),
        };
        let mut input = Input::new(&mut self.typeahead, keys);
        if self.state.mode == Mode::Insert {
            let Some(key) = input.next_key() else {
                return Flow::Exhausted;
            };
            self.insert_key(key);
            return Flow::Continue;
        }
        match read_command(&mut input, ctx) {
            Ok(parsed) => {
                self.execute(parsed);
                Flow::Continue
            }
            Err(TranslateError::EndOfInput) => Flow::Exhausted,
            Err(TranslateError::InvalidRegister(c)) => {
                self.last_error = None;
                self.fail(RegisterError::InvalidName(c).into());
                Flow::Continue
            }
        }
    }

    /// Execute an already decoded command.
    pub fn execute(&mut self, parsed: ParsedCommand) {
        trace!(target: "actions.dispatch", ?parsed, state = ?self.pending, "command");
        self.last_error = None;
        self.state.begin_command();
        let result = self.dispatch(parsed);
        // A change that enters Insert mode stays one undo step until <Esc>.
        if self.state.mode != Mode::Insert {
            self.state.end_command();
        }
        if let Err(err) = result {
            self.fail(err);
        }
    }

    fn fail(&mut self, err: OpError) {
        debug!(target: "actions.dispatch", error = %err, state = ?self.pending, "command_failed");
        self.pending = State::Idle;
        self.typeahead.flush();
        self.state.beep();
        self.state.set_message(err.to_string());
        self.last_error = Some(err);
    }

    fn pending_op(&self) -> Option<OperatorKind> {
        match self.pending {
            State::Pending { op, .. } => Some(op),
            _ => None,
        }
    }

    fn ctx(&mut self) -> OpContext<'_> {
        OpContext::new(
            &mut self.state,
            &self.options,
            self.redraw.as_mut(),
            self.prompt.as_mut(),
        )
    }

    fn dispatch(&mut self, parsed: ParsedCommand) -> Result<(), OpError> {
        if let State::Pending {
            op,
            count,
            register,
        } = self.pending
        {
            self.pending = State::Idle;
            return self.complete_operator(op, count, register, parsed);
        }
        if self.state.visual.is_some() {
            return self.visual_command(parsed);
        }
        self.normal_command(parsed)
    }

    fn complete_operator(
        &mut self,
        op: OperatorKind,
        count: usize,
        register: Option<char>,
        parsed: ParsedCommand,
    ) -> Result<(), OpError> {
        let count = combine_counts(count, parsed.count);
        match parsed.command {
            Command::Operator(again) if again == op => self.line_operator(op, count, register),
            Command::Motion(m) => self.motion_operator(op, count, register, m),
            Command::Cancel => Err(OpError::Cancelled),
            Command::Unknown(key) => Err(OpError::NotAMotion(key.to_string())),
            other => Err(OpError::NotAMotion(format!("{other:?}"))),
        }
    }

    /// Doubled operator: `count` whole lines from the cursor line.
    fn line_operator(
        &mut self,
        op: OperatorKind,
        count: usize,
        register: Option<char>,
    ) -> Result<(), OpError> {
        let n = count.max(1);
        let first = self.state.cursor.line;
        let line_count = self.state.buffer.line_count();
        if n > 1 && first >= line_count {
            return Err(OpError::MotionFailed);
        }
        let last = (first + n - 1).min(line_count);
        self.run_operator(OperatorCall {
            op,
            range: OpRange::lines(first, last),
            count: n,
            register,
            lineop: true,
        })
    }

    fn motion_operator(
        &mut self,
        op: OperatorKind,
        count: usize,
        register: Option<char>,
        m: Motion,
    ) -> Result<(), OpError> {
        let target = motion::target(&self.state, &self.options, m, count, Some(op), &mut self.last_find)?;
        let range = span_resolver::resolve(&self.state.buffer, self.state.cursor, target);
        self.run_operator(OperatorCall {
            op,
            range,
            count: count.max(1),
            register,
            lineop: false,
        })
    }

    fn move_cursor(&mut self, m: Motion, count: usize) -> Result<(), OpError> {
        let target = motion::target(&self.state, &self.options, m, count, None, &mut self.last_find)?;
        self.state.cursor = target.pos;
        self.state.clamp_cursor();
        motion::update_curswant(&mut self.state, self.options.tabstop, m, count);
        trace!(
            target: "actions.dispatch",
            motion = ?m,
            line = self.state.cursor.line,
            byte = self.state.cursor.byte,
            "move"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::RecordingEx;
    use core_events::ScriptedKeys;
    use core_state::{RegisterKind, Slot};
    use core_text::{Buffer, Position};
    use pretty_assertions::assert_eq;

    fn interp(lines: &[&str]) -> Interpreter {
        let state = EditorState::new(Buffer::from_lines("t", lines).unwrap());
        Interpreter::new(state, EditOptions::default())
    }

    fn feed(i: &mut Interpreter, script: &str) {
        let mut keys = ScriptedKeys::parse(script).unwrap();
        i.run(&mut keys);
    }

    #[test]
    fn operator_waits_for_its_motion() {
        let mut i = interp(&["one two"]);
        let mut keys = ScriptedKeys::parse("d").unwrap();
        assert_eq!(i.step(&mut keys), Flow::Continue);
        assert_eq!(
            i.pending(),
            State::Pending {
                op: OperatorKind::Delete,
                count: 0,
                register: None
            }
        );
        keys.push_script("w").unwrap();
        i.step(&mut keys);
        assert_eq!(i.pending(), State::Idle);
        assert_eq!(i.state().buffer.lines(), vec!["two"]);
        assert_eq!(i.step(&mut keys), Flow::Exhausted);
    }

    #[test]
    fn counts_multiply_across_the_operator() {
        let mut i = interp(&["a b c d e f g h"]);
        feed(&mut i, "3d2w");
        assert_eq!(i.state().buffer.lines(), vec!["g h"]);
    }

    #[test]
    fn failed_motion_clears_pending_and_beeps() {
        let mut i = interp(&["abc"]);
        feed(&mut i, "\"adk");
        assert_eq!(i.pending(), State::Idle);
        assert_eq!(i.last_error(), Some(&OpError::MotionFailed));
        assert_eq!(i.state().beeps, 1);
        assert_eq!(i.state().buffer.lines(), vec!["abc"]);
        assert!(i.state().registers.get(Slot::Named(0)).is_none());
    }

    #[test]
    fn escape_cancels_the_operator() {
        let mut i = interp(&["abc"]);
        feed(&mut i, "d<Esc>");
        assert_eq!(i.pending(), State::Idle);
        assert_eq!(i.last_error(), Some(&OpError::Cancelled));
        assert_eq!(i.state().buffer.lines(), vec!["abc"]);
    }

    #[test]
    fn mismatched_operator_is_not_a_motion() {
        let mut i = interp(&["abc"]);
        feed(&mut i, "dy");
        assert!(matches!(i.last_error(), Some(OpError::NotAMotion(_))));
        assert_eq!(i.pending(), State::Idle);
    }

    #[test]
    fn doubled_operator_is_linewise() {
        let mut i = interp(&["abc", "def", "ghi"]);
        feed(&mut i, "2yy");
        let reg = i.state().registers.get(Slot::Numbered(0)).unwrap();
        assert_eq!(reg.kind, RegisterKind::Line);
        assert_eq!(reg.lines, vec!["abc", "def"]);
        assert_eq!(i.state().cursor, Position::new(1, 0));
    }

    #[test]
    fn invalid_register_signals_failure() {
        let mut i = interp(&["abc"]);
        feed(&mut i, "\"$x");
        assert_eq!(i.state().beeps, 1);
        // The `x` after the bad selector still runs on its own.
        assert_eq!(i.state().buffer.lines(), vec!["bc"]);
    }

    #[test]
    fn filter_operator_emits_an_ex_request() {
        let ex = RecordingEx::default();
        let mut i = interp(&["a", "b", "c"]).with_ex_sink(ex.clone());
        feed(&mut i, "!j");
        let requests = ex.requests.borrow();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].range, Some((1, 2)));
        assert_eq!(requests[0].command, "1,2!");
    }
}
