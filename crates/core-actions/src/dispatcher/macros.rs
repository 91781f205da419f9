//! `q` records typed keys into a register, `@` replays a register as if
//! its text had been typed.
//!
//! Replayed keys go into a typeahead queue that [`Input`] drains before the
//! caller's key source. Only keys taken from the key source are recorded,
//! so a recording that runs `@a` stores `@a`, not what `a` expanded to.
//! A failing command flushes the queue, which is what ends a recursive
//! register.

use super::Interpreter;
use crate::OpError;
use crate::collab::ExRequest;
use core_events::{KeyCode, KeyEvent, KeySource};
use core_state::{Register, RegisterKind, Slot};
use std::collections::VecDeque;
use tracing::debug;

/// Register executions allowed without a key from the key source in between.
pub const MAX_EXECUTIONS: usize = 10_000;
/// Upper bound on queued replay keys.
pub const MAX_TYPEAHEAD: usize = 1 << 20;

#[derive(Debug, Default)]
pub(super) struct Typeahead {
    queue: VecDeque<KeyEvent>,
    /// Executions since the last key from the key source.
    executions: usize,
    last_executed: Option<char>,
    /// The most recent key came from the queue.
    replaying: bool,
    recording: Option<Recording>,
}

#[derive(Debug)]
struct Recording {
    register: char,
    keys: Vec<KeyEvent>,
}

impl Typeahead {
    pub(super) fn is_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub(super) fn flush(&mut self) {
        if !self.queue.is_empty() {
            debug!(target: "actions.dispatch", dropped = self.queue.len(), "typeahead_flushed");
            self.queue.clear();
        }
    }
}

/// Queued replay keys first, then the key source.
pub(super) struct Input<'a, K: ?Sized> {
    typeahead: &'a mut Typeahead,
    source: &'a mut K,
}

impl<'a, K: KeySource + ?Sized> Input<'a, K> {
    pub(super) fn new(typeahead: &'a mut Typeahead, source: &'a mut K) -> Self {
        Self { typeahead, source }
    }
}

impl<K: KeySource + ?Sized> KeySource for Input<'_, K> {
    fn next_key(&mut self) -> Option<KeyEvent> {
        if let Some(key) = self.typeahead.queue.pop_front() {
            self.typeahead.replaying = true;
            return Some(key);
        }
        let key = self.source.next_key()?;
        self.typeahead.replaying = false;
        self.typeahead.executions = 0;
        if let Some(rec) = self.typeahead.recording.as_mut() {
            rec.keys.push(key);
        }
        Some(key)
    }
}

/// Keys that type out `reg`: lines are separated by Enter, and line-wise
/// content ends with one.
fn replay_keys(reg: &Register) -> Vec<KeyEvent> {
    let enter = KeyEvent::named(KeyCode::Enter);
    let mut keys = Vec::new();
    for (i, line) in reg.lines.iter().enumerate() {
        if i > 0 {
            keys.push(enter);
        }
        keys.extend(line.chars().map(KeyEvent::from_register_char));
    }
    if reg.kind == RegisterKind::Line {
        keys.push(enter);
    }
    keys
}

impl Interpreter {
    /// Register being recorded into, if any.
    pub fn recording(&self) -> Option<char> {
        self.typeahead.recording.as_ref().map(|r| r.register)
    }

    /// Keys waiting to be replayed.
    pub fn queued_keys(&self) -> usize {
        self.typeahead.queue.len()
    }

    pub(super) fn start_recording(&mut self, register: char) -> Result<(), OpError> {
        // `q` inside an executed register is ignored.
        if self.typeahead.replaying {
            return Ok(());
        }
        self.state.registers.select(Some(register), true)?;
        self.typeahead.recording = Some(Recording {
            register,
            keys: Vec::new(),
        });
        debug!(target: "actions.dispatch", register = %register, "recording_started");
        self.state.set_message("recording");
        Ok(())
    }

    pub(super) fn stop_recording(&mut self) -> Result<(), OpError> {
        if self.typeahead.replaying {
            return Ok(());
        }
        let Some(Recording { register, mut keys }) = self.typeahead.recording.take() else {
            return Ok(());
        };
        // The `q` that ended the recording.
        keys.pop();
        let text: String = keys.iter().map(KeyEvent::to_register_char).collect();
        self.state.message = None;
        debug!(target: "actions.dispatch", register = %register, keys = keys.len(), "recording_stopped");
        let target = self.state.registers.select(Some(register), true)?;
        self.state.registers.write(target, Register::charwise(&text))?;
        Ok(())
    }

    /// `@x` run `count` times. The replayed keys go ahead of anything
    /// still queued.
    pub(super) fn execute_register(&mut self, name: char, count: usize) -> Result<(), OpError> {
        let name = if name == '@' {
            self.typeahead
                .last_executed
                .ok_or(OpError::NoPreviousRegister)?
        } else {
            name
        };
        self.typeahead.executions += 1;
        if self.typeahead.executions > MAX_EXECUTIONS {
            return Err(OpError::ExecutionLoop);
        }
        if name == ':' {
            self.typeahead.last_executed = Some(name);
            return self.repeat_ex(count);
        }

        let r = self.state.registers.select(Some(name), false)?;
        self.typeahead.last_executed = Some(name);
        let reg = self
            .state
            .registers
            .read(r)
            .ok_or(OpError::EmptyRegister(name))?;
        let keys = replay_keys(reg);
        let queued = self.typeahead.queue.len();
        if keys.len().saturating_mul(count).saturating_add(queued) > MAX_TYPEAHEAD {
            return Err(OpError::TypeaheadFull);
        }
        let rest = std::mem::take(&mut self.typeahead.queue);
        let queue = &mut self.typeahead.queue;
        for _ in 0..count {
            queue.extend(keys.iter().copied());
        }
        queue.extend(rest);
        debug!(
            target: "actions.dispatch",
            register = %name,
            keys = keys.len(),
            count,
            "execute_register"
        );
        Ok(())
    }

    /// `@:` hands the last Ex command line back to the Ex layer.
    fn repeat_ex(&mut self, count: usize) -> Result<(), OpError> {
        let command = self
            .state
            .registers
            .get(Slot::LastCommand)
            .map(Register::text)
            .ok_or(OpError::EmptyRegister(':'))?;
        for _ in 0..count {
            self.ex.submit(ExRequest {
                range: None,
                command: command.clone(),
            });
        }
        Ok(())
    }
}
