#![allow(dead_code)] // Shared across integration tests; each test binary uses a subset of helpers.

use core_actions::collab::{AcceptPrompt, RecordingEx};
use core_actions::{EditOptions, Interpreter};
use core_events::ScriptedKeys;
use core_state::{EditorState, RegisterKind, Slot};
use core_text::{Buffer, Position, width};

/// Interpreter over `lines` with the cursor at (1, 0).
pub fn editor(lines: &[&str]) -> Interpreter {
    editor_with(lines, EditOptions::default())
}

pub fn editor_with(lines: &[&str], opts: EditOptions) -> Interpreter {
    let state = EditorState::new(Buffer::from_lines("t", lines).unwrap());
    Interpreter::new(state, opts)
}

/// Interpreter whose Ex requests are recorded into the returned sink.
pub fn editor_with_ex(lines: &[&str]) -> (Interpreter, RecordingEx) {
    let ex = RecordingEx::default();
    let interp = editor(lines).with_ex_sink(ex.clone()).with_prompt(AcceptPrompt);
    (interp, ex)
}

/// Feed a key script (`<Esc>`, `<C-v>`, `<CR>` notation) until it runs out.
pub fn feed(interp: &mut Interpreter, script: &str) {
    let mut keys = ScriptedKeys::parse(script).unwrap();
    interp.run(&mut keys);
}

/// Place the cursor and make its display column the wanted one.
pub fn set_cursor(interp: &mut Interpreter, line: usize, byte: usize) {
    let ts = interp.options().tabstop;
    let state = interp.state_mut();
    state.cursor = Position::new(line, byte);
    state.clamp_cursor();
    let text = state.cur_line();
    state.curswant = width::vcol_at(&text, state.cursor.byte, ts);
}

pub fn lines(interp: &Interpreter) -> Vec<String> {
    interp.state().buffer.lines()
}

/// Kind and lines of a register slot, `None` when unset.
pub fn register(interp: &Interpreter, slot: Slot) -> Option<(RegisterKind, Vec<String>)> {
    interp
        .state()
        .registers
        .get(slot)
        .map(|r| (r.kind, r.lines.clone()))
}

pub fn named(c: char) -> Slot {
    Slot::parse(c).unwrap().0
}

/// Expected end state of a scripted scenario.
#[derive(Debug, Default)]
pub struct Expect<'a> {
    pub lines: Option<&'a [&'a str]>,
    pub cursor: Option<(usize, usize)>,
    pub register: Option<(Slot, RegisterKind, &'a [&'a str])>,
    pub beeps: Option<u64>,
}

/// Run `script` over `initial` starting at `cursor` and check `expect`.
pub fn scenario(initial: &[&str], cursor: (usize, usize), script: &str, expect: Expect<'_>) -> Interpreter {
    let mut interp = editor(initial);
    set_cursor(&mut interp, cursor.0, cursor.1);
    feed(&mut interp, script);
    if let Some(want) = expect.lines {
        pretty_assertions::assert_eq!(lines(&interp), want, "buffer after {script:?}");
    }
    if let Some((line, byte)) = expect.cursor {
        pretty_assertions::assert_eq!(interp.state().cursor, Position::new(line, byte), "cursor after {script:?}");
    }
    if let Some((slot, kind, want)) = expect.register {
        let got = register(&interp, slot);
        let want = want.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        pretty_assertions::assert_eq!(got, Some((kind, want)), "register {} after {script:?}", slot.name());
    }
    if let Some(beeps) = expect.beeps {
        pretty_assertions::assert_eq!(interp.state().beeps, beeps, "beeps after {script:?}");
    }
    interp
}
