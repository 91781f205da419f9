//! Key events and the blocking keystroke source.
//!
//! The command engine pulls one key at a time through [`KeySource`]. Tests
//! and the headless driver feed keys from a script written in the familiar
//! angle-bracket notation (`d2w`, `"ayy`, `<C-v>jjd`, `<Esc>`).

use anyhow::{Result, bail};
use std::collections::VecDeque;
use std::fmt;
use tracing::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub code: KeyCode,
    pub mods: KeyModifiers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// KeyCode enumerates normalized logical key representations consumed by higher layers.
pub enum KeyCode {
    Char(char),
    Enter,
    Esc,
    Backspace,
    Tab,
    Up,
    Down,
    Left,
    Right,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const CTRL = 0b0000_0001;
        const ALT  = 0b0000_0010;
        const SHIFT= 0b0000_0100;
    }
}

impl KeyEvent {
    pub fn plain(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            mods: KeyModifiers::empty(),
        }
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c.to_ascii_lowercase()),
            mods: KeyModifiers::CTRL,
        }
    }

    pub fn named(code: KeyCode) -> Self {
        Self {
            code,
            mods: KeyModifiers::empty(),
        }
    }

    /// The printable character for an unmodified `Char` key.
    pub fn as_char(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c) if !self.mods.contains(KeyModifiers::CTRL) => Some(c),
            _ => None,
        }
    }

    /// True for `<C-x>` (case-insensitive on the letter).
    pub fn is_ctrl(&self, c: char) -> bool {
        self.mods.contains(KeyModifiers::CTRL)
            && matches!(self.code, KeyCode::Char(k) if k.eq_ignore_ascii_case(&c))
    }

    pub fn is_esc(&self) -> bool {
        self.code == KeyCode::Esc
    }

    /// The character a recorded key is stored as in a register: control
    /// keys become their control codes, the arrows private-use code points.
    pub fn to_register_char(&self) -> char {
        match self.code {
            KeyCode::Char(c) if self.mods.contains(KeyModifiers::CTRL) => match c {
                '@'..='_' | 'a'..='z' => char::from(c.to_ascii_uppercase() as u8 & 0x1f),
                '?' => '\u{7f}',
                _ => c,
            },
            KeyCode::Char(c) => c,
            KeyCode::Enter => '\r',
            KeyCode::Esc => '\u{1b}',
            KeyCode::Backspace => '\u{8}',
            KeyCode::Tab => '\t',
            KeyCode::Up => ARROW_UP,
            KeyCode::Down => ARROW_DOWN,
            KeyCode::Left => ARROW_LEFT,
            KeyCode::Right => ARROW_RIGHT,
        }
    }

    /// Inverse of [`KeyEvent::to_register_char`]; `'\n'` also reads as Enter
    /// so register text yanked from the buffer replays line breaks.
    pub fn from_register_char(c: char) -> Self {
        let code = match c {
            '\r' | '\n' => KeyCode::Enter,
            '\u{1b}' => KeyCode::Esc,
            '\u{8}' | '\u{7f}' => KeyCode::Backspace,
            '\t' => KeyCode::Tab,
            ARROW_UP => KeyCode::Up,
            ARROW_DOWN => KeyCode::Down,
            ARROW_LEFT => KeyCode::Left,
            ARROW_RIGHT => KeyCode::Right,
            '\u{0}'..='\u{1f}' => return Self::ctrl(char::from(c as u8 | 0x60)),
            _ => KeyCode::Char(c),
        };
        Self::named(code)
    }
}

const ARROW_UP: char = '\u{f700}';
const ARROW_DOWN: char = '\u{f701}';
const ARROW_LEFT: char = '\u{f702}';
const ARROW_RIGHT: char = '\u{f703}';

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.code {
            KeyCode::Char('<') if self.mods.is_empty() => return f.write_str("<lt>"),
            KeyCode::Char(c) if self.mods.contains(KeyModifiers::CTRL) => {
                return write!(f, "<C-{c}>");
            }
            KeyCode::Char(c) => return write!(f, "{c}"),
            KeyCode::Enter => "CR",
            KeyCode::Esc => "Esc",
            KeyCode::Backspace => "BS",
            KeyCode::Tab => "Tab",
            KeyCode::Up => "Up",
            KeyCode::Down => "Down",
            KeyCode::Left => "Left",
            KeyCode::Right => "Right",
        };
        write!(f, "<{name}>")
    }
}

/// Blocking "get next keystroke" collaborator. `None` means the input is exhausted.
pub trait KeySource {
    fn next_key(&mut self) -> Option<KeyEvent>;
}

/// A key source replaying a parsed script.
#[derive(Debug, Default, Clone)]
pub struct ScriptedKeys {
    queue: VecDeque<KeyEvent>,
}

impl ScriptedKeys {
    pub fn parse(script: &str) -> Result<Self> {
        Ok(Self {
            queue: parse_keys(script)?.into(),
        })
    }

    pub fn from_keys(keys: impl IntoIterator<Item = KeyEvent>) -> Self {
        Self {
            queue: keys.into_iter().collect(),
        }
    }

    pub fn push_script(&mut self, script: &str) -> Result<()> {
        self.queue.extend(parse_keys(script)?);
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl KeySource for ScriptedKeys {
    fn next_key(&mut self) -> Option<KeyEvent> {
        let key = self.queue.pop_front();
        if let Some(k) = key {
            trace!(target: "events.keys", key = %k, "next_key");
        }
        key
    }
}

/// Parse key notation: plain characters map to themselves, `<...>` names a
/// special key (`<Esc>`, `<CR>`, `<BS>`, `<Tab>`, `<Up>`, `<lt>`, `<C-x>`).
pub fn parse_keys(script: &str) -> Result<Vec<KeyEvent>> {
    let mut out = Vec::new();
    let mut chars = script.chars();
    while let Some(c) = chars.next() {
        if c != '<' {
            out.push(KeyEvent::plain(c));
            continue;
        }
        let mut name = String::new();
        let mut closed = false;
        for n in chars.by_ref() {
            if n == '>' {
                closed = true;
                break;
            }
            name.push(n);
        }
        if !closed {
            bail!("unterminated key name <{name}");
        }
        out.push(named_key(&name)?);
    }
    Ok(out)
}

fn named_key(name: &str) -> Result<KeyEvent> {
    let lower = name.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("c-") {
        let mut it = rest.chars();
        if let (Some(c), None) = (it.next(), it.next()) {
            return Ok(KeyEvent::ctrl(c));
        }
        bail!("unknown key <{name}>");
    }
    let code = match lower.as_str() {
        "esc" => KeyCode::Esc,
        "cr" | "enter" | "return" => KeyCode::Enter,
        "bs" | "backspace" => KeyCode::Backspace,
        "tab" => KeyCode::Tab,
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "lt" => KeyCode::Char('<'),
        "space" => KeyCode::Char(' '),
        _ => bail!("unknown key <{name}>"),
    };
    Ok(KeyEvent::named(code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_event_display() {
        assert_eq!(KeyEvent::ctrl('V').to_string(), "<C-v>");
        assert_eq!(KeyEvent::plain('x').to_string(), "x");
        assert_eq!(KeyEvent::named(KeyCode::Esc).to_string(), "<Esc>");
        assert_eq!(KeyEvent::plain('<').to_string(), "<lt>");
    }

    #[test]
    fn parse_plain_and_named() {
        let keys = parse_keys("\"a2dw<Esc><C-a><lt>").unwrap();
        assert_eq!(keys.len(), 8);
        assert_eq!(keys[0], KeyEvent::plain('"'));
        assert_eq!(keys[5], KeyEvent::named(KeyCode::Esc));
        assert!(keys[6].is_ctrl('a'));
        assert_eq!(keys[7].as_char(), Some('<'));
    }

    #[test]
    fn parse_rejects_unknown_names() {
        assert!(parse_keys("<Nope>").is_err());
        assert!(parse_keys("<Esc").is_err());
    }

    #[test]
    fn register_chars_round_trip_recorded_keys() {
        let keys = parse_keys("d2w<Esc><CR><C-v><BS><Tab><Up><Right><lt>").unwrap();
        let text: String = keys.iter().map(KeyEvent::to_register_char).collect();
        assert_eq!(&text[..6], "d2w\u{1b}\r\u{16}");
        let back: Vec<KeyEvent> = text.chars().map(KeyEvent::from_register_char).collect();
        assert_eq!(back, keys);
        assert_eq!(KeyEvent::from_register_char('\n'), KeyEvent::named(KeyCode::Enter));
        assert!(KeyEvent::from_register_char('\u{1}').is_ctrl('a'));
    }

    #[test]
    fn scripted_source_drains_in_order() {
        let mut src = ScriptedKeys::parse("ab").unwrap();
        assert_eq!(src.next_key(), Some(KeyEvent::plain('a')));
        src.push_script("<CR>").unwrap();
        assert_eq!(src.remaining(), 2);
        assert_eq!(src.next_key(), Some(KeyEvent::plain('b')));
        assert_eq!(src.next_key(), Some(KeyEvent::named(KeyCode::Enter)));
        assert_eq!(src.next_key(), None);
    }
}
