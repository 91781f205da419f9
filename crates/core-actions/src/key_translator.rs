//! Count / register-selector reader.
//!
//! [`read_command`] pulls keys from a [`KeySource`] until one complete
//! Normal or Visual mode command has been typed and returns it as a
//! [`ParsedCommand`]:
//!
//! * A decimal count: `1`-`9` start it, `0` only continues it (a leading `0`
//!   is the line-start motion). Counts clamp at [`MAX_COUNT`].
//! * `"x` selects register `x` for the next command. A count typed before
//!   the selector multiplies the one typed after it.
//! * `CTRL-W` starts a window command; a count typed after it multiplies
//!   the count typed before it.
//! * Commands that take a second key (`f` `F` `t` `T` `g` `[` `]` `q` `@`,
//!   the register selector) read it here.
//!
//! The reader keeps no state between calls: the operator waiting for a
//! motion (if any) is passed in through [`ReadContext`] so that doubled
//! operators (`dd`, `g~~`, `gUU`) decode to the operator itself.

use crate::{Command, InsertKind, Motion, OperatorKind, PutDirection};
use core_events::{KeyCode, KeyEvent, KeySource};
use core_state::VisualMode;
use core_state::registers::is_valid_name;
use thiserror::Error;
use tracing::trace;

pub const MAX_COUNT: usize = 999_999;

/// What the interpreter is doing while the command is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadContext {
    /// Operator waiting for its motion.
    pub pending: Option<OperatorKind>,
    /// A Visual selection is active.
    pub visual: bool,
    /// Keys are being recorded: a lone `q` stops.
    pub recording: bool,
}

/// One decoded command with its count and register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// 0 when no count was typed.
    pub count: usize,
    pub register: Option<char>,
    pub command: Command,
}

impl ParsedCommand {
    /// The count, 1 when none was typed.
    pub fn count1(&self) -> usize {
        self.count.max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("invalid register name: {0}")]
    InvalidRegister(char),
    #[error("end of input")]
    EndOfInput,
}

/// Read one complete command.
pub fn read_command<K: KeySource + ?Sized>(
    keys: &mut K,
    ctx: ReadContext,
) -> Result<ParsedCommand, TranslateError> {
    let mut count = 0usize;
    // Count typed before `"x` or `CTRL-W`; multiplied in at the end.
    let mut multiplier = 0usize;
    let mut register = None;
    let mut window = false;

    loop {
        let key = keys.next_key().ok_or(TranslateError::EndOfInput)?;
        trace!(target: "actions.translate", key = %key, count, "key");

        if let Some(c) = key.as_char()
            && c.is_ascii_digit()
            && (c != '0' || count > 0)
        {
            let digit = c as usize - '0' as usize;
            count = count.saturating_mul(10).saturating_add(digit).min(MAX_COUNT);
            continue;
        }

        if key.as_char() == Some('"') && ctx.pending.is_none() && !window {
            let name = keys.next_key().ok_or(TranslateError::EndOfInput)?;
            match name.as_char() {
                Some(c) if is_valid_name(c, false) => {
                    register = Some(c);
                    multiplier = crate::combine_counts(multiplier, count);
                    count = 0;
                    continue;
                }
                Some(c) => return Err(TranslateError::InvalidRegister(c)),
                None if name.is_esc() => {
                    return Ok(finish(0, 0, None, Command::Cancel));
                }
                None => return Err(TranslateError::InvalidRegister('\0')),
            }
        }

        if key.is_ctrl('w') && !window && ctx.pending.is_none() && !ctx.visual {
            window = true;
            multiplier = crate::combine_counts(multiplier, count);
            count = 0;
            continue;
        }

        let command = if window {
            Command::Window(key)
        } else {
            decode(keys, key, ctx)?
        };
        return Ok(finish(count, multiplier, register, command));
    }
}

fn finish(count: usize, multiplier: usize, register: Option<char>, command: Command) -> ParsedCommand {
    let count = crate::combine_counts(multiplier, count);
    trace!(target: "actions.translate", ?command, count, ?register, "command");
    ParsedCommand {
        count,
        register,
        command,
    }
}

fn decode<K: KeySource + ?Sized>(
    keys: &mut K,
    key: KeyEvent,
    ctx: ReadContext,
) -> Result<Command, TranslateError> {
    use Command as C;
    use Motion as M;

    if key.mods.is_empty() || key.mods == core_events::KeyModifiers::SHIFT {
        match key.code {
            KeyCode::Esc => return Ok(C::Cancel),
            KeyCode::Enter => return Ok(C::Motion(M::NextLineStart)),
            KeyCode::Backspace | KeyCode::Left => return Ok(C::Motion(M::Left)),
            KeyCode::Right => return Ok(C::Motion(M::Right)),
            KeyCode::Up => return Ok(C::Motion(M::Up)),
            KeyCode::Down => return Ok(C::Motion(M::Down)),
            KeyCode::Tab => return Ok(C::Unknown(key)),
            KeyCode::Char(_) => {}
        }
    }

    if key.mods.contains(core_events::KeyModifiers::CTRL) {
        let KeyCode::Char(c) = key.code else {
            return Ok(C::Unknown(key));
        };
        return Ok(match c {
            'a' => C::AddSub { add: true },
            'x' => C::AddSub { add: false },
            'r' => C::Redo,
            'v' => C::Visual(VisualMode::Block),
            'h' => C::Motion(M::Left),
            'j' | 'n' => C::Motion(M::Down),
            'p' => C::Motion(M::Up),
            'm' => C::Motion(M::NextLineStart),
            '[' => C::Cancel,
            _ => C::Unknown(key),
        });
    }

    let Some(c) = key.as_char() else {
        return Ok(C::Unknown(key));
    };

    // Second key of a `g` operator typed again: `g~~`, `guu`, `gUU`, `gqq`, `gww`.
    if let Some(op) = ctx.pending
        && op.g_suffix() == Some(c)
    {
        return Ok(C::Operator(op));
    }
    if let Some(op) = OperatorKind::from_key(c) {
        return Ok(C::Operator(op));
    }

    Ok(match c {
        'h' => C::Motion(M::Left),
        'l' | ' ' => C::Motion(M::Right),
        'j' => C::Motion(M::Down),
        'k' => C::Motion(M::Up),
        '+' => C::Motion(M::NextLineStart),
        '-' => C::Motion(M::PrevLineStart),
        '_' => C::Motion(M::CurrentLine),
        'G' => C::Motion(M::GotoLine),
        '0' => C::Motion(M::LineStart),
        '^' => C::Motion(M::FirstNonBlank),
        '|' => C::Motion(M::Column),
        '$' => C::Motion(M::LineEnd),
        'w' => C::Motion(M::WordForward { big: false }),
        'W' => C::Motion(M::WordForward { big: true }),
        'b' => C::Motion(M::WordBackward { big: false }),
        'B' => C::Motion(M::WordBackward { big: true }),
        'e' => C::Motion(M::WordEnd { big: false }),
        'E' => C::Motion(M::WordEnd { big: true }),
        'f' | 'F' | 't' | 'T' => {
            let next = keys.next_key().ok_or(TranslateError::EndOfInput)?;
            match next.as_char() {
                Some(target) => C::Motion(M::FindChar {
                    target,
                    forward: c == 'f' || c == 't',
                    till: c == 't' || c == 'T',
                }),
                None if next.code == KeyCode::Tab => C::Motion(M::FindChar {
                    target: '\t',
                    forward: c == 'f' || c == 't',
                    till: c == 't' || c == 'T',
                }),
                None => C::Cancel,
            }
        }
        ';' => C::Motion(M::RepeatFind { reverse: false }),
        ',' => C::Motion(M::RepeatFind { reverse: true }),
        'g' => {
            let next = keys.next_key().ok_or(TranslateError::EndOfInput)?;
            match next.as_char() {
                Some('g') => C::Motion(M::GotoFirstLine),
                Some('J') => C::Join { spaces: false },
                Some(k) => match OperatorKind::from_g_key(k) {
                    Some(op) => C::Operator(op),
                    None => C::Unknown(next),
                },
                None if next.is_esc() => C::Cancel,
                None => C::Unknown(next),
            }
        }
        '[' | ']' => {
            let next = keys.next_key().ok_or(TranslateError::EndOfInput)?;
            match next.as_char() {
                Some('p') | Some('P') => C::Put {
                    direction: if c == ']' && next.as_char() == Some('p') {
                        PutDirection::After
                    } else {
                        PutDirection::Before
                    },
                    fix_indent: true,
                },
                None if next.is_esc() => C::Cancel,
                _ => C::Unknown(next),
            }
        }
        'x' => C::DeleteChar,
        'X' => C::DeleteCharBefore,
        'D' => C::DeleteToEnd,
        'C' => C::ChangeToEnd,
        's' => C::Substitute,
        'S' => C::SubstituteLine,
        'Y' => C::YankLine,
        'R' if ctx.visual => C::ReplaceLines,
        'p' => C::Put {
            direction: PutDirection::After,
            fix_indent: false,
        },
        'P' => C::Put {
            direction: PutDirection::Before,
            fix_indent: false,
        },
        'J' => C::Join { spaces: true },
        '~' if ctx.visual => C::Operator(OperatorKind::Tilde),
        '~' => C::SwapCase,
        'u' if ctx.visual => C::Operator(OperatorKind::Lower),
        'U' if ctx.visual => C::Operator(OperatorKind::Upper),
        'u' => C::Undo,
        'v' => C::Visual(VisualMode::Char),
        'V' => C::Visual(VisualMode::Line),
        'o' if ctx.visual => C::SwapEnds,
        'i' => C::Insert(InsertKind::Before),
        'a' => C::Insert(InsertKind::After),
        'I' => C::Insert(InsertKind::LineStart),
        'A' => C::Insert(InsertKind::LineEnd),
        'o' => C::Insert(InsertKind::OpenBelow),
        'O' => C::Insert(InsertKind::OpenAbove),
        ':' => C::ExCommand,
        'q' if ctx.pending.is_none() && !ctx.visual && ctx.recording => C::StopRecording,
        'q' | '@' if ctx.pending.is_none() && !ctx.visual => {
            let next = keys.next_key().ok_or(TranslateError::EndOfInput)?;
            match next.as_char() {
                Some(r) if c == 'q' && (r.is_ascii_alphanumeric() || r == '"') => C::Record(r),
                Some(r) if c == '@' && (r == '@' || (r != '%' && is_valid_name(r, false))) => C::Execute(r),
                Some(r) => return Err(TranslateError::InvalidRegister(r)),
                None if next.is_esc() => C::Cancel,
                None => C::Unknown(next),
            }
        }
        _ => C::Unknown(key),
    })
}
