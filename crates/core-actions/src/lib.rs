//! Command interpretation: keystrokes in, buffer mutations out.
//!
//! Layers, bottom-up:
//! * `block` - rectangular selection geometry over tab-expanded lines.
//! * `ops` - operator bodies (`do_yank`, `do_delete`, `do_put`, ...), usable
//!   directly by Ex-command and persistence callers.
//! * `span_resolver` - turns a completed motion or Visual selection into a
//!   normalized [`span_resolver::OpRange`].
//! * `key_translator` - count / register-selector accumulation producing a
//!   tagged [`Command`].
//! * `dispatcher` - the [`dispatcher::Interpreter`] owning the pending-operator
//!   state machine.

pub mod block;
pub mod collab;
pub mod dispatcher;
pub mod key_translator;
pub mod ops;
pub mod span_resolver;

pub use collab::{ExRequest, ExSink, Prompt, Redraw};
pub use dispatcher::{Flow, Interpreter, State};
pub use key_translator::{ParsedCommand, ReadContext, TranslateError, read_command};
pub use ops::{
    CaseOp, OpContext, PutDirection, do_addsub, do_delete, do_format, do_join, do_put, do_shift,
    do_tilde, do_yank,
};
pub use span_resolver::OpRange;

use core_config::Config;
use core_events::KeyEvent;
use core_state::{RegisterError, UndoError, VisualMode};
use thiserror::Error;

/// Operators that wait for a motion (or act on a Visual selection).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Delete,
    Yank,
    Change,
    ShiftLeft,
    ShiftRight,
    Filter,
    Tilde,
    Reindent,
    Format,
    RunEx,
    Upper,
    Lower,
    Join,
    FormatKeepCursor,
}

impl OperatorKind {
    /// Single-key operators.
    pub fn from_key(c: char) -> Option<Self> {
        Some(match c {
            'd' => Self::Delete,
            'y' => Self::Yank,
            'c' => Self::Change,
            '<' => Self::ShiftLeft,
            '>' => Self::ShiftRight,
            '!' => Self::Filter,
            '=' => Self::Reindent,
            _ => return None,
        })
    }

    /// Operators spelled `g` + key.
    pub fn from_g_key(c: char) -> Option<Self> {
        Some(match c {
            '~' => Self::Tilde,
            'u' => Self::Lower,
            'U' => Self::Upper,
            'q' => Self::Format,
            'w' => Self::FormatKeepCursor,
            _ => return None,
        })
    }

    /// Second key of a `g` operator; typing it again while pending doubles it.
    pub fn g_suffix(self) -> Option<char> {
        match self {
            Self::Tilde => Some('~'),
            Self::Lower => Some('u'),
            Self::Upper => Some('U'),
            Self::Format => Some('q'),
            Self::FormatKeepCursor => Some('w'),
            _ => None,
        }
    }

    pub fn keys(self) -> &'static str {
        match self {
            Self::Delete => "d",
            Self::Yank => "y",
            Self::Change => "c",
            Self::ShiftLeft => "<",
            Self::ShiftRight => ">",
            Self::Filter => "!",
            Self::Tilde => "g~",
            Self::Reindent => "=",
            Self::Format => "gq",
            Self::RunEx => ":",
            Self::Upper => "gU",
            Self::Lower => "gu",
            Self::Join => "J",
            Self::FormatKeepCursor => "gw",
        }
    }
}

/// How a range covers text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionType {
    Char,
    Line,
    Block,
}

impl From<VisualMode> for MotionType {
    fn from(mode: VisualMode) -> Self {
        match mode {
            VisualMode::Char => MotionType::Char,
            VisualMode::Line => MotionType::Line,
            VisualMode::Block => MotionType::Block,
        }
    }
}

/// Cursor motions understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Motion {
    Left,
    Right,
    Up,
    Down,
    /// `+` / `<CR>`
    NextLineStart,
    /// `-`
    PrevLineStart,
    /// `_`
    CurrentLine,
    /// `G`
    GotoLine,
    /// `gg`
    GotoFirstLine,
    /// `0`
    LineStart,
    /// `^`
    FirstNonBlank,
    /// `|`
    Column,
    /// `$`
    LineEnd,
    WordForward { big: bool },
    WordBackward { big: bool },
    WordEnd { big: bool },
    FindChar { target: char, forward: bool, till: bool },
    /// `;` (same direction) and `,` (reversed).
    RepeatFind { reverse: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertKind {
    /// `i`
    Before,
    /// `a`
    After,
    /// `I`
    LineStart,
    /// `A`
    LineEnd,
    /// `o`
    OpenBelow,
    /// `O`
    OpenAbove,
}

/// One decoded Normal/Visual mode command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Motion(Motion),
    Operator(OperatorKind),
    /// `x`
    DeleteChar,
    /// `X`
    DeleteCharBefore,
    /// `D`
    DeleteToEnd,
    /// `C`
    ChangeToEnd,
    /// `s`
    Substitute,
    /// `S`
    SubstituteLine,
    /// `Y`
    YankLine,
    /// `R` (Visual only: change whole lines)
    ReplaceLines,
    Put { direction: PutDirection, fix_indent: bool },
    Join { spaces: bool },
    /// `~`
    SwapCase,
    /// `CTRL-A` (add) / `CTRL-X` (subtract)
    AddSub { add: bool },
    Undo,
    Redo,
    Visual(VisualMode),
    /// `o` in Visual mode.
    SwapEnds,
    Insert(InsertKind),
    /// `:`
    ExCommand,
    /// `q{reg}`: start recording typed keys into a register.
    Record(char),
    /// `q` while recording.
    StopRecording,
    /// `@{reg}`: replay a register as typed keys. `@@` repeats the last
    /// one, `@:` the last Ex command line.
    Execute(char),
    /// `CTRL-W` + key; window commands are not part of this engine.
    Window(KeyEvent),
    /// `<Esc>`
    Cancel,
    Unknown(KeyEvent),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error("nothing in register {0}")]
    EmptyRegister(char),
    #[error(transparent)]
    Register(#[from] RegisterError),
    #[error(transparent)]
    Undo(#[from] UndoError),
    #[error("motion failed")]
    MotionFailed,
    #[error("nothing to delete on an empty line")]
    EmptyLine,
    #[error("cannot join past the last line")]
    CannotJoin,
    #[error("no number under or after the cursor")]
    NoNumber,
    #[error("command aborted")]
    Aborted,
    #[error("command cancelled")]
    Cancelled,
    #[error("{0} does not complete an operator")]
    NotAMotion(String),
    #[error("unsupported command: {0}")]
    Unsupported(String),
    #[error("already at oldest change")]
    NothingToUndo,
    #[error("already at newest change")]
    NothingToRedo,
    #[error("no previously executed register")]
    NoPreviousRegister,
    #[error("register execution does not terminate")]
    ExecutionLoop,
    #[error("too many keys queued for replay")]
    TypeaheadFull,
}

/// Editing options consumed by the operators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOptions {
    pub tabstop: usize,
    pub shiftwidth: usize,
    pub shiftround: bool,
    pub joinspaces: bool,
    /// Already resolved: never 0.
    pub textwidth: usize,
    pub startofline: bool,
    pub report: usize,
    pub equalprg: String,
}

impl From<&Config> for EditOptions {
    fn from(cfg: &Config) -> Self {
        let editing = &cfg.file.editing;
        Self {
            tabstop: cfg.effective_tabstop,
            shiftwidth: cfg.effective_shiftwidth,
            shiftround: editing.shiftround,
            joinspaces: editing.joinspaces,
            textwidth: cfg.effective_textwidth,
            startofline: editing.startofline,
            report: editing.report,
            equalprg: editing.equalprg.clone(),
        }
    }
}

impl Default for EditOptions {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

/// Product of a count typed before the operator and one typed after it.
/// Zero means "no count"; the result is clamped to 999_999.
pub fn combine_counts(before: usize, after: usize) -> usize {
    match (before, after) {
        (0, n) | (n, 0) => n,
        (a, b) => a.saturating_mul(b).min(key_translator::MAX_COUNT),
    }
}
