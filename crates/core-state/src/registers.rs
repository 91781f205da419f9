//! Register store.
//!
//! Slots: `0` (yank target and unnamed default), the `1`-`9` delete ring,
//! `a`-`z` (upper case appends), `-` (small deletes), `*` (GUI selection,
//! backed by an optional [`SelectionProvider`]) and the synthesized
//! read-only views `%` (file name), `:` (last Ex command line) and `.`
//! (last inserted text).
//!
//! The unnamed register `"` is not a slot of its own: reads resolve to the
//! most recently written slot, writes go to `0`.

use std::fmt;
use thiserror::Error;
use tracing::{debug, trace};

const RING_LEN: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterKind {
    Char,
    Line,
    Block,
}

impl RegisterKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RegisterKind::Char => "CHAR",
            RegisterKind::Line => "LINE",
            RegisterKind::Block => "BLOCK",
        }
    }
}

/// Register content: a kind plus a non-empty list of lines. For `Char`
/// content the first and last entries may be partial lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub kind: RegisterKind,
    pub lines: Vec<String>,
}

impl Register {
    pub fn new(kind: RegisterKind, lines: Vec<String>) -> Self {
        let lines = if lines.is_empty() {
            vec![String::new()]
        } else {
            lines
        };
        Self { kind, lines }
    }

    /// Char-wise content split on `'\n'`.
    pub fn charwise(text: &str) -> Self {
        Self::new(
            RegisterKind::Char,
            text.split('\n').map(str::to_string).collect(),
        )
    }

    pub fn linewise<S: AsRef<str>>(lines: &[S]) -> Self {
        Self::new(
            RegisterKind::Line,
            lines.iter().map(|l| l.as_ref().to_string()).collect(),
        )
    }

    /// Copy `lines` into register content. Each line is copied into a
    /// fallibly reserved `String` and the running size is checked against
    /// `limit` (0 disables it) before the copy, so oversized content fails
    /// before it is materialized.
    pub fn try_collect<I, S>(kind: RegisterKind, limit: usize, lines: I) -> Result<Self, RegisterError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let lines = lines.into_iter();
        let mut out: Vec<String> = Vec::new();
        out.try_reserve_exact(lines.size_hint().0.max(1))
            .map_err(|_| RegisterError::OutOfMemory)?;
        let mut bytes = 0usize;
        for line in lines {
            let line = line.as_ref();
            bytes = bytes.saturating_add(line.len() + usize::from(!out.is_empty()));
            if limit > 0 && bytes > limit {
                return Err(RegisterError::TooLarge { bytes, limit });
            }
            let mut copy = String::new();
            copy.try_reserve_exact(line.len())
                .map_err(|_| RegisterError::OutOfMemory)?;
            copy.push_str(line);
            out.try_reserve(1).map_err(|_| RegisterError::OutOfMemory)?;
            out.push(copy);
        }
        Ok(Self::new(kind, out))
    }

    pub fn byte_len(&self) -> usize {
        self.lines.iter().map(String::len).sum::<usize>() + self.lines.len() - 1
    }

    /// Text form: lines joined by `'\n'`, line-wise content newline-terminated.
    pub fn text(&self) -> String {
        let mut s = self.lines.join("\n");
        if self.kind == RegisterKind::Line {
            s.push('\n');
        }
        s
    }
}

/// Storage slot behind a register name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    /// `0`-`9`.
    Numbered(u8),
    /// `a`-`z` as 0-25.
    Named(u8),
    SmallDelete,
    Selection,
    FileName,
    LastCommand,
    LastInsert,
}

impl Slot {
    pub fn name(self) -> char {
        match self {
            Slot::Numbered(n) => (b'0' + n) as char,
            Slot::Named(i) => (b'a' + i) as char,
            Slot::SmallDelete => '-',
            Slot::Selection => '*',
            Slot::FileName => '%',
            Slot::LastCommand => ':',
            Slot::LastInsert => '.',
        }
    }

    pub fn is_read_only(self) -> bool {
        matches!(self, Slot::FileName | Slot::LastCommand | Slot::LastInsert)
    }

    /// Parse an explicit register name (not `"`). The flag is true for the
    /// upper-case append form.
    pub fn parse(c: char) -> Option<(Slot, bool)> {
        match c {
            '0'..='9' => Some((Slot::Numbered(c as u8 - b'0'), false)),
            'a'..='z' => Some((Slot::Named(c as u8 - b'a'), false)),
            'A'..='Z' => Some((Slot::Named(c as u8 - b'A'), true)),
            '-' => Some((Slot::SmallDelete, false)),
            '*' => Some((Slot::Selection, false)),
            '%' => Some((Slot::FileName, false)),
            ':' => Some((Slot::LastCommand, false)),
            '.' => Some((Slot::LastInsert, false)),
            _ => None,
        }
    }
}

/// Name used in user-facing messages for an optional selector.
pub fn display_name(name: Option<char>) -> char {
    name.unwrap_or('"')
}

/// True when `c` names a register usable for reading (or writing, when `writing`).
pub fn is_valid_name(c: char, writing: bool) -> bool {
    c == '"'
        || match Slot::parse(c) {
            Some((slot, _)) => !(writing && slot.is_read_only()),
            None => false,
        }
}

/// A resolved register selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterRef {
    pub slot: Slot,
    pub append: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegisterError {
    #[error("invalid register name: '{0}'")]
    InvalidName(char),
    #[error("register '{0}' is read-only")]
    ReadOnly(char),
    #[error("register content too large ({bytes} bytes, limit {limit})")]
    TooLarge { bytes: usize, limit: usize },
    #[error("out of memory while building register content")]
    OutOfMemory,
}

/// GUI selection collaborator backing the `*` register.
pub trait SelectionProvider {
    /// Current selection owned by another application, if any.
    fn fetch(&mut self) -> Option<Register>;
    /// Called after the editor wrote `*`.
    fn own(&mut self, content: &Register);
}

/// Registers 1-9: a fixed ring with a write cursor. Slot 1 is at `head`.
#[derive(Debug, Clone, Default)]
struct NumberedRing {
    slots: [Option<Register>; RING_LEN],
    head: usize,
}

impl NumberedRing {
    fn index(&self, n: usize) -> usize {
        (self.head + n - 1) % RING_LEN
    }

    fn get(&self, n: usize) -> Option<&Register> {
        self.slots[self.index(n)].as_ref()
    }

    fn set(&mut self, n: usize, content: Register) {
        let idx = self.index(n);
        self.slots[idx] = Some(content);
    }

    /// Shift 1->2 ... 8->9 by moving the cursor back one place; the old
    /// slot 9 becomes the new slot 1 and is overwritten.
    fn push(&mut self, content: Register) -> Option<Register> {
        self.head = (self.head + RING_LEN - 1) % RING_LEN;
        self.slots[self.head].replace(content)
    }
}

pub struct Registers {
    yank: Option<Register>,
    ring: NumberedRing,
    named: [Option<Register>; 26],
    small_delete: Option<Register>,
    selection: Option<Register>,
    file_name: Option<Register>,
    last_command: Option<Register>,
    last_insert: Option<Register>,
    /// Most recently written slot; target of unnamed reads.
    previous: Option<Slot>,
    /// 0 disables the limit.
    max_bytes: usize,
    provider: Option<Box<dyn SelectionProvider>>,
}

impl fmt::Debug for Registers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registers")
            .field("yank", &self.yank)
            .field("ring", &self.ring)
            .field("named", &self.named)
            .field("small_delete", &self.small_delete)
            .field("previous", &self.previous)
            .field("max_bytes", &self.max_bytes)
            .finish_non_exhaustive()
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

impl Registers {
    pub fn new() -> Self {
        Self {
            yank: None,
            ring: NumberedRing::default(),
            named: std::array::from_fn(|_| None),
            small_delete: None,
            selection: None,
            file_name: None,
            last_command: None,
            last_insert: None,
            previous: None,
            max_bytes: 0,
            provider: None,
        }
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    /// Per-register size cap in bytes; 0 means unlimited.
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn set_selection_provider(&mut self, provider: Box<dyn SelectionProvider>) {
        self.provider = Some(provider);
    }

    pub fn previous(&self) -> Option<Slot> {
        self.previous
    }

    pub fn set_previous(&mut self, slot: Option<Slot>) {
        self.previous = slot;
    }

    /// Resolve a selector. `None` and `"` mean the unnamed register.
    pub fn select(&mut self, name: Option<char>, for_write: bool) -> Result<RegisterRef, RegisterError> {
        let name = name.filter(|c| *c != '"');
        let Some(c) = name else {
            let slot = if for_write {
                Slot::Numbered(0)
            } else {
                self.previous.unwrap_or(Slot::Numbered(0))
            };
            return Ok(RegisterRef {
                slot,
                append: false,
            });
        };
        let (slot, append) = Slot::parse(c).ok_or(RegisterError::InvalidName(c))?;
        if for_write && slot.is_read_only() {
            return Err(RegisterError::ReadOnly(c));
        }
        if !for_write
            && slot == Slot::Selection
            && let Some(provider) = self.provider.as_mut()
            && let Some(content) = provider.fetch()
        {
            trace!(target: "state.registers", lines = content.lines.len(), "selection_fetched");
            self.selection = Some(content);
        }
        Ok(RegisterRef { slot, append })
    }

    pub fn read(&self, r: RegisterRef) -> Option<&Register> {
        self.slot_ref(r.slot)
    }

    pub fn get(&self, slot: Slot) -> Option<&Register> {
        self.slot_ref(slot)
    }

    fn slot_ref(&self, slot: Slot) -> Option<&Register> {
        match slot {
            Slot::Numbered(0) => self.yank.as_ref(),
            Slot::Numbered(n) => self.ring.get(n as usize),
            Slot::Named(i) => self.named[i as usize].as_ref(),
            Slot::SmallDelete => self.small_delete.as_ref(),
            Slot::Selection => self.selection.as_ref(),
            Slot::FileName => self.file_name.as_ref(),
            Slot::LastCommand => self.last_command.as_ref(),
            Slot::LastInsert => self.last_insert.as_ref(),
        }
    }

    fn slot_mut(&mut self, slot: Slot) -> &mut Option<Register> {
        match slot {
            Slot::Numbered(0) => &mut self.yank,
            Slot::Numbered(n) => {
                let idx = self.ring.index(n as usize);
                &mut self.ring.slots[idx]
            }
            Slot::Named(i) => &mut self.named[i as usize],
            Slot::SmallDelete => &mut self.small_delete,
            Slot::Selection => &mut self.selection,
            Slot::FileName => &mut self.file_name,
            Slot::LastCommand => &mut self.last_command,
            Slot::LastInsert => &mut self.last_insert,
        }
    }

    fn check_size(&self, content: &Register) -> Result<(), RegisterError> {
        let bytes = content.byte_len();
        if self.max_bytes > 0 && bytes > self.max_bytes {
            return Err(RegisterError::TooLarge {
                bytes,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Store `content` into the referenced slot, appending when the selector
    /// used the upper-case form. The written slot becomes the unnamed target.
    pub fn write(&mut self, r: RegisterRef, content: Register) -> Result<(), RegisterError> {
        if r.slot.is_read_only() {
            return Err(RegisterError::ReadOnly(r.slot.name()));
        }
        let merged = if r.append {
            append_content(self.slot_ref(r.slot), content)
        } else {
            content
        };
        self.check_size(&merged)?;
        if r.slot == Slot::Selection
            && let Some(provider) = self.provider.as_mut()
        {
            provider.own(&merged);
        }
        trace!(
            target: "state.registers",
            register = %r.slot.name(),
            kind = merged.kind.as_str(),
            lines = merged.lines.len(),
            append = r.append,
            "write"
        );
        *self.slot_mut(r.slot) = Some(merged);
        self.previous = Some(r.slot);
        Ok(())
    }

    /// Shift the delete ring and store `content` as register 1 in one step.
    /// On error nothing is rotated.
    pub fn rotate_numbered(&mut self, content: Register) -> Result<(), RegisterError> {
        self.check_size(&content)?;
        let dropped = self.ring.push(content);
        self.previous = Some(Slot::Numbered(1));
        debug!(target: "state.registers", dropped = dropped.is_some(), "rotate_numbered");
        Ok(())
    }

    /// Put content back into a slot without append or size handling
    /// (history restore).
    pub fn restore(&mut self, slot: Slot, content: Register) {
        if slot.is_read_only() {
            return;
        }
        *self.slot_mut(slot) = Some(content);
    }

    pub fn set_file_name(&mut self, name: Option<&str>) {
        self.file_name = name.map(Register::charwise);
    }

    pub fn set_last_command(&mut self, cmdline: &str) {
        self.last_command = Some(Register::charwise(cmdline));
    }

    pub fn set_last_insert(&mut self, text: &str) {
        self.last_insert = Some(Register::charwise(text));
    }

    /// Slots that persist across sessions, in history order: `0`-`9`, `a`-`z`, `-`.
    pub fn persistent(&self) -> impl Iterator<Item = (Slot, &Register)> {
        (0..=9u8)
            .map(Slot::Numbered)
            .chain((0..26u8).map(Slot::Named))
            .chain(std::iter::once(Slot::SmallDelete))
            .filter_map(|slot| self.slot_ref(slot).map(|r| (slot, r)))
    }
}

/// One row of the `:display` / `:registers` listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedRegister {
    pub name: char,
    pub kind: RegisterKind,
    /// Printable form: line breaks as `^J`, control characters in caret
    /// notation, cut to the requested width.
    pub text: String,
}

impl fmt::Display for ListedRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}   {}", self.name, self.text)
    }
}

impl Registers {
    /// Non-empty registers in listing order: `"` (the unnamed target),
    /// `0`-`9`, `a`-`z`, `-`, `*`, then `.`, `:` and `%`. With `filter`, only
    /// the names it contains are listed. `width` bounds each row's text in
    /// cells, 0 means no bound.
    pub fn listing(&self, filter: Option<&str>, width: usize) -> Vec<ListedRegister> {
        let filter = filter.filter(|f| !f.is_empty());
        let unnamed = self.previous.unwrap_or(Slot::Numbered(0));
        let slots = std::iter::once(('"', unnamed))
            .chain(
                (0..=9u8)
                    .map(Slot::Numbered)
                    .chain((0..26u8).map(Slot::Named))
                    .chain([
                        Slot::SmallDelete,
                        Slot::Selection,
                        Slot::LastInsert,
                        Slot::LastCommand,
                        Slot::FileName,
                    ])
                    .map(|slot| (slot.name(), slot)),
            );
        let rows: Vec<ListedRegister> = slots
            .filter(|(name, _)| filter.is_none_or(|f| f.contains(*name)))
            .filter_map(|(name, slot)| {
                self.slot_ref(slot).map(|reg| ListedRegister {
                    name,
                    kind: reg.kind,
                    text: printable(reg, width),
                })
            })
            .collect();
        debug!(target: "state.registers", rows = rows.len(), ?filter, "listing");
        rows
    }
}

/// Caret form of register content, at most `width` cells (0: unbounded).
fn printable(reg: &Register, width: usize) -> String {
    let limit = if width == 0 { usize::MAX } else { width };
    let mut out = String::new();
    let mut used = 0usize;
    let mut push = |piece: &str, cells: usize| {
        if used.saturating_add(cells) > limit {
            return false;
        }
        out.push_str(piece);
        used += cells;
        true
    };
    'lines: for (i, line) in reg.lines.iter().enumerate() {
        if i > 0 && !push("^J", 2) {
            break;
        }
        for c in line.chars() {
            let fits = match c {
                '\u{7f}' => push("^?", 2),
                c if c.is_control() && (c as u32) < 0x20 => {
                    let caret = ['^', char::from(c as u8 + 0x40)];
                    push(&String::from_iter(caret), 2)
                }
                c => push(c.encode_utf8(&mut [0; 4]), core_text::width::char_cells(c, 0, 0)),
            };
            if !fits {
                break 'lines;
            }
        }
        if i + 1 == reg.lines.len() && reg.kind == RegisterKind::Line {
            push("^J", 2);
        }
    }
    out
}

/// Append semantics: char onto char joins the boundary lines, equal kinds
/// extend, and mixed kinds become line-wise.
fn append_content(old: Option<&Register>, new: Register) -> Register {
    let Some(old) = old else {
        return new;
    };
    let mut lines = old.lines.clone();
    match (old.kind, new.kind) {
        (RegisterKind::Char, RegisterKind::Char) => {
            let mut rest = new.lines.into_iter();
            if let (Some(last), Some(first)) = (lines.last_mut(), rest.next()) {
                last.push_str(&first);
            }
            lines.extend(rest);
            Register::new(RegisterKind::Char, lines)
        }
        (a, b) if a == b => {
            lines.extend(new.lines);
            Register::new(a, lines)
        }
        _ => {
            lines.extend(new.lines);
            Register::new(RegisterKind::Line, lines)
        }
    }
}
