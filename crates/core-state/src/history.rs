//! Register history persistence.
//!
//! Text format, one record per register:
//!
//! ```text
//! # Registers:
//! ""a	CHAR
//! 	first line
//! 	second line
//! "1	LINE
//! 	deleted line
//! ```
//!
//! A record starts with `"` + name + TAB + kind; an extra leading `"` marks
//! the register the unnamed register pointed at. Content lines are prefixed
//! with one TAB and end at the first line without one. Inside content a
//! Ctrl-V escapes itself and `n` (line feed).

use crate::registers::{Register, RegisterKind, Registers, Slot};
use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::{debug, warn};

const CTRL_V: char = '\u{16}';

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history io: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HistoryReport {
    pub restored: usize,
    pub skipped: usize,
}

pub fn escape_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for c in line.chars() {
        match c {
            CTRL_V => {
                out.push(CTRL_V);
                out.push(CTRL_V);
            }
            '\n' => {
                out.push(CTRL_V);
                out.push('n');
            }
            c => out.push(c),
        }
    }
    out
}

pub fn unescape_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c != CTRL_V {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push(CTRL_V),
        }
    }
    out
}

/// Write every persistent register. `max_lines` truncates long registers;
/// `Some(0)` writes only the section header.
pub fn write_history<W: Write>(
    regs: &Registers,
    out: &mut W,
    max_lines: Option<usize>,
) -> Result<usize, HistoryError> {
    writeln!(out, "# Registers:")?;
    if max_lines == Some(0) {
        return Ok(0);
    }
    let mut written = 0;
    for (slot, content) in regs.persistent() {
        if regs.previous() == Some(slot) {
            write!(out, "\"")?;
        }
        writeln!(out, "\"{}\t{}", slot.name(), content.kind.as_str())?;
        let take = max_lines.unwrap_or(usize::MAX);
        for line in content.lines.iter().take(take) {
            writeln!(out, "\t{}", escape_line(line))?;
        }
        written += 1;
    }
    debug!(target: "state.history", written, "write_history");
    Ok(written)
}

struct Pending {
    slot: Slot,
    kind: RegisterKind,
    previous: bool,
    lines: Vec<String>,
}

/// Read records into `regs`. Unless `force` is set, registers that already
/// hold content keep it. Records with an illegal name are skipped.
pub fn read_history<R: BufRead>(
    regs: &mut Registers,
    input: R,
    force: bool,
) -> Result<HistoryReport, HistoryError> {
    let mut report = HistoryReport::default();
    let mut pending: Option<Pending> = None;
    // Only `\n` ends a line: a carriage return inside content is kept.
    for line in input.split(b'\n') {
        let line = String::from_utf8(line?).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        if let Some(content) = line.strip_prefix('\t') {
            if let Some(p) = pending.as_mut() {
                p.lines.push(unescape_line(content));
            }
            continue;
        }
        if let Some(p) = pending.take() {
            commit(regs, p, force, &mut report);
        }
        let line = line.strip_suffix('\r').unwrap_or(&line);
        let Some(header) = line.strip_prefix('"') else {
            continue;
        };
        match parse_header(header) {
            Some((slot, kind, previous)) => {
                pending = Some(Pending {
                    slot,
                    kind,
                    previous,
                    lines: Vec::new(),
                });
            }
            None => {
                warn!(target: "state.history", record = line, "illegal register name");
                report.skipped += 1;
            }
        }
    }
    if let Some(p) = pending.take() {
        commit(regs, p, force, &mut report);
    }
    debug!(target: "state.history", restored = report.restored, skipped = report.skipped, "read_history");
    Ok(report)
}

fn parse_header(header: &str) -> Option<(Slot, RegisterKind, bool)> {
    let (previous, rest) = match header.strip_prefix('"') {
        Some(rest) => (true, rest),
        None => (false, header),
    };
    let mut chars = rest.chars();
    let name = chars.next()?;
    if !(name.is_ascii_alphanumeric() || name == '-') {
        return None;
    }
    let (slot, _) = Slot::parse(name.to_ascii_lowercase())?;
    let kind_text = chars.as_str().trim_start();
    let kind = if kind_text.starts_with("CHAR") {
        RegisterKind::Char
    } else if kind_text.starts_with("BLOCK") {
        RegisterKind::Block
    } else {
        RegisterKind::Line
    };
    Some((slot, kind, previous))
}

fn commit(regs: &mut Registers, p: Pending, force: bool, report: &mut HistoryReport) {
    if !force && regs.get(p.slot).is_some() {
        report.skipped += 1;
        return;
    }
    if p.previous {
        regs.set_previous(Some(p.slot));
    }
    if p.lines.is_empty() {
        report.skipped += 1;
        return;
    }
    regs.restore(p.slot, Register::new(p.kind, p.lines));
    report.restored += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> Registers {
        let mut regs = Registers::new();
        let r = regs.select(Some('a'), true).unwrap();
        regs.write(r, Register::charwise("tab\there\nnext")).unwrap();
        regs.rotate_numbered(Register::linewise(&["gone line"])).unwrap();
        let r = regs.select(Some('z'), true).unwrap();
        regs.write(r, Register::new(RegisterKind::Block, vec!["ab".into(), "c\u{16}d".into()]))
            .unwrap();
        regs
    }

    #[test]
    fn writes_expected_text() {
        let regs = sample();
        let mut out = Vec::new();
        write_history(&regs, &mut out, None).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "# Registers:\n\"1\tLINE\n\tgone line\n\"a\tCHAR\n\ttab\there\n\tnext\n\"\"z\tBLOCK\n\tab\n\tc\u{16}\u{16}d\n"
        );
    }

    #[test]
    fn round_trip_restores_content_and_previous() {
        let regs = sample();
        let mut out = Vec::new();
        write_history(&regs, &mut out, None).unwrap();
        let mut fresh = Registers::new();
        let report = read_history(&mut fresh, out.as_slice(), false).unwrap();
        assert_eq!(report.restored, 3);
        assert_eq!(fresh.previous(), Some(Slot::Named(25)));
        for (slot, content) in regs.persistent() {
            assert_eq!(fresh.get(slot), Some(content));
        }
    }

    #[test]
    fn illegal_names_and_unknown_kinds() {
        let input = "\"!\tCHAR\n\tlost\n\"b\tWHATEVER\n\tkept\n";
        let mut regs = Registers::new();
        let report = read_history(&mut regs, input.as_bytes(), false).unwrap();
        assert_eq!(report, HistoryReport { restored: 1, skipped: 1 });
        let b = regs.get(Slot::Named(1)).unwrap();
        assert_eq!(b.kind, RegisterKind::Line);
        assert_eq!(b.lines, vec!["kept"]);
    }

    #[test]
    fn existing_content_wins_unless_forced() {
        let mut regs = Registers::new();
        let r = regs.select(Some('c'), true).unwrap();
        regs.write(r, Register::charwise("live")).unwrap();
        let input = "\"c\tCHAR\n\tstale\n";
        read_history(&mut regs, input.as_bytes(), false).unwrap();
        assert_eq!(regs.get(Slot::Named(2)).unwrap().lines, vec!["live"]);
        read_history(&mut regs, input.as_bytes(), true).unwrap();
        assert_eq!(regs.get(Slot::Named(2)).unwrap().lines, vec!["stale"]);
    }

    #[test]
    fn carriage_returns_in_content_survive() {
        let mut regs = Registers::new();
        let r = regs.select(Some('q'), true).unwrap();
        regs.write(r, Register::charwise("dd\r")).unwrap();
        let r = regs.select(Some('l'), true).unwrap();
        regs.write(r, Register::linewise(&["a\r", "\rb"])).unwrap();
        let mut out = Vec::new();
        write_history(&regs, &mut out, None).unwrap();
        let mut fresh = Registers::new();
        read_history(&mut fresh, out.as_slice(), false).unwrap();
        assert_eq!(fresh.get(Slot::Named(16)), Some(&Register::charwise("dd\r")));
        assert_eq!(fresh.get(Slot::Named(11)).unwrap().lines, vec!["a\r", "\rb"]);

        // Headers written with CRLF line ends still parse.
        let mut crlf = Registers::new();
        read_history(&mut crlf, "\"c\tLINE\r\n\tx\n".as_bytes(), false).unwrap();
        assert_eq!(crlf.get(Slot::Named(2)).unwrap().kind, RegisterKind::Line);
    }

    #[test]
    fn escaping_is_reversible() {
        let raw = "a\nb\u{16}c";
        assert_eq!(escape_line(raw), "a\u{16}nb\u{16}\u{16}c");
        assert_eq!(unescape_line(&escape_line(raw)), raw);
    }

    #[test]
    fn max_lines_truncates() {
        let regs = sample();
        let mut out = Vec::new();
        write_history(&regs, &mut out, Some(1)).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(!text.contains("\tnext"));
        let mut out = Vec::new();
        assert_eq!(write_history(&regs, &mut out, Some(0)).unwrap(), 0);
    }
}
