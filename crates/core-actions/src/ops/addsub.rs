use super::OpContext;
use crate::OpError;
use core_text::{LineStore, Position};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Radix {
    Dec,
    Hex,
    Oct,
}

impl Radix {
    fn base(self) -> u64 {
        match self {
            Radix::Dec => 10,
            Radix::Hex => 16,
            Radix::Oct => 8,
        }
    }

    fn is_digit(self, c: u8) -> bool {
        match self {
            Radix::Dec => c.is_ascii_digit(),
            Radix::Hex => c.is_ascii_hexdigit(),
            Radix::Oct => (b'0'..=b'7').contains(&c),
        }
    }
}

/// A number found on a line. `start..end` covers the whole literal
/// (sign or `0x` prefix included), `digits..end` just the digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Number {
    start: usize,
    digits: usize,
    end: usize,
    radix: Radix,
    negative: bool,
}

/// Add `count` to (or subtract it from) the number under or after the
/// cursor. `0x` numbers stay hexadecimal with their letter case, numbers
/// with a leading zero are octal; both keep their width and wrap around as
/// unsigned 64-bit values. Decimal numbers may carry a `-` sign.
pub fn do_addsub(ctx: &mut OpContext<'_>, add: bool, count: usize) -> Result<(), OpError> {
    let lnum = ctx.state.cursor.line;
    let line = ctx.state.buffer.line(lnum);
    let Some(num) = locate(line.as_bytes(), ctx.state.cursor.byte) else {
        return Err(OpError::NoNumber);
    };
    ctx.state.save_for_undo(lnum, lnum)?;

    let digits = &line[num.digits..num.end];
    let magnitude = digits.bytes().fold(0u64, |acc, c| {
        let d = (c as char).to_digit(16).unwrap_or(0) as u64;
        acc.wrapping_mul(num.radix.base()).wrapping_add(d)
    });
    let delta = count as i64;
    let value = if num.negative {
        (magnitude as i64).wrapping_neg()
    } else {
        magnitude as i64
    };
    let value = if add {
        value.wrapping_add(delta)
    } else {
        value.wrapping_sub(delta)
    };

    let mut text = match num.radix {
        Radix::Dec => value.to_string(),
        Radix::Oct => format!("{:o}", value as u64),
        Radix::Hex => {
            let upper = digits
                .chars()
                .rev()
                .find(|c| c.is_ascii_alphabetic())
                .is_some_and(|c| c.is_ascii_uppercase());
            if upper {
                format!("{:X}", value as u64)
            } else {
                format!("{:x}", value as u64)
            }
        }
    };
    if num.radix != Radix::Dec && digits.starts_with('0') && text.len() < digits.len() {
        text = format!("{text:0>width$}", width = digits.len());
    }

    let mut new = String::with_capacity(line.len() + text.len());
    let keep = if num.radix == Radix::Dec { num.start } else { num.digits };
    new.push_str(&line[..keep]);
    new.push_str(&text);
    let cursor = new.len() - 1;
    new.push_str(&line[num.end..]);
    ctx.state.buffer.replace(lnum, &new);
    debug!(target: "actions.ops", add, count, from = &line[num.start..num.end], to = text.as_str(), "addsub");

    ctx.state.cursor = Position::new(lnum, cursor);
    ctx.state.curswant = core_text::width::vcol_at(&new, cursor, ctx.opts.tabstop);
    ctx.state.set_change_marks(Position::new(lnum, num.start), ctx.state.cursor);
    ctx.state.dirty = true;
    ctx.redraw.redraw_cursor_line();
    Ok(())
}

fn prefix_len(radix: Radix) -> usize {
    match radix {
        Radix::Dec => 0,
        Radix::Hex => 2,
        Radix::Oct => 1,
    }
}

/// Find the number under the cursor, or the first one after it.
fn locate(b: &[u8], cursor: usize) -> Option<Number> {
    let at = |i: usize| b.get(i).copied().unwrap_or(0);

    let mut col = cursor.min(b.len());
    while col > 0 && at(col).is_ascii_hexdigit() {
        col -= 1;
    }
    let mut start = if col > 0
        && matches!(at(col), b'x' | b'X')
        && at(col - 1) == b'0'
        && at(col + 1).is_ascii_hexdigit()
    {
        col - 1
    } else {
        let mut col = cursor.min(b.len());
        while col < b.len() && !at(col).is_ascii_digit() {
            col += 1;
        }
        while col > 0 && at(col - 1).is_ascii_digit() {
            col -= 1;
        }
        col
    };
    if !at(start).is_ascii_digit() {
        return None;
    }

    let radix = if at(start) != b'0' {
        Radix::Dec
    } else if matches!(at(start + 1), b'x' | b'X') && at(start + 2).is_ascii_hexdigit() {
        Radix::Hex
    } else if Radix::Oct.is_digit(at(start + 1)) {
        Radix::Oct
    } else {
        Radix::Dec
    };
    let digits = start + prefix_len(radix);
    let mut end = digits;
    while end < b.len() && radix.is_digit(b[end]) {
        end += 1;
    }
    let negative = radix == Radix::Dec && start > 0 && at(start - 1) == b'-';
    if negative {
        start -= 1;
    }
    Some(Number {
        start,
        digits,
        end,
        radix,
        negative,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EditOptions;
    use crate::collab::{DeclinePrompt, NoopRedraw};
    use core_state::EditorState;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn addsub(line: &str, byte: usize, add: bool, count: usize) -> (EditorState, Result<(), OpError>) {
        let mut s = EditorState::new(Buffer::from_lines("t", &[line]).unwrap());
        s.cursor = Position::new(1, byte);
        let opts = EditOptions::default();
        let mut redraw = NoopRedraw;
        let mut prompt = DeclinePrompt;
        let mut ctx = OpContext::new(&mut s, &opts, &mut redraw, &mut prompt);
        let res = do_addsub(&mut ctx, add, count);
        (s, res)
    }

    fn result(line: &str, byte: usize, add: bool, count: usize) -> (String, usize) {
        let (s, res) = addsub(line, byte, add, count);
        res.unwrap();
        (s.buffer.line(1), s.cursor.byte)
    }

    #[test]
    fn decimal_forward_search() {
        assert_eq!(result("x 7 y", 0, true, 1), ("x 8 y".to_string(), 2));
        assert_eq!(result("5", 0, true, 10), ("15".to_string(), 1));
        assert_eq!(result("item 42", 1, false, 2), ("item 40".to_string(), 6));
    }

    #[test]
    fn decimal_sign() {
        assert_eq!(result("val -1", 0, true, 3), ("val 2".to_string(), 4));
        assert_eq!(result("9", 0, false, 10), ("-1".to_string(), 1));
        assert_eq!(result("a-3b", 0, false, 1), ("a-4b".to_string(), 2));
    }

    #[test]
    fn hex_keeps_width_and_case() {
        assert_eq!(result("0x0f", 3, true, 1), ("0x10".to_string(), 3));
        assert_eq!(result("0xFE", 0, true, 1), ("0xFF".to_string(), 3));
        assert_eq!(result("0Xab", 2, true, 1), ("0Xac".to_string(), 3));
        assert_eq!(result("0x00", 0, false, 1), ("0xffffffffffffffff".to_string(), 17));
    }

    #[test]
    fn octal_keeps_leading_zeros() {
        assert_eq!(result("007", 0, true, 1), ("010".to_string(), 2));
        assert_eq!(result("0017", 0, true, 1), ("0020".to_string(), 3));
        // Not octal: a plain decimal number with a leading zero digit run.
        assert_eq!(result("08", 0, true, 1), ("9".to_string(), 0));
    }

    #[test]
    fn no_number_is_an_error() {
        let (s, res) = addsub("abc", 0, true, 1);
        assert_eq!(res, Err(OpError::NoNumber));
        assert_eq!(s.buffer.line(1), "abc");
        let (_, res) = addsub("1 abc", 3, true, 1);
        assert_eq!(res, Err(OpError::NoNumber));
    }
}
