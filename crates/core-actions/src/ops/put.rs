use super::{OpContext, PutDirection, indent_width, set_indent};
use crate::OpError;
use crate::block::push_spaces;
use core_state::registers::display_name;
use core_state::{Register, RegisterKind};
use core_text::{LineStore, Position, char_cells, grapheme, motion::first_non_blank, width};
use tracing::debug;

/// Insert `count` copies of a register's content at the cursor.
///
/// * char-wise, one line: spliced into the cursor line, cursor on the last
///   inserted character;
/// * char-wise, several lines: the cursor line is split around the text,
///   cursor on the first inserted character;
/// * line-wise: whole lines below (`After`) or above (`Before`) the cursor
///   line, cursor on the first non-blank of the first inserted line. With
///   `fix_indent` the first non-empty inserted line takes the cursor line's
///   indent and the others keep their indent relative to it;
/// * block-wise: each stored line goes into consecutive buffer lines at the
///   cursor's display column, lines appended and short lines padded as
///   needed.
pub fn do_put(
    ctx: &mut OpContext<'_>,
    register: Option<char>,
    direction: PutDirection,
    count: usize,
    fix_indent: bool,
) -> Result<(), OpError> {
    let count = count.max(1);
    let source = ctx.state.registers.select(register, false)?;
    let content = ctx
        .state
        .registers
        .read(source)
        .cloned()
        .ok_or(OpError::EmptyRegister(display_name(register)))?;

    let cursor = ctx.state.cursor;
    ctx.state.save_for_undo(cursor.line, cursor.line)?;
    let old_count = ctx.state.buffer.line_count();
    debug!(
        target: "actions.ops",
        register = %source.slot.name(),
        kind = content.kind.as_str(),
        count,
        before = direction == PutDirection::Before,
        "put"
    );
    match content.kind {
        RegisterKind::Block => put_block(ctx, &content, direction, count),
        RegisterKind::Char if content.lines.len() == 1 => {
            put_chars_inline(ctx, &content.lines[0], direction, count)
        }
        RegisterKind::Char => put_chars_split(ctx, &content, direction, count),
        RegisterKind::Line => put_lines(ctx, &content, direction, count, fix_indent),
    }
    ctx.state.dirty = true;
    let added = ctx.state.buffer.line_count() - old_count;
    ctx.more_lines(added as isize);
    Ok(())
}

/// Byte offset where char-wise text goes.
fn insert_col(line: &str, byte: usize, direction: PutDirection) -> usize {
    if direction == PutDirection::After && !line.is_empty() {
        grapheme::next_boundary(line, byte)
    } else {
        byte.min(line.len())
    }
}

fn put_chars_inline(ctx: &mut OpContext<'_>, text: &str, direction: PutDirection, count: usize) {
    let lnum = ctx.state.cursor.line;
    let line = ctx.state.buffer.line(lnum);
    let col = insert_col(&line, ctx.state.cursor.byte, direction);
    let inserted = text.repeat(count);
    let start = Position::new(lnum, col);
    if inserted.is_empty() {
        ctx.state.set_change_marks(start, start);
        return;
    }
    let mut new_line = String::with_capacity(line.len() + inserted.len());
    new_line.push_str(&line[..col]);
    new_line.push_str(&inserted);
    new_line.push_str(&line[col..]);
    ctx.state.buffer.replace(lnum, &new_line);
    let last = grapheme::prev_boundary(&new_line, col + inserted.len());
    ctx.state.cursor = Position::new(lnum, last);
    ctx.state.set_change_marks(start, ctx.state.cursor);
    ctx.redraw.redraw_cursor_line();
}

fn put_chars_split(ctx: &mut OpContext<'_>, content: &Register, direction: PutDirection, count: usize) {
    let lnum = ctx.state.cursor.line;
    let line = ctx.state.buffer.line(lnum);
    let col = insert_col(&line, ctx.state.cursor.byte, direction);

    // Repetitions run into each other: the last line of one copy joins the
    // first line of the next.
    let mut pieces = content.lines.clone();
    for _ in 1..count {
        let mut rest = content.lines.iter();
        if let (Some(last), Some(first)) = (pieces.last_mut(), rest.next()) {
            last.push_str(first);
        }
        pieces.extend(rest.cloned());
    }
    let n = pieces.len();
    let last_len = pieces[n - 1].len();
    pieces[0].insert_str(0, &line[..col]);
    pieces[n - 1].push_str(&line[col..]);

    ctx.state.buffer.replace(lnum, &pieces[0]);
    for (i, piece) in pieces.iter().enumerate().skip(1) {
        ctx.state.buffer.append_after(lnum + i - 1, piece);
    }
    let end_line = lnum + n - 1;
    let end_text = ctx.state.buffer.line(end_line);
    let end = Position::new(end_line, grapheme::prev_boundary(&end_text, last_len));
    ctx.state.cursor = Position::new(lnum, col);
    ctx.state.clamp_cursor();
    ctx.state.set_change_marks(Position::new(lnum, col), end);
    ctx.changed(lnum, end_line);
}

fn put_lines(
    ctx: &mut OpContext<'_>,
    content: &Register,
    direction: PutDirection,
    count: usize,
    fix_indent: bool,
) {
    let ts = ctx.opts.tabstop;
    let cursor_line = ctx.state.cursor.line;
    let orig_indent = indent_width(&ctx.state.buffer.line(cursor_line), ts);
    let mut lnum = match direction {
        PutDirection::After => cursor_line,
        PutDirection::Before => cursor_line - 1,
    };
    let first = lnum + 1;
    let mut indent_diff: Option<isize> = None;
    for _ in 0..count {
        for text in &content.lines {
            let text = if fix_indent {
                reindent(text, orig_indent, &mut indent_diff, ts)
            } else {
                text.clone()
            };
            ctx.state.buffer.append_after(lnum, &text);
            lnum += 1;
        }
    }
    let first_text = ctx.state.buffer.line(first);
    ctx.state.cursor = Position::new(first, first_non_blank(&first_text));
    ctx.state.clamp_cursor();
    let last_text = ctx.state.buffer.line(lnum);
    ctx.state
        .set_change_marks(Position::new(first, 0), Position::new(lnum, grapheme::last_start(&last_text)));
    ctx.changed(first, lnum);
}

fn reindent(text: &str, orig_indent: usize, diff: &mut Option<isize>, ts: usize) -> String {
    if text.is_empty() {
        return String::new();
    }
    let own = indent_width(text, ts) as isize;
    let indent = match *diff {
        None => {
            *diff = Some(orig_indent as isize - own);
            orig_indent as isize
        }
        Some(d) => (own + d).max(0),
    };
    set_indent(text, indent as usize, ts)
}

fn put_block(ctx: &mut OpContext<'_>, content: &Register, direction: PutDirection, count: usize) {
    let ts = ctx.opts.tabstop;
    let cursor = ctx.state.cursor;
    let cur_line = ctx.state.buffer.line(cursor.line);
    let on_char = cursor.byte < cur_line.len();
    let col = if direction == PutDirection::After && on_char {
        width::char_span(&cur_line, cursor.byte, ts).1
    } else {
        width::vcol_at(&cur_line, cursor.byte, ts)
    };

    let mut cursor_byte = 0;
    let mut end = cursor;
    for (i, text) in content.lines.iter().enumerate() {
        let lnum = cursor.line + i;
        if lnum > ctx.state.buffer.line_count() {
            let last = ctx.state.buffer.line_count();
            ctx.state.buffer.append_after(last, "");
        }
        let old = ctx.state.buffer.line(lnum);
        let mut vcol = 0;
        let mut text_col = 0;
        let mut incr = 0;
        let mut last_len = 0;
        for c in old.chars() {
            if vcol >= col {
                break;
            }
            incr = char_cells(c, vcol, ts);
            vcol += incr;
            last_len = c.len_utf8();
            text_col += last_len;
        }
        let (mut lead, mut trail, mut removed) = (0, 0, 0);
        if vcol < col {
            lead = col - vcol;
        } else if vcol > col {
            // A wide character straddles the column: split it into spaces.
            trail = vcol - col;
            lead = incr - trail;
            text_col -= last_len;
            removed = last_len;
        }
        let inserted = text.repeat(count);
        let mut new_line = String::with_capacity(old.len() + inserted.len() + lead + trail);
        new_line.push_str(&old[..text_col]);
        push_spaces(&mut new_line, lead);
        new_line.push_str(&inserted);
        push_spaces(&mut new_line, trail);
        new_line.push_str(&old[text_col + removed..]);
        ctx.state.buffer.replace(lnum, &new_line);
        if i == 0 {
            cursor_byte = text_col + lead;
        }
        let total = inserted.len() + lead + trail;
        end = Position::new(lnum, (text_col + total).saturating_sub(1));
    }

    ctx.state.cursor = Position::new(cursor.line, cursor_byte);
    ctx.state.clamp_cursor();
    let start = ctx.state.cursor;
    ctx.state.set_change_marks(start, end);
    ctx.changed(cursor.line, end.line);
}
