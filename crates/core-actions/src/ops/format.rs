use super::OpContext;
use crate::OpError;
use core_text::{LineStore, Position, grapheme, motion::first_non_blank, str_cells};
use tracing::debug;

/// Refill the paragraphs in lines `first..=last` at `textwidth`.
///
/// A paragraph is a run of lines holding something other than white space;
/// blank lines between paragraphs are kept. Every output line of a
/// paragraph gets the indent of its first line. With `keep_cursor` (`gw`)
/// the cursor is restored afterwards, otherwise (`gq`) it moves to the first
/// non-blank of the last formatted line.
pub fn do_format(
    ctx: &mut OpContext<'_>,
    first: usize,
    last: usize,
    keep_cursor: bool,
) -> Result<(), OpError> {
    let last = last.min(ctx.state.buffer.line_count());
    ctx.state.save_for_undo(first, last)?;
    let saved_cursor = ctx.state.cursor;
    let old_count = ctx.state.buffer.line_count();

    let input: Vec<String> = (first..=last).map(|n| ctx.state.buffer.line(n)).collect();
    let output = refill(&input, ctx.opts.textwidth, ctx.opts.tabstop, ctx.opts.joinspaces);

    if output != input {
        ctx.state.buffer.delete_range(first + 1, last);
        let mut lines = output.iter();
        if let Some(head) = lines.next() {
            ctx.state.buffer.replace(first, head);
        }
        for (i, line) in lines.enumerate() {
            ctx.state.buffer.append_after(first + i, line);
        }
    }
    let new_last = first + output.len().max(1) - 1;
    debug!(target: "actions.ops", first, last, new_last, keep_cursor, "format");

    let last_text = ctx.state.buffer.line(new_last);
    ctx.state.set_change_marks(
        Position::new(first, 0),
        Position::new(new_last, grapheme::last_start(&last_text)),
    );
    ctx.state.cursor = if keep_cursor {
        saved_cursor
    } else {
        Position::new(new_last, first_non_blank(&last_text))
    };
    ctx.state.clamp_cursor();
    ctx.changed(first, last.max(new_last));

    let new_count = ctx.state.buffer.line_count() as isize;
    ctx.more_lines(new_count - old_count as isize);
    Ok(())
}

fn refill(input: &[String], textwidth: usize, tabstop: usize, joinspaces: bool) -> Vec<String> {
    let mut out = Vec::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if input[i].trim().is_empty() {
            out.push(input[i].clone());
            i += 1;
            continue;
        }
        let start = i;
        while i < input.len() && !input[i].trim().is_empty() {
            i += 1;
        }
        let head = &input[start];
        let indent = &head[..head.len() - head.trim_start_matches([' ', '\t']).len()];
        let words = input[start..i].iter().flat_map(|l| l.split_whitespace());
        fill_paragraph(&mut out, indent, words, textwidth, tabstop, joinspaces);
    }
    out
}

fn fill_paragraph<'a>(
    out: &mut Vec<String>,
    indent: &str,
    words: impl Iterator<Item = &'a str>,
    textwidth: usize,
    tabstop: usize,
    joinspaces: bool,
) {
    let mut line = String::new();
    for word in words {
        if line.is_empty() {
            line.push_str(indent);
            line.push_str(word);
            continue;
        }
        let gap = if joinspaces && line.ends_with(['.', '!', '?']) { 2 } else { 1 };
        if str_cells(&line, 0, tabstop) + gap + str_cells(word, 0, tabstop) > textwidth {
            out.push(std::mem::take(&mut line));
            line.push_str(indent);
        } else {
            line.extend(std::iter::repeat_n(' ', gap));
        }
        line.push_str(word);
    }
    if !line.is_empty() {
        out.push(line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EditOptions;
    use crate::collab::{DeclinePrompt, NoopRedraw};
    use core_state::EditorState;
    use core_text::Buffer;
    use pretty_assertions::assert_eq;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn refill_keeps_blank_lines_and_indent() {
        let got = refill(&lines(&["  aaa bbb ccc", "ddd", "", "eee"]), 10, 8, true);
        assert_eq!(got, lines(&["  aaa bbb", "  ccc ddd", "", "eee"]));
    }

    #[test]
    fn long_words_get_their_own_line() {
        let got = refill(&lines(&["a verylongword b"]), 5, 8, true);
        assert_eq!(got, lines(&["a", "verylongword", "b"]));
    }

    #[test]
    fn sentence_end_gets_two_spaces() {
        let got = refill(&lines(&["One.", "Two"]), 79, 8, true);
        assert_eq!(got, lines(&["One.  Two"]));
        let got = refill(&lines(&["One.", "Two"]), 79, 8, false);
        assert_eq!(got, lines(&["One. Two"]));
    }

    #[test]
    fn gq_moves_cursor_and_gw_restores_it() {
        let text = ["one two three four", "five"];
        let opts = EditOptions {
            textwidth: 9,
            ..EditOptions::default()
        };
        let mut redraw = NoopRedraw;
        let mut prompt = DeclinePrompt;

        let mut s = EditorState::new(Buffer::from_lines("t", &text).unwrap());
        let mut ctx = OpContext::new(&mut s, &opts, &mut redraw, &mut prompt);
        do_format(&mut ctx, 1, 2, false).unwrap();
        assert_eq!(s.buffer.lines(), vec!["one two", "three", "four five"]);
        assert_eq!(s.cursor, Position::new(3, 0));

        let mut s = EditorState::new(Buffer::from_lines("t", &text).unwrap());
        s.cursor = Position::new(1, 4);
        let mut ctx = OpContext::new(&mut s, &opts, &mut redraw, &mut prompt);
        do_format(&mut ctx, 1, 2, true).unwrap();
        assert_eq!(s.cursor, Position::new(1, 4));
        assert_eq!(s.marks.change_end, Some(Position::new(3, 8)));
    }
}
