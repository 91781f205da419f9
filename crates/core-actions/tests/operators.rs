mod common;
use common::*;

use core_actions::{EditOptions, OpError};
use core_state::{Mode, RegisterKind, Slot};

#[test]
fn exclusive_motion_ending_in_column_zero_backs_up() {
    // Starts inside the indent: the whole first line goes.
    scenario(
        &["  abc", "def"],
        (2, 0),
        "db",
        Expect {
            lines: Some(&["def"]),
            register: Some((Slot::Numbered(1), RegisterKind::Line, &["  abc"])),
            ..Expect::default()
        },
    );
    // Starts after text: only up to the end of the first line.
    scenario(
        &["ab cd", "ef"],
        (2, 0),
        "db",
        Expect {
            lines: Some(&["ab ", "ef"]),
            register: Some((Slot::SmallDelete, RegisterKind::Char, &["cd"])),
            ..Expect::default()
        },
    );
}

#[test]
fn multiline_delete_leaving_blank_tail_becomes_linewise() {
    scenario(
        &["  abc", "def  ", "ghi"],
        (1, 2),
        "d2e",
        Expect {
            lines: Some(&["ghi"]),
            register: Some((Slot::Numbered(1), RegisterKind::Line, &["  abc", "def  "])),
            ..Expect::default()
        },
    );
    // Text remains after the end: stays char-wise.
    scenario(
        &["  abc", "def x", "ghi"],
        (1, 2),
        "d2e",
        Expect {
            lines: Some(&["   x", "ghi"]),
            register: Some((Slot::Numbered(1), RegisterKind::Char, &["abc", "def"])),
            ..Expect::default()
        },
    );
}

#[test]
fn delete_reports_fewer_lines() {
    let interp = scenario(&["a", "b", "c", "d", "e"], (1, 0), "4dd", Expect::default());
    assert_eq!(lines(&interp), vec!["e"]);
    assert_eq!(interp.state().message.as_deref(), Some("4 fewer lines"));
    let interp = scenario(&["a", "b", "c", "d"], (1, 0), "3yy", Expect::default());
    assert_eq!(interp.state().message.as_deref(), Some("3 lines yanked"));
}

#[test]
fn delete_marks_surround_the_change() {
    let interp = scenario(&["one two three"], (1, 4), "dw", Expect::default());
    assert_eq!(interp.state().marks.change_start, Some(core_text::Position::new(1, 4)));
    assert_eq!(interp.state().marks.change_end, Some(core_text::Position::new(1, 4)));
}

#[test]
fn put_with_indent_fixing() {
    let mut interp = editor(&["\tif x {", "\t\ty", "}", "z", "    w"]);
    set_cursor(&mut interp, 3, 0);
    feed(&mut interp, "yjG]p");
    // The put lines take the indent of the cursor line ("    w"): "}" gets 4.
    assert_eq!(lines(&interp), vec!["\tif x {", "\t\ty", "}", "z", "    w", "    }", "    z"]);
    feed(&mut interp, "gg[p");
    assert_eq!(lines(&interp)[..3], ["\t}", "\tz", "\tif x {"]);
}

#[test]
fn join_and_gj() {
    scenario(
        &["first.", "  second", ")third"],
        (1, 0),
        "3J",
        Expect {
            lines: Some(&["first.  second)third"]),
            ..Expect::default()
        },
    );
    scenario(
        &["a", "  b"],
        (1, 0),
        "gJ",
        Expect {
            lines: Some(&["a  b"]),
            cursor: Some((1, 1)),
            ..Expect::default()
        },
    );
}

#[test]
fn shift_operators_with_motion_and_visual() {
    let opts = EditOptions {
        shiftwidth: 4,
        shiftround: true,
        ..EditOptions::default()
    };
    let mut interp = editor_with(&["  a", "b", "", "c"], opts);
    feed(&mut interp, ">G");
    assert_eq!(lines(&interp), vec!["    a", "    b", "", "    c"]);
    feed(&mut interp, "Vj2<lt>");
    assert_eq!(lines(&interp), vec!["a", "b", "", "    c"]);
}

#[test]
fn case_operators_over_motions() {
    scenario(&["hello world"], (1, 0), "g~w", Expect { lines: Some(&["HELLO world"]), ..Expect::default() });
    scenario(&["Hello World"], (1, 0), "guu", Expect { lines: Some(&["hello world"]), ..Expect::default() });
    scenario(&["Hello World"], (1, 0), "gUgU", Expect { lines: Some(&["HELLO WORLD"]), ..Expect::default() });
    scenario(
        &["abc", "def"],
        (1, 1),
        "3~",
        Expect {
            lines: Some(&["aBC", "def"]),
            cursor: Some((1, 2)),
            ..Expect::default()
        },
    );
}

#[test]
fn format_operators() {
    let opts = EditOptions {
        textwidth: 10,
        ..EditOptions::default()
    };
    let mut interp = editor_with(&["aaa bbb ccc ddd", "eee", "", "fff"], opts.clone());
    feed(&mut interp, "gqG");
    assert_eq!(lines(&interp), vec!["aaa bbb", "ccc ddd", "eee", "", "fff"]);
    assert_eq!(interp.state().cursor, core_text::Position::new(5, 0));

    let mut interp = editor_with(&["aaa bbb ccc ddd"], opts);
    set_cursor(&mut interp, 1, 4);
    feed(&mut interp, "gww");
    assert_eq!(lines(&interp), vec!["aaa bbb", "ccc ddd"]);
    assert_eq!(interp.state().cursor, core_text::Position::new(1, 4));
}

#[test]
fn add_and_subtract() {
    scenario(&["count: 9"], (1, 0), "<C-a>", Expect { lines: Some(&["count: 10"]), cursor: Some((1, 8)), ..Expect::default() });
    scenario(&["0x0F"], (1, 0), "17<C-a>", Expect { lines: Some(&["0x20"]), ..Expect::default() });
    scenario(&["x 1"], (1, 0), "3<C-x>", Expect { lines: Some(&["x -2"]), ..Expect::default() });
    let interp = scenario(&["none"], (1, 0), "<C-a>", Expect { beeps: Some(1), ..Expect::default() });
    assert_eq!(interp.last_error(), Some(&OpError::NoNumber));
}

#[test]
fn filter_reindent_and_colon_emit_requests() {
    let (mut interp, ex) = editor_with_ex(&["a", "b", "c", "d"]);
    feed(&mut interp, "!2j");
    feed(&mut interp, "j==");
    feed(&mut interp, "ggVG:");
    feed(&mut interp, "2:");
    let got: Vec<_> = ex.requests.borrow().iter().map(|r| (r.range, r.command.clone())).collect();
    assert_eq!(
        got,
        vec![
            (Some((1, 3)), "1,3!".to_string()),
            (Some((2, 2)), "2,2!".to_string()),
            (Some((1, 4)), "1,4".to_string()),
            (Some((1, 2)), ".,.+1".to_string()),
        ]
    );
    assert_eq!(lines(&interp), vec!["a", "b", "c", "d"]);
}

#[test]
fn change_operator_enters_insert() {
    let mut interp = editor(&["one two three"]);
    set_cursor(&mut interp, 1, 4);
    feed(&mut interp, "c2wX");
    assert_eq!(interp.state().mode, Mode::Insert);
    feed(&mut interp, "<Esc>");
    assert_eq!(lines(&interp), vec!["one X"]);
    assert_eq!(interp.state().mode, Mode::Normal);
    feed(&mut interp, "u");
    assert_eq!(lines(&interp), vec!["one two three"]);
}
