//! End-to-end behaviour of the engine facade
//!
//! Bytes go in through `process_bytes`, assertions are made on cells,
//! the cursor and the dirty set.

use termcore::core::{Attrs, Color};
use termcore::pty::PtyError;
use termcore::Terminal;

fn dirty(term: &Terminal) -> Vec<u16> {
    let mut buf = vec![0u16; term.rows()];
    let n = term.dirty_rows(&mut buf);
    buf.truncate(n);
    buf
}

fn row_text(term: &Terminal, row: usize) -> String {
    term.screen().row_text(row)
}

#[test]
fn test_wrap_to_second_row() {
    let mut term = Terminal::new(2, 80);
    let line: String = ('!'..='~').cycle().take(81).collect();
    term.process_bytes(line.as_bytes());

    let chars: Vec<char> = line.chars().collect();
    assert_eq!(term.cell(0, 79).ch, chars[79]);
    assert_eq!(term.cell(1, 0).ch, chars[80]);
    assert_eq!((term.cursor().row, term.cursor().col), (1, 1));
}

#[test]
fn test_full_row_wraps_immediately() {
    let mut term = Terminal::new(2, 80);
    term.process_bytes(&[b'x'; 80]);
    assert_eq!((term.cursor().row, term.cursor().col), (1, 0));
    assert_eq!(row_text(&term, 1), "");
}

#[test]
fn test_exactly_filled_grid_scrolls() {
    let mut term = Terminal::new(2, 3);
    term.process_bytes(b"aaabbb");
    assert_eq!(row_text(&term, 0), "bbb");
    assert_eq!(row_text(&term, 1), "");
    assert_eq!((term.cursor().row, term.cursor().col), (1, 0));
}

#[test]
fn test_newline_after_full_row() {
    let mut term = Terminal::new(3, 3);
    term.process_bytes(b"abc
d");
    assert_eq!(row_text(&term, 0), "abc");
    assert_eq!(row_text(&term, 1), "");
    assert_eq!(row_text(&term, 2), "d");
}

#[test]
fn test_motion_after_full_row() {
    let mut term = Terminal::new(2, 5);
    term.process_bytes(b"abcde[1;4HX");
    assert_eq!(row_text(&term, 0), "abcXe");
    assert_eq!((term.cursor().row, term.cursor().col), (0, 4));
}

#[test]
fn test_scroll_on_overflow() {
    let mut term = Terminal::new(3, 4);
    term.mark_clean();

    term.process_bytes(b"aaaabbbbccccd");
    assert_eq!(row_text(&term, 0), "bbbb");
    assert_eq!(row_text(&term, 1), "cccc");
    assert_eq!(row_text(&term, 2), "d");
    assert_eq!(dirty(&term), vec![0, 1, 2]);
}

#[test]
fn test_sgr_reset() {
    let mut term = Terminal::new(1, 10);
    term.process_bytes(b"\x1b[1;31mA\x1b[0mB");

    let bold = term.cell(0, 0);
    assert_eq!(bold.attrs, Attrs::BOLD);
    assert_eq!(bold.fg, Color::Indexed(1));

    let plain = term.cell(0, 1);
    assert!(plain.attrs.is_empty());
    assert_eq!(plain.fg, Color::Default);
}

#[test]
fn test_sgr_attribute_toggles() {
    let mut term = Terminal::new(1, 10);
    term.process_bytes(b"\x1b[3;4;5;7;9mA\x1b[23;24;25;27;29mB\x1b[21mC\x1b[mD");
    assert_eq!(
        term.cell(0, 0).attrs,
        Attrs::ITALIC | Attrs::UNDERLINE | Attrs::BLINK | Attrs::INVERSE | Attrs::STRIKETHROUGH
    );
    assert!(term.cell(0, 1).attrs.is_empty());
    assert_eq!(term.cell(0, 2).attrs, Attrs::UNDERLINE);
    assert!(term.cell(0, 3).attrs.is_empty());
}

#[test]
fn test_sgr_bright_and_truncated_extended() {
    let mut term = Terminal::new(1, 10);
    term.process_bytes(b"\x1b[92;104mA\x1b[0;1;38;2;1;2m\x1b[4mB");
    assert_eq!(term.cell(0, 0).fg, Color::Indexed(10));
    assert_eq!(term.cell(0, 0).bg, Color::Indexed(12));

    // The truncated truecolor ends the list; bold before it still applies
    let cell = term.cell(0, 1);
    assert_eq!(cell.fg, Color::Default);
    assert_eq!(cell.attrs, Attrs::BOLD | Attrs::UNDERLINE);
}

#[test]
fn test_resize_shrink_and_grow() {
    let mut term = Terminal::new(4, 6);
    term.process_bytes(b"one\r\ntwo\r\nthree\r\nfour");
    term.mark_clean();

    term.resize(3, 6).unwrap();
    assert_eq!(term.rows(), 3);
    assert_eq!(row_text(&term, 2), "three");
    assert_eq!(dirty(&term), vec![0, 1, 2]);
    assert_eq!(term.cursor().row, 2);

    term.mark_clean();
    term.resize(4, 6).unwrap();
    assert_eq!(row_text(&term, 3), "");
    assert_eq!(dirty(&term), vec![0, 1, 2, 3]);
}

#[test]
fn test_resize_clamps_zero() {
    let mut term = Terminal::new(0, 0);
    assert_eq!((term.rows(), term.cols()), (1, 1));
    term.resize(0, 5).unwrap();
    assert_eq!((term.rows(), term.cols()), (1, 5));
}

#[test]
fn test_dirty_cycle() {
    let mut term = Terminal::new(5, 10);
    assert_eq!(dirty(&term), vec![0, 1, 2, 3, 4]);

    term.mark_clean();
    assert!(dirty(&term).is_empty());
    assert!(dirty(&term).is_empty());

    term.process_bytes(b"\x1b[4;1Hx\x1b[2;1Hy");
    assert_eq!(dirty(&term), vec![1, 3]);
}

#[test]
fn test_dirty_rows_truncated_at_capacity() {
    let term = Terminal::new(5, 10);
    let mut buf = [0u16; 2];
    assert_eq!(term.dirty_rows(&mut buf), 2);
    assert_eq!(buf, [0, 1]);
    assert_eq!(term.screen().dirty().count(), 5);
}

#[test]
fn test_erase_marks_only_touched_rows() {
    let mut term = Terminal::new(4, 10);
    term.process_bytes(b"\x1b[3;1H");
    term.mark_clean();
    term.process_bytes(b"\x1b[J");
    assert_eq!(dirty(&term), vec![2, 3]);
}

#[test]
fn test_out_of_range_queries() {
    let term = Terminal::new(3, 3);
    assert!(term.cell(3, 0).is_default());
    assert!(term.cell(0, 3).is_default());
    assert!(term.row(3).is_none());
}

#[test]
fn test_send_input_without_pty() {
    let mut term = Terminal::new(2, 10);
    assert!(matches!(term.send_input(b"ls\n"), Err(PtyError::NotAttached)));
    term.process_bytes(b"still usable");
    assert_eq!(row_text(&term, 0), "still usab");
}

#[test]
fn test_wide_characters() {
    let mut term = Terminal::new(2, 5);
    term.process_bytes("a中b".as_bytes());
    assert_eq!(term.cell(0, 1).ch, '中');
    assert_eq!(term.cell(0, 1).width, 2);
    assert!(term.cell(0, 2).is_wide_continuation());
    assert_eq!(term.cell(0, 3).ch, 'b');
    assert_eq!(term.cursor().col, 4);

    // Does not fit in the last column: wraps first
    term.process_bytes("文".as_bytes());
    assert_eq!(term.cell(1, 0).ch, '文');
    assert_eq!(term.cell(0, 4).ch, ' ');
}

#[test]
fn test_overwriting_half_of_wide_character() {
    let mut term = Terminal::new(1, 6);
    term.process_bytes("中\x1b[2Gx".as_bytes());
    assert_eq!(term.cell(0, 0).ch, ' ');
    assert_eq!(term.cell(0, 0).width, 1);
    assert_eq!(term.cell(0, 1).ch, 'x');
}

#[test]
fn test_combining_marks_are_dropped() {
    let mut term = Terminal::new(1, 6);
    term.process_bytes("e\u{301}x".as_bytes());
    assert_eq!(row_text(&term, 0), "ex");
}

#[test]
fn test_invalid_utf8_replaced() {
    let mut term = Terminal::new(1, 10);
    term.process_bytes(b"a\xffb\xe4\xb8c");
    assert_eq!(row_text(&term, 0), "a\u{fffd}b\u{fffd}c");
}

#[test]
fn test_cancel_aborts_sequence() {
    let mut term = Terminal::new(1, 10);
    term.process_bytes(b"\x1b[3\x18x\x1b]0;t\x1ay");
    assert_eq!(row_text(&term, 0), "xy");
    assert_eq!(term.title(), "");
}

#[test]
fn test_decoded_c1_controls() {
    let mut term = Terminal::new(3, 10);
    term.process_bytes("ab\u{9b}3Gc".as_bytes());
    assert_eq!(row_text(&term, 0), "abc");

    // NEL
    term.process_bytes("\u{85}d".as_bytes());
    assert_eq!(row_text(&term, 1), "d");
}

#[test]
fn test_malformed_csi_is_ignored() {
    let mut term = Terminal::new(2, 10);
    term.process_bytes(b"\x1b[1;2?3Hz");
    assert_eq!(row_text(&term, 0), "z");
    assert_eq!((term.cursor().row, term.cursor().col), (0, 1));
}

#[test]
fn test_chunked_input_matches_whole() {
    let input = "\x1b[1;31mred\x1b[0m \u{4e2d}\u{6587}\x1b]2;title\x07\r\n\x1b[2;5Hxy\x1b[K".as_bytes();

    let mut whole = Terminal::new(4, 12);
    whole.process_bytes(input);

    let mut bytewise = Terminal::new(4, 12);
    for byte in input {
        bytewise.process_bytes(std::slice::from_ref(byte));
    }

    assert_eq!(whole.snapshot(), bytewise.snapshot());
    assert_eq!(bytewise.title(), "title");
}

#[test]
fn test_snapshot_text() {
    let mut term = Terminal::new(3, 10);
    term.process_bytes(b"hello\r\nworld");
    assert_eq!(term.snapshot().to_text(), "hello\nworld\n");
}
