//! Terminal Executor
//!
//! Ties together the parser, screen model and optional PTY session, and
//! applies parsed actions to update the terminal state. This is the Rust
//! face of the engine; the C ABI in [`crate::ffi`] is a thin layer over it.

use crate::config::TerminalConfig;
use crate::core::{Cell, Cursor, Screen, Snapshot};
use crate::parser::{Action, CsiAction, EscAction, OscAction, Parser};
use crate::pty::{self, PtyError, PtyResult, PtySession, WindowSize};

/// A terminal: one screen, one parser and optionally one PTY session
///
/// Every mutation takes `&mut self`; sharing a terminal across threads
/// requires external synchronisation.
pub struct Terminal {
    /// The terminal screen
    screen: Screen,
    /// The escape sequence parser; keeps partial sequences between calls
    parser: Parser,
    /// Child process session, if this terminal drives one
    pty: Option<Box<dyn PtySession>>,
}

impl Terminal {
    /// Create a grid-only terminal with the given dimensions
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            screen: Screen::new(rows, cols),
            parser: Parser::new(),
            pty: None,
        }
    }

    /// Create a terminal running the default shell
    pub fn with_pty(rows: usize, cols: usize) -> PtyResult<Self> {
        Self::with_pty_config(rows, cols, &TerminalConfig::default())
    }

    /// Create a terminal running the program named by `config`
    pub fn with_pty_config(rows: usize, cols: usize, config: &TerminalConfig) -> PtyResult<Self> {
        let mut term = Self::new(rows, cols);
        let session = pty::open_session(term.window_size(), config)?;
        term.pty = Some(session);
        Ok(term)
    }

    /// Create a terminal attached to an existing session
    pub fn with_session(rows: usize, cols: usize, session: Box<dyn PtySession>) -> Self {
        let mut term = Self::new(rows, cols);
        term.pty = Some(session);
        term
    }

    /// Get a reference to the screen
    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn rows(&self) -> usize {
        self.screen.rows()
    }

    pub fn cols(&self) -> usize {
        self.screen.cols()
    }

    /// Feed output bytes (typically read from the PTY) through the parser
    ///
    /// Sequences split across calls are completed by later calls.
    pub fn process_bytes(&mut self, data: &[u8]) {
        let mut performer = Performer {
            screen: &mut self.screen,
        };
        self.parser
            .parse_with(data, |action| performer.apply_action(action));
    }

    /// Forward input bytes to the child; returns how many were written
    pub fn send_input(&mut self, data: &[u8]) -> PtyResult<usize> {
        self.pty.as_mut().ok_or(PtyError::NotAttached)?.write(data)
    }

    /// Resize the grid and, when attached, the PTY
    ///
    /// The grid is resized even when the PTY refuses the new size.
    pub fn resize(&mut self, rows: usize, cols: usize) -> PtyResult<()> {
        self.screen.resize(rows, cols);
        let size = self.window_size();
        match self.pty.as_mut() {
            Some(pty) => pty.resize(size),
            None => Ok(()),
        }
    }

    /// Cell at (row, col); the default cell when out of range
    pub fn cell(&self, row: usize, col: usize) -> Cell {
        self.screen.get_cell(row, col).copied().unwrap_or_default()
    }

    /// Cells of a row, or `None` when the row is out of range
    pub fn row(&self, row: usize) -> Option<&[Cell]> {
        self.screen.get_row(row)
    }

    pub fn cursor(&self) -> &Cursor {
        self.screen.cursor()
    }

    /// Copy dirty row indices (ascending) into `buf`; returns the count written
    ///
    /// Does not clear anything; rows beyond `buf.len()` stay dirty.
    pub fn dirty_rows(&self, buf: &mut [u16]) -> usize {
        self.screen.dirty().copy_into(buf)
    }

    /// Forget all dirty rows
    pub fn mark_clean(&mut self) {
        self.screen.mark_clean();
    }

    /// Descriptor of the PTY to poll, if attached
    pub fn pty_fd(&self) -> Option<i32> {
        self.pty.as_ref().and_then(|pty| pty.raw_fd())
    }

    /// Non-blocking read from the PTY; `Ok(0)` when nothing is available
    pub fn read_pty(&mut self, buf: &mut [u8]) -> PtyResult<usize> {
        self.pty
            .as_mut()
            .ok_or(PtyError::NotAttached)?
            .read_nonblocking(buf)
    }

    /// Whether a child process is attached and still running
    pub fn is_child_alive(&mut self) -> bool {
        self.pty.as_mut().is_some_and(|pty| pty.is_alive())
    }

    /// Last title set with OSC 0 or OSC 2
    pub fn title(&self) -> &str {
        self.screen.title()
    }

    /// Take a snapshot of the current screen state
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_screen(&self.screen)
    }

    fn window_size(&self) -> WindowSize {
        let clamp = |n: usize| u16::try_from(n).unwrap_or(u16::MAX);
        WindowSize::new(clamp(self.screen.rows()), clamp(self.screen.cols()))
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Some(pty) = self.pty.as_mut() {
            pty.terminate();
        }
    }
}

impl std::fmt::Debug for Terminal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Terminal")
            .field("rows", &self.screen.rows())
            .field("cols", &self.screen.cols())
            .field("pty_fd", &self.pty_fd())
            .finish()
    }
}

/// Applies parser actions to a screen
struct Performer<'a> {
    screen: &'a mut Screen,
}

impl Performer<'_> {
    /// Apply a single parsed action to the screen
    fn apply_action(&mut self, action: Action) {
        match action {
            Action::Print(c) => self.screen.print_char(c),
            Action::Execute(byte) => self.execute_c0(byte),
            Action::CsiDispatch(csi) => self.execute_csi(&csi),
            Action::EscDispatch(esc) => self.execute_esc(esc),
            Action::OscDispatch(osc) => self.execute_osc(osc),
            Action::Unsupported(bytes) => {
                tracing::debug!(len = bytes.len(), "unsupported sequence discarded");
            }
        }
    }

    /// Execute a C0 control character
    fn execute_c0(&mut self, byte: u8) {
        match byte {
            0x07 => tracing::trace!("bell"),
            0x08 => self.screen.backspace(),
            0x09 => self.screen.tab(),
            // LF, VT, FF
            0x0A..=0x0C => self.screen.linefeed(),
            0x0D => self.screen.carriage_return(),
            _ => {}
        }
    }

    /// Execute a CSI sequence
    fn execute_csi(&mut self, csi: &CsiAction) {
        if csi.is_dec_private() {
            self.execute_csi_private(csi);
            return;
        }
        if csi.private_marker.is_some() || !csi.intermediates.is_empty() {
            tracing::debug!(
                "ignored CSI: marker={:?} intermediates={:?} final={}",
                csi.private_marker,
                csi.intermediates,
                csi.final_byte as char
            );
            return;
        }

        let count = |index: usize| csi.param_or_default(index, 1) as usize;
        let position = |index: usize| count(index) - 1;

        match csi.final_byte {
            // Cursor movement
            b'A' => self.screen.move_cursor_up(count(0)),
            // CUD, VPR
            b'B' | b'e' => self.screen.move_cursor_down(count(0)),
            // CUF, HPR
            b'C' | b'a' => self.screen.move_cursor_forward(count(0)),
            b'D' => self.screen.move_cursor_backward(count(0)),
            b'E' => {
                // CNL
                self.screen.move_cursor_down(count(0));
                self.screen.carriage_return();
            }
            b'F' => {
                // CPL
                self.screen.move_cursor_up(count(0));
                self.screen.carriage_return();
            }
            // CHA, HPA
            b'G' | b'`' => self.screen.move_cursor_to_col(position(0)),
            // CUP, HVP
            b'H' | b'f' => self.screen.move_cursor_to(position(0), position(1)),
            // VPA
            b'd' => self.screen.move_cursor_to_row(position(0)),

            // Tabs
            b'I' => self.screen.tab_forward(count(0)),
            b'Z' => self.screen.tab_backward(count(0)),
            b'g' => match csi.param(0, 0) {
                0 => self.screen.clear_tab_stop(),
                3 => self.screen.clear_all_tab_stops(),
                _ => {}
            },

            // Erase
            b'J' => self.screen.erase_in_display(csi.param(0, 0)),
            b'K' => self.screen.erase_in_line(csi.param(0, 0)),
            b'X' => self.screen.erase_chars(count(0)),

            // Insert/Delete
            b'L' => self.screen.insert_lines(count(0)),
            b'M' => self.screen.delete_lines(count(0)),
            b'@' => self.screen.insert_chars(count(0)),
            b'P' => self.screen.delete_chars(count(0)),

            // Scroll
            b'S' => self.screen.scroll_up(count(0)),
            b'T' => self.screen.scroll_down(count(0)),
            b'r' => {
                // DECSTBM
                let top = position(0);
                let bottom = match csi.param(1, 0) {
                    0 => self.screen.rows() - 1,
                    n => n as usize - 1,
                };
                self.screen.set_scroll_region(top, bottom);
            }

            b'm' => self.screen.set_attributes(&csi.params),

            // ANSI cursor save/restore
            b's' => self.screen.save_cursor(),
            b'u' => self.screen.restore_cursor(),

            _ => {
                tracing::debug!(
                    "unhandled CSI: params={:?} final={}",
                    csi.params,
                    csi.final_byte as char
                );
            }
        }
    }

    /// Execute a private CSI sequence (starts with ?)
    fn execute_csi_private(&mut self, csi: &CsiAction) {
        let enable = match csi.final_byte {
            b'h' => true,
            b'l' => false,
            _ => {
                tracing::debug!(
                    "unhandled private CSI: params={:?} final={}",
                    csi.params,
                    csi.final_byte as char
                );
                return;
            }
        };

        for &mode in &csi.params {
            match mode {
                // DECAWM
                7 => self.screen.set_autowrap(enable),
                // DECTCEM
                25 => self.screen.set_cursor_visible(enable),
                _ => tracing::debug!("ignored DEC mode {} = {}", mode, enable),
            }
        }
    }

    /// Execute an ESC sequence
    fn execute_esc(&mut self, esc: EscAction) {
        match esc {
            EscAction::SaveCursor => self.screen.save_cursor(),
            EscAction::RestoreCursor => self.screen.restore_cursor(),
            EscAction::Index => self.screen.index(),
            EscAction::ReverseIndex => self.screen.reverse_index(),
            EscAction::NextLine => self.screen.next_line(),
            EscAction::TabSet => self.screen.set_tab_stop(),
            EscAction::FullReset => self.screen.reset(),
            EscAction::ApplicationKeypad
            | EscAction::NormalKeypad
            | EscAction::DesignateCharset { .. } => {
                tracing::debug!(?esc, "ESC sequence accepted without effect");
            }
        }
    }

    /// Execute an OSC sequence
    fn execute_osc(&mut self, osc: OscAction) {
        match osc {
            OscAction::SetTitle(title) => self.screen.set_title(title),
            OscAction::SetIconName(_) => {}
            OscAction::Unknown { command, .. } => {
                tracing::debug!(command, "ignored OSC");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Attrs, Color};

    fn text(term: &Terminal, row: usize) -> String {
        term.screen().row_text(row)
    }

    #[test]
    fn test_basic_text() {
        let mut term = Terminal::new(24, 80);
        term.process_bytes(b"Hello, World!");
        assert_eq!(text(&term, 0), "Hello, World!");
    }

    #[test]
    fn test_newline() {
        let mut term = Terminal::new(24, 80);
        term.process_bytes(b"Line 1\r\nLine 2");
        assert_eq!(text(&term, 0), "Line 1");
        assert_eq!(text(&term, 1), "Line 2");
    }

    #[test]
    fn test_cursor_movement() {
        let mut term = Terminal::new(24, 80);
        term.process_bytes(b"\x1b[5;10H");
        assert_eq!(term.cursor().row, 4);
        assert_eq!(term.cursor().col, 9);

        term.process_bytes(b"\x1b[2A\x1b[3C");
        assert_eq!(term.cursor().row, 2);
        assert_eq!(term.cursor().col, 12);

        term.process_bytes(b"\x1b[0B");
        assert_eq!(term.cursor().row, 3);
    }

    #[test]
    fn test_cursor_motion_is_clamped() {
        let mut term = Terminal::new(5, 10);
        term.process_bytes(b"\x1b[99;99H");
        assert_eq!((term.cursor().row, term.cursor().col), (4, 9));
        term.process_bytes(b"\x1b[99A\x1b[99D");
        assert_eq!((term.cursor().row, term.cursor().col), (0, 0));
    }

    #[test]
    fn test_next_and_previous_line() {
        let mut term = Terminal::new(10, 20);
        term.process_bytes(b"\x1b[3;5H\x1b[2E");
        assert_eq!((term.cursor().row, term.cursor().col), (4, 0));
        term.process_bytes(b"abc\x1b[F");
        assert_eq!((term.cursor().row, term.cursor().col), (3, 0));
    }

    #[test]
    fn test_absolute_column_and_row() {
        let mut term = Terminal::new(10, 20);
        term.process_bytes(b"\x1b[7G");
        assert_eq!(term.cursor().col, 6);
        term.process_bytes(b"\x1b[4d");
        assert_eq!(term.cursor().row, 3);
        term.process_bytes(b"\x1b[2`");
        assert_eq!(term.cursor().col, 1);
    }

    #[test]
    fn test_sgr_colors() {
        let mut term = Terminal::new(24, 80);
        term.process_bytes(b"\x1b[1;31mR\x1b[0mN");

        let red = term.cell(0, 0);
        assert!(red.attrs.contains(Attrs::BOLD));
        assert_eq!(red.fg, Color::Indexed(1));

        let normal = term.cell(0, 1);
        assert!(normal.attrs.is_empty());
        assert_eq!(normal.fg, Color::Default);
    }

    #[test]
    fn test_sgr_truecolor() {
        let mut term = Terminal::new(2, 10);
        term.process_bytes(b"\x1b[38;2;10;20;30;48;5;200mX");
        let cell = term.cell(0, 0);
        assert_eq!(cell.fg, Color::Rgb(10, 20, 30));
        assert_eq!(cell.bg, Color::Indexed(200));
    }

    #[test]
    fn test_erase_display() {
        let mut term = Terminal::new(24, 80);
        term.process_bytes(b"Hello\r\nWorld");
        term.process_bytes(b"\x1b[2J");
        assert_eq!(text(&term, 0), "");
        assert_eq!(text(&term, 1), "");
    }

    #[test]
    fn test_erase_line_modes() {
        let mut term = Terminal::new(2, 10);
        term.process_bytes(b"abcdefghij\x1b[1;5H\x1b[K");
        assert_eq!(text(&term, 0), "abcd");
        term.process_bytes(b"\x1b[1;3H\x1b[1K");
        assert_eq!(text(&term, 0), "   d");
    }

    #[test]
    fn test_scroll_region_and_index() {
        let mut term = Terminal::new(5, 10);
        term.process_bytes(b"1\r\n2\r\n3\r\n4\r\n5");
        term.process_bytes(b"\x1b[2;4r");
        assert_eq!(term.screen().scroll_top(), 1);
        assert_eq!(term.screen().scroll_bottom(), 3);
        assert_eq!((term.cursor().row, term.cursor().col), (0, 0));

        term.process_bytes(b"\x1b[4;1H\n");
        assert_eq!(text(&term, 0), "1");
        assert_eq!(text(&term, 1), "3");
        assert_eq!(text(&term, 2), "4");
        assert_eq!(text(&term, 3), "");
        assert_eq!(text(&term, 4), "5");

        term.process_bytes(b"\x1b[r");
        assert_eq!(term.screen().scroll_bottom(), 4);
    }

    #[test]
    fn test_insert_delete_chars() {
        let mut term = Terminal::new(2, 10);
        term.process_bytes(b"abcdef\x1b[1;2H\x1b[2@");
        assert_eq!(text(&term, 0), "a  bcdef");
        term.process_bytes(b"\x1b[3P");
        assert_eq!(text(&term, 0), "acdef");
        term.process_bytes(b"\x1b[2X");
        assert_eq!(text(&term, 0), "a  ef");
    }

    #[test]
    fn test_insert_delete_lines() {
        let mut term = Terminal::new(4, 10);
        term.process_bytes(b"a\r\nb\r\nc\r\nd\x1b[2;1H\x1b[L");
        assert_eq!(text(&term, 1), "");
        assert_eq!(text(&term, 2), "b");
        assert_eq!(text(&term, 3), "c");
        term.process_bytes(b"\x1b[2M");
        assert_eq!(text(&term, 1), "c");
        assert_eq!(text(&term, 2), "");
    }

    #[test]
    fn test_save_restore_cursor() {
        let mut term = Terminal::new(10, 20);
        term.process_bytes(b"\x1b[3;4H\x1b7\x1b[H\x1b8");
        assert_eq!((term.cursor().row, term.cursor().col), (2, 3));
        term.process_bytes(b"\x1b[5;6H\x1b[s\x1b[H\x1b[u");
        assert_eq!((term.cursor().row, term.cursor().col), (4, 5));
    }

    #[test]
    fn test_tabs() {
        let mut term = Terminal::new(2, 40);
        term.process_bytes(b"\tX");
        assert_eq!(term.cell(0, 8).ch, 'X');
        term.process_bytes(b"\x1b[2I");
        assert_eq!(term.cursor().col, 24);
        term.process_bytes(b"\x1b[Z");
        assert_eq!(term.cursor().col, 16);

        term.process_bytes(b"\x1b[3g\r\t");
        assert_eq!(term.cursor().col, 39);
    }

    #[test]
    fn test_dec_modes() {
        let mut term = Terminal::new(2, 5);
        term.process_bytes(b"\x1b[?25l");
        assert!(!term.cursor().visible);
        term.process_bytes(b"\x1b[?25h");
        assert!(term.cursor().visible);

        term.process_bytes(b"\x1b[?7labcdefg");
        assert_eq!(text(&term, 0), "abcdg");
        assert_eq!(text(&term, 1), "");
    }

    #[test]
    fn test_osc_title() {
        let mut term = Terminal::new(2, 10);
        term.process_bytes(b"\x1b]0;first\x07");
        assert_eq!(term.title(), "first");
        term.process_bytes(b"\x1b]2;second\x1b\\");
        assert_eq!(term.title(), "second");
        term.process_bytes(b"\x1b]1;icon\x07");
        assert_eq!(term.title(), "second");
    }

    #[test]
    fn test_full_reset() {
        let mut term = Terminal::new(3, 10);
        term.process_bytes(b"\x1b[31mhello\x1b[2;3r");
        term.process_bytes(b"\x1bc");
        assert_eq!(text(&term, 0), "");
        assert_eq!((term.cursor().row, term.cursor().col), (0, 0));
        assert_eq!(term.screen().scroll_bottom(), 2);
        term.process_bytes(b"x");
        assert_eq!(term.cell(0, 0).fg, Color::Default);
    }

    #[test]
    fn test_unsupported_sequences_leave_grid_alone() {
        let mut term = Terminal::new(2, 10);
        term.process_bytes(b"\x1bP1$qm\x1b\\\x1b_payload\x1b\\\x1b[>1c\x1b[?1049h");
        assert_eq!(text(&term, 0), "");
        assert_eq!((term.cursor().row, term.cursor().col), (0, 0));
    }

    #[test]
    fn test_split_sequence() {
        let mut term = Terminal::new(5, 20);
        term.process_bytes(b"\x1b[");
        term.process_bytes(b"3;");
        term.process_bytes(b"7H\xe4");
        term.process_bytes(b"\xb8\xad");
        assert_eq!(term.cell(2, 6).ch, '中');
    }

    #[test]
    fn test_out_of_range_cell_is_default() {
        let term = Terminal::new(3, 4);
        assert!(term.cell(3, 0).is_default());
        assert!(term.cell(0, 4).is_default());
        assert!(term.row(3).is_none());
        assert_eq!(term.row(2).map(<[Cell]>::len), Some(4));
    }

    #[test]
    fn test_dirty_rows() {
        let mut term = Terminal::new(3, 10);
        let mut buf = [0u16; 8];
        assert_eq!(term.dirty_rows(&mut buf), 3);

        term.mark_clean();
        assert_eq!(term.dirty_rows(&mut buf), 0);

        term.process_bytes(b"\x1b[3;1Hx");
        assert_eq!(term.dirty_rows(&mut buf), 1);
        assert_eq!(buf[0], 2);
    }

    #[test]
    fn test_resize_without_pty() {
        let mut term = Terminal::new(3, 10);
        term.process_bytes(b"abc");
        term.resize(5, 2).unwrap();
        assert_eq!((term.rows(), term.cols()), (5, 2));
        assert_eq!(text(&term, 0), "ab");
    }

    #[test]
    fn test_no_pty() {
        let mut term = Terminal::new(2, 2);
        assert!(matches!(term.send_input(b"x"), Err(PtyError::NotAttached)));
        assert!(matches!(
            term.read_pty(&mut [0u8; 4]),
            Err(PtyError::NotAttached)
        ));
        assert_eq!(term.pty_fd(), None);
        assert!(!term.is_child_alive());
        term.process_bytes(b"ok");
        assert_eq!(text(&term, 0), "ok");
    }
}
