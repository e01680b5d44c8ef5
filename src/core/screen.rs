//! Screen model implementation
//!
//! The screen is the visible terminal grid plus the state that drives it:
//! cursor and pen, scroll region, tab stops and the dirty row set. There is
//! no scrollback: rows scrolled off the top of the region are discarded.
//!
//! All coordinates are 0-indexed and given as (row, col).

use unicode_width::UnicodeWidthChar;

use super::cell::{Attrs, Cell, Color};
use super::cursor::{Cursor, SavedCursor};
use super::dirty::DirtyRows;

/// Distance between the default tab stops
const TAB_WIDTH: usize = 8;

/// The main screen structure
#[derive(Debug, Clone)]
pub struct Screen {
    /// Number of rows
    rows: usize,
    /// Number of columns
    cols: usize,
    /// Row-major grid, always `rows` rows of `cols` cells
    grid: Vec<Vec<Cell>>,
    /// Cursor and pen
    cursor: Cursor,
    /// Saved cursor (DECSC/DECRC)
    saved_cursor: SavedCursor,
    /// Scroll region top (0-indexed, inclusive)
    scroll_top: usize,
    /// Scroll region bottom (0-indexed, inclusive)
    scroll_bottom: usize,
    /// Tab stops, one flag per column
    tab_stops: Vec<bool>,
    /// Rows changed since the embedder last marked the screen clean
    dirty: DirtyRows,
    /// Window title (set via OSC 0/2)
    title: String,
}

/// A cell's colors and attributes with its character removed
fn blanked(cell: Cell) -> Cell {
    Cell {
        ch: ' ',
        width: 1,
        ..cell
    }
}

fn default_tab_stops(cols: usize) -> Vec<bool> {
    (0..cols).map(|i| i > 0 && i % TAB_WIDTH == 0).collect()
}

impl Screen {
    /// Create a new screen; zero dimensions are clamped to 1
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        Self {
            rows,
            cols,
            grid: vec![vec![Cell::default(); cols]; rows],
            cursor: Cursor::default(),
            saved_cursor: SavedCursor::default(),
            scroll_top: 0,
            scroll_bottom: rows - 1,
            tab_stops: default_tab_stops(cols),
            dirty: DirtyRows::new(rows),
            title: String::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    /// Mutable access to the cursor and pen
    pub fn cursor_mut(&mut self) -> &mut Cursor {
        &mut self.cursor
    }

    pub fn scroll_top(&self) -> usize {
        self.scroll_top
    }

    pub fn scroll_bottom(&self) -> usize {
        self.scroll_bottom
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: String) {
        self.title = title;
    }

    /// Rows changed since the last [`Screen::mark_clean`]
    pub fn dirty(&self) -> &DirtyRows {
        &self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty.clear();
    }

    /// Get a cell, or `None` outside the grid
    pub fn get_cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.grid.get(row).and_then(|line| line.get(col))
    }

    /// Get a whole row, or `None` outside the grid
    pub fn get_row(&self, row: usize) -> Option<&[Cell]> {
        self.grid.get(row).map(Vec::as_slice)
    }

    /// Text of a row with trailing blanks trimmed and wide spacers skipped
    pub fn row_text(&self, row: usize) -> String {
        let Some(line) = self.grid.get(row) else {
            return String::new();
        };
        let text: String = line
            .iter()
            .filter(|cell| !cell.is_wide_continuation())
            .map(|cell| cell.ch)
            .collect();
        text.trim_end_matches(' ').to_string()
    }

    /// Break up any wide character that overlaps `col` before it is overwritten
    fn clear_wide_fragments(&mut self, row: usize, col: usize) {
        let cols = self.cols;
        let cell = self.grid[row][col];
        if cell.is_wide_continuation() && col > 0 {
            self.grid[row][col - 1] = blanked(self.grid[row][col - 1]);
        } else if cell.is_wide() && col + 1 < cols {
            self.grid[row][col + 1] = blanked(self.grid[row][col + 1]);
        }
    }

    /// Fix wide-character halves orphaned by a bulk edit of a row
    fn repair_wide_pairs(&mut self, row: usize) {
        let line = &mut self.grid[row];
        for col in 0..line.len() {
            let orphaned = match line[col].width {
                0 => col == 0 || !line[col - 1].is_wide(),
                2 => col + 1 >= line.len() || !line[col + 1].is_wide_continuation(),
                _ => false,
            };
            if orphaned {
                line[col] = blanked(line[col]);
            }
        }
    }

    /// Print a character at the current cursor position
    pub fn print_char(&mut self, c: char) {
        let width = match c.width() {
            // Combining marks and other zero-width codepoints have no cell
            Some(0) | None => return,
            Some(2) if self.cols >= 2 => 2,
            Some(_) => 1,
        };

        // A wide character never straddles the right margin
        if width == 2 && self.cursor.col + 1 >= self.cols {
            if self.cursor.autowrap {
                self.wrap_cursor();
            } else {
                self.cursor.col = self.cols - 2;
            }
        }

        let row = self.cursor.row;
        let col = self.cursor.col;
        let fg = self.cursor.fg;
        let bg = self.cursor.bg;
        let attrs = self.cursor.attrs;

        self.clear_wide_fragments(row, col);
        if width == 2 {
            self.clear_wide_fragments(row, col + 1);
        }

        self.grid[row][col] = Cell {
            ch: c,
            fg,
            bg,
            attrs,
            width: width as u8,
        };
        if width == 2 {
            self.grid[row][col + 1] = Cell::spacer(fg, bg, attrs);
        }
        self.dirty.mark(row);

        // Advance; filling the last column wraps (and maybe scrolls) at once
        let new_col = col + width;
        if new_col < self.cols {
            self.cursor.col = new_col;
        } else if self.cursor.autowrap {
            self.wrap_cursor();
        } else {
            self.cursor.col = self.cols - 1;
        }
    }

    /// Column 0 of the next row, scrolling at the bottom of the region
    fn wrap_cursor(&mut self) {
        self.cursor.col = 0;
        self.index();
    }

    /// Handle linefeed (LF, VT, FF)
    pub fn linefeed(&mut self) {
        self.index();
    }

    /// Handle carriage return (CR)
    pub fn carriage_return(&mut self) {
        self.cursor.carriage_return();
    }

    /// Handle backspace (BS)
    pub fn backspace(&mut self) {
        self.cursor.move_left(1);
    }

    /// Handle horizontal tab (HT)
    pub fn tab(&mut self) {
        self.tab_forward(1);
    }

    /// Move to the n-th next tab stop (HT, CHT), or the last column
    pub fn tab_forward(&mut self, n: usize) {
        let mut col = self.cursor.col;
        for _ in 0..n {
            if col + 1 >= self.cols {
                break;
            }
            col = (col + 1..self.cols)
                .find(|&i| self.tab_stops[i])
                .unwrap_or(self.cols - 1);
        }
        self.cursor.set_col(col, self.cols);
    }

    /// Move to the n-th previous tab stop (CBT), or column 0
    pub fn tab_backward(&mut self, n: usize) {
        let mut col = self.cursor.col;
        for _ in 0..n {
            if col == 0 {
                break;
            }
            col = (0..col).rev().find(|&i| self.tab_stops[i]).unwrap_or(0);
        }
        self.cursor.set_col(col, self.cols);
    }

    /// Handle index (IND) - move cursor down, scroll if at bottom
    pub fn index(&mut self) {
        let row = self.cursor.row;

        if row == self.scroll_bottom {
            self.scroll_up(1);
        } else if row + 1 < self.rows {
            self.cursor.row += 1;
        }
    }

    /// Handle reverse index (RI) - move cursor up, scroll if at top
    pub fn reverse_index(&mut self) {
        let row = self.cursor.row;

        if row == self.scroll_top {
            self.scroll_down(1);
        } else if row > 0 {
            self.cursor.row -= 1;
        }
    }

    /// Handle next line (NEL) - move to start of next line
    pub fn next_line(&mut self) {
        self.index();
        self.cursor.col = 0;
    }

    /// Scroll the region up by n lines (content moves up, blank lines at bottom)
    pub fn scroll_up(&mut self, n: usize) {
        let top = self.scroll_top;
        let bottom = self.scroll_bottom;
        let n = n.min(bottom - top + 1);
        if n == 0 {
            return;
        }

        let region = &mut self.grid[top..=bottom];
        region.rotate_left(n);
        let exposed = region.len() - n;
        for line in &mut region[exposed..] {
            line.fill(Cell::default());
        }
        self.dirty.mark_range(top, bottom);
    }

    /// Scroll the region down by n lines (content moves down, blank lines at top)
    pub fn scroll_down(&mut self, n: usize) {
        let top = self.scroll_top;
        let bottom = self.scroll_bottom;
        let n = n.min(bottom - top + 1);
        if n == 0 {
            return;
        }

        let region = &mut self.grid[top..=bottom];
        region.rotate_right(n);
        for line in &mut region[..n] {
            line.fill(Cell::default());
        }
        self.dirty.mark_range(top, bottom);
    }

    /// Set scroll region (DECSTBM); an empty or inverted region resets it
    pub fn set_scroll_region(&mut self, top: usize, bottom: usize) {
        let top = top.min(self.rows - 1);
        let bottom = bottom.min(self.rows - 1);

        if top < bottom {
            self.scroll_top = top;
            self.scroll_bottom = bottom;
        } else {
            self.reset_scroll_region();
        }

        // DECSTBM homes the cursor
        self.cursor.move_to(0, 0, self.cols, self.rows);
    }

    /// Reset scroll region to full screen
    pub fn reset_scroll_region(&mut self) {
        self.scroll_top = 0;
        self.scroll_bottom = self.rows - 1;
    }

    /// Set a tab stop at the current column (HTS)
    pub fn set_tab_stop(&mut self) {
        let col = self.cursor.col;
        self.tab_stops[col] = true;
    }

    /// Clear tab stop at current column (TBC 0)
    pub fn clear_tab_stop(&mut self) {
        let col = self.cursor.col;
        self.tab_stops[col] = false;
    }

    /// Clear all tab stops (TBC 3)
    pub fn clear_all_tab_stops(&mut self) {
        self.tab_stops.fill(false);
    }

    /// Reset a span of one row to default cells
    fn erase_span(&mut self, row: usize, start: usize, end: usize) {
        let end = end.min(self.cols);
        if start >= end {
            return;
        }
        self.grid[row][start..end].fill(Cell::default());
        self.repair_wide_pairs(row);
        self.dirty.mark(row);
    }

    /// Erase in display (ED)
    ///
    /// 0: cursor to end, 1: start to cursor (inclusive), 2 and 3: everything.
    pub fn erase_in_display(&mut self, mode: u16) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        let cols = self.cols;

        match mode {
            0 => {
                self.erase_span(row, col, cols);
                for r in row + 1..self.rows {
                    self.erase_span(r, 0, cols);
                }
            }
            1 => {
                for r in 0..row {
                    self.erase_span(r, 0, cols);
                }
                self.erase_span(row, 0, col + 1);
            }
            // No scrollback, so 3 is the same as 2
            2 | 3 => {
                for r in 0..self.rows {
                    self.erase_span(r, 0, cols);
                }
            }
            _ => tracing::debug!("unknown ED mode {}", mode),
        }
    }

    /// Erase in line (EL)
    pub fn erase_in_line(&mut self, mode: u16) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        let cols = self.cols;

        match mode {
            0 => self.erase_span(row, col, cols),
            1 => self.erase_span(row, 0, col + 1),
            2 => self.erase_span(row, 0, cols),
            _ => tracing::debug!("unknown EL mode {}", mode),
        }
    }

    /// Erase characters (ECH)
    pub fn erase_chars(&mut self, n: usize) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        self.erase_span(row, col, col.saturating_add(n));
    }

    /// Insert lines (IL) at the cursor row, within the scroll region
    pub fn insert_lines(&mut self, n: usize) {
        let row = self.cursor.row;
        let bottom = self.scroll_bottom;

        if n == 0 || row < self.scroll_top || row > bottom {
            return;
        }

        let n = n.min(bottom - row + 1);
        let region = &mut self.grid[row..=bottom];
        region.rotate_right(n);
        for line in &mut region[..n] {
            line.fill(Cell::default());
        }
        self.dirty.mark_range(row, bottom);
        self.cursor.carriage_return();
    }

    /// Delete lines (DL) at the cursor row, within the scroll region
    pub fn delete_lines(&mut self, n: usize) {
        let row = self.cursor.row;
        let bottom = self.scroll_bottom;

        if n == 0 || row < self.scroll_top || row > bottom {
            return;
        }

        let n = n.min(bottom - row + 1);
        let region = &mut self.grid[row..=bottom];
        region.rotate_left(n);
        let exposed = region.len() - n;
        for line in &mut region[exposed..] {
            line.fill(Cell::default());
        }
        self.dirty.mark_range(row, bottom);
        self.cursor.carriage_return();
    }

    /// Insert blank characters (ICH), shifting the rest of the row right
    pub fn insert_chars(&mut self, n: usize) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        let n = n.min(self.cols - col);
        if n == 0 {
            return;
        }

        let tail = &mut self.grid[row][col..];
        tail.rotate_right(n);
        tail[..n].fill(Cell::default());
        self.repair_wide_pairs(row);
        self.dirty.mark(row);
    }

    /// Delete characters (DCH), shifting the rest of the row left
    pub fn delete_chars(&mut self, n: usize) {
        let row = self.cursor.row;
        let col = self.cursor.col;
        let n = n.min(self.cols - col);
        if n == 0 {
            return;
        }

        let tail = &mut self.grid[row][col..];
        tail.rotate_left(n);
        let exposed = tail.len() - n;
        tail[exposed..].fill(Cell::default());
        self.repair_wide_pairs(row);
        self.dirty.mark(row);
    }

    /// Move cursor to position (CUP/HVP)
    pub fn move_cursor_to(&mut self, row: usize, col: usize) {
        self.cursor.move_to(col, row, self.cols, self.rows);
    }

    /// Move cursor up (CUU), stopping at the top margin when inside the region
    pub fn move_cursor_up(&mut self, n: usize) {
        let min_row = if self.cursor.row >= self.scroll_top {
            self.scroll_top
        } else {
            0
        };
        self.cursor.move_up(n, min_row);
    }

    /// Move cursor down (CUD), stopping at the bottom margin when inside the region
    pub fn move_cursor_down(&mut self, n: usize) {
        let max_row = if self.cursor.row <= self.scroll_bottom {
            self.scroll_bottom
        } else {
            self.rows - 1
        };
        self.cursor.move_down(n, max_row);
    }

    /// Move cursor forward/right (CUF)
    pub fn move_cursor_forward(&mut self, n: usize) {
        self.cursor.move_right(n, self.cols);
    }

    /// Move cursor backward/left (CUB)
    pub fn move_cursor_backward(&mut self, n: usize) {
        self.cursor.move_left(n);
    }

    /// Move cursor to column (CHA/HPA)
    pub fn move_cursor_to_col(&mut self, col: usize) {
        self.cursor.set_col(col, self.cols);
    }

    /// Move cursor to row (VPA)
    pub fn move_cursor_to_row(&mut self, row: usize) {
        self.cursor.set_row(row, self.rows);
    }

    /// Save cursor state (DECSC)
    pub fn save_cursor(&mut self) {
        self.saved_cursor = self.cursor.save();
    }

    /// Restore cursor state (DECRC)
    pub fn restore_cursor(&mut self) {
        let saved = self.saved_cursor.clone();
        self.cursor.restore(&saved, self.cols, self.rows);
    }

    /// Show or hide the cursor (DECTCEM)
    pub fn set_cursor_visible(&mut self, visible: bool) {
        self.cursor.visible = visible;
    }

    /// Enable or disable autowrap (DECAWM)
    pub fn set_autowrap(&mut self, enabled: bool) {
        self.cursor.autowrap = enabled;
    }

    /// Apply an SGR parameter list to the pen
    ///
    /// An empty list is SGR 0. Unknown codes are skipped. A truncated or
    /// malformed 38/48 extended color ends processing of the list.
    pub fn set_attributes(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.cursor.reset_attributes();
            return;
        }

        let pen = &mut self.cursor;
        let mut i = 0;
        while i < params.len() {
            match params[i] {
                0 => pen.reset_attributes(),
                1 => pen.attrs.insert(Attrs::BOLD),
                3 => pen.attrs.insert(Attrs::ITALIC),
                4 | 21 => pen.attrs.insert(Attrs::UNDERLINE),
                5 | 6 => pen.attrs.insert(Attrs::BLINK),
                7 => pen.attrs.insert(Attrs::INVERSE),
                9 => pen.attrs.insert(Attrs::STRIKETHROUGH),
                22 => pen.attrs.remove(Attrs::BOLD),
                23 => pen.attrs.remove(Attrs::ITALIC),
                24 => pen.attrs.remove(Attrs::UNDERLINE),
                25 => pen.attrs.remove(Attrs::BLINK),
                27 => pen.attrs.remove(Attrs::INVERSE),
                29 => pen.attrs.remove(Attrs::STRIKETHROUGH),
                p @ 30..=37 => pen.fg = Color::Indexed((p - 30) as u8),
                39 => pen.fg = Color::Default,
                p @ 40..=47 => pen.bg = Color::Indexed((p - 40) as u8),
                49 => pen.bg = Color::Default,
                p @ 90..=97 => pen.fg = Color::Indexed((p - 90 + 8) as u8),
                p @ 100..=107 => pen.bg = Color::Indexed((p - 100 + 8) as u8),
                selector @ (38 | 48) => match parse_extended_color(&params[i + 1..]) {
                    Some((color, consumed)) => {
                        if selector == 38 {
                            pen.fg = color;
                        } else {
                            pen.bg = color;
                        }
                        i += consumed;
                    }
                    None => {
                        tracing::debug!("truncated extended color in SGR {:?}", params);
                        return;
                    }
                },
                p => tracing::trace!("unsupported SGR {}", p),
            }
            i += 1;
        }
    }

    /// Resize the screen, keeping content anchored at the top-left
    ///
    /// Rows and columns beyond the new size are dropped, new ones are
    /// blank. Zero dimensions are clamped to 1. Every row ends up dirty.
    pub fn resize(&mut self, rows: usize, cols: usize) {
        let rows = rows.max(1);
        let cols = cols.max(1);

        for line in &mut self.grid {
            line.resize(cols, Cell::default());
        }
        self.grid.resize_with(rows, || vec![Cell::default(); cols]);

        let old_cols = self.cols;
        self.rows = rows;
        self.cols = cols;

        if cols < old_cols {
            for row in 0..rows {
                self.repair_wide_pairs(row);
            }
        }

        self.reset_scroll_region();

        // Existing stops survive, new columns get the default stops
        let defaults = default_tab_stops(cols);
        self.tab_stops.resize(cols, false);
        for col in old_cols.min(cols)..cols {
            self.tab_stops[col] = defaults[col];
        }

        self.cursor.col = self.cursor.col.min(cols - 1);
        self.cursor.row = self.cursor.row.min(rows - 1);

        self.dirty.resize(rows);
    }

    /// Reset the terminal to initial state (RIS)
    pub fn reset(&mut self) {
        for line in &mut self.grid {
            line.fill(Cell::default());
        }
        self.cursor = Cursor::default();
        self.saved_cursor = SavedCursor::default();
        self.reset_scroll_region();
        self.tab_stops = default_tab_stops(self.cols);
        self.title.clear();
        self.dirty.mark_all();
    }
}

/// Parse the tail of a 38/48 SGR: `5;n` or `2;r;g;b`
///
/// Returns the color and the number of parameters consumed after the
/// selector.
fn parse_extended_color(params: &[u16]) -> Option<(Color, usize)> {
    let clamp = |v: u16| v.min(255) as u8;
    match params {
        [5, index, ..] => Some((Color::Indexed(clamp(*index)), 2)),
        [2, r, g, b, ..] => Some((Color::Rgb(clamp(*r), clamp(*g), clamp(*b)), 4)),
        _ => None,
    }
}
