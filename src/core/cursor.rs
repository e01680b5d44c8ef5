//! Cursor state management
//!
//! The cursor tracks position, visibility and the pen (the attributes
//! applied to newly printed characters). It also supports save/restore
//! operations (DECSC/DECRC and CSI s/u).

use serde::{Deserialize, Serialize};

use super::{Attrs, Color};

/// Cursor state including position, visibility and pen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    /// Column position (0-indexed)
    pub col: usize,
    /// Row position (0-indexed)
    pub row: usize,
    /// Whether the cursor is visible (DECTCEM)
    pub visible: bool,
    /// Current text attributes (applied to new characters)
    pub attrs: Attrs,
    /// Current foreground color
    pub fg: Color,
    /// Current background color
    pub bg: Color,
    /// Autowrap mode (DECAWM) - wrap at end of line
    pub autowrap: bool,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            col: 0,
            row: 0,
            visible: true,
            attrs: Attrs::empty(),
            fg: Color::Default,
            bg: Color::Default,
            autowrap: true,
        }
    }
}

/// Saved cursor state for DECSC/DECRC
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedCursor {
    pub col: usize,
    pub row: usize,
    pub attrs: Attrs,
    pub fg: Color,
    pub bg: Color,
    pub autowrap: bool,
}

impl Default for SavedCursor {
    fn default() -> Self {
        Cursor::default().save()
    }
}

impl Cursor {
    /// Create a new cursor at the home position
    pub fn new() -> Self {
        Self::default()
    }

    /// Move cursor to absolute position, clamping to bounds
    pub fn move_to(&mut self, col: usize, row: usize, cols: usize, rows: usize) {
        self.col = col.min(cols.saturating_sub(1));
        self.row = row.min(rows.saturating_sub(1));
    }

    /// Move cursor up by n rows, stopping at `min_row`
    pub fn move_up(&mut self, n: usize, min_row: usize) {
        self.row = self.row.saturating_sub(n).max(min_row);
    }

    /// Move cursor down by n rows, stopping at `max_row`
    pub fn move_down(&mut self, n: usize, max_row: usize) {
        self.row = self.row.saturating_add(n).min(max_row);
    }

    /// Move cursor left by n columns, stopping at column 0
    pub fn move_left(&mut self, n: usize) {
        self.col = self.col.saturating_sub(n);
    }

    /// Move cursor right by n columns, stopping at right margin
    pub fn move_right(&mut self, n: usize, cols: usize) {
        self.col = self.col.saturating_add(n).min(cols.saturating_sub(1));
    }

    /// Move cursor to column (0-indexed)
    pub fn set_col(&mut self, col: usize, cols: usize) {
        self.col = col.min(cols.saturating_sub(1));
    }

    /// Move cursor to row (0-indexed)
    pub fn set_row(&mut self, row: usize, rows: usize) {
        self.row = row.min(rows.saturating_sub(1));
    }

    /// Carriage return - move to column 0
    pub fn carriage_return(&mut self) {
        self.col = 0;
    }

    /// Save cursor state
    pub fn save(&self) -> SavedCursor {
        SavedCursor {
            col: self.col,
            row: self.row,
            attrs: self.attrs,
            fg: self.fg,
            bg: self.bg,
            autowrap: self.autowrap,
        }
    }

    /// Restore cursor state, clamped to the current grid
    pub fn restore(&mut self, saved: &SavedCursor, cols: usize, rows: usize) {
        self.col = saved.col.min(cols.saturating_sub(1));
        self.row = saved.row.min(rows.saturating_sub(1));
        self.attrs = saved.attrs;
        self.fg = saved.fg;
        self.bg = saved.bg;
        self.autowrap = saved.autowrap;
    }

    /// Reset only the text attributes (SGR 0)
    pub fn reset_attributes(&mut self) {
        self.attrs = Attrs::empty();
        self.fg = Color::Default;
        self.bg = Color::Default;
    }
}
