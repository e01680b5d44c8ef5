//! Deterministic snapshot generation
//!
//! Snapshots capture the complete screen state in a serializable format
//! for testing and debugging. Given the same byte stream, the terminal
//! must produce identical snapshots, however the stream was chunked.

use serde::{Deserialize, Serialize};

use super::cell::{Attrs, Cell, Color};
use super::cursor::Cursor;
use super::screen::Screen;

/// A complete snapshot of the screen state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Screen dimensions
    pub rows: usize,
    pub cols: usize,
    /// Visible grid content (row-major)
    pub grid: Vec<Vec<CellSnapshot>>,
    /// Cursor state
    pub cursor: CursorSnapshot,
    /// Scroll region
    pub scroll_top: usize,
    pub scroll_bottom: usize,
    /// Window title
    pub title: String,
}

/// Snapshot of a single cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSnapshot {
    /// Character content
    pub ch: char,
    /// Foreground color
    pub fg: ColorSnapshot,
    /// Background color
    pub bg: ColorSnapshot,
    /// Style attributes
    #[serde(default, skip_serializing_if = "StyleSnapshot::is_plain")]
    pub style: StyleSnapshot,
    /// Cell width (0 for continuation, 1 normal, 2 wide)
    pub width: u8,
}

/// Snapshot of a color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ColorSnapshot {
    Default,
    Indexed { index: u8 },
    Rgb { r: u8, g: u8, b: u8 },
}

/// Snapshot of style attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StyleSnapshot {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub blink: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub inverse: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub strikethrough: bool,
}

impl StyleSnapshot {
    fn is_plain(&self) -> bool {
        *self == Self::default()
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// Snapshot of cursor state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CursorSnapshot {
    pub row: usize,
    pub col: usize,
    pub visible: bool,
}

impl From<Color> for ColorSnapshot {
    fn from(color: Color) -> Self {
        match color {
            Color::Default => ColorSnapshot::Default,
            Color::Indexed(index) => ColorSnapshot::Indexed { index },
            Color::Rgb(r, g, b) => ColorSnapshot::Rgb { r, g, b },
        }
    }
}

impl From<Attrs> for StyleSnapshot {
    fn from(attrs: Attrs) -> Self {
        StyleSnapshot {
            bold: attrs.contains(Attrs::BOLD),
            italic: attrs.contains(Attrs::ITALIC),
            underline: attrs.contains(Attrs::UNDERLINE),
            blink: attrs.contains(Attrs::BLINK),
            inverse: attrs.contains(Attrs::INVERSE),
            strikethrough: attrs.contains(Attrs::STRIKETHROUGH),
        }
    }
}

impl From<&Cell> for CellSnapshot {
    fn from(cell: &Cell) -> Self {
        CellSnapshot {
            ch: cell.ch,
            fg: cell.fg.into(),
            bg: cell.bg.into(),
            style: cell.attrs.into(),
            width: cell.width,
        }
    }
}

impl From<&Cursor> for CursorSnapshot {
    fn from(cursor: &Cursor) -> Self {
        CursorSnapshot {
            row: cursor.row,
            col: cursor.col,
            visible: cursor.visible,
        }
    }
}

impl Snapshot {
    /// Create a snapshot from the current screen state
    pub fn from_screen(screen: &Screen) -> Self {
        let grid = (0..screen.rows())
            .map(|row| {
                screen
                    .get_row(row)
                    .unwrap_or_default()
                    .iter()
                    .map(CellSnapshot::from)
                    .collect()
            })
            .collect();

        Snapshot {
            rows: screen.rows(),
            cols: screen.cols(),
            grid,
            cursor: CursorSnapshot::from(screen.cursor()),
            scroll_top: screen.scroll_top(),
            scroll_bottom: screen.scroll_bottom(),
            title: screen.title().to_string(),
        }
    }

    /// Convert snapshot to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse snapshot from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get a simple text representation of the screen (for debugging)
    pub fn to_text(&self) -> String {
        let mut result = String::new();

        for row in &self.grid {
            let start = result.len();
            for cell in row {
                if cell.width == 0 {
                    continue; // Skip continuation cells
                }
                result.push(cell.ch);
            }
            // Trim trailing spaces and add newline
            let trimmed = result[start..].trim_end_matches(' ').len();
            result.truncate(start + trimmed);
            result.push('\n');
        }

        // Remove trailing empty lines
        while result.ends_with("\n\n") {
            result.pop();
        }

        result
    }
}
