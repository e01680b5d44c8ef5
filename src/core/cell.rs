//! Terminal Cell
//!
//! Represents a single cell in the terminal grid, containing a character
//! and its associated styling attributes.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Text attributes of a cell
    ///
    /// The bit values are the ones reported through the C ABI.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct Attrs: u8 {
        const BOLD = 0x01;
        const ITALIC = 0x02;
        const UNDERLINE = 0x04;
        const BLINK = 0x08;
        const INVERSE = 0x10;
        const STRIKETHROUGH = 0x20;
    }
}

/// A single cell in the terminal grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// The character in this cell
    pub ch: char,
    /// Foreground color
    pub fg: Color,
    /// Background color
    pub bg: Color,
    /// Text attributes
    pub attrs: Attrs,
    /// Display width: 1, 2 for the leading half of a wide character,
    /// 0 for the spacer that follows it
    pub width: u8,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            ch: ' ',
            fg: Color::Default,
            bg: Color::Default,
            attrs: Attrs::empty(),
            width: 1,
        }
    }
}

impl Cell {
    /// Create a new cell with a single character and default attributes
    pub fn new(c: char) -> Self {
        Self {
            ch: c,
            ..Default::default()
        }
    }

    /// Create the spacer that follows a wide character
    pub fn spacer(fg: Color, bg: Color, attrs: Attrs) -> Self {
        Self {
            ch: ' ',
            fg,
            bg,
            attrs,
            width: 0,
        }
    }

    /// Check if this cell is the second half of a double-width character
    pub fn is_wide_continuation(&self) -> bool {
        self.width == 0
    }

    /// Check if this cell holds a double-width character
    pub fn is_wide(&self) -> bool {
        self.width == 2
    }

    /// Check if this cell is indistinguishable from a cleared cell
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Clear the cell to default state
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Color representation supporting indexed and RGB colors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    /// Default terminal color (foreground or background)
    #[default]
    Default,
    /// 256-color palette index
    Indexed(u8),
    /// 24-bit RGB color
    Rgb(u8, u8, u8),
}

impl Color {
    /// Default foreground (light gray)
    pub const DEFAULT_FG: (u8, u8, u8) = (229, 229, 229);
    /// Default background (black)
    pub const DEFAULT_BG: (u8, u8, u8) = (0, 0, 0);

    /// Convert a 256-color index to RGB
    /// This implements the standard xterm 256-color palette
    pub fn indexed_to_rgb(index: u8) -> (u8, u8, u8) {
        match index {
            // Standard colors (0-15) - using typical xterm defaults
            0 => (0, 0, 0),        // Black
            1 => (205, 0, 0),      // Red
            2 => (0, 205, 0),      // Green
            3 => (205, 205, 0),    // Yellow
            4 => (0, 0, 238),      // Blue
            5 => (205, 0, 205),    // Magenta
            6 => (0, 205, 205),    // Cyan
            7 => (229, 229, 229),  // White
            8 => (127, 127, 127),  // Bright Black
            9 => (255, 0, 0),      // Bright Red
            10 => (0, 255, 0),     // Bright Green
            11 => (255, 255, 0),   // Bright Yellow
            12 => (92, 92, 255),   // Bright Blue
            13 => (255, 0, 255),   // Bright Magenta
            14 => (0, 255, 255),   // Bright Cyan
            15 => (255, 255, 255), // Bright White
            // 216 color cube (16-231)
            16..=231 => {
                let n = index - 16;
                let level = |v: u8| if v == 0 { 0 } else { 55 + v * 40 };
                (level(n / 36), level((n % 36) / 6), level(n % 6))
            }
            // Grayscale (232-255)
            232..=255 => {
                let gray = 8 + (index - 232) * 10;
                (gray, gray, gray)
            }
        }
    }

    /// Convert this color to RGB, using defaults for Default color
    pub fn to_rgb(self, is_foreground: bool) -> (u8, u8, u8) {
        match self {
            Color::Default if is_foreground => Self::DEFAULT_FG,
            Color::Default => Self::DEFAULT_BG,
            Color::Indexed(i) => Self::indexed_to_rgb(i),
            Color::Rgb(r, g, b) => (r, g, b),
        }
    }
}
