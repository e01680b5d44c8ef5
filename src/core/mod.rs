//! Terminal Core Module
//!
//! Platform-independent terminal state management. This module contains:
//! - Screen model (a single grid, no scrollback)
//! - Cell representation with attributes
//! - Cursor state and positioning
//! - Dirty row tracking
//! - Deterministic snapshot generation
//!
//! The core is designed to be completely deterministic: given the same
//! sequence of terminal actions, it will always produce the same state.

mod cell;
mod cursor;
mod dirty;
mod screen;
mod snapshot;

pub use cell::{Attrs, Cell, Color};
pub use cursor::{Cursor, SavedCursor};
pub use dirty::DirtyRows;
pub use screen::Screen;
pub use snapshot::{CellSnapshot, ColorSnapshot, CursorSnapshot, Snapshot, StyleSnapshot};
