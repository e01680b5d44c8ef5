//! C ABI
//!
//! Opaque `Terminal` handles for embedders in other languages. The header
//! lives in `include/termcore.h`.
//!
//! Every function taking a handle requires a live handle returned by one of
//! the constructors and not yet passed to [`terminal_free`]. This is only
//! checked with `debug_assert!`. Calls on one handle must not overlap.

use std::ptr;
use std::slice;

use crate::core::{Cell, Color};
use crate::terminal::Terminal;

/// A cell with colors resolved to RGB
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CCell {
    /// Unicode scalar value; the right half of a wide character reports a space
    pub ch: u32,
    pub fg_r: u8,
    pub fg_g: u8,
    pub fg_b: u8,
    pub bg_r: u8,
    pub bg_g: u8,
    pub bg_b: u8,
    /// Attribute bits: bold 0x01, italic 0x02, underline 0x04, blink 0x08,
    /// inverse 0x10, strikethrough 0x20
    pub flags: u8,
}

impl From<&Cell> for CCell {
    fn from(cell: &Cell) -> Self {
        let (fg_r, fg_g, fg_b) = cell.fg.to_rgb(true);
        let (bg_r, bg_g, bg_b) = cell.bg.to_rgb(false);
        let ch = if cell.is_wide_continuation() { ' ' } else { cell.ch };

        CCell {
            ch: ch as u32,
            fg_r,
            fg_g,
            fg_b,
            bg_r,
            bg_g,
            bg_b,
            flags: cell.attrs.bits(),
        }
    }
}

impl Default for CCell {
    fn default() -> Self {
        CCell::from(&Cell::default())
    }
}

/// Borrow the terminal behind a handle
///
/// # Safety
///
/// `term` must be a live handle with no other borrow in progress.
unsafe fn handle<'a>(term: *const Terminal) -> &'a Terminal {
    debug_assert!(!term.is_null(), "NULL terminal handle");
    &*term
}

/// # Safety
///
/// Same as [`handle`].
unsafe fn handle_mut<'a>(term: *mut Terminal) -> &'a mut Terminal {
    debug_assert!(!term.is_null(), "NULL terminal handle");
    &mut *term
}

/// View a caller buffer as a slice; `None` for NULL with a nonzero length
///
/// # Safety
///
/// A non-NULL `data` must be valid for reads of `len` elements.
unsafe fn input<'a, T>(data: *const T, len: usize) -> Option<&'a [T]> {
    if len == 0 {
        Some(&[])
    } else if data.is_null() {
        None
    } else {
        Some(slice::from_raw_parts(data, len))
    }
}

/// # Safety
///
/// A non-NULL `data` must be valid for writes of `len` elements.
unsafe fn output<'a, T>(data: *mut T, len: usize) -> Option<&'a mut [T]> {
    if len == 0 {
        Some(&mut [])
    } else if data.is_null() {
        None
    } else {
        Some(slice::from_raw_parts_mut(data, len))
    }
}

fn saturate(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Create a terminal without a child process
#[no_mangle]
pub extern "C" fn terminal_new(rows: u16, cols: u16) -> *mut Terminal {
    Box::into_raw(Box::new(Terminal::new(rows as usize, cols as usize)))
}

/// Create a terminal running the default shell; NULL on failure
#[no_mangle]
pub extern "C" fn terminal_new_with_pty(rows: u16, cols: u16) -> *mut Terminal {
    match Terminal::with_pty(rows as usize, cols as usize) {
        Ok(terminal) => Box::into_raw(Box::new(terminal)),
        Err(err) => {
            tracing::warn!("failed to open PTY session: {}", err);
            ptr::null_mut()
        }
    }
}

/// Destroy a terminal, terminating its child; NULL is ignored
///
/// # Safety
///
/// `term` must be NULL or a live handle; it is dangling afterwards.
#[no_mangle]
pub unsafe extern "C" fn terminal_free(term: *mut Terminal) {
    if !term.is_null() {
        drop(Box::from_raw(term));
    }
}

/// Feed child output through the parser
///
/// # Safety
///
/// `term` must be a live handle and `data` valid for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn terminal_process_bytes(term: *mut Terminal, data: *const u8, len: usize) {
    let terminal = handle_mut(term);
    if let Some(bytes) = input(data, len) {
        terminal.process_bytes(bytes);
    }
}

/// Write input to the child; bytes written, or -1 without a PTY or on error
///
/// # Safety
///
/// `term` must be a live handle and `data` valid for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn terminal_send_input(
    term: *mut Terminal,
    data: *const u8,
    len: usize,
) -> isize {
    let terminal = handle_mut(term);
    let Some(bytes) = input(data, len) else {
        return -1;
    };
    match terminal.send_input(bytes) {
        Ok(n) => n as isize,
        Err(err) => {
            tracing::warn!("send_input failed: {}", err);
            -1
        }
    }
}

/// Resize the grid and the PTY (if any)
///
/// # Safety
///
/// `term` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn terminal_resize(term: *mut Terminal, rows: u16, cols: u16) {
    let terminal = handle_mut(term);
    if let Err(err) = terminal.resize(rows as usize, cols as usize) {
        tracing::warn!("PTY resize failed: {}", err);
    }
}

/// Cell at (row, col); the default cell when out of range
///
/// # Safety
///
/// `term` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn terminal_get_cell(term: *const Terminal, row: u16, col: u16) -> CCell {
    CCell::from(&handle(term).cell(row as usize, col as usize))
}

/// Copy up to `cap` cells of `row` into `buf`; returns the number written
///
/// # Safety
///
/// `term` must be a live handle and `buf` valid for `cap` cells.
#[no_mangle]
pub unsafe extern "C" fn terminal_get_row(
    term: *const Terminal,
    row: u16,
    buf: *mut CCell,
    cap: usize,
) -> usize {
    let terminal = handle(term);
    let (Some(cells), Some(out)) = (terminal.row(row as usize), output(buf, cap)) else {
        return 0;
    };

    let count = cells.len().min(out.len());
    for (slot, cell) in out.iter_mut().zip(cells) {
        *slot = CCell::from(cell);
    }
    count
}

/// # Safety
///
/// `term` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn terminal_get_cursor_row(term: *const Terminal) -> u16 {
    saturate(handle(term).cursor().row)
}

/// # Safety
///
/// `term` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn terminal_get_cursor_col(term: *const Terminal) -> u16 {
    saturate(handle(term).cursor().col)
}

/// # Safety
///
/// `term` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn terminal_get_rows(term: *const Terminal) -> u16 {
    saturate(handle(term).rows())
}

/// # Safety
///
/// `term` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn terminal_get_cols(term: *const Terminal) -> u16 {
    saturate(handle(term).cols())
}

/// Copy dirty row indices (ascending) into `buf`; returns the number written
///
/// Nothing is cleared; call [`terminal_mark_clean`] after rendering.
///
/// # Safety
///
/// `term` must be a live handle and `buf` valid for `cap` entries.
#[no_mangle]
pub unsafe extern "C" fn terminal_get_dirty_rows(
    term: *const Terminal,
    buf: *mut u16,
    cap: usize,
) -> usize {
    let terminal = handle(term);
    match output(buf, cap) {
        Some(out) => terminal.dirty_rows(out),
        None => 0,
    }
}

/// # Safety
///
/// `term` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn terminal_mark_clean(term: *mut Terminal) {
    handle_mut(term).mark_clean();
}

/// PTY descriptor for polling, or -1 without a PTY
///
/// # Safety
///
/// `term` must be a live handle.
#[no_mangle]
pub unsafe extern "C" fn terminal_get_pty_fd(term: *const Terminal) -> i32 {
    handle(term).pty_fd().unwrap_or(-1)
}

/// Non-blocking read of child output: bytes read, 0 when nothing is
/// available, -1 without a PTY or on error
///
/// # Safety
///
/// `term` must be a live handle and `buf` valid for `cap` bytes.
#[no_mangle]
pub unsafe extern "C" fn terminal_read_pty(term: *mut Terminal, buf: *mut u8, cap: usize) -> isize {
    let terminal = handle_mut(term);
    let Some(out) = output(buf, cap) else {
        return -1;
    };
    match terminal.read_pty(out) {
        Ok(n) => n as isize,
        Err(err) => {
            tracing::warn!("read_pty failed: {}", err);
            -1
        }
    }
}
