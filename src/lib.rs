//! termcore: an embeddable terminal emulator core
//!
//! The crate turns the byte stream written by a program into a grid of
//! cells and drives that program through a pseudoterminal. Rendering,
//! windowing and input handling are left to the embedder, which talks to
//! the engine either through [`Terminal`] or the C ABI in [`ffi`].
//!
//! - `parser`: VT/xterm escape sequence parser with UTF-8 decoding
//! - `core`: Screen model, cells, cursor, dirty rows and snapshots
//! - `pty`: PTY sessions (Unix backend)
//! - `terminal`: the engine facade tying the three together
//! - `ffi`: the C ABI over [`Terminal`]

pub mod config;
pub mod core;
pub mod ffi;
pub mod parser;
pub mod pty;
pub mod terminal;

pub use config::TerminalConfig;
pub use terminal::Terminal;
