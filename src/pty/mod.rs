//! PTY (Pseudoterminal) sessions
//!
//! A [`PtySession`] is the primary side of a pseudoterminal plus the child
//! process attached to its secondary side. The terminal only talks to the
//! trait, so other backends (or test doubles) can be injected. The Unix
//! backend is the only real one; elsewhere opening a session fails with
//! [`PtyError::Unsupported`].

use std::io;

use crate::config::TerminalConfig;

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::UnixPty;

/// Error type for PTY operations
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("Failed to open PTY master: {0}")]
    OpenMaster(#[source] io::Error),

    #[error("Failed to grant PTY access: {0}")]
    GrantPty(#[source] io::Error),

    #[error("Failed to unlock PTY: {0}")]
    UnlockPty(#[source] io::Error),

    #[error("Failed to get PTY slave name: {0}")]
    PtsName(#[source] io::Error),

    #[error("Failed to fork: {0}")]
    Fork(#[source] io::Error),

    #[error("Failed to set window size: {0}")]
    SetWinsize(#[source] io::Error),

    #[error("Failed to get window size: {0}")]
    GetWinsize(#[source] io::Error),

    #[error("Failed to set descriptor flags: {0}")]
    SetFlags(#[source] io::Error),

    #[error("Failed to read from PTY: {0}")]
    Read(#[source] io::Error),

    #[error("Failed to write to PTY: {0}")]
    Write(#[source] io::Error),

    #[error("Invalid command line: {0:?} contains a NUL byte")]
    InvalidCommand(String),

    #[error("Shell not found: {0}")]
    ShellNotFound(String),

    #[error("PTY is closed")]
    Closed,

    #[error("No PTY attached to this terminal")]
    NotAttached,

    #[error("PTY sessions are not supported on this platform")]
    Unsupported,
}

/// Result type for PTY operations
pub type PtyResult<T> = Result<T, PtyError>;

/// Window size for PTY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
    pub pixel_width: u16,
    pub pixel_height: u16,
}

impl WindowSize {
    /// Create a new window size with just rows and columns
    pub fn new(rows: u16, cols: u16) -> Self {
        Self {
            rows,
            cols,
            pixel_width: 0,
            pixel_height: 0,
        }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(24, 80)
    }
}

/// A running child process behind a pseudoterminal
///
/// None of these calls block, except [`PtySession::terminate`], which
/// waits at most for its configured grace period.
pub trait PtySession: Send {
    /// Read whatever output is available
    ///
    /// `Ok(0)` means no data right now. Errors mean the session is over
    /// (the child hung up or the descriptor is closed).
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> PtyResult<usize>;

    /// Write input for the child, returning how many bytes the kernel took
    ///
    /// `Ok(0)` means the buffer is full; the caller retries later.
    fn write(&mut self, data: &[u8]) -> PtyResult<usize>;

    /// Tell the kernel (and through SIGWINCH the child) the new size
    fn resize(&mut self, size: WindowSize) -> PtyResult<()>;

    /// Hang up the child and reap it; safe to call more than once
    fn terminate(&mut self);

    /// Descriptor to poll for readability, if there is one
    fn raw_fd(&self) -> Option<i32>;

    /// Whether the child is still running
    fn is_alive(&mut self) -> bool;
}

/// Open a session for the current platform
#[cfg(unix)]
pub fn open_session(size: WindowSize, config: &TerminalConfig) -> PtyResult<Box<dyn PtySession>> {
    Ok(Box::new(UnixPty::spawn(size, config)?))
}

/// Open a session for the current platform
#[cfg(not(unix))]
pub fn open_session(
    _size: WindowSize,
    _config: &TerminalConfig,
) -> PtyResult<Box<dyn PtySession>> {
    Err(PtyError::Unsupported)
}
