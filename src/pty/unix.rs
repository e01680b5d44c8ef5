//! Unix PTY implementation
//!
//! Implements PTY creation and child process management using POSIX APIs.
//! Everything that allocates (argument vectors, environment, program lookup)
//! happens before `fork`; the child only makes async-signal-safe calls.

use std::ffi::{CString, OsStr};
use std::io::{self, Read, Write};
use std::os::fd::BorrowedFd;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::io::{AsRawFd, RawFd};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use nix::fcntl::{fcntl, FcntlArg, FdFlag, OFlag};
use nix::libc::{self, c_char};
use nix::poll::{poll, PollFd, PollFlags};
use nix::pty::{grantpt, posix_openpt, unlockpt, PtyMaster};
use nix::sys::signal::{kill, Signal};
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{access, fork, AccessFlags, ForkResult, Pid};

use super::{PtyError, PtyResult, PtySession, WindowSize};
use crate::config::TerminalConfig;

/// How often terminate checks whether the child has exited
const REAP_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Exit status of a child whose exec failed
const EXEC_FAILED: libc::c_int = 127;

/// A pseudoterminal with a spawned child process
pub struct UnixPty {
    /// The PTY master; `None` once the session is terminated
    master: Option<PtyMaster>,
    /// The child process ID
    child_pid: Pid,
    /// Whether the child has not been reaped yet
    child_alive: bool,
    /// Wait between SIGHUP and SIGKILL
    grace: Duration,
}

impl UnixPty {
    /// Spawn the configured program on a new PTY of the given size
    pub fn spawn(size: WindowSize, config: &TerminalConfig) -> PtyResult<Self> {
        let program = config.resolve_shell();
        let path = find_program(&program).ok_or_else(|| PtyError::ShellNotFound(program.clone()))?;

        let path = cstring(path.as_os_str().as_bytes())?;
        let argv = std::iter::once(program.as_str())
            .chain(config.shell_args.iter().map(String::as_str))
            .map(|arg| cstring(arg.as_bytes()))
            .collect::<PtyResult<Vec<_>>>()?;
        let envp = child_environment(config)?;

        let argv_ptrs = null_terminated(&argv);
        let envp_ptrs = null_terminated(&envp);

        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY)
            .map_err(|e| PtyError::OpenMaster(e.into()))?;
        grantpt(&master).map_err(|e| PtyError::GrantPty(e.into()))?;
        unlockpt(&master).map_err(|e| PtyError::UnlockPty(e.into()))?;
        let slave = cstring(slave_name(&master)?.as_bytes())?;

        // The child must not inherit the master across exec
        fcntl(master.as_raw_fd(), FcntlArg::F_SETFD(FdFlag::FD_CLOEXEC))
            .map_err(|e| PtyError::SetFlags(e.into()))?;
        set_window_size(master.as_raw_fd(), size)?;

        // SAFETY: the child branch only calls async-signal-safe functions on
        // data prepared above, then execs or exits
        match unsafe { fork() }.map_err(|e| PtyError::Fork(e.into()))? {
            ForkResult::Child => unsafe { exec_child(&slave, &path, &argv_ptrs, &envp_ptrs) },
            ForkResult::Parent { child } => {
                let pty = UnixPty {
                    master: Some(master),
                    child_pid: child,
                    child_alive: true,
                    grace: config.terminate_grace(),
                };
                // On failure the drop of `pty` hangs up and reaps the child
                pty.set_nonblocking()?;

                tracing::debug!(pid = child.as_raw(), program = %program, "spawned PTY child");
                Ok(pty)
            }
        }
    }

    /// Get the child process ID
    pub fn child_pid(&self) -> Pid {
        self.child_pid
    }

    /// Size currently recorded by the kernel
    pub fn window_size(&self) -> PtyResult<WindowSize> {
        get_window_size(self.master()?.as_raw_fd())
    }

    /// Wait up to `timeout_ms` for output; true when a read would not block
    pub fn poll_readable(&self, timeout_ms: i32) -> PtyResult<bool> {
        let fd = self.master()?.as_raw_fd();
        // SAFETY: the master fd stays open for the duration of this call
        let borrowed_fd = unsafe { BorrowedFd::borrow_raw(fd) };
        let mut fds = [PollFd::new(&borrowed_fd, PollFlags::POLLIN)];
        let n = poll(&mut fds, timeout_ms).map_err(|e| PtyError::Read(e.into()))?;
        Ok(n > 0
            && fds[0]
                .revents()
                .is_some_and(|r| r.intersects(PollFlags::POLLIN | PollFlags::POLLHUP)))
    }

    fn master(&self) -> PtyResult<&PtyMaster> {
        self.master.as_ref().ok_or(PtyError::Closed)
    }

    fn set_nonblocking(&self) -> PtyResult<()> {
        let fd = self.master()?.as_raw_fd();
        let flags = fcntl(fd, FcntlArg::F_GETFL).map_err(|e| PtyError::SetFlags(e.into()))?;
        let flags = OFlag::from_bits_truncate(flags);
        fcntl(fd, FcntlArg::F_SETFL(flags | OFlag::O_NONBLOCK))
            .map_err(|e| PtyError::SetFlags(e.into()))?;
        Ok(())
    }

    /// Non-blocking reap; true once the child is gone
    fn try_reap(&mut self) -> bool {
        match waitpid(self.child_pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::StillAlive) => false,
            Ok(status) => {
                tracing::debug!(?status, "PTY child exited");
                self.child_alive = false;
                true
            }
            Err(_) => {
                self.child_alive = false;
                true
            }
        }
    }
}

impl PtySession for UnixPty {
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> PtyResult<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let master = self.master.as_mut().ok_or(PtyError::Closed)?;
        match master.read(buf) {
            // End of file: the other side hung up (BSD reports this instead of EIO)
            Ok(0) => Err(PtyError::Closed),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(PtyError::Read(e)),
        }
    }

    fn write(&mut self, data: &[u8]) -> PtyResult<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let master = self.master.as_mut().ok_or(PtyError::Closed)?;
        match master.write(data) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(e) => Err(PtyError::Write(e)),
        }
    }

    fn resize(&mut self, size: WindowSize) -> PtyResult<()> {
        set_window_size(self.master()?.as_raw_fd(), size)
    }

    fn terminate(&mut self) {
        // Closing the master hangs up the line for the child
        self.master = None;
        if !self.child_alive {
            return;
        }

        let _ = kill(self.child_pid, Signal::SIGHUP);
        let deadline = Instant::now() + self.grace;
        loop {
            if self.try_reap() {
                return;
            }
            if Instant::now() >= deadline {
                break;
            }
            std::thread::sleep(REAP_POLL_INTERVAL);
        }

        tracing::debug!(pid = self.child_pid.as_raw(), "PTY child ignored SIGHUP, killing");
        let _ = kill(self.child_pid, Signal::SIGKILL);
        let _ = waitpid(self.child_pid, None);
        self.child_alive = false;
    }

    fn raw_fd(&self) -> Option<i32> {
        self.master.as_ref().map(|m| m.as_raw_fd())
    }

    fn is_alive(&mut self) -> bool {
        self.child_alive && !self.try_reap()
    }
}

impl Drop for UnixPty {
    fn drop(&mut self) {
        self.terminate();
    }
}

/// Runs in the forked child; never returns
///
/// # Safety
///
/// Must only be called in a freshly forked child. All pointers must come
/// from live, NUL-terminated data prepared by the parent.
unsafe fn exec_child(
    slave: &CString,
    path: &CString,
    argv: &[*const c_char],
    envp: &[*const c_char],
) -> ! {
    libc::setsid();

    let slave_fd = libc::open(slave.as_ptr(), libc::O_RDWR);
    if slave_fd < 0 {
        libc::_exit(EXEC_FAILED);
    }
    // Not fatal where the open already made it the controlling terminal
    libc::ioctl(slave_fd, libc::TIOCSCTTY as _, 0);

    libc::dup2(slave_fd, libc::STDIN_FILENO);
    libc::dup2(slave_fd, libc::STDOUT_FILENO);
    libc::dup2(slave_fd, libc::STDERR_FILENO);
    if slave_fd > libc::STDERR_FILENO {
        libc::close(slave_fd);
    }

    // The Rust runtime ignores SIGPIPE; shells expect the default
    libc::signal(libc::SIGPIPE, libc::SIG_DFL);

    libc::execve(path.as_ptr(), argv.as_ptr(), envp.as_ptr());
    libc::_exit(EXEC_FAILED)
}

fn cstring(bytes: &[u8]) -> PtyResult<CString> {
    CString::new(bytes)
        .map_err(|_| PtyError::InvalidCommand(String::from_utf8_lossy(bytes).into_owned()))
}

fn null_terminated(strings: &[CString]) -> Vec<*const c_char> {
    strings
        .iter()
        .map(|s| s.as_ptr())
        .chain(std::iter::once(std::ptr::null()))
        .collect()
}

/// Inherited environment with the config's variables layered on top
fn child_environment(config: &TerminalConfig) -> PtyResult<Vec<CString>> {
    let overrides = config.child_env();
    let mut env = Vec::new();

    for (key, value) in std::env::vars_os() {
        if overrides.iter().any(|(k, _)| OsStr::new(k) == key) {
            continue;
        }
        let mut entry = key.as_bytes().to_vec();
        entry.push(b'=');
        entry.extend_from_slice(value.as_bytes());
        env.push(cstring(&entry)?);
    }
    for (key, value) in &overrides {
        env.push(cstring(format!("{key}={value}").as_bytes())?);
    }

    Ok(env)
}

/// Locate `program` the way execvp would, so a missing or non-executable
/// shell fails before fork
fn find_program(program: &str) -> Option<PathBuf> {
    if program.contains('/') {
        let path = Path::new(program);
        return is_executable(path).then(|| path.to_path_buf());
    }

    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    path.is_file() && access(path, AccessFlags::X_OK).is_ok()
}

#[cfg(any(target_os = "linux", target_os = "android"))]
fn slave_name(master: &PtyMaster) -> PtyResult<String> {
    nix::pty::ptsname_r(master).map_err(|e| PtyError::PtsName(e.into()))
}

#[cfg(not(any(target_os = "linux", target_os = "android")))]
fn slave_name(master: &PtyMaster) -> PtyResult<String> {
    // SAFETY: ptsname uses a static buffer; the name is copied out before
    // anything else could call it again on this thread
    unsafe { nix::pty::ptsname(master) }.map_err(|e| PtyError::PtsName(e.into()))
}

/// Set the window size on a PTY file descriptor
fn set_window_size(fd: RawFd, size: WindowSize) -> PtyResult<()> {
    let winsize = libc::winsize {
        ws_row: size.rows,
        ws_col: size.cols,
        ws_xpixel: size.pixel_width,
        ws_ypixel: size.pixel_height,
    };

    // SAFETY: TIOCSWINSZ reads a winsize struct we own
    let result = unsafe { libc::ioctl(fd, libc::TIOCSWINSZ as _, &winsize) };

    if result < 0 {
        Err(PtyError::SetWinsize(io::Error::last_os_error()))
    } else {
        Ok(())
    }
}

/// Get the window size from a PTY file descriptor
fn get_window_size(fd: RawFd) -> PtyResult<WindowSize> {
    let mut winsize = libc::winsize {
        ws_row: 0,
        ws_col: 0,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: TIOCGWINSZ writes into a winsize struct we own
    let result = unsafe { libc::ioctl(fd, libc::TIOCGWINSZ as _, &mut winsize) };

    if result < 0 {
        Err(PtyError::GetWinsize(io::Error::last_os_error()))
    } else {
        Ok(WindowSize {
            rows: winsize.ws_row,
            cols: winsize.ws_col,
            pixel_width: winsize.ws_xpixel,
            pixel_height: winsize.ws_ypixel,
        })
    }
}
