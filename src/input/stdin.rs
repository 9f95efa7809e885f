//! Draining stdin after a readiness event
//!
//! mio reports readiness once per edge, so every wakeup has to consume all
//! pending input. Reads go straight to the file descriptor; `std::io::Stdin`
//! keeps its own buffer that mio cannot see. Each read is preceded by a
//! zero-timeout poll, so the descriptor can stay blocking (it usually shares
//! its file description with stdout).

use crate::input::LineBuffer;
use crate::{Result, VoxError};
use nix::errno::Errno;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::unistd;
use std::os::unix::io::{BorrowedFd, RawFd};

/// Whether the input is still open after a drain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Everything available was read; more may come later
    Open,
    /// End of input reached
    Closed,
}

/// Read everything currently available on `fd` into `lines`
pub fn drain_fd(fd: RawFd, lines: &mut LineBuffer) -> Result<ReadStatus> {
    let mut buf = [0u8; 4096];
    while readable(fd)? {
        match unistd::read(fd, &mut buf) {
            Ok(0) => return Ok(ReadStatus::Closed),
            Ok(n) => lines.write(&buf[..n]),
            Err(Errno::EINTR) => continue,
            Err(Errno::EAGAIN) => break,
            Err(e) => return Err(io_error(e)),
        }
    }
    Ok(ReadStatus::Open)
}

/// Whether a read on `fd` would return without blocking (data or EOF)
fn readable(fd: RawFd) -> Result<bool> {
    // SAFETY: the caller keeps `fd` open for the duration of the drain
    let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
    let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];
    loop {
        match poll(&mut fds, PollTimeout::ZERO) {
            Ok(0) => return Ok(false),
            Ok(_) => return Ok(true),
            Err(Errno::EINTR) => continue,
            Err(e) => return Err(io_error(e)),
        }
    }
}

fn io_error(errno: Errno) -> VoxError {
    VoxError::Io(std::io::Error::from(errno))
}
