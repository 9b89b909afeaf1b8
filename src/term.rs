// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Terminal raw-mode as a scoped resource (`SPEC_FULL.md` §3 "orig_termios",
//! §9 "scoped acquisition of R with guaranteed release on all exit paths").

use anyhow::{Context, Result};
use std::mem::MaybeUninit;
use std::os::unix::io::RawFd;

/// Captures `stdin`'s original `termios` settings and, if `stdin` is a TTY,
/// puts it into raw mode (echo and canonical mode off) for the lifetime of
/// this value. Restores the original settings on `Drop`, so the restore
/// runs on every exit path -- normal return, an early `?`-propagated fatal
/// error, or a panic unwind.
pub struct RawMode {
    fd: RawFd,
    original: Option<libc::termios>,
}

impl RawMode {
    /// `is_tty` is the classification from `input::classify_stdin`; raw
    /// mode is a no-op (and `original` stays `None`) when `stdin` isn't a
    /// TTY, matching the original's `raw_mode_or_die` early return.
    pub fn enter(fd: RawFd, is_tty: bool) -> Result<Self> {
        if !is_tty {
            return Ok(RawMode { fd, original: None });
        }

        let original = get_termios(fd).context("tcgetattr failed")?;
        let mut raw = original;
        raw.c_lflag &= !(libc::ECHO | libc::ICANON);
        set_termios(fd, &raw, libc::TCSAFLUSH).context("failed to put terminal into raw mode")?;

        Ok(RawMode { fd, original: Some(original) })
    }

    /// The settings in effect before raw mode was entered, if it was
    /// entered at all (used by tests to assert restoration).
    pub fn original(&self) -> Option<&libc::termios> {
        self.original.as_ref()
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        if let Some(original) = self.original {
            // Best-effort: there is nothing more to do with a restore
            // failure during teardown, and panicking in `Drop` is worse.
            let _ = set_termios(self.fd, &original, libc::TCSAFLUSH);
        }
    }
}

fn get_termios(fd: RawFd) -> Result<libc::termios> {
    let mut termios = MaybeUninit::<libc::termios>::uninit();
    let rc = unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(unsafe { termios.assume_init() })
}

fn set_termios(fd: RawFd, termios: &libc::termios, when: libc::c_int) -> Result<()> {
    let rc = unsafe { libc::tcsetattr(fd, when, termios) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

/// Set `O_NONBLOCK` on `fd`. Used once at startup on `stdin` (§5 "Standard
/// input is set non-blocking once at startup").
pub fn set_nonblocking(fd: RawFd) -> Result<()> {
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL, 0) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error()).context("fcntl(F_GETFL) failed");
    }
    let rc = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
    if rc < 0 {
        return Err(std::io::Error::last_os_error()).context("fcntl(F_SETFL, O_NONBLOCK) failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::io::AsRawFd;

    #[test]
    fn non_tty_fd_is_a_no_op() {
        // A regular file is never a TTY; entering raw mode on it must not
        // attempt a tcgetattr/tcsetattr call at all.
        let file = tempfile::tempfile().unwrap();
        let guard = RawMode::enter(file.as_raw_fd(), false).unwrap();
        assert!(guard.original().is_none());
    }
}
