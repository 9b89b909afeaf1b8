// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The input selector (`SPEC_FULL.md` §4.G) and stdin classification.

use anyhow::{bail, Context, Result};
use std::fs::File;
use std::io::Read;
use std::mem::MaybeUninit;
use std::os::unix::io::{AsRawFd, RawFd};

/// Which of the three supported kinds of file `stdin` turned out to be at
/// startup (§4.G "Classifies the original stdin ... any other kind is
/// fatal").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdinKind {
    Tty,
    Pipe,
    RegularFile,
}

/// Classify `fd` (expected to be `stdin`) via `fstat`.
pub fn classify_stdin(fd: RawFd) -> Result<StdinKind> {
    let mut stat = MaybeUninit::<libc::stat>::uninit();
    if unsafe { libc::fstat(fd, stat.as_mut_ptr()) } != 0 {
        return Err(std::io::Error::last_os_error()).context("failed to fstat() stdin");
    }
    let stat = unsafe { stat.assume_init() };
    match stat.st_mode & libc::S_IFMT {
        libc::S_IFIFO => Ok(StdinKind::Pipe),
        libc::S_IFCHR => {
            if unsafe { libc::isatty(fd) } == 1 {
                Ok(StdinKind::Tty)
            } else {
                bail!("TTYs are the only supported kind of character device")
            }
        }
        libc::S_IFREG => Ok(StdinKind::RegularFile),
        other => bail!("unsupported stdin file type: {:#o}", other),
    }
}

/// The currently active source of host-to-target bytes.
pub enum InputSource {
    Stdin,
    UploadFile(File),
}

/// Outcome of one fetch attempt against the active source.
pub enum FetchOutcome {
    Data(Vec<u8>),
    /// Nothing available right now; try again next cycle.
    WouldBlock,
    /// The active source hit end-of-file.
    Eof,
}

/// Multiplexes between `stdin` and an optional upload file, per §4.G.
pub struct Selector {
    pub stdin_kind: StdinKind,
    pub source: InputSource,
    stdin_fd: RawFd,
}

impl Selector {
    /// `stdin_fd` is normally `libc::STDIN_FILENO`; tests substitute a real
    /// pipe fd so the selector's non-blocking read/poll logic can be driven
    /// without a live terminal.
    pub fn new(stdin_kind: StdinKind) -> Self {
        Self::with_fd(stdin_kind, libc::STDIN_FILENO)
    }

    pub fn with_fd(stdin_kind: StdinKind, stdin_fd: RawFd) -> Self {
        Selector { stdin_kind, source: InputSource::Stdin, stdin_fd }
    }

    pub fn is_upload_active(&self) -> bool {
        matches!(self.source, InputSource::UploadFile(_))
    }

    /// Open `path` and switch the active source to it. The caller is
    /// responsible for arming `new_file_pending` on success.
    pub fn begin_upload(&mut self, path: &std::path::Path) -> std::io::Result<()> {
        let file = File::open(path)?;
        self.source = InputSource::UploadFile(file);
        Ok(())
    }

    /// Abandon the upload file (NAK/CAN) and fall back to `stdin`. The
    /// caller is responsible for arming `eof_pending`.
    pub fn end_upload(&mut self) {
        self.source = InputSource::Stdin;
    }

    /// Fetch up to `max_len` bytes from the active source without
    /// blocking.
    pub fn fetch(&mut self, max_len: usize) -> Result<FetchOutcome> {
        match &mut self.source {
            InputSource::Stdin => fetch_stdin(self.stdin_kind, self.stdin_fd, max_len),
            InputSource::UploadFile(file) => fetch_upload_file(file, max_len),
        }
    }
}

fn fetch_stdin(kind: StdinKind, fd: RawFd, max_len: usize) -> Result<FetchOutcome> {
    if kind == StdinKind::Pipe {
        // A non-blocking read on a pipe can't distinguish "nothing
        // buffered yet" from "writer closed, nothing left" without first
        // probing readiness -- see `SPEC_FULL.md` §9 "EOF detection on
        // pipes".
        if !poll_readable(fd)? {
            return Ok(FetchOutcome::WouldBlock);
        }
    }

    let mut buf = vec![0u8; max_len];
    let n = unsafe { libc::read(fd, buf.as_mut_ptr() as *mut libc::c_void, max_len) };
    if n < 0 {
        let err = std::io::Error::last_os_error();
        return match err.raw_os_error() {
            Some(libc::EAGAIN) | Some(libc::EINTR) => Ok(FetchOutcome::WouldBlock),
            _ => Err(err).context("failed to read from stdin"),
        };
    }
    let n = n as usize;
    if n == 0 {
        return match kind {
            StdinKind::Pipe | StdinKind::RegularFile => Ok(FetchOutcome::Eof),
            StdinKind::Tty => Ok(FetchOutcome::WouldBlock),
        };
    }
    buf.truncate(n);
    Ok(FetchOutcome::Data(buf))
}

fn fetch_upload_file(file: &mut File, max_len: usize) -> Result<FetchOutcome> {
    let mut buf = vec![0u8; max_len];
    match file.read(&mut buf) {
        Ok(0) => Ok(FetchOutcome::Eof),
        Ok(n) => {
            buf.truncate(n);
            Ok(FetchOutcome::Data(buf))
        }
        Err(e) if e.kind() == std::io::ErrorKind::Interrupted => Ok(FetchOutcome::WouldBlock),
        Err(e) => Err(e).context("failed to read upload file"),
    }
}

/// Poll `fd` with a zero timeout, returning whether it is readable or has
/// hung up (in either case a subsequent `read` will not block).
fn poll_readable(fd: RawFd) -> Result<bool> {
    let mut pfd = libc::pollfd { fd, events: libc::POLLIN, revents: 0 };
    loop {
        let rc = unsafe { libc::poll(&mut pfd, 1, 0) };
        if rc < 0 {
            let err = std::io::Error::last_os_error();
            if err.raw_os_error() == Some(libc::EINTR) {
                continue;
            }
            return Err(err).context("failed to poll stdin");
        }
        return Ok(rc > 0 && (pfd.revents & (libc::POLLIN | libc::POLLHUP)) != 0);
    }
}

/// Scan `EOT` (Ctrl-D, 0x04) and truncate at the first occurrence, per
/// §4.E "On a TTY stdin, scan the fetched buffer for the first EOT."
/// Returns whether an EOT was found.
pub fn truncate_at_eot(buf: &mut Vec<u8>) -> bool {
    const EOT: u8 = 0x04;
    if let Some(pos) = buf.iter().position(|&b| b == EOT) {
        buf.truncate(pos);
        true
    } else {
        false
    }
}

pub fn stdin_fd() -> RawFd {
    std::io::stdin().as_raw_fd()
}
