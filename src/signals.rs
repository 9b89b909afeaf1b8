// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signal intake (`SPEC_FULL.md` §4.I, §10.6).
//!
//! `ctrlc` (the teacher's signal-handling dependency) only ever exposes one
//! undifferentiated callback and never reaches `SIGQUIT`, so this installs
//! its own `sigaction` handlers directly via `libc`. Each handler does
//! nothing but an async-signal-safe store into a process-wide atomic flag;
//! all the actual work happens in the main loop at the next cycle
//! boundary, per §4.I "Handlers write to flags only."

use std::sync::atomic::{AtomicBool, Ordering};

static SIGINT_SEEN: AtomicBool = AtomicBool::new(false);
static SIGTERM_SEEN: AtomicBool = AtomicBool::new(false);
static SIGQUIT_SEEN: AtomicBool = AtomicBool::new(false);

extern "C" fn on_sigint(_sig: libc::c_int) {
    SIGINT_SEEN.store(true, Ordering::Relaxed);
}

extern "C" fn on_sigterm(_sig: libc::c_int) {
    SIGTERM_SEEN.store(true, Ordering::Relaxed);
}

extern "C" fn on_sigquit(_sig: libc::c_int) {
    SIGQUIT_SEEN.store(true, Ordering::Relaxed);
}

unsafe fn install_one(signum: libc::c_int, handler: extern "C" fn(libc::c_int)) -> std::io::Result<()> {
    let mut action: libc::sigaction = std::mem::zeroed();
    action.sa_sigaction = handler as usize;
    libc::sigemptyset(&mut action.sa_mask);
    action.sa_flags = libc::SA_RESTART;
    if libc::sigaction(signum, &action, std::ptr::null_mut()) != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

/// Install handlers for `SIGINT`, `SIGTERM`, and `SIGQUIT`. Must be called
/// at most once per process; failure to install any of them is fatal,
/// since the spec's reset/quit/upload-on-signal behavior would otherwise
/// silently not work.
pub fn install() -> anyhow::Result<()> {
    unsafe {
        install_one(libc::SIGINT, on_sigint)?;
        install_one(libc::SIGTERM, on_sigterm)?;
        install_one(libc::SIGQUIT, on_sigquit)?;
    }
    Ok(())
}

/// Drain any signals observed since the last call, applying §4.I's
/// mapping onto the loop's flags:
/// `SIGINT -> reset_requested`, `SIGTERM -> quit`, `SIGQUIT -> upload_requested`.
pub fn drain_into(flags: &crate::flags::Flags) {
    if SIGINT_SEEN.swap(false, Ordering::Relaxed) {
        flags.set_reset_requested();
    }
    if SIGTERM_SEEN.swap(false, Ordering::Relaxed) {
        flags.set_quit();
    }
    if SIGQUIT_SEEN.swap(false, Ordering::Relaxed) {
        flags.set_upload_requested();
    }
}
