// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Loop-visible flags mutated by signal handlers and the control parser
//! (`SPEC_FULL.md` §3 "Host-side state", §4.I, §9 "atomic byte flags").
//!
//! Every flag here is single-writer/single-reader across the
//! handler/loop boundary, so a plain `AtomicBool` with `Relaxed` ordering
//! is sufficient -- there is no data being protected beyond the flag
//! itself, only a request to act on at the next cycle boundary.

use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct Flags {
    pub quit: AtomicBool,
    pub reset_requested: AtomicBool,
    pub upload_requested: AtomicBool,
    pub new_file_pending: AtomicBool,
    pub eof_pending: AtomicBool,
}

impl Flags {
    pub fn new() -> Self {
        Flags::default()
    }

    pub fn quit(&self) -> bool {
        self.quit.load(Ordering::Relaxed)
    }

    pub fn set_quit(&self) {
        self.quit.store(true, Ordering::Relaxed);
    }

    pub fn take_reset_requested(&self) -> bool {
        self.reset_requested.swap(false, Ordering::Relaxed)
    }

    pub fn set_reset_requested(&self) {
        self.reset_requested.store(true, Ordering::Relaxed);
    }

    pub fn upload_requested(&self) -> bool {
        self.upload_requested.load(Ordering::Relaxed)
    }

    pub fn take_upload_requested(&self) -> bool {
        self.upload_requested.swap(false, Ordering::Relaxed)
    }

    pub fn set_upload_requested(&self) {
        self.upload_requested.store(true, Ordering::Relaxed);
    }

    pub fn take_new_file_pending(&self) -> bool {
        self.new_file_pending.swap(false, Ordering::Relaxed)
    }

    pub fn set_new_file_pending(&self) {
        self.new_file_pending.store(true, Ordering::Relaxed);
    }

    pub fn new_file_pending(&self) -> bool {
        self.new_file_pending.load(Ordering::Relaxed)
    }

    pub fn take_eof_pending(&self) -> bool {
        self.eof_pending.swap(false, Ordering::Relaxed)
    }

    pub fn set_eof_pending(&self) {
        self.eof_pending.store(true, Ordering::Relaxed);
    }

    pub fn eof_pending(&self) -> bool {
        self.eof_pending.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_methods_clear_the_flag() {
        let flags = Flags::new();
        flags.set_upload_requested();
        assert!(flags.take_upload_requested());
        assert!(!flags.upload_requested());
    }

    #[test]
    fn quit_is_sticky() {
        let flags = Flags::new();
        assert!(!flags.quit());
        flags.set_quit();
        assert!(flags.quit());
    }
}
