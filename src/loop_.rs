// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The single-threaded cooperative polling loop (`SPEC_FULL.md` §4.H).
//!
//! Named `loop_` because `loop` is a keyword; the module is re-exported as
//! `crate::loop_` and used qualified (`loop_::Session`) everywhere else.

use crate::control::LineState;
use crate::drain::drain;
use crate::fill::fill;
use crate::flags::Flags;
use crate::input::Selector;
use crate::ring::{self, Indices};
use crate::signals;
use crate::transport::Transport;
use anyhow::Result;
use std::io::Write;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// The two pacing constants from §4.H, overridable via CLI for testing and
/// for tuning on slow USB stacks (see `SPEC_FULL.md` §10.1).
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    pub idle_threshold: Duration,
    pub idle_sleep: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing { idle_threshold: Duration::from_millis(100), idle_sleep: Duration::from_millis(10) }
    }
}

/// Owns every piece of host-side state the loop body touches (§3
/// "Host-side state"), except the transport and terminal raw-mode guard,
/// which the caller keeps on the stack so their `Drop`/lifetime is visible
/// at the call site.
pub struct Session {
    pub base: u32,
    pub flags: Flags,
    pub selector: Selector,
    pub line_num: LineState,
    pub pacing: Pacing,
    pub upload_path: PathBuf,
    pub verbose: bool,
}

impl Session {
    pub fn new(base: u32, selector: Selector, pacing: Pacing, upload_path: PathBuf, verbose: bool) -> Self {
        Session {
            base,
            flags: Flags::new(),
            selector,
            line_num: None,
            pacing,
            upload_path,
            verbose,
        }
    }

    /// Run the loop until `quit` is set, draining/filling `transport`
    /// through `stdout`. Every transport or stdout error is fatal and
    /// propagates immediately (§7).
    pub fn run(&mut self, transport: &mut dyn Transport, stdout: &mut dyn Write) -> Result<()> {
        let mut last_active = Instant::now();

        while !self.flags.quit() {
            signals::drain_into(&self.flags);

            let idx = read_indices(transport, self.base)?;
            if self.verbose {
                eprintln!(
                    "tx_w={} tx_r={} rx_w={} rx_r={}",
                    idx.tx_w, idx.tx_r, idx.rx_w, idx.rx_r
                );
            }

            let drain_outcome = drain(transport, self.base, idx, &mut self.line_num, stdout)?;
            if let Some(line) = drain_outcome.control.nak_at_line {
                eprintln!("\n*** Failure in line {line}. ***");
            }
            if drain_outcome.control.end_upload && self.selector.is_upload_active() {
                self.selector.end_upload();
                self.flags.set_eof_pending();
            }
            if drain_outcome.control.quit {
                self.flags.set_quit();
            }

            let fill_outcome = fill(transport, self.base, idx, &self.flags, &mut self.selector)?;

            let now = Instant::now();

            if self.flags.take_reset_requested() {
                transport.reset()?;
                transport.resume()?;
                eprintln!("\nRESET");
            }

            if self.flags.take_upload_requested() && !self.selector.is_upload_active() {
                match self.selector.begin_upload(&self.upload_path) {
                    Ok(()) => self.flags.set_new_file_pending(),
                    Err(e) => eprintln!("failed to open {}: {e}", self.upload_path.display()),
                }
            }

            let active = drain_outcome.active || fill_outcome.active;
            if active {
                last_active = now;
            } else if should_sleep(now.duration_since(last_active), self.pacing.idle_threshold) {
                std::thread::sleep(self.pacing.idle_sleep);
            }
        }

        Ok(())
    }
}

fn read_indices(transport: &mut dyn Transport, base: u32) -> Result<Indices> {
    let word = transport.read_mem32(ring::index_word_addr(base), 4)?;
    Ok(Indices::decode(u32::from_le_bytes([word[0], word[1], word[2], word[3]])))
}

/// Pure idle-pacing decision (§8 Property 6): sleep once `elapsed` since the
/// last active cycle exceeds `idle_threshold`. Split out from `run` so it
/// can be unit-tested without a real clock or a live loop.
fn should_sleep(elapsed_since_last_active: Duration, idle_threshold: Duration) -> bool {
    elapsed_since_last_active > idle_threshold
}
