// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Command-line surface (`SPEC_FULL.md` §6, §10.1).

use clap::Parser;
use std::path::PathBuf;

/// Host-side serial-console bridge to a target's Forth interpreter over an
/// ST-LINK/V2 SWD debug probe.
#[derive(Debug, Parser)]
#[clap(max_term_width = 80)]
pub struct Cli {
    /// Base address of the on-target control block, in hexadecimal
    /// (without a leading "0x"). If omitted, it is read from the target's
    /// register R11 after a halt/resume.
    pub base_addr_hex: Option<String>,

    /// USB serial number of the debug probe to use, when more than one is
    /// attached. Also sets the terminal title to `swd2:<serial>`.
    pub serial: Option<String>,

    /// Path to the file injected on an upload request (SIGQUIT).
    #[clap(long, default_value = "upload.fs")]
    pub upload: PathBuf,

    /// Milliseconds of inactivity before the loop starts sleeping between
    /// cycles.
    #[clap(long = "idle-threshold-ms", default_value = "100")]
    pub idle_threshold_ms: u64,

    /// Milliseconds to sleep per idle cycle once the idle threshold has
    /// been crossed.
    #[clap(long = "idle-sleep-ms", default_value = "10")]
    pub idle_sleep_ms: u64,

    /// Print a per-cycle index dump to stderr.
    #[clap(short, long)]
    pub verbose: bool,
}
