// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Entry point: argument parsing, resource setup, and the
//! fatal-error-to-exit-code mapping described in `SPEC_FULL.md` §6–§7.

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use swd2::cli::Cli;
use swd2::input::{self, Selector};
use swd2::loop_::{Pacing, Session};
use swd2::signals;
use swd2::term::{self, RawMode};
use swd2::transport::{ProbeTransport, Transport};

/// Register the firmware is required to hold the control block's base
/// address in, when none is given on the command line (§3).
const BASE_ADDR_REGISTER: u8 = 11;

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            eprintln!("{e}");
            std::process::exit(64);
        }
        Err(e) => {
            // --help / --version: clap's own message belongs on stdout and
            // a clean exit, per its own convention.
            print!("{e}");
            std::process::exit(0);
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let stdin_fd = input::stdin_fd();
    let stdin_kind = input::classify_stdin(stdin_fd)?;

    let _raw_mode = RawMode::enter(stdin_fd, stdin_kind == input::StdinKind::Tty)?;
    term::set_nonblocking(stdin_fd)?;

    signals::install()?;

    let mut transport = ProbeTransport::open(cli.serial.as_deref())?;

    let base = resolve_base_addr(&mut transport, cli.base_addr_hex.as_deref())?;

    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    if let Some(serial) = &cli.serial {
        write!(stdout, "\x1b]2;swd2:{serial}\x07").context("failed to write terminal title")?;
        stdout.flush().context("failed to flush stdout")?;
    }

    let selector = Selector::with_fd(stdin_kind, stdin_fd);
    let pacing = Pacing {
        idle_threshold: Duration::from_millis(cli.idle_threshold_ms),
        idle_sleep: Duration::from_millis(cli.idle_sleep_ms),
    };
    let mut session = Session::new(base, selector, pacing, cli.upload, cli.verbose);

    session.run(&mut transport, &mut stdout)
}

fn resolve_base_addr(transport: &mut dyn Transport, base_addr_hex: Option<&str>) -> Result<u32> {
    match base_addr_hex {
        Some(hex) => u32::from_str_radix(hex, 16)
            .with_context(|| format!("invalid base address {hex:?}: expected hexadecimal")),
        None => {
            transport.halt()?;
            let value = transport.read_register(BASE_ADDR_REGISTER);
            transport.resume()?;
            value.context("failed to read base address from register R11")
        }
    }
}
