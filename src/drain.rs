// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! RX drain / consume (`SPEC_FULL.md` §4.D).

use crate::align::split_wrap;
use crate::control::{observe_bytes, ControlEffect, LineState};
use crate::memops::read_aligned;
use crate::ring::{self, Indices};
use crate::transport::Transport;
use anyhow::{Context, Result};
use std::io::Write;

pub struct DrainOutcome {
    /// Whether any bytes were drained this cycle (feeds the idle-pacing
    /// decision in §4.H).
    pub active: bool,
    pub control: ControlEffect,
}

/// Drain whatever the target has produced since the last cycle: copy it to
/// `stdout`, scan it for control bytes, and advance `rx_r` on the target.
pub fn drain(
    transport: &mut dyn Transport,
    base: u32,
    idx: Indices,
    line_num: &mut LineState,
    stdout: &mut dyn Write,
) -> Result<DrainOutcome> {
    let used = idx.rx_used();
    if used == 0 {
        return Ok(DrainOutcome { active: false, control: ControlEffect::default() });
    }

    let (pre, post) = split_wrap(idx.rx_r as u32, used as u32);
    let mut effect = ControlEffect::default();
    for seg in [Some(pre), post].into_iter().flatten() {
        if seg.len == 0 {
            continue;
        }
        let addr = ring::rx_byte_addr(base, seg.offset);
        let data = read_aligned(transport, addr, seg.len)?;
        write_all_retrying(stdout, &data)?;

        let e = observe_bytes(&data, line_num);
        effect.quit |= e.quit;
        effect.end_upload |= e.end_upload;
        if effect.nak_at_line.is_none() {
            effect.nak_at_line = e.nak_at_line;
        }
    }

    transport.write_mem8(ring::rx_read_index_addr(base), &[idx.rx_w])?;

    Ok(DrainOutcome { active: true, control: effect })
}

/// Write the whole of `data` to `stdout`, retrying on a short write or on
/// `EINTR`/`WouldBlock`; any other error is fatal (§4.D).
fn write_all_retrying(stdout: &mut dyn Write, mut data: &[u8]) -> Result<()> {
    while !data.is_empty() {
        match stdout.write(data) {
            Ok(0) => anyhow::bail!("stdout write returned 0 with data remaining"),
            Ok(n) => data = &data[n..],
            Err(e)
                if e.kind() == std::io::ErrorKind::Interrupted
                    || e.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(e) => return Err(e).context("failed to write to stdout"),
        }
    }
    Ok(())
}
