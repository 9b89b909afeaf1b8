// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Glues the alignment splitter (`align`) to a `Transport`, issuing the
//! planned byte/word sub-transfers in order.

use crate::align::{plan_read, plan_write, SubTransfer};
use crate::transport::Transport;
use anyhow::Result;

/// Write `data` to `addr`, splitting into an 8-bit prologue, 32-bit body,
/// and 8-bit epilogue per §4.C.
pub fn write_aligned(transport: &mut dyn Transport, addr: u32, data: &[u8]) -> Result<()> {
    let mut cursor = 0usize;
    for sub in plan_write(addr, data.len() as u32) {
        let len = sub.len() as usize;
        let chunk = &data[cursor..cursor + len];
        match sub {
            SubTransfer::Byte { addr, .. } => transport.write_mem8(addr, chunk)?,
            SubTransfer::Word { addr, .. } => transport.write_mem32(addr, chunk)?,
        }
        cursor += len;
    }
    Ok(())
}

/// Read `len` bytes starting at `addr`, via a single word-rounded 32-bit
/// read, returning exactly the requested (unaligned) slice.
pub fn read_aligned(transport: &mut dyn Transport, addr: u32, len: u32) -> Result<Vec<u8>> {
    let Some(plan) = plan_read(addr, len) else {
        return Ok(Vec::new());
    };
    let scratch = transport.read_mem32(plan.read_addr, plan.read_len)?;
    let start = plan.valid_offset as usize;
    let end = start + plan.valid_len as usize;
    Ok(scratch[start..end].to_vec())
}
