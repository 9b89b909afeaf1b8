// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! TX fill / produce (`SPEC_FULL.md` §4.E).

use crate::align::split_wrap;
use crate::flags::Flags;
use crate::input::{truncate_at_eot, FetchOutcome, Selector, StdinKind};
use crate::memops::write_aligned;
use crate::ring::{self, Indices};
use crate::transport::Transport;
use anyhow::Result;

/// Emitted (preceded by a newline) when a new upload file is opened; the
/// firmware is expected to echo the `0x1C` byte back on RX as a sync marker.
const NEW_FILE_SEQUENCE: &[u8] = b"\x1c\n$1c emit\n";

/// Emitted when the active upload file (or the real stdin) reaches EOF.
const EOF_SEQUENCE: &[u8] = b"\x19\n$19 emit\n";

pub struct FillOutcome {
    /// Whether any bytes were written to TX this cycle.
    pub active: bool,
}

/// Fill the TX ring from the currently selected source: a pending framing
/// sequence takes priority over ordinary input, per §4.E's source-selection
/// order.
pub fn fill(
    transport: &mut dyn Transport,
    base: u32,
    idx: Indices,
    flags: &Flags,
    selector: &mut Selector,
) -> Result<FillOutcome> {
    let free = idx.tx_free() as u32;
    if free == 0 {
        return Ok(FillOutcome { active: false });
    }

    let bytes: Vec<u8> = if flags.new_file_pending() {
        if NEW_FILE_SEQUENCE.len() as u32 > free {
            return Ok(FillOutcome { active: false });
        }
        flags.take_new_file_pending();
        NEW_FILE_SEQUENCE.to_vec()
    } else if flags.eof_pending() {
        if EOF_SEQUENCE.len() as u32 > free {
            return Ok(FillOutcome { active: false });
        }
        flags.take_eof_pending();
        EOF_SEQUENCE.to_vec()
    } else {
        let max_len = free.min(255) as usize;
        match selector.fetch(max_len)? {
            FetchOutcome::Data(mut data) => {
                if selector.stdin_kind == StdinKind::Tty && !selector.is_upload_active() && truncate_at_eot(&mut data)
                {
                    flags.set_quit();
                }
                if data.is_empty() {
                    return Ok(FillOutcome { active: false });
                }
                data
            }
            FetchOutcome::WouldBlock => return Ok(FillOutcome { active: false }),
            FetchOutcome::Eof => {
                if selector.is_upload_active() {
                    selector.end_upload();
                    flags.set_eof_pending();
                } else {
                    flags.set_quit();
                }
                return Ok(FillOutcome { active: false });
            }
        }
    };

    write_ring(transport, base, idx.tx_w as u32, &bytes)?;
    let new_w = idx.tx_w.wrapping_add(bytes.len() as u8);
    transport.write_mem8(ring::tx_write_index_addr(base), &[new_w])?;

    Ok(FillOutcome { active: true })
}

fn write_ring(transport: &mut dyn Transport, base: u32, start: u32, data: &[u8]) -> Result<()> {
    let (pre, post) = split_wrap(start, data.len() as u32);
    let mut cursor = 0usize;
    if pre.len > 0 {
        let addr = ring::tx_byte_addr(base, pre.offset);
        write_aligned(transport, addr, &data[cursor..cursor + pre.len as usize])?;
        cursor += pre.len as usize;
    }
    if let Some(post) = post {
        if post.len > 0 {
            let addr = ring::tx_byte_addr(base, post.offset);
            write_aligned(transport, addr, &data[cursor..cursor + post.len as usize])?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::Selector;
    use crate::transport::mock::MockTransport;

    fn setup(base: u32) -> MockTransport {
        MockTransport::new(base, 4 + 256 + 256)
    }

    #[test]
    fn fill_is_inactive_when_tx_full() {
        let mut t = setup(0x2000);
        let idx = Indices { tx_w: 0, tx_r: 1, rx_w: 0, rx_r: 0 };
        let flags = Flags::new();
        let mut selector = Selector::new(StdinKind::Tty);
        let outcome = fill(&mut t, 0x2000, idx, &flags, &mut selector).unwrap();
        assert!(!outcome.active);
    }

    #[test]
    fn fill_emits_new_file_sequence_before_ordinary_input() {
        let mut t = setup(0x2000);
        let idx = Indices { tx_w: 0, tx_r: 0, rx_w: 0, rx_r: 0 };
        let flags = Flags::new();
        flags.set_new_file_pending();
        let mut selector = Selector::new(StdinKind::Tty);
        let outcome = fill(&mut t, 0x2000, idx, &flags, &mut selector).unwrap();
        assert!(outcome.active);
        assert!(!flags.new_file_pending());
        let tx_off = ring::TX_RING_OFFSET;
        assert_eq!(
            &t.ram[tx_off as usize..tx_off as usize + NEW_FILE_SEQUENCE.len()],
            NEW_FILE_SEQUENCE
        );
        assert_eq!(t.ram[0], NEW_FILE_SEQUENCE.len() as u8);
    }

    #[test]
    fn fill_defers_new_file_sequence_when_it_does_not_fit() {
        let mut t = setup(0x2000);
        // free = 255 - used(tx_w,tx_r); make free smaller than the sequence.
        let idx = Indices { tx_w: 0, tx_r: 250, rx_w: 0, rx_r: 0 };
        assert!((idx.tx_free() as u32) < NEW_FILE_SEQUENCE.len() as u32);
        let flags = Flags::new();
        flags.set_new_file_pending();
        let mut selector = Selector::new(StdinKind::Tty);
        let outcome = fill(&mut t, 0x2000, idx, &flags, &mut selector).unwrap();
        assert!(!outcome.active);
        assert!(flags.new_file_pending());
    }

    #[test]
    fn fill_reads_from_upload_file_and_advances_tx_w() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.fs");
        std::fs::write(&path, b": foo ;\n").unwrap();
        let mut t = setup(0x2000);
        let idx = Indices { tx_w: 0, tx_r: 0, rx_w: 0, rx_r: 0 };
        let flags = Flags::new();
        let mut selector = Selector::new(StdinKind::Tty);
        selector.begin_upload(&path).unwrap();
        let outcome = fill(&mut t, 0x2000, idx, &flags, &mut selector).unwrap();
        assert!(outcome.active);
        assert_eq!(t.ram[0], b": foo ;\n".len() as u8);
    }

    #[test]
    fn fill_upload_eof_closes_file_and_arms_eof_pending() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.fs");
        std::fs::write(&path, b"").unwrap();
        let mut t = setup(0x2000);
        let idx = Indices { tx_w: 0, tx_r: 0, rx_w: 0, rx_r: 0 };
        let flags = Flags::new();
        let mut selector = Selector::new(StdinKind::Tty);
        selector.begin_upload(&path).unwrap();
        let outcome = fill(&mut t, 0x2000, idx, &flags, &mut selector).unwrap();
        assert!(!outcome.active);
        assert!(flags.eof_pending());
        assert!(!selector.is_upload_active());
    }

    #[test]
    fn write_ring_splits_at_wrap_boundary() {
        let mut t = setup(0x2000);
        let data: Vec<u8> = (0..16u8).collect();
        write_ring(&mut t, 0x2000, 250, &data).unwrap();
        let tx_off = ring::TX_RING_OFFSET;
        assert_eq!(&t.ram[(tx_off + 250) as usize..(tx_off + 256) as usize], &data[0..6]);
        assert_eq!(&t.ram[tx_off as usize..(tx_off + 10) as usize], &data[6..16]);
    }

    #[test]
    fn fill_truncates_at_eot_and_sets_quit_when_tty_stdin_not_shadowed_by_upload() {
        // Exercises the truncate_at_eot helper path directly; the live stdin
        // fetch itself is covered by `input::tests`.
        let mut data = b"abc\x04def".to_vec();
        let flags = Flags::new();
        if truncate_at_eot(&mut data) {
            flags.set_quit();
        }
        assert_eq!(data, b"abc");
        assert!(flags.quit());
    }
}
