// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wrap splitting and alignment-optimized sub-transfer planning (`SPEC_FULL.md` §4.C).
//!
//! A logical transfer against a ring is first split at the 256-byte wrap
//! boundary into at most two linear segments, and each linear segment is then
//! further split into an 8-bit prologue, a 32-bit body, and an 8-bit
//! epilogue, because the debug probe's word transfers require both the
//! address and the length to be a multiple of four.

/// A linear (non-wrapping) run within a 256-byte ring, given as an offset
/// from the start of the ring and a byte count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub offset: u32,
    pub len: u32,
}

/// Split a `(start, count)` ring range into at most two non-wrapping
/// segments. `start` and `count` are both taken modulo the 256-byte ring;
/// `count` must not exceed 256.
///
/// Property 5 (wrap correctness): for `start + count > 256` the result is
/// exactly `[start, 256)` then `[0, count - (256 - start))`, covering the
/// range without overlap or gap.
pub fn split_wrap(start: u32, count: u32) -> (Segment, Option<Segment>) {
    debug_assert!(start < 256);
    debug_assert!(count <= 256);
    if count == 0 {
        return (Segment { offset: start, len: 0 }, None);
    }
    let to_end = 256 - start;
    if count <= to_end {
        (Segment { offset: start, len: count }, None)
    } else {
        let pre = Segment { offset: start, len: to_end };
        let post = Segment { offset: 0, len: count - to_end };
        (pre, Some(post))
    }
}

/// One sub-transfer to issue against the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubTransfer {
    /// An 8-bit (byte-at-a-time) write/read of `len` bytes at `addr`.
    Byte { addr: u32, len: u32 },
    /// A 32-bit (word) write/read of `len` bytes at `addr`. `addr` and `len`
    /// are both guaranteed to be multiples of 4.
    Word { addr: u32, len: u32 },
}

impl SubTransfer {
    pub fn len(&self) -> u32 {
        match *self {
            SubTransfer::Byte { len, .. } => len,
            SubTransfer::Word { len, .. } => len,
        }
    }
}

/// Plan a write of `len` bytes starting at `addr`, honoring word alignment:
/// an 8-bit prologue up to the next word boundary, a 32-bit body, and an
/// 8-bit epilogue. Returns the sub-transfers in the order they must be
/// issued, and the `source` offsets (cumulative, in byte order) line up
/// 1:1 with them.
///
/// Property 4 (alignment): every `Word` sub-transfer has `addr % 4 == 0`
/// and `len % 4 == 0`; every `Byte` sub-transfer here has `len` in `[1,3]`.
pub fn plan_write(addr: u32, len: u32) -> Vec<SubTransfer> {
    if len == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(3);
    let head = ((4 - (addr % 4)) % 4).min(len);
    let mut cursor = addr;
    let mut remaining = len;
    if head > 0 {
        out.push(SubTransfer::Byte { addr: cursor, len: head });
        cursor += head;
        remaining -= head;
    }
    let word_len = remaining - (remaining % 4);
    if word_len > 0 {
        out.push(SubTransfer::Word { addr: cursor, len: word_len });
        cursor += word_len;
        remaining -= word_len;
    }
    if remaining > 0 {
        out.push(SubTransfer::Byte { addr: cursor, len: remaining });
    }
    out
}

/// A single word-rounded read, as issued against the transport, together
/// with the slice of the resulting scratch buffer that is the caller's
/// actual data (`scratch[valid_offset .. valid_offset + valid_len]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadPlan {
    /// Address to issue the 32-bit read at; always a multiple of 4.
    pub read_addr: u32,
    /// Length to read; always a multiple of 4, covers `valid_offset..valid_offset+valid_len`.
    pub read_len: u32,
    /// Offset of the caller's data within the read-back scratch buffer.
    pub valid_offset: u32,
    /// Number of valid bytes (== the originally requested `len`).
    pub valid_len: u32,
}

/// Plan a word-rounded read of `len` bytes starting at `addr` (dual of
/// `plan_write`'s byte/word/byte split, §4.C "On reads").
///
/// Rounds `addr` down to the previous word boundary and `len` up to cover
/// the requested range, then reports where within the rounded-up read the
/// caller's actual bytes land.
pub fn plan_read(addr: u32, len: u32) -> Option<ReadPlan> {
    if len == 0 {
        return None;
    }
    let off = addr % 4;
    let read_addr = addr - off;
    let read_len = (len + off + 3) & !3;
    Some(ReadPlan { read_addr, read_len, valid_offset: off, valid_len: len })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn split_wrap_no_wrap() {
        let (pre, post) = split_wrap(10, 5);
        assert_eq!(pre, Segment { offset: 10, len: 5 });
        assert_eq!(post, None);
    }

    #[test]
    fn split_wrap_exact_to_boundary() {
        let (pre, post) = split_wrap(250, 6);
        assert_eq!(pre, Segment { offset: 250, len: 6 });
        assert_eq!(post, None);
    }

    #[test]
    fn split_wrap_matches_seed_scenario() {
        // rx_r = 250, rx_w = 10, used = 16.
        let (pre, post) = split_wrap(250, 16);
        assert_eq!(pre, Segment { offset: 250, len: 6 });
        assert_eq!(post, Some(Segment { offset: 0, len: 10 }));
    }

    #[test]
    fn plan_write_already_aligned() {
        let plan = plan_write(0x2000_0004, 8);
        assert_eq!(plan, vec![SubTransfer::Word { addr: 0x2000_0004, len: 8 }]);
    }

    #[test]
    fn plan_write_needs_all_three_parts() {
        // addr=1 (needs 3 bytes to reach word boundary at 4), len=10
        // -> head=3 bytes [1..4), word=4 bytes [4..8) (remaining 7, word-round to 4), tail=3 [8..11)
        let plan = plan_write(1, 10);
        assert_eq!(
            plan,
            vec![
                SubTransfer::Byte { addr: 1, len: 3 },
                SubTransfer::Word { addr: 4, len: 4 },
                SubTransfer::Byte { addr: 8, len: 3 },
            ]
        );
    }

    #[test]
    fn plan_write_shorter_than_head_is_all_bytes() {
        // addr=1, len=2: head would be 3 but is clamped to len=2.
        let plan = plan_write(1, 2);
        assert_eq!(plan, vec![SubTransfer::Byte { addr: 1, len: 2 }]);
    }

    #[test]
    fn plan_read_matches_seed_wrap_scenario() {
        // Pre-wrap segment: rx ring offset 250, len 6 -> absolute addr base+260+250.
        // Use base=0 for the address-arithmetic check in isolation.
        let addr = 260 + 250; // 510, 510 % 4 == 2
        let plan = plan_read(addr, 6).unwrap();
        assert_eq!(plan.read_addr, addr - 2);
        assert_eq!(plan.read_len, 8);
        assert_eq!(plan.valid_offset, 2);
        assert_eq!(plan.valid_len, 6);

        // Post-wrap segment: rx ring offset 0, len 10 -> absolute addr base+260.
        let addr2 = 260; // 260 % 4 == 0
        let plan2 = plan_read(addr2, 10).unwrap();
        assert_eq!(plan2.read_addr, addr2);
        assert_eq!(plan2.read_len, 12);
        assert_eq!(plan2.valid_offset, 0);
        assert_eq!(plan2.valid_len, 10);
    }

    proptest! {
        // Property 5: wrap split covers the range without overlap or gap.
        #[test]
        fn split_wrap_covers_exactly(start in 0u32..256, count in 0u32..=256) {
            let (pre, post) = split_wrap(start, count);
            let total: u32 = pre.len + post.map_or(0, |s| s.len);
            prop_assert_eq!(total, count);
            if let Some(post) = post {
                prop_assert_eq!(pre.offset + pre.len, 256);
                prop_assert_eq!(post.offset, 0);
            } else {
                prop_assert!(pre.offset + pre.len <= 256);
            }
        }

        // Property 4: every Word sub-transfer is address- and length-aligned to 4;
        // the concatenation of sub-transfers covers exactly `len` bytes in order.
        #[test]
        fn plan_write_is_aligned_and_covers_len(addr in any::<u32>(), len in 0u32..300) {
            let plan = plan_write(addr, len);
            let mut cursor = addr;
            let mut covered = 0u32;
            for t in &plan {
                match *t {
                    SubTransfer::Word { addr, len } => {
                        prop_assert_eq!(addr % 4, 0);
                        prop_assert_eq!(len % 4, 0);
                        prop_assert_eq!(addr, cursor);
                        cursor += len;
                        covered += len;
                    }
                    SubTransfer::Byte { addr, len } => {
                        prop_assert!(len >= 1 && len <= 3);
                        prop_assert_eq!(addr, cursor);
                        cursor += len;
                        covered += len;
                    }
                }
            }
            prop_assert_eq!(covered, len);
        }

        #[test]
        fn plan_read_rounds_to_word_boundaries(addr in any::<u32>(), len in 1u32..300) {
            let plan = plan_read(addr, len).unwrap();
            prop_assert_eq!(plan.read_addr % 4, 0);
            prop_assert_eq!(plan.read_len % 4, 0);
            prop_assert!(plan.valid_offset + plan.valid_len <= plan.read_len);
            prop_assert_eq!(plan.read_addr + plan.valid_offset, addr);
            prop_assert_eq!(plan.valid_len, len);
        }
    }
}
