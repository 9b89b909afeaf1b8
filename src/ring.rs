// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Addressing and index arithmetic for the on-target control block.
//!
//! Layout, starting at a base address `A` (see `SPEC_FULL.md` §3):
//!
//! ```text
//! A+0   tx_w   (1 byte)
//! A+1   tx_r   (1 byte)
//! A+2   rx_w   (1 byte)
//! A+3   rx_r   (1 byte)
//! A+4   TX ring (256 bytes, host -> target)
//! A+260 RX ring (256 bytes, target -> host)
//! ```

/// Number of payload bytes in each ring.
pub const RING_LEN: u32 = 256;

/// Byte offset of the TX ring relative to the base address.
pub const TX_RING_OFFSET: u32 = 4;

/// Byte offset of the RX ring relative to the base address.
pub const RX_RING_OFFSET: u32 = TX_RING_OFFSET + RING_LEN;

/// The four ring indices, decoded from the single aligned index word at `A`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Indices {
    pub tx_w: u8,
    pub tx_r: u8,
    pub rx_w: u8,
    pub rx_r: u8,
}

impl Indices {
    /// Decode the little-endian index word read from target address `A`.
    ///
    /// Byte 0 is `tx_w`, byte 1 `tx_r`, byte 2 `rx_w`, byte 3 `rx_r` -- the
    /// same order they appear in target RAM.
    pub fn decode(word: u32) -> Self {
        let bytes = word.to_le_bytes();
        Indices {
            tx_w: bytes[0],
            tx_r: bytes[1],
            rx_w: bytes[2],
            rx_r: bytes[3],
        }
    }

    pub fn tx_used(&self) -> u8 {
        used(self.tx_w, self.tx_r)
    }

    pub fn tx_free(&self) -> u8 {
        free(self.tx_w, self.tx_r)
    }

    pub fn rx_used(&self) -> u8 {
        used(self.rx_w, self.rx_r)
    }
}

/// Bytes currently occupying a ring with write index `w` and read index `r`.
pub fn used(w: u8, r: u8) -> u8 {
    w.wrapping_sub(r)
}

/// Bytes of spare capacity in a ring with write index `w` and read index `r`.
pub fn free(w: u8, r: u8) -> u8 {
    255 - used(w, r)
}

/// Target address of the combined index word.
pub fn index_word_addr(base: u32) -> u32 {
    base
}

/// Target address of the host-owned RX read-index byte (`rx_r`, at `A+3`).
pub fn rx_read_index_addr(base: u32) -> u32 {
    base + 3
}

/// Target address of the host-owned TX write-index byte (`tx_w`, at `A+0`).
pub fn tx_write_index_addr(base: u32) -> u32 {
    base
}

/// Target address of byte `i` (`i` taken modulo 256) in the TX ring.
pub fn tx_byte_addr(base: u32, i: u32) -> u32 {
    base + TX_RING_OFFSET + (i % RING_LEN)
}

/// Target address of byte `i` (`i` taken modulo 256) in the RX ring.
pub fn rx_byte_addr(base: u32, i: u32) -> u32 {
    base + RX_RING_OFFSET + (i % RING_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decode_is_little_endian() {
        // tx_w=0x11, tx_r=0x22, rx_w=0x33, rx_r=0x44
        let word = 0x4433_2211u32;
        let idx = Indices::decode(word);
        assert_eq!(idx.tx_w, 0x11);
        assert_eq!(idx.tx_r, 0x22);
        assert_eq!(idx.rx_w, 0x33);
        assert_eq!(idx.rx_r, 0x44);
    }

    #[test]
    fn addresses_match_layout_table() {
        let base = 0x2000_0000;
        assert_eq!(index_word_addr(base), base);
        assert_eq!(tx_write_index_addr(base), base);
        assert_eq!(rx_read_index_addr(base), base + 3);
        assert_eq!(tx_byte_addr(base, 0), base + 4);
        assert_eq!(tx_byte_addr(base, 255), base + 4 + 255);
        assert_eq!(rx_byte_addr(base, 0), base + 4 + 256);
        assert_eq!(rx_byte_addr(base, 255), base + 4 + 256 + 255);
    }

    #[test]
    fn ring_byte_addresses_wrap_modulo_256() {
        let base = 0x1000;
        assert_eq!(tx_byte_addr(base, 256), tx_byte_addr(base, 0));
        assert_eq!(rx_byte_addr(base, 300), rx_byte_addr(base, 300 - 256));
    }

    proptest! {
        // Property 1: used(w, r) + free(w, r) == 255, for all w, r.
        #[test]
        fn used_and_free_are_complementary(w in any::<u8>(), r in any::<u8>()) {
            prop_assert_eq!(used(w, r) as u16 + free(w, r) as u16, 255);
        }

        #[test]
        fn used_matches_modular_difference(w in any::<u8>(), r in any::<u8>()) {
            let expected = (w as i32 - r as i32).rem_euclid(256) as u8;
            prop_assert_eq!(used(w, r), expected);
        }

        #[test]
        fn full_ring_caps_at_255(r in any::<u8>()) {
            // w == r - 1 (mod 256) is the fullest a ring can get: 255 used, 0 free.
            let w = r.wrapping_sub(1);
            prop_assert_eq!(used(w, r), 255);
            prop_assert_eq!(free(w, r), 0);
        }

        #[test]
        fn empty_ring_has_no_used_bytes(r in any::<u8>()) {
            prop_assert_eq!(used(r, r), 0);
            prop_assert_eq!(free(r, r), 255);
        }
    }
}
