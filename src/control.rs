// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The in-band control-character protocol (`SPEC_FULL.md` §4.F).
//!
//! The target steers host behavior by sending single ASCII control bytes
//! interleaved with ordinary console output on the RX channel. The parser
//! is purely observational: it never changes what reaches stdout, only
//! reacts to the bytes already sent there.

pub const EOT: u8 = 0x04;
pub const ACK: u8 = 0x06;
pub const NAK: u8 = 0x15;
pub const CAN: u8 = 0x18;
pub const EM: u8 = 0x19;
pub const FS: u8 = 0x1C;

/// Tracks whether a file upload is in progress and how many lines of it
/// the target has acknowledged.
///
/// `None` means no upload is active (the source state the spec calls
/// `line_num == -1`); `Some(n)` is the spec's non-negative `line_num`.
pub type LineState = Option<u32>;

/// Outcome of feeding one received byte to the control parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlEffect {
    pub quit: bool,
    /// An upload failure occurred; carries the line number to report.
    pub nak_at_line: Option<u32>,
    /// The upload ended (NAK or CAN); the fill path should close the
    /// upload file and arm `eof_pending`.
    pub end_upload: bool,
}

/// Feed one byte received from the target to the control parser, updating
/// `line_num` in place and returning any loop-visible side effect.
pub fn observe_byte(byte: u8, line_num: &mut LineState) -> ControlEffect {
    match byte {
        EOT => ControlEffect { quit: true, ..Default::default() },
        ACK => {
            if let Some(n) = line_num {
                *n += 1;
            }
            ControlEffect::default()
        }
        NAK => {
            let at = *line_num;
            *line_num = None;
            ControlEffect { nak_at_line: at, end_upload: true, ..Default::default() }
        }
        CAN => {
            *line_num = None;
            ControlEffect { end_upload: true, ..Default::default() }
        }
        EM => {
            *line_num = None;
            ControlEffect::default()
        }
        FS => {
            *line_num = Some(0);
            ControlEffect::default()
        }
        _ => ControlEffect::default(),
    }
}

/// Feed a whole buffer of bytes received from the target, in order,
/// folding their effects together (`quit`/`end_upload` are sticky once
/// set; `nak_at_line` reports the first NAK seen, matching the original
/// byte order).
pub fn observe_bytes(bytes: &[u8], line_num: &mut LineState) -> ControlEffect {
    let mut effect = ControlEffect::default();
    for &b in bytes {
        let e = observe_byte(b, line_num);
        effect.quit |= e.quit;
        effect.end_upload |= e.end_upload;
        if effect.nak_at_line.is_none() {
            effect.nak_at_line = e.nak_at_line;
        }
    }
    effect
}
