// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `swd2` -- a host-side serial-console bridge to a target's Forth
//! interpreter over an ST-LINK/V2 SWD debug probe.
//!
//! See `SPEC_FULL.md` at the repository root for the full design; each
//! module here corresponds to one lettered component of that document's
//! §2 component table.

pub mod align;
pub mod cli;
pub mod control;
pub mod drain;
pub mod fill;
pub mod flags;
pub mod input;
pub mod loop_;
pub mod memops;
pub mod ring;
pub mod signals;
pub mod term;
pub mod transport;
