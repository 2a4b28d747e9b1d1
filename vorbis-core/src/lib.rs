// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared bit/byte I/O, checksum, error, and signal-domain transform
//! primitives used by both `vorbis-ogg` and `vorbis-codec`. Mirrors the
//! role `symphonia-core` plays for the teacher's format/codec crates,
//! trimmed to what a single-codec, single-container decoder needs (no
//! registry, probing, or multi-codec metadata machinery).

pub mod bits;
pub mod checksum;
pub mod dsp;
pub mod errors;
pub mod io;

pub use errors::{Error, Result};
