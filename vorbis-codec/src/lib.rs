// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

#![warn(rust_2018_idioms)]
#![forbid(unsafe_code)]
#![allow(clippy::comparison_chain)]
#![allow(clippy::excessive_precision)]
#![allow(clippy::identity_op)]
#![allow(clippy::manual_range_contains)]
#![allow(clippy::collapsible_else_if)]

//! Vorbis I bitstream decoding: codebook construction, floor curve and
//! residue vector decode, channel coupling, and the per-packet frame
//! pipeline that turns a setup header and a stream of audio packets into
//! PCM frames.

mod codebook;
mod common;
mod decoder;
mod dsp;
mod floor;
mod huffman;
mod mapping;
mod residue;
mod window;

pub use decoder::{AudioFrame, VorbisDecoder};
pub use vorbis_core::errors::{Error, Result};
