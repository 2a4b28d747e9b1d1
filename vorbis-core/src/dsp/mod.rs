// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Signal-domain transform primitives (§4.9, §8 items 4-5): FFT, the
//! type-IV DCT built on it, the MDCT/IMDCT pair built on that, and the
//! Vorbis analysis/synthesis window curve.

pub mod dct;
pub mod fft;
pub mod mdct;
pub mod window;
