// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-channel IMDCT and overlap-add synthesis (§4.9).
//!
//! Grounded on `symphonia-codec-vorbis/src/dsp.rs`'s `DspChannel`/`synth`,
//! generalized from `f32` to `f64`. The teacher's `lib.rs` in the
//! retrieved pack actually calls into a differently-shaped `Dsp`/
//! `DspChannel` than the one defined here (a version mismatch in the
//! retrieved pack); this module keeps `dsp.rs`'s own self-consistent
//! design and `decoder.rs` is written to match it. Calls
//! `vorbis_core::dsp::mdct::Mdct::imdct` with `scale = 1.0`, matching the
//! teacher's own `Imdct::imdct(freq, out, 1.0)` decode-path call.

use std::cmp::min;

use vorbis_core::dsp::mdct::Mdct;

use crate::residue::ResidueScratch;
use crate::window::{Window, WindowHalf, Windows};

/// What's needed from the previous frame to overlap-add the next one:
/// its block size and the window-taper range of its right half.
pub struct LappingState {
    pub prev_block_size: usize,
    pub prev_win_right: WindowHalf,
}

/// Per-stream DSP state: one channel per audio channel, plus the shared
/// transforms and window curves every channel's synthesis draws on.
pub struct Dsp {
    pub channels: Vec<DspChannel>,
    pub residue_scratch: ResidueScratch,
    pub imdct_short: Mdct,
    pub imdct_long: Mdct,
    pub windows: Windows,
    pub lapping_state: Option<LappingState>,
}

impl Dsp {
    pub fn new(bs0_exp: u8, bs1_exp: u8, num_channels: usize) -> Self {
        Dsp {
            channels: (0..num_channels).map(|_| DspChannel::new(bs1_exp)).collect(),
            residue_scratch: ResidueScratch::default(),
            imdct_short: Mdct::new(1 << bs0_exp),
            imdct_long: Mdct::new(1 << bs1_exp),
            windows: Windows::new(bs0_exp, bs1_exp),
            lapping_state: None,
        }
    }

    pub fn reset(&mut self) {
        for channel in &mut self.channels {
            channel.reset();
        }

        self.lapping_state = None;
    }
}

pub struct DspChannel {
    /// Floor curve, then (after residue decode) the floor*residue
    /// spectrum ready for the inverse transform.
    pub floor: Vec<f64>,
    /// Decoded residue vector.
    pub residue: Vec<f64>,
    /// Set by nonzero propagation (§4.8); skipped entirely if true.
    pub do_not_decode: bool,
    overlap: Vec<f64>,
}

impl DspChannel {
    pub fn new(bs1_exp: u8) -> Self {
        DspChannel {
            floor: vec![0.0; (1 << bs1_exp) >> 1],
            residue: vec![0.0; (1 << bs1_exp) >> 1],
            overlap: vec![0.0; 1 << bs1_exp],
            do_not_decode: false,
        }
    }

    /// §4.9's spectral reconstruction: multiplies the decoded residue
    /// into the floor curve in place, in preparation for the inverse
    /// transform. A no-op for channels marked do-not-decode, whose floor
    /// curve is already all zero.
    pub fn apply_residue(&mut self, n: usize) {
        if self.do_not_decode {
            return;
        }

        for (f, &r) in self.floor[..n].iter_mut().zip(&self.residue[..n]) {
            *f *= r;
        }
    }

    /// Performs the inverse transform on this channel's reconstructed
    /// spectrum, windows it, and overlap-adds it with the tail of the
    /// previous block into `buf`.
    pub fn synth(&mut self, blk_len: usize, lap_state: &Option<LappingState>, win: &Window, imdct: &Mdct, buf: &mut [f64]) {
        let buf_len = buf.len();

        // Step 1: copy the windowed right-hand half of the previous
        // block's overlap buffer into the output. The all-zero region
        // before it is skipped.
        let overlap_end = if let Some(lap_state) = &lap_state {
            let prev_rhs_start = lap_state.prev_block_size >> 1;
            let rhs = &self.overlap[prev_rhs_start..lap_state.prev_win_right.end];
            buf[..rhs.len()].copy_from_slice(rhs);
            rhs.len()
        }
        else {
            0
        };

        // Step 2: inverse transform the spectrum into the overlap buffer.
        // scale=1.0: the floor/residue magnitudes already carry Vorbis's
        // normalization, so the transform itself must not attenuate.
        imdct.imdct(&self.floor[..blk_len >> 1], &mut self.overlap[..blk_len], 1.0);

        // Step 3: window the samples that fall within a non-trivial taper.
        let l_start = win.left.start;
        let l_end = win.left.end;

        for (s, &w) in self.overlap[l_start..l_end].iter_mut().zip(&win.window[l_start..l_end]) {
            *s *= w;
        }

        let r_start = win.right.start;
        let r_end = win.right.end;

        for (s, &w) in self.overlap[r_start..r_end].iter_mut().zip(&win.window[r_start..r_end]) {
            *s *= w;
        }

        // Step 4: overlap-add the windowed left-hand half onto the output.
        if lap_state.is_some() {
            let lhs_start = win.left.start;
            let lhs = &self.overlap[lhs_start..blk_len >> 1];

            let overlap_start = buf_len - lhs.len();
            let overlap_end = min(buf.len(), overlap_end);

            for (o, &s) in buf[overlap_start..overlap_end].iter_mut().zip(lhs) {
                *o += s;
            }

            for (o, &s) in buf[overlap_end..].iter_mut().zip(&lhs[overlap_end - overlap_start..]) {
                *o = s;
            }
        }

        // Step 5: clamp to the canonical output range.
        for s in buf.iter_mut() {
            *s = s.clamp(-1.0, 1.0);
        }
    }

    pub fn reset(&mut self) {
        self.overlap.fill(0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_apply_residue_skips_unused_channel() {
        let mut ch = DspChannel::new(4);
        ch.floor[..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        ch.residue[..4].copy_from_slice(&[2.0, 2.0, 2.0, 2.0]);
        ch.do_not_decode = true;
        ch.apply_residue(4);
        assert_eq!(&ch.floor[..4], &[1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn verify_apply_residue_multiplies_in_place() {
        let mut ch = DspChannel::new(4);
        ch.floor[..4].copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        ch.residue[..4].copy_from_slice(&[2.0, 2.0, 2.0, 2.0]);
        ch.apply_residue(4);
        assert_eq!(&ch.floor[..4], &[2.0, 4.0, 6.0, 8.0]);
    }
}
