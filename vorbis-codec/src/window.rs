// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-frame window assembly (§4.9). `vorbis_core::dsp::window` computes
//! the raw symmetric sine-power curve for a given block size; this module
//! assembles the variable-width window a given frame actually needs,
//! which depends on the current block's size and on whether the
//! previous/next blocks were long or short.
//!
//! Grounded on `symphonia-codec-vorbis/src/window.rs`'s
//! `generate_win_curve`, generalized from `f32` to `f64` and extended to
//! the mixed long/short neighbor case that the teacher's fixed
//! `Windows{short,long}` pair leaves to its (incompletely retrieved)
//! caller.

use vorbis_core::dsp::window::generate_window;

/// The half of a window occupied by a non-trivial (non-flat, non-zero)
/// taper. Samples before `start` are implicitly zero; samples at or
/// after `end` (up to the other half) are implicitly one.
#[derive(Debug, Clone, Copy)]
pub struct WindowHalf {
    pub start: usize,
    pub end: usize,
}

/// A concrete window for one frame: where its left and right tapers
/// fall within the frame, and the multiplier curve to apply there.
#[derive(Debug)]
pub struct Window {
    pub left: WindowHalf,
    pub right: WindowHalf,
    pub window: Vec<f64>,
}

/// The two base window curves (short/long block size), from which every
/// frame's concrete `Window` is assembled.
pub struct Windows {
    short_curve: Vec<f64>,
    long_curve: Vec<f64>,
    bs0: usize,
    bs1: usize,
}

impl Windows {
    pub fn new(bs0_exp: u8, bs1_exp: u8) -> Self {
        let bs0 = 1usize << bs0_exp;
        let bs1 = 1usize << bs1_exp;

        Windows { short_curve: generate_window(bs0), long_curve: generate_window(bs1), bs0, bs1 }
    }

    /// A short block's window spans its whole length: the short curve's
    /// rising half on the left, falling half on the right.
    pub fn short(&self) -> Window {
        let n = self.bs0;
        let window = self.short_curve.clone();

        Window { left: WindowHalf { start: 0, end: n / 2 }, right: WindowHalf { start: n / 2, end: n }, window }
    }

    /// A long block's window. When a neighboring block is short, that
    /// side's taper is compressed into the middle of the corresponding
    /// half (the short curve's matching half), with the rest of the half
    /// flat at one and the region before it implicitly zero.
    pub fn long(&self, prev_long: bool, next_long: bool) -> Window {
        let n = self.bs1;
        let mut window = vec![1.0; n];

        let left = if prev_long {
            window[..n / 2].copy_from_slice(&self.long_curve[..n / 2]);
            WindowHalf { start: 0, end: n / 2 }
        }
        else {
            let q = n / 4;
            let q0 = self.bs0 / 4;
            let start = q - q0;
            let end = q + q0;
            window[start..end].copy_from_slice(&self.short_curve[..self.bs0 / 2]);
            WindowHalf { start, end }
        };

        let right = if next_long {
            window[n / 2..n].copy_from_slice(&self.long_curve[n / 2..n]);
            WindowHalf { start: n / 2, end: n }
        }
        else {
            let q = n / 4;
            let q0 = self.bs0 / 4;
            let start = 3 * q - q0;
            let end = 3 * q + q0;
            window[start..end].copy_from_slice(&self.short_curve[self.bs0 / 2..]);
            WindowHalf { start, end }
        };

        Window { left, right, window }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_short_window_spans_whole_block() {
        let windows = Windows::new(6, 10);
        let w = windows.short();
        assert_eq!(w.left.start, 0);
        assert_eq!(w.right.end, 64);
    }

    #[test]
    fn verify_long_window_with_short_neighbors_is_centered() {
        let windows = Windows::new(6, 10);
        let w = windows.long(false, false);
        // n=1024, bs0=64: left taper occupies [256-16, 256+16).
        assert_eq!(w.left.start, 240);
        assert_eq!(w.left.end, 272);
        assert_eq!(w.right.start, 1024 - 272);
        assert_eq!(w.right.end, 1024 - 240);
    }

    #[test]
    fn verify_long_window_with_long_neighbors_spans_full_halves() {
        let windows = Windows::new(6, 10);
        let w = windows.long(true, true);
        assert_eq!((w.left.start, w.left.end), (0, 512));
        assert_eq!((w.right.start, w.right.end), (512, 1024));
    }
}
