// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `dct` module implements a type-IV Discrete Cosine Transform
//! expressed via a half-length FFT (§4.9), rather than the teacher's
//! direct type-II recursive algorithm (Lee's fast DCT-II, `dct_ii_32`
//! and friends). The spec calls for DCT-IV built on top of the FFT
//! primitive specifically, so the fold/post-rotate structure here departs
//! from the teacher's `dct.rs` in favor of that construction -- the
//! teacher's unrolled 32-point DCT-II kernel has no counterpart in this
//! crate.

use std::f64::consts::PI;

use num_complex::Complex64;

use super::fft::Fft;

/// A reusable `N`-point type-IV DCT, built on an `N/2`-point FFT.
pub struct DctIv {
    n: usize,
    fft: Fft,
    /// Fold-stage twiddles: `e^{-j*pi*i/n}` for `i` in `0..n/2`.
    fold: Vec<Complex64>,
    /// Post-rotation twiddles: `e^{-j*pi*(4i+1)/(4n)}` for `i` in `0..n/2`.
    post: Vec<Complex64>,
}

impl DctIv {
    /// Instantiates an `n`-point DCT-IV. `n` must be a power of two and at
    /// least 2.
    pub fn new(n: usize) -> DctIv {
        assert!(n.is_power_of_two() && n >= 2, "n must be a power of two >= 2");

        let half = n / 2;

        let fold = (0..half)
            .map(|i| {
                let theta = -PI * (i as f64) / (n as f64);
                Complex64::new(theta.cos(), theta.sin())
            })
            .collect();

        let post = (0..half)
            .map(|i| {
                let theta = -PI * (4.0 * i as f64 + 1.0) / (4.0 * n as f64);
                Complex64::new(theta.cos(), theta.sin())
            })
            .collect();

        DctIv { n, fft: Fft::new(half), fold, post }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    /// Performs the forward (and, since DCT-IV is involutory up to a
    /// `2/N` scale factor, inverse) transform. `src` and `dst` must both
    /// have length `n`.
    pub fn dct_iv(&self, src: &[f64], dst: &mut [f64]) {
        let n = self.n;
        let half = n / 2;

        assert_eq!(src.len(), n);
        assert_eq!(dst.len(), n);

        let mut folded: Vec<Complex64> = (0..half)
            .map(|i| Complex64::new(src[2 * i], src[n - 1 - 2 * i]) * self.fold[i])
            .collect();

        let mut transformed = vec![Complex64::new(0.0, 0.0); half];
        self.fft.forward(&folded, &mut transformed);
        folded.clear();

        for i in 0..half {
            let c = transformed[i] * self.post[i];
            dst[2 * i] = c.re;
            dst[n - 1 - 2 * i] = -c.im;
        }
    }

    /// Performs the inverse type-IV DCT: `dct_iv` followed by a `2/N`
    /// scale, per §4.9's "IDCT-IV: run DCT-IV, divide by N/2".
    pub fn idct_iv(&self, src: &[f64], dst: &mut [f64]) {
        self.dct_iv(src, dst);
        let scale = 1.0 / (self.n as f64 / 2.0);
        for v in dst.iter_mut() {
            *v *= scale;
        }
    }
}
