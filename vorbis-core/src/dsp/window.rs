// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `window` module generates the Vorbis sine-power analysis/synthesis
//! window curve (§4.9): `w(i, n) = sin(pi/2 * sin^2(pi*(2i+1)/(2n)))`.
//!
//! Grounded on the teacher's `generate_win_curve` (`symphonia-codec-vorbis/
//! src/window.rs`), generalized from `f32` to `f64` (§8's 1e-10 tolerances)
//! and returning the full `n`-sample curve rather than only its left half --
//! Vorbis's asymmetric lapping (short blocks adjacent to long ones) needs
//! independent control over the rising and falling slopes, which callers
//! build out of two curves of possibly different sizes (see `vorbis-codec`'s
//! `window` module). The per-mode slope selection and block-size-dependent
//! assembly stays there, mirroring the teacher's own split between this
//! primitive and its `Windows` consumer.
use std::f64::consts::PI;

/// Computes a single sample of the Vorbis window function for position `i`
/// of an `n`-sample window.
pub fn window_sample(i: usize, n: usize) -> f64 {
    let inner = PI * (2 * i + 1) as f64 / (2 * n) as f64;
    (PI / 2.0 * inner.sin().powi(2)).sin()
}

/// Generates the full `n`-sample symmetric sine-power window curve.
pub fn generate_window(n: usize) -> Vec<f64> {
    (0..n).map(|i| window_sample(i, n)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_window_is_symmetric() {
        let w = generate_window(64);
        for i in 0..32 {
            assert!((w[i] - w[63 - i]).abs() < 1e-12, "i={i}");
        }
    }

    #[test]
    fn verify_window_endpoints_and_peak() {
        let w = generate_window(16);
        assert!(w[0] > 0.0 && w[0] < 0.05);
        let mid = (w[7] + w[8]) / 2.0;
        assert!((mid - 1.0).abs() < 0.01);
    }

    /// Power complementarity: `w(i)^2 + w(i + n/2)^2 == 1` for `i` in
    /// `0..n/2`, the property that makes overlap-add reconstruction exact.
    #[test]
    fn verify_power_complementary() {
        let n = 32;
        let w = generate_window(n);
        for i in 0..n / 2 {
            let sum = w[i] * w[i] + w[i + n / 2] * w[i + n / 2];
            assert!((sum - 1.0).abs() < 1e-12, "i={i} sum={sum}");
        }
    }
}
