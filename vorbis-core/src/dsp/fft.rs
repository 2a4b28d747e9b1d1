// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `fft` module implements a radix-2 decimation-in-time Fast Fourier
//! Transform (§4.9), the primitive the DCT-IV (and therefore the MDCT) is
//! built on top of.
//!
//! Unlike the teacher's `f32`, SIMD-oriented implementation, this one
//! operates on `f64` throughout: §8 item 4 requires `IFFT(FFT(v)) == v`
//! within a relative tolerance of `1e-10`, which single precision cannot
//! sustain across even moderately sized transforms.

use std::f64::consts::PI;

use num_complex::Complex64;

/// A reusable `N`-point radix-2 FFT. Precomputes its twiddle factor table
/// once at construction, mirroring the teacher's table-driven design (the
/// teacher caches these in `lazy_static!` globals keyed by size; this
/// version owns its table per instance instead, since `lazy_static` was
/// not itself a declared dependency of the teacher crate it appeared in).
pub struct Fft {
    n: usize,
    bits: u32,
    /// `twiddles[k] = e^{-2*pi*i*k/n}` for `k` in `0..n/2`.
    twiddles: Vec<Complex64>,
}

impl Fft {
    /// Instantiates an `n`-point FFT. `n` must be a power of two.
    pub fn new(n: usize) -> Fft {
        assert!(n.is_power_of_two(), "n must be a power of two");
        assert!(n >= 2, "n must be at least 2");

        let bits = n.trailing_zeros();
        let half = n / 2;

        let twiddles = (0..half)
            .map(|k| {
                let theta = -2.0 * PI * (k as f64) / (n as f64);
                Complex64::new(theta.cos(), theta.sin())
            })
            .collect();

        Fft { n, bits, twiddles }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    /// Performs an in-place forward FFT.
    pub fn forward_inplace(&self, data: &mut [Complex64]) {
        assert_eq!(data.len(), self.n);
        self.bit_reverse_permute(data);
        self.butterflies(data, false);
    }

    /// Performs an in-place inverse FFT, including the `1/N` scale factor.
    pub fn inverse_inplace(&self, data: &mut [Complex64]) {
        assert_eq!(data.len(), self.n);
        self.bit_reverse_permute(data);
        self.butterflies(data, true);

        let scale = 1.0 / (self.n as f64);
        for v in data.iter_mut() {
            *v *= scale;
        }
    }

    pub fn forward(&self, src: &[Complex64], dst: &mut [Complex64]) {
        dst.copy_from_slice(src);
        self.forward_inplace(dst);
    }

    pub fn inverse(&self, src: &[Complex64], dst: &mut [Complex64]) {
        dst.copy_from_slice(src);
        self.inverse_inplace(dst);
    }

    fn bit_reverse_permute(&self, data: &mut [Complex64]) {
        let n = self.n;
        let bits = self.bits;

        for i in 0..n {
            let j = (i as u32).reverse_bits() >> (32 - bits);
            let j = j as usize;
            if j > i {
                data.swap(i, j);
            }
        }
    }

    /// `bits` butterfly passes with rotation factors `e^{-2*pi*i*k/N}`
    /// (forward) / `e^{+2*pi*i*k/N}` (inverse), per §4.9.
    fn butterflies(&self, data: &mut [Complex64], inverse: bool) {
        let n = self.n;
        let mut stride = 1usize;

        while stride < n {
            let span = stride * 2;
            let step = n / span;

            let mut start = 0usize;
            while start < n {
                for k in 0..stride {
                    let mut tw = self.twiddles[k * step];
                    if inverse {
                        tw = tw.conj();
                    }

                    let a = data[start + k];
                    let b = data[start + k + stride] * tw;

                    data[start + k] = a + b;
                    data[start + k + stride] = a - b;
                }
                start += span;
            }

            stride = span;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dft_naive(x: &[Complex64]) -> Vec<Complex64> {
        let n = x.len();
        (0..n)
            .map(|k| {
                let mut sum = Complex64::new(0.0, 0.0);
                for (j, &xj) in x.iter().enumerate() {
                    let theta = -2.0 * PI * (k as f64) * (j as f64) / (n as f64);
                    sum += xj * Complex64::new(theta.cos(), theta.sin());
                }
                sum
            })
            .collect()
    }

    #[test]
    fn verify_fft_matches_naive_dft() {
        let fft = Fft::new(32);

        let input: Vec<Complex64> =
            (0..32).map(|i| Complex64::new((i as f64 * 0.37).sin(), (i as f64 * 0.11).cos())).collect();

        let mut actual = vec![Complex64::new(0.0, 0.0); 32];
        fft.forward(&input, &mut actual);

        let expected = dft_naive(&input);

        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).norm() < 1e-9, "a={a:?} e={e:?}");
        }
    }

    #[test]
    fn verify_fft_ifft_round_trip() {
        for &n in &[2usize, 4, 8, 16, 64, 256, 1024] {
            let fft = Fft::new(n);

            let input: Vec<Complex64> =
                (0..n).map(|i| Complex64::new((i as f64).sin(), (i as f64 * 1.7).cos())).collect();

            let mut freq = vec![Complex64::new(0.0, 0.0); n];
            fft.forward(&input, &mut freq);

            let mut back = vec![Complex64::new(0.0, 0.0); n];
            fft.inverse(&freq, &mut back);

            for (a, b) in input.iter().zip(back.iter()) {
                let rel = (a - b).norm() / a.norm().max(1e-300);
                assert!(rel < 1e-10, "n={n} a={a:?} b={b:?} rel={rel}");
            }
        }
    }
}
