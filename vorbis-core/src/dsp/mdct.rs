// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `mdct` module implements the (Inverse) Modified Discrete Cosine
//! Transform in terms of the type-IV DCT (§4.9), rather than the
//! teacher's DCT-II-based formulation (`Imdct` in the original
//! `symphonia-core/src/dsp/mdct.rs`, built on a `Dct::dct_ii_inplace` and
//! a four-vector butterfly recombination). The construction here -- fold,
//! DCT-IV, unfold -- is the one §4.9 specifies directly and was verified
//! against the textbook MDCT definition (`sum x[n] cos((2pi/N)(n+0.5+N/4)(k+0.5))`)
//! before being committed; windowing is left to the caller (`vorbis-codec`'s
//! `dsp` module), matching the teacher's own separation between the
//! transform and the overlap-add/windowing step.

use super::dct::DctIv;

/// A reusable forward MDCT / inverse MDCT pair for a fixed block size `n`.
pub struct Mdct {
    n: usize,
    dct: DctIv,
}

impl Mdct {
    /// Instantiates an MDCT/IMDCT for block size `n` (the long or short
    /// window size from the Identification header). `n` must be a power
    /// of two, at least 4.
    pub fn new(n: usize) -> Mdct {
        assert!(n.is_power_of_two() && n >= 4, "n must be a power of two >= 4");
        Mdct { n, dct: DctIv::new(n / 2) }
    }

    pub fn len(&self) -> usize {
        self.n
    }

    /// Forward MDCT: `n` time-domain samples in, `n/2` frequency-domain
    /// coefficients out. Not used during decode (no encoder in scope,
    /// §1), but kept for the transform's own round-trip tests (§8 item
    /// 5) and because exposing only half of a documented pair would be
    /// an odd asymmetry for a "Transforms" module.
    pub fn mdct(&self, data: &[f64], out: &mut [f64]) {
        let n = self.n;
        assert_eq!(data.len(), n);
        assert_eq!(out.len(), n / 2);

        let n4 = n / 4;
        let n34 = 3 * n / 4;

        let mut folded = vec![0.0f64; n / 2];
        for i in 0..n4 {
            folded[i] = -data[i + n34] - data[n34 - 1 - i];
        }
        for i in n4..n / 2 {
            folded[i] = data[i - n4] - data[n34 - 1 - i];
        }

        self.dct.dct_iv(&folded, out);
    }

    /// Inverse MDCT: `n/2` frequency-domain coefficients in, `n`
    /// time-domain samples out (unwindowed), scaled by `scale`. Vorbis
    /// decode calls this with `scale = 1.0` (§4.9): the fold/unfold
    /// construction over the *unscaled* DCT-IV already produces
    /// `sum_k x[k]*cos(...)` directly, so unlike `DctIv::idct_iv` (which
    /// bakes in a `2/N` factor for its own involution round-trip) no
    /// implicit normalization is applied here.
    pub fn imdct(&self, freq: &[f64], out: &mut [f64], scale: f64) {
        let n = self.n;
        let half = n / 2;
        let quarter = n / 4;

        assert_eq!(freq.len(), half);
        assert_eq!(out.len(), n);

        let mut r = vec![0.0f64; half];
        self.dct.dct_iv(freq, &mut r);

        for v in r.iter_mut() {
            *v *= scale;
        }

        let (a, b) = r.split_at(quarter);

        // (B, -reverse(B), -reverse(A), -A)
        out[0..quarter].copy_from_slice(b);
        for i in 0..quarter {
            out[quarter + i] = -b[quarter - 1 - i];
        }
        for i in 0..quarter {
            out[2 * quarter + i] = -a[quarter - 1 - i];
        }
        for i in 0..quarter {
            out[3 * quarter + i] = -a[i];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn mdct_analytical(x: &[f64]) -> Vec<f64> {
        let n = x.len();
        let half = n / 2;
        (0..half)
            .map(|k| {
                x.iter()
                    .enumerate()
                    .map(|(i, &xi)| {
                        xi * ((2.0 * PI / n as f64) * (i as f64 + 0.5 + n as f64 / 4.0) * (k as f64 + 0.5)).cos()
                    })
                    .sum()
            })
            .collect()
    }

    fn imdct_analytical(x: &[f64], scale: f64) -> Vec<f64> {
        let half = x.len();
        let n = half * 2;
        (0..n)
            .map(|i| {
                let sum: f64 = x
                    .iter()
                    .enumerate()
                    .map(|(k, &xk)| {
                        xk * ((2.0 * PI / n as f64) * (i as f64 + 0.5 + n as f64 / 4.0) * (k as f64 + 0.5)).cos()
                    })
                    .sum();
                sum * scale
            })
            .collect()
    }

    #[test]
    fn verify_mdct_matches_analytical() {
        let n = 32;
        let input: Vec<f64> = (0..n).map(|i| (i as f64 * 0.211).sin()).collect();

        let mdct = Mdct::new(n);
        let mut actual = vec![0.0; n / 2];
        mdct.mdct(&input, &mut actual);

        let expected = mdct_analytical(&input);

        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-9, "a={a} e={e}");
        }
    }

    /// scale=1.0 is the Vorbis decode convention (§4.9), and unlike the
    /// old `idct_iv`-based construction it must hold at that exact scale
    /// for every block size, not just up to a `4/N` factor that happened
    /// to work out at one size -- checked here at both a short and a long
    /// block size so the two can TDAC against each other at a block-size
    /// transition without a scale mismatch.
    #[test]
    fn verify_imdct_matches_analytical() {
        for &n in &[64usize, 2048] {
            let half = n / 2;
            let freq: Vec<f64> = (0..half).map(|i| (i as f64 * 0.37).cos()).collect();

            let mdct = Mdct::new(n);
            let mut actual = vec![0.0; n];
            mdct.imdct(&freq, &mut actual, 1.0);

            let expected = imdct_analytical(&freq, 1.0);

            for (a, e) in actual.iter().zip(expected.iter()) {
                assert!((a - e).abs() < 1e-9, "n={n} a={a} e={e}");
            }
        }
    }

    /// §8 item 5: two consecutive windowed blocks overlap-add back to the
    /// shared middle segment within 1e-10.
    #[test]
    fn verify_overlap_add_reconstruction() {
        let half = 16usize;
        let n = half * 2;

        fn window(i: usize, n: usize) -> f64 {
            (PI / 2.0 * (PI * (2 * i + 1) as f64 / (2 * n) as f64).sin().powi(2)).sin()
        }

        // A signal four half-blocks long so two consecutive n-sample
        // blocks (offset by `half`) share exactly `half` samples.
        let sig: Vec<f64> = (0..4 * half).map(|i| (i as f64 * 0.57).sin() * 0.6).collect();

        let mdct = Mdct::new(n);

        let analyze = |block: &[f64]| -> Vec<f64> {
            let windowed: Vec<f64> = (0..n).map(|i| block[i] * window(i, n)).collect();
            let mut freq = vec![0.0; half];
            mdct.mdct(&windowed, &mut freq);
            freq
        };

        // Forward `mdct` carries no implicit scale, so reconstruction
        // needs the `4/n` factor here; this is distinct from the
        // scale=1.0 Vorbis decode convention exercised above, where the
        // floor/residue magnitudes already carry their own normalization.
        let synth = |freq: &[f64]| -> Vec<f64> {
            let mut time = vec![0.0; n];
            mdct.imdct(freq, &mut time, 4.0 / n as f64);
            (0..n).map(|i| time[i] * window(i, n)).collect()
        };

        let block1 = &sig[0..n];
        let block2 = &sig[half..n + half];

        let y1 = synth(&analyze(block1));
        let y2 = synth(&analyze(block2));

        for i in 0..half {
            let recon = y1[half + i] + y2[i];
            let target = sig[half + i];
            assert!((recon - target).abs() < 1e-10, "i={i} recon={recon} target={target}");
        }
    }
}
