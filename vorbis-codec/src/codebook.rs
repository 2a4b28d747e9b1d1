// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Codebook header parsing and scalar/vector decode (§4.5), built on
//! `huffman::HuffmanTree` rather than the teacher's `io::vlc::Codebook`
//! (whose supporting module was not present in the retrieved pack).
//!
//! Grounded on `symphonia-codec-vorbis/src/codebook.rs` for the header
//! layout, `float32_unpack`, and the two VQ lookup-table unpack functions
//! -- generalized from `f32` to `f64` (spec's whole-pipeline precision
//! requirement) and with `lookup1_values` reimplemented as an integer
//! search rather than the teacher's floating-point `powf` (§9's explicit
//! warning about rounding at `entries == L^dim`).

use vorbis_core::bits::BitReaderRtl;
use vorbis_core::errors::{decode_error, Result};

use crate::common::ilog;
use crate::huffman::HuffmanTree;

/// As defined in section 9.2.2 of the Vorbis I specification / spec
/// §4.10: a 32-bit packed float with a 1-bit sign, 10-bit biased (788)
/// exponent, and 21-bit unsigned fraction. Unnormalized: there is no
/// implicit leading 1, and `fraction == 0` is simply zero regardless of
/// exponent (no subnormal/NaN/Inf encodings exist in this format).
fn float32_unpack(x: u32) -> f64 {
    let fraction = (x & 0x1f_ffff) as f64;
    let exponent = ((x & 0x7fe0_0000) >> 21) as i32;
    let value = fraction * 2f64.powi(exponent - 788);

    if x & 0x8000_0000 == 0 {
        value
    }
    else {
        -value
    }
}

/// §4.5 / §8 item 8: the largest `L` such that `L^dimensions <= entries`,
/// found by integer search rather than `(entries as f64).powf(1.0 /
/// dimensions as f64)`, which can round the wrong way exactly at
/// `entries == L^dimensions` (§9).
fn lookup1_values(entries: u32, dimensions: u16) -> u32 {
    if dimensions == 0 {
        return 0;
    }

    let mut value = 0u32;
    while (value + 1).checked_pow(u32::from(dimensions)).map_or(false, |p| p <= entries) {
        value += 1;
    }

    value
}

/// §4.5 type 1: entry `i`, coordinate `j` -> multiplicand index
/// `(i / lookup_len^j) mod lookup_len`.
fn unpack_vq_lookup_type1(
    multiplicands: &[u16],
    min_value: f64,
    delta_value: f64,
    sequence_p: bool,
    entries: u32,
    dimensions: u16,
    lookup_values: u32,
) -> Vec<f64> {
    let dim = dimensions as usize;
    let mut vq = vec![0.0f64; entries as usize * dim];

    for (i, vector) in vq.chunks_exact_mut(dim).enumerate() {
        let mut last = 0.0;
        let mut index_divisor = 1u32;

        for value in vector.iter_mut() {
            let m = ((i as u32 / index_divisor) % lookup_values) as usize;
            *value = f64::from(multiplicands[m]) * delta_value + min_value + last;

            if sequence_p {
                last = *value;
            }

            index_divisor *= lookup_values;
        }
    }

    vq
}

/// §4.5 type 2: row-major, entry `i`, coordinate `j` -> `muls[i*dim + j]`.
fn unpack_vq_lookup_type2(
    multiplicands: &[u16],
    min_value: f64,
    delta_value: f64,
    sequence_p: bool,
    entries: u32,
    dimensions: u16,
) -> Vec<f64> {
    let dim = dimensions as usize;
    let mut vq = vec![0.0f64; entries as usize * dim];

    for (i, vector) in vq.chunks_exact_mut(dim).enumerate() {
        let mut last = 0.0;
        let mut offset = i * dim;

        for value in vector.iter_mut() {
            *value = f64::from(multiplicands[offset]) * delta_value + min_value + last;

            if sequence_p {
                last = *value;
            }

            offset += 1;
        }
    }

    vq
}

/// A parsed Vorbis codebook: a Huffman tree over its entries, plus an
/// optional VQ lookup table (§3/§4.5's `Codebook` data model).
pub struct VorbisCodebook {
    tree: HuffmanTree,
    dimensions: u16,
    vq: Option<Vec<f64>>,
}

impl VorbisCodebook {
    pub fn read(bits: &mut BitReaderRtl<'_>) -> Result<Self> {
        let sync = bits.read_bits_leq32(24)?;
        if sync != 0x5643_42 {
            return decode_error("vorbis: invalid codebook sync");
        }

        let dimensions = bits.read_bits_leq32(16)? as u16;
        let entries = bits.read_bits_leq32(24)?;

        let ordered = bits.read_bool()?;

        let mut lens = Vec::<u8>::with_capacity(entries as usize);

        if !ordered {
            let sparse = bits.read_bool()?;

            if sparse {
                for _ in 0..entries {
                    let used = bits.read_bool()?;
                    let len = if used { bits.read_bits_leq32(5)? as u8 + 1 } else { 0 };
                    lens.push(len);
                }
            }
            else {
                for _ in 0..entries {
                    lens.push(bits.read_bits_leq32(5)? as u8 + 1);
                }
            }
        }
        else {
            let mut cur_entry = 0u32;
            let mut cur_len = bits.read_bits_leq32(5)? + 1;

            loop {
                let num_bits = if entries > cur_entry { ilog(entries - cur_entry) } else { 0 };
                let num = bits.read_bits_leq32(num_bits)?;

                lens.extend(std::iter::repeat(cur_len as u8).take(num as usize));

                cur_len += 1;
                cur_entry += num;

                if cur_entry > entries {
                    return decode_error("vorbis: invalid ordered codebook");
                }
                if cur_entry == entries {
                    break;
                }
            }
        }

        let lookup_type = bits.read_bits_leq32(4)?;

        let vq = match lookup_type {
            0 => None,
            1 | 2 => {
                let min_value = float32_unpack(bits.read_bits_leq32(32)?);
                let delta_value = float32_unpack(bits.read_bits_leq32(32)?);
                let value_bits = bits.read_bits_leq32(4)? + 1;
                let sequence_p = bits.read_bool()?;

                let lookup_values = match lookup_type {
                    1 => lookup1_values(entries, dimensions),
                    2 => entries * u32::from(dimensions),
                    _ => unreachable!(),
                };

                let mut multiplicands = Vec::with_capacity(lookup_values as usize);
                for _ in 0..lookup_values {
                    multiplicands.push(bits.read_bits_leq32(value_bits)? as u16);
                }

                let table = match lookup_type {
                    1 => unpack_vq_lookup_type1(
                        &multiplicands,
                        min_value,
                        delta_value,
                        sequence_p,
                        entries,
                        dimensions,
                        lookup_values,
                    ),
                    2 => unpack_vq_lookup_type2(
                        &multiplicands,
                        min_value,
                        delta_value,
                        sequence_p,
                        entries,
                        dimensions,
                    ),
                    _ => unreachable!(),
                };

                Some(table)
            }
            _ => return decode_error("vorbis: invalid codebook lookup type"),
        };

        let tree = HuffmanTree::new(&lens)?;

        Ok(VorbisCodebook { tree, dimensions, vq })
    }

    /// Decodes one scalar entry index (§4.5 `ReadScalarValue`).
    pub fn read_scalar(&self, bits: &mut BitReaderRtl<'_>) -> Result<u32> {
        self.tree.read_entry(bits)
    }

    /// Decodes one entry and returns its VQ vector (§4.5 `ReadVectorValue`).
    /// Errors if this codebook has no VQ lookup table.
    pub fn read_vq<'a>(&'a self, bits: &mut BitReaderRtl<'_>) -> Result<&'a [f64]> {
        let entry = self.tree.read_entry(bits)?;

        match &self.vq {
            Some(vq) => {
                let dim = self.dimensions as usize;
                let start = dim * entry as usize;
                Ok(&vq[start..start + dim])
            }
            None => decode_error("vorbis: not a vq codebook"),
        }
    }

    pub fn dimensions(&self) -> u16 {
        self.dimensions
    }

    pub fn is_vq(&self) -> bool {
        self.vq.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_lookup1_values_worked_examples() {
        // §8 item 8.
        assert_eq!(lookup1_values(49, 2), 7);
        assert_eq!(lookup1_values(27, 3), 3);
        assert_eq!(lookup1_values(20, 4), 2);
    }

    #[test]
    fn verify_lookup1_values_exact_power_boundary() {
        // entries == L^dim exactly: must not round down due to float error.
        assert_eq!(lookup1_values(64, 2), 8);
        assert_eq!(lookup1_values(625, 4), 5);
    }

    #[test]
    fn verify_custom_float_worked_examples() {
        // §8 item 10.
        assert_eq!(float32_unpack(0x0000_0000), 0.0);
        assert_eq!(float32_unpack(0x8000_0000), -0.0);

        // exponent=788, fraction=1, sign=0 -> 1 * 2^(788-788) = 1.0.
        let bits = (788u32 << 21) | 1;
        assert_eq!(float32_unpack(bits), 1.0);
    }
}
