// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Mapping, mode, and inverse channel coupling (§4.8/§4.9).
//!
//! The teacher keeps mapping/mode header parsing inline in `lib.rs`; split
//! into its own module here since the channel-couple/submap/mode data
//! model is a distinct concern from the frame driver that consumes it.
//! Grounded on `symphonia-codec-vorbis/src/lib.rs`'s `read_mapping_type0`,
//! `read_mode`, and the inverse-coupling loop in `decode_inner`.

use vorbis_core::errors::{decode_error, Result};
use vorbis_core::bits::BitReaderRtl;

use crate::common::ilog;

#[derive(Debug, Clone, Copy)]
pub struct ChannelCouple {
    pub magnitude_ch: u8,
    pub angle_ch: u8,
}

#[derive(Debug, Clone, Copy)]
pub struct SubMap {
    pub floor: u8,
    pub residue: u8,
}

/// A parsed mapping (§4.8): which submap each channel uses, which
/// channel pairs are coupled, and each submap's floor/residue.
#[derive(Debug)]
pub struct Mapping {
    pub couplings: Vec<ChannelCouple>,
    pub multiplex: Vec<u8>,
    pub submaps: Vec<SubMap>,
}

impl Mapping {
    /// Reads one mapping. Only mapping type 0 exists in Vorbis I; any
    /// other 16-bit type value is a structural error.
    pub fn read(bs: &mut BitReaderRtl<'_>, audio_channels: u8, max_floor: u8, max_residue: u8) -> Result<Self> {
        let mapping_type = bs.read_bits_leq32(16)?;

        match mapping_type {
            0 => Self::read_type0(bs, audio_channels, max_floor, max_residue),
            _ => decode_error("vorbis: invalid mapping type"),
        }
    }

    fn read_type0(bs: &mut BitReaderRtl<'_>, audio_channels: u8, max_floor: u8, max_residue: u8) -> Result<Self> {
        let num_submaps = if bs.read_bool()? { bs.read_bits_leq32(4)? as u8 + 1 } else { 1 };

        let mut couplings = Vec::new();

        if bs.read_bool()? {
            let coupling_steps = bs.read_bits_leq32(8)? as u16 + 1;
            couplings.reserve_exact(usize::from(coupling_steps));

            let max_ch = audio_channels - 1;
            let coupling_bits = ilog(u32::from(max_ch));

            for _ in 0..coupling_steps {
                let magnitude_ch = bs.read_bits_leq32(coupling_bits)? as u8;
                let angle_ch = bs.read_bits_leq32(coupling_bits)? as u8;

                if magnitude_ch == angle_ch || magnitude_ch > max_ch || angle_ch > max_ch {
                    return decode_error("vorbis: invalid channel coupling");
                }

                couplings.push(ChannelCouple { magnitude_ch, angle_ch });
            }
        }

        if bs.read_bits_leq32(2)? != 0 {
            return decode_error("vorbis: reserved mapping bits non-zero");
        }

        let mut multiplex = Vec::with_capacity(usize::from(audio_channels));

        if num_submaps > 1 {
            for _ in 0..audio_channels {
                let mux = bs.read_bits_leq32(4)? as u8;

                if mux >= num_submaps {
                    return decode_error("vorbis: invalid channel multiplex");
                }

                multiplex.push(mux);
            }
        }
        else {
            multiplex.resize(usize::from(audio_channels), 0);
        }

        let mut submaps = Vec::with_capacity(usize::from(num_submaps));

        for _ in 0..num_submaps {
            let _time_unused = bs.read_bits_leq32(8)?;

            let floor = bs.read_bits_leq32(8)? as u8;
            if floor >= max_floor {
                return decode_error("vorbis: invalid floor for mapping");
            }

            let residue = bs.read_bits_leq32(8)? as u8;
            if residue >= max_residue {
                return decode_error("vorbis: invalid residue for mapping");
            }

            submaps.push(SubMap { floor, residue });
        }

        Ok(Mapping { couplings, multiplex, submaps })
    }
}

/// A parsed mode (§4.9): which window/block size a packet selects, and
/// which mapping it uses.
#[derive(Debug)]
pub struct Mode {
    pub block_flag: bool,
    pub mapping: u8,
}

impl Mode {
    pub fn read(bs: &mut BitReaderRtl<'_>, max_mapping: u8) -> Result<Self> {
        let block_flag = bs.read_bool()?;
        let window_type = bs.read_bits_leq32(16)? as u16;
        let transform_type = bs.read_bits_leq32(16)? as u16;
        let mapping = bs.read_bits_leq32(8)? as u8;

        if window_type != 0 {
            return decode_error("vorbis: invalid window type for mode");
        }

        if transform_type != 0 {
            return decode_error("vorbis: invalid transform type for mode");
        }

        if mapping >= max_mapping {
            return decode_error("vorbis: invalid mapping for mode");
        }

        Ok(Mode { block_flag, mapping })
    }
}

/// §4.8's four-case inverse coupling rule, applied to one magnitude/angle
/// sample pair: `(M, A) -> (newMag, newAng)`.
#[inline(always)]
pub fn inverse_couple_sample(m: f64, a: f64) -> (f64, f64) {
    if m > 0.0 {
        if a > 0.0 { (m, m - a) } else { (m + a, m) }
    }
    else if a > 0.0 {
        (m, m + a)
    }
    else {
        (m - a, m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_inverse_couple_quadrants() {
        assert_eq!(inverse_couple_sample(5.0, 3.0), (5.0, 2.0));
        assert_eq!(inverse_couple_sample(5.0, -3.0), (2.0, 5.0));
        assert_eq!(inverse_couple_sample(-5.0, 3.0), (-5.0, -2.0));
        assert_eq!(inverse_couple_sample(-5.0, -3.0), (-2.0, -5.0));
    }

    #[test]
    fn verify_mode_rejects_nonzero_window_type() {
        // block_flag=0 (1 bit), window_type=1 (16 bits, invalid).
        let data = [0b0000_0010u8, 0, 0];
        let mut bits = BitReaderRtl::new(&data);
        assert!(Mode::read(&mut bits, 1).is_err());
    }
}
