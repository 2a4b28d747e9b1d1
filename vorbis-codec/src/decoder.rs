// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The top-level Vorbis frame decoder (§2 "AudioFrame driver", §3
//! `DecoderState`): identification/setup header parsing and the
//! per-packet decode pipeline.
//!
//! Grounded on `symphonia-codec-vorbis/src/lib.rs`'s `VorbisDecoder`,
//! `read_ident_header`/`read_setup`, and `decode_inner` (mode select ->
//! floor decode -> nonzero propagation -> residue decode -> inverse
//! coupling -> dot product -> IMDCT -> overlap-add). Per the teacher's
//! frame pipeline being the only complete reference for these final
//! stages, the order and bookkeeping here track it closely; the precise
//! floor-dequantization/render and inverse-coupling formulas themselves
//! come from §4.6/§4.8 (see `floor.rs`/`mapping.rs`).

use log::debug;

use vorbis_core::bits::BitReaderRtl;
use vorbis_core::errors::{decode_error, unsupported_error, Error, Result};

use crate::codebook::VorbisCodebook;
use crate::common::ilog;
use crate::dsp::{Dsp, LappingState};
use crate::floor::{Floor1Setup, Floor1State};
use crate::mapping::{inverse_couple_sample, Mapping, Mode};
use crate::residue::{Residue, ResidueChannel};

const VORBIS_PACKET_TYPE_IDENTIFICATION: u8 = 1;
const VORBIS_PACKET_TYPE_SETUP: u8 = 5;
const VORBIS_HEADER_PACKET_SIGNATURE: [u8; 6] = *b"vorbis";

const VORBIS_VERSION: u32 = 0;

/// §3's `Identification` block bounds: `block_exp[i] in [6, 12]`.
const VORBIS_BLOCKSIZE_MIN: u8 = 6;
const VORBIS_BLOCKSIZE_MAX: u8 = 12;

#[derive(Debug)]
pub struct IdentHeader {
    pub channels: u8,
    pub sample_rate: u32,
    pub bs0_exp: u8,
    pub bs1_exp: u8,
}

fn read_signature(bs: &mut BitReaderRtl<'_>) -> Result<[u8; 6]> {
    let mut sig = [0u8; 6];
    for b in sig.iter_mut() {
        *b = bs.read_bits_leq32(8)? as u8;
    }
    Ok(sig)
}

fn read_ident_header(bs: &mut BitReaderRtl<'_>) -> Result<IdentHeader> {
    let packet_type = bs.read_bits_leq32(8)? as u8;
    if packet_type != VORBIS_PACKET_TYPE_IDENTIFICATION {
        return decode_error("vorbis: invalid packet type for identification header");
    }

    if read_signature(bs)? != VORBIS_HEADER_PACKET_SIGNATURE {
        return decode_error("vorbis: invalid header signature");
    }

    let version = bs.read_bits_leq32(32)?;
    if version != VORBIS_VERSION {
        return unsupported_error("vorbis: only vorbis 1 is supported");
    }

    let channels = bs.read_bits_leq32(8)? as u8;
    if channels == 0 {
        return decode_error("vorbis: number of channels cannot be 0");
    }

    let sample_rate = bs.read_bits_leq32(32)?;
    if sample_rate == 0 {
        return decode_error("vorbis: sample rate cannot be 0");
    }

    let _bitrate_max = bs.read_bits_leq32(32)?;
    let _bitrate_nom = bs.read_bits_leq32(32)?;
    let _bitrate_min = bs.read_bits_leq32(32)?;

    let block_sizes = bs.read_bits_leq32(8)? as u8;
    let bs0_exp = block_sizes & 0x0f;
    let bs1_exp = (block_sizes & 0xf0) >> 4;

    if bs0_exp < VORBIS_BLOCKSIZE_MIN || bs0_exp > VORBIS_BLOCKSIZE_MAX {
        return decode_error("vorbis: blocksize_0 out-of-bounds");
    }
    if bs1_exp < VORBIS_BLOCKSIZE_MIN || bs1_exp > VORBIS_BLOCKSIZE_MAX {
        return decode_error("vorbis: blocksize_1 out-of-bounds");
    }
    if bs0_exp > bs1_exp {
        return decode_error("vorbis: blocksize_0 exceeds blocksize_1");
    }

    if bs.read_bits_leq32(8)? != 1 {
        return decode_error("vorbis: ident header framing flag unset");
    }

    Ok(IdentHeader { channels, sample_rate, bs0_exp, bs1_exp })
}

struct Setup {
    codebooks: Vec<VorbisCodebook>,
    floor_setups: Vec<Floor1Setup>,
    residues: Vec<Residue>,
    mappings: Vec<Mapping>,
    modes: Vec<Mode>,
}

fn read_codebooks(bs: &mut BitReaderRtl<'_>) -> Result<Vec<VorbisCodebook>> {
    let count = bs.read_bits_leq32(8)? + 1;
    (0..count).map(|_| VorbisCodebook::read(bs)).collect()
}

fn read_time_domain_transforms(bs: &mut BitReaderRtl<'_>) -> Result<()> {
    let count = bs.read_bits_leq32(6)? + 1;
    for _ in 0..count {
        if bs.read_bits_leq32(16)? != 0 {
            return decode_error("vorbis: invalid time domain transform");
        }
    }
    Ok(())
}

fn read_floors(bs: &mut BitReaderRtl<'_>, max_codebook: u8) -> Result<Vec<Floor1Setup>> {
    let count = bs.read_bits_leq32(6)? + 1;
    (0..count).map(|_| Floor1Setup::read(bs, max_codebook)).collect()
}

fn read_residues(bs: &mut BitReaderRtl<'_>, max_codebook: u8) -> Result<Vec<Residue>> {
    let count = bs.read_bits_leq32(6)? + 1;
    (0..count)
        .map(|_| {
            let residue_type = bs.read_bits_leq32(16)? as u16;
            Residue::read(bs, residue_type, max_codebook)
        })
        .collect()
}

fn read_mappings(bs: &mut BitReaderRtl<'_>, channels: u8, max_floor: u8, max_residue: u8) -> Result<Vec<Mapping>> {
    let count = bs.read_bits_leq32(6)? + 1;
    (0..count).map(|_| Mapping::read(bs, channels, max_floor, max_residue)).collect()
}

fn read_modes(bs: &mut BitReaderRtl<'_>, max_mapping: u8) -> Result<Vec<Mode>> {
    let count = bs.read_bits_leq32(6)? + 1;
    (0..count).map(|_| Mode::read(bs, max_mapping)).collect()
}

fn read_setup(bs: &mut BitReaderRtl<'_>, ident: &IdentHeader) -> Result<Setup> {
    let packet_type = bs.read_bits_leq32(8)? as u8;
    if packet_type != VORBIS_PACKET_TYPE_SETUP {
        return decode_error("vorbis: invalid packet type for setup header");
    }

    if read_signature(bs)? != VORBIS_HEADER_PACKET_SIGNATURE {
        return decode_error("vorbis: invalid setup header signature");
    }

    let codebooks = read_codebooks(bs)?;
    let max_codebook = codebooks.len() as u8;

    read_time_domain_transforms(bs)?;

    let floor_setups = read_floors(bs, max_codebook)?;
    let residues = read_residues(bs, max_codebook)?;
    let mappings = read_mappings(bs, ident.channels, floor_setups.len() as u8, residues.len() as u8)?;
    let modes = read_modes(bs, mappings.len() as u8)?;

    if !bs.read_bool()? {
        return decode_error("vorbis: setup header framing flag unset");
    }

    if bs.bits_left() > 0 {
        debug!("vorbis: leftover bits in setup head extra data");
    }

    debug!(
        "vorbis: setup header parsed, {} codebook(s), {} floor(s), {} residue(s), {} mapping(s), {} mode(s)",
        codebooks.len(),
        floor_setups.len(),
        residues.len(),
        mappings.len(),
        modes.len(),
    );

    Ok(Setup { codebooks, floor_setups, residues, mappings, modes })
}

/// One decoded frame: one sample vector per audio channel.
pub struct AudioFrame {
    pub channels: Vec<Vec<f64>>,
}

/// The Vorbis decoder: all immutable configuration from the
/// identification/setup headers, plus the mutable per-stream DSP state
/// (§3 `DecoderState`).
pub struct VorbisDecoder {
    ident: IdentHeader,
    codebooks: Vec<VorbisCodebook>,
    floor_setups: Vec<Floor1Setup>,
    floor_states: Vec<Floor1State>,
    residues: Vec<Residue>,
    mappings: Vec<Mapping>,
    modes: Vec<Mode>,
    dsp: Dsp,
}

impl VorbisDecoder {
    /// Builds a decoder from the raw identification and setup header
    /// packets (typically carried in an Ogg stream's first two packets).
    pub fn try_new(ident_packet: &[u8], setup_packet: &[u8]) -> Result<Self> {
        let ident = read_ident_header(&mut BitReaderRtl::new(ident_packet))?;
        let setup = read_setup(&mut BitReaderRtl::new(setup_packet), &ident)?;

        let floor_states = setup.floor_setups.iter().map(Floor1State::new).collect();
        let dsp = Dsp::new(ident.bs0_exp, ident.bs1_exp, usize::from(ident.channels));

        Ok(VorbisDecoder {
            ident,
            codebooks: setup.codebooks,
            floor_setups: setup.floor_setups,
            floor_states,
            residues: setup.residues,
            mappings: setup.mappings,
            modes: setup.modes,
            dsp,
        })
    }

    pub fn channels(&self) -> u8 {
        self.ident.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.ident.sample_rate
    }

    /// Drops all per-stream decode state (overlap buffers, lapping
    /// state). Configuration from the headers is untouched.
    pub fn reset(&mut self) {
        self.dsp.reset();
    }

    /// Decodes one audio packet. Returns a frame with zero samples per
    /// channel if this is the first packet after construction or reset
    /// (§3: there is no previous block to overlap-add against yet).
    pub fn decode(&mut self, packet: &[u8]) -> Result<AudioFrame> {
        let mut bs = BitReaderRtl::new(packet);

        if bs.read_bool()? {
            return decode_error("vorbis: not an audio packet");
        }

        let num_modes = self.modes.len() - 1;
        let mode_number = bs.read_bits_leq32(ilog(num_modes as u32))? as usize;

        if mode_number >= self.modes.len() {
            return decode_error("vorbis: invalid packet mode number");
        }

        let mode = &self.modes[mode_number];
        let mapping = &self.mappings[usize::from(mode.mapping)];

        let (bs_exp, window) = if mode.block_flag {
            let prev_long = bs.read_bool()?;
            let next_long = bs.read_bool()?;
            (self.ident.bs1_exp, self.dsp.windows.long(prev_long, next_long))
        }
        else {
            (self.ident.bs0_exp, self.dsp.windows.short())
        };

        let n = 1usize << bs_exp;
        let n2 = n >> 1;

        // §4.6: floor decode, one per channel via its submap's floor.
        for (&submap_num, ch) in mapping.multiplex.iter().zip(self.dsp.channels.iter_mut()) {
            let submap = &mapping.submaps[usize::from(submap_num)];
            let floor_idx = usize::from(submap.floor);

            let setup = &self.floor_setups[floor_idx];
            let state = &mut self.floor_states[floor_idx];

            state.read_channel(&mut bs, setup, &self.codebooks)?;

            ch.do_not_decode = state.is_unused();

            if !ch.do_not_decode {
                state.synthesis(bs_exp, setup, &mut ch.floor)?;
            }
            else {
                ch.floor[..n2].fill(0.0);
            }
        }

        // §4.8: nonzero propagation.
        for couple in &mapping.couplings {
            let m = usize::from(couple.magnitude_ch);
            let a = usize::from(couple.angle_ch);

            if self.dsp.channels[m].do_not_decode != self.dsp.channels[a].do_not_decode {
                self.dsp.channels[m].do_not_decode = false;
                self.dsp.channels[a].do_not_decode = false;
            }
        }

        // §4.7: residue decode, one submap at a time over the channels
        // routed to it.
        for (submap_idx, submap) in mapping.submaps.iter().enumerate() {
            let residue = &self.residues[usize::from(submap.residue)];

            let mut indices: Vec<usize> = Vec::new();
            for (c, &mux) in mapping.multiplex.iter().enumerate() {
                if usize::from(mux) == submap_idx {
                    indices.push(c);
                }
            }

            if indices.is_empty() {
                continue;
            }

            let mut channels: Vec<ResidueChannel<'_>> = Vec::with_capacity(indices.len());
            let mut remaining = &mut self.dsp.channels[..];
            let mut last = 0;

            for idx in &indices {
                let split_at = idx - last;
                let (_, rest) = remaining.split_at_mut(split_at);
                let (first, rest) = rest.split_at_mut(1);
                let ch = &mut first[0];
                let do_not_decode = ch.do_not_decode;
                channels.push(ResidueChannel { data: &mut ch.residue[..n2], do_not_decode });
                remaining = rest;
                last = idx + 1;
            }

            residue.decode(&mut bs, bs_exp, &self.codebooks, &mut self.dsp.residue_scratch, &mut channels)?;
        }

        // §4.8: inverse channel coupling.
        for coupling in &mapping.couplings {
            debug_assert_ne!(coupling.magnitude_ch, coupling.angle_ch);

            let (mag_ch, ang_ch) = if coupling.magnitude_ch < coupling.angle_ch {
                let (a, b) = self.dsp.channels.split_at_mut(usize::from(coupling.angle_ch));
                (&mut a[usize::from(coupling.magnitude_ch)], &mut b[0])
            }
            else {
                let (a, b) = self.dsp.channels.split_at_mut(usize::from(coupling.magnitude_ch));
                (&mut b[0], &mut a[usize::from(coupling.angle_ch)])
            };

            for (m, a) in mag_ch.residue[..n2].iter_mut().zip(ang_ch.residue[..n2].iter_mut()) {
                let (new_m, new_a) = inverse_couple_sample(*m, *a);
                *m = new_m;
                *a = new_a;
            }
        }

        // §4.9: spectral reconstruction (floor * residue), then the
        // inverse transform and overlap-add into the output buffer.
        for ch in self.dsp.channels.iter_mut() {
            ch.apply_residue(n2);
        }

        let imdct = if mode.block_flag { &self.dsp.imdct_long } else { &self.dsp.imdct_short };

        let out_len = match &self.dsp.lapping_state {
            Some(lap) => (lap.prev_block_size + n) / 4,
            None => 0,
        };

        let mut frame = AudioFrame { channels: Vec::with_capacity(self.dsp.channels.len()) };

        for ch in self.dsp.channels.iter_mut() {
            let mut buf = vec![0.0; out_len];
            ch.synth(n, &self.dsp.lapping_state, &window, imdct, &mut buf);
            frame.channels.push(buf);
        }

        self.dsp.lapping_state = Some(LappingState { prev_block_size: n, prev_win_right: window.right });

        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_ident_header_rejects_zero_channels() {
        let mut data = vec![1u8];
        data.extend_from_slice(b"vorbis");
        data.extend_from_slice(&0u32.to_le_bytes()); // version
        data.push(0); // channels = 0
        data.extend_from_slice(&44100u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(0xB6); // bs0=6, bs1=11
        data.push(1);

        let mut bs = BitReaderRtl::new(&data);
        assert!(read_ident_header(&mut bs).is_err());
    }

    #[test]
    fn verify_ident_header_rejects_blocksize_order() {
        let mut data = vec![1u8];
        data.extend_from_slice(b"vorbis");
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(2);
        data.extend_from_slice(&44100u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(0x6B); // bs0=11 (0xB), bs1=6: bs0 > bs1, invalid
        data.push(1);

        let mut bs = BitReaderRtl::new(&data);
        assert!(read_ident_header(&mut bs).is_err());
    }

    #[test]
    fn verify_ident_header_valid_round_trip() {
        let mut data = vec![1u8];
        data.extend_from_slice(b"vorbis");
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(2);
        data.extend_from_slice(&44100u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        data.push(0xB6); // bs0_exp=6, bs1_exp=11
        data.push(1);

        let mut bs = BitReaderRtl::new(&data);
        let ident = read_ident_header(&mut bs).unwrap();
        assert_eq!(ident.channels, 2);
        assert_eq!(ident.sample_rate, 44100);
        assert_eq!(ident.bs0_exp, 6);
        assert_eq!(ident.bs1_exp, 11);
    }
}
