// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Residue vector decoding, formats 0/1/2 (§4.7).
//!
//! Grounded on `symphonia-codec-vorbis/src/residue.rs` (`ResidueVqClass`,
//! `ResidueScratch` reuse pattern, the 8-phase cascade decode, and the
//! format 0/1 partition readers), generalized from `f32` to `f64`. The
//! teacher decodes directly into a `DspChannel` array selected by a
//! `BitSet256`; this module instead takes a plain slice of
//! `ResidueChannel`s (one entry per channel assigned to this residue by
//! its submap) so it has no dependency on the frame driver's channel
//! bookkeeping -- that selection happens once in `decoder.rs`.

use std::cmp::min;

use vorbis_core::bits::BitReaderRtl;
use vorbis_core::errors::{decode_error, Error, Result};

use crate::codebook::VorbisCodebook;

#[derive(Debug, Default, Clone)]
struct ResidueVqClass {
    books: [u8; 8],
    is_used: u8,
}

impl ResidueVqClass {
    #[inline(always)]
    fn is_used(&self, pass: usize) -> bool {
        debug_assert!(pass < 8);
        self.is_used & (1 << pass) != 0
    }
}

#[derive(Debug)]
struct ResidueSetup {
    residue_type: u16,
    residue_begin: u32,
    residue_end: u32,
    residue_partition_size: u32,
    residue_classifications: u8,
    residue_classbook: u8,
    residue_vq_class: Vec<ResidueVqClass>,
}

/// Reusable scratch storage shared by every residue decode in a stream
/// (§3's resource policy: scratch buffers may be reused across frames).
#[derive(Default)]
pub struct ResidueScratch {
    part_classes: Vec<u8>,
    interleave_buf: Vec<f64>,
}

impl ResidueScratch {
    fn reserve_part_classes(&mut self, len: usize) {
        if self.part_classes.len() < len {
            self.part_classes.resize(len, 0);
        }
    }

    fn reserve_interleave_buf(&mut self, len: usize) {
        if self.interleave_buf.len() < len {
            self.interleave_buf.resize(len, 0.0);
        }
    }
}

/// One channel's view into a residue decode: where decoded values
/// accumulate, and whether this channel should be skipped entirely
/// (nonzero propagation already resolved before this is called).
pub struct ResidueChannel<'a> {
    pub data: &'a mut [f64],
    pub do_not_decode: bool,
}

#[derive(Debug)]
pub struct Residue {
    setup: ResidueSetup,
}

impl Residue {
    pub fn read(bits: &mut BitReaderRtl<'_>, residue_type: u16, max_codebook: u8) -> Result<Self> {
        if residue_type > 2 {
            return decode_error("vorbis: invalid residue type");
        }

        let setup = Self::read_setup(bits, residue_type, max_codebook)?;
        Ok(Residue { setup })
    }

    fn read_setup(bits: &mut BitReaderRtl<'_>, residue_type: u16, max_codebook: u8) -> Result<ResidueSetup> {
        let residue_begin = bits.read_bits_leq32(24)?;
        let residue_end = bits.read_bits_leq32(24)?;
        let residue_partition_size = bits.read_bits_leq32(24)? + 1;
        let residue_classifications = bits.read_bits_leq32(6)? as u8 + 1;
        let residue_classbook = bits.read_bits_leq32(8)? as u8;

        if residue_end < residue_begin {
            return decode_error("vorbis: invalid residue begin and end");
        }

        if residue_classbook >= max_codebook {
            return decode_error("vorbis: invalid residue classbook");
        }

        let mut residue_vq_class = Vec::with_capacity(residue_classifications as usize);

        for _ in 0..residue_classifications {
            let low_bits = bits.read_bits_leq32(3)? as u8;

            let high_bits = if bits.read_bool()? { bits.read_bits_leq32(5)? as u8 } else { 0 };

            residue_vq_class.push(ResidueVqClass { is_used: (high_bits << 3) | low_bits, books: [0; 8] });
        }

        for vq_class in &mut residue_vq_class {
            for (j, book) in vq_class.books.iter_mut().enumerate() {
                if vq_class.is_used & (1 << j) != 0 {
                    *book = bits.read_bits_leq32(8)? as u8;

                    if *book >= max_codebook {
                        return decode_error("vorbis: invalid codebook for residue");
                    }
                }
            }
        }

        Ok(ResidueSetup {
            residue_type,
            residue_begin,
            residue_end,
            residue_partition_size,
            residue_classifications,
            residue_classbook,
            residue_vq_class,
        })
    }

    /// Decodes this residue's contribution for the current frame into
    /// `channels`, one entry per channel this residue's submap covers.
    /// An end-of-packet error partway through the cascade is not an
    /// error: residues may legally encode fewer than all 8 passes (§7).
    pub fn decode(
        &self,
        bs: &mut BitReaderRtl<'_>,
        bs_exp: u8,
        codebooks: &[VorbisCodebook],
        scratch: &mut ResidueScratch,
        channels: &mut [ResidueChannel<'_>],
    ) -> Result<()> {
        match self.decode_inner(bs, bs_exp, codebooks, scratch, channels) {
            Ok(()) => Ok(()),
            Err(Error::EndOfPacket) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn decode_inner(
        &self,
        bs: &mut BitReaderRtl<'_>,
        bs_exp: u8,
        codebooks: &[VorbisCodebook],
        scratch: &mut ResidueScratch,
        channels: &mut [ResidueChannel<'_>],
    ) -> Result<()> {
        let class_book = &codebooks[self.setup.residue_classbook as usize];
        let is_fmt2 = self.setup.residue_type == 2;

        let n = (1usize << bs_exp) >> 1;
        let channel_count = channels.len();

        // The length of the vector being decoded: one interleaved vector
        // of all channels for format 2, one per-channel vector otherwise.
        let actual_size = if is_fmt2 { n * channel_count } else { n };

        let limit_begin = min(self.setup.residue_begin as usize, actual_size);
        let limit_end = min(self.setup.residue_end as usize, actual_size);
        let residue_len = limit_end - limit_begin;

        let parts_per_classword = class_book.dimensions() as usize;
        let parts_to_read = residue_len / self.setup.residue_partition_size as usize;

        if is_fmt2 {
            scratch.reserve_part_classes(parts_to_read);
            scratch.reserve_interleave_buf(actual_size);
            scratch.interleave_buf[..actual_size].fill(0.0);
        }
        else {
            scratch.reserve_part_classes(parts_to_read * channel_count.max(1));

            for ch in channels.iter_mut() {
                ch.data[..n].fill(0.0);
            }
        }

        // §4.7: for format 2, all channels are skipped only if *every*
        // channel is marked do-not-decode; for 0/1 each channel that is
        // marked do-not-decode is independently skipped below.
        if channels.iter().all(|c| c.do_not_decode) {
            return Ok(());
        }

        for pass in 0..8 {
            for p_start in (0..parts_to_read).step_by(parts_per_classword.max(1)) {
                if pass == 0 {
                    if is_fmt2 {
                        let code = class_book.read_scalar(bs)?;
                        decode_classes(
                            code,
                            parts_per_classword,
                            self.setup.residue_classifications as u32,
                            &mut scratch.part_classes[p_start..],
                        );
                    }
                    else {
                        for (i, ch) in channels.iter().enumerate() {
                            if ch.do_not_decode {
                                continue;
                            }

                            let code = class_book.read_scalar(bs)?;
                            decode_classes(
                                code,
                                parts_per_classword,
                                self.setup.residue_classifications as u32,
                                &mut scratch.part_classes[p_start + i * parts_to_read..],
                            );
                        }
                    }
                }

                let p_end = min(parts_to_read, p_start + parts_per_classword.max(1));

                for p in p_start..p_end {
                    for (i, ch) in channels.iter_mut().enumerate() {
                        let vq_class = if is_fmt2 {
                            &self.setup.residue_vq_class[scratch.part_classes[p] as usize]
                        }
                        else {
                            if ch.do_not_decode {
                                continue;
                            }
                            let class_idx = scratch.part_classes[p + parts_to_read * i] as usize;
                            &self.setup.residue_vq_class[class_idx]
                        };

                        if vq_class.is_used(pass) {
                            let vq_book = &codebooks[vq_class.books[pass] as usize];

                            let part_size = self.setup.residue_partition_size as usize;
                            let offset = limit_begin + part_size * p;

                            match self.setup.residue_type {
                                0 => read_residue_partition_format0(
                                    bs,
                                    vq_book,
                                    &mut ch.data[offset..offset + part_size],
                                )?,
                                1 => read_residue_partition_format1(
                                    bs,
                                    vq_book,
                                    &mut ch.data[offset..offset + part_size],
                                )?,
                                2 => read_residue_partition_format1(
                                    bs,
                                    vq_book,
                                    &mut scratch.interleave_buf[offset..offset + part_size],
                                )?,
                                _ => unreachable!(),
                            }
                        }

                        if is_fmt2 {
                            break;
                        }
                    }
                }
            }
        }

        if is_fmt2 {
            // De-interleave: vec[c][i] = decoded[i * channel_count + c].
            for (c, ch) in channels.iter_mut().enumerate() {
                for (o, v) in ch.data[..n]
                    .iter_mut()
                    .zip(scratch.interleave_buf.chunks_exact(channel_count).map(|row| row[c]))
                {
                    *o = v;
                }
            }
        }

        Ok(())
    }
}

/// Unpacks a classword scalar, base-`classifications`, into
/// `class_words` per-partition class values, most-significant first.
/// `out` may be shorter than `class_words` at the final classword group of
/// a partition count that isn't a multiple of the classbook dimension; the
/// extra leading digits are then simply not stored.
fn decode_classes(mut val: u32, class_words: usize, classifications: u32, out: &mut [u8]) {
    for out in out.iter_mut().take(class_words).rev() {
        *out = (val % classifications) as u8;
        val /= classifications;
    }
}

/// Format 0: interleaves a codebook's dimensions across the partition,
/// `out[i + step*j]` for coordinate `j` of vector `i`.
fn read_residue_partition_format0(bs: &mut BitReaderRtl<'_>, codebook: &VorbisCodebook, out: &mut [f64]) -> Result<()> {
    let step = out.len() / codebook.dimensions() as usize;

    for i in 0..step {
        let vq = codebook.read_vq(bs)?;

        for (o, &v) in out[i..].iter_mut().step_by(step).zip(vq) {
            *o += v;
        }
    }

    Ok(())
}

/// Format 1 (and format 2's post-framing shape): appends each codebook
/// vector straight into the partition.
fn read_residue_partition_format1(bs: &mut BitReaderRtl<'_>, codebook: &VorbisCodebook, out: &mut [f64]) -> Result<()> {
    let dimensions = codebook.dimensions() as usize;

    for out in out.chunks_exact_mut(dimensions) {
        let vq = codebook.read_vq(bs)?;

        for (o, &v) in out.iter_mut().zip(vq) {
            *o += v;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_decode_classes_is_most_significant_first() {
        // base-4, 3 digits: 1*16 + 2*4 + 3 = 27.
        let mut out = [0u8; 3];
        decode_classes(27, 3, 4, &mut out);
        assert_eq!(out, [1, 2, 3]);
    }

    #[test]
    fn verify_invalid_residue_type_is_rejected() {
        let data = [0u8; 16];
        let mut bits = BitReaderRtl::new(&data);
        assert!(Residue::read(&mut bits, 3, 1).is_err());
    }
}
