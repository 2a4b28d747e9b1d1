// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Packet reassembly for a single logical Ogg stream (§3 "Stream", §4.3).
//!
//! Grounded on the shape of `symphonia-format-ogg/src/logical.rs` (the
//! `part_buf`/`part_len` partial-packet accumulator, page sequence gap
//! detection), with the metadata/timestamp machinery
//! (`CodecParameters`/`Mapper`/gapless trimming) dropped: this crate only
//! reassembles packet byte boundaries, and leaves interpreting them to
//! `vorbis-codec` (comment-header parsing and granule-position-derived
//! timestamps are both out of scope, spec §1).

use std::collections::VecDeque;

use log::warn;

use vorbis_core::errors::{decode_error, Result};

use crate::page::Page;

/// A reassembled Vorbis packet: the concatenation of one or more page
/// segments, with continuation consistency already verified.
pub struct Packet {
    pub serial: u32,
    pub data: Box<[u8]>,
}

/// Reassembles the packets belonging to one logical (single-serial) Ogg
/// stream out of the sequence of pages presented to it.
pub struct LogicalStream {
    serial: u32,
    packets: VecDeque<Packet>,
    part_buf: Vec<u8>,
    part_len: usize,
    prev_sequence: Option<u32>,
    saw_bos: bool,
    saw_eos: bool,
}

impl LogicalStream {
    const MAX_PACKET_LEN: usize = 16 * 1024 * 1024;

    pub fn new(serial: u32) -> Self {
        LogicalStream {
            serial,
            packets: VecDeque::new(),
            part_buf: Vec::new(),
            part_len: 0,
            prev_sequence: None,
            saw_bos: false,
            saw_eos: false,
        }
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn saw_eos(&self) -> bool {
        self.saw_eos
    }

    /// Feeds one page belonging to this stream's serial number through
    /// packet reassembly, queueing any packets it completes.
    pub fn read_page(&mut self, page: &Page<'_>) -> Result<()> {
        if !page.header.is_continuation {
            if !self.saw_bos && !page.header.is_first_page {
                // Not fatal: some encoders omit BOS on truncated streams.
                // §4.3 lists a missing BOS on the first page as an error
                // class, but it is only meaningful relative to the very
                // first page this stream ever sees.
            }
        }

        if page.header.is_first_page {
            self.saw_bos = true;
        }

        if let Some(prev) = self.prev_sequence {
            if page.header.sequence < prev {
                warn!("stream {}: page sequence went backwards", self.serial);
                self.part_len = 0;
            }
            else if page.header.sequence - prev > 1 {
                warn!(
                    "stream {}: detected gap of {} page(s)",
                    self.serial,
                    page.header.sequence - prev
                );
                self.part_len = 0;
            }
        }
        self.prev_sequence = Some(page.header.sequence);

        let mut iter = page.packets();

        if !page.header.is_continuation && self.part_len > 0 {
            warn!("stream {}: expected a continuation page", self.serial);
            self.part_len = 0;
        }

        if page.header.is_continuation && self.part_len == 0 {
            if page.num_packets() > 0 {
                warn!("stream {}: unexpected continuation page, dropping incomplete packet", self.serial);
                iter.next();
            }
            else {
                warn!("stream {}: unexpected continuation page, ignoring", self.serial);
                return Ok(());
            }
        }

        for buf in &mut iter {
            let data = self.assemble_packet(buf);
            self.packets.push_back(Packet { serial: self.serial, data });
        }

        if let Some(buf) = iter.partial_packet() {
            self.save_partial(buf)?;
        }

        if page.header.is_last_page {
            self.saw_eos = true;
        }

        Ok(())
    }

    pub fn has_packets(&self) -> bool {
        !self.packets.is_empty()
    }

    pub fn next_packet(&mut self) -> Option<Packet> {
        self.packets.pop_front()
    }

    fn assemble_packet(&mut self, page_buf: &[u8]) -> Box<[u8]> {
        if self.part_len == 0 {
            Box::from(page_buf)
        }
        else {
            let mut buf = vec![0u8; self.part_len + page_buf.len()];
            let (saved, fresh) = buf.split_at_mut(self.part_len);
            saved.copy_from_slice(&self.part_buf[..self.part_len]);
            fresh.copy_from_slice(page_buf);
            self.part_len = 0;
            buf.into_boxed_slice()
        }
    }

    fn save_partial(&mut self, buf: &[u8]) -> Result<()> {
        let new_len = self.part_len + buf.len();

        if new_len > Self::MAX_PACKET_LEN {
            return decode_error("ogg: packet buffer would exceed max size");
        }

        if new_len > self.part_buf.len() {
            let grown = (new_len + (8 * 1024 - 1)) & !(8 * 1024 - 1);
            self.part_buf.resize(grown, 0);
        }

        self.part_buf[self.part_len..new_len].copy_from_slice(buf);
        self.part_len = new_len;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_simple_reassembly_via_page_reader() {
        use crate::page::PageReader;

        // Build a tiny two-page Ogg stream by hand: the first packet is
        // split across both pages (segment table ends in 255 on page 1).
        let mut raw = Vec::new();

        fn push_page(out: &mut Vec<u8>, serial: u32, seq: u32, flags: u8, segs: &[u8], body: &[u8]) {
            out.extend_from_slice(b"OggS");
            out.push(0);
            out.push(flags);
            out.extend_from_slice(&0u64.to_le_bytes());
            out.extend_from_slice(&serial.to_le_bytes());
            out.extend_from_slice(&seq.to_le_bytes());
            let crc_pos = out.len();
            out.extend_from_slice(&[0u8; 4]);
            out.push(segs.len() as u8);
            out.extend_from_slice(segs);
            out.extend_from_slice(body);

            let mut crc = vorbis_core::checksum::Crc32::new(0);
            crc.process_buf_bytes(out);
            out[crc_pos..crc_pos + 4].copy_from_slice(&crc.crc().to_le_bytes());
        }

        let part1 = vec![0xAAu8; 255];
        let part2 = vec![0xBBu8; 10];

        push_page(&mut raw, 7, 0, 0x02, &[255], &part1);
        push_page(&mut raw, 7, 1, 0x04, &[10], &part2);

        let mut reader = vorbis_core::io::BufReader::new(&raw);
        let mut pr = PageReader::try_new(&mut reader).unwrap();

        let mut stream = LogicalStream::new(7);
        stream.read_page(&pr.page()).unwrap();
        assert!(!stream.has_packets());

        pr.try_next_page(&mut reader).unwrap();
        stream.read_page(&pr.page()).unwrap();

        assert!(stream.has_packets());
        let packet = stream.next_packet().unwrap();
        assert_eq!(packet.data.len(), 265);
        assert!(packet.data[..255].iter().all(|&b| b == 0xAA));
        assert!(packet.data[255..].iter().all(|&b| b == 0xBB));
        assert!(stream.saw_eos());
    }
}
