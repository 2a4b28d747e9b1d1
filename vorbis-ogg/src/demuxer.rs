// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Top-level Ogg demuxer (§4.3): pulls pages from the byte source, routes
//! each to its logical stream, and yields reassembled packets in order.
//!
//! Grounded on the shape implied by `symphonia-format-ogg/src/demuxer.rs`'s
//! use of `PageReader`/`LogicalStream` (the file itself was not present in
//! the retrieved pack). Simplified to the decoder's actual need: a single
//! primary logical stream. Spec §1 notes multiplexed Ogg files are
//! permitted by the container but decoding more than one logical stream is
//! optional; this demuxer picks the first stream whose BOS page it sees
//! and ignores pages belonging to any other serial, logging a warning
//! rather than erroring (chained/multiplexed files are common in the
//! wild, e.g. a skeleton track alongside the audio track).

use log::warn;

use vorbis_core::errors::{Error, Result};
use vorbis_core::io::ReadBytes;

use crate::logical::{LogicalStream, Packet};
use crate::page::PageReader;

/// Demuxes a single logical Vorbis stream out of an Ogg byte stream.
pub struct OggDemuxer<B> {
    reader: B,
    page_reader: PageReader,
    stream: Option<LogicalStream>,
}

impl<B: ReadBytes> OggDemuxer<B> {
    /// Opens the stream, reading pages until the primary logical stream is
    /// identified (its first, BOS-flagged page).
    pub fn new(mut reader: B) -> Result<Self> {
        let mut page_reader = PageReader::default();

        loop {
            page_reader.try_next_page(&mut reader)?;
            let header = page_reader.header();

            if header.is_first_page {
                let mut stream = LogicalStream::new(header.serial);
                stream.read_page(&page_reader.page())?;
                return Ok(OggDemuxer { reader, page_reader, stream: Some(stream) });
            }

            warn!("ignoring page for serial {} before any BOS page was seen", header.serial);
        }
    }

    /// Pulls and returns the next reassembled packet of the primary
    /// stream, reading additional pages as needed. Returns `Ok(None)` once
    /// the stream's EOS page has been consumed and no packets remain.
    pub fn next_packet(&mut self) -> Result<Option<Packet>> {
        loop {
            let stream = self.stream.as_mut().expect("stream identified in new()");

            if let Some(packet) = stream.next_packet() {
                return Ok(Some(packet));
            }

            if stream.saw_eos() {
                return Ok(None);
            }

            match self.page_reader.try_next_page(&mut self.reader) {
                Ok(()) => {
                    let header = self.page_reader.header();
                    let stream = self.stream.as_mut().expect("stream identified in new()");

                    if header.serial == stream.serial() {
                        stream.read_page(&self.page_reader.page())?;
                    }
                    else {
                        warn!("ignoring page for unrelated serial {}", header.serial);
                    }
                }
                Err(Error::Io(err)) => return Err(Error::Io(err)),
                // A corrupt page (bad sync, CRC mismatch) is skipped; the
                // demuxer tries the next page rather than failing the
                // whole stream, mirroring `PageReader::next_page`.
                Err(Error::EndOfPacket) => return Ok(None),
                Err(_) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn verify_demuxer_yields_packets_in_order() {
        let mut raw = Vec::new();
        push_page(&mut raw, 42, 0, 0x02, &[3, 4], b"abcdefg");
        push_page(&mut raw, 42, 1, 0x04, &[5], b"hijkl");

        let reader = vorbis_core::io::BufReader::new(&raw);
        let mut demux = OggDemuxer::new(reader).unwrap();

        let p1 = demux.next_packet().unwrap().unwrap();
        assert_eq!(&*p1.data, b"abc");
        let p2 = demux.next_packet().unwrap().unwrap();
        assert_eq!(&*p2.data, b"defg");
        let p3 = demux.next_packet().unwrap().unwrap();
        assert_eq!(&*p3.data, b"hijkl");

        assert!(demux.next_packet().unwrap().is_none());
    }

    #[test]
    fn verify_unrelated_serial_is_ignored() {
        let mut raw = Vec::new();
        push_page(&mut raw, 1, 0, 0x02, &[3], b"one");
        push_page(&mut raw, 2, 0, 0x02, &[3], b"two");
        push_page(&mut raw, 1, 1, 0x04, &[3], b"xyz");

        let reader = vorbis_core::io::BufReader::new(&raw);
        let mut demux = OggDemuxer::new(reader).unwrap();

        let p1 = demux.next_packet().unwrap().unwrap();
        assert_eq!(&*p1.data, b"one");
        let p2 = demux.next_packet().unwrap().unwrap();
        assert_eq!(&*p2.data, b"xyz");
        assert!(demux.next_packet().unwrap().is_none());
    }
}
