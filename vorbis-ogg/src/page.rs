// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Ogg page parsing (§4.3): capture-pattern sync, 27-byte header plus
//! segment table, CRC32 verification, and the packet-length table used to
//! split a page's payload back into individual packets.
//!
//! Grounded directly on the teacher's `symphonia-format-ogg/src/page.rs`
//! (`PageHeader`, `PageReader`, `Page`, `PagePackets`), adapted to
//! `vorbis_core::checksum::Crc32` and `vorbis_core::io`. Unlike the teacher,
//! which seeks back to the sync position on a CRC mismatch and retries from
//! there, this reader just keeps scanning forward for the next capture
//! pattern -- seeking is an explicit non-goal (spec §1) and forward-only
//! resync needs no backward cursor.

use log::{debug, warn};

use vorbis_core::checksum::Crc32;
use vorbis_core::errors::{decode_error, Error, Result};
use vorbis_core::io::{BufReader, MonitorStream, ReadBytes};

const OGG_PAGE_MARKER: [u8; 4] = *b"OggS";
const OGG_PAGE_HEADER_SIZE: usize = 27;

pub const OGG_PAGE_MAX_SIZE: usize = OGG_PAGE_HEADER_SIZE + 255 + 255 * 255;

#[derive(Copy, Clone, Default)]
pub struct PageHeader {
    pub absgp: u64,
    pub serial: u32,
    pub sequence: u32,
    pub crc: u32,
    pub n_segments: u8,
    pub is_continuation: bool,
    pub is_first_page: bool,
    pub is_last_page: bool,
}

/// Reads a `PageHeader` from `reader`, which must already be positioned
/// just after the capture pattern check performed by `sync_page`.
fn read_page_header<B: ReadBytes>(reader: &mut B) -> Result<PageHeader> {
    let marker = reader.read_quad_bytes()?;

    if marker != OGG_PAGE_MARKER {
        return decode_error("ogg: missing ogg stream marker");
    }

    let version = reader.read_byte()?;

    if version != 0 {
        return decode_error("ogg: invalid ogg version");
    }

    let flags = reader.read_byte()?;

    if flags & 0xf8 != 0 {
        return decode_error("ogg: invalid flag bits set");
    }

    let absgp = reader.read_u64()?;
    let serial = reader.read_u32()?;
    let sequence = reader.read_u32()?;
    let crc = reader.read_u32()?;
    let n_segments = reader.read_byte()?;

    Ok(PageHeader {
        absgp,
        serial,
        sequence,
        crc,
        n_segments,
        is_continuation: (flags & 0x01) != 0,
        is_first_page: (flags & 0x02) != 0,
        is_last_page: (flags & 0x04) != 0,
    })
}

/// Scans `reader` forward to the next occurrence of the `"OggS"` capture
/// pattern.
fn sync_page<B: ReadBytes>(reader: &mut B) -> Result<()> {
    let mut marker = u32::from_be_bytes(reader.read_quad_bytes()?);

    while marker.to_be_bytes() != OGG_PAGE_MARKER {
        marker <<= 8;
        marker |= u32::from(reader.read_byte()?);
    }

    Ok(())
}

/// An iterator over the complete packets within a `Page`.
pub struct PagePackets<'a> {
    lens: std::slice::Iter<'a, u16>,
    data: &'a [u8],
}

impl<'a> PagePackets<'a> {
    /// If this page ends with an incomplete (partial) packet, returns a
    /// slice over the data belonging to that partial packet.
    pub fn partial_packet(self) -> Option<&'a [u8]> {
        let discard = usize::from(self.lens.sum::<u16>());

        if self.data.len() > discard {
            Some(&self.data[discard..])
        }
        else {
            None
        }
    }
}

impl<'a> Iterator for PagePackets<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let len = *self.lens.next()?;
        let (packet, rem) = self.data.split_at(usize::from(len));
        self.data = rem;
        Some(packet)
    }
}

/// A single, verified Ogg page.
pub struct Page<'a> {
    pub header: PageHeader,
    packet_lens: &'a [u16],
    page_buf: &'a [u8],
}

impl Page<'_> {
    /// Returns an iterator over all complete packets within the page. Use
    /// `PagePackets::partial_packet` on the returned iterator, after
    /// exhausting it, to recover a trailing incomplete packet's data.
    pub fn packets(&self) -> PagePackets<'_> {
        PagePackets { lens: self.packet_lens.iter(), data: self.page_buf }
    }

    /// The number of packets completed (not merely started) on this page.
    pub fn num_packets(&self) -> usize {
        self.packet_lens.len()
    }
}

/// A reader that parses, checksums, and buffers Ogg pages one at a time
/// from an underlying byte source.
pub struct PageReader {
    header: PageHeader,
    packet_lens: Vec<u16>,
    page_buf: Vec<u8>,
    page_buf_len: usize,
}

impl Default for PageReader {
    fn default() -> Self {
        PageReader { header: Default::default(), packet_lens: Vec::new(), page_buf: Vec::new(), page_buf_len: 0 }
    }
}

impl PageReader {
    pub fn try_new<B: ReadBytes>(reader: &mut B) -> Result<Self> {
        let mut page_reader = PageReader::default();
        page_reader.try_next_page(reader)?;
        Ok(page_reader)
    }

    /// Attempts to read the next page. Returns an error (without updating
    /// the reader's current page) if the page's capture pattern, header,
    /// or checksum is invalid.
    pub fn try_next_page<B: ReadBytes>(&mut self, reader: &mut B) -> Result<()> {
        let mut header_buf = [0u8; OGG_PAGE_HEADER_SIZE];
        header_buf[..4].copy_from_slice(&OGG_PAGE_MARKER);

        sync_page(reader)?;

        reader.read_buf_exact(&mut header_buf[4..])?;

        let header = read_page_header(&mut BufReader::new(&header_buf))?;

        debug!(
            "page {{ absgp={}, serial={}, sequence={}, crc={:#x}, n_segments={}, is_first={}, \
             is_last={}, is_continuation={} }}",
            header.absgp,
            header.serial,
            header.sequence,
            header.crc,
            header.n_segments,
            header.is_first_page,
            header.is_last_page,
            header.is_continuation,
        );

        // The CRC is computed with the page's own checksum field zeroed.
        header_buf[22..26].copy_from_slice(&[0u8; 4]);

        let mut crc32 = Crc32::new(0);
        crc32.process_buf_bytes(&header_buf);

        let mut crc32_reader = MonitorStream::new(reader, crc32);

        let mut page_body_len = 0usize;
        let mut packet_len = 0u16;

        self.packet_lens.clear();

        for _ in 0..header.n_segments {
            let seg_len = crc32_reader.read_byte()?;

            page_body_len += usize::from(seg_len);
            packet_len += u16::from(seg_len);

            if seg_len < 255 {
                self.packet_lens.push(packet_len);
                packet_len = 0;
            }
        }

        self.read_page_body(&mut crc32_reader, page_body_len)?;

        let calculated_crc = crc32_reader.monitor().crc();

        if header.crc != calculated_crc {
            warn!("crc mismatch: expected {:#x}, got {:#x}", header.crc, calculated_crc);

            self.packet_lens.clear();
            self.page_buf_len = 0;

            return decode_error("ogg: crc mismatch");
        }

        self.header = header;

        Ok(())
    }

    /// Reads the next page, skipping over any corrupt pages encountered
    /// along the way, until a valid page is found or the source errors.
    pub fn next_page<B: ReadBytes>(&mut self, reader: &mut B) -> Result<()> {
        loop {
            match self.try_next_page(reader) {
                Ok(()) => return Ok(()),
                Err(err @ Error::Io(_)) | Err(err @ Error::EndOfPacket) => return Err(err),
                Err(_) => continue,
            }
        }
    }

    /// Reads pages, discarding corrupt ones and pages for other logical
    /// streams, until one with the given serial number is found.
    pub fn next_page_for_serial<B: ReadBytes>(&mut self, reader: &mut B, serial: u32) -> Result<()> {
        loop {
            match self.try_next_page(reader) {
                Ok(()) => {
                    if self.header.serial == serial && !self.header.is_continuation {
                        return Ok(());
                    }
                }
                Err(err @ Error::Io(_)) | Err(err @ Error::EndOfPacket) => return Err(err),
                Err(_) => continue,
            }
        }
    }

    /// A slice over the first packet's bytes, if the page contains one.
    pub fn first_packet(&self) -> Option<&[u8]> {
        self.packet_lens.first().map(|&len| &self.page_buf[..usize::from(len)])
    }

    pub fn header(&self) -> PageHeader {
        self.header
    }

    pub fn page(&self) -> Page<'_> {
        assert!(self.page_buf_len <= 255 * 255, "ogg pages are <= 65025 bytes");

        Page { header: self.header, packet_lens: &self.packet_lens, page_buf: &self.page_buf[..self.page_buf_len] }
    }

    fn read_page_body<B: ReadBytes>(&mut self, reader: &mut B, len: usize) -> Result<()> {
        assert!(len <= 255 * 255);

        if len > self.page_buf.len() {
            let new_buf_len = (len + (8 * 1024 - 1)) & !(8 * 1024 - 1);
            debug!("grow page buffer to {} bytes", new_buf_len);
            self.page_buf.resize(new_buf_len, 0);
        }

        self.page_buf_len = len;
        reader.read_buf_exact(&mut self.page_buf[..len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_page(serial: u32, sequence: u32, absgp: u64, packets: &[&[u8]], flags: u8) -> Vec<u8> {
        let mut segments = Vec::new();
        let mut body = Vec::new();

        for packet in packets {
            let mut remaining = packet.len();
            if remaining == 0 {
                segments.push(0);
            }
            while remaining >= 255 {
                segments.push(255);
                remaining -= 255;
            }
            segments.push(remaining as u8);
            body.extend_from_slice(packet);
        }

        let mut page = Vec::new();
        page.extend_from_slice(b"OggS");
        page.push(0); // version
        page.push(flags);
        page.extend_from_slice(&absgp.to_le_bytes());
        page.extend_from_slice(&serial.to_le_bytes());
        page.extend_from_slice(&sequence.to_le_bytes());

        let crc_pos = page.len();
        page.extend_from_slice(&[0u8; 4]);
        page.push(segments.len() as u8);
        page.extend_from_slice(&segments);
        page.extend_from_slice(&body);

        let mut crc = Crc32::new(0);
        crc.process_buf_bytes(&page);
        page[crc_pos..crc_pos + 4].copy_from_slice(&crc.crc().to_le_bytes());

        page
    }

    #[test]
    fn verify_single_packet_page_round_trip() {
        let raw = build_page(1, 0, 0, &[b"hello vorbis"], 0x02);

        let mut reader = vorbis_core::io::BufReader::new(&raw);
        let mut pr = PageReader::try_new(&mut reader).unwrap();

        assert_eq!(pr.header().serial, 1);
        assert!(pr.header().is_first_page);
        assert_eq!(pr.first_packet(), Some(&b"hello vorbis"[..]));

        let page = pr.page();
        let packets: Vec<&[u8]> = page.packets().collect();
        assert_eq!(packets, vec![&b"hello vorbis"[..]]);
    }

    #[test]
    fn verify_crc_mismatch_is_fatal_for_page() {
        let mut raw = build_page(1, 0, 0, &[b"data"], 0);
        // Corrupt a payload byte without updating the checksum.
        let last = raw.len() - 1;
        raw[last] ^= 0xff;

        let mut reader = vorbis_core::io::BufReader::new(&raw);
        assert!(PageReader::try_new(&mut reader).is_err());
    }

    /// §8 item 9: a payload split across 17 full 255-byte segments plus a
    /// final 42-byte segment reassembles to a 17*255+42 = 4377-byte packet.
    #[test]
    fn verify_large_packet_segment_table() {
        let payload = vec![0xABu8; 17 * 255 + 42];
        let raw = build_page(1, 0, 0, &[&payload], 0x02 | 0x04);

        let mut reader = vorbis_core::io::BufReader::new(&raw);
        let pr = PageReader::try_new(&mut reader).unwrap();

        let page = pr.page();
        let packets: Vec<&[u8]> = page.packets().collect();
        assert_eq!(packets.len(), 1);
        assert_eq!(packets[0].len(), 4377);
    }

    #[test]
    fn verify_trailing_255_segment_yields_partial_packet() {
        // A single packet whose segment table is exactly one 255-length
        // segment with no terminating sub-255 segment: it must be reported
        // as a partial (continues-to-next-page) packet, not a complete one.
        let payload = vec![0x11u8; 255];

        let mut raw = Vec::new();
        raw.extend_from_slice(b"OggS");
        raw.push(0);
        raw.push(0x02);
        raw.extend_from_slice(&0u64.to_le_bytes());
        raw.extend_from_slice(&1u32.to_le_bytes());
        raw.extend_from_slice(&0u32.to_le_bytes());
        let crc_pos = raw.len();
        raw.extend_from_slice(&[0u8; 4]);
        raw.push(1); // n_segments
        raw.push(255); // segment table: one 255-length segment, no terminator
        raw.extend_from_slice(&payload);

        let mut crc = Crc32::new(0);
        crc.process_buf_bytes(&raw);
        raw[crc_pos..crc_pos + 4].copy_from_slice(&crc.crc().to_le_bytes());

        let mut reader = vorbis_core::io::BufReader::new(&raw);
        let pr = PageReader::try_new(&mut reader).unwrap();

        let page = pr.page();
        let mut iter = page.packets();
        assert_eq!(iter.next(), None);
        assert_eq!(iter.partial_packet(), Some(&payload[..]));
    }
}
