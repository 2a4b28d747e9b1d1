// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Byte-level reading over the pull-based byte source described in §6:
//! `read(n) -> bytes | EOF`. `ReadBytes` is the trait every page/packet
//! reader is written against; `BufReader` implements it over an in-memory
//! buffer (a parsed packet or a page body); `MonitorStream` wraps any
//! `ReadBytes` to additionally feed a `Monitor` (the page CRC accumulator)
//! with every byte read.

use std::io::Read;

use crate::checksum::Monitor;
use crate::errors::Result;

/// A reader over a byte-oriented source with a definite position, used for
/// everything from the raw Ogg byte stream to individual packet payloads.
pub trait ReadBytes {
    fn read_byte(&mut self) -> Result<u8>;

    fn read_quad_bytes(&mut self) -> Result<[u8; 4]>;

    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()>;

    fn read_u16(&mut self) -> Result<u16> {
        let mut buf = [0u8; 2];
        self.read_buf_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32(&mut self) -> Result<u32> {
        let mut buf = [0u8; 4];
        self.read_buf_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        self.read_buf_exact(&mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn pos(&self) -> u64;
}

/// Tracks position within an in-memory buffer; used both as a standalone
/// reader over a page body and wrapped by `MonitorStream` while a page
/// header and segment table are checksummed.
pub struct BufReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BufReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        BufReader { buf, pos: 0 }
    }
}

impl ReadBytes for BufReader<'_> {
    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self.buf.get(self.pos).ok_or(crate::errors::Error::EndOfPacket)?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_quad_bytes(&mut self) -> Result<[u8; 4]> {
        let mut out = [0u8; 4];
        self.read_buf_exact(&mut out)?;
        Ok(out)
    }

    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        let end = self.pos + buf.len();
        let src = self.buf.get(self.pos..end).ok_or(crate::errors::Error::EndOfPacket)?;
        buf.copy_from_slice(src);
        self.pos = end;
        Ok(())
    }

    fn pos(&self) -> u64 {
        self.pos as u64
    }
}

/// Wraps any `std::io::Read` source and exposes it as a `ReadBytes`,
/// tracking an absolute byte position. This is the reader driven directly
/// against the caller-supplied byte source (§6).
pub struct SourceReader<R> {
    inner: R,
    pos: u64,
}

impl<R: Read> SourceReader<R> {
    pub fn new(inner: R) -> Self {
        SourceReader { inner, pos: 0 }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ReadBytes for SourceReader<R> {
    fn read_byte(&mut self) -> Result<u8> {
        let mut buf = [0u8; 1];
        self.read_buf_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_quad_bytes(&mut self) -> Result<[u8; 4]> {
        let mut buf = [0u8; 4];
        self.read_buf_exact(&mut buf)?;
        Ok(buf)
    }

    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_exact(buf)?;
        self.pos += buf.len() as u64;
        Ok(())
    }

    fn pos(&self) -> u64 {
        self.pos
    }
}

/// A `ReadBytes` adapter that feeds every byte it reads through a
/// `Monitor`, used to compute a page's CRC32 while its header, segment
/// table, and body stream past.
pub struct MonitorStream<'a, B, M> {
    inner: &'a mut B,
    monitor: M,
}

impl<'a, B: ReadBytes, M: Monitor> MonitorStream<'a, B, M> {
    pub fn new(inner: &'a mut B, monitor: M) -> Self {
        MonitorStream { inner, monitor }
    }

    pub fn monitor(&self) -> &M {
        &self.monitor
    }
}

impl<B: ReadBytes, M: Monitor> ReadBytes for MonitorStream<'_, B, M> {
    fn read_byte(&mut self) -> Result<u8> {
        let byte = self.inner.read_byte()?;
        self.monitor.process_byte(byte);
        Ok(byte)
    }

    fn read_quad_bytes(&mut self) -> Result<[u8; 4]> {
        let bytes = self.inner.read_quad_bytes()?;
        self.monitor.process_buf_bytes(&bytes);
        Ok(bytes)
    }

    fn read_buf_exact(&mut self, buf: &mut [u8]) -> Result<()> {
        self.inner.read_buf_exact(buf)?;
        self.monitor.process_buf_bytes(buf);
        Ok(())
    }

    fn pos(&self) -> u64 {
        self.inner.pos()
    }
}
