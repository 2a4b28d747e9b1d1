// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The `errors` module defines the common error type shared by every crate
//! in the workspace.

use std::fmt;

/// `Error` enumerates every way Ogg page parsing, header parsing, or frame
/// decoding can fail.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred while reading the underlying byte stream.
    Io(std::io::Error),
    /// The stream contained malformed data and could not be decoded.
    Decode(&'static str),
    /// A well-formed but unsupported feature was encountered (e.g. floor
    /// type 0, or a second logical stream when only one is expected).
    Unsupported(&'static str),
    /// The bit reader ran out of bits before satisfying a read. Fatal
    /// everywhere except inside floor decode, where callers are expected
    /// to catch it and treat the channel as unused for the frame.
    EndOfPacket,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(err) => write!(f, "io error: {}", err),
            Error::Decode(msg) => write!(f, "malformed stream: {}", msg),
            Error::Unsupported(feature) => write!(f, "unsupported: {}", feature),
            Error::EndOfPacket => write!(f, "end of packet"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Error::EndOfPacket,
            _ => Error::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Convenience function to create a decode error.
pub fn decode_error<T>(desc: &'static str) -> Result<T> {
    Err(Error::Decode(desc))
}

/// Convenience function to create an unsupported-feature error.
pub fn unsupported_error<T>(feature: &'static str) -> Result<T> {
    Err(Error::Unsupported(feature))
}

/// Convenience function to create an end-of-packet error.
pub fn end_of_packet_error<T>() -> Result<T> {
    Err(Error::EndOfPacket)
}
