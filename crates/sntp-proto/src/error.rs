// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Custom error types for buffer-based NTP header parsing and serialization.
//!
//! [`ParseError`] uses no heap allocation and converts into [`std::io::Error`]
//! so transport code can propagate it with `?`.

use std::fmt;

/// Errors that can occur while reading or writing NTP header fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// A fixed-size field did not fit in the remaining buffer.
    BufferTooShort {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        available: usize,
    },
    /// The packet is shorter than the 48-byte header or is not a whole number
    /// of 32-bit words.
    TooShort {
        /// Length of the rejected packet in bytes.
        length: usize,
    },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::BufferTooShort { needed, available } => {
                write!(
                    f,
                    "buffer too short: needed {} bytes, got {}",
                    needed, available
                )
            }
            ParseError::TooShort { length } => {
                write!(
                    f,
                    "packet of {} bytes is not a word-aligned NTP packet",
                    length
                )
            }
        }
    }
}

impl From<ParseError> for std::io::Error {
    fn from(err: ParseError) -> std::io::Error {
        let kind = match &err {
            ParseError::BufferTooShort { .. } => std::io::ErrorKind::UnexpectedEof,
            ParseError::TooShort { .. } => std::io::ErrorKind::InvalidData,
        };
        std::io::Error::new(kind, err)
    }
}

impl std::error::Error for ParseError {}
