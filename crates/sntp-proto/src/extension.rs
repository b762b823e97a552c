// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! NTP extension field scanning for received packets.
//!
//! Extension fields follow the NTPv4 extension field format defined in RFC 7822,
//! appended after the 48-byte NTP packet header and before the optional MAC.
//!
//! # Extension Field Format (RFC 7822)
//!
//! ```text
//!  0                   1                   2                   3
//!  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! |          Field Type           |        Field Length           |
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! .                                                               .
//! .                       Field Value (variable)                  .
//! .                                                               .
//! +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
//! ```
//!
//! A trailer of up to six words is always a MAC, so the chain is only walked
//! while more than six words remain. This also settles the ambiguity of a
//! six-word trailer, which is read as a key id and 20-byte digest.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::protocol::HEADER_LEN;

/// Largest trailer, in 32-bit words, that is treated as a MAC.
pub const MAX_MAC_WORDS: usize = 6;

/// Smallest extension field, in 32-bit words (RFC 7822: 16 bytes of value
/// after a 4-byte header).
pub const MIN_EXTENSION_WORDS: usize = 5;

/// A borrowed view of an extension field (no allocation).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExtensionFieldRef<'a> {
    /// The extension field type code.
    pub field_type: u16,
    /// The length declared in the field header, in bytes.
    pub declared_length: u16,
    /// The field value and padding, excluding the 4-byte field header.
    pub value: &'a [u8],
}

/// A malformed extension field.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExtensionError {
    /// Byte offset of the offending field within the packet.
    pub offset: usize,
    /// The length the field declared, in bytes.
    pub declared_length: u16,
    /// Words left in the packet at that offset.
    pub remaining_words: usize,
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "extension field at byte {} declares {} bytes with {} words remaining",
            self.offset, self.declared_length, self.remaining_words
        )
    }
}

impl std::error::Error for ExtensionError {}

/// The result of walking a packet's extension chain.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Extensions<'a> {
    /// The fields found, in packet order.
    pub fields: Vec<ExtensionFieldRef<'a>>,
    /// Byte offset where the trailer (MAC or Crypto-NAK) begins.
    pub trailer_offset: usize,
}

impl Extensions<'_> {
    /// Number of 32-bit words left after the extension chain in a packet of
    /// `packet_len` bytes.
    pub fn trailer_words(&self, packet_len: usize) -> usize {
        packet_len.saturating_sub(self.trailer_offset) / 4
    }
}

/// Walk the extension chain of a word-aligned packet.
///
/// Fields are consumed while more than [`MAX_MAC_WORDS`] words remain. Each
/// field's declared length is rounded up to whole words and must cover at
/// least [`MIN_EXTENSION_WORDS`] without running past the end of the packet.
pub fn scan(packet: &[u8]) -> Result<Extensions<'_>, ExtensionError> {
    let mut offset = HEADER_LEN.min(packet.len());
    let mut fields = Vec::new();

    loop {
        let remaining_words = (packet.len() - offset) / 4;
        if remaining_words <= MAX_MAC_WORDS {
            break;
        }

        let field_type = BigEndian::read_u16(&packet[offset..offset + 2]);
        let declared_length = BigEndian::read_u16(&packet[offset + 2..offset + 4]);
        let words = (declared_length as usize).div_ceil(4);

        if words < MIN_EXTENSION_WORDS || words > remaining_words {
            return Err(ExtensionError {
                offset,
                declared_length,
                remaining_words,
            });
        }

        fields.push(ExtensionFieldRef {
            field_type,
            declared_length,
            value: &packet[offset + 4..offset + words * 4],
        });
        offset += words * 4;
    }

    Ok(Extensions {
        fields,
        trailer_offset: offset,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_with_trailer(words: &[u32]) -> Vec<u8> {
        let mut buf = vec![0u8; HEADER_LEN];
        for w in words {
            buf.extend_from_slice(&w.to_be_bytes());
        }
        buf
    }

    #[test]
    fn header_only_has_no_trailer() {
        let pkt = packet_with_trailer(&[]);
        let ext = scan(&pkt).unwrap();
        assert!(ext.fields.is_empty());
        assert_eq!(ext.trailer_words(pkt.len()), 0);
    }

    #[test]
    fn six_word_trailer_is_left_for_the_mac() {
        // Would be a valid 5-word field, but six words are always a MAC.
        let pkt = packet_with_trailer(&[0x0104_0014, 0, 0, 0, 0, 0]);
        let ext = scan(&pkt).unwrap();
        assert!(ext.fields.is_empty());
        assert_eq!(ext.trailer_offset, HEADER_LEN);
        assert_eq!(ext.trailer_words(pkt.len()), 6);
    }

    #[test]
    fn field_followed_by_mac() {
        let mut words = vec![0x0104_0014, 1, 2, 3, 4];
        words.extend_from_slice(&[9, 0, 0, 0, 0]);
        let pkt = packet_with_trailer(&words);
        let ext = scan(&pkt).unwrap();
        assert_eq!(ext.fields.len(), 1);
        assert_eq!(ext.fields[0].field_type, 0x0104);
        assert_eq!(ext.fields[0].value.len(), 16);
        assert_eq!(ext.trailer_offset, HEADER_LEN + 20);
        assert_eq!(ext.trailer_words(pkt.len()), 5);
    }

    #[test]
    fn declared_length_rounds_up() {
        // 18 bytes rounds up to 5 words; the following 7 words hold another
        // field of 7 words.
        let mut words = vec![0x0001_0012, 0, 0, 0, 0];
        words.extend_from_slice(&[0x0002_001C, 0, 0, 0, 0, 0, 0]);
        let pkt = packet_with_trailer(&words);
        let ext = scan(&pkt).unwrap();
        assert_eq!(ext.fields.len(), 2);
        assert_eq!(ext.trailer_words(pkt.len()), 0);
    }

    #[test]
    fn too_short_field_is_rejected() {
        let pkt = packet_with_trailer(&[0x0001_0003, 0, 0, 0, 0, 0, 0]);
        let err = scan(&pkt).unwrap_err();
        assert_eq!(err.offset, HEADER_LEN);
        assert_eq!(err.declared_length, 3);
        assert_eq!(err.remaining_words, 7);
    }

    #[test]
    fn overlong_field_is_rejected() {
        let pkt = packet_with_trailer(&[0x0001_0100, 0, 0, 0, 0, 0, 0]);
        assert!(scan(&pkt).is_err());
    }
}
