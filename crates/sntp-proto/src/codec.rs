// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Client request encoding, response header decoding, and the on-wire
//! offset arithmetic of RFC 5905 Section 8.

use byteorder::{BigEndian, ByteOrder};

use crate::error::ParseError;
use crate::key::Key;
use crate::mac::MacError;
use crate::protocol::{
    self, ConstPackedSizeBytes, FromBytes, Header, LeapIndicator, Mode, ToBytes, Version,
};
use crate::unix_time::Instant;

/// A serialized client request and the header it was built from.
///
/// The header is kept so that the transmit timestamp can be matched against
/// the origin timestamp of the reply.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Request {
    bytes: Vec<u8>,
    header: Header,
}

impl Request {
    /// The bytes to put on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total length: 48, or `48 + 4 + digest length` when signed.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Always false; a request holds at least the header.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The header as sent.
    pub fn header(&self) -> &Header {
        &self.header
    }

    /// The transmit timestamp (T1) written into the request.
    pub fn transmit_timestamp(&self) -> protocol::TimestampFormat {
        self.header.transmit_timestamp
    }
}

/// Build an NTPv4 client request stamped with `now`, signed with `key` if given.
///
/// # Examples
///
/// ```
/// use sntp_proto::codec::{decode_header, encode_request};
/// use sntp_proto::unix_time::Instant;
///
/// let now = Instant::now();
/// let request = encode_request(&now, None).unwrap();
/// assert_eq!(request.len(), 48);
/// let header = decode_header(request.as_bytes()).unwrap();
/// assert_eq!(header.transmit_timestamp, now.into());
/// ```
pub fn encode_request(now: &Instant, key: Option<&Key>) -> Result<Request, MacError> {
    encode_request_with_version(now, Version::V4, key)
}

/// Like [`encode_request`], writing `version` into the header.
pub fn encode_request_with_version(
    now: &Instant,
    version: Version,
    key: Option<&Key>,
) -> Result<Request, MacError> {
    let header = Header {
        leap_indicator: LeapIndicator::Unknown,
        version,
        mode: Mode::Client,
        poll: protocol::REQUEST_POLL,
        transmit_timestamp: (*now).into(),
        ..Header::default()
    };

    let mut bytes = vec![0u8; Header::PACKED_SIZE_BYTES];
    let written = header.to_bytes(&mut bytes);
    debug_assert!(matches!(written, Ok(n) if n == Header::PACKED_SIZE_BYTES));

    if let Some(key) = key {
        let digest = key.digest(&bytes)?;
        let mut key_id = [0u8; protocol::KEY_ID_LEN];
        BigEndian::write_u32(&mut key_id, key.id());
        bytes.extend_from_slice(&key_id);
        bytes.extend_from_slice(&digest);
    }

    Ok(Request { bytes, header })
}

/// Decode the fixed header of a received packet.
///
/// Fails with [`ParseError::TooShort`] if `bytes` is shorter than the header
/// or not a whole number of 32-bit words. Extension fields and MAC are ignored.
pub fn decode_header(bytes: &[u8]) -> Result<Header, ParseError> {
    if bytes.len() < Header::PACKED_SIZE_BYTES || bytes.len() % 4 != 0 {
        return Err(ParseError::TooShort {
            length: bytes.len(),
        });
    }
    let (header, _) = Header::from_bytes(bytes)?;
    Ok(header)
}

/// Timing figures derived from one request/response exchange.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Clock offset `((T2 - T1) + (T3 - T4)) / 2`, in seconds.
    ///
    /// Positive when the local clock is behind the server.
    pub offset: f64,
    /// Round-trip delay `(T2 - T1) - (T3 - T4)`, in seconds.
    pub delay: f64,
    /// Server precision `2^precision`, in seconds.
    pub precision: f64,
    /// Synchronization distance `rootdelay / 2 + rootdisp + |delay|`, in seconds.
    pub synch_distance: f64,
}

impl Sample {
    /// Compute the sample for `response`, given the origin (T1) and
    /// destination (T4) timestamps recorded locally.
    ///
    /// Differences are taken in 64-bit fixed point before conversion to
    /// seconds, so the result is exact across an era rollover.
    pub fn new(
        response: &Header,
        origin: protocol::TimestampFormat,
        destination: protocol::TimestampFormat,
    ) -> Sample {
        let t21 = response.receive_timestamp.seconds_since(origin);
        let t34 = response.transmit_timestamp.seconds_since(destination);
        let delay = t21 - t34;
        Sample {
            offset: (t21 + t34) / 2.0,
            delay,
            precision: 2f64.powi(response.precision as i32),
            synch_distance: response.root_delay.to_seconds() / 2.0
                + response.root_dispersion.to_seconds()
                + delay.abs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mac::DigestAlgorithm;
    use crate::protocol::{ShortFormat, TimestampFormat};

    fn at(secs: i64, nanos: i32) -> Instant {
        Instant::new(secs, nanos).unwrap()
    }

    #[test]
    fn unsigned_request_layout() {
        let request = encode_request(&at(1_704_067_200, 0), None).unwrap();
        let bytes = request.as_bytes();
        assert_eq!(bytes.len(), 48);
        // LI=3, VN=4, mode=3
        assert_eq!(bytes[0], 0xE3);
        assert_eq!(bytes[1], 0);
        assert_eq!(bytes[2], 8);
        assert!(bytes[3..40].iter().all(|&b| b == 0));
        assert_eq!(&bytes[40..44], &3_913_056_000u32.to_be_bytes());
    }

    #[test]
    fn signed_request_appends_key_id_and_digest() {
        let key = Key::new(0x0102_0304, DigestAlgorithm::Md5, b"md5seq").unwrap();
        let request = encode_request(&at(1_704_067_200, 0), Some(&key)).unwrap();
        let bytes = request.as_bytes();
        assert_eq!(bytes.len(), 48 + 4 + 16);
        assert_eq!(&bytes[48..52], &[1, 2, 3, 4]);
        assert!(key.verify(&bytes[..48], &bytes[52..]));

        let sha1 = Key::new(7, DigestAlgorithm::Sha1, b"secret").unwrap();
        assert_eq!(
            encode_request(&at(0, 0), Some(&sha1)).unwrap().len(),
            48 + 4 + 20
        );
    }

    #[test]
    fn version_is_configurable() {
        let request = encode_request_with_version(&at(0, 0), Version::V3, None).unwrap();
        assert_eq!(request.as_bytes()[0], 0xDB);
    }

    #[test]
    fn transmit_timestamp_round_trips() {
        let now = at(1_704_067_200, 987_654_321);
        let request = encode_request(&now, None).unwrap();
        let header = decode_header(request.as_bytes()).unwrap();
        assert_eq!(header.transmit_timestamp, request.transmit_timestamp());
        let back = crate::unix_time::timestamp_to_instant(header.transmit_timestamp, &now);
        assert_eq!(back, now);
    }

    #[test]
    fn decode_rejects_short_and_unaligned() {
        assert_eq!(
            decode_header(&[0u8; 44]),
            Err(ParseError::TooShort { length: 44 })
        );
        assert_eq!(
            decode_header(&[0u8; 50]),
            Err(ParseError::TooShort { length: 50 })
        );
        assert!(decode_header(&[0u8; 52]).is_ok());
    }

    fn ts(seconds: u32, fraction: u32) -> TimestampFormat {
        TimestampFormat { seconds, fraction }
    }

    #[test]
    fn sample_symmetric_path() {
        // Server 1 s ahead, 100 ms each way.
        let t1 = ts(1000, 0);
        let response = Header {
            receive_timestamp: ts(1001, 0x1999_999A),
            transmit_timestamp: ts(1001, 0x1999_999A),
            precision: -20,
            root_delay: ShortFormat {
                seconds: 0,
                fraction: 0x8000,
            },
            root_dispersion: ShortFormat {
                seconds: 0,
                fraction: 0x4000,
            },
            ..Header::default()
        };
        let t4 = ts(1000, 0x3333_3333);
        let sample = Sample::new(&response, t1, t4);
        assert!((sample.offset - 1.0).abs() < 1e-9);
        assert!((sample.delay - 0.2).abs() < 1e-9);
        assert_eq!(sample.precision, 2f64.powi(-20));
        assert!((sample.synch_distance - (0.25 + 0.25 + 0.2)).abs() < 1e-9);
    }

    #[test]
    fn sample_local_ahead() {
        let t1 = ts(2000, 0);
        let response = Header {
            receive_timestamp: ts(1995, 0),
            transmit_timestamp: ts(1995, 0),
            ..Header::default()
        };
        let sample = Sample::new(&response, t1, ts(2000, 0));
        assert_eq!(sample.offset, -5.0);
        assert_eq!(sample.delay, 0.0);
    }

    #[test]
    fn sample_across_era_rollover() {
        let t1 = ts(u32::MAX, 0);
        let response = Header {
            receive_timestamp: ts(0, 0),
            transmit_timestamp: ts(0, 0),
            ..Header::default()
        };
        let sample = Sample::new(&response, t1, ts(u32::MAX, 0));
        assert_eq!(sample.offset, 1.0);
    }
}
