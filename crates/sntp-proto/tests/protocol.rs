use sntp_proto::codec::{Sample, decode_header, encode_request};
use sntp_proto::error::ParseError;
use sntp_proto::key::{Key, KeyStore};
use sntp_proto::mac::DigestAlgorithm;
use sntp_proto::protocol::{
    ConstPackedSizeBytes, Header, KissCode, LeapIndicator, Mode, ShortFormat, Stratum,
    TimestampFormat, ToBytes, Version,
};
use sntp_proto::unix_time::Instant;
use sntp_proto::validate::{UnusableReason, ValidationOutcome, Validator};

// A stratum 1 reply captured from a CDMA-referenced server.
const CAPTURED: [u8; 48] = [
    20, 1, 3, 240, 0, 0, 0, 0, 0, 0, 0, 24, 67, 68, 77, 65, 215, 188, 128, 105, 198, 169, 46, 99,
    215, 187, 177, 194, 159, 47, 120, 0, 215, 188, 128, 113, 45, 236, 230, 45, 215, 188, 128, 113,
    46, 35, 158, 108,
];

fn captured_header() -> Header {
    Header {
        leap_indicator: LeapIndicator::NoWarning,
        version: Version::V2,
        mode: Mode::Server,
        stratum: Stratum::PRIMARY,
        poll: 3,
        precision: -16,
        root_delay: ShortFormat {
            seconds: 0,
            fraction: 0,
        },
        root_dispersion: ShortFormat {
            seconds: 0,
            fraction: 24,
        },
        reference_id: *b"CDMA",
        reference_timestamp: TimestampFormat {
            seconds: 3619455081,
            fraction: 3332976227,
        },
        origin_timestamp: TimestampFormat {
            seconds: 3619402178,
            fraction: 2670688256,
        },
        receive_timestamp: TimestampFormat {
            seconds: 3619455089,
            fraction: 770500141,
        },
        transmit_timestamp: TimestampFormat {
            seconds: 3619455089,
            fraction: 774086252,
        },
    }
}

#[test]
fn header_from_captured_bytes() {
    assert_eq!(decode_header(&CAPTURED).unwrap(), captured_header());
}

#[test]
fn header_to_captured_bytes() {
    let mut bytes = [0u8; Header::PACKED_SIZE_BYTES];
    captured_header().to_bytes(&mut bytes).unwrap();
    assert_eq!(bytes, CAPTURED);
}

#[test]
fn decode_header_ignores_trailer() {
    let mut pkt = CAPTURED.to_vec();
    pkt.extend_from_slice(&[0xAA; 20]);
    assert_eq!(decode_header(&pkt).unwrap(), captured_header());
    assert_eq!(
        decode_header(&pkt[..49]),
        Err(ParseError::TooShort { length: 49 })
    );
}

#[test]
fn captured_reply_needs_matching_request() {
    let keys = KeyStore::new();
    let validator = Validator::new(&keys);
    let mut sent = Header {
        transmit_timestamp: captured_header().origin_timestamp,
        ..Header::default()
    };
    assert_eq!(
        validator.validate(&CAPTURED, Mode::Server, Some(&sent)),
        ValidationOutcome::Accepted(48)
    );
    sent.transmit_timestamp.seconds += 1;
    assert_eq!(
        validator.validate(&CAPTURED, Mode::Server, Some(&sent)),
        ValidationOutcome::Unusable(UnusableReason::OriginMismatch)
    );
}

/// Helper: build a 48-byte reply with the given stratum and reference id.
/// Uses LI=0, VN=4, Mode=Server for all other fields.
fn make_test_packet(stratum: u8, ref_id: [u8; 4], origin: TimestampFormat) -> Vec<u8> {
    let header = Header {
        mode: Mode::Server,
        stratum: Stratum(stratum),
        reference_id: ref_id,
        origin_timestamp: origin,
        transmit_timestamp: origin,
        ..Header::default()
    };
    let mut buf = vec![0u8; Header::PACKED_SIZE_BYTES];
    header.to_bytes(&mut buf).unwrap();
    buf
}

#[test]
fn stratum_0_kiss_codes() {
    let keys = KeyStore::new();
    let validator = Validator::new(&keys);
    let now = Instant::new(1_704_067_200, 0).unwrap();
    let request = encode_request(&now, None).unwrap();
    let origin = request.transmit_timestamp();

    let cases = [
        (*b"DENY", ValidationOutcome::KodDemobilize(KissCode::DENY)),
        (*b"RSTR", ValidationOutcome::KodDemobilize(KissCode::RSTR)),
        (*b"RATE", ValidationOutcome::KodRate),
        (*b"INIT", ValidationOutcome::Accepted(48)),
    ];
    for (code, expected) in cases {
        let pkt = make_test_packet(0, code, origin);
        assert_eq!(
            validator.validate(&pkt, Mode::Server, Some(request.header())),
            expected
        );
    }
}

#[test]
fn refid_is_not_a_kiss_code_above_stratum_0() {
    let keys = KeyStore::new();
    let now = Instant::new(1_704_067_200, 0).unwrap();
    let request = encode_request(&now, None).unwrap();
    let pkt = make_test_packet(1, *b"DENY", request.transmit_timestamp());
    assert_eq!(
        Validator::new(&keys).validate(&pkt, Mode::Server, Some(request.header())),
        ValidationOutcome::Accepted(48)
    );
}

#[test]
fn signed_exchange_end_to_end() {
    let (keys, skipped) = KeyStore::parse("3 SHA1 sha1-secret\n");
    assert!(skipped.is_empty());
    let key = keys.get(3).unwrap();

    let now = Instant::new(1_704_067_200, 250_000_000).unwrap();
    let request = encode_request(&now, Some(key)).unwrap();
    assert_eq!(request.len(), 48 + 4 + 20);

    // The server echoes T1 and signs its reply with the same key.
    let reply = Header {
        mode: Mode::Server,
        stratum: Stratum(2),
        origin_timestamp: request.transmit_timestamp(),
        receive_timestamp: request.transmit_timestamp(),
        transmit_timestamp: request.transmit_timestamp(),
        ..Header::default()
    };
    let mut pkt = vec![0u8; 48];
    reply.to_bytes(&mut pkt).unwrap();
    let digest = key.digest(&pkt).unwrap();
    pkt.extend_from_slice(&3u32.to_be_bytes());
    pkt.extend_from_slice(&digest);

    let outcome = Validator::new(&keys)
        .require_auth(true)
        .validate(&pkt, Mode::Server, Some(request.header()));
    assert_eq!(outcome, ValidationOutcome::Accepted(72));

    let sample = Sample::new(
        &decode_header(&pkt).unwrap(),
        request.transmit_timestamp(),
        request.transmit_timestamp(),
    );
    assert_eq!(sample.offset, 0.0);
    assert_eq!(sample.delay, 0.0);
}

#[test]
fn md5_key_from_file_text_matches_vector() {
    let (keys, _) = KeyStore::parse("1 M md5seq\n");
    let key = keys.get(1).unwrap();
    assert_eq!(key.algorithm(), DigestAlgorithm::Md5);
    assert_eq!(
        key.digest(b"abcdefgh0123").unwrap(),
        [
            0x52, 0x6c, 0xb8, 0x38, 0xaf, 0x06, 0x5a, 0xfb, 0x6c, 0x98, 0xbb, 0xc0, 0x9b, 0x0a,
            0x7a, 0x1b
        ]
    );
    assert!(Key::new(1, DigestAlgorithm::Md5, &[0; 65]).is_err());
}
