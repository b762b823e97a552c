use std::fmt;
use std::str::FromStr;

use super::ConstPackedSizeBytes;

/// **NTP Short Format** - Used in delay and dispersion header fields where the full resolution and
/// range of the other formats are not justified. It includes a 16-bit unsigned seconds field and a
/// 16-bit fraction field.
///
/// ### Layout
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |          Seconds              |           Fraction            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ShortFormat {
    /// Seconds component (16-bit unsigned).
    pub seconds: u16,
    /// Fractional seconds component (16-bit unsigned).
    pub fraction: u16,
}

/// **NTP Timestamp Format** - Used in packet headers and other places with limited word size. It
/// includes a 32-bit unsigned seconds field spanning 136 years and a 32-bit fraction field
/// resolving 232 picoseconds.
///
/// The prime epoch is 0 h 1 January 1900 UTC, when all bits are zero.
///
/// ### Layout
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Seconds                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                            Fraction                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct TimestampFormat {
    /// Seconds since 1900-01-01 00:00:00 UTC (32-bit unsigned).
    pub seconds: u32,
    /// Fractional seconds (32-bit unsigned, resolution of ~232 picoseconds).
    pub fraction: u32,
}

/// A 2-bit integer warning of an impending leap second to be inserted or deleted in the last
/// minute of the current month.
///
/// Note that this field is packed in the actual header.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum LeapIndicator {
    /// No leap required.
    #[default]
    NoWarning = 0,
    /// Last minute of the day has 61 seconds.
    AddOne = 1,
    /// Last minute of the day has 59 seconds.
    SubOne = 2,
    /// Clock unsynchronized.
    Unknown = 3,
}

impl LeapIndicator {
    /// Decode the two leap bits. Every 2-bit value is a valid indicator.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b11 {
            0 => LeapIndicator::NoWarning,
            1 => LeapIndicator::AddOne,
            2 => LeapIndicator::SubOne,
            _ => LeapIndicator::Unknown,
        }
    }

    /// Short human-readable form used in disposition lines.
    pub fn as_text(&self) -> &'static str {
        match self {
            LeapIndicator::NoWarning => "no-leap",
            LeapIndicator::AddOne => "add-leap",
            LeapIndicator::SubOne => "del-leap",
            LeapIndicator::Unknown => "unsync",
        }
    }
}

/// A 3-bit integer representing the NTP version number, currently 4.
///
/// The raw value is kept as received so that out-of-range versions can be
/// reported rather than silently coerced.
#[derive(Copy, Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Version(pub(super) u8);

impl Version {
    /// NTP version 1.
    pub const V1: Self = Version(1);
    /// NTP version 2.
    pub const V2: Self = Version(2);
    /// NTP version 3.
    pub const V3: Self = Version(3);
    /// NTP version 4 (current standard).
    pub const V4: Self = Version(4);

    /// Create a `Version` from a raw version number.
    ///
    /// Returns `None` if the value does not fit in three bits.
    pub fn new(v: u8) -> Option<Self> {
        if v <= 0b111 { Some(Version(v)) } else { None }
    }

    /// Returns the raw version number as a `u8`.
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Whether a response carrying this version may be used.
    pub fn is_supported(&self) -> bool {
        (super::MIN_SUPPORTED_VERSION..=super::MAX_SUPPORTED_VERSION).contains(&self.0)
    }
}

impl Default for Version {
    /// Defaults to NTPv4, the current standard (RFC 5905).
    fn default() -> Self {
        Version::V4
    }
}

/// A 3-bit integer representing the association mode.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub enum Mode {
    /// Reserved mode (value 0).
    Reserved = 0,
    /// Symmetric active mode (value 1).
    SymmetricActive = 1,
    /// Symmetric passive mode (value 2).
    SymmetricPassive = 2,
    /// Client mode (value 3).
    #[default]
    Client = 3,
    /// Server mode (value 4).
    Server = 4,
    /// Broadcast mode (value 5).
    Broadcast = 5,
    /// NTP control message mode (value 6).
    NtpControlMessage = 6,
    /// Reserved for private use (value 7).
    ReservedForPrivateUse = 7,
}

impl Mode {
    /// Decode the three mode bits. Every 3-bit value is a valid mode.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0b111 {
            0 => Mode::Reserved,
            1 => Mode::SymmetricActive,
            2 => Mode::SymmetricPassive,
            3 => Mode::Client,
            4 => Mode::Server,
            5 => Mode::Broadcast,
            6 => Mode::NtpControlMessage,
            _ => Mode::ReservedForPrivateUse,
        }
    }
}

/// An 8-bit integer representing the stratum.
///
/// ```ignore
/// +--------+-----------------------------------------------------+
/// | Value  | Meaning                                             |
/// +--------+-----------------------------------------------------+
/// | 0      | unspecified or invalid (kiss code in refid)         |
/// | 1      | primary server (e.g., equipped with a GPS receiver) |
/// | 2-15   | secondary server (via NTP)                          |
/// | 16     | unsynchronized                                      |
/// | 17-255 | reserved                                            |
/// +--------+-----------------------------------------------------+
/// ```
#[derive(Copy, Clone, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Stratum(pub u8);

impl Stratum {
    /// Unspecified or invalid; the reference identifier carries a kiss code.
    pub const UNSPECIFIED: Self = Stratum(0);
    /// The primary server.
    pub const PRIMARY: Self = Stratum(1);
}

/// A four-character ASCII **kiss code** carried in the reference identifier of
/// a stratum-0 packet.
///
/// Recipients of kiss codes MUST inspect them. `DENY` and `RSTR` demand that
/// the client stop sending to the server; `RATE` demands that it slow down.
/// Any other code is informational.
///
/// Codes shorter than four characters are zero padded, matching the
/// left-justified, zero-filled encoding used on the wire.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct KissCode(pub [u8; 4]);

impl KissCode {
    /// Access denied: demobilize the association.
    pub const DENY: Self = KissCode(*b"DENY");
    /// Access restricted: demobilize the association.
    pub const RSTR: Self = KissCode(*b"RSTR");
    /// Rate exceeded: reduce the polling rate.
    pub const RATE: Self = KissCode(*b"RATE");

    /// The raw four bytes.
    pub fn as_bytes(&self) -> [u8; 4] {
        self.0
    }

    /// Whether the code requires the client to stop contacting the server.
    pub fn is_demobilize(&self) -> bool {
        *self == Self::DENY || *self == Self::RSTR
    }
}

impl fmt::Display for KissCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &b in &self.0 {
            if b == 0 {
                break;
            }
            if b.is_ascii_graphic() {
                write!(f, "{}", b as char)?;
            } else {
                write!(f, "?")?;
            }
        }
        Ok(())
    }
}

/// Error returned when text cannot be used as a kiss code.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InvalidKissCode(pub String);

impl fmt::Display for InvalidKissCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid kiss code: {:?}", self.0)
    }
}

impl std::error::Error for InvalidKissCode {}

impl FromStr for KissCode {
    type Err = InvalidKissCode;

    /// Accepts one to four printable, non-space ASCII characters.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 || !bytes.iter().all(u8::is_ascii_graphic) {
            return Err(InvalidKissCode(s.to_string()));
        }
        let mut code = [0u8; 4];
        code[..bytes.len()].copy_from_slice(bytes);
        Ok(KissCode(code))
    }
}

/// **Packet Header** - The fixed 48-byte part of every NTP packet.
///
/// ```ignore
/// +-----------+------------+-----------------------+
/// | Name      | Formula    | Description           |
/// +-----------+------------+-----------------------+
/// | leap      | leap       | leap indicator (LI)   |
/// | version   | version    | version number (VN)   |
/// | mode      | mode       | mode                  |
/// | stratum   | stratum    | stratum               |
/// | poll      | poll       | poll exponent         |
/// | precision | rho        | precision exponent    |
/// | rootdelay | delta_r    | root delay            |
/// | rootdisp  | epsilon_r  | root dispersion       |
/// | refid     | refid      | reference ID          |
/// | reftime   | reftime    | reference timestamp   |
/// | org       | T1         | origin timestamp      |
/// | rec       | T2         | receive timestamp     |
/// | xmt       | T3         | transmit timestamp    |
/// +-----------+------------+-----------------------+
/// ```
///
/// ### Format
///
/// The header is followed by zero or more extension fields and finally an
/// optional message authentication code (MAC) consisting of the Key
/// Identifier field and Message Digest field.
///
/// ```ignore
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |LI | VN  |Mode |    Stratum     |     Poll      |  Precision   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Root Delay                            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                         Root Dispersion                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          Reference ID                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// +                     Reference Timestamp (64)                  +
/// +                      Origin Timestamp (64)                    +
/// +                      Receive Timestamp (64)                   +
/// +                      Transmit Timestamp (64)                  +
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// .                    Extension Fields (variable)                .
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                          Key Identifier                       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                     dgst (128 or 160)                         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct Header {
    /// Leap indicator warning of impending leap second.
    pub leap_indicator: LeapIndicator,
    /// NTP protocol version number.
    pub version: Version,
    /// Association mode (client, server, broadcast, etc.).
    pub mode: Mode,
    /// Stratum level of the time source.
    pub stratum: Stratum,
    /// Maximum interval between successive messages, in log2 seconds.
    pub poll: i8,
    /// Precision of the system clock, in log2 seconds.
    pub precision: i8,
    /// Total round-trip delay to the reference clock, in NTP short format.
    pub root_delay: ShortFormat,
    /// Total dispersion to the reference clock, in NTP short format.
    pub root_dispersion: ShortFormat,
    /// Reference identifier; a kiss code when the stratum is unspecified.
    pub reference_id: [u8; 4],
    /// Time when the system clock was last set or corrected.
    pub reference_timestamp: TimestampFormat,
    /// Time at the client when the request departed for the server.
    pub origin_timestamp: TimestampFormat,
    /// Time at the server when the request arrived from the client.
    pub receive_timestamp: TimestampFormat,
    /// Time at the server when the response left for the client.
    pub transmit_timestamp: TimestampFormat,
}

/// The consecutive types within the first packed byte in the NTP packet.
pub type HeaderByte1 = (LeapIndicator, Version, Mode);

impl Header {
    /// The kiss code carried by a stratum-0 header, if any.
    pub fn kiss_code(&self) -> Option<KissCode> {
        if self.stratum == Stratum::UNSPECIFIED {
            Some(KissCode(self.reference_id))
        } else {
            None
        }
    }
}

impl TimestampFormat {
    /// The timestamp as a single 32.32 fixed-point value.
    pub fn to_bits(self) -> u64 {
        ((self.seconds as u64) << 32) | self.fraction as u64
    }

    /// Build a timestamp from a 32.32 fixed-point value.
    pub fn from_bits(bits: u64) -> Self {
        TimestampFormat {
            seconds: (bits >> 32) as u32,
            fraction: bits as u32,
        }
    }

    /// Whether both words are zero (an unset timestamp).
    pub fn is_zero(&self) -> bool {
        self.seconds == 0 && self.fraction == 0
    }

    /// `self - earlier` in seconds, using modular 64-bit fixed-point
    /// subtraction so that the result is correct across era boundaries as
    /// long as the true difference is below 68 years.
    pub fn seconds_since(self, earlier: TimestampFormat) -> f64 {
        let diff = self.to_bits().wrapping_sub(earlier.to_bits()) as i64;
        diff as f64 / FRACTION_SCALE
    }
}

impl ShortFormat {
    /// The value in seconds.
    pub fn to_seconds(self) -> f64 {
        self.seconds as f64 + self.fraction as f64 / SHORT_FRACTION_SCALE
    }
}

// 2^32, the weight of one second in the 32.32 timestamp format.
const FRACTION_SCALE: f64 = 4_294_967_296.0;

// 2^16, the weight of one second in the 16.16 short format.
const SHORT_FRACTION_SCALE: f64 = 65_536.0;

// Size implementations.

impl ConstPackedSizeBytes for ShortFormat {
    const PACKED_SIZE_BYTES: usize = 4;
}

impl ConstPackedSizeBytes for TimestampFormat {
    const PACKED_SIZE_BYTES: usize = 8;
}

impl ConstPackedSizeBytes for HeaderByte1 {
    const PACKED_SIZE_BYTES: usize = 1;
}

impl ConstPackedSizeBytes for Header {
    const PACKED_SIZE_BYTES: usize = HeaderByte1::PACKED_SIZE_BYTES
        + 1
        + 2
        + ShortFormat::PACKED_SIZE_BYTES * 2
        + 4
        + TimestampFormat::PACKED_SIZE_BYTES * 4;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_packed_size_is_48() {
        assert_eq!(Header::PACKED_SIZE_BYTES, super::super::HEADER_LEN);
    }

    #[test]
    fn kiss_code_parse_and_display() {
        let code: KissCode = "RATE".parse().unwrap();
        assert_eq!(code, KissCode::RATE);
        assert_eq!(code.to_string(), "RATE");

        let short: KissCode = "AB".parse().unwrap();
        assert_eq!(short.as_bytes(), *b"AB\0\0");
        assert_eq!(short.to_string(), "AB");

        assert!("".parse::<KissCode>().is_err());
        assert!("TOOLONG".parse::<KissCode>().is_err());
        assert!("A B".parse::<KissCode>().is_err());
    }

    #[test]
    fn demobilize_codes() {
        assert!(KissCode::DENY.is_demobilize());
        assert!(KissCode::RSTR.is_demobilize());
        assert!(!KissCode::RATE.is_demobilize());
        assert!(!KissCode(*b"INIT").is_demobilize());
    }

    #[test]
    fn kiss_code_only_for_stratum_zero() {
        let mut header = Header {
            reference_id: *b"DENY",
            ..Header::default()
        };
        assert_eq!(header.kiss_code(), Some(KissCode::DENY));
        header.stratum = Stratum(2);
        assert_eq!(header.kiss_code(), None);
    }

    #[test]
    fn seconds_since_wraps_across_era() {
        let before = TimestampFormat {
            seconds: u32::MAX,
            fraction: 0x8000_0000,
        };
        let after = TimestampFormat {
            seconds: 0,
            fraction: 0,
        };
        assert_eq!(after.seconds_since(before), 0.5);
        assert_eq!(before.seconds_since(after), -0.5);
    }

    #[test]
    fn short_format_seconds() {
        let sf = ShortFormat {
            seconds: 1,
            fraction: 0x8000,
        };
        assert_eq!(sf.to_seconds(), 1.5);
    }

    #[test]
    fn version_support_range() {
        assert!(!Version(0).is_supported());
        assert!(Version::V1.is_supported());
        assert!(Version::V4.is_supported());
        assert!(!Version(5).is_supported());
        assert_eq!(Version::new(8), None);
    }

    #[test]
    fn mode_and_leap_decode_every_value() {
        for bits in 0u8..8 {
            assert_eq!(Mode::from_bits(bits) as u8, bits);
        }
        for bits in 0u8..4 {
            assert_eq!(LeapIndicator::from_bits(bits) as u8, bits);
        }
    }
}
