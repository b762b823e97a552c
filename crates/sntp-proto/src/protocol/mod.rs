//! Types and constants that precisely match RFC 5905.
//!
//! Provides `FromBytes` and `ToBytes` implementations which read and write the
//! NTP header in network byte order using the byteorder crate.
//!
//! Documentation is largely derived from IETF RFC 5905 and RFC 4330.

/// NTP port number.
pub const PORT: u16 = 123;

/// Size of the fixed NTP header in bytes.
pub const HEADER_LEN: usize = 48;

/// Size of the key identifier word that precedes a MAC digest.
pub const KEY_ID_LEN: usize = 4;

/// Largest digest carried in an NTP MAC trailer (a 6-word trailer).
pub const MAX_MAC_DIGEST_LEN: usize = 20;

/// Oldest protocol version accepted in responses.
pub const MIN_SUPPORTED_VERSION: u8 = 1;

/// Newest protocol version accepted in responses.
pub const MAX_SUPPORTED_VERSION: u8 = 4;

/// Poll exponent written into client requests (256 s).
pub const REQUEST_POLL: i8 = 8;

mod bytes;
mod traits;
mod types;

pub use self::traits::*;
pub use self::types::*;
