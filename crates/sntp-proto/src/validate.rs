// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Classification of received packets.
//!
//! [`Validator`] runs a fixed sequence of checks over a raw datagram and
//! reports the first one that fails. The order is:
//!
//! 1. length (at least 48 bytes, whole words)
//! 2. extension chain
//! 3. trailer shape (none, Crypto-NAK, or 5/6-word MAC)
//! 4. MAC verification against the [`KeyStore`]
//! 5. authentication policy
//! 6. version
//! 7. mode
//! 8. Kiss-o'-Death
//! 9. leap indicator
//! 10. origin timestamp (skipped for broadcast)
//!
//! Kiss codes are checked before synchronization and origin because a KoD
//! reply is never synchronized and need not echo the request.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};

use crate::codec::decode_header;
use crate::extension;
use crate::key::KeyStore;
use crate::protocol::{Header, KEY_ID_LEN, KissCode, LeapIndicator, Mode};

/// Why a packet cannot be used.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum UnusableReason {
    /// Shorter than the header or not a whole number of words.
    BadLength,
    /// The extension chain is malformed.
    BadExtension,
    /// The words after the extension chain are not a valid trailer.
    BadTrailer,
    /// The version is outside the supported range.
    BadVersion,
    /// The mode is neither the expected one nor symmetric passive.
    BadMode,
    /// The server's leap indicator says it is not synchronized.
    ServerUnsynced,
    /// The origin timestamp does not echo the request's transmit timestamp.
    OriginMismatch,
}

impl fmt::Display for UnusableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnusableReason::BadLength => "bad packet length",
            UnusableReason::BadExtension => "malformed extension field",
            UnusableReason::BadTrailer => "malformed MAC trailer",
            UnusableReason::BadVersion => "unsupported version",
            UnusableReason::BadMode => "unexpected mode",
            UnusableReason::ServerUnsynced => "server not synchronized",
            UnusableReason::OriginMismatch => "origin timestamp mismatch",
        };
        f.write_str(text)
    }
}

/// The classification of a received packet.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValidationOutcome {
    /// The packet must be discarded.
    Unusable(UnusableReason),
    /// Authentication was required and not established.
    AuthFail,
    /// The server sent `DENY` or `RSTR`: stop contacting it.
    KodDemobilize(KissCode),
    /// The server sent `RATE`: back off.
    KodRate,
    /// All checks passed; carries the packet length.
    Accepted(usize),
}

impl ValidationOutcome {
    /// Whether the packet may be used for time.
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted(_))
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationOutcome::Unusable(reason) => write!(f, "unusable: {}", reason),
            ValidationOutcome::AuthFail => f.write_str("authentication failed"),
            ValidationOutcome::KodDemobilize(code) => write!(f, "kiss-o'-death {}", code),
            ValidationOutcome::KodRate => f.write_str("kiss-o'-death RATE"),
            ValidationOutcome::Accepted(len) => write!(f, "accepted ({} bytes)", len),
        }
    }
}

/// What the packet trailer established about authenticity.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Authentication {
    /// The packet carried no trailer.
    None,
    /// The packet carried a key id without a digest.
    CryptoNak(u32),
    /// The digest verified with the named key.
    Verified(u32),
    /// The key id is not in the key store.
    UnknownKey(u32),
    /// The digest did not verify with the named key.
    BadDigest(u32),
}

impl Authentication {
    /// Whether a valid MAC was established.
    pub fn is_verified(&self) -> bool {
        matches!(self, Authentication::Verified(_))
    }
}

/// The outcome together with the authentication status, for diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Verdict {
    /// The classification.
    pub outcome: ValidationOutcome,
    /// What the trailer established, when the check was reached.
    pub authentication: Option<Authentication>,
}

/// Classifies received packets against a key store and an authentication policy.
#[derive(Clone, Copy, Debug)]
pub struct Validator<'k> {
    keys: &'k KeyStore,
    require_auth: bool,
}

impl<'k> Validator<'k> {
    /// A validator that accepts unauthenticated packets.
    pub fn new(keys: &'k KeyStore) -> Self {
        Validator {
            keys,
            require_auth: false,
        }
    }

    /// Require a valid MAC on every accepted packet.
    pub fn require_auth(mut self, required: bool) -> Self {
        self.require_auth = required;
        self
    }

    /// Classify `packet`, received in reply to `sent` while expecting `expected` mode.
    ///
    /// `sent` may be `None` only when `expected` is [`Mode::Broadcast`]; for
    /// any other mode a missing request fails the origin check.
    pub fn validate(
        &self,
        packet: &[u8],
        expected: Mode,
        sent: Option<&Header>,
    ) -> ValidationOutcome {
        self.inspect(packet, expected, sent).outcome
    }

    /// Like [`Validator::validate`], also reporting the authentication status.
    pub fn inspect(&self, packet: &[u8], expected: Mode, sent: Option<&Header>) -> Verdict {
        let mut authentication = None;
        let outcome = self.classify(packet, expected, sent, &mut authentication);
        Verdict {
            outcome,
            authentication,
        }
    }

    fn classify(
        &self,
        packet: &[u8],
        expected: Mode,
        sent: Option<&Header>,
        authentication: &mut Option<Authentication>,
    ) -> ValidationOutcome {
        let header = match decode_header(packet) {
            Ok(header) => header,
            Err(_) => return ValidationOutcome::Unusable(UnusableReason::BadLength),
        };

        let extensions = match extension::scan(packet) {
            Ok(ext) => ext,
            Err(_) => return ValidationOutcome::Unusable(UnusableReason::BadExtension),
        };

        let trailer = &packet[extensions.trailer_offset..];
        let auth = match trailer.len() / 4 {
            0 => Authentication::None,
            1 => Authentication::CryptoNak(BigEndian::read_u32(trailer)),
            5 | 6 => {
                let key_id = BigEndian::read_u32(&trailer[..KEY_ID_LEN]);
                let message = &packet[..extensions.trailer_offset];
                let digest = &trailer[KEY_ID_LEN..];
                match self.keys.get(key_id) {
                    None => Authentication::UnknownKey(key_id),
                    Some(key) if key.verify(message, digest) => Authentication::Verified(key_id),
                    Some(_) => Authentication::BadDigest(key_id),
                }
            }
            _ => return ValidationOutcome::Unusable(UnusableReason::BadTrailer),
        };
        *authentication = Some(auth);

        if self.require_auth && !auth.is_verified() {
            return ValidationOutcome::AuthFail;
        }

        if !header.version.is_supported() {
            return ValidationOutcome::Unusable(UnusableReason::BadVersion);
        }

        if header.mode != expected && header.mode != Mode::SymmetricPassive {
            return ValidationOutcome::Unusable(UnusableReason::BadMode);
        }

        if let Some(code) = header.kiss_code() {
            if code.is_demobilize() {
                return ValidationOutcome::KodDemobilize(code);
            }
            if code == KissCode::RATE {
                return ValidationOutcome::KodRate;
            }
        }

        if header.leap_indicator == LeapIndicator::Unknown {
            return ValidationOutcome::Unusable(UnusableReason::ServerUnsynced);
        }

        if expected != Mode::Broadcast {
            let echoed = sent.is_some_and(|s| s.transmit_timestamp == header.origin_timestamp);
            if !echoed {
                return ValidationOutcome::Unusable(UnusableReason::OriginMismatch);
            }
        }

        ValidationOutcome::Accepted(packet.len())
    }
}
