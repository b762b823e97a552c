// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Symmetric-key message authentication for NTP packets (RFC 5905 Section 7.3).
//!
//! The MAC is the digest of `secret || message`, where `message` is the NTP
//! header plus any extension fields. On the wire it follows a 32-bit key
//! identifier and is truncated to [`MAX_MAC_DIGEST_LEN`] bytes, which is the
//! largest digest a 6-word trailer can carry.
//!
//! Verification compares digests in constant time using the `subtle` crate.

use std::fmt;
use std::str::FromStr;

use sha2::Digest;
use subtle::ConstantTimeEq;

use crate::protocol::MAX_MAC_DIGEST_LEN;

/// Largest secret accepted by the digest engine, in bytes.
pub const MAX_KEY_LEN: usize = 64;

/// Output length of SHAKE128 when used as an NTP MAC.
const SHAKE128_LEN: usize = 16;

/// Digest algorithms usable in an NTP symmetric-key MAC.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DigestAlgorithm {
    /// MD5 (RFC 1321), 16-byte digest. The classic NTP key type `M`.
    Md5,
    /// SHA-1, 20-byte digest.
    Sha1,
    /// SHA-224, truncated to 20 bytes on the wire.
    Sha224,
    /// SHA-256, truncated to 20 bytes on the wire.
    Sha256,
    /// SHA-384, truncated to 20 bytes on the wire.
    Sha384,
    /// SHA-512, truncated to 20 bytes on the wire.
    Sha512,
    /// SHAKE128 extendable-output function, read to 16 bytes.
    Shake128,
}

impl DigestAlgorithm {
    /// Canonical upper-case name, as written in key files.
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA1",
            DigestAlgorithm::Sha224 => "SHA224",
            DigestAlgorithm::Sha256 => "SHA256",
            DigestAlgorithm::Sha384 => "SHA384",
            DigestAlgorithm::Sha512 => "SHA512",
            DigestAlgorithm::Shake128 => "SHAKE128",
        }
    }

    /// Length of the untruncated digest.
    pub fn output_len(&self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 16,
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha224 => 28,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
            DigestAlgorithm::Shake128 => SHAKE128_LEN,
        }
    }

    /// Length of the digest as carried in a packet trailer.
    pub fn mac_len(&self) -> usize {
        self.output_len().min(MAX_MAC_DIGEST_LEN)
    }
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = MacError;

    /// Parse an algorithm name, ignoring case. `M` is accepted as MD5 and
    /// `SHA` as SHA-1 for compatibility with older key files.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.to_ascii_uppercase();
        let alg = match upper.as_str() {
            "M" | "MD5" => DigestAlgorithm::Md5,
            "SHA" | "SHA1" | "SHA-1" => DigestAlgorithm::Sha1,
            "SHA224" | "SHA-224" => DigestAlgorithm::Sha224,
            "SHA256" | "SHA-256" => DigestAlgorithm::Sha256,
            "SHA384" | "SHA-384" => DigestAlgorithm::Sha384,
            "SHA512" | "SHA-512" => DigestAlgorithm::Sha512,
            "SHAKE128" => DigestAlgorithm::Shake128,
            _ => return Err(MacError::UnsupportedAlgorithm(s.to_string())),
        };
        Ok(alg)
    }
}

/// Reasons a digest could not be computed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MacError {
    /// The algorithm name is not one of the supported set.
    UnsupportedAlgorithm(String),
    /// The secret is longer than [`MAX_KEY_LEN`].
    KeyTooLong {
        /// Length of the rejected secret.
        length: usize,
    },
    /// The message is not a whole number of 32-bit words.
    Unaligned {
        /// Length of the rejected message.
        length: usize,
    },
}

impl fmt::Display for MacError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacError::UnsupportedAlgorithm(name) => {
                write!(f, "unsupported digest algorithm: {}", name)
            }
            MacError::KeyTooLong { length } => write!(
                f,
                "key of {} bytes exceeds the {}-byte limit",
                length, MAX_KEY_LEN
            ),
            MacError::Unaligned { length } => {
                write!(f, "message of {} bytes is not word aligned", length)
            }
        }
    }
}

impl std::error::Error for MacError {}

fn prefixed_digest<D: Digest>(secret: &[u8], message: &[u8]) -> Vec<u8> {
    let mut hasher = D::new();
    Digest::update(&mut hasher, secret);
    Digest::update(&mut hasher, message);
    hasher.finalize().to_vec()
}

fn shake128_digest(secret: &[u8], message: &[u8]) -> Vec<u8> {
    use sha3::digest::{ExtendableOutput, Update, XofReader};

    let mut hasher = sha3::Shake128::default();
    Update::update(&mut hasher, secret);
    Update::update(&mut hasher, message);
    let mut reader = hasher.finalize_xof();
    let mut out = vec![0u8; SHAKE128_LEN];
    reader.read(&mut out);
    out
}

/// Compute the MAC digest of `secret || message`.
///
/// The result is truncated to [`DigestAlgorithm::mac_len`] bytes. Fails when
/// the secret exceeds [`MAX_KEY_LEN`] or the message is not word aligned.
///
/// # Examples
///
/// ```
/// use sntp_proto::mac::{compute, DigestAlgorithm};
///
/// let digest = compute(b"md5seq", DigestAlgorithm::Md5, b"abcdefgh0123").unwrap();
/// assert_eq!(digest.len(), 16);
/// assert_eq!(&digest[..4], &[0x52, 0x6c, 0xb8, 0x38]);
/// ```
pub fn compute(
    secret: &[u8],
    algorithm: DigestAlgorithm,
    message: &[u8],
) -> Result<Vec<u8>, MacError> {
    if secret.len() > MAX_KEY_LEN {
        return Err(MacError::KeyTooLong {
            length: secret.len(),
        });
    }
    if message.len() % 4 != 0 {
        return Err(MacError::Unaligned {
            length: message.len(),
        });
    }

    let mut digest = match algorithm {
        DigestAlgorithm::Md5 => prefixed_digest::<md5::Md5>(secret, message),
        DigestAlgorithm::Sha1 => prefixed_digest::<sha1::Sha1>(secret, message),
        DigestAlgorithm::Sha224 => prefixed_digest::<sha2::Sha224>(secret, message),
        DigestAlgorithm::Sha256 => prefixed_digest::<sha2::Sha256>(secret, message),
        DigestAlgorithm::Sha384 => prefixed_digest::<sha2::Sha384>(secret, message),
        DigestAlgorithm::Sha512 => prefixed_digest::<sha2::Sha512>(secret, message),
        DigestAlgorithm::Shake128 => shake128_digest(secret, message),
    };
    digest.truncate(algorithm.mac_len());
    Ok(digest)
}

/// Like [`compute`], with the algorithm given by name.
pub fn compute_named(secret: &[u8], algorithm: &str, message: &[u8]) -> Result<Vec<u8>, MacError> {
    compute(secret, algorithm.parse()?, message)
}

/// Check a claimed digest against the one computed for `message`.
///
/// Fails closed: a digest of the wrong length, an oversized secret or an
/// unaligned message all yield `false`. Matching digests are compared in
/// constant time.
pub fn verify(secret: &[u8], algorithm: DigestAlgorithm, message: &[u8], claimed: &[u8]) -> bool {
    if claimed.len() != algorithm.mac_len() {
        return false;
    }
    match compute(secret, algorithm, message) {
        Ok(expected) => expected.ct_eq(claimed).into(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MD5_VECTOR: [u8; 16] = [
        0x52, 0x6c, 0xb8, 0x38, 0xaf, 0x06, 0x5a, 0xfb, 0x6c, 0x98, 0xbb, 0xc0, 0x9b, 0x0a, 0x7a,
        0x1b,
    ];

    #[test]
    fn md5_known_answer() {
        let digest = compute(b"md5seq", DigestAlgorithm::Md5, b"abcdefgh0123").unwrap();
        assert_eq!(digest, MD5_VECTOR);
        assert!(verify(
            b"md5seq",
            DigestAlgorithm::Md5,
            b"abcdefgh0123",
            &MD5_VECTOR
        ));
    }

    #[test]
    fn named_md5_matches() {
        let digest = compute_named(b"md5seq", "md5", b"abcdefgh0123").unwrap();
        assert_eq!(digest, MD5_VECTOR);
    }

    #[test]
    fn unknown_name_is_unsupported() {
        assert_eq!(
            compute_named(b"k", "RIPEMD160", b"abcd"),
            Err(MacError::UnsupportedAlgorithm("RIPEMD160".into()))
        );
    }

    #[test]
    fn sha1_is_prefix_digest() {
        let mut hasher = sha1::Sha1::new();
        Digest::update(&mut hasher, b"secret");
        Digest::update(&mut hasher, b"0123");
        let expected = hasher.finalize().to_vec();
        assert_eq!(
            compute(b"secret", DigestAlgorithm::Sha1, b"0123").unwrap(),
            expected
        );
    }

    #[test]
    fn wide_digests_are_truncated() {
        for alg in [
            DigestAlgorithm::Sha224,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
        ] {
            let digest = compute(b"k", alg, &[0u8; 48]).unwrap();
            assert_eq!(digest.len(), MAX_MAC_DIGEST_LEN, "{}", alg);
        }
        let shake = compute(b"k", DigestAlgorithm::Shake128, &[0u8; 48]).unwrap();
        assert_eq!(shake.len(), 16);
    }

    #[test]
    fn rejects_long_key() {
        let secret = [0x55u8; MAX_KEY_LEN + 1];
        assert_eq!(
            compute(&secret, DigestAlgorithm::Md5, b"abcd"),
            Err(MacError::KeyTooLong { length: 65 })
        );
        assert!(compute(&secret[..MAX_KEY_LEN], DigestAlgorithm::Md5, b"abcd").is_ok());
    }

    #[test]
    fn rejects_unaligned_message() {
        assert_eq!(
            compute(b"k", DigestAlgorithm::Sha1, b"abcde"),
            Err(MacError::Unaligned { length: 5 })
        );
    }

    #[test]
    fn verify_fails_closed_on_length_mismatch() {
        assert!(!verify(
            b"md5seq",
            DigestAlgorithm::Md5,
            b"abcdefgh0123",
            &MD5_VECTOR[..15]
        ));
        let mut long = MD5_VECTOR.to_vec();
        long.push(0);
        assert!(!verify(
            b"md5seq",
            DigestAlgorithm::Md5,
            b"abcdefgh0123",
            &long
        ));
    }

    #[test]
    fn verify_detects_wrong_key() {
        assert!(!verify(
            b"md5seR",
            DigestAlgorithm::Md5,
            b"abcdefgh0123",
            &MD5_VECTOR
        ));
    }

    #[test]
    fn algorithm_names_parse() {
        assert_eq!("M".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Md5));
        assert_eq!("sha".parse::<DigestAlgorithm>(), Ok(DigestAlgorithm::Sha1));
        assert_eq!(
            "Shake128".parse::<DigestAlgorithm>(),
            Ok(DigestAlgorithm::Shake128)
        );
        for alg in [
            DigestAlgorithm::Md5,
            DigestAlgorithm::Sha1,
            DigestAlgorithm::Sha224,
            DigestAlgorithm::Sha256,
            DigestAlgorithm::Sha384,
            DigestAlgorithm::Sha512,
            DigestAlgorithm::Shake128,
        ] {
            assert_eq!(alg.name().parse::<DigestAlgorithm>(), Ok(alg));
        }
    }
}
