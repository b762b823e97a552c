// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Shared secret keys and the key file loader.
//!
//! A key file holds one key per line:
//!
//! ```text
//! # id  type    secret
//! 1     MD5     md5seq
//! 2     SHA1    0f1e2d3c4b5a69788796a5b4c3d2e1f00f1e2d3c4b5a6978
//! ```
//!
//! A secret of at most 20 characters is used literally. A longer secret must
//! be an even-length hex string decoding to at most 64 bytes. Lines that do
//! not fit this shape are skipped and reported; they never fail the load.

use std::fmt;
use std::io;
use std::path::Path;

use crate::mac::{self, DigestAlgorithm, MAX_KEY_LEN, MacError};

/// Longest secret that is taken literally instead of as hex.
pub const MAX_LITERAL_SECRET_LEN: usize = 20;

/// A symmetric key shared with a server.
#[derive(Clone, Eq, PartialEq)]
pub struct Key {
    id: u32,
    algorithm: DigestAlgorithm,
    secret: Vec<u8>,
}

impl Key {
    /// Create a key. Fails with [`MacError::KeyTooLong`] for secrets over 64 bytes.
    pub fn new(id: u32, algorithm: DigestAlgorithm, secret: &[u8]) -> Result<Key, MacError> {
        if secret.len() > MAX_KEY_LEN {
            return Err(MacError::KeyTooLong {
                length: secret.len(),
            });
        }
        Ok(Key {
            id,
            algorithm,
            secret: secret.to_vec(),
        })
    }

    /// The key identifier carried on the wire.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// The digest algorithm this key is used with.
    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    /// The raw secret bytes.
    pub fn secret(&self) -> &[u8] {
        &self.secret
    }

    /// Digest `message` with this key.
    pub fn digest(&self, message: &[u8]) -> Result<Vec<u8>, MacError> {
        mac::compute(&self.secret, self.algorithm, message)
    }

    /// Verify a claimed digest of `message` made with this key.
    pub fn verify(&self, message: &[u8], claimed: &[u8]) -> bool {
        mac::verify(&self.secret, self.algorithm, message, claimed)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("id", &self.id)
            .field("algorithm", &self.algorithm)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Why a key file line was not loaded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SkipReason {
    /// Fewer than three fields, or a key id that is not a number.
    Syntax,
    /// The type field does not name a supported digest.
    UnsupportedAlgorithm(String),
    /// The secret is neither a short literal nor valid even-length hex.
    BadSecret,
    /// The secret decodes to more than 64 bytes.
    SecretTooLong,
    /// A key with the same id was loaded from an earlier line.
    DuplicateId(u32),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Syntax => write!(f, "expected <id> <type> <secret>"),
            SkipReason::UnsupportedAlgorithm(name) => write!(f, "unsupported key type {}", name),
            SkipReason::BadSecret => write!(f, "secret is not valid hex"),
            SkipReason::SecretTooLong => {
                write!(f, "secret exceeds {} bytes", MAX_KEY_LEN)
            }
            SkipReason::DuplicateId(id) => write!(f, "duplicate key id {}", id),
        }
    }
}

/// A key file line that was skipped during loading.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SkippedLine {
    /// One-based line number.
    pub line: usize,
    /// Why the line was skipped.
    pub reason: SkipReason,
}

/// Errors that prevent a key file from being read at all.
#[derive(Debug)]
pub enum KeyError {
    /// The file could not be opened or read.
    Io(io::Error),
}

impl fmt::Display for KeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyError::Io(e) => write!(f, "cannot read key file: {}", e),
        }
    }
}

impl std::error::Error for KeyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            KeyError::Io(e) => Some(e),
        }
    }
}

impl From<io::Error> for KeyError {
    fn from(e: io::Error) -> Self {
        KeyError::Io(e)
    }
}

/// Keys indexed by id, immutable once loaded.
#[derive(Clone, Debug, Default)]
pub struct KeyStore {
    // Sorted by id.
    keys: Vec<Key>,
}

impl KeyStore {
    /// An empty store.
    pub fn new() -> Self {
        KeyStore::default()
    }

    /// Add a key. Returns the key back if its id is already present.
    pub fn insert(&mut self, key: Key) -> Result<(), Key> {
        match self.keys.binary_search_by_key(&key.id, Key::id) {
            Ok(_) => Err(key),
            Err(pos) => {
                self.keys.insert(pos, key);
                Ok(())
            }
        }
    }

    /// Look up a key by id.
    pub fn get(&self, id: u32) -> Option<&Key> {
        self.keys
            .binary_search_by_key(&id, Key::id)
            .ok()
            .map(|pos| &self.keys[pos])
    }

    /// Number of keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Iterate keys in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Key> {
        self.keys.iter()
    }

    /// Parse key file text, returning the keys and the lines that were skipped.
    pub fn parse(text: &str) -> (KeyStore, Vec<SkippedLine>) {
        let mut store = KeyStore::new();
        let mut skipped = Vec::new();

        for (idx, raw) in text.lines().enumerate() {
            let content = match raw.find('#') {
                Some(pos) => &raw[..pos],
                None => raw,
            };
            if content.trim().is_empty() {
                continue;
            }
            let result = parse_line(content).and_then(|key| {
                let id = key.id;
                store.insert(key).map_err(|_| SkipReason::DuplicateId(id))
            });
            if let Err(reason) = result {
                skipped.push(SkippedLine {
                    line: idx + 1,
                    reason,
                });
            }
        }

        (store, skipped)
    }

    /// Read and parse a key file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<(KeyStore, Vec<SkippedLine>), KeyError> {
        let text = std::fs::read_to_string(path)?;
        Ok(KeyStore::parse(&text))
    }
}

fn parse_line(line: &str) -> Result<Key, SkipReason> {
    let mut fields = line.split_whitespace();
    let (Some(id), Some(kind), Some(secret)) = (fields.next(), fields.next(), fields.next())
    else {
        return Err(SkipReason::Syntax);
    };

    let id: u32 = id.parse().map_err(|_| SkipReason::Syntax)?;
    let algorithm: DigestAlgorithm = kind
        .parse()
        .map_err(|_| SkipReason::UnsupportedAlgorithm(kind.to_string()))?;
    let secret = decode_secret(secret)?;

    Key::new(id, algorithm, &secret).map_err(|_| SkipReason::SecretTooLong)
}

fn decode_secret(text: &str) -> Result<Vec<u8>, SkipReason> {
    if text.len() <= MAX_LITERAL_SECRET_LEN {
        return Ok(text.as_bytes().to_vec());
    }
    if text.len() > MAX_KEY_LEN * 2 {
        return Err(SkipReason::SecretTooLong);
    }
    hex::decode(text).map_err(|_| SkipReason::BadSecret)
}
