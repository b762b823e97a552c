// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Custom error types for the SNTP client.
//!
//! [`SntpError`] covers failures that stop a run before or outside the
//! per-host loop: bad configuration, an unreadable key file, cancellation.
//! Failures of a single exchange are [`AttemptFailure`] values; they are
//! recorded in the host report and trigger a retry rather than an error.
//!
//! `From<SntpError> for io::Error` lets callers that prefer an `io::Result`
//! surface use `?`, and downcast back via `io::Error::get_ref()`:
//!
//! ```
//! use sntp_client::error::{ConfigError, SntpError};
//!
//! let err: std::io::Error = SntpError::Config(ConfigError::NoServers).into();
//! let inner = err.get_ref().and_then(|e| e.downcast_ref::<SntpError>());
//! assert!(matches!(inner, Some(SntpError::Config(ConfigError::NoServers))));
//! ```

// Re-export proto error types used across the client API.
pub use sntp_proto::error::ParseError;
pub use sntp_proto::key::KeyError;
pub use sntp_proto::mac::MacError;

use std::fmt;
use std::io;

use sntp_proto::validate::UnusableReason;

/// Errors that can occur while setting up or running the client.
#[derive(Debug)]
pub enum SntpError {
    /// Invalid configuration.
    Config(ConfigError),
    /// The key file could not be read.
    Key(KeyError),
    /// Underlying I/O error outside a single exchange.
    Io(io::Error),
    /// The run was cancelled before it finished.
    Cancelled,
}

/// Configuration errors reported by [`crate::config::ClientConfigBuilder::build`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// No server hosts provided.
    NoServers,
    /// The configured key id is not in the key store.
    UnknownKey {
        /// The missing key id.
        key_id: u32,
    },
    /// The timeout is zero.
    InvalidTimeout,
    /// The attempt bound is zero.
    NoAttempts,
    /// The request version is outside the supported range.
    UnsupportedVersion {
        /// The rejected version number.
        version: u8,
    },
    /// Authentication is required but no key is configured.
    AuthWithoutKey,
}

/// Why a single request/response exchange produced no usable sample.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum AttemptFailure {
    /// The request could not be built (the signing key is unusable).
    Encode(MacError),
    /// The request could not be sent.
    Send(String),
    /// No reply arrived before the timeout.
    Timeout,
    /// Receiving failed for a reason other than the timeout.
    Receive(String),
    /// Authentication was required and not established.
    AuthFail,
    /// The reply was discarded.
    Unusable(UnusableReason),
}

// ── Display implementations ─────────────────────────────────────────

impl fmt::Display for SntpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SntpError::Config(e) => write!(f, "configuration error: {e}"),
            SntpError::Key(e) => write!(f, "{e}"),
            SntpError::Io(e) => write!(f, "{e}"),
            SntpError::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::NoServers => write!(f, "at least one server host is required"),
            ConfigError::UnknownKey { key_id } => {
                write!(f, "key id {key_id} not found in the key file")
            }
            ConfigError::InvalidTimeout => write!(f, "timeout must be greater than zero"),
            ConfigError::NoAttempts => write!(f, "at least one attempt per host is required"),
            ConfigError::UnsupportedVersion { version } => {
                write!(f, "unsupported NTP version {version}")
            }
            ConfigError::AuthWithoutKey => {
                write!(f, "authentication required but no key configured")
            }
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Encode(e) => write!(f, "cannot sign request: {e}"),
            AttemptFailure::Send(e) => write!(f, "send failed: {e}"),
            AttemptFailure::Timeout => write!(f, "no response"),
            AttemptFailure::Receive(e) => write!(f, "receive failed: {e}"),
            AttemptFailure::AuthFail => write!(f, "authentication failed"),
            AttemptFailure::Unusable(reason) => write!(f, "{reason}"),
        }
    }
}

// ── Error trait implementations ─────────────────────────────────────

impl std::error::Error for SntpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SntpError::Io(e) => Some(e),
            SntpError::Key(e) => Some(e),
            SntpError::Config(e) => Some(e),
            SntpError::Cancelled => None,
        }
    }
}

impl std::error::Error for ConfigError {}
impl std::error::Error for AttemptFailure {}

// ── From conversions ────────────────────────────────────────────────

impl From<SntpError> for io::Error {
    fn from(err: SntpError) -> io::Error {
        let kind = match &err {
            SntpError::Config(_) => io::ErrorKind::InvalidInput,
            SntpError::Key(KeyError::Io(e)) => e.kind(),
            SntpError::Cancelled => io::ErrorKind::Interrupted,
            SntpError::Io(e) => e.kind(),
        };
        // Preserve the original io::Error directly for the Io variant.
        if let SntpError::Io(e) = err {
            return e;
        }
        io::Error::new(kind, err)
    }
}

impl From<io::Error> for SntpError {
    fn from(err: io::Error) -> SntpError {
        SntpError::Io(err)
    }
}

impl From<ConfigError> for SntpError {
    fn from(err: ConfigError) -> SntpError {
        SntpError::Config(err)
    }
}

impl From<KeyError> for SntpError {
    fn from(err: KeyError) -> SntpError {
        SntpError::Key(err)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
