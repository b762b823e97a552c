// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! One request/response exchange with a server.
//!
//! [`exchange`] builds and sends a request, waits for the reply, records the
//! destination timestamp and hands the datagram to the validator. The result
//! is an [`AttemptOutcome`]; retry policy lives in [`crate::sntp`].

use std::io;
use std::time::Duration;

use sntp_proto::codec::{self, Sample};
use sntp_proto::key::Key;
use sntp_proto::protocol::{Header, KissCode, Mode, TimestampFormat, Version};
use sntp_proto::unix_time;
use sntp_proto::validate::{Authentication, UnusableReason, ValidationOutcome, Validator};
use tracing::debug;

use crate::error::AttemptFailure;
use crate::net::{RECV_BUFFER_LEN, Transport};

/// An accepted reply and the figures derived from it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reply {
    /// The server's header.
    pub header: Header,
    /// Offset, delay, precision and synchronization distance.
    pub sample: Sample,
    /// What the reply's trailer established.
    pub authentication: Authentication,
    /// Datagram length in bytes.
    pub length: usize,
    /// Local time the reply arrived (T4).
    pub destination_timestamp: TimestampFormat,
}

/// The result of one attempt.
#[derive(Clone, Debug, PartialEq)]
pub enum AttemptOutcome {
    /// The reply passed validation.
    Accepted(Reply),
    /// The server sent `DENY` or `RSTR`.
    Demobilize(KissCode),
    /// The server sent `RATE`.
    RateLimited,
    /// No usable reply; the attempt may be retried.
    Failed(AttemptFailure),
}

/// Perform one exchange over `transport`.
pub fn exchange<T: Transport>(
    transport: &mut T,
    validator: &Validator<'_>,
    version: Version,
    key: Option<&Key>,
    timeout: Duration,
) -> AttemptOutcome {
    let now = unix_time::Instant::now();
    let request = match codec::encode_request_with_version(&now, version, key) {
        Ok(request) => request,
        Err(e) => return AttemptOutcome::Failed(AttemptFailure::Encode(e)),
    };

    if let Err(e) = transport.send(request.as_bytes()) {
        return AttemptOutcome::Failed(AttemptFailure::Send(e.to_string()));
    }

    let mut buf = [0u8; RECV_BUFFER_LEN];
    let len = match transport.recv(&mut buf, timeout) {
        Ok(len) => len,
        Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
            return AttemptOutcome::Failed(AttemptFailure::Timeout);
        }
        Err(e) => return AttemptOutcome::Failed(AttemptFailure::Receive(e.to_string())),
    };
    // Record T4 before anything else.
    let destination_timestamp: TimestampFormat = unix_time::Instant::now().into();

    let packet = &buf[..len];
    let verdict = validator.inspect(packet, Mode::Server, Some(request.header()));
    debug!(
        bytes = len,
        outcome = %verdict.outcome,
        authentication = ?verdict.authentication,
        "validated reply"
    );

    match verdict.outcome {
        ValidationOutcome::Accepted(length) => {
            let header = match codec::decode_header(packet) {
                Ok(header) => header,
                Err(_) => {
                    return AttemptOutcome::Failed(AttemptFailure::Unusable(
                        UnusableReason::BadLength,
                    ));
                }
            };
            let sample = Sample::new(&header, request.transmit_timestamp(), destination_timestamp);
            AttemptOutcome::Accepted(Reply {
                header,
                sample,
                authentication: verdict.authentication.unwrap_or(Authentication::None),
                length,
                destination_timestamp,
            })
        }
        ValidationOutcome::KodDemobilize(code) => AttemptOutcome::Demobilize(code),
        ValidationOutcome::KodRate => AttemptOutcome::RateLimited,
        ValidationOutcome::AuthFail => AttemptOutcome::Failed(AttemptFailure::AuthFail),
        ValidationOutcome::Unusable(reason) => {
            AttemptOutcome::Failed(AttemptFailure::Unusable(reason))
        }
    }
}
