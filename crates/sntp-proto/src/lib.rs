// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! SNTP protocol types, keyed-digest authentication, and response validation.
//!
//! This crate provides the wire codec for the 48-byte NTP header (RFC 5905),
//! the symmetric-key MAC used to authenticate it, and the state machine that
//! classifies an inbound datagram as usable, unusable, authentic, or a
//! Kiss-o'-Death (RFC 4330 Section 8). It performs no network I/O.

#![warn(missing_docs)]

/// Custom error types for buffer-based NTP header parsing.
pub mod error;

/// Request encoding, header decoding, and on-wire offset arithmetic.
pub mod codec;

/// Extension field chain scanning for received packets.
pub mod extension;

/// Symmetric keys and the key file loader.
pub mod key;

/// Keyed digest computation and constant-time verification.
pub mod mac;

/// NTP protocol types and constants (RFC 5905).
pub mod protocol;

/// Unix time conversion utilities for NTP timestamps.
pub mod unix_time;

/// Received-packet validation state machine.
pub mod validate;
