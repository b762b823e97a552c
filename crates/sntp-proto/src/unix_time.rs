// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

use crate::protocol;
use std::time;

/// The number of seconds from 1st January 1900 UTC to the start of the Unix epoch.
pub const EPOCH_DELTA: i64 = 2_208_988_800;

/// The number of seconds in one NTP era (2^32 seconds, approximately 136 years).
///
/// Era 0 spans from 1900-01-01 00:00:00 UTC to 2036-02-07 06:28:15 UTC.
/// Era 1 begins at 2036-02-07 06:28:16 UTC.
pub const ERA_SECONDS: i64 = 4_294_967_296; // 1i64 << 32

const NANOS_PER_SEC: i128 = 1_000_000_000;

/// Describes an instant relative to the `UNIX_EPOCH` - 00:00:00 Coordinated Universal Time (UTC),
/// Thursday, 1 January 1970 in seconds with the fractional part in nanoseconds.
///
/// If the **Instant** describes some moment prior to `UNIX_EPOCH`, both the `secs` and
/// `subsec_nanos` components will be negative.
///
/// The type exists to read the current time and to convert between it and the 32.32 NTP
/// timestamp format. Conversions are done in integer arithmetic so that a value survives the
/// trip through the wire format to within one nanosecond.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Instant {
    secs: i64,
    subsec_nanos: i32,
}

impl Instant {
    /// Create a new **Instant** given its `secs` and `subsec_nanos` components.
    ///
    /// Returns `None` when the components disagree in sign or the nanosecond
    /// part is a second or more in magnitude.
    pub fn new(secs: i64, subsec_nanos: i32) -> Option<Instant> {
        if subsec_nanos.unsigned_abs() >= 1_000_000_000 {
            return None;
        }
        if (secs > 0 && subsec_nanos < 0) || (secs < 0 && subsec_nanos > 0) {
            return None;
        }
        Some(Instant { secs, subsec_nanos })
    }

    /// Uses `std::time::SystemTime::now` and `std::time::UNIX_EPOCH` to determine the current
    /// **Instant**.
    ///
    /// ## Example
    ///
    /// ```
    /// println!("{:?}", sntp_proto::unix_time::Instant::now());
    /// ```
    pub fn now() -> Self {
        match time::SystemTime::now().duration_since(time::UNIX_EPOCH) {
            Ok(duration) => Instant {
                secs: duration.as_secs() as i64,
                subsec_nanos: duration.subsec_nanos() as i32,
            },
            Err(sys_time_err) => {
                let before = sys_time_err.duration();
                Instant {
                    secs: -(before.as_secs() as i64),
                    subsec_nanos: -(before.subsec_nanos() as i32),
                }
            }
        }
    }

    /// The "seconds" component of the **Instant**.
    pub fn secs(&self) -> i64 {
        self.secs
    }

    /// The fractional component of the **Instant** in nanoseconds.
    pub fn subsec_nanos(&self) -> i32 {
        self.subsec_nanos
    }

    fn total_nanos(&self) -> i128 {
        self.secs as i128 * NANOS_PER_SEC + self.subsec_nanos as i128
    }

    fn from_total_nanos(total: i128) -> Instant {
        // Truncation toward zero keeps both components on the same side of the epoch.
        Instant {
            secs: (total / NANOS_PER_SEC) as i64,
            subsec_nanos: (total % NANOS_PER_SEC) as i32,
        }
    }
}

/// Given a raw 32-bit NTP timestamp seconds value and a pivot `Instant`,
/// return the absolute NTP seconds (i64) by selecting the era closest to the pivot.
///
/// The algorithm assumes the timestamp is within half an era (~68 years) of the pivot.
fn era_aware_ntp_seconds(raw_seconds: u32, pivot: &Instant) -> i64 {
    let pivot_ntp = pivot.secs + EPOCH_DELTA;
    let raw = raw_seconds as i64;

    let pivot_era = pivot_ntp.div_euclid(ERA_SECONDS);
    let candidate = pivot_era * ERA_SECONDS + raw;

    let diff = candidate - pivot_ntp;
    if diff > ERA_SECONDS / 2 {
        candidate - ERA_SECONDS
    } else if diff < -(ERA_SECONDS / 2) {
        candidate + ERA_SECONDS
    } else {
        candidate
    }
}

/// Nanoseconds represented by a 32-bit binary fraction of a second.
fn fraction_to_nanos(fraction: u32) -> i128 {
    ((fraction as u64 * 1_000_000_000) >> 32) as i128
}

/// Binary fraction of a second for a nanosecond count in `0..1e9`.
///
/// Rounds up so that converting back with [`fraction_to_nanos`] yields the
/// original nanosecond count.
fn nanos_to_fraction(nanos: u64) -> u32 {
    (((nanos << 32) + 999_999_999) / 1_000_000_000) as u32
}

/// Convert a [`protocol::TimestampFormat`] to an [`Instant`] using the given pivot
/// for era disambiguation.
///
/// The 32-bit NTP timestamp format is ambiguous across eras (each era spans ~136 years).
/// This function resolves the ambiguity by selecting the era that places the timestamp
/// closest to the provided pivot (within ~68 years).
pub fn timestamp_to_instant(ts: protocol::TimestampFormat, pivot: &Instant) -> Instant {
    let ntp_secs = era_aware_ntp_seconds(ts.seconds, pivot);
    let total = (ntp_secs - EPOCH_DELTA) as i128 * NANOS_PER_SEC + fraction_to_nanos(ts.fraction);
    Instant::from_total_nanos(total)
}

impl From<protocol::TimestampFormat> for Instant {
    /// Converts a 32-bit NTP timestamp to a Unix [`Instant`], using the current system
    /// time as a pivot for era disambiguation.
    fn from(t: protocol::TimestampFormat) -> Self {
        timestamp_to_instant(t, &Instant::now())
    }
}

impl From<Instant> for protocol::TimestampFormat {
    /// Converts a Unix [`Instant`] to a 32-bit NTP timestamp.
    ///
    /// **Note**: This truncates to 32 bits, losing era information. The receiver infers the
    /// era with a pivot (see [`timestamp_to_instant`]).
    fn from(t: Instant) -> Self {
        let ntp_nanos = t.total_nanos() + EPOCH_DELTA as i128 * NANOS_PER_SEC;
        let secs = ntp_nanos.div_euclid(NANOS_PER_SEC);
        let nanos = ntp_nanos.rem_euclid(NANOS_PER_SEC) as u64;
        protocol::TimestampFormat {
            seconds: secs.rem_euclid(ERA_SECONDS as i128) as u32,
            fraction: nanos_to_fraction(nanos),
        }
    }
}
