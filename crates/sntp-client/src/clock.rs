// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! System clock adjustment for applying an accepted offset.
//!
//! The client never touches the clock directly; it goes through the
//! [`ClockAdjuster`] trait so that runs can be tested against a fake clock.
//! [`SystemClock`] is the real implementation.
//!
//! Two adjustment strategies are available:
//!
//! - **Slew**: Gradually adjusts the clock rate so the time converges over a
//!   period. Preferred for small offsets as it avoids time discontinuities.
//! - **Step**: Immediately jumps the clock.
//!
//! [`ClockAction::Auto`] picks between them by magnitude (threshold: 128ms,
//! following ntpd convention).
//!
//! # Privileges
//!
//! Writing the clock requires root (or `CAP_SYS_TIME` on Linux).
//!
//! # Platform Support
//!
//! - **Linux**: Uses `clock_adjtime(2)` for slew and `clock_settime(2)` for step.
//! - **macOS**: Uses `adjtime(2)` for slew and `settimeofday(2)` for step.
//! - **Other platforms**: Returns [`ClockError::Unsupported`].

#![allow(unsafe_code)]

use std::fmt;

/// Threshold for choosing slew vs step (128ms), following ntpd convention.
pub const STEP_THRESHOLD_SECS: f64 = 0.128;

/// Error type for clock adjustment operations.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ClockError {
    /// The operation requires elevated privileges (root).
    PermissionDenied,
    /// Platform-specific error with an OS error code.
    OsError(i32),
    /// Clock adjustment is not supported on this platform.
    Unsupported,
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClockError::PermissionDenied => write!(f, "permission denied (requires root)"),
            ClockError::OsError(code) => write!(f, "OS error: {}", code),
            ClockError::Unsupported => write!(f, "clock adjustment not supported on this platform"),
        }
    }
}

impl std::error::Error for ClockError {}

/// The method used to correct the clock.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CorrectionMethod {
    /// Clock was gradually adjusted (slew).
    Slew,
    /// Clock was immediately stepped.
    Step,
}

impl fmt::Display for CorrectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrectionMethod::Slew => write!(f, "slew"),
            CorrectionMethod::Step => write!(f, "step"),
        }
    }
}

/// What to do with an accepted offset.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum ClockAction {
    /// Report only; never write the clock.
    #[default]
    Report,
    /// Always step.
    Step,
    /// Always slew.
    Slew,
    /// Slew at or below [`STEP_THRESHOLD_SECS`], step above it.
    Auto,
}

impl ClockAction {
    /// The correction method this action selects for `offset_seconds`, or
    /// `None` for [`ClockAction::Report`].
    pub fn method_for(&self, offset_seconds: f64) -> Option<CorrectionMethod> {
        match self {
            ClockAction::Report => None,
            ClockAction::Step => Some(CorrectionMethod::Step),
            ClockAction::Slew => Some(CorrectionMethod::Slew),
            ClockAction::Auto if offset_seconds.abs() <= STEP_THRESHOLD_SECS => {
                Some(CorrectionMethod::Slew)
            }
            ClockAction::Auto => Some(CorrectionMethod::Step),
        }
    }
}

/// Something that can correct a clock by an offset in seconds.
pub trait ClockAdjuster {
    /// Jump the clock by `offset_seconds`.
    fn step(&mut self, offset_seconds: f64) -> Result<(), ClockError>;

    /// Gradually correct the clock by `offset_seconds`.
    fn slew(&mut self, offset_seconds: f64) -> Result<(), ClockError>;

    /// Apply `offset_seconds` with the given method.
    fn apply(&mut self, method: CorrectionMethod, offset_seconds: f64) -> Result<(), ClockError> {
        match method {
            CorrectionMethod::Step => self.step(offset_seconds),
            CorrectionMethod::Slew => self.slew(offset_seconds),
        }
    }
}

/// The operating system's realtime clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl ClockAdjuster for SystemClock {
    /// Step (jump) the system clock by the given offset.
    ///
    /// # Platform Behavior
    ///
    /// - **Linux**: Uses `clock_settime(CLOCK_REALTIME, ...)`.
    /// - **macOS**: Uses `settimeofday(...)`.
    fn step(&mut self, offset_seconds: f64) -> Result<(), ClockError> {
        platform::step(offset_seconds)
    }

    /// Slew the system clock by the given offset.
    ///
    /// # Platform Behavior
    ///
    /// - **Linux**: Uses `clock_adjtime(CLOCK_REALTIME, ...)` with `ADJ_OFFSET`.
    /// - **macOS**: Uses `adjtime(&delta, NULL)`.
    fn slew(&mut self, offset_seconds: f64) -> Result<(), ClockError> {
        platform::slew(offset_seconds)
    }
}

/// Convert an OS errno to a [`ClockError`].
#[cfg(any(target_os = "linux", target_os = "macos"))]
fn os_error_from_errno() -> ClockError {
    let errno = std::io::Error::last_os_error().raw_os_error().unwrap_or(-1);
    if errno == libc::EPERM {
        ClockError::PermissionDenied
    } else {
        ClockError::OsError(errno)
    }
}

#[cfg(target_os = "linux")]
mod platform {
    use super::*;

    pub(super) fn slew(offset_seconds: f64) -> Result<(), ClockError> {
        // ADJ_OFFSET takes microseconds.
        let offset_usec = (offset_seconds * 1_000_000.0) as i64;

        let mut tx: libc::timex = unsafe { std::mem::zeroed() };
        tx.modes = libc::ADJ_OFFSET;
        tx.offset = offset_usec as _;

        let ret = unsafe { libc::clock_adjtime(libc::CLOCK_REALTIME, &mut tx) };
        if ret < 0 {
            return Err(os_error_from_errno());
        }
        Ok(())
    }

    pub(super) fn step(offset_seconds: f64) -> Result<(), ClockError> {
        let mut tp: libc::timespec = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::clock_gettime(libc::CLOCK_REALTIME, &mut tp) };
        if ret < 0 {
            return Err(os_error_from_errno());
        }

        let offset_nanos = (offset_seconds * 1_000_000_000.0) as i64;
        #[allow(clippy::unnecessary_cast)] // tv_sec/tv_nsec types differ across platforms
        let total_nanos = tp.tv_sec as i64 * 1_000_000_000 + tp.tv_nsec as i64 + offset_nanos;
        tp.tv_sec = total_nanos.div_euclid(1_000_000_000) as _;
        tp.tv_nsec = total_nanos.rem_euclid(1_000_000_000) as _;

        let ret = unsafe { libc::clock_settime(libc::CLOCK_REALTIME, &tp) };
        if ret < 0 {
            return Err(os_error_from_errno());
        }
        Ok(())
    }
}

#[cfg(target_os = "macos")]
mod platform {
    use super::*;

    pub(super) fn slew(offset_seconds: f64) -> Result<(), ClockError> {
        let secs = offset_seconds.trunc() as libc::time_t;
        let usecs = (offset_seconds.fract() * 1_000_000.0) as libc::suseconds_t;
        let delta = libc::timeval {
            tv_sec: secs,
            tv_usec: usecs,
        };

        let ret = unsafe { libc::adjtime(&delta, std::ptr::null_mut()) };
        if ret < 0 {
            return Err(os_error_from_errno());
        }
        Ok(())
    }

    pub(super) fn step(offset_seconds: f64) -> Result<(), ClockError> {
        let mut tv: libc::timeval = unsafe { std::mem::zeroed() };
        let ret = unsafe { libc::gettimeofday(&mut tv, std::ptr::null_mut()) };
        if ret < 0 {
            return Err(os_error_from_errno());
        }

        let offset_usecs = (offset_seconds * 1_000_000.0) as i64;
        let total_usecs = tv.tv_sec as i64 * 1_000_000 + tv.tv_usec as i64 + offset_usecs;
        tv.tv_sec = total_usecs.div_euclid(1_000_000) as _;
        tv.tv_usec = total_usecs.rem_euclid(1_000_000) as _;

        let ret = unsafe { libc::settimeofday(&tv, std::ptr::null()) };
        if ret < 0 {
            return Err(os_error_from_errno());
        }
        Ok(())
    }
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
mod platform {
    use super::*;

    pub(super) fn slew(_offset_seconds: f64) -> Result<(), ClockError> {
        Err(ClockError::Unsupported)
    }

    pub(super) fn step(_offset_seconds: f64) -> Result<(), ClockError> {
        Err(ClockError::Unsupported)
    }
}
