// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Clock ticks and their conversion to seconds.
//!
//! Clocks report [`HostTime`] in whatever unit they count natively; a
//! [`Timebase`] says how many nanoseconds one tick is worth. Burst budgets
//! are configured in seconds, so the iterator only ever needs the elapsed
//! [`Duration`] between two readings as an `f64` number of seconds.

use core::fmt;
use core::ops::{Add, Sub};

const NANOS_PER_SEC: f64 = 1e9;

/// A clock reading, in ticks.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct HostTime(pub u64);

impl HostTime {
    /// Raw tick count.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Ticks elapsed since `earlier`; zero if `earlier` is actually later.
    #[inline]
    #[must_use]
    pub const fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for HostTime {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl Sub for HostTime {
    type Output = Duration;

    #[inline]
    fn sub(self, rhs: Self) -> Duration {
        self.saturating_duration_since(rhs)
    }
}

impl fmt::Debug for HostTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// Nanoseconds per tick, as the ratio `numer / denom`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timebase {
    /// Nanoseconds in `denom` ticks.
    pub numer: u32,
    /// Ticks per `numer` nanoseconds.
    pub denom: u32,
}

impl Timebase {
    /// One tick per nanosecond.
    pub const NANOS: Self = Self { numer: 1, denom: 1 };

    /// One tick per microsecond.
    pub const MICROS: Self = Self {
        numer: 1_000,
        denom: 1,
    };

    /// Creates a timebase of `numer / denom` nanoseconds per tick.
    ///
    /// # Panics
    ///
    /// Panics if either term is zero.
    #[must_use]
    pub const fn new(numer: u32, denom: u32) -> Self {
        assert!(numer != 0 && denom != 0, "timebase terms must be non-zero");
        Self { numer, denom }
    }

    /// Converts ticks to nanoseconds, saturating at `u64::MAX`.
    #[must_use]
    pub const fn ticks_to_nanos(self, ticks: u64) -> u64 {
        scale(ticks, self.numer, self.denom)
    }

    /// Converts nanoseconds to ticks, saturating at `u64::MAX`.
    #[must_use]
    pub const fn nanos_to_ticks(self, nanos: u64) -> u64 {
        scale(nanos, self.denom, self.numer)
    }
}

impl fmt::Debug for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timebase({}/{} ns)", self.numer, self.denom)
    }
}

#[expect(clippy::cast_possible_truncation, reason = "checked against u64::MAX")]
const fn scale(value: u64, mul: u32, div: u32) -> u64 {
    let wide = value as u128 * mul as u128 / div as u128;
    if wide > u64::MAX as u128 {
        u64::MAX
    } else {
        wide as u64
    }
}

/// Elapsed ticks between two [`HostTime`] readings.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Duration(pub u64);

impl Duration {
    /// No time at all.
    pub const ZERO: Self = Self(0);

    /// Raw tick count.
    #[inline]
    #[must_use]
    pub const fn ticks(self) -> u64 {
        self.0
    }

    /// Length in seconds.
    #[must_use]
    pub fn as_secs_f64(self, timebase: Timebase) -> f64 {
        timebase.ticks_to_nanos(self.0) as f64 / NANOS_PER_SEC
    }

    /// The duration closest to `secs` seconds.
    ///
    /// Negative values and NaN give [`Duration::ZERO`]; values too large to
    /// represent saturate.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "float-to-int casts saturate, which is the documented behavior"
    )]
    pub fn from_secs_f64(secs: f64, timebase: Timebase) -> Self {
        // `as` maps NaN to 0 and clamps out-of-range values.
        let nanos = (secs * NANOS_PER_SEC) as u64;
        Self(timebase.nanos_to_ticks(nanos))
    }
}

impl fmt::Debug for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ticks", self.0)
    }
}
