// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Wall-clock sources for the chunk iterator.
//!
//! The iterator never sleeps or waits; it only reads the current time to
//! measure how long the caller spent rendering each chunk. [`Clock`] is that
//! read. [`ManualClock`] is advanced explicitly, which makes timing behavior
//! reproducible in tests and simulations. [`MonotonicClock`] (requires the
//! `std` feature) reads `std::time::Instant`.

use core::cell::Cell;

use crate::time::{Duration, HostTime, Timebase};

/// A monotonic time source.
pub trait Clock {
    /// Returns the current time.
    fn now(&self) -> HostTime;

    /// Returns the conversion from this clock's ticks to nanoseconds.
    fn timebase(&self) -> Timebase {
        Timebase::NANOS
    }
}

impl<T: Clock + ?Sized> Clock for &T {
    #[inline]
    fn now(&self) -> HostTime {
        (**self).now()
    }

    #[inline]
    fn timebase(&self) -> Timebase {
        (**self).timebase()
    }
}

/// A clock that only moves when told to.
///
/// Share it by reference: the iterator can own a `&ManualClock` while the
/// test (or a simulated renderer) advances the same clock.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u64>,
    timebase: Option<Timebase>,
}

impl ManualClock {
    /// Creates a nanosecond clock starting at `start`.
    #[must_use]
    pub const fn new(start: HostTime) -> Self {
        Self {
            now: Cell::new(start.0),
            timebase: None,
        }
    }

    /// Creates a clock starting at `start` with a custom timebase.
    #[must_use]
    pub const fn with_timebase(start: HostTime, timebase: Timebase) -> Self {
        Self {
            now: Cell::new(start.0),
            timebase: Some(timebase),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by.0));
    }

    /// Moves the clock forward by fractional seconds.
    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs, self.timebase()));
    }

    /// Jumps to an absolute time, which must not be in the past.
    ///
    /// # Panics
    ///
    /// Panics if `to` is earlier than the current time.
    pub fn set(&self, to: HostTime) {
        assert!(
            to.0 >= self.now.get(),
            "manual clock must not run backwards"
        );
        self.now.set(to.0);
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> HostTime {
        HostTime(self.now.get())
    }

    #[inline]
    fn timebase(&self) -> Timebase {
        self.timebase.unwrap_or(Timebase::NANOS)
    }
}

/// A nanosecond clock backed by [`std::time::Instant`].
///
/// Ticks count from the moment the clock was created.
#[cfg(feature = "std")]
#[derive(Clone, Copy, Debug)]
pub struct MonotonicClock {
    origin: std::time::Instant,
}

#[cfg(feature = "std")]
impl MonotonicClock {
    /// Creates a clock whose zero is now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

#[cfg(feature = "std")]
impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "std")]
impl Clock for MonotonicClock {
    #[expect(
        clippy::cast_possible_truncation,
        reason = "u64 nanoseconds cover centuries of uptime"
    )]
    fn now(&self) -> HostTime {
        HostTime(self.origin.elapsed().as_nanos() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances() {
        let clock = ManualClock::new(HostTime(10));
        clock.advance(Duration(5));
        assert_eq!(clock.now(), HostTime(15));
        clock.advance_secs(0.25);
        assert_eq!(clock.now(), HostTime(250_000_015));
    }

    #[test]
    fn shared_reference_sees_updates() {
        fn read(c: impl Clock) -> HostTime {
            c.now()
        }
        let clock = ManualClock::default();
        let by_ref = &clock;
        clock.advance(Duration(42));
        assert_eq!(read(by_ref), HostTime(42));
    }

    #[test]
    fn custom_timebase_is_reported() {
        let clock = ManualClock::with_timebase(HostTime(0), Timebase::MICROS);
        clock.advance_secs(0.5);
        assert_eq!(clock.now(), HostTime(500_000));
        assert_eq!(clock.timebase(), Timebase::MICROS);
    }

    #[test]
    #[should_panic(expected = "manual clock must not run backwards")]
    fn set_backwards_panics() {
        let clock = ManualClock::new(HostTime(100));
        clock.set(HostTime(50));
    }
}
