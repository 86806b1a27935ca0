// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time-budgeted chunking of a region into render-sized rectangles.
//!
//! The [`ChunkIterator`] consumes a region and hands out rectangles sized so
//! that rendering each one takes a predictable slice of wall-clock time. It
//! adapts the chunk area from observed render times and ends each burst
//! once the configured interval is spent. See the [`ChunkIterator`] struct
//! docs for the scan order, the priority sub-area and the control loop.

mod config;
mod target;

pub use config::ChunkConfig;

use target::TargetArea;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::clock::Clock;
use crate::rect::Rectangle;
use crate::region::SpatialRegionSet;
use crate::time::HostTime;

/// Which region the iterator is currently draining.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Source {
    Main,
    Priority,
}

/// Observable phase of a [`ChunkIterator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChunkState {
    /// Nothing is left to hand out, but no call has observed exhaustion yet.
    Empty,
    /// Emitting row bands from the current rectangle.
    Scanning {
        /// Whether the current rectangle belongs to the priority sub-area.
        priority: bool,
    },
    /// The current rectangle is finished; the next call pulls another one.
    NeedNextRect,
    /// Both regions are drained. Terminal.
    Exhausted,
}

/// Adaptive scheduler that splits a region into time-budgeted chunks.
///
/// # Scan order
///
/// The iterator takes one rectangle at a time out of its region and scans it
/// in row bands, top to bottom, emitting chunks left to right within a band.
/// Chunk edges snap to the tile grid given by
/// [`set_tile_rect`](Self::set_tile_rect) whenever a chunk spans at least
/// one tile, and never exceed the caps in [`ChunkConfig`].
///
/// # Priority sub-area
///
/// [`set_priority_rect`](Self::set_priority_rect) marks an area that must be
/// drained first. The split is deferred until the scan reaches a rectangle
/// boundary; from then on every pixel of the priority area is emitted before
/// any other pixel. Changing the priority rectangle merges all in-flight
/// state back first, so nothing is lost or emitted twice.
///
/// # Control loop
///
/// Each call to [`get_rect`](Self::get_rect) measures how long the caller
/// took to render the previous chunk(s). Once at least
/// [`ChunkConfig::min_sample_area`] pixels were processed, the observed rate
/// yields a sample `area * interval / elapsed`; the median of the last three
/// samples becomes the target area. When a burst has used up its interval,
/// `get_rect` returns `None` and the caller should yield before calling
/// [`next_pass`](Self::next_pass) again.
///
/// # Usage
///
/// ```rust,ignore
/// let mut iter = ChunkIterator::new(region, clock);
/// iter.set_tile_rect(Rectangle::new(0, 0, 64, 64));
///
/// // Once per event-loop turn:
/// if iter.next_pass() {
///     while let Some(rect) = iter.get_rect() {
///         render(rect);
///     }
/// } else {
///     let leftover = iter.stop(false);
/// }
/// ```
#[derive(Debug)]
pub struct ChunkIterator<R: SpatialRegionSet, C: Clock> {
    config: ChunkConfig,
    clock: C,

    region: R,
    priority_region: Option<R>,

    tile_rect: Option<Rectangle>,
    priority_rect: Option<Rectangle>,

    interval: f64,

    source: Source,
    current_rect: Rectangle,
    current_x: i32,
    current_y: i32,
    current_height: i32,

    iteration_time: Option<HostTime>,

    last_time: HostTime,
    last_area: u64,

    target: TargetArea,
    exhausted: bool,
}

impl<R: SpatialRegionSet, C: Clock> ChunkIterator<R, C> {
    /// Creates an iterator over `region` with the default configuration.
    ///
    /// [`set_tile_rect`](Self::set_tile_rect) must be called before the
    /// first pass.
    #[must_use]
    pub fn new(region: R, clock: C) -> Self {
        Self::with_config(region, clock, ChunkConfig::DEFAULT)
    }

    /// Creates an iterator over `region` with the given configuration.
    #[must_use]
    pub fn with_config(region: R, clock: C, config: ChunkConfig) -> Self {
        Self {
            interval: config.interval.max(0.0),
            config,
            clock,
            region,
            priority_region: None,
            tile_rect: None,
            priority_rect: None,
            source: Source::Main,
            current_rect: Rectangle::ZERO,
            current_x: 0,
            current_y: 0,
            current_height: 0,
            iteration_time: None,
            last_time: HostTime(0),
            last_area: 0,
            target: TargetArea::new(),
            exhausted: false,
        }
    }

    /// Sets the tile grid that chunk edges snap to.
    ///
    /// # Panics
    ///
    /// Panics if `rect` is empty.
    pub fn set_tile_rect(&mut self, rect: Rectangle) {
        assert!(!rect.is_empty(), "tile rect must not be empty");
        self.tile_rect = Some(rect);
    }

    /// Returns the tile grid, if set.
    #[must_use]
    pub fn tile_rect(&self) -> Option<Rectangle> {
        self.tile_rect
    }

    /// Sets or clears the area to drain first.
    ///
    /// Passing the current value is a no-op. Otherwise any in-flight
    /// rectangle and the previous priority area are merged back into the
    /// main region before the new rectangle is stored.
    ///
    /// # Panics
    ///
    /// Panics if `rect` is `Some` empty rectangle; pass `None` to clear.
    pub fn set_priority_rect(&mut self, rect: Option<Rectangle>) {
        if let Some(r) = rect {
            assert!(
                !r.is_empty(),
                "priority rect must not be empty; pass None to clear it"
            );
        }
        if rect != self.priority_rect {
            self.merge();
            self.priority_rect = rect;
        }
    }

    /// Returns the priority rectangle, if any.
    #[must_use]
    pub fn priority_rect(&self) -> Option<Rectangle> {
        self.priority_rect
    }

    /// Sets the per-burst time budget, in seconds.
    ///
    /// Negative values clamp to zero. When the budget changes from a
    /// non-zero value, the target area and its history are rescaled by
    /// `new / old`, so the throughput estimate carries over.
    pub fn set_interval(&mut self, interval: f64) {
        let interval = interval.max(0.0);
        if interval != self.interval {
            if self.interval > 0.0 {
                self.target.rescale(interval / self.interval);
            }
            self.interval = interval;
        }
    }

    /// Returns the per-burst time budget, in seconds.
    #[must_use]
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Returns the clock the iterator reads.
    #[must_use]
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Returns the configuration the iterator was built with.
    #[must_use]
    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Current target chunk area, in pixels.
    ///
    /// Before the first timing sample this is the tile area (or zero if no
    /// tile rect is set).
    #[must_use]
    pub fn target_area(&self) -> f64 {
        let fallback = self.tile_rect.map_or(0, Rectangle::area);
        self.target.get(fallback as f64)
    }

    /// Number of pixels not yet handed out.
    #[must_use]
    pub fn remaining_area(&self) -> u64 {
        let (row, below) = self.current_remainder();
        self.region.area()
            + self.priority_region.as_ref().map_or(0, R::area)
            + row.area()
            + below.area()
    }

    /// Returns `true` once both regions are drained.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Returns the current phase.
    #[must_use]
    pub fn state(&self) -> ChunkState {
        if self.exhausted {
            return ChunkState::Exhausted;
        }
        let (row, below) = self.current_remainder();
        if !row.is_empty() || !below.is_empty() {
            return ChunkState::Scanning {
                priority: self.source == Source::Priority,
            };
        }
        let priority_empty = self.priority_region.as_ref().is_none_or(R::is_empty);
        if self.region.is_empty() && priority_empty {
            ChunkState::Empty
        } else {
            ChunkState::NeedNextRect
        }
    }

    /// Starts a burst.
    ///
    /// Returns `false` when nothing is left to do; the iterator is then
    /// exhausted and only [`stop`](Self::stop) remains useful.
    ///
    /// # Panics
    ///
    /// Panics if no tile rect was set.
    pub fn next_pass(&mut self) -> bool {
        self.tile();

        if !self.prepare() {
            self.exhausted = true;
            return false;
        }

        let now = self.clock.now();
        self.iteration_time = Some(now);
        self.last_time = now;
        self.last_area = 0;

        true
    }

    /// Returns the next chunk of the current burst.
    ///
    /// `None` means either the burst's time budget is spent (call
    /// [`next_pass`](Self::next_pass) later to resume) or the region is
    /// exhausted (the following `next_pass` returns `false`).
    ///
    /// # Panics
    ///
    /// Panics if no tile rect was set or [`next_pass`](Self::next_pass) was
    /// never called.
    pub fn get_rect(&mut self) -> Option<Rectangle> {
        let tile = self.tile();
        let Some(iteration_time) = self.iteration_time else {
            panic!("next_pass must be called before get_rect");
        };

        if !self.prepare() {
            self.exhausted = true;
            return None;
        }

        let now = self.clock.now();
        let timebase = self.clock.timebase();

        let mut sampled = false;
        if self.last_area >= self.config.min_sample_area {
            let elapsed = now
                .saturating_duration_since(self.last_time)
                .as_secs_f64(timebase);
            if elapsed > 0.0 {
                self.target
                    .observe(self.last_area as f64 * self.interval / elapsed);
                sampled = true;
            }

            let spent = now
                .saturating_duration_since(iteration_time)
                .as_secs_f64(timebase);
            if spent >= self.interval {
                return None;
            }
        }

        let rect = if self.current_x == self.current_rect.x {
            self.calc_rect(tile, true)
        } else {
            let rect = self.calc_rect(tile, false);
            let limit = self.config.max_area_ratio * self.target.get(tile.area() as f64);
            if rect.area() as f64 > limit {
                // Prefer the smaller row height; never overshoot further.
                let readjusted = self.calc_rect(tile, true);
                if readjusted.height < rect.height {
                    readjusted
                } else {
                    rect
                }
            } else {
                rect
            }
        };

        if rect.height != self.current_height {
            if rect.x != self.current_rect.x {
                // The band shrank mid-row: give back the rest of the old band
                // and continue with a narrower band at the same position.
                let rest_of_band = Rectangle::new(
                    rect.x,
                    rect.y,
                    self.current_rect.right() - rect.x,
                    rect.height,
                );
                self.merge_current_rect();
                self.set_current_rect(rest_of_band);
            }
            self.current_height = rect.height;
        }

        self.current_x += rect.width;

        if sampled || self.last_area == 0 {
            self.last_time = now;
            self.last_area = rect.area();
        } else {
            // Too little work for a reliable sample yet; keep accumulating.
            self.last_area += rect.area();
        }

        Some(rect)
    }

    /// Finishes iteration.
    ///
    /// With `discard`, the remaining area is dropped and `None` is returned.
    /// Otherwise every pixel that was not handed out is merged back and
    /// returned, ready to seed a later iterator.
    #[must_use]
    pub fn stop(mut self, discard: bool) -> Option<R> {
        if discard {
            return None;
        }
        self.merge();
        Some(self.region)
    }

    fn tile(&self) -> Rectangle {
        match self.tile_rect {
            Some(tile) => tile,
            None => panic!("set_tile_rect must be called before iterating"),
        }
    }

    fn current_region_mut(&mut self) -> &mut R {
        match (self.source, &mut self.priority_region) {
            (Source::Priority, Some(priority)) => priority,
            _ => &mut self.region,
        }
    }

    /// Remainder of the committed band and everything below it.
    fn current_remainder(&self) -> (Rectangle, Rectangle) {
        let r = self.current_rect;
        if r.is_empty() {
            return (Rectangle::ZERO, Rectangle::ZERO);
        }
        let band_bottom = self.current_y + self.current_height;
        (
            Rectangle::from_edges(self.current_x, self.current_y, r.right(), band_bottom),
            Rectangle::from_edges(r.x, band_bottom, r.right(), r.bottom()),
        )
    }

    fn set_current_rect(&mut self, rect: Rectangle) {
        self.current_region_mut().subtract_rect(rect);

        self.current_rect = rect;
        self.current_x = rect.x;
        self.current_y = rect.y;
        self.current_height = 0;
    }

    fn clear_current_rect(&mut self) {
        self.current_rect = Rectangle::ZERO;
        self.current_x = 0;
        self.current_y = 0;
        self.current_height = 0;
    }

    /// Returns the unscanned part of the current rectangle to its region.
    fn merge_current_rect(&mut self) {
        let (row, below) = self.current_remainder();
        let region = self.current_region_mut();
        region.union_rect(row);
        region.union_rect(below);
        self.clear_current_rect();
    }

    /// Folds all in-flight state back into the main region.
    fn merge(&mut self) {
        self.merge_current_rect();

        if let Some(priority) = self.priority_region.take() {
            self.region.union(&priority);
        }
        self.source = Source::Main;
    }

    /// Advances the scan cursor past finished bands and rectangles.
    ///
    /// Returns `false` if there is nothing left to scan.
    fn prepare(&mut self) -> bool {
        if self.current_x != self.current_rect.right() {
            return true;
        }

        self.current_x = self.current_rect.x;
        self.current_y += self.current_height;
        self.current_height = 0;

        if self.current_y != self.current_rect.bottom() {
            return true;
        }

        if self.priority_region.is_none() {
            if let Some(priority_rect) = self.priority_rect {
                let mut priority = self.region.clone();
                priority.intersect_rect(priority_rect);
                self.region.subtract_rect(priority_rect);
                self.priority_region = Some(priority);
            }
        }

        self.source = match &self.priority_region {
            Some(priority) if !priority.is_empty() => Source::Priority,
            _ => Source::Main,
        };

        match self.current_region_mut().first_rect() {
            Some(rect) => {
                self.set_current_rect(rect);
                true
            }
            None => {
                self.clear_current_rect();
                false
            }
        }
    }

    /// Computes the next chunk at the scan cursor.
    ///
    /// With `readjust_height` (or at the start of a band) the band height is
    /// derived afresh from the target area and the tile aspect ratio, and
    /// the controller is re-anchored at its most conservative recent sample.
    fn calc_rect(&mut self, tile: Rectangle, readjust_height: bool) -> Rectangle {
        if readjust_height {
            self.target.reanchor();
        }

        let target_area = self.target.get(tile.area() as f64);
        let aspect_ratio = f64::from(tile.height) / f64::from(tile.width);

        let x = self.current_x;
        let y = self.current_y;

        let height = if readjust_height || self.current_height == 0 {
            snap_to_grid(y - tile.y, tile.height, (target_area * aspect_ratio).sqrt())
                .min(self.config.max_chunk_height)
                .min(self.current_rect.bottom() - y)
        } else {
            self.current_height
        };

        let width = snap_to_grid(x - tile.x, tile.width, target_area / f64::from(height))
            .min(self.config.max_chunk_width)
            .min(self.current_rect.right() - x);

        Rectangle::new(x, y, width.max(1), height.max(1))
    }
}

/// Rounds `length` to whole pixels and, if the span reaches past the first
/// grid line, shortens it so it ends on one.
///
/// `offset` is the span's start relative to the grid origin. The result is
/// always at least one pixel.
#[expect(
    clippy::cast_possible_truncation,
    reason = "length is clamped to the i32 range before the cast"
)]
fn snap_to_grid(offset: i32, step: i32, length: f64) -> i32 {
    let offset = offset.rem_euclid(step);
    let length = if length.is_nan() {
        1
    } else {
        length.round().clamp(1.0, f64::from(i32::MAX)) as i32
    };
    let end = offset.saturating_add(length);
    let end = if end >= step { end - end % step } else { end };
    end - offset
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec::Vec;
    use std::time::Instant;

    use super::*;
    use crate::clock::ManualClock;
    use crate::region::Region;
    use crate::time::Duration;

    const TILE: Rectangle = Rectangle::new(0, 0, 64, 64);
    /// 1 µs per pixel, in nanosecond ticks.
    const MICRO_PER_PX: u64 = 1_000;

    type TestIter<'a> = ChunkIterator<Region, &'a ManualClock>;

    fn iter_over<'a>(region: Region, clock: &'a ManualClock) -> TestIter<'a> {
        let mut iter = ChunkIterator::new(region, clock);
        iter.set_tile_rect(TILE);
        iter
    }

    /// Runs one burst, advancing the clock by `ns_per_px` for each pixel.
    fn burst(iter: &mut TestIter<'_>, clock: &ManualClock, ns_per_px: u64) -> Vec<Rectangle> {
        let mut out = Vec::new();
        while let Some(rect) = iter.get_rect() {
            clock.advance(Duration(rect.area() * ns_per_px));
            out.push(rect);
        }
        out
    }

    fn drain(iter: &mut TestIter<'_>, clock: &ManualClock, ns_per_px: u64) -> Vec<Rectangle> {
        let mut out = Vec::new();
        while iter.next_pass() {
            out.extend(burst(iter, clock, ns_per_px));
        }
        out
    }

    /// Asserts that `chunks` are pairwise disjoint and cover `expected`
    /// exactly.
    fn assert_exact_cover(chunks: &[Rectangle], expected: &Region) {
        let total: u64 = chunks.iter().map(|r| r.area()).sum();
        let covered = Region::from_rects(chunks.iter().copied());
        assert_eq!(covered.area(), total, "emitted chunks overlap");
        assert_eq!(covered.area(), expected.area(), "coverage differs in area");

        let mut outside = covered.clone();
        for r in expected.rects() {
            outside.subtract_rect(r);
        }
        assert!(outside.is_empty(), "chunks outside region: {outside:?}");
    }

    #[test]
    fn drains_exactly_the_region() {
        let clock = ManualClock::default();
        let region = Region::from_rects([
            Rectangle::new(0, 0, 700, 500),
            Rectangle::new(650, 450, 300, 300),
            Rectangle::new(-40, 900, 33, 1_000),
            Rectangle::new(1_000, 0, 1, 1),
        ]);
        let mut iter = iter_over(region.clone(), &clock);

        let chunks = drain(&mut iter, &clock, MICRO_PER_PX);

        assert_exact_cover(&chunks, &region);
        assert!(chunks.iter().all(|r| !r.is_empty()), "empty chunk emitted");
        assert_eq!(iter.state(), ChunkState::Exhausted);
        assert_eq!(iter.remaining_area(), 0);
    }

    #[test]
    fn two_disjoint_rects_never_straddle_the_gap() {
        let clock = ManualClock::default();
        let a = Rectangle::new(0, 0, 100, 100);
        let b = Rectangle::new(200, 200, 50, 50);
        let region = Region::from_rects([a, b]);
        let mut iter = iter_over(region.clone(), &clock);

        let chunks = drain(&mut iter, &clock, MICRO_PER_PX);

        assert_exact_cover(&chunks, &region);
        for chunk in &chunks {
            assert!(
                a.contains_rect(*chunk) || b.contains_rect(*chunk),
                "{chunk:?} straddles the gap"
            );
        }
        // A comes first: it is the top-left rectangle.
        assert!(a.contains_rect(chunks[0]));
    }

    #[test]
    fn chunks_respect_size_caps() {
        let clock = ManualClock::default();
        let bounds = Rectangle::new(0, 0, 10_000, 9_000);
        let mut iter = iter_over(Region::from(bounds), &clock);

        // Nearly free rendering drives the target area far above the caps.
        let mut chunks = Vec::new();
        while iter.next_pass() {
            while let Some(rect) = iter.get_rect() {
                clock.advance(Duration(1));
                chunks.push(rect);
            }
        }

        assert_exact_cover(&chunks, &Region::from(bounds));
        assert!(chunks.iter().all(|r| r.width <= 4096 && r.height <= 4096));
        assert!(
            chunks.iter().any(|r| r.width == 4096 && r.height == 4096),
            "caps should be reached with a cheap renderer"
        );
    }

    #[test]
    fn configured_caps_apply() {
        let clock = ManualClock::default();
        let bounds = Rectangle::new(0, 0, 2_000, 1_000);
        let config = ChunkConfig::DEFAULT.with_max_chunk_size(256, 128);
        let mut iter = ChunkIterator::with_config(Region::from(bounds), &clock, config);
        iter.set_tile_rect(TILE);

        let mut chunks = Vec::new();
        while iter.next_pass() {
            while let Some(rect) = iter.get_rect() {
                clock.advance(Duration(1));
                chunks.push(rect);
            }
        }

        assert_exact_cover(&chunks, &Region::from(bounds));
        assert!(chunks.iter().all(|r| r.width <= 256 && r.height <= 128));
    }

    #[test]
    fn first_burst_fits_the_interval() {
        let clock = ManualClock::default();
        let bounds = Rectangle::new(0, 0, 8192, 8192);
        let mut iter = iter_over(Region::from(bounds), &clock);

        assert!(iter.next_pass());
        let start = clock.now();
        let chunks = burst(&mut iter, &clock, MICRO_PER_PX);
        let spent = (clock.now() - start).as_secs_f64(clock.timebase());

        let area: u64 = chunks.iter().map(|r| r.area()).sum();
        // (1/15 s) / (1 µs/px) is about 66 667 px.
        assert!(
            (50_000..=90_000).contains(&area),
            "first burst rendered {area} px"
        );
        assert!(spent < 2.0 * iter.interval(), "burst took {spent} s");
        assert!(iter.remaining_area() > 0);
        assert_eq!(iter.remaining_area() + area, bounds.area());
        assert!(!iter.is_exhausted(), "time budget is not exhaustion");
        assert!(iter.next_pass(), "iteration resumes after a yield");
    }

    #[test]
    fn controller_converges_on_constant_cost() {
        let clock = ManualClock::default();
        let mut iter = iter_over(Region::from(Rectangle::new(0, 0, 8192, 8192)), &clock);

        for _ in 0..10 {
            assert!(iter.next_pass());
            let _ = burst(&mut iter, &clock, MICRO_PER_PX);
        }
        let target = iter.target_area();
        let expected = 1.0 / 15.0 / 1e-6;
        assert!(
            (target - expected).abs() / expected < 0.05,
            "target {target} px, expected about {expected}"
        );
    }

    #[test]
    fn priority_area_drains_first() {
        let clock = ManualClock::default();
        let bounds = Rectangle::new(0, 0, 512, 512);
        let priority = Rectangle::new(300, 260, 100, 90);
        let mut iter = iter_over(Region::from(bounds), &clock);
        iter.set_priority_rect(Some(priority));

        let chunks = drain(&mut iter, &clock, MICRO_PER_PX);
        assert_exact_cover(&chunks, &Region::from(bounds));

        let split = chunks
            .iter()
            .position(|r| !priority.contains_rect(*r))
            .unwrap_or(chunks.len());
        let drained: u64 = chunks[..split].iter().map(|r| r.area()).sum();
        assert_eq!(drained, priority.area(), "priority pixels come first");
        assert!(chunks[split..].iter().all(|r| !r.overlaps(priority)));
    }

    #[test]
    fn priority_change_mid_drain_keeps_coverage() {
        let clock = ManualClock::default();
        let bounds = Rectangle::new(0, 0, 512, 512);
        let mut iter = iter_over(Region::from(bounds), &clock);

        assert!(iter.next_pass());
        let mut chunks = burst(&mut iter, &clock, MICRO_PER_PX);
        let before = chunks.len();
        assert!(iter.remaining_area() > 0);

        let priority = Rectangle::new(300, 300, 100, 100);
        iter.set_priority_rect(Some(priority));
        assert_eq!(iter.state(), ChunkState::NeedNextRect);
        // Same rectangle again is a no-op.
        iter.set_priority_rect(Some(priority));

        chunks.extend(drain(&mut iter, &clock, MICRO_PER_PX));
        assert_exact_cover(&chunks, &Region::from(bounds));

        // Everything of the priority rect not yet emitted comes next.
        let mut pending = Region::from(priority);
        for r in &chunks[..before] {
            pending.subtract_rect(*r);
        }
        let mut emitted = 0;
        for r in &chunks[before..] {
            if emitted == pending.area() {
                break;
            }
            assert!(
                priority.contains_rect(*r),
                "{r:?} emitted before priority drained"
            );
            emitted += r.area();
        }
        assert_eq!(emitted, pending.area());
    }

    #[test]
    fn clearing_priority_restores_main_order() {
        let clock = ManualClock::default();
        let bounds = Rectangle::new(0, 0, 256, 256);
        let priority = Rectangle::new(128, 128, 128, 128);
        let mut iter = iter_over(Region::from(bounds), &clock);
        iter.set_priority_rect(Some(priority));

        assert!(iter.next_pass());
        let first = iter.get_rect().unwrap();
        assert!(priority.contains_rect(first));
        assert_eq!(iter.state(), ChunkState::Scanning { priority: true });

        iter.set_priority_rect(None);
        let mut chunks = Vec::from([first]);
        chunks.extend(drain(&mut iter, &clock, MICRO_PER_PX));
        assert_exact_cover(&chunks, &Region::from(bounds));
        assert_eq!(chunks[1].y, 0, "main region resumes at its top-left");
    }

    #[test]
    fn stop_mid_drain_returns_the_remainder() {
        let clock = ManualClock::default();
        let bounds = Rectangle::new(0, 0, 1024, 768);
        let mut iter = iter_over(Region::from(bounds), &clock);

        assert!(iter.next_pass());
        let mut chunks = burst(&mut iter, &clock, MICRO_PER_PX);
        let rest = iter.stop(false).unwrap();

        let emitted: u64 = chunks.iter().map(|r| r.area()).sum();
        assert_eq!(rest.area() + emitted, bounds.area());
        assert!(chunks.iter().all(|r| !rest.overlaps(*r)));

        let mut resumed = iter_over(rest, &clock);
        chunks.extend(drain(&mut resumed, &clock, MICRO_PER_PX));
        assert_exact_cover(&chunks, &Region::from(bounds));
    }

    #[test]
    fn stop_after_drain_is_empty() {
        let clock = ManualClock::default();
        let mut iter = iter_over(Region::from(Rectangle::new(0, 0, 300, 200)), &clock);
        let _ = drain(&mut iter, &clock, MICRO_PER_PX);
        let rest = iter.stop(false).unwrap();
        assert!(rest.is_empty());
    }

    #[test]
    fn stop_with_discard_returns_nothing() {
        let clock = ManualClock::default();
        let iter = iter_over(Region::from(Rectangle::new(0, 0, 300, 200)), &clock);
        assert!(iter.stop(true).is_none());
    }

    #[test]
    fn interval_change_rescales_target() {
        let clock = ManualClock::default();
        let mut iter = iter_over(Region::from(Rectangle::new(0, 0, 8192, 8192)), &clock);

        assert!(iter.next_pass());
        let first = burst(&mut iter, &clock, MICRO_PER_PX);
        let before = iter.target_area();
        let last_area = first.last().unwrap().area();

        iter.set_interval(2.0 / 15.0);
        let after = iter.target_area();
        assert!(
            (after / before - 2.0).abs() < 1e-9,
            "target went from {before} to {after}"
        );

        assert!(iter.next_pass());
        let next = iter.get_rect().unwrap();
        assert!(
            next.area() as f64 >= 1.8 * last_area as f64,
            "chunk grew from {last_area} to {}",
            next.area()
        );
    }

    #[test]
    fn negative_interval_clamps_to_zero() {
        let clock = ManualClock::default();
        let mut iter = iter_over(Region::from(Rectangle::new(0, 0, 64, 64)), &clock);
        iter.set_interval(-1.0);
        assert_eq!(iter.interval(), 0.0);
    }

    #[test]
    fn mid_row_height_correction_conserves_pixels() {
        let clock = ManualClock::default();
        let bounds = Rectangle::new(0, 0, 16_384, 4_096);
        let mut iter = iter_over(Region::from(bounds), &clock);

        let mut cost = 10_u64;
        let mut chunks: Vec<Rectangle> = Vec::new();
        let mut corrected = None;
        'passes: for _ in 0..64 {
            assert!(iter.next_pass(), "region drained before any correction");
            while let Some(rect) = iter.get_rect() {
                clock.advance(Duration(rect.area() * cost));
                if let Some(&prev) = chunks.last() {
                    if rect.y == prev.y && rect.x > bounds.x && rect.height < prev.height {
                        corrected = Some((prev, rect));
                        chunks.push(rect);
                        break 'passes;
                    }
                }
                if rect.height >= 512 {
                    // Rendering becomes drastically more expensive.
                    cost = 1_000_000;
                }
                chunks.push(rect);
            }
        }

        let (prev, rect) = corrected.expect("row height was never corrected");
        assert_eq!(rect.x, prev.right(), "band continues where it stopped");

        let rest = iter.stop(false).unwrap();
        let mut all = Region::from_rects(chunks.iter().copied());
        assert_eq!(
            all.area(),
            chunks.iter().map(|r| r.area()).sum::<u64>(),
            "chunks overlap"
        );
        assert!(chunks.iter().all(|r| !rest.overlaps(*r)));
        all.union(&rest);
        assert_eq!(all.area(), bounds.area());
    }

    #[test]
    fn tiny_rects_still_reach_the_time_check() {
        let clock = ManualClock::default();
        // 400 separate 10x10 rectangles, far apart.
        let region: Region = (0..400)
            .map(|i| Rectangle::new((i % 20) * 20, (i / 20) * 20, 10, 10))
            .collect();
        let mut iter = iter_over(region.clone(), &clock);
        // 200 µs per pixel: one rect costs 20 ms.
        iter.set_interval(0.05);

        assert!(iter.next_pass());
        let first = burst(&mut iter, &clock, 200_000);
        assert!(first.len() < 400, "burst never yielded");

        let mut chunks = first;
        chunks.extend(drain(&mut iter, &clock, 200_000));
        assert_exact_cover(&chunks, &region);
    }

    #[test]
    fn thousands_of_scattered_rects_drain_in_linear_steps() {
        let clock = ManualClock::default();
        // 4000 separate 8x8 rectangles on a 16 px pitch.
        let region: Region = (0..4_000)
            .map(|i| Rectangle::new((i % 64) * 16, (i / 64) * 16, 8, 8))
            .collect();
        assert_eq!(region.as_slice().len(), 4_000);
        let mut iter = iter_over(region.clone(), &clock);

        let started = Instant::now();
        let mut worst = std::time::Duration::ZERO;
        let mut chunks = Vec::new();
        while iter.next_pass() {
            loop {
                let before = Instant::now();
                let next = iter.get_rect();
                worst = worst.max(before.elapsed());
                let Some(rect) = next else { break };
                clock.advance(Duration(rect.area() * MICRO_PER_PX));
                chunks.push(rect);
            }
        }
        let total = started.elapsed();

        assert_eq!(chunks.len(), 4_000);
        assert_exact_cover(&chunks, &region);
        assert!(
            worst.as_secs_f64() < iter.interval() / 4.0,
            "slowest get_rect took {worst:?}"
        );
        assert!(total.as_secs() < 5, "draining took {total:?}");
    }

    #[test]
    fn band_start_falls_back_to_the_cheapest_sample() {
        const CHEAP: u64 = 10_000;
        const EXPENSIVE: u64 = 40_000;

        /// Emits one 64x64 chunk and charges `ns_per_px` for it.
        fn render(iter: &mut TestIter<'_>, clock: &ManualClock, ns_per_px: u64) -> Rectangle {
            let rect = iter.get_rect().expect("burst ended early");
            assert_eq!(
                (rect.width, rect.height),
                (64, 64),
                "unexpected chunk {rect:?}"
            );
            clock.advance(Duration(rect.area() * ns_per_px));
            rect
        }

        fn assert_target(iter: &TestIter<'_>, expected: f64) {
            let target = iter.target_area();
            assert!(
                (target - expected).abs() < 1e-6 * expected,
                "target {target} px, expected {expected}"
            );
        }

        let clock = ManualClock::default();
        // Three chunks per band, all capped at one tile.
        let config = ChunkConfig::DEFAULT
            .with_interval(1.0)
            .with_max_chunk_size(64, 64);
        let bounds = Rectangle::new(0, 0, 192, 256);
        let mut iter = ChunkIterator::with_config(Region::from(bounds), &clock, config);
        iter.set_tile_rect(TILE);
        assert!(iter.next_pass());

        // With a one second interval a sample is 1e9 / (ns per pixel).
        let cheap = 1e9 / CHEAP as f64;
        let expensive = 1e9 / EXPENSIVE as f64;

        render(&mut iter, &clock, CHEAP);
        render(&mut iter, &clock, EXPENSIVE);
        render(&mut iter, &clock, CHEAP);
        // Samples so far: cheap, expensive. The upper one wins the median.
        assert_target(&iter, cheap);

        let second_band = render(&mut iter, &clock, CHEAP);
        assert_eq!(second_band.y, 64);
        assert_target(&iter, expensive);

        render(&mut iter, &clock, EXPENSIVE);
        iter.set_interval(2.0);
        assert_target(&iter, 2.0 * cheap);

        // The new expensive sample is outvoted by the rescaled cheap one.
        render(&mut iter, &clock, CHEAP);
        assert_target(&iter, 2.0 * cheap);

        let third_band = render(&mut iter, &clock, CHEAP);
        assert_eq!(third_band.y, 128);
        assert_target(&iter, 2.0 * expensive);
    }

    #[test]
    fn empty_region_reports_exhaustion() {
        let clock = ManualClock::default();
        let mut iter = iter_over(Region::new(), &clock);
        assert_eq!(iter.state(), ChunkState::Empty);
        assert!(!iter.next_pass());
        assert_eq!(iter.state(), ChunkState::Exhausted);
        assert!(!iter.next_pass());
    }

    #[test]
    fn states_follow_the_scan() {
        let clock = ManualClock::default();
        let mut iter = iter_over(Region::from(Rectangle::new(0, 0, 64, 64)), &clock);
        assert_eq!(iter.state(), ChunkState::NeedNextRect);

        assert!(iter.next_pass());
        let rect = iter.get_rect().unwrap();
        assert_eq!(rect, Rectangle::new(0, 0, 64, 64));
        assert_eq!(iter.state(), ChunkState::Empty);

        assert_eq!(iter.get_rect(), None);
        assert!(!iter.next_pass());
        assert_eq!(iter.state(), ChunkState::Exhausted);
    }

    #[test]
    fn chunks_end_on_tile_lines() {
        let clock = ManualClock::default();
        let tile = Rectangle::new(5, 3, 32, 32);
        let mut iter = ChunkIterator::new(Region::from(Rectangle::new(0, 0, 600, 400)), &clock);
        iter.set_tile_rect(tile);

        let chunks = drain(&mut iter, &clock, MICRO_PER_PX);
        for r in &chunks {
            let ends_on_grid = (r.right() - tile.x).rem_euclid(32) == 0;
            let spans_tile = r.width >= 32;
            assert!(
                !spans_tile || ends_on_grid || r.right() == 600,
                "{r:?} does not end on the tile grid"
            );
        }
    }

    #[test]
    fn snapping_keeps_at_least_one_pixel() {
        assert_eq!(snap_to_grid(0, 64, 100.0), 64);
        assert_eq!(snap_to_grid(30, 64, 20.0), 20);
        assert_eq!(snap_to_grid(60, 64, 10.0), 4);
        assert_eq!(snap_to_grid(-4, 64, 10.0), 4);
        assert_eq!(snap_to_grid(0, 64, 0.2), 1);
        assert_eq!(snap_to_grid(0, 64, f64::NAN), 1);
        assert_eq!(snap_to_grid(0, 64, f64::INFINITY), i32::MAX - i32::MAX % 64);
    }

    #[test]
    #[should_panic(expected = "set_tile_rect must be called before iterating")]
    fn next_pass_without_tile_rect_panics() {
        let clock = ManualClock::default();
        let mut iter: TestIter<'_> =
            ChunkIterator::new(Region::from(Rectangle::new(0, 0, 8, 8)), &clock);
        let _ = iter.next_pass();
    }

    #[test]
    #[should_panic(expected = "next_pass must be called before get_rect")]
    fn get_rect_before_next_pass_panics() {
        let clock = ManualClock::default();
        let mut iter = iter_over(Region::from(Rectangle::new(0, 0, 8, 8)), &clock);
        let _ = iter.get_rect();
    }

    #[test]
    #[should_panic(expected = "tile rect must not be empty")]
    fn empty_tile_rect_panics() {
        let clock = ManualClock::default();
        let mut iter = iter_over(Region::new(), &clock);
        iter.set_tile_rect(Rectangle::new(0, 0, 0, 64));
    }

    #[test]
    #[should_panic(expected = "priority rect must not be empty")]
    fn empty_priority_rect_panics() {
        let clock = ManualClock::default();
        let mut iter = iter_over(Region::new(), &clock);
        iter.set_priority_rect(Some(Rectangle::ZERO));
    }
}
