// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for chunked rendering.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! render loop calls around each burst. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`ApplySummaryBuilder`] accumulates pass results during a run and produces
//! an [`ApplySummary`] at the end.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates [`ChunkEvent`] and the
//!   corresponding `TraceSink` method, which fire once per chunk.

use crate::rect::Rectangle;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Why a burst ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PassEndReason {
    /// The burst used up its time interval; more work remains.
    TimeBudget,
    /// The region is fully drained.
    Exhausted,
    /// The caller's cancellation flag was observed.
    Cancelled,
    /// The renderer reported an error.
    Failed,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a burst starts.
#[derive(Clone, Copy, Debug)]
pub struct PassBeginEvent {
    /// Zero-based burst counter.
    pub pass_index: u64,
    /// Host time at the start of the burst.
    pub timestamp: HostTime,
    /// Pixels still waiting to be rendered.
    pub remaining_area: u64,
    /// Target chunk area going into the burst, in pixels.
    pub target_area: f64,
}

/// Emitted when a burst ends.
#[derive(Clone, Copy, Debug)]
pub struct PassEndEvent {
    /// Zero-based burst counter.
    pub pass_index: u64,
    /// Host time at the end of the burst.
    pub timestamp: HostTime,
    /// Chunks rendered during the burst.
    pub chunks: u32,
    /// Pixels rendered during the burst.
    pub area: u64,
    /// Why the burst ended.
    pub reason: PassEndReason,
}

/// Emitted when a cached rectangle is copied instead of rendered.
#[derive(Clone, Copy, Debug)]
pub struct CacheReuseEvent {
    /// The reused rectangle, already clipped to the destination.
    pub rect: Rectangle,
}

/// A single chunk handed to the renderer.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct ChunkEvent {
    /// Burst the chunk belongs to.
    pub pass_index: u64,
    /// Host time just before rendering.
    pub timestamp: HostTime,
    /// The chunk.
    pub rect: Rectangle,
    /// Target area the chunk was sized for.
    pub target_area: f64,
}

/// Whole-run summary produced by [`ApplySummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct ApplySummary {
    /// Number of bursts.
    pub passes: u64,
    /// Number of chunks rendered.
    pub chunks: u64,
    /// Pixels produced by the renderer.
    pub rendered_pixels: u64,
    /// Pixels copied from the cache.
    pub reused_pixels: u64,
    /// Pixels in the destination rectangle.
    pub total_pixels: u64,
    /// Host time when the run started.
    pub start: HostTime,
    /// Host time when the run finished.
    pub end: HostTime,
    /// Whether the run was cancelled.
    pub cancelled: bool,
}

impl ApplySummary {
    /// Run duration in ticks.
    #[must_use]
    pub fn duration_ticks(&self) -> u64 {
        self.end.saturating_duration_since(self.start).ticks()
    }
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the render loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a burst starts.
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        _ = e;
    }

    /// Called when a burst ends.
    fn on_pass_end(&mut self, e: &PassEndEvent) {
        _ = e;
    }

    /// Called when a cached rectangle is reused.
    fn on_cache_reuse(&mut self, e: &CacheReuseEvent) {
        _ = e;
    }

    /// Called once with the whole-run summary.
    fn on_apply_summary(&mut self, s: &ApplySummary) {
        _ = s;
    }

    /// Called for every chunk (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_chunk(&mut self, e: &ChunkEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer<'_> {
    fn default() -> Self {
        Self::none()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`PassBeginEvent`].
    #[inline]
    pub fn pass_begin(&mut self, e: &PassBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pass_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PassEndEvent`].
    #[inline]
    pub fn pass_end(&mut self, e: &PassEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_pass_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CacheReuseEvent`].
    #[inline]
    pub fn cache_reuse(&mut self, e: &CacheReuseEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_cache_reuse(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits an [`ApplySummary`].
    #[inline]
    pub fn apply_summary(&mut self, s: &ApplySummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_apply_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits a [`ChunkEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn chunk(&mut self, e: &ChunkEvent) {
        if let Some(s) = &mut self.sink {
            s.on_chunk(e);
        }
    }
}

// ---------------------------------------------------------------------------
// ApplySummaryBuilder
// ---------------------------------------------------------------------------

/// Accumulates pass results during a run and produces an [`ApplySummary`].
#[derive(Clone, Copy, Debug)]
pub struct ApplySummaryBuilder {
    start: HostTime,
    total_pixels: u64,
    passes: u64,
    chunks: u64,
    rendered_pixels: u64,
    reused_pixels: u64,
}

impl ApplySummaryBuilder {
    /// Starts a summary for a run over `total_pixels` beginning at `start`.
    #[must_use]
    pub fn new(start: HostTime, total_pixels: u64) -> Self {
        Self {
            start,
            total_pixels,
            passes: 0,
            chunks: 0,
            rendered_pixels: 0,
            reused_pixels: 0,
        }
    }

    /// Folds a finished burst into the totals.
    pub fn record_pass(&mut self, e: &PassEndEvent) {
        self.passes += 1;
        self.chunks += u64::from(e.chunks);
        self.rendered_pixels += e.area;
    }

    /// Adds pixels that were copied from the cache.
    pub fn record_reuse(&mut self, area: u64) {
        self.reused_pixels += area;
    }

    /// Pixels rendered or reused so far.
    #[must_use]
    pub fn done_pixels(&self) -> u64 {
        self.rendered_pixels + self.reused_pixels
    }

    /// Produces the final [`ApplySummary`].
    #[must_use]
    pub fn finish(&self, end: HostTime, cancelled: bool) -> ApplySummary {
        ApplySummary {
            passes: self.passes,
            chunks: self.chunks,
            rendered_pixels: self.rendered_pixels,
            reused_pixels: self.reused_pixels,
            total_pixels: self.total_pixels,
            start: self.start,
            end,
            cancelled,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_begin() -> PassBeginEvent {
        PassBeginEvent {
            pass_index: 3,
            timestamp: HostTime(1_000_000),
            remaining_area: 65_536,
            target_area: 4096.0,
        }
    }

    fn sample_end(chunks: u32, area: u64) -> PassEndEvent {
        PassEndEvent {
            pass_index: 3,
            timestamp: HostTime(1_066_667),
            chunks,
            area,
            reason: PassEndReason::TimeBudget,
        }
    }

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_pass_begin(&sample_begin());
        sink.on_pass_end(&sample_end(2, 8192));
        sink.on_cache_reuse(&CacheReuseEvent {
            rect: Rectangle::new(0, 0, 8, 8),
        });
        sink.on_apply_summary(&ApplySummaryBuilder::new(HostTime(0), 0).finish(HostTime(0), false));
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.pass_begin(&sample_begin());
        tracer.pass_end(&sample_end(1, 64));
    }

    #[test]
    fn summary_builder_accumulates() {
        let mut builder = ApplySummaryBuilder::new(HostTime(100), 10_000);
        builder.record_pass(&sample_end(3, 4_000));
        builder.record_reuse(1_000);
        builder.record_pass(&sample_end(2, 5_000));
        assert_eq!(builder.done_pixels(), 10_000);

        let summary = builder.finish(HostTime(600), false);
        assert_eq!(summary.passes, 2);
        assert_eq!(summary.chunks, 5);
        assert_eq!(summary.rendered_pixels, 9_000);
        assert_eq!(summary.reused_pixels, 1_000);
        assert_eq!(summary.duration_ticks(), 500);
        assert!(!summary.cancelled);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            passes: Vec<u64>,
        }
        impl TraceSink for RecordingSink {
            fn on_pass_begin(&mut self, e: &PassBeginEvent) {
                self.passes.push(e.pass_index);
            }
        }

        let mut sink = RecordingSink { passes: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.pass_begin(&sample_begin());
        // Access sink after tracer is dropped.
        drop(tracer);
        assert_eq!(sink.passes, &[3]);
    }
}
