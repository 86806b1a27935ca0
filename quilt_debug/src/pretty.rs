// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Timestamps
//! are converted to microseconds using a [`Timebase`].

use std::io::Write;

use quilt_core::rect::Rectangle;
use quilt_core::time::{HostTime, Timebase};
use quilt_core::trace::{
    ApplySummary, CacheReuseEvent, ChunkEvent, PassBeginEvent, PassEndEvent, PassEndReason,
    TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    timebase: Timebase,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("timebase", &self.timebase)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr(timebase: Timebase) -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
            timebase,
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W, timebase: Timebase) -> Self {
        Self { writer, timebase }
    }

    /// Consumes the sink and returns its writer.
    #[must_use]
    pub fn into_inner(self) -> W {
        self.writer
    }

    fn ticks_to_us(&self, ticks: u64) -> f64 {
        self.timebase.ticks_to_nanos(ticks) as f64 / 1000.0
    }

    fn host_us(&self, t: HostTime) -> f64 {
        self.ticks_to_us(t.ticks())
    }
}

fn reason_name(reason: PassEndReason) -> &'static str {
    match reason {
        PassEndReason::TimeBudget => "budget",
        PassEndReason::Exhausted => "exhausted",
        PassEndReason::Cancelled => "CANCELLED",
        PassEndReason::Failed => "FAILED",
    }
}

struct Geometry(Rectangle);

impl std::fmt::Display for Geometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let r = self.0;
        write!(f, "{}x{}+{}+{}", r.width, r.height, r.x, r.y)
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[pass:begin] pass={} at {:.1}µs remaining={}px target={:.0}px",
            e.pass_index,
            self.host_us(e.timestamp),
            e.remaining_area,
            e.target_area,
        );
    }

    fn on_pass_end(&mut self, e: &PassEndEvent) {
        let _ = writeln!(
            self.writer,
            "[pass:end] pass={} at {:.1}µs chunks={} area={}px {}",
            e.pass_index,
            self.host_us(e.timestamp),
            e.chunks,
            e.area,
            reason_name(e.reason),
        );
    }

    fn on_cache_reuse(&mut self, e: &CacheReuseEvent) {
        let _ = writeln!(
            self.writer,
            "[cache] reused {} ({}px)",
            Geometry(e.rect),
            e.rect.area(),
        );
    }

    fn on_apply_summary(&mut self, s: &ApplySummary) {
        let status = if s.cancelled { "CANCELLED" } else { "ok" };
        let _ = writeln!(
            self.writer,
            "[summary] passes={} chunks={} rendered={}px reused={}px total={}px \
             took={:.1}µs status={status}",
            s.passes,
            s.chunks,
            s.rendered_pixels,
            s.reused_pixels,
            s.total_pixels,
            self.ticks_to_us(s.duration_ticks()),
        );
    }

    fn on_chunk(&mut self, e: &ChunkEvent) {
        let _ = writeln!(
            self.writer,
            "[chunk] pass={} {} at {:.1}µs target={:.0}px",
            e.pass_index,
            Geometry(e.rect),
            self.host_us(e.timestamp),
            e.target_area,
        );
    }
}
