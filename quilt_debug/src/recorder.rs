// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].

use quilt_core::rect::Rectangle;
use quilt_core::time::HostTime;
use quilt_core::trace::{
    ApplySummary, CacheReuseEvent, ChunkEvent, PassBeginEvent, PassEndEvent, PassEndReason,
    TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_PASS_BEGIN: u8 = 1;
const TAG_PASS_END: u8 = 2;
const TAG_CACHE_REUSE: u8 = 3;
const TAG_APPLY_SUMMARY: u8 = 4;
const TAG_CHUNK: u8 = 5;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.write_u64(v.to_bits());
    }

    fn write_rect(&mut self, r: Rectangle) {
        self.write_i32(r.x);
        self.write_i32(r.y);
        self.write_i32(r.width);
        self.write_i32(r.height);
    }

    fn write_reason(&mut self, reason: PassEndReason) {
        self.write_u8(match reason {
            PassEndReason::TimeBudget => 0,
            PassEndReason::Exhausted => 1,
            PassEndReason::Cancelled => 2,
            PassEndReason::Failed => 3,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_pass_begin(&mut self, e: &PassBeginEvent) {
        self.write_u8(TAG_PASS_BEGIN);
        self.write_u64(e.pass_index);
        self.write_u64(e.timestamp.ticks());
        self.write_u64(e.remaining_area);
        self.write_f64(e.target_area);
    }

    fn on_pass_end(&mut self, e: &PassEndEvent) {
        self.write_u8(TAG_PASS_END);
        self.write_u64(e.pass_index);
        self.write_u64(e.timestamp.ticks());
        self.write_u32(e.chunks);
        self.write_u64(e.area);
        self.write_reason(e.reason);
    }

    fn on_cache_reuse(&mut self, e: &CacheReuseEvent) {
        self.write_u8(TAG_CACHE_REUSE);
        self.write_rect(e.rect);
    }

    fn on_apply_summary(&mut self, s: &ApplySummary) {
        self.write_u8(TAG_APPLY_SUMMARY);
        self.write_u64(s.passes);
        self.write_u64(s.chunks);
        self.write_u64(s.rendered_pixels);
        self.write_u64(s.reused_pixels);
        self.write_u64(s.total_pixels);
        self.write_u64(s.start.ticks());
        self.write_u64(s.end.ticks());
        self.write_u8(u8::from(s.cancelled));
    }

    fn on_chunk(&mut self, e: &ChunkEvent) {
        self.write_u8(TAG_CHUNK);
        self.write_u64(e.pass_index);
        self.write_u64(e.timestamp.ticks());
        self.write_rect(e.rect);
        self.write_f64(e.target_area);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`PassBeginEvent`].
    PassBegin(PassBeginEvent),
    /// A [`PassEndEvent`].
    PassEnd(PassEndEvent),
    /// A [`CacheReuseEvent`].
    CacheReuse(CacheReuseEvent),
    /// An [`ApplySummary`].
    ApplySummary(ApplySummary),
    /// A [`ChunkEvent`].
    Chunk(ChunkEvent),
}

impl RecordedEvent {
    /// Sends the event to `sink` as if it were happening live.
    pub fn replay(&self, sink: &mut dyn TraceSink) {
        match self {
            Self::PassBegin(e) => sink.on_pass_begin(e),
            Self::PassEnd(e) => sink.on_pass_end(e),
            Self::CacheReuse(e) => sink.on_cache_reuse(e),
            Self::ApplySummary(s) => sink.on_apply_summary(s),
            Self::Chunk(e) => sink.on_chunk(e),
        }
    }
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?.try_into().ok()?;
        self.pos += N;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        Some(self.take::<1>()?[0])
    }

    fn read_u32(&mut self) -> Option<u32> {
        Some(u32::from_le_bytes(self.take()?))
    }

    fn read_i32(&mut self) -> Option<i32> {
        Some(i32::from_le_bytes(self.take()?))
    }

    fn read_u64(&mut self) -> Option<u64> {
        Some(u64::from_le_bytes(self.take()?))
    }

    fn read_f64(&mut self) -> Option<f64> {
        Some(f64::from_bits(self.read_u64()?))
    }

    fn read_rect(&mut self) -> Option<Rectangle> {
        let x = self.read_i32()?;
        let y = self.read_i32()?;
        let width = self.read_i32()?;
        let height = self.read_i32()?;
        if width < 0 || height < 0 {
            return None;
        }
        Some(Rectangle::new(x, y, width, height))
    }

    fn read_reason(&mut self) -> Option<PassEndReason> {
        Some(match self.read_u8()? {
            0 => PassEndReason::TimeBudget,
            1 => PassEndReason::Exhausted,
            2 => PassEndReason::Cancelled,
            3 => PassEndReason::Failed,
            _ => return None,
        })
    }

    fn decode_pass_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PassBegin(PassBeginEvent {
            pass_index: self.read_u64()?,
            timestamp: HostTime(self.read_u64()?),
            remaining_area: self.read_u64()?,
            target_area: self.read_f64()?,
        }))
    }

    fn decode_pass_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PassEnd(PassEndEvent {
            pass_index: self.read_u64()?,
            timestamp: HostTime(self.read_u64()?),
            chunks: self.read_u32()?,
            area: self.read_u64()?,
            reason: self.read_reason()?,
        }))
    }

    fn decode_cache_reuse(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CacheReuse(CacheReuseEvent {
            rect: self.read_rect()?,
        }))
    }

    fn decode_apply_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ApplySummary(ApplySummary {
            passes: self.read_u64()?,
            chunks: self.read_u64()?,
            rendered_pixels: self.read_u64()?,
            reused_pixels: self.read_u64()?,
            total_pixels: self.read_u64()?,
            start: HostTime(self.read_u64()?),
            end: HostTime(self.read_u64()?),
            cancelled: self.read_u8()? != 0,
        }))
    }

    fn decode_chunk(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Chunk(ChunkEvent {
            pass_index: self.read_u64()?,
            timestamp: HostTime(self.read_u64()?),
            rect: self.read_rect()?,
            target_area: self.read_f64()?,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_PASS_BEGIN => self.decode_pass_begin(),
            TAG_PASS_END => self.decode_pass_end(),
            TAG_CACHE_REUSE => self.decode_cache_reuse(),
            TAG_APPLY_SUMMARY => self.decode_apply_summary(),
            TAG_CHUNK => self.decode_chunk(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
