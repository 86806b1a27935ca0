// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use quilt_core::rect::Rectangle;
use quilt_core::time::Timebase;

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// Each pass becomes a `B`/`E` span; chunks, cache reuse and the run summary
/// become instant events. Cache reuse carries no timestamp of its own and is
/// placed at the most recent timestamp seen, or zero before any.
///
/// Timestamps are converted to microseconds using the provided [`Timebase`].
pub fn export(bytes: &[u8], timebase: Timebase, writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();
    let mut last_us = 0.0;

    for recorded in decode(bytes) {
        match recorded {
            RecordedEvent::PassBegin(e) => {
                last_us = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "B",
                    "name": "Pass",
                    "cat": "Chunking",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "pass_index": e.pass_index,
                        "remaining_area": e.remaining_area,
                        "target_area": e.target_area,
                    }
                }));
            }
            RecordedEvent::PassEnd(e) => {
                last_us = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "E",
                    "name": "Pass",
                    "cat": "Chunking",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "args": {
                        "pass_index": e.pass_index,
                        "chunks": e.chunks,
                        "area": e.area,
                        "reason": format!("{:?}", e.reason),
                    }
                }));
            }
            RecordedEvent::Chunk(e) => {
                last_us = ticks_to_us(e.timestamp.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "Chunk",
                    "cat": "Rich",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "pass_index": e.pass_index,
                        "rect": rect_json(e.rect),
                        "target_area": e.target_area,
                    }
                }));
            }
            RecordedEvent::CacheReuse(e) => {
                events.push(json!({
                    "ph": "i",
                    "name": "CacheReuse",
                    "cat": "Cache",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "t",
                    "args": {
                        "rect": rect_json(e.rect),
                        "area": e.rect.area(),
                    }
                }));
            }
            RecordedEvent::ApplySummary(s) => {
                last_us = ticks_to_us(s.end.ticks(), timebase);
                events.push(json!({
                    "ph": "i",
                    "name": "ApplySummary",
                    "cat": "Summary",
                    "ts": last_us,
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "passes": s.passes,
                        "chunks": s.chunks,
                        "rendered_pixels": s.rendered_pixels,
                        "reused_pixels": s.reused_pixels,
                        "total_pixels": s.total_pixels,
                        "duration_us": ticks_to_us(s.duration_ticks(), timebase),
                        "cancelled": s.cancelled,
                    }
                }));
            }
        }
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn ticks_to_us(ticks: u64, timebase: Timebase) -> f64 {
    timebase.ticks_to_nanos(ticks) as f64 / 1000.0
}

fn rect_json(r: Rectangle) -> Value {
    json!([r.x, r.y, r.width, r.height])
}
