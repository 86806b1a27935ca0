// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Simulated chunked refresh that exercises the tracing and diagnostics
//! pipeline.
//!
//! Renders a 1920×1080 canvas on a simulated clock, with part of it reused
//! from a cache and a viewport that moves halfway through. Events are
//! recorded with a [`RecorderSink`](quilt_debug::recorder::RecorderSink),
//! replayed into a [`PrettyPrintSink`](quilt_debug::pretty::PrettyPrintSink),
//! and exported as a Chrome trace JSON file.

use std::convert::Infallible;
use std::error::Error;
use std::fs::File;
use std::io::BufWriter;

use quilt_apply::{ApplicatorBuilder, Buffer, FnRenderer, Input, RenderKind, Step};
use quilt_core::clock::ManualClock;
use quilt_core::rect::Rectangle;
use quilt_core::region::SpatialRegionSet;
use quilt_core::time::{Duration, HostTime, Timebase};
use quilt_core::trace::Tracer;

use quilt_debug::pretty::PrettyPrintSink;
use quilt_debug::recorder::{RecorderSink, decode};

const CANVAS: Rectangle = Rectangle::new(0, 0, 1920, 1080);
/// Rows still valid from the previous frame.
const CACHED: Rectangle = Rectangle::new(0, 0, 1920, 120);
const VIEWPORT: Rectangle = Rectangle::new(320, 200, 640, 360);
const MOVED_VIEWPORT: Rectangle = Rectangle::new(1100, 600, 640, 360);
/// Event-loop time between bursts.
const FRAME_GAP_NS: u64 = 16_666_667;
const BASE_COST_NS: u64 = 150;
/// Pixels inside this band cost ten times as much.
const EXPENSIVE_BAND: Rectangle = Rectangle::new(0, 700, 1920, 200);

fn main() -> Result<(), Box<dyn Error>> {
    let timebase = Timebase::NANOS;
    let clock = ManualClock::new(HostTime(1_000_000_000));

    let mut recorder = RecorderSink::new();
    let mut canvas = Buffer::filled(CANVAS, 0_u32);
    let cache = Buffer::filled(CANVAS, 0xcafe_u32);

    let renderer = FnRenderer::new(
        |rect: Rectangle, _: Input<'_, Buffer<u32>>, out: &mut Buffer<u32>| {
            let expensive = rect.intersect(EXPENSIVE_BAND).area();
            let cost = rect.area() * BASE_COST_NS + expensive * BASE_COST_NS * 9;
            clock.advance(Duration(cost));
            out.fill_rect(rect, 0xf00d);
            Ok::<(), Infallible>(())
        },
    )
    .with_kind(RenderKind::SourceOnly);

    let mut last_fraction = 0.0;
    let mut progress = |fraction: f64| last_fraction = fraction;

    let mut applicator = ApplicatorBuilder::new(&mut canvas, &clock)
        .renderer(renderer)
        .cache(&cache, [CACHED])
        .priority_rect(VIEWPORT)
        .interval(1.0 / 30.0)
        .progress(&mut progress)
        .tracer(Tracer::new(&mut recorder))
        .build()?;

    let mut bursts = 0_u32;
    loop {
        match applicator.step()? {
            Step::Yield => {
                bursts += 1;
                if bursts == 3 {
                    applicator.set_priority_rect(Some(MOVED_VIEWPORT));
                }
                clock.advance(Duration(FRAME_GAP_NS));
            }
            Step::Done(status) => {
                println!("Run finished after {} bursts: {status:?}", bursts + 1);
                break;
            }
        }
    }
    let remaining = applicator.into_remaining();
    println!(
        "Progress reached {:.0}%, {} pixels left",
        last_fraction * 100.0,
        remaining.area(),
    );
    assert_eq!(canvas.get(0, 0), Some(0xcafe), "cached rows are copied");
    assert_eq!(canvas.get(1919, 1079), Some(0xf00d), "the rest is rendered");

    // -- replay to stdout --------------------------------------------------
    let mut pretty = PrettyPrintSink::new(Box::new(std::io::stdout()), timebase);
    for event in decode(recorder.as_bytes()) {
        event.replay(&mut pretty);
    }

    // -- export Chrome trace -----------------------------------------------
    let path = "trace.json";
    let mut writer = BufWriter::new(File::create(path)?);
    quilt_debug::chrome::export(recorder.as_bytes(), timebase, &mut writer)?;

    println!("Wrote {path}");
    Ok(())
}
