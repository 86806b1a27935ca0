// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adaptive chunked-rendering scheduler over integer pixel regions.
//!
//! `quilt_core` splits a large, possibly irregular area that must be
//! recomputed by an expensive operation into a stream of right-sized
//! rectangles, so the owning application can interleave rendering with its
//! own event handling while still making steady progress. It is `no_std`
//! compatible (with `alloc`) and performs no I/O of its own.
//!
//! # Architecture
//!
//! The caller describes the dirty area as a region, hands it to a
//! [`ChunkIterator`](chunk::ChunkIterator), and drives it in bursts:
//!
//! ```text
//!   Region ──► ChunkIterator::new() ──► set_tile_rect()
//!                     │
//!      ┌──────────────┘
//!      ▼
//!   next_pass() ──► get_rect() ──► render(rect) ──┐
//!      ▲                ▲                         │
//!      │                └─────────────────────────┘
//!      │          (None: time budget spent, yield)
//!      └──────── caller's event loop ─────────────┘
//!
//!   next_pass() == false ──► stop() ──► residual Region
//! ```
//!
//! **[`rect`]**: Integer [`Rectangle`](rect::Rectangle) with kurbo
//! interop.
//!
//! **[`region`]**: The [`SpatialRegionSet`](region::SpatialRegionSet)
//! contract and the rectangle-list [`Region`](region::Region) that
//! implements it.
//!
//! **[`chunk`]**: The feedback-controlled chunk iterator: raster scanning,
//! priority sub-areas, time-budgeted bursts.
//!
//! **[`time`]**: Monotonic tick types and timebase conversion.
//!
//! **[`clock`]**: The [`Clock`](clock::Clock) trait the iterator reads
//! wall-clock time through, plus manual and monotonic implementations.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! render-loop instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies and
//!   the [`MonotonicClock`](clock::MonotonicClock).
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-chunk
//!   events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

#[cfg(feature = "std")]
extern crate std;

pub mod chunk;
pub mod clock;
pub mod rect;
pub mod region;
pub mod time;
pub mod trace;
