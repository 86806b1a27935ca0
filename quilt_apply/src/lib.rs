// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Incremental, cancellable application of a renderer over a pixel buffer.
//!
//! This crate drives a [`ChunkIterator`](quilt_core::chunk::ChunkIterator)
//! on behalf of the caller. It defines:
//!
//! - [`PixelBuffer`] and the `Vec`-backed [`Buffer`] it ships with
//! - [`Renderer`]: the operation applied chunk by chunk, and
//!   [`FnRenderer`] for closures
//! - [`Progress`] and [`CancelToken`]: progress reporting and cooperative
//!   cancellation
//! - [`IncrementalApplicator`]: the burst loop itself, with cache reuse and
//!   read/write aliasing protection, configured through
//!   [`ApplicatorBuilder`]
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` in `quilt_core`.
//! - `trace` (disabled by default): Emits pass and summary events through
//!   the [`Tracer`](quilt_core::trace::Tracer).
//! - `trace-rich` (disabled by default, implies `trace`): Also emits one
//!   event per chunk.

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod applicator;
mod buffer;
mod error;
mod progress;
mod render;

pub use applicator::{ApplicatorBuilder, ApplyStatus, IncrementalApplicator, Step};
pub use buffer::{Buffer, PixelBuffer};
pub use error::ApplyError;
pub use progress::{CancelToken, Progress};
pub use render::{FnRenderer, Input, RenderKind, Renderer, Source};
