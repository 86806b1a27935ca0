// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tuning constants for the [`ChunkIterator`](super::ChunkIterator).

/// Configuration for the [`ChunkIterator`](super::ChunkIterator).
///
/// The defaults are tuned as a set. Changing any of them means re-checking
/// that bursts still end close to `interval`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChunkConfig {
    /// Wall-clock budget for one burst, in seconds.
    pub interval: f64,
    /// Hard cap on chunk width, in pixels.
    pub max_chunk_width: i32,
    /// Hard cap on chunk height, in pixels.
    pub max_chunk_height: i32,
    /// Smallest processed area, in pixels, that counts as a timing sample.
    pub min_sample_area: u64,
    /// A mid-row chunk larger than this multiple of the target area forces
    /// the row height to be recomputed.
    pub max_area_ratio: f64,
}

impl ChunkConfig {
    /// Default configuration: 1/15 s bursts, 4096 px caps.
    pub const DEFAULT: Self = Self {
        interval: 1.0 / 15.0,
        max_chunk_width: 4096,
        max_chunk_height: 4096,
        min_sample_area: 4096,
        max_area_ratio: 2.0,
    };

    /// Returns a copy with a different burst interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: f64) -> Self {
        self.interval = interval;
        self
    }

    /// Returns a copy with different chunk size caps.
    #[must_use]
    pub const fn with_max_chunk_size(mut self, width: i32, height: i32) -> Self {
        self.max_chunk_width = width;
        self.max_chunk_height = height;
        self
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
