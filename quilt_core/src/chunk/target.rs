// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Target chunk area estimation.

/// Number of recent samples the median filter looks at.
pub(crate) const HISTORY_SIZE: usize = 3;

/// Median-filtered estimate of how many pixels fit in one interval.
///
/// Samples come from a proportional controller (observed area scaled by
/// `interval / elapsed`). The smoothed value is the median of the last
/// [`HISTORY_SIZE`] samples; with an even count the upper middle sample
/// wins. The running minimum since the last [`reanchor`](Self::reanchor)
/// is kept as the conservative fallback.
#[derive(Clone, Copy, Debug)]
pub(crate) struct TargetArea {
    value: f64,
    min: f64,
    history: [f64; HISTORY_SIZE],
    cursor: usize,
    len: usize,
}

impl TargetArea {
    pub(crate) const fn new() -> Self {
        Self {
            value: 0.0,
            min: f64::INFINITY,
            history: [0.0; HISTORY_SIZE],
            cursor: 0,
            len: 0,
        }
    }

    /// Current estimate, or `fallback` before the first sample.
    pub(crate) fn get(&self, fallback: f64) -> f64 {
        if self.value > 0.0 {
            self.value
        } else {
            fallback
        }
    }

    /// Number of samples since the last re-anchor.
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) fn observe(&mut self, sample: f64) {
        self.min = self.min.min(sample);

        self.history[self.cursor] = sample;
        self.cursor = (self.cursor + 1) % HISTORY_SIZE;
        self.len = (self.len + 1).min(HISTORY_SIZE);

        let mut sorted = self.history;
        let window = &mut sorted[..self.len];
        window.sort_unstable_by(f64::total_cmp);
        self.value = window[self.len / 2];
    }

    /// Restarts estimation from the smallest sample seen so far.
    ///
    /// Does nothing if no sample has arrived since the last re-anchor.
    pub(crate) fn reanchor(&mut self) {
        if self.len == 0 {
            return;
        }
        self.value = self.min;
        self.min = f64::INFINITY;
        self.cursor = 0;
        self.len = 0;
    }

    /// Scales the estimate, its history and minimum by `ratio`.
    pub(crate) fn rescale(&mut self, ratio: f64) {
        self.value *= ratio;
        if self.min.is_finite() {
            self.min *= ratio;
        }
        for slot in &mut self.history {
            *slot *= ratio;
        }
    }
}
