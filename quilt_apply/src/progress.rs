// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Progress reporting and cooperative cancellation.

use alloc::sync::Arc;
use core::sync::atomic::{AtomicBool, Ordering};

/// Receives the completed fraction of an application run.
pub trait Progress {
    /// Reports `fraction` in `[0, 1]`.
    fn set_value(&mut self, fraction: f64);
}

impl<F: FnMut(f64)> Progress for F {
    fn set_value(&mut self, fraction: f64) {
        self(fraction);
    }
}

/// A shared cancellation flag.
///
/// Clones share the flag, so one clone can be handed to the applicator while
/// another is cancelled from elsewhere, including another thread. The
/// applicator polls it once per burst; a chunk that has started always
/// finishes.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Returns `true` once [`cancel`](Self::cancel) was called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}
