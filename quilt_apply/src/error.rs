// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use core::fmt;

/// Errors from building or stepping an
/// [`IncrementalApplicator`](crate::IncrementalApplicator).
///
/// Cancellation is not an error; it is reported as
/// [`ApplyStatus::Cancelled`](crate::ApplyStatus::Cancelled).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyError<E> {
    /// The builder was finished without a renderer.
    MissingRenderer,
    /// The renderer failed on a chunk.
    Render(E),
    /// A previous step already failed; the run cannot continue.
    Poisoned,
}

impl<E: fmt::Display> fmt::Display for ApplyError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRenderer => f.write_str("no renderer was provided"),
            Self::Render(e) => write!(f, "renderer failed: {e}"),
            Self::Poisoned => f.write_str("applicator failed on an earlier step"),
        }
    }
}

impl<E: core::error::Error + 'static> core::error::Error for ApplyError<E> {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Render(e) => Some(e),
            Self::MissingRenderer | Self::Poisoned => None,
        }
    }
}
