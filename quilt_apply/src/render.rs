// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The operation applied chunk by chunk.

use core::fmt;

use quilt_core::rect::Rectangle;

/// How a renderer reads its input, which decides whether in-place rendering
/// is safe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderKind {
    /// Each output pixel depends only on the input pixel at the same
    /// position.
    PointFilter,
    /// Output does not depend on the input at all.
    SourceOnly,
    /// Output pixels may depend on any input pixels.
    General,
}

impl RenderKind {
    /// Whether input and output may be the same buffer.
    #[must_use]
    pub const fn is_in_place_safe(self) -> bool {
        matches!(self, Self::PointFilter | Self::SourceOnly)
    }
}

/// Where the applicator's input pixels come from.
pub enum Source<'a, B> {
    /// The renderer has no input.
    None,
    /// A buffer distinct from the destination.
    Separate(&'a B),
    /// The destination itself.
    Aliased,
}

impl<B> Clone for Source<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for Source<'_, B> {}

impl<B> fmt::Debug for Source<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Separate(_) => f.write_str("Separate(..)"),
            Self::Aliased => f.write_str("Aliased"),
        }
    }
}

/// The input handed to a single [`Renderer::render`] call.
pub enum Input<'a, B> {
    /// No input.
    None,
    /// Read from this buffer; it is never the one being written.
    Buffer(&'a B),
    /// Read from the output buffer itself. Only passed to renderers whose
    /// [`RenderKind`] is in-place safe.
    Output,
}

impl<B> Clone for Input<'_, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<B> Copy for Input<'_, B> {}

impl<B> fmt::Debug for Input<'_, B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Buffer(_) => f.write_str("Buffer(..)"),
            Self::Output => f.write_str("Output"),
        }
    }
}

/// An operation that fills rectangles of an output buffer.
///
/// `render` is called with rectangles that lie inside the destination
/// rectangle, in no particular order. Each call must fill exactly `rect` and
/// must not depend on earlier calls for correctness.
pub trait Renderer<B> {
    /// Failure reported for a single rectangle.
    type Error;

    /// Fills `rect` of `output`.
    fn render(
        &mut self,
        rect: Rectangle,
        input: Input<'_, B>,
        output: &mut B,
    ) -> Result<(), Self::Error>;

    /// How this renderer reads its input.
    fn kind(&self) -> RenderKind {
        RenderKind::General
    }
}

impl<B, T: Renderer<B> + ?Sized> Renderer<B> for &mut T {
    type Error = T::Error;

    #[inline]
    fn render(
        &mut self,
        rect: Rectangle,
        input: Input<'_, B>,
        output: &mut B,
    ) -> Result<(), T::Error> {
        (**self).render(rect, input, output)
    }

    #[inline]
    fn kind(&self) -> RenderKind {
        (**self).kind()
    }
}

/// A [`Renderer`] built from a closure.
pub struct FnRenderer<F> {
    f: F,
    kind: RenderKind,
}

impl<F> FnRenderer<F> {
    /// Wraps `f` as a [`RenderKind::General`] renderer.
    #[must_use]
    pub fn new<B, E>(f: F) -> Self
    where
        F: FnMut(Rectangle, Input<'_, B>, &mut B) -> Result<(), E>,
    {
        Self {
            f,
            kind: RenderKind::General,
        }
    }

    /// Returns a copy that reports `kind` instead.
    #[must_use]
    pub fn with_kind(self, kind: RenderKind) -> Self {
        Self { f: self.f, kind }
    }
}

impl<F> fmt::Debug for FnRenderer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnRenderer")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl<B, E, F> Renderer<B> for FnRenderer<F>
where
    F: FnMut(Rectangle, Input<'_, B>, &mut B) -> Result<(), E>,
{
    type Error = E;

    fn render(&mut self, rect: Rectangle, input: Input<'_, B>, output: &mut B) -> Result<(), E> {
        (self.f)(rect, input, output)
    }

    fn kind(&self) -> RenderKind {
        self.kind
    }
}
