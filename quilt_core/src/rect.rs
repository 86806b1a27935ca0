// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Integer pixel rectangles.
//!
//! [`Rectangle`] is the unit of work exchanged between the scheduler and its
//! collaborators. Coordinates are whole pixels; a rectangle with zero width
//! or height is empty and covers nothing.

use core::fmt;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// An axis-aligned rectangle in integer pixel coordinates.
///
/// `width` and `height` are never negative. Rectangles with a zero extent are
/// considered empty.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rectangle {
    /// Left edge.
    pub x: i32,
    /// Top edge.
    pub y: i32,
    /// Width in pixels.
    pub width: i32,
    /// Height in pixels.
    pub height: i32,
}

impl Rectangle {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self::new(0, 0, 0, 0);

    /// Creates a rectangle.
    ///
    /// # Panics
    ///
    /// Panics if `width` or `height` is negative.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        assert!(
            width >= 0 && height >= 0,
            "rectangle extent must not be negative"
        );
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle from its edges, or an empty one if they are
    /// inverted.
    #[inline]
    #[must_use]
    pub const fn from_edges(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        if x1 <= x0 || y1 <= y0 {
            Self::ZERO
        } else {
            Self {
                x: x0,
                y: y0,
                width: x1 - x0,
                height: y1 - y0,
            }
        }
    }

    /// Returns `true` if the rectangle covers no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    /// Number of pixels covered.
    #[inline]
    #[must_use]
    pub const fn area(self) -> u64 {
        if self.is_empty() {
            0
        } else {
            self.width as u64 * self.height as u64
        }
    }

    /// Right edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn right(self) -> i32 {
        self.x + self.width
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> i32 {
        self.y + self.height
    }

    /// Returns the overlap of two rectangles, or [`Rectangle::ZERO`].
    #[must_use]
    pub fn intersect(self, other: Self) -> Self {
        Self::from_edges(
            self.x.max(other.x),
            self.y.max(other.y),
            self.right().min(other.right()),
            self.bottom().min(other.bottom()),
        )
    }

    /// Returns `true` if the two rectangles share at least one pixel.
    #[inline]
    #[must_use]
    pub fn overlaps(self, other: Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Returns `true` if every pixel of `other` lies inside `self`.
    ///
    /// An empty `other` is contained in anything.
    #[must_use]
    pub fn contains_rect(self, other: Self) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    /// Returns `true` if the pixel at `(x, y)` lies inside the rectangle.
    #[inline]
    #[must_use]
    pub fn contains_point(self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    /// Returns the smallest rectangle covering both inputs.
    ///
    /// Empty inputs are ignored.
    #[must_use]
    pub fn bounding_union(self, other: Self) -> Self {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        Self::from_edges(
            self.x.min(other.x),
            self.y.min(other.y),
            self.right().max(other.right()),
            self.bottom().max(other.bottom()),
        )
    }

    /// Converts to a floating-point [`kurbo::Rect`].
    #[must_use]
    pub fn to_kurbo(self) -> kurbo::Rect {
        kurbo::Rect::new(
            f64::from(self.x),
            f64::from(self.y),
            f64::from(self.right()),
            f64::from(self.bottom()),
        )
    }

    /// Returns the smallest pixel rectangle covering a floating-point
    /// [`kurbo::Rect`].
    ///
    /// Fractional edges are rounded outward, so partially covered pixels are
    /// included. Non-finite or inverted input yields [`Rectangle::ZERO`].
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "edges are clamped to the i32 range before the cast"
    )]
    pub fn from_kurbo_outer(rect: kurbo::Rect) -> Self {
        let rect = rect.abs();
        if !rect.is_finite() {
            return Self::ZERO;
        }
        let clamp = |v: f64| v.clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32;
        Self::from_edges(
            clamp(rect.x0.floor()),
            clamp(rect.y0.floor()),
            clamp(rect.x1.ceil()),
            clamp(rect.y1.ceil()),
        )
    }
}

impl fmt::Debug for Rectangle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rectangle({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}
