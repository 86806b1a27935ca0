// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sets of disjoint pixel rectangles.
//!
//! [`SpatialRegionSet`] is the contract the chunk iterator needs from a
//! region: set algebra against rectangles and other regions, enumeration,
//! and an emptiness test. Any 2-D region library can back it; the crate
//! ships [`Region`], a plain rectangle list.
//!
//! # Invariant
//!
//! Every operation preserves exact coverage. A union covers exactly the
//! pixels of both inputs, a subtraction removes exactly the overlap, and no
//! two stored rectangles ever share a pixel.

use alloc::vec::Vec;
use core::fmt;

use crate::rect::Rectangle;

/// The region operations the chunk iterator relies on.
///
/// `copy` is expressed through [`Clone`]; an empty region is
/// [`Default::default`].
pub trait SpatialRegionSet: Clone + Default {
    /// Adds every pixel of `rect` to the region.
    fn union_rect(&mut self, rect: Rectangle);

    /// Removes every pixel of `rect` from the region.
    fn subtract_rect(&mut self, rect: Rectangle);

    /// Keeps only the pixels that also lie inside `rect`.
    fn intersect_rect(&mut self, rect: Rectangle);

    /// Adds every pixel of `other` to the region.
    fn union(&mut self, other: &Self);

    /// Keeps only the pixels that also lie inside `other`.
    fn intersect(&mut self, other: &Self);

    /// Returns `true` if the region covers no pixels.
    fn is_empty(&self) -> bool;

    /// Returns one rectangle of the region, chosen deterministically, or
    /// `None` if the region is empty.
    fn first_rect(&self) -> Option<Rectangle>;

    /// Enumerates the disjoint rectangles making up the region.
    fn rects(&self) -> impl Iterator<Item = Rectangle> + '_;

    /// Number of pixels covered.
    fn area(&self) -> u64 {
        self.rects().map(Rectangle::area).sum()
    }
}

/// A region stored as a list of disjoint, non-empty rectangles.
///
/// After each mutation, rectangles that share a full edge are merged, which
/// keeps the list short when a region is repeatedly split and re-merged.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Region {
    rects: Vec<Rectangle>,
}

impl Region {
    /// The empty region.
    pub const EMPTY: Self = Self { rects: Vec::new() };

    /// Creates an empty region.
    #[must_use]
    pub const fn new() -> Self {
        Self::EMPTY
    }

    /// Creates a region covering the union of the given rectangles.
    ///
    /// Overlapping inputs are fine; the stored rectangles are disjoint.
    #[must_use]
    pub fn from_rects(rects: impl IntoIterator<Item = Rectangle>) -> Self {
        let mut region = Self::new();
        for rect in rects {
            region.union_rect(rect);
        }
        region
    }

    /// Returns the stored rectangles.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Rectangle] {
        &self.rects
    }

    /// Returns the smallest rectangle containing the region.
    #[must_use]
    pub fn bounding_box(&self) -> Rectangle {
        self.rects
            .iter()
            .fold(Rectangle::ZERO, |acc, r| acc.bounding_union(*r))
    }

    /// Returns `true` if the pixel at `(x, y)` belongs to the region.
    #[must_use]
    pub fn contains_point(&self, x: i32, y: i32) -> bool {
        self.rects.iter().any(|r| r.contains_point(x, y))
    }

    /// Returns `true` if the region shares at least one pixel with `rect`.
    #[must_use]
    pub fn overlaps(&self, rect: Rectangle) -> bool {
        self.rects.iter().any(|r| r.overlaps(rect))
    }

    /// Removes everything from the region.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// Stores `rect`, which must not overlap the region, merging it with any
    /// stored rectangle it shares a full edge with.
    ///
    /// Stored rectangles never share a full edge with each other, so only
    /// the incoming rectangle (and what it grows into) needs checking. Each
    /// merge removes a stored rectangle, which bounds the loop.
    fn insert_merged(&mut self, mut rect: Rectangle) {
        while let Some((i, merged)) = self
            .rects
            .iter()
            .enumerate()
            .find_map(|(i, r)| merge_adjacent(*r, rect).map(|m| (i, m)))
        {
            self.rects.swap_remove(i);
            rect = merged;
        }
        self.rects.push(rect);
    }

    /// Replaces the contents with `rects`, which must be pairwise disjoint.
    fn rebuild(&mut self, rects: Vec<Rectangle>) {
        self.rects.clear();
        for rect in rects {
            self.insert_merged(rect);
        }
    }
}

impl SpatialRegionSet for Region {
    fn union_rect(&mut self, rect: Rectangle) {
        if rect.is_empty() {
            return;
        }
        // Only the parts of `rect` not already covered are added.
        let mut pieces = Vec::from([rect]);
        for existing in &self.rects {
            if !pieces.iter().any(|p| p.overlaps(*existing)) {
                continue;
            }
            let mut next = Vec::with_capacity(pieces.len() + 3);
            for piece in pieces {
                subtract_into(piece, *existing, &mut next);
            }
            pieces = next;
            if pieces.is_empty() {
                return;
            }
        }
        for piece in pieces {
            self.insert_merged(piece);
        }
    }

    fn subtract_rect(&mut self, rect: Rectangle) {
        if rect.is_empty() {
            return;
        }
        // Only rectangles that overlap `rect` are touched. Removing a stored
        // rectangle exactly leaves no pieces behind.
        let mut pieces = Vec::new();
        let mut i = 0;
        while i < self.rects.len() {
            let existing = self.rects[i];
            if existing.overlaps(rect) {
                self.rects.swap_remove(i);
                subtract_into(existing, rect, &mut pieces);
            } else {
                i += 1;
            }
        }
        for piece in pieces {
            self.insert_merged(piece);
        }
    }

    fn intersect_rect(&mut self, rect: Rectangle) {
        let clipped = self
            .rects
            .iter()
            .map(|r| r.intersect(rect))
            .filter(|r| !r.is_empty())
            .collect();
        self.rebuild(clipped);
    }

    fn union(&mut self, other: &Self) {
        for rect in &other.rects {
            self.union_rect(*rect);
        }
    }

    fn intersect(&mut self, other: &Self) {
        // Both operands are disjoint, so the pairwise overlaps are too.
        let mut out = Vec::new();
        for a in &self.rects {
            for b in &other.rects {
                let i = a.intersect(*b);
                if !i.is_empty() {
                    out.push(i);
                }
            }
        }
        self.rebuild(out);
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    fn first_rect(&self) -> Option<Rectangle> {
        self.rects.iter().copied().min_by_key(|r| (r.y, r.x))
    }

    fn rects(&self) -> impl Iterator<Item = Rectangle> + '_ {
        self.rects.iter().copied()
    }
}

impl From<Rectangle> for Region {
    fn from(rect: Rectangle) -> Self {
        let mut region = Self::new();
        region.union_rect(rect);
        region
    }
}

impl FromIterator<Rectangle> for Region {
    fn from_iter<I: IntoIterator<Item = Rectangle>>(iter: I) -> Self {
        Self::from_rects(iter)
    }
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rects.iter()).finish()
    }
}

/// Pushes the parts of `a` lying outside `b` (at most four rectangles).
fn subtract_into(a: Rectangle, b: Rectangle, out: &mut Vec<Rectangle>) {
    let i = a.intersect(b);
    if i.is_empty() {
        out.push(a);
        return;
    }
    let pieces = [
        // Full-width band above the overlap.
        Rectangle::from_edges(a.x, a.y, a.right(), i.y),
        // Full-width band below it.
        Rectangle::from_edges(a.x, i.bottom(), a.right(), a.bottom()),
        // Left and right of the overlap, within its rows.
        Rectangle::from_edges(a.x, i.y, i.x, i.bottom()),
        Rectangle::from_edges(i.right(), i.y, a.right(), i.bottom()),
    ];
    out.extend(pieces.into_iter().filter(|p| !p.is_empty()));
}

/// Returns the union of two rectangles if it is itself a rectangle.
fn merge_adjacent(a: Rectangle, b: Rectangle) -> Option<Rectangle> {
    if a.x == b.x && a.width == b.width {
        if a.bottom() == b.y {
            return Some(Rectangle::new(a.x, a.y, a.width, a.height + b.height));
        }
        if b.bottom() == a.y {
            return Some(Rectangle::new(a.x, b.y, a.width, a.height + b.height));
        }
    }
    if a.y == b.y && a.height == b.height {
        if a.right() == b.x {
            return Some(Rectangle::new(a.x, a.y, a.width + b.width, a.height));
        }
        if b.right() == a.x {
            return Some(Rectangle::new(b.x, a.y, a.width + b.width, a.height));
        }
    }
    None
}
