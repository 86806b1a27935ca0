// Copyright 2026 the Quilt Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel storage the applicator reads from and writes to.

use alloc::vec;
use alloc::vec::Vec;

use quilt_core::rect::Rectangle;

/// A two-dimensional pixel store addressed in absolute coordinates.
///
/// The applicator only needs three things from a buffer: its bounds, a way
/// to allocate a scratch buffer of the same kind, and rectangle copies.
pub trait PixelBuffer {
    /// Bounds of the stored pixels.
    fn extent(&self) -> Rectangle;

    /// Allocates a buffer of the same kind covering `extent`.
    #[must_use]
    fn new_like(&self, extent: Rectangle) -> Self
    where
        Self: Sized;

    /// Copies `src_rect` of `src` into `dst_rect` of `self`.
    ///
    /// Both rectangles must have the same size and lie within their
    /// buffer's extent.
    fn copy_rect(&mut self, src: &Self, src_rect: Rectangle, dst_rect: Rectangle);
}

/// A row-major, `Vec`-backed [`PixelBuffer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Buffer<P> {
    extent: Rectangle,
    pixels: Vec<P>,
}

impl<P: Copy + Default> Buffer<P> {
    /// Creates a buffer covering `extent`, filled with `P::default()`.
    #[must_use]
    pub fn new(extent: Rectangle) -> Self {
        Self::filled(extent, P::default())
    }

    /// Creates a buffer covering `extent`, filled with `value`.
    #[must_use]
    pub fn filled(extent: Rectangle, value: P) -> Self {
        let len = extent.width.max(0) as usize * extent.height.max(0) as usize;
        Self {
            extent,
            pixels: vec![value; len],
        }
    }

    /// Returns the pixel at `(x, y)`, or `None` outside the extent.
    #[must_use]
    pub fn get(&self, x: i32, y: i32) -> Option<P> {
        self.index(x, y).map(|i| self.pixels[i])
    }

    /// Writes the pixel at `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `(x, y)` is outside the extent.
    pub fn set(&mut self, x: i32, y: i32, value: P) {
        let Some(i) = self.index(x, y) else {
            panic!("pixel ({x}, {y}) is outside {:?}", self.extent);
        };
        self.pixels[i] = value;
    }

    /// Fills the part of `rect` that lies within the extent.
    pub fn fill_rect(&mut self, rect: Rectangle, value: P) {
        let rect = rect.intersect(self.extent);
        for y in rect.y..rect.bottom() {
            let row = self.row_range(rect.x, y, rect.width);
            self.pixels[row].fill(value);
        }
    }

    /// All pixels in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[P] {
        &self.pixels
    }

    fn index(&self, x: i32, y: i32) -> Option<usize> {
        if !self.extent.contains_point(x, y) {
            return None;
        }
        let col = (x - self.extent.x) as usize;
        let row = (y - self.extent.y) as usize;
        Some(row * self.extent.width as usize + col)
    }

    fn row_range(&self, x: i32, y: i32, width: i32) -> core::ops::Range<usize> {
        let start = (y - self.extent.y) as usize * self.extent.width as usize
            + (x - self.extent.x) as usize;
        start..start + width as usize
    }
}

impl<P: Copy + Default> PixelBuffer for Buffer<P> {
    fn extent(&self) -> Rectangle {
        self.extent
    }

    fn new_like(&self, extent: Rectangle) -> Self {
        Self::new(extent)
    }

    fn copy_rect(&mut self, src: &Self, src_rect: Rectangle, dst_rect: Rectangle) {
        assert!(
            src_rect.width == dst_rect.width && src_rect.height == dst_rect.height,
            "copy size mismatch: {src_rect:?} -> {dst_rect:?}"
        );
        assert!(
            src.extent.contains_rect(src_rect) || src_rect.is_empty(),
            "{src_rect:?} is outside the source extent {:?}",
            src.extent
        );
        assert!(
            self.extent.contains_rect(dst_rect) || dst_rect.is_empty(),
            "{dst_rect:?} is outside the destination extent {:?}",
            self.extent
        );

        for dy in 0..src_rect.height {
            let from = src.row_range(src_rect.x, src_rect.y + dy, src_rect.width);
            let to = self.row_range(dst_rect.x, dst_rect.y + dy, dst_rect.width);
            self.pixels[to].copy_from_slice(&src.pixels[from]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_and_set_use_absolute_coordinates() {
        let mut buf = Buffer::<u8>::new(Rectangle::new(10, 20, 4, 3));
        buf.set(13, 22, 9);
        assert_eq!(buf.get(13, 22), Some(9));
        assert_eq!(buf.get(0, 0), None);
        assert_eq!(buf.pixels()[11], 9);
    }

    #[test]
    fn fill_rect_clips_to_extent() {
        let mut buf = Buffer::<u8>::new(Rectangle::new(0, 0, 4, 4));
        buf.fill_rect(Rectangle::new(2, 2, 10, 10), 1);
        let ones = buf.pixels().iter().filter(|&&p| p == 1).count();
        assert_eq!(ones, 4);
        assert_eq!(buf.get(1, 1), Some(0));
    }

    #[test]
    fn copy_rect_moves_pixels_between_offsets() {
        let mut src = Buffer::<u16>::new(Rectangle::new(0, 0, 8, 8));
        src.fill_rect(Rectangle::new(1, 1, 2, 2), 5);

        let mut dst = src.new_like(Rectangle::new(100, 100, 8, 8));
        dst.copy_rect(
            &src,
            Rectangle::new(1, 1, 2, 2),
            Rectangle::new(104, 104, 2, 2),
        );

        assert_eq!(dst.get(104, 104), Some(5));
        assert_eq!(dst.get(105, 105), Some(5));
        assert_eq!(dst.get(103, 104), Some(0));
        assert_eq!(dst.extent(), Rectangle::new(100, 100, 8, 8));
    }

    #[test]
    #[should_panic(expected = "copy size mismatch")]
    fn copy_rect_rejects_mismatched_sizes() {
        let src = Buffer::<u8>::new(Rectangle::new(0, 0, 8, 8));
        let mut dst = Buffer::<u8>::new(Rectangle::new(0, 0, 8, 8));
        dst.copy_rect(&src, Rectangle::new(0, 0, 2, 2), Rectangle::new(0, 0, 3, 2));
    }

    #[test]
    #[should_panic(expected = "is outside")]
    fn set_outside_panics() {
        let mut buf = Buffer::<u8>::new(Rectangle::new(0, 0, 2, 2));
        buf.set(2, 0, 1);
    }
}
