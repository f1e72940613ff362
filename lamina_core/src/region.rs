// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pixel regions as sets of disjoint rectangles.
//!
//! Occlusion is accumulated as a [`Region`]: opaque layers are unioned in,
//! surfaces with filters carve holes back out. Regions here stay small (a
//! handful of rectangles per render target), so a flat list of
//! non-overlapping rectangles is enough.

use alloc::vec::Vec;
use kurbo::Rect;

use crate::geometry::RectExt;

/// A set of pixels represented as non-overlapping rectangles.
///
/// The decomposition is not canonical. Two regions covering the same pixels
/// compare equal even if their rectangle lists differ.
#[derive(Clone, Debug, Default)]
pub struct Region {
    rects: Vec<Rect>,
}

impl Region {
    /// Creates an empty region.
    #[must_use]
    pub const fn new() -> Self {
        Self { rects: Vec::new() }
    }

    /// Creates a region covering `rect`.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        let mut r = Self::new();
        r.union_rect(rect);
        r
    }

    /// Creates a region covering every rectangle in `rects`.
    #[must_use]
    pub fn from_rects(rects: impl IntoIterator<Item = Rect>) -> Self {
        let mut r = Self::new();
        for rect in rects {
            r.union_rect(rect);
        }
        r
    }

    /// Returns `true` if the region covers nothing.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rects.is_empty()
    }

    /// Removes everything.
    pub fn clear(&mut self) {
        self.rects.clear();
    }

    /// The disjoint rectangles making up the region.
    #[inline]
    #[must_use]
    pub fn rects(&self) -> &[Rect] {
        &self.rects
    }

    /// Returns the smallest rectangle containing the region, or
    /// [`Rect::ZERO`] when empty.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        self.rects
            .iter()
            .fold(Rect::ZERO, |acc, r| acc.bounding_union(*r))
    }

    /// Total covered area.
    #[must_use]
    pub fn area(&self) -> f64 {
        self.rects.iter().map(|r| r.width() * r.height()).sum()
    }

    /// Returns `true` if every pixel of `rect` is covered.
    #[must_use]
    pub fn contains_rect(&self, rect: Rect) -> bool {
        if rect.is_empty_area() {
            return true;
        }
        let mut rest = Self::from_rect(rect);
        rest.subtract_region(self);
        rest.is_empty()
    }

    /// Returns `true` if the region shares area with `rect`.
    #[must_use]
    pub fn intersects(&self, rect: Rect) -> bool {
        self.rects.iter().any(|r| r.intersects_area(rect))
    }

    /// Adds `rect` to the region.
    pub fn union_rect(&mut self, rect: Rect) {
        if rect.is_empty_area() {
            return;
        }
        // Keep only the parts of `rect` not already covered.
        let mut pieces = alloc::vec![rect];
        for existing in &self.rects {
            if pieces.is_empty() {
                return;
            }
            let mut next = Vec::with_capacity(pieces.len());
            for p in pieces {
                subtract_into(p, *existing, &mut next);
            }
            pieces = next;
        }
        self.rects.extend(pieces);
    }

    /// Adds every pixel of `other`.
    pub fn union_region(&mut self, other: &Self) {
        for r in &other.rects {
            self.union_rect(*r);
        }
    }

    /// Removes `rect` from the region.
    pub fn subtract_rect(&mut self, rect: Rect) {
        if rect.is_empty_area() || self.rects.is_empty() {
            return;
        }
        let mut out = Vec::with_capacity(self.rects.len());
        for r in self.rects.drain(..) {
            subtract_into(r, rect, &mut out);
        }
        self.rects = out;
    }

    /// Removes every pixel of `other`.
    pub fn subtract_region(&mut self, other: &Self) {
        for r in &other.rects {
            self.subtract_rect(*r);
        }
    }

    /// Keeps only the part of the region inside `rect`.
    pub fn intersect_rect(&mut self, rect: Rect) {
        self.rects = self
            .rects
            .iter()
            .map(|r| r.clip_to(rect))
            .filter(|r| !r.is_empty_area())
            .collect();
    }

    /// Keeps only the part of the region also covered by `other`.
    pub fn intersect_region(&mut self, other: &Self) {
        let mut out = Self::new();
        for a in &self.rects {
            for b in &other.rects {
                let c = a.clip_to(*b);
                if !c.is_empty_area() {
                    // Pieces of disjoint inputs are themselves disjoint.
                    out.rects.push(c);
                }
            }
        }
        *self = out;
    }
}

impl From<Rect> for Region {
    fn from(rect: Rect) -> Self {
        Self::from_rect(rect)
    }
}

impl PartialEq for Region {
    fn eq(&self, other: &Self) -> bool {
        let mut a = self.clone();
        a.subtract_region(other);
        if !a.is_empty() {
            return false;
        }
        let mut b = other.clone();
        b.subtract_region(self);
        b.is_empty()
    }
}

/// Pushes the parts of `a` outside `b` onto `out`, as at most four bands.
fn subtract_into(a: Rect, b: Rect, out: &mut Vec<Rect>) {
    let overlap = a.clip_to(b);
    if overlap.is_empty_area() {
        out.push(a);
        return;
    }
    let mut push = |r: Rect| {
        if !r.is_empty_area() {
            out.push(r);
        }
    };
    push(Rect::new(a.x0, a.y0, a.x1, overlap.y0));
    push(Rect::new(a.x0, overlap.y1, a.x1, a.y1));
    push(Rect::new(a.x0, overlap.y0, overlap.x0, overlap.y1));
    push(Rect::new(overlap.x1, overlap.y0, a.x1, overlap.y1));
}
