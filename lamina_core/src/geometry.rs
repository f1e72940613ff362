// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle semantics used by the draw-property and occlusion passes.
//!
//! [`kurbo::Rect`] is the rectangle type throughout the crate. Content, clip
//! and target rectangles hold integral coordinates; mapped rectangles may be
//! fractional until they are rounded with [`RectExt::to_enclosing`] (outward)
//! or [`RectExt::to_enclosed`] (inward).
//!
//! The extension trait adds "empty-aware" operations: an intersection that
//! collapses to [`Rect::ZERO`] when the inputs do not overlap, and a union
//! that ignores empty operands. Both match how clip and content rectangles
//! are accumulated during a calculation pass.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::{Point, Rect, Size, Vec2};

/// Rectangle operations with empty-rect semantics.
pub trait RectExt: Sized {
    /// Returns `true` if the rectangle covers no area.
    fn is_empty_area(&self) -> bool;

    /// Returns the overlap of two rectangles, or [`Rect::ZERO`] when they do
    /// not overlap or either is empty.
    fn clip_to(&self, other: Rect) -> Rect;

    /// Returns the smallest rectangle containing both, ignoring empty
    /// operands.
    fn bounding_union(&self, other: Rect) -> Rect;

    /// Rounds outward to integral coordinates.
    fn to_enclosing(&self) -> Rect;

    /// Rounds inward to integral coordinates. Collapses to zero size when no
    /// whole pixel fits.
    fn to_enclosed(&self) -> Rect;

    /// Returns `true` if `other` lies completely inside `self`.
    ///
    /// An empty `other` is contained only if its origin is inside.
    fn encloses(&self, other: Rect) -> bool;

    /// Returns `true` if the two rectangles share some area.
    fn intersects_area(&self, other: Rect) -> bool;

    /// Returns the rectangle moved by `delta`.
    fn translated(&self, delta: Vec2) -> Rect;

    /// Moves each edge inward by the given amounts. Negative values grow the
    /// rectangle. The size never goes below zero.
    fn inset_edges(&self, left: f64, top: f64, right: f64, bottom: f64) -> Rect;
}

impl RectExt for Rect {
    #[inline]
    fn is_empty_area(&self) -> bool {
        !(self.x1 > self.x0 && self.y1 > self.y0)
    }

    fn clip_to(&self, other: Rect) -> Rect {
        if self.is_empty_area() || other.is_empty_area() {
            return Rect::ZERO;
        }
        let x0 = self.x0.max(other.x0);
        let y0 = self.y0.max(other.y0);
        let x1 = self.x1.min(other.x1);
        let y1 = self.y1.min(other.y1);
        if x0 >= x1 || y0 >= y1 {
            return Rect::ZERO;
        }
        Rect::new(x0, y0, x1, y1)
    }

    fn bounding_union(&self, other: Rect) -> Rect {
        if self.is_empty_area() {
            return other;
        }
        if other.is_empty_area() {
            return *self;
        }
        Rect::new(
            self.x0.min(other.x0),
            self.y0.min(other.y0),
            self.x1.max(other.x1),
            self.y1.max(other.y1),
        )
    }

    fn to_enclosing(&self) -> Rect {
        Rect::new(
            self.x0.floor(),
            self.y0.floor(),
            self.x1.ceil(),
            self.y1.ceil(),
        )
    }

    fn to_enclosed(&self) -> Rect {
        let x0 = self.x0.ceil();
        let y0 = self.y0.ceil();
        let x1 = self.x1.floor().max(x0);
        let y1 = self.y1.floor().max(y0);
        Rect::new(x0, y0, x1, y1)
    }

    fn encloses(&self, other: Rect) -> bool {
        other.x0 >= self.x0 && other.x1 <= self.x1 && other.y0 >= self.y0 && other.y1 <= self.y1
    }

    fn intersects_area(&self, other: Rect) -> bool {
        !self.clip_to(other).is_empty_area()
    }

    #[inline]
    fn translated(&self, delta: Vec2) -> Rect {
        Rect::new(
            self.x0 + delta.x,
            self.y0 + delta.y,
            self.x1 + delta.x,
            self.y1 + delta.y,
        )
    }

    fn inset_edges(&self, left: f64, top: f64, right: f64, bottom: f64) -> Rect {
        let x0 = self.x0 + left;
        let y0 = self.y0 + top;
        let x1 = (self.x1 - right).max(x0);
        let y1 = (self.y1 - bottom).max(y0);
        Rect::new(x0, y0, x1, y1)
    }
}

/// Returns the rectangle `(0, 0, size)`.
#[inline]
#[must_use]
pub fn rect_from_size(size: Size) -> Rect {
    Rect::new(0.0, 0.0, size.width, size.height)
}

/// Returns `true` if the size has no area.
#[inline]
#[must_use]
pub fn size_is_empty(size: Size) -> bool {
    !(size.width > 0.0 && size.height > 0.0)
}

/// A point in three dimensions.
///
/// Used for transform origins, where `z` shifts the pivot along the depth
/// axis.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point3 {
    /// Horizontal component.
    pub x: f64,
    /// Vertical component.
    pub y: f64,
    /// Depth component.
    pub z: f64,
}

impl Point3 {
    /// The origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0, 0.0);

    /// Creates a point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// An arbitrary quadrilateral given by four corners in order.
///
/// A quad built from a rectangle starts at the top-left corner and winds
/// clockwise in a y-down coordinate system.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Quad {
    /// The four corners.
    pub points: [Point; 4],
}

impl Quad {
    /// Creates a quad from four corners.
    #[inline]
    #[must_use]
    pub const fn new(p1: Point, p2: Point, p3: Point, p4: Point) -> Self {
        Self {
            points: [p1, p2, p3, p4],
        }
    }

    /// Creates the quad covering `rect`.
    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        Self::new(
            Point::new(rect.x0, rect.y0),
            Point::new(rect.x1, rect.y0),
            Point::new(rect.x1, rect.y1),
            Point::new(rect.x0, rect.y1),
        )
    }

    /// Returns the smallest axis-aligned rectangle containing all corners.
    #[must_use]
    pub fn bounding_box(&self) -> Rect {
        let mut x0 = self.points[0].x;
        let mut y0 = self.points[0].y;
        let mut x1 = x0;
        let mut y1 = y0;
        for p in &self.points[1..] {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Rect::new(x0, y0, x1, y1)
    }

    /// Returns `true` if the quad is an axis-aligned rectangle.
    #[must_use]
    pub fn is_rectilinear(&self) -> bool {
        let [a, b, c, d] = self.points;
        (a.x == b.x && b.y == c.y && c.x == d.x && d.y == a.y)
            || (a.y == b.y && b.x == c.x && c.y == d.y && d.x == a.x)
    }

    /// Returns the quad moved by `delta`.
    #[must_use]
    pub fn translated(&self, delta: Vec2) -> Self {
        let [a, b, c, d] = self.points;
        Self::new(a + delta, b + delta, c + delta, d + delta)
    }
}
