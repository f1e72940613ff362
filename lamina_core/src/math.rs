// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Mapping and projecting geometry through [`Transform3d`].
//!
//! *Mapping* sends points from a layer's plane forward through a transform.
//! *Projecting* goes the other way: a point in the destination plane is cast
//! along the z axis onto the transformed source plane (used with inverse
//! transforms, e.g. to bring a target-space clip back into layer space).
//!
//! Under perspective, corners can land behind the eye (`w <= 0`). Dividing
//! those by `w` flips their signs, so every rectangle operation here clips
//! the quad against a small positive `w` before taking its bounding box.

use kurbo::{Point, Rect, Vec2};

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use crate::geometry::{Quad, RectExt};
use crate::transform::Transform3d;

/// `w` assigned to points interpolated onto the clipping plane.
const CLIP_W: f64 = 0.00001;

/// A point in homogeneous coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HomogeneousPoint {
    /// `x` before perspective division.
    pub x: f64,
    /// `y` before perspective division.
    pub y: f64,
    /// `z` before perspective division.
    pub z: f64,
    /// The homogeneous weight.
    pub w: f64,
}

impl HomogeneousPoint {
    /// Creates a homogeneous point.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Returns `true` if the point lies on or behind the eye plane.
    #[inline]
    #[must_use]
    pub fn should_be_clipped(&self) -> bool {
        self.w <= 0.0
    }

    /// Divides through by `w` and drops `z`.
    #[must_use]
    pub fn to_point(&self) -> Point {
        if self.w == 1.0 {
            return Point::new(self.x, self.y);
        }
        let inv_w = 1.0 / self.w;
        Point::new(self.x * inv_w, self.y * inv_w)
    }
}

fn map_homogeneous(transform: &Transform3d, p: Point) -> HomogeneousPoint {
    let [x, y, z, w] = transform.map_vec4([p.x, p.y, 0.0, 1.0]);
    HomogeneousPoint::new(x, y, z, w)
}

fn project_homogeneous(transform: &Transform3d, p: Point) -> HomogeneousPoint {
    // A plane seen edge-on: every ray through it hits the same line, and the
    // layer is invisible anyway.
    let m22 = transform.get(2, 2);
    if m22 == 0.0 {
        return HomogeneousPoint::new(0.0, 0.0, 0.0, 1.0);
    }
    let z = -(transform.get(2, 0) * p.x + transform.get(2, 1) * p.y + transform.get(2, 3)) / m22;
    let [x, y, z, w] = transform.map_vec4([p.x, p.y, z, 1.0]);
    HomogeneousPoint::new(x, y, z, w)
}

/// Interpolates along the edge `h1`–`h2` to the point where `w == CLIP_W`.
///
/// Exactly one of the endpoints must be clipped.
fn clipped_point_for_edge(h1: HomogeneousPoint, h2: HomogeneousPoint) -> HomogeneousPoint {
    let t = (CLIP_W - h1.w) / (h2.w - h1.w);
    let lerp = |a: f64, b: f64| (1.0 - t) * a + t * b;
    HomogeneousPoint::new(lerp(h1.x, h2.x), lerp(h1.y, h2.y), lerp(h1.z, h2.z), CLIP_W)
}

/// Returns the bounding box of the quad `h1..h4` after clipping it against
/// the `w > 0` half-space.
///
/// Returns [`Rect::ZERO`] when the whole quad is behind the eye.
#[must_use]
pub fn compute_enclosing_clipped_rect(
    h1: HomogeneousPoint,
    h2: HomogeneousPoint,
    h3: HomogeneousPoint,
    h4: HomogeneousPoint,
) -> Rect {
    let c1 = h1.should_be_clipped();
    let c2 = h2.should_be_clipped();
    let c3 = h3.should_be_clipped();
    let c4 = h4.should_be_clipped();

    if !(c1 || c2 || c3 || c4) {
        return Quad::new(h1.to_point(), h2.to_point(), h3.to_point(), h4.to_point())
            .bounding_box();
    }
    if c1 && c2 && c3 && c4 {
        return Rect::ZERO;
    }

    let mut bounds: Option<Rect> = None;
    let mut include = |p: Point| {
        bounds = Some(match bounds {
            None => Rect::new(p.x, p.y, p.x, p.y),
            Some(r) => Rect::new(r.x0.min(p.x), r.y0.min(p.y), r.x1.max(p.x), r.y1.max(p.y)),
        });
    };

    let corners = [(h1, c1), (h2, c2), (h3, c3), (h4, c4)];
    for i in 0..4 {
        let (a, a_clipped) = corners[i];
        let (b, b_clipped) = corners[(i + 1) % 4];
        if !a_clipped {
            include(a.to_point());
        }
        if a_clipped != b_clipped {
            include(clipped_point_for_edge(a, b).to_point());
        }
    }

    bounds.unwrap_or(Rect::ZERO)
}

/// Maps `rect` through `transform` and returns the bounding box of the
/// clipped result.
#[must_use]
pub fn map_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    if transform.is_identity_or_translation() {
        return rect.translated(transform.to_2d_translation());
    }
    let q = Quad::from_rect(rect);
    compute_enclosing_clipped_rect(
        map_homogeneous(transform, q.points[0]),
        map_homogeneous(transform, q.points[1]),
        map_homogeneous(transform, q.points[2]),
        map_homogeneous(transform, q.points[3]),
    )
}

/// Like [`map_clipped_rect`], rounded outward to whole pixels.
#[must_use]
pub fn map_enclosing_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    if transform.is_identity_or_integer_translation() {
        return rect.translated(transform.to_2d_translation());
    }
    map_clipped_rect(transform, rect).to_enclosing()
}

/// Projects `rect` onto the plane described by `transform` and returns the
/// bounding box of the clipped result.
#[must_use]
pub fn project_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    if transform.is_identity_or_translation() {
        return rect.translated(transform.to_2d_translation());
    }
    let q = Quad::from_rect(rect);
    compute_enclosing_clipped_rect(
        project_homogeneous(transform, q.points[0]),
        project_homogeneous(transform, q.points[1]),
        project_homogeneous(transform, q.points[2]),
        project_homogeneous(transform, q.points[3]),
    )
}

/// Like [`project_clipped_rect`], rounded outward to whole pixels.
#[must_use]
pub fn project_enclosing_clipped_rect(transform: &Transform3d, rect: Rect) -> Rect {
    if transform.is_identity_or_integer_translation() {
        return rect.translated(transform.to_2d_translation());
    }
    project_clipped_rect(transform, rect).to_enclosing()
}

/// Maps a single point. The flag reports whether it landed behind the eye,
/// in which case the returned point is meaningless.
#[must_use]
pub fn map_point(transform: &Transform3d, p: Point) -> (Point, bool) {
    finish_point(map_homogeneous(transform, p))
}

/// Projects a single point. The flag reports clipping as for [`map_point`].
#[must_use]
pub fn project_point(transform: &Transform3d, p: Point) -> (Point, bool) {
    finish_point(project_homogeneous(transform, p))
}

fn finish_point(h: HomogeneousPoint) -> (Point, bool) {
    if h.w > 0.0 {
        return (h.to_point(), false);
    }
    if h.w == 0.0 {
        return (Point::ORIGIN, true);
    }
    (h.to_point(), true)
}

/// Maps every corner of `quad`.
///
/// The flag is `true` if any corner landed behind the eye; the quad is then
/// not usable as geometry.
#[must_use]
pub fn map_quad(transform: &Transform3d, quad: Quad) -> (Quad, bool) {
    if transform.is_identity_or_translation() {
        return (quad.translated(transform.to_2d_translation()), false);
    }
    let h = quad.points.map(|p| map_homogeneous(transform, p));
    let clipped = h.iter().any(HomogeneousPoint::should_be_clipped);
    (
        Quad::new(h[0].to_point(), h[1].to_point(), h[2].to_point(), h[3].to_point()),
        clipped,
    )
}

/// Projects every corner of `quad`, reporting clipping as [`map_quad`] does.
#[must_use]
pub fn project_quad(transform: &Transform3d, quad: Quad) -> (Quad, bool) {
    let mut clipped = false;
    let points = quad.points.map(|p| {
        let (q, c) = project_point(transform, p);
        clipped |= c;
        q
    });
    (Quad { points }, clipped)
}

/// Extracts the x and y scale of the 2-D part of `transform`.
///
/// Each component is the length of the transformed unit axis. Transforms
/// with perspective have no single meaningful scale, and yield `fallback`
/// on both axes.
#[must_use]
pub fn compute_transform_2d_scale_components(transform: &Transform3d, fallback: f64) -> Vec2 {
    if transform.has_perspective() {
        return Vec2::new(fallback, fallback);
    }
    let axis = |c: usize| {
        let x = transform.get(0, c);
        let y = transform.get(1, c);
        let z = transform.get(2, c);
        (x * x + y * y + z * z).sqrt()
    };
    Vec2::new(axis(0), axis(1))
}

/// Returns the part of `layer_bound_rect` (layer space) that can appear
/// inside `target_surface_rect` (target space) under `transform`.
#[must_use]
pub fn calculate_visible_rect(
    target_surface_rect: Rect,
    layer_bound_rect: Rect,
    transform: &Transform3d,
) -> Rect {
    let layer_in_surface_space = map_enclosing_clipped_rect(transform, layer_bound_rect);
    calculate_visible_rect_with_cached_layer_rect(
        target_surface_rect,
        layer_bound_rect,
        layer_in_surface_space,
        transform,
    )
}

/// [`calculate_visible_rect`] with the layer's target-space rect already
/// computed.
#[must_use]
pub fn calculate_visible_rect_with_cached_layer_rect(
    target_surface_rect: Rect,
    layer_bound_rect: Rect,
    layer_rect_in_target_space: Rect,
    transform: &Transform3d,
) -> Rect {
    if layer_rect_in_target_space.is_empty_area() {
        return Rect::ZERO;
    }
    if target_surface_rect.encloses(layer_rect_in_target_space) {
        return layer_bound_rect;
    }

    // Only the part of the surface the layer can cover needs projecting.
    // This keeps surface corners behind the eye out of the projection.
    let minimal_surface_rect = target_surface_rect.clip_to(layer_rect_in_target_space);
    if minimal_surface_rect.is_empty_area() {
        return Rect::ZERO;
    }

    let Some(surface_to_layer) = transform.inverse() else {
        // Nothing to bound the layer with; assume all of it shows.
        return layer_bound_rect;
    };

    project_enclosing_clipped_rect(&surface_to_layer, minimal_surface_rect).clip_to(layer_bound_rect)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx_rect(a: Rect, b: Rect) -> bool {
        let eps = 1e-6;
        (a.x0 - b.x0).abs() < eps
            && (a.y0 - b.y0).abs() < eps
            && (a.x1 - b.x1).abs() < eps
            && (a.y1 - b.y1).abs() < eps
    }

    #[test]
    fn translation_fast_path() {
        let t = Transform3d::from_translation(10.0, 20.0, 0.0);
        let r = Rect::new(0.0, 0.0, 5.0, 5.0);
        assert_eq!(map_clipped_rect(&t, r), Rect::new(10.0, 20.0, 15.0, 25.0));
        assert_eq!(map_enclosing_clipped_rect(&t, r), Rect::new(10.0, 20.0, 15.0, 25.0));
        assert_eq!(project_clipped_rect(&t, r), Rect::new(10.0, 20.0, 15.0, 25.0));
    }

    #[test]
    fn scale_maps_and_rounds_outward() {
        let t = Transform3d::from_scale(1.5, 1.5, 1.0);
        let r = Rect::new(1.0, 1.0, 3.0, 3.0);
        assert!(approx_rect(map_clipped_rect(&t, r), Rect::new(1.5, 1.5, 4.5, 4.5)));
        assert_eq!(map_enclosing_clipped_rect(&t, r), Rect::new(1.0, 1.0, 5.0, 5.0));
    }

    #[test]
    fn rotation_bounding_box() {
        let t = Transform3d::from_rotation_z(core::f64::consts::FRAC_PI_4);
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let mapped = map_clipped_rect(&t, r);
        let d = 10.0 * core::f64::consts::SQRT_2;
        assert!(approx_rect(mapped, Rect::new(-d / 2.0, 0.0, d / 2.0, d)), "{mapped:?}");
    }

    #[test]
    fn fully_behind_eye_is_empty() {
        // Perspective with the whole layer pushed behind the eye.
        let t = Transform3d::from_perspective(1.0) * Transform3d::from_translation(0.0, 0.0, 10.0);
        let mapped = map_clipped_rect(&t, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(mapped.is_empty_area(), "{mapped:?}");
    }

    #[test]
    fn partially_behind_eye_is_clipped_not_flipped() {
        // A layer rotated about y under perspective so its right half passes
        // behind the eye. Naive division would put those corners at negative
        // x; clipping keeps the result on the visible side.
        let t = Transform3d::from_perspective(10.0)
            * Transform3d::from_rotation_y(-core::f64::consts::FRAC_PI_2 * 0.9);
        let r = Rect::new(0.0, -5.0, 100.0, 5.0);
        let h: [HomogeneousPoint; 4] =
            Quad::from_rect(r).points.map(|p| map_homogeneous(&t, p));
        assert!(h[0].w > 0.0, "left edge is in front");
        assert!(h[1].w <= 0.0, "right edge is behind");
        let mapped = map_clipped_rect(&t, r);
        assert!(!mapped.is_empty_area());
        assert!(mapped.x0 >= -1e-6, "no sign flip: {mapped:?}");
        assert!(mapped.x1 > 0.0);
    }

    #[test]
    fn scale_components() {
        let eps = 1e-9;
        // Rotation does not change axis lengths.
        let t = Transform3d::from_rotation_z(0.7) * Transform3d::from_scale(2.0, 3.0, 1.0);
        let s = compute_transform_2d_scale_components(&t, 0.0);
        assert!((s.x - 2.0).abs() < eps, "{s:?}");
        assert!((s.y - 3.0).abs() < eps, "{s:?}");
        let plain = compute_transform_2d_scale_components(&Transform3d::from_scale(2.5, 1.75, 1.0), 0.0);
        assert!((plain.x - 2.5).abs() < eps);
        assert!((plain.y - 1.75).abs() < eps);
        let persp = compute_transform_2d_scale_components(&Transform3d::from_perspective(100.0), 7.0);
        assert_eq!(persp, Vec2::new(7.0, 7.0));
    }

    #[test]
    fn map_quad_reports_clipping() {
        let q = Quad::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0));
        let (_, clipped) = map_quad(&Transform3d::from_scale(2.0, 2.0, 1.0), q);
        assert!(!clipped);
        let behind = Transform3d::from_perspective(1.0) * Transform3d::from_translation(0.0, 0.0, 10.0);
        let (_, clipped) = map_quad(&behind, q);
        assert!(clipped);
    }

    #[test]
    fn project_inverts_map_for_affine() {
        let t = Transform3d::from_translation(5.0, 7.0, 0.0) * Transform3d::from_scale(2.0, 4.0, 1.0);
        let inv = t.inverse().expect("invertible");
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let there = map_clipped_rect(&t, r);
        let back = project_clipped_rect(&inv, there);
        assert!(approx_rect(back, r), "{back:?}");
        let (p, clipped) = project_point(&inv, Point::new(25.0, 47.0));
        assert!(!clipped);
        assert!((p.x - 10.0).abs() < 1e-9 && (p.y - 10.0).abs() < 1e-9);
    }

    #[test]
    fn visible_rect_inside_surface_is_whole_layer() {
        let layer = Rect::new(0.0, 0.0, 10.0, 10.0);
        let t = Transform3d::from_translation(10.0, 10.0, 0.0);
        let v = calculate_visible_rect(Rect::new(0.0, 0.0, 100.0, 100.0), layer, &t);
        assert_eq!(v, layer);
    }

    #[test]
    fn visible_rect_partially_outside() {
        let layer = Rect::new(0.0, 0.0, 100.0, 100.0);
        let t = Transform3d::from_translation(50.0, 50.0, 0.0);
        let v = calculate_visible_rect(Rect::new(0.0, 0.0, 100.0, 100.0), layer, &t);
        assert_eq!(v, Rect::new(0.0, 0.0, 50.0, 50.0));
        let none = calculate_visible_rect(
            Rect::new(0.0, 0.0, 10.0, 10.0),
            layer,
            &Transform3d::from_translation(200.0, 0.0, 0.0),
        );
        assert!(none.is_empty_area());
    }
}
