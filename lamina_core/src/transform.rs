// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Column-major 4×4 transform.
//!
//! This type covers the subset of 3-D projective transforms that the draw
//! property calculator needs: composition, inversion, flattening, and the
//! classification predicates (`is_identity_or_translation`,
//! `preserves_2d_axis_alignment`, …) that decide which fast paths apply.
//!
//! Conventions follow the usual `Matrix × Vector` notation: `a * b` applies
//! `b` first, then `a`. The `pre_*` helpers multiply on the right, i.e. the
//! new operation is applied to points *before* `self`.

use core::ops::Mul;
#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;
use kurbo::Vec2;

/// Determinants with a smaller magnitude are treated as singular.
const SINGULAR_DETERMINANT: f64 = 1e-12;

/// Tolerance used by the axis-alignment and back-face predicates.
const EPSILON: f64 = f32::EPSILON as f64;

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, so the element in row `r`
/// and column `c` lives at `cols[c][r]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Creates a transform from a column-major 2-D array.
    #[inline]
    #[must_use]
    pub const fn from_cols_array_2d(cols: [[f64; 4]; 4]) -> Self {
        Self { cols }
    }

    /// Returns the columns as a 2-D array.
    #[inline]
    #[must_use]
    pub const fn to_cols_array_2d(self) -> [[f64; 4]; 4] {
        self.cols
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Returns the element at `row`, `col`.
    ///
    /// # Panics
    ///
    /// Panics if either index is `>= 4`.
    #[inline]
    #[must_use]
    pub const fn get(&self, row: usize, col: usize) -> f64 {
        self.cols[col][row]
    }

    /// Sets the element at `row`, `col`.
    ///
    /// # Panics
    ///
    /// Panics if either index is `>= 4`.
    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.cols[col][row] = value;
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = sin_cos(radians);
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Y axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_y(radians: f64) -> Self {
        let (s, c) = sin_cos(radians);
        Self {
            cols: [
                [c, 0.0, -s, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [s, 0.0, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the X axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_x(radians: f64) -> Self {
        let (s, c) = sin_cos(radians);
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, c, s, 0.0],
                [0.0, -s, c, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a CSS-style perspective transform with the eye at
    /// distance `depth` in front of the `z = 0` plane.
    ///
    /// A non-positive `depth` yields the identity.
    #[inline]
    #[must_use]
    pub fn from_perspective(depth: f64) -> Self {
        let mut m = Self::IDENTITY;
        if depth > 0.0 {
            m.set(3, 2, -1.0 / depth);
        }
        m
    }

    /// Returns `self * translate(x, y, z)`: the translation is applied to
    /// points before `self`.
    #[inline]
    #[must_use]
    pub fn pre_translate(self, x: f64, y: f64, z: f64) -> Self {
        self * Self::from_translation(x, y, z)
    }

    /// Returns `self * scale(sx, sy, 1)`.
    #[inline]
    #[must_use]
    pub fn pre_scale(self, sx: f64, sy: f64) -> Self {
        self * Self::from_scale(sx, sy, 1.0)
    }

    /// Returns `other * self`: `other` is applied to points after `self`.
    #[inline]
    #[must_use]
    pub fn then(self, other: Self) -> Self {
        other * self
    }

    /// Returns the 2-D translation part `(m03, m13)`.
    #[inline]
    #[must_use]
    pub const fn to_2d_translation(&self) -> Vec2 {
        Vec2::new(self.cols[3][0], self.cols[3][1])
    }

    /// Returns `true` for the identity matrix.
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Returns `true` if the matrix is a pure translation (or identity).
    #[must_use]
    pub fn is_identity_or_translation(&self) -> bool {
        let mut c = 0;
        while c < 3 {
            let mut r = 0;
            while r < 4 {
                let expected = if r == c { 1.0 } else { 0.0 };
                if self.cols[c][r] != expected {
                    return false;
                }
                r += 1;
            }
            c += 1;
        }
        self.cols[3][3] == 1.0
    }

    /// Returns `true` if the matrix is the identity or a translation by
    /// whole numbers on every axis.
    #[must_use]
    pub fn is_identity_or_integer_translation(&self) -> bool {
        if !self.is_identity_or_translation() {
            return false;
        }
        let t = self.cols[3];
        t[0] == t[0].floor() && t[1] == t[1].floor() && t[2] == t[2].floor()
    }

    /// Returns `true` if the matrix only scales and translates.
    #[must_use]
    pub fn is_scale_or_translation(&self) -> bool {
        self.get(0, 1) == 0.0
            && self.get(0, 2) == 0.0
            && self.get(1, 0) == 0.0
            && self.get(1, 2) == 0.0
            && self.get(2, 0) == 0.0
            && self.get(2, 1) == 0.0
            && !self.has_perspective()
    }

    /// Returns `true` if the bottom row differs from `[0, 0, 0, 1]`.
    #[inline]
    #[must_use]
    pub fn has_perspective(&self) -> bool {
        self.get(3, 0) != 0.0 || self.get(3, 1) != 0.0 || self.get(3, 2) != 0.0 || self.get(3, 3) != 1.0
    }

    /// Returns `true` if an axis-aligned 2-D rectangle stays axis-aligned
    /// after mapping through this matrix and dropping `z`.
    ///
    /// Only axis swaps and axis scales qualify; degenerate scales of zero
    /// count as preserving alignment. Perspective that depends on `x` or `y`
    /// never does.
    #[must_use]
    pub fn preserves_2d_axis_alignment(&self) -> bool {
        let has_xy_perspective = self.get(3, 0) != 0.0 || self.get(3, 1) != 0.0;

        let mut row0 = 0;
        let mut row1 = 0;
        let mut col0 = 0;
        let mut col1 = 0;
        if self.get(0, 0).abs() > EPSILON {
            row0 += 1;
            col0 += 1;
        }
        if self.get(0, 1).abs() > EPSILON {
            row0 += 1;
            col1 += 1;
        }
        if self.get(1, 0).abs() > EPSILON {
            row1 += 1;
            col0 += 1;
        }
        if self.get(1, 1).abs() > EPSILON {
            row1 += 1;
            col1 += 1;
        }

        row0 <= 1 && row1 <= 1 && col0 <= 1 && col1 <= 1 && !has_xy_perspective
    }

    /// Projects the transform into the `z = 0` plane.
    ///
    /// The third row and column are cleared (keeping `m22 = 1`), so any `z`
    /// produced or consumed by the matrix is discarded.
    #[must_use]
    pub fn flattened(self) -> Self {
        let mut m = self;
        m.set(2, 0, 0.0);
        m.set(2, 1, 0.0);
        m.set(0, 2, 0.0);
        m.set(1, 2, 0.0);
        m.set(2, 2, 1.0);
        m.set(3, 2, 0.0);
        m.set(2, 3, 0.0);
        m
    }

    /// Returns the determinant.
    #[must_use]
    pub fn determinant(&self) -> f64 {
        eliminate(self).0
    }

    /// Returns `true` if the matrix can be inverted.
    #[must_use]
    pub fn is_invertible(&self) -> bool {
        self.inverse().is_some()
    }

    /// Returns the inverse, or `None` if the matrix is singular or not
    /// finite.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        if !self.is_finite() {
            return None;
        }
        if self.is_identity_or_translation() {
            let t = self.cols[3];
            return Some(Self::from_translation(-t[0], -t[1], -t[2]));
        }
        let (det, inv) = eliminate(self);
        if det.abs() <= SINGULAR_DETERMINANT {
            return None;
        }
        inv
    }

    /// Returns `true` if a layer with a forward-facing normal `(0, 0, 1)`
    /// shows its back face after applying this transform.
    ///
    /// Only the sign of the transformed normal's `z` matters, which is the
    /// sign of `cofactor(2, 2) * det`. Singular matrices report `false`.
    #[must_use]
    pub fn is_back_face_visible(&self) -> bool {
        if self.is_identity() {
            return false;
        }
        let det = self.determinant();
        if det.abs() <= EPSILON {
            return false;
        }
        let m = |r: usize, c: usize| self.get(r, c);
        let cofactor22 = m(0, 0) * m(1, 1) * m(3, 3)
            + m(0, 1) * m(1, 3) * m(3, 0)
            + m(0, 3) * m(1, 0) * m(3, 1)
            - m(0, 0) * m(1, 3) * m(3, 1)
            - m(0, 1) * m(1, 0) * m(3, 3)
            - m(0, 3) * m(1, 1) * m(3, 0);
        cofactor22 * det < 0.0
    }

    /// Maps a homogeneous 4-vector through the matrix.
    #[inline]
    #[must_use]
    pub fn map_vec4(&self, v: [f64; 4]) -> [f64; 4] {
        let c = &self.cols;
        let mut out = [0.0; 4];
        let mut r = 0;
        while r < 4 {
            out[r] = c[0][r] * v[0] + c[1][r] * v[1] + c[2][r] * v[2] + c[3][r] * v[3];
            r += 1;
        }
        out
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub const fn is_finite(&self) -> bool {
        let c = &self.cols;
        c[0][0].is_finite()
            && c[0][1].is_finite()
            && c[0][2].is_finite()
            && c[0][3].is_finite()
            && c[1][0].is_finite()
            && c[1][1].is_finite()
            && c[1][2].is_finite()
            && c[1][3].is_finite()
            && c[2][0].is_finite()
            && c[2][1].is_finite()
            && c[2][2].is_finite()
            && c[2][3].is_finite()
            && c[3][0].is_finite()
            && c[3][1].is_finite()
            && c[3][2].is_finite()
            && c[3][3].is_finite()
    }

    /// Is this transform [NaN]?
    ///
    /// [NaN]: f64::is_nan
    #[inline]
    #[must_use]
    pub const fn is_nan(&self) -> bool {
        let c = &self.cols;
        c[0][0].is_nan()
            || c[0][1].is_nan()
            || c[0][2].is_nan()
            || c[0][3].is_nan()
            || c[1][0].is_nan()
            || c[1][1].is_nan()
            || c[1][2].is_nan()
            || c[1][3].is_nan()
            || c[2][0].is_nan()
            || c[2][1].is_nan()
            || c[2][2].is_nan()
            || c[2][3].is_nan()
            || c[3][0].is_nan()
            || c[3][1].is_nan()
            || c[3][2].is_nan()
            || c[3][3].is_nan()
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}

fn sin_cos(radians: f64) -> (f64, f64) {
    #[cfg(feature = "std")]
    let (s, c) = radians.sin_cos();
    #[cfg(not(feature = "std"))]
    let (s, c) = (radians.sin(), radians.cos());
    (s, c)
}

/// Gauss-Jordan elimination with partial pivoting.
///
/// Returns the determinant and, when no pivot vanished, the inverse.
fn eliminate(m: &Transform3d) -> (f64, Option<Transform3d>) {
    // Row-major working copies: a[r][c].
    let mut a = [[0.0_f64; 4]; 4];
    let mut inv = [[0.0_f64; 4]; 4];
    for r in 0..4 {
        for c in 0..4 {
            a[r][c] = m.get(r, c);
        }
        inv[r][r] = 1.0;
    }

    let mut det = 1.0;
    for col in 0..4 {
        let mut pivot = col;
        for r in (col + 1)..4 {
            if a[r][col].abs() > a[pivot][col].abs() {
                pivot = r;
            }
        }
        if a[pivot][col] == 0.0 {
            return (0.0, None);
        }
        if pivot != col {
            a.swap(pivot, col);
            inv.swap(pivot, col);
            det = -det;
        }
        let p = a[col][col];
        det *= p;
        for c in 0..4 {
            a[col][c] /= p;
            inv[col][c] /= p;
        }
        for r in 0..4 {
            if r == col {
                continue;
            }
            let f = a[r][col];
            if f == 0.0 {
                continue;
            }
            for c in 0..4 {
                a[r][c] -= f * a[col][c];
                inv[r][c] -= f * inv[col][c];
            }
        }
    }

    let mut out = Transform3d::IDENTITY;
    for r in 0..4 {
        for c in 0..4 {
            out.set(r, c, inv[r][c]);
        }
    }
    (det, Some(out))
}
