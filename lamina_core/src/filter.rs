// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Filter chains and blend modes.
//!
//! The compositor never applies filters itself; it only needs to know how a
//! filter chain changes the geometry of a surface (how far it reaches beyond
//! the surface's pixels) and whether it breaks the assumptions occlusion
//! tracking makes about opaque pixels.

use alloc::vec::Vec;
use kurbo::Vec2;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

/// A single filter in a chain.
#[derive(Clone, Debug, PartialEq)]
pub enum FilterOperation {
    /// Grayscale conversion by the given amount in `0..=1`.
    Grayscale(f32),
    /// Sepia toning by the given amount in `0..=1`.
    Sepia(f32),
    /// Saturation multiplier.
    Saturate(f32),
    /// Hue rotation in degrees.
    HueRotate(f32),
    /// Color inversion by the given amount in `0..=1`.
    Invert(f32),
    /// Brightness multiplier.
    Brightness(f32),
    /// Contrast multiplier.
    Contrast(f32),
    /// Alpha multiplier.
    Opacity(f32),
    /// Gaussian blur with the given standard deviation.
    Blur(f64),
    /// Blurred, offset copy of the alpha channel drawn underneath.
    DropShadow {
        /// Shadow offset.
        offset: Vec2,
        /// Standard deviation of the shadow blur.
        std_deviation: f64,
        /// Shadow color, `0xRRGGBBAA`.
        color: u32,
    },
    /// A 4×5 row-major color matrix.
    ColorMatrix([f32; 20]),
    /// Magnifies the interior and blends it into an inset border.
    Zoom {
        /// Magnification factor.
        amount: f32,
        /// Width of the blended border.
        inset: f64,
    },
    /// An externally defined filter graph. Its effect is unknown.
    Reference,
    /// Clamps alpha to a threshold inside a shape.
    AlphaThreshold(f32),
}

impl FilterOperation {
    /// Returns `true` if output pixels depend on input pixels elsewhere.
    #[must_use]
    pub fn moves_pixels(&self) -> bool {
        matches!(
            self,
            Self::Blur(_) | Self::DropShadow { .. } | Self::Zoom { .. } | Self::Reference
        )
    }

    /// Returns `true` if the filter can make opaque pixels translucent.
    #[must_use]
    pub fn affects_opacity(&self) -> bool {
        match self {
            Self::Opacity(_)
            | Self::Blur(_)
            | Self::DropShadow { .. }
            | Self::Zoom { .. }
            | Self::Reference
            | Self::AlphaThreshold(_) => true,
            Self::ColorMatrix(m) => m[15..20] != [0.0, 0.0, 0.0, 1.0, 0.0],
            _ => false,
        }
    }
}

/// How far a filter chain's output extends beyond its input, per edge.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FilterOutsets {
    /// Extent above the input.
    pub top: f64,
    /// Extent to the right of the input.
    pub right: f64,
    /// Extent below the input.
    pub bottom: f64,
    /// Extent to the left of the input.
    pub left: f64,
}

impl FilterOutsets {
    /// Returns `true` if no edge is extended.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.right == 0.0 && self.bottom == 0.0 && self.left == 0.0
    }
}

/// An ordered filter chain, applied first to last.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterOperations {
    ops: Vec<FilterOperation>,
}

impl FilterOperations {
    /// Creates an empty chain.
    #[must_use]
    pub const fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Appends an operation.
    pub fn push(&mut self, op: FilterOperation) {
        self.ops.push(op);
    }

    /// Returns `true` if the chain has no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// The operations in application order.
    #[must_use]
    pub fn operations(&self) -> &[FilterOperation] {
        &self.ops
    }

    /// Returns `true` if any operation moves pixels.
    #[must_use]
    pub fn has_filter_that_moves_pixels(&self) -> bool {
        self.ops.iter().any(FilterOperation::moves_pixels)
    }

    /// Returns `true` if any operation can reduce opacity.
    #[must_use]
    pub fn has_filter_that_affects_opacity(&self) -> bool {
        self.ops.iter().any(FilterOperation::affects_opacity)
    }

    /// Returns `true` if the chain includes a [`FilterOperation::Reference`].
    #[must_use]
    pub fn has_reference_filter(&self) -> bool {
        self.ops.iter().any(|op| matches!(op, FilterOperation::Reference))
    }

    /// Accumulated per-edge outsets of the chain, in whole pixels.
    ///
    /// A blur reaches three standard deviations in every direction; a drop
    /// shadow reaches that far around its offset copy.
    #[must_use]
    pub fn outsets(&self) -> FilterOutsets {
        let mut out = FilterOutsets::default();
        for op in &self.ops {
            match *op {
                FilterOperation::Blur(sd) => {
                    let spread = spread_for_std_deviation(sd);
                    out.top += spread;
                    out.right += spread;
                    out.bottom += spread;
                    out.left += spread;
                }
                FilterOperation::DropShadow {
                    offset,
                    std_deviation,
                    ..
                } => {
                    let spread = spread_for_std_deviation(std_deviation);
                    out.top += (spread - offset.y).max(0.0);
                    out.right += (spread + offset.x).max(0.0);
                    out.bottom += (spread + offset.y).max(0.0);
                    out.left += (spread - offset.x).max(0.0);
                }
                _ => {}
            }
        }
        out
    }
}

impl From<Vec<FilterOperation>> for FilterOperations {
    fn from(ops: Vec<FilterOperation>) -> Self {
        Self { ops }
    }
}

fn spread_for_std_deviation(sd: f64) -> f64 {
    (sd * 3.0).max(0.0).ceil()
}

/// How a layer or surface is composited onto what is below it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Source-over.
    #[default]
    Normal,
    /// Multiply.
    Multiply,
    /// Screen.
    Screen,
    /// Overlay.
    Overlay,
    /// Darken.
    Darken,
    /// Lighten.
    Lighten,
    /// Color dodge.
    ColorDodge,
    /// Color burn.
    ColorBurn,
    /// Hard light.
    HardLight,
    /// Soft light.
    SoftLight,
    /// Difference.
    Difference,
    /// Exclusion.
    Exclusion,
    /// Hue.
    Hue,
    /// Saturation.
    Saturation,
    /// Color.
    Color,
    /// Luminosity.
    Luminosity,
}

impl BlendMode {
    /// Returns `true` for plain source-over compositing.
    #[inline]
    #[must_use]
    pub fn is_default(self) -> bool {
        self == Self::Normal
    }
}
