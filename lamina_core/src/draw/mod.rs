// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw-property calculation.
//!
//! [`LayerStore::calculate_draw_properties`](crate::layer::LayerStore::calculate_draw_properties)
//! walks a layer tree once and produces a [`DrawState`]:
//!
//! - [`DrawProperties`] for every layer: where it lands in its render target
//!   and on screen, its accumulated opacity and clip, the part of its
//!   content that can be visible, and the scale its content should be
//!   rasterized at.
//! - A [`RenderSurface`] for every layer whose subtree must be composited as
//!   a unit (for opacity, masks, filters, reflections, blending, flattening
//!   or copy requests).
//! - The *render surface layer list*: the surfaces to draw, each listing
//!   the layers drawn into it in paint order.
//!
//! Layers that can never appear on screen are skipped along with their
//! subtrees, and surfaces that end up drawing nothing are dropped.
//!
//! Use [`LayerIterator`](crate::iterator::LayerIterator) to walk the result
//! front to back, and [`OcclusionTracker`](crate::occlusion::OcclusionTracker)
//! to find out what is hidden.

mod calculate;
mod inputs;
mod properties;
mod state;

#[cfg(test)]
mod tests;

pub use inputs::CalcDrawPropsInputs;
pub use properties::{DrawProperties, RenderSurface};
pub use state::DrawState;
