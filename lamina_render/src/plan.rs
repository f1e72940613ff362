// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render plan: the passes and draw items for one frame.

use alloc::vec::Vec;

use kurbo::{Rect, Size};
use lamina_core::filter::BlendMode;
use lamina_core::region::Region;
use lamina_core::transform::Transform3d;

/// What a [`DrawItem`] draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawItemKind {
    /// The layer's own content.
    Content,
    /// The finished surface owned by the layer.
    Surface {
        /// Mask applied to the surface, if any.
        mask: Option<u32>,
    },
    /// The reflection of the surface owned by the layer.
    Replica {
        /// Mask applied to the reflection, if any.
        mask: Option<u32>,
    },
}

/// A single draw into a render pass.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawItem {
    /// Slot of the layer this item originates from.
    pub layer: u32,
    /// Content or surface.
    pub kind: DrawItemKind,
    /// Part of the source left to draw after occlusion culling, in content
    /// space for layers and surface space for surfaces.
    pub rect: Rect,
    /// Source space to the pass's space.
    pub transform: Transform3d,
    /// Opacity to composite with.
    pub opacity: f32,
    /// Blend mode to composite with.
    pub blend_mode: BlendMode,
}

/// Everything drawn into one render surface.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderPass {
    /// Slot of the layer owning the surface.
    pub owner: u32,
    /// Extent of the surface in its own space.
    pub output_rect: Rect,
    /// Surface space to screen space.
    pub screen_space_transform: Transform3d,
    /// Draw items, back to front.
    pub items: Vec<DrawItem>,
}

impl RenderPass {
    /// Creates an empty pass for the surface owned by `owner`.
    #[must_use]
    pub fn new(owner: u32, output_rect: Rect, screen_space_transform: Transform3d) -> Self {
        Self {
            owner,
            output_rect,
            screen_space_transform,
            items: Vec::new(),
        }
    }
}

/// Knobs for [`build_plan`](crate::build_plan).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlanSettings {
    /// Opaque rects smaller than this on both axes do not occlude.
    pub minimum_occlusion_tracking_size: Size,
    /// Compute the part of the screen no opaque content covers, for
    /// filling with a background color.
    pub fill_background: bool,
}

impl Default for PlanSettings {
    fn default() -> Self {
        Self {
            minimum_occlusion_tracking_size: Size::ZERO,
            fill_background: true,
        }
    }
}

/// The render passes for one frame.
///
/// Passes are in dependency order: a pass comes after every pass whose
/// surface it draws. The root pass is last.
#[derive(Clone, Debug, Default)]
pub struct RenderPlan {
    /// Passes in dependency order.
    pub passes: Vec<RenderPass>,
    /// Screen area left uncovered, when background filling is enabled.
    pub background: Region,
    /// Items dropped because they were completely hidden.
    pub culled_items: usize,
}

impl RenderPlan {
    /// Creates an empty render plan.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the plan for reuse.
    pub fn clear(&mut self) {
        self.passes.clear();
        self.background.clear();
        self.culled_items = 0;
    }

    /// The root pass, if anything is drawn.
    #[must_use]
    pub fn root_pass(&self) -> Option<&RenderPass> {
        self.passes.last()
    }

    /// The pass for the surface owned by `owner`.
    #[must_use]
    pub fn pass(&self, owner: u32) -> Option<&RenderPass> {
        self.passes.iter().find(|p| p.owner == owner)
    }

    /// Number of draw items across all passes.
    #[must_use]
    pub fn item_count(&self) -> usize {
        self.passes.iter().map(|p| p.items.len()).sum()
    }
}
