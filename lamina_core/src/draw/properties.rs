// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer and per-surface outputs of a calculation pass.

use alloc::vec::Vec;
use kurbo::{Rect, Size};

use crate::geometry::RectExt;
use crate::layer::INVALID;
use crate::math::map_clipped_rect;
use crate::transform::Transform3d;

/// Derived drawing state of one layer.
///
/// Rectangles are in the layer's content space unless named `*_in_target`,
/// or documented as target space, in which case they are in the space of the
/// layer's render target surface.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawProperties {
    /// Content space to target surface space.
    pub draw_transform: Transform3d,
    /// Content space to screen space.
    pub screen_space_transform: Transform3d,
    /// Some transform between this layer and its target is animating.
    pub draw_transform_is_animating: bool,
    /// Some transform between this layer and the screen is animating.
    pub screen_space_transform_is_animating: bool,
    /// Opacity applied when drawing into the target. Surface owners draw at
    /// 1; their surface carries the accumulated value.
    pub opacity: f32,
    /// Some opacity between this layer and its target is animating.
    pub opacity_is_animating: bool,
    /// Some opacity between this layer and the screen is animating.
    pub screen_space_opacity_is_animating: bool,
    /// Text in this layer can be rendered with subpixel anti-aliasing.
    pub can_use_lcd_text: bool,
    /// [`clip_rect`](Self::clip_rect) applies.
    pub is_clipped: bool,
    /// Clip in target space.
    pub clip_rect: Rect,
    /// Clipped footprint in target space.
    pub drawable_content_rect: Rect,
    /// Part of the content rect that can end up on screen.
    pub visible_content_rect: Rect,
    /// Bounds scaled by the contents scale, rounded up.
    pub content_bounds: Size,
    /// Scale from layer space to content space.
    pub contents_scale: f64,
    /// The contents scale that would give one content pixel per device
    /// pixel.
    pub ideal_contents_scale: f64,
    /// Largest contents scale a running animation will need, or 0 if
    /// unknown.
    pub maximum_animation_contents_scale: f64,
    /// Page scale applied to this layer, 1 outside the page-scale subtree.
    pub page_scale_factor: f64,
    /// Device scale factor of the pass.
    pub device_scale_factor: f64,
    /// Slot of the layer owning the surface this layer draws into.
    pub render_target: u32,
    /// The layer is listed by some surface in the render surface layer list.
    pub in_render_surface_layer_list: bool,
    /// Descendants (this layer included) whose clip parent lies outside this
    /// subtree.
    pub num_unclipped_descendants: usize,
}

impl Default for DrawProperties {
    fn default() -> Self {
        Self::CLEARED
    }
}

impl DrawProperties {
    /// Properties of a layer the pass did not draw.
    pub const CLEARED: Self = Self {
        draw_transform: Transform3d::IDENTITY,
        screen_space_transform: Transform3d::IDENTITY,
        draw_transform_is_animating: false,
        screen_space_transform_is_animating: false,
        opacity: 0.0,
        opacity_is_animating: false,
        screen_space_opacity_is_animating: false,
        can_use_lcd_text: false,
        is_clipped: false,
        clip_rect: Rect::ZERO,
        drawable_content_rect: Rect::ZERO,
        visible_content_rect: Rect::ZERO,
        content_bounds: Size::ZERO,
        contents_scale: 1.0,
        ideal_contents_scale: 0.0,
        maximum_animation_contents_scale: 0.0,
        page_scale_factor: 1.0,
        device_scale_factor: 1.0,
        render_target: INVALID,
        in_render_surface_layer_list: false,
        num_unclipped_descendants: 0,
    };

    /// The content rect, `(0, 0, content_bounds)`.
    #[inline]
    #[must_use]
    pub fn content_rect(&self) -> Rect {
        Rect::from_origin_size((0.0, 0.0), self.content_bounds)
    }
}

/// An offscreen target that a subtree is drawn into before being composited.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderSurface {
    /// Slot of the owning layer.
    pub owner: u32,
    /// Surface space to the space of the target it draws into.
    pub draw_transform: Transform3d,
    /// Surface space to screen space.
    pub screen_space_transform: Transform3d,
    /// Where the replica is drawn in the target. Identity without a replica.
    pub replica_draw_transform: Transform3d,
    /// Where the replica is drawn on screen. Identity without a replica.
    pub replica_screen_space_transform: Transform3d,
    /// Accumulated opacity the surface is composited with.
    pub draw_opacity: f32,
    /// Some opacity up to the surface's target is animating.
    pub draw_opacity_is_animating: bool,
    /// Some transform up to the surface's target is animating.
    pub target_surface_transforms_are_animating: bool,
    /// Some transform up to the screen is animating.
    pub screen_space_transforms_are_animating: bool,
    /// [`clip_rect`](Self::clip_rect) applies.
    pub is_clipped: bool,
    /// Clip in the target's space.
    pub clip_rect: Rect,
    /// Everything drawn into the surface, in surface space.
    pub content_rect: Rect,
    /// The surface is drawn into a target that ends up on screen. The root
    /// surface, and surfaces kept alive only for copy requests, report
    /// `false`.
    pub contributes_to_drawn_surface: bool,
    /// Owner of the nearest enclosing surface, this one included, that
    /// outside occlusion must not reach into. [`INVALID`] if none.
    pub nearest_occlusion_immune_ancestor: u32,
    /// The owner has a replica layer.
    pub has_replica: bool,
    /// Layers drawn into this surface, back to front. Owners of contributing
    /// child surfaces are listed at their paint position.
    pub layer_list: Vec<u32>,
}

impl RenderSurface {
    pub(crate) fn new(owner: u32) -> Self {
        Self {
            owner,
            draw_transform: Transform3d::IDENTITY,
            screen_space_transform: Transform3d::IDENTITY,
            replica_draw_transform: Transform3d::IDENTITY,
            replica_screen_space_transform: Transform3d::IDENTITY,
            draw_opacity: 1.0,
            draw_opacity_is_animating: false,
            target_surface_transforms_are_animating: false,
            screen_space_transforms_are_animating: false,
            is_clipped: false,
            clip_rect: Rect::ZERO,
            content_rect: Rect::ZERO,
            contributes_to_drawn_surface: false,
            nearest_occlusion_immune_ancestor: INVALID,
            has_replica: false,
            layer_list: Vec::new(),
        }
    }

    /// Footprint of the surface, and its replica, in the target's space.
    #[must_use]
    pub fn drawable_content_rect(&self) -> Rect {
        let mut rect = map_clipped_rect(&self.draw_transform, self.content_rect);
        if self.has_replica {
            rect = rect.bounding_union(map_clipped_rect(
                &self.replica_draw_transform,
                self.content_rect,
            ));
        }
        rect
    }
}
