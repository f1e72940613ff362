// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Occlusion tracking over a front-to-back traversal.
//!
//! An [`OcclusionTracker`] is fed every position of a
//! [`LayerIterator`](crate::iterator::LayerIterator) through
//! [`enter_layer`](OcclusionTracker::enter_layer) and
//! [`leave_layer`](OcclusionTracker::leave_layer). It keeps one entry per
//! render target currently being visited, holding two regions in that
//! target's space:
//!
//! - *occlusion from inside the target*: opaque content drawn into the
//!   target by layers already visited (so in front of whatever comes next);
//! - *occlusion from outside the target*: opaque content in front of the
//!   target's surface, carried in from the targets it is drawn into.
//!
//! Between entering and leaving a layer, [`occluded`](OcclusionTracker::occluded)
//! and [`unoccluded_content_rect`](OcclusionTracker::unoccluded_content_rect)
//! answer how much of it is hidden.
//!
//! Occlusion is only ever under-estimated. Anything whose final position or
//! opacity is not known (animations on the main tree, non-axis-aligned
//! transforms, translucent surfaces, masks, blending) contributes nothing.

use alloc::vec::Vec;
use kurbo::{Rect, Size};

use crate::draw::{DrawState, RenderSurface};
use crate::filter::FilterOutsets;
use crate::geometry::{Quad, RectExt};
use crate::iterator::LayerIteratorPosition;
use crate::layer::{INVALID, ImplTree, LayerStore, TreeKind};
use crate::math::{map_enclosing_clipped_rect, map_quad, project_enclosing_clipped_rect};
use crate::region::Region;
use crate::transform::Transform3d;

static EMPTY_REGION: Region = Region::new();

/// Occlusion accumulated for one render target.
#[derive(Clone, Debug)]
struct StackObject {
    target: u32,
    occlusion_from_outside_target: Region,
    occlusion_from_inside_target: Region,
}

impl StackObject {
    fn new(target: u32) -> Self {
        Self {
            target,
            occlusion_from_outside_target: Region::new(),
            occlusion_from_inside_target: Region::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.occlusion_from_inside_target.is_empty() && self.occlusion_from_outside_target.is_empty()
    }

    /// Part of `content_rect` left uncovered, in target space.
    fn unoccluded_in_target(&self, content_rect: Rect, draw_transform: &Transform3d) -> Region {
        let mut region = Region::from_rect(map_enclosing_clipped_rect(draw_transform, content_rect));
        region.subtract_region(&self.occlusion_from_inside_target);
        region.subtract_region(&self.occlusion_from_outside_target);
        region
    }

    /// Like [`unoccluded_in_target`](Self::unoccluded_in_target), projected
    /// back into content space.
    fn unoccluded_content_rect(&self, content_rect: Rect, draw_transform: &Transform3d) -> Rect {
        if content_rect.is_empty_area() || self.is_empty() {
            return content_rect;
        }
        let Some(inverse) = draw_transform.inverse() else {
            return content_rect;
        };
        let unoccluded = self.unoccluded_in_target(content_rect, draw_transform).bounds();
        project_enclosing_clipped_rect(&inverse, unoccluded).clip_to(content_rect)
    }
}

/// Tracks opaque coverage while visiting a [`DrawState`] front to back.
#[derive(Debug)]
pub struct OcclusionTracker<'a, K: TreeKind = ImplTree> {
    store: &'a LayerStore<K>,
    state: &'a DrawState,
    screen_space_clip_rect: Rect,
    minimum_tracking_size: Size,
    stack: Vec<StackObject>,
}

impl<'a, K: TreeKind> OcclusionTracker<'a, K> {
    /// Creates a tracker for `state`, which must have been computed from
    /// `store`. Nothing outside `screen_space_clip_rect` is tracked.
    #[must_use]
    pub fn new(store: &'a LayerStore<K>, state: &'a DrawState, screen_space_clip_rect: Rect) -> Self {
        Self {
            store,
            state,
            screen_space_clip_rect,
            minimum_tracking_size: Size::ZERO,
            stack: Vec::new(),
        }
    }

    /// Opaque rects smaller than `size` on both axes are not tracked.
    pub fn set_minimum_tracking_size(&mut self, size: Size) {
        self.minimum_tracking_size = size;
    }

    /// See [`set_minimum_tracking_size`](Self::set_minimum_tracking_size).
    #[must_use]
    pub fn minimum_tracking_size(&self) -> Size {
        self.minimum_tracking_size
    }

    /// Occlusion drawn into the current target, in its space.
    #[must_use]
    pub fn occlusion_from_inside_target(&self) -> &Region {
        self.stack
            .last()
            .map_or(&EMPTY_REGION, |s| &s.occlusion_from_inside_target)
    }

    /// Occlusion in front of the current target's surface, in its space.
    #[must_use]
    pub fn occlusion_from_outside_target(&self) -> &Region {
        self.stack
            .last()
            .map_or(&EMPTY_REGION, |s| &s.occlusion_from_outside_target)
    }

    /// Call before anything is drawn for `position`.
    pub fn enter_layer(&mut self, position: &LayerIteratorPosition) {
        if position.represents_itself {
            self.enter_render_target(position.target_render_surface_layer);
        } else if position.represents_target_render_surface {
            self.finished_render_target(position.target_render_surface_layer);
        }
    }

    /// Call once everything for `position` is drawn.
    pub fn leave_layer(&mut self, position: &LayerIteratorPosition) {
        if position.represents_itself {
            self.mark_occluded_behind_layer(position.current_layer);
        } else if position.represents_contributing_render_surface {
            self.leave_to_render_target(position.target_render_surface_layer);
        }
    }

    /// Returns `true` if `content_rect`, drawn into `render_target` through
    /// `draw_transform`, is completely hidden.
    ///
    /// `render_target` must be the target currently visited; anything else
    /// reports `false`.
    #[must_use]
    pub fn occluded(&self, render_target: u32, content_rect: Rect, draw_transform: &Transform3d) -> bool {
        let Some(top) = self.stack.last() else {
            return false;
        };
        if content_rect.is_empty_area() {
            return true;
        }
        if top.target != render_target || top.is_empty() || !draw_transform.is_invertible() {
            return false;
        }
        // Partial pixels count as unoccluded.
        top.unoccluded_in_target(content_rect, draw_transform)
            .bounds()
            .is_empty_area()
    }

    /// The part of `content_rect` not hidden, as a rectangle in content
    /// space. Conservative when the visible part is not a rectangle.
    #[must_use]
    pub fn unoccluded_content_rect(&self, content_rect: Rect, draw_transform: &Transform3d) -> Rect {
        match self.stack.last() {
            Some(top) => top.unoccluded_content_rect(content_rect, draw_transform),
            None => content_rect,
        }
    }

    /// Like [`unoccluded_content_rect`](Self::unoccluded_content_rect), for
    /// the surface of the current target as it is drawn into its own
    /// target.
    ///
    /// A surface is never hidden by what is drawn inside it, so only the
    /// target below the top of the stack is consulted.
    #[must_use]
    pub fn unoccluded_contributing_surface_content_rect(
        &self,
        content_rect: Rect,
        draw_transform: &Transform3d,
    ) -> Rect {
        match self.stack.len().checked_sub(2).map(|i| &self.stack[i]) {
            Some(below) => below.unoccluded_content_rect(content_rect, draw_transform),
            None => content_rect,
        }
    }

    /// The screen clip minus everything known to be hidden. Meaningful once
    /// the root target has been finished.
    #[must_use]
    pub fn compute_visible_region_in_screen(&self) -> Region {
        let mut visible = Region::from_rect(self.screen_space_clip_rect);
        visible.subtract_region(self.occlusion_from_inside_target());
        visible
    }

    // -- Policy --

    fn layer_is_hidden(&self, idx: u32) -> bool {
        let mut at = idx;
        while at != INVALID {
            if self.store.flags[at as usize].hide_layer_and_subtree {
                return true;
            }
            at = self.store.parent[at as usize];
        }
        false
    }

    /// Opaque part of the layer's visible content rect.
    fn visible_content_opaque_rect(&self, idx: u32) -> Rect {
        let i = idx as usize;
        let props = self.state.layer_at(idx);
        if self.store.flags[i].contents_opaque {
            return props.visible_content_rect;
        }
        let opaque = self.store.opaque_rect[i];
        if opaque.is_empty_area() {
            return Rect::ZERO;
        }
        let cs = props.contents_scale;
        Rect::new(opaque.x0 * cs, opaque.y0 * cs, opaque.x1 * cs, opaque.y1 * cs)
            .to_enclosed()
            .clip_to(props.visible_content_rect)
    }

    /// The screen clip in the space of `surface`.
    fn screen_space_clip_rect_in_target_surface(&self, surface: &RenderSurface) -> Rect {
        match surface.screen_space_transform.inverse() {
            Some(inverse) => project_enclosing_clipped_rect(&inverse, self.screen_space_clip_rect),
            None => surface.content_rect,
        }
    }

    // -- Transitions --

    fn enter_render_target(&mut self, new_target: u32) {
        if self.stack.last().is_some_and(|s| s.target == new_target) {
            return;
        }
        let state = self.state;
        let Some(new_surface) = state.surface_at(new_target) else {
            return;
        };

        let old = self.stack.last().and_then(|s| state.surface_at(s.target));
        let old_occlusion_immune_ancestor =
            old.map_or(INVALID, |s| s.nearest_occlusion_immune_ancestor);
        let new_occlusion_immune_ancestor = new_surface.nearest_occlusion_immune_ancestor;

        self.stack.push(StackObject::new(new_target));

        // Occlusion from inside the old target never applies to a new
        // target. Occlusion from outside does, unless the new subtree must
        // not be hidden by anything outside it.
        let entering_unoccluded_subtree = new_occlusion_immune_ancestor != INVALID
            && new_occlusion_immune_ancestor != old_occlusion_immune_ancestor;
        let inverse_new_screen_space = new_surface
            .screen_space_transform
            .inverse()
            .filter(|_| K::is_known(new_surface.screen_space_transforms_are_animating));
        let entering_root_target = new_target == state.root();

        let (Some(old_surface), Some(inverse_new_screen_space)) = (old, inverse_new_screen_space)
        else {
            return;
        };
        if entering_unoccluded_subtree || entering_root_target {
            return;
        }

        let last = self.stack.len() - 1;
        let previous = &self.stack[last - 1];
        let mut old_occlusion = previous.occlusion_from_outside_target.clone();
        old_occlusion.union_region(&previous.occlusion_from_inside_target);
        let old_target_to_new_target = inverse_new_screen_space * old_surface.screen_space_transform;
        self.stack[last].occlusion_from_outside_target =
            transform_surface_opaque_region(&old_occlusion, None, &old_target_to_new_target);
    }

    fn finished_render_target(&mut self, finished_target: u32) {
        self.enter_render_target(finished_target);
        let state = self.state;
        let Some(surface) = state.surface_at(finished_target) else {
            return;
        };
        let i = finished_target as usize;

        let target_is_only_for_copy_request =
            self.store.flags[i].has_copy_request && self.layer_is_hidden(finished_target);

        // Occlusion inside the surface cannot be used outside it when the
        // surface is not composited as opaque pixels in a known place.
        let discard = self.store.mask_layer[i] != INVALID
            || !K::is_known(surface.draw_opacity_is_animating)
            || surface.draw_opacity < 1.0
            || !self.store.blend_mode[i].is_default()
            || target_is_only_for_copy_request
            || self.store.filters[i].has_filter_that_affects_opacity()
            || !K::is_known(surface.target_surface_transforms_are_animating);
        if discard {
            if let Some(top) = self.stack.last_mut() {
                top.occlusion_from_inside_target.clear();
                top.occlusion_from_outside_target.clear();
            }
        }
    }

    fn leave_to_render_target(&mut self, new_target: u32) {
        let Some(last) = self.stack.len().checked_sub(1) else {
            return;
        };
        let surface_will_be_at_top_after_pop =
            last > 0 && self.stack[last - 1].target == new_target;

        let old_target = self.stack[last].target;
        let state = self.state;
        let Some(old_surface) = state.surface_at(old_target) else {
            return;
        };
        let store = self.store;
        let o = old_target as usize;
        let has_replica = old_surface.has_replica;
        let replica = store.replica_layer[o];
        let replica_has_mask = replica != INVALID && store.mask_layer[replica as usize] != INVALID;

        let clip = old_surface.is_clipped.then_some(old_surface.clip_rect);
        let top = &self.stack[last];
        let mut inside_in_new_target = transform_surface_opaque_region(
            &top.occlusion_from_inside_target,
            clip,
            &old_surface.draw_transform,
        );
        if has_replica && !replica_has_mask {
            inside_in_new_target.union_region(&transform_surface_opaque_region(
                &top.occlusion_from_inside_target,
                clip,
                &old_surface.replica_draw_transform,
            ));
        }
        let outside_in_new_target = transform_surface_opaque_region(
            &top.occlusion_from_outside_target,
            None,
            &old_surface.draw_transform,
        );

        let background_filters = &store.background_filters[o];
        let filter_moves_pixels = background_filters.has_filter_that_moves_pixels();
        let mut unoccluded_surface_rect = Rect::ZERO;
        let mut unoccluded_replica_rect = Rect::ZERO;
        if filter_moves_pixels {
            unoccluded_surface_rect = self.unoccluded_contributing_surface_content_rect(
                old_surface.content_rect,
                &old_surface.draw_transform,
            );
            if has_replica {
                unoccluded_replica_rect = self.unoccluded_contributing_surface_content_rect(
                    old_surface.content_rect,
                    &old_surface.replica_draw_transform,
                );
            }
        }

        let new_target_is_root = new_target == state.root();
        if surface_will_be_at_top_after_pop {
            let below = &mut self.stack[last - 1];
            below
                .occlusion_from_inside_target
                .union_region(&inside_in_new_target);
            if !new_target_is_root {
                below
                    .occlusion_from_outside_target
                    .union_region(&outside_in_new_target);
            }
            self.stack.pop();
        } else {
            let top = &mut self.stack[last];
            top.target = new_target;
            top.occlusion_from_inside_target = inside_in_new_target;
            top.occlusion_from_outside_target = if new_target_is_root {
                Region::new()
            } else {
                outside_in_new_target
            };
        }

        if !filter_moves_pixels {
            return;
        }
        let outsets = background_filters.outsets();
        let Some(top) = self.stack.last_mut() else {
            return;
        };
        let mut reduce = |rect: Rect, transform: &Transform3d| {
            reduce_occlusion_below_surface(
                old_surface,
                outsets,
                rect,
                transform,
                &mut top.occlusion_from_inside_target,
            );
            reduce_occlusion_below_surface(
                old_surface,
                outsets,
                rect,
                transform,
                &mut top.occlusion_from_outside_target,
            );
        };
        reduce(unoccluded_surface_rect, &old_surface.draw_transform);
        if has_replica {
            reduce(unoccluded_replica_rect, &old_surface.replica_draw_transform);
        }
    }

    fn mark_occluded_behind_layer(&mut self, idx: u32) {
        if self.stack.is_empty() {
            return;
        }
        let i = idx as usize;
        let state = self.state;
        let props = state.layer_at(idx);
        if !self.store.flags[i].draws_content
            || !K::is_known(props.opacity_is_animating)
            || props.opacity < 1.0
            || !self.store.blend_mode[i].is_default()
            || K::is_in_unsorted_3d_context(self.store.sorting_context_id[i] != 0)
            || !K::is_known(props.draw_transform_is_animating)
        {
            return;
        }

        let opaque = self.visible_content_opaque_rect(idx);
        if opaque.is_empty_area() || !props.draw_transform.preserves_2d_axis_alignment() {
            return;
        }
        let Some(target_surface) = state.surface_at(props.render_target) else {
            return;
        };

        let mut clip_rect_in_target = self.screen_space_clip_rect_in_target_surface(target_surface);
        clip_rect_in_target = if props.is_clipped {
            clip_rect_in_target.clip_to(props.clip_rect)
        } else {
            clip_rect_in_target.clip_to(target_surface.content_rect)
        };

        let (quad, _) = map_quad(&props.draw_transform, Quad::from_rect(opaque));
        let rect = quad
            .bounding_box()
            .to_enclosed()
            .clip_to(clip_rect_in_target);
        let min = self.minimum_tracking_size;
        if rect.width() < min.width && rect.height() < min.height {
            return;
        }
        if let Some(top) = self.stack.last_mut() {
            top.occlusion_from_inside_target.union_rect(rect);
        }
    }
}

/// Maps each rectangle of `region` through `transform`, keeping only whole
/// pixels. Transforms that do not keep rectangles axis-aligned yield
/// nothing.
fn transform_surface_opaque_region(region: &Region, clip: Option<Rect>, transform: &Transform3d) -> Region {
    if region.is_empty() || !transform.preserves_2d_axis_alignment() {
        return Region::new();
    }
    let mut out = Region::new();
    for &rect in region.rects() {
        let (quad, _) = map_quad(transform, Quad::from_rect(rect));
        let mut mapped = quad.bounding_box().to_enclosed();
        if let Some(clip) = clip {
            mapped = mapped.clip_to(clip);
        }
        out.union_rect(mapped);
    }
    out
}

/// Shrinks occlusion under a surface whose background filter reads pixels
/// around `surface_rect`.
///
/// Occlusion inside the filter's reach is kept only where the filter cannot
/// pull uncovered pixels in from outside it.
fn reduce_occlusion_below_surface(
    surface: &RenderSurface,
    outsets: FilterOutsets,
    surface_rect: Rect,
    surface_transform: &Transform3d,
    occlusion: &mut Region,
) {
    if surface_rect.is_empty_area() {
        return;
    }
    let mut affected = map_enclosing_clipped_rect(surface_transform, surface_rect);
    if surface.is_clipped {
        affected = affected.clip_to(surface.clip_rect);
    }
    if affected.is_empty_area() {
        return;
    }

    // The filter reads beyond the clip.
    let affected = affected.inset_edges(-outsets.left, -outsets.top, -outsets.right, -outsets.bottom);
    let mut affected_occlusion = occlusion.clone();
    affected_occlusion.intersect_rect(affected);
    occlusion.subtract_rect(affected);

    for &rect in affected_occlusion.rects() {
        // A left outset pulls pixels from the right into the rect, so it
        // shrinks the right edge, and so on.
        let shrink_left = if rect.x0 == affected.x0 { 0.0 } else { outsets.right };
        let shrink_top = if rect.y0 == affected.y0 { 0.0 } else { outsets.bottom };
        let shrink_right = if rect.x1 == affected.x1 { 0.0 } else { outsets.left };
        let shrink_bottom = if rect.y1 == affected.y1 { 0.0 } else { outsets.top };
        occlusion.union_rect(rect.inset_edges(shrink_left, shrink_top, shrink_right, shrink_bottom));
    }
}
