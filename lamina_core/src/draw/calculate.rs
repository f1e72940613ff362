// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The recursive draw-property pass.
//!
//! One depth-first walk computes every layer's draw properties, decides which
//! layers own render surfaces, and collects what each surface draws. A
//! subtree's clip and content rects are only known once its children are
//! done, so surface state is finalized on the way back up.
//!
//! Before the walk, a pre-pass counts drawing descendants, copy requests and
//! unclipped descendants per layer, and notes which layers need their
//! children reordered so scroll parents are visited before the layers they
//! scroll.

use alloc::vec::Vec;
use kurbo::{Rect, Size, Vec2};

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use super::inputs::CalcDrawPropsInputs;
use super::properties::RenderSurface;
use super::state::DrawState;
use crate::geometry::{RectExt, rect_from_size, size_is_empty};
use crate::layer::{INVALID, LayerStore, TreeKind};
use crate::math::{
    calculate_visible_rect, calculate_visible_rect_with_cached_layer_rect,
    compute_transform_2d_scale_components, map_clipped_rect, map_enclosing_clipped_rect,
    project_enclosing_clipped_rect,
};
use crate::trace::{CalcBeginEvent, CalcEndEvent, SkipReason, SurfaceReason, Tracer};
use crate::transform::Transform3d;

impl<K: TreeKind> LayerStore<K> {
    /// Computes draw properties, render surfaces and the render surface layer
    /// list for the tree under `inputs.root`.
    ///
    /// # Panics
    ///
    /// Panics if `inputs.root` or `inputs.page_scale_application_layer` is
    /// stale.
    #[must_use]
    pub fn calculate_draw_properties(&mut self, inputs: &CalcDrawPropsInputs) -> DrawState {
        let mut state = DrawState::new();
        self.calculate_draw_properties_into(inputs, &mut state);
        state
    }

    /// Like [`calculate_draw_properties`](Self::calculate_draw_properties),
    /// reusing the allocations of a previous state.
    pub fn calculate_draw_properties_into(
        &mut self,
        inputs: &CalcDrawPropsInputs,
        state: &mut DrawState,
    ) {
        self.calculate_draw_properties_traced(inputs, state, &mut Tracer::none());
    }

    /// Like [`calculate_draw_properties_into`](Self::calculate_draw_properties_into),
    /// reporting to `tracer`.
    pub fn calculate_draw_properties_traced(
        &mut self,
        inputs: &CalcDrawPropsInputs,
        state: &mut DrawState,
        tracer: &mut Tracer<'_>,
    ) {
        self.validate(inputs.root);
        let page_scale_application_layer = match inputs.page_scale_application_layer {
            Some(id) => {
                self.validate(id);
                id.idx
            }
            None => INVALID,
        };

        state.reset(self.slot_count());
        self.drain_changes_into(&mut state.changes);

        let device_transform_scale = {
            let s = compute_transform_2d_scale_components(&inputs.device_transform, 1.0);
            s.x.max(s.y)
        };
        let device_scale_factor = inputs.device_scale_factor * device_transform_scale;

        tracer.calc_begin(&CalcBeginEvent {
            tree: K::NAME,
            layer_count: self.live_count(),
            viewport: inputs.device_viewport_size,
            device_scale_factor,
            page_scale_factor: inputs.page_scale_factor,
        });

        let root = inputs.root.idx;
        let viewport = rect_from_size(inputs.device_viewport_size);
        if !viewport.is_empty_area() && !size_is_empty(self.bounds[root as usize]) {
            let globals = Globals {
                root,
                page_scale_application_layer,
                page_scale_factor: inputs.page_scale_factor,
                device_scale_factor,
                max_texture_size: f64::from(inputs.max_texture_size),
                can_render_to_separate_surface: inputs.can_render_to_separate_surface,
                can_adjust_raster_scales: inputs.can_adjust_raster_scales,
            };
            let data = DataForRecursion {
                parent_matrix: inputs.device_transform.pre_scale(
                    inputs.device_scale_factor,
                    inputs.device_scale_factor,
                ),
                full_hierarchy_matrix: Transform3d::IDENTITY,
                clip_rect_in_target_space: viewport,
                clip_rect_of_target_surface_in_target_space: viewport,
                ancestor_clips_subtree: true,
                nearest_occlusion_immune_ancestor: INVALID,
                in_subtree_of_page_scale_application_layer: false,
                subtree_can_use_lcd_text: inputs.can_use_lcd_text,
                subtree_is_visible_from_ancestor: true,
                ancestor_is_animating_scale: false,
                maximum_animation_contents_scale: 0.0,
            };

            let mut calc = Calculator {
                store: self,
                state: &mut *state,
                tracer: &mut *tracer,
                globals,
                meta: Vec::new(),
                accumulated: Vec::new(),
            };
            calc.run(&data);
        }

        let surface_count = state.render_surface_layer_list.len();
        if surface_count == 0 {
            state.root = INVALID;
        }
        tracer.calc_end(&CalcEndEvent {
            surface_count,
            drawn_layer_count: state.drawn_layer_count(),
            changed_layer_count: state.changes.changed_layer_count(),
        });
    }
}

// ---------------------------------------------------------------------------
// Pass state
// ---------------------------------------------------------------------------

/// Settings that stay fixed for the whole pass.
#[derive(Clone, Copy, Debug)]
struct Globals {
    root: u32,
    page_scale_application_layer: u32,
    page_scale_factor: f64,
    device_scale_factor: f64,
    max_texture_size: f64,
    can_render_to_separate_surface: bool,
    can_adjust_raster_scales: bool,
}

/// What a layer passes down to its children.
#[derive(Clone, Copy, Debug)]
struct DataForRecursion {
    /// Transform from the parent's child space into the target surface.
    parent_matrix: Transform3d,
    /// Transform from the target surface to the screen.
    full_hierarchy_matrix: Transform3d,
    clip_rect_in_target_space: Rect,
    clip_rect_of_target_surface_in_target_space: Rect,
    ancestor_clips_subtree: bool,
    nearest_occlusion_immune_ancestor: u32,
    in_subtree_of_page_scale_application_layer: bool,
    subtree_can_use_lcd_text: bool,
    subtree_is_visible_from_ancestor: bool,
    ancestor_is_animating_scale: bool,
    maximum_animation_contents_scale: f64,
}

/// Per-layer bookkeeping for one pass.
#[derive(Clone, Copy, Debug, Default)]
struct LayerMeta {
    num_descendants_that_draw_content: usize,
    num_unclipped_descendants: usize,
    num_clip_children: usize,
    layer_or_descendant_has_copy_request: bool,
    has_child_with_a_scroll_parent: bool,
    sorted_for_recursion: bool,
    index_of_first_descendants_addition: usize,
    num_descendants_added: usize,
    index_of_first_render_surface_layer_list_addition: usize,
    num_render_surfaces_added: usize,
}

/// Content accumulated for a surface whose subtree is still being visited.
#[derive(Clone, Copy, Debug)]
struct AccumulatedSurfaceState {
    render_target: u32,
    drawable_content_rect: Rect,
}

#[derive(Clone, Copy, Debug, Default)]
struct PreCalculateMetaInformationData {
    layer_or_descendant_has_copy_request: bool,
    num_unclipped_descendants: usize,
}

impl PreCalculateMetaInformationData {
    fn merge(&mut self, other: Self) {
        self.layer_or_descendant_has_copy_request |= other.layer_or_descendant_has_copy_request;
        self.num_unclipped_descendants += other.num_unclipped_descendants;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TranslateRectDirection {
    ToAncestor,
    ToDescendant,
}

/// Which span of a layer's children a contribution list sort reads.
#[derive(Clone, Copy, Debug)]
enum Contributions {
    Descendants,
    RenderSurfaces,
}

struct Calculator<'a, 't, K: TreeKind> {
    store: &'a mut LayerStore<K>,
    state: &'a mut DrawState,
    tracer: &'a mut Tracer<'t>,
    globals: Globals,
    meta: Vec<LayerMeta>,
    accumulated: Vec<AccumulatedSurfaceState>,
}

impl<K: TreeKind> Calculator<'_, '_, K> {
    fn run(&mut self, data: &DataForRecursion) {
        let root = self.globals.root;
        self.meta.clear();
        self.meta.resize(self.store.slot_count(), LayerMeta::default());

        for idx in self.subtree_slots(root) {
            let clip_parent = self.store.clip_parent[idx as usize];
            if clip_parent != INVALID {
                self.meta[clip_parent as usize].num_clip_children += 1;
            }
        }
        self.pre_calculate_meta_information(root);

        self.state.root = root;
        self.calculate_draw_properties_internal(root, data, root);
        self.mark_render_surface_layer_list_members();
    }

    // -- Tree helpers --

    fn parent_of(&self, idx: u32) -> u32 {
        if idx == self.globals.root {
            INVALID
        } else {
            self.store.parent[idx as usize]
        }
    }

    /// Slots of `root` and its descendants, pre-order.
    fn subtree_slots(&self, root: u32) -> Vec<u32> {
        let mut out = Vec::new();
        let mut stack = alloc::vec![root];
        while let Some(idx) = stack.pop() {
            out.push(idx);
            stack.extend(self.store.child_slots(idx));
        }
        out
    }

    fn is_3d_sorted(&self, idx: u32) -> bool {
        self.store.sorting_context_id[idx as usize] != 0
    }

    fn is_in_existing_3d_rendering_context(&self, idx: u32) -> bool {
        let parent = self.parent_of(idx);
        self.is_3d_sorted(idx)
            && parent != INVALID
            && self.is_3d_sorted(parent)
            && self.store.sorting_context_id[parent as usize]
                == self.store.sorting_context_id[idx as usize]
    }

    fn is_root_of_new_rendering_context(&self, idx: u32) -> bool {
        let parent = self.parent_of(idx);
        if parent != INVALID {
            !self.is_3d_sorted(parent) && self.is_3d_sorted(idx)
        } else {
            self.is_3d_sorted(idx)
        }
    }

    fn clips_subtree(&self, idx: u32) -> bool {
        let i = idx as usize;
        self.store.flags[i].masks_to_bounds || self.store.mask_layer[i] != INVALID
    }

    fn surface_mut(&mut self, idx: u32) -> &mut RenderSurface {
        self.state.surfaces[idx as usize].get_or_insert_with(|| RenderSurface::new(idx))
    }

    fn descendants_len(&self, list_owner: u32) -> usize {
        self.state.layer_list(list_owner).len()
    }

    // -- Pre-pass --

    fn pre_calculate_meta_information(&mut self, idx: u32) -> PreCalculateMetaInformationData {
        let i = idx as usize;
        self.meta[i].has_child_with_a_scroll_parent = false;
        self.meta[i].sorted_for_recursion = false;

        if !self.store.transform[i].is_invertible()
            && !self.store.animation[i].transform_is_animating
        {
            self.meta[i].num_descendants_that_draw_content = 0;
            self.meta[i].num_unclipped_descendants = 0;
            self.meta[i].layer_or_descendant_has_copy_request = false;
            return PreCalculateMetaInformationData::default();
        }

        let mut data = PreCalculateMetaInformationData::default();
        if self.store.clip_parent[i] != INVALID {
            data.num_unclipped_descendants += 1;
        }

        let mut num_descendants_that_draw_content = 0;
        let mut child = self.store.first_child[i];
        while child != INVALID {
            let c = child as usize;
            let child_data = self.pre_calculate_meta_information(child);
            num_descendants_that_draw_content += usize::from(self.store.flags[c].draws_content)
                + self.meta[c].num_descendants_that_draw_content;
            if self.store.scroll_parent[c] != INVALID {
                self.meta[i].has_child_with_a_scroll_parent = true;
            }
            data.merge(child_data);
            child = self.store.next_sibling[c];
        }

        data.num_unclipped_descendants = data
            .num_unclipped_descendants
            .saturating_sub(self.meta[i].num_clip_children);
        if self.store.flags[i].has_copy_request {
            data.layer_or_descendant_has_copy_request = true;
        }

        self.meta[i].num_descendants_that_draw_content = num_descendants_that_draw_content;
        self.meta[i].num_unclipped_descendants = data.num_unclipped_descendants;
        self.meta[i].layer_or_descendant_has_copy_request =
            data.layer_or_descendant_has_copy_request;
        data
    }

    // -- Skipping --

    fn subtree_skip_reason(&self, idx: u32, layer_is_drawn: bool) -> Option<SkipReason> {
        let i = idx as usize;
        let animation = self.store.animation[i];
        if !self.store.transform[i].is_invertible() && !animation.transform_is_animating {
            return Some(SkipReason::SingularTransform);
        }
        // Copy requests are honoured even for hidden or transparent subtrees.
        if self.meta[i].layer_or_descendant_has_copy_request {
            return None;
        }
        if !layer_is_drawn {
            return Some(SkipReason::Hidden);
        }
        if self.store.opacity[i] == 0.0
            && K::transparent_subtree_is_skippable(
                animation.opacity_is_animating,
                animation.opacity_can_animate_on_impl,
            )
        {
            return Some(SkipReason::Transparent);
        }
        None
    }

    fn is_layer_back_face_visible(&self, idx: u32) -> bool {
        if self.is_in_existing_3d_rendering_context(idx) {
            self.state.layers[idx as usize]
                .draw_transform
                .is_back_face_visible()
        } else {
            self.store.transform[idx as usize].is_back_face_visible()
        }
    }

    fn is_surface_back_face_visible(&self, idx: u32, draw_transform: &Transform3d) -> bool {
        if self.is_in_existing_3d_rendering_context(idx) {
            return draw_transform.is_back_face_visible();
        }
        if self.is_root_of_new_rendering_context(idx) {
            return self.store.transform[idx as usize].is_back_face_visible();
        }
        // Surfaces in a flattened context always show their front face.
        false
    }

    /// Whether a layer stays out of its target's layer list while its
    /// subtree is still visited.
    fn layer_should_be_skipped(&self, idx: u32, layer_is_drawn: bool) -> bool {
        let i = idx as usize;
        let flags = self.store.flags[i];
        if !layer_is_drawn || !flags.draws_content || size_is_empty(self.store.bounds[i]) {
            return true;
        }

        let mut backface_test_layer = idx;
        if flags.use_parent_backface_visibility {
            let parent = self.parent_of(idx);
            if parent != INVALID {
                backface_test_layer = parent;
            }
        }
        let b = backface_test_layer as usize;
        !self.store.flags[b].double_sided
            && K::is_known(self.state.layers[b].screen_space_transform_is_animating)
            && self.is_layer_back_face_visible(backface_test_layer)
    }

    // -- Surface decision --

    fn separate_surface_reason(&self, idx: u32, axis_aligned: bool) -> Option<SurfaceReason> {
        let i = idx as usize;
        let flags = self.store.flags[i];
        let num_descendants_that_draw_content = self.meta[i].num_descendants_that_draw_content;

        if self.store.mask_layer[i] != INVALID {
            return Some(SurfaceReason::Mask);
        }
        if self.store.replica_layer[i] != INVALID {
            return Some(SurfaceReason::Replica);
        }
        if !self.store.filters[i].is_empty() || !self.store.background_filters[i].is_empty() {
            return Some(SurfaceReason::Filters);
        }
        if self.is_in_existing_3d_rendering_context(idx)
            && flags.should_flatten_transform
            && num_descendants_that_draw_content > 0
        {
            return Some(SurfaceReason::Flattening);
        }
        if !self.store.blend_mode[i].is_default() {
            return Some(SurfaceReason::Blending);
        }
        if self.clips_subtree(idx) && !axis_aligned && num_descendants_that_draw_content > 0 {
            return Some(SurfaceReason::Clipping);
        }

        // Overlap between drawing layers is not checked; two are assumed to
        // overlap.
        let at_least_two_layers_draw_content = num_descendants_that_draw_content > 0
            && (flags.draws_content || num_descendants_that_draw_content > 1);
        if self.store.opacity[i] != 1.0
            && flags.should_flatten_transform
            && at_least_two_layers_draw_content
        {
            return Some(SurfaceReason::Opacity);
        }

        if idx == self.globals.root {
            return Some(SurfaceReason::Root);
        }
        if flags.is_root_for_isolated_group && num_descendants_that_draw_content > 0 {
            return Some(SurfaceReason::Isolation);
        }
        if flags.force_render_surface {
            return Some(SurfaceReason::Forced);
        }
        if flags.has_copy_request {
            return Some(SurfaceReason::CopyRequest);
        }
        None
    }

    // -- Scales --

    /// Largest contents scale a running animation can reach, and whether
    /// some scale is animating.
    fn animation_contents_scale(
        &self,
        idx: u32,
        ancestor_is_animating_scale: bool,
        ancestor_maximum_animation_contents_scale: f64,
        parent_transform: &Transform3d,
        combined_transform: &Transform3d,
    ) -> (bool, f64) {
        if !K::tracks_animation_scale() {
            return (false, 0.0);
        }

        // Scales from two sources cannot be combined.
        if ancestor_is_animating_scale && ancestor_maximum_animation_contents_scale == 0.0 {
            return (true, 0.0);
        }
        if !combined_transform.is_scale_or_translation() {
            return (true, 0.0);
        }

        let animation = self.store.animation[idx as usize];
        let layer_is_animating_scale = animation.transform_is_animating && animation.is_animating_scale();
        match (ancestor_is_animating_scale, layer_is_animating_scale) {
            (false, false) => (false, 0.0),
            (true, true) => (true, 0.0),
            (true, false) => {
                let s = compute_transform_2d_scale_components(&self.store.transform[idx as usize], 0.0);
                (true, ancestor_maximum_animation_contents_scale * s.x.max(s.y))
            }
            (false, true) => {
                let Some(layer_maximum) = animation.maximum_scale else {
                    return (true, 0.0);
                };
                let s = compute_transform_2d_scale_components(parent_transform, 0.0);
                (true, layer_maximum * s.x.max(s.y))
            }
        }
    }

    /// Chooses the raster scale of a scaling layer and remembers it.
    ///
    /// The remembered scale only grows while the layer is static, so small
    /// wobbles do not force re-rasterization. It is reset once the ideal
    /// scale drops below 1, and left untouched while the transform animates.
    fn update_raster_scale(&mut self, idx: u32, ideal_raster_scale: f64, animating: bool) -> f64 {
        let i = idx as usize;
        let saved = self.store.raster_scale[i];
        if animating {
            return if saved > 0.0 { saved } else { 1.0 };
        }
        if !ideal_raster_scale.is_finite() || ideal_raster_scale < 1.0 {
            self.store.raster_scale[i] = 0.0;
            return 1.0;
        }
        if ideal_raster_scale > saved {
            self.store.raster_scale[i] = ideal_raster_scale;
        }
        self.store.raster_scale[i]
    }

    fn update_contents_scale(
        &mut self,
        idx: u32,
        ideal_contents_scale: f64,
        page_scale_factor: f64,
        animating_transform_to_screen: bool,
    ) {
        let i = idx as usize;
        let bounds = self.store.bounds[i];
        let contents_scale = if self.store.flags[i].scales_contents {
            let device_and_page = self.globals.device_scale_factor * page_scale_factor;
            let raster_scale = if self.globals.can_adjust_raster_scales && device_and_page > 0.0 {
                self.update_raster_scale(
                    idx,
                    ideal_contents_scale / device_and_page,
                    animating_transform_to_screen,
                )
            } else {
                1.0
            };
            raster_scale * device_and_page
        } else {
            1.0
        };
        self.set_contents_scale(idx, contents_scale, bounds);

        // Masks are sampled in the owner's content space.
        for mask in [
            self.store.mask_layer[i],
            self.replica_mask_of(idx),
        ] {
            if mask != INVALID {
                let m = mask as usize;
                let mask_scale = if self.store.flags[m].scales_contents {
                    contents_scale
                } else {
                    1.0
                };
                let mask_bounds = self.store.bounds[m];
                self.set_contents_scale(mask, mask_scale, mask_bounds);
            }
        }
    }

    fn set_contents_scale(&mut self, idx: u32, contents_scale: f64, bounds: Size) {
        let props = &mut self.state.layers[idx as usize];
        props.contents_scale = contents_scale;
        props.content_bounds = if contents_scale == 1.0 {
            bounds
        } else {
            Size::new(
                (bounds.width * contents_scale).ceil(),
                (bounds.height * contents_scale).ceil(),
            )
        };
    }

    fn update_layer_scale_draw_properties(
        &mut self,
        idx: u32,
        ideal_contents_scale: f64,
        maximum_animation_contents_scale: f64,
        page_scale_factor: f64,
    ) {
        let device_scale_factor = self.globals.device_scale_factor;
        let i = idx as usize;
        for target in [idx, self.store.mask_layer[i], self.replica_mask_of(idx)] {
            if target == INVALID {
                continue;
            }
            let props = &mut self.state.layers[target as usize];
            props.ideal_contents_scale = ideal_contents_scale;
            props.maximum_animation_contents_scale = maximum_animation_contents_scale;
            props.page_scale_factor = page_scale_factor;
            props.device_scale_factor = device_scale_factor;
        }
    }

    fn replica_mask_of(&self, idx: u32) -> u32 {
        let replica = self.store.replica_layer[idx as usize];
        if replica == INVALID {
            INVALID
        } else {
            self.store.mask_layer[replica as usize]
        }
    }

    // -- Clip children --

    /// Translation between the target surfaces of `ancestor` and
    /// `descendant`, as a rect in one maps into the other.
    fn translate_rect_to_target_space(
        &self,
        ancestor: u32,
        descendant: u32,
        rect: Rect,
        direction: TranslateRectDirection,
    ) -> Rect {
        let ancestor_target = self.state.layers[ancestor as usize].render_target;
        let mut target = self.state.layers[descendant as usize].render_target;
        let mut translation = Vec2::ZERO;
        while target != ancestor_target && target != INVALID {
            if let Some(surface) = self.state.surface_at(target) {
                translation += surface.draw_transform.to_2d_translation();
            }
            let parent = self.parent_of(target);
            target = if parent == INVALID {
                INVALID
            } else {
                self.state.layers[parent as usize].render_target
            };
        }
        if direction == TranslateRectDirection::ToDescendant {
            translation = -translation;
        }
        rect.translated(translation).to_enclosing()
    }

    /// Replaces the inherited clip with the clip of the layer's clip parent
    /// or scroll parent, moved into this layer's target space.
    fn update_clip_rects_for_clip_child(
        &self,
        idx: u32,
        clip_rect_in_parent_target_space: &mut Rect,
        subtree_should_be_clipped: &mut bool,
    ) {
        let i = idx as usize;
        let parent = self.parent_of(idx);
        let mut clip_parent = self.store.scroll_parent[i];
        if clip_parent == INVALID {
            clip_parent = self.store.clip_parent[i];
        }
        if clip_parent == INVALID || clip_parent == parent || parent == INVALID {
            return;
        }

        let clip_parent_props = &self.state.layers[clip_parent as usize];
        *subtree_should_be_clipped = clip_parent_props.is_clipped;
        let clip_rect = clip_parent_props.clip_rect;
        *clip_rect_in_parent_target_space = if clip_parent == self.store.clip_parent[i] {
            self.translate_rect_to_target_space(
                clip_parent,
                parent,
                clip_rect,
                TranslateRectDirection::ToDescendant,
            )
        } else {
            self.translate_rect_to_target_space(
                parent,
                clip_parent,
                clip_rect,
                TranslateRectDirection::ToAncestor,
            )
        };
    }

    // -- Child ordering --

    fn child_containing_layer(&self, parent: u32, layer: u32) -> Option<u32> {
        let mut ancestor = layer;
        while ancestor != INVALID {
            let next = self.store.parent[ancestor as usize];
            if next == parent {
                return Some(ancestor);
            }
            ancestor = next;
        }
        None
    }

    fn add_scroll_parent_chain(&mut self, out: &mut Vec<u32>, parent: u32, layer: u32) {
        // Only children of `parent` can be reordered; scroll parents
        // elsewhere in the tree are reached through the child containing
        // them.
        let Some(child) = self.child_containing_layer(parent, layer) else {
            return;
        };
        if self.meta[child as usize].sorted_for_recursion {
            return;
        }
        // Marked before recursing so a scroll parent chain that loops back
        // to `child` stops here.
        self.meta[child as usize].sorted_for_recursion = true;
        let scroll_parent = self.store.scroll_parent[child as usize];
        if scroll_parent != INVALID {
            self.add_scroll_parent_chain(out, parent, scroll_parent);
        }
        out.push(child);
    }

    /// Children of `parent`, each after the child containing its scroll
    /// parent. Returns whether the order differs from paint order.
    fn sort_children_for_recursion(&mut self, parent: u32) -> (Vec<u32>, bool) {
        let children: Vec<u32> = self.store.child_slots(parent).collect();
        let mut out = Vec::with_capacity(children.len());
        let mut order_changed = false;
        for child in children {
            if self.meta[child as usize].sorted_for_recursion {
                order_changed = true;
                continue;
            }
            self.add_scroll_parent_chain(&mut out, parent, child);
        }
        (out, order_changed)
    }

    // -- Surface bookkeeping --

    /// Removes a surface that turned out to draw nothing, together with the
    /// descendant surfaces collected since it was created.
    fn remove_surface_for_early_exit(&mut self, idx: u32, render_surface_layer_list_start: usize) {
        let removed: Vec<u32> = self
            .state
            .render_surface_layer_list
            .drain(render_surface_layer_list_start..)
            .collect();
        for owner in removed {
            self.state.surfaces[owner as usize] = None;
        }
        self.state.surfaces[idx as usize] = None;
        self.tracer.surface_dropped(idx);
    }

    /// Adds a finished subtree's footprint to every surface between it and
    /// its target.
    fn update_accumulated_surface_state(&mut self, idx: u32, drawable_content_rect: Rect) {
        if idx == self.globals.root {
            return;
        }
        let i = idx as usize;
        let clip_parent = self.store.clip_parent[i];
        let render_target = if clip_parent != INVALID {
            self.state.layers[clip_parent as usize].render_target
        } else {
            self.state.layers[self.parent_of(idx) as usize].render_target
        };
        if render_target == INVALID {
            return;
        }

        // A surface owner's own rect is in the wrong space; use its
        // footprint in the target instead.
        let mut target_rect = match self.state.surface_at(idx) {
            Some(surface) => surface.drawable_content_rect().to_enclosed(),
            None => drawable_content_rect,
        };

        let target_props = &self.state.layers[render_target as usize];
        if target_props.is_clipped {
            let mut clip_rect = target_props.clip_rect;
            if clip_parent != INVALID {
                clip_rect = self.translate_rect_to_target_space(
                    clip_parent,
                    idx,
                    clip_rect,
                    TranslateRectDirection::ToDescendant,
                );
            }
            target_rect = target_rect.clip_to(clip_rect);
        }

        for acc in self.accumulated.iter_mut().rev() {
            acc.drawable_content_rect = acc.drawable_content_rect.bounding_union(target_rect);
            if acc.render_target == render_target {
                break;
            }
            let Some(surface) = self.state.surfaces[acc.render_target as usize].as_ref() else {
                break;
            };
            target_rect = map_clipped_rect(&surface.draw_transform, target_rect).to_enclosing();
        }
    }

    fn calculate_visible_content_rect(
        &self,
        idx: u32,
        clip_rect_of_target_surface_in_target_space: Rect,
        layer_rect_in_target_space: Rect,
    ) -> Rect {
        let props = &self.state.layers[idx as usize];
        if !self.store.flags[idx as usize].draws_content {
            return Rect::ZERO;
        }
        let content_rect = props.content_rect();
        if content_rect.is_empty_area() || props.drawable_content_rect.is_empty_area() {
            return Rect::ZERO;
        }

        // The drawable rect is already clipped by everything inside the
        // surface; the surface's own clip must be applied on top.
        let mut visible_rect_in_target_surface_space = props.drawable_content_rect;
        let target_clip_is_set = self
            .state
            .surface_at(props.render_target)
            .is_some_and(|s| !s.clip_rect.is_empty_area());
        if target_clip_is_set {
            visible_rect_in_target_surface_space = visible_rect_in_target_surface_space
                .clip_to(clip_rect_of_target_surface_in_target_space);
        }
        if visible_rect_in_target_surface_space.is_empty_area() {
            return Rect::ZERO;
        }

        calculate_visible_rect_with_cached_layer_rect(
            visible_rect_in_target_surface_space,
            content_rect,
            layer_rect_in_target_space,
            &props.draw_transform,
        )
    }

    /// Stable-sorts a newly collected 3-D rendering context, farthest first.
    fn sort_3d_context(&mut self, list_owner: u32, start: usize) {
        let list = self.state.layer_list(list_owner);
        if list.len() <= start + 1 {
            return;
        }
        let mut keyed: Vec<(f64, u32)> = list[start..]
            .iter()
            .map(|&idx| (self.depth_in_target(idx, list_owner), idx))
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        let list = &mut self.surface_mut(list_owner).layer_list;
        for (slot, (_, idx)) in list[start..].iter_mut().zip(keyed) {
            *slot = idx;
        }
    }

    fn depth_in_target(&self, idx: u32, list_owner: u32) -> f64 {
        let (transform, rect) = match self.state.surface_at(idx) {
            Some(surface) if idx != list_owner => (surface.draw_transform, surface.content_rect),
            _ => {
                let props = &self.state.layers[idx as usize];
                (props.draw_transform, props.content_rect())
            }
        };
        let c = rect.center();
        let [_, _, z, w] = transform.map_vec4([c.x, c.y, 0.0, 1.0]);
        if w.abs() > f64::EPSILON { z / w } else { z }
    }

    fn mark_render_surface_layer_list_members(&mut self) {
        for s in 0..self.state.render_surface_layer_list.len() {
            let owner = self.state.render_surface_layer_list[s];
            let Some(surface) = self.state.surfaces[owner as usize].as_ref() else {
                continue;
            };
            for &idx in &surface.layer_list {
                self.state.layers[idx as usize].in_render_surface_layer_list = true;
            }
            for mask in [self.store.mask_layer[owner as usize], self.replica_mask_of(owner)] {
                if mask != INVALID {
                    self.state.layers[mask as usize].in_render_surface_layer_list = true;
                }
            }
        }
    }

    // -- The walk --

    fn calculate_draw_properties_internal(
        &mut self,
        idx: u32,
        data_from_ancestor: &DataForRecursion,
        list_owner: u32,
    ) {
        let i = idx as usize;
        let is_root = idx == self.globals.root;
        let parent = self.parent_of(idx);
        let flags = self.store.flags[i];
        let animation = self.store.animation[i];

        let layer_is_visible =
            data_from_ancestor.subtree_is_visible_from_ancestor && !flags.hide_layer_and_subtree;
        let layer_is_drawn = layer_is_visible || flags.has_copy_request;

        if !is_root {
            if let Some(reason) = self.subtree_skip_reason(idx, layer_is_drawn) {
                self.tracer.subtree_skipped(idx, reason);
                return;
            }
        }
        self.state.layers[i].num_unclipped_descendants = self.meta[i].num_unclipped_descendants;

        let mut ancestor_clip_rect_in_target_space = data_from_ancestor.clip_rect_in_target_space;
        let mut ancestor_clips_subtree = data_from_ancestor.ancestor_clips_subtree;
        self.update_clip_rects_for_clip_child(
            idx,
            &mut ancestor_clip_rect_in_target_space,
            &mut ancestor_clips_subtree,
        );

        // -- Opacity and animation flags --

        let mut accumulated_draw_opacity = self.store.opacity[i];
        let mut animating_opacity_to_target = animation.opacity_is_animating;
        let mut animating_opacity_to_screen = animating_opacity_to_target;
        let mut animating_transform_to_target = animation.transform_is_animating;
        let mut animating_transform_to_screen = animating_transform_to_target;
        if parent != INVALID {
            let p = &self.state.layers[parent as usize];
            accumulated_draw_opacity *= p.opacity;
            animating_opacity_to_target |= p.opacity_is_animating;
            animating_opacity_to_screen |= p.screen_space_opacity_is_animating;
            animating_transform_to_target |= p.draw_transform_is_animating;
            animating_transform_to_screen |= p.screen_space_transform_is_animating;
        }

        // -- Transforms --

        let position = self.store.position[i] - self.store.scroll_offset[i];
        let origin = self.store.transform_origin[i];
        let local = self.store.transform[i];
        let combined_transform = if local.is_identity() {
            data_from_ancestor
                .parent_matrix
                .pre_translate(position.x, position.y, 0.0)
        } else {
            (data_from_ancestor.parent_matrix.pre_translate(
                position.x + origin.x,
                position.y + origin.y,
                origin.z,
            ) * local)
                .pre_translate(-origin.x, -origin.y, -origin.z)
        };

        let (combined_is_animating_scale, combined_maximum_animation_contents_scale) =
            if self.globals.can_adjust_raster_scales {
                self.animation_contents_scale(
                    idx,
                    data_from_ancestor.ancestor_is_animating_scale,
                    data_from_ancestor.maximum_animation_contents_scale,
                    &data_from_ancestor.parent_matrix,
                    &combined_transform,
                )
            } else {
                (false, 0.0)
            };

        let page_scale_factor = if data_from_ancestor.in_subtree_of_page_scale_application_layer {
            self.globals.page_scale_factor
        } else {
            1.0
        };
        let layer_scale_factors = self.globals.device_scale_factor * page_scale_factor;
        let combined_transform_scales =
            compute_transform_2d_scale_components(&combined_transform, layer_scale_factors);
        let ideal_contents_scale = if self.globals.can_adjust_raster_scales {
            combined_transform_scales.x.max(combined_transform_scales.y)
        } else {
            layer_scale_factors
        };

        self.update_contents_scale(
            idx,
            ideal_contents_scale,
            page_scale_factor,
            animating_transform_to_screen,
        );
        self.update_layer_scale_draw_properties(
            idx,
            ideal_contents_scale,
            combined_maximum_animation_contents_scale,
            page_scale_factor,
        );

        let contents_scale = self.state.layers[i].contents_scale;
        let content_rect = self.state.layers[i].content_rect();
        let mut draw_transform = combined_transform.pre_scale(1.0 / contents_scale, 1.0 / contents_scale);

        let mut screen_space_transform = data_from_ancestor.full_hierarchy_matrix;
        if flags.should_flatten_transform {
            screen_space_transform = screen_space_transform.flattened();
        }
        screen_space_transform = screen_space_transform * draw_transform;

        // Switching text anti-aliasing mid-animation would force repaints.
        let adjust_text_aa = !animating_opacity_to_screen && !animating_transform_to_screen;
        let layer_can_use_lcd_text = data_from_ancestor.subtree_can_use_lcd_text
            && accumulated_draw_opacity == 1.0
            && draw_transform.is_identity_or_integer_translation();

        let render_surface_sublayer_scale = sanitize_scale(if self.globals.can_adjust_raster_scales {
            combined_transform_scales
        } else {
            Vec2::new(layer_scale_factors, layer_scale_factors)
        });

        let surface_reason = if self.globals.can_render_to_separate_surface {
            self.separate_surface_reason(idx, combined_transform.preserves_2d_axis_alignment())
        } else if is_root {
            Some(SurfaceReason::Root)
        } else {
            None
        };

        let mut data_for_children = DataForRecursion {
            parent_matrix: Transform3d::IDENTITY,
            full_hierarchy_matrix: data_from_ancestor.full_hierarchy_matrix,
            clip_rect_in_target_space: Rect::ZERO,
            clip_rect_of_target_surface_in_target_space: Rect::ZERO,
            ancestor_clips_subtree: false,
            nearest_occlusion_immune_ancestor: data_from_ancestor
                .nearest_occlusion_immune_ancestor,
            in_subtree_of_page_scale_application_layer: data_from_ancestor
                .in_subtree_of_page_scale_application_layer,
            subtree_can_use_lcd_text: data_from_ancestor.subtree_can_use_lcd_text,
            subtree_is_visible_from_ancestor: layer_is_drawn,
            ancestor_is_animating_scale: combined_is_animating_scale,
            maximum_animation_contents_scale: combined_maximum_animation_contents_scale,
        };

        let mut layer_or_ancestor_clips_descendants = false;
        let mut clip_rect_in_target_space = Rect::ZERO;
        let clip_rect_of_target_surface_in_target_space;
        let mut render_surface_layer_list_start = 0;
        let owns_surface = surface_reason.is_some();

        if let Some(reason) = surface_reason {
            // -- Surface owner --

            if !flags.double_sided
                && K::is_known(animation.transform_is_animating)
                && self.is_surface_back_face_visible(idx, &combined_transform)
            {
                self.tracer.subtree_skipped(idx, SkipReason::BackFace);
                return;
            }
            self.tracer.surface_created(idx, reason);

            let mut surface = RenderSurface::new(idx);
            if is_root {
                data_for_children.parent_matrix = combined_transform;
                surface.contributes_to_drawn_surface = false;
            } else {
                let sublayer = render_surface_sublayer_scale;
                surface.draw_transform = combined_transform.pre_scale(1.0 / sublayer.x, 1.0 / sublayer.y);
                // Layers drawing into the surface see the sublayer scale as
                // their parent matrix; the owner draws into it unscaled.
                draw_transform = Transform3d::from_scale(
                    sublayer.x / contents_scale,
                    sublayer.y / contents_scale,
                    1.0,
                );
                data_for_children.parent_matrix = Transform3d::from_scale(sublayer.x, sublayer.y, 1.0);
                surface.contributes_to_drawn_surface = layer_is_visible;
            }

            surface.draw_opacity = accumulated_draw_opacity;
            surface.draw_opacity_is_animating = animating_opacity_to_target;

            surface.target_surface_transforms_are_animating = animating_transform_to_target;
            surface.screen_space_transforms_are_animating = animating_transform_to_screen;

            data_for_children.full_hierarchy_matrix =
                data_for_children.full_hierarchy_matrix * surface.draw_transform;

            // Masks are drawn with the surface, in the owner's content space.
            for mask in [self.store.mask_layer[i], self.replica_mask_of(idx)] {
                if mask != INVALID {
                    let m = &mut self.state.layers[mask as usize];
                    m.render_target = idx;
                    m.visible_content_rect = content_rect;
                }
            }

            let filters = &self.store.filters[i];
            if flags.has_copy_request
                || self.store.replica_layer[i] != INVALID
                || filters.has_reference_filter()
                || filters.has_filter_that_moves_pixels()
            {
                data_for_children.nearest_occlusion_immune_ancestor = idx;
            }
            surface.nearest_occlusion_immune_ancestor =
                data_for_children.nearest_occlusion_immune_ancestor;

            // The surface absorbs the clip from above. With unclipped
            // descendants it cannot, and its layers clip themselves instead.
            let mut subtree_is_clipped_by_surface_bounds = false;
            let mut clip_of_target = Rect::ZERO;
            if ancestor_clips_subtree {
                let inverse = surface.draw_transform.inverse().unwrap_or(Transform3d::IDENTITY);
                let projected =
                    project_enclosing_clipped_rect(&inverse, ancestor_clip_rect_in_target_space);
                if self.meta[i].num_unclipped_descendants > 0 {
                    layer_or_ancestor_clips_descendants = true;
                    clip_rect_in_target_space = projected;
                } else {
                    surface.clip_rect = ancestor_clip_rect_in_target_space;
                    clip_of_target = projected;
                    subtree_is_clipped_by_surface_bounds = true;
                }
            }
            surface.is_clipped = subtree_is_clipped_by_surface_bounds;
            if !subtree_is_clipped_by_surface_bounds {
                surface.clip_rect = Rect::ZERO;
                clip_of_target = data_from_ancestor.clip_rect_of_target_surface_in_target_space;
            }
            clip_rect_of_target_surface_in_target_space = clip_of_target;

            data_for_children.subtree_can_use_lcd_text = layer_can_use_lcd_text;
            surface.has_replica = self.store.replica_layer[i] != INVALID;

            self.accumulated.push(AccumulatedSurfaceState {
                render_target: idx,
                drawable_content_rect: Rect::ZERO,
            });
            render_surface_layer_list_start = self.state.render_surface_layer_list.len();
            self.state.surfaces[i] = Some(surface);

            let props = &mut self.state.layers[i];
            props.render_target = idx;
            props.opacity = 1.0;
            props.opacity_is_animating = false;
            props.screen_space_opacity_is_animating = animating_opacity_to_screen;
            props.draw_transform_is_animating = false;
            props.screen_space_transform_is_animating = animating_transform_to_screen;
        } else {
            // -- Drawing into the parent's target --

            data_for_children.parent_matrix = combined_transform;
            layer_or_ancestor_clips_descendants = ancestor_clips_subtree;
            if ancestor_clips_subtree {
                clip_rect_in_target_space = ancestor_clip_rect_in_target_space;
            }
            clip_rect_of_target_surface_in_target_space =
                data_from_ancestor.clip_rect_of_target_surface_in_target_space;

            let render_target = if parent == INVALID {
                INVALID
            } else {
                self.state.layers[parent as usize].render_target
            };
            let props = &mut self.state.layers[i];
            props.render_target = render_target;
            props.opacity = accumulated_draw_opacity;
            props.opacity_is_animating = animating_opacity_to_target;
            props.screen_space_opacity_is_animating = animating_opacity_to_screen;
            props.draw_transform_is_animating = animating_transform_to_target;
            props.screen_space_transform_is_animating = animating_transform_to_screen;
        }

        {
            let props = &mut self.state.layers[i];
            props.draw_transform = draw_transform;
            props.screen_space_transform = screen_space_transform;
            if adjust_text_aa {
                props.can_use_lcd_text = layer_can_use_lcd_text;
            }
        }

        let rect_in_target_space = map_enclosing_clipped_rect(&draw_transform, content_rect);

        if self.clips_subtree(idx) {
            layer_or_ancestor_clips_descendants = true;
            clip_rect_in_target_space = if ancestor_clips_subtree && !owns_surface {
                // A layer without a surface shares its parent's target, so
                // the inherited clip is already in the right space.
                ancestor_clip_rect_in_target_space.clip_to(rect_in_target_space)
            } else {
                rect_in_target_space
            };
        }

        {
            let props = &mut self.state.layers[i];
            props.is_clipped = layer_or_ancestor_clips_descendants;
            props.clip_rect = if layer_or_ancestor_clips_descendants {
                clip_rect_in_target_space
            } else {
                rect_in_target_space
            };
        }

        // -- Children --

        let descendants_owner = if owns_surface { idx } else { list_owner };
        let sorting_start_index = self.descendants_len(descendants_owner);

        if !self.layer_should_be_skipped(idx, layer_is_drawn) {
            self.surface_mut(descendants_owner).layer_list.push(idx);
        }

        if self.store.first_child[i] != INVALID {
            if idx == self.globals.page_scale_application_layer {
                let psf = self.globals.page_scale_factor;
                data_for_children.parent_matrix = data_for_children.parent_matrix.pre_scale(psf, psf);
                data_for_children.in_subtree_of_page_scale_application_layer = true;
            }
            if flags.should_flatten_transform {
                data_for_children.parent_matrix = data_for_children.parent_matrix.flattened();
            }
            data_for_children.clip_rect_in_target_space = clip_rect_in_target_space;
            data_for_children.clip_rect_of_target_surface_in_target_space =
                clip_rect_of_target_surface_in_target_space;
            data_for_children.ancestor_clips_subtree = layer_or_ancestor_clips_descendants;
        }

        let (children, child_order_changed) = if self.meta[i].has_child_with_a_scroll_parent {
            self.sort_children_for_recursion(idx)
        } else {
            (self.store.child_slots(idx).collect(), false)
        };

        for child in children {
            let c = child as usize;
            self.meta[c].index_of_first_descendants_addition = self.descendants_len(descendants_owner);
            self.meta[c].index_of_first_render_surface_layer_list_addition =
                self.state.render_surface_layer_list.len();

            self.calculate_draw_properties_internal(child, &data_for_children, descendants_owner);

            let child_surface_contributes = self.state.surface_at(child).is_some_and(|s| {
                !s.layer_list.is_empty() && !s.content_rect.is_empty_area()
            });
            if child_surface_contributes {
                self.surface_mut(descendants_owner).layer_list.push(child);
            }

            self.meta[c].num_descendants_added = self.descendants_len(descendants_owner)
                - self.meta[c].index_of_first_descendants_addition;
            self.meta[c].num_render_surfaces_added = self.state.render_surface_layer_list.len()
                - self.meta[c].index_of_first_render_surface_layer_list_addition;
        }

        // Scroll-parent reordering must not leak into paint order.
        if child_order_changed {
            let store = &*self.store;
            let meta = &self.meta;
            sort_layer_list_contributions(
                store,
                meta,
                idx,
                &mut self.state.render_surface_layer_list,
                Contributions::RenderSurfaces,
            );
            if let Some(surface) = self.state.surfaces[descendants_owner as usize].as_mut() {
                sort_layer_list_contributions(
                    store,
                    meta,
                    idx,
                    &mut surface.layer_list,
                    Contributions::Descendants,
                );
            }
        }

        // -- Finalize --

        let mut local_drawable_content_rect_of_subtree = self
            .accumulated
            .last()
            .map_or(Rect::ZERO, |s| s.drawable_content_rect);
        if owns_surface {
            self.accumulated.pop();
        }

        if owns_surface && !is_root && self.descendants_len(idx) == 0 {
            self.remove_surface_for_early_exit(idx, render_surface_layer_list_start);
            return;
        }

        let mut drawable_content_rect = rect_in_target_space;
        if layer_or_ancestor_clips_descendants {
            drawable_content_rect = drawable_content_rect.clip_to(clip_rect_in_target_space);
        }
        self.state.layers[i].drawable_content_rect = drawable_content_rect;
        if flags.draws_content {
            local_drawable_content_rect_of_subtree =
                local_drawable_content_rect_of_subtree.bounding_union(drawable_content_rect);
        }

        self.state.layers[i].visible_content_rect = self.calculate_visible_content_rect(
            idx,
            clip_rect_of_target_surface_in_target_space,
            rect_in_target_space,
        );

        if owns_surface {
            if is_root {
                self.surface_mut(idx).content_rect = ancestor_clip_rect_in_target_space;
            } else {
                let mut clipped_content_rect = local_drawable_content_rect_of_subtree;
                // Reflections are not clipped, and an animating transform
                // gives no usable clip.
                if self.store.replica_layer[i] == INVALID
                    && K::is_known(animation.transform_is_animating)
                {
                    if let Some(surface) = self.state.surface_at(idx) {
                        if surface.is_clipped && !clipped_content_rect.is_empty_area() {
                            let surface_clip_rect = calculate_visible_rect(
                                surface.clip_rect,
                                clipped_content_rect,
                                &surface.draw_transform,
                            );
                            clipped_content_rect = clipped_content_rect.clip_to(surface_clip_rect);
                        }
                    }
                }

                let max = self.globals.max_texture_size;
                if clipped_content_rect.width() > max || clipped_content_rect.height() > max {
                    let x1 = clipped_content_rect.x0 + clipped_content_rect.width().min(max);
                    let y1 = clipped_content_rect.y0 + clipped_content_rect.height().min(max);
                    clipped_content_rect =
                        Rect::new(clipped_content_rect.x0, clipped_content_rect.y0, x1, y1);
                }

                if clipped_content_rect.is_empty_area() {
                    self.remove_surface_for_early_exit(idx, render_surface_layer_list_start);
                    return;
                }

                let sublayer = render_surface_sublayer_scale;
                let surface_screen_space_transform = screen_space_transform
                    .pre_scale(contents_scale / sublayer.x, contents_scale / sublayer.y);
                let replica = self.store.replica_layer[i];
                let surface_origin_to_replica_origin = (replica != INVALID).then(|| {
                    let r = replica as usize;
                    let replica_position = self.store.position[r];
                    let replica_origin = self.store.transform_origin[r];
                    (Transform3d::from_scale(sublayer.x, sublayer.y, 1.0).pre_translate(
                        replica_position.x + replica_origin.x,
                        replica_position.y + replica_origin.y,
                        0.0,
                    ) * self.store.transform[r])
                        .pre_translate(-replica_origin.x, -replica_origin.y, 0.0)
                        .pre_scale(1.0 / sublayer.x, 1.0 / sublayer.y)
                });

                let surface = self.surface_mut(idx);
                surface.content_rect = clipped_content_rect;
                surface.screen_space_transform = surface_screen_space_transform;
                if let Some(m) = surface_origin_to_replica_origin {
                    surface.replica_draw_transform = surface.draw_transform * m;
                    surface.replica_screen_space_transform = surface.screen_space_transform * m;
                }
            }
            self.state.render_surface_layer_list.push(idx);
        }

        if sorting_start_index == self.descendants_len(descendants_owner) {
            return;
        }

        if K::sorts_3d_contexts()
            && self.is_3d_sorted(idx)
            && !self.is_in_existing_3d_rendering_context(idx)
        {
            self.sort_3d_context(descendants_owner, sorting_start_index);
        }

        self.update_accumulated_surface_state(idx, local_drawable_content_rect_of_subtree);
    }
}

/// Puts the contributions of `parent`'s children back into paint order.
///
/// Each child's additions form one contiguous run of `list`, recorded while
/// the children were visited in scroll-parent order.
fn sort_layer_list_contributions<K: TreeKind>(
    store: &LayerStore<K>,
    meta: &[LayerMeta],
    parent: u32,
    list: &mut Vec<u32>,
    which: Contributions,
) {
    let mut start = usize::MAX;
    let mut buffer = Vec::new();
    for child in store.child_slots(parent) {
        let m = &meta[child as usize];
        let (first, count) = match which {
            Contributions::Descendants => {
                (m.index_of_first_descendants_addition, m.num_descendants_added)
            }
            Contributions::RenderSurfaces => (
                m.index_of_first_render_surface_layer_list_addition,
                m.num_render_surfaces_added,
            ),
        };
        start = start.min(first);
        if let Some(run) = list.get(first..first + count) {
            buffer.extend_from_slice(run);
        }
    }
    if start == usize::MAX || start + buffer.len() != list.len() {
        return;
    }
    list.truncate(start);
    list.extend(buffer);
}

/// A sublayer scale that can be divided by.
fn sanitize_scale(scale: Vec2) -> Vec2 {
    let fix = |s: f64| if s.is_finite() && s != 0.0 { s } else { 1.0 };
    Vec2::new(fix(scale.x), fix(scale.y))
}
