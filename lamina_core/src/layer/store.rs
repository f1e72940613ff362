// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays layer storage with allocation, topology, and property management.

use alloc::vec::Vec;
use core::marker::PhantomData;

use kurbo::{Point, Rect, Size, Vec2};
use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use crate::dirty;
use crate::filter::{BlendMode, FilterOperations};
use crate::geometry::Point3;
use crate::transform::Transform3d;

use super::animation::AnimationState;
use super::id::{INVALID, LayerId};
use super::traverse::Children;
use super::tree::{ImplTree, TreeKind};

/// Per-layer boolean properties.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct LayerFlags {
    /// Clip the subtree to this layer's bounds.
    pub masks_to_bounds: bool,
    /// The layer paints something itself.
    pub draws_content: bool,
    /// Every pixel the layer paints is opaque.
    pub contents_opaque: bool,
    /// The back face is drawn when the layer faces away from the viewer.
    pub double_sided: bool,
    /// Hide this layer and its subtree.
    pub hide_layer_and_subtree: bool,
    /// Project into the parent's plane instead of preserving 3-D.
    pub should_flatten_transform: bool,
    /// Use the parent's double-sidedness and transform for back-face culling.
    pub use_parent_backface_visibility: bool,
    /// Always give this layer a render surface.
    pub force_render_surface: bool,
    /// Blending descendants only see content inside this layer's surface.
    pub is_root_for_isolated_group: bool,
    /// A copy of this layer's rendered output has been requested.
    pub has_copy_request: bool,
    /// The content can be rasterized at any scale. Layers that cannot are
    /// drawn at scale 1 and stretched by their draw transform.
    pub scales_contents: bool,
}

impl Default for LayerFlags {
    fn default() -> Self {
        Self {
            masks_to_bounds: false,
            draws_content: false,
            contents_opaque: false,
            double_sided: true,
            hide_layer_and_subtree: false,
            should_flatten_transform: true,
            use_parent_backface_visibility: false,
            force_render_surface: false,
            is_root_for_isolated_group: false,
            has_copy_request: false,
            scales_contents: false,
        }
    }
}

/// Struct-of-arrays storage for all layers of one tree.
///
/// Layers are addressed by [`LayerId`] handles. Internally, each layer occupies
/// a slot in parallel arrays. Destroyed layers are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// `K` selects main- or impl-tree policy (see [`TreeKind`]).
#[derive(Debug)]
pub struct LayerStore<K: TreeKind = ImplTree> {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Attachments and non-structural links --
    pub(crate) mask_layer: Vec<u32>,
    pub(crate) replica_layer: Vec<u32>,
    /// Owner of an attached mask or replica layer.
    pub(crate) attached_to: Vec<u32>,
    pub(crate) clip_parent: Vec<u32>,
    pub(crate) scroll_parent: Vec<u32>,

    // -- Local properties (set by callers) --
    pub(crate) bounds: Vec<Size>,
    pub(crate) position: Vec<Point>,
    pub(crate) transform_origin: Vec<Point3>,
    pub(crate) transform: Vec<Transform3d>,
    pub(crate) scroll_offset: Vec<Vec2>,
    pub(crate) opacity: Vec<f32>,
    pub(crate) flags: Vec<LayerFlags>,
    pub(crate) sorting_context_id: Vec<i32>,
    pub(crate) opaque_rect: Vec<Rect>,
    pub(crate) filters: Vec<FilterOperations>,
    pub(crate) background_filters: Vec<FilterOperations>,
    pub(crate) blend_mode: Vec<BlendMode>,
    pub(crate) animation: Vec<AnimationState>,

    // -- Raster state (kept across passes) --
    /// Saved raster scale, `0.0` when unknown.
    pub(crate) raster_scale: Vec<f64>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,

    kind: PhantomData<K>,
}

impl<K: TreeKind> Default for LayerStore<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: TreeKind> LayerStore<K> {
    /// Creates an empty layer store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            mask_layer: Vec::new(),
            replica_layer: Vec::new(),
            attached_to: Vec::new(),
            clip_parent: Vec::new(),
            scroll_parent: Vec::new(),
            bounds: Vec::new(),
            position: Vec::new(),
            transform_origin: Vec::new(),
            transform: Vec::new(),
            scroll_offset: Vec::new(),
            opacity: Vec::new(),
            flags: Vec::new(),
            sorting_context_id: Vec::new(),
            opaque_rect: Vec::new(),
            filters: Vec::new(),
            background_filters: Vec::new(),
            blend_mode: Vec::new(),
            animation: Vec::new(),
            raster_scale: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
            kind: PhantomData,
        }
    }

    // -- Allocation API --

    /// Creates a new layer and returns its handle.
    ///
    /// The layer starts with empty bounds, an identity transform, full
    /// opacity, default [`LayerFlags`], and no parent.
    pub fn create_layer(&mut self) -> LayerId {
        let idx = if let Some(idx) = self.free_list.pop() {
            self.generation[idx as usize] += 1;
            self.reset_slot(idx as usize);
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.mask_layer.push(INVALID);
            self.replica_layer.push(INVALID);
            self.attached_to.push(INVALID);
            self.clip_parent.push(INVALID);
            self.scroll_parent.push(INVALID);
            self.bounds.push(Size::ZERO);
            self.position.push(Point::ORIGIN);
            self.transform_origin.push(Point3::ORIGIN);
            self.transform.push(Transform3d::IDENTITY);
            self.scroll_offset.push(Vec2::ZERO);
            self.opacity.push(1.0);
            self.flags.push(LayerFlags::default());
            self.sorting_context_id.push(0);
            self.opaque_rect.push(Rect::ZERO);
            self.filters.push(FilterOperations::new());
            self.background_filters.push(FilterOperations::new());
            self.blend_mode.push(BlendMode::Normal);
            self.animation.push(AnimationState::STILL);
            self.raster_scale.push(0.0);
            self.generation.push(0);
            idx
        };

        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);

        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a layer, freeing its slot for reuse.
    ///
    /// Detaches the layer from its parent or owner, releases any mask and
    /// replica it owns (they become free-standing), and clears clip- and
    /// scroll-parent links that point at it.
    ///
    /// # Panics
    ///
    /// Panics if the layer has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_layer(&mut self, id: LayerId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy layer with children"
        );

        if self.parent[idx as usize] != INVALID {
            let p = self.parent[idx as usize];
            self.unlink_from_parent(idx);
            self.dirty.mark(p, dirty::TOPOLOGY);
        }
        let owner = self.attached_to[idx as usize];
        if owner != INVALID {
            self.detach_from_owner(idx);
            self.dirty.mark(owner, dirty::EFFECTS);
        }
        for attached in [self.mask_layer[idx as usize], self.replica_layer[idx as usize]] {
            if attached != INVALID {
                self.attached_to[attached as usize] = INVALID;
            }
        }
        self.mask_layer[idx as usize] = INVALID;
        self.replica_layer[idx as usize] = INVALID;
        for i in 0..self.len as usize {
            if self.clip_parent[i] == idx {
                self.clip_parent[i] = INVALID;
                self.dirty.mark_with(i as u32, dirty::GEOMETRY, &EagerPolicy);
            }
            if self.scroll_parent[i] == idx {
                self.scroll_parent[i] = INVALID;
                self.dirty.mark_with(i as u32, dirty::GEOMETRY, &EagerPolicy);
            }
        }

        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;

        self.free_list.push(idx);
        self.pending_removed.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
    }

    /// Returns whether the given handle refers to a live layer.
    #[must_use]
    pub fn is_alive(&self, id: LayerId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Number of slots, live or free. Per-frame tables are sized to this.
    #[inline]
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.len as usize
    }

    /// Number of live layers.
    #[inline]
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.len as usize - self.free_list.len()
    }

    /// Returns the handle of the live layer at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn layer_id_at(&self, idx: u32) -> LayerId {
        self.check_slot(idx);
        LayerId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, if `child` already has a parent, or
    /// if `child` is attached to another layer as a mask or replica.
    pub fn add_child(&mut self, parent: LayerId, child: LayerId) {
        self.validate(parent);
        self.validate(child);
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(
            self.attached_to[c as usize] == INVALID,
            "layer already in the tree"
        );
        self.link_last_child(parent.idx, c);
    }

    /// Removes `child` from its current parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the layer has no parent.
    pub fn remove_from_parent(&mut self, child: LayerId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "layer has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);

        self.dirty.remove_dependency(c, p, dirty::GEOMETRY);
        self.dirty.remove_dependency(c, p, dirty::OPACITY);

        self.mark_subtree_inherited_dirty(c);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Moves `child` to be the last child of `new_parent`.
    ///
    /// If `child` already has a parent, it is removed first.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn reparent(&mut self, child: LayerId, new_parent: LayerId) {
        self.validate(child);
        self.validate(new_parent);

        let c = child.idx;
        if self.parent[c as usize] != INVALID {
            let old_p = self.parent[c as usize];
            self.unlink_from_parent(c);
            self.dirty.remove_dependency(c, old_p, dirty::GEOMETRY);
            self.dirty.remove_dependency(c, old_p, dirty::OPACITY);
            self.dirty.mark(old_p, dirty::TOPOLOGY);
        }
        self.link_last_child(new_parent.idx, c);
    }

    /// Inserts `child` before `sibling` in the sibling list.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, or `sibling`
    /// has no parent.
    pub fn insert_before(&mut self, child: LayerId, sibling: LayerId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        let _ = self.dirty.add_dependency(c, p, dirty::GEOMETRY);
        let _ = self.dirty.add_dependency(c, p, dirty::OPACITY);

        self.mark_subtree_inherited_dirty(c);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Returns the parent of a layer, if any.
    #[must_use]
    pub fn parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle(self.parent[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a layer, in paint
    /// order (back to front).
    #[must_use]
    pub fn children(&self, id: LayerId) -> Children<'_, K> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the layers with no parent that are not attached as a mask or
    /// replica.
    #[must_use]
    pub fn roots(&self) -> Vec<LayerId> {
        let mut roots = Vec::new();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID
                && self.attached_to[idx as usize] == INVALID
                && !self.free_list.contains(&idx)
            {
                roots.push(LayerId {
                    idx,
                    generation: self.generation[idx as usize],
                });
            }
        }
        roots
    }

    // -- Attachments --

    /// Sets or clears the mask layer of `owner`.
    ///
    /// The mask's alpha clips the owner's rendered surface. A previous mask
    /// is released.
    ///
    /// # Panics
    ///
    /// Panics if a handle is stale, if the mask is attached to another layer,
    /// or if the mask has a parent.
    pub fn set_mask_layer(&mut self, owner: LayerId, mask: Option<LayerId>) {
        self.validate(owner);
        let o = owner.idx;
        let new = self.attach(o, mask, "mask layer already has an owner");
        let old = core::mem::replace(&mut self.mask_layer[o as usize], new);
        if old != INVALID && old != new {
            self.attached_to[old as usize] = INVALID;
        }
        self.dirty.mark(o, dirty::EFFECTS);
        self.dirty.mark(o, dirty::TOPOLOGY);
    }

    /// Sets or clears the replica layer of `owner`.
    ///
    /// The replica's position, transform origin and transform place a second
    /// copy of the owner's surface. A replica may carry its own mask.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`set_mask_layer`](Self::set_mask_layer).
    pub fn set_replica_layer(&mut self, owner: LayerId, replica: Option<LayerId>) {
        self.validate(owner);
        let o = owner.idx;
        let new = self.attach(o, replica, "replica layer already has an owner");
        let old = core::mem::replace(&mut self.replica_layer[o as usize], new);
        if old != INVALID && old != new {
            self.attached_to[old as usize] = INVALID;
        }
        self.dirty.mark(o, dirty::EFFECTS);
        self.dirty.mark(o, dirty::TOPOLOGY);
    }

    /// Returns the mask layer of a layer, if any.
    #[must_use]
    pub fn mask_layer(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle(self.mask_layer[id.idx as usize])
    }

    /// Returns the replica layer of a layer, if any.
    #[must_use]
    pub fn replica_layer(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle(self.replica_layer[id.idx as usize])
    }

    /// Makes `layer` take its clip from `clip_parent` instead of from its
    /// structural ancestors.
    ///
    /// `clip_parent` must be an ancestor of `layer`'s parent for the clip to
    /// be meaningful.
    pub fn set_clip_parent(&mut self, layer: LayerId, clip_parent: Option<LayerId>) {
        self.validate(layer);
        let target = self.link_target(clip_parent);
        self.clip_parent[layer.idx as usize] = target;
        self.dirty.mark_with(layer.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Returns the clip parent of a layer, if any.
    #[must_use]
    pub fn clip_parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle(self.clip_parent[id.idx as usize])
    }

    /// Makes `layer` scroll with `scroll_parent`, which may come later in
    /// paint order than `layer`.
    ///
    /// The layer's clip then comes from the scroll parent. The scroll parent
    /// should be a descendant of a sibling of `layer` (or of `layer`'s
    /// ancestors' siblings) below their common ancestor.
    ///
    /// Placement is not checked. A scroll parent that is `layer` itself or
    /// one of its descendants, or a chain of scroll parents that loops back
    /// on itself, is ignored for ordering: the affected children keep paint
    /// order. The clip is still read from the scroll parent, whose
    /// properties may not be computed yet and then clip nothing.
    pub fn set_scroll_parent(&mut self, layer: LayerId, scroll_parent: Option<LayerId>) {
        self.validate(layer);
        let target = self.link_target(scroll_parent);
        self.scroll_parent[layer.idx as usize] = target;
        self.dirty.mark_with(layer.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Returns the scroll parent of a layer, if any.
    #[must_use]
    pub fn scroll_parent(&self, id: LayerId) -> Option<LayerId> {
        self.validate(id);
        self.handle(self.scroll_parent[id.idx as usize])
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns the size of a layer in layer space.
    #[must_use]
    pub fn bounds(&self, id: LayerId) -> Size {
        self.validate(id);
        self.bounds[id.idx as usize]
    }

    /// Returns the offset of a layer in its parent's space.
    #[must_use]
    pub fn position(&self, id: LayerId) -> Point {
        self.validate(id);
        self.position[id.idx as usize]
    }

    /// Returns the point a layer's transform is applied about.
    #[must_use]
    pub fn transform_origin(&self, id: LayerId) -> Point3 {
        self.validate(id);
        self.transform_origin[id.idx as usize]
    }

    /// Returns the local transform of a layer.
    #[must_use]
    pub fn transform(&self, id: LayerId) -> Transform3d {
        self.validate(id);
        self.transform[id.idx as usize]
    }

    /// Returns the scroll offset of a layer.
    #[must_use]
    pub fn scroll_offset(&self, id: LayerId) -> Vec2 {
        self.validate(id);
        self.scroll_offset[id.idx as usize]
    }

    /// Returns the local opacity of a layer.
    #[must_use]
    pub fn opacity(&self, id: LayerId) -> f32 {
        self.validate(id);
        self.opacity[id.idx as usize]
    }

    /// Returns the flags of a layer.
    #[must_use]
    pub fn flags(&self, id: LayerId) -> LayerFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns the 3-D sorting context of a layer, `0` for none.
    #[must_use]
    pub fn sorting_context_id(&self, id: LayerId) -> i32 {
        self.validate(id);
        self.sorting_context_id[id.idx as usize]
    }

    /// Returns the explicitly opaque part of a layer, in layer space.
    #[must_use]
    pub fn opaque_rect(&self, id: LayerId) -> Rect {
        self.validate(id);
        self.opaque_rect[id.idx as usize]
    }

    /// Returns the filters applied to a layer's surface.
    #[must_use]
    pub fn filters(&self, id: LayerId) -> &FilterOperations {
        self.validate(id);
        &self.filters[id.idx as usize]
    }

    /// Returns the filters applied to what is behind a layer.
    #[must_use]
    pub fn background_filters(&self, id: LayerId) -> &FilterOperations {
        self.validate(id);
        &self.background_filters[id.idx as usize]
    }

    /// Returns the blend mode of a layer.
    #[must_use]
    pub fn blend_mode(&self, id: LayerId) -> BlendMode {
        self.validate(id);
        self.blend_mode[id.idx as usize]
    }

    /// Returns the animation state of a layer.
    #[must_use]
    pub fn animation(&self, id: LayerId) -> AnimationState {
        self.validate(id);
        self.animation[id.idx as usize]
    }

    /// Returns the raster scale remembered from earlier passes, if any.
    #[must_use]
    pub fn raster_scale(&self, id: LayerId) -> Option<f64> {
        self.validate(id);
        let s = self.raster_scale[id.idx as usize];
        (s != 0.0).then_some(s)
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the size of a layer.
    pub fn set_bounds(&mut self, id: LayerId, bounds: Size) {
        self.validate(id);
        self.bounds[id.idx as usize] = bounds;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the offset of a layer in its parent's space.
    pub fn set_position(&mut self, id: LayerId, position: Point) {
        self.validate(id);
        self.position[id.idx as usize] = position;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the point the local transform is applied about.
    pub fn set_transform_origin(&mut self, id: LayerId, origin: Point3) {
        self.validate(id);
        self.transform_origin[id.idx as usize] = origin;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the local transform of a layer.
    ///
    /// Marks the GEOMETRY channel dirty with eager propagation to descendants.
    pub fn set_transform(&mut self, id: LayerId, transform: Transform3d) {
        self.validate(id);
        self.transform[id.idx as usize] = transform;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the scroll offset of a layer. It is subtracted from the position.
    pub fn set_scroll_offset(&mut self, id: LayerId, offset: Vec2) {
        self.validate(id);
        self.scroll_offset[id.idx as usize] = offset;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the local opacity of a layer.
    ///
    /// Marks the OPACITY channel dirty with eager propagation to descendants.
    pub fn set_opacity(&mut self, id: LayerId, opacity: f32) {
        self.validate(id);
        self.opacity[id.idx as usize] = opacity;
        self.dirty.mark_with(id.idx, dirty::OPACITY, &EagerPolicy);
    }

    /// Sets the flags of a layer.
    ///
    /// Flags can change visibility and flattening for the whole subtree, so
    /// GEOMETRY propagates; CONTENT is marked locally.
    pub fn set_flags(&mut self, id: LayerId, flags: LayerFlags) {
        self.validate(id);
        self.flags[id.idx as usize] = flags;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Changes some flags of a layer in place.
    pub fn update_flags(&mut self, id: LayerId, f: impl FnOnce(&mut LayerFlags)) {
        self.validate(id);
        let mut flags = self.flags[id.idx as usize];
        f(&mut flags);
        self.set_flags(id, flags);
    }

    /// Puts a layer in a 3-D sorting context (`0` for none).
    pub fn set_sorting_context_id(&mut self, id: LayerId, context: i32) {
        self.validate(id);
        self.sorting_context_id[id.idx as usize] = context;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
    }

    /// Sets the part of the layer known to be opaque, in layer space.
    pub fn set_opaque_rect(&mut self, id: LayerId, rect: Rect) {
        self.validate(id);
        self.opaque_rect[id.idx as usize] = rect;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    /// Sets the filters applied to a layer's rendered surface.
    pub fn set_filters(&mut self, id: LayerId, filters: FilterOperations) {
        self.validate(id);
        self.filters[id.idx as usize] = filters;
        self.dirty.mark(id.idx, dirty::EFFECTS);
    }

    /// Sets the filters applied to content behind a layer.
    pub fn set_background_filters(&mut self, id: LayerId, filters: FilterOperations) {
        self.validate(id);
        self.background_filters[id.idx as usize] = filters;
        self.dirty.mark(id.idx, dirty::EFFECTS);
    }

    /// Sets the blend mode of a layer.
    pub fn set_blend_mode(&mut self, id: LayerId, mode: BlendMode) {
        self.validate(id);
        self.blend_mode[id.idx as usize] = mode;
        self.dirty.mark(id.idx, dirty::EFFECTS);
    }

    /// Records which of a layer's properties are animating.
    pub fn set_animation(&mut self, id: LayerId, animation: AnimationState) {
        self.validate(id);
        self.animation[id.idx as usize] = animation;
        self.dirty.mark_with(id.idx, dirty::GEOMETRY, &EagerPolicy);
        self.dirty.mark_with(id.idx, dirty::OPACITY, &EagerPolicy);
    }

    /// Forgets the remembered raster scale, so the next pass picks a fresh
    /// one.
    pub fn reset_raster_scale(&mut self, id: LayerId) {
        self.validate(id);
        self.raster_scale[id.idx as usize] = 0.0;
        self.dirty.mark(id.idx, dirty::CONTENT);
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in `DrawState` and
    // `LayerChanges`) rather than `LayerId` handles, skipping generation
    // validation.

    /// Returns the size of the layer at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn bounds_at(&self, idx: u32) -> Size {
        self.check_slot(idx);
        self.bounds[idx as usize]
    }

    /// Returns the flags of the layer at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn flags_at(&self, idx: u32) -> LayerFlags {
        self.check_slot(idx);
        self.flags[idx as usize]
    }

    /// Returns the mask slot of the layer at raw slot `idx`, or [`INVALID`].
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn mask_layer_at(&self, idx: u32) -> u32 {
        self.check_slot(idx);
        self.mask_layer[idx as usize]
    }

    /// Returns the replica slot of the layer at raw slot `idx`, or
    /// [`INVALID`].
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn replica_layer_at(&self, idx: u32) -> u32 {
        self.check_slot(idx);
        self.replica_layer[idx as usize]
    }

    /// Returns the blend mode of the layer at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn blend_mode_at(&self, idx: u32) -> BlendMode {
        self.check_slot(idx);
        self.blend_mode[idx as usize]
    }

    /// Returns the background filters of the layer at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn background_filters_at(&self, idx: u32) -> &FilterOperations {
        self.check_slot(idx);
        &self.background_filters[idx as usize]
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: LayerId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale LayerId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    fn check_slot(&self, idx: u32) {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
    }

    fn handle(&self, idx: u32) -> Option<LayerId> {
        (idx != INVALID).then(|| LayerId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    fn link_target(&self, target: Option<LayerId>) -> u32 {
        match target {
            Some(t) => {
                self.validate(t);
                t.idx
            }
            None => INVALID,
        }
    }

    /// Validates and claims `layer` as an attachment of `owner`.
    fn attach(&mut self, owner: u32, layer: Option<LayerId>, owned_msg: &str) -> u32 {
        let Some(layer) = layer else {
            return INVALID;
        };
        self.validate(layer);
        let l = layer.idx;
        let current = self.attached_to[l as usize];
        assert!(current == INVALID || current == owner, "{owned_msg}");
        assert!(
            self.parent[l as usize] == INVALID,
            "layer already in the tree"
        );
        self.attached_to[l as usize] = owner;
        l
    }

    fn detach_from_owner(&mut self, idx: u32) {
        let owner = self.attached_to[idx as usize] as usize;
        if self.mask_layer[owner] == idx {
            self.mask_layer[owner] = INVALID;
        }
        if self.replica_layer[owner] == idx {
            self.replica_layer[owner] = INVALID;
        }
        self.attached_to[idx as usize] = INVALID;
    }

    /// Restores a recycled slot to the state of a fresh layer.
    fn reset_slot(&mut self, i: usize) {
        self.parent[i] = INVALID;
        self.first_child[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.prev_sibling[i] = INVALID;
        self.mask_layer[i] = INVALID;
        self.replica_layer[i] = INVALID;
        self.attached_to[i] = INVALID;
        self.clip_parent[i] = INVALID;
        self.scroll_parent[i] = INVALID;
        self.bounds[i] = Size::ZERO;
        self.position[i] = Point::ORIGIN;
        self.transform_origin[i] = Point3::ORIGIN;
        self.transform[i] = Transform3d::IDENTITY;
        self.scroll_offset[i] = Vec2::ZERO;
        self.opacity[i] = 1.0;
        self.flags[i] = LayerFlags::default();
        self.sorting_context_id[i] = 0;
        self.opaque_rect[i] = Rect::ZERO;
        self.filters[i] = FilterOperations::new();
        self.background_filters[i] = FilterOperations::new();
        self.blend_mode[i] = BlendMode::Normal;
        self.animation[i] = AnimationState::STILL;
        self.raster_scale[i] = 0.0;
    }

    fn link_last_child(&mut self, p: u32, c: u32) {
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        // Child depends on parent for GEOMETRY and OPACITY.
        let _ = self.dirty.add_dependency(c, p, dirty::GEOMETRY);
        let _ = self.dirty.add_dependency(c, p, dirty::OPACITY);

        self.mark_subtree_inherited_dirty(c);
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    fn mark_subtree_inherited_dirty(&mut self, idx: u32) {
        self.dirty.mark_with(idx, dirty::GEOMETRY, &EagerPolicy);
        self.dirty.mark_with(idx, dirty::OPACITY, &EagerPolicy);
    }
}
