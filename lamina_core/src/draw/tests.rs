// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec;
use alloc::vec::Vec;

use kurbo::{Point, Rect, Size, Vec2};

use super::*;
use crate::filter::BlendMode;
use crate::geometry::{Point3, RectExt};
use crate::layer::{AnimationState, ImplLayerStore, INVALID, MainLayerStore};
use crate::math::map_point;
use crate::test_util::{add_container, add_layer, inputs, rects_near, transforms_near};
use crate::transform::Transform3d;

#[test]
fn identity_tree_draws_at_identity() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let child = add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    let grand_child = add_layer(&mut store, Some(child), (0.0, 0.0), (10.0, 10.0));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    for id in [root, child, grand_child] {
        let props = state.layer(id);
        assert_eq!(props.draw_transform, Transform3d::IDENTITY);
        assert_eq!(props.screen_space_transform, Transform3d::IDENTITY);
        assert_eq!(props.render_target, root.index());
        assert!(props.in_render_surface_layer_list);
    }
    assert_eq!(state.render_surface_layer_list(), [root.index()]);
    assert_eq!(
        state.layer_list(root.index()),
        [root.index(), child.index(), grand_child.index()]
    );
    assert_eq!(
        state.root_surface().map(|s| s.content_rect),
        Some(Rect::new(0.0, 0.0, 100.0, 100.0))
    );
}

#[test]
fn transform_origin_does_not_move_identity_transforms() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let child = add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    store.set_transform_origin(child, Point3::new(5.0, 5.0, 0.0));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));
    assert_eq!(state.layer(child).draw_transform, Transform3d::IDENTITY);
    assert_eq!(state.layer(child).screen_space_transform, Transform3d::IDENTITY);
}

#[test]
fn transforms_compose_down_the_tree() {
    let eps = 1e-9;
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let parent = add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    store.set_transform(parent, Transform3d::from_scale(2.0, 2.0, 1.0));
    let child = add_layer(&mut store, Some(parent), (10.0, 5.0), (10.0, 10.0));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    let expected = Transform3d::from_scale(2.0, 2.0, 1.0).pre_translate(10.0, 5.0, 0.0);
    let props = state.layer(child);
    assert!(transforms_near(&props.draw_transform, &expected, eps));
    assert!(transforms_near(&props.screen_space_transform, &expected, eps));
    let (p, clipped) = map_point(&props.draw_transform, Point::new(1.0, 1.0));
    assert!(!clipped);
    assert!((p.x - 22.0).abs() < eps && (p.y - 12.0).abs() < eps);
    assert!(rects_near(
        props.drawable_content_rect,
        Rect::new(20.0, 10.0, 40.0, 30.0),
        eps
    ));
}

#[test]
fn rotated_transform_origin_pivots_in_place() {
    let eps = 1e-9;
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let layer = add_layer(&mut store, Some(root), (10.0, 10.0), (10.0, 20.0));
    store.set_transform_origin(layer, Point3::new(5.0, 10.0, 0.0));
    store.set_transform(layer, Transform3d::from_rotation_z(core::f64::consts::PI));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    // A half turn about the center swaps opposite corners.
    let t = &state.layer(layer).draw_transform;
    let (p, _) = map_point(t, Point::new(0.0, 0.0));
    assert!((p.x - 20.0).abs() < eps && (p.y - 30.0).abs() < eps);
    let (p, _) = map_point(t, Point::new(10.0, 20.0));
    assert!((p.x - 10.0).abs() < eps && (p.y - 10.0).abs() < eps);
}

#[test]
fn forced_surface_isolates_its_subtree() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let owner = add_layer(&mut store, Some(root), (10.0, 20.0), (50.0, 50.0));
    store.update_flags(owner, |f| f.force_render_surface = true);
    let child = add_layer(&mut store, Some(owner), (5.0, 5.0), (10.0, 10.0));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert_eq!(
        state.render_surface_layer_list(),
        [owner.index(), root.index()]
    );
    assert_eq!(state.layer_list(root.index()), [root.index(), owner.index()]);
    assert_eq!(state.layer_list(owner.index()), [owner.index(), child.index()]);

    let surface = state.surface(owner).unwrap();
    assert_eq!(surface.draw_transform, Transform3d::from_translation(10.0, 20.0, 0.0));
    assert_eq!(
        surface.screen_space_transform,
        Transform3d::from_translation(10.0, 20.0, 0.0)
    );
    assert_eq!(surface.content_rect, Rect::new(0.0, 0.0, 50.0, 50.0));
    assert!(surface.contributes_to_drawn_surface);
    assert!(!surface.is_clipped);

    let owner_props = state.layer(owner);
    assert_eq!(owner_props.render_target, owner.index());
    assert_eq!(owner_props.draw_transform, Transform3d::IDENTITY);
    assert_eq!(
        owner_props.screen_space_transform,
        Transform3d::from_translation(10.0, 20.0, 0.0)
    );

    let child_props = state.layer(child);
    assert_eq!(child_props.render_target, owner.index());
    assert_eq!(child_props.draw_transform, Transform3d::from_translation(5.0, 5.0, 0.0));
    assert_eq!(
        child_props.screen_space_transform,
        Transform3d::from_translation(15.0, 25.0, 0.0)
    );
    assert!(!state.root_surface().unwrap().contributes_to_drawn_surface);
}

#[test]
fn masks_to_bounds_clips_descendants() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let parent = add_layer(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.update_flags(parent, |f| f.masks_to_bounds = true);
    let child = add_container(&mut store, Some(parent), (0.0, 0.0), (100.0, 100.0));
    let outside = add_layer(&mut store, Some(child), (45.0, 45.0), (10.0, 10.0));
    let inside = add_layer(&mut store, Some(child), (5.0, 5.0), (10.0, 10.0));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert!(state.layer(parent).is_clipped);
    assert_eq!(state.layer(parent).clip_rect, Rect::new(0.0, 0.0, 20.0, 20.0));
    assert!(state.layer(child).is_clipped);
    assert!(state.layer(outside).drawable_content_rect.is_empty_area());
    assert!(state.layer(outside).visible_content_rect.is_empty_area());
    assert_eq!(
        state.layer(inside).drawable_content_rect,
        Rect::new(5.0, 5.0, 15.0, 15.0)
    );
    assert_eq!(
        state.layer(inside).visible_content_rect,
        Rect::new(0.0, 0.0, 10.0, 10.0)
    );
}

#[test]
fn opacity_needs_a_surface_only_with_two_drawing_layers() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let group = add_layer(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.set_opacity(group, 0.5);
    let member = add_layer(&mut store, Some(group), (0.0, 0.0), (10.0, 10.0));
    let leaf = add_layer(&mut store, Some(root), (50.0, 0.0), (20.0, 20.0));
    store.set_opacity(leaf, 0.5);

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    let surface = state.surface(group).unwrap();
    assert_eq!(surface.draw_opacity, 0.5);
    assert_eq!(state.layer(group).opacity, 1.0);
    assert_eq!(state.layer(member).opacity, 1.0);

    assert!(state.surface(leaf).is_none());
    assert_eq!(state.layer(leaf).opacity, 0.5);
    assert!(!state.layer(leaf).can_use_lcd_text);
}

#[test]
fn separate_surfaces_can_be_disabled() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let group = add_layer(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.set_opacity(group, 0.5);
    let member = add_layer(&mut store, Some(group), (0.0, 0.0), (10.0, 10.0));

    let mut inputs = inputs(root, 100.0, 100.0);
    inputs.can_render_to_separate_surface = false;
    let state = store.calculate_draw_properties(&inputs);

    assert_eq!(state.render_surface_layer_list(), [root.index()]);
    assert_eq!(
        state.layer_list(root.index()),
        [root.index(), group.index(), member.index()]
    );
    assert_eq!(state.layer(member).opacity, 0.5);
}

#[test]
fn back_facing_layers_are_culled_unless_animating_on_main() {
    fn build<K: crate::layer::TreeKind>(
        store: &mut crate::layer::LayerStore<K>,
        animating: bool,
    ) -> (crate::layer::LayerId, crate::layer::LayerId) {
        let root = add_layer(store, None, (0.0, 0.0), (100.0, 100.0));
        let layer = add_layer(store, Some(root), (0.0, 0.0), (10.0, 10.0));
        store.set_transform_origin(layer, Point3::new(5.0, 5.0, 0.0));
        store.set_transform(layer, Transform3d::from_rotation_y(core::f64::consts::PI));
        store.update_flags(layer, |f| f.double_sided = false);
        if animating {
            store.set_animation(layer, AnimationState::transform(None));
        }
        (root, layer)
    }

    let mut main = MainLayerStore::new();
    let (root, layer) = build(&mut main, false);
    let state = main.calculate_draw_properties(&inputs(root, 100.0, 100.0));
    assert_eq!(state.layer_list(root.index()), [root.index()]);
    assert!(!state.layer(layer).in_render_surface_layer_list);

    let mut main = MainLayerStore::new();
    let (root, layer) = build(&mut main, true);
    let state = main.calculate_draw_properties(&inputs(root, 100.0, 100.0));
    assert_eq!(state.layer_list(root.index()), [root.index(), layer.index()]);

    let mut compositor = ImplLayerStore::new();
    let (root, _) = build(&mut compositor, true);
    let state = compositor.calculate_draw_properties(&inputs(root, 100.0, 100.0));
    assert_eq!(state.layer_list(root.index()), [root.index()]);
}

#[test]
fn skipped_subtrees_are_cleared() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let singular = add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    store.set_transform(singular, Transform3d::from_scale(0.0, 0.0, 1.0));
    let under_singular = add_layer(&mut store, Some(singular), (0.0, 0.0), (10.0, 10.0));
    let transparent = add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    store.set_opacity(transparent, 0.0);
    let hidden = add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    store.update_flags(hidden, |f| f.hide_layer_and_subtree = true);

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    for id in [singular, under_singular, transparent, hidden] {
        assert_eq!(state.layer(id), &DrawProperties::CLEARED);
    }
    assert_eq!(state.layer_list(root.index()), [root.index()]);
}

#[test]
fn transparent_layers_survive_on_main_while_opacity_may_animate() {
    let mut store = MainLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let fading = add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    store.set_opacity(fading, 0.0);
    store.set_animation(fading, AnimationState::opacity());

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));
    assert_eq!(state.layer_list(root.index()), [root.index(), fading.index()]);
    assert!(state.layer(fading).opacity_is_animating);
}

#[test]
fn contents_scale_follows_device_and_ancestor_scales() {
    let eps = 1e-9;
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let scaled = add_container(&mut store, Some(root), (0.0, 0.0), (100.0, 100.0));
    store.set_transform(scaled, Transform3d::from_scale(1.75, 1.75, 1.0));
    let middle = add_container(&mut store, Some(scaled), (0.0, 0.0), (100.0, 100.0));
    let scaling = add_layer(&mut store, Some(middle), (0.0, 0.0), (10.0, 10.0));
    store.update_flags(scaling, |f| f.scales_contents = true);
    let fixed = add_layer(&mut store, Some(middle), (0.0, 0.0), (10.0, 10.0));

    let mut inputs = inputs(root, 300.0, 300.0);
    inputs.device_scale_factor = 2.5;
    let state = store.calculate_draw_properties(&inputs);

    let props = state.layer(scaling);
    assert!((props.contents_scale - 4.375).abs() < eps);
    assert!((props.ideal_contents_scale - 4.375).abs() < eps);
    assert_eq!(props.content_bounds, Size::new(44.0, 44.0));
    assert!(transforms_near(&props.draw_transform, &Transform3d::IDENTITY, eps));
    assert_eq!(store.raster_scale(scaling), Some(1.75));

    let props = state.layer(fixed);
    assert_eq!(props.contents_scale, 1.0);
    assert_eq!(props.content_bounds, Size::new(10.0, 10.0));
    assert!((props.ideal_contents_scale - 4.375).abs() < eps);
    assert!((props.draw_transform.get(0, 0) - 4.375).abs() < eps);
    assert!((props.device_scale_factor - 2.5).abs() < eps);
}

#[test]
fn raster_scale_is_not_adjusted_when_disabled() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let layer = add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    store.set_transform(layer, Transform3d::from_scale(3.0, 3.0, 1.0));
    store.update_flags(layer, |f| f.scales_contents = true);

    let mut inputs = inputs(root, 100.0, 100.0);
    inputs.device_scale_factor = 2.0;
    inputs.can_adjust_raster_scales = false;
    let state = store.calculate_draw_properties(&inputs);

    assert_eq!(state.layer(layer).contents_scale, 2.0);
    assert_eq!(state.layer(layer).ideal_contents_scale, 2.0);
    assert_eq!(store.raster_scale(layer), None);
}

#[test]
fn page_scale_applies_below_application_layer() {
    let eps = 1e-9;
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let page = add_container(&mut store, Some(root), (0.0, 0.0), (100.0, 100.0));
    let content = add_layer(&mut store, Some(page), (10.0, 0.0), (10.0, 10.0));
    store.update_flags(content, |f| f.scales_contents = true);

    let mut inputs = inputs(root, 100.0, 100.0);
    inputs.page_scale_factor = 2.0;
    inputs.page_scale_application_layer = Some(page);
    let state = store.calculate_draw_properties(&inputs);

    assert_eq!(state.layer(page).page_scale_factor, 1.0);
    let props = state.layer(content);
    assert_eq!(props.page_scale_factor, 2.0);
    assert!((props.contents_scale - 2.0).abs() < eps);
    let (p, _) = map_point(&props.screen_space_transform, Point::new(0.0, 0.0));
    assert!((p.x - 20.0).abs() < eps && p.y.abs() < eps);
    assert!(rects_near(
        props.drawable_content_rect,
        Rect::new(20.0, 0.0, 40.0, 20.0),
        eps
    ));
}

#[test]
fn maximum_animation_scale_combines_with_static_ancestors() {
    let eps = 1e-9;
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let parent = add_container(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    store.set_transform(parent, Transform3d::from_scale(2.0, 2.0, 1.0));
    let animated = add_layer(&mut store, Some(parent), (0.0, 0.0), (10.0, 10.0));
    store.set_animation(animated, AnimationState::transform(Some(3.0)));
    let below = add_layer(&mut store, Some(animated), (0.0, 0.0), (10.0, 10.0));
    let nested = add_layer(&mut store, Some(below), (0.0, 0.0), (10.0, 10.0));
    store.set_animation(nested, AnimationState::transform(Some(2.0)));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert_eq!(state.layer(parent).maximum_animation_contents_scale, 0.0);
    assert!((state.layer(animated).maximum_animation_contents_scale - 6.0).abs() < eps);
    assert!((state.layer(below).maximum_animation_contents_scale - 6.0).abs() < eps);
    assert_eq!(state.layer(nested).maximum_animation_contents_scale, 0.0);

    let mut main = MainLayerStore::new();
    let root = add_layer(&mut main, None, (0.0, 0.0), (100.0, 100.0));
    let animated = add_layer(&mut main, Some(root), (0.0, 0.0), (10.0, 10.0));
    main.set_animation(animated, AnimationState::transform(Some(3.0)));
    let state = main.calculate_draw_properties(&inputs(root, 100.0, 100.0));
    assert_eq!(state.layer(animated).maximum_animation_contents_scale, 0.0);
}

#[test]
fn second_pass_is_identical() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (200.0, 200.0));
    let group = add_layer(&mut store, Some(root), (7.0, 3.0), (50.0, 50.0));
    store.set_opacity(group, 0.25);
    store.set_transform(group, Transform3d::from_scale(1.5, 1.5, 1.0));
    let member = add_layer(&mut store, Some(group), (2.0, 2.0), (30.0, 30.0));
    store.update_flags(member, |f| f.scales_contents = true);
    let clipper = add_layer(&mut store, Some(root), (100.0, 100.0), (20.0, 20.0));
    store.update_flags(clipper, |f| f.masks_to_bounds = true);
    add_layer(&mut store, Some(clipper), (10.0, 10.0), (40.0, 40.0));

    let mut inputs = inputs(root, 200.0, 200.0);
    inputs.device_scale_factor = 1.25;
    let first = store.calculate_draw_properties(&inputs);
    assert!(!first.changes().is_empty());
    let second = store.calculate_draw_properties(&inputs);

    assert_eq!(first.layers, second.layers);
    assert_eq!(first.surfaces, second.surfaces);
    assert_eq!(
        first.render_surface_layer_list(),
        second.render_surface_layer_list()
    );
    assert!(second.changes().is_empty());
}

#[test]
fn scroll_parent_clips_earlier_sibling() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let scroll_child = add_layer(&mut store, Some(root), (0.0, 0.0), (100.0, 100.0));
    let scroller = add_layer(&mut store, Some(root), (0.0, 0.0), (30.0, 30.0));
    store.update_flags(scroller, |f| f.masks_to_bounds = true);
    store.set_scroll_parent(scroll_child, Some(scroller));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert_eq!(
        state.layer_list(root.index()),
        [root.index(), scroll_child.index(), scroller.index()]
    );
    let props = state.layer(scroll_child);
    assert!(props.is_clipped);
    assert_eq!(props.clip_rect, Rect::new(0.0, 0.0, 30.0, 30.0));
    assert_eq!(props.drawable_content_rect, Rect::new(0.0, 0.0, 30.0, 30.0));
}

#[test]
fn clip_children_escape_surface_clip() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let clip = add_container(&mut store, Some(root), (0.0, 0.0), (100.0, 100.0));
    store.update_flags(clip, |f| f.masks_to_bounds = true);
    let group = add_layer(&mut store, Some(clip), (10.0, 10.0), (20.0, 20.0));
    store.update_flags(group, |f| f.masks_to_bounds = true);
    store.set_opacity(group, 0.5);
    let clipped = add_layer(&mut store, Some(group), (0.0, 0.0), (10.0, 10.0));
    let escaping = add_layer(&mut store, Some(group), (0.0, 0.0), (100.0, 100.0));
    store.set_clip_parent(escaping, Some(clip));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert_eq!(state.layer(group).num_unclipped_descendants, 1);
    assert_eq!(state.layer(clip).num_unclipped_descendants, 0);

    let surface = state.surface(group).unwrap();
    assert!(!surface.is_clipped);
    assert_eq!(surface.content_rect, Rect::new(0.0, 0.0, 90.0, 90.0));

    assert_eq!(
        state.layer(clipped).drawable_content_rect,
        Rect::new(0.0, 0.0, 10.0, 10.0)
    );
    let props = state.layer(escaping);
    assert!(props.is_clipped);
    assert_eq!(props.clip_rect, Rect::new(-10.0, -10.0, 90.0, 90.0));
    assert_eq!(props.drawable_content_rect, Rect::new(0.0, 0.0, 90.0, 90.0));
}

#[test]
fn copy_request_keeps_hidden_subtree() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let copied = add_layer(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.update_flags(copied, |f| {
        f.hide_layer_and_subtree = true;
        f.has_copy_request = true;
    });
    let inner = add_layer(&mut store, Some(copied), (0.0, 0.0), (10.0, 10.0));
    let hidden = add_layer(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.update_flags(hidden, |f| f.hide_layer_and_subtree = true);

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    let surface = state.surface(copied).unwrap();
    assert!(!surface.contributes_to_drawn_surface);
    assert_eq!(surface.nearest_occlusion_immune_ancestor, copied.index());
    assert!(state.render_surface_layer_list().contains(&copied.index()));
    assert_eq!(state.layer_list(copied.index()), [copied.index(), inner.index()]);
    assert_eq!(state.layer(hidden), &DrawProperties::CLEARED);
}

#[test]
fn surfaces_are_clamped_to_max_texture_size() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (500.0, 500.0));
    let wide = add_layer(&mut store, Some(root), (0.0, 0.0), (300.0, 50.0));
    store.update_flags(wide, |f| f.force_render_surface = true);

    let mut inputs = inputs(root, 500.0, 500.0);
    inputs.max_texture_size = 128;
    let state = store.calculate_draw_properties(&inputs);

    assert_eq!(
        state.surface(wide).map(|s| s.content_rect),
        Some(Rect::new(0.0, 0.0, 128.0, 50.0))
    );
}

#[test]
fn empty_surfaces_are_dropped() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let empty = add_container(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.update_flags(empty, |f| f.force_render_surface = true);
    let nested = add_container(&mut store, Some(empty), (0.0, 0.0), (20.0, 20.0));
    store.update_flags(nested, |f| f.force_render_surface = true);
    add_container(&mut store, Some(nested), (0.0, 0.0), (20.0, 20.0));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert!(state.surface(empty).is_none());
    assert!(state.surface(nested).is_none());
    assert_eq!(state.render_surface_layer_list(), [root.index()]);
    assert_eq!(state.layer_list(root.index()), [root.index()]);
}

#[test]
fn replica_is_placed_relative_to_surface() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (200.0, 200.0));
    let owner = add_layer(&mut store, Some(root), (0.0, 100.0), (50.0, 50.0));
    let replica = store.create_layer();
    store.set_position(replica, Point::new(50.0, 50.0));
    store.set_replica_layer(owner, Some(replica));

    let state = store.calculate_draw_properties(&inputs(root, 200.0, 200.0));

    let surface = state.surface(owner).unwrap();
    assert!(surface.has_replica);
    assert_eq!(surface.nearest_occlusion_immune_ancestor, owner.index());
    assert_eq!(
        surface.replica_draw_transform,
        Transform3d::from_translation(50.0, 150.0, 0.0)
    );
    assert_eq!(
        surface.drawable_content_rect(),
        Rect::new(0.0, 100.0, 100.0, 200.0)
    );
}

#[test]
fn mask_layers_draw_with_their_owner() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let owner = add_layer(&mut store, Some(root), (0.0, 0.0), (30.0, 30.0));
    let mask = store.create_layer();
    store.set_bounds(mask, Size::new(30.0, 30.0));
    store.set_mask_layer(owner, Some(mask));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert!(state.surface(owner).is_some());
    assert!(state.layer(owner).is_clipped);
    let props = state.layer(mask);
    assert_eq!(props.render_target, owner.index());
    assert_eq!(props.visible_content_rect, Rect::new(0.0, 0.0, 30.0, 30.0));
    assert!(props.in_render_surface_layer_list);
}

#[test]
fn sorted_contexts_draw_back_to_front_on_impl() {
    fn build<K: crate::layer::TreeKind>(
        store: &mut crate::layer::LayerStore<K>,
    ) -> Vec<crate::layer::LayerId> {
        let root = add_layer(store, None, (0.0, 0.0), (100.0, 100.0));
        let context = add_layer(store, Some(root), (0.0, 0.0), (10.0, 10.0));
        store.set_sorting_context_id(context, 1);
        let near = add_layer(store, Some(context), (0.0, 0.0), (10.0, 10.0));
        store.set_transform(near, Transform3d::from_translation(0.0, 0.0, 5.0));
        store.set_sorting_context_id(near, 1);
        let far = add_layer(store, Some(context), (0.0, 0.0), (10.0, 10.0));
        store.set_transform(far, Transform3d::from_translation(0.0, 0.0, -5.0));
        store.set_sorting_context_id(far, 1);
        vec![root, context, near, far]
    }

    let mut compositor = ImplLayerStore::new();
    let ids = build(&mut compositor);
    let state = compositor.calculate_draw_properties(&inputs(ids[0], 100.0, 100.0));
    let list: Vec<u32> = [ids[0], ids[3], ids[1], ids[2]]
        .iter()
        .map(|id| id.index())
        .collect();
    assert_eq!(state.layer_list(ids[0].index()), list.as_slice());

    let mut main = MainLayerStore::new();
    let ids = build(&mut main);
    let state = main.calculate_draw_properties(&inputs(ids[0], 100.0, 100.0));
    let list: Vec<u32> = ids.iter().map(|id| id.index()).collect();
    assert_eq!(state.layer_list(ids[0].index()), list.as_slice());
}

#[test]
fn lcd_text_needs_integer_translation() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let crisp = add_layer(&mut store, Some(root), (3.0, 4.0), (10.0, 10.0));
    let blurry = add_layer(&mut store, Some(root), (3.5, 4.0), (10.0, 10.0));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));
    assert!(state.layer(crisp).can_use_lcd_text);
    assert!(!state.layer(blurry).can_use_lcd_text);

    let mut inputs = inputs(root, 100.0, 100.0);
    inputs.can_use_lcd_text = false;
    let state = store.calculate_draw_properties(&inputs);
    assert!(!state.layer(crisp).can_use_lcd_text);
}

#[test]
fn empty_viewport_draws_nothing() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));

    let state = store.calculate_draw_properties(&inputs(root, 0.0, 100.0));
    assert!(state.is_empty());
    assert_eq!(state.root(), INVALID);
    assert!(state.root_surface().is_none());
    assert_eq!(state.drawn_layer_count(), 0);
}

#[test]
fn reused_state_forgets_previous_pass() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let group = add_layer(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.update_flags(group, |f| f.force_render_surface = true);

    let mut state = DrawState::new();
    store.calculate_draw_properties_into(&inputs(root, 100.0, 100.0), &mut state);
    assert!(state.surface(group).is_some());

    store.update_flags(group, |f| f.force_render_surface = false);
    store.calculate_draw_properties_into(&inputs(root, 100.0, 100.0), &mut state);
    assert!(state.surface(group).is_none());
    assert_eq!(state.render_surface_layer_list(), [root.index()]);
    assert_eq!(state.root(), root.index());
}

#[test]
fn scroll_parent_cycles_keep_paint_order() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let a = add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    let b = add_layer(&mut store, Some(root), (20.0, 0.0), (10.0, 10.0));
    store.set_scroll_parent(a, Some(b));
    store.set_scroll_parent(b, Some(a));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert_eq!(
        state.layer_list(root.index()),
        [root.index(), a.index(), b.index()]
    );
    assert_eq!(state.layer(a).drawable_content_rect, Rect::new(0.0, 0.0, 10.0, 10.0));
    assert_eq!(state.layer(b).drawable_content_rect, Rect::new(20.0, 0.0, 30.0, 10.0));
}

#[test]
fn scroll_parent_inside_own_subtree_is_ignored_for_ordering() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let outer = add_layer(&mut store, Some(root), (10.0, 10.0), (40.0, 40.0));
    let inner = add_layer(&mut store, Some(outer), (5.0, 5.0), (10.0, 10.0));
    let sibling = add_layer(&mut store, Some(root), (60.0, 0.0), (10.0, 10.0));
    store.set_scroll_parent(outer, Some(inner));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert_eq!(
        state.layer_list(root.index()),
        [root.index(), outer.index(), inner.index(), sibling.index()]
    );
    assert_eq!(
        state.layer(outer).drawable_content_rect,
        Rect::new(10.0, 10.0, 50.0, 50.0)
    );
    assert_eq!(
        state.layer(inner).drawable_content_rect,
        Rect::new(15.0, 15.0, 25.0, 25.0)
    );
}

#[test]
fn flattening_drops_the_parents_depth() {
    let eps = 1e-9;
    fn child_transform(flatten: bool) -> (Transform3d, Transform3d) {
        let mut store = ImplLayerStore::new();
        let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
        let tilted = add_container(&mut store, Some(root), (0.0, 0.0), (50.0, 50.0));
        store.set_transform(tilted, Transform3d::from_rotation_y(core::f64::consts::FRAC_PI_4));
        store.update_flags(tilted, |f| f.should_flatten_transform = flatten);
        let child = add_layer(&mut store, Some(tilted), (5.0, 0.0), (10.0, 10.0));
        let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));
        (state.layer(tilted).draw_transform, state.layer(child).draw_transform)
    }

    let (parent, child) = child_transform(true);
    let flat = parent.flattened().pre_translate(5.0, 0.0, 0.0);
    let deep = parent.pre_translate(5.0, 0.0, 0.0);
    assert!(transforms_near(&child, &flat, eps), "{child:?}");
    assert!(!transforms_near(&child, &deep, eps));
    assert_eq!(child.get(2, 3), 0.0);

    let (parent, child) = child_transform(false);
    assert!(transforms_near(&child, &parent.pre_translate(5.0, 0.0, 0.0), eps));
    assert!(child.get(2, 3).abs() > 1.0);
}

#[test]
fn perspective_clips_the_part_behind_the_eye() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (200.0, 200.0));
    let camera = add_container(&mut store, Some(root), (0.0, 0.0), (200.0, 200.0));
    store.set_transform(camera, Transform3d::from_perspective(10.0));
    store.update_flags(camera, |f| f.should_flatten_transform = false);
    let layer = add_layer(&mut store, Some(camera), (0.0, 0.0), (100.0, 10.0));
    store.set_transform(
        layer,
        Transform3d::from_rotation_y(-core::f64::consts::FRAC_PI_2 * 0.9),
    );

    let state = store.calculate_draw_properties(&inputs(root, 200.0, 200.0));

    let props = state.layer(layer);
    let [.., w_left] = props.draw_transform.map_vec4([0.0, 0.0, 0.0, 1.0]);
    let [.., w_right] = props.draw_transform.map_vec4([100.0, 0.0, 0.0, 1.0]);
    assert!(w_left > 0.0, "left edge is in front");
    assert!(w_right <= 0.0, "right edge is behind");
    assert!(props.in_render_surface_layer_list);

    // The right side runs off towards infinity but never wraps around to
    // negative x.
    let drawable = props.drawable_content_rect;
    assert!(drawable.x0.abs() < 1e-9, "{drawable:?}");
    assert!(drawable.x1 > 200.0 && drawable.x1.is_finite(), "{drawable:?}");
    assert!(drawable.y0.abs() < 1e-9 && drawable.y1.is_finite(), "{drawable:?}");

    // Only the sliver left of x ~= 10.05 lands inside the viewport.
    let visible = props.visible_content_rect;
    assert_eq!(visible.x0, 0.0, "{visible:?}");
    assert_eq!(visible.y0, 0.0, "{visible:?}");
    assert_eq!(visible.y1, 10.0, "{visible:?}");
    assert!(visible.x1 > 10.0 && visible.x1 <= 11.0, "{visible:?}");
}

#[test]
fn blend_mode_needs_a_surface() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let blended = add_layer(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.set_blend_mode(blended, BlendMode::Multiply);
    let plain = add_layer(&mut store, Some(root), (30.0, 0.0), (20.0, 20.0));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert!(state.surface(blended).is_some());
    assert_eq!(state.layer_list(blended.index()), [blended.index()]);
    assert!(state.surface(plain).is_none());
    assert_eq!(
        state.render_surface_layer_list(),
        [blended.index(), root.index()]
    );
}

#[test]
fn isolated_groups_need_drawing_descendants() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let group = add_layer(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.update_flags(group, |f| f.is_root_for_isolated_group = true);
    let member = add_layer(&mut store, Some(group), (0.0, 0.0), (10.0, 10.0));
    let lone = add_layer(&mut store, Some(root), (30.0, 0.0), (20.0, 20.0));
    store.update_flags(lone, |f| f.is_root_for_isolated_group = true);

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert!(state.surface(group).is_some());
    assert_eq!(state.layer_list(group.index()), [group.index(), member.index()]);
    assert!(state.surface(lone).is_none());
    assert_eq!(state.layer(lone).render_target, root.index());
}

#[test]
fn children_can_follow_parent_backface_visibility() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let flipped = add_container(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.set_transform_origin(flipped, Point3::new(10.0, 10.0, 0.0));
    store.set_transform(flipped, Transform3d::from_rotation_y(core::f64::consts::PI));
    store.update_flags(flipped, |f| f.double_sided = false);
    let follower = add_layer(&mut store, Some(flipped), (0.0, 0.0), (10.0, 10.0));
    store.update_flags(follower, |f| f.use_parent_backface_visibility = true);
    let independent = add_layer(&mut store, Some(flipped), (10.0, 0.0), (10.0, 10.0));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert_eq!(
        state.layer_list(root.index()),
        [root.index(), independent.index()]
    );
    assert!(!state.layer(follower).in_render_surface_layer_list);
    assert!(state.layer(independent).in_render_surface_layer_list);
}

#[test]
fn scroll_offset_moves_layer_and_subtree() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let scroller = add_container(&mut store, Some(root), (20.0, 20.0), (50.0, 50.0));
    store.set_scroll_offset(scroller, Vec2::new(5.0, 10.0));
    let content = add_layer(&mut store, Some(scroller), (0.0, 0.0), (10.0, 10.0));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    assert_eq!(
        state.layer(scroller).draw_transform,
        Transform3d::from_translation(15.0, 10.0, 0.0)
    );
    assert_eq!(
        state.layer(content).drawable_content_rect,
        Rect::new(15.0, 10.0, 25.0, 20.0)
    );
}

#[test]
fn rotation_in_chain_gives_no_maximum_animation_scale() {
    let eps = 1e-9;
    fn maximum_scale(tilt: Option<f64>, own_tilt: Option<f64>) -> f64 {
        let mut store = ImplLayerStore::new();
        let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
        let parent = add_container(&mut store, Some(root), (0.0, 0.0), (50.0, 50.0));
        if let Some(angle) = tilt {
            store.set_transform(parent, Transform3d::from_rotation_z(angle));
        }
        let animated = add_layer(&mut store, Some(parent), (0.0, 0.0), (10.0, 10.0));
        store.set_animation(animated, AnimationState::transform(Some(3.0)));
        if let Some(angle) = own_tilt {
            store.set_transform(animated, Transform3d::from_rotation_z(angle));
        }
        let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));
        state.layer(animated).maximum_animation_contents_scale
    }

    assert!((maximum_scale(None, None) - 3.0).abs() < eps);
    assert_eq!(maximum_scale(Some(0.3), None), 0.0);
    assert_eq!(maximum_scale(None, Some(0.3)), 0.0);
}

#[test]
fn surface_animating_through_zero_scale_keeps_its_translation() {
    let eps = 1e-9;
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let owner = add_container(&mut store, Some(root), (10.0, 20.0), (50.0, 50.0));
    store.update_flags(owner, |f| f.force_render_surface = true);
    store.set_transform(owner, Transform3d::from_scale(0.0, 0.0, 1.0));
    store.set_animation(owner, AnimationState::transform(None));
    let child = add_layer(&mut store, Some(owner), (5.0, 5.0), (10.0, 10.0));

    let state = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));

    let surface = state.surface(owner).unwrap();
    assert!(surface.draw_transform.is_finite());
    assert!(surface.screen_space_transform.is_finite());
    assert_eq!(surface.draw_transform.to_2d_translation(), Vec2::new(10.0, 20.0));
    let (p, _) = map_point(&surface.draw_transform, Point::new(7.0, 7.0));
    assert!((p.x - 10.0).abs() < eps && (p.y - 20.0).abs() < eps);

    let props = state.layer(child);
    assert!(transforms_near(
        &props.draw_transform,
        &Transform3d::from_translation(5.0, 5.0, 0.0),
        eps
    ));
    assert_eq!(surface.content_rect, Rect::new(5.0, 5.0, 15.0, 15.0));
}

#[test]
#[should_panic(expected = "stale LayerId")]
fn stale_root_panics() {
    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    store.destroy_layer(root);
    let _ = store.calculate_draw_properties(&inputs(root, 100.0, 100.0));
}

#[cfg(feature = "trace-rich")]
#[test]
fn pass_reports_surface_decisions() {
    use crate::trace::{
        CalcEndEvent, SkipReason, SubtreeSkippedEvent, SurfaceCreatedEvent, SurfaceDroppedEvent,
        SurfaceReason, TraceSink, Tracer,
    };

    #[derive(Default)]
    struct Sink {
        created: Vec<(u32, SurfaceReason)>,
        skipped: Vec<(u32, SkipReason)>,
        dropped: Vec<u32>,
        surface_count: usize,
    }

    impl TraceSink for Sink {
        fn on_calc_end(&mut self, e: &CalcEndEvent) {
            self.surface_count = e.surface_count;
        }
        fn on_surface_created(&mut self, e: &SurfaceCreatedEvent) {
            self.created.push((e.layer_index, e.reason));
        }
        fn on_subtree_skipped(&mut self, e: &SubtreeSkippedEvent) {
            self.skipped.push((e.layer_index, e.reason));
        }
        fn on_surface_dropped(&mut self, e: &SurfaceDroppedEvent) {
            self.dropped.push(e.layer_index);
        }
    }

    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    let group = add_layer(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.set_opacity(group, 0.5);
    add_layer(&mut store, Some(group), (0.0, 0.0), (10.0, 10.0));
    let empty = add_container(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.update_flags(empty, |f| f.force_render_surface = true);
    let hidden = add_layer(&mut store, Some(root), (0.0, 0.0), (20.0, 20.0));
    store.update_flags(hidden, |f| f.hide_layer_and_subtree = true);

    let mut sink = Sink::default();
    let mut state = DrawState::new();
    {
        let mut tracer = Tracer::new(&mut sink);
        store.calculate_draw_properties_traced(
            &inputs(root, 100.0, 100.0),
            &mut state,
            &mut tracer,
        );
    }

    assert_eq!(
        sink.created,
        [
            (root.index(), SurfaceReason::Root),
            (group.index(), SurfaceReason::Opacity),
            (empty.index(), SurfaceReason::Forced),
        ]
    );
    assert_eq!(sink.dropped, [empty.index()]);
    assert_eq!(sink.skipped, [(hidden.index(), SkipReason::Hidden)]);
    assert_eq!(sink.surface_count, 2);
}

#[cfg(feature = "trace")]
#[test]
fn pass_reports_live_layer_count() {
    use crate::trace::{CalcBeginEvent, TraceSink, Tracer};

    #[derive(Default)]
    struct Sink {
        layer_count: usize,
    }

    impl TraceSink for Sink {
        fn on_calc_begin(&mut self, e: &CalcBeginEvent) {
            self.layer_count = e.layer_count;
        }
    }

    let mut store = ImplLayerStore::new();
    let root = add_layer(&mut store, None, (0.0, 0.0), (100.0, 100.0));
    add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    let removed = add_layer(&mut store, Some(root), (0.0, 0.0), (10.0, 10.0));
    store.destroy_layer(removed);

    let mut sink = Sink::default();
    let mut state = DrawState::new();
    {
        let mut tracer = Tracer::new(&mut sink);
        store.calculate_draw_properties_traced(
            &inputs(root, 100.0, 100.0),
            &mut state,
            &mut tracer,
        );
    }
    assert_eq!(sink.layer_count, 2);
}
