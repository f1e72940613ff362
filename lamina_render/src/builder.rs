// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Builds a [`RenderPlan`] from a computed draw state.

use kurbo::Rect;
use lamina_core::draw::DrawState;
use lamina_core::filter::BlendMode;
use lamina_core::layer::{INVALID, LayerStore, TreeKind};
use lamina_core::occlusion::OcclusionTracker;

use crate::plan::{DrawItem, DrawItemKind, PlanSettings, RenderPass, RenderPlan};

/// Fills `plan` with the passes needed to draw `state`, culling whatever
/// opaque content in front hides.
///
/// `state` must have been computed from `store`. Any previous content of
/// `plan` is discarded.
pub fn build_plan<K: TreeKind>(
    store: &LayerStore<K>,
    state: &DrawState,
    settings: &PlanSettings,
    plan: &mut RenderPlan,
) {
    plan.clear();
    let Some(root_surface) = state.root_surface() else {
        return;
    };

    for &owner in state.render_surface_layer_list() {
        if let Some(surface) = state.surface_at(owner) {
            plan.passes.push(RenderPass::new(
                owner,
                surface.content_rect,
                surface.screen_space_transform,
            ));
        }
    }

    let mut tracker = OcclusionTracker::new(store, state, root_surface.content_rect);
    tracker.set_minimum_tracking_size(settings.minimum_occlusion_tracking_size);

    for position in state.front_to_back() {
        tracker.enter_layer(&position);
        let layer = position.current_layer;
        let target = position.target_render_surface_layer;

        if position.represents_itself {
            let props = state.layer_at(layer);
            let rect = tracker.unoccluded_content_rect(props.visible_content_rect, &props.draw_transform);
            // A surface owner's blend mode applies to its surface.
            let blend_mode = if state.surface_at(layer).is_some() {
                BlendMode::default()
            } else {
                store.blend_mode_at(layer)
            };
            push_item(plan, target, DrawItem {
                layer,
                kind: DrawItemKind::Content,
                rect,
                transform: props.draw_transform,
                opacity: props.opacity,
                blend_mode,
            });
        } else if position.represents_contributing_render_surface {
            if let Some(surface) = state.surface_at(layer) {
                let rect = tracker.unoccluded_contributing_surface_content_rect(
                    surface.content_rect,
                    &surface.draw_transform,
                );
                push_item(plan, target, DrawItem {
                    layer,
                    kind: DrawItemKind::Surface {
                        mask: slot(store.mask_layer_at(layer)),
                    },
                    rect,
                    transform: surface.draw_transform,
                    opacity: surface.draw_opacity,
                    blend_mode: store.blend_mode_at(layer),
                });
                if surface.has_replica {
                    let replica = store.replica_layer_at(layer);
                    let mask = if replica == INVALID {
                        None
                    } else {
                        slot(store.mask_layer_at(replica))
                    };
                    let rect = tracker.unoccluded_contributing_surface_content_rect(
                        surface.content_rect,
                        &surface.replica_draw_transform,
                    );
                    push_item(plan, target, DrawItem {
                        layer,
                        kind: DrawItemKind::Replica { mask },
                        rect,
                        transform: surface.replica_draw_transform,
                        opacity: surface.draw_opacity,
                        blend_mode: store.blend_mode_at(layer),
                    });
                }
            }
        }
        tracker.leave_layer(&position);
    }

    // Collected front to back.
    for pass in &mut plan.passes {
        pass.items.reverse();
    }
    if settings.fill_background {
        plan.background = tracker.compute_visible_region_in_screen();
    }
}

fn slot(idx: u32) -> Option<u32> {
    (idx != INVALID).then_some(idx)
}

fn push_item(plan: &mut RenderPlan, target: u32, item: DrawItem) {
    if is_empty(item.rect) {
        plan.culled_items += 1;
        return;
    }
    if let Some(pass) = plan.passes.iter_mut().find(|p| p.owner == target) {
        pass.items.push(item);
    }
}

fn is_empty(rect: Rect) -> bool {
    rect.width() <= 0.0 || rect.height() <= 0.0
}
