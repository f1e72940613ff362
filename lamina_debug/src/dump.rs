// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! JSON dump of a computed draw state.
//!
//! [`to_json`] captures the render surface layer list, every surface on it,
//! and the draw properties of every layer drawn, for inspection or golden
//! files. [`write`] serializes the same value to a writer.
//!
//! Rectangles are `[x0, y0, x1, y1]`; transforms are 16 numbers, column by
//! column.

use std::io::{self, Write};

use serde_json::{Value, json};

use kurbo::Rect;
use lamina_core::draw::{DrawProperties, DrawState, RenderSurface};
use lamina_core::layer::{INVALID, LayerStore, TreeKind};
use lamina_core::transform::Transform3d;

/// Builds a JSON description of `state`, computed from `store`.
#[must_use]
pub fn to_json<K: TreeKind>(store: &LayerStore<K>, state: &DrawState) -> Value {
    let surfaces: Vec<Value> = state
        .render_surface_layer_list()
        .iter()
        .filter_map(|&owner| state.surface_at(owner))
        .map(surface_json)
        .collect();

    let layers: Vec<Value> = (0..store.slot_count())
        .filter_map(|slot| u32::try_from(slot).ok())
        .filter(|&idx| state.layer_at(idx).in_render_surface_layer_list)
        .map(|idx| layer_json(idx, state.layer_at(idx)))
        .collect();

    json!({
        "tree": K::NAME,
        "root": slot(state.root()),
        "render_surface_layer_list": surfaces,
        "layers": layers,
    })
}

/// Writes [`to_json`] of `state`, pretty-printed.
pub fn write<K: TreeKind>(
    store: &LayerStore<K>,
    state: &DrawState,
    writer: &mut dyn Write,
) -> io::Result<()> {
    serde_json::to_writer_pretty(writer, &to_json(store, state))?;
    Ok(())
}

fn surface_json(s: &RenderSurface) -> Value {
    json!({
        "owner": s.owner,
        "draw_transform": transform_json(&s.draw_transform),
        "screen_space_transform": transform_json(&s.screen_space_transform),
        "replica_draw_transform": s.has_replica.then(|| transform_json(&s.replica_draw_transform)),
        "draw_opacity": s.draw_opacity,
        "draw_opacity_is_animating": s.draw_opacity_is_animating,
        "clip_rect": s.is_clipped.then(|| rect_json(s.clip_rect)),
        "content_rect": rect_json(s.content_rect),
        "contributes_to_drawn_surface": s.contributes_to_drawn_surface,
        "nearest_occlusion_immune_ancestor": slot(s.nearest_occlusion_immune_ancestor),
        "layer_list": s.layer_list,
    })
}

fn layer_json(idx: u32, p: &DrawProperties) -> Value {
    json!({
        "index": idx,
        "render_target": slot(p.render_target),
        "draw_transform": transform_json(&p.draw_transform),
        "screen_space_transform": transform_json(&p.screen_space_transform),
        "opacity": p.opacity,
        "clip_rect": p.is_clipped.then(|| rect_json(p.clip_rect)),
        "drawable_content_rect": rect_json(p.drawable_content_rect),
        "visible_content_rect": rect_json(p.visible_content_rect),
        "content_bounds": [p.content_bounds.width, p.content_bounds.height],
        "contents_scale": p.contents_scale,
        "maximum_animation_contents_scale": p.maximum_animation_contents_scale,
        "can_use_lcd_text": p.can_use_lcd_text,
    })
}

fn slot(idx: u32) -> Option<u32> {
    (idx != INVALID).then_some(idx)
}

fn rect_json(r: Rect) -> Value {
    json!([r.x0, r.y0, r.x1, r.y1])
}

fn transform_json(t: &Transform3d) -> Value {
    let cols = t.to_cols_array_2d();
    let flat: Vec<f64> = cols.iter().flatten().copied().collect();
    json!(flat)
}
