// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use alloc::vec::Vec;

use super::properties::{DrawProperties, RenderSurface};
use crate::layer::{INVALID, LayerChanges, LayerId};

/// Everything one calculation pass produced.
///
/// Tables are indexed by layer slot and sized to the store's slot count at
/// the time of the pass. Layers the pass did not reach report
/// [`DrawProperties::CLEARED`].
#[derive(Clone, Debug, Default)]
pub struct DrawState {
    pub(crate) layers: Vec<DrawProperties>,
    pub(crate) surfaces: Vec<Option<RenderSurface>>,
    pub(crate) render_surface_layer_list: Vec<u32>,
    pub(crate) root: u32,
    pub(crate) changes: LayerChanges,
}

impl DrawState {
    /// Creates an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: INVALID,
            ..Self::default()
        }
    }

    /// Resets every table for a pass over `slot_count` slots.
    pub(crate) fn reset(&mut self, slot_count: usize) {
        self.layers.clear();
        self.layers.resize(slot_count, DrawProperties::CLEARED);
        self.surfaces.clear();
        self.surfaces.resize_with(slot_count, || None);
        self.render_surface_layer_list.clear();
        self.root = INVALID;
    }

    /// Returns `true` if nothing is drawn.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.render_surface_layer_list.is_empty()
    }

    /// Slot of the root layer, or [`INVALID`] when nothing is drawn.
    #[must_use]
    pub fn root(&self) -> u32 {
        self.root
    }

    /// Draw properties of a layer.
    #[must_use]
    pub fn layer(&self, id: LayerId) -> &DrawProperties {
        self.layer_at(id.index())
    }

    /// Draw properties of the layer in slot `idx`.
    #[must_use]
    pub fn layer_at(&self, idx: u32) -> &DrawProperties {
        self.layers
            .get(idx as usize)
            .unwrap_or(&DrawProperties::CLEARED)
    }

    /// The render surface owned by a layer, if it has one.
    #[must_use]
    pub fn surface(&self, id: LayerId) -> Option<&RenderSurface> {
        self.surface_at(id.index())
    }

    /// The render surface owned by the layer in slot `idx`, if any.
    #[must_use]
    pub fn surface_at(&self, idx: u32) -> Option<&RenderSurface> {
        self.surfaces.get(idx as usize).and_then(Option::as_ref)
    }

    /// The root surface.
    #[must_use]
    pub fn root_surface(&self) -> Option<&RenderSurface> {
        self.surface_at(self.root)
    }

    /// Slots of the layers owning the surfaces to draw, children before the
    /// surfaces they draw into. The root surface comes last.
    #[must_use]
    pub fn render_surface_layer_list(&self) -> &[u32] {
        &self.render_surface_layer_list
    }

    /// Layers that draw into the surface owned by `owner`, back to front.
    #[must_use]
    pub fn layer_list(&self, owner: u32) -> &[u32] {
        self.surface_at(owner)
            .map_or(&[][..], |s| s.layer_list.as_slice())
    }

    /// Inputs that changed since the previous pass.
    #[must_use]
    pub fn changes(&self) -> &LayerChanges {
        &self.changes
    }

    /// Number of layers listed by some drawn surface.
    #[must_use]
    pub fn drawn_layer_count(&self) -> usize {
        self.layers
            .iter()
            .filter(|p| p.in_render_surface_layer_list)
            .count()
    }

    /// Whether the layer in slot `idx` owns a surface in the render surface
    /// layer list and is not the surface `target`.
    #[inline]
    pub(crate) fn is_contributing_surface(&self, idx: u32, target: u32) -> bool {
        idx != target && self.surface_at(idx).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_reads_are_cleared() {
        let state = DrawState::new();
        assert_eq!(state.layer_at(7), &DrawProperties::CLEARED);
        assert!(state.surface_at(7).is_none());
        assert!(state.layer_list(7).is_empty());
        assert!(state.is_empty());
        assert_eq!(state.root(), INVALID);
    }

    #[test]
    fn reset_sizes_tables() {
        let mut state = DrawState::new();
        state.reset(3);
        state.surfaces[1] = Some(RenderSurface::new(1));
        state.render_surface_layer_list.push(1);
        state.reset(2);
        assert_eq!(state.layers.len(), 2);
        assert!(state.surface_at(1).is_none());
        assert!(state.render_surface_layer_list().is_empty());
    }
}
