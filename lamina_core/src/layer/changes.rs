// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Input change tracking between calculation passes.
//!
//! Each dirty channel is drained into one list of [`LayerChanges`]. The
//! propagating channels report the whole affected subtree, so a transform
//! change on a parent lists every descendant whose draw transform moved.
//!
//! [`LayerChanges`] uses raw slot indices (`u32`) rather than [`LayerId`]
//! handles so that consumers can index directly into per-frame tables such
//! as [`DrawState`](crate::draw::DrawState).
//!
//! [`LayerId`]: super::LayerId

use alloc::vec::Vec;

use super::store::LayerStore;
use super::tree::TreeKind;
use crate::dirty;

/// Layers whose inputs changed since the previous drain.
#[derive(Clone, Debug, Default)]
pub struct LayerChanges {
    /// Layers whose geometry, or an ancestor's, changed.
    pub geometry: Vec<u32>,
    /// Layers whose opacity, or an ancestor's, changed.
    pub opacity: Vec<u32>,
    /// Layers whose drawn content changed.
    pub content: Vec<u32>,
    /// Layers whose filters, blending, mask or replica changed.
    pub effects: Vec<u32>,
    /// Layers created since the last drain.
    pub added: Vec<u32>,
    /// Layers destroyed since the last drain.
    pub removed: Vec<u32>,
    /// Whether parent/child or attachment links changed.
    pub topology_changed: bool,
}

impl LayerChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.geometry.clear();
        self.opacity.clear();
        self.content.clear();
        self.effects.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }

    /// Returns `true` if nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.geometry.is_empty()
            && self.opacity.is_empty()
            && self.content.is_empty()
            && self.effects.is_empty()
            && self.added.is_empty()
            && self.removed.is_empty()
            && !self.topology_changed
    }

    /// Number of distinct layers mentioned in any list.
    #[must_use]
    pub fn changed_layer_count(&self) -> usize {
        let mut all: Vec<u32> = self
            .geometry
            .iter()
            .chain(&self.opacity)
            .chain(&self.content)
            .chain(&self.effects)
            .chain(&self.added)
            .chain(&self.removed)
            .copied()
            .collect();
        all.sort_unstable();
        all.dedup();
        all.len()
    }
}

impl<K: TreeKind> LayerStore<K> {
    /// Drains all dirty channels and returns what changed.
    pub fn drain_changes(&mut self) -> LayerChanges {
        let mut changes = LayerChanges::default();
        self.drain_changes_into(&mut changes);
        changes
    }

    /// Like [`drain_changes`](Self::drain_changes), but reuses a
    /// caller-provided buffer.
    pub fn drain_changes_into(&mut self, changes: &mut LayerChanges) {
        changes.clear();

        changes.geometry = self
            .dirty
            .drain(dirty::GEOMETRY)
            .affected()
            .deterministic()
            .run()
            .collect();
        changes.opacity = self
            .dirty
            .drain(dirty::OPACITY)
            .affected()
            .deterministic()
            .run()
            .collect();
        changes.content = self
            .dirty
            .drain(dirty::CONTENT)
            .deterministic()
            .run()
            .collect();
        changes.effects = self
            .dirty
            .drain(dirty::EFFECTS)
            .deterministic()
            .run()
            .collect();
        let topology: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();
        changes.topology_changed = !topology.is_empty();

        // Destroyed slots may still be listed by channels marked before the
        // layer went away.
        let removed = &self.pending_removed;
        let live = |idx: &u32| !removed.contains(idx);
        changes.geometry.retain(live);
        changes.opacity.retain(live);
        changes.content.retain(live);
        changes.effects.retain(live);

        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
    }
}
