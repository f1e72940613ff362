// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree traversal utilities.

use super::id::{INVALID, LayerId};
use super::store::LayerStore;
use super::tree::TreeKind;

/// An iterator over the direct children of a layer, back to front.
///
/// Created by [`LayerStore::children`].
#[derive(Debug)]
pub struct Children<'a, K: TreeKind> {
    store: &'a LayerStore<K>,
    current: u32,
}

impl<'a, K: TreeKind> Children<'a, K> {
    pub(crate) fn new(store: &'a LayerStore<K>, first: u32) -> Self {
        Self {
            store,
            current: first,
        }
    }
}

impl<K: TreeKind> Iterator for Children<'_, K> {
    type Item = LayerId;

    fn next(&mut self) -> Option<LayerId> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(LayerId {
            idx,
            generation: self.store.generation[idx as usize],
        })
    }
}

impl<K: TreeKind> LayerStore<K> {
    /// Raw slot indices of the children of slot `idx`, back to front.
    pub(crate) fn child_slots(&self, idx: u32) -> ChildSlots<'_, K> {
        ChildSlots {
            store: self,
            current: self.first_child[idx as usize],
        }
    }
}

/// Like [`Children`], yielding raw slot indices.
#[derive(Debug)]
pub(crate) struct ChildSlots<'a, K: TreeKind> {
    store: &'a LayerStore<K>,
    current: u32,
}

impl<K: TreeKind> Iterator for ChildSlots<'_, K> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.current == INVALID {
            return None;
        }
        let idx = self.current;
        self.current = self.store.next_sibling[idx as usize];
        Some(idx)
    }
}
