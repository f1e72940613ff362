// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Front-to-back traversal of a computed draw state.
//!
//! The render surface layer list and per-surface layer lists are stored back
//! to front. Occlusion is accumulated front to back, so [`LayerIterator`]
//! walks them in reverse, descending into each contributing surface before
//! visiting what lies behind it:
//!
//! ```text
//!   root surface list:  [root, a, S, b]        S owns a surface
//!   S's list:           [S, c]
//!
//!   visiting order:     b (itself)
//!                       c (itself)             inside S, front first
//!                       S (itself)
//!                       S (target surface)     S is finished
//!                       S (contributing)       S drawn into the root
//!                       a (itself)
//!                       root (itself)
//!                       root (target surface)
//! ```
//!
//! Every layer that draws is visited as *itself* exactly once, every
//! non-root surface once as a *contributing surface* and every surface once
//! as a *target surface*, after everything drawn into it.

use alloc::vec::Vec;

use crate::draw::DrawState;

/// One step of a [`LayerIterator`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LayerIteratorPosition {
    /// Slot of the layer visited. For a target surface, its owner.
    pub current_layer: u32,
    /// Owner of the surface the current layer draws into, or of the surface
    /// itself when [`represents_target_render_surface`](Self::represents_target_render_surface).
    pub target_render_surface_layer: u32,
    /// All layers drawing into the target have been visited.
    pub represents_target_render_surface: bool,
    /// The current layer's own surface is being drawn into the target.
    pub represents_contributing_render_surface: bool,
    /// The current layer draws its own content into the target.
    pub represents_itself: bool,
}

/// Visits the layers and surfaces of a [`DrawState`] front to back.
#[derive(Clone, Debug)]
pub struct LayerIterator<'a> {
    state: &'a DrawState,
    target: u32,
    /// Index into the target's layer list; `None` stands for the target
    /// surface itself.
    current: Option<usize>,
    /// Targets suspended while descending into a contributing surface.
    stack: Vec<(u32, Option<usize>)>,
    done: bool,
}

impl<'a> LayerIterator<'a> {
    /// Starts at the frontmost layer of the root surface.
    #[must_use]
    pub fn new(state: &'a DrawState) -> Self {
        let root = state.root();
        let mut it = Self {
            state,
            target: root,
            current: None,
            stack: Vec::new(),
            done: state.is_empty(),
        };
        if !it.done {
            it.current = state.layer_list(root).len().checked_sub(1);
            it.move_to_highest_in_subtree();
        }
        it
    }

    fn current_layer(&self) -> u32 {
        match self.current {
            Some(i) => self.state.layer_list(self.target)[i],
            None => self.target,
        }
    }

    fn represents_contributing_surface(&self) -> bool {
        self.current.is_some()
            && self
                .state
                .is_contributing_surface(self.current_layer(), self.target)
    }

    fn position(&self) -> LayerIteratorPosition {
        let represents_target_render_surface = self.current.is_none();
        let represents_contributing_render_surface = self.represents_contributing_surface();
        LayerIteratorPosition {
            current_layer: self.current_layer(),
            target_render_surface_layer: self.target,
            represents_target_render_surface,
            represents_contributing_render_surface,
            represents_itself: !represents_target_render_surface
                && !represents_contributing_render_surface,
        }
    }

    /// Descends through contributing surfaces to the frontmost layer drawn
    /// into them.
    fn move_to_highest_in_subtree(&mut self) {
        while self.represents_contributing_surface() {
            let owner = self.current_layer();
            self.stack.push((self.target, self.current));
            self.target = owner;
            self.current = self.state.layer_list(owner).len().checked_sub(1);
        }
    }

    fn move_to_next(&mut self) {
        match self.current {
            Some(i) => {
                self.current = i.checked_sub(1);
                self.move_to_highest_in_subtree();
            }
            // The target surface is finished; resume its parent target at
            // the entry for the surface, which now contributes.
            None => match self.stack.pop() {
                Some((target, current)) => {
                    self.target = target;
                    self.current = current;
                }
                None => self.done = true,
            },
        }
    }
}

impl Iterator for LayerIterator<'_> {
    type Item = LayerIteratorPosition;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let position = self.position();
        self.move_to_next();
        Some(position)
    }
}

impl DrawState {
    /// Iterates layers and surfaces front to back.
    #[must_use]
    pub fn front_to_back(&self) -> LayerIterator<'_> {
        LayerIterator::new(self)
    }
}
