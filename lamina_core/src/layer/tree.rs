// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The two tree representations a compositor keeps.
//!
//! The *main* tree is mutated by application and layout code. Animations run
//! elsewhere, so any animated transform or opacity value it holds may already
//! be stale: everything derived from an animating value is treated as
//! unknown. The *impl* tree is the compositor's copy, with animated values
//! applied for the frame being drawn, so nothing about it is unknown.
//!
//! One [`LayerStore`](super::LayerStore) type serves both; the differences
//! are captured by the [`TreeKind`] marker it is parameterized over.

use core::fmt::Debug;

/// Per-tree policy consulted by the draw-property and occlusion passes.
pub trait TreeKind: Copy + Debug + Default + 'static {
    /// Short name used in diagnostics.
    const NAME: &'static str;

    /// Whether animated values in this tree are final for the frame.
    const ANIMATIONS_SETTLED: bool;

    /// Whether a value that may be animating can be relied on.
    #[inline]
    #[must_use]
    fn is_known(animating: bool) -> bool {
        Self::ANIMATIONS_SETTLED || !animating
    }

    /// Whether layers sorted in a 3-D rendering context are drawn in an
    /// order this tree cannot predict.
    #[inline]
    #[must_use]
    fn is_in_unsorted_3d_context(is_3d_sorted: bool) -> bool {
        !Self::ANIMATIONS_SETTLED && is_3d_sorted
    }

    /// Whether descendants of 3-D rendering context roots are depth-sorted
    /// after collection.
    #[inline]
    #[must_use]
    fn sorts_3d_contexts() -> bool {
        Self::ANIMATIONS_SETTLED
    }

    /// Whether a fully transparent subtree can be dropped.
    ///
    /// On the main tree an opacity that is animating, or may start animating
    /// on the compositor, is not trustworthy.
    #[inline]
    #[must_use]
    fn transparent_subtree_is_skippable(
        opacity_is_animating: bool,
        opacity_can_animate_on_impl: bool,
    ) -> bool {
        Self::ANIMATIONS_SETTLED || !(opacity_is_animating || opacity_can_animate_on_impl)
    }

    /// Whether maximum animation scales are computed for this tree.
    #[inline]
    #[must_use]
    fn tracks_animation_scale() -> bool {
        Self::ANIMATIONS_SETTLED
    }
}

/// The tree owned by application code.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct MainTree;

impl TreeKind for MainTree {
    const NAME: &'static str = "main";
    const ANIMATIONS_SETTLED: bool = false;
}

/// The compositor's tree, with animations applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImplTree;

impl TreeKind for ImplTree {
    const NAME: &'static str = "impl";
    const ANIMATIONS_SETTLED: bool = true;
}
