// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! What the draw pass needs to know about running animations.

/// Per-layer animation state, supplied by the animation system.
///
/// Animated values themselves are written into the layer's ordinary
/// properties before each pass. This only says which of them are moving.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnimationState {
    /// A transform animation is running on this layer.
    pub transform_is_animating: bool,
    /// An opacity animation is running on this layer.
    pub opacity_is_animating: bool,
    /// An opacity animation may start on the compositor without the main
    /// tree hearing about it.
    pub opacity_can_animate_on_impl: bool,
    /// Every running transform animation is a pure translation.
    pub has_only_translation_transforms: bool,
    /// Largest scale reached by the running transform animations, if it can
    /// be determined.
    pub maximum_scale: Option<f64>,
}

impl Default for AnimationState {
    fn default() -> Self {
        Self::STILL
    }
}

impl AnimationState {
    /// Nothing is animating.
    pub const STILL: Self = Self {
        transform_is_animating: false,
        opacity_is_animating: false,
        opacity_can_animate_on_impl: false,
        has_only_translation_transforms: true,
        maximum_scale: None,
    };

    /// A running transform animation with the given maximum scale.
    #[must_use]
    pub const fn transform(maximum_scale: Option<f64>) -> Self {
        Self {
            transform_is_animating: true,
            has_only_translation_transforms: false,
            maximum_scale,
            ..Self::STILL
        }
    }

    /// A running opacity animation.
    #[must_use]
    pub const fn opacity() -> Self {
        Self {
            opacity_is_animating: true,
            ..Self::STILL
        }
    }

    /// Returns `true` if a running animation may change the layer's scale.
    #[inline]
    #[must_use]
    pub fn is_animating_scale(&self) -> bool {
        !self.has_only_translation_transforms
    }
}
