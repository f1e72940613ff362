// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! The layer store records which inputs changed between calculation passes
//! using multi-channel dirty tracking (via [`understory_dirty`]). The draw
//! pass always recomputes the whole tree, so dirty state never changes its
//! results; it is surfaced as [`LayerChanges`](crate::layer::LayerChanges)
//! for consumers that cache per-layer work (raster tiles, damage).
//!
//! # Propagation semantics
//!
//! - **Propagating**: [`GEOMETRY`] and [`OPACITY`] use
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) along child-to-parent
//!   dependency edges. A parent's transform, position or bounds change moves
//!   every descendant's draw transform; an opacity change alters every
//!   descendant's accumulated opacity.
//!
//! - **Local-only**: [`CONTENT`] and [`EFFECTS`] mark just the layer that
//!   changed. Content covers drawing state (draws-content, opaque regions,
//!   contents scaling); effects covers filters, blend modes, masks and
//!   replicas.
//!
//! - **Structural**: [`TOPOLOGY`] is marked on create/destroy and on
//!   add/remove child.

use understory_dirty::Channel;

/// Position, bounds, transform, scroll offset or visibility changed.
pub const GEOMETRY: Channel = Channel::new(0);

/// Opacity changed.
pub const OPACITY: Channel = Channel::new(1);

/// Drawn content changed.
pub const CONTENT: Channel = Channel::new(2);

/// Filters, blending, mask, replica or surface-forcing state changed.
pub const EFFECTS: Channel = Channel::new(3);

/// Tree topology changed.
pub const TOPOLOGY: Channel = Channel::new(4);
