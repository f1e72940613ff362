// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer tree data model.
//!
//! A *layer* is a node in a compositing tree. Each layer has:
//!
//! - An identity ([`LayerId`]), a generational handle that becomes stale when
//!   the layer is destroyed.
//! - Topology: parent, first-child, and sibling links forming an ordered tree.
//!   Child order is paint order, back to front.
//! - Attachments: an optional [mask](LayerStore::set_mask_layer) and
//!   [replica](LayerStore::set_replica_layer), owned by the layer and kept
//!   out of the child list.
//! - Non-structural links: a [clip parent](LayerStore::set_clip_parent) and a
//!   [scroll parent](LayerStore::set_scroll_parent), weak references used
//!   only to look up clipping.
//! - **Local properties** set by the caller: bounds, position, transform
//!   origin and transform, scroll offset, opacity, [`LayerFlags`], filters,
//!   blend mode and [`AnimationState`].
//!
//! Nothing computed lives here. Draw properties are produced fresh by each
//! pass into a [`DrawState`](crate::draw::DrawState) side table. The one
//! exception is the remembered raster scale, which deliberately persists.
//!
//! # Dirty tracking
//!
//! Property mutations automatically mark the corresponding dirty channel
//! (see [`dirty`](crate::dirty)) and are reported through [`LayerChanges`].

mod animation;
mod changes;
mod id;
mod store;
mod traverse;
mod tree;

pub use animation::AnimationState;
pub use changes::LayerChanges;
pub use id::{INVALID, LayerId};
pub use store::{LayerFlags, LayerStore};
pub use traverse::Children;
pub use tree::{ImplTree, MainTree, TreeKind};

/// A store of main-tree layers.
pub type MainLayerStore = LayerStore<MainTree>;

/// A store of impl-tree layers.
pub type ImplLayerStore = LayerStore<ImplTree>;
