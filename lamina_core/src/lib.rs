// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Draw properties, render surfaces and occlusion for compositor layer trees.
//!
//! `lamina_core` takes a tree of compositing layers, each with a local
//! transform, bounds, opacity, clipping and effect state, and works out how
//! every layer is drawn: its transform into an offscreen target and onto the
//! screen, the clip and opacity it inherits, which part of it can be visible,
//! and the scale its content should be rasterized at. It is `no_std`
//! compatible (with `alloc`) and stores layers as struct-of-arrays addressed
//! by generational handles.
//!
//! # Architecture
//!
//! ```text
//!   LayerStore<K> (caller-owned properties)
//!       │
//!       ▼
//!   calculate_draw_properties() ──► DrawState
//!                                     │  DrawProperties per layer
//!                                     │  RenderSurface per surface owner
//!                                     │  render surface layer list
//!                                     ▼
//!   LayerIterator (front to back) ──► OcclusionTracker
//! ```
//!
//! **[`layer`]**: Struct-of-arrays layer tree with generational handles.
//! The [`TreeKind`](layer::TreeKind) parameter selects main-tree or
//! impl-tree policy for animations and 3-D sorting.
//!
//! **[`draw`]**: The draw-property calculation and its outputs.
//!
//! **[`iterator`]**: Front-to-back traversal of layers and surfaces.
//!
//! **[`occlusion`]**: Accumulates opaque coverage during that traversal and
//! answers which content is hidden.
//!
//! **[`transform`]**, **[`geometry`]**, **[`math`]**, **[`region`]**: 4×4
//! transforms, rectangle helpers, clipped mapping and projection, and pixel
//! regions.
//!
//! **[`filter`]**: Filter lists and blend modes, as far as they affect
//! surfaces and occlusion.
//!
//! **[`dirty`]**: Change tracking between passes via `understory_dirty`.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! calculation passes, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-layer
//!   surface and skip decision events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod draw;
pub mod filter;
pub mod geometry;
pub mod iterator;
pub mod layer;
pub mod math;
pub mod occlusion;
pub mod region;
pub mod trace;
pub mod transform;

#[cfg(test)]
mod test_util;
