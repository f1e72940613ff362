// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Render-pass planning for lamina.
//!
//! This crate sits between [`lamina_core`]'s draw-property calculation and
//! backend-specific rendering. Given a layer store and the
//! [`DrawState`](lamina_core::draw::DrawState) computed from it,
//! [`build_plan`] produces:
//!
//! - [`RenderPass`]: one per drawn render surface, in dependency order
//! - [`DrawItem`]: a layer's content or a child surface (and its replica)
//!   drawn into a pass, with the part hidden by opaque content in front
//!   already cut away
//! - [`RenderPlan::background`]: the screen area nothing opaque covers
//!
//! Items that end up completely hidden are dropped and counted in
//! [`RenderPlan::culled_items`].

#![no_std]
#![cfg_attr(docsrs, feature(doc_cfg))]

extern crate alloc;

mod builder;
mod plan;

pub use builder::build_plan;
pub use plan::{DrawItem, DrawItemKind, PlanSettings, RenderPass, RenderPlan};
