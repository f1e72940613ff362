// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and JSON inspection of lamina draw-property calculations.
//!
//! - [`pretty::PrettyPrintSink`]: a [`TraceSink`](lamina_core::trace::TraceSink)
//!   writing one human-readable line per calculation event.
//! - [`dump`]: a JSON description of a computed
//!   [`DrawState`](lamina_core::draw::DrawState), for inspection and golden
//!   files.

pub mod dump;
pub mod pretty;
