// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use lamina_core::trace::{
    CalcBeginEvent, CalcEndEvent, SkipReason, SubtreeSkippedEvent, SurfaceCreatedEvent,
    SurfaceDroppedEvent, SurfaceReason, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    pass: u64,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("pass", &self.pass)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::with_writer(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self::with_writer(writer)
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer, pass: 0 }
    }

    /// Consumes the sink, returning the destination.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn surface_reason_name(reason: SurfaceReason) -> &'static str {
    match reason {
        SurfaceReason::Mask => "mask",
        SurfaceReason::Replica => "replica",
        SurfaceReason::Filters => "filters",
        SurfaceReason::Flattening => "flattening",
        SurfaceReason::Blending => "blending",
        SurfaceReason::Clipping => "clipping",
        SurfaceReason::Opacity => "opacity",
        SurfaceReason::Root => "root",
        SurfaceReason::Isolation => "isolation",
        SurfaceReason::Forced => "forced",
        SurfaceReason::CopyRequest => "copy-request",
    }
}

fn skip_reason_name(reason: SkipReason) -> &'static str {
    match reason {
        SkipReason::Hidden => "hidden",
        SkipReason::SingularTransform => "singular-transform",
        SkipReason::Transparent => "transparent",
        SkipReason::BackFace => "back-face",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_calc_begin(&mut self, e: &CalcBeginEvent) {
        self.pass += 1;
        let _ = writeln!(
            self.writer,
            "[calc:begin] pass={} tree={} layers={} viewport={}x{} dsf={} psf={}",
            self.pass,
            e.tree,
            e.layer_count,
            e.viewport.width,
            e.viewport.height,
            e.device_scale_factor,
            e.page_scale_factor,
        );
    }

    fn on_calc_end(&mut self, e: &CalcEndEvent) {
        let _ = writeln!(
            self.writer,
            "[calc:end] pass={} surfaces={} drawn={} changed={}",
            self.pass, e.surface_count, e.drawn_layer_count, e.changed_layer_count,
        );
    }

    fn on_surface_created(&mut self, e: &SurfaceCreatedEvent) {
        let _ = writeln!(
            self.writer,
            "[surface] layer={} reason={}",
            e.layer_index,
            surface_reason_name(e.reason),
        );
    }

    fn on_subtree_skipped(&mut self, e: &SubtreeSkippedEvent) {
        let _ = writeln!(
            self.writer,
            "[skip] layer={} reason={}",
            e.layer_index,
            skip_reason_name(e.reason),
        );
    }

    fn on_surface_dropped(&mut self, e: &SurfaceDroppedEvent) {
        let _ = writeln!(self.writer, "[surface:drop] layer={}", e.layer_index);
    }
}
