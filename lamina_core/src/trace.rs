// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trace events and the sink trait for observing calculation passes.
//!
//! A [`Tracer`] is threaded through
//! [`LayerStore::calculate_draw_properties_traced`](crate::layer::LayerStore::calculate_draw_properties_traced).
//! With the `trace` feature off it compiles to nothing.
//!
//! The `trace-rich` feature adds per-layer events explaining the decisions the
//! calculator made: why a render surface was created, why a subtree was
//! skipped, and which surfaces were dropped for having nothing to draw.

use kurbo::Size;

// ---------------------------------------------------------------------------
// Reasons
// ---------------------------------------------------------------------------

/// Why a layer got its own render surface.
///
/// Variants are listed in the order the calculator tests them; the first
/// that applies is reported.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SurfaceReason {
    /// The layer has a mask layer.
    Mask,
    /// The layer has a replica layer.
    Replica,
    /// The layer has filters or background filters.
    Filters,
    /// The layer flattens a 3-D rendering context with drawing descendants.
    Flattening,
    /// The layer uses a non-default blend mode.
    Blending,
    /// The layer clips its subtree under a transform that is not axis
    /// aligned.
    Clipping,
    /// The layer is translucent over more than one drawing layer.
    Opacity,
    /// The layer is the root of the tree.
    Root,
    /// The layer isolates a blending group.
    Isolation,
    /// A surface was explicitly forced.
    Forced,
    /// The layer has a copy request.
    CopyRequest,
}

/// Why a layer subtree was left out of the pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// The subtree, or an ancestor, is hidden.
    Hidden,
    /// The layer's transform cannot be inverted.
    SingularTransform,
    /// The layer is fully transparent.
    Transparent,
    /// The layer's surface faces away from the viewer.
    BackFace,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted before a calculation pass walks the tree.
#[derive(Clone, Copy, Debug)]
pub struct CalcBeginEvent {
    /// [`TreeKind::NAME`](crate::layer::TreeKind::NAME) of the tree.
    pub tree: &'static str,
    /// Number of live layers in the store.
    pub layer_count: usize,
    /// Device viewport size.
    pub viewport: Size,
    /// Device scale factor, including the device transform's own scale.
    pub device_scale_factor: f64,
    /// Page scale factor.
    pub page_scale_factor: f64,
}

/// Emitted when a calculation pass completes.
#[derive(Clone, Copy, Debug)]
pub struct CalcEndEvent {
    /// Number of surfaces in the render surface layer list.
    pub surface_count: usize,
    /// Number of layers drawn into some surface.
    pub drawn_layer_count: usize,
    /// Number of layers whose inputs changed since the previous pass.
    pub changed_layer_count: usize,
}

/// Emitted when a layer gets a render surface.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct SurfaceCreatedEvent {
    /// Slot of the owning layer.
    pub layer_index: u32,
    /// First criterion that required the surface.
    pub reason: SurfaceReason,
}

/// Emitted when a layer and its subtree are left out.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct SubtreeSkippedEvent {
    /// Slot of the subtree root.
    pub layer_index: u32,
    /// Why it was skipped.
    pub reason: SkipReason,
}

/// Emitted when a surface is removed again because it had nothing to draw.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct SurfaceDroppedEvent {
    /// Slot of the owning layer.
    pub layer_index: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the calculator.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called before the tree is walked.
    fn on_calc_begin(&mut self, e: &CalcBeginEvent) {
        _ = e;
    }

    /// Called after the render surface layer list is complete.
    fn on_calc_end(&mut self, e: &CalcEndEvent) {
        _ = e;
    }

    /// Called when a render surface is created (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_surface_created(&mut self, e: &SurfaceCreatedEvent) {
        _ = e;
    }

    /// Called when a subtree is skipped (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_subtree_skipped(&mut self, e: &SubtreeSkippedEvent) {
        _ = e;
    }

    /// Called when an empty surface is dropped (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_surface_dropped(&mut self, e: &SurfaceDroppedEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`CalcBeginEvent`].
    #[inline]
    pub fn calc_begin(&mut self, e: &CalcBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_calc_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CalcEndEvent`].
    #[inline]
    pub fn calc_end(&mut self, e: &CalcEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_calc_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Reports a new surface (no-op without `trace-rich`).
    #[inline]
    pub fn surface_created(&mut self, layer_index: u32, reason: SurfaceReason) {
        #[cfg(feature = "trace-rich")]
        if let Some(s) = &mut self.sink {
            s.on_surface_created(&SurfaceCreatedEvent {
                layer_index,
                reason,
            });
        }
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = (layer_index, reason);
        }
    }

    /// Reports a skipped subtree (no-op without `trace-rich`).
    #[inline]
    pub fn subtree_skipped(&mut self, layer_index: u32, reason: SkipReason) {
        #[cfg(feature = "trace-rich")]
        if let Some(s) = &mut self.sink {
            s.on_subtree_skipped(&SubtreeSkippedEvent {
                layer_index,
                reason,
            });
        }
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = (layer_index, reason);
        }
    }

    /// Reports a dropped surface (no-op without `trace-rich`).
    #[inline]
    pub fn surface_dropped(&mut self, layer_index: u32) {
        #[cfg(feature = "trace-rich")]
        if let Some(s) = &mut self.sink {
            s.on_surface_dropped(&SurfaceDroppedEvent { layer_index });
        }
        #[cfg(not(feature = "trace-rich"))]
        {
            _ = layer_index;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
