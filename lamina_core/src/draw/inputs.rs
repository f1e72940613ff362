// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::Size;

use crate::layer::LayerId;
use crate::transform::Transform3d;

/// Configuration of one calculation pass.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CalcDrawPropsInputs {
    /// Root of the tree to calculate.
    pub root: LayerId,
    /// Size of the device viewport in device pixels.
    pub device_viewport_size: Size,
    /// Applied above the root, after the device scale.
    pub device_transform: Transform3d,
    /// Device pixels per layout unit.
    pub device_scale_factor: f64,
    /// Zoom applied below [`page_scale_application_layer`](Self::page_scale_application_layer).
    pub page_scale_factor: f64,
    /// Layer whose children are page scaled.
    pub page_scale_application_layer: Option<LayerId>,
    /// Surfaces wider or taller than this are clamped.
    pub max_texture_size: u32,
    /// Subpixel text may be used where the geometry allows it.
    pub can_use_lcd_text: bool,
    /// Without this, only the root gets a render surface.
    pub can_render_to_separate_surface: bool,
    /// Contents scales follow the transform hierarchy. Without this they
    /// only include the device and page scale.
    pub can_adjust_raster_scales: bool,
}

impl CalcDrawPropsInputs {
    /// Inputs with identity device transform, unit scales and every feature
    /// enabled.
    #[must_use]
    pub fn new(root: LayerId, device_viewport_size: Size) -> Self {
        Self {
            root,
            device_viewport_size,
            device_transform: Transform3d::IDENTITY,
            device_scale_factor: 1.0,
            page_scale_factor: 1.0,
            page_scale_application_layer: None,
            max_texture_size: u32::MAX,
            can_use_lcd_text: true,
            can_render_to_separate_surface: true,
            can_adjust_raster_scales: true,
        }
    }
}
