// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tree-building helpers shared by unit tests.

use kurbo::{Point, Rect, Size};

use crate::draw::CalcDrawPropsInputs;
use crate::layer::{LayerId, LayerStore, TreeKind};
use crate::transform::Transform3d;

/// Creates a content-drawing layer at `position` with `bounds`, attached to
/// `parent` when given.
pub(crate) fn add_layer<K: TreeKind>(
    store: &mut LayerStore<K>,
    parent: Option<LayerId>,
    position: (f64, f64),
    bounds: (f64, f64),
) -> LayerId {
    let id = store.create_layer();
    store.set_position(id, Point::new(position.0, position.1));
    store.set_bounds(id, Size::new(bounds.0, bounds.1));
    store.update_flags(id, |f| f.draws_content = true);
    if let Some(parent) = parent {
        store.add_child(parent, id);
    }
    id
}

/// Like [`add_layer`], for a layer that paints nothing itself.
pub(crate) fn add_container<K: TreeKind>(
    store: &mut LayerStore<K>,
    parent: Option<LayerId>,
    position: (f64, f64),
    bounds: (f64, f64),
) -> LayerId {
    let id = add_layer(store, parent, position, bounds);
    store.update_flags(id, |f| f.draws_content = false);
    id
}

/// Inputs for a `width` × `height` viewport with unit scales.
pub(crate) fn inputs(root: LayerId, width: f64, height: f64) -> CalcDrawPropsInputs {
    CalcDrawPropsInputs::new(root, Size::new(width, height))
}

/// Whether every element of `a` and `b` is within `eps`.
pub(crate) fn transforms_near(a: &Transform3d, b: &Transform3d, eps: f64) -> bool {
    let a = a.to_cols_array_2d();
    let b = b.to_cols_array_2d();
    a.iter()
        .flatten()
        .zip(b.iter().flatten())
        .all(|(x, y)| (x - y).abs() <= eps)
}

/// Whether every edge of `a` and `b` is within `eps`.
pub(crate) fn rects_near(a: Rect, b: Rect, eps: f64) -> bool {
    (a.x0 - b.x0).abs() <= eps
        && (a.y0 - b.y0).abs() <= eps
        && (a.x1 - b.x1).abs() <= eps
        && (a.y1 - b.y1).abs() <= eps
}
