/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Framework-agnostic canvas kernel for the tinydag editor.
//!
//! Layers, leaf first:
//! - [`geometry`]: connection curves and fitness status colours
//! - [`viewport`]: screen <-> graph projection, pan and anchor-preserving zoom
//! - [`hit_test`]: point-in-node queries with a pixel tolerance
//! - [`gesture`]: the exclusive pointer-session state machine
//!
//! Nothing here knows about the node record itself. Callers expose node
//! positions through [`CanvasNodes`] and apply the returned
//! [`GestureEffect`]s to their own store.

pub mod geometry;
pub mod gesture;
pub mod viewport;

pub use geometry::{ConnectionPath, StatusColor, connection_path, status_color};
pub use gesture::{
    CanvasConfig, CanvasState, Gesture, GestureEffect, Modifiers, PointerButton, ReleaseCause,
};
pub use hit_test::{NodeMetrics, node_at};
pub use viewport::{Viewport, WheelDirection, ZoomLimits};

/// Logical coordinate space in which node positions live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphSpace;

/// Pixel space of the hosting surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSpace;

pub type GraphPoint = euclid::Point2D<f64, GraphSpace>;
pub type GraphVector = euclid::Vector2D<f64, GraphSpace>;
pub type GraphSize = euclid::Size2D<f64, GraphSpace>;
pub type ScreenPoint = euclid::Point2D<f64, ScreenSpace>;
pub type ScreenVector = euclid::Vector2D<f64, ScreenSpace>;
pub type ScreenSize = euclid::Size2D<f64, ScreenSpace>;
pub type ScreenRect = euclid::Rect<f64, ScreenSpace>;

/// Read access to node positions for hit testing and gesture anchoring.
///
/// Iteration order is the tie-break order for overlapping nodes: the first
/// node yielded wins.
pub trait CanvasNodes {
    type Id: Copy + PartialEq + std::fmt::Debug;

    fn node_positions(&self) -> impl Iterator<Item = (Self::Id, GraphPoint)> + '_;

    fn node_position(&self, id: Self::Id) -> Option<GraphPoint> {
        self.node_positions()
            .find(|(candidate, _)| *candidate == id)
            .map(|(_, position)| position)
    }
}

impl<K> CanvasNodes for [(K, GraphPoint)]
where
    K: Copy + PartialEq + std::fmt::Debug,
{
    type Id = K;

    fn node_positions(&self) -> impl Iterator<Item = (K, GraphPoint)> + '_ {
        self.iter().copied()
    }
}

impl<K> CanvasNodes for Vec<(K, GraphPoint)>
where
    K: Copy + PartialEq + std::fmt::Debug,
{
    type Id = K;

    fn node_positions(&self) -> impl Iterator<Item = (K, GraphPoint)> + '_ {
        self.iter().copied()
    }
}
