/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Pointer-session state machine for the canvas.
//!
//! A pointer session is exactly one of `Idle`, `Panning`, `DraggingNode` or
//! `DrawingConnection`, held as a single [`Gesture`] value. New gestures only
//! start from `Idle`; moves and releases act on whichever gesture is live.
//!
//! Panning and zooming mutate the viewport owned here. Anything that touches
//! the graph is handed back to the caller as a [`GestureEffect`] so the store
//! stays the single write path for node and connection state.

use serde::{Deserialize, Serialize};

use crate::hit_test::{NodeMetrics, node_at, tolerance_in_graph};
use crate::viewport::{Viewport, WheelDirection, ZoomLimits};
use crate::{CanvasNodes, GraphPoint, GraphVector, ScreenPoint, ScreenRect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Modifiers {
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
    #[serde(default)]
    pub ctrl: bool,
}

impl Modifiers {
    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Self::default()
        }
    }
}

/// The live interaction for the current pointer session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture<K> {
    Idle,
    Panning {
        /// Pointer position at the previous move; deltas are always "since last move".
        last: ScreenPoint,
    },
    DraggingNode {
        node: K,
        /// Graph-space pointer minus node origin, captured at press.
        offset: GraphVector,
        moved: bool,
    },
    DrawingConnection {
        source: K,
        free_end: GraphPoint,
        hover: Option<K>,
    },
}

impl<K> Gesture<K> {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseCause {
    PointerUp,
    /// The pointer left the tracking surface; treated as a release.
    PointerLeave,
    /// Explicit cancel input; a pending connection is discarded.
    Cancel,
}

/// Graph-facing outcome of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureEffect<K> {
    MoveNode { node: K, position: GraphPoint },
    DragReleased {
        node: K,
        moved: bool,
        cause: ReleaseCause,
    },
    ConnectionRequested { source: K, target: K },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasConfig {
    pub node_metrics: NodeMetrics,
    /// Hit tolerance around node boxes, in screen pixels.
    pub hit_tolerance_px: f64,
    pub zoom_limits: ZoomLimits,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            node_metrics: NodeMetrics::default(),
            hit_tolerance_px: 20.0,
            zoom_limits: ZoomLimits::default(),
        }
    }
}

/// Viewport, hosting surface and gesture for one canvas.
#[derive(Debug, Clone)]
pub struct CanvasState<K> {
    viewport: Viewport,
    screen: ScreenRect,
    gesture: Gesture<K>,
    config: CanvasConfig,
}

impl<K> CanvasState<K>
where
    K: Copy + PartialEq + std::fmt::Debug,
{
    /// Canvas with a 1:1 viewport over `screen`.
    pub fn new(screen: ScreenRect, config: CanvasConfig) -> Self {
        Self {
            viewport: Viewport::for_screen(screen.size),
            screen,
            gesture: Gesture::Idle,
            config,
        }
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn screen(&self) -> &ScreenRect {
        &self.screen
    }

    pub fn gesture(&self) -> &Gesture<K> {
        &self.gesture
    }

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn is_idle(&self) -> bool {
        self.gesture.is_idle()
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport.is_valid() {
            self.viewport = viewport;
        }
    }

    /// Track a resize of the hosting surface, keeping the current zoom scale.
    pub fn set_screen_rect(&mut self, screen: ScreenRect) {
        self.viewport = self.viewport.resized(&self.screen, &screen);
        self.screen = screen;
    }

    pub fn screen_to_graph(&self, point: ScreenPoint) -> GraphPoint {
        self.viewport.screen_to_graph(point, &self.screen)
    }

    pub fn graph_to_screen(&self, point: GraphPoint) -> ScreenPoint {
        self.viewport.graph_to_screen(point, &self.screen)
    }

    /// Hit tolerance converted to graph units at the current zoom.
    pub fn hit_margin(&self) -> f64 {
        tolerance_in_graph(self.config.hit_tolerance_px, &self.viewport, &self.screen)
    }

    /// Node whose raw box is under `point`, without tolerance.
    pub fn node_under<N>(&self, nodes: &N, point: ScreenPoint) -> Option<K>
    where
        N: CanvasNodes<Id = K> + ?Sized,
    {
        node_at(
            self.screen_to_graph(point),
            nodes,
            None,
            &self.config.node_metrics,
            0.0,
        )
    }

    /// Source and floating end of the connection being drawn, if any.
    pub fn pending_connection(&self) -> Option<(K, GraphPoint, Option<K>)> {
        match self.gesture {
            Gesture::DrawingConnection {
                source,
                free_end,
                hover,
            } => Some((source, free_end, hover)),
            _ => None,
        }
    }

    /// Press: primary over a node starts a drag; middle, or primary with alt,
    /// on empty canvas starts a pan. Returns whether a gesture started.
    pub fn pointer_down<N>(
        &mut self,
        nodes: &N,
        point: ScreenPoint,
        button: PointerButton,
        modifiers: Modifiers,
    ) -> bool
    where
        N: CanvasNodes<Id = K> + ?Sized,
    {
        if !self.is_idle() {
            return false;
        }
        let pointer = self.screen_to_graph(point);
        let pressed = self.node_under(nodes, point);

        match (pressed, button) {
            (Some(node), PointerButton::Primary) => {
                let Some(origin) = nodes.node_position(node) else {
                    return false;
                };
                self.gesture = Gesture::DraggingNode {
                    node,
                    offset: pointer - origin,
                    moved: false,
                };
                true
            },
            (None, _) if is_pan_trigger(button, modifiers) => {
                self.gesture = Gesture::Panning { last: point };
                true
            },
            _ => false,
        }
    }

    /// Start drawing a connection from `source`'s handle.
    pub fn begin_connection<N>(&mut self, nodes: &N, source: K) -> bool
    where
        N: CanvasNodes<Id = K> + ?Sized,
    {
        if !self.is_idle() {
            return false;
        }
        let Some(origin) = nodes.node_position(source) else {
            return false;
        };
        self.gesture = Gesture::DrawingConnection {
            source,
            free_end: origin,
            hover: None,
        };
        true
    }

    pub fn pointer_move<N>(&mut self, nodes: &N, point: ScreenPoint) -> Option<GestureEffect<K>>
    where
        N: CanvasNodes<Id = K> + ?Sized,
    {
        match self.gesture {
            Gesture::Idle => None,
            Gesture::Panning { last } => {
                self.viewport = self.viewport.pan(point - last, &self.screen);
                self.gesture = Gesture::Panning { last: point };
                None
            },
            Gesture::DraggingNode { node, offset, .. } => {
                let position = self.screen_to_graph(point) - offset;
                self.gesture = Gesture::DraggingNode {
                    node,
                    offset,
                    moved: true,
                };
                Some(GestureEffect::MoveNode { node, position })
            },
            Gesture::DrawingConnection { source, .. } => {
                let free_end = self.screen_to_graph(point);
                let hover = node_at(
                    free_end,
                    nodes,
                    Some(source),
                    &self.config.node_metrics,
                    self.hit_margin(),
                );
                self.gesture = Gesture::DrawingConnection {
                    source,
                    free_end,
                    hover,
                };
                None
            },
        }
    }

    pub fn pointer_up(&mut self) -> Option<GestureEffect<K>> {
        self.release(ReleaseCause::PointerUp)
    }

    pub fn pointer_leave(&mut self) -> Option<GestureEffect<K>> {
        self.release(ReleaseCause::PointerLeave)
    }

    pub fn cancel(&mut self) -> Option<GestureEffect<K>> {
        self.release(ReleaseCause::Cancel)
    }

    /// End the live gesture and return to `Idle`.
    pub fn release(&mut self, cause: ReleaseCause) -> Option<GestureEffect<K>> {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Idle | Gesture::Panning { .. } => None,
            Gesture::DraggingNode { node, moved, .. } => Some(GestureEffect::DragReleased {
                node,
                moved,
                cause,
            }),
            Gesture::DrawingConnection { source, hover, .. } => match (cause, hover) {
                (ReleaseCause::Cancel, _) | (_, None) => None,
                (_, Some(target)) if target == source => None,
                (_, Some(target)) => Some(GestureEffect::ConnectionRequested { source, target }),
            },
        }
    }

    /// One wheel tick at `point`. Returns whether the viewport changed.
    pub fn wheel(&mut self, point: ScreenPoint, delta_y: f64) -> bool {
        match WheelDirection::from_delta(delta_y) {
            Some(direction) => self.zoom_at(point, direction.factor()),
            None => false,
        }
    }

    pub fn zoom_at(&mut self, point: ScreenPoint, factor: f64) -> bool {
        let zoomed = self
            .viewport
            .zoom(point, factor, &self.screen, &self.config.zoom_limits);
        let changed = zoomed != self.viewport;
        self.viewport = zoomed;
        changed
    }
}

fn is_pan_trigger(button: PointerButton, modifiers: Modifiers) -> bool {
    match button {
        PointerButton::Middle => true,
        PointerButton::Primary => modifiers.alt,
        PointerButton::Secondary => false,
    }
}
