/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Viewport model: the visible window into graph space.
//!
//! The affine map is `graph = origin + (screen / screen_extent) * extent`,
//! where `screen` is relative to the hosting surface's top-left corner.
//! Every operation returns a new `Viewport`; invalid input leaves the
//! viewport unchanged, so extent stays strictly positive and finite.

use serde::{Deserialize, Serialize};

use crate::{GraphPoint, GraphSize, ScreenPoint, ScreenRect, ScreenSize, ScreenVector};

/// Multiplicative extent factor for one wheel tick away from the user.
pub const ZOOM_OUT_FACTOR: f64 = 1.1;
/// Multiplicative extent factor for one wheel tick towards the user.
pub const ZOOM_IN_FACTOR: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub origin: GraphPoint,
    pub extent: GraphSize,
}

impl Viewport {
    /// Build a viewport, rejecting non-finite or non-positive extents.
    pub fn new(origin: GraphPoint, extent: GraphSize) -> Option<Self> {
        let viewport = Self { origin, extent };
        viewport.is_valid().then_some(viewport)
    }

    /// 1:1 viewport for a surface of the given size, origin at graph (0, 0).
    pub fn for_screen(screen: ScreenSize) -> Self {
        let extent = GraphSize::new(screen.width, screen.height);
        Self::new(GraphPoint::origin(), extent).unwrap_or(Self {
            origin: GraphPoint::origin(),
            extent: GraphSize::new(1.0, 1.0),
        })
    }

    pub fn is_valid(&self) -> bool {
        self.origin.x.is_finite()
            && self.origin.y.is_finite()
            && positive_finite(self.extent.width)
            && positive_finite(self.extent.height)
    }

    /// Pixels per graph unit along x.
    pub fn scale(&self, screen: &ScreenRect) -> f64 {
        screen.size.width / self.extent.width
    }

    /// Graph units per screen pixel, per axis. `None` for a degenerate surface.
    fn units_per_pixel(&self, screen: &ScreenRect) -> Option<(f64, f64)> {
        if !positive_finite(screen.size.width) || !positive_finite(screen.size.height) {
            return None;
        }
        Some((
            self.extent.width / screen.size.width,
            self.extent.height / screen.size.height,
        ))
    }

    /// Convert a length in screen pixels to graph units along x.
    pub fn pixels_to_graph(&self, pixels: f64, screen: &ScreenRect) -> f64 {
        match self.units_per_pixel(screen) {
            Some((per_x, _)) => pixels * per_x,
            None => pixels,
        }
    }

    pub fn screen_to_graph(&self, point: ScreenPoint, screen: &ScreenRect) -> GraphPoint {
        let relative = point - screen.origin;
        match self.units_per_pixel(screen) {
            Some((per_x, per_y)) => GraphPoint::new(
                self.origin.x + relative.x * per_x,
                self.origin.y + relative.y * per_y,
            ),
            None => GraphPoint::new(self.origin.x + relative.x, self.origin.y + relative.y),
        }
    }

    pub fn graph_to_screen(&self, point: GraphPoint, screen: &ScreenRect) -> ScreenPoint {
        let (per_x, per_y) = self.units_per_pixel(screen).unwrap_or((1.0, 1.0));
        ScreenPoint::new(
            screen.origin.x + (point.x - self.origin.x) / per_x,
            screen.origin.y + (point.y - self.origin.y) / per_y,
        )
    }

    /// Translate by a pointer delta so content follows the pointer 1:1 at any zoom.
    pub fn pan(self, delta: ScreenVector, screen: &ScreenRect) -> Self {
        let Some((per_x, per_y)) = self.units_per_pixel(screen) else {
            return self;
        };
        let panned = Self {
            origin: GraphPoint::new(
                self.origin.x - delta.x * per_x,
                self.origin.y - delta.y * per_y,
            ),
            extent: self.extent,
        };
        if panned.is_valid() { panned } else { self }
    }

    /// Resize the extent by `factor`, keeping the graph point under `anchor` fixed.
    pub fn zoom(
        self,
        anchor: ScreenPoint,
        factor: f64,
        screen: &ScreenRect,
        limits: &ZoomLimits,
    ) -> Self {
        if !positive_finite(factor) || self.units_per_pixel(screen).is_none() {
            return self;
        }
        let factor = limits.clamp_factor(self.scale(screen), factor);
        let anchored = self.screen_to_graph(anchor, screen);
        let fraction_x = (anchor.x - screen.origin.x) / screen.size.width;
        let fraction_y = (anchor.y - screen.origin.y) / screen.size.height;
        let extent = GraphSize::new(self.extent.width * factor, self.extent.height * factor);
        let zoomed = Self {
            origin: GraphPoint::new(
                anchored.x - fraction_x * extent.width,
                anchored.y - fraction_y * extent.height,
            ),
            extent,
        };
        if zoomed.is_valid() { zoomed } else { self }
    }

    /// Follow a surface resize, keeping origin and the current scale.
    pub fn resized(self, old_screen: &ScreenRect, new_screen: &ScreenRect) -> Self {
        let (Some((per_x, per_y)), true) = (
            self.units_per_pixel(old_screen),
            positive_finite(new_screen.size.width) && positive_finite(new_screen.size.height),
        ) else {
            return self;
        };
        let resized = Self {
            origin: self.origin,
            extent: GraphSize::new(
                new_screen.size.width * per_x,
                new_screen.size.height * per_y,
            ),
        };
        if resized.is_valid() { resized } else { self }
    }
}

/// Bounds on the zoom scale (pixels per graph unit).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoomLimits {
    pub min_scale: f64,
    pub max_scale: f64,
}

impl ZoomLimits {
    pub fn new(min_scale: f64, max_scale: f64) -> Self {
        Self {
            min_scale,
            max_scale,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0.0, f64::INFINITY)
    }

    fn is_usable(&self) -> bool {
        self.min_scale >= 0.0 && self.max_scale > 0.0 && self.min_scale <= self.max_scale
    }

    /// Reduce `factor` so the resulting scale stays inside the limits.
    ///
    /// A zoom that would cross a bound lands exactly on it.
    pub fn clamp_factor(&self, current_scale: f64, factor: f64) -> f64 {
        if !self.is_usable() || !positive_finite(current_scale) {
            return factor;
        }
        let target = current_scale / factor;
        let clamped = target.clamp(self.min_scale, self.max_scale);
        if clamped == target || clamped <= 0.0 {
            factor
        } else {
            current_scale / clamped
        }
    }
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self::new(0.1, 10.0)
    }
}

/// Discrete wheel tick direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDirection {
    In,
    Out,
}

impl WheelDirection {
    /// Positive `delta_y` zooms out, negative zooms in; zero is no tick.
    pub fn from_delta(delta_y: f64) -> Option<Self> {
        if delta_y > 0.0 {
            Some(WheelDirection::Out)
        } else if delta_y < 0.0 {
            Some(WheelDirection::In)
        } else {
            None
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            WheelDirection::In => ZOOM_IN_FACTOR,
            WheelDirection::Out => ZOOM_OUT_FACTOR,
        }
    }
}

fn positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}
