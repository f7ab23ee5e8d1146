/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Connection routing and fitness status colours.
//!
//! Both functions are total: any finite input yields a curve or a colour.

use serde::{Deserialize, Serialize};

use crate::{GraphPoint, GraphVector};

/// Cap on the horizontal control-point offset, in graph units.
const MAX_HORIZONTAL_PULL: f64 = 150.0;
/// Cap on the vertical control-point offset, in graph units.
const MAX_VERTICAL_PULL: f64 = 30.0;
const HORIZONTAL_PULL_RATIO: f64 = 0.7;
const VERTICAL_PULL_RATIO: f64 = 0.2;

/// Cubic curve from the source node's right edge to the target node's left edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionPath {
    pub start: GraphPoint,
    pub control1: GraphPoint,
    pub control2: GraphPoint,
    pub end: GraphPoint,
    /// Midpoint between the two node centres, where the delete handle sits.
    pub handle: GraphPoint,
}

impl ConnectionPath {
    /// SVG path data (`M … C …`) for the curve.
    pub fn to_svg_path(&self) -> String {
        format!(
            "M {},{} C {},{} {},{} {},{}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y,
        )
    }

    /// Point on the curve at parameter `t` in `[0, 1]`.
    pub fn point_at(&self, t: f64) -> GraphPoint {
        let t = t.clamp(0.0, 1.0);
        let u = 1.0 - t;
        let weights = [u * u * u, 3.0 * u * u * t, 3.0 * u * t * t, t * t * t];
        let points = [self.start, self.control1, self.control2, self.end];
        let mut acc = GraphPoint::origin();
        for (weight, point) in weights.iter().zip(points.iter()) {
            acc.x += weight * point.x;
            acc.y += weight * point.y;
        }
        acc
    }
}

/// Route a connection between two node centres.
///
/// Endpoints are the facing horizontal edges (`source.x + half_width`,
/// `target.x - half_width`). Control points pull horizontally by
/// `min(|dx| * 0.7, 150)` and vertically by `min(|dy| * 0.2, 30)` in the
/// direction of `dy`, giving an S-curve that flattens over long spans.
pub fn connection_path(source: GraphPoint, target: GraphPoint, half_width: f64) -> ConnectionPath {
    let start = source + GraphVector::new(half_width, 0.0);
    let end = target - GraphVector::new(half_width, 0.0);

    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let pull_x = (dx.abs() * HORIZONTAL_PULL_RATIO).min(MAX_HORIZONTAL_PULL);
    let pull_y = (dy.abs() * VERTICAL_PULL_RATIO).min(MAX_VERTICAL_PULL);
    let signed_pull_y = if dy > 0.0 { pull_y } else { -pull_y };

    ConnectionPath {
        start,
        control1: GraphPoint::new(start.x + pull_x, start.y + signed_pull_y),
        control2: GraphPoint::new(end.x - pull_x, end.y - signed_pull_y),
        end,
        handle: source.lerp(target, 0.5),
    }
}

/// Display category for a node's fitness score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusColor {
    /// Not yet evaluated.
    Neutral,
    Failing,
    Warning,
    Success,
}

impl StatusColor {
    pub fn hex(self) -> &'static str {
        match self {
            StatusColor::Neutral => "#94a3b8",
            StatusColor::Failing => "#ef4444",
            StatusColor::Warning => "#f59e0b",
            StatusColor::Success => "#22c55e",
        }
    }
}

/// Map a fitness score to its status colour. Absent, zero and NaN are neutral.
pub fn status_color(fitness: Option<f64>) -> StatusColor {
    match fitness {
        None => StatusColor::Neutral,
        Some(score) if score == 0.0 || score.is_nan() => StatusColor::Neutral,
        Some(score) if score < 0.5 => StatusColor::Failing,
        Some(score) if score < 0.8 => StatusColor::Warning,
        Some(_) => StatusColor::Success,
    }
}
