//! Geometry kernel for tile culling and label collision tests
//!
//! All functions are pure and total over finite input. Coordinates are plain
//! `geo::Coord<f64>` values in whatever planar space the caller works in
//! (global pixels for culling, tile-local pixels for labels).

use geo::{Coord, Rect};

/// Slope threshold below which a segment is treated as vertical
const VERTICAL_EPSILON: f64 = 1e-7;

/// Result of a closest-point search along a polyline
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    /// The closest point on the polyline
    pub point: Coord<f64>,
    /// Euclidean distance from the query point to `point`
    pub distance: f64,
    /// Arc-length from the first vertex to `point`
    pub traversed: f64,
}

/// Axis-aligned label box described by its top-left corner and extents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl LabelBox {
    /// Create a box of the given size centered on `center`
    pub fn centered(center: Coord<f64>, width: f64, height: f64) -> Self {
        Self {
            x: center.x - width / 2.0,
            y: center.y - height / 2.0,
            width,
            height,
        }
    }

    #[inline]
    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }

    /// Check whether the box lies entirely inside `[0, size] x [0, size]`
    #[inline]
    pub fn fits_within(&self, size: f64) -> bool {
        self.x >= 0.0
            && self.y >= 0.0
            && self.x + self.width <= size
            && self.y + self.height <= size
    }

    /// Return the same box with every coordinate and extent multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }

    /// Test whether two boxes overlap (see [`bbox_overlap`])
    #[inline]
    pub fn overlaps(&self, other: &LabelBox) -> bool {
        bbox_overlap(self, other)
    }
}

/// Approximate test of whether the segment `a`-`b` touches `rect`
///
/// The segment's x-extent is clipped to the rectangle, the matching y-extent is
/// taken from the segment's line equation, and that y-extent is clipped in turn.
/// A near-vertical segment keeps its own y-range. This is a bounding-interval
/// test rather than exact clipping; culling tolerates the occasional extra hit.
pub fn intersects(rect: &Rect<f64>, a: Coord<f64>, b: Coord<f64>) -> bool {
    let r_min = rect.min();
    let r_max = rect.max();

    let (mut min_x, mut max_x) = if a.x > b.x { (b.x, a.x) } else { (a.x, b.x) };
    if max_x > r_max.x {
        max_x = r_max.x;
    }
    if min_x < r_min.x {
        min_x = r_min.x;
    }
    if min_x > max_x {
        return false;
    }

    let mut min_y = a.y;
    let mut max_y = b.y;
    let dx = b.x - a.x;
    if dx.abs() > VERTICAL_EPSILON {
        let slope = (b.y - a.y) / dx;
        let intercept = a.y - slope * a.x;
        min_y = slope * min_x + intercept;
        max_y = slope * max_x + intercept;
    }
    if min_y > max_y {
        std::mem::swap(&mut min_y, &mut max_y);
    }

    if max_y > r_max.y {
        max_y = r_max.y;
    }
    if min_y < r_min.y {
        min_y = r_min.y;
    }

    min_y <= max_y
}

/// Closest point to `point` on the segment `a`-`b`
///
/// The projection parameter is clamped to `[0, 1]`, so the result is always on
/// the segment. A degenerate segment yields `a`.
pub fn closest_point_on_segment(point: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a;
    }

    let param = ((point.x - a.x) * dx + (point.y - a.y) * dy) / len_sq;
    if param < 0.0 {
        a
    } else if param > 1.0 {
        b
    } else {
        Coord {
            x: a.x + param * dx,
            y: a.y + param * dy,
        }
    }
}

/// Find the point on `polyline` closest to `point`
///
/// Segments are scanned in order and the first minimum wins. Returns `None`
/// when the polyline has no segment.
pub fn closest_point_along_polyline(
    polyline: &[Coord<f64>],
    point: Coord<f64>,
) -> Option<ClosestPoint> {
    let mut best: Option<ClosestPoint> = None;
    let mut traversed = 0.0;

    for pair in polyline.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let on_segment = closest_point_on_segment(point, a, b);
        let dist = distance(point, on_segment);
        if best.is_none_or(|best| dist < best.distance) {
            best = Some(ClosestPoint {
                point: on_segment,
                distance: dist,
                traversed: traversed + distance(a, on_segment),
            });
        }
        traversed += distance(a, b);
    }

    best
}

/// Point at arc-length `d` along `polyline`
///
/// Values at or below zero give the first vertex and values past the end give
/// the last one. An empty polyline yields the origin.
pub fn point_at_distance(polyline: &[Coord<f64>], d: f64) -> Coord<f64> {
    let Some(&first) = polyline.first() else {
        return Coord { x: 0.0, y: 0.0 };
    };
    if d <= 0.0 {
        return first;
    }

    let mut traversed = 0.0;
    for pair in polyline.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let segment_length = distance(a, b);
        if d < traversed + segment_length {
            let pct = (d - traversed) / segment_length;
            return Coord {
                x: a.x + pct * (b.x - a.x),
                y: a.y + pct * (b.y - a.y),
            };
        }
        traversed += segment_length;
    }

    polyline[polyline.len() - 1]
}

/// True iff the centers of `a` and `b` are closer than half their summed
/// extents on both axes
#[inline]
pub fn bbox_overlap(a: &LabelBox, b: &LabelBox) -> bool {
    let ca = a.center();
    let cb = b.center();
    (ca.x - cb.x).abs() * 2.0 < a.width + b.width
        && (ca.y - cb.y).abs() * 2.0 < a.height + b.height
}

#[inline(always)]
fn distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    (b.x - a.x).hypot(b.y - a.y)
}
