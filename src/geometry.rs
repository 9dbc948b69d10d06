//! Coordinate frames and geometric primitives.
//!
//! Annotations are persisted in image space only. Two further frames exist
//! for display: autofit space (image space scaled so the whole image fits
//! the viewport) and stage space (autofit space under a user-controlled
//! zoom and pan). All pointer input arrives in stage space and must be
//! mapped back to image space before it touches any annotation.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_ZOOM, MIN_ZOOM, WHEEL_ZOOM_FACTOR, ZOOM_STEP};

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Distance from a point to the line segment `(a, b)`.
///
/// Uses the projection-clamped formula: project `p` onto the infinite line
/// through `a` and `b`, clamp the parameter to `[0, 1]`, then measure the
/// distance to that clamped point.
pub fn point_to_segment_distance(p: Point, a: Point, b: Point) -> f32 {
    p.distance_to(closest_point_on_segment(p, a, b))
}

/// The point on segment `(a, b)` closest to `p`.
pub fn closest_point_on_segment(p: Point, a: Point, b: Point) -> Point {
    let abx = b.x - a.x;
    let aby = b.y - a.y;
    let len_sq = abx * abx + aby * aby;
    if len_sq == 0.0 {
        // Degenerate segment
        return a;
    }
    let t = (((p.x - a.x) * abx + (p.y - a.y) * aby) / len_sq).clamp(0.0, 1.0);
    Point::new(a.x + t * abx, a.y + t * aby)
}

/// Find the polygon edge nearest to `p`.
///
/// Edges are `(points[i], points[(i + 1) % n])`; the closing edge from the
/// last vertex back to the first is included. Returns the edge index and
/// the closest point on that edge, or `None` for fewer than 2 vertices.
pub fn nearest_edge(points: &[Point], p: Point) -> Option<(usize, Point)> {
    if points.len() < 2 {
        return None;
    }
    let mut best: Option<(usize, Point, f32)> = None;
    for i in 0..points.len() {
        let a = points[i];
        let b = points[(i + 1) % points.len()];
        let closest = closest_point_on_segment(p, a, b);
        let dist = p.distance_to(closest);
        match best {
            Some((_, _, d)) if d <= dist => {}
            _ => best = Some((i, closest, dist)),
        }
    }
    best.map(|(i, closest, _)| (i, closest))
}

/// Signed polygon area via the shoelace formula, returned as an absolute
/// value. Degenerate inputs (fewer than 3 vertices) yield 0.
pub fn polygon_area(points: &[Point]) -> f32 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    let n = points.len();
    for i in 0..n {
        let j = (i + 1) % n;
        sum += points[i].x * points[j].y - points[j].x * points[i].y;
    }
    sum.abs() / 2.0
}

/// Point-in-polygon test using ray casting.
pub fn polygon_contains(points: &[Point], p: Point) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let n = points.len();
    let mut j = n - 1;
    for i in 0..n {
        let vi = points[i];
        let vj = points[j];
        if ((vi.y > p.y) != (vj.y > p.y))
            && (p.x < (vj.x - vi.x) * (p.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Compute the autofit scale so the whole image fits the container.
///
/// No upper clamp: small images are upscaled to fill the viewport.
pub fn fit_scale(container_w: f32, container_h: f32, image_w: f32, image_h: f32) -> f32 {
    if image_w <= 0.0 || image_h <= 0.0 {
        return 1.0;
    }
    (container_w / image_w).min(container_h / image_h)
}

/// The combined autofit + zoom + pan transform for the stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    /// Autofit scale mapping image pixels into the viewport.
    pub fit_scale: f32,
    /// User-controlled zoom level, bounded to `[MIN_ZOOM, MAX_ZOOM]`.
    pub zoom: f32,
    /// Pan offset of the stage, in stage pixels.
    pub pan_x: f32,
    pub pan_y: f32,
}

impl ViewTransform {
    /// Create a transform with the given autofit scale, zoom 1 and no pan.
    pub fn new(fit_scale: f32) -> Self {
        Self {
            fit_scale,
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    /// Identity transform (fit scale 1, zoom 1, no pan).
    pub fn identity() -> Self {
        Self::new(1.0)
    }

    /// Effective image-to-stage scale factor.
    pub fn scale(&self) -> f32 {
        self.fit_scale * self.zoom
    }

    /// Map an image-space point to stage space.
    pub fn image_to_stage(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale() + self.pan_x,
            p.y * self.scale() + self.pan_y,
        )
    }

    /// Map a stage-space point (pointer event) back to image space.
    pub fn stage_to_image(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.pan_x) / self.scale(),
            (p.y - self.pan_y) / self.scale(),
        )
    }

    /// Apply a pan delta in stage pixels.
    pub fn pan_by(&self, dx: f32, dy: f32) -> Self {
        Self {
            pan_x: self.pan_x + dx,
            pan_y: self.pan_y + dy,
            ..*self
        }
    }

    /// Set the zoom level, keeping the image point under `anchor` (a stage
    /// position, typically the cursor or viewport center) fixed on screen.
    ///
    /// Solves for the new pan so the anchor's image-space location maps to
    /// the same stage pixel before and after the zoom change.
    pub fn zoom_to_point(&self, new_zoom: f32, anchor: Point) -> Self {
        let new_zoom = new_zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        let img = self.stage_to_image(anchor);
        let new_scale = self.fit_scale * new_zoom;
        Self {
            fit_scale: self.fit_scale,
            zoom: new_zoom,
            pan_x: anchor.x - img.x * new_scale,
            pan_y: anchor.y - img.y * new_scale,
        }
    }

    /// One wheel tick toward `anchor`. Positive `ticks` zoom in.
    pub fn wheel_zoom(&self, ticks: f32, anchor: Point) -> Self {
        self.zoom_to_point(self.zoom * WHEEL_ZOOM_FACTOR.powf(ticks), anchor)
    }

    /// Discrete zoom step (toolbar button) anchored at `anchor`.
    pub fn step_zoom(&self, direction: i32, anchor: Point) -> Self {
        self.zoom_to_point(self.zoom + direction as f32 * ZOOM_STEP, anchor)
    }

    /// Recompute the autofit scale after a container resize, preserving the
    /// user's zoom and pan.
    pub fn refit(&self, container_w: f32, container_h: f32, image_w: f32, image_h: f32) -> Self {
        Self {
            fit_scale: fit_scale(container_w, container_h, image_w, image_h),
            ..*self
        }
    }
}

impl Default for ViewTransform {
    fn default() -> Self {
        Self::identity()
    }
}
