//! Annotation entity and its shape variants.

use serde::{Deserialize, Serialize};

use crate::constants::{MIN_POLYGON_VERTICES, MIN_RECT_SIZE, POINT_HIT_RADIUS};
use crate::geometry::{self, Point};
use crate::model::{ImageId, LabelId, new_id, now_millis};

/// Unique identifier for an annotation.
pub type AnnotationId = String;

/// Shape geometry of an annotation, in image-pixel coordinates.
///
/// All per-shape logic (rendering, hit testing, transforms, export) matches
/// exhaustively on this tag; nothing probes fields structurally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Shape {
    /// Axis-aligned rectangle with top-left origin and positive extents.
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// Closed polygon; the last point connects implicitly to the first.
    Polygon { points: Vec<Point> },
    /// Single location marker. Not produced by the interactive tools, but
    /// a first-class citizen of storage, history and hit testing.
    Point { x: f32, y: f32 },
}

impl Shape {
    /// Build a normalized rectangle from two corner points.
    ///
    /// Corners may arrive in any order (right-to-left or bottom-to-top
    /// drags); the result always has positive width/height. Returns `None`
    /// when either extent is under the minimum size, which discards the
    /// gesture rather than raising an error.
    pub fn rectangle_from_corners(a: Point, b: Point) -> Option<Self> {
        let width = (b.x - a.x).abs();
        let height = (b.y - a.y).abs();
        if width < MIN_RECT_SIZE || height < MIN_RECT_SIZE {
            return None;
        }
        Some(Shape::Rectangle {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width,
            height,
        })
    }

    /// Build a polygon from collected vertices. `None` under 3 points.
    pub fn polygon_from_points(points: Vec<Point>) -> Option<Self> {
        if points.len() < MIN_POLYGON_VERTICES {
            return None;
        }
        Some(Shape::Polygon { points })
    }

    /// Area of the shape: `w*h` for rectangles, shoelace for polygons,
    /// zero for points.
    pub fn area(&self) -> f32 {
        match self {
            Shape::Rectangle { width, height, .. } => width * height,
            Shape::Polygon { points } => geometry::polygon_area(points),
            Shape::Point { .. } => 0.0,
        }
    }

    /// Axis-aligned bounds as `(x, y, width, height)`.
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        match self {
            Shape::Rectangle {
                x,
                y,
                width,
                height,
            } => (*x, *y, *width, *height),
            Shape::Polygon { points } => {
                let mut min_x = f32::INFINITY;
                let mut min_y = f32::INFINITY;
                let mut max_x = f32::NEG_INFINITY;
                let mut max_y = f32::NEG_INFINITY;
                for p in points {
                    min_x = min_x.min(p.x);
                    min_y = min_y.min(p.y);
                    max_x = max_x.max(p.x);
                    max_y = max_y.max(p.y);
                }
                if points.is_empty() {
                    (0.0, 0.0, 0.0, 0.0)
                } else {
                    (min_x, min_y, max_x - min_x, max_y - min_y)
                }
            }
            Shape::Point { x, y } => (*x, *y, 0.0, 0.0),
        }
    }

    /// Hit test against an image-space point.
    pub fn contains(&self, p: Point) -> bool {
        match self {
            Shape::Rectangle {
                x,
                y,
                width,
                height,
            } => p.x >= *x && p.x <= x + width && p.y >= *y && p.y <= y + height,
            Shape::Polygon { points } => geometry::polygon_contains(points, p),
            Shape::Point { x, y } => Point::new(*x, *y).distance_to(p) < POINT_HIT_RADIUS,
        }
    }

    /// Translate the shape by an offset, in place.
    pub fn translate(&mut self, dx: f32, dy: f32) {
        match self {
            Shape::Rectangle { x, y, .. } => {
                *x += dx;
                *y += dy;
            }
            Shape::Polygon { points } => {
                for p in points.iter_mut() {
                    p.x += dx;
                    p.y += dy;
                }
            }
            Shape::Point { x, y } => {
                *x += dx;
                *y += dy;
            }
        }
    }
}

/// A persisted annotation on one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier.
    pub id: AnnotationId,
    /// Owning image.
    pub image_id: ImageId,
    /// Owning label. May dangle after a label deletion; such annotations
    /// are orphans and are excluded from rendering and export.
    pub label_id: LabelId,
    /// Shape geometry in image-pixel coordinates.
    pub shape: Shape,
    /// Creation timestamp, milliseconds since the Unix epoch.
    pub created_at: u64,
    /// Last modification timestamp.
    pub updated_at: u64,
    /// Per-annotation visibility flag.
    #[serde(default = "default_true")]
    pub is_visible: bool,
    /// Confidence score, set only for AI-generated annotations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Whether this annotation came from the segmentation service.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_auto_generated: bool,
}

fn default_true() -> bool {
    true
}

impl Annotation {
    /// Create a new user-drawn annotation.
    pub fn new(image_id: impl Into<ImageId>, label_id: impl Into<LabelId>, shape: Shape) -> Self {
        let now = now_millis();
        Self {
            id: new_id(),
            image_id: image_id.into(),
            label_id: label_id.into(),
            shape,
            created_at: now,
            updated_at: now,
            is_visible: true,
            confidence: None,
            is_auto_generated: false,
        }
    }

    /// Create an AI-generated annotation carrying its confidence score.
    pub fn auto_generated(
        image_id: impl Into<ImageId>,
        label_id: impl Into<LabelId>,
        shape: Shape,
        confidence: f32,
    ) -> Self {
        Self {
            confidence: Some(confidence),
            is_auto_generated: true,
            ..Self::new(image_id, label_id, shape)
        }
    }

    /// Replace the shape and bump `updated_at`.
    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
        self.touch();
    }

    /// Bump `updated_at` to now.
    pub fn touch(&mut self) {
        self.updated_at = now_millis();
    }
}
