//! Shared helpers for dataset format conversions.

use crate::geometry::Point;
use crate::model::Shape;

/// Metadata about one image in a dataset export.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    /// Filename of the image (e.g. "image001.jpg").
    pub file_name: String,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl ImageInfo {
    pub fn new(file_name: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            file_name: file_name.into(),
            width,
            height,
        }
    }

    /// Base name without the extension.
    pub fn base_name(&self) -> &str {
        self.file_name
            .rsplit_once('.')
            .map(|(base, _)| base)
            .unwrap_or(&self.file_name)
    }
}

// ============================================================================
// Coordinate Conversion Utilities
// ============================================================================

/// Absolute pixel coordinates to normalized [0, 1].
pub fn normalize_point(p: Point, width: u32, height: u32) -> (f32, f32) {
    (p.x / width as f32, p.y / height as f32)
}

/// Normalized [0, 1] coordinates to absolute pixels, clamped non-negative.
pub fn denormalize_point(x: f32, y: f32, width: u32, height: u32) -> Point {
    Point::new((x * width as f32).max(0.0), (y * height as f32).max(0.0))
}

/// Top-left bbox to normalized YOLO center format.
pub fn bbox_to_yolo(
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    img_width: u32,
    img_height: u32,
) -> (f32, f32, f32, f32) {
    let x_center = (x + width / 2.0) / img_width as f32;
    let y_center = (y + height / 2.0) / img_height as f32;
    (
        x_center,
        y_center,
        width / img_width as f32,
        height / img_height as f32,
    )
}

/// Normalized YOLO center format to a top-left pixel bbox.
///
/// The top-left corner is clamped to 0 for boxes whose center minus
/// half-extent would land outside the image.
pub fn yolo_to_bbox(
    x_center: f32,
    y_center: f32,
    w: f32,
    h: f32,
    img_width: u32,
    img_height: u32,
) -> (f32, f32, f32, f32) {
    let width = w * img_width as f32;
    let height = h * img_height as f32;
    let x = (x_center * img_width as f32 - width / 2.0).max(0.0);
    let y = (y_center * img_height as f32 - height / 2.0).max(0.0);
    (x, y, width, height)
}

/// Polygon vertices to normalized coordinate pairs.
pub fn normalize_polygon(points: &[Point], width: u32, height: u32) -> Vec<(f32, f32)> {
    points
        .iter()
        .map(|&p| normalize_point(p, width, height))
        .collect()
}

/// Normalized coordinate pairs to polygon vertices.
pub fn denormalize_polygon(coords: &[(f32, f32)], width: u32, height: u32) -> Vec<Point> {
    coords
        .iter()
        .map(|&(x, y)| denormalize_point(x, y, width, height))
        .collect()
}

/// Polygon vertices to a flat `[x1, y1, x2, y2, ...]` list.
pub fn polygon_to_flat_coords(points: &[Point]) -> Vec<f32> {
    points.iter().flat_map(|p| [p.x, p.y]).collect()
}

/// Flat coordinate list back to polygon vertices, clamped non-negative.
/// `None` for fewer than 3 points or an odd count.
pub fn flat_coords_to_polygon(coords: &[f32]) -> Option<Vec<Point>> {
    if coords.len() < 6 || coords.len() % 2 != 0 {
        return None;
    }
    Some(
        coords
            .chunks(2)
            .map(|c| Point::new(c[0].max(0.0), c[1].max(0.0)))
            .collect(),
    )
}

/// Scale a shape expressed in normalized [0, 1] coordinates to pixels.
///
/// YOLO files carry no image dimensions, so import leaves coordinates
/// normalized; callers apply this once they know the image size.
pub fn denormalize_shape(shape: &Shape, width: u32, height: u32) -> Shape {
    match shape {
        Shape::Rectangle {
            x,
            y,
            width: w,
            height: h,
        } => Shape::Rectangle {
            x: x * width as f32,
            y: y * height as f32,
            width: w * width as f32,
            height: h * height as f32,
        },
        Shape::Polygon { points } => Shape::Polygon {
            points: points
                .iter()
                .map(|p| Point::new(p.x * width as f32, p.y * height as f32))
                .collect(),
        },
        Shape::Point { x, y } => Shape::Point {
            x: x * width as f32,
            y: y * height as f32,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_denormalize_point() {
        let p = Point::new(100.0, 200.0);
        let (nx, ny) = normalize_point(p, 400, 400);
        assert!((nx - 0.25).abs() < 0.001);
        assert!((ny - 0.5).abs() < 0.001);

        let restored = denormalize_point(nx, ny, 400, 400);
        assert!((restored.x - p.x).abs() < 0.001);
        assert!((restored.y - p.y).abs() < 0.001);
    }

    #[test]
    fn test_bbox_to_yolo() {
        let (x_center, y_center, w, h) = bbox_to_yolo(100.0, 100.0, 200.0, 100.0, 640, 480);
        // Center (200, 150) -> (0.3125, 0.3125)
        assert!((x_center - 0.3125).abs() < 0.001);
        assert!((y_center - 0.3125).abs() < 0.001);
        assert!((w - 0.3125).abs() < 0.001);
        assert!((h - 0.2083).abs() < 0.01);
    }

    #[test]
    fn test_yolo_to_bbox() {
        let (x, y, w, h) = yolo_to_bbox(0.5, 0.5, 0.25, 0.25, 640, 480);
        assert!((x - 240.0).abs() < 1.0);
        assert!((y - 180.0).abs() < 1.0);
        assert!((w - 160.0).abs() < 1.0);
        assert!((h - 120.0).abs() < 1.0);
    }

    #[test]
    fn test_yolo_bbox_clamps_at_edges() {
        // Box centered near the origin would go negative
        let (x, y, ..) = yolo_to_bbox(0.01, 0.01, 0.2, 0.2, 640, 480);
        assert_eq!(x, 0.0);
        assert_eq!(y, 0.0);
    }

    #[test]
    fn test_image_info_base_name() {
        assert_eq!(ImageInfo::new("image001.jpg", 640, 480).base_name(), "image001");
        assert_eq!(ImageInfo::new("complex.name.png", 1, 1).base_name(), "complex.name");
        assert_eq!(ImageInfo::new("noext", 1, 1).base_name(), "noext");
    }

    #[test]
    fn test_polygon_flat_coords() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(100.0, 0.0),
            Point::new(100.0, 100.0),
        ];
        let flat = polygon_to_flat_coords(&points);
        assert_eq!(flat, vec![0.0, 0.0, 100.0, 0.0, 100.0, 100.0]);

        let restored = flat_coords_to_polygon(&flat).unwrap();
        assert_eq!(restored, points);

        // Odd or too-short coordinate lists are rejected
        assert!(flat_coords_to_polygon(&[0.0, 0.0, 1.0]).is_none());
        assert!(flat_coords_to_polygon(&[0.0, 0.0, 1.0, 1.0]).is_none());
    }

    #[test]
    fn test_denormalize_shape() {
        let rect = Shape::Rectangle {
            x: 0.25,
            y: 0.5,
            width: 0.5,
            height: 0.25,
        };
        let px = denormalize_shape(&rect, 400, 200);
        assert_eq!(
            px,
            Shape::Rectangle {
                x: 100.0,
                y: 100.0,
                width: 200.0,
                height: 50.0
            }
        );
    }
}
