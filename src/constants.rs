//! Global constants for the annotation core.

/// Minimum width/height (in image pixels) for a rectangle to be accepted.
pub const MIN_RECT_SIZE: f32 = 5.0;

/// Minimum number of vertices required for a valid polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

/// Distance threshold (in image pixels) for closing a polygon by clicking
/// near its first vertex.
pub const SNAP_DISTANCE: f32 = 10.0;

/// Lower bound for the user-controlled zoom level.
pub const MIN_ZOOM: f32 = 0.1;

/// Upper bound for the user-controlled zoom level.
pub const MAX_ZOOM: f32 = 5.0;

/// Increment for discrete zoom steps (toolbar +/- buttons).
pub const ZOOM_STEP: f32 = 0.1;

/// Multiplicative zoom factor applied per wheel tick.
pub const WHEEL_ZOOM_FACTOR: f32 = 1.1;

/// Maximum number of snapshots kept on the undo stack per image.
pub const MAX_HISTORY_SIZE: usize = 50;

/// Hit radius (in image pixels) for selecting point annotations.
pub const POINT_HIT_RADIUS: f32 = 10.0;

/// Default detection confidence threshold for segmentation requests.
pub const DEFAULT_DETECTION_THRESHOLD: f32 = 0.5;

/// Default mask generation threshold for segmentation requests.
pub const DEFAULT_MASK_THRESHOLD: f32 = 0.5;
