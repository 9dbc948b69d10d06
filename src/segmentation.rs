//! External segmentation service contract.
//!
//! The service is a black box that turns an image plus a prompt (free text
//! or bounding boxes) into detected objects with boxes, scores and mask
//! polygons. The host owns the transport: it performs the request and
//! hands the parsed [`SegmentationResult`] to the workspace for ingestion.
//! Wire shapes mirror the service API, so the host can deserialize a
//! response body straight into these types.

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_DETECTION_THRESHOLD, DEFAULT_MASK_THRESHOLD};
use crate::geometry::Point;
use crate::model::{Annotation, Shape};

/// A rectangle drawn to tell the service where to look, distinct from a
/// persisted annotation. Corner coordinates in image pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    /// 1 = positive (include this region), 0 = negative (exclude).
    #[serde(default = "default_positive")]
    pub label: u8,
}

fn default_positive() -> u8 {
    1
}

impl PromptBox {
    /// An include-this-region prompt.
    pub fn positive(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            label: 1,
        }
    }

    /// An exclude-this-region prompt.
    pub fn negative(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            x1,
            y1,
            x2,
            y2,
            label: 0,
        }
    }

    pub fn is_positive(&self) -> bool {
        self.label != 0
    }
}

/// What the service should look for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SegmentationPrompt {
    /// Free-text description of the objects to segment.
    Text(String),
    /// Regions of interest drawn on the canvas.
    Boxes(Vec<PromptBox>),
}

/// A request the host sends to the segmentation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationRequest {
    /// The image to run inference on.
    pub image_id: String,
    pub prompt: SegmentationPrompt,
    /// Detection confidence threshold.
    pub threshold: f32,
    /// Mask generation threshold.
    pub mask_threshold: f32,
}

impl SegmentationRequest {
    pub fn text(image_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            prompt: SegmentationPrompt::Text(prompt.into()),
            threshold: DEFAULT_DETECTION_THRESHOLD,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
        }
    }

    pub fn boxes(image_id: impl Into<String>, boxes: Vec<PromptBox>) -> Self {
        Self {
            image_id: image_id.into(),
            prompt: SegmentationPrompt::Boxes(boxes),
            threshold: DEFAULT_DETECTION_THRESHOLD,
            mask_threshold: DEFAULT_MASK_THRESHOLD,
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Polygon representation of one detected object's mask.
///
/// Each inner ring is a list of `[x, y]` pairs; multiple rings represent
/// disconnected regions of the same mask.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskPolygon {
    pub polygons: Vec<Vec<(f32, f32)>>,
    /// Total pixel area of the mask.
    pub area: f32,
}

/// Inference result for a single image, as returned by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    pub num_objects: usize,
    /// Bounding boxes `[x1, y1, x2, y2]`, one per object.
    pub boxes: Vec<[f32; 4]>,
    /// Confidence scores, parallel to `boxes`.
    pub scores: Vec<f32>,
    /// Mask polygons, parallel to `boxes`. Empty for box-only calls.
    #[serde(default)]
    pub masks: Vec<MaskPolygon>,
}

impl SegmentationResult {
    /// Iterate detections as `(box, score, mask)` triples.
    pub fn objects(&self) -> impl Iterator<Item = ([f32; 4], f32, Option<&MaskPolygon>)> {
        self.boxes
            .iter()
            .zip(&self.scores)
            .enumerate()
            .map(|(i, (bbox, score))| (*bbox, *score, self.masks.get(i)))
    }
}

/// Synthesize annotations from a service result.
///
/// Mask rings with at least 3 points become polygon annotations (one per
/// ring, covering disconnected regions); objects without a usable mask
/// fall back to a rectangle from their bounding box. Degenerate boxes are
/// skipped. Every produced annotation carries the detection's confidence
/// and `is_auto_generated`.
pub fn annotations_from_result(
    image_id: &str,
    label_id: &str,
    result: &SegmentationResult,
) -> Vec<Annotation> {
    let mut annotations = Vec::new();
    for (bbox, score, mask) in result.objects() {
        let rings: Vec<Vec<Point>> = mask
            .map(|m| {
                m.polygons
                    .iter()
                    .map(|ring| ring.iter().map(|&(x, y)| Point::new(x, y)).collect())
                    .filter(|ring: &Vec<Point>| ring.len() >= 3)
                    .collect()
            })
            .unwrap_or_default();

        if rings.is_empty() {
            let [x1, y1, x2, y2] = bbox;
            let width = x2 - x1;
            let height = y2 - y1;
            if width <= 0.0 || height <= 0.0 {
                log::warn!("segmentation: skipped degenerate box {bbox:?}");
                continue;
            }
            annotations.push(Annotation::auto_generated(
                image_id,
                label_id,
                Shape::Rectangle {
                    x: x1,
                    y: y1,
                    width,
                    height,
                },
                score,
            ));
        } else {
            for ring in rings {
                annotations.push(Annotation::auto_generated(
                    image_id,
                    label_id,
                    Shape::Polygon { points: ring },
                    score,
                ));
            }
        }
    }
    annotations
}
