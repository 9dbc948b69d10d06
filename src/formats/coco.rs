//! COCO (Common Objects in Context) format support.
//!
//! Single `instances.json` for the whole dataset:
//!
//! ```json
//! {
//!   "info": { "description": "Dataset", "version": "1.0" },
//!   "licenses": [],
//!   "images": [
//!     { "id": 1, "file_name": "image1.jpg", "width": 640, "height": 480 }
//!   ],
//!   "annotations": [
//!     {
//!       "id": 1,
//!       "image_id": 1,
//!       "category_id": 1,
//!       "bbox": [x, y, width, height],
//!       "segmentation": [[x1,y1,x2,y2,...]],
//!       "area": 1234.5,
//!       "iscrowd": 0
//!     }
//!   ],
//!   "categories": [
//!     { "id": 1, "name": "person", "supercategory": "object" }
//!   ]
//! }
//! ```

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::common::{ImageInfo, flat_coords_to_polygon, polygon_to_flat_coords};
use super::{
    DatasetFormat, ExportResult, FormatError, ImportResult, ImportedAnnotation, label_positions,
};
use crate::model::{Annotation, Label, Shape, default_label_color};

/// COCO format implementation.
#[derive(Debug, Clone)]
pub struct CocoFormat {
    /// Description for the dataset info section.
    pub description: String,
    /// Version string for the dataset info section.
    pub version: String,
}

impl CocoFormat {
    pub fn new() -> Self {
        Self {
            description: "imagemark export".to_string(),
            version: "1.0".to_string(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

impl Default for CocoFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl DatasetFormat for CocoFormat {
    fn name(&self) -> &'static str {
        "COCO"
    }

    fn extensions(&self) -> &[&'static str] {
        &["json"]
    }

    fn supports_shape(&self, shape: &Shape) -> bool {
        match shape {
            Shape::Rectangle { .. } | Shape::Polygon { .. } => true,
            // COCO has no standalone point concept
            Shape::Point { .. } => false,
        }
    }

    fn export_dataset(
        &self,
        labels: &[Label],
        images: &[(ImageInfo, Vec<Annotation>)],
    ) -> Result<ExportResult, FormatError> {
        let mut result = ExportResult::new();
        let mut coco = CocoDataset::new(&self.description, &self.version);
        let positions = label_positions(labels);

        // Category ids are 1-based positions in the label list
        for (idx, label) in labels.iter().enumerate() {
            coco.categories.push(CocoCategory {
                id: (idx + 1) as i64,
                name: label.name.clone(),
                supercategory: "object".to_string(),
            });
        }

        let mut annotation_id: i64 = 1;
        for (idx, (info, annotations)) in images.iter().enumerate() {
            let image_id = (idx + 1) as i64;
            coco.images.push(CocoImage {
                id: image_id,
                file_name: info.file_name.clone(),
                width: info.width as i64,
                height: info.height as i64,
            });

            for ann in annotations {
                let Some(&position) = positions.get(ann.label_id.as_str()) else {
                    result.add_warning(format!(
                        "Excluded orphaned annotation {} (label {} not found)",
                        ann.id, ann.label_id
                    ));
                    continue;
                };
                let category_id = (position + 1) as i64;

                match &ann.shape {
                    Shape::Rectangle {
                        x,
                        y,
                        width,
                        height,
                    } => {
                        coco.annotations.push(CocoAnnotation {
                            id: annotation_id,
                            image_id,
                            category_id,
                            bbox: Some(vec![
                                *x as f64,
                                *y as f64,
                                *width as f64,
                                *height as f64,
                            ]),
                            segmentation: None,
                            area: (width * height) as f64,
                            iscrowd: 0,
                        });
                        annotation_id += 1;
                    }
                    Shape::Polygon { points } => {
                        let flat: Vec<f64> = polygon_to_flat_coords(points)
                            .iter()
                            .map(|&v| v as f64)
                            .collect();
                        let (bx, by, bw, bh) = ann.shape.bounds();
                        coco.annotations.push(CocoAnnotation {
                            id: annotation_id,
                            image_id,
                            category_id,
                            bbox: Some(vec![bx as f64, by as f64, bw as f64, bh as f64]),
                            segmentation: Some(vec![flat]),
                            // True polygon area, not the bbox area
                            area: ann.shape.area() as f64,
                            iscrowd: 0,
                        });
                        annotation_id += 1;
                    }
                    Shape::Point { .. } => {
                        result.add_warning(format!(
                            "Skipped point annotation {} (COCO doesn't support standalone points)",
                            ann.id
                        ));
                    }
                }
            }
        }

        let json = serde_json::to_string_pretty(&coco)?;
        result.add_file("instances.json", json);
        Ok(result)
    }

    fn import_dataset(
        &self,
        files: &HashMap<String, String>,
    ) -> Result<ImportResult, FormatError> {
        let mut result = ImportResult::new();

        let json_content = files
            .values()
            .find(|content| content.trim_start().starts_with('{'))
            .ok_or_else(|| FormatError::MissingInput("COCO JSON file".to_string()))?;
        let coco: CocoDataset = serde_json::from_str(json_content)?;

        // Mint a fresh label per category
        let mut label_by_category: HashMap<i64, String> = HashMap::new();
        for (idx, cat) in coco.categories.iter().enumerate() {
            let label = Label::new(&cat.name, default_label_color(idx));
            label_by_category.insert(cat.id, label.id.clone());
            result.add_label(label);
        }

        let image_names: HashMap<i64, String> = coco
            .images
            .iter()
            .map(|img| (img.id, img.file_name.clone()))
            .collect();

        for coco_ann in &coco.annotations {
            let Some(file_name) = image_names.get(&coco_ann.image_id) else {
                result.add_warning(format!(
                    "Skipped annotation {} (unknown image_id {})",
                    coco_ann.id, coco_ann.image_id
                ));
                continue;
            };
            let Some(label_id) = label_by_category.get(&coco_ann.category_id) else {
                result.add_warning(format!(
                    "Skipped annotation {} (unknown category_id {})",
                    coco_ann.id, coco_ann.category_id
                ));
                continue;
            };

            // Segmentation ring wins over the bbox when both are present
            let shape = coco_ann
                .segmentation
                .as_ref()
                .and_then(|segs| segs.first())
                .and_then(|seg| {
                    let coords: Vec<f32> = seg.iter().map(|&v| v as f32).collect();
                    flat_coords_to_polygon(&coords).map(|points| Shape::Polygon { points })
                })
                .or_else(|| {
                    coco_ann.bbox.as_ref().filter(|b| b.len() >= 4).map(|b| {
                        Shape::Rectangle {
                            x: (b[0] as f32).max(0.0),
                            y: (b[1] as f32).max(0.0),
                            width: (b[2] as f32).max(0.0),
                            height: (b[3] as f32).max(0.0),
                        }
                    })
                });

            match shape {
                Some(shape) => {
                    result
                        .annotations
                        .entry(file_name.clone())
                        .or_default()
                        .push(ImportedAnnotation {
                            label_id: label_id.clone(),
                            shape,
                        });
                }
                None => {
                    result.add_warning(format!(
                        "Skipped annotation {} (no bbox or segmentation)",
                        coco_ann.id
                    ));
                }
            }
        }

        Ok(result)
    }
}

// ============================================================================
// COCO JSON Structures
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CocoDataset {
    info: CocoInfo,
    #[serde(default)]
    licenses: Vec<CocoLicense>,
    images: Vec<CocoImage>,
    annotations: Vec<CocoAnnotation>,
    categories: Vec<CocoCategory>,
}

impl CocoDataset {
    fn new(description: &str, version: &str) -> Self {
        Self {
            info: CocoInfo {
                description: description.to_string(),
                version: version.to_string(),
                year: 2026,
            },
            licenses: Vec::new(),
            images: Vec::new(),
            annotations: Vec::new(),
            categories: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CocoInfo {
    #[serde(default)]
    description: String,
    #[serde(default)]
    version: String,
    #[serde(default)]
    year: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CocoLicense {
    id: i64,
    name: String,
    url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CocoImage {
    id: i64,
    file_name: String,
    width: i64,
    height: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CocoAnnotation {
    id: i64,
    image_id: i64,
    category_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    bbox: Option<Vec<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    segmentation: Option<Vec<Vec<f64>>>,
    area: f64,
    iscrowd: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CocoCategory {
    id: i64,
    name: String,
    #[serde(default = "default_supercategory")]
    supercategory: String,
}

fn default_supercategory() -> String {
    "object".to_string()
}
