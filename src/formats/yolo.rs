//! YOLO format support.
//!
//! One `.txt` per image plus a `classes.txt` with one class name per line.
//!
//! Detection lines:
//! ```text
//! <class_id> <x_center> <y_center> <width> <height>
//! ```
//!
//! Segmentation lines:
//! ```text
//! <class_id> <x1> <y1> <x2> <y2> ... <xn> <yn>
//! ```
//!
//! All coordinates are normalized to [0, 1] relative to the image size.
//! Label files carry no dimensions, so import yields normalized shapes;
//! apply [`super::denormalize_shape`] once the image size is known.

use std::collections::HashMap;

use super::common::{ImageInfo, bbox_to_yolo, normalize_polygon};
use super::{
    DatasetFormat, ExportResult, FormatError, ImportResult, ImportedAnnotation, label_positions,
};
use crate::geometry::Point;
use crate::model::{Annotation, Label, Shape, default_label_color};

/// YOLO format variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YoloVariant {
    /// Bounding boxes only; polygons are converted with a warning.
    Detection,
    /// Polygons written as-is, rectangles as boxes.
    Segmentation,
}

/// YOLO format implementation.
#[derive(Debug, Clone)]
pub struct YoloFormat {
    variant: YoloVariant,
}

impl YoloFormat {
    pub fn detection() -> Self {
        Self {
            variant: YoloVariant::Detection,
        }
    }

    pub fn segmentation() -> Self {
        Self {
            variant: YoloVariant::Segmentation,
        }
    }

    pub fn variant(&self) -> YoloVariant {
        self.variant
    }
}

impl DatasetFormat for YoloFormat {
    fn name(&self) -> &'static str {
        match self.variant {
            YoloVariant::Detection => "YOLO",
            YoloVariant::Segmentation => "YOLO Segmentation",
        }
    }

    fn extensions(&self) -> &[&'static str] {
        &["txt"]
    }

    fn supports_shape(&self, shape: &Shape) -> bool {
        match (self.variant, shape) {
            (_, Shape::Rectangle { .. }) => true,
            (YoloVariant::Segmentation, Shape::Polygon { .. }) => true,
            (YoloVariant::Detection, Shape::Polygon { .. }) => false,
            (_, Shape::Point { .. }) => false,
        }
    }

    fn export_dataset(
        &self,
        labels: &[Label],
        images: &[(ImageInfo, Vec<Annotation>)],
    ) -> Result<ExportResult, FormatError> {
        let mut result = ExportResult::new();
        let positions = label_positions(labels);

        // classes.txt line index doubles as the class id
        let classes: Vec<&str> = labels.iter().map(|l| l.name.as_str()).collect();
        result.add_file("classes.txt", classes.join("\n"));

        for (info, annotations) in images {
            let mut lines: Vec<String> = Vec::new();

            for ann in annotations {
                let Some(&class_idx) = positions.get(ann.label_id.as_str()) else {
                    result.add_warning(format!(
                        "Excluded orphaned annotation {} (label {} not found)",
                        ann.id, ann.label_id
                    ));
                    continue;
                };

                match &ann.shape {
                    Shape::Rectangle {
                        x,
                        y,
                        width,
                        height,
                    } => {
                        let (cx, cy, w, h) =
                            bbox_to_yolo(*x, *y, *width, *height, info.width, info.height);
                        lines.push(format!("{class_idx} {cx:.6} {cy:.6} {w:.6} {h:.6}"));
                    }
                    Shape::Polygon { points } => {
                        if self.variant == YoloVariant::Segmentation {
                            let coords = normalize_polygon(points, info.width, info.height);
                            let coord_str: String = coords
                                .iter()
                                .map(|(x, y)| format!("{x:.6} {y:.6}"))
                                .collect::<Vec<_>>()
                                .join(" ");
                            lines.push(format!("{class_idx} {coord_str}"));
                        } else {
                            let (bx, by, bw, bh) = ann.shape.bounds();
                            let (cx, cy, w, h) =
                                bbox_to_yolo(bx, by, bw, bh, info.width, info.height);
                            lines.push(format!("{class_idx} {cx:.6} {cy:.6} {w:.6} {h:.6}"));
                            result.add_warning(format!(
                                "Converted polygon annotation {} to bounding box",
                                ann.id
                            ));
                        }
                    }
                    Shape::Point { .. } => {
                        result.add_warning(format!(
                            "Skipped point annotation {} (YOLO doesn't support points)",
                            ann.id
                        ));
                    }
                }
            }

            result.add_file(format!("{}.txt", info.base_name()), lines.join("\n"));
        }

        Ok(result)
    }

    fn import_dataset(
        &self,
        files: &HashMap<String, String>,
    ) -> Result<ImportResult, FormatError> {
        let mut result = ImportResult::new();

        let classes: Vec<String> = files
            .get("classes.txt")
            .map(|content| {
                content
                    .lines()
                    .map(|line| line.trim().to_string())
                    .filter(|line| !line.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        // Class index -> minted label id; classes.txt seeds the map, class
        // ids only seen in label files get placeholder names
        let mut label_by_class: HashMap<usize, String> = HashMap::new();
        for (idx, name) in classes.iter().enumerate() {
            let label = Label::new(name, default_label_color(idx));
            label_by_class.insert(idx, label.id.clone());
            result.add_label(label);
        }

        for (filename, content) in files {
            if filename == "classes.txt" || !filename.ends_with(".txt") {
                continue;
            }
            let base_name = filename.trim_end_matches(".txt");
            let mut annotations: Vec<ImportedAnnotation> = Vec::new();

            for (line_num, line) in content.lines().enumerate() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let parts: Vec<&str> = line.split_whitespace().collect();

                let Ok(class_idx) = parts[0].parse::<usize>() else {
                    result.add_warning(format!(
                        "{}:{}: invalid class id '{}'",
                        filename,
                        line_num + 1,
                        parts[0]
                    ));
                    continue;
                };

                let label_id = match label_by_class.get(&class_idx) {
                    Some(id) => id.clone(),
                    None => {
                        let label = Label::new(
                            format!("class_{class_idx}"),
                            default_label_color(label_by_class.len()),
                        );
                        let id = label.id.clone();
                        label_by_class.insert(class_idx, id.clone());
                        result.add_label(label);
                        id
                    }
                };

                let coords: Vec<f32> = parts[1..].iter().filter_map(|s| s.parse().ok()).collect();
                let shape = if coords.len() == 4 {
                    // Center format -> top-left, still normalized
                    Some(Shape::Rectangle {
                        x: (coords[0] - coords[2] / 2.0).max(0.0),
                        y: (coords[1] - coords[3] / 2.0).max(0.0),
                        width: coords[2],
                        height: coords[3],
                    })
                } else if coords.len() >= 6 && coords.len() % 2 == 0 {
                    Some(Shape::Polygon {
                        points: coords.chunks(2).map(|c| Point::new(c[0], c[1])).collect(),
                    })
                } else {
                    result.add_warning(format!(
                        "{}:{}: invalid coordinate count ({})",
                        filename,
                        line_num + 1,
                        coords.len()
                    ));
                    None
                };

                if let Some(shape) = shape {
                    annotations.push(ImportedAnnotation { label_id, shape });
                }
            }

            result.annotations.insert(base_name.to_string(), annotations);
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_labels() -> Vec<Label> {
        vec![Label::new("car", "#ff0000"), Label::new("person", "#00ff00")]
    }

    fn rect(label_id: &str, x: f32, y: f32, w: f32, h: f32) -> Annotation {
        Annotation::new(
            "img-1",
            label_id,
            Shape::Rectangle {
                x,
                y,
                width: w,
                height: h,
            },
        )
    }

    fn triangle(label_id: &str) -> Annotation {
        Annotation::new(
            "img-1",
            label_id,
            Shape::Polygon {
                points: vec![
                    Point::new(100.0, 100.0),
                    Point::new(200.0, 100.0),
                    Point::new(150.0, 200.0),
                ],
            },
        )
    }

    #[test]
    fn test_yolo_detection_export() {
        let format = YoloFormat::detection();
        let labels = test_labels();
        let annotations = vec![
            rect(&labels[0].id, 100.0, 100.0, 200.0, 100.0),
            rect(&labels[1].id, 300.0, 200.0, 50.0, 100.0),
        ];
        let info = ImageInfo::new("test.jpg", 640, 480);

        let result = format.export_dataset(&labels, &[(info, annotations)]).unwrap();

        assert_eq!(result.files["classes.txt"], "car\nperson");
        let lines: Vec<&str> = result.files["test.txt"].lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("0 "));
        assert!(lines[1].starts_with("1 "));
    }

    #[test]
    fn test_yolo_segmentation_export() {
        let format = YoloFormat::segmentation();
        let labels = test_labels();
        let info = ImageInfo::new("test.jpg", 640, 480);

        let result = format
            .export_dataset(&labels, &[(info, vec![triangle(&labels[0].id)])])
            .unwrap();

        let parts: Vec<&str> = result.files["test.txt"].split_whitespace().collect();
        assert_eq!(parts.len(), 7); // class id + 3 x,y pairs
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_yolo_detection_converts_polygon() {
        let format = YoloFormat::detection();
        let labels = test_labels();
        let info = ImageInfo::new("test.jpg", 640, 480);

        let result = format
            .export_dataset(&labels, &[(info, vec![triangle(&labels[0].id)])])
            .unwrap();

        assert!(result.warnings.iter().any(|w| w.contains("Converted")));
        let parts: Vec<&str> = result.files["test.txt"].split_whitespace().collect();
        assert_eq!(parts.len(), 5); // class id + 4 bbox values
    }

    #[test]
    fn test_yolo_export_excludes_orphans() {
        let format = YoloFormat::detection();
        let labels = test_labels();
        let info = ImageInfo::new("test.jpg", 640, 480);

        let result = format
            .export_dataset(&labels, &[(info, vec![rect("gone", 0.0, 0.0, 10.0, 10.0)])])
            .unwrap();
        assert!(result.files["test.txt"].is_empty());
        assert!(result.warnings.iter().any(|w| w.contains("orphan")));
    }

    #[test]
    fn test_yolo_import() {
        let format = YoloFormat::detection();
        let mut files = HashMap::new();
        files.insert("classes.txt".to_string(), "car\nperson".to_string());
        files.insert(
            "image1.txt".to_string(),
            "0 0.5 0.5 0.25 0.25\n1 0.75 0.75 0.1 0.2".to_string(),
        );

        let result = format.import_dataset(&files).unwrap();
        assert_eq!(result.labels.len(), 2);

        let anns = &result.annotations["image1"];
        assert_eq!(anns.len(), 2);
        // Coordinates stay normalized until the caller knows the image size
        assert_eq!(
            anns[0].shape,
            Shape::Rectangle {
                x: 0.375,
                y: 0.375,
                width: 0.25,
                height: 0.25
            }
        );
    }

    #[test]
    fn test_yolo_import_without_classes() {
        let format = YoloFormat::detection();
        let mut files = HashMap::new();
        files.insert(
            "image1.txt".to_string(),
            "0 0.5 0.5 0.25 0.25\n1 0.75 0.75 0.1 0.2".to_string(),
        );

        let result = format.import_dataset(&files).unwrap();
        assert_eq!(result.labels.len(), 2);
        assert!(result.labels.iter().any(|l| l.name == "class_0"));
        assert!(result.labels.iter().any(|l| l.name == "class_1"));
    }

    #[test]
    fn test_yolo_import_bad_lines_warn() {
        let format = YoloFormat::detection();
        let mut files = HashMap::new();
        files.insert(
            "image1.txt".to_string(),
            "x 0.5 0.5 0.25 0.25\n0 0.5 0.5 0.25".to_string(),
        );

        let result = format.import_dataset(&files).unwrap();
        assert_eq!(result.warnings.len(), 2);
        assert!(result.annotations["image1"].is_empty());
    }

    #[test]
    fn test_supports_shape() {
        let detection = YoloFormat::detection();
        let segmentation = YoloFormat::segmentation();
        let rect = Shape::Rectangle {
            x: 0.0,
            y: 0.0,
            width: 10.0,
            height: 10.0,
        };
        let poly = Shape::Polygon { points: Vec::new() };

        assert!(detection.supports_shape(&rect));
        assert!(segmentation.supports_shape(&rect));
        assert!(!detection.supports_shape(&poly));
        assert!(segmentation.supports_shape(&poly));
        assert!(!detection.supports_shape(&Shape::Point { x: 0.0, y: 0.0 }));
    }
}
