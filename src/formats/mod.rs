//! Dataset import/export for common annotation interchange formats.
//!
//! - **COCO**: single `instances.json` for the whole dataset
//! - **YOLO**: one `.txt` per image plus `classes.txt`, detection or
//!   segmentation variant
//!
//! All formats implement the [`DatasetFormat`] trait: export takes every
//! image at once and produces the format's output files as strings, import
//! takes the format's files and produces per-image annotations. File IO is
//! the caller's concern; this module only converts between strings and
//! entities.
//!
//! Labels carry string ids internally while these formats use small
//! integers, so every export derives a stable integer per label from its
//! position in the label list, and every import mints fresh labels for the
//! class names it finds.

mod coco;
mod common;
mod error;
mod yolo;

pub use coco::CocoFormat;
pub use common::{
    ImageInfo, bbox_to_yolo, denormalize_point, denormalize_polygon, denormalize_shape,
    flat_coords_to_polygon, normalize_point, normalize_polygon, polygon_to_flat_coords,
    yolo_to_bbox,
};
pub use error::FormatError;
pub use yolo::{YoloFormat, YoloVariant};

use std::collections::HashMap;

use crate::model::{Annotation, Label, LabelId, Shape};

/// Result of exporting a dataset.
#[derive(Debug, Clone, Default)]
pub struct ExportResult {
    /// Filename → file content.
    pub files: HashMap<String, String>,
    /// Non-fatal issues: skipped shapes, excluded orphans, conversions.
    pub warnings: Vec<String>,
}

impl ExportResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.files.insert(name.into(), content.into());
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// One annotation parsed from an interchange file, referencing a label
/// minted during the same import. The caller attaches it to an image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedAnnotation {
    pub label_id: LabelId,
    pub shape: Shape,
}

/// Result of importing a dataset.
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    /// Labels minted for the class names found in the input.
    pub labels: Vec<Label>,
    /// Per-image annotations, keyed by image filename (COCO) or label-file
    /// base name (YOLO, which does not know the image extension).
    pub annotations: HashMap<String, Vec<ImportedAnnotation>>,
    /// Non-fatal issues: malformed lines, unknown references.
    pub warnings: Vec<String>,
}

impl ImportResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a label unless one with the same id is already present.
    pub fn add_label(&mut self, label: Label) {
        if !self.labels.iter().any(|l| l.id == label.id) {
            self.labels.push(label);
        }
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn total_annotations(&self) -> usize {
        self.annotations.values().map(|v| v.len()).sum()
    }
}

/// A format that can import and export whole datasets.
pub trait DatasetFormat {
    /// Human-readable name ("COCO", "YOLO", ...).
    fn name(&self) -> &'static str;

    /// File extensions the format reads and writes.
    fn extensions(&self) -> &[&'static str];

    /// Whether this format can represent the given shape.
    fn supports_shape(&self, shape: &Shape) -> bool;

    /// Export annotations for multiple images.
    ///
    /// `labels` is the dataset's label list; its order fixes the integer
    /// class mapping. Annotations referencing a label not in the list are
    /// orphans and are excluded with a warning.
    fn export_dataset(
        &self,
        labels: &[Label],
        images: &[(ImageInfo, Vec<Annotation>)],
    ) -> Result<ExportResult, FormatError>;

    /// Import annotations from format files (filename → content).
    fn import_dataset(&self, files: &HashMap<String, String>)
    -> Result<ImportResult, FormatError>;
}

/// Position of each label id in the export's label list.
pub(crate) fn label_positions(labels: &[Label]) -> HashMap<&str, usize> {
    labels
        .iter()
        .enumerate()
        .map(|(idx, l)| (l.id.as_str(), idx))
        .collect()
}

/// All available format names.
pub fn available_formats() -> Vec<&'static str> {
    vec!["COCO", "YOLO", "YOLO Segmentation"]
}

/// Look up a format by name, case-insensitively.
pub fn format_by_name(name: &str) -> Option<Box<dyn DatasetFormat>> {
    match name.to_lowercase().as_str() {
        "coco" => Some(Box::new(CocoFormat::new())),
        "yolo" => Some(Box::new(YoloFormat::detection())),
        "yolo segmentation" | "yolo-seg" => Some(Box::new(YoloFormat::segmentation())),
        _ => None,
    }
}
