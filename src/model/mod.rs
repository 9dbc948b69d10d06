//! Entity model: annotations, labels, label groups and images.

mod annotation;
mod image;
mod label;

pub use annotation::{Annotation, AnnotationId, Shape};
pub use image::{ImageId, ImageRecord};
pub use label::{Label, LabelDeletionPolicy, LabelGroup, LabelGroupId, LabelId, default_label_color};

use web_time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, wasm-portable.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a fresh entity id.
pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
