//! Image records.

use serde::{Deserialize, Serialize};

use crate::model::{new_id, now_millis};

/// Unique identifier for an image.
pub type ImageId = String;

/// An uploaded image and its metadata.
///
/// Immutable once created apart from display metadata. Deleting an image
/// cascades to delete all of its annotations (handled by the workspace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub id: ImageId,
    /// Original file name, e.g. `photo_001.jpg`.
    pub name: String,
    /// Name shown in lists; defaults to `name`.
    pub display_name: String,
    /// Path relative to the upload root, set for folder uploads.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relative_path: Option<String>,
    /// Pixel width of the decoded image.
    pub width: u32,
    /// Pixel height of the decoded image.
    pub height: u32,
    /// Raw encoded bytes as uploaded.
    #[serde(with = "serde_bytes_vec")]
    pub blob: Vec<u8>,
    pub created_at: u64,
}

// Blobs are large; serialize as a plain byte array rather than a JSON list
// of numbers when the format supports it.
mod serde_bytes_vec {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(bytes)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        Vec::<u8>::deserialize(d)
    }
}

impl ImageRecord {
    /// Build a record from uploaded bytes, decoding the pixel dimensions.
    ///
    /// Fails when the bytes are not a decodable image.
    pub fn from_bytes(name: impl Into<String>, blob: Vec<u8>) -> Result<Self, image::ImageError> {
        let (width, height) = image::load_from_memory(&blob)
            .map(|img| (img.width(), img.height()))?;
        let name = name.into();
        Ok(Self {
            id: new_id(),
            display_name: name.clone(),
            name,
            relative_path: None,
            width,
            height,
            blob,
            created_at: now_millis(),
        })
    }

    /// Build a record with known dimensions, skipping the decode.
    ///
    /// Used when the host already decoded the image (e.g. via the browser).
    pub fn with_dimensions(
        name: impl Into<String>,
        width: u32,
        height: u32,
        blob: Vec<u8>,
    ) -> Self {
        let name = name.into();
        Self {
            id: new_id(),
            display_name: name.clone(),
            name,
            relative_path: None,
            width,
            height,
            blob,
            created_at: now_millis(),
        }
    }

    pub fn with_relative_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = Some(path.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}
