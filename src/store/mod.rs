//! Persistence contract.
//!
//! The core never talks to a storage engine directly; it goes through the
//! [`Storage`] trait, a key-value CRUD contract per entity type. The host
//! supplies the real backend (IndexedDB in the browser, files on native);
//! [`MemoryStore`] is the reference implementation and the test double.
//!
//! Batch operations (`put_annotations`, `remove_annotations`) must apply as
//! a single transaction so bulk edits and AI batch results never leave the
//! persisted view half-written.

mod memory;

pub use memory::MemoryStore;

use thiserror::Error;

use crate::model::{Annotation, ImageRecord, Label, LabelGroup};

/// Errors from the persistence backend.
///
/// These bubble to the UI boundary; the in-memory state is never advanced
/// past a failed write.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The requested record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity type name ("image", "annotation", "label", "label group")
        entity: &'static str,
        /// The missing record's id
        id: String,
    },

    /// Backend-specific failure (quota, corruption, transaction abort).
    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Key-value CRUD per entity type, plus the secondary lookup of
/// annotations by owning image.
///
/// `put_*` methods are upserts. `get_all`-style methods return records in a
/// stable, deterministic order (insertion order for [`MemoryStore`]).
pub trait Storage {
    // Images
    fn images(&self) -> Result<Vec<ImageRecord>, StorageError>;
    fn image(&self, id: &str) -> Result<Option<ImageRecord>, StorageError>;
    fn put_image(&mut self, image: ImageRecord) -> Result<(), StorageError>;
    fn remove_image(&mut self, id: &str) -> Result<(), StorageError>;

    // Annotations
    fn annotations(&self) -> Result<Vec<Annotation>, StorageError>;
    fn annotations_for_image(&self, image_id: &str) -> Result<Vec<Annotation>, StorageError>;
    fn annotation(&self, id: &str) -> Result<Option<Annotation>, StorageError>;
    fn put_annotation(&mut self, annotation: Annotation) -> Result<(), StorageError>;
    /// Transactional batch upsert.
    fn put_annotations(&mut self, annotations: Vec<Annotation>) -> Result<(), StorageError>;
    fn remove_annotation(&mut self, id: &str) -> Result<(), StorageError>;
    /// Transactional batch delete. Ids not present are ignored.
    fn remove_annotations(&mut self, ids: &[String]) -> Result<(), StorageError>;

    // Labels
    fn labels(&self) -> Result<Vec<Label>, StorageError>;
    fn label(&self, id: &str) -> Result<Option<Label>, StorageError>;
    fn put_label(&mut self, label: Label) -> Result<(), StorageError>;
    fn remove_label(&mut self, id: &str) -> Result<(), StorageError>;

    // Label groups
    fn label_groups(&self) -> Result<Vec<LabelGroup>, StorageError>;
    fn put_label_group(&mut self, group: LabelGroup) -> Result<(), StorageError>;
    fn remove_label_group(&mut self, id: &str) -> Result<(), StorageError>;

    /// Drop every record of every entity type.
    fn clear(&mut self) -> Result<(), StorageError>;
}
