//! In-memory reference implementation of the storage contract.

use crate::model::{Annotation, ImageRecord, Label, LabelGroup};
use crate::store::{Storage, StorageError};

/// Insertion-ordered in-memory store.
///
/// Backs tests and serves as the reference semantics for host-provided
/// backends. Upserts keep the original position of an existing record so
/// `get_all` ordering is stable across updates.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    images: Vec<ImageRecord>,
    annotations: Vec<Annotation>,
    labels: Vec<Label>,
    label_groups: Vec<LabelGroup>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn upsert_by_id<T>(records: &mut Vec<T>, record: T, id_of: impl Fn(&T) -> &str, id: &str) {
    match records.iter_mut().find(|r| id_of(r) == id) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

impl Storage for MemoryStore {
    fn images(&self) -> Result<Vec<ImageRecord>, StorageError> {
        Ok(self.images.clone())
    }

    fn image(&self, id: &str) -> Result<Option<ImageRecord>, StorageError> {
        Ok(self.images.iter().find(|i| i.id == id).cloned())
    }

    fn put_image(&mut self, image: ImageRecord) -> Result<(), StorageError> {
        let id = image.id.clone();
        upsert_by_id(&mut self.images, image, |i| &i.id, &id);
        Ok(())
    }

    fn remove_image(&mut self, id: &str) -> Result<(), StorageError> {
        let before = self.images.len();
        self.images.retain(|i| i.id != id);
        if self.images.len() == before {
            return Err(StorageError::not_found("image", id));
        }
        Ok(())
    }

    fn annotations(&self) -> Result<Vec<Annotation>, StorageError> {
        Ok(self.annotations.clone())
    }

    fn annotations_for_image(&self, image_id: &str) -> Result<Vec<Annotation>, StorageError> {
        Ok(self
            .annotations
            .iter()
            .filter(|a| a.image_id == image_id)
            .cloned()
            .collect())
    }

    fn annotation(&self, id: &str) -> Result<Option<Annotation>, StorageError> {
        Ok(self.annotations.iter().find(|a| a.id == id).cloned())
    }

    fn put_annotation(&mut self, annotation: Annotation) -> Result<(), StorageError> {
        let id = annotation.id.clone();
        upsert_by_id(&mut self.annotations, annotation, |a| &a.id, &id);
        Ok(())
    }

    fn put_annotations(&mut self, annotations: Vec<Annotation>) -> Result<(), StorageError> {
        // In memory the batch is trivially atomic
        for annotation in annotations {
            self.put_annotation(annotation)?;
        }
        Ok(())
    }

    fn remove_annotation(&mut self, id: &str) -> Result<(), StorageError> {
        let before = self.annotations.len();
        self.annotations.retain(|a| a.id != id);
        if self.annotations.len() == before {
            return Err(StorageError::not_found("annotation", id));
        }
        Ok(())
    }

    fn remove_annotations(&mut self, ids: &[String]) -> Result<(), StorageError> {
        self.annotations.retain(|a| !ids.contains(&a.id));
        Ok(())
    }

    fn labels(&self) -> Result<Vec<Label>, StorageError> {
        Ok(self.labels.clone())
    }

    fn label(&self, id: &str) -> Result<Option<Label>, StorageError> {
        Ok(self.labels.iter().find(|l| l.id == id).cloned())
    }

    fn put_label(&mut self, label: Label) -> Result<(), StorageError> {
        let id = label.id.clone();
        upsert_by_id(&mut self.labels, label, |l| &l.id, &id);
        Ok(())
    }

    fn remove_label(&mut self, id: &str) -> Result<(), StorageError> {
        let before = self.labels.len();
        self.labels.retain(|l| l.id != id);
        if self.labels.len() == before {
            return Err(StorageError::not_found("label", id));
        }
        Ok(())
    }

    fn label_groups(&self) -> Result<Vec<LabelGroup>, StorageError> {
        Ok(self.label_groups.clone())
    }

    fn put_label_group(&mut self, group: LabelGroup) -> Result<(), StorageError> {
        let id = group.id.clone();
        upsert_by_id(&mut self.label_groups, group, |g| &g.id, &id);
        Ok(())
    }

    fn remove_label_group(&mut self, id: &str) -> Result<(), StorageError> {
        let before = self.label_groups.len();
        self.label_groups.retain(|g| g.id != id);
        if self.label_groups.len() == before {
            return Err(StorageError::not_found("label group", id));
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StorageError> {
        self.images.clear();
        self.annotations.clear();
        self.labels.clear();
        self.label_groups.clear();
        Ok(())
    }
}
