//! The annotation workspace.
//!
//! Owns the persistence handle, the history engine and the live
//! collections' single point of mutation. Every user-initiated change goes
//! through here so the ordering contract holds: the pre-change snapshot is
//! captured first, the write is persisted, and only then is the change
//! recorded and visible. A failed write leaves both the history and the
//! in-memory view at the last successfully persisted state.

use crate::error::{Error, Result};
use crate::formats::{DatasetFormat, ExportResult, ImageInfo, ImportResult};
use crate::history::{History, Snapshot, restore_plan};
use crate::model::{
    Annotation, AnnotationId, ImageId, ImageRecord, Label, LabelDeletionPolicy, LabelGroup,
    LabelId, Shape, default_label_color,
};
use crate::segmentation::{SegmentationResult, annotations_from_result};
use crate::store::Storage;

/// State of the asynchronous auto-annotate boundary, for loading UI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AutoAnnotateStatus {
    #[default]
    Idle,
    /// A request is in flight for this image; the canvas stays responsive.
    InFlight(ImageId),
}

/// Central controller for one dataset.
#[derive(Debug)]
pub struct Workspace<S: Storage> {
    store: S,
    history: History,
    active_image: Option<ImageId>,
    auto_annotate: AutoAnnotateStatus,
}

impl<S: Storage> Workspace<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            history: History::new(),
            active_image: None,
            auto_annotate: AutoAnnotateStatus::Idle,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    // ------------------------------------------------------------------
    // Images
    // ------------------------------------------------------------------

    pub fn images(&self) -> Result<Vec<ImageRecord>> {
        Ok(self.store.images()?)
    }

    pub fn add_image(&mut self, image: ImageRecord) -> Result<ImageId> {
        let id = image.id.clone();
        self.store.put_image(image)?;
        Ok(id)
    }

    /// Delete an image, cascading to all of its annotations and its
    /// history. Clears the active image if it was the one removed.
    pub fn remove_image(&mut self, image_id: &str) -> Result<()> {
        let ids: Vec<AnnotationId> = self
            .store
            .annotations_for_image(image_id)?
            .into_iter()
            .map(|a| a.id)
            .collect();
        self.store.remove_annotations(&ids)?;
        self.store.remove_image(image_id)?;
        self.history.remove_image(image_id);
        if self.active_image.as_deref() == Some(image_id) {
            self.active_image = None;
        }
        log::debug!("workspace: removed image {image_id} and {} annotations", ids.len());
        Ok(())
    }

    /// Switch the active image. Its history is created lazily on the first
    /// recorded change; other images' histories are untouched.
    pub fn set_active_image(&mut self, image_id: &str) -> Result<()> {
        if self.store.image(image_id)?.is_none() {
            return Err(Error::UnknownImage(image_id.to_string()));
        }
        self.active_image = Some(image_id.to_string());
        Ok(())
    }

    pub fn active_image(&self) -> Option<&str> {
        self.active_image.as_deref()
    }

    // ------------------------------------------------------------------
    // Labels and groups
    // ------------------------------------------------------------------

    pub fn labels(&self) -> Result<Vec<Label>> {
        Ok(self.store.labels()?)
    }

    pub fn label_groups(&self) -> Result<Vec<LabelGroup>> {
        Ok(self.store.label_groups()?)
    }

    /// Create a label. Names must be non-empty and unique; the color
    /// defaults to a palette pick when not supplied.
    pub fn add_label(&mut self, name: &str, color: Option<String>) -> Result<LabelId> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyLabelName);
        }
        let existing = self.store.labels()?;
        if existing.iter().any(|l| l.name == name) {
            return Err(Error::DuplicateLabelName(name.to_string()));
        }
        let color = color.unwrap_or_else(|| default_label_color(existing.len()));
        let label = Label::new(name, color);
        let id = label.id.clone();
        self.store.put_label(label)?;
        Ok(id)
    }

    pub fn rename_label(&mut self, label_id: &str, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyLabelName);
        }
        let labels = self.store.labels()?;
        if labels.iter().any(|l| l.name == name && l.id != label_id) {
            return Err(Error::DuplicateLabelName(name.to_string()));
        }
        let mut label = labels
            .into_iter()
            .find(|l| l.id == label_id)
            .ok_or_else(|| Error::UnknownLabel(label_id.to_string()))?;
        label.name = name.to_string();
        self.store.put_label(label)?;
        Ok(())
    }

    pub fn set_label_visibility(&mut self, label_id: &str, visible: bool) -> Result<()> {
        let mut label = self
            .store
            .label(label_id)?
            .ok_or_else(|| Error::UnknownLabel(label_id.to_string()))?;
        label.is_visible = visible;
        self.store.put_label(label)?;
        Ok(())
    }

    /// Delete a label under an explicit resolution policy for the
    /// annotations that reference it. There is no default policy, so a
    /// cascade can never happen silently.
    pub fn remove_label(&mut self, label_id: &str, policy: LabelDeletionPolicy) -> Result<()> {
        if self.store.label(label_id)?.is_none() {
            return Err(Error::UnknownLabel(label_id.to_string()));
        }
        let affected: Vec<Annotation> = self
            .store
            .annotations()?
            .into_iter()
            .filter(|a| a.label_id == label_id)
            .collect();

        match &policy {
            LabelDeletionPolicy::LeaveOrphaned => {}
            LabelDeletionPolicy::CascadeDelete => {
                let snapshots = self.pre_change_snapshots(&affected)?;
                let ids: Vec<AnnotationId> = affected.iter().map(|a| a.id.clone()).collect();
                self.store.remove_annotations(&ids)?;
                self.record_snapshots(snapshots);
            }
            LabelDeletionPolicy::Reassign(target) => {
                if self.store.label(target)?.is_none() {
                    return Err(Error::UnknownLabel(target.clone()));
                }
                let snapshots = self.pre_change_snapshots(&affected)?;
                let moved: Vec<Annotation> = affected
                    .into_iter()
                    .map(|mut a| {
                        a.label_id = target.clone();
                        a.touch();
                        a
                    })
                    .collect();
                self.store.put_annotations(moved)?;
                self.record_snapshots(snapshots);
            }
        }

        self.store.remove_label(label_id)?;
        log::debug!("workspace: removed label {label_id} with policy {policy:?}");
        Ok(())
    }

    pub fn add_label_group(&mut self, name: &str) -> Result<String> {
        let group = LabelGroup::new(name);
        let id = group.id.clone();
        self.store.put_label_group(group)?;
        Ok(id)
    }

    /// Delete a group: its labels are ungrouped, never deleted.
    pub fn remove_label_group(&mut self, group_id: &str) -> Result<()> {
        for mut label in self.store.labels()? {
            if label.group_id.as_deref() == Some(group_id) {
                label.group_id = None;
                self.store.put_label(label)?;
            }
        }
        self.store.remove_label_group(group_id)?;
        Ok(())
    }

    pub fn assign_label_to_group(&mut self, label_id: &str, group_id: Option<String>) -> Result<()> {
        let mut label = self
            .store
            .label(label_id)?
            .ok_or_else(|| Error::UnknownLabel(label_id.to_string()))?;
        label.group_id = group_id;
        self.store.put_label(label)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Annotations
    // ------------------------------------------------------------------

    pub fn annotations_for(&self, image_id: &str) -> Result<Vec<Annotation>> {
        Ok(self.store.annotations_for_image(image_id)?)
    }

    /// Persist a completed drawing gesture as a new annotation.
    pub fn add_annotation(
        &mut self,
        image_id: &str,
        label_id: &str,
        shape: Shape,
    ) -> Result<AnnotationId> {
        if self.store.image(image_id)?.is_none() {
            return Err(Error::UnknownImage(image_id.to_string()));
        }
        if self.store.label(label_id)?.is_none() {
            return Err(Error::UnknownLabel(label_id.to_string()));
        }
        let pre = self.store.annotations_for_image(image_id)?;
        let annotation = Annotation::new(image_id, label_id, shape);
        let id = annotation.id.clone();
        self.store.put_annotation(annotation)?;
        self.history.record(image_id, pre);
        Ok(id)
    }

    /// Persist an edit (shape transform, visibility toggle, re-label).
    pub fn update_annotation(&mut self, mut annotation: Annotation) -> Result<()> {
        if self.store.annotation(&annotation.id)?.is_none() {
            return Err(Error::UnknownAnnotation(annotation.id));
        }
        let pre = self.store.annotations_for_image(&annotation.image_id)?;
        annotation.touch();
        let image_id = annotation.image_id.clone();
        self.store.put_annotation(annotation)?;
        self.history.record(&image_id, pre);
        Ok(())
    }

    pub fn remove_annotation(&mut self, annotation_id: &str) -> Result<()> {
        let annotation = self
            .store
            .annotation(annotation_id)?
            .ok_or_else(|| Error::UnknownAnnotation(annotation_id.to_string()))?;
        let pre = self.store.annotations_for_image(&annotation.image_id)?;
        self.store.remove_annotation(annotation_id)?;
        self.history.record(&annotation.image_id, pre);
        Ok(())
    }

    /// Delete several annotations in one transaction and one history entry
    /// per affected image.
    pub fn remove_annotations(&mut self, ids: &[AnnotationId]) -> Result<()> {
        let targeted: Vec<Annotation> = self
            .store
            .annotations()?
            .into_iter()
            .filter(|a| ids.contains(&a.id))
            .collect();
        if targeted.is_empty() {
            return Ok(());
        }
        let snapshots = self.pre_change_snapshots(&targeted)?;
        let ids: Vec<AnnotationId> = targeted.iter().map(|a| a.id.clone()).collect();
        self.store.remove_annotations(&ids)?;
        self.record_snapshots(snapshots);
        Ok(())
    }

    /// Re-label several annotations atomically.
    pub fn set_annotations_label(&mut self, ids: &[AnnotationId], label_id: &str) -> Result<()> {
        if self.store.label(label_id)?.is_none() {
            return Err(Error::UnknownLabel(label_id.to_string()));
        }
        self.bulk_update(ids, |a| {
            a.label_id = label_id.to_string();
        })
    }

    /// Toggle visibility on several annotations atomically.
    pub fn set_annotations_visibility(&mut self, ids: &[AnnotationId], visible: bool) -> Result<()> {
        self.bulk_update(ids, |a| {
            a.is_visible = visible;
        })
    }

    fn bulk_update(&mut self, ids: &[AnnotationId], apply: impl Fn(&mut Annotation)) -> Result<()> {
        let mut targeted: Vec<Annotation> = self
            .store
            .annotations()?
            .into_iter()
            .filter(|a| ids.contains(&a.id))
            .collect();
        if targeted.is_empty() {
            return Ok(());
        }
        let snapshots = self.pre_change_snapshots(&targeted)?;
        for annotation in &mut targeted {
            apply(annotation);
            annotation.touch();
        }
        self.store.put_annotations(targeted)?;
        self.record_snapshots(snapshots);
        Ok(())
    }

    /// Pre-change snapshots for every image touched by a batch, captured
    /// before the write so history can be recorded after it succeeds.
    fn pre_change_snapshots(
        &self,
        targeted: &[Annotation],
    ) -> Result<Vec<(ImageId, Snapshot)>> {
        let mut image_ids: Vec<ImageId> = targeted.iter().map(|a| a.image_id.clone()).collect();
        image_ids.sort();
        image_ids.dedup();
        image_ids
            .into_iter()
            .map(|id| {
                let snapshot = self.store.annotations_for_image(&id)?;
                Ok((id, snapshot))
            })
            .collect()
    }

    fn record_snapshots(&mut self, snapshots: Vec<(ImageId, Snapshot)>) {
        for (image_id, snapshot) in snapshots {
            self.history.record(&image_id, snapshot);
        }
    }

    // ------------------------------------------------------------------
    // Undo / redo
    // ------------------------------------------------------------------

    pub fn can_undo(&self, image_id: &str) -> bool {
        self.history.can_undo(image_id)
    }

    pub fn can_redo(&self, image_id: &str) -> bool {
        self.history.can_redo(image_id)
    }

    /// Undo the most recent change on `image_id`.
    ///
    /// Returns `Ok(false)` when there was nothing to undo. The restored
    /// snapshot is authoritative: annotations missing from it are deleted
    /// from the store, the rest are upserted, all inside the recording
    /// suppression window.
    pub fn undo(&mut self, image_id: &str) -> Result<bool> {
        let current = self.store.annotations_for_image(image_id)?;
        let Some(snapshot) = self.history.undo(image_id, current.clone()) else {
            return Ok(false);
        };
        if let Err(e) = self.apply_snapshot(image_id, &current, &snapshot) {
            self.history.rollback_undo(image_id, snapshot);
            return Err(e);
        }
        Ok(true)
    }

    /// Redo the most recently undone change on `image_id`.
    pub fn redo(&mut self, image_id: &str) -> Result<bool> {
        let current = self.store.annotations_for_image(image_id)?;
        let Some(snapshot) = self.history.redo(image_id, current.clone()) else {
            return Ok(false);
        };
        if let Err(e) = self.apply_snapshot(image_id, &current, &snapshot) {
            self.history.rollback_redo(image_id, snapshot);
            return Err(e);
        }
        Ok(true)
    }

    /// Reconcile the store with a restored snapshot.
    ///
    /// The suppression guard spans the whole write sequence and is closed
    /// synchronously once the writes return, so the window is exact: no
    /// timer, nothing recorded mid-restore, nothing suppressed after.
    fn apply_snapshot(
        &mut self,
        image_id: &str,
        current: &[Annotation],
        snapshot: &[Annotation],
    ) -> Result<()> {
        self.history.begin_restore();
        let result = (|| -> Result<()> {
            let plan = restore_plan(current, snapshot);
            self.store.remove_annotations(&plan.deletions)?;
            self.store.put_annotations(plan.upserts)?;
            Ok(())
        })();
        self.history.end_restore();
        log::debug!("workspace: restored snapshot for {image_id}");
        result
    }

    /// Reset one image's undo/redo stacks.
    pub fn clear_history(&mut self, image_id: &str) {
        self.history.clear(image_id);
    }

    /// Full data reset: every collection and every history.
    pub fn reset(&mut self) -> Result<()> {
        self.store.clear()?;
        self.history = History::new();
        self.active_image = None;
        self.auto_annotate = AutoAnnotateStatus::Idle;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Visibility & referential integrity
    // ------------------------------------------------------------------

    /// Annotations to render for an image: visible themselves, owned by an
    /// existing visible label whose group (if any) is also visible.
    /// Orphans are excluded, never a crash.
    pub fn visible_annotations(&self, image_id: &str) -> Result<Vec<Annotation>> {
        let labels = self.store.labels()?;
        let groups = self.store.label_groups()?;
        Ok(self
            .store
            .annotations_for_image(image_id)?
            .into_iter()
            .filter(|a| {
                if !a.is_visible {
                    return false;
                }
                let Some(label) = labels.iter().find(|l| l.id == a.label_id) else {
                    return false; // orphan
                };
                if !label.is_visible {
                    return false;
                }
                match &label.group_id {
                    Some(gid) => groups.iter().find(|g| &g.id == gid).is_none_or(|g| g.is_visible),
                    None => true,
                }
            })
            .collect())
    }

    /// Annotations whose `label_id` no longer resolves to any label.
    pub fn orphaned_annotations(&self) -> Result<Vec<Annotation>> {
        let labels = self.store.labels()?;
        Ok(self
            .store
            .annotations()?
            .into_iter()
            .filter(|a| !labels.iter().any(|l| l.id == a.label_id))
            .collect())
    }

    // ------------------------------------------------------------------
    // Auto-annotate ingestion
    // ------------------------------------------------------------------

    pub fn auto_annotate_status(&self) -> &AutoAnnotateStatus {
        &self.auto_annotate
    }

    /// Mark a segmentation request as in flight (for loading UI).
    pub fn begin_auto_annotate(&mut self, image_id: &str) -> Result<()> {
        if self.store.image(image_id)?.is_none() {
            return Err(Error::UnknownImage(image_id.to_string()));
        }
        self.auto_annotate = AutoAnnotateStatus::InFlight(image_id.to_string());
        Ok(())
    }

    /// Record a failed request. Nothing is committed; the user may re-issue
    /// the action (no automatic retry).
    pub fn fail_auto_annotate(&mut self, message: impl Into<String>) -> Error {
        self.auto_annotate = AutoAnnotateStatus::Idle;
        Error::Segmentation(message.into())
    }

    /// Ingest a successful segmentation result: synthesize annotations
    /// under `label_id`, persist them as one transaction and record one
    /// history entry. A result with no usable detections commits nothing.
    pub fn ingest_segmentation(
        &mut self,
        image_id: &str,
        label_id: &str,
        result: &SegmentationResult,
    ) -> Result<Vec<AnnotationId>> {
        self.auto_annotate = AutoAnnotateStatus::Idle;
        if self.store.image(image_id)?.is_none() {
            return Err(Error::UnknownImage(image_id.to_string()));
        }
        if self.store.label(label_id)?.is_none() {
            return Err(Error::UnknownLabel(label_id.to_string()));
        }
        let annotations = annotations_from_result(image_id, label_id, result);
        if annotations.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<AnnotationId> = annotations.iter().map(|a| a.id.clone()).collect();
        let pre = self.store.annotations_for_image(image_id)?;
        self.store.put_annotations(annotations)?;
        self.history.record(image_id, pre);
        log::debug!("workspace: ingested {} auto annotations for {image_id}", ids.len());
        Ok(ids)
    }

    /// Ingest a batch segmentation response covering several images.
    ///
    /// Each image's detections commit as their own transaction and history
    /// entry, so undo stays per-image.
    pub fn ingest_segmentation_batch(
        &mut self,
        label_id: &str,
        results: &[(ImageId, SegmentationResult)],
    ) -> Result<Vec<AnnotationId>> {
        let mut ids = Vec::new();
        for (image_id, result) in results {
            ids.extend(self.ingest_segmentation(image_id, label_id, result)?);
        }
        Ok(ids)
    }

    // ------------------------------------------------------------------
    // Dataset import / export
    // ------------------------------------------------------------------

    /// Export every image through a dataset format.
    ///
    /// Only effectively visible annotations are exported: hidden
    /// annotations, hidden labels and hidden groups are all excluded here,
    /// and the format itself excludes orphans.
    pub fn export_dataset(&self, format: &dyn DatasetFormat) -> Result<ExportResult> {
        let labels = self.store.labels()?;
        let mut images = Vec::new();
        for record in self.store.images()? {
            let info = ImageInfo::new(record.name.clone(), record.width, record.height);
            let annotations = self.visible_annotations(&record.id)?;
            images.push((info, annotations));
        }
        Ok(format.export_dataset(&labels, &images)?)
    }

    /// Apply an import: persist the minted labels and attach each file's
    /// annotations to the image whose name (or base name, for formats that
    /// do not know the extension) matches. Unmatched files are logged and
    /// skipped. Imported annotations record history per image.
    pub fn apply_import(&mut self, import: &ImportResult) -> Result<Vec<AnnotationId>> {
        for label in &import.labels {
            self.store.put_label(label.clone())?;
        }

        let records = self.store.images()?;
        let mut ids = Vec::new();
        for (key, imported) in &import.annotations {
            let Some(record) = records.iter().find(|r| {
                r.name == *key
                    || r.name.rsplit_once('.').map(|(base, _)| base) == Some(key.as_str())
            }) else {
                log::warn!("import: no image matches '{key}', skipping {} annotations", imported.len());
                continue;
            };
            let annotations: Vec<Annotation> = imported
                .iter()
                .map(|a| Annotation::new(record.id.clone(), a.label_id.clone(), a.shape.clone()))
                .collect();
            if annotations.is_empty() {
                continue;
            }
            ids.extend(annotations.iter().map(|a| a.id.clone()));
            let pre = self.store.annotations_for_image(&record.id)?;
            self.store.put_annotations(annotations)?;
            self.history.record(&record.id, pre);
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segmentation::MaskPolygon;
    use crate::store::{MemoryStore, StorageError};

    fn workspace_with_image() -> (Workspace<MemoryStore>, ImageId, LabelId) {
        let mut ws = Workspace::new(MemoryStore::new());
        let image = ImageRecord::with_dimensions("test.jpg", 640, 480, Vec::new());
        let image_id = ws.add_image(image).unwrap();
        let label_id = ws.add_label("car", Some("#ff0000".into())).unwrap();
        (ws, image_id, label_id)
    }

    fn rect(x: f32, y: f32) -> Shape {
        Shape::Rectangle {
            x,
            y,
            width: 50.0,
            height: 40.0,
        }
    }

    #[test]
    fn test_add_annotation_validates_references() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        assert!(ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).is_ok());
        assert!(matches!(
            ws.add_annotation("missing", &label_id, rect(0.0, 0.0)),
            Err(Error::UnknownImage(_))
        ));
        assert!(matches!(
            ws.add_annotation(&image_id, "missing", rect(0.0, 0.0)),
            Err(Error::UnknownLabel(_))
        ));
    }

    #[test]
    fn test_undo_after_delete_restores_both() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        let a = ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        let b = ws.add_annotation(&image_id, &label_id, rect(100.0, 0.0)).unwrap();

        ws.remove_annotation(&b).unwrap();
        assert_eq!(ws.annotations_for(&image_id).unwrap().len(), 1);

        assert!(ws.undo(&image_id).unwrap());
        let restored = ws.annotations_for(&image_id).unwrap();
        assert_eq!(restored.len(), 2);
        let ids: Vec<&str> = restored.iter().map(|a| a.id.as_str()).collect();
        assert!(ids.contains(&a.as_str()) && ids.contains(&b.as_str()));
    }

    #[test]
    fn test_undo_then_redo_roundtrip() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        ws.add_annotation(&image_id, &label_id, rect(100.0, 0.0)).unwrap();

        let before_undo = ws.annotations_for(&image_id).unwrap();
        assert!(ws.undo(&image_id).unwrap());
        assert_eq!(ws.annotations_for(&image_id).unwrap().len(), 1);

        assert!(ws.redo(&image_id).unwrap());
        assert_eq!(ws.annotations_for(&image_id).unwrap(), before_undo);
    }

    #[test]
    fn test_undo_to_empty_set() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        assert!(ws.undo(&image_id).unwrap());
        assert!(ws.annotations_for(&image_id).unwrap().is_empty());
        // Underflow is a no-op, not an error
        assert!(!ws.undo(&image_id).unwrap());
    }

    #[test]
    fn test_new_change_clears_redo() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        ws.undo(&image_id).unwrap();
        assert!(ws.can_redo(&image_id));

        ws.add_annotation(&image_id, &label_id, rect(100.0, 0.0)).unwrap();
        assert!(!ws.can_redo(&image_id));
    }

    #[test]
    fn test_histories_isolated_per_image() {
        let (mut ws, image_a, label_id) = workspace_with_image();
        let image_b = ws
            .add_image(ImageRecord::with_dimensions("b.jpg", 10, 10, Vec::new()))
            .unwrap();

        ws.add_annotation(&image_a, &label_id, rect(0.0, 0.0)).unwrap();
        assert!(ws.can_undo(&image_a));
        assert!(!ws.can_undo(&image_b));
    }

    #[test]
    fn test_remove_image_cascades() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        ws.set_active_image(&image_id).unwrap();

        ws.remove_image(&image_id).unwrap();
        assert!(ws.store().annotations().unwrap().is_empty());
        assert!(ws.active_image().is_none());
        assert!(!ws.can_undo(&image_id));
    }

    #[test]
    fn test_label_name_validation() {
        let (mut ws, _, _) = workspace_with_image();
        assert!(matches!(ws.add_label("  ", None), Err(Error::EmptyLabelName)));
        assert!(matches!(
            ws.add_label("car", None),
            Err(Error::DuplicateLabelName(_))
        ));
        // Default palette color is assigned when none is given
        let id = ws.add_label("person", None).unwrap();
        let label = ws.store().label(&id).unwrap().unwrap();
        assert!(label.color.starts_with('#'));
    }

    #[test]
    fn test_orphan_detection() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        assert!(ws.orphaned_annotations().unwrap().is_empty());

        ws.remove_label(&label_id, LabelDeletionPolicy::LeaveOrphaned).unwrap();
        let orphans = ws.orphaned_annotations().unwrap();
        assert_eq!(orphans.len(), 1);
        // Orphans are excluded from rendering but still stored
        assert!(ws.visible_annotations(&image_id).unwrap().is_empty());
        assert_eq!(ws.annotations_for(&image_id).unwrap().len(), 1);
    }

    #[test]
    fn test_label_cascade_delete_is_undoable() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        ws.add_annotation(&image_id, &label_id, rect(100.0, 0.0)).unwrap();

        ws.remove_label(&label_id, LabelDeletionPolicy::CascadeDelete).unwrap();
        assert!(ws.annotations_for(&image_id).unwrap().is_empty());

        // The cascade recorded one history entry for the image
        assert!(ws.undo(&image_id).unwrap());
        assert_eq!(ws.annotations_for(&image_id).unwrap().len(), 2);
    }

    #[test]
    fn test_label_reassign_policy() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        let target = ws.add_label("person", None).unwrap();
        ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();

        ws.remove_label(&label_id, LabelDeletionPolicy::Reassign(target.clone()))
            .unwrap();
        let anns = ws.annotations_for(&image_id).unwrap();
        assert_eq!(anns[0].label_id, target);
        assert!(ws.orphaned_annotations().unwrap().is_empty());

        // Reassigning to a missing label is rejected up front
        let err = ws.remove_label(&target, LabelDeletionPolicy::Reassign("nope".into()));
        assert!(matches!(err, Err(Error::UnknownLabel(_))));
    }

    #[test]
    fn test_group_deletion_ungroups() {
        let (mut ws, _, label_id) = workspace_with_image();
        let group_id = ws.add_label_group("vehicles").unwrap();
        ws.assign_label_to_group(&label_id, Some(group_id.clone())).unwrap();

        ws.remove_label_group(&group_id).unwrap();
        let label = ws.store().label(&label_id).unwrap().unwrap();
        assert!(label.group_id.is_none());
    }

    #[test]
    fn test_visibility_layers() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        let ann_id = ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        assert_eq!(ws.visible_annotations(&image_id).unwrap().len(), 1);

        // Annotation flag
        ws.set_annotations_visibility(&[ann_id.clone()], false).unwrap();
        assert!(ws.visible_annotations(&image_id).unwrap().is_empty());
        ws.set_annotations_visibility(&[ann_id], true).unwrap();

        // Label flag
        ws.set_label_visibility(&label_id, false).unwrap();
        assert!(ws.visible_annotations(&image_id).unwrap().is_empty());
        ws.set_label_visibility(&label_id, true).unwrap();

        // Group flag
        let group_id = ws.add_label_group("vehicles").unwrap();
        ws.assign_label_to_group(&label_id, Some(group_id.clone())).unwrap();
        let mut group = ws.store().label_groups().unwrap().remove(0);
        group.is_visible = false;
        ws.store.put_label_group(group).unwrap();
        assert!(ws.visible_annotations(&image_id).unwrap().is_empty());
    }

    #[test]
    fn test_bulk_relabel_atomic_and_undoable() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        let target = ws.add_label("person", None).unwrap();
        let a = ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        let b = ws.add_annotation(&image_id, &label_id, rect(100.0, 0.0)).unwrap();

        ws.set_annotations_label(&[a, b], &target).unwrap();
        assert!(ws
            .annotations_for(&image_id)
            .unwrap()
            .iter()
            .all(|ann| ann.label_id == target));

        // One history entry covers the whole bulk change
        ws.undo(&image_id).unwrap();
        assert!(ws
            .annotations_for(&image_id)
            .unwrap()
            .iter()
            .all(|ann| ann.label_id == label_id));
    }

    #[test]
    fn test_ingest_segmentation() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        ws.begin_auto_annotate(&image_id).unwrap();
        assert_eq!(
            ws.auto_annotate_status(),
            &AutoAnnotateStatus::InFlight(image_id.clone())
        );

        let result = SegmentationResult {
            num_objects: 1,
            boxes: vec![[10.0, 10.0, 60.0, 60.0]],
            scores: vec![0.91],
            masks: vec![MaskPolygon {
                polygons: vec![vec![(10.0, 10.0), (60.0, 10.0), (35.0, 60.0)]],
                area: 1250.0,
            }],
        };
        let ids = ws.ingest_segmentation(&image_id, &label_id, &result).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(ws.auto_annotate_status(), &AutoAnnotateStatus::Idle);

        let anns = ws.annotations_for(&image_id).unwrap();
        assert!(anns[0].is_auto_generated);
        assert_eq!(anns[0].confidence, Some(0.91));

        // The batch is one undo step
        ws.undo(&image_id).unwrap();
        assert!(ws.annotations_for(&image_id).unwrap().is_empty());
    }

    #[test]
    fn test_batch_ingestion_one_history_entry_per_image() {
        let (mut ws, image_a, label_id) = workspace_with_image();
        let image_b = ws
            .add_image(ImageRecord::with_dimensions("b.jpg", 10, 10, Vec::new()))
            .unwrap();

        let result = SegmentationResult {
            num_objects: 1,
            boxes: vec![[0.0, 0.0, 20.0, 20.0]],
            scores: vec![0.6],
            masks: Vec::new(),
        };
        let ids = ws
            .ingest_segmentation_batch(
                &label_id,
                &[(image_a.clone(), result.clone()), (image_b.clone(), result)],
            )
            .unwrap();
        assert_eq!(ids.len(), 2);

        // Undoing one image leaves the other untouched
        ws.undo(&image_a).unwrap();
        assert!(ws.annotations_for(&image_a).unwrap().is_empty());
        assert_eq!(ws.annotations_for(&image_b).unwrap().len(), 1);
    }

    #[test]
    fn test_export_excludes_hidden_annotations() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        let shown = ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        let hidden = ws.add_annotation(&image_id, &label_id, rect(100.0, 0.0)).unwrap();
        ws.set_annotations_visibility(&[hidden], false).unwrap();
        let _ = shown;

        let result = ws
            .export_dataset(&crate::formats::YoloFormat::detection())
            .unwrap();
        let lines: Vec<&str> = result.files["test.txt"].lines().collect();
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn test_export_excludes_hidden_label() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        ws.set_label_visibility(&label_id, false).unwrap();

        let result = ws
            .export_dataset(&crate::formats::YoloFormat::detection())
            .unwrap();
        assert!(result.files["test.txt"].is_empty());
    }

    #[test]
    fn test_apply_import_matches_by_base_name() {
        let (mut ws, image_id, _) = workspace_with_image();

        let label = crate::model::Label::new("imported", "#123456");
        let mut import = ImportResult::new();
        let label_id = label.id.clone();
        import.add_label(label);
        // YOLO-style key: base name without extension (image is "test.jpg")
        import.annotations.insert(
            "test".to_string(),
            vec![crate::formats::ImportedAnnotation {
                label_id: label_id.clone(),
                shape: Shape::Rectangle {
                    x: 1.0,
                    y: 2.0,
                    width: 30.0,
                    height: 40.0,
                },
            }],
        );
        // Unmatched key is skipped without error
        import.annotations.insert("missing".to_string(), Vec::new());

        let ids = ws.apply_import(&import).unwrap();
        assert_eq!(ids.len(), 1);
        let anns = ws.annotations_for(&image_id).unwrap();
        assert_eq!(anns.len(), 1);
        assert_eq!(anns[0].label_id, label_id);
        // The import is undoable
        assert!(ws.undo(&image_id).unwrap());
        assert!(ws.annotations_for(&image_id).unwrap().is_empty());
    }

    #[test]
    fn test_failed_auto_annotate_commits_nothing() {
        let (mut ws, image_id, _) = workspace_with_image();
        ws.begin_auto_annotate(&image_id).unwrap();
        let err = ws.fail_auto_annotate("HTTP 503");
        assert!(matches!(err, Error::Segmentation(_)));
        assert_eq!(ws.auto_annotate_status(), &AutoAnnotateStatus::Idle);
        assert!(ws.annotations_for(&image_id).unwrap().is_empty());
        assert!(!ws.can_undo(&image_id));
    }

    #[test]
    fn test_point_annotations_roundtrip() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        let id = ws
            .add_annotation(&image_id, &label_id, Shape::Point { x: 5.0, y: 6.0 })
            .unwrap();
        ws.undo(&image_id).unwrap();
        ws.redo(&image_id).unwrap();
        let anns = ws.annotations_for(&image_id).unwrap();
        assert_eq!(anns[0].id, id);
        assert_eq!(anns[0].shape, Shape::Point { x: 5.0, y: 6.0 });
    }

    #[test]
    fn test_reset_clears_everything() {
        let (mut ws, image_id, label_id) = workspace_with_image();
        ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();
        ws.reset().unwrap();
        assert!(ws.images().unwrap().is_empty());
        assert!(ws.labels().unwrap().is_empty());
        assert!(!ws.can_undo(&image_id));
    }

    // A store that fails every annotation write, for error-path tests.
    #[derive(Debug, Default)]
    struct FailingStore {
        inner: MemoryStore,
        fail_writes: bool,
    }

    impl Storage for FailingStore {
        fn images(&self) -> std::result::Result<Vec<ImageRecord>, StorageError> {
            self.inner.images()
        }
        fn image(&self, id: &str) -> std::result::Result<Option<ImageRecord>, StorageError> {
            self.inner.image(id)
        }
        fn put_image(&mut self, image: ImageRecord) -> std::result::Result<(), StorageError> {
            self.inner.put_image(image)
        }
        fn remove_image(&mut self, id: &str) -> std::result::Result<(), StorageError> {
            self.inner.remove_image(id)
        }
        fn annotations(&self) -> std::result::Result<Vec<Annotation>, StorageError> {
            self.inner.annotations()
        }
        fn annotations_for_image(
            &self,
            image_id: &str,
        ) -> std::result::Result<Vec<Annotation>, StorageError> {
            self.inner.annotations_for_image(image_id)
        }
        fn annotation(&self, id: &str) -> std::result::Result<Option<Annotation>, StorageError> {
            self.inner.annotation(id)
        }
        fn put_annotation(&mut self, a: Annotation) -> std::result::Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Backend("quota exceeded".into()));
            }
            self.inner.put_annotation(a)
        }
        fn put_annotations(
            &mut self,
            a: Vec<Annotation>,
        ) -> std::result::Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Backend("quota exceeded".into()));
            }
            self.inner.put_annotations(a)
        }
        fn remove_annotation(&mut self, id: &str) -> std::result::Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Backend("quota exceeded".into()));
            }
            self.inner.remove_annotation(id)
        }
        fn remove_annotations(&mut self, ids: &[String]) -> std::result::Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::Backend("quota exceeded".into()));
            }
            self.inner.remove_annotations(ids)
        }
        fn labels(&self) -> std::result::Result<Vec<Label>, StorageError> {
            self.inner.labels()
        }
        fn label(&self, id: &str) -> std::result::Result<Option<Label>, StorageError> {
            self.inner.label(id)
        }
        fn put_label(&mut self, label: Label) -> std::result::Result<(), StorageError> {
            self.inner.put_label(label)
        }
        fn remove_label(&mut self, id: &str) -> std::result::Result<(), StorageError> {
            self.inner.remove_label(id)
        }
        fn label_groups(&self) -> std::result::Result<Vec<LabelGroup>, StorageError> {
            self.inner.label_groups()
        }
        fn put_label_group(&mut self, g: LabelGroup) -> std::result::Result<(), StorageError> {
            self.inner.put_label_group(g)
        }
        fn remove_label_group(&mut self, id: &str) -> std::result::Result<(), StorageError> {
            self.inner.remove_label_group(id)
        }
        fn clear(&mut self) -> std::result::Result<(), StorageError> {
            self.inner.clear()
        }
    }

    #[test]
    fn test_failed_write_records_no_history() {
        let mut ws = Workspace::new(FailingStore::default());
        let image_id = ws
            .add_image(ImageRecord::with_dimensions("a.jpg", 10, 10, Vec::new()))
            .unwrap();
        let label_id = ws.add_label("car", None).unwrap();

        ws.store.fail_writes = true;
        let err = ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0));
        assert!(matches!(err, Err(Error::Storage(_))));
        assert!(!ws.can_undo(&image_id));
        assert!(ws.annotations_for(&image_id).unwrap().is_empty());
    }

    #[test]
    fn test_failed_undo_write_rolls_back_history() {
        let mut ws = Workspace::new(FailingStore::default());
        let image_id = ws
            .add_image(ImageRecord::with_dimensions("a.jpg", 10, 10, Vec::new()))
            .unwrap();
        let label_id = ws.add_label("car", None).unwrap();
        ws.add_annotation(&image_id, &label_id, rect(0.0, 0.0)).unwrap();

        ws.store.fail_writes = true;
        assert!(ws.undo(&image_id).is_err());

        // History still offers the undo; the store is unchanged
        assert!(ws.can_undo(&image_id));
        assert!(!ws.can_redo(&image_id));
        assert_eq!(ws.annotations_for(&image_id).unwrap().len(), 1);

        // And it succeeds once the backend recovers
        ws.store.fail_writes = false;
        assert!(ws.undo(&image_id).unwrap());
        assert!(ws.annotations_for(&image_id).unwrap().is_empty());
    }
}
