//! Selection and transform of existing annotations.
//!
//! Single-select only: one annotation at a time carries the transform
//! handles. Rectangle edits go through the 8-anchor resize; polygon edits
//! are per-vertex (drag, delete, insert-on-edge) plus a whole-shape drag
//! whose offset is baked into the points exactly once at drag end.

use crate::constants::{MIN_POLYGON_VERTICES, SNAP_DISTANCE};
use crate::geometry::{Point, nearest_edge};
use crate::model::{Annotation, AnnotationId, Shape};

/// The 8 resize anchors of a selected rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RectHandle {
    TopLeft,
    TopCenter,
    TopRight,
    MiddleLeft,
    MiddleRight,
    BottomLeft,
    BottomCenter,
    BottomRight,
}

impl RectHandle {
    /// All handles, corners first.
    pub fn all() -> &'static [RectHandle] {
        &[
            RectHandle::TopLeft,
            RectHandle::TopRight,
            RectHandle::BottomLeft,
            RectHandle::BottomRight,
            RectHandle::TopCenter,
            RectHandle::BottomCenter,
            RectHandle::MiddleLeft,
            RectHandle::MiddleRight,
        ]
    }

    fn is_corner(&self) -> bool {
        matches!(
            self,
            RectHandle::TopLeft
                | RectHandle::TopRight
                | RectHandle::BottomLeft
                | RectHandle::BottomRight
        )
    }
}

/// An in-progress drag on the selected annotation.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Drag {
    /// Whole-shape drag; only the accumulated offset changes until drag
    /// end, when it is baked into the geometry and reset to zero.
    MoveShape { last: Point, dx: f32, dy: f32 },
    /// Dragging one polygon vertex.
    Vertex { index: usize },
    /// Resizing a rectangle from one handle; the original geometry is kept
    /// so aspect constraints work off the pre-drag shape.
    Resize {
        handle: RectHandle,
        original: (f32, f32, f32, f32),
    },
}

/// Selection and transform controller.
#[derive(Debug, Clone, Default)]
pub struct EditingController {
    selected: Option<AnnotationId>,
    drag: Option<Drag>,
}

impl EditingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn select(&mut self, id: impl Into<AnnotationId>) {
        self.selected = Some(id.into());
        self.drag = None;
    }

    pub fn deselect(&mut self) {
        self.selected = None;
        self.drag = None;
    }

    /// Find the topmost annotation containing `p`.
    ///
    /// `annotations` must be in render order (bottom first); the last match
    /// wins so the shape drawn on top is the one selected.
    pub fn hit_test<'a>(
        &self,
        annotations: impl IntoIterator<Item = &'a Annotation>,
        p: Point,
    ) -> Option<AnnotationId> {
        let mut hit = None;
        for ann in annotations {
            if ann.shape.contains(p) {
                hit = Some(ann.id.clone());
            }
        }
        hit
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    // ------------------------------------------------------------------
    // Whole-shape drag
    // ------------------------------------------------------------------

    /// Start dragging the selected shape's body.
    pub fn begin_move(&mut self, at: Point) {
        self.drag = Some(Drag::MoveShape {
            last: at,
            dx: 0.0,
            dy: 0.0,
        });
    }

    /// Advance the drag; geometry is untouched until [`Self::end_move`].
    pub fn update_move(&mut self, at: Point) {
        if let Some(Drag::MoveShape { last, dx, dy }) = &mut self.drag {
            *dx += at.x - last.x;
            *dy += at.y - last.y;
            *last = at;
        }
    }

    /// Transient offset to apply when rendering the dragged shape.
    pub fn move_offset(&self) -> (f32, f32) {
        match &self.drag {
            Some(Drag::MoveShape { dx, dy, .. }) => (*dx, *dy),
            _ => (0.0, 0.0),
        }
    }

    /// Finish the drag: bake the accumulated offset into the shape once
    /// and reset it to zero so it cannot be applied twice.
    /// Returns true when the shape actually changed.
    pub fn end_move(&mut self, shape: &mut Shape) -> bool {
        let Some(Drag::MoveShape { dx, dy, .. }) = self.drag.take() else {
            return false;
        };
        if dx == 0.0 && dy == 0.0 {
            return false;
        }
        shape.translate(dx, dy);
        true
    }

    // ------------------------------------------------------------------
    // Rectangle resize
    // ------------------------------------------------------------------

    /// Start resizing the selected rectangle from one of its 8 anchors.
    pub fn begin_resize(&mut self, shape: &Shape, handle: RectHandle) {
        if let Shape::Rectangle {
            x,
            y,
            width,
            height,
        } = shape
        {
            self.drag = Some(Drag::Resize {
                handle,
                original: (*x, *y, *width, *height),
            });
        }
    }

    /// Move the grabbed anchor to `at`, updating the rectangle in place.
    ///
    /// `fixed_aspect` (Shift) constrains corner handles to the pre-drag
    /// aspect ratio. The result is always normalized to positive extents,
    /// so dragging an anchor across the opposite edge flips the rectangle
    /// instead of producing negative size.
    pub fn update_resize(&mut self, shape: &mut Shape, at: Point, fixed_aspect: bool) {
        let Some(Drag::Resize { handle, original }) = self.drag else {
            return;
        };
        let Shape::Rectangle {
            x,
            y,
            width,
            height,
        } = shape
        else {
            return;
        };
        let (ox, oy, ow, oh) = original;

        // The edge(s) opposite the grabbed handle stay fixed.
        let (mut x1, mut y1, mut x2, mut y2) = (ox, oy, ox + ow, oy + oh);
        match handle {
            RectHandle::TopLeft => {
                x1 = at.x;
                y1 = at.y;
            }
            RectHandle::TopCenter => y1 = at.y,
            RectHandle::TopRight => {
                x2 = at.x;
                y1 = at.y;
            }
            RectHandle::MiddleLeft => x1 = at.x,
            RectHandle::MiddleRight => x2 = at.x,
            RectHandle::BottomLeft => {
                x1 = at.x;
                y2 = at.y;
            }
            RectHandle::BottomCenter => y2 = at.y,
            RectHandle::BottomRight => {
                x2 = at.x;
                y2 = at.y;
            }
        }

        let mut new_w = x2 - x1;
        let mut new_h = y2 - y1;

        if fixed_aspect && handle.is_corner() && ow > 0.0 && oh > 0.0 {
            // Drive the minor axis from the major one
            let aspect = ow / oh;
            if (new_w / ow).abs() >= (new_h / oh).abs() {
                new_h = new_h.signum() * new_w.abs() / aspect;
            } else {
                new_w = new_w.signum() * new_h.abs() * aspect;
            }
            match handle {
                RectHandle::TopLeft => {
                    x1 = x2 - new_w;
                    y1 = y2 - new_h;
                }
                RectHandle::TopRight => {
                    x2 = x1 + new_w;
                    y1 = y2 - new_h;
                }
                RectHandle::BottomLeft => {
                    x1 = x2 - new_w;
                    y2 = y1 + new_h;
                }
                RectHandle::BottomRight => {
                    x2 = x1 + new_w;
                    y2 = y1 + new_h;
                }
                _ => {}
            }
        }

        // Bake back to origin + positive extents
        *x = x1.min(x2);
        *y = y1.min(y2);
        *width = (x2 - x1).abs();
        *height = (y2 - y1).abs();
    }

    /// Finish the resize. The geometry was already baked per-update, so
    /// this only clears the drag state.
    pub fn end_resize(&mut self) {
        if matches!(self.drag, Some(Drag::Resize { .. })) {
            self.drag = None;
        }
    }

    // ------------------------------------------------------------------
    // Polygon vertex editing
    // ------------------------------------------------------------------

    /// Start dragging the vertex at `index` of the selected polygon.
    pub fn begin_vertex_drag(&mut self, index: usize) {
        self.drag = Some(Drag::Vertex { index });
    }

    /// Move the dragged vertex; only that point's coordinates change.
    pub fn update_vertex_drag(&mut self, shape: &mut Shape, at: Point) {
        if let Some(Drag::Vertex { index }) = self.drag
            && let Shape::Polygon { points } = shape
            && let Some(p) = points.get_mut(index)
        {
            *p = at;
        }
    }

    pub fn end_vertex_drag(&mut self) {
        if matches!(self.drag, Some(Drag::Vertex { .. })) {
            self.drag = None;
        }
    }

    /// Delete a polygon vertex (double-click on its handle).
    ///
    /// Refused silently when only 3 vertices remain; a polygon never drops
    /// below the minimum. Returns true when a vertex was removed.
    pub fn delete_vertex(&self, shape: &mut Shape, index: usize) -> bool {
        let Shape::Polygon { points } = shape else {
            return false;
        };
        if points.len() <= MIN_POLYGON_VERTICES || index >= points.len() {
            return false;
        }
        points.remove(index);
        true
    }

    /// Insert a vertex on the polygon edge nearest to `at` (modifier-click
    /// on the selected polygon's outline).
    ///
    /// The new vertex lands at the closest point on that edge and is
    /// spliced in between the edge's endpoints. Clicks further than the
    /// snap distance from every edge are ignored. Returns the insertion
    /// index when a vertex was added.
    pub fn insert_vertex_on_edge(&self, shape: &mut Shape, at: Point) -> Option<usize> {
        let Shape::Polygon { points } = shape else {
            return None;
        };
        let (edge_index, closest) = nearest_edge(points, at)?;
        if at.distance_to(closest) > SNAP_DISTANCE {
            return None;
        }
        let insert_at = edge_index + 1;
        points.insert(insert_at, closest);
        Some(insert_at)
    }

    /// Index of the vertex handle at `p`, if any (for routing pointer
    /// events between vertex drags and whole-shape drags).
    pub fn vertex_at(&self, shape: &Shape, p: Point) -> Option<usize> {
        let Shape::Polygon { points } = shape else {
            return None;
        };
        points
            .iter()
            .position(|v| v.distance_to(p) <= SNAP_DISTANCE)
    }
}
