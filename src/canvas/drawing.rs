//! Interactive drawing state machine.
//!
//! Pointer and keyboard events arrive here already mapped into image space
//! (the view transform is applied by the caller). Modifier state is passed
//! explicitly with every event rather than read from ambient globals, so
//! every transition is a pure function of (state, event).

use crate::constants::{MIN_POLYGON_VERTICES, SNAP_DISTANCE};
use crate::geometry::Point;
use crate::model::Shape;
use crate::segmentation::PromptBox;

/// Annotation tools available on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Selection tool; pointer-down selects or pans.
    #[default]
    Select,
    /// Two-click rectangle tool.
    Rectangle,
    /// Multi-point polygon tool.
    Polygon,
}

impl Tool {
    pub fn name(&self) -> &'static str {
        match self {
            Tool::Select => "Select",
            Tool::Rectangle => "Rectangle",
            Tool::Polygon => "Polygon",
        }
    }

    pub fn is_drawing_tool(&self) -> bool {
        !matches!(self, Tool::Select)
    }
}

/// Keyboard modifier state accompanying a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    /// Shift: fixed-aspect resize constraint.
    pub shift: bool,
    /// Ctrl: vertex insertion on polygon edges.
    pub ctrl: bool,
    /// Space: pan override regardless of the active tool.
    pub space: bool,
}

/// In-progress gesture state.
#[derive(Debug, Clone, Default, PartialEq)]
enum Gesture {
    /// Nothing in progress (rectangle tool: awaiting the first point).
    #[default]
    Idle,
    /// Rectangle anchor placed, awaiting the second corner.
    RectanglePending { anchor: Point, cursor: Point },
    /// Polygon vertices collected so far.
    PolygonCollecting { points: Vec<Point>, cursor: Point },
}

/// What the caller should do in response to a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawAction {
    /// Nothing happened (e.g. the gesture advanced internally).
    None,
    /// Pan the stage with this pointer gesture.
    Pan,
    /// Select tool: hit-test at this image point; pan when nothing is hit.
    SelectAt(Point),
    /// A finished shape to persist as an annotation.
    Commit(Shape),
    /// A completed rectangle was redirected into the prompt-box list.
    PromptBoxAdded(PromptBox),
    /// The rectangle gesture finished under the minimum size and was
    /// discarded; surface a transient notice.
    RejectedTooSmall,
}

/// Live preview of the in-progress gesture, for rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    /// Dashed rectangle between the anchor and the cursor (normalized).
    Rectangle {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
    /// Filled polygon of committed points plus the cursor as a provisional
    /// closing vertex; `snap_to_first` highlights the first-point marker
    /// when a click would close the shape.
    Polygon {
        points: Vec<Point>,
        cursor: Point,
        snap_to_first: bool,
    },
}

/// The drawing gesture controller.
#[derive(Debug, Clone, Default)]
pub struct DrawingController {
    tool: Tool,
    gesture: Gesture,
    /// When set, completed rectangles become prompt boxes for the
    /// segmentation service instead of persisted annotations.
    prompt_mode: bool,
    prompt_boxes: Vec<PromptBox>,
}

impl DrawingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    /// Switch tools, discarding any in-progress gesture.
    pub fn set_tool(&mut self, tool: Tool) {
        if self.tool != tool {
            self.tool = tool;
            self.gesture = Gesture::Idle;
        }
    }

    /// Whether a multi-step gesture is currently in progress.
    pub fn is_drawing(&self) -> bool {
        !matches!(self.gesture, Gesture::Idle)
    }

    /// Enable or disable bbox-prompt mode. Disabling keeps collected boxes.
    pub fn set_prompt_mode(&mut self, enabled: bool) {
        self.prompt_mode = enabled;
    }

    pub fn prompt_mode(&self) -> bool {
        self.prompt_mode
    }

    /// Prompt boxes collected so far.
    pub fn prompt_boxes(&self) -> &[PromptBox] {
        &self.prompt_boxes
    }

    /// Drain the collected prompt boxes for a segmentation request.
    pub fn take_prompt_boxes(&mut self) -> Vec<PromptBox> {
        std::mem::take(&mut self.prompt_boxes)
    }

    /// Pointer down at an image-space position.
    pub fn pointer_down(&mut self, at: Point, modifiers: Modifiers) -> DrawAction {
        // Held Space overrides every tool's click semantics
        if modifiers.space {
            return DrawAction::Pan;
        }

        match self.tool {
            Tool::Select => DrawAction::SelectAt(at),
            Tool::Rectangle => match self.gesture.clone() {
                Gesture::Idle => {
                    self.gesture = Gesture::RectanglePending {
                        anchor: at,
                        cursor: at,
                    };
                    DrawAction::None
                }
                Gesture::RectanglePending { anchor, .. } => {
                    self.gesture = Gesture::Idle;
                    match Shape::rectangle_from_corners(anchor, at) {
                        Some(shape) => self.emit_rectangle(shape),
                        None => DrawAction::RejectedTooSmall,
                    }
                }
                Gesture::PolygonCollecting { .. } => DrawAction::None,
            },
            Tool::Polygon => match &mut self.gesture {
                Gesture::PolygonCollecting { points, cursor } => {
                    *cursor = at;
                    // A click near the first vertex closes the polygon once
                    // three points exist; the close uses the original first
                    // point, not the click position.
                    if points.len() >= MIN_POLYGON_VERTICES
                        && points[0].distance_to(at) <= SNAP_DISTANCE
                    {
                        let closed = std::mem::take(points);
                        self.gesture = Gesture::Idle;
                        match Shape::polygon_from_points(closed) {
                            Some(shape) => DrawAction::Commit(shape),
                            None => DrawAction::None,
                        }
                    } else {
                        points.push(at);
                        DrawAction::None
                    }
                }
                _ => {
                    self.gesture = Gesture::PolygonCollecting {
                        points: vec![at],
                        cursor: at,
                    };
                    DrawAction::None
                }
            },
        }
    }

    /// Pointer moved; updates the live preview.
    pub fn pointer_move(&mut self, at: Point, modifiers: Modifiers) {
        if modifiers.space {
            return;
        }
        match &mut self.gesture {
            Gesture::RectanglePending { cursor, .. } => *cursor = at,
            Gesture::PolygonCollecting { cursor, .. } => *cursor = at,
            Gesture::Idle => {}
        }
    }

    /// Double click force-closes a polygon with at least 3 points,
    /// regardless of cursor position.
    pub fn double_click(&mut self, modifiers: Modifiers) -> DrawAction {
        if modifiers.space {
            return DrawAction::Pan;
        }
        if let Gesture::PolygonCollecting { points, .. } = &mut self.gesture
            && points.len() >= MIN_POLYGON_VERTICES
        {
            let closed = std::mem::take(points);
            self.gesture = Gesture::Idle;
            if let Some(shape) = Shape::polygon_from_points(closed) {
                return DrawAction::Commit(shape);
            }
        }
        DrawAction::None
    }

    /// Escape cancels the in-progress gesture with no side effects.
    pub fn cancel(&mut self) {
        if self.is_drawing() {
            log::debug!("drawing: gesture cancelled");
        }
        self.gesture = Gesture::Idle;
    }

    /// Live preview for rendering, if a gesture is in progress.
    pub fn preview(&self) -> Option<Preview> {
        match &self.gesture {
            Gesture::Idle => None,
            Gesture::RectanglePending { anchor, cursor } => Some(Preview::Rectangle {
                x: anchor.x.min(cursor.x),
                y: anchor.y.min(cursor.y),
                width: (cursor.x - anchor.x).abs(),
                height: (cursor.y - anchor.y).abs(),
            }),
            Gesture::PolygonCollecting { points, cursor } => Some(Preview::Polygon {
                points: points.clone(),
                cursor: *cursor,
                snap_to_first: points.len() >= MIN_POLYGON_VERTICES
                    && points[0].distance_to(*cursor) <= SNAP_DISTANCE,
            }),
        }
    }

    /// Route a completed rectangle: prompt mode intercepts it before the
    /// normal emit path.
    fn emit_rectangle(&mut self, shape: Shape) -> DrawAction {
        if self.prompt_mode
            && let Shape::Rectangle {
                x,
                y,
                width,
                height,
            } = shape
        {
            let prompt = PromptBox::positive(x, y, x + width, y + height);
            self.prompt_boxes.push(prompt.clone());
            return DrawAction::PromptBoxAdded(prompt);
        }
        DrawAction::Commit(shape)
    }
}
