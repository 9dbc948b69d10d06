//! Labels and label groups.

use serde::{Deserialize, Serialize};

use crate::model::{new_id, now_millis};

/// Unique identifier for a label.
pub type LabelId = String;

/// Unique identifier for a label group.
pub type LabelGroupId = String;

/// A label annotations are organized under.
///
/// Labels own nothing; annotations hold a weak `label_id` reference. When a
/// label is deleted its annotations become orphans unless the caller picks
/// a cascading [`LabelDeletionPolicy`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    /// Display name, unique per dataset and non-empty.
    pub name: String,
    /// Render color as a `#rrggbb` hex string.
    pub color: String,
    pub created_at: u64,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    /// Weak reference to a [`LabelGroup`]; cleared when the group goes away.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<LabelGroupId>,
    #[serde(default)]
    pub sort_order: u32,
}

fn default_true() -> bool {
    true
}

impl Label {
    /// Create a label with an explicit color.
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            color: color.into(),
            created_at: now_millis(),
            is_visible: true,
            group_id: None,
            sort_order: 0,
        }
    }

    /// Create a label with a palette color derived from its position.
    pub fn with_default_color(name: impl Into<String>, index: usize) -> Self {
        Self::new(name, default_label_color(index))
    }

    pub fn with_group(mut self, group_id: impl Into<LabelGroupId>) -> Self {
        self.group_id = Some(group_id.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: u32) -> Self {
        self.sort_order = sort_order;
        self
    }
}

/// An organizational bucket for labels.
///
/// Deleting a group ungroups its labels rather than deleting them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelGroup {
    pub id: LabelGroupId,
    pub name: String,
    pub created_at: u64,
    #[serde(default = "default_true")]
    pub is_visible: bool,
    #[serde(default)]
    pub sort_order: u32,
}

impl LabelGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            created_at: now_millis(),
            is_visible: true,
            sort_order: 0,
        }
    }
}

/// What happens to a label's annotations when the label is deleted.
///
/// There is deliberately no default: callers must choose, so a cascade is
/// never silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LabelDeletionPolicy {
    /// Keep the annotations; they become orphans until resolved.
    LeaveOrphaned,
    /// Delete every annotation referencing the label.
    CascadeDelete,
    /// Move the annotations to another existing label.
    Reassign(LabelId),
}

/// Pick a well-distributed default color for the `index`-th label.
///
/// Golden-angle hue stepping keeps neighboring labels visually distinct.
pub fn default_label_color(index: usize) -> String {
    let hue = (index as f32 * 137.5) % 360.0;
    let (r, g, b) = hsv_to_rgb(hue, 0.7, 0.9);
    format!(
        "#{:02x}{:02x}{:02x}",
        (r * 255.0) as u8,
        (g * 255.0) as u8,
        (b * 255.0) as u8
    )
}

/// Convert HSV to RGB (h in degrees, s and v in 0-1).
fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    (r + m, g + m, b + m)
}
