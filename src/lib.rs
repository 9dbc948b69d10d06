//! imagemark - image annotation core
//!
//! The host-independent core of an image annotation tool: geometry and
//! view transforms, drawing and editing controllers, per-image undo/redo,
//! storage, AI segmentation ingestion and dataset import/export.

pub mod canvas;
pub mod constants;
mod error;
pub mod formats;
pub mod geometry;
pub mod history;
pub mod model;
pub mod segmentation;
pub mod store;
mod workspace;

pub use error::{Error, Result};
pub use workspace::{AutoAnnotateStatus, Workspace};
