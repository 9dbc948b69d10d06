//! Interactive canvas controllers: drawing gestures and selection editing.

mod drawing;
mod editing;

pub use drawing::{DrawAction, DrawingController, Modifiers, Preview, Tool};
pub use editing::{EditingController, RectHandle};
