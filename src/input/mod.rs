//! Problem input producers
//!
//! Three interchangeable sources of a problem: typed text, an uploaded image,
//! and a freehand drawing. Image-bearing producers normalise to [`ImageData`].

pub mod draw;
pub mod image;
pub mod text;

pub use self::draw::{DrawCanvas, Point, Sketch};
pub use self::image::ImageInput;
pub use self::text::TextInput;

use crate::models::ImageData;
use crate::Result;

/// Pull handle over a drawing surface.
///
/// Read once at submit time rather than mirrored on every stroke.
pub trait CanvasSource {
    /// Current contents as an encoded image, or `None` when nothing is drawn.
    fn canvas_data(&self) -> Result<Option<ImageData>>;
}
