use crate::errors::Result;
use crate::mask::{SegmentationResult, SourceImage};

/// Inference engine abstraction.
///
/// The session depends on this trait rather than on the ONNX implementation,
/// so tests can drive it with a scripted engine.
pub trait SegmentationEngine: Send + Sync {
    /// Run the model over one image. Blocking; the session moves the call off
    /// the caller's thread.
    fn segment(&self, image: &SourceImage) -> Result<SegmentationResult>;

    /// Square input size the model expects.
    fn get_image_size(&self) -> u32;
}

/// Somewhere to put the outcome of an analysis.
pub trait DisplaySurface {
    fn show_image(&mut self, image: &SourceImage) -> Result<()>;

    fn show_text(&mut self, text: &str) -> Result<()>;
}
