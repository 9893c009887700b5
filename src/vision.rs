use crate::frame::{Frame, Mask};
use crate::Detection;

/// Output of one foreground analysis pass.
#[derive(Debug, Clone)]
pub struct Detections {
    /// Same dimensions as the analysed frame.
    pub mask: Mask,
    pub centroids: Vec<Detection>,
}

/// Foreground segmentation and blob detection, supplied by the embedding
/// program.
///
/// Implementations keep their own background model and must be deterministic
/// for a given model state and input frame.
pub trait VisionService {
    fn detect(&mut self, frame: &Frame) -> Detections;
}

impl<V: VisionService + ?Sized> VisionService for Box<V> {
    #[inline]
    fn detect(&mut self, frame: &Frame) -> Detections {
        (**self).detect(frame)
    }
}
