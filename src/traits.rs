use std::path::Path;

use crate::detection::DetectionResult;
use crate::errors::Result;

/// Object detection model seen by the searcher.
///
/// Lets the search loop run against a real ONNX model or a scripted test
/// double.
pub trait ObjectDetectionModel {
    /// Run detection on one image.
    ///
    /// `Ok(None)` means the model produced no result for the image. An `Err`
    /// is a failure for this image only.
    fn detect(&self, image_path: &Path) -> Result<Option<DetectionResult>>;

    /// Label for a class id; unknown ids resolve to the id as a decimal string.
    fn label_for(&self, class_id: usize) -> String;
}

impl<M: ObjectDetectionModel + ?Sized> ObjectDetectionModel for &M {
    fn detect(&self, image_path: &Path) -> Result<Option<DetectionResult>> {
        (**self).detect(image_path)
    }

    fn label_for(&self, class_id: usize) -> String {
        (**self).label_for(class_id)
    }
}
