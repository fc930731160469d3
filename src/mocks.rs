use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::detection::DetectionResult;
use crate::errors::{Result, SearchError};
use crate::labels::LabelTable;
use crate::traits::ObjectDetectionModel;

/// Scripted outcome for one image.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Result(DetectionResult),
    NoResult,
    Fail(String),
}

/// Test model that answers by image file name.
///
/// Images without a scripted outcome produce an empty detection list. Every
/// call is recorded so tests can check what was invoked.
#[derive(Debug, Default)]
pub struct MockDetectionModel {
    labels: LabelTable,
    outcomes: HashMap<String, MockOutcome>,
    calls: Mutex<Vec<PathBuf>>,
}

impl MockDetectionModel {
    pub fn new(labels: LabelTable) -> Self {
        Self {
            labels,
            ..Self::default()
        }
    }

    pub fn with_outcome(mut self, file_name: &str, outcome: MockOutcome) -> Self {
        self.outcomes.insert(file_name.to_string(), outcome);
        self
    }

    pub fn with_class_ids(self, file_name: &str, class_ids: &[usize]) -> Self {
        self.with_outcome(
            file_name,
            MockOutcome::Result(DetectionResult::from_class_ids(class_ids.iter().copied())),
        )
    }

    pub fn calls(&self) -> Vec<PathBuf> {
        self.calls.lock().clone()
    }
}

impl ObjectDetectionModel for MockDetectionModel {
    fn detect(&self, image_path: &Path) -> Result<Option<DetectionResult>> {
        self.calls.lock().push(image_path.to_path_buf());

        let file_name = image_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match self.outcomes.get(&file_name) {
            Some(MockOutcome::Result(result)) => Ok(Some(result.clone())),
            Some(MockOutcome::NoResult) => Ok(None),
            Some(MockOutcome::Fail(message)) => Err(SearchError::detection(
                image_path,
                "mock inference",
                message.clone(),
            )),
            None => Ok(Some(DetectionResult::Detections(Vec::new()))),
        }
    }

    fn label_for(&self, class_id: usize) -> String {
        self.labels.label_for(class_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_outcomes() -> Result<()> {
        let mock = MockDetectionModel::new(LabelTable::coco())
            .with_class_ids("cat.jpg", &[15])
            .with_outcome("none.jpg", MockOutcome::NoResult)
            .with_outcome("broken.jpg", MockOutcome::Fail("boom".into()));

        assert_eq!(
            mock.detect(Path::new("dir/cat.jpg"))?,
            Some(DetectionResult::from_class_ids([15]))
        );
        assert_eq!(mock.detect(Path::new("none.jpg"))?, None);
        assert!(mock.detect(Path::new("broken.jpg")).is_err());
        assert_eq!(
            mock.detect(Path::new("other.png"))?,
            Some(DetectionResult::Detections(vec![]))
        );
        assert_eq!(mock.calls().len(), 4);
        assert_eq!(mock.label_for(15), "cat");
        Ok(())
    }
}
