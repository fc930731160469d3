use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use crate::config::TargetLabels;
use crate::detection::DetectionResult;
use crate::traits::ObjectDetectionModel;

/// Matching labels for one image, sorted and deduplicated.
pub type MatchSet = BTreeSet<String>;

/// An image with at least one detected target label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageMatch {
    pub path: PathBuf,
    pub labels: MatchSet,
}

/// Formats as the report line `<path>: <label>, <label>`.
impl fmt::Display for ImageMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.path.display())?;
        for (i, label) in self.labels.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(label)?;
        }
        Ok(())
    }
}

/// Intersects detected labels with the target set.
#[derive(Debug, Clone)]
pub struct LabelMatcher {
    targets: TargetLabels,
}

impl LabelMatcher {
    pub const fn new(targets: TargetLabels) -> Self {
        Self { targets }
    }

    /// Collect the labels of `result` that are in the target set.
    ///
    /// Labels keep the casing the model reports. A malformed result counts
    /// as no detections.
    pub fn match_labels<M: ObjectDetectionModel>(
        &self,
        result: &DetectionResult,
        model: &M,
    ) -> MatchSet {
        let class_ids = match result.class_ids() {
            Ok(ids) => ids,
            Err(err) => {
                tracing::debug!("Treating result as empty: {err}");
                return MatchSet::new();
            }
        };

        class_ids
            .into_iter()
            .map(|class_id| model.label_for(class_id))
            .filter(|label| self.targets.contains(label))
            .collect()
    }
}
