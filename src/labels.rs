//! Class id to label lookup for a loaded model.
//!
//! YOLO exports store their class names in the ONNX custom metadata entry
//! `names`, written as Python literal text: either a dict
//! (`{0: 'person', 1: 'bicycle'}`) or a list (`['person', 'bicycle']`).

use std::collections::BTreeMap;

use crate::errors::{Result, SearchError};

/// The 80 COCO classes YOLO checkpoints are trained on by default.
pub const COCO_LABELS: [&str; 80] = [
    "person", "bicycle", "car", "motorcycle", "airplane", "bus", "train", "truck", "boat",
    "traffic light", "fire hydrant", "stop sign", "parking meter", "bench", "bird", "cat", "dog",
    "horse", "sheep", "cow", "elephant", "bear", "zebra", "giraffe", "backpack", "umbrella",
    "handbag", "tie", "suitcase", "frisbee", "skis", "snowboard", "sports ball", "kite",
    "baseball bat", "baseball glove", "skateboard", "surfboard", "tennis racket", "bottle",
    "wine glass", "cup", "fork", "knife", "spoon", "bowl", "banana", "apple", "sandwich", "orange",
    "broccoli", "carrot", "hot dog", "pizza", "donut", "cake", "chair", "couch", "potted plant",
    "bed", "dining table", "toilet", "tv", "laptop", "mouse", "remote", "keyboard", "cell phone",
    "microwave", "oven", "toaster", "sink", "refrigerator", "book", "clock", "vase", "scissors",
    "teddy bear", "hair drier", "toothbrush",
];

/// Read-only class id to label mapping.
///
/// Lookups never fail: an id missing from the table resolves to its decimal
/// string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    names: BTreeMap<usize, String>,
}

impl LabelTable {
    pub fn from_sequence<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            names: labels
                .into_iter()
                .enumerate()
                .map(|(id, label)| (id, label.into()))
                .collect(),
        }
    }

    pub fn from_mapping<S: Into<String>>(labels: impl IntoIterator<Item = (usize, S)>) -> Self {
        Self {
            names: labels
                .into_iter()
                .map(|(id, label)| (id, label.into()))
                .collect(),
        }
    }

    pub fn coco() -> Self {
        Self::from_sequence(COCO_LABELS)
    }

    /// Parse the `names` metadata text of a YOLO ONNX export.
    ///
    /// Both literal forms are valid YAML flow collections.
    pub fn parse_metadata(text: &str) -> Result<Self> {
        match serde_yaml::from_str::<BTreeMap<usize, String>>(text) {
            Ok(names) => Ok(Self { names }),
            Err(err) => serde_yaml::from_str::<Vec<String>>(text)
                .map(Self::from_sequence)
                .map_err(|_| SearchError::model("class names metadata parsing", err)),
        }
    }

    pub fn label_for(&self, class_id: usize) -> String {
        self.names
            .get(&class_id)
            .cloned()
            .unwrap_or_else(|| class_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
