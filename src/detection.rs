use crate::errors::{Result, SearchError};

/// Axis-aligned box in original image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    /// Build from a center point and size.
    pub fn from_center(cx: f32, cy: f32, w: f32, h: f32) -> Self {
        Self {
            x1: cx - w / 2.0,
            y1: cy - h / 2.0,
            x2: cx + w / 2.0,
            y2: cy + h / 2.0,
        }
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    pub fn iou(&self, other: &Self) -> f32 {
        let w = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let h = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = w * h;
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            0.0
        } else {
            intersection / union
        }
    }
}

/// One object located by the model.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub class_id: usize,
    pub confidence: f32,
    pub bbox: BoundingBox,
}

impl Detection {
    /// Detection with only a class id, for callers that do not care about geometry.
    pub fn of_class(class_id: usize) -> Self {
        Self {
            class_id,
            confidence: 1.0,
            bbox: BoundingBox {
                x1: 0.0,
                y1: 0.0,
                x2: 0.0,
                y2: 0.0,
            },
        }
    }
}

/// Per-image model output.
///
/// `Malformed` carries raw output the model could not decode into detections.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionResult {
    Detections(Vec<Detection>),
    Malformed { reason: String },
}

impl DetectionResult {
    pub fn from_class_ids(class_ids: impl IntoIterator<Item = usize>) -> Self {
        Self::Detections(class_ids.into_iter().map(Detection::of_class).collect())
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }

    /// Class ids of every detected instance, in model order.
    pub fn class_ids(&self) -> Result<Vec<usize>> {
        match self {
            Self::Detections(detections) => Ok(detections.iter().map(|d| d.class_id).collect()),
            Self::Malformed { reason } => Err(SearchError::Extraction {
                reason: reason.clone(),
            }),
        }
    }
}
