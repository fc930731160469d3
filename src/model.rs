use std::path::{Path, PathBuf};

use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use ndarray::prelude::*;
use nshare::AsNdarray3;
use ort::session::{builder::SessionBuilder, Session};
use ort::value::TensorRef;
use parking_lot::Mutex;

use crate::{
    detection::{BoundingBox, Detection, DetectionResult},
    errors::{Result, SearchError},
    labels::LabelTable,
    traits::ObjectDetectionModel,
};

/// Input size used when the model declares a dynamic spatial dimension.
pub const DEFAULT_INPUT_SIZE: u32 = 640;
pub const IOU_THRESHOLD: f32 = 0.7;
pub const MAX_DETECTIONS: usize = 300;
const PAD_VALUE: u8 = 114;

/// YOLO detector exported to ONNX, run through ONNX Runtime.
pub struct YoloModel {
    pub image_size: u32,
    confidence_threshold: f32,
    labels: LabelTable,
    input_name: String,
    output_name: String,
    session: Mutex<Session>,
}

impl YoloModel {
    /// Load the model named by `identifier`.
    ///
    /// A `.pt` checkpoint name resolves to the `.onnx` export next to it.
    pub fn new(identifier: &str, confidence_threshold: f32) -> Result<Self> {
        let model_path = resolve_model_path(identifier);
        if !model_path.is_file() {
            return Err(SearchError::model(
                format!("model lookup: {}", model_path.display()),
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "model file does not exist",
                ),
            ));
        }

        let session = SessionBuilder::new()
            .map_err(|e| SearchError::model("session builder initialisation", e))?
            .commit_from_file(&model_path)
            .map_err(|e| {
                SearchError::model(format!("model loading: {}", model_path.display()), e)
            })?;

        let input = session.inputs.first().ok_or_else(|| {
            SearchError::model(
                "model input lookup",
                "model declares no inputs".to_string(),
            )
        })?;
        let input_name = input.name.clone();
        let image_size =
            square_input_size(input.input_type.tensor_shape().map(|shape| &shape[..]))?;

        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| {
                SearchError::model(
                    "model output lookup",
                    "model declares no outputs".to_string(),
                )
            })?;

        let labels = load_labels(&session);

        tracing::debug!(
            "Loaded model {} (input {input_name:?} {image_size}x{image_size}, output {output_name:?}, {} classes)",
            model_path.display(),
            labels.len()
        );

        Ok(Self {
            image_size,
            confidence_threshold,
            labels,
            input_name,
            output_name,
            session: Mutex::new(session),
        })
    }
}

impl ObjectDetectionModel for YoloModel {
    fn detect(&self, image_path: &Path) -> Result<Option<DetectionResult>> {
        let image = image::open(image_path)
            .map_err(|e| SearchError::detection(image_path, "image decoding", e))?
            .into_rgb8();
        if image.width() == 0 || image.height() == 0 {
            return Err(SearchError::detection(
                image_path,
                "image decoding",
                "image has no pixels".to_string(),
            ));
        }

        let (tensor, letterbox) = preprocess(&image, self.image_size);

        let mut binding = self.session.lock();
        let outputs = binding
            .run(ort::inputs![
                self.input_name.as_str() => TensorRef::from_array_view(&tensor.as_standard_layout())
                    .map_err(|e| SearchError::detection(image_path, "input tensor creation", e))?
            ])
            .map_err(|e| SearchError::detection(image_path, "inference", e))?;

        let output = outputs[self.output_name.as_str()].try_extract_array::<f32>();

        Ok(Some(decode_output(
            output,
            &letterbox,
            self.confidence_threshold,
        )))
    }

    fn label_for(&self, class_id: usize) -> String {
        self.labels.label_for(class_id)
    }
}

/// Map a model identifier to the file ONNX Runtime should load.
pub fn resolve_model_path(identifier: &str) -> PathBuf {
    let path = PathBuf::from(identifier);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pt") => path.with_extension("onnx"),
        _ => path,
    }
}

/// Side length of the square NCHW input declared by the model.
///
/// Dynamic dimensions fall back to [`DEFAULT_INPUT_SIZE`]; a fixed
/// rectangular input is rejected.
fn square_input_size(shape: Option<&[i64]>) -> Result<u32> {
    let dim = |axis: usize| {
        shape
            .and_then(|shape| shape.get(axis).copied())
            .filter(|&dim| dim > 0)
    };

    match (dim(2), dim(3)) {
        (Some(height), Some(width)) if height != width => Err(SearchError::model(
            "model input lookup",
            format!("rectangular input {height}x{width} is not supported, export with a square imgsz"),
        )),
        (Some(size), _) | (None, Some(size)) => u32::try_from(size).map_err(|_| {
            SearchError::model("model input lookup", format!("input size {size} out of range"))
        }),
        (None, None) => Ok(DEFAULT_INPUT_SIZE),
    }
}

fn load_labels(session: &Session) -> LabelTable {
    let names = session
        .metadata()
        .and_then(|metadata| metadata.custom("names"));

    match names {
        Ok(Some(text)) => LabelTable::parse_metadata(&text).unwrap_or_else(|err| {
            tracing::warn!("Ignoring class names in model metadata: {err}; using COCO labels");
            LabelTable::coco()
        }),
        Ok(None) => {
            tracing::debug!("Model metadata has no class names; using COCO labels");
            LabelTable::coco()
        }
        Err(err) => {
            tracing::warn!("Could not read model metadata: {err}; using COCO labels");
            LabelTable::coco()
        }
    }
}

/// Geometry of an aspect-preserving resize into a square, centered canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub resized_width: u32,
    pub resized_height: u32,
    pub pad_x: u32,
    pub pad_y: u32,
    pub width: u32,
    pub height: u32,
}

impl Letterbox {
    pub fn fit(width: u32, height: u32, size: u32) -> Self {
        let scale = (size as f32 / width as f32).min(size as f32 / height as f32);
        let resized_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let resized_height = ((height as f32 * scale).round() as u32).clamp(1, size);

        Self {
            scale,
            resized_width,
            resized_height,
            pad_x: (size - resized_width) / 2,
            pad_y: (size - resized_height) / 2,
            width,
            height,
        }
    }

    /// Map a box from model input space back onto the original image.
    pub fn restore(&self, bbox: BoundingBox) -> BoundingBox {
        let (pad_x, pad_y) = (self.pad_x as f32, self.pad_y as f32);
        let (width, height) = (self.width as f32, self.height as f32);

        BoundingBox {
            x1: ((bbox.x1 - pad_x) / self.scale).clamp(0.0, width),
            y1: ((bbox.y1 - pad_y) / self.scale).clamp(0.0, height),
            x2: ((bbox.x2 - pad_x) / self.scale).clamp(0.0, width),
            y2: ((bbox.y2 - pad_y) / self.scale).clamp(0.0, height),
        }
    }
}

/// Letterbox an RGB image into an NCHW tensor scaled to `[0, 1]`.
pub fn preprocess(image: &RgbImage, image_size: u32) -> (Array4<f32>, Letterbox) {
    let (width, height) = image.dimensions();
    let letterbox = Letterbox::fit(width, height, image_size);

    let resized = imageops::resize(
        image,
        letterbox.resized_width,
        letterbox.resized_height,
        FilterType::Triangle,
    );
    let mut canvas = RgbImage::from_pixel(image_size, image_size, Rgb([PAD_VALUE; 3]));
    imageops::overlay(
        &mut canvas,
        &resized,
        letterbox.pad_x.into(),
        letterbox.pad_y.into(),
    );

    let tensor = canvas
        .as_ndarray3()
        .slice_move(s![NewAxis, .., .., ..])
        .mapv(|v| f32::from(v) / 255.0);

    (tensor, letterbox)
}

/// Decode a `[1, 4 + classes, anchors]` YOLO output into detections.
///
/// Outputs of any other layout are reported as malformed rather than as an
/// error.
pub fn decode_predictions(
    output: ArrayViewD<f32>,
    letterbox: &Letterbox,
    confidence_threshold: f32,
) -> DetectionResult {
    let shape = output.shape().to_vec();
    let output = match output.into_dimensionality::<Ix3>() {
        Ok(output) if shape[0] > 0 && shape[1] > 4 => output,
        _ => return DetectionResult::malformed(format!("unexpected output shape {shape:?}")),
    };

    let predictions = output.index_axis(Axis(0), 0);
    let mut candidates = Vec::new();
    for anchor in predictions.axis_iter(Axis(1)) {
        let (class_id, confidence) = anchor
            .slice(s![4..])
            .iter()
            .copied()
            .enumerate()
            .fold((0, f32::NEG_INFINITY), |best, (id, score)| {
                if score > best.1 {
                    (id, score)
                } else {
                    best
                }
            });
        if confidence.is_nan() || confidence <= confidence_threshold {
            continue;
        }

        let bbox = BoundingBox::from_center(anchor[0], anchor[1], anchor[2], anchor[3]);
        candidates.push(Detection {
            class_id,
            confidence,
            bbox: letterbox.restore(bbox),
        });
    }

    DetectionResult::Detections(non_max_suppression(
        candidates,
        IOU_THRESHOLD,
        MAX_DETECTIONS,
    ))
}

/// Decode an extracted output tensor.
///
/// An output that cannot be read as `f32` counts as malformed, like any
/// other unexpected layout.
fn decode_output<E: std::fmt::Display>(
    output: std::result::Result<ArrayViewD<'_, f32>, E>,
    letterbox: &Letterbox,
    confidence_threshold: f32,
) -> DetectionResult {
    match output {
        Ok(output) => decode_predictions(output, letterbox, confidence_threshold),
        Err(err) => DetectionResult::malformed(format!("output extraction: {err}")),
    }
}

/// Greedy per-class non-maximum suppression, highest confidence first.
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<Detection> {
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::new();
    for candidate in detections {
        if kept.len() >= max_detections {
            break;
        }
        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && k.bbox.iou(&candidate.bbox) > iou_threshold
        });
        if !suppressed {
            kept.push(candidate);
        }
    }
    kept
}
