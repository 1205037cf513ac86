//! UltraFace face detector via ONNX Runtime.
//!
//! Runs the version-RFB-320 UltraFace model and post-processes its output
//! with confidence thresholding and NMS. The model emits pre-decoded,
//! normalized corner boxes, so no anchor or stride decoding happens here.

use crate::types::FaceLocation;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ULTRAFACE_INPUT_WIDTH: u32 = 320;
const ULTRAFACE_INPUT_HEIGHT: u32 = 240;
const ULTRAFACE_MEAN: f32 = 127.0;
const ULTRAFACE_STD: f32 = 128.0;
const ULTRAFACE_CONFIDENCE_THRESHOLD: f32 = 0.7;
const ULTRAFACE_NMS_THRESHOLD: f32 = 0.3;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download version-RFB-320.onnx and place it in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// Normalized-coordinate detection candidate, before mapping to pixels.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    x1: f32,
    y1: f32,
    x2: f32,
    y2: f32,
}

/// UltraFace-based face detector.
pub struct UltraFaceDetector {
    session: Session,
}

impl UltraFaceDetector {
    /// Load the UltraFace ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, DetectorError> {
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(
                model_path.display().to_string(),
            ));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded UltraFace model"
        );

        Ok(Self { session })
    }

    /// Detect faces in an RGB image.
    ///
    /// Returns pixel-space locations in the coordinate system of `image`,
    /// ordered by descending confidence.
    pub fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLocation>, DetectorError> {
        let input = preprocess(image);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        // UltraFace emits two tensors: scores [1, N, 2] then boxes [1, N, 4].
        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("scores: {e}")))?;
        let (_, boxes) = outputs[1]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("boxes: {e}")))?;

        let candidates = decode(scores, boxes, ULTRAFACE_CONFIDENCE_THRESHOLD);
        let kept = nms(candidates, ULTRAFACE_NMS_THRESHOLD);

        Ok(kept
            .into_iter()
            .map(|c| to_location(&c, image.width(), image.height()))
            .collect())
    }
}

/// Resize to the model input and normalize into an NCHW float tensor.
fn preprocess(image: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(
        image,
        ULTRAFACE_INPUT_WIDTH,
        ULTRAFACE_INPUT_HEIGHT,
        image::imageops::FilterType::Triangle,
    );

    let (w, h) = (
        ULTRAFACE_INPUT_WIDTH as usize,
        ULTRAFACE_INPUT_HEIGHT as usize,
    );
    let mut tensor = Array4::<f32>::zeros((1, 3, h, w));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 - ULTRAFACE_MEAN) / ULTRAFACE_STD;
        }
    }
    tensor
}

/// Threshold the raw model output into detection candidates.
///
/// `scores` is laid out `[background, face]` per proposal; `boxes` holds
/// normalized `[x1, y1, x2, y2]` corners.
fn decode(scores: &[f32], boxes: &[f32], threshold: f32) -> Vec<Candidate> {
    let num = scores.len() / 2;
    let mut candidates = Vec::new();

    for i in 0..num {
        let score = scores[i * 2 + 1];
        if score <= threshold {
            continue;
        }
        if (i + 1) * 4 > boxes.len() {
            break;
        }
        candidates.push(Candidate {
            score,
            x1: boxes[i * 4].clamp(0.0, 1.0),
            y1: boxes[i * 4 + 1].clamp(0.0, 1.0),
            x2: boxes[i * 4 + 2].clamp(0.0, 1.0),
            y2: boxes[i * 4 + 3].clamp(0.0, 1.0),
        });
    }

    candidates
}

/// Non-Maximum Suppression: drop candidates overlapping a stronger one.
fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep: Vec<Candidate> = Vec::new();
    for candidate in candidates {
        if keep.iter().all(|k| iou(k, &candidate) <= iou_threshold) {
            keep.push(candidate);
        }
    }
    keep
}

/// Intersection-over-Union of two normalized corner boxes.
fn iou(a: &Candidate, b: &Candidate) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);

    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let area_a = (a.x2 - a.x1).max(0.0) * (a.y2 - a.y1).max(0.0);
    let area_b = (b.x2 - b.x1).max(0.0) * (b.y2 - b.y1).max(0.0);
    let union = area_a + area_b - inter;

    if union > 0.0 {
        inter / union
    } else {
        0.0
    }
}

/// Map a normalized candidate to pixel coordinates of the source image.
fn to_location(candidate: &Candidate, width: u32, height: u32) -> FaceLocation {
    let loc = FaceLocation {
        top: (candidate.y1 * height as f32) as u32,
        right: (candidate.x2 * width as f32) as u32,
        bottom: (candidate.y2 * height as f32) as u32,
        left: (candidate.x1 * width as f32) as u32,
    };
    loc.clamped(width, height)
}
