//! ArcFace face embedder via ONNX Runtime.
//!
//! Extracts 512-dimensional face embeddings from bounding-box crops,
//! using the w600k_r50 ArcFace model. Crops are resized to the canonical
//! 112x112 input; no landmark alignment is performed.

use crate::types::{Embedding, FaceLocation};
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

const ARCFACE_INPUT_SIZE: u32 = 112;
const ARCFACE_MEAN: f32 = 127.5;
const ARCFACE_STD: f32 = 127.5;
const ARCFACE_EMBEDDING_DIM: usize = 512;

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("model file not found: {0} — download w600k_r50.onnx and place it in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("face location {0} has no area")]
    EmptyCrop(FaceLocation),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// ArcFace-based face embedder.
pub struct ArcFaceEmbedder {
    session: Session,
}

impl ArcFaceEmbedder {
    /// Load the ArcFace ONNX model from the given path.
    pub fn load(model_path: &Path) -> Result<Self, EmbedderError> {
        if !model_path.exists() {
            return Err(EmbedderError::ModelNotFound(
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
            "loaded ArcFace model"
        );

        Ok(Self { session })
    }

    /// Extract one embedding per location, order-aligned with `locations`.
    pub fn embed(
        &mut self,
        image: &RgbImage,
        locations: &[FaceLocation],
    ) -> Result<Vec<Embedding>, EmbedderError> {
        locations
            .iter()
            .map(|loc| self.embed_one(image, loc))
            .collect()
    }

    fn embed_one(
        &mut self,
        image: &RgbImage,
        location: &FaceLocation,
    ) -> Result<Embedding, EmbedderError> {
        let crop = crop_face(image, location).ok_or(EmbedderError::EmptyCrop(*location))?;
        let input = preprocess(&crop);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, raw) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbedderError::InferenceFailed(format!("embedding extraction: {e}")))?;

        if raw.len() != ARCFACE_EMBEDDING_DIM {
            return Err(EmbedderError::InferenceFailed(format!(
                "expected {ARCFACE_EMBEDDING_DIM}-dim embedding, got {}",
                raw.len()
            )));
        }

        Ok(Embedding {
            values: l2_normalize(raw),
        })
    }
}

/// Crop the face region, clamped to image bounds. `None` if the clamped
/// region has no area.
fn crop_face(image: &RgbImage, location: &FaceLocation) -> Option<RgbImage> {
    let loc = location.clamped(image.width(), image.height());
    let w = loc.width();
    let h = loc.height();
    if w == 0 || h == 0 {
        return None;
    }
    Some(image::imageops::crop_imm(image, loc.left, loc.top, w, h).to_image())
}

/// Resize a face crop to 112x112 and normalize into an NCHW float tensor.
fn preprocess(crop: &RgbImage) -> Array4<f32> {
    let resized = image::imageops::resize(
        crop,
        ARCFACE_INPUT_SIZE,
        ARCFACE_INPUT_SIZE,
        image::imageops::FilterType::Triangle,
    );

    let size = ARCFACE_INPUT_SIZE as usize;
    let mut tensor = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel[c] as f32 - ARCFACE_MEAN) / ARCFACE_STD;
        }
    }
    tensor
}

/// Scale a raw embedding to unit length. Zero vectors pass through.
fn l2_normalize(raw: &[f32]) -> Vec<f32> {
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        raw.iter().map(|x| x / norm).collect()
    } else {
        raw.to_vec()
    }
}
