//! The face capability boundary: detection, embedding and comparison.
//!
//! The recognition loop and the gallery loader only ever talk to the
//! [`FaceEngine`] trait, so both can be exercised with stub engines in
//! tests. [`OnnxFaceEngine`] is the production implementation, combining
//! the UltraFace detector with the ArcFace embedder.

use crate::detector::{DetectorError, UltraFaceDetector};
use crate::recognizer::{ArcFaceEmbedder, EmbedderError};
use crate::types::{Embedding, FaceLocation, KnownFaces};
use image::RgbImage;
use std::path::Path;
use thiserror::Error;

/// File name of the detection model inside the model directory.
pub const DETECTOR_MODEL_FILE: &str = "version-RFB-320.onnx";
/// File name of the embedding model inside the model directory.
pub const EMBEDDER_MODEL_FILE: &str = "w600k_r50.onnx";

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("detector error: {0}")]
    Detector(#[from] DetectorError),
    #[error("embedder error: {0}")]
    Embedder(#[from] EmbedderError),
}

/// Opaque face detection, embedding and comparison capability.
pub trait FaceEngine {
    /// Locate faces in an image.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLocation>, EngineError>;

    /// Extract one embedding per location, order-aligned with `locations`.
    fn embed(
        &mut self,
        image: &RgbImage,
        locations: &[FaceLocation],
    ) -> Result<Vec<Embedding>, EngineError>;

    /// For each reference embedding, whether `candidate` lies within
    /// `tolerance` Euclidean distance. Lower tolerance is stricter.
    fn compare(
        &self,
        references: &[Embedding],
        candidate: &Embedding,
        tolerance: f32,
    ) -> Vec<bool> {
        references
            .iter()
            .map(|r| r.euclidean_distance(candidate) <= tolerance)
            .collect()
    }
}

/// Assign a name to a candidate embedding.
///
/// Walks known people in insertion order and returns the first whose
/// reference set contains at least one match. First match wins; this is a
/// tie-break policy, not a best-match search.
pub fn identify<'a, E>(
    engine: &E,
    known: &'a KnownFaces,
    candidate: &Embedding,
    tolerance: f32,
) -> Option<&'a str>
where
    E: FaceEngine + ?Sized,
{
    known
        .iter()
        .find(|(_, references)| {
            engine
                .compare(references, candidate, tolerance)
                .into_iter()
                .any(|matched| matched)
        })
        .map(|(name, _)| name)
}

/// Production engine: UltraFace detection plus ArcFace embeddings.
pub struct OnnxFaceEngine {
    detector: UltraFaceDetector,
    embedder: ArcFaceEmbedder,
}

impl OnnxFaceEngine {
    /// Load both ONNX models from `model_dir`.
    pub fn load(model_dir: &Path) -> Result<Self, EngineError> {
        let detector = UltraFaceDetector::load(&model_dir.join(DETECTOR_MODEL_FILE))?;
        let embedder = ArcFaceEmbedder::load(&model_dir.join(EMBEDDER_MODEL_FILE))?;
        Ok(Self { detector, embedder })
    }
}

impl FaceEngine for OnnxFaceEngine {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLocation>, EngineError> {
        Ok(self.detector.detect(image)?)
    }

    fn embed(
        &mut self,
        image: &RgbImage,
        locations: &[FaceLocation],
    ) -> Result<Vec<Embedding>, EngineError> {
        Ok(self.embedder.embed(image, locations)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubEngine;

    impl FaceEngine for StubEngine {
        fn detect(&mut self, _image: &RgbImage) -> Result<Vec<FaceLocation>, EngineError> {
            Ok(Vec::new())
        }

        fn embed(
            &mut self,
            _image: &RgbImage,
            _locations: &[FaceLocation],
        ) -> Result<Vec<Embedding>, EngineError> {
            Ok(Vec::new())
        }
    }

    fn embedding(values: &[f32]) -> Embedding {
        Embedding {
            values: values.to_vec(),
        }
    }

    #[test]
    fn test_compare_within_tolerance() {
        let engine = StubEngine;
        let references = vec![embedding(&[0.0, 0.0]), embedding(&[1.0, 0.0])];
        let candidate = embedding(&[0.5, 0.0]);

        let matches = engine.compare(&references, &candidate, 0.6);
        assert_eq!(matches, vec![true, true]);

        let matches = engine.compare(&references, &candidate, 0.4);
        assert_eq!(matches, vec![false, false]);
    }

    #[test]
    fn test_identify_first_match_wins() {
        // Candidate matches both alice and bob; alice was inserted first,
        // so alice is assigned.
        let mut known = KnownFaces::new();
        known.add("alice", embedding(&[0.0, 0.0]));
        known.add("bob", embedding(&[0.1, 0.0]));

        let candidate = embedding(&[0.05, 0.0]);
        let name = identify(&StubEngine, &known, &candidate, 0.6);
        assert_eq!(name, Some("alice"));
    }

    #[test]
    fn test_identify_skips_non_matching_people() {
        let mut known = KnownFaces::new();
        known.add("alice", embedding(&[10.0, 10.0]));
        known.add("bob", embedding(&[0.0, 0.0]));

        let candidate = embedding(&[0.1, 0.0]);
        let name = identify(&StubEngine, &known, &candidate, 0.6);
        assert_eq!(name, Some("bob"));
    }

    #[test]
    fn test_identify_no_match() {
        let mut known = KnownFaces::new();
        known.add("alice", embedding(&[10.0, 10.0]));

        let candidate = embedding(&[0.0, 0.0]);
        assert_eq!(identify(&StubEngine, &known, &candidate, 0.6), None);
    }

    #[test]
    fn test_identify_any_reference_suffices() {
        // Second of bob's two references matches.
        let mut known = KnownFaces::new();
        known.add("bob", embedding(&[5.0, 5.0]));
        known.add("bob", embedding(&[0.0, 0.0]));

        let candidate = embedding(&[0.1, 0.0]);
        assert_eq!(identify(&StubEngine, &known, &candidate, 0.6), Some("bob"));
    }
}
