//! facewatch-core — Face detection, embedding and matching.
//!
//! Uses UltraFace for face detection and ArcFace for face embeddings,
//! both running via ONNX Runtime for CPU inference. The whole capability
//! sits behind the [`FaceEngine`] trait so callers can substitute stubs.

pub mod detector;
pub mod engine;
pub mod gallery;
pub mod recognizer;
pub mod types;

pub use detector::UltraFaceDetector;
pub use engine::{identify, EngineError, FaceEngine, OnnxFaceEngine};
pub use gallery::{load_known_faces, name_from_filename, GalleryError};
pub use recognizer::ArcFaceEmbedder;
pub use types::{Embedding, FaceLocation, KnownFaces, RecognitionResult, UNKNOWN_NAME};

use std::path::PathBuf;

/// Default directory for ONNX model files.
///
/// `FACEWATCH_MODEL_DIR` overrides; otherwise
/// `$XDG_DATA_HOME/facewatch/models` (or `~/.local/share/facewatch/models`).
pub fn default_model_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("FACEWATCH_MODEL_DIR") {
        return PathBuf::from(dir);
    }

    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("facewatch/models")
}
