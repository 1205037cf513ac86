//! Known-face gallery: reference images loaded from a directory.
//!
//! Images are named `<name>_<id>.<ext>`; everything before the final
//! underscore is the person's name, so one person may have several
//! reference images (`mary_jane_01.png`, `mary_jane_02.png`). A file that
//! fails to load or contains no detectable face is logged and skipped;
//! only a failure to read the directory itself aborts the scan.

use crate::engine::{EngineError, FaceEngine};
use crate::types::{Embedding, KnownFaces};
use std::path::Path;
use thiserror::Error;

/// Image extensions the gallery accepts, matched case-insensitively.
const SUPPORTED_EXTENSIONS: [&str; 2] = ["jpg", "png"];

#[derive(Error, Debug)]
pub enum GalleryError {
    #[error("failed to read faces directory {path}: {source}")]
    ReadDir {
        path: String,
        source: std::io::Error,
    },
}

/// Per-file failures, recovered by skipping the file.
#[derive(Error, Debug)]
enum LoadError {
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Derive a person's name from an image filename.
///
/// Drops the final underscore-delimited segment of the stem: `alice_1.jpg`
/// → `alice`, `mary_jane_02.png` → `mary_jane`. A stem with no underscore
/// is returned whole.
pub fn name_from_filename(filename: &str) -> String {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| filename.to_string());

    match stem.rfind('_') {
        Some(idx) => stem[..idx].to_string(),
        None => stem,
    }
}

fn is_face_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Scan `dir` and build the known-face set.
///
/// Entries are processed in filename order so the insertion order of the
/// result (and with it the first-match tie-break) is deterministic. The
/// returned set may be empty; callers must treat that as fatal before
/// opening the camera.
pub fn load_known_faces<E: FaceEngine>(
    dir: &Path,
    engine: &mut E,
) -> Result<KnownFaces, GalleryError> {
    let entries = std::fs::read_dir(dir).map_err(|source| GalleryError::ReadDir {
        path: dir.display().to_string(),
        source,
    })?;

    let mut paths: Vec<_> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_face_image(path))
        .collect();
    paths.sort();

    let mut known = KnownFaces::new();

    for path in paths {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = name_from_filename(&filename);

        tracing::info!(path = %path.display(), "processing reference image");

        match load_one(&path, engine) {
            Ok(Some(embedding)) => {
                known.add(&name, embedding);
                tracing::info!(name = %name, "encoded reference face");
            }
            Ok(None) => {
                tracing::warn!(file = %filename, "no face found in reference image, skipping");
            }
            Err(e) => {
                tracing::warn!(file = %filename, error = %e, "failed to process reference image, skipping");
            }
        }
    }

    Ok(known)
}

/// Load one image and extract the first face's embedding, if any.
fn load_one<E: FaceEngine>(path: &Path, engine: &mut E) -> Result<Option<Embedding>, LoadError> {
    let image = image::open(path)?.to_rgb8();

    let locations = engine.detect(&image)?;
    let Some(first) = locations.first() else {
        return Ok(None);
    };

    let embeddings = engine.embed(&image, std::slice::from_ref(first))?;
    Ok(embeddings.into_iter().next())
}
