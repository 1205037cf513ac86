use std::fmt;

/// Pixel-space location of a detected face: `(top, right, bottom, left)`.
///
/// Coordinates are in the space of the frame the detector ran on. When
/// detection runs on a downscaled working copy, [`FaceLocation::scaled`]
/// maps the location back to full-resolution frame space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceLocation {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl FaceLocation {
    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    /// Scale all four coordinates by `factor`, truncating to integer pixels.
    pub fn scaled(&self, factor: f32) -> FaceLocation {
        FaceLocation {
            top: (self.top as f32 * factor) as u32,
            right: (self.right as f32 * factor) as u32,
            bottom: (self.bottom as f32 * factor) as u32,
            left: (self.left as f32 * factor) as u32,
        }
    }

    /// Clamp the location to an image of the given dimensions.
    pub fn clamped(&self, width: u32, height: u32) -> FaceLocation {
        let max_x = width.saturating_sub(1);
        let max_y = height.saturating_sub(1);
        FaceLocation {
            top: self.top.min(max_y),
            right: self.right.min(max_x),
            bottom: self.bottom.min(max_y),
            left: self.left.min(max_x),
        }
    }
}

impl fmt::Display for FaceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.top, self.right, self.bottom, self.left
        )
    }
}

/// Face embedding vector (512-dimensional for the w600k_r50 ArcFace model).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Compute Euclidean distance to another embedding.
    ///
    /// Lower = more similar. This is the metric the match tolerance
    /// applies to.
    pub fn euclidean_distance(&self, other: &Embedding) -> f32 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b).powi(2))
            .sum::<f32>()
            .sqrt()
    }
}

/// One person's reference embeddings.
#[derive(Debug, Clone)]
pub struct KnownPerson {
    pub name: String,
    pub embeddings: Vec<Embedding>,
}

/// The set of known faces built once at startup from reference images.
///
/// Preserves insertion order: identification walks people in the order
/// they were added and the first match wins, so the order is part of the
/// matching policy.
#[derive(Debug, Clone, Default)]
pub struct KnownFaces {
    entries: Vec<KnownPerson>,
}

impl KnownFaces {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an embedding to `name`'s reference list, creating the entry
    /// on first use. A name therefore only exists once it has at least one
    /// embedding.
    pub fn add(&mut self, name: &str, embedding: Embedding) {
        match self.entries.iter_mut().find(|p| p.name == name) {
            Some(person) => person.embeddings.push(embedding),
            None => self.entries.push(KnownPerson {
                name: name.to_string(),
                embeddings: vec![embedding],
            }),
        }
    }

    /// Iterate `(name, embeddings)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Embedding])> {
        self.entries
            .iter()
            .map(|p| (p.name.as_str(), p.embeddings.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of distinct people.
    pub fn people(&self) -> usize {
        self.entries.len()
    }

    /// Total number of reference embeddings across all people.
    pub fn embedding_count(&self) -> usize {
        self.entries.iter().map(|p| p.embeddings.len()).sum()
    }
}

/// A face location paired with the name assigned to it for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct RecognitionResult {
    pub location: FaceLocation,
    pub name: String,
}

/// Name assigned when no known person passes the match tolerance.
pub const UNKNOWN_NAME: &str = "Unknown";
