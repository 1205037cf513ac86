//! Frame type and pixel utilities: YUYV conversion and aspect-preserving
//! resize.

use image::RgbImage;

/// A captured RGB24 camera frame.
#[derive(Clone)]
pub struct Frame {
    /// Packed RGB pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Convert the frame into an [`RgbImage`]. `None` if the buffer does
    /// not match the stated dimensions.
    pub fn into_image(self) -> Option<RgbImage> {
        RgbImage::from_raw(self.width, self.height, self.data)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid YUYV length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("YUYV needs an even pixel count, got {0}")]
    OddPixelCount(usize),
}

/// Convert packed YUYV (4:2:2) to RGB24 using BT.601 coefficients.
///
/// YUYV packs two pixels per 4 bytes: [Y0, U, Y1, V], with chroma shared
/// between the pixel pair. The pixel count must therefore be even, or the
/// output buffer could not match the stated dimensions.
pub fn yuyv_to_rgb(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, FrameError> {
    let pixels = (width * height) as usize;
    if pixels % 2 != 0 {
        return Err(FrameError::OddPixelCount(pixels));
    }

    let expected = pixels * 2;
    if yuyv.len() < expected {
        return Err(FrameError::InvalidLength {
            expected,
            actual: yuyv.len(),
        });
    }

    let mut rgb = Vec::with_capacity((width * height * 3) as usize);
    for chunk in yuyv[..expected].chunks_exact(4) {
        let u = chunk[1] as f32 - 128.0;
        let v = chunk[3] as f32 - 128.0;
        for &y in &[chunk[0], chunk[2]] {
            let y = y as f32;
            let r = y + 1.402 * v;
            let g = y - 0.344 * u - 0.714 * v;
            let b = y + 1.772 * u;
            rgb.push(r.round().clamp(0.0, 255.0) as u8);
            rgb.push(g.round().clamp(0.0, 255.0) as u8);
            rgb.push(b.round().clamp(0.0, 255.0) as u8);
        }
    }
    Ok(rgb)
}

/// Resize an image to a target width or height, preserving aspect ratio.
///
/// The two targets are mutually exclusive; when both are given the width
/// wins. With neither, the input is returned unchanged.
pub fn resize_frame(image: &RgbImage, width: Option<u32>, height: Option<u32>) -> RgbImage {
    let (w, h) = (image.width(), image.height());

    let (new_w, new_h) = match (width, height) {
        (None, None) => return image.clone(),
        (Some(target), _) => {
            let ratio = target as f32 / w as f32;
            (target, ((h as f32 * ratio) as u32).max(1))
        }
        (None, Some(target)) => {
            let ratio = target as f32 / h as f32;
            (((w as f32 * ratio) as u32).max(1), target)
        }
    };

    image::imageops::resize(image, new_w, new_h, image::imageops::FilterType::Triangle)
}
