//! Face overlay drawing: bounding rectangle plus a filled name label
//! strip above it.

use ab_glyph::{FontVec, PxScale};
use facewatch_core::FaceLocation;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;

const LABEL_FONT_SIZE: f32 = 18.0;
const LABEL_STRIP_HEIGHT: u32 = 24;
const LABEL_TEXT_INSET_X: i32 = 6;
const LABEL_TEXT_INSET_Y: i32 = 3;
const BORDER_THICKNESS: u32 = 2;

/// Default box/label color for recognized and unknown faces alike.
pub const FACE_BOX_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
const LABEL_TEXT_COLOR: Rgb<u8> = Rgb([255, 255, 255]);

/// Candidate system fonts for label text, tried in order.
const FONT_PATHS: [&str; 4] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
];

/// Overlay renderer. Holds the label font, discovered once at startup;
/// without a usable system font the label strip is drawn without text.
pub struct Overlay {
    font: Option<FontVec>,
}

impl Overlay {
    pub fn new() -> Self {
        let font = FONT_PATHS.iter().find_map(|path| {
            let data = std::fs::read(path).ok()?;
            FontVec::try_from_vec(data).ok()
        });

        if font.is_none() {
            tracing::warn!("no usable system font found; name labels will be drawn without text");
        }

        Self { font }
    }

    /// Draw a face rectangle and its name label onto `frame` in place.
    ///
    /// The label strip sits immediately above the rectangle and is clipped
    /// at the frame's top edge.
    pub fn draw(&self, frame: &mut RgbImage, location: &FaceLocation, name: &str, color: Rgb<u8>) {
        let loc = location.clamped(frame.width(), frame.height());
        let w = loc.width();
        let h = loc.height();
        if w == 0 || h == 0 {
            return;
        }

        for t in 0..BORDER_THICKNESS {
            if w + 1 <= 2 * t || h + 1 <= 2 * t {
                break;
            }
            let rect = Rect::at((loc.left + t) as i32, (loc.top + t) as i32)
                .of_size(w + 1 - 2 * t, h + 1 - 2 * t);
            draw_hollow_rect_mut(frame, rect, color);
        }

        let strip_top = loc.top.saturating_sub(LABEL_STRIP_HEIGHT);
        let strip_height = loc.top - strip_top;
        if strip_height == 0 {
            return;
        }

        let strip = Rect::at(loc.left as i32, strip_top as i32).of_size(w + 1, strip_height);
        draw_filled_rect_mut(frame, strip, color);

        if let Some(font) = &self.font {
            draw_text_mut(
                frame,
                LABEL_TEXT_COLOR,
                loc.left as i32 + LABEL_TEXT_INSET_X,
                strip_top as i32 + LABEL_TEXT_INSET_Y,
                PxScale::from(LABEL_FONT_SIZE),
                font,
                name,
            );
        }
    }
}

impl Default for Overlay {
    fn default() -> Self {
        Self::new()
    }
}
