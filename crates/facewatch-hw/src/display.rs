//! Display window for annotated frames, via `minifb`.

use image::RgbImage;
use minifb::{Key, Window, WindowOptions};
use thiserror::Error;

pub const WINDOW_TITLE: &str = "Face Recognition";

#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("window creation failed: {0}")]
    Create(String),
    #[error("render failed: {0}")]
    Render(String),
}

/// The on-screen surface the recognition loop renders to.
///
/// The live implementation is [`Viewer`]; tests substitute recording
/// stubs.
pub trait Screen {
    /// Whether the user has closed the window.
    fn is_closed(&self) -> bool;

    /// Whether the quit key (`q`) is currently pressed.
    fn quit_requested(&self) -> bool;

    /// Blit a frame to the window and pump its events.
    fn render(&mut self, image: &RgbImage) -> Result<(), DisplayError>;
}

/// On-screen window backed by `minifb`. Destroyed on drop.
pub struct Viewer {
    window: Window,
    buffer: Vec<u32>,
}

impl Viewer {
    /// Open the display window at the given size.
    pub fn open(width: u32, height: u32) -> Result<Self, DisplayError> {
        let mut window = Window::new(
            WINDOW_TITLE,
            width as usize,
            height as usize,
            WindowOptions::default(),
        )
        .map_err(|e| DisplayError::Create(e.to_string()))?;

        // Poll events roughly once a millisecond between frames.
        window.limit_update_rate(Some(std::time::Duration::from_millis(1)));

        Ok(Self {
            window,
            buffer: Vec::new(),
        })
    }
}

impl Screen for Viewer {
    fn is_closed(&self) -> bool {
        !self.window.is_open()
    }

    fn quit_requested(&self) -> bool {
        self.window.is_key_down(Key::Q)
    }

    fn render(&mut self, image: &RgbImage) -> Result<(), DisplayError> {
        self.buffer = pack_argb(image);
        self.window
            .update_with_buffer(
                &self.buffer,
                image.width() as usize,
                image.height() as usize,
            )
            .map_err(|e| DisplayError::Render(e.to_string()))
    }
}

/// Pack RGB8 pixels into the 0RGB `u32` layout `minifb` expects.
pub fn pack_argb(image: &RgbImage) -> Vec<u32> {
    image
        .pixels()
        .map(|p| ((p[0] as u32) << 16) | ((p[1] as u32) << 8) | p[2] as u32)
        .collect()
}
