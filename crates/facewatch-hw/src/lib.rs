//! facewatch-hw — Hardware and I/O glue for the recognition loop.
//!
//! Provides V4L2-based camera capture, RGB frame utilities, overlay
//! drawing, and the on-screen display window.

pub mod camera;
pub mod display;
pub mod draw;
pub mod frame;

pub use camera::{Camera, CameraError, CameraStream, FrameSource, PixelFormat};
pub use display::{DisplayError, Screen, Viewer, WINDOW_TITLE};
pub use draw::{Overlay, FACE_BOX_COLOR};
pub use frame::{resize_frame, Frame};
