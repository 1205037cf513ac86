//! The per-frame recognition loop.
//!
//! Owns the frame source and the screen for its lifetime; both are
//! released exactly once when the loop returns, whether the exit is a
//! graceful stop, an unexpected error, or an interrupt.

use facewatch_core::{identify, FaceEngine, KnownFaces, RecognitionResult, UNKNOWN_NAME};
use facewatch_hw::camera::FrameSource;
use facewatch_hw::display::Screen;
use facewatch_hw::draw::{Overlay, FACE_BOX_COLOR};
use facewatch_hw::frame::resize_frame;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Why the loop stopped. Every variant is a graceful shutdown, not an
/// error; unexpected failures surface as `Err` instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    WindowClosed,
    QuitKey,
    CaptureFailed,
    Interrupted,
}

pub struct LoopOptions {
    pub tolerance: f32,
    pub resize_width: Option<u32>,
}

/// Run the recognition loop until an exit condition fires.
///
/// Per iteration: check the window, capture a frame, detect and embed
/// faces on the (possibly downscaled) working copy, assign names against
/// the known set, draw overlays on the original frame, render it, then
/// poll the quit key and the interrupt flag.
pub fn run<S, D, E>(
    mut source: S,
    mut screen: D,
    engine: &mut E,
    known: &KnownFaces,
    overlay: &Overlay,
    options: &LoopOptions,
    interrupted: Arc<AtomicBool>,
) -> anyhow::Result<LoopExit>
where
    S: FrameSource,
    D: Screen,
    E: FaceEngine,
{
    loop {
        if screen.is_closed() {
            tracing::info!("window closed by user, exiting");
            return Ok(LoopExit::WindowClosed);
        }
        if interrupted.load(Ordering::Relaxed) {
            tracing::info!("interrupted, shutting down");
            return Ok(LoopExit::Interrupted);
        }

        let frame = match source.next_frame() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "failed to capture frame from webcam, stopping");
                return Ok(LoopExit::CaptureFailed);
            }
        };
        let Some(mut original) = frame.into_image() else {
            tracing::warn!("captured frame buffer does not match its dimensions, stopping");
            return Ok(LoopExit::CaptureFailed);
        };

        // Detection and embedding run on the working copy; overlays are
        // drawn on the full-resolution original. A width of 0 disables
        // downscaling.
        let working = options
            .resize_width
            .filter(|&width| width > 0)
            .map(|width| resize_frame(&original, Some(width), None));
        let target = working.as_ref().unwrap_or(&original);

        let locations = engine.detect(target)?;
        let embeddings = engine.embed(target, &locations)?;
        let scale = working
            .as_ref()
            .map(|w| original.width() as f32 / w.width() as f32);

        tracing::debug!(faces = locations.len(), "processed frame");

        for (location, embedding) in locations.iter().zip(embeddings.iter()) {
            let name = identify(engine, known, embedding, options.tolerance)
                .unwrap_or(UNKNOWN_NAME)
                .to_string();
            let location = match scale {
                Some(factor) => location.scaled(factor),
                None => *location,
            };
            let result = RecognitionResult { location, name };
            overlay.draw(&mut original, &result.location, &result.name, FACE_BOX_COLOR);
        }

        screen.render(&original)?;

        if screen.quit_requested() {
            tracing::info!("quit key pressed, exiting");
            return Ok(LoopExit::QuitKey);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use facewatch_core::{Embedding, EngineError, FaceLocation};
    use facewatch_hw::camera::CameraError;
    use facewatch_hw::display::DisplayError;
    use facewatch_hw::frame::Frame;
    use image::RgbImage;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    fn rgb_frame(width: u32, height: u32) -> Frame {
        Frame {
            data: vec![0u8; (width * height * 3) as usize],
            width,
            height,
        }
    }

    /// Scripted frame source counting captures and drops.
    struct StubSource {
        frames: VecDeque<Result<Frame, CameraError>>,
        captures: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
    }

    impl StubSource {
        fn new(frames: Vec<Result<Frame, CameraError>>) -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>) {
            let captures = Arc::new(AtomicUsize::new(0));
            let released = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    frames: frames.into(),
                    captures: captures.clone(),
                    released: released.clone(),
                },
                captures,
                released,
            )
        }
    }

    impl FrameSource for StubSource {
        fn next_frame(&mut self) -> Result<Frame, CameraError> {
            self.captures.fetch_add(1, Ordering::SeqCst);
            self.frames
                .pop_front()
                .unwrap_or_else(|| Err(CameraError::CaptureFailed("exhausted".into())))
        }
    }

    impl Drop for StubSource {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Scripted screen recording renders, the last frame, and drops.
    struct StubScreen {
        closed: bool,
        quit_after_renders: Option<usize>,
        renders: Arc<AtomicUsize>,
        destroyed: Arc<AtomicUsize>,
        last_frame: Arc<Mutex<Option<RgbImage>>>,
    }

    impl StubScreen {
        fn new() -> (Self, Arc<AtomicUsize>, Arc<AtomicUsize>, Arc<Mutex<Option<RgbImage>>>) {
            let renders = Arc::new(AtomicUsize::new(0));
            let destroyed = Arc::new(AtomicUsize::new(0));
            let last_frame = Arc::new(Mutex::new(None));
            (
                Self {
                    closed: false,
                    quit_after_renders: None,
                    renders: renders.clone(),
                    destroyed: destroyed.clone(),
                    last_frame: last_frame.clone(),
                },
                renders,
                destroyed,
                last_frame,
            )
        }
    }

    impl Screen for StubScreen {
        fn is_closed(&self) -> bool {
            self.closed
        }

        fn quit_requested(&self) -> bool {
            self.quit_after_renders
                .is_some_and(|n| self.renders.load(Ordering::SeqCst) >= n)
        }

        fn render(&mut self, image: &RgbImage) -> Result<(), DisplayError> {
            self.renders.fetch_add(1, Ordering::SeqCst);
            *self.last_frame.lock().unwrap() = Some(image.clone());
            Ok(())
        }
    }

    impl Drop for StubScreen {
        fn drop(&mut self) {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// Engine whose detections are scripted per call; embeddings mirror a
    /// fixed value per detected face.
    struct StubEngine {
        detections: VecDeque<Vec<FaceLocation>>,
        embedding_value: f32,
        seen_widths: Vec<u32>,
        fail_detect: bool,
    }

    impl StubEngine {
        fn empty() -> Self {
            Self {
                detections: VecDeque::new(),
                embedding_value: 0.0,
                seen_widths: Vec::new(),
                fail_detect: false,
            }
        }
    }

    impl FaceEngine for StubEngine {
        fn detect(&mut self, image: &RgbImage) -> Result<Vec<FaceLocation>, EngineError> {
            if self.fail_detect {
                return Err(EngineError::Detector(
                    facewatch_core::detector::DetectorError::InferenceFailed("boom".into()),
                ));
            }
            self.seen_widths.push(image.width());
            Ok(self.detections.pop_front().unwrap_or_default())
        }

        fn embed(
            &mut self,
            _image: &RgbImage,
            locations: &[FaceLocation],
        ) -> Result<Vec<Embedding>, EngineError> {
            Ok(locations
                .iter()
                .map(|_| Embedding {
                    values: vec![self.embedding_value],
                })
                .collect())
        }
    }

    fn options() -> LoopOptions {
        LoopOptions {
            tolerance: 0.6,
            resize_width: None,
        }
    }

    fn not_interrupted() -> Arc<AtomicBool> {
        Arc::new(AtomicBool::new(false))
    }

    #[test]
    fn test_capture_failure_releases_resources_once() {
        let (source, captures, released) = StubSource::new(vec![
            Ok(rgb_frame(64, 48)),
            Err(CameraError::CaptureFailed("unplugged".into())),
        ]);
        let (screen, renders, destroyed, _) = StubScreen::new();
        let mut engine = StubEngine::empty();

        let exit = run(
            source,
            screen,
            &mut engine,
            &KnownFaces::new(),
            &Overlay::new(),
            &options(),
            not_interrupted(),
        )
        .unwrap();

        assert_eq!(exit, LoopExit::CaptureFailed);
        assert_eq!(captures.load(Ordering::SeqCst), 2);
        assert_eq!(renders.load(Ordering::SeqCst), 1);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_window_closed_stops_before_capture() {
        let (source, captures, released) = StubSource::new(vec![Ok(rgb_frame(64, 48))]);
        let (mut screen, _, destroyed, _) = StubScreen::new();
        screen.closed = true;
        let mut engine = StubEngine::empty();

        let exit = run(
            source,
            screen,
            &mut engine,
            &KnownFaces::new(),
            &Overlay::new(),
            &options(),
            not_interrupted(),
        )
        .unwrap();

        assert_eq!(exit, LoopExit::WindowClosed);
        assert_eq!(captures.load(Ordering::SeqCst), 0);
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_quit_key_after_first_render() {
        let (source, _, _) = StubSource::new(vec![
            Ok(rgb_frame(64, 48)),
            Ok(rgb_frame(64, 48)),
        ]);
        let (mut screen, renders, _, _) = StubScreen::new();
        screen.quit_after_renders = Some(1);
        let mut engine = StubEngine::empty();

        let exit = run(
            source,
            screen,
            &mut engine,
            &KnownFaces::new(),
            &Overlay::new(),
            &options(),
            not_interrupted(),
        )
        .unwrap();

        assert_eq!(exit, LoopExit::QuitKey);
        assert_eq!(renders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_interrupt_flag_stops_loop() {
        let (source, captures, _) = StubSource::new(vec![Ok(rgb_frame(64, 48))]);
        let (screen, _, _, _) = StubScreen::new();
        let mut engine = StubEngine::empty();

        let exit = run(
            source,
            screen,
            &mut engine,
            &KnownFaces::new(),
            &Overlay::new(),
            &options(),
            Arc::new(AtomicBool::new(true)),
        )
        .unwrap();

        assert_eq!(exit, LoopExit::Interrupted);
        assert_eq!(captures.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_engine_error_propagates_but_still_releases() {
        let (source, _, released) = StubSource::new(vec![Ok(rgb_frame(64, 48))]);
        let (screen, _, destroyed, _) = StubScreen::new();
        let mut engine = StubEngine::empty();
        engine.fail_detect = true;

        let result = run(
            source,
            screen,
            &mut engine,
            &KnownFaces::new(),
            &Overlay::new(),
            &options(),
            not_interrupted(),
        );

        assert!(result.is_err());
        assert_eq!(released.load(Ordering::SeqCst), 1);
        assert_eq!(destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detection_runs_on_working_copy_and_rescales() {
        // 1280-wide frame, working copy at 320 → scale factor 4.
        let (source, _, _) = StubSource::new(vec![
            Ok(rgb_frame(1280, 960)),
            Err(CameraError::CaptureFailed("done".into())),
        ]);
        let (screen, _, _, last_frame) = StubScreen::new();

        let mut engine = StubEngine::empty();
        engine.detections.push_back(vec![FaceLocation {
            top: 10,
            right: 50,
            bottom: 80,
            left: 20,
        }]);

        let mut known = KnownFaces::new();
        known.add("alice", Embedding { values: vec![0.0] });

        let opts = LoopOptions {
            tolerance: 0.6,
            resize_width: Some(320),
        };

        let exit = run(
            source,
            screen,
            &mut engine,
            &known,
            &Overlay::new(),
            &opts,
            not_interrupted(),
        )
        .unwrap();
        assert_eq!(exit, LoopExit::CaptureFailed);

        // The detector saw the downscaled working copy.
        assert_eq!(engine.seen_widths, vec![320]);

        // The overlay landed at the rescaled location (40, 200, 320, 80)
        // on the full-resolution frame.
        let frame = last_frame.lock().unwrap().clone().unwrap();
        assert_eq!(frame.dimensions(), (1280, 960));
        assert_eq!(frame.get_pixel(80, 40), &FACE_BOX_COLOR);
        assert_eq!(frame.get_pixel(200, 320), &FACE_BOX_COLOR);
        // Interior stays untouched.
        assert_eq!(frame.get_pixel(140, 180), &image::Rgb([0, 0, 0]));
    }

    #[test]
    fn test_zero_resize_width_runs_at_full_resolution() {
        let (source, _, _) = StubSource::new(vec![
            Ok(rgb_frame(640, 480)),
            Err(CameraError::CaptureFailed("done".into())),
        ]);
        let (screen, _, _, _) = StubScreen::new();
        let mut engine = StubEngine::empty();

        let opts = LoopOptions {
            tolerance: 0.6,
            resize_width: Some(0),
        };

        run(
            source,
            screen,
            &mut engine,
            &KnownFaces::new(),
            &Overlay::new(),
            &opts,
            not_interrupted(),
        )
        .unwrap();

        // A zero width must not produce a degenerate working copy.
        assert_eq!(engine.seen_widths, vec![640]);
    }

    #[test]
    fn test_full_resolution_when_no_resize_configured() {
        let (source, _, _) = StubSource::new(vec![
            Ok(rgb_frame(640, 480)),
            Err(CameraError::CaptureFailed("done".into())),
        ]);
        let (screen, _, _, _) = StubScreen::new();
        let mut engine = StubEngine::empty();

        run(
            source,
            screen,
            &mut engine,
            &KnownFaces::new(),
            &Overlay::new(),
            &options(),
            not_interrupted(),
        )
        .unwrap();

        assert_eq!(engine.seen_widths, vec![640]);
    }
}
