use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod cli;
mod runner;

use facewatch_core::{load_known_faces, OnnxFaceEngine};
use facewatch_hw::{Camera, Overlay, Viewer};
use runner::LoopOptions;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = cli::Cli::parse();

    let model_dir = cli
        .model_dir
        .clone()
        .unwrap_or_else(facewatch_core::default_model_dir);
    tracing::info!(model_dir = %model_dir.display(), "loading models");
    let mut engine = OnnxFaceEngine::load(&model_dir).context("failed to load ONNX models")?;

    tracing::info!(faces_dir = %cli.faces_dir.display(), "loading known faces");
    let known = load_known_faces(&cli.faces_dir, &mut engine)?;
    if known.is_empty() {
        bail!(
            "no valid face images found in {} — add reference images named <name>_<id>.jpg or .png",
            cli.faces_dir.display()
        );
    }
    tracing::info!(
        embeddings = known.embedding_count(),
        people = known.people(),
        "known faces loaded"
    );

    // The camera must open before the window so a missing device fails
    // without flashing an empty window.
    let camera = Camera::open(cli.camera).context("could not open webcam")?;
    let viewer = Viewer::open(camera.width, camera.height)?;
    let overlay = Overlay::new();

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = interrupted.clone();
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::Relaxed);
    })
    .context("failed to install interrupt handler")?;

    tracing::info!("face recognition started; press 'q' or close the window to quit");

    let stream = camera.stream()?;
    let options = LoopOptions {
        tolerance: cli.tolerance,
        resize_width: cli.resize_width,
    };
    let exit = runner::run(
        stream,
        viewer,
        &mut engine,
        &known,
        &overlay,
        &options,
        interrupted,
    )?;

    tracing::info!(reason = ?exit, "face recognition stopped");
    Ok(())
}
