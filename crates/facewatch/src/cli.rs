//! Command-line interface.

use clap::Parser;
use std::path::PathBuf;

/// Live webcam face recognition against a directory of reference images.
#[derive(Parser, Debug)]
#[command(name = "facewatch", version, about)]
pub struct Cli {
    /// Directory of reference images named <name>_<id>.jpg or .png
    #[arg(long = "faces_dir", value_name = "PATH", default_value = "./faces")]
    pub faces_dir: PathBuf,

    /// Face match tolerance; lower is stricter
    #[arg(long, value_name = "FLOAT", default_value_t = 0.6)]
    pub tolerance: f32,

    /// Downscale frames to this width before detection (0 disables)
    #[arg(long = "resize_width", value_name = "PIXELS")]
    pub resize_width: Option<u32>,

    /// Camera device index (/dev/video<N>)
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    pub camera: u32,

    /// Directory holding the ONNX model files
    /// [default: $FACEWATCH_MODEL_DIR or ~/.local/share/facewatch/models]
    #[arg(long = "model_dir", value_name = "PATH")]
    pub model_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["facewatch"]);
        assert_eq!(cli.faces_dir, PathBuf::from("./faces"));
        assert_eq!(cli.tolerance, 0.6);
        assert_eq!(cli.resize_width, None);
        assert_eq!(cli.camera, 0);
        assert_eq!(cli.model_dir, None);
    }

    #[test]
    fn test_flags_use_underscore_names() {
        let cli = Cli::parse_from([
            "facewatch",
            "--faces_dir",
            "/tmp/people",
            "--tolerance",
            "0.45",
            "--resize_width",
            "320",
        ]);
        assert_eq!(cli.faces_dir, PathBuf::from("/tmp/people"));
        assert_eq!(cli.tolerance, 0.45);
        assert_eq!(cli.resize_width, Some(320));
    }
}
